//! Diagnostic sink for checker (component G) violations.
//!
//! The allocator never panics or retries on an invariant violation in
//! release builds (spec.md §7). When the `checker` feature is enabled and a
//! walk finds a problem, it writes one line through this sink and keeps
//! going — diagnosis, not auto-repair. Before [`set_diag_fn`] is called,
//! lines are silently dropped, same default-to-quiet behavior the log sink
//! this is modeled on uses.

use core::fmt;
use core::sync::atomic::{AtomicPtr, Ordering};

/// The signature of the global diagnostic sink function.
pub type DiagFn = fn(fmt::Arguments<'_>);

fn null_diag(_args: fmt::Arguments<'_>) {}

static DIAG_FN: AtomicPtr<()> = AtomicPtr::new(null_diag as *mut ());

/// Registers the sink every [`diag!`] call is routed through.
///
/// # Safety
///
/// `f` must be safe to call from any context the allocator itself may run
/// in (including, for a real kernel embedding, interrupt context). May be
/// called more than once; uses `Release` ordering so later loads observe
/// the new function.
pub unsafe fn set_diag_fn(f: DiagFn) {
    DIAG_FN.store(f as *mut (), Ordering::Release);
}

#[inline]
fn load_diag_fn() -> DiagFn {
    let ptr = DIAG_FN.load(Ordering::Acquire);
    // SAFETY: only valid `DiagFn` pointers (or the initial `null_diag`) are
    // ever stored into DIAG_FN.
    unsafe { core::mem::transmute(ptr) }
}

/// Implementation detail for [`diag!`]. Not public API.
#[doc(hidden)]
pub fn _diag(args: fmt::Arguments<'_>) {
    load_diag_fn()(args);
}

/// Emits one diagnostic line through the registered sink.
///
/// A no-op until [`set_diag_fn`] has been called.
#[macro_export]
macro_rules! diag {
    ($($arg:tt)*) => { $crate::diag::_diag(format_args!($($arg)*)) };
}
