//! Error taxonomy for the allocator's safe entry points.
//!
//! The raw `unsafe fn` surface (§6 of the spec) never returns these: it
//! follows the sentinel-pointer convention malloc implementations use
//! (null on failure). [`HeapError`] exists for the safe wrapper API and for
//! [`crate::diag`] messages, matching the taxonomy spec.md §7 lays out.

use core::fmt;

use crate::heap::HeapSourceError;

/// Why a public operation did not return a usable pointer.
///
/// `ZeroRequest` and `OversizeRequest` are not bugs: `alloc(0)` and
/// `alloc(n)` with `n > MAX_SIZE` are defined to return nothing, same as
/// the raw API returning a null pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapError {
    /// `alloc(0)` was requested. Not an error, returns no block.
    ZeroRequest,
    /// Requested size exceeds [`crate::config::MAX_SIZE`].
    OversizeRequest { requested: usize, max: usize },
    /// The host heap primitive refused to extend the managed region.
    OutOfMemory,
    /// Only surfaced when the `checker` feature is enabled: an invariant
    /// the consistency checker walks (H1-H4, L1-L3, T1, S1) did not hold.
    /// Signals a bug in the allocator itself, never a runtime condition a
    /// caller can recover from.
    InternalInvariant(&'static str),
}

impl fmt::Display for HeapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroRequest => f.write_str("zero-size allocation request"),
            Self::OversizeRequest { requested, max } => {
                write!(f, "requested size {requested} exceeds maximum {max}")
            }
            Self::OutOfMemory => f.write_str("heap source is out of memory"),
            Self::InternalInvariant(what) => write!(f, "internal invariant violated: {what}"),
        }
    }
}

impl From<HeapSourceError> for HeapError {
    fn from(_: HeapSourceError) -> Self {
        Self::OutOfMemory
    }
}
