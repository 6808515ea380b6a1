//! Heap bootstrap & extend (component B), and the host collaborator
//! contract it is built on.
//!
//! Grounded in `KernelHeapAllocator::init` (`mem/vmalloc/kheap.rs`) for the
//! bootstrap shape, generalizing the teacher's pattern of depending on an
//! external collaborator (there, `alloc_page` + the page mapper) through a
//! narrow trait instead of owning physical memory directly.

use core::fmt;
use core::mem::size_of;
use core::ptr;

use crate::boundary::{self, pack};
use crate::config::{BIN_COUNT, MIN_SIZE, WORD};

/// The host's `sbrk`-equivalent primitive (spec.md §6, "host primitive
/// contract"): extends a single contiguous region by `increment` bytes and
/// returns the start of the newly available range. The heap only ever
/// grows; there is no matching "give memory back" call.
pub trait HeapSource {
    /// Extends the managed region by exactly `increment` bytes, contiguous
    /// with whatever was returned by the previous call (or the initial
    /// region, for the first call). Returns the start of the new bytes.
    fn sbrk(&mut self, increment: usize) -> Result<*mut u8, HeapSourceError>;

    /// Low bound of the region handed out so far.
    fn heap_lo(&self) -> *mut u8;

    /// High bound (one past the last byte) of the region handed out so far.
    fn heap_hi(&self) -> *mut u8;
}

/// The host primitive refused to extend the region (spec.md's
/// `OUT_OF_MEMORY`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapSourceError;

impl fmt::Display for HeapSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("host heap primitive refused to extend the region")
    }
}

/// Byte size of the fixed prefix written once by [`init`]: the bin table,
/// the two prologue sentinel words, and the initial epilogue word (which
/// the first [`extend`] call overwrites with block 0's header).
pub const PROLOGUE_SIZE: usize = BIN_COUNT * size_of::<usize>() + 3 * WORD;

/// Offset, in bytes from the bin table's base, of the initial epilogue
/// word — i.e. where block 0's header lands once the heap is first
/// extended.
pub const EPILOGUE_OFFSET: usize = BIN_COUNT * size_of::<usize>() + 2 * WORD;

/// Bootstraps an empty heap: requests the fixed prefix from `source`
/// (bin table + two prologue sentinel words + the initial epilogue),
/// zeroes the bins, and writes the sentinels. Creates no initial free
/// block — the first [`extend`] (driven lazily by the first allocation)
/// supplies that.
///
/// Returns the base address of the bin table (`bins[0]`), which callers
/// thread through every subsequent call as the root of the index. The
/// initial epilogue lives at `base + `[`EPILOGUE_OFFSET`].
///
/// # Errors
///
/// Returns [`HeapSourceError`] only if the host primitive refuses the
/// initial request.
pub fn init<H: HeapSource>(source: &mut H) -> Result<*mut u8, HeapSourceError> {
    let base = source.sbrk(PROLOGUE_SIZE)?;

    // SAFETY: `base .. base + PROLOGUE_SIZE` was just carved out by `sbrk`
    // and is not yet visible to anyone else.
    unsafe {
        let bins = base as *mut *mut u8;
        for i in 0..BIN_COUNT {
            ptr::write(bins.add(i), ptr::null_mut());
        }

        let sentinel = pack(0, true);
        let prologue = base.add(BIN_COUNT * size_of::<usize>()) as *mut usize;
        ptr::write(prologue, sentinel);
        ptr::write(prologue.add(1), sentinel);
        ptr::write(prologue.add(2), sentinel); // initial epilogue
    }

    Ok(base)
}

/// Grows the heap by `n` payload bytes (aligned up by the caller), writing
/// a free block header/footer where the old epilogue sat and a fresh
/// epilogue one word past it.
///
/// Does not coalesce with whatever physically preceded it and does not
/// insert the new block into the index — the caller (component E, via
/// [`crate::alloc_core::allocate`]) consumes it immediately through
/// `place`.
///
/// # Errors
///
/// Returns [`HeapSourceError`] if the host primitive refuses the request.
///
/// # Safety
///
/// `n` must already be [`crate::config::ALIGNMENT`]-aligned and at least
/// [`MIN_SIZE`]; `old_epilogue` must point at the word currently holding
/// `PACK(0, 1)` at the tail of the managed heap.
pub unsafe fn extend<H: HeapSource>(
    source: &mut H,
    old_epilogue: *mut usize,
    n: usize,
) -> Result<*mut u8, HeapSourceError> {
    debug_assert!(n >= MIN_SIZE);
    debug_assert_eq!(n % crate::config::ALIGNMENT, 0);

    // The old epilogue's single word is already reserved from a prior
    // sbrk call and becomes this block's header; what's new is the
    // payload, the footer, and the fresh epilogue one word past it.
    source.sbrk(n + 2 * WORD)?;

    let bp = old_epilogue as *mut u8;
    boundary::set_header_footer(bp, n, false);

    let new_epilogue = boundary::next_block(bp) as *mut usize;
    ptr::write(new_epilogue, pack(0, true));

    Ok(bp)
}

#[cfg(feature = "std")]
pub use self::test_source::VecHeapSource;

#[cfg(feature = "std")]
mod test_source {
    extern crate std;

    use std::boxed::Box;
    use std::vec;

    use super::{HeapSource, HeapSourceError};

    /// A [`HeapSource`] backed by a single, pre-reserved byte buffer.
    ///
    /// `sbrk` never reallocates: the buffer's full capacity is carved out
    /// up front (leaked into a `Box<[u8]>`) and `sbrk` only ever bumps a
    /// high-water mark within it, so every pointer handed out by the
    /// allocator under test stays valid for the buffer's whole lifetime —
    /// exactly what a real `sbrk`-backed heap guarantees.
    pub struct VecHeapSource {
        storage: Box<[u8]>,
        used: usize,
    }

    impl VecHeapSource {
        /// Reserves `capacity` bytes up front. `sbrk` calls fail with
        /// [`HeapSourceError`] once `capacity` is exhausted.
        pub fn new(capacity: usize) -> Self {
            Self {
                storage: vec![0u8; capacity].into_boxed_slice(),
                used: 0,
            }
        }
    }

    impl HeapSource for VecHeapSource {
        fn sbrk(&mut self, increment: usize) -> Result<*mut u8, HeapSourceError> {
            let new_used = self.used.checked_add(increment).ok_or(HeapSourceError)?;
            if new_used > self.storage.len() {
                return Err(HeapSourceError);
            }
            // SAFETY: `self.used` is always <= storage.len(), and the
            // backing allocation never moves once created.
            let ptr = unsafe { self.storage.as_mut_ptr().add(self.used) };
            self.used = new_used;
            Ok(ptr)
        }

        fn heap_lo(&self) -> *mut u8 {
            self.storage.as_ptr() as *mut u8
        }

        fn heap_hi(&self) -> *mut u8 {
            // SAFETY: `used <= storage.len()`, one-past-the-end is always
            // in-bounds-or-one-past for a slice pointer.
            unsafe { self.storage.as_ptr().add(self.used) as *mut u8 }
        }
    }
}
