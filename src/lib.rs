//! A general-purpose allocator over a single contiguous heap, indexed by a
//! size-segregated bitwise trie with an embedded same-size stack at every
//! trie node. No side arena: every pointer the index needs to walk lives
//! inside the free blocks themselves.
//!
//! Modeled on the teacher crate's `mem::bmalloc`/`mem::vmalloc` split: the
//! raw, `unsafe fn` mechanics live in their own modules (boundary tags,
//! bootstrap/extend, coalesce, index, allocation core, realloc, checker),
//! and [`TrieHeap`] is the thin safe orchestrator over them, the same way
//! `KernelHeapAllocator` sits on top of `AllocHeader`/page-mapping
//! mechanics without reimplementing them.
//!
//! `no_std` by default; the `std` feature (on by default) only adds the
//! `VecHeapSource` test double used by this crate's own test suite — it
//! changes nothing about the allocator's own code path.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod alloc_core;
pub mod boundary;
#[cfg(feature = "checker")]
pub mod check;
pub mod coalesce;
pub mod config;
pub mod diag;
pub mod error;
pub mod heap;
pub mod index;
pub mod realloc;

use core::alloc::{GlobalAlloc, Layout};
use core::ptr::NonNull;

pub use error::HeapError;
pub use heap::HeapSource;

/// Safe orchestrator around the raw allocator core: owns the bin table's
/// base address, the current epilogue, and the [`HeapSource`] the heap
/// grows through, and turns the raw sentinel-pointer conventions of
/// [`alloc_core`]/[`realloc`] into `Result`s.
///
/// Mirrors the division of labor in the teacher's `KernelHeapAllocator`:
/// that type also tracks a base pointer and a free-space cursor and
/// forwards the actual split/merge work to free functions operating on
/// raw headers.
pub struct TrieHeap<H: HeapSource> {
    bins_base: *mut u8,
    epilogue: *mut usize,
    source: H,
}

// SAFETY: a `TrieHeap` owns its `source` outright and never exposes its raw
// pointers for anyone else to read or write concurrently; sending it to
// another thread is the same as moving an owned `Vec` across threads. It
// is not `Sync` on its own — see [`LockedTrieHeap`] for the shared case.
unsafe impl<H: HeapSource + Send> Send for TrieHeap<H> {}

impl<H: HeapSource> TrieHeap<H> {
    /// Bootstraps a fresh heap over `source` (component B).
    pub fn new(mut source: H) -> Result<Self, HeapError> {
        let bins_base = heap::init(&mut source)?;
        let epilogue = unsafe { bins_base.add(heap::EPILOGUE_OFFSET) as *mut usize };
        Ok(Self {
            bins_base,
            epilogue,
            source,
        })
    }

    /// Allocates `req` bytes. `req == 0` and `req > `[`config::MAX_SIZE`]
    /// are reported, not returned as a zero-size or truncated block.
    pub fn alloc(&mut self, req: usize) -> Result<NonNull<u8>, HeapError> {
        if req == 0 {
            return Err(HeapError::ZeroRequest);
        }
        if req > config::MAX_SIZE {
            return Err(HeapError::OversizeRequest {
                requested: req,
                max: config::MAX_SIZE,
            });
        }
        // SAFETY: `bins_base`/`epilogue`/`source` describe one heap that
        // only this `TrieHeap` mutates.
        let p = unsafe {
            alloc_core::allocate(self.bins_base, &mut self.epilogue, &mut self.source, req)
        };
        NonNull::new(p).ok_or(HeapError::OutOfMemory)
    }

    /// Frees a block previously returned by [`Self::alloc`] or
    /// [`Self::realloc`] on this same heap.
    ///
    /// # Safety
    ///
    /// `ptr` must not have been freed already and must have come from this
    /// heap; freeing a foreign or dangling pointer is undefined behavior,
    /// same as `free` in any boundary-tag allocator (spec.md §7 non-goal:
    /// no pointer validation).
    pub unsafe fn free(&mut self, ptr: NonNull<u8>) {
        alloc_core::free(self.bins_base, ptr.as_ptr());
    }

    /// Resizes a block previously returned by [`Self::alloc`] or
    /// [`Self::realloc`] to `req` bytes, preserving its leading
    /// `min(old, req)` bytes. Leaves `ptr` valid and unchanged if the
    /// request can't be satisfied.
    ///
    /// # Safety
    ///
    /// `ptr` must be a live payload pointer from this same heap.
    pub unsafe fn realloc(&mut self, ptr: NonNull<u8>, req: usize) -> Result<NonNull<u8>, HeapError> {
        if req == 0 {
            return Err(HeapError::ZeroRequest);
        }
        if req > config::MAX_SIZE {
            return Err(HeapError::OversizeRequest {
                requested: req,
                max: config::MAX_SIZE,
            });
        }
        let p = realloc::realloc(
            self.bins_base,
            &mut self.epilogue,
            &mut self.source,
            ptr.as_ptr(),
            req,
        );
        NonNull::new(p).ok_or(HeapError::OutOfMemory)
    }

    /// Runs the consistency checker (component G) over the whole heap.
    /// Only meaningful with the `checker` feature enabled; reports through
    /// [`diag!`](crate::diag) and never mutates anything.
    #[cfg(feature = "checker")]
    pub fn check(&self) -> bool {
        // SAFETY: `&self` guarantees no other mutator is running.
        unsafe { check::check(self.bins_base, &self.source) }
    }

    /// Exposes the underlying [`HeapSource`], mostly for tests and for
    /// embedders that need to inspect the managed region's bounds.
    pub fn source(&self) -> &H {
        &self.source
    }
}

/// A [`TrieHeap`] behind a spinlock, for registration as the process-wide
/// `#[global_allocator]`.
///
/// Grounded in the teacher's `LockedBuddyAllocator<N>` (`mem/bmalloc/heap.rs`):
/// same shape, a `spin::Mutex` wrapping the real allocator and a
/// `GlobalAlloc` impl that locks, forwards, and unlocks. `GlobalAlloc`
/// cannot report failure beyond a null pointer, so `Layout`-level alignment
/// above [`config::ALIGNMENT`] and zero-sized/oversize requests collapse to
/// the same null-pointer convention the raw API already uses.
pub struct LockedTrieHeap<H: HeapSource> {
    inner: spin::Mutex<TrieHeap<H>>,
}

impl<H: HeapSource> LockedTrieHeap<H> {
    /// Bootstraps a fresh heap over `source` and wraps it for shared,
    /// locked access.
    pub fn new(source: H) -> Result<Self, HeapError> {
        Ok(Self {
            inner: spin::Mutex::new(TrieHeap::new(source)?),
        })
    }
}

unsafe impl<H: HeapSource + Send> GlobalAlloc for LockedTrieHeap<H> {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        debug_assert!(layout.align() <= config::ALIGNMENT, "alignment above ALIGNMENT is a non-goal");
        self.inner
            .lock()
            .alloc(layout.size())
            .map_or(core::ptr::null_mut(), NonNull::as_ptr)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout) {
        if let Some(p) = NonNull::new(ptr) {
            self.inner.lock().free(p);
        }
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        debug_assert!(layout.align() <= config::ALIGNMENT, "alignment above ALIGNMENT is a non-goal");
        match NonNull::new(ptr) {
            Some(p) => self
                .inner
                .lock()
                .realloc(p, new_size)
                .map_or(core::ptr::null_mut(), NonNull::as_ptr),
            None => self.alloc(Layout::from_size_align_unchecked(new_size, layout.align())),
        }
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use crate::heap::VecHeapSource;

    #[test]
    fn trie_heap_round_trips_through_alloc_free() {
        let mut heap = TrieHeap::new(VecHeapSource::new(1 << 16)).unwrap();
        let p = heap.alloc(128).unwrap();
        unsafe {
            heap.free(p);
        }
    }

    #[test]
    fn trie_heap_rejects_zero_and_oversize() {
        let mut heap = TrieHeap::new(VecHeapSource::new(1 << 16)).unwrap();
        assert_eq!(heap.alloc(0), Err(HeapError::ZeroRequest));
        assert_eq!(
            heap.alloc(config::MAX_SIZE + 1),
            Err(HeapError::OversizeRequest {
                requested: config::MAX_SIZE + 1,
                max: config::MAX_SIZE,
            })
        );
    }

    #[test]
    fn trie_heap_realloc_grows_and_preserves_bytes() {
        let mut heap = TrieHeap::new(VecHeapSource::new(1 << 16)).unwrap();
        unsafe {
            let p = heap.alloc(64).unwrap();
            for i in 0..64u8 {
                *p.as_ptr().add(i as usize) = i;
            }
            let q = heap.alloc(64).unwrap(); // block the right neighbor so realloc must move
            let r = heap.realloc(p, 4096).unwrap();
            for i in 0..64u8 {
                assert_eq!(*r.as_ptr().add(i as usize), i);
            }
            heap.free(q);
            heap.free(r);
        }
    }

    #[test]
    fn locked_trie_heap_implements_global_alloc() {
        let locked = LockedTrieHeap::new(VecHeapSource::new(1 << 16)).unwrap();
        unsafe {
            let layout = Layout::from_size_align(64, 8).unwrap();
            let p = GlobalAlloc::alloc(&locked, layout);
            assert!(!p.is_null());
            GlobalAlloc::dealloc(&locked, p, layout);
        }
    }
}
