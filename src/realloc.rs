//! Realloc (component F): in-place grow via next-neighbor absorption,
//! falling back to allocate-copy-free.
//!
//! Grounded in `original_source/mm.c`'s `mm_realloc`/`dumb_realloc` (the
//! teacher has no realloc of its own — `mem::bmalloc`/`mem::vmalloc` only
//! expose `GlobalAlloc::alloc`/`dealloc` — so this component is
//! supplemented straight from the original implementation, kept in the
//! surrounding modules' idiom).

use core::ptr;

use crate::alloc_core;
use crate::boundary;
use crate::config;
use crate::index;

/// Resizes the block at `bp` to `req` bytes.
///
/// 1. Adjusts `req` the same way a fresh `allocate` would (aligned up,
///    floored at `MIN_SIZE`) so the result never violates H4.
/// 2. If the new size is no larger than the current one, `place` trims
///    any surplus into a fresh free block (a same-size request is a
///    no-op place).
/// 3. Otherwise, if the next physical neighbor is free and big enough to
///    cover the shortfall, it is absorbed (removed from the index, the
///    two blocks merged) and then trimmed with `place` — no copy.
/// 4. Otherwise falls back to allocating a fresh block, copying
///    `min(req, old_size)` bytes, and freeing the original.
///
/// Returns null only if step 4's allocation fails, in which case `bp`
/// is untouched and still valid — spec.md §7's "original preserved on
/// failure".
///
/// # Safety
///
/// `bp` must be a live payload pointer previously returned by `allocate`
/// or `realloc` on this same heap; `bins_base`/`epilogue`/`source` must
/// describe that same heap.
pub unsafe fn realloc<H: crate::heap::HeapSource>(
    bins_base: *mut u8,
    epilogue: &mut *mut usize,
    source: &mut H,
    bp: *mut u8,
    req: usize,
) -> *mut u8 {
    let new_size = alloc_core::adjust_request(req);
    let old_size = boundary::size_of_block(bp);

    if new_size <= old_size {
        return alloc_core::place(bins_base, bp, new_size);
    }

    let diff = new_size - old_size;
    let next = boundary::next_block(bp);

    if !boundary::alloc_of_block(next) {
        let absorbable = 2 * config::WORD + boundary::size_of_block(next);
        if absorbable >= diff {
            index::remove(next);
            let grown = old_size + absorbable;
            boundary::set_header_footer(bp, grown, true);
            return alloc_core::place(bins_base, bp, new_size);
        }
    }

    move_realloc(bins_base, epilogue, source, bp, new_size)
}

/// Allocates a fresh block, copies the old contents, frees the original.
/// Used by [`realloc`] whenever in-place growth isn't possible.
unsafe fn move_realloc<H: crate::heap::HeapSource>(
    bins_base: *mut u8,
    epilogue: &mut *mut usize,
    source: &mut H,
    bp: *mut u8,
    new_size: usize,
) -> *mut u8 {
    let old_size = boundary::size_of_block(bp);
    let new_ptr = alloc_core::allocate(bins_base, epilogue, source, new_size);
    if new_ptr.is_null() {
        return ptr::null_mut();
    }
    let copy_len = core::cmp::min(old_size, new_size);
    ptr::copy_nonoverlapping(bp, new_ptr, copy_len);
    alloc_core::free(bins_base, bp);
    new_ptr
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use crate::heap::{self, VecHeapSource};

    struct Fixture {
        src: VecHeapSource,
        bins_base: *mut u8,
        epilogue: *mut usize,
    }

    impl Fixture {
        unsafe fn new() -> Self {
            let mut src = VecHeapSource::new(1 << 16);
            let bins_base = heap::init(&mut src).unwrap();
            let epilogue = bins_base.add(heap::EPILOGUE_OFFSET) as *mut usize;
            Self {
                src,
                bins_base,
                epilogue,
            }
        }

        unsafe fn alloc(&mut self, req: usize) -> *mut u8 {
            alloc_core::allocate(self.bins_base, &mut self.epilogue, &mut self.src, req)
        }

        unsafe fn free(&mut self, p: *mut u8) {
            alloc_core::free(self.bins_base, p)
        }

        unsafe fn realloc(&mut self, p: *mut u8, req: usize) -> *mut u8 {
            realloc(self.bins_base, &mut self.epilogue, &mut self.src, p, req)
        }
    }

    #[test]
    fn grows_in_place_into_freed_right_neighbor() {
        unsafe {
            let mut fx = Fixture::new();
            let p = fx.alloc(64);
            let q = fx.alloc(64);
            fx.free(q);
            let r = fx.realloc(p, 120);
            assert_eq!(r, p);
            assert!(boundary::size_of_block(r) >= 120);
        }
    }

    #[test]
    fn falls_back_to_move_when_neighbor_is_allocated() {
        unsafe {
            let mut fx = Fixture::new();
            let p = fx.alloc(64);
            let _q = fx.alloc(64); // kept allocated: blocks in-place growth
            let r = fx.realloc(p, 4096);
            assert_ne!(r, p);
            assert!(!boundary::alloc_of_block(p));
        }
    }

    #[test]
    fn shrink_trims_surplus_into_a_free_block() {
        unsafe {
            let mut fx = Fixture::new();
            let p = fx.alloc(4096);
            let r = fx.realloc(p, 64);
            assert_eq!(r, p);
            assert_eq!(boundary::size_of_block(r), 64);
        }
    }

    #[test]
    fn round_trip_preserves_bytes_on_move() {
        unsafe {
            let mut fx = Fixture::new();
            let p = fx.alloc(64);
            for i in 0..64u8 {
                *p.add(i as usize) = i;
            }
            let _q = fx.alloc(64);
            let r = fx.realloc(p, 4096);
            for i in 0..64u8 {
                assert_eq!(*r.add(i as usize), i);
            }
        }
    }
}
