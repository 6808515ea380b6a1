//! Allocation core: request sizing, best-fit search, split/place, and free
//! (component E).
//!
//! Grounded in `original_source/mm.c`'s `mm_malloc`/`place`/`mm_free`, with
//! the split-or-accept-fragmentation threshold and the header-then-index
//! write ordering from the teacher's `kheap.rs::split_alloc`.

use core::ptr;

use crate::boundary;
use crate::coalesce;
use crate::config::{self, MAX_SIZE, MIN_SIZE, WORD};
use crate::index;

/// Adjusts a caller-requested byte count into a valid block payload size:
/// at least [`MIN_SIZE`], aligned up to [`config::ALIGNMENT`].
#[inline]
pub fn adjust_request(req: usize) -> usize {
    core::cmp::max(MIN_SIZE, config::align_up(req))
}

/// Allocates `req` bytes. Returns null on `req == 0`, `req > MAX_SIZE`, or
/// if the heap cannot be extended further — the raw-API sentinel
/// convention spec.md §6/§7 describes; see [`crate::TrieHeap::alloc`] for
/// a `Result`-returning wrapper.
///
/// # Safety
///
/// `bins_base` must be the live bin table and `epilogue` must point at the
/// heap's current trailing `PACK(0,1)` word; `source` must be the same
/// [`crate::heap::HeapSource`] the heap was built from. On success,
/// `*epilogue` is updated to the new epilogue's address.
pub unsafe fn allocate<H: crate::heap::HeapSource>(
    bins_base: *mut u8,
    epilogue: &mut *mut usize,
    source: &mut H,
    req: usize,
) -> *mut u8 {
    if req == 0 || req > MAX_SIZE {
        return ptr::null_mut();
    }

    let size = adjust_request(req);

    let bp = match index::best_fit(bins_base, size) {
        Some(found) => {
            index::remove(found);
            found
        }
        None => {
            // Grow by exactly what's needed for this request; a free tail
            // from a prior extend (if any) will have already been
            // consumed via best_fit, so there is nothing here to merge
            // with before placing.
            match crate::heap::extend(source, *epilogue, size) {
                Ok(bp) => {
                    *epilogue = boundary::next_block(bp) as *mut usize;
                    bp
                }
                Err(_) => return ptr::null_mut(),
            }
        }
    };

    place(bins_base, bp, size)
}

/// Marks `b` (a free block of size `>= size`, already removed from the
/// index) allocated at exactly `size`, splitting off and re-indexing a
/// tail fragment when the leftover is large enough to stand on its own
/// (spec.md §4.E "place"): a leftover of at least `MIN_SIZE + 2*WORD` gets
/// its own header/footer and is inserted back into the index; anything
/// smaller is accepted as internal fragmentation on `b` itself.
///
/// # Safety
///
/// `b` must not be reachable from the index (it must already have been
/// removed, or never inserted, e.g. freshly extended), and `bins_base`
/// must be the live bin table.
pub unsafe fn place(bins_base: *mut u8, b: *mut u8, size: usize) -> *mut u8 {
    let current = boundary::size_of_block(b);
    debug_assert!(current >= size);

    if current - size >= MIN_SIZE + 2 * WORD {
        boundary::set_header_footer(b, size, true);
        let remainder = boundary::next_block(b);
        let remainder_size = current - size - 2 * WORD;
        boundary::set_header_footer(remainder, remainder_size, false);
        index::insert(bins_base, remainder);
    } else {
        boundary::set_header_footer(b, current, true);
    }
    b
}

/// Frees a previously allocated block: marks it free, coalesces with any
/// free physical neighbors, and re-inserts the (possibly merged) result
/// into the index. Spec.md's `free` — "cannot fail", and UB on a foreign
/// or already-free pointer, same as any boundary-tag allocator.
///
/// # Safety
///
/// `bp` must be a payload pointer previously returned by `allocate` or
/// `realloc` from this same heap and not already freed.
pub unsafe fn free(bins_base: *mut u8, bp: *mut u8) {
    let size = boundary::size_of_block(bp);
    boundary::set_header_footer(bp, size, false);
    let merged = coalesce::coalesce(bp);
    index::insert(bins_base, merged);
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use crate::heap::{self, VecHeapSource};

    #[test]
    fn adjust_request_floors_at_min_size() {
        assert_eq!(adjust_request(0), MIN_SIZE);
        assert_eq!(adjust_request(1), MIN_SIZE);
        assert_eq!(adjust_request(MIN_SIZE + 1), config::align_up(MIN_SIZE + 1));
    }

    #[test]
    fn allocate_zero_and_oversize_return_null() {
        unsafe {
            let mut src = VecHeapSource::new(1 << 16);
            let base = heap::init(&mut src).unwrap();
            let mut epilogue = base.add(heap::EPILOGUE_OFFSET) as *mut usize;
            assert!(allocate(base, &mut epilogue, &mut src, 0).is_null());
            assert!(allocate(base, &mut epilogue, &mut src, MAX_SIZE + 1).is_null());
        }
    }

    #[test]
    fn allocate_extends_then_reuses_after_free() {
        unsafe {
            let mut src = VecHeapSource::new(1 << 16);
            let base = heap::init(&mut src).unwrap();
            let mut epilogue = base.add(heap::EPILOGUE_OFFSET) as *mut usize;
            let p = allocate(base, &mut epilogue, &mut src, 40);
            assert!(!p.is_null());
            assert!(boundary::alloc_of_block(p));
            free(base, p);
            let q = allocate(base, &mut epilogue, &mut src, 40);
            assert_eq!(p, q);
        }
    }

    #[test]
    fn place_splits_when_remainder_clears_threshold() {
        unsafe {
            let mut src = VecHeapSource::new(1 << 16);
            let base = heap::init(&mut src).unwrap();
            let epilogue = base.add(heap::EPILOGUE_OFFSET) as *mut usize;
            let bp = heap::extend(&mut src, epilogue, 4096).unwrap();
            let placed = place(base, bp, 64);
            assert_eq!(placed, bp);
            assert!(boundary::alloc_of_block(placed));
            assert_eq!(boundary::size_of_block(placed), 64);
            let remainder = boundary::next_block(placed);
            assert!(!boundary::alloc_of_block(remainder));
            assert_eq!(boundary::size_of_block(remainder), 4096 - 64 - 2 * WORD);
        }
    }

    #[test]
    fn place_accepts_fragmentation_below_threshold() {
        unsafe {
            let mut src = VecHeapSource::new(1 << 16);
            let base = heap::init(&mut src).unwrap();
            let epilogue = base.add(heap::EPILOGUE_OFFSET) as *mut usize;
            let bp = heap::extend(&mut src, epilogue, 64).unwrap();
            let placed = place(base, bp, 64 - 8);
            assert_eq!(boundary::size_of_block(placed), 64);
            assert!(boundary::alloc_of_block(placed));
        }
    }
}
