//! Coalesce (component C).
//!
//! Grounded in `original_source/mm.c`'s `coalesce` (the four-case table
//! this follows verbatim) and in the remove-then-re-grow shape of
//! `merge_scan_neighbors`/`merge` in the teacher's `mem/vmalloc/kheap.rs`.

use crate::boundary;
use crate::index;

/// Merges a freshly-freed block `b` — already marked free in its own
/// header/footer, but **not yet reachable from the index** — with any
/// free physical neighbors, removing them from the index first. Returns
/// the payload pointer of the (possibly grown, possibly relocated to the
/// left) merged block. Does not insert the result into the index; callers
/// ([`crate::alloc_core::free`], [`crate::realloc::realloc`]) do that.
///
/// | prev | next | action |
/// |------|------|--------|
/// | used | used | no merge |
/// | used | free | absorb next |
/// | free | used | absorb into prev, `b` becomes `prev` |
/// | free | free | absorb both |
///
/// # Safety
///
/// `b` must be a payload pointer to a block whose header/footer already
/// say "free" but which no bin currently reaches (L2 would otherwise be
/// violated: reachable from two places at once during the merge).
pub unsafe fn coalesce(b: *mut u8) -> *mut u8 {
    let next = boundary::next_block(b);
    let prev_alloc = boundary::unpack_alloc(boundary::read_prev_footer(b));
    let next_alloc = boundary::alloc_of_block(next);
    let size = boundary::size_of_block(b);

    match (prev_alloc, next_alloc) {
        (true, true) => b,
        (true, false) => {
            index::remove(next);
            let grown = size + 2 * crate::config::WORD + boundary::size_of_block(next);
            boundary::set_header_footer(b, grown, false);
            b
        }
        (false, true) => {
            let prev = boundary::prev_block(b);
            index::remove(prev);
            let grown = size + 2 * crate::config::WORD + boundary::size_of_block(prev);
            boundary::set_header_footer(prev, grown, false);
            prev
        }
        (false, false) => {
            let prev = boundary::prev_block(b);
            index::remove(prev);
            index::remove(next);
            let grown = boundary::size_of_block(prev)
                + boundary::size_of_block(next)
                + 4 * crate::config::WORD
                + size;
            boundary::set_header_footer(prev, grown, false);
            prev
        }
    }
}
