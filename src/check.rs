//! Consistency checker (component G): debug-only, diagnosis-never-repair.
//!
//! Grounded in `original_source/mm.c`'s `mm_check`/`triecrawl`/
//! `recursive_trie_node_test` family — the teacher has no analogous pass
//! (neither `bmalloc::heap` nor `vmalloc::kheap` ships one), so this is
//! built fresh in the surrounding modules' idiom: a plain function over raw
//! pointers, reporting through [`crate::diag`] exactly as the rest of the
//! crate's error taxonomy does, gated behind the `checker` feature so a
//! release build pays nothing for it.
//!
//! [`check`] never mutates the heap and never panics on a violation; it
//! reports every one it finds through `diag!` and returns `false` if any
//! fired. Callers decide what to do with that (spec.md §7: "write a
//! diagnostic line ... never auto-repair").

use crate::boundary;
use crate::config::{BIN_BIT_OFFSET, BIN_COUNT};
use crate::heap::{HeapSource, EPILOGUE_OFFSET};
use crate::index::node::FreeNode;
use crate::index::{bin_slot, bit_at};

/// Walks the whole managed heap: the physical block chain (component A/B,
/// checking H1 "header == footer" and that no two physically adjacent
/// blocks are both free, which would mean [`crate::coalesce`] missed a
/// merge) and the free-list index (component D, checking L1 "back-pointer
/// points at self", S1/S2 "same-size stack, head-only children", and T1
/// "child bit matches the branch it was filed under"), then cross-checks
/// that both walks agree on how many blocks are free.
///
/// # Safety
///
/// `bins_base` must be the live bin table and `source` the [`HeapSource`]
/// it was built from; the heap must not be concurrently mutated during the
/// walk (component G assumes the same single-threaded access spec.md §5
/// assumes of the whole crate).
pub unsafe fn check<H: HeapSource>(bins_base: *mut u8, source: &H) -> bool {
    let mut ok = true;
    let physical_free = walk_physical(bins_base, source, &mut ok);
    let indexed_free = walk_index(bins_base, &mut ok);

    if physical_free != indexed_free {
        crate::diag!(
            "checker: free block count mismatch: physical={physical_free} indexed={indexed_free}"
        );
        ok = false;
    }

    ok
}

/// Walks every physical block from the first one past the prologue up to
/// the epilogue, checking H1 and the no-adjacent-free-blocks law. Returns
/// the number of free blocks seen.
unsafe fn walk_physical<H: HeapSource>(bins_base: *mut u8, source: &H, ok: &mut bool) -> usize {
    let mut cur = bins_base.add(EPILOGUE_OFFSET + crate::config::WORD);
    let mut free_count = 0usize;
    let mut prev_was_free = false;

    loop {
        if cur as *const u8 >= source.heap_hi() {
            crate::diag!("checker: block walk ran past heap_hi without an epilogue");
            *ok = false;
            break;
        }

        let header = boundary::read_header(cur);
        let size = boundary::unpack_size(header);
        if size == 0 {
            if !boundary::unpack_alloc(header) {
                crate::diag!("checker: epilogue sentinel is not marked allocated");
                *ok = false;
            }
            break;
        }

        let footer = *boundary::footer_ptr(cur, size);
        if footer != header {
            crate::diag!("checker: header/footer mismatch at {cur:p} (H1)");
            *ok = false;
        }

        let alloc = boundary::unpack_alloc(header);
        if !alloc {
            free_count += 1;
            if prev_was_free {
                crate::diag!("checker: two physically adjacent free blocks at {cur:p}");
                *ok = false;
            }
        }
        prev_was_free = !alloc;

        cur = boundary::next_block(cur);
    }

    free_count
}

/// Crawls every bin's trie, checking L1 at every node visited (head and
/// stack), S1 (stack members share the head's size), S2 (only the head
/// carries trie children), and T1 (a child's size has the bit this node's
/// depth expects). Returns the number of free blocks reached.
unsafe fn walk_index(bins_base: *mut u8, ok: &mut bool) -> usize {
    let mut total = 0usize;
    for bin in 0..BIN_COUNT {
        let root = *bin_slot(bins_base, bin);
        if root.is_null() {
            continue;
        }
        let depth = 1 + BIN_BIT_OFFSET + bin as u32;
        verify_node(FreeNode(root), depth, ok, &mut total);
    }
    total
}

/// Verifies the stack headed at `node` and recurses into its trie children.
unsafe fn verify_node(node: FreeNode, depth: u32, ok: &mut bool, total: &mut usize) {
    verify_back(node.0, node.back(), ok);
    let head_size = boundary::size_of_block(node.0);
    *total += 1;

    let mut s = node.next();
    while !s.is_null() {
        let snode = FreeNode(s);
        verify_back(s, snode.back(), ok);

        if boundary::size_of_block(s) != head_size {
            crate::diag!("checker: stack member at {s:p} has a different size than its head (S1)");
            *ok = false;
        }
        if !snode.child(0).is_null() || !snode.child(1).is_null() {
            crate::diag!("checker: interior stack node at {s:p} carries trie children (S2)");
            *ok = false;
        }

        *total += 1;
        s = snode.next();
    }

    for bit in 0..2 {
        let child = node.child(bit);
        if child.is_null() {
            continue;
        }
        let child_size = boundary::size_of_block(child);
        if bit_at(child_size, depth) != bit {
            crate::diag!("checker: child at {child:p} filed under the wrong bit (T1)");
            *ok = false;
        }
        verify_node(FreeNode(child), depth + 1, ok, total);
    }
}

/// Checks L1: the slot `n` claims as its back-pointer must actually hold
/// `n`'s own address.
unsafe fn verify_back(n: *mut u8, back: *mut *mut u8, ok: &mut bool) {
    if back.is_null() || *back != n {
        crate::diag!("checker: back-pointer at {n:p} does not point at itself (L1)");
        *ok = false;
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use crate::alloc_core;
    use crate::heap::{self, VecHeapSource};
    use crate::index;

    #[test]
    fn passes_after_a_normal_alloc_free_churn() {
        unsafe {
            let mut src = VecHeapSource::new(1 << 16);
            let base = heap::init(&mut src).unwrap();
            let mut epilogue = base.add(heap::EPILOGUE_OFFSET) as *mut usize;

            let a = alloc_core::allocate(base, &mut epilogue, &mut src, 64);
            let b = alloc_core::allocate(base, &mut epilogue, &mut src, 128);
            let c = alloc_core::allocate(base, &mut epilogue, &mut src, 32);
            alloc_core::free(base, b);
            let _d = alloc_core::allocate(base, &mut epilogue, &mut src, 100);
            alloc_core::free(base, a);
            alloc_core::free(base, c);

            assert!(check(base, &src));
        }
    }

    #[test]
    fn detects_a_corrupted_footer() {
        unsafe {
            let mut src = VecHeapSource::new(1 << 16);
            let base = heap::init(&mut src).unwrap();
            let epilogue = base.add(heap::EPILOGUE_OFFSET) as *mut usize;
            let bp = heap::extend(&mut src, epilogue, 64).unwrap();
            index::insert(base, bp);

            *boundary::footer_ptr(bp, 64) = boundary::pack(64, true);

            assert!(!check(base, &src));
        }
    }

    #[test]
    fn detects_two_adjacent_free_blocks_left_unmerged() {
        unsafe {
            let mut src = VecHeapSource::new(1 << 16);
            let base = heap::init(&mut src).unwrap();
            let mut epilogue = base.add(heap::EPILOGUE_OFFSET) as *mut usize;
            let a = heap::extend(&mut src, epilogue, 64).unwrap();
            epilogue = boundary::next_block(a) as *mut usize;
            let b = heap::extend(&mut src, epilogue, 64).unwrap();
            index::insert(base, a);
            index::insert(base, b);

            assert!(!check(base, &src));
        }
    }
}
