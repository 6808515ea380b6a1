//! The free-block overlay: the four words a free block's payload holds
//! (spec.md §3, "Free-block overlay"). [`FreeNode`] is a typed view over
//! those words, never an owner — it is copied around freely (it is just a
//! tagged pointer) and every method is an unsafe read/write through it.
//!
//! Grounded in the `NodeLink`/`Node` split in the teacher's
//! `mem/vmalloc/rbtree.rs` (a wrapper pointer type plus unsafe
//! `get_node`/`get_node_mut` accessors), generalized here because our
//! "node" isn't a separate struct living in an arena — it *is* the free
//! block's payload, per spec.md's "no side arena" requirement.

use core::ptr;

#[repr(C)]
struct NodeLayout {
    next: *mut u8,
    children: [*mut u8; 2],
    back: *mut *mut u8,
}

/// A view over a free block's payload, interpreting its first four words
/// as `next` / `children[0..1]` / `back`.
///
/// # Safety
///
/// Every method assumes `self.0` points to a live free block's payload
/// (i.e. a block at least [`crate::config::MIN_SIZE`] bytes, currently
/// free, within the managed heap). None of them check that on their own.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FreeNode(pub *mut u8);

impl FreeNode {
    #[inline]
    fn layout(self) -> *mut NodeLayout {
        self.0 as *mut NodeLayout
    }

    /// `true` if this view wraps a null pointer (the empty/absent node).
    #[inline]
    pub fn is_null(self) -> bool {
        self.0.is_null()
    }

    /// Reads the same-size stack successor (or null).
    #[inline]
    pub unsafe fn next(self) -> *mut u8 {
        (*self.layout()).next
    }

    #[inline]
    pub unsafe fn set_next(self, v: *mut u8) {
        (*self.layout()).next = v;
    }

    /// Address of this node's `next` field, i.e. the back-slot a
    /// stack-successor's `back` pointer must point to.
    #[inline]
    pub unsafe fn next_slot(self) -> *mut *mut u8 {
        ptr::addr_of_mut!((*self.layout()).next)
    }

    /// Reads trie child `bit` (0 = left, 1 = right).
    #[inline]
    pub unsafe fn child(self, bit: usize) -> *mut u8 {
        (*self.layout()).children[bit]
    }

    #[inline]
    pub unsafe fn set_child(self, bit: usize, v: *mut u8) {
        (*self.layout()).children[bit] = v;
    }

    /// Address of the `children[bit]` field, i.e. the back-slot a child's
    /// `back` pointer must point to.
    #[inline]
    pub unsafe fn child_slot(self, bit: usize) -> *mut *mut u8 {
        ptr::addr_of_mut!((*self.layout()).children[bit])
    }

    /// Reads `back`: the address of the unique incoming slot pointing to
    /// this node (a bin root, a parent's `children[bit]`, or a
    /// stack-predecessor's `next`).
    #[inline]
    pub unsafe fn back(self) -> *mut *mut u8 {
        (*self.layout()).back
    }

    #[inline]
    pub unsafe fn set_back(self, slot: *mut *mut u8) {
        (*self.layout()).back = slot;
    }

    /// Writes `child` into the slot at `slot`, and — if `child` is
    /// non-null — updates `child`'s own `back` to point at that same slot.
    /// Every insert/remove child/next assignment in [`super`] goes through
    /// this helper so L1 (`*(n.back) == n`) can never drift out of sync.
    #[inline]
    pub unsafe fn link(slot: *mut *mut u8, child: *mut u8) {
        *slot = child;
        if !child.is_null() {
            FreeNode(child).set_back(slot);
        }
    }
}
