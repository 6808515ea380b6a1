//! Boundary-tag layer (component A).
//!
//! Pure, allocation-free read/write helpers over a single stored word's bit
//! layout and over the header/footer pair that brackets every block. These
//! are the only places in the crate that know the on-disk (on-heap) byte
//! layout from spec.md §6:
//!
//! ```text
//!  bit 0    : allocated (1=used, 0=free)
//!  bits 1-2 : reserved, zero
//!  bits 3-W : size in bytes (multiple of 8), 0 for sentinels
//! ```
//!
//! Every function here has the same precondition: any `*mut u8` passed in
//! is a payload pointer into a block that actually exists in the managed
//! heap (i.e. its header/footer were written by [`crate::heap`] or
//! [`crate::alloc_core`]). None of these functions allocate or touch the
//! free-list index; grounded in the `HEADER`/`FOOTER`/`NEXT_BLKP`/
//! `PREV_BLKP` macros of `original_source/mm.c` and in the bit-packing
//! style of `AllocHeader` in the teacher's `mem/vmalloc/kheap.rs`.

use crate::config::WORD;

const ALLOC_BIT: usize = 0b1;
const SIZE_MASK: usize = !0b111;

/// Packs a block size and allocated flag into one stored word.
#[inline]
pub const fn pack(size: usize, alloc: bool) -> usize {
    (size & SIZE_MASK) | (alloc as usize)
}

/// Extracts the size field from a stored word.
#[inline]
pub const fn unpack_size(word: usize) -> usize {
    word & SIZE_MASK
}

/// Extracts the allocated flag from a stored word.
#[inline]
pub const fn unpack_alloc(word: usize) -> bool {
    word & ALLOC_BIT != 0
}

/// Returns a pointer to `p`'s header word (the word immediately preceding
/// the payload).
///
/// # Safety
///
/// `p` must point one word past a valid header within the managed heap.
#[inline]
pub unsafe fn header_ptr(p: *mut u8) -> *mut usize {
    (p as *mut usize).offset(-1)
}

/// Returns a pointer to the footer word of the previous physical block
/// (the word two slots behind `p`), used to inspect the left neighbor
/// without first computing its size.
///
/// # Safety
///
/// `p` must not be the first block in the heap (there must be a real
/// footer behind its header).
#[inline]
pub unsafe fn prev_footer_ptr(p: *mut u8) -> *mut usize {
    (p as *mut usize).offset(-2)
}

/// Returns a pointer to `p`'s footer word, given its payload size.
///
/// # Safety
///
/// `p` must point to a block of exactly `size` payload bytes within the
/// managed heap.
#[inline]
pub unsafe fn footer_ptr(p: *mut u8, size: usize) -> *mut usize {
    p.add(size) as *mut usize
}

/// Reads `p`'s header word.
///
/// # Safety
/// See [`header_ptr`].
#[inline]
pub unsafe fn read_header(p: *mut u8) -> usize {
    *header_ptr(p)
}

/// Reads the word stored in the previous block's footer slot.
///
/// # Safety
/// See [`prev_footer_ptr`].
#[inline]
pub unsafe fn read_prev_footer(p: *mut u8) -> usize {
    *prev_footer_ptr(p)
}

/// Size of the block whose payload starts at `p`.
///
/// # Safety
/// See [`header_ptr`].
#[inline]
pub unsafe fn size_of_block(p: *mut u8) -> usize {
    unpack_size(read_header(p))
}

/// Whether the block whose payload starts at `p` is allocated.
///
/// # Safety
/// See [`header_ptr`].
#[inline]
pub unsafe fn alloc_of_block(p: *mut u8) -> bool {
    unpack_alloc(read_header(p))
}

/// Writes matching header and footer words for a block of `size` bytes,
/// restoring invariant H1 (header == footer) for that block. Does not
/// touch neighboring blocks.
///
/// # Safety
///
/// `p .. p + size + WORD` (the header slot, payload, and footer slot) must
/// lie within the managed heap and not alias any live free-list pointers
/// the caller still needs.
#[inline]
pub unsafe fn set_header_footer(p: *mut u8, size: usize, alloc: bool) {
    let word = pack(size, alloc);
    *header_ptr(p) = word;
    *footer_ptr(p, size) = word;
}

/// Returns the payload pointer of the block physically following `p`.
///
/// # Safety
///
/// `p` must be a valid block and the heap's epilogue must exist past it
/// (so the returned pointer is never past the managed region).
#[inline]
pub unsafe fn next_block(p: *mut u8) -> *mut u8 {
    p.add(size_of_block(p) + 2 * WORD)
}

/// Returns the payload pointer of the block physically preceding `p`.
///
/// # Safety
///
/// `p` must not be the first block after the prologue (there must be a
/// real, in-bounds previous block to walk back to).
#[inline]
pub unsafe fn prev_block(p: *mut u8) -> *mut u8 {
    let prev_size = unpack_size(read_prev_footer(p));
    p.sub(2 * WORD).sub(prev_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_roundtrips() {
        for &(size, alloc) in &[(0usize, true), (8, false), (4096, true), (65528, false)] {
            let w = pack(size, alloc);
            assert_eq!(unpack_size(w), size);
            assert_eq!(unpack_alloc(w), alloc);
        }
    }

    #[test]
    fn header_footer_roundtrip_in_a_byte_buffer() {
        // header | payload(32) | footer, plus one leading guard word so
        // header_ptr's offset(-1) stays in bounds.
        let mut buf = [0usize; 1 + 1 + 4 + 1];
        let base = buf.as_mut_ptr();
        unsafe {
            let payload = base.add(1) as *mut u8;
            set_header_footer(payload, 32, true);
            assert_eq!(size_of_block(payload), 32);
            assert!(alloc_of_block(payload));
            assert_eq!(read_header(payload), *footer_ptr(payload, 32));
        }
    }
}
