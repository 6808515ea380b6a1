//! Tuning constants and their derived values.
//!
//! Only [`ALIGNMENT`], [`MAX_SIZE`] and the debug level (via the `checker`
//! feature) are meant to be adjusted. Everything else here is computed from
//! those two so the heap layout, bin count and trie depth stay consistent.

use core::mem::size_of;

/// Byte alignment of every block payload. Must be a power of two and must
/// divide `2 * WORD`.
pub const ALIGNMENT: usize = 8;

/// Machine word size, in bytes. A [`FreeNode`](crate::index::node::FreeNode)
/// overlay needs four of these to fit in the smallest payload.
pub const WORD: usize = size_of::<usize>();

/// Number of bits in a word, used for the MSB-first trie descent.
pub const WORD_BITS: u32 = (WORD * 8) as u32;

/// Largest payload size this allocator will ever hand out, aligned.
///
/// `2^28 - ALIGNMENT`, matching the compile-time ceiling spec.md fixes (the
/// point past which a real allocator would hand the request to `mmap`
/// instead).
pub const MAX_SIZE: usize = (1usize << 28) - ALIGNMENT;

/// Rounds `size` up to the next multiple of [`ALIGNMENT`].
#[inline]
pub const fn align_up(size: usize) -> usize {
    (size + (ALIGNMENT - 1)) & !(ALIGNMENT - 1)
}

/// Smallest payload a block may have: it must be able to hold the four-word
/// free-node overlay (`next`, `children[0]`, `children[1]`, `back`).
pub const MIN_SIZE: usize = align_up(4 * WORD);

/// `clz` over a full machine word, used both to pick a size's bin and to
/// compute the bit offset the trie descent starts from.
#[inline]
pub const fn clz(x: usize) -> u32 {
    if x == 0 {
        WORD_BITS
    } else {
        x.leading_zeros()
    }
}

/// Bit position of the leading 1 of [`MAX_SIZE`]; bin 0's implicit leading
/// bit lives here.
pub const BIN_BIT_OFFSET: u32 = clz(MAX_SIZE);

/// Number of size bins: one per bit position between [`MAX_SIZE`]'s leading
/// bit and [`MIN_SIZE`]'s leading bit, inclusive.
pub const BIN_COUNT: usize = (1 + clz(MIN_SIZE) - BIN_BIT_OFFSET) as usize;

/// Returns the bin index for a free or requested size `s`.
///
/// Bin 0 holds the largest sizes, bin `BIN_COUNT - 1` the smallest. Two
/// sizes land in the same bin iff their most-significant set bit is in the
/// same position.
#[inline]
pub const fn bin_of(s: usize) -> usize {
    (clz(s) - BIN_BIT_OFFSET) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_size_fits_free_node_overlay() {
        assert!(MIN_SIZE >= 4 * WORD);
        assert_eq!(MIN_SIZE % ALIGNMENT, 0);
    }

    #[test]
    fn bin_of_is_monotonic_decreasing_in_size() {
        assert_eq!(bin_of(MAX_SIZE), 0);
        assert!(bin_of(MIN_SIZE) < BIN_COUNT);
        assert!(bin_of(MIN_SIZE) >= bin_of(MAX_SIZE));
    }

    #[test]
    fn align_up_is_idempotent() {
        for n in [0usize, 1, 7, 8, 9, 4095, 4096] {
            let a = align_up(n);
            assert_eq!(a % ALIGNMENT, 0);
            assert_eq!(align_up(a), a);
        }
    }
}
