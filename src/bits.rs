use std::fmt::Debug;
use std::ops::{Shl, Shr};

/// Sealed marker for the unsigned integer types a [`FredkinTrie`](crate::FredkinTrie) can be
/// keyed by. Only `u32` and `u64` are provided; both have a hardware leading-zero-count
/// instruction on every platform we target.
pub trait TrieKey:
    Copy + Clone + Debug + Default + Eq + Ord + Shl<u32, Output = Self> + Shr<u32, Output = Self> + private::Sealed
{
    /// Total number of bits, and so the number of root slots in the head.
    const BITS: u32;
    const ZERO: Self;
    const ONE: Self;
    const MAX: usize;

    fn to_usize(self) -> usize;
    fn bit(self, i: u32) -> bool;
    fn leading_zeros(self) -> u32;
}

mod private {
    pub trait Sealed {}
    impl Sealed for u32 {}
    impl Sealed for u64 {}
}

impl TrieKey for u32 {
    const BITS: u32 = 32;
    const ZERO: Self = 0;
    const ONE: Self = 1;
    const MAX: usize = u32::MAX as usize;

    fn to_usize(self) -> usize { self as usize }
    fn bit(self, i: u32) -> bool { (self >> i) & 1 == 1 }
    fn leading_zeros(self) -> u32 { u32::leading_zeros(self) }
}

impl TrieKey for u64 {
    const BITS: u32 = 64;
    const ZERO: Self = 0;
    const ONE: Self = 1;
    const MAX: usize = usize::MAX;

    fn to_usize(self) -> usize { self as usize }
    fn bit(self, i: u32) -> bool { (self >> i) & 1 == 1 }
    fn leading_zeros(self) -> u32 { u64::leading_zeros(self) }
}

/// Index of the most significant set bit of `k`, or `0` when `k == 0`.
///
/// This is a hotspot: every insert, find and remove starts by picking a root slot with this
/// function. `leading_zeros` compiles to a single `bsr`/`clz`-family instruction on every target
/// we care about, so there's no portable fallback branch here.
#[inline]
pub fn highest_set_bit<K: TrieKey>(k: K) -> u32 {
    if k == K::ZERO {
        0
    } else {
        K::BITS - 1 - k.leading_zeros()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn zero_is_bit_zero() {
        assert_eq!(highest_set_bit(0u32), 0);
        assert_eq!(highest_set_bit(0u64), 0);
    }

    #[test]
    fn powers_of_two() {
        for i in 0..32 {
            assert_eq!(highest_set_bit(1u32 << i), i);
        }
        for i in 0..64 {
            assert_eq!(highest_set_bit(1u64 << i), i);
        }
    }

    #[test]
    fn mixed_values() {
        assert_eq!(highest_set_bit(5u32), 2); // 0b101
        assert_eq!(highest_set_bit(9u32), 3); // 0b1001
        assert_eq!(highest_set_bit(u32::MAX), 31);
        assert_eq!(highest_set_bit(u64::MAX), 63);
    }
}
