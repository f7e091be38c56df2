//! Dense bit vector
//!
//! Bits are packed into `u64` words, least significant bit first. The storage
//! may hold more words than the bit count needs; every bit at or past `bits()`
//! is kept at zero so whole-word scans and comparisons never see stale data.
//!
//! # Layout
//!
//! ```text
//! bits = 70, words = 2 (storage may be longer)
//!
//! word 0: [ bit 63 ............................ bit 0 ]
//! word 1: [ 0 0 0 ... 0 0 | bit 69 ...... bit 64 ]
//!           padding (zero)
//! ```
//!
//! Index arguments must be below `bits()`. Reading or writing past the end is
//! a caller bug and panics.

mod cursor;
mod persist;

pub use cursor::{Cursor, CursorMut};

use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign};

/// Number of bits held by one storage word
pub const WORD_BITS: usize = 64;

const SHIFT: usize = 6;
const MASK: usize = WORD_BITS - 1;

/// A growable vector of bits
#[derive(Clone, Default)]
pub struct BitVector {
    /// Number of addressable bits
    bits: usize,
    /// Backing words, possibly longer than `used_words()`
    data: Vec<u64>,
}

impl BitVector {
    /// Create an empty bit vector
    pub fn new() -> Self {
        Self {
            bits: 0,
            data: Vec::new(),
        }
    }

    /// Create a bit vector holding `bits` zero bits
    pub fn with_bits(bits: usize) -> Self {
        let mut bv = Self::new();
        bv.resize(bits);
        bv
    }

    /// Number of words needed to store `bits` bits
    #[inline]
    pub fn words_for_bits(bits: usize) -> usize {
        (bits >> SHIFT) + ((bits & MASK) != 0) as usize
    }

    /// Replace the storage with exactly enough zeroed words for `bits` bits
    pub fn resize(&mut self, bits: usize) {
        self.data = vec![0; Self::words_for_bits(bits)];
        self.bits = bits;
    }

    /// Make room for `bits` bits and set the bit count to `bits`.
    ///
    /// Storage is only reallocated when it is too small, and is never
    /// shrunk. Contents are not preserved across a reallocation; callers
    /// that need a clean slate follow up with [`BitVector::zero`].
    /// Returns the number of words in use afterwards.
    pub fn accommodate(&mut self, bits: usize) -> usize {
        let words = Self::words_for_bits(bits);
        if words > self.data.len() {
            self.data = vec![0; words];
        }
        self.bits = bits;
        self.clear_padding();
        words
    }

    /// Clear every bit
    pub fn zero(&mut self) {
        self.data.iter_mut().for_each(|w| *w = 0);
    }

    /// Release storage words beyond those in use. Returns the words kept.
    pub fn shrink(&mut self) -> usize {
        let used = self.used_words();
        self.data.truncate(used);
        self.data.shrink_to_fit();
        used
    }

    /// Number of addressable bits
    #[inline]
    pub fn bits(&self) -> usize {
        self.bits
    }

    /// Number of storage words, including unused ones
    #[inline]
    pub fn words(&self) -> usize {
        self.data.len()
    }

    /// Number of storage words covering `bits()`
    #[inline]
    pub fn used_words(&self) -> usize {
        Self::words_for_bits(self.bits)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Read bit `i`
    #[inline]
    pub fn get(&self, i: usize) -> bool {
        self.check_index(i);
        (self.data[i >> SHIFT] >> (i & MASK)) & 1 == 1
    }

    /// Set bit `i` to one
    #[inline]
    pub fn set(&mut self, i: usize) {
        self.check_index(i);
        self.data[i >> SHIFT] |= 1u64 << (i & MASK);
    }

    /// Set bit `i` to zero
    #[inline]
    pub fn unset(&mut self, i: usize) {
        self.check_index(i);
        self.data[i >> SHIFT] &= !(1u64 << (i & MASK));
    }

    /// Set bit `i` to `value`
    #[inline]
    pub fn set_to(&mut self, i: usize, value: bool) {
        self.check_index(i);
        let word = &mut self.data[i >> SHIFT];
        let bit = i & MASK;
        *word = (*word & !(1u64 << bit)) | ((value as u64) << bit);
    }

    /// Exchange bits `i` and `j`
    pub fn swap(&mut self, i: usize, j: usize) {
        let temp = self.get(i);
        self.set_to(i, self.get(j));
        self.set_to(j, temp);
    }

    /// Number of set bits
    pub fn count_ones(&self) -> usize {
        self.data[..self.used_words()]
            .iter()
            .map(|w| w.count_ones() as usize)
            .sum()
    }

    /// Index of the lowest set bit, or `bits()` if no bit is set
    pub fn first_set(&self) -> usize {
        let used = self.used_words();
        match self.data[..used].iter().position(|&w| w != 0) {
            Some(w) => (w << SHIFT) + self.data[w].trailing_zeros() as usize,
            None => self.bits,
        }
    }

    /// Index of the highest set bit, or `bits()` if no bit is set
    pub fn last_set(&self) -> usize {
        let used = self.used_words();
        match self.data[..used].iter().rposition(|&w| w != 0) {
            Some(w) => (w << SHIFT) + MASK - self.data[w].leading_zeros() as usize,
            None => self.bits,
        }
    }

    /// Index of the first set bit at or after `from`, or `bits()`
    pub fn next_set_from(&self, from: usize) -> usize {
        self.scan_from(from, false)
    }

    /// Index of the first unset bit at or after `from`, or `bits()`
    pub fn next_unset_from(&self, from: usize) -> usize {
        self.scan_from(from, true)
    }

    /// Iterate over the indices of set bits in ascending order
    pub fn ones(&self) -> Ones<'_> {
        Ones {
            bits: self,
            next: self.first_set(),
        }
    }

    /// Cursor positioned at bit `i`
    pub fn cursor(&self, i: usize) -> Cursor<'_> {
        Cursor::new(self, i)
    }

    /// Mutable cursor positioned at bit `i`
    pub fn cursor_mut(&mut self, i: usize) -> CursorMut<'_> {
        CursorMut::new(self, i)
    }

    /// Cursor at the lowest set bit (invalid if none is set)
    pub fn first_set_cursor(&self) -> Cursor<'_> {
        Cursor::new(self, self.first_set())
    }

    /// Cursor at the highest set bit (invalid if none is set)
    pub fn last_set_cursor(&self) -> Cursor<'_> {
        Cursor::new(self, self.last_set())
    }

    fn scan_from(&self, from: usize, invert: bool) -> usize {
        if from >= self.bits {
            return self.bits;
        }
        let used = self.used_words();
        let flip = if invert { !0u64 } else { 0 };
        let mut w = from >> SHIFT;
        let mut word = (self.data[w] ^ flip) & (!0u64 << (from & MASK));
        loop {
            if word != 0 {
                let index = (w << SHIFT) + word.trailing_zeros() as usize;
                // inverted padding bits read as set
                return index.min(self.bits);
            }
            w += 1;
            if w >= used {
                return self.bits;
            }
            word = self.data[w] ^ flip;
        }
    }

    /// Zero the bits past `bits()` in the last used word and all unused words
    fn clear_padding(&mut self) {
        let used = self.used_words();
        let rem = self.bits & MASK;
        if used > 0 && rem != 0 {
            self.data[used - 1] &= (1u64 << rem) - 1;
        }
        self.data[used..].iter_mut().for_each(|w| *w = 0);
    }

    #[inline]
    fn check_index(&self, i: usize) {
        assert!(
            i < self.bits,
            "bit index {} out of range for BitVector of {} bits",
            i,
            self.bits
        );
    }

    fn check_operand(&self, rhs: &BitVector) {
        assert!(
            rhs.data.len() >= self.used_words(),
            "right operand has {} words, need at least {}",
            rhs.data.len(),
            self.used_words()
        );
    }
}

/// Iterator over set bit indices
pub struct Ones<'a> {
    bits: &'a BitVector,
    next: usize,
}

impl Iterator for Ones<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.next >= self.bits.bits() {
            return None;
        }
        let current = self.next;
        self.next = self.bits.next_set_from(current + 1);
        Some(current)
    }
}

impl BitAndAssign<&BitVector> for BitVector {
    fn bitand_assign(&mut self, rhs: &BitVector) {
        self.check_operand(rhs);
        let used = self.used_words();
        for (lhs, rhs) in self.data[..used].iter_mut().zip(&rhs.data) {
            *lhs &= *rhs;
        }
    }
}

impl BitOrAssign<&BitVector> for BitVector {
    fn bitor_assign(&mut self, rhs: &BitVector) {
        self.check_operand(rhs);
        let used = self.used_words();
        for (lhs, rhs) in self.data[..used].iter_mut().zip(&rhs.data) {
            *lhs |= *rhs;
        }
        // rhs may carry bits past our end
        self.clear_padding();
    }
}

impl BitAnd for &BitVector {
    type Output = BitVector;

    fn bitand(self, rhs: &BitVector) -> BitVector {
        let mut result = self.clone();
        result &= rhs;
        result
    }
}

impl BitOr for &BitVector {
    type Output = BitVector;

    fn bitor(self, rhs: &BitVector) -> BitVector {
        let mut result = self.clone();
        result |= rhs;
        result
    }
}

impl PartialEq for BitVector {
    fn eq(&self, other: &Self) -> bool {
        if self.bits != other.bits {
            return false;
        }
        let used = self.used_words();
        self.data[..used] == other.data[..used]
    }
}

impl Eq for BitVector {}

impl fmt::Display for BitVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.bits {
            f.write_str(if self.get(i) { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl fmt::Debug for BitVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BitVector")
            .field("bits", &self.bits)
            .field("set", &self.count_ones())
            .field("pattern", &format_args!("{}", self))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_unset() {
        let mut bv = BitVector::with_bits(130);
        bv.set(0);
        bv.set(64);
        bv.set(129);

        assert!(bv.get(0));
        assert!(bv.get(64));
        assert!(bv.get(129));
        assert!(!bv.get(1));
        assert!(!bv.get(63));

        bv.unset(64);
        assert!(!bv.get(64));
        // neighbours untouched
        assert!(bv.get(0));
        assert!(bv.get(129));
        assert_eq!(bv.count_ones(), 2);
    }

    #[test]
    fn test_words_for_bits() {
        assert_eq!(BitVector::words_for_bits(0), 0);
        assert_eq!(BitVector::words_for_bits(1), 1);
        assert_eq!(BitVector::words_for_bits(64), 1);
        assert_eq!(BitVector::words_for_bits(65), 2);
        assert_eq!(BitVector::words_for_bits(usize::MAX), usize::MAX / 64 + 1);
    }

    #[test]
    fn test_set_to_and_swap() {
        let mut bv = BitVector::with_bits(10);
        bv.set_to(3, true);
        bv.set_to(4, false);
        assert!(bv.get(3));
        assert!(!bv.get(4));

        bv.swap(3, 4);
        assert!(!bv.get(3));
        assert!(bv.get(4));

        bv.set_to(4, false);
        assert_eq!(bv.count_ones(), 0);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_get_out_of_range_panics() {
        let bv = BitVector::with_bits(8);
        bv.get(8);
    }

    #[test]
    fn test_first_and_last_set() {
        let mut bv = BitVector::with_bits(200);
        assert_eq!(bv.first_set(), 200);
        assert_eq!(bv.last_set(), 200);

        bv.set(77);
        assert_eq!(bv.first_set(), 77);
        assert_eq!(bv.last_set(), 77);

        bv.set(5);
        bv.set(190);
        assert_eq!(bv.first_set(), 5);
        assert_eq!(bv.last_set(), 190);

        let empty = BitVector::new();
        assert_eq!(empty.first_set(), 0);
        assert_eq!(empty.last_set(), 0);
    }

    #[test]
    fn test_last_set_in_word_zero() {
        let mut bv = BitVector::with_bits(3);
        bv.set(0);
        assert_eq!(bv.last_set(), 0);
        bv.set(2);
        assert_eq!(bv.last_set(), 2);
    }

    #[test]
    fn test_next_unset_from() {
        let mut bv = BitVector::with_bits(70);
        for i in 0..66 {
            bv.set(i);
        }
        assert_eq!(bv.next_unset_from(0), 66);
        assert_eq!(bv.next_unset_from(67), 67);

        for i in 66..70 {
            bv.set(i);
        }
        // full vector yields the sentinel, not a padding bit
        assert_eq!(bv.next_unset_from(0), 70);
        assert_eq!(bv.next_unset_from(100), 70);
    }

    #[test]
    fn test_next_set_from_and_ones() {
        let mut bv = BitVector::with_bits(150);
        for i in [3, 64, 65, 149] {
            bv.set(i);
        }
        assert_eq!(bv.next_set_from(4), 64);
        assert_eq!(bv.next_set_from(66), 149);
        assert_eq!(bv.ones().collect::<Vec<_>>(), vec![3, 64, 65, 149]);
    }

    #[test]
    fn test_accommodate_clears_padding() {
        let mut bv = BitVector::with_bits(64);
        for i in 0..64 {
            bv.set(i);
        }

        // shrinking the bit count reuses storage but hides the tail
        let words = bv.accommodate(10);
        assert_eq!(words, 1);
        assert_eq!(bv.bits(), 10);
        assert_eq!(bv.count_ones(), 10);
        assert_eq!(bv.next_unset_from(0), 10);

        // growing past the storage reallocates
        bv.accommodate(300);
        assert_eq!(bv.bits(), 300);
        assert!(bv.words() >= 5);
        bv.zero();
        assert_eq!(bv.first_set(), 300);
    }

    #[test]
    fn test_accommodate_never_shrinks_storage() {
        let mut bv = BitVector::with_bits(640);
        assert_eq!(bv.words(), 10);
        bv.accommodate(64);
        assert_eq!(bv.words(), 10);
        assert_eq!(bv.used_words(), 1);

        assert_eq!(bv.shrink(), 1);
        assert_eq!(bv.words(), 1);
    }

    #[test]
    fn test_equality_uses_bit_count_and_used_words() {
        let mut a = BitVector::with_bits(640);
        a.accommodate(70);
        let mut b = BitVector::with_bits(70);
        assert_eq!(a, b);

        a.set(69);
        assert_ne!(a, b);
        b.set(69);
        assert_eq!(a, b);

        let c = BitVector::with_bits(71);
        assert_ne!(BitVector::with_bits(70), c);
    }

    #[test]
    fn test_bitwise_ops() {
        let mut a = BitVector::with_bits(100);
        let mut b = BitVector::with_bits(100);
        a.set(1);
        a.set(70);
        b.set(70);
        b.set(99);

        let and = &a & &b;
        assert_eq!(and.ones().collect::<Vec<_>>(), vec![70]);

        let or = &a | &b;
        assert_eq!(or.ones().collect::<Vec<_>>(), vec![1, 70, 99]);

        a |= &b;
        assert_eq!(a, or);
        a &= &and;
        assert_eq!(a, and);
    }

    #[test]
    fn test_bitor_with_longer_operand_keeps_padding_clear() {
        let mut short = BitVector::with_bits(10);
        let mut long = BitVector::with_bits(64);
        long.set(40);
        short |= &long;
        assert_eq!(short.count_ones(), 0);
        assert_eq!(short.first_set(), 10);
    }

    #[test]
    #[should_panic(expected = "right operand")]
    fn test_bitwise_short_operand_panics() {
        let mut a = BitVector::with_bits(200);
        let b = BitVector::with_bits(10);
        a &= &b;
    }

    #[test]
    fn test_display_and_debug() {
        let mut bv = BitVector::with_bits(5);
        bv.set(0);
        bv.set(3);
        assert_eq!(bv.to_string(), "10010");
        let debug = format!("{:?}", bv);
        assert!(debug.contains("bits: 5"));
        assert!(debug.contains("set: 2"));
    }
}
