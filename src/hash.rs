//! 32-bit hashing
//!
//! Multiplicative/xor mixing functions built on the murmur constant, and the
//! [`Hashable`] capability that [`ChainedHashSet`](crate::ChainedHashSet)
//! requires of its items and lookup keys.

use std::rc::Rc;

pub const MURMUR_CONST: u32 = 0x5bd1e995;

/// Seed used by [`murmurhash`] when the caller has no preference
pub const DEFAULT_SEED: u32 = 0xceed;

/// Make every bit of `a` depend on every other bit
#[inline]
pub fn mix1(a: &mut u32) {
    *a ^= !*a >> 13;
    *a = a.wrapping_mul(MURMUR_CONST);
    *a ^= *a >> 15;
}

#[inline]
pub fn hash1(mut a: u32) -> u32 {
    mix1(&mut a);
    a
}

/// Mix `b` into `a` (but not the other way around)
#[inline]
pub fn mix2(a: &mut u32, mut b: u32) {
    b = b.wrapping_mul(MURMUR_CONST);
    b ^= b >> 24;
    b = b.wrapping_mul(MURMUR_CONST);
    *a = a.wrapping_mul(MURMUR_CONST);
    *a ^= b;
}

#[inline]
pub fn hash2(mut a: u32, b: u32) -> u32 {
    mix2(&mut a, b);
    a
}

/// Hash a slice of words
pub fn murmurhash(words: &[u32], seed: u32) -> u32 {
    let mut hash = seed ^ words.len() as u32;
    for &word in words {
        mix2(&mut hash, word);
    }
    mix1(&mut hash);
    hash
}

/// Hash a byte string, packing it little-endian into words.
///
/// The byte length seeds the state so zero-padded tails do not collide.
pub fn murmurhash_bytes(bytes: &[u8], seed: u32) -> u32 {
    let mut hash = seed ^ bytes.len() as u32;
    let mut chunks = bytes.chunks_exact(4);
    for chunk in &mut chunks {
        mix2(&mut hash, u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }
    let tail = chunks.remainder();
    if !tail.is_empty() {
        let mut word = [0u8; 4];
        word[..tail.len()].copy_from_slice(tail);
        mix2(&mut hash, u32::from_le_bytes(word));
    }
    mix1(&mut hash);
    hash
}

/// A value with a deterministic 32-bit hash.
///
/// Items stored in a [`ChainedHashSet`](crate::ChainedHashSet) implement this
/// together with `Eq`. Lookup keys implement it and must hash identically to
/// the items they compare equal to.
pub trait Hashable {
    fn hash32(&self) -> u32;
}

macro_rules! impl_hashable_small_int {
    ($($t:ty),*) => {
        $(
            impl Hashable for $t {
                #[inline]
                fn hash32(&self) -> u32 {
                    hash1(*self as u32)
                }
            }
        )*
    };
}

macro_rules! impl_hashable_wide_int {
    ($($t:ty),*) => {
        $(
            impl Hashable for $t {
                #[inline]
                fn hash32(&self) -> u32 {
                    let value = *self as u64;
                    murmurhash(&[value as u32, (value >> 32) as u32], DEFAULT_SEED)
                }
            }
        )*
    };
}

impl_hashable_small_int!(u8, u16, u32, i8, i16, i32);
impl_hashable_wide_int!(u64, i64, usize, isize);

impl Hashable for bool {
    #[inline]
    fn hash32(&self) -> u32 {
        hash1(*self as u32)
    }
}

impl Hashable for char {
    #[inline]
    fn hash32(&self) -> u32 {
        hash1(*self as u32)
    }
}

impl Hashable for str {
    fn hash32(&self) -> u32 {
        murmurhash_bytes(self.as_bytes(), DEFAULT_SEED)
    }
}

impl Hashable for String {
    fn hash32(&self) -> u32 {
        self.as_str().hash32()
    }
}

impl Hashable for [u8] {
    fn hash32(&self) -> u32 {
        murmurhash_bytes(self, DEFAULT_SEED)
    }
}

impl Hashable for Vec<u8> {
    fn hash32(&self) -> u32 {
        self.as_slice().hash32()
    }
}

impl<T: Hashable + ?Sized> Hashable for &T {
    #[inline]
    fn hash32(&self) -> u32 {
        (**self).hash32()
    }
}

impl<T: Hashable + ?Sized> Hashable for &mut T {
    #[inline]
    fn hash32(&self) -> u32 {
        (**self).hash32()
    }
}

impl<T: Hashable + ?Sized> Hashable for Box<T> {
    #[inline]
    fn hash32(&self) -> u32 {
        (**self).hash32()
    }
}

impl<T: Hashable + ?Sized> Hashable for Rc<T> {
    #[inline]
    fn hash32(&self) -> u32 {
        (**self).hash32()
    }
}
