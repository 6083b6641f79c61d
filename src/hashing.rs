//! Hash builders and the 32-bit hash reduction used by the tables.
//!
//! Every table in this crate works on 32-bit hashes: the low bits select a
//! group and a byte further up becomes the slot's tag. [`hash32`] folds any
//! [`BuildHasher`] output down to that width.
//!
//! [`UniversalHashBuilder`] is a seeded multiply-add hash modulo the Mersenne
//! prime `2^31 - 1`. It is cheap, deterministic for fixed keys, and useful when
//! reproducible table layouts matter more than DoS resistance.

use core::hash::BuildHasher;
use core::hash::Hash;
use core::hash::Hasher;

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// Default hasher for [`HashMap`](crate::HashMap) and
        /// [`HashSet`](crate::HashSet).
        pub type DefaultHashBuilder = foldhash::fast::RandomState;
    } else if #[cfg(feature = "std")] {
        /// Default hasher for [`HashMap`](crate::HashMap) and
        /// [`HashSet`](crate::HashSet).
        pub type DefaultHashBuilder = std::hash::RandomState;
    } else {
        /// Default hasher for [`HashMap`](crate::HashMap) and
        /// [`HashSet`](crate::HashSet).
        pub type DefaultHashBuilder = UniversalHashBuilder;
    }
}

/// Hashes `value` with `builder` and folds the result to 32 bits.
///
/// Both halves of the 64-bit hash are mixed in, so hashers that concentrate
/// entropy in the high bits still spread across groups.
///
/// # Examples
///
/// ```rust
/// use grouped_hash::hashing::UniversalHashBuilder;
/// use grouped_hash::hashing::hash32;
///
/// let builder = UniversalHashBuilder::with_keys(3, 7);
/// assert_eq!(hash32(&builder, &5u32), 22);
/// ```
#[inline(always)]
pub fn hash32<Q, S>(builder: &S, value: &Q) -> u32
where
    Q: Hash + ?Sized,
    S: BuildHasher,
{
    let hash = builder.hash_one(value);
    (hash ^ (hash >> 32)) as u32
}

const MERSENNE_EXPONENT: u32 = 31;
const MERSENNE_PRIME: u64 = (1 << MERSENNE_EXPONENT) - 1;

/// Reduces `x` modulo `2^31 - 1` without a division.
#[inline(always)]
fn mod_mersenne(x: u64) -> u32 {
    let x = (x >> MERSENNE_EXPONENT) + (x & MERSENNE_PRIME);
    let x = (x >> MERSENNE_EXPONENT) + (x & MERSENNE_PRIME);
    (if x >= MERSENNE_PRIME { x - MERSENNE_PRIME } else { x }) as u32
}

/// Builds [`UniversalHasher`]s from a pair of keys in `1..=2^31 - 1`.
///
/// A single 32-bit word `x` hashes to `(multiplier * x + increment) mod
/// (2^31 - 1)`. Longer inputs chain that step over each word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniversalHashBuilder {
    multiplier: u32,
    increment: u32,
}

impl UniversalHashBuilder {
    /// Creates a builder with fixed keys.
    ///
    /// Keys are reduced modulo `2^31 - 1`; a multiplier that reduces to zero
    /// is replaced with one so the hash never degenerates to a constant.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use core::hash::BuildHasher;
    ///
    /// use grouped_hash::hashing::UniversalHashBuilder;
    ///
    /// let a = UniversalHashBuilder::with_keys(17, 4);
    /// let b = UniversalHashBuilder::with_keys(17, 4);
    /// assert_eq!(a.hash_one("key"), b.hash_one("key"));
    /// ```
    pub fn with_keys(multiplier: u32, increment: u32) -> Self {
        let multiplier = mod_mersenne(u64::from(multiplier)).max(1);
        let increment = mod_mersenne(u64::from(increment));
        Self {
            multiplier,
            increment,
        }
    }

    /// Draws both keys uniformly from `1..=2^31 - 1`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use grouped_hash::hashing::UniversalHashBuilder;
    /// use rand::SeedableRng;
    /// use rand::rngs::SmallRng;
    ///
    /// let mut rng = SmallRng::seed_from_u64(7);
    /// let builder = UniversalHashBuilder::from_rng(&mut rng);
    /// assert_ne!(builder.multiplier(), 0);
    /// ```
    pub fn from_rng<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let prime = MERSENNE_PRIME as u32;
        Self {
            multiplier: rng.random_range(1..=prime),
            increment: rng.random_range(1..=prime),
        }
    }

    /// The multiplicative key.
    pub fn multiplier(&self) -> u32 {
        self.multiplier
    }

    /// The additive key.
    pub fn increment(&self) -> u32 {
        self.increment
    }
}

impl Default for UniversalHashBuilder {
    /// Seeds the keys from the operating system's entropy source.
    fn default() -> Self {
        Self::from_rng(&mut SmallRng::from_os_rng())
    }
}

impl BuildHasher for UniversalHashBuilder {
    type Hasher = UniversalHasher;

    fn build_hasher(&self) -> Self::Hasher {
        UniversalHasher {
            multiplier: self.multiplier,
            increment: self.increment,
            state: 0,
        }
    }
}

/// The [`Hasher`] produced by [`UniversalHashBuilder`].
#[derive(Debug, Clone)]
pub struct UniversalHasher {
    multiplier: u32,
    increment: u32,
    state: u32,
}

impl UniversalHasher {
    #[inline(always)]
    fn absorb(&mut self, word: u32) {
        let x = u64::from(self.multiplier) * u64::from(word ^ self.state)
            + u64::from(self.increment);
        self.state = mod_mersenne(x);
    }
}

impl Hasher for UniversalHasher {
    fn write(&mut self, bytes: &[u8]) {
        let mut chunks = bytes.chunks_exact(4);
        for chunk in &mut chunks {
            let mut word = [0; 4];
            word.copy_from_slice(chunk);
            self.absorb(u32::from_le_bytes(word));
        }

        let rest = chunks.remainder();
        if !rest.is_empty() {
            let mut word = [0; 4];
            word[..rest.len()].copy_from_slice(rest);
            // Tag the tail with its length so "a" and "a\0" differ.
            self.absorb(u32::from_le_bytes(word) ^ ((rest.len() as u32) << 29));
        }
    }

    fn write_u8(&mut self, i: u8) {
        self.absorb(u32::from(i));
    }

    fn write_u16(&mut self, i: u16) {
        self.absorb(u32::from(i));
    }

    fn write_u32(&mut self, i: u32) {
        self.absorb(i);
    }

    fn write_u64(&mut self, i: u64) {
        self.absorb(i as u32);
        self.absorb((i >> 32) as u32);
    }

    fn write_usize(&mut self, i: usize) {
        self.write_u64(i as u64);
    }

    fn finish(&self) -> u64 {
        u64::from(self.state)
    }
}
