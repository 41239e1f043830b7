//! Seeded hash slicing: 5-bit slices of a 32-bit hash, xorshift reseeding.

use std::hash::{BuildHasher, Hash};
use std::sync::OnceLock;

/// Mask extracting one slice.
pub const SLICE_MASK: u32 = 0x1f;

/// Largest slice offset inside one 32-bit hash (six slices of 5 bits).
pub const MAX_OFFSET: u32 = 25;

/// Bits of the hash ever read by the slice stream (offsets 0..=25 cover
/// bits 0..=29; the top two bits are never consumed).
pub const CONSUMED_MASK: u32 = 0x3fff_ffff;

/// Compile-time fallback seed, used only when per-process seeding yields 0.
pub const DEFAULT_SEED: u32 = 0xed55_8ccd;

/// One xorshift step; fixed, since the split algorithm's termination
/// argument depends on the seed schedule.
#[inline]
#[must_use]
pub const fn xorshift(mut seed: u32) -> u32 {
    seed ^= seed << 13;
    seed ^= seed >> 17;
    seed ^= seed << 5;
    seed
}

/// Low 32 bits of a key's hash under `hash_builder`. Only these bits feed
/// the slice stream.
#[inline]
pub fn key_hash<K: Hash, H: BuildHasher>(hash_builder: &H, key: &K) -> u32 {
    hash_builder.hash_one(key) as u32
}

/// The per-process random seed.
///
/// Randomized once per process to defeat adversarial key selection;
/// construct maps through `with_seed` when reproducible layouts are needed.
#[must_use]
pub fn process_seed() -> u32 {
    static SEED: OnceLock<u32> = OnceLock::new();
    *SEED.get_or_init(|| {
        let seed = ahash::RandomState::new().hash_one(0x517c_c1b7_2722_0a95_u64) as u32;
        // Zero is a fixed point of xorshift.
        if seed == 0 {
            DEFAULT_SEED
        } else {
            seed
        }
    })
}

/// Stateful driver over the 5-bit slices of a seeded 32-bit hash.
///
/// Yields `(hash >> offset) & 0x1f` with `offset` stepping 0, 5, .., 25;
/// once the hash is exhausted the seed is advanced by [`xorshift`] and the
/// slice stream restarts on the reseeded hash. For a given key and initial
/// seed the stream is deterministic.
#[derive(Clone, Copy, Debug)]
pub struct HashWalker {
    key_hash: u32,
    seed: u32,
    hash: u32,
    offset: u32,
}

impl HashWalker {
    /// Starts a walker at the root level.
    #[must_use]
    pub const fn new(key_hash: u32, seed: u32) -> Self {
        Self {
            key_hash,
            seed,
            hash: key_hash ^ seed,
            offset: 0,
        }
    }

    /// A walker for a sibling key at this walker's exact depth and seed.
    #[must_use]
    pub const fn fork(&self, key_hash: u32) -> Self {
        Self {
            key_hash,
            seed: self.seed,
            hash: key_hash ^ self.seed,
            offset: self.offset,
        }
    }

    /// The unseeded key hash this walker slices.
    #[must_use]
    pub const fn key_hash(&self) -> u32 {
        self.key_hash
    }

    /// Current 5-bit slice, the logical branch position at this level.
    #[inline]
    #[must_use]
    pub const fn slice(&self) -> u32 {
        (self.hash >> self.offset) & SLICE_MASK
    }

    /// Steps one level deeper, reseeding when the current hash is exhausted.
    #[inline]
    pub fn advance(&mut self) {
        if self.offset < MAX_OFFSET {
            self.offset += crate::node::BITS_PER_LEVEL;
        } else {
            self.seed = xorshift(self.seed);
            self.hash = self.key_hash ^ self.seed;
            self.offset = 0;
        }
    }

    /// Returns `true` iff this walker's slice stream agrees with `other`'s
    /// at every future level, under every reseed.
    ///
    /// The seed cancels out of any slice comparison and the offset schedule
    /// repeats each round, so eternal agreement is exactly agreement of the
    /// two key hashes on every consumed bit.
    #[must_use]
    pub const fn collides_forever(&self, other: &Self) -> bool {
        (self.key_hash ^ other.key_hash) & CONSUMED_MASK == 0
    }
}
