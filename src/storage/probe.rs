use std::hash::{BuildHasher, Hash};

use siphasher::sip::SipHasher13;

use crate::types::MapError;

const DEFAULT_K0: u64 = 0x736f_6d65_7073_6575;
const DEFAULT_K1: u64 = 0x646f_7261_6e64_6f6d;

/// Fixed-key SipHash-1-3 builder.
///
/// Keys are constant so a given key always lands on the same home slot,
/// across maps and across processes.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct SipBuildHasher {
    k0: u64,
    k1: u64,
}

impl SipBuildHasher {
    /// Creates a builder with explicit SipHash keys.
    pub fn with_keys(k0: u64, k1: u64) -> Self {
        Self { k0, k1 }
    }
}

impl Default for SipBuildHasher {
    fn default() -> Self {
        Self::with_keys(DEFAULT_K0, DEFAULT_K1)
    }
}

impl BuildHasher for SipBuildHasher {
    type Hasher = SipHasher13;

    fn build_hasher(&self) -> SipHasher13 {
        SipHasher13::new_with_keys(self.k0, self.k1)
    }
}

/// Reduces a hash to a slot index with an unsigned remainder.
#[inline]
pub fn reduce(hash: u64, total: u32) -> u32 {
    debug_assert!(total > 0, "table must have at least one slot");
    (hash % u64::from(total)) as u32
}

/// First slot a key's probe walk visits.
#[inline]
pub fn home_slot<K, S>(hasher: &S, key: &K, total: u32) -> u32
where
    K: Hash + ?Sized,
    S: BuildHasher,
{
    reduce(hasher.hash_one(key), total)
}

/// Linear probe sequence starting at a home slot, covering each slot once.
#[derive(Debug, Clone)]
pub struct ProbeSeq {
    home: u32,
    total: u32,
    step: u32,
}

impl ProbeSeq {
    /// Walk of `total` slots starting at `home`.
    pub fn new(home: u32, total: u32) -> Self {
        debug_assert!(home < total, "home slot {home} outside table of {total}");
        Self {
            home,
            total,
            step: 0,
        }
    }

    /// Slots yielded so far.
    pub fn probes(&self) -> u32 {
        self.step
    }

    /// Error reported when the walk wraps without resolving.
    pub fn exhausted(&self) -> MapError {
        MapError::ProbeExhausted {
            home: self.home,
            total: self.total,
        }
    }
}

impl Iterator for ProbeSeq {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.step >= self.total {
            return None;
        }
        let slot = (u64::from(self.home) + u64::from(self.step)) % u64::from(self.total);
        self.step += 1;
        Some(slot as u32)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.total - self.step) as usize;
        (left, Some(left))
    }
}

impl ExactSizeIterator for ProbeSeq {}
