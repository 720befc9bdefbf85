//! A small seeded pseudo-random number generator.
//!
//! Identifier tags and random studies are pure functions of a seed, so runs can be reproduced.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

static ENTROPY_SEEDS: AtomicU64 = AtomicU64::new(0);

/// The SplitMix64 generator.
///
/// Not cryptographically secure.
#[derive(Debug, Clone)]
pub struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    const GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

    /// Create a new generator from `seed`.
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Create a new generator seeded from the system clock.
    ///
    /// Seeds within a process also mix in a counter, so generators created at the same clock reading differ.
    /// Seeds of different processes are only distinct with high probability.
    #[must_use]
    pub fn from_entropy() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_nanos());
        let count = ENTROPY_SEEDS.fetch_add(1, Ordering::Relaxed);
        #[allow(clippy::cast_possible_truncation)]
        let clock = (nanos as u64) ^ (nanos >> 64) as u64;
        Self::new(clock ^ count.wrapping_add(1).wrapping_mul(Self::GAMMA))
    }

    /// Generate a random `u64`.
    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(Self::GAMMA);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Generate a uniform random number in `[0, 1)`.
    #[allow(clippy::cast_precision_loss)]
    pub fn next_f64(&mut self) -> f64 {
        // 53 random mantissa bits
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Generate a uniform random number in `[lo, hi)`.
    pub fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    /// Generate a uniform random integer in `[0, bound)`.
    ///
    /// Returns `0` if `bound` is `0`.
    pub fn below(&mut self, bound: u64) -> u64 {
        if bound == 0 {
            0
        } else {
            self.next_u64() % bound
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rng_reproducible() {
        let mut a = SplitMix64::new(7);
        let mut b = SplitMix64::new(7);
        for _ in 0..100 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
        assert_ne!(SplitMix64::new(1).next_u64(), SplitMix64::new(2).next_u64());
    }

    #[test]
    fn rng_ranges() {
        let mut rng = SplitMix64::new(0);
        for _ in 0..10_000 {
            let u = rng.next_f64();
            assert!((0.0..1.0).contains(&u));
            let v = rng.uniform(-100.0, 100.0);
            assert!((-100.0..100.0).contains(&v));
            assert!(rng.below(36) < 36);
        }
        assert_eq!(rng.below(0), 0);
    }

    #[test]
    fn rng_from_entropy_distinct() {
        let mut first = SplitMix64::from_entropy();
        let mut second = SplitMix64::from_entropy();
        assert_ne!(first.next_u64(), second.next_u64());
    }
}
