//! Deterministic, seeded random source used by every generator.

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

use crate::config::MAX_SIZE;

const SEED_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

/// Derive the seed of one run from the root seed and the run index
///
/// The derivation is a pure function, so runs can be replayed individually and in any
/// order without touching a shared generator.
pub fn derive_seed(root: u64, index: u64) -> u64 {
    let mut z = root.wrapping_add(index.wrapping_add(1).wrapping_mul(SEED_GAMMA));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Draw a fresh root seed from OS entropy
pub fn fresh_seed() -> u64 {
    StdRng::from_entropy().next_u64()
}

/// Seeded stream of random numbers
///
/// Identical seeds yield identical streams.
#[derive(Debug, Clone)]
pub struct RandomSource {
    seed: u64,
    inner: StdRng,
}

impl RandomSource {
    /// Create a random source from a seed
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            inner: StdRng::seed_from_u64(seed),
        }
    }

    /// Create the random source of one run
    pub fn for_run(root: u64, index: u64) -> Self {
        Self::new(derive_seed(root, index))
    }

    /// The seed this source was created from
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform draw over `[0, 2^32)`
    pub fn next_u32(&mut self) -> u32 {
        self.inner.next_u32()
    }

    /// Uniform draw over `[min, max]` without modulo bias
    ///
    /// An empty or inverted range yields `min`.
    pub fn uniform_in(&mut self, min: i64, max: i64) -> i64 {
        if min >= max {
            return min;
        }
        self.inner.gen_range(min..=max)
    }

    /// Uniform draw over the part of `[min, max]` reachable at `size`
    ///
    /// The reachable part is centred on `center` (which must lie in `[min, max]`) and
    /// grows linearly with `size`; at `MAX_SIZE` the whole range is reachable.
    pub fn uniform_sized(&mut self, min: i64, max: i64, center: i64, size: u32) -> i64 {
        let (low, high) = sized_bounds(min, max, center, size);
        self.uniform_in(low, high)
    }

    /// Returns true with probability `probability`, clamped to `[0, 1]`
    pub fn chance(&mut self, probability: f64) -> bool {
        if probability.is_nan() || probability <= 0.0 {
            false
        } else if probability >= 1.0 {
            true
        } else {
            self.inner.gen_bool(probability)
        }
    }
}

/// Bounds of the sub-range of `[min, max]` reachable at `size`
pub fn sized_bounds(min: i64, max: i64, center: i64, size: u32) -> (i64, i64) {
    let center = center.clamp(min, max);
    let size = i128::from(size.min(MAX_SIZE));
    let max_size = i128::from(MAX_SIZE);
    let below = (i128::from(center) - i128::from(min)) * size / max_size;
    let above = (i128::from(max) - i128::from(center)) * size / max_size;
    // Both offsets stay within the original range, so the casts cannot truncate
    (
        (i128::from(center) - below) as i64,
        (i128::from(center) + above) as i64,
    )
}
