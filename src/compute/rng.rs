//! Random source for noise generation, crossover and shuffling.

use rand::prelude::*;

use crate::schema::StimulusArray;

/// Random number generator wrapper for stimulus operations.
///
/// One instance is owned per session, so every draw of a session (noise,
/// crossover coin flips, mutation, shuffles) comes from the same stream.
pub struct StimulusRng {
    rng: StdRng,
}

impl StimulusRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create with random seed.
    pub fn random() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Seeded when `seed` is given, entropy otherwise.
    pub fn from_option(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::random, Self::new)
    }

    /// Square grid with every cell drawn uniformly from `[0, 255]`.
    pub fn generate_noise(&mut self, size: usize) -> StimulusArray {
        StimulusArray::from_fn(size, size, |_, _| self.intensity())
    }

    /// One uniform intensity in `[0, 255]`.
    #[inline]
    pub fn intensity(&mut self) -> u8 {
        self.rng.r#gen::<u8>()
    }

    /// Fair coin.
    #[inline]
    pub fn coin(&mut self) -> bool {
        self.rng.r#gen::<bool>()
    }

    /// True with probability `p`.
    #[inline]
    pub fn chance(&mut self, p: f64) -> bool {
        self.rng.gen_bool(p.clamp(0.0, 1.0))
    }

    /// Uniform index in `0..len`. `len` must be non-zero.
    #[inline]
    pub fn index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }

    /// Unbiased in-place shuffle.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.rng);
    }
}
