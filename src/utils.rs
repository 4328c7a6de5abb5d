//! Small wrapper around `rand` used by the samplers.

use rand::distributions::uniform::SampleUniform;
use rand::distributions::Uniform;
use rand::prelude::*;

/// Uniform random-number generator over inclusive integer ranges.
///
/// Seeded from OS entropy by default; [`UniformRandomGenerator::from_seed`]
/// gives a reproducible stream.
#[derive(Debug, Clone)]
pub struct UniformRandomGenerator {
    rng: StdRng,
}

impl Default for UniformRandomGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl UniformRandomGenerator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Fill `out` with distinct values in `[min, max]`.
    ///
    /// The range must hold at least `out.len()` values.
    pub fn gen_unique<T>(&mut self, out: &mut [T], min: T, max: T)
    where
        T: Copy + Eq + SampleUniform + PartialOrd,
    {
        let dist = Uniform::new_inclusive(min, max);
        for i in 0..out.len() {
            loop {
                let candidate = self.rng.sample(&dist);
                if out[..i].iter().all(|&v| v != candidate) {
                    out[i] = candidate;
                    break;
                }
            }
        }
    }
}
