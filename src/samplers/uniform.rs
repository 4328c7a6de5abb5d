//! Uniform sampling of correspondence rows.
//!
//! Every row of the fitting store is equally likely and a sample never repeats
//! a row. Agreement rows are never drawn.

use crate::core::Sampler;
use crate::types::DataMatrix;
use crate::utils::UniformRandomGenerator;

/// Uniform random sampler drawing minimal samples without replacement.
#[derive(Debug, Clone, Default)]
pub struct UniformRandomSampler {
    rng: UniformRandomGenerator,
}

impl UniformRandomSampler {
    /// Construct a new sampler with a random seed.
    pub fn new() -> Self {
        Self {
            rng: UniformRandomGenerator::new(),
        }
    }

    /// Construct a sampler from a fixed seed; equal seeds give equal draws.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: UniformRandomGenerator::from_seed(seed),
        }
    }

    /// Seeded when `seed` is given, entropy-seeded otherwise.
    pub fn with_seed(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::new, Self::from_seed)
    }
}

impl Sampler for UniformRandomSampler {
    fn sample(&mut self, data: &DataMatrix, sample_size: usize, out_indices: &mut [usize]) -> bool {
        let rows = data.nrows();
        let Some(sample) = out_indices.get_mut(..sample_size) else {
            return false;
        };
        if sample.is_empty() || sample_size > rows {
            return false;
        }

        // Sample unique indices in the range [0, n-1].
        self.rng.gen_unique(sample, 0, rows - 1);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draws_distinct_rows_in_range() {
        let data = DataMatrix::zeros(7, 6);
        let mut sampler = UniformRandomSampler::from_seed(11);
        let mut sample = [0usize; 3];
        for _ in 0..50 {
            assert!(sampler.sample(&data, 3, &mut sample));
            assert!(sample.iter().all(|&i| i < 7));
            assert!(sample[0] != sample[1] && sample[1] != sample[2] && sample[0] != sample[2]);
        }
    }

    #[test]
    fn refuses_samples_larger_than_the_data() {
        let data = DataMatrix::zeros(2, 6);
        let mut sampler = UniformRandomSampler::from_seed(0);
        let mut sample = [0usize; 3];
        assert!(!sampler.sample(&data, 3, &mut sample));
    }

    #[test]
    fn equal_seeds_give_equal_sequences() {
        let data = DataMatrix::zeros(20, 6);
        let mut a = UniformRandomSampler::with_seed(Some(5));
        let mut b = UniformRandomSampler::with_seed(Some(5));
        let (mut sa, mut sb) = ([0usize; 4], [0usize; 4]);
        for _ in 0..10 {
            a.sample(&data, 4, &mut sa);
            b.sample(&data, 4, &mut sb);
            assert_eq!(sa, sb);
        }
    }
}
