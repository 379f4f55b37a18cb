//! Mini-batch index sampling without replacement.

use crate::error::KMeansError;
use rand::Rng;

/// Draws distinct indices from `[0, n)` with a partial Fisher-Yates shuffle.
///
/// The scratch pool is kept between calls and always holds a permutation of
/// `[0, n)`. Running a partial shuffle over any permutation still selects
/// every `b`-subset with equal probability, so the pool never needs to be
/// reset and each draw costs `O(b)`.
#[derive(Debug, Clone)]
pub struct IndexSampler {
    pool: Vec<usize>,
}

impl IndexSampler {
    /// Create a sampler over the universe `[0, n)`.
    pub fn new(n: usize) -> Result<Self, KMeansError> {
        if n == 0 {
            return Err(KMeansError::InsufficientData(
                "cannot sample from an empty dataset".to_string(),
            ));
        }
        Ok(Self {
            pool: (0..n).collect(),
        })
    }

    /// Size of the universe being sampled from.
    pub fn n(&self) -> usize {
        self.pool.len()
    }

    /// Draw `b` distinct indices, in draw order.
    pub fn sample<R: Rng + ?Sized>(
        &mut self,
        b: usize,
        rng: &mut R,
    ) -> Result<Vec<usize>, KMeansError> {
        let n = self.pool.len();
        if b == 0 {
            return Err(KMeansError::InvalidBatchSize(
                "batch_size must be greater than 0".to_string(),
            ));
        }
        if b > n {
            return Err(KMeansError::InsufficientData(format!(
                "batch size ({}) exceeds number of samples ({})",
                b, n
            )));
        }

        for i in 0..b {
            let r = rng.gen_range(i..n);
            self.pool.swap(i, r);
        }

        Ok(self.pool[..b].to_vec())
    }
}

/// Draw `b` distinct indices uniformly at random from `[0, n)`.
///
/// One-shot convenience over [`IndexSampler`]; prefer the sampler when
/// drawing repeatedly from the same universe.
pub fn sample_indices<R: Rng + ?Sized>(
    b: usize,
    n: usize,
    rng: &mut R,
) -> Result<Vec<usize>, KMeansError> {
    IndexSampler::new(n)?.sample(b, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::{HashMap, HashSet};

    #[test]
    fn test_sample_distinct_and_in_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut sampler = IndexSampler::new(100).unwrap();

        for _ in 0..50 {
            let batch = sampler.sample(30, &mut rng).unwrap();
            assert_eq!(batch.len(), 30);

            let unique: HashSet<usize> = batch.iter().copied().collect();
            assert_eq!(unique.len(), 30, "indices must be distinct");
            assert!(batch.iter().all(|&i| i < 100));
        }
    }

    #[test]
    fn test_full_batch_is_permutation() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut batch = sample_indices(10, 10, &mut rng).unwrap();
        batch.sort_unstable();
        assert_eq!(batch, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_pool_stays_a_permutation() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut sampler = IndexSampler::new(17).unwrap();
        for b in 1..=17 {
            sampler.sample(b, &mut rng).unwrap();
        }

        let mut pool = sampler.pool.clone();
        pool.sort_unstable();
        assert_eq!(pool, (0..17).collect::<Vec<_>>());
    }

    #[test]
    fn test_invalid_arguments() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        assert!(matches!(
            sample_indices(0, 5, &mut rng),
            Err(KMeansError::InvalidBatchSize(_))
        ));
        assert!(matches!(
            sample_indices(6, 5, &mut rng),
            Err(KMeansError::InsufficientData(_))
        ));
        assert!(matches!(
            sample_indices(1, 0, &mut rng),
            Err(KMeansError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_reproducible_with_seed() {
        let mut rng1 = ChaCha8Rng::seed_from_u64(1234);
        let mut rng2 = ChaCha8Rng::seed_from_u64(1234);

        assert_eq!(
            sample_indices(8, 50, &mut rng1).unwrap(),
            sample_indices(8, 50, &mut rng2).unwrap()
        );
    }

    #[test]
    fn test_subsets_are_uniform() {
        // 5 choose 2 = 10 subsets; chi-square with 9 degrees of freedom
        let mut rng = ChaCha8Rng::seed_from_u64(2024);
        let mut sampler = IndexSampler::new(5).unwrap();
        let trials = 20_000;

        let mut counts: HashMap<(usize, usize), usize> = HashMap::new();
        for _ in 0..trials {
            let batch = sampler.sample(2, &mut rng).unwrap();
            let key = (batch[0].min(batch[1]), batch[0].max(batch[1]));
            *counts.entry(key).or_insert(0) += 1;
        }

        assert_eq!(counts.len(), 10, "every subset should be drawn");

        let expected = trials as f64 / 10.0;
        let chi_square: f64 = counts
            .values()
            .map(|&c| {
                let diff = c as f64 - expected;
                diff * diff / expected
            })
            .sum();

        // p = 0.001 critical value for 9 dof is 27.88
        assert!(chi_square < 27.88, "chi-square too large: {}", chi_square);
    }
}
