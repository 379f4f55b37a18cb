use minibatch_kmeans::{nearest_centroid, sample_indices, Metric, MiniBatchConfig, MiniBatchKMeans};
use ndarray::Array2;
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;

proptest! {
    #[test]
    fn prop_sample_distinct_in_range(
        n in 1usize..200,
        frac in 0.0f64..=1.0,
        seed in any::<u64>()
    ) {
        let b = ((n as f64 * frac).ceil() as usize).clamp(1, n);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let batch = sample_indices(b, n, &mut rng).unwrap();

        prop_assert_eq!(batch.len(), b);
        prop_assert!(batch.iter().all(|&i| i < n));
        let unique: HashSet<usize> = batch.iter().copied().collect();
        prop_assert_eq!(unique.len(), b);
    }

    #[test]
    fn prop_assignment_in_range(
        centroids in prop::collection::vec(prop::collection::vec(-10.0f32..10.0, 3), 1..8),
        point in prop::collection::vec(-10.0f32..10.0, 3)
    ) {
        let k = centroids.len();
        let flat: Vec<f32> = centroids.into_iter().flatten().collect();
        let centroids = Array2::from_shape_vec((k, 3), flat).unwrap();
        let point = ndarray::Array1::from(point);

        let label = nearest_centroid(point.view(), &centroids.view(), &Metric::Euclidean).unwrap();
        prop_assert!(label < k);
    }

    #[test]
    fn prop_tie_goes_to_lowest_index(
        centroid in prop::collection::vec(-10.0f32..10.0, 2),
        copies in 2usize..6,
        point in prop::collection::vec(-10.0f32..10.0, 2)
    ) {
        // All centroids identical: every distance ties
        let flat: Vec<f32> = std::iter::repeat(centroid).take(copies).flatten().collect();
        let centroids = Array2::from_shape_vec((copies, 2), flat).unwrap();
        let point = ndarray::Array1::from(point);

        let label = nearest_centroid(point.view(), &centroids.view(), &Metric::Manhattan).unwrap();
        prop_assert_eq!(label, 0);
    }

    #[test]
    fn prop_training_labels_valid(
        data in prop::collection::vec(prop::collection::vec(-10.0f32..10.0, 2), 1..40),
        k in 1usize..5,
        batch_frac in 0.1f64..=1.0,
        iters in 1usize..10
    ) {
        let n = data.len();
        if k <= n {
            let batch_size = ((n as f64 * batch_frac).ceil() as usize).clamp(1, n);
            let flat: Vec<f32> = data.into_iter().flatten().collect();
            let data = Array2::from_shape_vec((n, 2), flat).unwrap();

            let config = MiniBatchConfig::new(k).with_mb_params(batch_size, iters).with_seed(42);
            let mut kmeans = MiniBatchKMeans::with_config(config).unwrap();
            let labels = kmeans.fit_predict(&data.view()).unwrap();

            prop_assert_eq!(labels.len(), n);
            for &l in labels.iter() {
                prop_assert!(l < k);
            }
            prop_assert_eq!(kmeans.counts().unwrap().sum(), (batch_size * iters) as u64);
        }
    }
}
