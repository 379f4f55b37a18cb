use crate::assign::{assign_batch, nearest_centroid_with_distance};
use crate::config::MiniBatchConfig;
use crate::distance::{compute_centroid_shift, Distance};
use crate::error::KMeansError;
use crate::sampler::IndexSampler;
use crate::store::CentroidStore;
use ndarray::{Array1, ArrayView2, Axis};
use rand::Rng;
use rayon::prelude::*;
use std::ops::ControlFlow;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Progress of a single mini-batch iteration, handed to training observers
#[derive(Debug, Clone)]
pub struct IterationReport {
    /// 1-based iteration number
    pub iteration: usize,

    /// Total number of iterations the run is configured for
    pub num_iterations: usize,

    /// Number of points in this iteration's mini-batch
    pub batch_size: usize,

    /// Number of clusters that received at least one batch point
    pub touched_clusters: usize,

    /// Mean distance from batch points to their assigned centroid (before the update)
    pub mean_distance: f64,

    /// Sum of L2 norms of centroid movements caused by this iteration
    pub centroid_shift: f64,

    /// Wall-clock time spent in this iteration
    pub elapsed: Duration,
}

/// How a mini-batch run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunOutcome {
    /// Number of iterations that were fully applied
    pub n_iterations: usize,

    /// Whether an observer stopped the run before the iteration budget was spent
    pub cancelled: bool,
}

/// Run the mini-batch loop on an already seeded store.
///
/// Every iteration samples `batch_size` distinct rows, assigns them to
/// their nearest centroid (in parallel) and folds them into `store`. The
/// loop always runs `num_iterations` times unless `observer` breaks out.
///
/// On error the store keeps the updates of all completed iterations.
pub fn run_minibatch<R, F>(
    data: &ArrayView2<f32>,
    store: &mut CentroidStore,
    config: &MiniBatchConfig,
    distance: &dyn Distance,
    rng: &mut R,
    observer: F,
) -> Result<RunOutcome, KMeansError>
where
    R: Rng + ?Sized,
    F: FnMut(&IterationReport) -> ControlFlow<()>,
{
    let mut outcome = RunOutcome::default();
    run_minibatch_tracked(data, store, config, distance, rng, observer, &mut outcome)?;
    Ok(outcome)
}

/// Same as [`run_minibatch`], but progress is written to `outcome` as it
/// happens, so the number of applied iterations survives an error.
pub(crate) fn run_minibatch_tracked<R, F>(
    data: &ArrayView2<f32>,
    store: &mut CentroidStore,
    config: &MiniBatchConfig,
    distance: &dyn Distance,
    rng: &mut R,
    mut observer: F,
    outcome: &mut RunOutcome,
) -> Result<(), KMeansError>
where
    R: Rng + ?Sized,
    F: FnMut(&IterationReport) -> ControlFlow<()>,
{
    let n_samples = data.nrows();
    let batch_size = config.batch_size;

    if data.ncols() != store.d() {
        return Err(KMeansError::InvalidDimensions(format!(
            "Expected {} features, got {}",
            store.d(),
            data.ncols()
        )));
    }

    let mut sampler = IndexSampler::new(n_samples)?;
    *outcome = RunOutcome::default();

    for iteration in 0..config.num_iterations {
        let iter_start = Instant::now();

        let indices = sampler.sample(batch_size, rng)?;
        let batch = data.select(Axis(0), &indices);

        let assigned = assign_batch(&batch.view(), &store.centroids().view(), distance)?;
        let (labels, dists): (Vec<usize>, Vec<f32>) = assigned.into_iter().unzip();

        let prev_centroids = store.centroids().clone();
        let touched_clusters = store.update(&batch.view(), &labels)?;
        outcome.n_iterations = iteration + 1;

        let report = IterationReport {
            iteration: iteration + 1,
            num_iterations: config.num_iterations,
            batch_size,
            touched_clusters,
            mean_distance: dists.iter().map(|&d| d as f64).sum::<f64>() / batch_size as f64,
            centroid_shift: compute_centroid_shift(
                &prev_centroids.view(),
                &store.centroids().view(),
            ),
            elapsed: iter_start.elapsed(),
        };

        if config.verbose {
            info!(
                iteration = report.iteration,
                touched = report.touched_clusters,
                mean_distance = report.mean_distance,
                shift = report.centroid_shift,
                secs = report.elapsed.as_secs_f64(),
                "mini-batch iteration"
            );
        } else {
            debug!(
                iteration = report.iteration,
                touched = report.touched_clusters,
                mean_distance = report.mean_distance,
                shift = report.centroid_shift,
                "mini-batch iteration"
            );
        }

        if observer(&report).is_break() {
            outcome.cancelled = true;
            info!(
                completed = outcome.n_iterations,
                requested = config.num_iterations,
                "training cancelled by observer"
            );
            break;
        }
    }

    Ok(())
}

/// Predict cluster assignments for data using trained centroids
pub fn predict_labels(
    data: &ArrayView2<f32>,
    centroids: &ArrayView2<f32>,
    distance: &dyn Distance,
) -> Result<Array1<usize>, KMeansError> {
    let assigned = assign_batch(data, centroids, distance)?;
    Ok(assigned.into_iter().map(|(label, _)| label).collect())
}

/// Sum of distances from every row of `data` to its nearest centroid
pub fn compute_inertia(
    data: &ArrayView2<f32>,
    centroids: &ArrayView2<f32>,
    distance: &dyn Distance,
) -> Result<f64, KMeansError> {
    (0..data.nrows())
        .into_par_iter()
        .map(|i| {
            nearest_centroid_with_distance(data.row(i), centroids, distance)
                .map(|(_, dist)| dist as f64)
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::{FnDistance, Metric};
    use approx::assert_relative_eq;
    use ndarray::{array, Array2};
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn config(batch_size: usize, num_iterations: usize) -> MiniBatchConfig {
        MiniBatchConfig::new(2).with_mb_params(batch_size, num_iterations)
    }

    #[test]
    fn test_full_batch_single_iteration_is_batch_mean() {
        let data = array![[0.0f32], [1.0], [2.0], [10.0], [11.0], [12.0]];
        let mut store = CentroidStore::new(array![[0.0f32], [10.0]]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let outcome = run_minibatch(
            &data.view(),
            &mut store,
            &config(6, 1),
            &Metric::Euclidean,
            &mut rng,
            |_| ControlFlow::Continue(()),
        )
        .unwrap();

        assert_eq!(outcome.n_iterations, 1);
        assert!(!outcome.cancelled);
        assert_relative_eq!(store.centroids()[[0, 0]], 1.0, epsilon = 1e-6);
        assert_relative_eq!(store.centroids()[[1, 0]], 11.0, epsilon = 1e-6);
        assert_eq!(store.counts().sum(), 6);
    }

    #[test]
    fn test_runs_exact_iteration_budget() {
        let data = Array2::random((50, 3), Uniform::new(-1.0f32, 1.0));
        let mut store = CentroidStore::new(data.slice(ndarray::s![0..2, ..]).to_owned()).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut seen = Vec::new();

        let outcome = run_minibatch(
            &data.view(),
            &mut store,
            &config(5, 13),
            &Metric::Euclidean,
            &mut rng,
            |report| {
                seen.push(report.iteration);
                ControlFlow::Continue(())
            },
        )
        .unwrap();

        assert_eq!(outcome.n_iterations, 13);
        assert_eq!(seen, (1..=13).collect::<Vec<_>>());
        // Every batch point is counted exactly once
        assert_eq!(store.counts().sum(), 5 * 13);
    }

    #[test]
    fn test_observer_can_cancel() {
        let data = Array2::random((20, 2), Uniform::new(-1.0f32, 1.0));
        let mut store = CentroidStore::new(data.slice(ndarray::s![0..2, ..]).to_owned()).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(2);

        let outcome = run_minibatch(
            &data.view(),
            &mut store,
            &config(4, 100),
            &Metric::Euclidean,
            &mut rng,
            |report| {
                if report.iteration == 3 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            },
        )
        .unwrap();

        assert_eq!(outcome.n_iterations, 3);
        assert!(outcome.cancelled);
        assert_eq!(store.counts().sum(), 12);
    }

    #[test]
    fn test_batch_larger_than_data_fails_before_update() {
        let data = Array2::<f32>::zeros((3, 2));
        let mut store = CentroidStore::new(Array2::ones((2, 2))).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let result = run_minibatch(
            &data.view(),
            &mut store,
            &config(4, 1),
            &Metric::Euclidean,
            &mut rng,
            |_| ControlFlow::Continue(()),
        );

        assert!(matches!(result, Err(KMeansError::InsufficientData(_))));
        assert_eq!(store.counts().sum(), 0);
    }

    #[test]
    fn test_distance_failure_aborts_run() {
        let data = array![[0.0f32], [1.0], [2.0]];
        let mut store = CentroidStore::new(array![[0.0f32]]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let failing = FnDistance::new(|_a, _b| Err(KMeansError::Distance("boom".to_string())));

        let result = run_minibatch(
            &data.view(),
            &mut store,
            &config(2, 5),
            &failing,
            &mut rng,
            |_| ControlFlow::Continue(()),
        );

        assert!(matches!(result, Err(KMeansError::Distance(_))));
    }

    #[test]
    fn test_predict_and_inertia() {
        let data = array![[0.0f32], [1.0], [9.0], [12.0]];
        let centroids = array![[0.0f32], [10.0]];

        let labels = predict_labels(&data.view(), &centroids.view(), &Metric::Euclidean).unwrap();
        assert_eq!(labels, array![0usize, 0, 1, 1]);

        let inertia =
            compute_inertia(&data.view(), &centroids.view(), &Metric::Euclidean).unwrap();
        assert_relative_eq!(inertia, 0.0 + 1.0 + 1.0 + 2.0, epsilon = 1e-6);
    }
}
