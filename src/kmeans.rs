use crate::algorithm::{
    compute_inertia, predict_labels, run_minibatch_tracked, IterationReport, RunOutcome,
};
use crate::config::{validate_batch_size, validate_k, validate_num_iterations, MiniBatchConfig};
use crate::distance::Distance;
use crate::error::KMeansError;
use crate::seeding::{ExplicitCentroids, Seeding};
use crate::store::CentroidStore;
use ndarray::{Array1, Array2, ArrayView2};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::ops::ControlFlow;
use tracing::{info, info_span, warn};

/// Lifecycle of a [`MiniBatchKMeans`] model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingState {
    /// No centroids yet; configuration may still change
    Uninitialized,
    /// Initial centroids chosen, no iteration applied yet
    Seeded,
    /// Inside the mini-batch loop
    Iterating,
    /// Training finished (or was cancelled); centroids are the model
    Done,
}

/// Mini-batch k-means clustering compatible with ndarray.
///
/// Each training iteration samples `batch_size` distinct rows, assigns them
/// to their nearest centroid and moves every touched centroid towards the
/// running mean of all points it has ever been assigned. Training always
/// runs exactly `num_iterations` iterations.
///
/// # Example
///
/// ```
/// use minibatch_kmeans::{MiniBatchConfig, MiniBatchKMeans};
/// use ndarray::Array2;
/// use ndarray_rand::RandomExt;
/// use ndarray_rand::rand_distr::Uniform;
///
/// let data = Array2::random((1000, 16), Uniform::new(-1.0f32, 1.0));
///
/// let config = MiniBatchConfig::new(10).with_mb_params(128, 50).with_seed(7);
/// let mut kmeans = MiniBatchKMeans::with_config(config).unwrap();
/// kmeans.train(&data.view()).unwrap();
///
/// let labels = kmeans.predict(&data.view()).unwrap();
/// assert_eq!(labels.len(), 1000);
/// ```
pub struct MiniBatchKMeans {
    /// Model configuration
    config: MiniBatchConfig,

    /// Number of features (dimensions), 0 until first seen
    d: usize,

    /// Distance used for seeding, assignment and prediction
    distance: Box<dyn Distance>,

    /// Initial centroid source
    seeding: Box<dyn Seeding>,

    /// Centroids and per-cluster counts (None until seeded)
    store: Option<CentroidStore>,

    state: TrainingState,

    /// Iterations applied by the last training run
    n_iterations: usize,
}

impl std::fmt::Debug for MiniBatchKMeans {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiniBatchKMeans")
            .field("config", &self.config)
            .field("d", &self.d)
            .field("state", &self.state)
            .field("n_iterations", &self.n_iterations)
            .finish_non_exhaustive()
    }
}

impl MiniBatchKMeans {
    /// Create a model with default seeding and metric.
    ///
    /// # Errors
    ///
    /// Fails if `k`, `batch_size` or `num_iterations` is 0.
    pub fn new(k: usize, batch_size: usize, num_iterations: usize) -> Result<Self, KMeansError> {
        Self::with_config(MiniBatchConfig::new(k).with_mb_params(batch_size, num_iterations))
    }

    /// Create a model from a full configuration.
    ///
    /// The configured [`InitMethod`](crate::InitMethod) and
    /// [`Metric`](crate::Metric) become the seeding strategy and distance.
    pub fn with_config(config: MiniBatchConfig) -> Result<Self, KMeansError> {
        config.validate()?;

        Ok(Self {
            d: 0,
            distance: Box::new(config.metric),
            seeding: Box::new(config.init),
            store: None,
            state: TrainingState::Uninitialized,
            n_iterations: 0,
            config,
        })
    }

    /// Start from explicit initial centroids instead of seeding from the data.
    ///
    /// The matrix must be `k x d`; the shape is checked against the training
    /// data when training starts.
    pub fn with_initial_centroids(self, centroids: Array2<f32>) -> Self {
        self.with_seeding(ExplicitCentroids::new(centroids))
    }

    /// Use a custom distance function.
    pub fn with_distance<D: Distance + 'static>(mut self, distance: D) -> Self {
        self.distance = Box::new(distance);
        self
    }

    /// Use a custom seeding strategy.
    pub fn with_seeding<S: Seeding + 'static>(mut self, seeding: S) -> Self {
        self.seeding = Box::new(seeding);
        self
    }

    /// Set the mini-batch size.
    ///
    /// # Errors
    ///
    /// `InvalidBatchSize` if `batch_size` is 0, `InvalidState` once training
    /// has begun (call [`reset`](Self::reset) first).
    pub fn set_batch_size(&mut self, batch_size: usize) -> Result<(), KMeansError> {
        self.ensure_configurable("batch size")?;
        validate_batch_size(batch_size)?;
        self.config.batch_size = batch_size;
        Ok(())
    }

    /// Set the number of iterations. Same rules as [`set_batch_size`](Self::set_batch_size).
    pub fn set_num_iterations(&mut self, num_iterations: usize) -> Result<(), KMeansError> {
        self.ensure_configurable("number of iterations")?;
        validate_num_iterations(num_iterations)?;
        self.config.num_iterations = num_iterations;
        Ok(())
    }

    /// Set batch size and number of iterations together. Neither is changed
    /// if either is invalid.
    pub fn set_mb_params(
        &mut self,
        batch_size: usize,
        num_iterations: usize,
    ) -> Result<(), KMeansError> {
        self.ensure_configurable("mini-batch parameters")?;
        validate_batch_size(batch_size)?;
        validate_num_iterations(num_iterations)?;
        self.config.batch_size = batch_size;
        self.config.num_iterations = num_iterations;
        Ok(())
    }

    /// Discard any trained state so the model can be reconfigured and retrained.
    pub fn reset(&mut self) {
        self.store = None;
        self.d = 0;
        self.n_iterations = 0;
        self.state = TrainingState::Uninitialized;
    }

    /// Train the model, seeding the RNG from `config.seed`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The data is empty or has fewer rows than `batch_size`
    /// - Seeding needs more rows than available or explicit centroids have the wrong shape
    /// - The model was already trained (`InvalidState`)
    /// - The distance function fails (centroids from completed iterations are kept)
    pub fn train(&mut self, data: &ArrayView2<f32>) -> Result<(), KMeansError> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        self.train_with_rng(data, &mut rng)
    }

    /// Train with a caller-provided random generator.
    pub fn train_with_rng<R: RngCore>(
        &mut self,
        data: &ArrayView2<f32>,
        rng: &mut R,
    ) -> Result<(), KMeansError> {
        self.run(data, rng, |_| ControlFlow::Continue(()))
    }

    /// Train while reporting every iteration to `observer`.
    ///
    /// Returning `ControlFlow::Break(())` stops training after the current
    /// iteration; the centroids reached so far become the model.
    pub fn train_with_observer<F>(
        &mut self,
        data: &ArrayView2<f32>,
        observer: F,
    ) -> Result<(), KMeansError>
    where
        F: FnMut(&IterationReport) -> ControlFlow<()>,
    {
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        self.run(data, &mut rng, observer)
    }

    /// Fit the model to the data. Equivalent to `train()`.
    ///
    /// # Returns
    ///
    /// Returns `&mut Self` for method chaining.
    pub fn fit(&mut self, data: &ArrayView2<f32>) -> Result<&mut Self, KMeansError> {
        self.train(data)?;
        Ok(self)
    }

    /// Predict the nearest centroid for every row of `data`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The model has not been fitted yet
    /// - Data dimensions don't match the training data
    pub fn predict(&self, data: &ArrayView2<f32>) -> Result<Array1<usize>, KMeansError> {
        let centroids = self.fitted_centroids()?;
        self.check_features(data)?;
        predict_labels(data, &centroids.view(), self.distance.as_ref())
    }

    /// Fit the model and predict cluster assignments in one call.
    pub fn fit_predict(&mut self, data: &ArrayView2<f32>) -> Result<Array1<usize>, KMeansError> {
        self.train(data)?;
        self.predict(data)
    }

    /// Sum of distances from each row of `data` to its nearest centroid.
    pub fn inertia(&self, data: &ArrayView2<f32>) -> Result<f64, KMeansError> {
        let centroids = self.fitted_centroids()?;
        self.check_features(data)?;
        compute_inertia(data, &centroids.view(), self.distance.as_ref())
    }

    /// Current centroids, `Some` once the model has been seeded.
    pub fn centroids(&self) -> Option<&Array2<f32>> {
        self.store.as_ref().map(CentroidStore::centroids)
    }

    /// Cumulative number of points assigned to each centroid during training.
    pub fn counts(&self) -> Option<&Array1<u64>> {
        self.store.as_ref().map(CentroidStore::counts)
    }

    /// Get the number of clusters.
    pub fn k(&self) -> usize {
        self.config.k
    }

    /// Get the number of features (dimensions).
    pub fn d(&self) -> usize {
        self.d
    }

    /// Get the mini-batch size.
    pub fn batch_size(&self) -> usize {
        self.config.batch_size
    }

    /// Get the configured number of iterations.
    pub fn num_iterations(&self) -> usize {
        self.config.num_iterations
    }

    /// Iterations applied by the last training run.
    pub fn n_iterations(&self) -> usize {
        self.n_iterations
    }

    /// Get the current training state.
    pub fn state(&self) -> TrainingState {
        self.state
    }

    /// Get the configuration.
    pub fn config(&self) -> &MiniBatchConfig {
        &self.config
    }

    fn run<R, F>(
        &mut self,
        data: &ArrayView2<f32>,
        rng: &mut R,
        observer: F,
    ) -> Result<(), KMeansError>
    where
        R: RngCore,
        F: FnMut(&IterationReport) -> ControlFlow<()>,
    {
        if self.state != TrainingState::Uninitialized {
            return Err(KMeansError::InvalidState(
                "model has already been trained; call reset() to retrain".to_string(),
            ));
        }
        self.validate_data(data)?;

        let span = info_span!(
            "minibatch_kmeans",
            k = self.config.k,
            batch_size = self.config.batch_size,
            num_iterations = self.config.num_iterations
        );
        let _enter = span.enter();

        let initial = self
            .seeding
            .seed_centroids(data, self.config.k, self.distance.as_ref(), &mut *rng)?;
        if initial.dim() != (self.config.k, data.ncols()) {
            return Err(KMeansError::InvalidDimensions(format!(
                "Seeding produced shape {:?}, expected ({}, {})",
                initial.dim(),
                self.config.k,
                data.ncols()
            )));
        }

        let store = CentroidStore::new(initial)?;
        self.d = data.ncols();
        self.state = TrainingState::Seeded;
        info!(
            n_samples = data.nrows(),
            n_features = self.d,
            "centroids seeded"
        );

        let store = self.store.insert(store);
        self.state = TrainingState::Iterating;

        let mut outcome = RunOutcome::default();
        let result = run_minibatch_tracked(
            data,
            store,
            &self.config,
            self.distance.as_ref(),
            rng,
            observer,
            &mut outcome,
        );
        self.state = TrainingState::Done;
        self.n_iterations = outcome.n_iterations;

        if let Err(err) = result {
            warn!(
                completed = outcome.n_iterations,
                requested = self.config.num_iterations,
                error = %err,
                "training aborted"
            );
            return Err(err);
        }
        info!(
            n_iterations = outcome.n_iterations,
            cancelled = outcome.cancelled,
            "training finished"
        );
        Ok(())
    }

    fn validate_data(&self, data: &ArrayView2<f32>) -> Result<(), KMeansError> {
        validate_k(self.config.k)?;
        let n_samples = data.nrows();

        if n_samples == 0 {
            return Err(KMeansError::InsufficientData(
                "training data is empty".to_string(),
            ));
        }
        if data.ncols() == 0 {
            return Err(KMeansError::InvalidDimensions(
                "training data has no features".to_string(),
            ));
        }
        if self.config.batch_size > n_samples {
            return Err(KMeansError::InsufficientData(format!(
                "batch size ({}) exceeds number of samples ({})",
                self.config.batch_size, n_samples
            )));
        }
        Ok(())
    }

    fn ensure_configurable(&self, what: &str) -> Result<(), KMeansError> {
        if self.state != TrainingState::Uninitialized {
            return Err(KMeansError::InvalidState(format!(
                "cannot change {} after training has started",
                what
            )));
        }
        Ok(())
    }

    fn fitted_centroids(&self) -> Result<&Array2<f32>, KMeansError> {
        match (&self.store, self.state) {
            (Some(store), TrainingState::Done) => Ok(store.centroids()),
            _ => Err(KMeansError::NotFitted),
        }
    }

    fn check_features(&self, data: &ArrayView2<f32>) -> Result<(), KMeansError> {
        if data.ncols() != self.d {
            return Err(KMeansError::InvalidDimensions(format!(
                "Expected {} features, got {}",
                self.d,
                data.ncols()
            )));
        }
        Ok(())
    }
}
