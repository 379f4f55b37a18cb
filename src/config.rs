use crate::distance::Metric;
use crate::error::KMeansError;

/// How initial centroids are chosen when none are supplied explicitly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InitMethod {
    /// Pick `k` distinct data points uniformly at random
    #[default]
    Random,

    /// k-means++ seeding: spread initial centroids out proportionally to squared distance
    KMeansPlusPlus,
}

/// Configuration for the mini-batch k-means algorithm
#[derive(Debug, Clone)]
pub struct MiniBatchConfig {
    /// Number of clusters
    pub k: usize,

    /// Number of points sampled (without replacement) per iteration.
    /// Must not exceed the number of samples in the training data.
    pub batch_size: usize,

    /// Number of sample-assign-update iterations. Training always runs
    /// exactly this many iterations; there is no convergence check.
    pub num_iterations: usize,

    /// Random seed for centroid initialization and mini-batch sampling
    pub seed: u64,

    /// Seeding strategy used when no initial centroids are given
    pub init: InitMethod,

    /// Distance metric used for assignment and seeding
    pub metric: Metric,

    /// Log per-iteration progress at `info` level instead of `debug`
    pub verbose: bool,
}

impl Default for MiniBatchConfig {
    fn default() -> Self {
        Self {
            k: 8,
            batch_size: 1024,
            num_iterations: 100,
            seed: 0,
            init: InitMethod::Random,
            metric: Metric::Euclidean,
            verbose: false,
        }
    }
}

impl MiniBatchConfig {
    /// Create a new configuration with the specified number of clusters
    pub fn new(k: usize) -> Self {
        Self {
            k,
            ..Default::default()
        }
    }

    /// Set the mini-batch size
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the number of iterations
    pub fn with_num_iterations(mut self, num_iterations: usize) -> Self {
        self.num_iterations = num_iterations;
        self
    }

    /// Set batch size and number of iterations together
    pub fn with_mb_params(self, batch_size: usize, num_iterations: usize) -> Self {
        self.with_batch_size(batch_size)
            .with_num_iterations(num_iterations)
    }

    /// Set the random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the seeding strategy
    pub fn with_init(mut self, init: InitMethod) -> Self {
        self.init = init;
        self
    }

    /// Set the distance metric
    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    /// Set verbose mode
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Check that every count parameter is strictly positive.
    ///
    /// Data-dependent checks (`batch_size <= n`, dimensionality) happen at
    /// training time.
    pub fn validate(&self) -> Result<(), KMeansError> {
        validate_k(self.k)?;
        validate_batch_size(self.batch_size)?;
        validate_num_iterations(self.num_iterations)
    }
}

pub(crate) fn validate_k(k: usize) -> Result<(), KMeansError> {
    if k == 0 {
        return Err(KMeansError::InvalidK(
            "k must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn validate_batch_size(batch_size: usize) -> Result<(), KMeansError> {
    if batch_size == 0 {
        return Err(KMeansError::InvalidBatchSize(
            "batch_size must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn validate_num_iterations(num_iterations: usize) -> Result<(), KMeansError> {
    if num_iterations == 0 {
        return Err(KMeansError::InvalidIterations(
            "num_iterations must be greater than 0".to_string(),
        ));
    }
    Ok(())
}
