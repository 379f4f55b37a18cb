use thiserror::Error;

/// Error types for the mini-batch k-means library
#[derive(Error, Debug)]
pub enum KMeansError {
    /// The number of clusters k is invalid (must be > 0)
    #[error("Invalid k value: {0}")]
    InvalidK(String),

    /// The mini-batch size is invalid (must be > 0)
    #[error("Invalid batch size: {0}")]
    InvalidBatchSize(String),

    /// The iteration count is invalid (must be > 0)
    #[error("Invalid number of iterations: {0}")]
    InvalidIterations(String),

    /// Not enough data points for the requested batch size or number of clusters
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Dimension mismatch between data, centroids or assignments
    #[error("Dimension mismatch: {0}")]
    InvalidDimensions(String),

    /// Operation is not allowed in the current training state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Model has not been fitted yet
    #[error("Model has not been fitted. Call train() or fit() first.")]
    NotFitted,

    /// A distance function failed to evaluate
    #[error("Distance computation failed: {0}")]
    Distance(String),
}

impl KMeansError {
    /// Returns `true` for errors caused by a bad argument value
    /// (as opposed to state, fitting or distance failures).
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            KMeansError::InvalidK(_)
                | KMeansError::InvalidBatchSize(_)
                | KMeansError::InvalidIterations(_)
                | KMeansError::InsufficientData(_)
                | KMeansError::InvalidDimensions(_)
        )
    }
}
