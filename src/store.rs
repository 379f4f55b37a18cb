use crate::error::KMeansError;
use ndarray::{Array1, Array2, ArrayView2};

/// Centroid matrix plus the cumulative number of points assigned to each
/// centroid over all processed mini-batches.
///
/// Each centroid is kept equal to the running mean of every point ever
/// assigned to it: a batch contributing `m` points with mean `x̄` moves the
/// centroid by `m / count` of the way towards `x̄`, where `count` already
/// includes the new points.
#[derive(Debug, Clone)]
pub struct CentroidStore {
    centroids: Array2<f32>,
    counts: Array1<u64>,
}

impl CentroidStore {
    /// Wrap an initial `k x d` centroid matrix. All counts start at zero.
    pub fn new(centroids: Array2<f32>) -> Result<Self, KMeansError> {
        if centroids.nrows() == 0 {
            return Err(KMeansError::InvalidK(
                "k must be greater than 0".to_string(),
            ));
        }
        if centroids.ncols() == 0 {
            return Err(KMeansError::InvalidDimensions(
                "centroids must have at least one feature".to_string(),
            ));
        }

        let k = centroids.nrows();
        Ok(Self {
            centroids,
            counts: Array1::zeros(k),
        })
    }

    /// Number of centroids.
    pub fn k(&self) -> usize {
        self.centroids.nrows()
    }

    /// Number of features per centroid.
    pub fn d(&self) -> usize {
        self.centroids.ncols()
    }

    pub fn centroids(&self) -> &Array2<f32> {
        &self.centroids
    }

    /// Cumulative per-cluster assignment counts.
    pub fn counts(&self) -> &Array1<u64> {
        &self.counts
    }

    pub fn into_parts(self) -> (Array2<f32>, Array1<u64>) {
        (self.centroids, self.counts)
    }

    /// Fold a mini-batch into the centroids.
    ///
    /// `assignments[i]` is the cluster of `batch.row(i)`. Clusters that
    /// receive no points keep both their centroid and their count. Nothing
    /// is mutated if validation fails.
    ///
    /// Returns the number of clusters that received at least one point.
    pub fn update(
        &mut self,
        batch: &ArrayView2<f32>,
        assignments: &[usize],
    ) -> Result<usize, KMeansError> {
        let k = self.k();
        let n_features = self.d();

        if batch.ncols() != n_features {
            return Err(KMeansError::InvalidDimensions(format!(
                "Expected {} features, got {}",
                n_features,
                batch.ncols()
            )));
        }
        if assignments.len() != batch.nrows() {
            return Err(KMeansError::InvalidDimensions(format!(
                "Got {} assignments for {} batch points",
                assignments.len(),
                batch.nrows()
            )));
        }
        if let Some(&bad) = assignments.iter().find(|&&c| c >= k) {
            return Err(KMeansError::InvalidDimensions(format!(
                "Cluster index {} out of range for k = {}",
                bad, k
            )));
        }

        // Accumulate in f64 so large batches don't lose precision
        let mut batch_sums: Array2<f64> = Array2::zeros((k, n_features));
        let mut batch_counts = vec![0u64; k];

        for (point, &cluster_idx) in batch.outer_iter().zip(assignments) {
            batch_counts[cluster_idx] += 1;
            let mut sum = batch_sums.row_mut(cluster_idx);
            for j in 0..n_features {
                sum[j] += point[j] as f64;
            }
        }

        let mut touched = 0;
        for (cluster_idx, &m) in batch_counts.iter().enumerate() {
            if m == 0 {
                continue;
            }
            touched += 1;

            let count = self.counts[cluster_idx] + m;
            self.counts[cluster_idx] = count;
            let eta = m as f64 / count as f64;

            let sum = batch_sums.row(cluster_idx);
            let mut centroid = self.centroids.row_mut(cluster_idx);
            for j in 0..n_features {
                let old = centroid[j] as f64;
                let batch_mean = sum[j] / m as f64;
                centroid[j] = (old + eta * (batch_mean - old)) as f32;
            }
        }

        Ok(touched)
    }
}
