//! Initial centroid selection.
//!
//! Seeding is a one-off pass over the full dataset before any mini-batch
//! iteration runs. Strategies plug into [`MiniBatchKMeans`](crate::MiniBatchKMeans)
//! through the [`Seeding`] trait.

use crate::config::InitMethod;
use crate::distance::Distance;
use crate::error::KMeansError;
use crate::sampler::sample_indices;
use ndarray::{Array2, ArrayView2, Axis};
use rand::{Rng, RngCore};
use rayon::prelude::*;

/// Produces an initial `k x d` centroid matrix for a dataset.
pub trait Seeding: Send + Sync {
    fn seed_centroids(
        &self,
        data: &ArrayView2<f32>,
        k: usize,
        distance: &dyn Distance,
        rng: &mut dyn RngCore,
    ) -> Result<Array2<f32>, KMeansError>;
}

/// Pick `k` distinct data points uniformly at random
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSeeding;

impl Seeding for RandomSeeding {
    fn seed_centroids(
        &self,
        data: &ArrayView2<f32>,
        k: usize,
        _distance: &dyn Distance,
        rng: &mut dyn RngCore,
    ) -> Result<Array2<f32>, KMeansError> {
        check_enough_samples(data, k)?;

        let selected = sample_indices(k, data.nrows(), rng)?;
        Ok(data.select(Axis(0), &selected))
    }
}

/// k-means++ seeding.
///
/// The first centroid is a uniformly random data point; each following one
/// is drawn with probability proportional to the squared distance from a
/// point to its nearest already-chosen centroid. Distances that are already
/// squared (see [`Distance::is_squared`]) are used as weights directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct KMeansPlusPlus;

impl Seeding for KMeansPlusPlus {
    fn seed_centroids(
        &self,
        data: &ArrayView2<f32>,
        k: usize,
        distance: &dyn Distance,
        rng: &mut dyn RngCore,
    ) -> Result<Array2<f32>, KMeansError> {
        check_enough_samples(data, k)?;
        let n_samples = data.nrows();

        let mut chosen: Vec<usize> = Vec::with_capacity(k);
        let mut is_chosen = vec![false; n_samples];
        let first = rng.gen_range(0..n_samples);
        chosen.push(first);
        is_chosen[first] = true;

        // Distance from every point to its closest chosen centroid so far
        let mut min_dists: Vec<f64> = vec![f64::INFINITY; n_samples];

        while chosen.len() < k {
            let latest = data.row(chosen[chosen.len() - 1]);

            min_dists = min_dists
                .into_par_iter()
                .enumerate()
                .map(|(i, current)| {
                    let d = distance.distance(data.row(i), latest)? as f64;
                    Ok(current.min(d))
                })
                .collect::<Result<Vec<f64>, KMeansError>>()?;

            let weights: Vec<f64> = min_dists
                .iter()
                .enumerate()
                .map(|(i, &d)| {
                    if is_chosen[i] {
                        0.0
                    } else {
                        seeding_weight(distance, d)
                    }
                })
                .collect();
            let total_weight: f64 = weights.iter().sum();

            let selected = if total_weight > 0.0 && total_weight.is_finite() {
                let threshold = rng.gen_range(0.0..total_weight);
                let mut cumsum = 0.0;
                let mut selected = None;
                for (i, &w) in weights.iter().enumerate() {
                    cumsum += w;
                    if w > 0.0 && cumsum > threshold {
                        selected = Some(i);
                        break;
                    }
                }
                // Rounding can leave the threshold just past the final sum
                selected.or_else(|| weights.iter().rposition(|&w| w > 0.0))
            } else {
                None
            };

            // Every remaining point coincides with a chosen centroid
            let selected = match selected {
                Some(i) => i,
                None => (0..n_samples)
                    .find(|&i| !is_chosen[i])
                    .ok_or_else(|| {
                        KMeansError::InsufficientData(format!(
                            "Number of samples ({}) is less than k ({})",
                            n_samples, k
                        ))
                    })?,
            };

            chosen.push(selected);
            is_chosen[selected] = true;
        }

        Ok(data.select(Axis(0), &chosen))
    }
}

/// Caller-supplied initial centroids, validated against the data shape
#[derive(Debug, Clone)]
pub struct ExplicitCentroids {
    centroids: Array2<f32>,
}

impl ExplicitCentroids {
    pub fn new(centroids: Array2<f32>) -> Self {
        Self { centroids }
    }

    pub fn centroids(&self) -> &Array2<f32> {
        &self.centroids
    }
}

impl Seeding for ExplicitCentroids {
    fn seed_centroids(
        &self,
        data: &ArrayView2<f32>,
        k: usize,
        _distance: &dyn Distance,
        _rng: &mut dyn RngCore,
    ) -> Result<Array2<f32>, KMeansError> {
        let (rows, cols) = self.centroids.dim();
        if rows != k || cols != data.ncols() {
            return Err(KMeansError::InvalidDimensions(format!(
                "Initial centroids have shape ({}, {}), expected ({}, {})",
                rows,
                cols,
                k,
                data.ncols()
            )));
        }
        Ok(self.centroids.clone())
    }
}

impl Seeding for InitMethod {
    fn seed_centroids(
        &self,
        data: &ArrayView2<f32>,
        k: usize,
        distance: &dyn Distance,
        rng: &mut dyn RngCore,
    ) -> Result<Array2<f32>, KMeansError> {
        match self {
            InitMethod::Random => RandomSeeding.seed_centroids(data, k, distance, rng),
            InitMethod::KMeansPlusPlus => KMeansPlusPlus.seed_centroids(data, k, distance, rng),
        }
    }
}

/// k-means++ sampling weight for a nearest-centroid distance `d`.
fn seeding_weight(distance: &dyn Distance, d: f64) -> f64 {
    if distance.is_squared() {
        d
    } else {
        d * d
    }
}

fn check_enough_samples(data: &ArrayView2<f32>, k: usize) -> Result<(), KMeansError> {
    if k == 0 {
        return Err(KMeansError::InvalidK(
            "k must be greater than 0".to_string(),
        ));
    }
    if data.nrows() < k {
        return Err(KMeansError::InsufficientData(format!(
            "Number of samples ({}) is less than k ({})",
            data.nrows(),
            k
        )));
    }
    Ok(())
}
