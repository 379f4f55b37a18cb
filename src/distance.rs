use crate::error::KMeansError;
use ndarray::{ArrayView1, ArrayView2};
use rayon::prelude::*;

/// A distance between two feature vectors.
///
/// Implementations must be symmetric and non-negative for the centroid
/// update to be meaningful, but nothing in this crate relies on the
/// triangle inequality. Both arguments are guaranteed to have the same
/// length when called from this crate.
///
/// Returning an error aborts the training run that requested the distance;
/// centroids updated by already completed iterations are kept.
pub trait Distance: Send + Sync {
    fn distance(&self, a: ArrayView1<'_, f32>, b: ArrayView1<'_, f32>)
        -> Result<f32, KMeansError>;

    /// Whether `distance` already returns a squared quantity. k-means++
    /// seeding then uses it as a weight without squaring it again.
    fn is_squared(&self) -> bool {
        false
    }
}

/// Built-in distance metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Metric {
    /// L2 distance
    #[default]
    Euclidean,

    /// Squared L2 distance (same assignments as `Euclidean`, no square root)
    SquaredEuclidean,

    /// L1 distance
    Manhattan,

    /// `1 - cos(a, b)`. Zero vectors are treated as orthogonal to everything.
    Cosine,
}

impl Distance for Metric {
    fn distance(
        &self,
        a: ArrayView1<'_, f32>,
        b: ArrayView1<'_, f32>,
    ) -> Result<f32, KMeansError> {
        let d = match self {
            Metric::Euclidean => squared_euclidean(a, b).sqrt(),
            Metric::SquaredEuclidean => squared_euclidean(a, b),
            Metric::Manhattan => a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| (x - y).abs())
                .sum::<f32>(),
            Metric::Cosine => {
                let norm_a = a.dot(&a).sqrt();
                let norm_b = b.dot(&b).sqrt();
                if norm_a == 0.0 || norm_b == 0.0 {
                    1.0
                } else {
                    (1.0 - a.dot(&b) / (norm_a * norm_b)).max(0.0)
                }
            }
        };
        Ok(d)
    }

    fn is_squared(&self) -> bool {
        matches!(self, Metric::SquaredEuclidean)
    }
}

#[inline]
fn squared_euclidean(a: ArrayView1<'_, f32>, b: ArrayView1<'_, f32>) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Adapter that turns a closure into a [`Distance`].
///
/// ```
/// use minibatch_kmeans::{Distance, FnDistance};
/// use ndarray::array;
///
/// let chebyshev = FnDistance::new(|a, b| {
///     Ok(a.iter().zip(b.iter()).fold(0.0f32, |m, (x, y)| m.max((x - y).abs())))
/// });
/// let d = chebyshev.distance(array![0.0f32, 0.0].view(), array![3.0f32, -4.0].view()).unwrap();
/// assert_eq!(d, 4.0);
/// ```
pub struct FnDistance<F> {
    f: F,
}

impl<F> FnDistance<F>
where
    F: for<'a, 'b> Fn(ArrayView1<'a, f32>, ArrayView1<'b, f32>) -> Result<f32, KMeansError>
        + Send
        + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> Distance for FnDistance<F>
where
    F: for<'a, 'b> Fn(ArrayView1<'a, f32>, ArrayView1<'b, f32>) -> Result<f32, KMeansError>
        + Send
        + Sync,
{
    fn distance(
        &self,
        a: ArrayView1<'_, f32>,
        b: ArrayView1<'_, f32>,
    ) -> Result<f32, KMeansError> {
        (self.f)(a, b)
    }
}

/// Compute centroid shift (sum of L2 norms of centroid movements)
pub fn compute_centroid_shift(
    old_centroids: &ArrayView2<f32>,
    new_centroids: &ArrayView2<f32>,
) -> f64 {
    let k = old_centroids.nrows();

    (0..k)
        .into_par_iter()
        .map(|i| {
            let old_c = old_centroids.row(i);
            let new_c = new_centroids.row(i);

            let mut diff_sq = 0.0f64;
            for j in 0..old_c.len() {
                let d = (new_c[j] - old_c[j]) as f64;
                diff_sq += d * d;
            }
            diff_sq.sqrt()
        })
        .sum()
}
