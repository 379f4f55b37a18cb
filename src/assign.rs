use crate::distance::Distance;
use crate::error::KMeansError;
use ndarray::{ArrayView1, ArrayView2};
use rayon::prelude::*;

/// Find the closest centroid to `point` and its distance.
///
/// Centroids are scanned left to right and only a strictly smaller distance
/// replaces the current best, so on ties the lowest index wins. NaN
/// distances never win.
pub fn nearest_centroid_with_distance<D: Distance + ?Sized>(
    point: ArrayView1<f32>,
    centroids: &ArrayView2<f32>,
    distance: &D,
) -> Result<(usize, f32), KMeansError> {
    check_shapes(point.len(), centroids)?;

    let mut best_label = 0;
    let mut best_dist = f32::INFINITY;

    for (j, centroid) in centroids.outer_iter().enumerate() {
        let dist = distance.distance(point, centroid)?;
        if dist < best_dist {
            best_dist = dist;
            best_label = j;
        }
    }

    Ok((best_label, best_dist))
}

/// Index of the closest centroid to `point` (lowest index on ties).
pub fn nearest_centroid<D: Distance + ?Sized>(
    point: ArrayView1<f32>,
    centroids: &ArrayView2<f32>,
    distance: &D,
) -> Result<usize, KMeansError> {
    nearest_centroid_with_distance(point, centroids, distance).map(|(label, _)| label)
}

/// Assign every row of `points` to its nearest centroid.
///
/// Rows are processed in parallel; the result is in row order. The first
/// failing distance evaluation aborts the whole batch.
pub fn assign_batch<D: Distance + ?Sized>(
    points: &ArrayView2<f32>,
    centroids: &ArrayView2<f32>,
    distance: &D,
) -> Result<Vec<(usize, f32)>, KMeansError> {
    check_shapes(points.ncols(), centroids)?;

    (0..points.nrows())
        .into_par_iter()
        .map(|i| nearest_centroid_with_distance(points.row(i), centroids, distance))
        .collect()
}

fn check_shapes(n_features: usize, centroids: &ArrayView2<f32>) -> Result<(), KMeansError> {
    if centroids.nrows() == 0 {
        return Err(KMeansError::InvalidK(
            "no centroids to assign to".to_string(),
        ));
    }
    if n_features != centroids.ncols() {
        return Err(KMeansError::InvalidDimensions(format!(
            "Point has {} features, centroids have {}",
            n_features,
            centroids.ncols()
        )));
    }
    Ok(())
}
