//! Basic example demonstrating minibatch-kmeans usage
//!
//! Run with: RUST_LOG=info cargo run --example basic --release

use minibatch_kmeans::{InitMethod, MiniBatchConfig, MiniBatchKMeans};
use ndarray::Array2;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use std::ops::ControlFlow;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== minibatch-kmeans example ===\n");

    // Generate synthetic data: 3 clusters in 2D for easy visualization
    let n_samples = 3000;
    let n_features = 2;
    let n_clusters = 3;

    println!("Generating {} samples with {} features...", n_samples, n_features);

    let mut data = Array2::<f32>::zeros((n_samples, n_features));
    let centers = [[-5.0f32, -5.0], [0.0, 5.0], [5.0, -5.0]];
    let noise = Array2::random((n_samples, n_features), Uniform::new(-1.0f32, 1.0));

    for i in 0..n_samples {
        let cluster_idx = i % 3;
        data[[i, 0]] = centers[cluster_idx][0] + noise[[i, 0]];
        data[[i, 1]] = centers[cluster_idx][1] + noise[[i, 1]];
    }

    println!("True cluster centers:");
    for (i, center) in centers.iter().enumerate() {
        println!("  Cluster {}: ({:.2}, {:.2})", i, center[0], center[1]);
    }
    println!();

    let config = MiniBatchConfig::new(n_clusters)
        .with_mb_params(100, 50)
        .with_seed(42)
        .with_init(InitMethod::KMeansPlusPlus)
        .with_verbose(true);

    println!(
        "Running mini-batch k-means with k={}, batch_size={}, iterations={}...\n",
        config.k, config.batch_size, config.num_iterations
    );

    let mut kmeans = MiniBatchKMeans::with_config(config)?;
    kmeans.train_with_observer(&data.view(), |report| {
        if report.iteration % 10 == 0 {
            println!(
                "  Iteration {}/{}: mean distance = {:.4}, shift = {:.6}",
                report.iteration, report.num_iterations, report.mean_distance, report.centroid_shift
            );
        }
        ControlFlow::Continue(())
    })?;

    println!("\nLearned centroids:");
    let centroids = kmeans.centroids().ok_or("no centroids after training")?;
    let counts = kmeans.counts().ok_or("no counts after training")?;
    for i in 0..centroids.nrows() {
        println!(
            "  Centroid {}: ({:.4}, {:.4})  [{} batch points]",
            i,
            centroids[[i, 0]],
            centroids[[i, 1]],
            counts[i]
        );
    }
    println!();

    let labels = kmeans.predict(&data.view())?;

    let mut cluster_counts = vec![0usize; n_clusters];
    for &label in labels.iter() {
        cluster_counts[label] += 1;
    }

    println!("Cluster distribution:");
    for (i, count) in cluster_counts.iter().enumerate() {
        println!(
            "  Cluster {}: {} samples ({:.1}%)",
            i,
            count,
            (*count as f64 / n_samples as f64) * 100.0
        );
    }

    println!("\nInertia: {:.2}", kmeans.inertia(&data.view())?);
    println!("\n=== Done! ===");
    Ok(())
}
