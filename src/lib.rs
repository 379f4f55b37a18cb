//! # minibatch-kmeans
//!
//! Mini-batch k-means clustering in Rust, compatible with ndarray.
//!
//! Instead of a full pass over the data, every iteration samples a small
//! random batch of rows (without replacement), assigns each one to its
//! nearest centroid and moves the touched centroids towards the running
//! mean of every point they have ever been assigned.
//!
//! ## Features
//!
//! - **Exact streaming means**: per-cluster counts make each centroid the
//!   mean of all points assigned to it so far, independent of how those
//!   points were split into batches
//! - **Pluggable distance**: built-in [`Metric`]s or any [`Distance`]
//!   implementation, including closures via [`FnDistance`]
//! - **Pluggable seeding**: random, k-means++, explicit centroids or any [`Seeding`]
//! - **Reproducible**: all randomness comes from an explicit seedable generator
//! - **Parallel assignment**: batch points are assigned with rayon
//!
//! ## Example
//!
//! ```rust
//! use minibatch_kmeans::MiniBatchKMeans;
//! use ndarray::Array2;
//! use ndarray_rand::RandomExt;
//! use ndarray_rand::rand_distr::Uniform;
//!
//! let data = Array2::random((2000, 32), Uniform::new(-1.0f32, 1.0));
//!
//! // 10 clusters, batches of 256 points, 100 iterations
//! let mut kmeans = MiniBatchKMeans::new(10, 256, 100).unwrap();
//! kmeans.train(&data.view()).unwrap();
//!
//! let labels = kmeans.predict(&data.view()).unwrap();
//! assert_eq!(labels.len(), 2000);
//! ```
//!
//! ## Custom Configuration
//!
//! ```rust
//! use minibatch_kmeans::{InitMethod, Metric, MiniBatchConfig, MiniBatchKMeans};
//! use ndarray::Array2;
//! use ndarray_rand::RandomExt;
//! use ndarray_rand::rand_distr::Uniform;
//!
//! let data = Array2::random((5000, 16), Uniform::new(-1.0f32, 1.0));
//!
//! let config = MiniBatchConfig {
//!     k: 20,
//!     batch_size: 512,
//!     num_iterations: 50,
//!     seed: 42,
//!     init: InitMethod::KMeansPlusPlus,
//!     metric: Metric::SquaredEuclidean,
//!     verbose: false,
//! };
//!
//! let mut kmeans = MiniBatchKMeans::with_config(config).unwrap();
//! let labels = kmeans.fit_predict(&data.view()).unwrap();
//! assert!(labels.iter().all(|&l| l < 20));
//! ```
//!
//! ## Logging
//!
//! Progress is reported through [`tracing`](https://docs.rs/tracing). Per-iteration
//! events are emitted at `debug` level, or `info` when `verbose` is set.

mod algorithm;
mod assign;
mod config;
mod distance;
mod error;
mod kmeans;
mod sampler;
mod seeding;
mod store;

pub use algorithm::{run_minibatch, IterationReport, RunOutcome};
pub use assign::{assign_batch, nearest_centroid, nearest_centroid_with_distance};
pub use config::{InitMethod, MiniBatchConfig};
pub use distance::{Distance, FnDistance, Metric};
pub use error::KMeansError;
pub use kmeans::{MiniBatchKMeans, TrainingState};
pub use sampler::{sample_indices, IndexSampler};
pub use seeding::{ExplicitCentroids, KMeansPlusPlus, RandomSeeding, Seeding};
pub use store::CentroidStore;
