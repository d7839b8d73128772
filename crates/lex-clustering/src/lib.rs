//! Audience Clustering Library
//!
//! Automatic segmentation of survey respondents, built with Rust and Polars.
//!
//! # Overview
//!
//! A run takes the raw bytes of a CSV export and produces labelled clusters:
//!
//! - **Loading**: UTF-8, then Latin-1, then Windows-1252 decoding
//! - **Schema Normalization**: multi-line headers, blank rows, instruction rows
//! - **Column Detection**: fuzzy matching of column names to semantic roles
//! - **Feature Encoding**: category codes, median-filled numbers, standardization
//! - **Model Selection**: elbow of the k-means inertia curve
//! - **Quality Scores**: silhouette and Davies–Bouldin indices
//! - **Projection**: a 2-D principal-component view for plotting
//! - **Progress Reporting**: per-stage updates with cancellation support
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use lex_clustering::cluster_bytes;
//!
//! let bytes = std::fs::read("survey.csv")?;
//! let result = cluster_bytes(&bytes)?;
//!
//! println!("{} clusters", result.num_clusters);
//! for (label, members) in result.clusters.iter() {
//!     println!("{}: {:?}", label, members);
//! }
//! ```
//!
//! For progress updates, cancellation or a non-default seed, build a
//! [`Pipeline`]:
//!
//! ```rust,ignore
//! use lex_clustering::{CancellationToken, ClusteringConfig, Pipeline};
//!
//! let token = CancellationToken::new();
//! let result = Pipeline::builder()
//!     .config(ClusteringConfig::builder().random_seed(7).build()?)
//!     .cancellation_token(token.clone())
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .process_bytes(&bytes)?;
//! ```

pub mod cleaner;
pub mod clustering;
pub mod config;
pub mod error;
pub mod features;
pub mod loader;
pub mod pipeline;
pub mod profiler;
pub mod projection;
pub mod quality;
pub mod reporting;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use cleaner::{NormalizedTable, SchemaNormalizer};
pub use clustering::{
    ClusterEngine, KMeans, KMeansOptions, KSelection, OptimalKSelector, elbow_point,
};
pub use config::{ClusteringConfig, ClusteringConfigBuilder, ConfigValidationError};
pub use error::{PipelineError, Result as PipelineResult, ResultExt};
pub use features::{CategoryEncoder, FeatureEncoder, StandardScaler};
pub use loader::{DatasetLoader, LoadedTable, TextEncoding};
pub use pipeline::{
    CancellationToken, ClosureProgressReporter, ClusteringStage, Pipeline, PipelineBuilder,
    ProgressReporter, ProgressUpdate,
};
pub use profiler::{ColumnDetector, DetectedTable};
pub use projection::ProjectionReducer;
pub use quality::MetricsCalculator;
pub use reporting::{ClusteringReport, ReportGenerator, ResultAssembler};
pub use types::{
    ClusterAssignment, ClusterGroups, ClusteringResult, ColumnRole, ColumnRoleMap, ElbowCurve,
    FeatureMatrix, PartitionMetrics, ProjectionPoint, RoleKind, RunSummary, TableInspection,
    TrialRun,
};

/// Cluster a CSV buffer with the default configuration.
///
/// Equivalent to `Pipeline::builder().build()?.process_bytes(bytes)`.
pub fn cluster_bytes(bytes: &[u8]) -> error::Result<ClusteringResult> {
    Pipeline::builder().build()?.process_bytes(bytes)
}
