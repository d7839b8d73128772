//! Partitioning: choosing k and running the final k-means fit.

mod elbow;
mod kmeans;

pub use elbow::{KSelection, OptimalKSelector, elbow_point};
pub use kmeans::{KMeans, KMeansOptions};

use crate::config::ClusteringConfig;
use crate::error::{PipelineError, Result};
use crate::types::{ClusterAssignment, FeatureMatrix};
use tracing::info;

/// Runs the final k-means fit at the selected k.
pub struct ClusterEngine<'a> {
    config: &'a ClusteringConfig,
}

impl<'a> ClusterEngine<'a> {
    pub fn new(config: &'a ClusteringConfig) -> Self {
        Self { config }
    }

    /// Partition `data` into `k` clusters.
    ///
    /// Fails when `k` is zero or not smaller than the row count.
    pub fn fit(&self, data: &FeatureMatrix, k: usize) -> Result<ClusterAssignment> {
        let n = data.n_rows();
        if k == 0 || k >= n {
            return Err(PipelineError::Clustering(format!(
                "selected k = {} is invalid for {} rows",
                k, n
            )));
        }

        let assignment = KMeans::new(KMeansOptions {
            n_clusters: k,
            n_init: self.config.n_init,
            max_iter: self.config.max_iter,
            tolerance: self.config.tolerance,
            seed: self.config.random_seed,
        })
        .fit(data.rows())?;

        info!(
            "Clustered {} rows into {} clusters (inertia {:.4})",
            n, k, assignment.inertia
        );
        Ok(assignment)
    }
}
