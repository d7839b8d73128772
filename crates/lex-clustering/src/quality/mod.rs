//! Partition quality scoring.
//!
//! Computes the silhouette score (cohesion against separation) and the
//! Davies–Bouldin index (within-cluster spread against centroid distance) for
//! the final partition.

mod metrics;

use crate::error::{PipelineError, Result};
use crate::types::{ClusterAssignment, FeatureMatrix, PartitionMetrics};
use crate::utils::round_to;
use tracing::debug;

/// Scores a partition of the standardized feature matrix.
pub struct MetricsCalculator {
    precision: u32,
}

impl MetricsCalculator {
    pub fn new(precision: u32) -> Self {
        Self { precision }
    }

    /// Compute both indices, rounded to the configured precision.
    ///
    /// Fails with [`PipelineError::MetricsUndefined`] when the partition has
    /// fewer than two clusters, as many clusters as rows, an empty cluster, or
    /// yields a non-finite score.
    pub fn compute(
        &self,
        data: &FeatureMatrix,
        assignment: &ClusterAssignment,
    ) -> Result<PartitionMetrics> {
        let n = data.n_rows();
        let k = assignment.k();

        if k < 2 {
            return Err(PipelineError::MetricsUndefined(format!(
                "need at least 2 clusters, got {}",
                k
            )));
        }
        if k >= n {
            return Err(PipelineError::MetricsUndefined(format!(
                "{} clusters for {} rows",
                k, n
            )));
        }
        if assignment.labels.len() != n {
            return Err(PipelineError::MetricsUndefined(format!(
                "{} labels for {} rows",
                assignment.labels.len(),
                n
            )));
        }
        if let Some(empty) = assignment.cluster_sizes().iter().position(|&s| s == 0) {
            return Err(PipelineError::MetricsUndefined(format!(
                "cluster {} is empty",
                empty
            )));
        }

        let silhouette = metrics::silhouette_score(data.rows(), &assignment.labels, k);
        let davies_bouldin = metrics::davies_bouldin_index(data.rows(), &assignment.labels, k);
        debug!(
            "Raw metrics: silhouette {:.6}, davies-bouldin {:.6}",
            silhouette, davies_bouldin
        );

        if !silhouette.is_finite() || !davies_bouldin.is_finite() {
            return Err(PipelineError::MetricsUndefined(
                "score is not a finite number".to_string(),
            ));
        }

        Ok(PartitionMetrics {
            silhouette_score: round_to(silhouette, self.precision),
            davies_bouldin_index: round_to(davies_bouldin, self.precision),
        })
    }
}

impl Default for MetricsCalculator {
    fn default() -> Self {
        Self::new(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> FeatureMatrix {
        FeatureMatrix::from_rows(
            vec!["x".into()],
            vec![vec![0.0], vec![2.0], vec![10.0], vec![12.0]],
        )
        .unwrap()
    }

    fn assignment(labels: Vec<usize>, k: usize) -> ClusterAssignment {
        ClusterAssignment {
            labels,
            centroids: vec![vec![0.0]; k],
            inertia: 0.0,
        }
    }

    #[test]
    fn test_compute_rounds() {
        let metrics = MetricsCalculator::default()
            .compute(&data(), &assignment(vec![0, 0, 1, 1], 2))
            .unwrap();
        // (2 * 9/11 + 2 * 7/9) / 4 = 0.7979...
        assert_eq!(metrics.silhouette_score, 0.798);
        assert_eq!(metrics.davies_bouldin_index, 0.2);
    }

    #[test]
    fn test_compute_single_cluster_undefined() {
        let err = MetricsCalculator::default()
            .compute(&data(), &assignment(vec![0, 0, 0, 0], 1))
            .unwrap_err();
        assert_eq!(err.error_code(), "METRICS_UNDEFINED");
    }

    #[test]
    fn test_compute_empty_cluster_undefined() {
        let err = MetricsCalculator::default()
            .compute(&data(), &assignment(vec![0, 0, 2, 2], 3))
            .unwrap_err();
        assert!(err.to_string().contains("cluster 1 is empty"));
    }

    #[test]
    fn test_compute_k_equals_n_undefined() {
        let err = MetricsCalculator::default()
            .compute(&data(), &assignment(vec![0, 1, 2, 3], 4))
            .unwrap_err();
        assert!(matches!(err, PipelineError::MetricsUndefined(_)));
    }
}
