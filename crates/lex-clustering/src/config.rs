//! Configuration types for the clustering pipeline.
//!
//! The pipeline is fully automatic: [`ClusteringConfig::default()`] is what
//! [`crate::cluster_bytes`] runs with. The builder exists for embedding
//! applications and tests that need a different seed or a tighter sweep.

use serde::{Deserialize, Serialize};

/// Default upper bound on the number of clusters explored by the k sweep.
pub const DEFAULT_MAX_CLUSTERS: usize = 15;

/// Default size limit for a single input buffer (16 MiB).
pub const DEFAULT_MAX_INPUT_BYTES: usize = 16 * 1024 * 1024;

/// Configuration for the clustering pipeline.
///
/// Use [`ClusteringConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use lex_clustering::config::ClusteringConfig;
///
/// let config = ClusteringConfig::builder()
///     .random_seed(7)
///     .n_init(4)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteringConfig {
    /// Largest k tried by the elbow sweep (further bounded by rows / 2).
    /// Default: 15
    pub max_clusters: usize,

    /// Number of k-means restarts per k; the lowest-inertia run wins.
    /// Default: 10
    pub n_init: usize,

    /// Maximum Lloyd iterations per restart.
    /// Default: 300
    pub max_iter: usize,

    /// Relative convergence tolerance, scaled by the mean feature variance.
    /// Default: 1e-4
    pub tolerance: f64,

    /// Seed for k-means++ initialization.
    /// Default: 42
    pub random_seed: u64,

    /// Fraction of blank or instruction-like cells above which the first data
    /// row is treated as a header continuation and dropped (0.0 - 1.0).
    /// Default: 0.5
    pub instruction_row_threshold: f64,

    /// Decimal places kept for the partition metrics.
    /// Default: 3
    pub metric_precision: u32,

    /// Largest accepted input buffer in bytes.
    /// Default: 16 MiB
    pub max_input_bytes: usize,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            max_clusters: DEFAULT_MAX_CLUSTERS,
            n_init: 10,
            max_iter: 300,
            tolerance: 1e-4,
            random_seed: 42,
            instruction_row_threshold: 0.5,
            metric_precision: 3,
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
        }
    }
}

impl ClusteringConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ClusteringConfigBuilder {
        ClusteringConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.max_clusters < 2 {
            return Err(ConfigValidationError::InvalidCount {
                field: "max_clusters".to_string(),
                value: self.max_clusters,
                minimum: 2,
            });
        }

        if self.n_init == 0 {
            return Err(ConfigValidationError::InvalidCount {
                field: "n_init".to_string(),
                value: self.n_init,
                minimum: 1,
            });
        }

        if self.max_iter == 0 {
            return Err(ConfigValidationError::InvalidCount {
                field: "max_iter".to_string(),
                value: self.max_iter,
                minimum: 1,
            });
        }

        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(ConfigValidationError::InvalidTolerance(self.tolerance));
        }

        if !(0.0..=1.0).contains(&self.instruction_row_threshold) {
            return Err(ConfigValidationError::InvalidThreshold {
                field: "instruction_row_threshold".to_string(),
                value: self.instruction_row_threshold,
            });
        }

        if self.metric_precision > 12 {
            return Err(ConfigValidationError::InvalidPrecision(self.metric_precision));
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid value for '{field}': {value} (must be at least {minimum})")]
    InvalidCount {
        field: String,
        value: usize,
        minimum: usize,
    },

    #[error("Invalid threshold for '{field}': {value} (must be between 0.0 and 1.0)")]
    InvalidThreshold { field: String, value: f64 },

    #[error("Invalid tolerance: {0} (must be a finite, non-negative number)")]
    InvalidTolerance(f64),

    #[error("Invalid metric precision: {0} (must be at most 12 decimal places)")]
    InvalidPrecision(u32),
}

impl From<ConfigValidationError> for crate::error::PipelineError {
    fn from(err: ConfigValidationError) -> Self {
        crate::error::PipelineError::InvalidConfig(err.to_string())
    }
}

/// Builder for [`ClusteringConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct ClusteringConfigBuilder {
    max_clusters: Option<usize>,
    n_init: Option<usize>,
    max_iter: Option<usize>,
    tolerance: Option<f64>,
    random_seed: Option<u64>,
    instruction_row_threshold: Option<f64>,
    metric_precision: Option<u32>,
    max_input_bytes: Option<usize>,
}

impl ClusteringConfigBuilder {
    /// Set the largest k tried by the elbow sweep.
    pub fn max_clusters(mut self, k: usize) -> Self {
        self.max_clusters = Some(k);
        self
    }

    /// Set the number of k-means restarts per k.
    pub fn n_init(mut self, n: usize) -> Self {
        self.n_init = Some(n);
        self
    }

    /// Set the maximum Lloyd iterations per restart.
    pub fn max_iter(mut self, n: usize) -> Self {
        self.max_iter = Some(n);
        self
    }

    /// Set the relative convergence tolerance.
    pub fn tolerance(mut self, tol: f64) -> Self {
        self.tolerance = Some(tol);
        self
    }

    /// Set the k-means++ seed.
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    /// Set the instruction-row threshold.
    ///
    /// # Arguments
    /// * `threshold` - Value between 0.0 and 1.0 (e.g., 0.5 = 50%)
    pub fn instruction_row_threshold(mut self, threshold: f64) -> Self {
        self.instruction_row_threshold = Some(threshold);
        self
    }

    /// Set the number of decimal places kept for metrics.
    pub fn metric_precision(mut self, digits: u32) -> Self {
        self.metric_precision = Some(digits);
        self
    }

    /// Set the largest accepted input size in bytes.
    pub fn max_input_bytes(mut self, bytes: usize) -> Self {
        self.max_input_bytes = Some(bytes);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `ClusteringConfig` or an error if validation fails.
    pub fn build(self) -> Result<ClusteringConfig, ConfigValidationError> {
        let defaults = ClusteringConfig::default();
        let config = ClusteringConfig {
            max_clusters: self.max_clusters.unwrap_or(defaults.max_clusters),
            n_init: self.n_init.unwrap_or(defaults.n_init),
            max_iter: self.max_iter.unwrap_or(defaults.max_iter),
            tolerance: self.tolerance.unwrap_or(defaults.tolerance),
            random_seed: self.random_seed.unwrap_or(defaults.random_seed),
            instruction_row_threshold: self
                .instruction_row_threshold
                .unwrap_or(defaults.instruction_row_threshold),
            metric_precision: self.metric_precision.unwrap_or(defaults.metric_precision),
            max_input_bytes: self.max_input_bytes.unwrap_or(defaults.max_input_bytes),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClusteringConfig::default();
        assert_eq!(config.max_clusters, 15);
        assert_eq!(config.n_init, 10);
        assert_eq!(config.random_seed, 42);
        assert_eq!(config.metric_precision, 3);
        assert_eq!(config.max_input_bytes, 16 * 1024 * 1024);
    }

    #[test]
    fn test_builder_defaults_match_default() {
        let config = ClusteringConfig::builder().build().unwrap();
        assert_eq!(config, ClusteringConfig::default());
    }

    #[test]
    fn test_builder_custom_values() {
        let config = ClusteringConfig::builder()
            .max_clusters(8)
            .n_init(3)
            .random_seed(7)
            .instruction_row_threshold(0.6)
            .build()
            .unwrap();

        assert_eq!(config.max_clusters, 8);
        assert_eq!(config.n_init, 3);
        assert_eq!(config.random_seed, 7);
        assert_eq!(config.instruction_row_threshold, 0.6);
    }

    #[test]
    fn test_validation_rejects_zero_restarts() {
        let result = ClusteringConfig::builder().n_init(0).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidCount { minimum: 1, .. }
        ));
    }

    #[test]
    fn test_validation_rejects_bad_threshold() {
        let result = ClusteringConfig::builder()
            .instruction_row_threshold(1.5)
            .build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidThreshold { .. }
        ));
    }

    #[test]
    fn test_validation_rejects_negative_tolerance() {
        let result = ClusteringConfig::builder().tolerance(-1.0).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidTolerance(_)
        ));
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "max_clusters": 6,
            "n_init": 2,
            "max_iter": 50,
            "tolerance": 0.001,
            "random_seed": 1,
            "instruction_row_threshold": 0.5,
            "metric_precision": 2,
            "max_input_bytes": 1024
        }"#;

        let config: ClusteringConfig = serde_json::from_str(json).expect("Should deserialize");
        assert_eq!(config.max_clusters, 6);
        assert_eq!(config.max_iter, 50);
        assert_eq!(config.max_input_bytes, 1024);
        assert!(config.validate().is_ok());
    }
}
