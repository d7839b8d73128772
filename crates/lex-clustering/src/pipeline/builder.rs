//! Main clustering pipeline module.
//!
//! This module provides the core `Pipeline` struct and builder for
//! orchestrating the clustering workflow.

use crate::cleaner::SchemaNormalizer;
use crate::clustering::{ClusterEngine, OptimalKSelector};
use crate::config::ClusteringConfig;
use crate::error::{PipelineError, Result};
use crate::features::{FeatureEncoder, StandardScaler};
use crate::loader::DatasetLoader;
use crate::pipeline::progress::{
    CancellationToken, ClosureProgressReporter, ClusteringStage, ProgressReporter, ProgressUpdate,
};
use crate::profiler::{ColumnDetector, DetectedTable};
use crate::projection::ProjectionReducer;
use crate::quality::MetricsCalculator;
use crate::reporting::{AssemblyParams, ResultAssembler};
use crate::types::{ClusteringResult, RunSummary, TableInspection};
use crate::utils::column_names;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// The main clustering pipeline.
///
/// Use [`Pipeline::builder()`] to create a new pipeline with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// use lex_clustering::{Pipeline, ClusteringConfig, CancellationToken};
///
/// let token = CancellationToken::new();
///
/// let result = Pipeline::builder()
///     .cancellation_token(token.clone())
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     })
///     .config(ClusteringConfig::default())
///     .build()?
///     .process_bytes(&bytes)?;
/// ```
pub struct Pipeline {
    config: ClusteringConfig,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cancellation_token: CancellationToken,
}

// One pipeline may serve concurrent requests.
static_assertions::assert_impl_all!(Pipeline: Send, Sync);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &ClusteringConfig {
        &self.config
    }

    /// Cluster the rows of a CSV buffer.
    ///
    /// # Errors
    ///
    /// Returns `Err(PipelineError::InputTooLarge)` for buffers above
    /// `max_input_bytes` and `Err(PipelineError::Cancelled)` if the
    /// cancellation token fires. Other errors describe unusable input.
    pub fn process_bytes(&self, bytes: &[u8]) -> Result<ClusteringResult> {
        match self.process_internal(bytes) {
            Ok(result) => {
                self.report_progress(ProgressUpdate::complete(format!(
                    "Clustered {} rows into {} clusters",
                    result.total_rows, result.num_clusters
                )));
                Ok(result)
            }
            Err(e) => {
                if e.is_cancelled() {
                    self.report_progress(ProgressUpdate::cancelled());
                } else {
                    self.report_progress(ProgressUpdate::failed(e.to_string()));
                }
                error!("Pipeline error: {}", e);
                Err(e)
            }
        }
    }

    /// Read a CSV file and cluster it.
    pub fn process_path(&self, path: impl AsRef<Path>) -> Result<ClusteringResult> {
        let bytes = self.read_input(path.as_ref())?;
        self.process_bytes(&bytes)
    }

    /// Load, normalize and detect columns without clustering.
    pub fn inspect_bytes(&self, bytes: &[u8]) -> Result<TableInspection> {
        self.check_size(bytes)?;

        let loaded = DatasetLoader::load_bytes(bytes)?;
        let rows_read = loaded.df.height();
        let normalized =
            SchemaNormalizer::new(self.config.instruction_row_threshold).normalize(loaded.df)?;
        let DetectedTable { df, roles } = ColumnDetector::detect(normalized.df)?;

        Ok(TableInspection {
            encoding: loaded.encoding,
            rows_read,
            rows_dropped: normalized.rows_dropped,
            total_rows: df.height(),
            columns: column_names(&df),
            column_roles: roles,
        })
    }

    /// Read a CSV file and inspect it.
    pub fn inspect_path(&self, path: impl AsRef<Path>) -> Result<TableInspection> {
        let bytes = self.read_input(path.as_ref())?;
        self.inspect_bytes(&bytes)
    }

    fn read_input(&self, path: &Path) -> Result<Vec<u8>> {
        std::fs::read(path)
            .map_err(|e| PipelineError::from(e).with_context(format!("Failed to read {}", path.display())))
    }

    fn check_size(&self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > self.config.max_input_bytes {
            return Err(PipelineError::InputTooLarge {
                size: bytes.len(),
                limit: self.config.max_input_bytes,
            });
        }
        Ok(())
    }

    /// Check if cancellation has been requested.
    fn check_cancelled(&self) -> Result<()> {
        if self.cancellation_token.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        Ok(())
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn begin_stage(&self, stage: ClusteringStage, message: &str) -> Result<()> {
        self.check_cancelled()?;
        info!("{}", message);
        self.report_progress(ProgressUpdate::new(stage, 0.0, message));
        Ok(())
    }

    fn process_internal(&self, bytes: &[u8]) -> Result<ClusteringResult> {
        let start_time = Instant::now();
        self.check_size(bytes)?;

        // Step 1: Decode and parse
        self.begin_stage(ClusteringStage::Loading, "Loading dataset...")?;
        let loaded = DatasetLoader::load_bytes(bytes)?;
        let encoding = loaded.encoding;
        let rows_read = loaded.df.height();

        // Step 2: Normalize headers and rows
        self.begin_stage(ClusteringStage::Normalizing, "Normalizing schema...")?;
        let normalized =
            SchemaNormalizer::new(self.config.instruction_row_threshold).normalize(loaded.df)?;

        // Step 3: Map columns to roles
        self.begin_stage(ClusteringStage::DetectingColumns, "Detecting columns...")?;
        let DetectedTable { df, roles } = ColumnDetector::detect(normalized.df)?;
        if roles.is_identity_synthesized() {
            warn!(
                "No identity column found; rows are labelled Person_1..Person_{}",
                df.height()
            );
        }

        // Step 4: Encode features
        self.begin_stage(ClusteringStage::Encoding, "Encoding features...")?;
        let features = FeatureEncoder::encode(&df, &roles)?;
        debug!("Feature matrix: {:?}", features.feature_names());

        // Step 5: Standardize
        self.begin_stage(ClusteringStage::Scaling, "Scaling features...")?;
        let scaled = StandardScaler::fit_transform(&features);

        // Step 6: Sweep k
        self.begin_stage(ClusteringStage::SelectingK, "Selecting number of clusters...")?;
        let selector = OptimalKSelector::new(&self.config);
        let total_trials = selector.candidates(scaled.n_rows()).len();
        let selection = selector.select_with(&scaled, |trial| {
            self.report_progress(ProgressUpdate::with_items(
                ClusteringStage::SelectingK,
                format!("k = {}", trial.k),
                trial.k,
                total_trials,
                format!("Evaluated k = {} (inertia {:.3})", trial.k, trial.inertia),
            ));
            self.check_cancelled()
        })?;
        info!("Optimal number of clusters: {}", selection.k);

        // Step 7: Final fit
        self.begin_stage(ClusteringStage::Clustering, "Clustering...")?;
        let assignment = ClusterEngine::new(&self.config).fit(&scaled, selection.k)?;

        // Step 8: Quality scores
        self.begin_stage(ClusteringStage::ScoringMetrics, "Scoring partition...")?;
        let metrics = MetricsCalculator::new(self.config.metric_precision)
            .compute(&scaled, &assignment)?;
        info!(
            "Silhouette {:.3}, Davies-Bouldin {:.3}",
            metrics.silhouette_score, metrics.davies_bouldin_index
        );

        // Step 9: Projection (degrades to None)
        self.begin_stage(ClusteringStage::Projecting, "Projecting to 2-D...")?;
        let projection = ProjectionReducer::project(&scaled, &assignment.labels);

        // Step 10: Package
        self.begin_stage(ClusteringStage::Assembling, "Assembling result...")?;
        let summary = RunSummary {
            duration_ms: start_time.elapsed().as_millis() as u64,
            encoding,
            rows_read,
            rows_dropped: normalized.rows_dropped,
            features: features.feature_names().to_vec(),
            identity_synthesized: roles.is_identity_synthesized(),
        };

        ResultAssembler::assemble(AssemblyParams {
            df: &df,
            roles: &roles,
            assignment: &assignment,
            metrics,
            trials: &selection.trials,
            projection,
            summary,
        })
    }
}

/// Builder for [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<ClusteringConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cancellation_token: Option<CancellationToken>,
}

static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: ClusteringConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a progress reporter for receiving updates during processing.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use lex_clustering::{ProgressReporter, ProgressUpdate};
    /// use std::sync::Arc;
    ///
    /// struct MyReporter;
    ///
    /// impl ProgressReporter for MyReporter {
    ///     fn report(&self, update: ProgressUpdate) {
    ///         println!("{}: {}", update.stage.display_name(), update.message);
    ///     }
    /// }
    ///
    /// let pipeline = Pipeline::builder()
    ///     .progress_reporter(Arc::new(MyReporter))
    ///     .build()?;
    /// ```
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    ///
    /// For more complex scenarios, use [`progress_reporter`](Self::progress_reporter).
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Set a cancellation token for stopping the pipeline.
    ///
    /// Clone the token and call [`CancellationToken::cancel()`] from any
    /// thread; the run stops at the next stage boundary or k trial.
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Pipeline, crate::config::ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(Pipeline {
            config,
            progress_reporter: self.progress_reporter,
            cancellation_token: self.cancellation_token.unwrap_or_default(),
        })
    }
}
