//! Custom error types for the clustering pipeline.
//!
//! Every fatal condition a run can hit has its own variant so callers (and
//! the upload handler in front of them) can tell a bad file apart from a
//! defect. Errors are serializable as `{code, message}` so a surrounding
//! service can forward them to a client unchanged.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the clustering pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// None of the supported text encodings could decode the input.
    #[error("Could not decode file: tried {tried}")]
    Decode { tried: String },

    /// No usable rows remain after cleaning.
    #[error("CSV file is empty or contains no valid data")]
    EmptyDataset,

    /// Fewer than two feature roles could be mapped onto columns.
    #[error(
        "Insufficient features detected for clustering. \
         Found {categorical} categorical and {numeric} numerical features \
         (detected roles: {detected:?}). Unmapped columns: {unmapped:?}. \
         Please ensure your CSV has at least 2 feature columns (categorical or numerical)."
    )]
    InsufficientFeatures {
        categorical: usize,
        numeric: usize,
        detected: Vec<String>,
        /// Columns not used as identity or by any detected role.
        unmapped: Vec<String>,
    },

    /// A detected numeric column has no parseable value at all.
    #[error("Numeric column '{column}' (role '{role}') has no valid values to compute a median")]
    InsufficientData { role: String, column: String },

    /// An internal precondition of the partitioning step was violated.
    #[error("Clustering failed: {0}")]
    Clustering(String),

    /// Partition quality scores cannot be computed for this partition.
    #[error("Partition metrics undefined: {0}")]
    MetricsUndefined(String),

    /// Pipeline was cancelled by the caller.
    #[error("Pipeline cancelled")]
    Cancelled,

    /// Input buffer exceeds the configured size limit.
    #[error("Input is {size} bytes, larger than the {limit} byte limit")]
    InputTooLarge { size: usize, limit: usize },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<PipelineError>,
    },
}

impl PipelineError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PipelineError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get error code for client-side handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Decode { .. } => "DECODE_ERROR",
            Self::EmptyDataset => "EMPTY_DATASET",
            Self::InsufficientFeatures { .. } => "INSUFFICIENT_FEATURES",
            Self::InsufficientData { .. } => "INSUFFICIENT_DATA",
            Self::Clustering(_) => "CLUSTERING_ERROR",
            Self::MetricsUndefined(_) => "METRICS_UNDEFINED",
            Self::Cancelled => "CANCELLED",
            Self::InputTooLarge { .. } => "INPUT_TOO_LARGE",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error represents a cancellation.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::WithContext { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }

    /// Whether the failure is caused by the uploaded data rather than a defect.
    ///
    /// `Clustering` signals a violated internal precondition and is never
    /// attributed to the input.
    pub fn is_input_error(&self) -> bool {
        match self {
            Self::Decode { .. }
            | Self::EmptyDataset
            | Self::InsufficientFeatures { .. }
            | Self::InsufficientData { .. }
            | Self::InputTooLarge { .. } => true,
            Self::WithContext { source, .. } => source.is_input_error(),
            _ => false,
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for PipelineError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("PipelineError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for clustering operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| PipelineError::Polars(e).with_context(context))
    }
}
