use std::path::PathBuf;

use thiserror::Error;

/// Convenience result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Error type returned by sources, operators, sinks and the pipeline driver.
///
/// Every error is fatal to the run that produced it, except [`PipelineError::RowDecode`] when the
/// run is configured with [`crate::pipeline::RowDecodePolicy::Skip`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The source or sink resource could not be opened/created.
    #[error("cannot open resource '{path}': {source}")]
    Resource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An operator referenced a field the record does not have.
    #[error("schema mismatch: field '{field}' not found (available fields: {available:?})")]
    FieldNotFound { field: String, available: Vec<String> },

    /// The header row of a source is unusable (empty or duplicated names).
    #[error("invalid header: {message}")]
    InvalidHeader { message: String },

    /// The codec could not decode a row (ragged arity, invalid UTF-8, ...).
    #[error("failed to decode row {row}: {source}")]
    RowDecode {
        row: u64,
        #[source]
        source: csv::Error,
    },

    /// A record's field set does not match the header the sink already established.
    #[error("record {record} diverges from header: missing={missing:?} extra={extra:?}")]
    FieldSetDivergence {
        record: u64,
        missing: Vec<String>,
        extra: Vec<String>,
    },

    /// A record was built with the same field name twice.
    #[error("duplicate field name '{name}'")]
    DuplicateField { name: String },

    /// Invalid orderings, options or pipeline configs.
    #[error("invalid configuration: {message}")]
    Config { message: String },

    /// Underlying I/O error while writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV encoding error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON encoding/decoding error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    /// `true` for errors that indicate the pipeline's configuration does not match the data.
    pub fn is_schema_error(&self) -> bool {
        matches!(self, Self::FieldNotFound { .. })
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
