//! Error types for flybeta-predict
//!
//! Per-record failures (`ScoringError`, `FeatureSchemaError`, per-message
//! `SinkError::Publish`) are captured as data and never abort a run. Only
//! `SourceError::Unavailable`, `SinkError::Unavailable` and configuration errors
//! surface as `PipelineError`.

use thiserror::Error;

/// Failure of a single scoring call
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoringError {
    /// Network failure or timeout; retryable within the retry budget
    #[error("Transient scoring failure: {0}")]
    Transient(String),

    /// Non-success status or malformed response; terminal for the stage
    #[error("Scoring service error{}: {detail}", .status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default())]
    Service { status: Option<u16>, detail: String },

    /// Client could not be constructed
    #[error("Scoring client setup failed: {0}")]
    Setup(String),
}

impl ScoringError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ScoringError::Transient(_))
    }
}

/// Missing or invalid declared feature field
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureSchemaError {
    #[error("Missing feature field '{field}' for stage {stage}")]
    MissingField { stage: u8, field: String },

    #[error("Invalid value {value} for feature field '{field}' in stage {stage}: {reason}")]
    InvalidField {
        stage: u8,
        field: String,
        value: f64,
        reason: String,
    },
}

/// Message sink failures
#[derive(Debug, Error)]
pub enum SinkError {
    /// One message could not be published; counted, non-fatal
    #[error("Publish failed for key {key}: {detail}")]
    Publish { key: String, detail: String },

    /// Sink cannot be opened/flushed/closed; fatal for the run
    #[error("Sink unavailable: {0}")]
    Unavailable(String),
}

/// Input series failures
#[derive(Debug, Error)]
pub enum SourceError {
    /// Input series unreadable; fatal for the run
    #[error("Source unavailable ({series}): {detail}")]
    Unavailable { series: String, detail: String },

    /// One row violates the field-rename contract; the row is skipped
    #[error("Rejected {series} row {line}: {detail}")]
    InvalidRecord {
        series: String,
        line: usize,
        detail: String,
    },
}

/// Fatal, run-aborting errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error(transparent)]
    Config(#[from] flybeta_common::Error),
}
