//! Error handling for pipeline stages.
//!
//! Structural failures (missing key columns, broken timestamp formats,
//! unknown timezones) abort a stage. Row-level data problems never reach
//! this type: they are absorbed into nulls and counted in stage statistics.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Required column '{column}' missing in {stage} input")]
    MissingColumn { column: String, stage: String },

    #[error("Invalid timestamp format '{format}': {reason}")]
    InvalidTimestampFormat { format: String, reason: String },

    #[error("Unknown timezone: {name}")]
    UnknownTimezone { name: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Storage failure at {path}: {reason}")]
    Storage { path: PathBuf, reason: String },

    #[error("Download failed for {url}: {reason}")]
    Download { url: String, reason: String },

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("CSV parsing failed in {file}: {source}")]
    Csv {
        file: String,
        #[source]
        source: csv::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Decimal conversion failed for {column}: {reason}")]
    DecimalConversion { column: String, reason: String },

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl PipelineError {
    /// Errors caused by the shape of the input or of the rule set rather than
    /// by the environment (disk, network).
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            PipelineError::MissingColumn { .. }
                | PipelineError::InvalidTimestampFormat { .. }
                | PipelineError::UnknownTimezone { .. }
                | PipelineError::Configuration { .. }
        )
    }

    pub fn missing_column(column: impl Into<String>, stage: impl Into<String>) -> Self {
        PipelineError::MissingColumn {
            column: column.into(),
            stage: stage.into(),
        }
    }

    pub fn storage(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        PipelineError::Storage {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
