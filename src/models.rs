//! Core data structures shared by the pipeline stages.
//!
//! Defines the lake layers, storage write modes, aggregation operators and
//! the statistics each stage reports back to its caller.

use polars::prelude::{Expr, col};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Medallion layers of the lake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Layer {
    Bronze,
    Silver,
    Gold,
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Layer::Bronze => "bronze",
            Layer::Silver => "silver",
            Layer::Gold => "gold",
        };
        f.write_str(name)
    }
}

/// How a partitioned write treats partitions that already hold data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteMode {
    /// Replace the full contents of every partition present in the new data
    DeleteMatching,
    /// Add new files next to whatever the partition already holds
    OverwriteOrIgnore,
}

/// Reduction applied to one source column within a daily group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregateOp {
    Max,
    Min,
    Sum,
    Mean,
}

impl AggregateOp {
    /// Lazy expression reducing `source` and naming the result `output`
    pub fn expr(&self, source: &str, output: &str) -> Expr {
        let source = col(source);
        let reduced = match self {
            AggregateOp::Max => source.max(),
            AggregateOp::Min => source.min(),
            AggregateOp::Sum => source.sum(),
            AggregateOp::Mean => source.mean(),
        };
        reduced.alias(output)
    }
}

/// Row-level outcomes of the raw record normalizer
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NormalizationStats {
    pub input_rows: usize,
    /// Rows dropped because date and hour did not form a valid timestamp
    pub invalid_timestamps: usize,
    /// Non-empty cells in measurement columns that did not parse as numbers
    pub unparseable_values: usize,
    /// Cells holding a configured missing-value sentinel
    pub missing_value_tokens: usize,
    /// Known canonical columns whose raw header was absent
    pub missing_columns: Vec<String>,
}

/// Row-level outcomes of the quality and deduplication filter
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct QualityStats {
    /// Cells set to null because they fell outside their plausibility range
    pub nulled_by_column: BTreeMap<String, usize>,
    pub duplicates_removed: usize,
}

impl QualityStats {
    pub fn total_nulled(&self) -> usize {
        self.nulled_by_column.values().sum()
    }
}

/// Outcomes of the daily aggregation
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AggregationStats {
    pub input_rows: usize,
    pub daily_rows: usize,
    /// Source columns required by a rule but absent from the hourly table
    pub missing_sources: Vec<String>,
    /// Hourly rows without a station or calendar date, excluded from grouping
    pub rows_without_key: usize,
}

/// Outcomes of the Bronze acquisition
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AcquisitionStats {
    pub years_requested: Vec<i32>,
    pub years_ingested: Vec<i32>,
    pub years_failed: Vec<i32>,
    pub files_read: usize,
    pub files_failed: usize,
}

/// What a storage write produced
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    pub partitions: usize,
    pub files_written: usize,
    pub rows_written: usize,
}

impl WriteSummary {
    pub fn absorb(&mut self, other: &WriteSummary) {
        self.partitions += other.partitions;
        self.files_written += other.files_written;
        self.rows_written += other.rows_written;
    }
}

/// Layer-specific statistics carried by a stage report
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageDetails {
    Bronze(AcquisitionStats),
    Silver {
        normalization: NormalizationStats,
        quality: QualityStats,
    },
    Gold(AggregationStats),
    /// Upstream table was empty; nothing was transformed or written
    Skipped,
}

/// Summary returned by every stage entry point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub layer: Layer,
    pub rows_in: usize,
    pub rows_out: usize,
    pub write: Option<WriteSummary>,
    pub processing_time_ms: u128,
    pub details: StageDetails,
}

impl StageReport {
    pub fn skipped(layer: Layer, processing_time_ms: u128) -> Self {
        Self {
            layer,
            rows_in: 0,
            rows_out: 0,
            write: None,
            processing_time_ms,
            details: StageDetails::Skipped,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.details, StageDetails::Skipped)
    }
}
