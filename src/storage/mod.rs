//! Columnar storage collaborator.
//!
//! Stages never touch files directly: they hand in-memory tables to a
//! [`TableStore`] and get merged tables back. Partitioning is hive-style
//! (`key=value` directories) with partition columns kept out of the files
//! and restored from the path on read.

pub mod parquet;

use crate::error::Result;
use crate::models::{WriteMode, WriteSummary};
use polars::prelude::DataFrame;
use std::path::Path;

pub use parquet::ParquetDatasetStore;

/// Read/write contract between the stages and the physical lake
pub trait TableStore: Send + Sync {
    /// Merge every file under `base` into one table. A missing or empty
    /// dataset yields an empty frame; unreadable files are errors.
    fn read_table(&self, base: &Path) -> Result<DataFrame>;

    /// Write `df` under `base`, split by `partition_columns`
    fn write_table(
        &self,
        df: &DataFrame,
        base: &Path,
        partition_columns: &[String],
        mode: WriteMode,
    ) -> Result<WriteSummary>;
}
