//! Silver layer: Bronze raw records → clean, deduplicated hourly table.
//!
//! normalize → quality/dedup → partition keys, then a delete-matching write
//! so re-running a period replaces its partitions instead of duplicating them.

pub mod normalizer;
pub mod partition;
pub mod quality;

#[cfg(test)]
mod tests;

use crate::config::{LakePaths, SilverRules};
use crate::error::Result;
use crate::models::{Layer, NormalizationStats, QualityStats, StageDetails, StageReport};
use crate::storage::TableStore;

use polars::prelude::DataFrame;
use std::time::Instant;
use tracing::{info, warn};

/// Clean hourly table with the statistics gathered producing it
#[derive(Debug)]
pub struct SilverOutput {
    pub frame: DataFrame,
    pub normalization: NormalizationStats,
    pub quality: QualityStats,
}

/// Pure transform from a raw Bronze table to the Silver hourly table
pub fn process_bronze_to_silver(raw: &DataFrame, rules: &SilverRules) -> Result<SilverOutput> {
    let (normalized, normalization) = normalizer::normalize(raw, &rules.normalizer)?;
    let (filtered, quality) = quality::filter_quality(normalized, &rules.quality)?;
    let frame = partition::assign_partitions(filtered)?;

    Ok(SilverOutput {
        frame,
        normalization,
        quality,
    })
}

/// Load Bronze, transform, write Silver
///
/// # Arguments
///
/// * `store` - Dataset store used for both the read and the write
/// * `lake` - Lake layout naming the Bronze and Silver datasets
/// * `rules` - Normalization, quality and partitioning rules
///
/// # Returns
///
/// The stage report; a skipped report when Bronze is empty
pub fn run(store: &dyn TableStore, lake: &LakePaths, rules: &SilverRules) -> Result<StageReport> {
    let start_time = Instant::now();
    let bronze_path = lake.bronze_path();
    info!("Silver: loading Bronze dataset from {}", bronze_path.display());

    let raw = store.read_table(&bronze_path)?;
    if raw.height() == 0 {
        warn!("Bronze dataset is empty, nothing to process");
        return Ok(StageReport::skipped(
            Layer::Silver,
            start_time.elapsed().as_millis(),
        ));
    }
    info!("Silver: {} Bronze records loaded", raw.height());

    let output = process_bronze_to_silver(&raw, rules)?;
    let write = if output.frame.height() == 0 {
        warn!("No valid observations left after normalization, nothing written");
        None
    } else {
        let silver_path = lake.silver_path();
        let summary = store.write_table(
            &output.frame,
            &silver_path,
            &rules.partition_columns,
            rules.write_mode,
        )?;
        info!(
            "Silver: wrote {} rows in {} partitions to {}",
            summary.rows_written,
            summary.partitions,
            silver_path.display()
        );
        Some(summary)
    };

    Ok(StageReport {
        layer: Layer::Silver,
        rows_in: raw.height(),
        rows_out: output.frame.height(),
        write,
        processing_time_ms: start_time.elapsed().as_millis(),
        details: StageDetails::Silver {
            normalization: output.normalization,
            quality: output.quality,
        },
    })
}
