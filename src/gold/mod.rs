//! Gold layer: clean hourly table → daily data mart.
//!
//! Loads Silver, derives the local calendar date, aggregates per
//! (date, station), binds the result to the fixed decimal schema and writes
//! it partitioned by year, month and station.

pub mod aggregator;
pub mod precision;

#[cfg(test)]
mod tests;

use crate::config::{GoldRules, LakePaths};
use crate::error::Result;
use crate::models::{AggregationStats, Layer, StageDetails, StageReport};
use crate::storage::TableStore;

use polars::prelude::DataFrame;
use std::time::Instant;
use tracing::{info, warn};

/// Read Silver and attach the local calendar date
pub fn load_silver(store: &dyn TableStore, lake: &LakePaths, rules: &GoldRules) -> Result<DataFrame> {
    let silver_path = lake.silver_path();
    info!("Gold: loading Silver dataset from {}", silver_path.display());

    let silver = store.read_table(&silver_path)?;
    if silver.height() == 0 {
        return Ok(silver);
    }
    aggregator::add_calendar_date(silver, rules.timezone()?)
}

/// Pure transform from the hourly table (with calendar date) to the bound Gold table
pub fn build_daily_mart(hourly: &DataFrame, rules: &GoldRules) -> Result<(DataFrame, AggregationStats)> {
    let (daily, stats) = aggregator::aggregate_daily(hourly, rules)?;
    if daily.height() == 0 {
        return Ok((daily, stats));
    }
    Ok((precision::enforce_schema(&daily, rules)?, stats))
}

/// Load Silver, aggregate, write Gold
///
/// # Arguments
///
/// * `store` - Dataset store used for both the read and the write
/// * `lake` - Lake layout naming the Silver and Gold datasets
/// * `rules` - Aggregation rules, schema and Gold write mode
///
/// # Returns
///
/// The stage report; a skipped report when Silver is empty
pub fn run(store: &dyn TableStore, lake: &LakePaths, rules: &GoldRules) -> Result<StageReport> {
    let start_time = Instant::now();
    rules.validate()?;

    let hourly = load_silver(store, lake, rules)?;
    if hourly.height() == 0 {
        warn!("Silver dataset is empty, nothing to aggregate");
        return Ok(StageReport::skipped(
            Layer::Gold,
            start_time.elapsed().as_millis(),
        ));
    }
    info!("Gold: {} hourly observations loaded", hourly.height());

    let (gold, stats) = build_daily_mart(&hourly, rules)?;
    let write = if gold.height() == 0 {
        warn!("Daily table is empty, nothing written");
        None
    } else {
        let gold_path = lake.gold_path();
        let summary =
            store.write_table(&gold, &gold_path, &rules.partition_columns, rules.write_mode)?;
        info!(
            "Gold: wrote {} daily rows in {} partitions to {}",
            summary.rows_written,
            summary.partitions,
            gold_path.display()
        );
        Some(summary)
    };

    Ok(StageReport {
        layer: Layer::Gold,
        rows_in: hourly.height(),
        rows_out: gold.height(),
        write,
        processing_time_ms: start_time.elapsed().as_millis(),
        details: StageDetails::Gold(stats),
    })
}
