//! Silver partition keys.
//!
//! Year and month come from the UTC instant behind the observation
//! timestamp, not from the local wall clock: an observation at 01:00 UTC on
//! the first of a month belongs to that month even though it is still the
//! previous day in Fortaleza.

use crate::constants::columns;
use crate::error::{PipelineError, Result};
use crate::frame;

use chrono::Datelike;
use polars::prelude::*;

/// Add (or overwrite) `partition_year` and `partition_month`
pub fn assign_partitions(mut df: DataFrame) -> Result<DataFrame> {
    if !frame::has_column(&df, columns::OBSERVATION_TIMESTAMP) {
        return Err(PipelineError::missing_column(
            columns::OBSERVATION_TIMESTAMP,
            "silver partitioning",
        ));
    }

    let instants = frame::utc_instants(&df, columns::OBSERVATION_TIMESTAMP)?;
    let years: Vec<Option<i32>> = instants.iter().map(|ts| ts.map(|t| t.year())).collect();
    let months: Vec<Option<i32>> = instants
        .iter()
        .map(|ts| ts.map(|t| t.month() as i32))
        .collect();

    // The Bronze ingestion year is superseded, and keys go last
    for stale in [columns::PARTITION_YEAR, columns::PARTITION_MONTH] {
        if frame::has_column(&df, stale) {
            df = df.drop(stale)?;
        }
    }
    df.with_column(Series::new(columns::PARTITION_YEAR.into(), years))?;
    df.with_column(Series::new(columns::PARTITION_MONTH.into(), months))?;
    Ok(df)
}
