//! Plausibility ranges and duplicate removal for hourly observations.
//!
//! Out-of-range readings are nulled, never dropped: the rest of the row is
//! still a valid observation. Duplicates on the business key keep the first
//! occurrence in input order.

use crate::config::QualityRules;
use crate::error::{PipelineError, Result};
use crate::frame;
use crate::models::QualityStats;

use polars::prelude::*;
use std::collections::HashSet;
use tracing::{debug, info};

/// Apply range rules, then deduplicate
///
/// # Arguments
///
/// * `df` - Normalized hourly observations
/// * `rules` - Range rules and the deduplication key
///
/// # Returns
///
/// Observations with out-of-range values nulled and the first row kept per
/// key, plus per-rule null counts and the number of duplicates removed
pub fn filter_quality(df: DataFrame, rules: &QualityRules) -> Result<(DataFrame, QualityStats)> {
    let mut stats = QualityStats::default();
    let df = apply_range_rules(df, rules, &mut stats)?;
    let df = deduplicate(df, &rules.dedup_key, &mut stats)?;

    info!(
        "Quality filter: {} values nulled by range rules, {} duplicate rows removed",
        stats.total_nulled(),
        stats.duplicates_removed
    );
    Ok((df, stats))
}

/// Null every float value outside the ranges matching its column
pub fn apply_range_rules(
    mut df: DataFrame,
    rules: &QualityRules,
    stats: &mut QualityStats,
) -> Result<DataFrame> {
    for name in frame::column_names(&df) {
        if !df.column(&name)?.dtype().is_float() {
            continue;
        }
        let applicable: Vec<_> = rules.rules_for(&name).collect();
        if applicable.is_empty() {
            continue;
        }

        let mut nulled = 0usize;
        let values: Vec<Option<f64>> = frame::f64_values(&df, &name)?
            .into_iter()
            .map(|value| {
                value.and_then(|v| {
                    if applicable.iter().all(|rule| rule.contains(v)) {
                        Some(v)
                    } else {
                        nulled += 1;
                        None
                    }
                })
            })
            .collect();

        if nulled > 0 {
            debug!("{}: {} values outside plausibility range", name, nulled);
            df.with_column(Series::new(name.as_str().into(), values))?;
            stats.nulled_by_column.insert(name, nulled);
        }
    }
    Ok(df)
}

/// Keep the first row of every distinct key
pub fn deduplicate(df: DataFrame, key: &[String], stats: &mut QualityStats) -> Result<DataFrame> {
    for name in key {
        if !frame::has_column(&df, name) {
            return Err(PipelineError::missing_column(name, "silver deduplication"));
        }
    }

    let key_values = key
        .iter()
        .map(|name| frame::string_values(&df, name))
        .collect::<PolarsResult<Vec<_>>>()?;

    let mut seen: HashSet<Vec<Option<&str>>> = HashSet::with_capacity(df.height());
    let keep: Vec<bool> = (0..df.height())
        .map(|row| {
            let row_key = key_values
                .iter()
                .map(|values| values[row].as_deref())
                .collect();
            seen.insert(row_key)
        })
        .collect();

    let kept = keep.iter().filter(|k| **k).count();
    stats.duplicates_removed = df.height() - kept;
    if stats.duplicates_removed == 0 {
        return Ok(df);
    }

    debug!(
        "Removing {} duplicate rows on key {:?}",
        stats.duplicates_removed, key
    );
    Ok(df.filter(&BooleanChunked::from_slice("first_occurrence".into(), &keep))?)
}
