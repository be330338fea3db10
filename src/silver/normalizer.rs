//! Raw record normalization.
//!
//! Maps the INMET header vocabulary onto canonical column names, builds the
//! zone-aware observation timestamp from the separate date and UTC hour
//! fields, and coerces measurement columns to f64. Malformed rows and cells
//! are absorbed and counted; only a broken rule set is an error.

use crate::config::NormalizerRules;
use crate::constants::columns;
use crate::error::{PipelineError, Result};
use crate::frame;
use crate::models::NormalizationStats;

use chrono::{Duration, NaiveDateTime};
use polars::prelude::*;
use tracing::{debug, warn};

const STAGE: &str = "silver normalizer";

/// Outcome of coercing one raw measurement cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MeasurementCell {
    Value(f64),
    Empty,
    MissingToken,
    Unparseable,
}

impl MeasurementCell {
    pub fn value(self) -> Option<f64> {
        match self {
            MeasurementCell::Value(v) => Some(v),
            _ => None,
        }
    }
}

/// Normalize a raw Bronze table into hourly observations
///
/// # Arguments
///
/// * `raw` - String-typed Bronze rows using the INMET header vocabulary
/// * `rules` - Rename map, timestamp format, target zone and numeric parsing rules
///
/// # Returns
///
/// Rows with a valid `observation_timestamp` and numeric measurements, plus
/// counts of dropped timestamps and absorbed values
pub fn normalize(raw: &DataFrame, rules: &NormalizerRules) -> Result<(DataFrame, NormalizationStats)> {
    rules.validate()?;
    let zone = rules.timezone()?;

    let mut stats = NormalizationStats {
        input_rows: raw.height(),
        ..Default::default()
    };

    let mut df = select_canonical_columns(raw, rules, &mut stats)?;
    for required in [&rules.date_column, &rules.hour_column] {
        if !frame::has_column(&df, required) {
            return Err(PipelineError::missing_column(required.as_str(), STAGE));
        }
    }

    let dates = frame::string_values(&df, &rules.date_column)?;
    let hours = frame::string_values(&df, &rules.hour_column)?;
    let instants: Vec<Option<i64>> = dates
        .iter()
        .zip(&hours)
        .map(|(date, hour)| match (date, hour) {
            (Some(date), Some(hour)) => {
                parse_observation_instant(date, hour, rules).map(|ts| ts.and_utc().timestamp_millis())
            }
            _ => None,
        })
        .collect();

    let keep: Vec<bool> = instants.iter().map(Option::is_some).collect();
    stats.invalid_timestamps = keep.iter().filter(|k| !**k).count();

    let timestamp = Series::new(columns::OBSERVATION_TIMESTAMP.into(), instants).cast(
        &frame::zoned_datetime(TimeUnit::Milliseconds, zone.name())?,
    )?;
    df.insert_column(0, timestamp)?;
    df = df
        .drop(&rules.date_column)?
        .drop(&rules.hour_column)?;

    if stats.invalid_timestamps > 0 {
        warn!(
            "Dropped {} of {} rows with invalid date/hour values",
            stats.invalid_timestamps, stats.input_rows
        );
        df = df.filter(&BooleanChunked::from_slice("valid_timestamp".into(), &keep))?;
    }

    coerce_measurements(&mut df, rules, &mut stats)?;

    debug!(
        "Normalized {} rows into {} observations ({} unparseable values, {} missing-value tokens)",
        stats.input_rows,
        df.height(),
        stats.unparseable_values,
        stats.missing_value_tokens
    );
    Ok((df, stats))
}

/// Keep mapped raw columns under their canonical names, in lookup order
fn select_canonical_columns(
    raw: &DataFrame,
    rules: &NormalizerRules,
    stats: &mut NormalizationStats,
) -> Result<DataFrame> {
    let mut selected: Vec<Column> = Vec::with_capacity(rules.column_map.len());
    let mut seen: Vec<&str> = Vec::new();

    for mapping in &rules.column_map {
        if seen.contains(&mapping.canonical.as_str()) {
            continue;
        }
        if frame::has_column(raw, &mapping.raw) {
            let mut column = raw.column(&mapping.raw)?.clone();
            column.rename(mapping.canonical.as_str().into());
            selected.push(column);
            seen.push(mapping.canonical.as_str());
        } else {
            stats.missing_columns.push(mapping.canonical.clone());
        }
    }

    let dropped: Vec<String> = frame::column_names(raw)
        .into_iter()
        .filter(|name| !rules.column_map.iter().any(|m| &m.raw == name))
        .collect();
    if !dropped.is_empty() {
        debug!("Dropping unmapped raw columns: {:?}", dropped);
    }
    if !stats.missing_columns.is_empty() {
        debug!("Canonical columns absent from input: {:?}", stats.missing_columns);
    }

    Ok(DataFrame::new(selected)?)
}

/// Strip the unit marker, left-pad to four digits and rewrite end-of-day.
/// Returns the cleaned token and whether the end-of-day sentinel was seen.
pub fn clean_hour_token(hour: &str, rules: &NormalizerRules) -> (String, bool) {
    let mut token = hour.trim();
    if !rules.hour_unit_suffix.is_empty() {
        token = token
            .strip_suffix(rules.hour_unit_suffix.as_str())
            .unwrap_or(token)
            .trim_end();
    }

    let width = crate::constants::timestamp::HOUR_WIDTH;
    let padded = format!("{:0>width$}", token, width = width);
    if padded == rules.end_of_day_token {
        (rules.start_of_day_token.clone(), true)
    } else {
        (padded, false)
    }
}

/// Parse a date and UTC hour into a naive UTC instant
pub fn parse_observation_instant(
    date: &str,
    hour: &str,
    rules: &NormalizerRules,
) -> Option<NaiveDateTime> {
    let (token, end_of_day) = clean_hour_token(hour, rules);
    let text = format!("{} {}", date.trim(), token);
    let parsed = NaiveDateTime::parse_from_str(&text, &rules.timestamp_format).ok()?;

    if end_of_day && rules.roll_end_of_day {
        parsed.checked_add_signed(Duration::days(1))
    } else {
        Some(parsed)
    }
}

/// Coerce one raw cell to a finite f64
pub fn parse_measurement(raw: &str, rules: &NormalizerRules) -> MeasurementCell {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return MeasurementCell::Empty;
    }
    if rules.missing_value_tokens.iter().any(|t| t == trimmed) {
        return MeasurementCell::MissingToken;
    }

    let normalized = if rules.decimal_separator == '.' {
        trimmed.to_string()
    } else {
        trimmed.replace(rules.decimal_separator, ".")
    };
    match normalized.parse::<f64>() {
        Ok(value) if value.is_finite() => MeasurementCell::Value(value),
        _ => MeasurementCell::Unparseable,
    }
}

fn coerce_measurements(
    df: &mut DataFrame,
    rules: &NormalizerRules,
    stats: &mut NormalizationStats,
) -> Result<()> {
    for name in &rules.measurement_columns {
        if !frame::has_column(df, name) {
            continue;
        }

        let values: Vec<Option<f64>> = if df.column(name)?.dtype() == &DataType::String {
            let cells = frame::string_values(df, name)?;
            let mut unparseable = 0usize;
            let values = cells
                .iter()
                .map(|cell| {
                    let parsed = cell
                        .as_deref()
                        .map(|raw| parse_measurement(raw, rules))
                        .unwrap_or(MeasurementCell::Empty);
                    match parsed {
                        MeasurementCell::Unparseable => unparseable += 1,
                        MeasurementCell::MissingToken => stats.missing_value_tokens += 1,
                        _ => {}
                    }
                    parsed.value()
                })
                .collect();

            if unparseable > 0 {
                debug!("{}: {} values could not be parsed as numbers", name, unparseable);
                stats.unparseable_values += unparseable;
            }
            values
        } else {
            frame::f64_values(df, name)?
                .into_iter()
                .map(|v| v.filter(|x| x.is_finite()))
                .collect()
        };

        df.with_column(Series::new(name.as_str().into(), values))?;
    }
    Ok(())
}
