//! Daily aggregation of hourly observations.

use crate::config::GoldRules;
use crate::constants::columns;
use crate::error::{PipelineError, Result};
use crate::frame;
use crate::gold::precision::round_half_even;
use crate::models::AggregationStats;

use chrono::NaiveDate;
use chrono_tz::Tz;
use polars::prelude::*;
use tracing::{debug, info, warn};

const STAGE: &str = "gold aggregator";

fn epoch_day() -> NaiveDate {
    NaiveDate::default()
}

/// Add `data_local`: the date of each observation on the local wall clock
pub fn add_calendar_date(mut df: DataFrame, zone: Tz) -> Result<DataFrame> {
    if !frame::has_column(&df, columns::OBSERVATION_TIMESTAMP) {
        return Err(PipelineError::missing_column(
            columns::OBSERVATION_TIMESTAMP,
            "gold loader",
        ));
    }

    let days: Vec<Option<i32>> = frame::utc_instants(&df, columns::OBSERVATION_TIMESTAMP)?
        .into_iter()
        .map(|instant| {
            instant.map(|t| {
                let local = t.with_timezone(&zone).date_naive();
                (local - epoch_day()).num_days() as i32
            })
        })
        .collect();

    let dates = Series::new(columns::CALENDAR_DATE.into(), days).cast(&DataType::Date)?;
    df.with_column(dates)?;
    Ok(df)
}

/// Whitespace to underscores, upper-cased
pub fn normalize_station(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect::<String>()
        .to_uppercase()
}

/// Group hourly rows by (calendar date, station) and compute the daily metrics.
///
/// Rules whose source column is absent are skipped, so the output schema
/// shrinks instead of carrying an all-null column. With no usable rule at
/// all the result is an empty frame.
///
/// # Arguments
///
/// * `df` - Silver hourly observations with `observation_timestamp` and the station column
/// * `rules` - Aggregation rules, amplitude definition, target zone and metric scales
///
/// # Returns
///
/// One row per (calendar date, station) sorted by date then station, plus
/// the rows excluded for a missing key and the metrics skipped for a missing source
pub fn aggregate_daily(df: &DataFrame, rules: &GoldRules) -> Result<(DataFrame, AggregationStats)> {
    let station = rules.station_column.as_str();
    for required in [columns::CALENDAR_DATE, station] {
        if !frame::has_column(df, required) {
            return Err(PipelineError::missing_column(required, STAGE));
        }
    }

    let mut stats = AggregationStats {
        input_rows: df.height(),
        ..Default::default()
    };

    let available: Vec<_> = rules
        .aggregations
        .iter()
        .filter(|rule| {
            let present = frame::has_column(df, &rule.source);
            if !present && !stats.missing_sources.contains(&rule.source) {
                stats.missing_sources.push(rule.source.clone());
            }
            present
        })
        .collect();

    for source in &stats.missing_sources {
        warn!("Source column {} not found; dependent daily metrics skipped", source);
    }
    if available.is_empty() {
        warn!("No aggregation rule has its source column; daily table is empty");
        return Ok((DataFrame::empty(), stats));
    }

    let mut hourly = df.clone();
    let stations: Vec<Option<String>> = frame::string_values(&hourly, station)?
        .into_iter()
        .map(|value| value.map(|v| normalize_station(&v)))
        .collect();
    let keyed: Vec<bool> = stations
        .iter()
        .zip(frame::i32_values(&hourly, columns::CALENDAR_DATE)?)
        .map(|(s, d)| s.is_some() && d.is_some())
        .collect();
    hourly.with_column(Series::new(station.into(), stations))?;

    stats.rows_without_key = keyed.iter().filter(|k| !**k).count();
    if stats.rows_without_key > 0 {
        warn!(
            "{} hourly rows lack a station or date and are excluded",
            stats.rows_without_key
        );
        hourly = hourly.filter(&BooleanChunked::from_slice("keyed".into(), &keyed))?;
    }

    let aggregations: Vec<Expr> = available
        .iter()
        .map(|rule| rule.op.expr(&rule.source, &rule.output))
        .collect();
    let produced: Vec<&str> = available.iter().map(|rule| rule.output.as_str()).collect();

    let mut daily = hourly
        .lazy()
        .group_by([col(columns::CALENDAR_DATE), col(station)])
        .agg(aggregations)
        .sort_by_exprs(
            [col(columns::CALENDAR_DATE), col(station)],
            SortMultipleOptions::default(),
        );

    let amplitude = &rules.amplitude;
    if produced.contains(&amplitude.minuend.as_str()) && produced.contains(&amplitude.subtrahend.as_str()) {
        daily = daily.with_column(
            (col(amplitude.minuend.as_str()) - col(amplitude.subtrahend.as_str()))
                .alias(amplitude.output.as_str()),
        );
    } else {
        debug!(
            "{} not derived: {} or {} unavailable",
            amplitude.output, amplitude.minuend, amplitude.subtrahend
        );
    }

    let mut daily = daily.collect()?;
    round_metrics(&mut daily, rules)?;

    stats.daily_rows = daily.height();
    info!(
        "Aggregated {} hourly rows into {} daily rows ({} metrics)",
        stats.input_rows,
        stats.daily_rows,
        daily.width() - 2
    );
    Ok((daily, stats))
}

/// Round each declared metric to its scale
fn round_metrics(daily: &mut DataFrame, rules: &GoldRules) -> Result<()> {
    for name in frame::column_names(daily) {
        let Some(scale) = rules.scale_for(&name) else {
            continue;
        };
        let rounded: Vec<Option<f64>> = frame::f64_values(daily, &name)?
            .into_iter()
            .map(|value| value.map(|v| round_half_even(v, scale)))
            .collect();
        daily.with_column(Series::new(name.as_str().into(), rounded))?;
    }
    Ok(())
}
