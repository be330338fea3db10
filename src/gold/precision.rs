//! Fixed-point precision and schema binding for the daily table.

use crate::config::{GoldColumnType, GoldRules};
use crate::constants::columns;
use crate::error::{PipelineError, Result};
use crate::frame;

use chrono::{Datelike, Days, NaiveDate};
use polars::prelude::*;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;
use tracing::{debug, warn};

/// Round to `scale` decimals, ties to even
pub fn round_half_even(value: f64, scale: u32) -> f64 {
    let factor = 10f64.powi(scale as i32);
    (value * factor).round_ties_even() / factor
}

/// Exact decimal for a finite float at `scale`.
///
/// The float's shortest round-trip representation is the starting point, so
/// 5.3 becomes exactly 5.30 rather than the binary expansion 5.2999....
pub fn to_fixed_point(value: f64, scale: u32) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    let exact = Decimal::from_str(&value.to_string())
        .or_else(|_| Decimal::try_from(value))
        .ok()?;
    let mut rounded = exact.round_dp_with_strategy(scale, RoundingStrategy::MidpointNearestEven);
    rounded.rescale(scale);
    Some(rounded)
}

/// True when `value` fits `precision` total digits at `scale`
pub fn fits_precision(value: &Decimal, precision: u32, scale: u32) -> bool {
    let integer_digits = precision.saturating_sub(scale);
    let limit = Decimal::from_i128_with_scale(10i128.pow(integer_digits), 0);
    value.abs() < limit
}

/// Bind the daily table to the declared Gold schema.
///
/// Adds `ano`/`mes` from the calendar date, converts metrics to exact
/// decimals, fills absent schema columns with nulls and orders columns as
/// declared. Columns outside the schema are dropped.
///
/// # Arguments
///
/// * `df` - Daily aggregates carrying `data_local`
/// * `rules` - Declared schema with each metric's precision and scale
///
/// # Returns
///
/// The daily table in schema order, ready for the partitioned write
pub fn enforce_schema(df: &DataFrame, rules: &GoldRules) -> Result<DataFrame> {
    if !frame::has_column(df, columns::CALENDAR_DATE) {
        return Err(PipelineError::missing_column(
            columns::CALENDAR_DATE,
            "gold schema enforcement",
        ));
    }

    let mut df = df.clone();
    add_year_month(&mut df)?;

    let height = df.height();
    let mut bound: Vec<Column> = Vec::new();
    for (name, column_type) in rules.target_schema() {
        let dtype = column_type.to_dtype();
        if !frame::has_column(&df, &name) {
            warn!("Schema column {} absent from daily table; filled with nulls", name);
            bound.push(Series::full_null(name.as_str().into(), height, &dtype).into_column());
            continue;
        }

        let series = match column_type {
            GoldColumnType::Decimal { precision, scale } => {
                decimal_series(&df, &name, precision, scale)?
            }
            _ => df.column(&name)?.as_materialized_series().cast(&dtype)?,
        };
        bound.push(series.into_column());
    }

    debug!("Bound {} daily rows to {} schema columns", height, bound.len());
    Ok(DataFrame::new(bound)?)
}

fn add_year_month(df: &mut DataFrame) -> Result<()> {
    let dates: Vec<Option<NaiveDate>> = frame::i32_values(df, columns::CALENDAR_DATE)?
        .into_iter()
        .map(|days| {
            days.and_then(|d| {
                let offset = Days::new(d.unsigned_abs() as u64);
                if d >= 0 {
                    NaiveDate::default().checked_add_days(offset)
                } else {
                    NaiveDate::default().checked_sub_days(offset)
                }
            })
        })
        .collect();

    let years: Vec<Option<i32>> = dates.iter().map(|d| d.map(|d| d.year())).collect();
    let months: Vec<Option<i32>> = dates.iter().map(|d| d.map(|d| d.month() as i32)).collect();
    df.with_column(Series::new(columns::GOLD_YEAR.into(), years))?;
    df.with_column(Series::new(columns::GOLD_MONTH.into(), months))?;
    Ok(())
}

fn decimal_series(df: &DataFrame, name: &str, precision: u32, scale: u32) -> Result<Series> {
    let mut overflowed = 0usize;
    let text: Vec<Option<String>> = frame::f64_values(df, name)?
        .into_iter()
        .map(|value| {
            let decimal = value.and_then(|v| to_fixed_point(v, scale))?;
            if fits_precision(&decimal, precision, scale) {
                Some(decimal.to_string())
            } else {
                overflowed += 1;
                None
            }
        })
        .collect();

    if overflowed > 0 {
        warn!(
            "{}: {} values exceed decimal({}, {}) and were nulled",
            name, overflowed, precision, scale
        );
    }

    Series::new(name.into(), text)
        .cast(&DataType::Decimal(
            Some(precision as usize),
            Some(scale as usize),
        ))
        .map_err(|e| PipelineError::DecimalConversion {
            column: name.to_string(),
            reason: e.to_string(),
        })
}
