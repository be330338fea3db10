//! Small DataFrame helpers shared by the stages.

use polars::prelude::*;

/// True when `df` carries a column called `name`
pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_index(name).is_some()
}

/// Column names in frame order
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect()
}

/// Cell values of a column rendered as strings; nulls stay `None`
pub fn string_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<String>>> {
    let series = df
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    Ok(series
        .str()?
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect())
}

/// Cell values of a numeric column as f64
pub fn f64_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<f64>>> {
    let series = df
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    Ok(series.f64()?.into_iter().collect())
}

/// Physical i64 values (epoch units for datetimes)
pub fn i64_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<i64>>> {
    let series = df
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::Int64)?;
    Ok(series.i64()?.into_iter().collect())
}

/// Physical i32 values (days since epoch for dates)
pub fn i32_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<i32>>> {
    let series = df
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::Int32)?;
    Ok(series.i32()?.into_iter().collect())
}

/// Datetime dtype carrying an IANA zone name
pub fn zoned_datetime(unit: TimeUnit, zone: &str) -> PolarsResult<DataType> {
    let zone = TimeZone::opt_try_new(Some(zone))?;
    Ok(DataType::Datetime(unit, zone))
}

/// UTC instants behind a datetime column, whatever its unit or zone
pub fn utc_instants(
    df: &DataFrame,
    name: &str,
) -> PolarsResult<Vec<Option<chrono::DateTime<chrono::Utc>>>> {
    let unit = match df.column(name)?.dtype() {
        DataType::Datetime(unit, _) => *unit,
        other => {
            polars_bail!(SchemaMismatch: "column '{}' is {:?}, expected a datetime", name, other)
        }
    };

    let instants = i64_values(df, name)?
        .into_iter()
        .map(|value| {
            value.and_then(|v| match unit {
                TimeUnit::Milliseconds => chrono::DateTime::from_timestamp_millis(v),
                TimeUnit::Microseconds => chrono::DateTime::from_timestamp_micros(v),
                TimeUnit::Nanoseconds => Some(chrono::DateTime::from_timestamp_nanos(v)),
            })
        })
        .collect();
    Ok(instants)
}
