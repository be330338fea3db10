//! Tests for the Gold layer

pub mod precision_tests;
pub mod stage_tests;

use crate::constants::columns;
use crate::frame;
use crate::gold::aggregator::add_calendar_date;
use chrono::{NaiveDateTime, TimeZone as _};
use chrono_tz::America::Fortaleza;
use polars::prelude::*;

/// Epoch milliseconds of a Fortaleza wall-clock time ("2025-04-01 12:00")
pub fn local_ms(wall_clock: &str) -> i64 {
    let naive = NaiveDateTime::parse_from_str(wall_clock, "%Y-%m-%d %H:%M").unwrap();
    Fortaleza
        .from_local_datetime(&naive)
        .single()
        .unwrap()
        .timestamp_millis()
}

pub fn with_timestamps(mut df: DataFrame, wall_clocks: &[&str]) -> DataFrame {
    let millis: Vec<i64> = wall_clocks.iter().map(|w| local_ms(w)).collect();
    let dtype = frame::zoned_datetime(TimeUnit::Milliseconds, "America/Fortaleza").unwrap();
    let timestamps = Series::new(columns::OBSERVATION_TIMESTAMP.into(), millis)
        .cast(&dtype)
        .unwrap();
    df.insert_column(0, timestamps).unwrap();
    df
}

/// Five clean hourly rows: two days for João Pessoa, one for Patos
pub fn sample_silver_frame() -> DataFrame {
    let df = df!(
        columns::STATION => ["JOAO PESSOA", "JOAO PESSOA", "PATOS", "PATOS", "JOAO PESSOA"],
        columns::TEMP_MAX => [30.0f64, 32.5, 35.0, 36.0, 31.0],
        columns::TEMP_MIN => [29.0f64, 30.5, 33.0, 34.0, 30.0],
        columns::PRECIPITATION => [0.0f64, 5.2, 0.0, 0.0, 10.0],
        columns::TEMP_DRY_BULB => [29.5f64, 31.5, 34.0, 35.0, 30.5],
        columns::HUMIDITY => [80.0f64, 75.0, 50.0, 48.0, 90.0],
    )
    .unwrap();
    with_timestamps(
        df,
        &[
            "2025-04-01 12:00",
            "2025-04-01 13:00",
            "2025-04-01 12:00",
            "2025-04-01 13:00",
            "2025-04-02 12:00",
        ],
    )
}

/// Sample Silver rows with `data_local` already derived
pub fn hourly_with_dates() -> DataFrame {
    add_calendar_date(sample_silver_frame(), Fortaleza).unwrap()
}

/// Value of `column` on the daily row for (`date`, `station`)
pub fn daily_value(df: &DataFrame, date: &str, station: &str, column: &str) -> Option<f64> {
    let dates = frame::string_values(df, columns::CALENDAR_DATE).unwrap();
    let stations = frame::string_values(df, columns::STATION).unwrap();
    let values = frame::f64_values(df, column).unwrap();
    (0..df.height())
        .find(|&i| dates[i].as_deref() == Some(date) && stations[i].as_deref() == Some(station))
        .and_then(|i| values[i])
}
