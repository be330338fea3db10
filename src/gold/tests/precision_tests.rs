//! Tests for fixed-point conversion and schema binding

use super::*;
use crate::config::GoldRules;
use crate::constants::metrics;
use crate::gold::aggregator::aggregate_daily;
use crate::gold::precision::{enforce_schema, fits_precision, round_half_even, to_fixed_point};
use rust_decimal::Decimal;
use std::str::FromStr;

fn bound_sample() -> DataFrame {
    let (daily, _) = aggregate_daily(&hourly_with_dates(), &GoldRules::default()).unwrap();
    enforce_schema(&daily, &GoldRules::default()).unwrap()
}

#[test]
fn test_round_half_even() {
    assert_eq!(round_half_even(5.323, 1), 5.3);
    assert_eq!(round_half_even(0.125, 2), 0.12);
    assert_eq!(round_half_even(0.375, 2), 0.38);
    assert_eq!(round_half_even(-3.45, 0), -3.0);
}

#[test]
fn test_fixed_point_uses_shortest_representation() {
    assert_eq!(to_fixed_point(5.3, 1).unwrap().to_string(), "5.3");
    assert_eq!(to_fixed_point(32.5, 2).unwrap().to_string(), "32.50");
    assert_eq!(to_fixed_point(0.1 + 0.2, 2).unwrap().to_string(), "0.30");
    assert_eq!(to_fixed_point(0.25, 1).unwrap().to_string(), "0.2");
    assert!(to_fixed_point(f64::NAN, 2).is_none());
    assert!(to_fixed_point(f64::INFINITY, 2).is_none());
}

#[test]
fn test_fits_precision() {
    let fits = Decimal::from_str("99999999.99").unwrap();
    let too_big = Decimal::from_str("100000000.00").unwrap();
    assert!(fits_precision(&fits, 10, 2));
    assert!(!fits_precision(&too_big, 10, 2));
    assert!(fits_precision(&too_big, 12, 2));
}

#[test]
fn test_schema_order_and_types() {
    let gold = bound_sample();
    let rules = GoldRules::default();

    let expected: Vec<String> = rules.target_schema().into_iter().map(|(n, _)| n).collect();
    assert_eq!(frame::column_names(&gold), expected);

    assert_eq!(gold.column(columns::CALENDAR_DATE).unwrap().dtype(), &DataType::Date);
    assert_eq!(gold.column(columns::STATION).unwrap().dtype(), &DataType::String);
    assert_eq!(
        gold.column(metrics::TEMP_MAX_DAILY).unwrap().dtype(),
        &DataType::Decimal(Some(10), Some(2))
    );
    assert_eq!(
        gold.column(metrics::PRECIPITATION_DAILY).unwrap().dtype(),
        &DataType::Decimal(Some(10), Some(1))
    );
    assert_eq!(
        gold.column(metrics::RADIATION_DAILY).unwrap().dtype(),
        &DataType::Decimal(Some(12), Some(2))
    );
    assert_eq!(gold.column(columns::GOLD_YEAR).unwrap().dtype(), &DataType::Int32);
}

#[test]
fn test_decimal_values_survive_conversion() {
    let gold = bound_sample();
    assert_eq!(
        daily_value(&gold, "2025-04-01", "JOAO_PESSOA", metrics::TEMP_MAX_DAILY),
        Some(32.5)
    );
    assert_eq!(
        daily_value(&gold, "2025-04-02", "JOAO_PESSOA", metrics::PRECIPITATION_DAILY),
        Some(10.0)
    );
}

#[test]
fn test_year_and_month_from_calendar_date() {
    let gold = bound_sample();
    assert!(
        frame::i32_values(&gold, columns::GOLD_YEAR)
            .unwrap()
            .iter()
            .all(|y| *y == Some(2025))
    );
    assert!(
        frame::i32_values(&gold, columns::GOLD_MONTH)
            .unwrap()
            .iter()
            .all(|m| *m == Some(4))
    );
}

#[test]
fn test_absent_schema_columns_are_filled_with_nulls() {
    let gold = bound_sample();
    // The fixture has no radiation or wind readings
    let radiation = gold.column(metrics::RADIATION_DAILY).unwrap();
    assert_eq!(radiation.null_count(), gold.height());
    let gust = gold.column(metrics::WIND_GUST_MAX_DAILY).unwrap();
    assert_eq!(gust.null_count(), gold.height());
}

#[test]
fn test_columns_outside_schema_are_dropped() {
    let (mut daily, _) = aggregate_daily(&hourly_with_dates(), &GoldRules::default()).unwrap();
    daily
        .with_column(Series::new("debug_counter".into(), vec![1i32; daily.height()]))
        .unwrap();
    let gold = enforce_schema(&daily, &GoldRules::default()).unwrap();
    assert!(!frame::has_column(&gold, "debug_counter"));
}

#[test]
fn test_overflowing_values_become_null() {
    let mut daily = df!(
        columns::CALENDAR_DATE => [0i32],
        columns::STATION => ["PATOS"],
        metrics::TEMP_MAX_DAILY => [1.0e12f64],
    )
    .unwrap();
    let dates = daily
        .column(columns::CALENDAR_DATE)
        .unwrap()
        .as_materialized_series()
        .cast(&DataType::Date)
        .unwrap();
    daily.with_column(dates).unwrap();

    let gold = enforce_schema(&daily, &GoldRules::default()).unwrap();
    assert_eq!(gold.column(metrics::TEMP_MAX_DAILY).unwrap().null_count(), 1);
    assert_eq!(
        frame::i32_values(&gold, columns::GOLD_YEAR).unwrap(),
        vec![Some(1970)]
    );
}

#[test]
fn test_missing_calendar_date_is_structural() {
    let daily = df!(columns::STATION => ["PATOS"]).unwrap();
    assert!(enforce_schema(&daily, &GoldRules::default()).unwrap_err().is_structural());
}
