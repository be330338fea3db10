//! Tests for plausibility ranges and deduplication

use super::*;
use crate::config::{ColumnSelector, NormalizerRules, QualityRules, RangeRule};
use crate::constants::columns;
use crate::frame;
use crate::models::QualityStats;
use crate::silver::normalizer::normalize;
use crate::silver::quality::{apply_range_rules, deduplicate, filter_quality};

fn normalized_sample() -> DataFrame {
    normalize(&sample_bronze_frame(), &NormalizerRules::default())
        .unwrap()
        .0
}

#[test]
fn test_data_quality_rules() {
    let mut stats = QualityStats::default();
    let df = apply_range_rules(normalized_sample(), &QualityRules::default(), &mut stats).unwrap();

    let humidity = frame::f64_values(&df, columns::HUMIDITY).unwrap();
    assert_eq!(humidity, vec![Some(80.0), None, Some(85.0), Some(90.0)]);

    let temperature = frame::f64_values(&df, columns::TEMP_DRY_BULB).unwrap();
    assert_eq!(temperature[3], None);

    let precipitation = frame::f64_values(&df, columns::PRECIPITATION).unwrap();
    assert_eq!(precipitation[3], None);

    // Rows survive; only the cells are nulled
    assert_eq!(df.height(), 4);
    assert_eq!(stats.nulled_by_column.get(columns::HUMIDITY), Some(&1));
    assert_eq!(stats.nulled_by_column.get(columns::TEMP_DRY_BULB), Some(&1));
    assert_eq!(stats.nulled_by_column.get(columns::PRECIPITATION), Some(&1));
    assert_eq!(stats.total_nulled(), 3);
}

#[test]
fn test_present_values_lie_within_ranges() {
    let rules = QualityRules::default();
    let (df, _) = filter_quality(normalized_sample(), &rules).unwrap();

    for name in frame::column_names(&df) {
        if !df.column(&name).unwrap().dtype().is_float() {
            continue;
        }
        let applicable: Vec<_> = rules.rules_for(&name).cloned().collect();
        for value in frame::f64_values(&df, &name).unwrap().into_iter().flatten() {
            assert!(
                applicable.iter().all(|rule| rule.contains(value)),
                "{} = {} escaped its range",
                name,
                value
            );
        }
    }
}

#[test]
fn test_deduplication() {
    let (df, stats) = filter_quality(normalized_sample(), &QualityRules::default()).unwrap();

    assert_eq!(df.height(), 3);
    assert_eq!(stats.duplicates_removed, 1);

    // The first 05:00 row wins over the later one
    let temperature = frame::f64_values(&df, columns::TEMP_DRY_BULB).unwrap();
    assert_eq!(temperature[1], Some(26.0));
}

#[test]
fn test_business_key_is_unique_after_dedup() {
    let (df, _) = filter_quality(normalized_sample(), &QualityRules::default()).unwrap();

    let timestamps = frame::i64_values(&df, columns::OBSERVATION_TIMESTAMP).unwrap();
    let files = frame::string_values(&df, columns::SOURCE_FILE).unwrap();
    let mut keys: Vec<_> = timestamps.into_iter().zip(files).collect();
    let before = keys.len();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), before);
}

#[test]
fn test_same_instant_in_different_files_is_kept() {
    let raw = df!(
        RAW_DATE => ["2023/01/01", "2023/01/01"],
        RAW_HOUR => ["1200 UTC", "1200 UTC"],
        RAW_TEMPERATURE => ["30,0", "31,0"],
        "source_file" => ["a.csv", "b.csv"],
    )
    .unwrap();
    let (normalized, _) = normalize(&raw, &NormalizerRules::default()).unwrap();
    let (df, stats) = filter_quality(normalized, &QualityRules::default()).unwrap();

    assert_eq!(df.height(), 2);
    assert_eq!(stats.duplicates_removed, 0);
}

#[test]
fn test_missing_dedup_key_is_structural() {
    let df = normalized_sample().drop(columns::SOURCE_FILE).unwrap();
    let mut stats = QualityStats::default();
    let err = deduplicate(df, &QualityRules::default().dedup_key, &mut stats).unwrap_err();
    assert!(err.is_structural());
}

#[test]
fn test_alternative_rule_set() {
    let rules = QualityRules::default().with_range_rules(vec![RangeRule::new(
        ColumnSelector::Exact(columns::TEMP_DRY_BULB.to_string()),
        Some(26.0),
        Some(30.0),
    )]);
    let mut stats = QualityStats::default();
    let df = apply_range_rules(normalized_sample(), &rules, &mut stats).unwrap();

    assert_eq!(
        frame::f64_values(&df, columns::TEMP_DRY_BULB).unwrap(),
        vec![None, Some(26.0), Some(26.1), None]
    );
    // Humidity has no rule in this set
    assert_eq!(frame::f64_values(&df, columns::HUMIDITY).unwrap()[1], Some(105.0));
}
