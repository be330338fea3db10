//! Tests for the Gold stage entry point

use super::*;
use crate::config::{GoldRules, LakePaths};
use crate::constants::metrics;
use crate::gold::run;
use crate::models::{Layer, StageDetails, WriteMode};
use crate::storage::{ParquetDatasetStore, TableStore};
use tempfile::TempDir;

fn seed_silver(store: &ParquetDatasetStore, lake: &LakePaths, mut df: DataFrame) {
    let height = df.height();
    df.with_column(Series::new(columns::PARTITION_YEAR.into(), vec![2025i32; height]))
        .unwrap();
    df.with_column(Series::new(columns::PARTITION_MONTH.into(), vec![4i32; height]))
        .unwrap();
    store
        .write_table(
            &df,
            &lake.silver_path(),
            &[
                columns::PARTITION_YEAR.to_string(),
                columns::PARTITION_MONTH.to_string(),
            ],
            WriteMode::DeleteMatching,
        )
        .unwrap();
}

#[test]
fn test_empty_silver_short_circuits() {
    let temp_dir = TempDir::new().unwrap();
    let lake = LakePaths::new(temp_dir.path());
    let store = ParquetDatasetStore::default();

    let report = run(&store, &lake, &GoldRules::default()).unwrap();

    assert!(report.is_skipped());
    assert_eq!(report.layer, Layer::Gold);
    assert!(!lake.gold_path().exists());
}

#[test]
fn test_run_writes_partitioned_gold() {
    let temp_dir = TempDir::new().unwrap();
    let lake = LakePaths::new(temp_dir.path());
    let store = ParquetDatasetStore::default();
    seed_silver(&store, &lake, sample_silver_frame());

    let report = run(&store, &lake, &GoldRules::default()).unwrap();

    assert_eq!(report.rows_in, 5);
    assert_eq!(report.rows_out, 3);
    assert_eq!(report.write.as_ref().unwrap().partitions, 2);
    assert!(lake
        .gold_path()
        .join("ano=2025/mes=4/municipio=JOAO_PESSOA")
        .exists());
    assert!(lake.gold_path().join("ano=2025/mes=4/municipio=PATOS").exists());
    match report.details {
        StageDetails::Gold(stats) => assert_eq!(stats.daily_rows, 3),
        other => panic!("unexpected details {:?}", other),
    }
}

#[test]
fn test_gold_read_back_keeps_decimal_types() {
    let temp_dir = TempDir::new().unwrap();
    let lake = LakePaths::new(temp_dir.path());
    let store = ParquetDatasetStore::default();
    seed_silver(&store, &lake, sample_silver_frame());
    run(&store, &lake, &GoldRules::default()).unwrap();

    let gold = store.read_table(&lake.gold_path()).unwrap();

    assert_eq!(gold.height(), 3);
    assert_eq!(
        gold.column(metrics::TEMP_MAX_DAILY).unwrap().dtype(),
        &DataType::Decimal(Some(10), Some(2))
    );
    assert_eq!(gold.column(columns::STATION).unwrap().dtype(), &DataType::String);
    assert_eq!(gold.column(columns::GOLD_YEAR).unwrap().dtype(), &DataType::Int32);
    assert_eq!(
        daily_value(&gold, "2025-04-01", "JOAO_PESSOA", metrics::THERMAL_AMPLITUDE_DAILY),
        Some(3.5)
    );
}

#[test]
fn test_delete_matching_rerun_replaces_daily_rows() {
    let temp_dir = TempDir::new().unwrap();
    let lake = LakePaths::new(temp_dir.path());
    let store = ParquetDatasetStore::default();
    seed_silver(&store, &lake, sample_silver_frame());
    let rules = GoldRules::default().with_write_mode(WriteMode::DeleteMatching);

    run(&store, &lake, &rules).unwrap();
    run(&store, &lake, &rules).unwrap();

    let gold = store.read_table(&lake.gold_path()).unwrap();
    assert_eq!(gold.height(), 3);
}

#[test]
fn test_silver_without_timestamp_fails() {
    let temp_dir = TempDir::new().unwrap();
    let lake = LakePaths::new(temp_dir.path());
    let store = ParquetDatasetStore::default();
    let silver = sample_silver_frame()
        .drop(columns::OBSERVATION_TIMESTAMP)
        .unwrap();
    seed_silver(&store, &lake, silver);

    let err = run(&store, &lake, &GoldRules::default()).unwrap_err();
    assert!(err.is_structural());
    assert!(!lake.gold_path().exists());
}
