//! Full Bronze → Silver → Gold runs against a temporary lake

use encoding_rs::WINDOWS_1252;
use inmet_pipeline::config::PipelineConfig;
use inmet_pipeline::constants::{columns, metrics};
use inmet_pipeline::frame;
use inmet_pipeline::models::{Layer, StageDetails};
use inmet_pipeline::pipeline::{self, BronzeSource};
use inmet_pipeline::{ParquetDatasetStore, TableStore};
use polars::prelude::*;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use ::zip::write::FileOptions;

const STATION_FILE: &str = "2023/INMET_NE_PB_A320_JOAO PESSOA_01-01-2023_A_31-12-2023.CSV";

/// One station day: a late-evening reading that belongs to the previous
/// local day, a duplicated hour, a missing-value token and an implausible
/// humidity reading
fn station_csv() -> String {
    "REGIAO:;NE\nUF:;PB\nESTACAO:;JOAO PESSOA\nCODIGO (WMO):;A320\nLATITUDE:;-7,16\n\
LONGITUDE:;-34,81\nALTITUDE:;33,5\nDATA DE FUNDACAO:;25/07/07\n\
Data;Hora UTC;PRECIPITAÇÃO TOTAL, HORÁRIO (mm);TEMPERATURA DO AR - BULBO SECO, HORARIA (°C);\
TEMPERATURA MÁXIMA NA HORA ANT. (AUT) (°C);TEMPERATURA MÍNIMA NA HORA ANT. (AUT) (°C);\
UMIDADE RELATIVA DO AR, HORARIA (%);\n\
2023/01/01;0200 UTC;0;25,0;25,5;24,8;80;\n\
2023/01/01;1200 UTC;1,2;28,0;28,4;27,0;70;\n\
2023/01/01;1500 UTC;0,4;31,5;32,0;30,9;60;\n\
2023/01/01;1500 UTC;0,4;31,5;32,0;30,9;60;\n\
2023/01/01;1800 UTC;;-9999;33,1;31,0;150;\n"
        .to_string()
}

fn write_archive(dir: &Path) -> PathBuf {
    let text = station_csv();
    let (csv, _, _) = WINDOWS_1252.encode(&text);
    let mut writer = ::zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer.start_file(STATION_FILE, FileOptions::default()).unwrap();
    writer.write_all(&csv).unwrap();
    writer.start_file("2023/INMET_NE_PB_A321_PATOS.CSV", FileOptions::default()).unwrap();
    writer.write_all(b"ignored").unwrap();
    let bytes = writer.finish().unwrap().into_inner();

    let path = dir.join("2023.zip");
    std::fs::write(&path, bytes).unwrap();
    path
}

fn daily_row(gold: &DataFrame, date: &str) -> usize {
    let dates = frame::string_values(gold, columns::CALENDAR_DATE).unwrap();
    dates
        .iter()
        .position(|d| d.as_deref() == Some(date))
        .unwrap_or_else(|| panic!("no daily row for {}", date))
}

fn metric(gold: &DataFrame, date: &str, name: &str) -> Option<f64> {
    frame::f64_values(gold, name).unwrap()[daily_row(gold, date)]
}

async fn run_pipeline(temp_dir: &TempDir) -> (PipelineConfig, Arc<ParquetDatasetStore>) {
    let archive = write_archive(temp_dir.path());
    let config = PipelineConfig::default().with_lake_root(temp_dir.path().join("data"));
    let store = Arc::new(ParquetDatasetStore::new(config.storage.clone()));

    let reports = pipeline::run_all(&config, store.clone(), BronzeSource::LocalArchive(&archive))
        .await
        .unwrap();
    let layers: Vec<Layer> = reports.iter().map(|r| r.layer).collect();
    assert_eq!(layers, vec![Layer::Bronze, Layer::Silver, Layer::Gold]);

    (config, store)
}

#[tokio::test]
async fn test_full_run_builds_every_layer() {
    let temp_dir = TempDir::new().unwrap();
    let (config, store) = run_pipeline(&temp_dir).await;

    let bronze = store.read_table(&config.lake.bronze_path()).unwrap();
    assert_eq!(bronze.height(), 5);

    let silver = store.read_table(&config.lake.silver_path()).unwrap();
    assert_eq!(silver.height(), 4);
    assert!(config
        .lake
        .silver_path()
        .join("partition_year=2023/partition_month=1")
        .exists());

    let gold = store.read_table(&config.lake.gold_path()).unwrap();
    assert_eq!(gold.height(), 2);
    assert!(config
        .lake
        .gold_path()
        .join("ano=2022/mes=12/municipio=JOAO_PESSOA")
        .exists());
    assert!(config
        .lake
        .gold_path()
        .join("ano=2023/mes=1/municipio=JOAO_PESSOA")
        .exists());
}

#[tokio::test]
async fn test_daily_metrics_follow_local_calendar() {
    let temp_dir = TempDir::new().unwrap();
    let (config, store) = run_pipeline(&temp_dir).await;
    let gold = store.read_table(&config.lake.gold_path()).unwrap();

    // 02:00 UTC is 23:00 of the previous day in Fortaleza
    assert_eq!(metric(&gold, "2022-12-31", metrics::TEMP_MAX_DAILY), Some(25.5));
    assert_eq!(
        metric(&gold, "2022-12-31", metrics::THERMAL_AMPLITUDE_DAILY),
        Some(0.7)
    );

    assert_eq!(metric(&gold, "2023-01-01", metrics::TEMP_MAX_DAILY), Some(33.1));
    assert_eq!(metric(&gold, "2023-01-01", metrics::TEMP_MIN_DAILY), Some(27.0));
    assert_eq!(metric(&gold, "2023-01-01", metrics::PRECIPITATION_DAILY), Some(1.6));
    assert_eq!(metric(&gold, "2023-01-01", metrics::TEMP_MEAN_DAILY), Some(29.75));
    assert_eq!(metric(&gold, "2023-01-01", metrics::HUMIDITY_MEAN_DAILY), Some(65.0));
    assert_eq!(
        metric(&gold, "2023-01-01", metrics::THERMAL_AMPLITUDE_DAILY),
        Some(6.1)
    );
    assert_eq!(metric(&gold, "2023-01-01", metrics::RADIATION_DAILY), None);
}

#[tokio::test]
async fn test_gold_columns_use_fixed_point_types() {
    let temp_dir = TempDir::new().unwrap();
    let (config, store) = run_pipeline(&temp_dir).await;
    let gold = store.read_table(&config.lake.gold_path()).unwrap();

    assert_eq!(
        gold.column(metrics::PRECIPITATION_DAILY).unwrap().dtype(),
        &DataType::Decimal(Some(10), Some(1))
    );
    assert_eq!(
        gold.column(metrics::TEMP_MEAN_DAILY).unwrap().dtype(),
        &DataType::Decimal(Some(10), Some(2))
    );
    assert_eq!(gold.column(columns::CALENDAR_DATE).unwrap().dtype(), &DataType::Date);
}

#[tokio::test]
async fn test_silver_stage_reports_cleaning() {
    let temp_dir = TempDir::new().unwrap();
    let archive = write_archive(temp_dir.path());
    let config = PipelineConfig::default().with_lake_root(temp_dir.path().join("data"));
    let store: Arc<dyn TableStore> = Arc::new(ParquetDatasetStore::default());

    pipeline::run_bronze(&config, store.clone(), BronzeSource::LocalArchive(&archive))
        .await
        .unwrap();
    let report = pipeline::run_silver(&config, store.clone()).await.unwrap();

    assert_eq!(report.rows_in, 5);
    assert_eq!(report.rows_out, 4);
    match report.details {
        StageDetails::Silver {
            normalization,
            quality,
        } => {
            assert_eq!(normalization.missing_value_tokens, 1);
            assert_eq!(quality.duplicates_removed, 1);
            assert_eq!(quality.total_nulled(), 1);
        }
        other => panic!("unexpected details {:?}", other),
    }
}

#[tokio::test]
async fn test_rerunning_silver_and_gold_is_stable() {
    let temp_dir = TempDir::new().unwrap();
    let (config, store) = run_pipeline(&temp_dir).await;
    let store: Arc<dyn TableStore> = store;

    pipeline::run_silver(&config, store.clone()).await.unwrap();
    let silver = store.read_table(&config.lake.silver_path()).unwrap();
    assert_eq!(silver.height(), 4);

    let mut config = config;
    config.gold = config
        .gold
        .with_write_mode(inmet_pipeline::WriteMode::DeleteMatching);
    pipeline::run_gold(&config, store.clone()).await.unwrap();
    let gold = store.read_table(&config.lake.gold_path()).unwrap();
    assert_eq!(gold.height(), 2);
}

#[tokio::test]
async fn test_gold_without_silver_is_skipped() {
    let temp_dir = TempDir::new().unwrap();
    let config = PipelineConfig::default().with_lake_root(temp_dir.path());
    let store: Arc<dyn TableStore> = Arc::new(ParquetDatasetStore::default());

    let report = pipeline::run_gold(&config, store).await.unwrap();
    assert!(report.is_skipped());
}
