//! Bronze layer: yearly INMET archives → raw partitioned table.
//!
//! Each year is downloaded, filtered to the configured station files, parsed
//! as raw strings and written with delete-matching on `partition_year`.
//! A year whose archive cannot be fetched or parsed is logged and skipped;
//! a failed write aborts the stage.

pub mod archive;
pub mod csv_reader;

#[cfg(test)]
mod tests;

use crate::config::{BronzeConfig, LakePaths};
use crate::constants::columns;
use crate::error::{PipelineError, Result};
use crate::models::{AcquisitionStats, Layer, StageDetails, StageReport, WriteSummary};
use crate::storage::TableStore;

use chrono::Datelike;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Raw rows gathered from one yearly archive
#[derive(Debug, Default)]
pub struct ArchiveIngest {
    /// `None` when no matching file yielded rows
    pub frame: Option<DataFrame>,
    pub files_read: usize,
    pub files_failed: usize,
}

/// What one year contributed to the Bronze dataset
#[derive(Debug, Default)]
struct YearOutcome {
    rows: usize,
    files_read: usize,
    files_failed: usize,
    write: Option<WriteSummary>,
}

/// A year either reaches storage or is skipped for a recoverable reason
#[derive(Debug)]
enum YearResult {
    Ingested(YearOutcome),
    Skipped(PipelineError),
}

/// Parse every matching station file of an archive into one table tagged
/// with `partition_year`.
pub fn ingest_archive_bytes(year: i32, bytes: &[u8], config: &BronzeConfig) -> Result<ArchiveIngest> {
    let extracted = archive::extract_matching(bytes, &config.station_filter)?;
    let mut ingest = ArchiveIngest {
        files_failed: extracted.failed,
        ..Default::default()
    };

    let mut frames = Vec::new();
    for entry in &extracted.entries {
        match csv_reader::read_station_csv(&entry.name, &entry.bytes, config) {
            Ok(df) if df.height() == 0 => {
                debug!("{} holds no rows", entry.name);
                ingest.files_read += 1;
            }
            Ok(df) => {
                ingest.files_read += 1;
                frames.push(df.lazy());
            }
            Err(e) => {
                warn!("Skipping {}: {}", entry.name, e);
                ingest.files_failed += 1;
            }
        }
    }

    if frames.is_empty() {
        warn!(
            "No rows found for '{}' in the {} archive",
            config.station_filter, year
        );
        return Ok(ingest);
    }

    let mut merged = concat_lf_diagonal(frames, UnionArgs::default())?.collect()?;
    let height = merged.height();
    merged.with_column(Series::new(
        columns::PARTITION_YEAR.into(),
        vec![year; height],
    ))?;
    info!("Year {} consolidated with {} records", year, height);

    ingest.frame = Some(merged);
    Ok(ingest)
}

/// Parse an archive and write its rows, replacing the year's partition.
///
/// An unreadable archive skips the year; a storage failure is returned as `Err`.
fn ingest_and_write(
    store: &dyn TableStore,
    bronze_path: &Path,
    config: &BronzeConfig,
    year: i32,
    bytes: &[u8],
) -> Result<YearResult> {
    let ingest = match ingest_archive_bytes(year, bytes, config) {
        Ok(ingest) => ingest,
        Err(e) => return Ok(YearResult::Skipped(e)),
    };
    let mut outcome = YearOutcome {
        files_read: ingest.files_read,
        files_failed: ingest.files_failed,
        ..Default::default()
    };

    if let Some(frame) = ingest.frame {
        outcome.rows = frame.height();
        let summary = store.write_table(
            &frame,
            bronze_path,
            &[columns::PARTITION_YEAR.to_string()],
            config.write_mode,
        )?;
        debug!(
            "Year {}: {} rows written to {}",
            year,
            summary.rows_written,
            bronze_path.display()
        );
        outcome.write = Some(summary);
    }
    Ok(YearResult::Ingested(outcome))
}

/// Fetch one yearly archive into memory
async fn fetch_archive(client: &reqwest::Client, url: &str) -> Result<Vec<u8>> {
    let download_error = |reason: String| PipelineError::Download {
        url: url.to_string(),
        reason,
    };

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| download_error(e.to_string()))?;
    if !response.status().is_success() {
        return Err(download_error(format!("HTTP status {}", response.status())));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| download_error(e.to_string()))?;
    info!("Downloaded {} ({} bytes)", url, bytes.len());
    Ok(bytes.to_vec())
}

async fn process_year(
    client: reqwest::Client,
    store: Arc<dyn TableStore>,
    bronze_path: PathBuf,
    config: BronzeConfig,
    year: i32,
) -> Result<YearResult> {
    info!("Starting year {}", year);
    let bytes = match fetch_archive(&client, &config.url_for(year)).await {
        Ok(bytes) => bytes,
        Err(e) => return Ok(YearResult::Skipped(e)),
    };

    tokio::task::spawn_blocking(move || {
        ingest_and_write(store.as_ref(), &bronze_path, &config, year, &bytes)
    })
    .await?
}

fn progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} years {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

/// Fold per-year outcomes into the stage report
fn summarize(years: Vec<i32>, outcomes: Vec<(i32, YearResult)>, start_time: Instant) -> StageReport {
    let mut stats = AcquisitionStats {
        years_requested: years,
        ..Default::default()
    };
    let mut rows = 0usize;
    let mut write: Option<WriteSummary> = None;

    for (year, outcome) in outcomes {
        match outcome {
            YearResult::Ingested(outcome) => {
                stats.files_read += outcome.files_read;
                stats.files_failed += outcome.files_failed;
                if outcome.rows > 0 {
                    info!("Year {} finished: {} records", year, outcome.rows);
                    stats.years_ingested.push(year);
                    rows += outcome.rows;
                } else {
                    info!("Year {} finished without new records", year);
                }
                if let Some(summary) = outcome.write {
                    write.get_or_insert_with(WriteSummary::default).absorb(&summary);
                }
            }
            YearResult::Skipped(e) => {
                warn!("Year {} skipped: {}", year, e);
                stats.years_failed.push(year);
            }
        }
    }
    stats.years_ingested.sort_unstable();
    stats.years_failed.sort_unstable();

    StageReport {
        layer: Layer::Bronze,
        rows_in: rows,
        rows_out: rows,
        write,
        processing_time_ms: start_time.elapsed().as_millis(),
        details: StageDetails::Bronze(stats),
    }
}

/// Download and ingest every configured year
///
/// # Arguments
///
/// * `store` - Dataset store receiving each year's partition
/// * `lake` - Lake layout naming the Bronze dataset
/// * `config` - Years, URL template, station filter and worker count
///
/// # Returns
///
/// The stage report listing ingested and skipped years, or the first write failure
pub async fn run(
    store: Arc<dyn TableStore>,
    lake: &LakePaths,
    config: &BronzeConfig,
) -> Result<StageReport> {
    let start_time = Instant::now();
    config.validate()?;

    let years = config.resolve_years(chrono::Local::now().year());
    let bronze_path = lake.bronze_path();
    info!("Bronze: ingesting years {:?} into {}", years, bronze_path.display());

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()
        .map_err(|e| PipelineError::Download {
            url: config.url_template.clone(),
            reason: format!("Failed to build HTTP client: {}", e),
        })?;

    let pb = progress_bar(years.len() as u64);
    let results: Vec<(i32, Result<YearResult>)> = stream::iter(years.iter().copied())
        .map(|year| {
            let client = client.clone();
            let store = Arc::clone(&store);
            let bronze_path = bronze_path.clone();
            let config = config.clone();
            let pb = pb.clone();
            async move {
                let outcome = process_year(client, store, bronze_path, config, year).await;
                pb.inc(1);
                (year, outcome)
            }
        })
        .buffer_unordered(config.max_workers)
        .collect()
        .await;
    pb.finish_and_clear();

    let mut outcomes = Vec::with_capacity(results.len());
    for (year, result) in results {
        match result {
            Ok(outcome) => outcomes.push((year, outcome)),
            Err(e) => {
                error!("Year {} could not be written: {}", year, e);
                return Err(e);
            }
        }
    }

    let report = summarize(years, outcomes, start_time);
    info!(
        "Bronze: {} records ingested in {} ms",
        report.rows_out, report.processing_time_ms
    );
    Ok(report)
}

/// Year an archive belongs to: an explicit single year, else the file stem
pub fn archive_year(path: &Path, years: &[i32]) -> Result<i32> {
    if let [year] = years {
        return Ok(*year);
    }
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .and_then(|stem| stem.parse::<i32>().ok())
        .ok_or_else(|| PipelineError::Configuration {
            message: format!(
                "Cannot tell the year of {}; name it <year>.zip or pass a single year",
                path.display()
            ),
        })
}

/// Ingest a yearly archive already on disk instead of downloading it.
///
/// The archive was named explicitly, so an unreadable file is an error
/// rather than a skipped year.
pub async fn run_local_archive(
    store: Arc<dyn TableStore>,
    lake: &LakePaths,
    config: &BronzeConfig,
    archive_path: &Path,
) -> Result<StageReport> {
    let start_time = Instant::now();
    let year = archive_year(archive_path, &config.years)?;
    info!("Bronze: ingesting local archive {} as year {}", archive_path.display(), year);

    let bytes = tokio::fs::read(archive_path)
        .await
        .map_err(|e| PipelineError::storage(archive_path, format!("Cannot read archive: {}", e)))?;

    let bronze_path = lake.bronze_path();
    let config = config.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        ingest_and_write(store.as_ref(), &bronze_path, &config, year, &bytes)
    })
    .await??;

    match outcome {
        YearResult::Skipped(e) => {
            error!("Archive {} is unusable: {}", archive_path.display(), e);
            Err(e)
        }
        ingested => Ok(summarize(vec![year], vec![(year, ingested)], start_time)),
    }
}
