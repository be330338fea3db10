//! Command-line interface: argument parsing, logging setup and the run summary.

use crate::config::{CompressionAlgorithm, PipelineConfig};
use crate::error::Result;
use crate::models::{StageDetails, StageReport};
use crate::pipeline::{self, BronzeSource};
use crate::storage::{ParquetDatasetStore, TableStore};

use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "inmet_pipeline")]
#[command(about = "Turn INMET hourly station archives into a daily climate data mart")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
    /// Root directory of the data lake (default: ./data)
    #[arg(long, value_name = "DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// JSON configuration file; absent sections keep their defaults
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Parquet compression algorithm (snappy, zstd, lz4, none)
    #[arg(long, global = true)]
    pub compression: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Download yearly archives into the Bronze dataset
    Bronze(BronzeArgs),
    /// Clean Bronze into the hourly Silver dataset
    Silver,
    /// Aggregate Silver into the daily Gold data mart
    Gold,
    /// Run Bronze, Silver and Gold in sequence
    Run(BronzeArgs),
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct BronzeArgs {
    /// Years to ingest, comma separated (default: the last five years)
    #[arg(long, value_delimiter = ',')]
    pub years: Vec<i32>,

    /// Substring selecting station files inside each archive
    #[arg(long)]
    pub filter: Option<String>,

    /// Concurrent downloads
    #[arg(long)]
    pub workers: Option<usize>,

    /// Ingest a local yearly ZIP instead of downloading
    #[arg(long, value_name = "FILE")]
    pub archive: Option<PathBuf>,
}

impl BronzeArgs {
    fn apply(&self, mut config: PipelineConfig) -> PipelineConfig {
        if !self.years.is_empty() {
            config.bronze = config.bronze.with_years(self.years.clone());
        }
        if let Some(filter) = &self.filter {
            config.bronze = config.bronze.with_station_filter(filter.clone());
        }
        if let Some(workers) = self.workers {
            config.bronze = config.bronze.with_max_workers(workers);
        }
        config
    }

    fn source(&self) -> BronzeSource<'_> {
        match &self.archive {
            Some(path) => BronzeSource::LocalArchive(path),
            None => BronzeSource::Download,
        }
    }
}

impl Args {
    /// Configuration file (or defaults) with command-line overrides applied
    pub fn load_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(root) = &self.data_dir {
            config = config.with_lake_root(root.clone());
        }
        if let Some(name) = &self.compression {
            config.storage.compression = CompressionAlgorithm::from_name(name)?;
        }
        if let Command::Bronze(bronze) | Command::Run(bronze) = &self.command {
            config = bronze.apply(config);
        }

        config.validate()?;
        debug!("Effective configuration: {:?}", config);
        Ok(config)
    }
}

/// Install the tracing subscriber; `RUST_LOG` overrides the verbosity flag
pub fn setup_logging(verbose: bool) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("inmet_pipeline={}", level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_timer(fmt::time::uptime())
                .with_writer(std::io::stderr),
        )
        .init();
}

/// Execute the selected command and return one report per stage run
pub async fn execute(args: &Args) -> Result<Vec<StageReport>> {
    let config = args.load_config()?;
    let store: Arc<dyn TableStore> = Arc::new(ParquetDatasetStore::new(config.storage.clone()));

    let reports = match &args.command {
        Command::Bronze(bronze) => {
            vec![pipeline::run_bronze(&config, store, bronze.source()).await?]
        }
        Command::Silver => vec![pipeline::run_silver(&config, store).await?],
        Command::Gold => vec![pipeline::run_gold(&config, store).await?],
        Command::Run(bronze) => pipeline::run_all(&config, store, bronze.source()).await?,
    };
    Ok(reports)
}

fn detail_line(details: &StageDetails) -> Option<String> {
    match details {
        StageDetails::Bronze(stats) => Some(format!(
            "years ingested {:?}, failed {:?}, files read {}, files failed {}",
            stats.years_ingested, stats.years_failed, stats.files_read, stats.files_failed
        )),
        StageDetails::Silver {
            normalization,
            quality,
        } => Some(format!(
            "invalid timestamps {}, unparseable values {}, out-of-range nulled {}, duplicates removed {}",
            normalization.invalid_timestamps,
            normalization.unparseable_values,
            quality.total_nulled(),
            quality.duplicates_removed
        )),
        StageDetails::Gold(stats) => Some(format!(
            "daily rows {}, rows without key {}, missing sources {:?}",
            stats.daily_rows, stats.rows_without_key, stats.missing_sources
        )),
        StageDetails::Skipped => None,
    }
}

/// Print the colored end-of-run summary to stdout
pub fn print_summary(reports: &[StageReport]) {
    println!("\n{}", "Pipeline summary".bright_green().bold());
    for report in reports {
        let layer = report.layer.to_string().to_uppercase();
        if report.is_skipped() {
            println!(
                "  {} {}",
                format!("{:<7}", layer).bright_cyan(),
                "skipped (upstream dataset empty)".yellow()
            );
            continue;
        }

        let partitions = report.write.as_ref().map_or(0, |w| w.partitions);
        println!(
            "  {} {} rows in, {} rows out, {} partitions, {:.2}s",
            format!("{:<7}", layer).bright_cyan(),
            report.rows_in,
            report.rows_out.to_string().bright_white().bold(),
            partitions,
            report.processing_time_ms as f64 / 1000.0
        );
        if let Some(line) = detail_line(&report.details) {
            println!("          {}", line.bright_black());
        }
    }
}
