//! Sequential Bronze → Silver → Gold orchestration.

use crate::bronze;
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::gold;
use crate::models::{Layer, StageReport};
use crate::silver;
use crate::storage::TableStore;

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Where Bronze gets its archives from
#[derive(Debug, Clone, Copy)]
pub enum BronzeSource<'a> {
    Download,
    LocalArchive(&'a Path),
}

/// Run the Bronze stage from `source`
pub async fn run_bronze(
    config: &PipelineConfig,
    store: Arc<dyn TableStore>,
    source: BronzeSource<'_>,
) -> Result<StageReport> {
    match source {
        BronzeSource::Download => bronze::run(store, &config.lake, &config.bronze).await,
        BronzeSource::LocalArchive(path) => {
            bronze::run_local_archive(store, &config.lake, &config.bronze, path).await
        }
    }
}

/// Run the Silver stage off the async runtime
pub async fn run_silver(config: &PipelineConfig, store: Arc<dyn TableStore>) -> Result<StageReport> {
    let lake = config.lake.clone();
    let rules = config.silver.clone();
    tokio::task::spawn_blocking(move || silver::run(store.as_ref(), &lake, &rules)).await?
}

/// Run the Gold stage off the async runtime
pub async fn run_gold(config: &PipelineConfig, store: Arc<dyn TableStore>) -> Result<StageReport> {
    let lake = config.lake.clone();
    let rules = config.gold.clone();
    tokio::task::spawn_blocking(move || gold::run(store.as_ref(), &lake, &rules)).await?
}

fn log_stage(step: usize, report: &StageReport) {
    if report.is_skipped() {
        info!("[{}/3] {} skipped: upstream dataset empty", step, report.layer);
    } else {
        info!(
            "[{}/3] {} finished in {:.2}s: {} rows in, {} rows out",
            step,
            report.layer,
            report.processing_time_ms as f64 / 1000.0,
            report.rows_in,
            report.rows_out
        );
    }
}

/// Run all three stages in order; the first fatal error aborts the run
pub async fn run_all(
    config: &PipelineConfig,
    store: Arc<dyn TableStore>,
    source: BronzeSource<'_>,
) -> Result<Vec<StageReport>> {
    let start_time = Instant::now();
    config.validate()?;
    info!("Starting full pipeline run under {}", config.lake.root.display());

    let mut reports = Vec::with_capacity(3);
    for (step, layer) in [Layer::Bronze, Layer::Silver, Layer::Gold].into_iter().enumerate() {
        info!("[{}/3] Running {} stage", step + 1, layer);
        let result = match layer {
            Layer::Bronze => run_bronze(config, Arc::clone(&store), source).await,
            Layer::Silver => run_silver(config, Arc::clone(&store)).await,
            Layer::Gold => run_gold(config, Arc::clone(&store)).await,
        };

        match result {
            Ok(report) => {
                log_stage(step + 1, &report);
                reports.push(report);
            }
            Err(e) => {
                error!("Pipeline aborted in {} stage: {}", layer, e);
                return Err(e);
            }
        }
    }

    info!(
        "Pipeline finished in {:.2}s",
        start_time.elapsed().as_secs_f64()
    );
    Ok(reports)
}
