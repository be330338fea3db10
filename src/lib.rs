//! INMET Climate Pipeline
//!
//! Batch pipeline turning hourly INMET weather-station archives into a daily
//! climate data mart, organised as a Bronze/Silver/Gold lake:
//! - Bronze: raw station CSVs from the yearly archives, partitioned by year
//! - Silver: typed, range-checked, deduplicated hourly observations with
//!   UTC-anchored timestamps, partitioned by year and month
//! - Gold: one row per local calendar day and station with fixed-point daily
//!   metrics, partitioned by year, month and station

pub mod bronze;
pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod frame;
pub mod gold;
pub mod models;
pub mod pipeline;
pub mod silver;
pub mod storage;

pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use models::{Layer, StageReport, WriteMode};
pub use storage::{ParquetDatasetStore, TableStore};
