//! Configuration management and validation.
//!
//! Every lookup table the stages depend on (rename map, plausibility ranges,
//! aggregation rules, decimal precision) lives here as an immutable structure
//! passed explicitly into each stage. `Default` reproduces the production
//! rule set; tests and callers swap in alternatives with the `with_*`
//! builders or a JSON file.

use crate::constants::{self, acquisition, columns, limits, metrics, timestamp};
use crate::error::{PipelineError, Result};
use crate::models::{AggregateOp, WriteMode};
use chrono::format::{Item, StrftimeItems};
use chrono_tz::Tz;
use polars::prelude::{DataType, ParquetCompression};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Top-level configuration for a pipeline run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub lake: LakePaths,
    pub bronze: BronzeConfig,
    pub silver: SilverRules,
    pub gold: GoldRules,
    pub storage: StorageConfig,
}

impl PipelineConfig {
    /// Load a configuration file; absent sections fall back to defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_json::from_str(&text)?;
        config.validate()?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Reject rule sets that would make a stage fail structurally mid-run
    pub fn validate(&self) -> Result<()> {
        self.bronze.validate()?;
        self.silver.normalizer.validate()?;
        self.silver.quality.validate()?;
        self.gold.validate()?;
        Ok(())
    }

    /// Set the lake root directory
    pub fn with_lake_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.lake.root = root.into();
        self
    }

    /// Set the target timezone for both Silver timestamps and Gold dates
    pub fn with_timezone(mut self, name: &str) -> Self {
        self.silver.normalizer.target_timezone = name.to_string();
        self.gold.target_timezone = name.to_string();
        self
    }

    pub fn with_bronze(mut self, bronze: BronzeConfig) -> Self {
        self.bronze = bronze;
        self
    }

    pub fn with_silver(mut self, silver: SilverRules) -> Self {
        self.silver = silver;
        self
    }

    pub fn with_gold(mut self, gold: GoldRules) -> Self {
        self.gold = gold;
        self
    }

    pub fn with_storage(mut self, storage: StorageConfig) -> Self {
        self.storage = storage;
        self
    }
}

// =============================================================================
// Lake Layout & Storage
// =============================================================================

/// Locations of the three datasets under one lake root
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LakePaths {
    pub root: PathBuf,
    pub bronze_dataset: String,
    pub silver_dataset: String,
    pub gold_dataset: String,
}

impl Default for LakePaths {
    fn default() -> Self {
        Self {
            root: PathBuf::from(constants::DEFAULT_LAKE_ROOT),
            bronze_dataset: constants::BRONZE_DATASET.to_string(),
            silver_dataset: constants::SILVER_DATASET.to_string(),
            gold_dataset: constants::GOLD_DATASET.to_string(),
        }
    }
}

impl LakePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    pub fn bronze_path(&self) -> PathBuf {
        self.root.join(&self.bronze_dataset)
    }

    pub fn silver_path(&self) -> PathBuf {
        self.root.join(&self.silver_dataset)
    }

    pub fn gold_path(&self) -> PathBuf {
        self.root.join(&self.gold_dataset)
    }
}

/// Supported compression algorithms for parquet files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompressionAlgorithm {
    /// Snappy compression - good balance of speed and compression
    Snappy,
    /// ZSTD compression - better compression ratio, slower
    Zstd,
    /// LZ4 compression - fastest, lower compression ratio
    Lz4,
    /// No compression
    Uncompressed,
}

impl CompressionAlgorithm {
    /// Convert to polars ParquetCompression type
    pub fn to_polars_compression(&self) -> ParquetCompression {
        match self {
            CompressionAlgorithm::Snappy => ParquetCompression::Snappy,
            CompressionAlgorithm::Zstd => ParquetCompression::Zstd(None),
            CompressionAlgorithm::Lz4 => ParquetCompression::Lz4Raw,
            CompressionAlgorithm::Uncompressed => ParquetCompression::Uncompressed,
        }
    }

    /// Parse the CLI spelling (snappy, zstd, lz4, none)
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "snappy" => Ok(CompressionAlgorithm::Snappy),
            "zstd" => Ok(CompressionAlgorithm::Zstd),
            "lz4" => Ok(CompressionAlgorithm::Lz4),
            "none" | "uncompressed" => Ok(CompressionAlgorithm::Uncompressed),
            other => Err(PipelineError::Configuration {
                message: format!("Unknown compression algorithm: {}", other),
            }),
        }
    }
}

/// Parquet output settings shared by all layers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub compression: CompressionAlgorithm,
    /// Write column statistics for query pruning
    pub enable_statistics: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            compression: CompressionAlgorithm::Snappy,
            enable_statistics: true,
        }
    }
}

// =============================================================================
// Bronze
// =============================================================================

/// Raw archive acquisition settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BronzeConfig {
    /// Download URL with a `{year}` placeholder
    pub url_template: String,
    /// Explicit years to ingest; empty means the last `years_back` years
    pub years: Vec<i32>,
    pub years_back: u32,
    /// Substring an archive entry name must contain to be ingested
    pub station_filter: String,
    pub max_workers: usize,
    pub request_timeout_secs: u64,
    pub metadata_rows: usize,
    pub delimiter: u8,
    pub write_mode: WriteMode,
}

impl Default for BronzeConfig {
    fn default() -> Self {
        Self {
            url_template: acquisition::URL_TEMPLATE.to_string(),
            years: Vec::new(),
            years_back: acquisition::YEARS_BACK,
            station_filter: acquisition::STATION_FILE_FILTER.to_string(),
            max_workers: acquisition::MAX_WORKERS,
            request_timeout_secs: acquisition::REQUEST_TIMEOUT_SECS,
            metadata_rows: acquisition::METADATA_ROWS,
            delimiter: acquisition::DELIMITER,
            write_mode: WriteMode::DeleteMatching,
        }
    }
}

impl BronzeConfig {
    /// Years to ingest, ascending; `current_year` anchors the default window
    pub fn resolve_years(&self, current_year: i32) -> Vec<i32> {
        let mut years = if self.years.is_empty() {
            let first = current_year - self.years_back as i32 + 1;
            (first..=current_year).collect::<Vec<_>>()
        } else {
            self.years.clone()
        };
        years.sort_unstable();
        years.dedup();
        years
    }

    pub fn url_for(&self, year: i32) -> String {
        self.url_template.replace("{year}", &year.to_string())
    }

    pub fn with_years(mut self, years: Vec<i32>) -> Self {
        self.years = years;
        self
    }

    pub fn with_station_filter(mut self, filter: impl Into<String>) -> Self {
        self.station_filter = filter.into();
        self
    }

    pub fn with_max_workers(mut self, workers: usize) -> Self {
        self.max_workers = workers;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(PipelineError::Configuration {
                message: "bronze.max_workers must be at least 1".to_string(),
            });
        }
        if self.years.is_empty() && self.years_back == 0 {
            return Err(PipelineError::Configuration {
                message: "bronze.years_back must be at least 1 when no years are listed"
                    .to_string(),
            });
        }
        if !self.url_template.contains("{year}") {
            return Err(PipelineError::Configuration {
                message: format!(
                    "bronze.url_template has no {{year}} placeholder: {}",
                    self.url_template
                ),
            });
        }
        Ok(())
    }
}

// =============================================================================
// Silver
// =============================================================================

/// One entry of the raw header lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub raw: String,
    pub canonical: String,
}

/// Rules turning raw string records into typed hourly observations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerRules {
    /// Ordered raw → canonical lookup; unmapped raw columns are dropped
    pub column_map: Vec<ColumnMapping>,
    pub date_column: String,
    pub hour_column: String,
    /// Unit marker trailing the hour token ("0100 UTC")
    pub hour_unit_suffix: String,
    pub timestamp_format: String,
    pub end_of_day_token: String,
    pub start_of_day_token: String,
    /// Advance the calendar day when the end-of-day token is rewritten.
    /// Off by default: the archive's "2400" rows keep their stated date.
    pub roll_end_of_day: bool,
    pub target_timezone: String,
    pub measurement_columns: Vec<String>,
    pub decimal_separator: char,
    pub missing_value_tokens: Vec<String>,
}

impl Default for NormalizerRules {
    fn default() -> Self {
        Self {
            column_map: constants::RAW_COLUMN_MAP
                .iter()
                .map(|(raw, canonical)| ColumnMapping {
                    raw: raw.to_string(),
                    canonical: canonical.to_string(),
                })
                .collect(),
            date_column: columns::DATE.to_string(),
            hour_column: columns::HOUR_UTC.to_string(),
            hour_unit_suffix: timestamp::HOUR_UNIT_SUFFIX.to_string(),
            timestamp_format: timestamp::FORMAT.to_string(),
            end_of_day_token: timestamp::END_OF_DAY.to_string(),
            start_of_day_token: timestamp::START_OF_DAY.to_string(),
            roll_end_of_day: false,
            target_timezone: constants::TARGET_TIMEZONE.to_string(),
            measurement_columns: constants::MEASUREMENT_COLUMNS
                .iter()
                .map(|c| c.to_string())
                .collect(),
            decimal_separator: constants::DECIMAL_SEPARATOR,
            missing_value_tokens: constants::MISSING_VALUE_TOKENS
                .iter()
                .map(|t| t.to_string())
                .collect(),
        }
    }
}

impl NormalizerRules {
    pub fn timezone(&self) -> Result<Tz> {
        parse_timezone(&self.target_timezone)
    }

    pub fn with_column_map(mut self, column_map: Vec<ColumnMapping>) -> Self {
        self.column_map = column_map;
        self
    }

    pub fn with_timestamp_format(mut self, format: impl Into<String>) -> Self {
        self.timestamp_format = format.into();
        self
    }

    pub fn with_end_of_day_rollover(mut self) -> Self {
        self.roll_end_of_day = true;
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_timestamp_format(&self.timestamp_format)?;
        self.timezone()?;
        Ok(())
    }
}

/// Which columns a plausibility range applies to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnSelector {
    Exact(String),
    /// Every column whose name contains the fragment
    Contains(String),
}

impl ColumnSelector {
    pub fn matches(&self, column: &str) -> bool {
        match self {
            ColumnSelector::Exact(name) => column == name,
            ColumnSelector::Contains(fragment) => column.contains(fragment.as_str()),
        }
    }
}

/// Inclusive plausibility range; an open bound is unlimited
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeRule {
    pub selector: ColumnSelector,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl RangeRule {
    pub fn new(selector: ColumnSelector, min: Option<f64>, max: Option<f64>) -> Self {
        Self { selector, min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value.is_finite()
            && self.min.is_none_or(|min| value >= min)
            && self.max.is_none_or(|max| value <= max)
    }
}

/// Plausibility ranges and the deduplication key
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityRules {
    pub range_rules: Vec<RangeRule>,
    pub dedup_key: Vec<String>,
}

impl Default for QualityRules {
    fn default() -> Self {
        Self {
            range_rules: vec![
                RangeRule::new(
                    ColumnSelector::Contains(limits::HUMIDITY_FAMILY.to_string()),
                    Some(limits::HUMIDITY_MIN),
                    Some(limits::HUMIDITY_MAX),
                ),
                RangeRule::new(
                    ColumnSelector::Exact(columns::PRECIPITATION.to_string()),
                    Some(limits::PRECIPITATION_MIN),
                    None,
                ),
                RangeRule::new(
                    ColumnSelector::Contains(limits::TEMPERATURE_FAMILY.to_string()),
                    Some(limits::TEMPERATURE_MIN),
                    Some(limits::TEMPERATURE_MAX),
                ),
            ],
            dedup_key: vec![
                columns::OBSERVATION_TIMESTAMP.to_string(),
                columns::SOURCE_FILE.to_string(),
            ],
        }
    }
}

impl QualityRules {
    /// Rules applying to `column`, in declaration order
    pub fn rules_for<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a RangeRule> + 'a {
        self.range_rules
            .iter()
            .filter(move |rule| rule.selector.matches(column))
    }

    pub fn with_range_rules(mut self, rules: Vec<RangeRule>) -> Self {
        self.range_rules = rules;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.dedup_key.is_empty() {
            return Err(PipelineError::Configuration {
                message: "silver.quality.dedup_key must name at least one column".to_string(),
            });
        }
        for rule in &self.range_rules {
            if let (Some(min), Some(max)) = (rule.min, rule.max) {
                if min > max {
                    return Err(PipelineError::Configuration {
                        message: format!("Range rule {:?} has min {} above max {}", rule.selector, min, max),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Silver stage rule set
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SilverRules {
    pub normalizer: NormalizerRules,
    pub quality: QualityRules,
    pub partition_columns: Vec<String>,
    pub write_mode: WriteMode,
}

impl Default for SilverRules {
    fn default() -> Self {
        Self {
            normalizer: NormalizerRules::default(),
            quality: QualityRules::default(),
            partition_columns: vec![
                columns::PARTITION_YEAR.to_string(),
                columns::PARTITION_MONTH.to_string(),
            ],
            write_mode: WriteMode::DeleteMatching,
        }
    }
}

impl SilverRules {
    pub fn with_normalizer(mut self, normalizer: NormalizerRules) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn with_quality(mut self, quality: QualityRules) -> Self {
        self.quality = quality;
        self
    }
}

// =============================================================================
// Gold
// =============================================================================

/// One named daily statistic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationRule {
    pub output: String,
    pub source: String,
    pub op: AggregateOp,
}

impl AggregationRule {
    pub fn new(output: &str, source: &str, op: AggregateOp) -> Self {
        Self {
            output: output.to_string(),
            source: source.to_string(),
            op,
        }
    }
}

/// Metric computed as `minuend - subtrahend` after aggregation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedDifference {
    pub output: String,
    pub minuend: String,
    pub subtrahend: String,
}

/// Fixed-point shape of one Gold metric
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricPrecision {
    pub metric: String,
    pub precision: u32,
    pub scale: u32,
}

impl MetricPrecision {
    fn new(metric: &str, precision: u32, scale: u32) -> Self {
        Self {
            metric: metric.to_string(),
            precision,
            scale,
        }
    }
}

/// Physical type of a Gold schema column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoldColumnType {
    Date,
    Utf8,
    Decimal { precision: u32, scale: u32 },
    Int32,
}

impl GoldColumnType {
    pub fn to_dtype(&self) -> DataType {
        match self {
            GoldColumnType::Date => DataType::Date,
            GoldColumnType::Utf8 => DataType::String,
            GoldColumnType::Decimal { precision, scale } => {
                DataType::Decimal(Some(*precision as usize), Some(*scale as usize))
            }
            GoldColumnType::Int32 => DataType::Int32,
        }
    }
}

/// Gold stage rule set
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoldRules {
    pub station_column: String,
    pub target_timezone: String,
    pub aggregations: Vec<AggregationRule>,
    pub amplitude: DerivedDifference,
    /// Declared metric order of the output schema, with decimal shapes
    pub metric_precision: Vec<MetricPrecision>,
    pub partition_columns: Vec<String>,
    pub write_mode: WriteMode,
}

impl Default for GoldRules {
    fn default() -> Self {
        use metrics::*;

        Self {
            station_column: columns::STATION.to_string(),
            target_timezone: constants::TARGET_TIMEZONE.to_string(),
            aggregations: vec![
                AggregationRule::new(TEMP_MAX_DAILY, columns::TEMP_MAX, AggregateOp::Max),
                AggregationRule::new(TEMP_MIN_DAILY, columns::TEMP_MIN, AggregateOp::Min),
                AggregationRule::new(
                    PRECIPITATION_DAILY,
                    columns::PRECIPITATION,
                    AggregateOp::Sum,
                ),
                AggregationRule::new(TEMP_MEAN_DAILY, columns::TEMP_DRY_BULB, AggregateOp::Mean),
                AggregationRule::new(HUMIDITY_MEAN_DAILY, columns::HUMIDITY, AggregateOp::Mean),
                AggregationRule::new(RADIATION_DAILY, columns::RADIATION, AggregateOp::Sum),
                AggregationRule::new(
                    WIND_SPEED_MEAN_DAILY,
                    columns::WIND_SPEED,
                    AggregateOp::Mean,
                ),
                AggregationRule::new(WIND_GUST_MAX_DAILY, columns::WIND_SPEED, AggregateOp::Max),
            ],
            amplitude: DerivedDifference {
                output: THERMAL_AMPLITUDE_DAILY.to_string(),
                minuend: TEMP_MAX_DAILY.to_string(),
                subtrahend: TEMP_MIN_DAILY.to_string(),
            },
            metric_precision: vec![
                MetricPrecision::new(TEMP_MAX_DAILY, DEFAULT_PRECISION, DEFAULT_SCALE),
                MetricPrecision::new(TEMP_MIN_DAILY, DEFAULT_PRECISION, DEFAULT_SCALE),
                MetricPrecision::new(PRECIPITATION_DAILY, DEFAULT_PRECISION, PRECIPITATION_SCALE),
                MetricPrecision::new(TEMP_MEAN_DAILY, DEFAULT_PRECISION, DEFAULT_SCALE),
                MetricPrecision::new(HUMIDITY_MEAN_DAILY, DEFAULT_PRECISION, DEFAULT_SCALE),
                MetricPrecision::new(RADIATION_DAILY, RADIATION_PRECISION, DEFAULT_SCALE),
                MetricPrecision::new(WIND_SPEED_MEAN_DAILY, DEFAULT_PRECISION, DEFAULT_SCALE),
                MetricPrecision::new(WIND_GUST_MAX_DAILY, DEFAULT_PRECISION, DEFAULT_SCALE),
                MetricPrecision::new(THERMAL_AMPLITUDE_DAILY, DEFAULT_PRECISION, DEFAULT_SCALE),
            ],
            partition_columns: vec![
                columns::GOLD_YEAR.to_string(),
                columns::GOLD_MONTH.to_string(),
                columns::STATION.to_string(),
            ],
            write_mode: WriteMode::OverwriteOrIgnore,
        }
    }
}

impl GoldRules {
    pub fn timezone(&self) -> Result<Tz> {
        parse_timezone(&self.target_timezone)
    }

    /// Decimal scale a metric is rounded to, if it is a declared metric
    pub fn scale_for(&self, metric: &str) -> Option<u32> {
        self.metric_precision
            .iter()
            .find(|p| p.metric == metric)
            .map(|p| p.scale)
    }

    /// Declared output schema: date, station, metrics, year, month
    pub fn target_schema(&self) -> Vec<(String, GoldColumnType)> {
        let mut schema = Vec::with_capacity(self.metric_precision.len() + 4);
        schema.push((columns::CALENDAR_DATE.to_string(), GoldColumnType::Date));
        schema.push((self.station_column.clone(), GoldColumnType::Utf8));
        for p in &self.metric_precision {
            schema.push((
                p.metric.clone(),
                GoldColumnType::Decimal {
                    precision: p.precision,
                    scale: p.scale,
                },
            ));
        }
        schema.push((columns::GOLD_YEAR.to_string(), GoldColumnType::Int32));
        schema.push((columns::GOLD_MONTH.to_string(), GoldColumnType::Int32));
        schema
    }

    pub fn with_aggregations(mut self, aggregations: Vec<AggregationRule>) -> Self {
        self.aggregations = aggregations;
        self
    }

    pub fn with_write_mode(mut self, mode: WriteMode) -> Self {
        self.write_mode = mode;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.timezone()?;
        for p in &self.metric_precision {
            if p.precision == 0 || p.scale > p.precision {
                return Err(PipelineError::Configuration {
                    message: format!(
                        "Metric {} has invalid decimal shape ({}, {})",
                        p.metric, p.precision, p.scale
                    ),
                });
            }
        }
        Ok(())
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Resolve an IANA timezone name
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| PipelineError::UnknownTimezone {
            name: name.to_string(),
        })
}

/// Reject strftime patterns chrono cannot interpret
pub fn validate_timestamp_format(format: &str) -> Result<()> {
    if format.trim().is_empty() {
        return Err(PipelineError::InvalidTimestampFormat {
            format: format.to_string(),
            reason: "format is empty".to_string(),
        });
    }
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(PipelineError::InvalidTimestampFormat {
            format: format.to_string(),
            reason: "unrecognised strftime specifier".to_string(),
        });
    }
    Ok(())
}
