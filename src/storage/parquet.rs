//! Partitioned parquet datasets on the local filesystem.

use super::TableStore;
use crate::config::StorageConfig;
use crate::constants::{NULL_PARTITION_VALUE, PARQUET_EXTENSION, STAGING_PREFIX};
use crate::error::{PipelineError, Result};
use crate::frame;
use crate::models::{WriteMode, WriteSummary};

use polars::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Hive-partitioned parquet dataset store
#[derive(Debug, Clone, Default)]
pub struct ParquetDatasetStore {
    config: StorageConfig,
}

/// Rows of one partition, stripped of the partition columns
struct Partition {
    relative_dir: PathBuf,
    frame: DataFrame,
}

impl ParquetDatasetStore {
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }

    fn write_file(&self, df: &mut DataFrame, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let statistics = if self.config.enable_statistics {
            StatisticsOptions::full()
        } else {
            StatisticsOptions::empty()
        };

        ParquetWriter::new(file)
            .with_compression(self.config.compression.to_polars_compression())
            .with_statistics(statistics)
            .finish(df)
            .map_err(|e| PipelineError::storage(path, format!("Failed to write parquet: {}", e)))?;

        debug!("Wrote {} rows to {}", df.height(), path.display());
        Ok(())
    }

    /// Stage every partition next to the dataset, then swap each one in
    fn write_delete_matching(
        &self,
        partitions: Vec<Partition>,
        base: &Path,
    ) -> Result<WriteSummary> {
        fs::create_dir_all(base)?;
        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(base)?;

        let mut summary = WriteSummary::default();
        let mut staged = Vec::with_capacity(partitions.len());
        for mut partition in partitions {
            let dir = staging.path().join(&partition.relative_dir);
            fs::create_dir_all(&dir)?;
            self.write_file(&mut partition.frame, &dir.join(part_file_name("0")))?;

            summary.partitions += 1;
            summary.files_written += 1;
            summary.rows_written += partition.frame.height();
            staged.push(partition.relative_dir);
        }

        for relative_dir in staged {
            let staged_dir = staging.path().join(&relative_dir);
            if relative_dir.as_os_str().is_empty() {
                replace_root_files(&staged_dir, base)?;
                continue;
            }

            let target = base.join(&relative_dir);
            if target.exists() {
                debug!("Replacing partition {}", target.display());
                fs::remove_dir_all(&target)?;
            }
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::rename(&staged_dir, &target).map_err(|e| {
                PipelineError::storage(&target, format!("Failed to swap in partition: {}", e))
            })?;
        }

        Ok(summary)
    }

    /// Add uniquely named files; existing files are left alone
    fn write_overwrite_or_ignore(
        &self,
        partitions: Vec<Partition>,
        base: &Path,
    ) -> Result<WriteSummary> {
        let stamp = format!(
            "{}-{}",
            chrono::Utc::now().format("%Y%m%dT%H%M%S%6f"),
            std::process::id()
        );

        let mut summary = WriteSummary::default();
        for (index, mut partition) in partitions.into_iter().enumerate() {
            let dir = base.join(&partition.relative_dir);
            fs::create_dir_all(&dir)?;
            let name = part_file_name(&format!("{}-{}", stamp, index));
            self.write_file(&mut partition.frame, &dir.join(name))?;

            summary.partitions += 1;
            summary.files_written += 1;
            summary.rows_written += partition.frame.height();
        }
        Ok(summary)
    }
}

impl TableStore for ParquetDatasetStore {
    fn read_table(&self, base: &Path) -> Result<DataFrame> {
        if !base.exists() {
            debug!("Dataset {} does not exist yet", base.display());
            return Ok(DataFrame::empty());
        }

        let files = discover_parquet_files(base)?;
        if files.is_empty() {
            debug!("Dataset {} holds no parquet files", base.display());
            return Ok(DataFrame::empty());
        }

        let mut frames = Vec::with_capacity(files.len());
        let mut partition_keys = BTreeSet::new();
        for path in &files {
            let file = File::open(path)?;
            let mut df = ParquetReader::new(file).finish().map_err(|e| {
                PipelineError::storage(path, format!("Failed to read parquet: {}", e))
            })?;

            let height = df.height();
            for (key, value) in partition_values(base, path) {
                df.with_column(Series::new(key.as_str().into(), vec![value; height]))?;
                partition_keys.insert(key);
            }
            frames.push(df.lazy());
        }

        let mut merged = concat_lf_diagonal(frames, UnionArgs::default())?.collect()?;
        for key in &partition_keys {
            type_partition_column(&mut merged, key)?;
        }

        debug!(
            "Read {} rows from {} files under {}",
            merged.height(),
            files.len(),
            base.display()
        );
        Ok(merged)
    }

    fn write_table(
        &self,
        df: &DataFrame,
        base: &Path,
        partition_columns: &[String],
        mode: WriteMode,
    ) -> Result<WriteSummary> {
        let partitions = split_partitions(df, partition_columns)?;
        debug!(
            "Writing {} rows in {} partitions to {} ({:?})",
            df.height(),
            partitions.len(),
            base.display(),
            mode
        );

        match mode {
            WriteMode::DeleteMatching => self.write_delete_matching(partitions, base),
            WriteMode::OverwriteOrIgnore => self.write_overwrite_or_ignore(partitions, base),
        }
    }
}

fn part_file_name(token: &str) -> String {
    format!("part-{}.{}", token, PARQUET_EXTENSION)
}

/// Group rows by their partition key values
fn split_partitions(df: &DataFrame, partition_columns: &[String]) -> Result<Vec<Partition>> {
    for name in partition_columns {
        if !frame::has_column(df, name) {
            return Err(PipelineError::missing_column(name, "storage write"));
        }
    }

    let data_columns: Vec<String> = frame::column_names(df)
        .into_iter()
        .filter(|name| !partition_columns.contains(name))
        .collect();

    let key_values = partition_columns
        .iter()
        .map(|name| frame::string_values(df, name))
        .collect::<PolarsResult<Vec<_>>>()?;

    let mut groups: BTreeMap<Vec<Option<String>>, Vec<IdxSize>> = BTreeMap::new();
    for row in 0..df.height() {
        let key = key_values.iter().map(|values| values[row].clone()).collect();
        groups.entry(key).or_default().push(row as IdxSize);
    }

    groups
        .into_iter()
        .map(|(key, rows)| {
            let relative_dir = partition_columns
                .iter()
                .zip(&key)
                .map(|(name, value)| {
                    let value = value
                        .as_deref()
                        .map(encode_segment)
                        .unwrap_or_else(|| NULL_PARTITION_VALUE.to_string());
                    format!("{}={}", name, value)
                })
                .collect::<PathBuf>();

            let indices = IdxCa::from_vec("rows".into(), rows);
            let frame = df.take(&indices)?.select(data_columns.iter().map(String::as_str))?;
            Ok(Partition {
                relative_dir,
                frame,
            })
        })
        .collect()
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.') || name.starts_with('_'))
}

fn discover_parquet_files(base: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(base)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e))
    {
        let entry = entry.map_err(|e| PipelineError::storage(base, e.to_string()))?;
        let path = entry.path();
        if entry.file_type().is_file()
            && path.extension().is_some_and(|ext| ext == PARQUET_EXTENSION)
        {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}

/// `key=value` directory segments between `base` and the file
fn partition_values(base: &Path, file: &Path) -> Vec<(String, Option<String>)> {
    let Ok(relative) = file.strip_prefix(base) else {
        return Vec::new();
    };
    let Some(parent) = relative.parent() else {
        return Vec::new();
    };

    parent
        .components()
        .filter_map(|component| match component {
            Component::Normal(segment) => segment.to_str(),
            _ => None,
        })
        .filter_map(|segment| segment.split_once('='))
        .map(|(key, value)| {
            let value = (value != NULL_PARTITION_VALUE).then(|| decode_segment(value));
            (key.to_string(), value)
        })
        .collect()
}

/// Integer-looking partition keys come back as Int32
fn type_partition_column(df: &mut DataFrame, key: &str) -> Result<()> {
    let values = frame::string_values(df, key)?;
    let parsed: Vec<Option<i32>> = values
        .iter()
        .map(|value| value.as_deref().and_then(|v| v.parse::<i32>().ok()))
        .collect();

    let all_numeric = values
        .iter()
        .zip(&parsed)
        .all(|(raw, int)| raw.is_none() || int.is_some());
    if all_numeric {
        df.with_column(Series::new(key.into(), parsed))?;
    }
    Ok(())
}

fn replace_root_files(staged_dir: &Path, base: &Path) -> Result<()> {
    for entry in fs::read_dir(base)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == PARQUET_EXTENSION) {
            fs::remove_file(&path)?;
        }
    }
    for entry in fs::read_dir(staged_dir)? {
        let entry = entry?;
        fs::rename(entry.path(), base.join(entry.file_name()))?;
    }
    Ok(())
}

/// Percent-encode bytes that would break a `key=value` path segment
fn encode_segment(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '/' | '\\' | '=' | '%' | ':' | '\0' => {
                let mut buf = [0u8; 4];
                for byte in ch.encode_utf8(&mut buf).bytes() {
                    encoded.push_str(&format!("%{:02X}", byte));
                }
            }
            _ => encoded.push(ch),
        }
    }
    encoded
}

fn decode_segment(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let byte = std::str::from_utf8(&bytes[i + 1..i + 3])
                .ok()
                .and_then(|hex| u8::from_str_radix(hex, 16).ok());
            if let Some(byte) = byte {
                decoded.push(byte);
                i += 3;
                continue;
            }
        }
        decoded.push(bytes[i]);
        i += 1;
    }
    String::from_utf8(decoded).unwrap_or_else(|e| {
        warn!("Partition segment {} is not valid UTF-8 after decoding", value);
        String::from_utf8_lossy(e.as_bytes()).into_owned()
    })
}
