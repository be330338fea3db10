//! INMET station CSV parsing
//!
//! Every station file starts with a short `KEY:;VALUE` preamble describing the
//! station, followed by a `;`-delimited table. Cells are kept as raw strings;
//! typing happens in Silver.

use crate::config::BronzeConfig;
use crate::constants::{acquisition, columns};
use crate::error::{PipelineError, Result};

use csv::ReaderBuilder;
use encoding_rs::WINDOWS_1252;
use polars::prelude::*;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Station description taken from the file preamble
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StationMetadata {
    pub region: Option<String>,
    pub state: Option<String>,
    pub station: Option<String>,
    pub wmo_code: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub altitude: Option<String>,
    pub founded: Option<String>,
}

impl StationMetadata {
    /// Parse preamble lines of the form `KEY:;VALUE`
    pub fn parse(lines: &[&str], delimiter: u8) -> Self {
        let delimiter = delimiter as char;
        let mut entries: HashMap<String, String> = HashMap::new();

        for line in lines {
            let Some((key, value)) = line.split_once(delimiter) else {
                continue;
            };
            let key = key.trim().trim_end_matches(':').trim().to_uppercase();
            let value = value.trim().trim_end_matches(delimiter).trim();
            if !key.is_empty() && !value.is_empty() {
                entries.insert(key, value.to_string());
            }
        }

        // Older files suffix the founding date key with its format
        let founded = entries.get(acquisition::META_FOUNDED).cloned().or_else(|| {
            entries
                .iter()
                .find(|(key, _)| key.starts_with(acquisition::META_FOUNDED))
                .map(|(_, value)| value.clone())
        });

        Self {
            region: entries.get(acquisition::META_REGION).cloned(),
            state: entries.get(acquisition::META_STATE).cloned(),
            station: entries.get(acquisition::META_STATION).cloned(),
            wmo_code: entries.get(acquisition::META_WMO_CODE).cloned(),
            latitude: entries.get(acquisition::META_LATITUDE).cloned(),
            longitude: entries.get(acquisition::META_LONGITUDE).cloned(),
            altitude: entries.get(acquisition::META_ALTITUDE).cloned(),
            founded,
        }
    }
}

/// Decode Latin-1 station bytes
pub fn decode_latin1(bytes: &[u8]) -> String {
    let (text, _, had_errors) = WINDOWS_1252.decode(bytes);
    if had_errors {
        debug!("Replacement characters inserted while decoding station file");
    }
    text.into_owned()
}

/// Split off the first `count` lines, returning them and the remaining text
fn split_preamble(text: &str, count: usize) -> (Vec<&str>, &str) {
    let mut lines = Vec::with_capacity(count);
    let mut rest = text;
    for _ in 0..count {
        if rest.is_empty() {
            break;
        }
        match rest.find('\n') {
            Some(end) => {
                lines.push(rest[..end].trim_end_matches('\r'));
                rest = &rest[end + 1..];
            }
            None => {
                lines.push(rest.trim_end_matches('\r'));
                rest = "";
            }
        }
    }
    (lines, rest)
}

/// Header names with blank entries removed and duplicates suffixed `.1`, `.2`, ...
fn kept_headers(headers: &csv::StringRecord) -> Vec<(usize, String)> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    headers
        .iter()
        .enumerate()
        .filter_map(|(index, name)| {
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            let count = seen.entry(name.to_string()).or_insert(0);
            let unique = if *count == 0 {
                name.to_string()
            } else {
                format!("{}.{}", name, count)
            };
            *count += 1;
            Some((index, unique))
        })
        .collect()
}

/// Parse one station file into a string table tagged with its origin.
///
/// Rows carrying non-blank cells beyond the header width are skipped with a
/// warning; short rows are padded with nulls.
pub fn read_station_csv(name: &str, bytes: &[u8], config: &BronzeConfig) -> Result<DataFrame> {
    let text = decode_latin1(bytes);
    let (preamble, body) = split_preamble(&text, config.metadata_rows);
    let metadata = StationMetadata::parse(&preamble, config.delimiter);

    let mut reader = ReaderBuilder::new()
        .delimiter(config.delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(body.as_bytes());

    let headers = reader
        .headers()
        .map_err(|source| PipelineError::Csv {
            file: name.to_string(),
            source,
        })?
        .clone();
    let kept = kept_headers(&headers);

    let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); kept.len()];
    let mut malformed = 0usize;
    for (line, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                warn!("{}: skipping unreadable row {}: {}", name, line + 1, e);
                malformed += 1;
                continue;
            }
        };
        if record.iter().skip(headers.len()).any(|cell| !cell.trim().is_empty()) {
            warn!(
                "{}: skipping row {} with {} fields, expected {}",
                name,
                line + 1,
                record.len(),
                headers.len()
            );
            malformed += 1;
            continue;
        }
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        for (slot, (index, _)) in kept.iter().enumerate() {
            let value = record
                .get(*index)
                .map(str::trim)
                .filter(|cell| !cell.is_empty())
                .map(str::to_string);
            cells[slot].push(value);
        }
    }

    let height = cells.first().map_or(0, Vec::len);
    let mut frame_columns: Vec<Column> = kept
        .iter()
        .zip(cells)
        .map(|((_, header), values)| Series::new(header.as_str().into(), values).into_column())
        .collect();

    let origin = [
        (columns::SOURCE_FILE, Some(name.to_string())),
        (columns::STATION, metadata.station.clone()),
        (columns::STATE, metadata.state.clone()),
        (columns::WMO_CODE, metadata.wmo_code.clone()),
    ];
    for (column, value) in origin {
        if kept.iter().any(|(_, header)| header == column) {
            continue;
        }
        frame_columns.push(Series::new(column.into(), vec![value; height]).into_column());
    }

    debug!(
        "{}: {} rows, {} columns, {} malformed rows skipped",
        name,
        height,
        frame_columns.len(),
        malformed
    );
    Ok(DataFrame::new(frame_columns)?)
}
