//! Yearly ZIP archives, read in memory

use crate::error::Result;

use std::io::{Cursor, Read};
use tracing::{debug, warn};
use zip::ZipArchive;

/// One extracted station file
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Station CSVs extracted from an archive, plus the matching entries that could not be read
#[derive(Debug, Default)]
pub struct ExtractedEntries {
    pub entries: Vec<ArchiveEntry>,
    pub failed: usize,
}

/// True for CSV entries whose name contains `filter`
pub fn matches_filter(name: &str, filter: &str) -> bool {
    name.contains(filter) && name.to_lowercase().ends_with(".csv")
}

/// Extract every entry matching `filter` without touching the disk
pub fn extract_matching(bytes: &[u8], filter: &str) -> Result<ExtractedEntries> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut extracted = ExtractedEntries::default();

    for index in 0..archive.len() {
        let mut file = match archive.by_index(index) {
            Ok(file) => file,
            Err(e) => {
                warn!("Skipping unreadable archive entry #{}: {}", index, e);
                extracted.failed += 1;
                continue;
            }
        };
        if file.is_dir() || !matches_filter(file.name(), filter) {
            continue;
        }

        let name = file.name().to_string();
        let mut buffer = Vec::with_capacity(file.size() as usize);
        match file.read_to_end(&mut buffer) {
            Ok(_) => {
                debug!("Extracted {} ({} bytes)", name, buffer.len());
                extracted.entries.push(ArchiveEntry {
                    name,
                    bytes: buffer,
                });
            }
            Err(e) => {
                warn!("Skipping {}: {}", name, e);
                extracted.failed += 1;
            }
        }
    }

    Ok(extracted)
}
