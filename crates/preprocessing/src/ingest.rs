//! JSON-lines readers for the raw snapshot files.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use insights_core::{InsightsError, InsightsResult};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Parse one record per non-blank line. Errors carry the 1-based line number.
pub fn read_json_lines<T, R>(reader: R, source_name: &str) -> InsightsResult<Vec<T>>
where
    T: DeserializeOwned,
    R: BufRead,
{
    let mut records = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| InsightsError::Ingest {
            source_name: source_name.to_string(),
            line: index + 1,
            message: e.to_string(),
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|e| InsightsError::Ingest {
            source_name: source_name.to_string(),
            line: index + 1,
            message: e.to_string(),
        })?;
        records.push(record);
    }
    debug!(source = source_name, records = records.len(), "records read");
    Ok(records)
}

pub fn load_json_lines<T: DeserializeOwned>(path: impl AsRef<Path>) -> InsightsResult<Vec<T>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| InsightsError::Ingest {
        source_name: path.display().to_string(),
        line: 0,
        message: e.to_string(),
    })?;
    read_json_lines(BufReader::new(file), &path.display().to_string())
}
