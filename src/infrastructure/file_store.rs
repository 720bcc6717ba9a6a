//! Flat-file persistence: one JSON array in, one timestamped JSON array out.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Load a JSON array of records
pub fn load_json_array<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file {}", path.display()))?;

    let records: Vec<T> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse JSON array from {}", path.display()))?;

    info!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Output file path: `<dir>/<prefix>_<YYYY-MM-DD_HH-MM-SS>.json`
pub fn timestamped_path(dir: &Path, prefix: &str, at: DateTime<Local>) -> PathBuf {
    dir.join(format!("{}_{}.json", prefix, at.format(TIMESTAMP_FORMAT)))
}

/// Write `records` as one pretty-printed JSON array.
///
/// The file is written to a sibling temp file first and renamed into place,
/// so readers never observe a partial array.
pub fn write_json_atomic<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    }

    let json = serde_json::to_string_pretty(records).context("Failed to serialize records")?;

    let tmp_path = path.with_extension("json.tmp");
    {
        let mut file = fs::File::create(&tmp_path)
            .with_context(|| format!("Failed to create {}", tmp_path.display()))?;
        file.write_all(json.as_bytes())
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        file.sync_all()
            .with_context(|| format!("Failed to flush {}", tmp_path.display()))?;
    }

    fs::rename(&tmp_path, path)
        .with_context(|| format!("Failed to move output into place at {}", path.display()))?;

    Ok(())
}

/// Write `records` into a new timestamped file in `dir`
pub fn save_timestamped<T: Serialize>(
    dir: &Path,
    prefix: &str,
    records: &[T],
) -> Result<PathBuf> {
    let path = timestamped_path(dir, prefix, Local::now());
    write_json_atomic(&path, records)?;
    info!("Saved {} records to {}", records.len(), path.display());
    Ok(path)
}
