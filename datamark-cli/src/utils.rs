//! Common utility functions shared across CLI commands.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use datamark_core::SchemeRecord;
use tracing::debug;

/// Default output path for a recipient's copy.
///
/// Transforms `dir/customers.csv` into `dir/customers_fp_<gamma>_<length>_<recipient>.csv`.
pub fn build_output_path(input: &Path, gamma: u32, length: usize, recipient: u32) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("dataset");
    input.with_file_name(format!("{stem}_fp_{gamma}_{length}_{recipient}.csv"))
}

/// Load and parse a scheme record, CBOR or JSON.
pub fn load_record(path: &Path) -> Result<SchemeRecord> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read record: {}", path.display()))?;
    let record = SchemeRecord::from_bytes(&bytes)
        .with_context(|| format!("Malformed record: {}", path.display()))?;
    debug!(path = %path.display(), bytes = bytes.len(), "Parsed scheme record");
    Ok(record)
}

/// Current Unix time in seconds.
pub fn unix_now() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or(0)
}

/// Format a Unix timestamp (seconds) as a human-readable UTC string.
pub fn format_timestamp(timestamp: u64) -> String {
    let Ok(secs) = i64::try_from(timestamp) else {
        return format!("{timestamp}s");
    };
    match Utc.timestamp_opt(secs, 0) {
        chrono::LocalResult::Single(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        _ => format!("{timestamp}s"),
    }
}
