//! CSV and JSON exports of analysis results.

use std::path::Path;

use csv::Writer;
use energy_core::models::{Block, ScanEnergy};
use energy_core::time_utils::LOG_TIMESTAMP_FORMAT;
use energy_core::Result;
use serde::Serialize;

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Write one row per block.
pub fn write_blocks_csv(path: &Path, blocks: &[Block]) -> Result<()> {
    let mut wtr = Writer::from_path(path)?;

    wtr.write_record([
        "index",
        "start_time",
        "end_time",
        "duration_seconds",
        "total_energy",
    ])?;

    for (idx, block) in blocks.iter().enumerate() {
        wtr.write_record(&[
            idx.to_string(),
            block.start_time.format(LOG_TIMESTAMP_FORMAT).to_string(),
            opt(block.end_time.map(|t| t.format(LOG_TIMESTAMP_FORMAT))),
            opt(block.duration),
            block.total_energy.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Write one row per scan window; unmatched scans have empty range and
/// energy fields.
pub fn write_scan_energy_csv(path: &Path, rows: &[ScanEnergy]) -> Result<()> {
    let mut wtr = Writer::from_path(path)?;

    wtr.write_record([
        "date_id",
        "protocol",
        "start_time",
        "end_time",
        "start_idx",
        "end_idx",
        "energy",
    ])?;

    for row in rows {
        wtr.write_record(&[
            row.date_id.to_string(),
            row.protocol.clone(),
            row.start_time.format("%H:%M:%S").to_string(),
            row.end_time.format("%H:%M:%S").to_string(),
            opt(row.start_idx),
            opt(row.end_idx),
            opt(row.energy),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Pretty-printed JSON of any serialisable value.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    Ok(())
}
