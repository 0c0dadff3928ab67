//! Log file discovery and loading.
//!
//! Finds the rotated power-monitor logs in a directory and reads each one
//! into a [`LogSegment`] for the reconstruction pass.

use std::path::{Path, PathBuf};

use energy_core::models::LogSegment;
use energy_core::{EnergyError, Result};
use tracing::{debug, warn};

// ── Public API ────────────────────────────────────────────────────────────────

/// Find the files in `dir` (not its subdirectories) with the given
/// extension, sorted by file name.
pub fn find_log_files(dir: &Path, extension: &str) -> Vec<PathBuf> {
    if !dir.exists() {
        warn!("Data path does not exist: {}", dir.display());
        return Vec::new();
    }

    let extension = extension.trim_start_matches('.');
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    files
}

/// Read one log file. Invalid UTF-8 is replaced rather than rejected.
pub fn load_segment(path: &Path) -> Result<LogSegment> {
    let bytes = std::fs::read(path).map_err(|source| EnergyError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let text = String::from_utf8_lossy(&bytes);

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let lines: Vec<String> = text.lines().map(str::to_owned).collect();

    debug!(file = %name, lines = lines.len(), "log file loaded");
    Ok(LogSegment {
        name,
        path: path.to_path_buf(),
        lines,
    })
}

/// Read every path in order. The first unreadable file aborts the load.
pub fn load_segments(paths: &[PathBuf]) -> Result<Vec<LogSegment>> {
    paths.iter().map(|p| load_segment(p)).collect()
}

/// Discover and read all logs in `dir`.
pub fn load_log_dir(dir: &Path, extension: &str) -> Result<Vec<LogSegment>> {
    if !dir.is_dir() {
        return Err(EnergyError::DataPathNotFound(dir.to_path_buf()));
    }
    let files = find_log_files(dir, extension);
    if files.is_empty() {
        return Err(EnergyError::NoLogFiles(dir.to_path_buf()));
    }
    debug!("Found {} log files in {}", files.len(), dir.display());
    load_segments(&files)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
