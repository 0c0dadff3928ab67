//! Main analysis pipeline.
//!
//! Loads the rotated logs, reconstructs measurement blocks, matches them
//! against the day's scan windows and records the energy of every matched
//! scan, returning an [`AnalysisResult`] for reporting and export.

use std::path::Path;
use std::time::Instant;

use chrono::{NaiveDate, Utc};
use energy_core::models::{Block, ScanEnergy, ScanKey};
use energy_core::Result;
use tracing::{info, warn};

use crate::aggregator::{attribute_energy, BlockTotals};
use crate::catalogue::{ScanCatalogue, SCANS_TABLE};
use crate::reader::load_log_dir;
use crate::reconstruct::reconstruct;

// ── Public types ──────────────────────────────────────────────────────────────

/// What to match and where to record it.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub schema: String,
    /// Table receiving the energy column.
    pub table: String,
    /// Catalogue date to match; defaults to the date of the first block.
    pub date: Option<NaiveDate>,
    pub tolerance_minutes: f64,
    /// When `false`, energies are computed but not written back.
    pub record: bool,
}

impl Default for ScanRequest {
    fn default() -> Self {
        Self {
            schema: "public".to_string(),
            table: SCANS_TABLE.to_string(),
            date: None,
            tolerance_minutes: energy_core::settings::DEFAULT_TOLERANCE_MINUTES,
            record: true,
        }
    }
}

/// Metadata produced alongside the analysis result.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AnalysisMetadata {
    /// RFC 3339 timestamp when this result was generated.
    pub generated_at: String,
    /// Catalogue date the scans were taken from, if any.
    pub date: Option<NaiveDate>,
    pub files_processed: usize,
    pub blocks_created: usize,
    /// Blocks with no end line, even after consulting neighbouring files.
    pub incomplete_blocks: usize,
    pub scans_total: usize,
    pub scans_matched: usize,
    /// Scans whose energy was written to the catalogue.
    pub energies_recorded: usize,
    /// Wall-clock seconds spent reading the log files.
    pub load_time_seconds: f64,
    /// Wall-clock seconds spent reconstructing blocks.
    pub reconstruct_time_seconds: f64,
}

/// The complete output of [`analyze_scans`].
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub blocks: Vec<Block>,
    /// One row per scan window, in catalogue order.
    pub scans: Vec<ScanEnergy>,
    pub totals: BlockTotals,
    pub metadata: AnalysisMetadata,
}

// ── Public function ───────────────────────────────────────────────────────────

/// Run the full analysis pipeline.
///
/// 1. Load every `*.{extension}` log in `log_dir`, in file-name order.
/// 2. Reconstruct blocks across the files.
/// 3. Fetch the date's scan windows from `catalogue`.
/// 4. Match each window and sum its energy.
/// 5. Record matched energies unless `request.record` is `false`.
///
/// Without a catalogue only steps 1 and 2 run.
pub fn analyze_scans(
    log_dir: &Path,
    extension: &str,
    catalogue: Option<&mut dyn ScanCatalogue>,
    request: &ScanRequest,
) -> Result<AnalysisResult> {
    // ── Step 1: Load segments ─────────────────────────────────────────────────
    let load_start = Instant::now();
    let segments = load_log_dir(log_dir, extension)?;
    let load_time = load_start.elapsed().as_secs_f64();

    // ── Step 2: Build blocks ──────────────────────────────────────────────────
    let reconstruct_start = Instant::now();
    let blocks = reconstruct(&segments)?;
    let reconstruct_time = reconstruct_start.elapsed().as_secs_f64();
    let totals = BlockTotals::from_blocks(&blocks);

    info!(
        files = segments.len(),
        blocks = blocks.len(),
        incomplete = totals.incomplete,
        "blocks reconstructed"
    );

    let date = request
        .date
        .or_else(|| blocks.first().map(|b| b.start_time.date()));

    // ── Steps 3-5: Match and record ───────────────────────────────────────────
    let mut scans = Vec::new();
    let mut energies_recorded = 0;
    if let Some(catalogue) = catalogue {
        match date {
            Some(date) => {
                let windows = catalogue.get_scan_windows(&request.schema, date)?;
                scans = attribute_energy(&blocks, &windows, request.tolerance_minutes);
                if request.record {
                    energies_recorded = record_energies(catalogue, request, &scans)?;
                }
            }
            None => warn!("no date given and no blocks found; skipping scan matching"),
        }
    }

    let scans_matched = scans.iter().filter(|s| s.is_matched()).count();
    info!(
        scans = scans.len(),
        matched = scans_matched,
        recorded = energies_recorded,
        "scan energy attributed"
    );

    let metadata = AnalysisMetadata {
        generated_at: Utc::now().to_rfc3339(),
        date,
        files_processed: segments.len(),
        blocks_created: blocks.len(),
        incomplete_blocks: totals.incomplete,
        scans_total: scans.len(),
        scans_matched,
        energies_recorded,
        load_time_seconds: load_time,
        reconstruct_time_seconds: reconstruct_time,
    };

    Ok(AnalysisResult {
        blocks,
        scans,
        totals,
        metadata,
    })
}

// ── Private helpers ───────────────────────────────────────────────────────────

fn record_energies(
    catalogue: &mut dyn ScanCatalogue,
    request: &ScanRequest,
    scans: &[ScanEnergy],
) -> Result<usize> {
    let mut recorded = 0;
    for scan in scans {
        let Some(energy) = scan.energy else {
            continue;
        };
        let key = ScanKey {
            date_id: scan.date_id,
            start_time: scan.start_time,
        };
        if catalogue.record_energy(&request.schema, &request.table, &key, energy)? > 0 {
            recorded += 1;
        }
    }
    Ok(recorded)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::InMemoryCatalogue;
    use chrono::NaiveTime;
    use energy_core::models::ScanWindow;
    use energy_core::EnergyError;
    use tempfile::TempDir;

    fn write_log(dir: &Path, name: &str, lines: &[String]) {
        std::fs::write(dir.join(name), lines.join("\n")).unwrap();
    }

    fn line(t: &str, body: &str) -> String {
        format!("2024/01/15-{t}|INFO|{body}")
    }

    fn tod(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    /// Three 10-minute blocks from 09:00, the middle one split across files.
    fn seed_logs(dir: &Path) {
        write_log(
            dir,
            "EnergyTextFile_001.txt",
            &[
                line("09:00:00.000000", "cmdStartMeasurement|"),
                line("09:05:00.000000", "cmdUpdateEngInfo|energy: 5.0 Ws"),
                line("09:10:00.000000", "cmdEndMeasurement|"),
                line("09:10:00.000000", "cmdStartMeasurement|"),
                line("09:14:59.000000", "cmdUpdateEngInfo|energy: 3.0 Ws"),
            ],
        );
        write_log(
            dir,
            "EnergyTextFile_002.txt",
            &[
                line("09:15:00.000000", "cmdUpdateEngInfo|energy: 4.0 Ws"),
                line("09:15:00.500000", "cmdUpdateEngInfo|energy: 0.0 Ws"),
                line("09:20:00.000000", "cmdEndMeasurement|"),
                line("09:20:00.000000", "cmdStartMeasurement|"),
                line("09:25:00.000000", "cmdUpdateEngInfo|energy: 3.0 Ws"),
                line("09:30:00.000000", "cmdEndMeasurement|"),
            ],
        );
    }

    fn catalogue() -> InMemoryCatalogue {
        let mut cat = InMemoryCatalogue::new();
        cat.add_date("public", 1, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        cat.add_scan(
            "public",
            ScanWindow {
                start_time: tod(9, 10),
                end_time: tod(9, 30),
                protocol: "t2_flair".to_string(),
                date_id: 1,
            },
        );
        cat.add_scan(
            "public",
            ScanWindow {
                start_time: tod(13, 0),
                end_time: tod(13, 30),
                protocol: "dwi".to_string(),
                date_id: 1,
            },
        );
        cat
    }

    #[test]
    fn test_pipeline_matches_and_records() {
        let dir = TempDir::new().unwrap();
        seed_logs(dir.path());
        let mut cat = catalogue();

        let result = analyze_scans(
            dir.path(),
            "txt",
            Some(&mut cat),
            &ScanRequest {
                tolerance_minutes: 1.0,
                ..ScanRequest::default()
            },
        )
        .unwrap();

        assert_eq!(result.blocks.len(), 3);
        assert_eq!(result.metadata.files_processed, 2);
        assert_eq!(result.metadata.incomplete_blocks, 0);
        assert_eq!(result.metadata.scans_total, 2);
        assert_eq!(result.metadata.scans_matched, 1);
        assert_eq!(result.metadata.energies_recorded, 1);
        assert_eq!(
            result.metadata.date,
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );

        let matched = &result.scans[0];
        assert_eq!((matched.start_idx, matched.end_idx), (Some(1), Some(2)));
        assert!((matched.energy.unwrap() - 10.0).abs() < 1e-9);

        let key = ScanKey {
            date_id: 1,
            start_time: tod(9, 10),
        };
        assert_eq!(cat.energy("public", "scans", &key), Some(10.0));
    }

    #[test]
    fn test_dry_run_does_not_record() {
        let dir = TempDir::new().unwrap();
        seed_logs(dir.path());
        let mut cat = catalogue();

        let result = analyze_scans(
            dir.path(),
            "txt",
            Some(&mut cat),
            &ScanRequest {
                tolerance_minutes: 1.0,
                record: false,
                ..ScanRequest::default()
            },
        )
        .unwrap();

        assert_eq!(result.metadata.scans_matched, 1);
        assert_eq!(result.metadata.energies_recorded, 0);
        let key = ScanKey {
            date_id: 1,
            start_time: tod(9, 10),
        };
        assert_eq!(cat.energy("public", "scans", &key), None);
    }

    #[test]
    fn test_without_catalogue_only_reconstructs() {
        let dir = TempDir::new().unwrap();
        seed_logs(dir.path());
        let result = analyze_scans(dir.path(), "txt", None, &ScanRequest::default()).unwrap();
        assert_eq!(result.blocks.len(), 3);
        assert!(result.scans.is_empty());
        assert!((result.totals.total_energy - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_explicit_unknown_date_yields_no_scans() {
        let dir = TempDir::new().unwrap();
        seed_logs(dir.path());
        let mut cat = catalogue();
        let result = analyze_scans(
            dir.path(),
            "txt",
            Some(&mut cat),
            &ScanRequest {
                date: NaiveDate::from_ymd_opt(2024, 2, 1),
                ..ScanRequest::default()
            },
        )
        .unwrap();
        assert!(result.scans.is_empty());
    }

    #[test]
    fn test_empty_directory_is_error() {
        let dir = TempDir::new().unwrap();
        let err = analyze_scans(dir.path(), "txt", None, &ScanRequest::default()).unwrap_err();
        assert!(matches!(err, EnergyError::NoLogFiles(_)));
    }
}
