mod bootstrap;

use anyhow::{Context, Result};
use energy_core::formatting::{format_duration, format_energy, format_energy_kwh};
use energy_core::settings::Settings;
use energy_data::analysis::{analyze_scans, AnalysisResult, ScanRequest};
use energy_data::catalogue::{CsvCatalogue, ScanCatalogue};
use energy_data::export::{write_blocks_csv, write_json, write_scan_energy_csv};

fn main() -> Result<()> {
    bootstrap::ensure_directories()?;
    let settings = Settings::load_with_last_used();
    bootstrap::setup_logging(&settings.log_level)?;

    tracing::info!("scan-energy v{} starting", env!("CARGO_PKG_VERSION"));

    if settings.clear && settings.logs.is_none() {
        println!("Saved configuration cleared.");
        return Ok(());
    }

    settings.validate()?;
    let log_dir = settings
        .logs
        .clone()
        .context("--logs is required")?;

    let request = ScanRequest {
        schema: settings.schema.clone(),
        table: settings.table.clone(),
        date: settings.scan_date()?,
        tolerance_minutes: settings.tolerance,
        record: !settings.dry_run,
    };

    let mut csv_catalogue = settings.catalogue.as_ref().map(CsvCatalogue::new);
    if csv_catalogue.is_none() {
        tracing::info!("No catalogue given; reconstructing blocks only");
    }
    let catalogue = csv_catalogue
        .as_mut()
        .map(|c| c as &mut dyn ScanCatalogue);

    let result = analyze_scans(&log_dir, &settings.extension, catalogue, &request)
        .with_context(|| format!("analysis of {} failed", log_dir.display()))?;

    if let Some(dir) = &settings.export_dir {
        export(dir, &result)?;
    }

    print_summary(&result, settings.dry_run);
    Ok(())
}

fn export(dir: &std::path::Path, result: &AnalysisResult) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("could not create {}", dir.display()))?;
    write_blocks_csv(&dir.join("blocks.csv"), &result.blocks)?;
    if !result.scans.is_empty() {
        write_scan_energy_csv(&dir.join("scan_energy.csv"), &result.scans)?;
    }
    write_json(&dir.join("metadata.json"), &result.metadata)?;
    tracing::info!(dir = %dir.display(), "results exported");
    Ok(())
}

fn print_summary(result: &AnalysisResult, dry_run: bool) {
    let meta = &result.metadata;
    println!(
        "{} files, {} blocks ({} incomplete), {} total ({})",
        meta.files_processed,
        meta.blocks_created,
        meta.incomplete_blocks,
        format_energy(result.totals.total_energy),
        format_energy_kwh(result.totals.total_energy),
    );
    println!(
        "Measured time: {}",
        format_duration(Some(result.totals.measured_seconds))
    );

    for scan in &result.scans {
        let energy = scan
            .energy
            .map(format_energy)
            .unwrap_or_else(|| "no match".to_string());
        println!(
            "  {} {}-{}  {}",
            scan.protocol,
            scan.start_time.format("%H:%M:%S"),
            scan.end_time.format("%H:%M:%S"),
            energy
        );
    }

    if !result.scans.is_empty() {
        let verb = if dry_run { "would be recorded" } else { "recorded" };
        let count = if dry_run {
            meta.scans_matched
        } else {
            meta.energies_recorded
        };
        println!(
            "{}/{} scans matched, {} {}",
            meta.scans_matched, meta.scans_total, count, verb
        );
    }
    println!(
        "Completed in {:.3}s",
        meta.load_time_seconds + meta.reconstruct_time_seconds
    );
}
