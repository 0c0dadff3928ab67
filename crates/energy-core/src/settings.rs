use chrono::NaiveDate;
use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{EnergyError, Result};
use crate::time_utils::parse_date;

/// Default window-matching tolerance in minutes.
pub const DEFAULT_TOLERANCE_MINUTES: f64 = 5.0;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Attribute power-monitor energy to catalogued scans
#[derive(Parser, Debug, Clone)]
#[command(
    name = "scan-energy",
    about = "Attribute power-monitor energy to catalogued scans",
    version
)]
pub struct Settings {
    /// Directory holding one session's rotated power-monitor logs
    #[arg(long)]
    pub logs: Option<PathBuf>,

    /// Directory of the CSV scan catalogue
    #[arg(long)]
    pub catalogue: Option<PathBuf>,

    /// Catalogue schema (one sub-directory per schema)
    #[arg(long, default_value = "public")]
    pub schema: String,

    /// Catalogue table that receives the energy column
    #[arg(long, default_value = "scans")]
    pub table: String,

    /// Scan date (YYYY-MM-DD); defaults to the date of the first block
    #[arg(long)]
    pub date: Option<String>,

    /// Window-matching tolerance in minutes
    #[arg(long, default_value_t = DEFAULT_TOLERANCE_MINUTES)]
    pub tolerance: f64,

    /// Extension of log files to read
    #[arg(long, default_value = "txt")]
    pub extension: String,

    /// Directory for blocks.csv and scan_energy.csv
    #[arg(long)]
    pub export_dir: Option<PathBuf>,

    /// Compute energies without writing them to the catalogue
    #[arg(long)]
    pub dry_run: bool,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long)]
    pub clear: bool,
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.scan-energy/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalogue: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
}

impl LastUsedParams {
    /// `~/.scan-energy/last_used.json`.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// The config path rooted at `base_dir`.
    pub fn config_path_in(base_dir: &Path) -> PathBuf {
        base_dir.join(".scan-energy").join("last_used.json")
    }

    /// Load persisted params; `Default` when the file is absent or unreadable.
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Delete the config file at `path` if it exists.
    pub fn clear_at(path: &Path) -> Result<()> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse process arguments, merge last-used params and persist the result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Same as [`Settings::load_with_last_used`] with explicit arguments and
    /// config path.
    pub fn load_with_last_used_impl(args: Vec<std::ffi::OsString>, config_path: &Path) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            if let Err(e) = LastUsedParams::clear_at(config_path) {
                tracing::warn!(error = %e, "could not clear saved configuration");
            }
            return settings.resolve_debug();
        }

        let last = LastUsedParams::load_from(config_path);

        // CLI always wins over saved values.
        if !is_arg_explicitly_set(&matches, "catalogue") && settings.catalogue.is_none() {
            settings.catalogue = last.catalogue;
        }
        if !is_arg_explicitly_set(&matches, "schema") {
            if let Some(v) = last.schema {
                settings.schema = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "table") {
            if let Some(v) = last.table {
                settings.table = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "tolerance") {
            if let Some(v) = last.tolerance {
                settings.tolerance = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "extension") {
            if let Some(v) = last.extension {
                settings.extension = v;
            }
        }

        let settings = settings.resolve_debug();

        if let Err(e) = LastUsedParams::from(&settings).save_to(config_path) {
            tracing::debug!(error = %e, "could not persist last-used parameters");
        }

        settings
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(EnergyError::Config(format!(
                "tolerance must be a positive number of minutes, got {}",
                self.tolerance
            )));
        }
        if self.extension.trim().is_empty() {
            return Err(EnergyError::Config("extension must not be empty".to_string()));
        }
        if self.logs.is_none() {
            return Err(EnergyError::Config("--logs is required".to_string()));
        }
        Ok(())
    }

    /// The `--date` value, parsed.
    pub fn scan_date(&self) -> Result<Option<NaiveDate>> {
        self.date.as_deref().map(parse_date).transpose()
    }

    /// `--debug` overrides the log level.
    fn resolve_debug(mut self) -> Self {
        if self.debug {
            self.log_level = "DEBUG".to_string();
        }
        self
    }
}

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            catalogue: s.catalogue.clone(),
            schema: Some(s.schema.clone()),
            table: Some(s.table.clone()),
            tolerance: Some(s.tolerance),
            extension: Some(s.extension.clone()),
        }
    }
}

/// `true` when `name` was supplied on the command line rather than defaulted.
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use tempfile::TempDir;

    fn args(list: &[&str]) -> Vec<OsString> {
        list.iter().map(OsString::from).collect()
    }

    #[test]
    fn test_settings_default_values() {
        let settings = Settings::parse_from(["scan-energy"]);
        assert!(settings.logs.is_none());
        assert!(settings.catalogue.is_none());
        assert_eq!(settings.schema, "public");
        assert_eq!(settings.table, "scans");
        assert!(settings.date.is_none());
        assert!((settings.tolerance - DEFAULT_TOLERANCE_MINUTES).abs() < f64::EPSILON);
        assert_eq!(settings.extension, "txt");
        assert!(!settings.dry_run);
        assert_eq!(settings.log_level, "INFO");
        assert!(!settings.debug);
    }

    #[test]
    fn test_last_used_params_save_load() {
        let tmp = TempDir::new().expect("tempdir");
        let path = LastUsedParams::config_path_in(tmp.path());
        let params = LastUsedParams {
            catalogue: Some(PathBuf::from("/data/catalogue")),
            schema: Some("site_b".to_string()),
            table: Some("scans".to_string()),
            tolerance: Some(2.5),
            extension: Some("log".to_string()),
        };
        params.save_to(&path).expect("save");
        assert_eq!(LastUsedParams::load_from(&path), params);
    }

    #[test]
    fn test_last_used_params_default_when_missing() {
        let tmp = TempDir::new().expect("tempdir");
        let loaded = LastUsedParams::load_from(&LastUsedParams::config_path_in(tmp.path()));
        assert_eq!(loaded, LastUsedParams::default());
    }

    #[test]
    fn test_last_used_params_clear() {
        let tmp = TempDir::new().expect("tempdir");
        let path = LastUsedParams::config_path_in(tmp.path());
        LastUsedParams::default().save_to(&path).expect("save");
        assert!(path.exists());
        LastUsedParams::clear_at(&path).expect("clear");
        assert!(!path.exists());
    }

    #[test]
    fn test_saved_values_fill_unset_args() {
        let tmp = TempDir::new().expect("tempdir");
        let path = LastUsedParams::config_path_in(tmp.path());
        LastUsedParams {
            catalogue: Some(PathBuf::from("/srv/cat")),
            schema: Some("site_b".to_string()),
            tolerance: Some(3.0),
            ..Default::default()
        }
        .save_to(&path)
        .expect("save");

        let settings =
            Settings::load_with_last_used_impl(args(&["scan-energy", "--logs", "/l"]), &path);
        assert_eq!(settings.catalogue, Some(PathBuf::from("/srv/cat")));
        assert_eq!(settings.schema, "site_b");
        assert!((settings.tolerance - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_cli_wins_over_saved_values() {
        let tmp = TempDir::new().expect("tempdir");
        let path = LastUsedParams::config_path_in(tmp.path());
        LastUsedParams {
            schema: Some("site_b".to_string()),
            tolerance: Some(3.0),
            ..Default::default()
        }
        .save_to(&path)
        .expect("save");

        let settings = Settings::load_with_last_used_impl(
            args(&["scan-energy", "--schema", "site_c", "--tolerance", "1.5"]),
            &path,
        );
        assert_eq!(settings.schema, "site_c");
        assert!((settings.tolerance - 1.5).abs() < f64::EPSILON);

        // The explicit values are persisted for the next run.
        let saved = LastUsedParams::load_from(&path);
        assert_eq!(saved.schema.as_deref(), Some("site_c"));
    }

    #[test]
    fn test_clear_removes_saved_file() {
        let tmp = TempDir::new().expect("tempdir");
        let path = LastUsedParams::config_path_in(tmp.path());
        LastUsedParams::default().save_to(&path).expect("save");

        let settings =
            Settings::load_with_last_used_impl(args(&["scan-energy", "--clear", "--debug"]), &path);
        assert!(!path.exists());
        assert_eq!(settings.log_level, "DEBUG");
    }

    #[test]
    fn test_validate() {
        let mut settings = Settings::parse_from(["scan-energy", "--logs", "/l"]);
        assert!(settings.validate().is_ok());

        settings.tolerance = 0.0;
        assert!(matches!(settings.validate(), Err(EnergyError::Config(_))));

        settings.tolerance = 1.0;
        settings.logs = None;
        assert!(matches!(settings.validate(), Err(EnergyError::Config(_))));
    }

    #[test]
    fn test_scan_date() {
        let settings = Settings::parse_from(["scan-energy", "--date", "2024-01-15"]);
        assert_eq!(
            settings.scan_date().unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
        assert_eq!(Settings::parse_from(["scan-energy"]).scan_date().unwrap(), None);
        let bad = Settings::parse_from(["scan-energy", "--date", "15/01/2024"]);
        assert!(bad.scan_date().is_err());
    }
}
