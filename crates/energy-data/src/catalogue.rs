//! Scan catalogue access.
//!
//! A catalogue knows, per schema, which calendar dates exist and which scans
//! ran on each date. It also stores the energy attributed to a scan.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use energy_core::models::{CatalogueDate, ScanKey, ScanWindow};
use energy_core::time_utils::{parse_date, parse_time_of_day};
use energy_core::{EnergyError, Result};
use tracing::{debug, warn};

/// Table holding the scan windows of every schema.
pub const SCANS_TABLE: &str = "scans";
/// Table mapping date identifiers to calendar dates.
pub const DATES_TABLE: &str = "dates";
/// Column added to a table by [`ScanCatalogue::record_energy`].
pub const ENERGY_COLUMN: &str = "energy";

pub trait ScanCatalogue {
    /// Scans recorded on `date`, ordered by start time.
    ///
    /// A date the catalogue does not know yields an empty list.
    fn get_scan_windows(&self, schema: &str, date: NaiveDate) -> Result<Vec<ScanWindow>>;

    /// Store `energy` on every row of `table` matching `key`, adding the
    /// energy column first if needed. Returns the number of rows updated.
    fn record_energy(
        &mut self,
        schema: &str,
        table: &str,
        key: &ScanKey,
        energy: f64,
    ) -> Result<usize>;
}

// ── InMemoryCatalogue ─────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone)]
pub struct InMemoryCatalogue {
    dates: HashMap<String, Vec<CatalogueDate>>,
    scans: HashMap<String, Vec<ScanWindow>>,
    energies: HashMap<(String, String, ScanKey), f64>,
}

impl InMemoryCatalogue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_date(&mut self, schema: &str, id: i64, date: NaiveDate) {
        self.dates
            .entry(schema.to_string())
            .or_default()
            .push(CatalogueDate { id, date });
    }

    pub fn add_scan(&mut self, schema: &str, window: ScanWindow) {
        self.scans.entry(schema.to_string()).or_default().push(window);
    }

    /// Energy previously recorded for `key`, if any.
    pub fn energy(&self, schema: &str, table: &str, key: &ScanKey) -> Option<f64> {
        self.energies
            .get(&(schema.to_string(), table.to_string(), *key))
            .copied()
    }

    fn date_id(&self, schema: &str, date: NaiveDate) -> Option<i64> {
        self.dates
            .get(schema)?
            .iter()
            .find(|d| d.date == date)
            .map(|d| d.id)
    }
}

impl ScanCatalogue for InMemoryCatalogue {
    fn get_scan_windows(&self, schema: &str, date: NaiveDate) -> Result<Vec<ScanWindow>> {
        let Some(date_id) = self.date_id(schema, date) else {
            warn!(schema, %date, "no date entry in catalogue");
            return Ok(Vec::new());
        };
        let mut windows: Vec<ScanWindow> = self
            .scans
            .get(schema)
            .map(|all| all.iter().filter(|w| w.date_id == date_id).cloned().collect())
            .unwrap_or_default();
        windows.sort_by_key(|w| w.start_time);
        Ok(windows)
    }

    fn record_energy(
        &mut self,
        schema: &str,
        table: &str,
        key: &ScanKey,
        energy: f64,
    ) -> Result<usize> {
        let rows = self
            .scans
            .get(schema)
            .map(|all| all.iter().filter(|w| w.key() == *key).count())
            .unwrap_or(0);
        if rows > 0 {
            self.energies
                .insert((schema.to_string(), table.to_string(), *key), energy);
        }
        Ok(rows)
    }
}

// ── CsvCatalogue ──────────────────────────────────────────────────────────────

/// A catalogue stored as one directory per schema, one CSV file per table.
///
/// ```text
/// <root>/<schema>/dates.csv   id,date
/// <root>/<schema>/scans.csv   date_id,protocol,start_time,end_time[,...]
/// ```
#[derive(Debug, Clone)]
pub struct CsvCatalogue {
    root: PathBuf,
}

/// A table read fully into memory.
struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    fn column(&self, name: &str, path: &Path) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                EnergyError::Catalogue(format!("{} has no '{name}' column", path.display()))
            })
    }
}

impl CsvCatalogue {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn table_path(&self, schema: &str, table: &str) -> PathBuf {
        self.root.join(schema).join(format!("{table}.csv"))
    }

    /// Identifier of `date` in the schema's dates table.
    pub fn date_id(&self, schema: &str, date: NaiveDate) -> Result<i64> {
        let path = self.table_path(schema, DATES_TABLE);
        let table = read_table(&path)?;
        let id_col = table.column("id", &path)?;
        let date_col = table.column("date", &path)?;

        for row in &table.rows {
            if parse_date(field(row, date_col)).ok() == Some(date) {
                return parse_id(field(row, id_col), &path);
            }
        }
        Err(EnergyError::UnknownDate {
            schema: schema.to_string(),
            date: date.to_string(),
        })
    }
}

impl ScanCatalogue for CsvCatalogue {
    fn get_scan_windows(&self, schema: &str, date: NaiveDate) -> Result<Vec<ScanWindow>> {
        let date_id = match self.date_id(schema, date) {
            Ok(id) => id,
            Err(err @ EnergyError::UnknownDate { .. }) => {
                warn!("{err}");
                return Ok(Vec::new());
            }
            Err(err) => return Err(err),
        };

        let path = self.table_path(schema, SCANS_TABLE);
        let table = read_table(&path)?;
        let date_col = table.column("date_id", &path)?;
        let start_col = table.column("start_time", &path)?;
        let end_col = table.column("end_time", &path)?;
        let protocol_col = table.column("protocol", &path).ok();

        let mut windows = Vec::new();
        for row in &table.rows {
            if parse_id(field(row, date_col), &path)? != date_id {
                continue;
            }
            windows.push(ScanWindow {
                start_time: parse_time_of_day(field(row, start_col))?,
                end_time: parse_time_of_day(field(row, end_col))?,
                protocol: protocol_col
                    .map(|c| field(row, c).to_string())
                    .unwrap_or_default(),
                date_id,
            });
        }
        windows.sort_by_key(|w| w.start_time);

        debug!(schema, %date, date_id, scans = windows.len(), "scan windows loaded");
        Ok(windows)
    }

    fn record_energy(
        &mut self,
        schema: &str,
        table: &str,
        key: &ScanKey,
        energy: f64,
    ) -> Result<usize> {
        let path = self.table_path(schema, table);
        let mut data = read_table(&path)?;
        let date_col = data.column("date_id", &path)?;
        let start_col = data.column("start_time", &path)?;

        let energy_col = match data.column(ENERGY_COLUMN, &path) {
            Ok(c) => c,
            Err(_) => {
                let col = data.headers.len();
                data.headers.push(ENERGY_COLUMN.to_string());
                // Unnamed trailing fields of over-long rows move past the new column.
                for row in &mut data.rows {
                    if row.len() < col {
                        row.resize(col, String::new());
                    }
                    row.insert(col, String::new());
                }
                col
            }
        };

        let mut updated = 0;
        for row in &mut data.rows {
            let same_date = field(row, date_col).trim().parse::<i64>().ok() == Some(key.date_id);
            let same_start = parse_time_of_day(field(row, start_col)).ok() == Some(key.start_time);
            if same_date && same_start {
                if row.len() <= energy_col {
                    row.resize(energy_col + 1, String::new());
                }
                row[energy_col] = energy.to_string();
                updated += 1;
            }
        }

        write_table(&path, &data)?;
        debug!(schema, table, date_id = key.date_id, start = %key.start_time, energy, updated, "energy recorded");
        Ok(updated)
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn field(row: &[String], idx: usize) -> &str {
    row.get(idx).map(String::as_str).unwrap_or("")
}

fn parse_id(s: &str, path: &Path) -> Result<i64> {
    s.trim().parse().map_err(|_| {
        EnergyError::Catalogue(format!("invalid identifier '{s}' in {}", path.display()))
    })
}

fn read_table(path: &Path) -> Result<Table> {
    if !path.is_file() {
        return Err(EnergyError::Catalogue(format!(
            "table not found: {}",
            path.display()
        )));
    }
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = reader.headers()?.iter().map(str::to_owned).collect();
    let rows = reader
        .records()
        .map(|r| r.map(|rec| rec.iter().map(str::to_owned).collect()))
        .collect::<std::result::Result<Vec<Vec<String>>, csv::Error>>()?;
    Ok(Table { headers, rows })
}

/// Write through a sibling temp file and rename it over `path`.
fn write_table(path: &Path, table: &Table) -> Result<()> {
    let tmp = path.with_extension("csv.tmp");
    {
        let mut writer = csv::WriterBuilder::new().flexible(true).from_path(&tmp)?;
        writer.write_record(&table.headers)?;
        for row in &table.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
    }
    std::fs::rename(&tmp, path)?;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
