use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::time_utils::duration_seconds;

/// The command carried by a single power-monitor log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// `cmdStartMeasurement`: opens a new measurement block.
    StartMeasurement,
    /// `cmdUpdateEngInfo`: carries one energy sample.
    UpdateEnergyInfo,
    /// `cmdEndMeasurement`: closes the open block.
    EndMeasurement,
    /// Anything else; ignored by the block builder.
    Other,
}

/// A classified log line. Only produced for lines the builder acts upon.
#[derive(Debug, Clone, PartialEq)]
pub struct LogLine {
    pub timestamp: NaiveDateTime,
    pub command: Command,
    /// Energy sample for `UpdateEnergyInfo` lines.
    pub energy: Option<f64>,
}

/// One reconstructed measurement interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Timestamp of the `cmdStartMeasurement` line that opened the block.
    pub start_time: NaiveDateTime,
    /// Timestamp of the closing `cmdEndMeasurement` line, if one was found.
    #[serde(default)]
    pub end_time: Option<NaiveDateTime>,
    /// Sum of every energy sample seen while the block was open.
    #[serde(default)]
    pub total_energy: f64,
    /// `end_time - start_time` in seconds.
    #[serde(default)]
    pub duration: Option<f64>,
}

impl Block {
    /// Open a new block with no energy.
    pub fn open(start_time: NaiveDateTime) -> Self {
        Self {
            start_time,
            end_time: None,
            total_energy: 0.0,
            duration: None,
        }
    }

    /// Accumulate one energy sample.
    pub fn add_energy(&mut self, sample: f64) {
        self.total_energy += sample;
    }

    /// Close the block at `end_time` and derive its duration.
    pub fn close(&mut self, end_time: NaiveDateTime) {
        self.end_time = Some(end_time);
        self.duration = duration_seconds(self.start_time, Some(end_time));
    }

    /// `true` once an end line has been attributed to the block.
    pub fn is_complete(&self) -> bool {
        self.end_time.is_some()
    }
}

/// A scan interval supplied by the catalogue. Times are times of day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanWindow {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    /// Protocol label of the scan.
    #[serde(default)]
    pub protocol: String,
    /// Catalogue identifier of the scan's date.
    pub date_id: i64,
}

impl ScanWindow {
    /// The key under which energy for this window is recorded.
    pub fn key(&self) -> ScanKey {
        ScanKey {
            date_id: self.date_id,
            start_time: self.start_time,
        }
    }
}

/// Identifies a scan row in the catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScanKey {
    pub date_id: i64,
    pub start_time: NaiveTime,
}

/// A calendar date together with its catalogue identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogueDate {
    pub id: i64,
    pub date: NaiveDate,
}

/// One rotated log file held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSegment {
    /// File name; the sort key for previous/next lookups.
    pub name: String,
    pub path: PathBuf,
    pub lines: Vec<String>,
}

impl LogSegment {
    /// Build a segment from in-memory lines, e.g. for tests or embedding.
    pub fn from_lines<I, S>(name: impl Into<String>, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        Self {
            path: PathBuf::from(&name),
            name,
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }
}

/// Energy attributed to one scan window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanEnergy {
    pub date_id: i64,
    pub protocol: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    /// Index of the first matched block, if the window matched.
    pub start_idx: Option<usize>,
    /// Index of the last matched block, if the window matched.
    pub end_idx: Option<usize>,
    /// Summed energy, `None` when the window matched no blocks.
    pub energy: Option<f64>,
}

impl ScanEnergy {
    pub fn is_matched(&self) -> bool {
        self.energy.is_some()
    }
}
