use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use regex::Regex;

use crate::error::{EnergyError, Result};

/// Timestamp layout written by the power monitor, e.g. `2024/01/15-10:00:00.123456`.
pub const LOG_TIMESTAMP_FORMAT: &str = "%Y/%m/%d-%H:%M:%S%.6f";

/// chrono accepts any number of fractional digits for `%.6f`, so the exact
/// shape is checked up front.
fn timestamp_shape() -> &'static Regex {
    static SHAPE: OnceLock<Regex> = OnceLock::new();
    SHAPE.get_or_init(|| {
        Regex::new(r"^\d{4}/\d{2}/\d{2}-\d{2}:\d{2}:\d{2}\.\d{6}$").expect("regex is valid")
    })
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse a power-monitor timestamp with microsecond resolution.
///
/// The whole string must match [`LOG_TIMESTAMP_FORMAT`]; surrounding text,
/// missing fractional digits and out-of-range fields are all rejected.
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime> {
    if !timestamp_shape().is_match(s) {
        return Err(EnergyError::TimestampParse(s.to_string()));
    }
    NaiveDateTime::parse_from_str(s, LOG_TIMESTAMP_FORMAT)
        .map_err(|_| EnergyError::TimestampParse(s.to_string()))
}

/// Parse a catalogue time of day (`HH:MM`, `HH:MM:SS` or `HH:MM:SS.ffffff`).
pub fn parse_time_of_day(s: &str) -> Result<NaiveTime> {
    const FMTS: &[&str] = &["%H:%M:%S%.f", "%H:%M:%S", "%H:%M"];
    let trimmed = s.trim();
    FMTS.iter()
        .find_map(|fmt| NaiveTime::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| EnergyError::TimestampParse(s.to_string()))
}

/// Parse an ISO calendar date (`YYYY-MM-DD`).
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| EnergyError::TimestampParse(s.to_string()))
}

// ── Durations ─────────────────────────────────────────────────────────────────

fn delta_seconds(delta: TimeDelta) -> f64 {
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => delta.num_milliseconds() as f64 / 1_000.0,
    }
}

/// Signed number of seconds from `start` to `end`.
pub fn seconds_between(start: NaiveDateTime, end: NaiveDateTime) -> f64 {
    delta_seconds(end - start)
}

/// Duration of a block in seconds, or `None` while it has no end.
pub fn duration_seconds(start: NaiveDateTime, end: Option<NaiveDateTime>) -> Option<f64> {
    end.map(|e| seconds_between(start, e))
}

/// `true` when two instants are at most `tolerance_secs` apart in either direction.
pub fn within_seconds(a: NaiveDateTime, b: NaiveDateTime, tolerance_secs: f64) -> bool {
    seconds_between(a, b).abs() <= tolerance_secs
}

/// Signed difference `target - actual` in minutes, comparing times of day only.
pub fn time_of_day_diff_minutes(actual: NaiveTime, target: NaiveTime) -> f64 {
    delta_seconds(target - actual) / 60.0
}
