use chrono::NaiveDateTime;

use crate::error::{EnergyError, Result};
use crate::models::{Command, LogLine};
use crate::time_utils::parse_timestamp;

/// Marker of a line that opens a measurement block.
pub const START_MARKER: &str = "cmdStartMeasurement";
/// Marker of a line that carries an energy sample.
pub const UPDATE_MARKER: &str = "cmdUpdateEngInfo";
/// Marker of a line that closes a measurement block.
pub const END_MARKER: &str = "cmdEndMeasurement";

const FIELD_SEPARATOR: char = '|';
const ENERGY_PREFIX: &str = "energy: ";

// ── LineParser ────────────────────────────────────────────────────────────────

/// Splits pipe-delimited power-monitor lines into their timestamp, command
/// and energy sample.
pub struct LineParser;

impl LineParser {
    /// Classify a raw line by the command marker it contains.
    ///
    /// Markers are checked in the order start, update, end, so a line that
    /// somehow carries several is treated as the first one found.
    pub fn classify(line: &str) -> Command {
        if line.contains(START_MARKER) {
            Command::StartMeasurement
        } else if line.contains(UPDATE_MARKER) {
            Command::UpdateEnergyInfo
        } else if line.contains(END_MARKER) {
            Command::EndMeasurement
        } else {
            Command::Other
        }
    }

    /// Parse the timestamp field (the text before the first `|`).
    pub fn timestamp(line: &str) -> Result<NaiveDateTime> {
        let field = line.split(FIELD_SEPARATOR).next().unwrap_or_default();
        parse_timestamp(field)
    }

    /// Extract the energy sample: the text after the last `energy: ` up to the
    /// next space.
    pub fn energy(line: &str) -> Result<f64> {
        let (_, tail) = line
            .rsplit_once(ENERGY_PREFIX)
            .ok_or_else(|| EnergyError::EnergyParse(line.to_string()))?;
        let value = tail.split(' ').next().unwrap_or_default();
        value
            .trim_end()
            .parse::<f64>()
            .map_err(|_| EnergyError::EnergyParse(line.to_string()))
    }

    /// Fully parse a recognised line. Returns `Ok(None)` for lines without a
    /// command marker, which are never parsed further.
    pub fn parse(line: &str) -> Result<Option<LogLine>> {
        let command = Self::classify(line);
        if command == Command::Other {
            return Ok(None);
        }

        let timestamp = Self::timestamp(line)?;
        let energy = match command {
            Command::UpdateEnergyInfo => Some(Self::energy(line)?),
            _ => None,
        };

        Ok(Some(LogLine {
            timestamp,
            command,
            energy,
        }))
    }

    /// Timestamp of a line that carries fields at all (contains a `|`).
    ///
    /// Returns `None` for lines without a separator; such lines never count
    /// as valid timestamps for the adjacency test.
    pub fn field_timestamp(line: &str) -> Option<Result<NaiveDateTime>> {
        if line.contains(FIELD_SEPARATOR) {
            Some(Self::timestamp(line))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    const START: &str = "2024/01/15-10:00:00.000000|INFO|cmdStartMeasurement|id=3";
    const UPDATE: &str =
        "2024/01/15-10:00:01.500000|INFO|cmdUpdateEngInfo|power: 12.0 energy: 42.5 unit: Ws";
    const END: &str = "2024/01/15-10:00:09.000000|INFO|cmdEndMeasurement|";

    #[test]
    fn test_classify_markers() {
        assert_eq!(LineParser::classify(START), Command::StartMeasurement);
        assert_eq!(LineParser::classify(UPDATE), Command::UpdateEnergyInfo);
        assert_eq!(LineParser::classify(END), Command::EndMeasurement);
        assert_eq!(
            LineParser::classify("2024/01/15-10:00:00.000000|INFO|heartbeat"),
            Command::Other
        );
    }

    #[test]
    fn test_classify_start_wins_over_end() {
        let line = "2024/01/15-10:00:00.000000|cmdEndMeasurement then cmdStartMeasurement";
        assert_eq!(LineParser::classify(line), Command::StartMeasurement);
    }

    #[test]
    fn test_energy_extraction() {
        assert_eq!(LineParser::energy(UPDATE).unwrap(), 42.5);
    }

    #[test]
    fn test_energy_at_end_of_line() {
        let line = "2024/01/15-10:00:01.000000|cmdUpdateEngInfo|energy: 3.25";
        assert_eq!(LineParser::energy(line).unwrap(), 3.25);
    }

    #[test]
    fn test_energy_uses_last_occurrence() {
        let line = "2024/01/15-10:00:01.000000|cmdUpdateEngInfo|energy: 1.0 energy: 2.0 x";
        assert_eq!(LineParser::energy(line).unwrap(), 2.0);
    }

    #[test]
    fn test_energy_missing_is_error() {
        let line = "2024/01/15-10:00:01.000000|cmdUpdateEngInfo|power: 12.0";
        assert!(matches!(
            LineParser::energy(line),
            Err(EnergyError::EnergyParse(_))
        ));
        let line = "2024/01/15-10:00:01.000000|cmdUpdateEngInfo|energy: n/a";
        assert!(matches!(
            LineParser::energy(line),
            Err(EnergyError::EnergyParse(_))
        ));
    }

    #[test]
    fn test_parse_update_line() {
        let parsed = LineParser::parse(UPDATE).unwrap().unwrap();
        assert_eq!(parsed.command, Command::UpdateEnergyInfo);
        assert_eq!(parsed.energy, Some(42.5));
        assert_eq!(parsed.timestamp.nanosecond(), 500_000_000);
    }

    #[test]
    fn test_parse_other_line_skips_timestamp() {
        assert!(LineParser::parse("garbage without fields").unwrap().is_none());
    }

    #[test]
    fn test_parse_malformed_timestamp_propagates() {
        let line = "15-01-2024 10:00|cmdStartMeasurement";
        assert!(matches!(
            LineParser::parse(line),
            Err(EnergyError::TimestampParse(_))
        ));
    }

    #[test]
    fn test_field_timestamp_requires_separator() {
        assert!(LineParser::field_timestamp("no separator here").is_none());
        let ts = LineParser::field_timestamp(END).unwrap().unwrap();
        assert_eq!(ts.second(), 9);
    }
}
