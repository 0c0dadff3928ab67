//! Completion of blocks split across a log rotation.
//!
//! When a file ends with a block still open, the measurement session may have
//! carried on in a neighbouring file. Two files count as contiguous when the
//! current file's last timestamp and the neighbour's second timestamp are at
//! most [`ADJACENCY_TOLERANCE_SECS`] apart. The first line of a file is skipped
//! for that test because it is often cut short at the rotation boundary.
//!
//! The next file is always tried first. The previous file is only consulted
//! when the next one is missing, not contiguous, or has no end line.

use chrono::NaiveDateTime;
use energy_core::data_processors::LineParser;
use energy_core::models::{Block, Command, LogSegment};
use energy_core::time_utils::within_seconds;
use energy_core::Result;
use tracing::debug;

/// Maximum gap, in seconds, between two files of one session.
pub const ADJACENCY_TOLERANCE_SECS: f64 = 2.0;

/// Which neighbour supplied a block's end line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    NextFile,
    PreviousFile,
    Unresolved,
}

/// Resolves trailing blocks against the segments around them.
pub struct ContinuityResolver<'a> {
    segments: &'a [LogSegment],
}

impl<'a> ContinuityResolver<'a> {
    /// `segments` must be in file-name order.
    pub fn new(segments: &'a [LogSegment]) -> Self {
        Self { segments }
    }

    /// Try to complete `block`, which was left open at the end of
    /// `segments[index]`.
    ///
    /// An unresolved block is returned unchanged apart from any energy the
    /// scanned neighbour contributed before its data ran out.
    pub fn resolve(&self, block: &mut Block, index: usize) -> Result<Resolution> {
        let Some(current) = self.segments.get(index) else {
            return Ok(Resolution::Unresolved);
        };
        let next = self.segments.get(index + 1);
        let previous = index.checked_sub(1).and_then(|i| self.segments.get(i));
        if next.is_none() && previous.is_none() {
            debug!(file = %current.name, "no neighbouring file for open block");
            return Ok(Resolution::Unresolved);
        }

        let Some(current_last) = last_timestamp(current)? else {
            debug!(file = %current.name, "file has no timestamped lines");
            return Ok(Resolution::Unresolved);
        };

        if let Some(next) = next {
            if self.is_adjacent(current_last, next)? {
                continue_from(block, next)?;
                if block.is_complete() {
                    debug!(from = %current.name, to = %next.name, "block completed from next file");
                    return Ok(Resolution::NextFile);
                }
            }
        }

        if let Some(previous) = previous {
            if self.is_adjacent(current_last, previous)? {
                continue_from(block, previous)?;
                if block.is_complete() {
                    debug!(from = %current.name, to = %previous.name, "block completed from previous file");
                    return Ok(Resolution::PreviousFile);
                }
            }
        }

        debug!(file = %current.name, start = %block.start_time, "block left without end time");
        Ok(Resolution::Unresolved)
    }

    /// The adjacency test against `candidate`.
    pub fn is_adjacent(&self, current_last: NaiveDateTime, candidate: &LogSegment) -> Result<bool> {
        Ok(match second_timestamp(candidate)? {
            Some(second) => within_seconds(current_last, second, ADJACENCY_TOLERANCE_SECS),
            None => false,
        })
    }
}

/// Timestamp of the last line carrying fields.
pub fn last_timestamp(segment: &LogSegment) -> Result<Option<NaiveDateTime>> {
    segment
        .lines
        .iter()
        .rev()
        .find_map(|line| LineParser::field_timestamp(line))
        .transpose()
}

/// Timestamp of the first line carrying fields after the file's first line.
pub fn second_timestamp(segment: &LogSegment) -> Result<Option<NaiveDateTime>> {
    segment
        .lines
        .iter()
        .skip(1)
        .find_map(|line| LineParser::field_timestamp(line))
        .transpose()
}

/// Scan `candidate` from its top, adding every energy sample to `block` until
/// the first end line, which closes it. Start lines are not block boundaries
/// here.
fn continue_from(block: &mut Block, candidate: &LogSegment) -> Result<()> {
    for line in &candidate.lines {
        match LineParser::classify(line) {
            Command::UpdateEnergyInfo => {
                LineParser::timestamp(line)?;
                block.add_energy(LineParser::energy(line)?);
            }
            Command::EndMeasurement => {
                block.close(LineParser::timestamp(line)?);
                return Ok(());
            }
            Command::StartMeasurement | Command::Other => {}
        }
    }
    Ok(())
}
