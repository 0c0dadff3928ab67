//! Block reconstruction over a sequence of rotated log segments.

use chrono::NaiveDateTime;
use energy_core::data_processors::LineParser;
use energy_core::models::{Block, LogSegment};
use energy_core::{EnergyError, Result};
use tracing::{debug, warn};

use crate::builder::BlockBuilder;
use crate::continuity::{ContinuityResolver, Resolution};

/// Reconstruct the blocks of every segment, in file order.
///
/// Each segment is built on its own; a block left open at the end of a
/// segment is handed to the [`ContinuityResolver`] together with the
/// segment's neighbours. Blocks that stay open are kept.
pub fn reconstruct(segments: &[LogSegment]) -> Result<Vec<Block>> {
    check_file_order(segments)?;

    let mut blocks = Vec::new();
    for index in 0..segments.len() {
        blocks.extend(reconstruct_at(segments, index)?);
    }

    debug!(
        files = segments.len(),
        blocks = blocks.len(),
        "reconstruction finished"
    );
    Ok(blocks)
}

/// Reconstruct the blocks begun in `segments[index]` only.
///
/// The other segments are consulted purely as neighbours.
pub fn reconstruct_segment(segments: &[LogSegment], index: usize) -> Result<Vec<Block>> {
    check_file_order(segments)?;
    reconstruct_at(segments, index)
}

fn reconstruct_at(segments: &[LogSegment], index: usize) -> Result<Vec<Block>> {
    let Some(segment) = segments.get(index) else {
        return Ok(Vec::new());
    };

    let output = BlockBuilder::build(&segment.lines)?;
    let mut blocks = output.blocks;

    if let Some(mut trailing) = output.trailing {
        let resolution = ContinuityResolver::new(segments).resolve(&mut trailing, index)?;
        if resolution == Resolution::Unresolved {
            debug!(file = %segment.name, start = %trailing.start_time, "keeping incomplete block");
        }
        blocks.push(trailing);
    }

    Ok(blocks)
}

/// Segments must be sorted by file name, which stands in for chronological
/// order. A disagreement between the two orders is only logged.
pub fn check_file_order(segments: &[LogSegment]) -> Result<()> {
    for pair in segments.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if a.name > b.name {
            return Err(EnergyError::FileOrder {
                previous: a.name.clone(),
                next: b.name.clone(),
            });
        }
    }

    let firsts: Vec<_> = segments
        .iter()
        .map(|s| (s.name.as_str(), first_timestamp(s)))
        .filter_map(|(name, ts)| ts.map(|t| (name, t)))
        .collect();
    for pair in firsts.windows(2) {
        let ((name_a, ts_a), (name_b, ts_b)) = (pair[0], pair[1]);
        if ts_a > ts_b {
            warn!(
                earlier = name_a,
                later = name_b,
                "file-name order disagrees with timestamp order"
            );
        }
    }
    Ok(())
}

/// First parsable timestamp of a segment; unparsable lines are skipped here
/// since this is only a sanity check.
fn first_timestamp(segment: &LogSegment) -> Option<NaiveDateTime> {
    segment
        .lines
        .iter()
        .filter_map(|line| LineParser::field_timestamp(line))
        .find_map(|ts| ts.ok())
}
