//! Energy aggregation over matched block ranges.

use energy_core::models::{Block, ScanEnergy, ScanWindow};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::matcher::find_window;

/// Sum `total_energy` over the inclusive range `[start_idx, end_idx]`.
///
/// `end_idx` is clamped to the last block; an empty or inverted range sums
/// to zero.
pub fn aggregate_energy(blocks: &[Block], start_idx: usize, end_idx: usize) -> f64 {
    let Some(last) = blocks.len().checked_sub(1) else {
        return 0.0;
    };
    let end = end_idx.min(last);
    if start_idx > end {
        return 0.0;
    }
    blocks[start_idx..=end].iter().map(|b| b.total_energy).sum()
}

/// Match every window against `blocks` and sum the energy of its range.
///
/// Unmatched windows are kept with no energy.
pub fn attribute_energy(
    blocks: &[Block],
    windows: &[ScanWindow],
    tolerance_minutes: f64,
) -> Vec<ScanEnergy> {
    windows
        .iter()
        .map(|window| {
            let range = find_window(blocks, window, tolerance_minutes);
            let energy = range.map(|(s, e)| aggregate_energy(blocks, s, e));
            match range {
                Some((s, e)) => debug!(
                    protocol = %window.protocol,
                    start_idx = s,
                    end_idx = e,
                    energy = energy.unwrap_or_default(),
                    "scan window matched"
                ),
                None => warn!(
                    protocol = %window.protocol,
                    start = %window.start_time,
                    end = %window.end_time,
                    "no blocks match scan window"
                ),
            }
            ScanEnergy {
                date_id: window.date_id,
                protocol: window.protocol.clone(),
                start_time: window.start_time,
                end_time: window.end_time,
                start_idx: range.map(|(s, _)| s),
                end_idx: range.map(|(_, e)| e),
                energy,
            }
        })
        .collect()
}

// ── BlockTotals ───────────────────────────────────────────────────────────────

/// Totals accumulated across a block sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockTotals {
    pub blocks: usize,
    pub complete: usize,
    pub incomplete: usize,
    pub total_energy: f64,
    /// Sum of the durations of complete blocks, in seconds.
    pub measured_seconds: f64,
}

impl BlockTotals {
    pub fn add_block(&mut self, block: &Block) {
        self.blocks += 1;
        self.total_energy += block.total_energy;
        match block.duration {
            Some(d) => {
                self.complete += 1;
                self.measured_seconds += d;
            }
            None => self.incomplete += 1,
        }
    }

    pub fn from_blocks(blocks: &[Block]) -> Self {
        let mut totals = Self::default();
        for block in blocks {
            totals.add_block(block);
        }
        totals
    }
}
