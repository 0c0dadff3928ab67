//! Alignment of reconstructed blocks with scan windows.

use chrono::NaiveTime;
use energy_core::models::{Block, ScanWindow};
use energy_core::time_utils::time_of_day_diff_minutes;

/// Find the blocks covering `window`.
///
/// See [`find_range`].
pub fn find_window(
    blocks: &[Block],
    window: &ScanWindow,
    tolerance_minutes: f64,
) -> Option<(usize, usize)> {
    find_range(blocks, window.start_time, window.end_time, tolerance_minutes)
}

/// Find `(start_idx, end_idx)` such that block `start_idx` starts within
/// `tolerance_minutes` of `start` and block `end_idx` ends within the same
/// tolerance of `end`.
///
/// The first start match wins; the end is the first match after it, so a
/// window always spans at least two blocks. Only times of day are compared.
/// Blocks without an end time never match an end. Returns `None` when either
/// side has no match.
pub fn find_range(
    blocks: &[Block],
    start: NaiveTime,
    end: NaiveTime,
    tolerance_minutes: f64,
) -> Option<(usize, usize)> {
    let start_idx = blocks
        .iter()
        .position(|b| within_minutes(b.start_time.time(), start, tolerance_minutes))?;

    let first_end = start_idx + 1;
    let end_offset = blocks[first_end..].iter().position(|b| {
        b.end_time
            .is_some_and(|e| within_minutes(e.time(), end, tolerance_minutes))
    })?;

    Some((start_idx, first_end + end_offset))
}

fn within_minutes(actual: NaiveTime, target: NaiveTime, tolerance_minutes: f64) -> bool {
    time_of_day_diff_minutes(actual, target).abs() < tolerance_minutes
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn block(start: NaiveDateTime, end: Option<NaiveDateTime>, energy: f64) -> Block {
        let mut b = Block::open(start);
        b.add_energy(energy);
        if let Some(e) = end {
            b.close(e);
        }
        b
    }

    fn tod(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    /// Blocks spanning minutes 0–10, 10–20 and 20–30 after 09:00.
    fn three_blocks() -> Vec<Block> {
        vec![
            block(at(15, 9, 0), Some(at(15, 9, 10)), 5.0),
            block(at(15, 9, 10), Some(at(15, 9, 20)), 7.0),
            block(at(15, 9, 20), Some(at(15, 9, 30)), 3.0),
        ]
    }

    #[test]
    fn test_exact_match_over_two_blocks() {
        let blocks = three_blocks();
        let range = find_range(&blocks, tod(9, 10), tod(9, 30), 1.0);
        assert_eq!(range, Some((1, 2)));
    }

    #[test]
    fn test_match_within_tolerance() {
        let blocks = three_blocks();
        let window = ScanWindow {
            start_time: NaiveTime::from_hms_opt(9, 10, 40).unwrap(),
            end_time: NaiveTime::from_hms_opt(9, 29, 30).unwrap(),
            protocol: "dwi".to_string(),
            date_id: 1,
        };
        assert_eq!(find_window(&blocks, &window, 1.0), Some((1, 2)));
    }

    #[test]
    fn test_start_block_never_matches_the_end() {
        let blocks = three_blocks();
        assert_eq!(find_range(&blocks, tod(9, 0), tod(9, 10), 1.0), None);
        // A window starting at the last block has nothing after it.
        assert_eq!(find_range(&blocks, tod(9, 20), tod(9, 30), 1.0), None);
    }

    #[test]
    fn test_short_adjacent_blocks_span_the_window() {
        // Both block ends fall within 5 minutes of 10:04.
        let blocks = vec![
            block(at(15, 10, 0), Some(at(15, 10, 2)), 4.0),
            block(at(15, 10, 2), Some(at(15, 10, 4)), 6.0),
        ];
        assert_eq!(find_range(&blocks, tod(10, 0), tod(10, 4), 5.0), Some((0, 1)));
    }

    #[test]
    fn test_no_start_match() {
        let blocks = three_blocks();
        assert_eq!(find_range(&blocks, tod(11, 0), tod(9, 30), 1.0), None);
    }

    #[test]
    fn test_no_end_match_after_start() {
        let blocks = three_blocks();
        // End of block 0 matches, but only blocks after index 2 are eligible.
        assert_eq!(find_range(&blocks, tod(9, 20), tod(9, 10), 1.0), None);
    }

    #[test]
    fn test_tolerance_is_strict() {
        let blocks = three_blocks();
        assert_eq!(find_range(&blocks, tod(9, 11), tod(9, 30), 1.0), None);
    }

    #[test]
    fn test_first_start_match_wins() {
        let blocks = three_blocks();
        // Blocks 0 and 1 both start within 6 minutes of 09:05.
        assert_eq!(find_range(&blocks, tod(9, 5), tod(9, 20), 6.0), Some((0, 1)));
    }

    #[test]
    fn test_open_blocks_never_match_an_end() {
        let blocks = vec![
            block(at(15, 9, 0), None, 1.0),
            block(at(15, 9, 5), Some(at(15, 9, 30)), 2.0),
        ];
        assert_eq!(find_range(&blocks, tod(9, 0), tod(9, 0), 1.0), None);
        assert_eq!(find_range(&blocks, tod(9, 0), tod(9, 30), 1.0), Some((0, 1)));
    }

    #[test]
    fn test_date_is_ignored() {
        let blocks = vec![
            block(at(3, 9, 0), Some(at(3, 9, 5)), 1.0),
            block(at(3, 9, 5), Some(at(3, 9, 10)), 1.0),
        ];
        assert_eq!(find_range(&blocks, tod(9, 0), tod(9, 10), 1.0), Some((0, 1)));
    }

    #[test]
    fn test_empty_blocks() {
        assert_eq!(find_range(&[], tod(9, 0), tod(9, 10), 1.0), None);
    }
}
