//! Finds the `Time` header row of every week block worth parsing.
//!
//! A block is only accepted when the row above its header is a week label
//! (`Week ...`) or `EXAM`. Anything else (recess, reading week, ...) is an
//! edge-case block without lesson data: it is skipped and the scan resumes at
//! the next valid label, or stops when there is none.

use crate::grid::Grid;
use crate::timetable::config::TableGeometry;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_info;

pub const TIME_HEADER: &str = "Time";
pub const WEEK_PREFIX: &str = "Week";
pub const EXAM_LABEL: &str = "EXAM";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocatorState {
    SeekingHeader { row: usize },
    ValidatingBlock { header_row: usize },
    Recovering { header_row: usize },
    Done,
}

pub fn is_week_label(label: &str) -> bool {
    label.starts_with(WEEK_PREFIX) || label == EXAM_LABEL
}

fn is_week_label_row(grid: &Grid, row: usize) -> bool {
    grid.label(row).is_some_and(is_week_label)
}

fn is_time_header(grid: &Grid, row: usize) -> bool {
    grid.label(row) == Some(TIME_HEADER)
}

/// The row above the header carries a label that is not a week/exam label.
/// A header on the first row, or below a row without cells, is accepted.
pub fn is_edge_case_block(grid: &Grid, header_row: usize) -> bool {
    if header_row == 0 {
        return false;
    }
    match grid.label(header_row - 1) {
        Some(label) => !is_week_label(label),
        None => false,
    }
}

/// Where to resume after skipping the edge-case block at `header_row`.
pub fn find_next_valid_block(grid: &Grid, header_row: usize) -> Option<usize> {
    (header_row + 1..grid.len()).find(|&row| {
        is_week_label_row(grid, row) || (is_time_header(grid, row) && is_week_label_row(grid, row - 1))
    })
}

/// Advance the locator by one step, yielding an anchor when a block is accepted.
pub fn transition(
    grid: &Grid,
    state: LocatorState,
    geometry: &TableGeometry,
) -> (LocatorState, Option<usize>) {
    match state {
        LocatorState::SeekingHeader { row } if row >= grid.len() => (LocatorState::Done, None),
        LocatorState::SeekingHeader { row } => {
            if is_time_header(grid, row) {
                (LocatorState::ValidatingBlock { header_row: row }, None)
            } else {
                (LocatorState::SeekingHeader { row: row + 1 }, None)
            }
        }
        LocatorState::ValidatingBlock { header_row } => {
            if is_edge_case_block(grid, header_row) {
                (LocatorState::Recovering { header_row }, None)
            } else {
                let resume = header_row + geometry.block_height.max(1);
                (LocatorState::SeekingHeader { row: resume }, Some(header_row))
            }
        }
        LocatorState::Recovering { header_row } => {
            let label = grid.label(header_row.saturating_sub(1)).unwrap_or_default();
            match find_next_valid_block(grid, header_row) {
                Some(row) => {
                    log_info!("skipping '{}' block at row {}, resuming at row {}", label, header_row, row);
                    (LocatorState::SeekingHeader { row }, None)
                }
                None => {
                    log_info!("skipping '{}' block at row {}, no valid blocks follow", label, header_row);
                    (LocatorState::Done, None)
                }
            }
        }
        LocatorState::Done => (LocatorState::Done, None),
    }
}

/// Anchor rows of every accepted week block at or after `start_row`.
pub fn locate_week_blocks(grid: &Grid, start_row: usize, geometry: &TableGeometry) -> Vec<usize> {
    let mut anchors = Vec::new();
    let mut state = LocatorState::SeekingHeader { row: start_row };

    while state != LocatorState::Done {
        let (next, anchor) = transition(grid, state, geometry);
        anchors.extend(anchor);
        state = next;
    }

    anchors
}
