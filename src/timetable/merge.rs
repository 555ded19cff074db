use chrono::{DateTime, FixedOffset};

use crate::grid::Grid;
use crate::models::Lesson;
use crate::timetable::config::TableGeometry;

/// A lesson and the last row of the colour run it was merged from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonRun {
    pub lesson: Lesson,
    pub last_row: usize,
}

/// Module codes occasionally contain stray spaces (`CS 101`).
pub fn normalize_code(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Last row of the unbroken run of `start_row`'s fill colour, bounded by the block.
pub fn run_end(grid: &Grid, anchor: usize, start_row: usize, column: usize, geometry: &TableGeometry) -> usize {
    let color = grid.fill_color(start_row, column);
    let block_end = geometry.block_end(anchor);
    let mut last = start_row;
    while last < block_end && grid.fill_color(last + 1, column) == color {
        last += 1;
    }
    last
}

/// Merge the colour run starting at `start_row` of a day column into one lesson.
///
/// `day_start` is the day's first slot (08:30 on the column's date). Returns
/// `None` when the start cell is outside the grid or the block, or unfilled.
pub fn merge_lesson_run(
    grid: &Grid,
    anchor: usize,
    start_row: usize,
    column: usize,
    day_start: DateTime<FixedOffset>,
    geometry: &TableGeometry,
) -> Option<LessonRun> {
    let cell = grid.cell(start_row, column).filter(|cell| cell.is_filled())?;
    let slot_index = start_row.checked_sub(anchor + geometry.first_slot_offset)?;
    if start_row > geometry.block_end(anchor) {
        return None;
    }

    let last_row = run_end(grid, anchor, start_row, column, geometry);
    let slots = (last_row - start_row + 1) as i32;
    let start_time = day_start + geometry.slot() * slot_index as i32;
    let end_time = start_time + geometry.slot() * slots;

    let text_below = |column: usize| {
        grid.cell(start_row + 1, column)
            .map(|cell| cell.value.clone())
            .unwrap_or_default()
    };

    Some(LessonRun {
        lesson: Lesson {
            module: normalize_code(&cell.value),
            description: text_below(column),
            start_time,
            end_time,
            location: text_below(column + 1),
        },
        last_row,
    })
}
