use chrono::{DateTime, Duration, FixedOffset, Utc};

use crate::grid::Grid;
use crate::models::{Lesson, WeekStatus, WeekTimetable};
use crate::timetable::config::TableGeometry;
use crate::timetable::dates::{localize, parse_date_cell};
use crate::timetable::locator::locate_week_blocks;
use crate::timetable::merge::merge_lesson_run;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

enum StartDate {
    Resolved(DateTime<FixedOffset>),
    Degraded(WeekStatus),
}

fn resolve_start_date(grid: &Grid, anchor: usize, geometry: &TableGeometry) -> StartDate {
    let Some(cell) = grid.cell(anchor, geometry.first_day_column) else {
        return StartDate::Degraded(WeekStatus::MissingDate);
    };
    parse_date_cell(&cell.value, grid.date1904())
        .and_then(|naive| localize(naive, geometry.offset()))
        .map(StartDate::Resolved)
        .unwrap_or_else(|| {
            StartDate::Degraded(WeekStatus::UnparseableDate {
                raw: cell.value.clone(),
            })
        })
}

/// First slot of the day whose date sits in the anchor row at `column`.
pub fn day_start(
    grid: &Grid,
    anchor: usize,
    column: usize,
    geometry: &TableGeometry,
) -> Option<DateTime<FixedOffset>> {
    let cell = grid.cell(anchor, column)?;
    let naive = parse_date_cell(&cell.value, grid.date1904())?;
    localize(naive.date().and_time(geometry.day_start), geometry.offset())
}

/// Lessons of one day column, top to bottom.
pub fn build_day(
    grid: &Grid,
    anchor: usize,
    column: usize,
    day_start: DateTime<FixedOffset>,
    geometry: &TableGeometry,
) -> Vec<Lesson> {
    let mut lessons = Vec::new();
    let mut row = anchor + geometry.first_slot_offset;
    let block_end = geometry.block_end(anchor);

    while row <= block_end {
        // Unfilled and out-of-range cells merge to nothing.
        match merge_lesson_run(grid, anchor, row, column, day_start, geometry) {
            Some(run) => {
                row = run.last_row + 1;
                lessons.push(run.lesson);
            }
            None => row += 1,
        }
    }

    lessons
}

/// Build the week anchored at `anchor`. A week whose start date cannot be
/// read degrades to an empty placeholder dated `now`, tagged in `status`.
pub fn build_week(grid: &Grid, anchor: usize, geometry: &TableGeometry, now: DateTime<Utc>) -> WeekTimetable {
    let week_length = Duration::days(geometry.week_length_days);

    let start_date = match resolve_start_date(grid, anchor, geometry) {
        StartDate::Resolved(start_date) => start_date,
        StartDate::Degraded(status) => {
            log_warn!("week block at row {} has no usable start date: {:?}", anchor, status);
            let fallback = now.with_timezone(&geometry.offset());
            return WeekTimetable {
                start_date: fallback,
                end_date: fallback + week_length,
                lessons: vec![Vec::new(); geometry.day_count],
                status,
            };
        }
    };

    let lessons = geometry
        .day_columns()
        .map(|column| match day_start(grid, anchor, column, geometry) {
            Some(start) => build_day(grid, anchor, column, start, geometry),
            None => {
                log_warn!("week block at row {}: day column {} has no readable date", anchor, column);
                Vec::new()
            }
        })
        .collect();

    WeekTimetable {
        start_date,
        end_date: start_date + week_length,
        lessons,
        status: WeekStatus::Parsed,
    }
}

/// Every accepted week block from `start_row` on, in sheet order.
pub fn build_week_timetables(
    grid: &Grid,
    start_row: usize,
    geometry: &TableGeometry,
    now: DateTime<Utc>,
) -> Vec<WeekTimetable> {
    let anchors = locate_week_blocks(grid, start_row, geometry);
    log_info!("found {} week blocks from row {}", anchors.len(), start_row);

    anchors
        .into_iter()
        .map(|anchor| build_week(grid, anchor, geometry, now))
        .collect()
}
