use std::io::Cursor;
use std::path::Path;

use anyhow::Result;
use chrono::Utc;
use log::{info, warn};

use crate::calendar::render_calendar;
use crate::grid::{read_workbook, read_workbook_from_reader, Grid};
use crate::settings::Settings;
use crate::timetable::{parse_timetable, Timetable};

#[derive(Debug, Clone)]
pub struct ConvertedCalendar {
    pub name: String,
    pub ics: String,
    pub weeks: usize,
    pub degraded_weeks: usize,
    pub lessons: usize,
}

impl ConvertedCalendar {
    /// `<display name>.ics`, with path separators replaced.
    pub fn file_name(&self) -> String {
        format!("{}.ics", self.name.replace(['/', '\\'], "-"))
    }
}

fn interpret(grid: &Grid, settings: &Settings) -> Timetable {
    let timetable = parse_timetable(grid, &settings.geometry);

    info!(
        "parsed '{}': {} modules, {} weeks, {} lessons",
        timetable.name,
        timetable.modules.len(),
        timetable.weeks.len(),
        timetable.lesson_count()
    );
    if timetable.degraded_weeks() > 0 {
        warn!(
            "'{}': {} week blocks had no usable start date",
            timetable.name,
            timetable.degraded_weeks()
        );
    }

    timetable
}

/// Read and interpret a workbook; only an unreadable file is an error.
pub fn load_timetable(path: &Path, settings: &Settings) -> Result<Timetable> {
    let grid = read_workbook(path)?;
    Ok(interpret(&grid, settings))
}

pub fn render(timetable: Timetable, settings: &Settings) -> ConvertedCalendar {
    let ics = render_calendar(&timetable, &settings.calendar_options(), Utc::now());

    ConvertedCalendar {
        weeks: timetable.weeks.len(),
        degraded_weeks: timetable.degraded_weeks(),
        lessons: timetable.lesson_count(),
        name: timetable.name,
        ics,
    }
}

pub fn convert_workbook(path: &Path, settings: &Settings) -> Result<ConvertedCalendar> {
    Ok(render(load_timetable(path, settings)?, settings))
}

/// Same as [`convert_workbook`] for an upload already held in memory.
pub fn convert_workbook_bytes(bytes: Vec<u8>, settings: &Settings) -> Result<ConvertedCalendar> {
    let grid = read_workbook_from_reader(Cursor::new(bytes))?;
    Ok(render(interpret(&grid, settings), settings))
}
