//! Interpreter for colour-coded weekly timetable sheets.
//!
//! The sheet holds a module table (`CODE` header, one module per row, blank
//! row terminator) followed by fixed-height week blocks. Each block starts at
//! a `Time` header whose row carries the dates of the five weekday columns;
//! lessons are runs of identically filled cells in a day column.

pub mod builder;
pub mod config;
pub mod dates;
pub mod locator;
pub mod merge;
pub mod modules;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::grid::Grid;
use crate::models::{Module, WeekTimetable};

pub use builder::build_week_timetables;
pub use config::TableGeometry;
pub use modules::parse_modules;

pub const DEFAULT_DISPLAY_NAME: &str = "Timetable";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Timetable {
    pub name: String,
    pub modules: BTreeMap<String, Module>,
    pub weeks: Vec<WeekTimetable>,
}

impl Timetable {
    pub fn module(&self, code: &str) -> Option<&Module> {
        self.modules.get(code)
    }

    pub fn lesson_count(&self) -> usize {
        self.weeks.iter().map(WeekTimetable::lesson_count).sum()
    }

    pub fn degraded_weeks(&self) -> usize {
        self.weeks.iter().filter(|week| week.status.is_degraded()).count()
    }
}

/// Title fragments from the first cells of rows 0 and 1, joined by ` - `.
pub fn display_name(grid: &Grid) -> String {
    let fragment = |row: usize| grid.label(row).unwrap_or_default();
    let name = format!("{} - {}", fragment(0), fragment(1));
    if name == " - " {
        DEFAULT_DISPLAY_NAME.to_string()
    } else {
        name
    }
}

pub fn parse_timetable(grid: &Grid, geometry: &TableGeometry) -> Timetable {
    parse_timetable_at(grid, geometry, Utc::now())
}

/// Like [`parse_timetable`], with the fallback date for degraded weeks supplied.
pub fn parse_timetable_at(grid: &Grid, geometry: &TableGeometry, now: DateTime<Utc>) -> Timetable {
    let table = parse_modules(grid);
    let weeks = build_week_timetables(grid, table.next_row, geometry, now);

    Timetable {
        name: display_name(grid),
        modules: table.modules,
        weeks,
    }
}
