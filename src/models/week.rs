use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::Lesson;

/// How a week block's start date was resolved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum WeekStatus {
    Parsed,
    /// The anchor row has no date cell; the week is an empty placeholder.
    MissingDate,
    /// The date cell holds something that is not a date.
    UnparseableDate { raw: String },
}

impl WeekStatus {
    pub fn is_degraded(&self) -> bool {
        !matches!(self, WeekStatus::Parsed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WeekTimetable {
    pub start_date: DateTime<FixedOffset>,
    pub end_date: DateTime<FixedOffset>,
    /// One sequence per weekday, Monday first, each ordered by start time.
    pub lessons: Vec<Vec<Lesson>>,
    pub status: WeekStatus,
}

impl WeekTimetable {
    pub fn lesson_count(&self) -> usize {
        self.lessons.iter().map(Vec::len).sum()
    }

    pub fn iter_lessons(&self) -> impl Iterator<Item = &Lesson> {
        self.lessons.iter().flatten()
    }
}
