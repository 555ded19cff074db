use anyhow::{ensure, Result};
use chrono::{Duration, FixedOffset, NaiveTime, Offset, Utc};
use serde::{Deserialize, Serialize};

/// Bounds for hand-edited geometry; anything past these is a typo.
const MAX_BLOCK_HEIGHT: usize = 1_048_576;
const MAX_COLUMN_SPAN: usize = 16_384;
const MAX_SLOT_MINUTES: i64 = 24 * 60;
const MAX_WEEK_LENGTH_DAYS: i64 = 366;

/// Shape of the timetable layout convention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableGeometry {
    /// Rows occupied by one week block, starting at its `Time` header.
    pub block_height: usize,

    /// Offset from the `Time` header to the first 30-minute slot row
    pub first_slot_offset: usize,

    /// Day columns: first index, stride between days, number of days
    pub first_day_column: usize,
    pub day_column_stride: usize,
    pub day_count: usize,

    /// Wall-clock time of the first slot
    pub day_start: NaiveTime,
    pub slot_minutes: i64,

    pub utc_offset_minutes: i32,

    /// Distance from a week's start date to its end date
    pub week_length_days: i64,
}

impl Default for TableGeometry {
    fn default() -> Self {
        Self {
            block_height: 21,
            first_slot_offset: 2,
            first_day_column: 1,
            day_column_stride: 2,
            day_count: 5,
            day_start: NaiveTime::from_hms_opt(8, 30, 0).unwrap_or(NaiveTime::MIN),
            slot_minutes: 30,
            utc_offset_minutes: 8 * 60,
            week_length_days: 5,
        }
    }
}

impl TableGeometry {
    /// Reject geometry that would make block or slot arithmetic meaningless.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            (1..=MAX_BLOCK_HEIGHT).contains(&self.block_height),
            "block_height must be between 1 and {MAX_BLOCK_HEIGHT}, got {}",
            self.block_height
        );
        ensure!(
            self.first_slot_offset < self.block_height,
            "first_slot_offset ({}) must lie inside the block (block_height {})",
            self.first_slot_offset,
            self.block_height
        );
        let last_day_column = self
            .day_count
            .saturating_sub(1)
            .checked_mul(self.day_column_stride)
            .and_then(|span| span.checked_add(self.first_day_column));
        ensure!(
            last_day_column.is_some_and(|column| column < MAX_COLUMN_SPAN),
            "day columns ({} days from column {}, stride {}) run past the last sheet column",
            self.day_count,
            self.first_day_column,
            self.day_column_stride
        );
        ensure!(
            (1..=MAX_SLOT_MINUTES).contains(&self.slot_minutes),
            "slot_minutes must be between 1 and {MAX_SLOT_MINUTES}, got {}",
            self.slot_minutes
        );
        ensure!(
            FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60)).is_some(),
            "utc_offset_minutes must be less than a day, got {}",
            self.utc_offset_minutes
        );
        ensure!(
            (0..=MAX_WEEK_LENGTH_DAYS).contains(&self.week_length_days),
            "week_length_days must be between 0 and {MAX_WEEK_LENGTH_DAYS}, got {}",
            self.week_length_days
        );
        Ok(())
    }

    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
    }

    pub fn slot(&self) -> Duration {
        Duration::minutes(self.slot_minutes)
    }

    /// Column indices of the weekday groups, Monday first.
    pub fn day_columns(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.day_count).map(move |day| self.first_day_column + day * self.day_column_stride)
    }

    /// Last row (inclusive) of the block anchored at `anchor`.
    pub fn block_end(&self, anchor: usize) -> usize {
        anchor + self.block_height.saturating_sub(1)
    }
}
