//! Date cells: Excel serial numbers (1900 or 1904 system) or ISO text.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};

const SECONDS_PER_DAY: f64 = 86_400.0;

fn epoch(serial: f64, date1904: bool) -> Option<NaiveDateTime> {
    let date = if date1904 {
        NaiveDate::from_ymd_opt(1904, 1, 1)
    } else if serial < 61.0 {
        // Serials before the phantom 1900-02-29 count from 1899-12-31.
        NaiveDate::from_ymd_opt(1899, 12, 31)
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)
    };
    date.and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Serial of 9999-12-31, the last date a workbook can hold.
const MAX_SERIAL: f64 = 2_958_465.0;

pub fn from_excel_serial(serial: f64, date1904: bool) -> Option<NaiveDateTime> {
    if !serial.is_finite() || !(0.0..=MAX_SERIAL).contains(&serial) {
        return None;
    }
    let seconds = (serial * SECONDS_PER_DAY).round() as i64;
    epoch(serial, date1904)?.checked_add_signed(Duration::try_seconds(seconds)?)
}

/// Parse a cell's text as a wall-clock date/time.
pub fn parse_date_cell(value: &str, date1904: bool) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(serial) = value.parse::<f64>() {
        return from_excel_serial(serial, date1904);
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Reinterpret a wall-clock value in `offset` without shifting it.
pub fn localize(naive: NaiveDateTime, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    offset.from_local_datetime(&naive).single()
}
