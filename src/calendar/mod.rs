//! Serialises a parsed [`Timetable`] into an iCalendar document.

pub mod format;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::Lesson;
use crate::timetable::Timetable;

use self::format::{escape_text, format_utc, push_folded};

pub const PRODUCT_ID: &str = "-//timetable-ics//Timetable Converter//EN";

#[derive(Debug, Clone, Default)]
pub struct CalendarOptions {
    /// Organizer address, written as a `mailto:` URI when set.
    pub organizer: Option<String>,
    /// Right-hand side of every generated UID.
    pub uid_domain: String,
}

fn summary(timetable: &Timetable, lesson: &Lesson) -> String {
    timetable
        .module(&lesson.module)
        .map(|module| module.summary())
        .unwrap_or_else(|| lesson.module.clone())
}

fn organizer_uri(organizer: &str) -> String {
    if organizer.to_ascii_lowercase().starts_with("mailto:") {
        organizer.to_string()
    } else {
        format!("mailto:{organizer}")
    }
}

fn push_event(
    out: &mut String,
    timetable: &Timetable,
    lesson: &Lesson,
    options: &CalendarOptions,
    stamp: &str,
) {
    push_folded(out, "BEGIN:VEVENT");
    push_folded(out, &format!("UID:{}@{}", Uuid::new_v4(), options.uid_domain));
    push_folded(out, &format!("CREATED:{stamp}"));
    push_folded(out, &format!("DTSTAMP:{stamp}"));
    push_folded(out, &format!("LAST-MODIFIED:{stamp}"));
    push_folded(out, &format!("DTSTART:{}", format_utc(&lesson.start_time)));
    push_folded(out, &format!("DTEND:{}", format_utc(&lesson.end_time)));
    push_folded(out, &format!("SUMMARY:{}", escape_text(&summary(timetable, lesson))));
    if !lesson.location.is_empty() {
        push_folded(out, &format!("LOCATION:{}", escape_text(&lesson.location)));
    }
    push_folded(out, &format!("DESCRIPTION:{}", escape_text(&lesson.description)));
    if let Some(organizer) = options.organizer.as_deref().filter(|o| !o.is_empty()) {
        push_folded(out, &format!("ORGANIZER:{}", organizer_uri(organizer)));
    }
    push_folded(out, "END:VEVENT");
}

/// One `VEVENT` per lesson, each with a fresh UID and `now` as its timestamps.
pub fn render_calendar(timetable: &Timetable, options: &CalendarOptions, now: DateTime<Utc>) -> String {
    let stamp = format_utc(&now);
    let mut out = String::new();

    push_folded(&mut out, "BEGIN:VCALENDAR");
    push_folded(&mut out, "VERSION:2.0");
    push_folded(&mut out, &format!("PRODID:{PRODUCT_ID}"));
    push_folded(&mut out, "METHOD:REQUEST");
    push_folded(&mut out, &format!("X-WR-CALNAME:{}", escape_text(&timetable.name)));

    for lesson in timetable.weeks.iter().flat_map(|week| week.iter_lessons()) {
        push_event(&mut out, timetable, lesson, options, &stamp);
    }

    push_folded(&mut out, "END:VCALENDAR");
    out
}
