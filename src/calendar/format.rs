//! RFC 5545 content-line helpers.

use chrono::{DateTime, TimeZone, Utc};

const MAX_LINE_OCTETS: usize = 75;

/// Escape a TEXT property value.
pub fn escape_text(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            ';' => escaped.push_str("\\;"),
            ',' => escaped.push_str("\\,"),
            '\n' => escaped.push_str("\\n"),
            '\r' => {}
            _ => escaped.push(c),
        }
    }
    escaped
}

/// UTC DATE-TIME form, e.g. `20240916T003000Z`.
pub fn format_utc<Tz: TimeZone>(value: &DateTime<Tz>) -> String {
    value.with_timezone(&Utc).format("%Y%m%dT%H%M%SZ").to_string()
}

/// Append `line` folded at 75 octets (never inside a UTF-8 sequence), CRLF terminated.
pub fn push_folded(out: &mut String, line: &str) {
    let mut width = 0;
    for c in line.chars() {
        let len = c.len_utf8();
        if width + len > MAX_LINE_OCTETS {
            out.push_str("\r\n ");
            // The leading space counts towards the continuation line.
            width = 1;
        }
        out.push(c);
        width += len;
    }
    out.push_str("\r\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    #[test]
    fn escapes_special_characters() {
        assert_eq!(escape_text("a;b,c\\d\r\ne"), "a\\;b\\,c\\\\d\\ne");
    }

    #[test]
    fn formats_in_utc() {
        let local = FixedOffset::east_opt(8 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 9, 16, 8, 30, 0)
            .unwrap();
        assert_eq!(format_utc(&local), "20240916T003000Z");
    }

    #[test]
    fn folds_long_lines() {
        let mut out = String::new();
        let line = format!("DESCRIPTION:{}", "x".repeat(100));
        push_folded(&mut out, &line);

        let physical: Vec<&str> = out.trim_end_matches("\r\n").split("\r\n").collect();
        assert_eq!(physical.len(), 2);
        assert_eq!(physical[0].len(), 75);
        assert!(physical[1].starts_with(' '));
        assert_eq!(physical.concat().replace(' ', ""), line);
    }

    #[test]
    fn folding_respects_char_boundaries() {
        let mut out = String::new();
        push_folded(&mut out, &"é".repeat(60));
        for physical in out.split("\r\n") {
            assert!(physical.len() <= 75);
        }
    }
}
