// SPDX-License-Identifier: AGPL-3.0-or-later

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

/// Output format of normalized date values.
const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Formats tried before falling back to the column's display format.
const DATE_TIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Display format tokens and their parser counterpart, longest first.
const TOKENS: [(&str, &str); 17] = [
    ("YYYY", "%Y"),
    ("MMMM", "%B"),
    ("dddd", "%A"),
    ("MMM", "%b"),
    ("ddd", "%a"),
    ("YY", "%y"),
    ("MM", "%m"),
    ("DD", "%d"),
    ("HH", "%H"),
    ("hh", "%I"),
    ("mm", "%M"),
    ("ss", "%S"),
    ("M", "%m"),
    ("D", "%d"),
    ("H", "%H"),
    ("h", "%I"),
    ("A", "%p"),
];

/// Normalizes a date value into an ISO-8601 string.
///
/// The time is fixed at midday unless the display format shows hours, so a date does not move
/// to a neighbouring day when the backend converts it between timezones. Returns `None` for
/// values which can't be parsed.
pub fn normalize_date(value: &str, display_format: Option<&str>) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let (entered, instant) = parse(value, display_format)?;

    let shows_time =
        display_format.map_or(false, |format| format.contains(|c: char| c == 'H' || c == 'h'));
    let normalized = if shows_time {
        instant
    } else {
        // Calendar day as the user entered it, before any offset is applied
        entered.date().and_time(NaiveTime::from_hms_opt(12, 0, 0)?)
    };

    Some(normalized.format(ISO_FORMAT).to_string())
}

/// Returns the value in its own local time next to the same instant in UTC. Both are equal for
/// values without an offset.
fn parse(value: &str, display_format: Option<&str>) -> Option<(NaiveDateTime, NaiveDateTime)> {
    if let Ok(date_time) = DateTime::parse_from_rfc3339(value) {
        return Some((date_time.naive_local(), date_time.naive_utc()));
    }

    parse_naive(value, display_format).map(|date_time| (date_time, date_time))
}

fn parse_naive(value: &str, display_format: Option<&str>) -> Option<NaiveDateTime> {
    for format in DATE_TIME_FORMATS {
        if let Ok(date_time) = NaiveDateTime::parse_from_str(value, format) {
            return Some(date_time);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }

    let format = to_chrono_format(display_format?);

    if let Ok(date_time) = NaiveDateTime::parse_from_str(value, &format) {
        return Some(date_time);
    }

    NaiveDate::parse_from_str(value, &format)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Converts a display format like `DD/MM/YYYY HH:mm` into a chrono format string.
fn to_chrono_format(display_format: &str) -> String {
    let mut format = String::new();
    let mut rest = display_format;

    'outer: while !rest.is_empty() {
        for (token, replacement) in TOKENS {
            if let Some(tail) = rest.strip_prefix(token) {
                format.push_str(replacement);
                rest = tail;
                continue 'outer;
            }
        }

        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            if c == '%' {
                format.push_str("%%");
            } else {
                format.push(c);
            }
        }
        rest = chars.as_str();
    }

    format
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{normalize_date, to_chrono_format};

    #[rstest]
    #[case("2024-01-05", Some("YYYY-MM-DD"), Some("2024-01-05T12:00:00.000Z"))]
    #[case("2024-01-05T23:30:00", None, Some("2024-01-05T12:00:00.000Z"))]
    #[case("05/01/2024", Some("DD/MM/YYYY"), Some("2024-01-05T12:00:00.000Z"))]
    #[case("2024-01-05 08:15", Some("YYYY-MM-DD HH:mm"), Some("2024-01-05T08:15:00.000Z"))]
    #[case("2024-01-05T00:30:00+02:00", Some("YYYY-MM-DD"), Some("2024-01-05T12:00:00.000Z"))]
    #[case("2024-01-05T23:30:00-05:00", None, Some("2024-01-05T12:00:00.000Z"))]
    #[case("2024-01-05T00:30:00+02:00", Some("YYYY-MM-DD HH:mm"), Some("2024-01-04T22:30:00.000Z"))]
    #[case("not a date", Some("YYYY-MM-DD"), None)]
    #[case("  ", None, None)]
    fn normalizes_dates(
        #[case] value: &str,
        #[case] display_format: Option<&str>,
        #[case] expected: Option<&str>,
    ) {
        assert_eq!(
            normalize_date(value, display_format).as_deref(),
            expected
        );
    }

    #[test]
    fn converts_display_formats() {
        assert_eq!(to_chrono_format("DD/MM/YYYY"), "%d/%m/%Y");
        assert_eq!(to_chrono_format("MMM D, YYYY h:mm A"), "%b %d, %Y %I:%M %p");
    }
}
