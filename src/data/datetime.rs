use chrono::{NaiveDate, NaiveDateTime};

/// Date and date-time layouts accepted in sample sheets, tried in order.
pub const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%m-%d-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%m/%d/%Y %H:%M",
    "%d/%m/%Y %H:%M",
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%Y/%m/%d",
    "%m-%d-%Y",
    "%d-%m-%Y",
];

/// Parse a sheet value to the calendar day it falls on.
///
/// RFC 3339 timestamps (`2025-03-01T10:22:05Z`) are tried first and reduced
/// to their own offset's day; then each of [`DATE_FORMATS`].
pub fn parse_calendar_day(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }

    DATE_FORMATS.iter().find_map(|fmt| {
        NaiveDateTime::parse_from_str(value, fmt)
            .map(|dt| dt.date())
            .or_else(|_| NaiveDate::parse_from_str(value, fmt))
            .ok()
    })
}

/// ISO calendar-day string (`YYYY-MM-DD`).
pub fn iso_day(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_common_layouts() {
        assert_eq!(parse_calendar_day("2025-03-14"), Some(day(2025, 3, 14)));
        assert_eq!(parse_calendar_day("2025-03-14 09:15:00"), Some(day(2025, 3, 14)));
        assert_eq!(parse_calendar_day("2025-03-14T23:59:59.5"), Some(day(2025, 3, 14)));
        assert_eq!(parse_calendar_day("2025-03-14T09:15:00Z"), Some(day(2025, 3, 14)));
        assert_eq!(parse_calendar_day(" 25/03/2025 "), Some(day(2025, 3, 25)));
    }

    #[test]
    fn month_first_wins_when_ambiguous() {
        assert_eq!(parse_calendar_day("03/04/2025"), Some(day(2025, 3, 4)));
    }

    #[test]
    fn rejects_non_dates() {
        assert_eq!(parse_calendar_day(""), None);
        assert_eq!(parse_calendar_day("station A"), None);
        assert_eq!(parse_calendar_day("2025-13-01"), None);
    }

    #[test]
    fn iso_day_is_zero_padded() {
        assert_eq!(iso_day(day(2025, 3, 4)), "2025-03-04");
    }
}
