//! Date helpers for building API parameters and query keys.
//!
//! The API only understands calendar dates (`YYYY-MM-DD`). Ranges are computed
//! from an explicit `today` so callers and tests control the clock.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

/// Format the API expects for every date parameter.
pub const API_DATE_FORMAT: &str = "%Y-%m-%d";

/// First published Astronomy Picture of the Day.
pub const FIRST_APOD_DATE: &str = "1995-06-16";

/// An inclusive `[start_date, end_date]` pair in API format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start_date: String,
    pub end_date: String,
}

impl DateRange {
    fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start_date: format_api_date(start),
            end_date: format_api_date(end),
        }
    }
}

pub fn format_api_date(date: NaiveDate) -> String {
    date.format(API_DATE_FORMAT).to_string()
}

/// Parse a caller-supplied date into a calendar date.
///
/// Accepts `YYYY-MM-DD`, RFC 3339 timestamps (converted to UTC first) and
/// naive `YYYY-MM-DDTHH:MM:SS` timestamps.
pub fn parse_date(raw: &str) -> Result<NaiveDate, Error> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation("date must not be empty".into()));
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, API_DATE_FORMAT) {
        return Ok(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc).date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(dt.date());
    }

    Err(Error::Validation(format!("unrecognized date: {trimmed:?}")))
}

/// Normalize any accepted date spelling to `YYYY-MM-DD`.
pub fn normalize_date(raw: &str) -> Result<String, Error> {
    parse_date(raw).map(format_api_date)
}

/// Today's UTC calendar date.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Today in API format.
pub fn today_formatted() -> String {
    format_api_date(today())
}

/// The "current week" feed window: `[today, today + 7]`.
///
/// Anchored on `today`, not on a week boundary, so the window slides forward
/// one day at a time.
pub fn current_week_range(today: NaiveDate) -> DateRange {
    forward_range(today, 0, 7)
}

/// A window starting `days_from_today` after `today` and spanning `range_days`.
pub fn forward_range(today: NaiveDate, days_from_today: i64, range_days: i64) -> DateRange {
    let start = today + Duration::days(days_from_today);
    DateRange::between(start, start + Duration::days(range_days))
}

/// The last `days_back` days up to and including `today`.
pub fn trailing_range(today: NaiveDate, days_back: i64) -> DateRange {
    DateRange::between(today - Duration::days(days_back), today)
}

/// Whether a daily image can exist for `date` (first publication through today).
pub fn is_valid_apod_date(raw: &str, today: NaiveDate) -> bool {
    let Ok(date) = parse_date(raw) else {
        return false;
    };
    let Ok(first) = NaiveDate::parse_from_str(FIRST_APOD_DATE, API_DATE_FORMAT) else {
        return false;
    };
    date >= first && date <= today
}

/// Short display form, e.g. `Mar 1, 2024`. Unparseable input is returned as-is.
pub fn format_short_date(raw: &str) -> String {
    match parse_date(raw) {
        Ok(date) => date.format("%b %-d, %Y").to_string(),
        Err(_) => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn test_normalize_accepts_common_forms() {
        assert_eq!(normalize_date("2024-01-05").unwrap(), "2024-01-05");
        assert_eq!(normalize_date(" 2024-01-05 ").unwrap(), "2024-01-05");
        assert_eq!(normalize_date("2024-01-05T23:30:00Z").unwrap(), "2024-01-05");
        assert_eq!(normalize_date("2024-01-05T23:30:00-05:00").unwrap(), "2024-01-06");
        assert_eq!(normalize_date("2024-01-05T08:00:00").unwrap(), "2024-01-05");
    }

    #[test]
    fn test_normalize_rejects_garbage() {
        assert!(matches!(normalize_date(""), Err(Error::Validation(_))));
        assert!(matches!(normalize_date("next tuesday"), Err(Error::Validation(_))));
        assert!(matches!(normalize_date("2024-13-01"), Err(Error::Validation(_))));
    }

    #[test]
    fn test_current_week_is_today_plus_seven() {
        let range = current_week_range(day(2024, 12, 28));
        assert_eq!(range.start_date, "2024-12-28");
        assert_eq!(range.end_date, "2025-01-04");
    }

    #[test]
    fn test_forward_and_trailing_ranges() {
        let range = forward_range(day(2024, 3, 1), 2, 5);
        assert_eq!(range.start_date, "2024-03-03");
        assert_eq!(range.end_date, "2024-03-08");

        let range = trailing_range(day(2024, 3, 1), 7);
        assert_eq!(range.start_date, "2024-02-23");
        assert_eq!(range.end_date, "2024-03-01");
    }

    #[test]
    fn test_apod_date_bounds() {
        let today = day(2024, 6, 1);
        assert!(is_valid_apod_date(FIRST_APOD_DATE, today));
        assert!(is_valid_apod_date("2024-06-01", today));
        assert!(!is_valid_apod_date("1995-06-15", today));
        assert!(!is_valid_apod_date("2024-06-02", today));
        assert!(!is_valid_apod_date("not a date", today));
    }

    #[test]
    fn test_short_date_format() {
        assert_eq!(format_short_date("2024-03-01"), "Mar 1, 2024");
        assert_eq!(format_short_date("2023-12-25"), "Dec 25, 2023");
        assert_eq!(format_short_date("someday"), "someday");
    }
}
