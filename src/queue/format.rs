//! Date parsing and formatting used when projecting queue records.
//!
//! Both functions are pure. Formatting is done in the offset the timestamp
//! was written with, so the calendar date the server recorded is the one shown.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};

const DATE_FORMAT: &str = "%d-%b-%Y";
const DATE_TIME_FORMAT: &str = "%d-%b-%Y, %H:%M";

/// Options for [`format_date`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormatOptions {
    /// Append the time of day after the date.
    pub time: bool,
}

impl FormatOptions {
    pub fn date_only() -> Self {
        Self { time: false }
    }

    pub fn with_time() -> Self {
        Self { time: true }
    }
}

/// Parse a server timestamp.
///
/// Accepts RFC 3339, OpenMRS style `2024-01-01T08:15:00.000+0300`, naive
/// date-times (taken as UTC) and bare `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_date(value: &str) -> Option<DateTime<FixedOffset>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt);
    }

    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt);
    }

    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(naive.and_utc().fixed_offset());
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().fixed_offset())
}

/// Format a parsed timestamp as `01-Jan-2024`, or `01-Jan-2024, 14:05`
/// (24-hour clock) when `options.time` is set.
pub fn format_date(date: &DateTime<FixedOffset>, options: FormatOptions) -> String {
    let pattern = if options.time { DATE_TIME_FORMAT } else { DATE_FORMAT };
    date.format(pattern).to_string()
}

/// Whole minutes elapsed from `since` to `now`, truncated toward zero.
pub fn minutes_between(since: &DateTime<FixedOffset>, now: DateTime<Utc>) -> i64 {
    now.signed_duration_since(since.with_timezone(&Utc))
        .num_minutes()
}
