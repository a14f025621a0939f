use chrono::{DateTime, NaiveDate, ParseResult, Utc};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// This is the standard way of converting a date to a string in habits. Both the persisted blob
/// and the stop-date backup keys use it.
pub fn date_to_key(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date_key(value: &str) -> ParseResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
}

/// Habit ids are creation timestamps in milliseconds. Returns the UTC day they were taken on.
pub fn millis_to_date(millis: i64) -> Option<NaiveDate> {
    DateTime::<Utc>::from_timestamp_millis(millis).map(|v| v.date_naive())
}

/// Inclusive number of days between two dates. Returns 0 when `to` is before `from`.
pub fn days_inclusive(from: NaiveDate, to: NaiveDate) -> u32 {
    u32::try_from((to - from).num_days() + 1).unwrap_or(0)
}
