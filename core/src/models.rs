mod account;
mod task;
mod task_document;

pub use account::{Account, Session};
pub use task::{RepeatType, Task, TaskKey, TaskPriority, TaskUpdate};
pub use task_document::{NewTaskDocument, TaskDocument};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};

/// Convert Unix timestamp (milliseconds) to DateTime<Utc>
pub fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}

/// Convert DateTime<Utc> to Unix timestamp (milliseconds)
pub fn datetime_to_millis(datetime: &DateTime<Utc>) -> i64 {
    datetime.timestamp_millis()
}

/// Midnight UTC on the given calendar day
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Parse an ISO-8601 timestamp as stored in task documents.
///
/// Accepts full RFC 3339 strings, offset-less date-times (taken as UTC)
/// and bare `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_iso_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().map(start_of_day)
}

/// Format a timestamp the way task documents store it (`2024-06-01T00:00:00.000Z`)
pub fn format_iso_datetime(datetime: &DateTime<Utc>) -> String {
    datetime.to_rfc3339_opts(SecondsFormat::Millis, true)
}
