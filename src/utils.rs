use chrono::{DateTime, Datelike, FixedOffset, TimeZone, Weekday};

use crate::event::Timestamp;

/// Number of milliseconds in 24 hours.
pub const MILLIS_IN_DAY: u64 = 24 * 60 * 60 * 1000;

/// Converts a timestamp into a date-time in the given timezone.
///
/// Returns `None` if the timestamp is out of chrono's representable range.
pub fn timestamp_to_datetime(ts: Timestamp, tz: &FixedOffset) -> Option<DateTime<FixedOffset>> {
    tz.timestamp_millis_opt(ts.as_millis()).single()
}

/// Returns the day of the week that the given timestamp falls on in the given timezone.
pub fn weekday_of(ts: Timestamp, tz: &FixedOffset) -> Option<Weekday> {
    timestamp_to_datetime(ts, tz).map(|dt| dt.weekday())
}
