//! Query windows for calendar fetches.
//!
//! [`TimeWindow`] is the half-open `[start, end)` range sent to the provider
//! as `timeMin`/`timeMax`.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A time window for querying calendar events.
///
/// Represents a half-open interval `[start, end)` in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start of the window (inclusive).
    pub start: DateTime<Utc>,
    /// End of the window (exclusive).
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a new time window, swapping the bounds if given reversed.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    /// Creates a window from `now` until the next local midnight in `tz`.
    ///
    /// If the next midnight does not exist locally (a DST gap at midnight),
    /// the window falls back to 24 hours.
    pub fn today_remaining<Tz: TimeZone>(now: DateTime<Utc>, tz: &Tz) -> Self {
        let today = now.with_timezone(tz).date_naive();
        let end_of_day = today
            .succ_opt()
            .and_then(|tomorrow| tomorrow.and_hms_opt(0, 0, 0))
            .and_then(|midnight| tz.from_local_datetime(&midnight).earliest())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| now + Duration::hours(24));
        Self::new(now, end_of_day)
    }

    /// Creates a time window starting from now extending the given duration.
    pub fn from_now(now: DateTime<Utc>, duration: Duration) -> Self {
        Self::new(now, now + duration)
    }
}
