//! Meeting fetcher: turns a window of raw calendar events into the
//! start-ordered [`MeetingList`] the poller publishes.
//!
//! Rules applied per event, in order:
//! 1. cancelled events are dropped silently
//! 2. events without a joinable video link are dropped silently
//! 3. events the authenticated user declined are dropped silently
//! 4. events whose start or end does not parse are skipped with a warning
//!
//! Window bounds are applied by the provider query, not here.

use chrono::{DateTime, Duration, TimeZone, Utc};
use meetbar_core::{Meeting, MeetingList, TimeWindow};
use tracing::{debug, warn};

use crate::error::ProviderResult;
use crate::raw_event::{RawEvent, RawEventTime};
use crate::source::CalendarSource;

/// Which part of the calendar each poll covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetchWindow {
    /// From now until the next local midnight.
    #[default]
    RestOfDay,
    /// From now for a fixed duration.
    LookAhead(Duration),
}

impl FetchWindow {
    /// Resolves to a concrete query window.
    pub fn resolve<Tz: TimeZone>(&self, now: DateTime<Utc>, tz: &Tz) -> TimeWindow {
        match self {
            Self::RestOfDay => TimeWindow::today_remaining(now, tz),
            Self::LookAhead(duration) => TimeWindow::from_now(now, *duration),
        }
    }
}

/// Queries `source` for `window` and filters the result into meetings.
///
/// # Errors
///
/// Returns the provider error unchanged so callers can tell authentication
/// failures apart from transient ones.
pub async fn try_fetch_upcoming<S>(source: &S, window: TimeWindow) -> ProviderResult<MeetingList>
where
    S: CalendarSource + ?Sized,
{
    let events = source.list_events(window).await?;
    let total = events.len();
    let meetings = select_meetings(events);
    debug!(
        source = source.name(),
        events = total,
        meetings = meetings.len(),
        "fetched upcoming meetings"
    );
    Ok(meetings)
}

/// Like [`try_fetch_upcoming`], but a failed query yields an empty list.
pub async fn fetch_upcoming<S>(source: &S, window: TimeWindow) -> MeetingList
where
    S: CalendarSource + ?Sized,
{
    match try_fetch_upcoming(source, window).await {
        Ok(meetings) => meetings,
        Err(e) => {
            warn!(source = source.name(), error = %e, "failed to retrieve events");
            MeetingList::empty()
        }
    }
}

/// Filters raw events down to joinable, non-declined meetings.
pub fn select_meetings(events: Vec<RawEvent>) -> MeetingList {
    events.into_iter().filter_map(to_meeting).collect()
}

fn to_meeting(event: RawEvent) -> Option<Meeting> {
    if event.is_cancelled() || event.declined_by_self() {
        return None;
    }
    let link = event.video_link()?.to_string();

    let start = match parse_event_time(&event.start) {
        Ok(start) => start,
        Err(reason) => {
            warn!(event = event.log_name(), %reason, "skipping event with unusable start time");
            return None;
        }
    };
    let end = match parse_event_time(&event.end) {
        Ok(end) => end,
        Err(reason) => {
            warn!(event = event.log_name(), %reason, "skipping event with unusable end time");
            return None;
        }
    };

    Some(Meeting::new(event.summary.unwrap_or_default(), start, end, link))
}

fn parse_event_time(time: &RawEventTime) -> Result<DateTime<Utc>, String> {
    match (&time.date_time, &time.date) {
        (Some(value), _) => DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| format!("invalid dateTime {:?}: {}", value, e)),
        (None, Some(date)) => Err(format!("all-day date {:?} has no time of day", date)),
        (None, None) => Err("missing".to_string()),
    }
}
