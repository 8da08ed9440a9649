//! Raw event data as returned by the Google Calendar `events.list` endpoint.
//!
//! Fields are kept as the API sends them (times are unparsed strings) so the
//! fetcher can decide per event what to keep, skip or log.

use serde::{Deserialize, Serialize};

/// Event start or end as sent by the API.
///
/// Timed events carry `dateTime` (RFC 3339); all-day events carry `date`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEventTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl RawEventTime {
    /// A timed value.
    pub fn date_time(value: impl Into<String>) -> Self {
        Self {
            date_time: Some(value.into()),
            ..Default::default()
        }
    }

    /// An all-day value.
    pub fn date(value: impl Into<String>) -> Self {
        Self {
            date: Some(value.into()),
            ..Default::default()
        }
    }
}

/// The response status for an event attendee.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResponseStatus {
    Accepted,
    Declined,
    Tentative,
    #[default]
    NeedsAction,
    #[serde(other)]
    Unknown,
}

/// An attendee of a calendar event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAttendee {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Whether this entry is the authenticated user.
    #[serde(rename = "self", default)]
    pub is_self: bool,
    #[serde(default)]
    pub organizer: bool,
    #[serde(default)]
    pub response_status: ResponseStatus,
}

/// An entry point for joining a conference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEntryPoint {
    /// "video", "phone", "sip" or "more".
    pub entry_point_type: String,
    #[serde(default)]
    pub uri: Option<String>,
}

/// Conference data attached to an event (Meet, Zoom add-on, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawConferenceData {
    #[serde(default)]
    pub entry_points: Vec<RawEntryPoint>,
}

/// A single event from the Google Calendar API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    /// "confirmed", "tentative" or "cancelled".
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub start: RawEventTime,
    #[serde(default)]
    pub end: RawEventTime,
    /// Google Meet link, when the event has one.
    #[serde(default)]
    pub hangout_link: Option<String>,
    #[serde(default)]
    pub conference_data: Option<RawConferenceData>,
    #[serde(default)]
    pub attendees: Vec<RawAttendee>,
}

impl RawEvent {
    /// Creates a timed event with the given RFC 3339 start/end strings.
    pub fn new(
        id: impl Into<String>,
        summary: impl Into<String>,
        start: impl Into<String>,
        end: impl Into<String>,
    ) -> Self {
        Self {
            id: Some(id.into()),
            summary: Some(summary.into()),
            start: RawEventTime::date_time(start),
            end: RawEventTime::date_time(end),
            ..Default::default()
        }
    }

    /// Sets the Meet link.
    pub fn with_hangout_link(mut self, link: impl Into<String>) -> Self {
        self.hangout_link = Some(link.into());
        self
    }

    /// Adds an attendee.
    pub fn with_attendee(mut self, attendee: RawAttendee) -> Self {
        self.attendees.push(attendee);
        self
    }

    /// Sets the event status.
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Returns a short identifier for log lines.
    pub fn log_name(&self) -> &str {
        self.summary
            .as_deref()
            .or(self.id.as_deref())
            .unwrap_or("<unnamed>")
    }

    pub fn is_cancelled(&self) -> bool {
        self.status.as_deref() == Some("cancelled")
    }

    /// Returns the joinable video link.
    ///
    /// Prefers `hangoutLink`, then the first `video` conference entry point.
    pub fn video_link(&self) -> Option<&str> {
        self.hangout_link
            .as_deref()
            .filter(|link| !link.trim().is_empty())
            .or_else(|| {
                self.conference_data.as_ref().and_then(|cd| {
                    cd.entry_points
                        .iter()
                        .filter(|ep| ep.entry_point_type == "video")
                        .find_map(|ep| ep.uri.as_deref().filter(|uri| !uri.trim().is_empty()))
                })
            })
    }

    /// Returns true if the authenticated user declined this event.
    pub fn declined_by_self(&self) -> bool {
        self.attendees
            .iter()
            .any(|a| a.is_self && a.response_status == ResponseStatus::Declined)
    }
}

/// One page of the `events.list` response.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventListResponse {
    #[serde(default)]
    pub items: Vec<RawEvent>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}
