//! Meeting value type and the start-ordered list the poller publishes.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// A calendar event that carries a joinable video link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meeting {
    /// Event title as entered in the calendar.
    pub summary: String,
    /// Start instant, normalized to UTC.
    pub start: DateTime<Utc>,
    /// End instant, normalized to UTC.
    pub end: DateTime<Utc>,
    /// Video-call URI opened when the meeting is selected.
    pub link: String,
}

impl Meeting {
    /// Creates a new meeting.
    pub fn new(
        summary: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        link: impl Into<String>,
    ) -> Self {
        Self {
            summary: summary.into(),
            start,
            end,
            link: link.into(),
        }
    }

    /// Returns the summary, or a placeholder when it is blank.
    pub fn title(&self) -> &str {
        let trimmed = self.summary.trim();
        if trimmed.is_empty() {
            "(No title)"
        } else {
            trimmed
        }
    }

    /// Returns true if `now` falls within `[start, end)`.
    pub fn is_in_progress(&self, now: DateTime<Utc>) -> bool {
        self.start <= now && now < self.end
    }

    /// Returns true once the start instant has been reached.
    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        self.start <= now
    }

    /// Time left until the meeting starts (negative once started).
    pub fn time_until_start(&self, now: DateTime<Utc>) -> TimeDelta {
        self.start - now
    }

    /// Time left until the meeting ends (negative once over).
    pub fn time_until_end(&self, now: DateTime<Utc>) -> TimeDelta {
        self.end - now
    }
}

/// Meetings ordered ascending by start time.
///
/// The only way to build a list is through [`MeetingList::new`] (or
/// `collect()`), which sorts, so every list handed to the display is ordered.
/// The sort is stable: meetings sharing a start keep their provider order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeetingList {
    meetings: Vec<Meeting>,
}

impl MeetingList {
    /// Builds a list from meetings in any order.
    pub fn new(mut meetings: Vec<Meeting>) -> Self {
        meetings.sort_by_key(|m| m.start);
        Self { meetings }
    }

    /// Returns an empty list.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.meetings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meetings.is_empty()
    }

    pub fn as_slice(&self) -> &[Meeting] {
        &self.meetings
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Meeting> {
        self.meetings.iter()
    }
}

impl FromIterator<Meeting> for MeetingList {
    fn from_iter<I: IntoIterator<Item = Meeting>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a MeetingList {
    type Item = &'a Meeting;
    type IntoIter = std::slice::Iter<'a, Meeting>;

    fn into_iter(self) -> Self::IntoIter {
        self.meetings.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, h, m, 0).unwrap()
    }

    fn meeting(summary: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Meeting {
        Meeting::new(summary, start, end, "https://meet.google.com/abc-defg-hij")
    }

    #[test]
    fn list_is_sorted_by_start() {
        let list = MeetingList::new(vec![
            meeting("late", at(15, 0), at(15, 30)),
            meeting("early", at(9, 0), at(9, 30)),
            meeting("middle", at(11, 0), at(12, 0)),
        ]);

        let starts: Vec<_> = list.iter().map(|m| m.start).collect();
        assert_eq!(starts, vec![at(9, 0), at(11, 0), at(15, 0)]);
    }

    #[test]
    fn equal_starts_keep_input_order() {
        let list: MeetingList = vec![
            meeting("first", at(10, 0), at(10, 30)),
            meeting("second", at(10, 0), at(11, 0)),
        ]
        .into_iter()
        .collect();

        assert_eq!(list.as_slice()[0].summary, "first");
        assert_eq!(list.as_slice()[1].summary, "second");
    }

    #[test]
    fn in_progress_is_half_open() {
        let m = meeting("standup", at(10, 0), at(10, 30));
        assert!(m.is_in_progress(at(10, 0)));
        assert!(m.is_in_progress(at(10, 29)));
        assert!(!m.is_in_progress(at(10, 30)));
        assert!(!m.is_in_progress(at(9, 59)));
    }

    #[test]
    fn blank_summary_gets_placeholder() {
        let m = meeting("   ", at(10, 0), at(10, 30));
        assert_eq!(m.title(), "(No title)");
        assert_eq!(meeting(" Sync ", at(10, 0), at(10, 30)).title(), "Sync");
    }

    #[test]
    fn meeting_serde_roundtrip() {
        let m = meeting("1:1", at(10, 0), at(10, 30));
        let json = serde_json::to_string(&m).unwrap();
        let back: Meeting = serde_json::from_str(&json).unwrap();
        assert_eq!(m, back);
    }
}
