//! Calendar access for meetbar.
//!
//! ```text
//! Google Calendar API
//!         │  GoogleCalendarClient (bearer token from TokenSource)
//!         ▼
//!   CalendarSource::list_events(window)
//!         │
//!         ▼  fetcher::select_meetings()
//!     MeetingList
//! ```
//!
//! The [`CalendarSource`] trait is the seam the poller and the tests plug into.

pub mod error;
pub mod fetcher;
pub mod google;
pub mod raw_event;
pub mod source;

pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use fetcher::{FetchWindow, fetch_upcoming, select_meetings, try_fetch_upcoming};
pub use raw_event::{
    EventListResponse, RawAttendee, RawConferenceData, RawEntryPoint, RawEvent, RawEventTime,
    ResponseStatus,
};
pub use source::{BoxFuture, CalendarSource};
