//! The seam between the fetcher and the calendar backend.

use std::future::Future;
use std::pin::Pin;

use meetbar_core::TimeWindow;

use crate::error::ProviderResult;
use crate::raw_event::RawEvent;

/// A boxed future for object-safe async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A read-only calendar the fetcher can query.
///
/// Implementations list the single-instance events of the primary calendar
/// whose start falls within the window, ordered by start time, across all
/// result pages.
pub trait CalendarSource: Send + Sync {
    /// Short name used in logs and error tags (e.g. "google").
    fn name(&self) -> &str;

    /// Lists events starting within `window`.
    fn list_events(&self, window: TimeWindow) -> BoxFuture<'_, ProviderResult<Vec<RawEvent>>>;
}

impl<S: CalendarSource + ?Sized> CalendarSource for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn list_events(&self, window: TimeWindow) -> BoxFuture<'_, ProviderResult<Vec<RawEvent>>> {
        (**self).list_events(window)
    }
}
