//! The polling loop.
//!
//! ```text
//!  authorize ──ok──▶ Connecting ──ok──▶ Polling ──auth failure──▶ reauthorize ──▶ Connecting
//!      │                 │                 │
//!    error           N failures      other failures publish an empty list
//!      ▼                 ▼
//!  Authorize      ConnectExhausted
//! ```
//!
//! Authorization may open the browser, so it is never retried; only building
//! the calendar source from the obtained credentials is.

use std::convert::Infallible;
use std::time::Duration;

use chrono::{Local, Utc};
use meetbar_core::MeetingList;
use meetbar_providers::{CalendarSource, FetchWindow, try_fetch_upcoming};
use tracing::{debug, info, warn};

use crate::connector::Connector;
use crate::error::PollerError;
use crate::snapshot::SnapshotPublisher;

/// Polling loop configuration.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Pause between two fetches.
    pub poll_interval: Duration,
    /// Connection attempts before giving up.
    pub max_connect_attempts: u32,
    /// Pause between two connection attempts.
    pub connect_retry_delay: Duration,
    pub fetch_window: FetchWindow,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            max_connect_attempts: 3,
            connect_retry_delay: Duration::from_secs(5),
            fetch_window: FetchWindow::RestOfDay,
        }
    }
}

impl PollerConfig {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the attempt count (at least one) and the delay between attempts.
    pub fn with_connect_retries(mut self, attempts: u32, delay: Duration) -> Self {
        self.max_connect_attempts = attempts.max(1);
        self.connect_retry_delay = delay;
        self
    }

    pub fn with_fetch_window(mut self, window: FetchWindow) -> Self {
        self.fetch_window = window;
        self
    }
}

/// Keeps the published meeting list current.
pub struct Poller<C> {
    connector: C,
    config: PollerConfig,
    publisher: SnapshotPublisher,
}

impl<C: Connector> Poller<C> {
    pub fn new(connector: C, config: PollerConfig, publisher: SnapshotPublisher) -> Self {
        Self {
            connector,
            config,
            publisher,
        }
    }

    /// Runs until a fatal error.
    pub async fn run(self) -> Result<Infallible, PollerError> {
        info!(
            interval_secs = self.config.poll_interval.as_secs(),
            window = ?self.config.fetch_window,
            "poller started"
        );

        self.connector
            .authorize()
            .await
            .map_err(PollerError::Authorize)?;

        loop {
            let source = self.connect().await?;
            self.poll(&source).await?;
            info!("reconnecting to the calendar");
        }
    }

    async fn connect(&self) -> Result<C::Source, PollerError> {
        let attempts = self.config.max_connect_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.connector.connect().await {
                Ok(source) => {
                    info!(source = source.name(), attempt, "connected to calendar");
                    return Ok(source);
                }
                Err(e) if attempt >= attempts => {
                    return Err(PollerError::ConnectExhausted {
                        attempts,
                        source: e,
                    });
                }
                Err(e) => {
                    warn!(
                        attempt,
                        max = attempts,
                        retryable = e.is_retryable(),
                        error = %e,
                        "failed to connect to calendar"
                    );
                    tokio::time::sleep(self.config.connect_retry_delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Fetches and publishes until the credentials are rejected, then
    /// reauthorizes and returns so the caller reconnects.
    async fn poll(&self, source: &C::Source) -> Result<(), PollerError> {
        loop {
            let window = self.config.fetch_window.resolve(Utc::now(), &Local);
            match try_fetch_upcoming(source, window).await {
                Ok(meetings) => {
                    debug!(meetings = meetings.len(), "publishing snapshot");
                    self.publisher.publish(meetings);
                }
                Err(e) if e.is_auth_failure() => {
                    warn!(error = %e, "calendar rejected the credentials");
                    self.publisher.publish(MeetingList::empty());
                    self.connector
                        .reauthorize()
                        .await
                        .map_err(PollerError::Reauthorize)?;
                    return Ok(());
                }
                Err(e) => {
                    warn!(error = %e, retryable = e.is_retryable(), "failed to retrieve events");
                    self.publisher.publish(MeetingList::empty());
                }
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }
}
