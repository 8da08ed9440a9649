//! Google Calendar v3 HTTP client.

use chrono::{DateTime, SecondsFormat, Utc};
use meetbar_core::TimeWindow;
use reqwest::StatusCode;
use tracing::debug;

use crate::error::{ProviderError, ProviderErrorCode, ProviderResult};
use crate::raw_event::{EventListResponse, RawEvent};
use crate::source::{BoxFuture, CalendarSource};

use super::auth::TokenSource;
use super::config::GoogleConfig;

const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Provider tag attached to errors and log lines.
pub const PROVIDER_NAME: &str = "google";

/// Lists events of one calendar with bearer tokens from a [`TokenSource`].
#[derive(Debug)]
pub struct GoogleCalendarClient {
    http_client: reqwest::Client,
    tokens: TokenSource,
    calendar_id: String,
    api_base: String,
}

impl GoogleCalendarClient {
    pub fn new(config: &GoogleConfig, tokens: TokenSource) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                ProviderError::internal(format!("failed to create HTTP client: {}", e))
                    .with_source(e)
            })?;

        Ok(Self {
            http_client,
            tokens,
            calendar_id: config.calendar_id.clone(),
            api_base: CALENDAR_API_BASE.to_string(),
        })
    }

    /// Points the client at another API root.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Fetches every page of single-instance events starting in `window`,
    /// ordered by start time.
    pub async fn list_events(&self, window: TimeWindow) -> ProviderResult<Vec<RawEvent>> {
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self
                .list_events_page(window.start, window.end, page_token.as_deref())
                .await
                .map_err(|e| e.with_provider(PROVIDER_NAME))?;
            pages += 1;
            events.extend(page.items);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!(
            calendar = %self.calendar_id,
            events = events.len(),
            pages,
            "listed calendar events"
        );
        Ok(events)
    }

    async fn list_events_page(
        &self,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
        page_token: Option<&str>,
    ) -> ProviderResult<EventListResponse> {
        let access_token = self.tokens.access_token().await?;
        let url = format!(
            "{}/calendars/{}/events",
            self.api_base,
            urlencoding::encode(&self.calendar_id)
        );

        let mut request = self
            .http_client
            .get(&url)
            .bearer_auth(access_token)
            .query(&[
                ("timeMin", time_min.to_rfc3339_opts(SecondsFormat::Secs, true)),
                ("timeMax", time_max.to_rfc3339_opts(SecondsFormat::Secs, true)),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
            ]);
        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }

        let response = request.send().await.map_err(|e| {
            let message = if e.is_timeout() {
                "request timeout".to_string()
            } else if e.is_connect() {
                format!("connection failed: {}", e)
            } else {
                format!("request failed: {}", e)
            };
            ProviderError::network(message).with_source(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, retry_after.as_deref(), &body));
        }

        let body = response.text().await.map_err(|e| {
            ProviderError::network(format!("failed to read response: {}", e)).with_source(e)
        })?;

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse events response: {}", e))
        })
    }
}

/// Maps a non-success status onto an error code.
fn status_error(status: StatusCode, retry_after: Option<&str>, body: &str) -> ProviderError {
    let code = ProviderErrorCode::from_http_status(status.as_u16());
    let message = match code {
        ProviderErrorCode::AuthenticationFailed => "access token expired or revoked".to_string(),
        ProviderErrorCode::AuthorizationFailed => format!("access denied to calendar: {}", body),
        ProviderErrorCode::RateLimited => format!(
            "rate limit exceeded{}",
            retry_after
                .map(|s| format!(", retry after {} seconds", s))
                .unwrap_or_default()
        ),
        _ => format!("API error ({}): {}", status, body),
    };
    ProviderError::new(code, message)
}

impl CalendarSource for GoogleCalendarClient {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn list_events(&self, window: TimeWindow) -> BoxFuture<'_, ProviderResult<Vec<RawEvent>>> {
        Box::pin(GoogleCalendarClient::list_events(self, window))
    }
}
