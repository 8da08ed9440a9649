//! Errors raised while reading credentials or talking to Google.
//!
//! Every error carries a [`ProviderErrorCode`]; the poller only looks at the
//! code to choose between "skip this cycle" and "authorize again".

use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// 401, rejected refresh, missing refresh token, failed browser flow.
    AuthenticationFailed,
    /// 403 on the calendar.
    AuthorizationFailed,
    NetworkError,
    /// 429.
    RateLimited,
    /// 5xx and any other unexpected status.
    ServerError,
    /// Body did not parse.
    InvalidResponse,
    /// Credentials or token file missing, unreadable or malformed.
    ConfigurationError,
    InternalError,
}

impl ProviderErrorCode {
    /// Transient failures worth trying again on the next cycle.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::NetworkError | Self::RateLimited | Self::ServerError
        )
    }

    /// Failures only a new authorization fixes.
    pub fn is_auth_failure(self) -> bool {
        self == Self::AuthenticationFailed
    }

    /// Maps a non-success HTTP status of the Calendar API.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            401 => Self::AuthenticationFailed,
            403 => Self::AuthorizationFailed,
            429 => Self::RateLimited,
            _ => Self::ServerError,
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::AuthenticationFailed => "not authenticated",
            Self::AuthorizationFailed => "access denied",
            Self::NetworkError => "network failure",
            Self::RateLimited => "rate limited",
            Self::ServerError => "server failure",
            Self::InvalidResponse => "unreadable response",
            Self::ConfigurationError => "bad configuration",
            Self::InternalError => "internal failure",
        };
        f.write_str(label)
    }
}

/// A coded error with an optional provider tag and cause.
#[derive(Debug, Error)]
pub struct ProviderError {
    code: ProviderErrorCode,
    provider: Option<String>,
    message: String,
    #[source]
    cause: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl ProviderError {
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            provider: None,
            message: message.into(),
            cause: None,
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthenticationFailed, message)
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthorizationFailed, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NetworkError, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ServerError, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InvalidResponse, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ConfigurationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InternalError, message)
    }

    /// Tags the error with the backend it came from, e.g. "google".
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Keeps the underlying error as the `source()` of this one.
    pub fn with_source(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }

    /// True for 401 responses, rejected refreshes and missing refresh tokens.
    pub fn is_auth_failure(&self) -> bool {
        self.code.is_auth_failure()
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.provider {
            Some(provider) => write!(f, "{provider}: {}: {}", self.code, self.message),
            None => write!(f, "{}: {}", self.code, self.message),
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_failures_are_retryable() {
        assert!(ProviderError::network("connection reset").is_retryable());
        assert!(ProviderError::server("502").is_retryable());
        assert!(ProviderError::new(ProviderErrorCode::RateLimited, "429").is_retryable());
        assert!(!ProviderError::authentication("invalid_grant").is_retryable());
        assert!(!ProviderError::configuration("no credentials").is_retryable());
    }

    #[test]
    fn only_authentication_needs_reauthorization() {
        assert!(ProviderError::authentication("token expired").is_auth_failure());
        assert!(!ProviderError::authorization("forbidden").is_auth_failure());
        assert!(!ProviderError::server("503").is_auth_failure());
        assert!(!ProviderError::network("timeout").is_auth_failure());
    }

    #[test]
    fn http_status_mapping() {
        use ProviderErrorCode::*;
        assert_eq!(ProviderErrorCode::from_http_status(401), AuthenticationFailed);
        assert_eq!(ProviderErrorCode::from_http_status(403), AuthorizationFailed);
        assert_eq!(ProviderErrorCode::from_http_status(429), RateLimited);
        assert_eq!(ProviderErrorCode::from_http_status(500), ServerError);
        assert_eq!(ProviderErrorCode::from_http_status(404), ServerError);
    }

    #[test]
    fn display_includes_provider_and_code() {
        let err = ProviderError::new(ProviderErrorCode::RateLimited, "slow down")
            .with_provider("google");
        assert_eq!(err.to_string(), "google: rate limited: slow down");
        assert_eq!(
            ProviderError::configuration("no credentials.json").to_string(),
            "bad configuration: no credentials.json"
        );
    }

    #[test]
    fn source_is_kept() {
        use std::error::Error;
        let err = ProviderError::configuration("failed to write token")
            .with_source(std::io::Error::other("read-only filesystem"));
        assert!(err.source().is_some());
        assert_eq!(err.code(), ProviderErrorCode::ConfigurationError);
    }
}
