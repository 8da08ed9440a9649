//! Poller error types.

use meetbar_providers::ProviderError;
use thiserror::Error;

/// Why the polling loop stopped. Every variant is fatal to the process.
#[derive(Debug, Error)]
pub enum PollerError {
    /// The first authorization failed or was abandoned. Not retried.
    #[error("authorization failed: {0}")]
    Authorize(#[source] ProviderError),

    /// Every connection attempt failed.
    #[error("could not connect to the calendar after {attempts} attempts: {source}")]
    ConnectExhausted {
        attempts: u32,
        #[source]
        source: ProviderError,
    },

    /// The calendar rejected our credentials and authorizing again failed.
    #[error("reauthorization failed: {0}")]
    Reauthorize(#[source] ProviderError),
}

impl PollerError {
    /// The provider error behind this failure.
    pub fn provider_error(&self) -> &ProviderError {
        match self {
            Self::ConnectExhausted { source, .. } => source,
            Self::Authorize(source) | Self::Reauthorize(source) => source,
        }
    }
}
