//! Application error types.

use meetbar_core::TracingError;
use meetbar_poller::PollerError;
use meetbar_providers::ProviderError;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Credentials missing or malformed, HTTP client setup failed.
    #[error("setup failed: {0}")]
    Setup(#[from] ProviderError),

    #[error(transparent)]
    Poller(#[from] PollerError),

    #[error("logging setup failed: {0}")]
    Tracing(#[from] TracingError),

    /// A link we refuse to hand to the system opener.
    #[error("refusing to open {url:?}: {reason}")]
    UnsupportedLink { url: String, reason: String },

    #[cfg(target_os = "macos")]
    #[error("failed to build the menu: {0}")]
    Menu(#[from] tray_icon::menu::Error),

    #[cfg(target_os = "macos")]
    #[error("failed to create the menu-bar item: {0}")]
    MenuBar(#[from] tray_icon::Error),

    #[error("failed to open {url}: {source}")]
    Open {
        url: String,
        #[source]
        source: std::io::Error,
    },
}
