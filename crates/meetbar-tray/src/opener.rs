//! Opens meeting links in the default browser.

use tracing::info;
use url::Url;

use crate::error::{AppError, AppResult};

/// Checks that `link` is an absolute http(s) URL.
pub fn validate_link(link: &str) -> AppResult<Url> {
    let url = Url::parse(link.trim()).map_err(|e| AppError::UnsupportedLink {
        url: link.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "https" | "http" => Ok(url),
        other => Err(AppError::UnsupportedLink {
            url: link.to_string(),
            reason: format!("scheme {:?} is not allowed", other),
        }),
    }
}

/// Opens a meeting link with the system handler.
pub fn open_link(link: &str) -> AppResult<()> {
    let url = validate_link(link)?;
    info!(url = %url, "opening meeting link");
    open::that(url.as_str()).map_err(|source| AppError::Open {
        url: url.to_string(),
        source,
    })
}
