//! Logging setup for the meetbar binaries.
//!
//! Records go to stderr. `RUST_LOG` overrides the default `meetbar=<level>`
//! directive, which covers every `meetbar_*` crate through target prefix
//! matching. `MEETBAR_LOG_FORMAT=json` switches to one JSON object per line.

use std::str::FromStr;

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Environment variable selecting the output format.
pub const LOG_FORMAT_ENV: &str = "MEETBAR_LOG_FORMAT";

#[derive(Debug, Error)]
pub enum TracingError {
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("failed to parse env filter: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),

    #[error("unknown log format {0:?} (expected \"compact\" or \"json\")")]
    UnknownFormat(String),
}

/// Output format for log records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingOutputFormat {
    /// Single-line human readable records.
    #[default]
    Compact,
    Json,
}

impl FromStr for TracingOutputFormat {
    type Err = TracingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compact" | "" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(TracingError::UnknownFormat(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Level for meetbar crates when `RUST_LOG` is unset.
    pub default_level: Level,
    pub output_format: TracingOutputFormat,
    /// Include file and line in each record.
    pub include_location: bool,
    pub include_target: bool,
    /// Explicit filter directive; wins over `RUST_LOG` and `default_level`.
    pub env_filter: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_level: Level::INFO,
            output_format: TracingOutputFormat::Compact,
            include_location: false,
            include_target: true,
            env_filter: None,
        }
    }
}

impl TracingConfig {
    /// Default config with the format taken from [`LOG_FORMAT_ENV`].
    pub fn from_env() -> Result<Self, TracingError> {
        let format = match std::env::var(LOG_FORMAT_ENV) {
            Ok(value) => value.parse()?,
            Err(_) => TracingOutputFormat::default(),
        };
        Ok(Self::default().with_format(format))
    }

    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.default_level = level;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: TracingOutputFormat) -> Self {
        self.output_format = format;
        self
    }

    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    fn default_directive(&self) -> String {
        format!("meetbar={}", self.default_level)
    }

    fn filter(&self) -> Result<EnvFilter, TracingError> {
        match &self.env_filter {
            Some(directive) => Ok(EnvFilter::try_new(directive)?),
            None => Ok(EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(self.default_directive()))),
        }
    }
}

/// Installs the global subscriber. Call once at process start.
///
/// # Errors
///
/// Fails if a global subscriber is already set or the filter directive does
/// not parse.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let registry = tracing_subscriber::registry().with(config.filter()?);
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_target(config.include_target);

    match config.output_format {
        TracingOutputFormat::Compact => {
            tracing::subscriber::set_global_default(registry.with(layer.compact()))?
        }
        TracingOutputFormat::Json => {
            tracing::subscriber::set_global_default(registry.with(layer.json()))?
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = TracingConfig::default();
        assert_eq!(config.default_level, Level::INFO);
        assert_eq!(config.output_format, TracingOutputFormat::Compact);
        assert!(!config.include_location);
        assert!(config.env_filter.is_none());
        assert_eq!(config.default_directive(), "meetbar=INFO");
    }

    #[test]
    fn builder_methods() {
        let config = TracingConfig::default()
            .with_level(Level::DEBUG)
            .with_format(TracingOutputFormat::Json)
            .with_env_filter("meetbar_poller=trace");

        assert_eq!(config.default_level, Level::DEBUG);
        assert_eq!(config.output_format, TracingOutputFormat::Json);
        assert_eq!(config.env_filter.as_deref(), Some("meetbar_poller=trace"));
    }

    #[test]
    fn format_parsing() {
        assert_eq!("json".parse::<TracingOutputFormat>().unwrap(), TracingOutputFormat::Json);
        assert_eq!(" JSON ".parse::<TracingOutputFormat>().unwrap(), TracingOutputFormat::Json);
        assert_eq!("compact".parse::<TracingOutputFormat>().unwrap(), TracingOutputFormat::Compact);
        assert!(matches!(
            "pretty".parse::<TracingOutputFormat>(),
            Err(TracingError::UnknownFormat(f)) if f == "pretty"
        ));
    }

    #[test]
    fn explicit_filter_wins() {
        let config = TracingConfig::default().with_env_filter("meetbar_poller=trace");
        assert!(config.filter().is_ok());
    }

    #[test]
    fn invalid_filter_is_rejected() {
        let config = TracingConfig::default().with_env_filter("meetbar=notalevel");
        assert!(matches!(init_tracing(config), Err(TracingError::EnvFilter(_))));
    }
}
