//! Google Calendar provider configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ProviderError, ProviderResult};

/// Directory name under the platform data dir.
const APP_DIR_NAME: &str = "meetbar";

/// OAuth client registration file name.
pub const CREDENTIALS_FILE_NAME: &str = "credentials.json";

/// Persisted token file name.
pub const TOKEN_FILE_NAME: &str = "token.json";

/// OAuth 2.0 client registration for Google API access.
///
/// Users register their own desktop OAuth client in the Google Cloud Console
/// and drop the downloaded JSON next to the token file.
#[derive(Debug, Clone)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Accepted layouts of `credentials.json`: the Cloud Console download,
/// which nests the client under `installed` or `web`, or a bare object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CredentialsFile {
    Installed { installed: ClientSecret },
    Web { web: ClientSecret },
    Bare(ClientSecret),
}

#[derive(Debug, Deserialize)]
struct ClientSecret {
    client_id: String,
    client_secret: String,
}

impl From<CredentialsFile> for OAuthCredentials {
    fn from(file: CredentialsFile) -> Self {
        let (CredentialsFile::Installed { installed: client }
        | CredentialsFile::Web { web: client }
        | CredentialsFile::Bare(client)) = file;
        OAuthCredentials::new(client.client_id, client.client_secret)
    }
}

impl OAuthCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Reads and parses a client registration file.
    ///
    /// # Errors
    ///
    /// A missing or unreadable file and unrecognised contents are all
    /// configuration errors.
    pub fn from_file(path: impl AsRef<Path>) -> ProviderResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ProviderError::configuration(format!("cannot read {}: {}", path.display(), e))
                .with_source(e)
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(json: &str) -> ProviderResult<Self> {
        serde_json::from_str::<CredentialsFile>(json)
            .map(Self::from)
            .map_err(|e| {
                ProviderError::configuration(
                    "expected client_id and client_secret, optionally under \"installed\" or \"web\"",
                )
                .with_source(e)
            })
    }

    pub fn validate(&self) -> ProviderResult<()> {
        let missing = if self.client_id.trim().is_empty() {
            "client_id"
        } else if self.client_secret.trim().is_empty() {
            "client_secret"
        } else {
            return Ok(());
        };
        Err(ProviderError::configuration(format!("{missing} is empty")))
    }
}

/// Returns the per-user data directory, e.g.
/// `~/Library/Application Support/meetbar` on macOS.
pub fn app_data_dir() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

/// Configuration for the Google Calendar provider.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub credentials: OAuthCredentials,

    /// Where the OAuth token is persisted.
    pub token_path: PathBuf,

    /// Calendar queried for events.
    pub calendar_id: String,

    /// HTTP request timeout.
    pub timeout: Duration,

    pub user_agent: String,

    /// Fixed loopback port for the OAuth redirect.
    pub callback_port: u16,

    /// How long the interactive flow waits for the browser redirect.
    pub callback_timeout: Duration,

    pub scopes: Vec<String>,
}

impl GoogleConfig {
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
    pub const DEFAULT_CALLBACK_PORT: u16 = 8080;
    pub const DEFAULT_CALLBACK_TIMEOUT_SECS: u64 = 300;

    /// Read-only calendar access.
    pub const DEFAULT_SCOPE: &'static str = "https://www.googleapis.com/auth/calendar.readonly";

    /// Creates a configuration with default paths and constants.
    pub fn new(credentials: OAuthCredentials) -> Self {
        Self {
            credentials,
            token_path: app_data_dir().join(TOKEN_FILE_NAME),
            calendar_id: "primary".to_string(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("meetbar/{}", env!("CARGO_PKG_VERSION")),
            callback_port: Self::DEFAULT_CALLBACK_PORT,
            callback_timeout: Duration::from_secs(Self::DEFAULT_CALLBACK_TIMEOUT_SECS),
            scopes: vec![Self::DEFAULT_SCOPE.to_string()],
        }
    }

    /// Loads the OAuth client registration from the default data directory.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when `credentials.json` is missing or
    /// malformed. Callers treat this as fatal.
    pub fn load_default() -> ProviderResult<Self> {
        let path = app_data_dir().join(CREDENTIALS_FILE_NAME);
        let credentials = OAuthCredentials::from_file(&path)?;
        let config = Self::new(credentials);
        config.validate()?;
        Ok(config)
    }

    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_callback_port(mut self, port: u16) -> Self {
        self.callback_port = port;
        self
    }

    pub fn with_callback_timeout(mut self, timeout: Duration) -> Self {
        self.callback_timeout = timeout;
        self
    }

    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Rejects empty credentials, an empty scope list and port 0.
    pub fn validate(&self) -> ProviderResult<()> {
        self.credentials.validate()?;
        if self.scopes.is_empty() {
            return Err(ProviderError::configuration("no OAuth scopes requested"));
        }
        if self.callback_port == 0 {
            return Err(ProviderError::configuration(
                "the OAuth redirect needs a fixed callback port",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProviderErrorCode;

    fn creds() -> OAuthCredentials {
        OAuthCredentials::new("1234.apps.googleusercontent.com", "GOCSPX-secret")
    }

    #[test]
    fn empty_credentials_are_rejected() {
        assert!(creds().validate().is_ok());

        let err = OAuthCredentials::new("", "GOCSPX-secret").validate().unwrap_err();
        assert_eq!(err.message(), "client_id is empty");
        let err = OAuthCredentials::new("1234", "  ").validate().unwrap_err();
        assert_eq!(err.message(), "client_secret is empty");
    }

    #[test]
    fn defaults() {
        let config = GoogleConfig::new(creds());
        assert_eq!(config.calendar_id, "primary");
        assert_eq!(config.callback_port, 8080);
        assert_eq!(config.callback_timeout, Duration::from_secs(300));
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.scopes, [GoogleConfig::DEFAULT_SCOPE]);
        assert!(config.token_path.ends_with("meetbar/token.json"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_config() {
        let err = GoogleConfig::new(creds()).with_scopes(vec![]).validate().unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ConfigurationError);

        let err = GoogleConfig::new(creds()).with_callback_port(0).validate().unwrap_err();
        assert!(err.message().contains("callback port"));

        let err = GoogleConfig::new(OAuthCredentials::new("", "x")).validate().unwrap_err();
        assert!(err.message().contains("client_id"));
    }

    #[test]
    fn console_download_layouts() {
        let installed = r#"{"installed":{
            "client_id":"1234.apps.googleusercontent.com",
            "project_id":"meetbar-dev",
            "auth_uri":"https://accounts.google.com/o/oauth2/auth",
            "client_secret":"GOCSPX-installed",
            "redirect_uris":["http://localhost"]}}"#;
        let parsed = OAuthCredentials::from_json(installed).unwrap();
        assert_eq!(parsed.client_id, "1234.apps.googleusercontent.com");
        assert_eq!(parsed.client_secret, "GOCSPX-installed");

        let web = r#"{"web":{"client_id":"5678","client_secret":"GOCSPX-web"}}"#;
        assert_eq!(OAuthCredentials::from_json(web).unwrap().client_secret, "GOCSPX-web");

        let bare = r#"{"client_id":"9012","client_secret":"GOCSPX-bare"}"#;
        assert_eq!(OAuthCredentials::from_json(bare).unwrap().client_id, "9012");
    }

    #[test]
    fn unrecognised_credentials_file() {
        for json in [r#"{"other":{}}"#, r#"{"client_id":"only-id"}"#, "not json"] {
            let err = OAuthCredentials::from_json(json).unwrap_err();
            assert_eq!(err.code(), ProviderErrorCode::ConfigurationError, "{json}");
        }
    }

    #[test]
    fn missing_credentials_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = OAuthCredentials::from_file(dir.path().join(CREDENTIALS_FILE_NAME)).unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ConfigurationError);
        assert!(err.message().contains("cannot read"));
    }
}
