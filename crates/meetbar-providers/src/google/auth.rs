//! Token provider: turns the persisted token (or a fresh authorization) into
//! a [`TokenSource`] the calendar client can draw bearer tokens from.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::source::BoxFuture;

use super::config::GoogleConfig;
use super::oauth::{OAuthClient, RefreshedToken};
use super::tokens::{TokenInfo, TokenStorage};

/// The OAuth endpoints the token provider talks to.
pub trait Authorizer: Send + Sync {
    /// Runs the interactive (browser) authorization flow.
    fn authorize(&self) -> BoxFuture<'_, ProviderResult<TokenInfo>>;

    /// Exchanges a refresh token for a new access token.
    fn refresh<'a>(&'a self, refresh_token: &'a str) -> BoxFuture<'a, ProviderResult<RefreshedToken>>;
}

/// Hands out valid access tokens, refreshing and persisting as needed.
///
/// Clones share the same storage and refresh lock.
#[derive(Clone)]
pub struct TokenSource {
    storage: Arc<TokenStorage>,
    authorizer: Arc<dyn Authorizer>,
    refresh_lock: Arc<Mutex<()>>,
}

impl std::fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSource")
            .field("storage", &self.storage.path())
            .finish_non_exhaustive()
    }
}

impl TokenSource {
    /// Returns a bearer token valid for at least the expiry margin.
    ///
    /// # Errors
    ///
    /// Authentication error when no token is stored, when it expired without
    /// a refresh token, or when Google rejects the refresh.
    pub async fn access_token(&self) -> ProviderResult<String> {
        let _guard = self.refresh_lock.lock().await;

        let tokens = self
            .storage
            .get()
            .ok_or_else(|| ProviderError::authentication("no OAuth token available"))?;
        if !tokens.is_expired() {
            return Ok(tokens.access_token);
        }

        let Some(refresh_token) = tokens.refresh_token.clone() else {
            return Err(ProviderError::authentication(
                "access token expired and no refresh token is stored",
            ));
        };

        debug!("access token expired, refreshing");
        let refreshed = self.authorizer.refresh(&refresh_token).await?;
        let tokens = tokens.refreshed(
            refreshed.access_token,
            refreshed.expires_in,
            refreshed.refresh_token,
        );
        let access_token = tokens.access_token.clone();
        self.storage.set(tokens)?;
        Ok(access_token)
    }
}

/// Obtains an authorized [`TokenSource`], running the browser flow when the
/// persisted token is missing or unusable.
pub struct TokenProvider {
    storage: Arc<TokenStorage>,
    authorizer: Arc<dyn Authorizer>,
    scopes: Vec<String>,
}

impl TokenProvider {
    /// Creates a provider backed by Google's OAuth endpoints.
    pub fn new(config: &GoogleConfig) -> ProviderResult<Self> {
        let client = OAuthClient::new(config)?;
        Ok(Self::with_authorizer(
            TokenStorage::new(&config.token_path),
            Arc::new(client),
            config.scopes.clone(),
        ))
    }

    pub fn with_authorizer(
        storage: TokenStorage,
        authorizer: Arc<dyn Authorizer>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            storage: Arc::new(storage),
            authorizer,
            scopes,
        }
    }

    fn token_source(&self) -> TokenSource {
        TokenSource {
            storage: Arc::clone(&self.storage),
            authorizer: Arc::clone(&self.authorizer),
            refresh_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Loads the persisted token, authorizing interactively if there is none,
    /// then checks it by minting an access token.
    ///
    /// If that check fails with an authentication error, the interactive flow
    /// runs once more. Other check failures (network, Google outage) are
    /// logged and the source is returned; the next fetch retries the refresh.
    /// A failing interactive flow is returned as is.
    pub async fn obtain_token_source(&self) -> ProviderResult<TokenSource> {
        let loaded = match self.storage.load() {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!(error = %e, "stored token is unreadable, authorizing again");
                false
            }
        };

        if !loaded || self.storage.needs_reauth(&self.scopes) {
            self.run_interactive_flow().await?;
        }

        let source = self.token_source();
        match source.access_token().await {
            Ok(_) => {}
            Err(e) if e.is_auth_failure() => {
                warn!(error = %e, "stored token is no longer valid, authorizing again");
                self.run_interactive_flow().await?;
                source.access_token().await?;
            }
            Err(e) => {
                warn!(error = %e, "could not check the stored token, continuing with it");
            }
        }
        Ok(source)
    }

    /// Discards the stored token and runs the interactive flow.
    pub async fn reauthorize(&self) -> ProviderResult<TokenSource> {
        self.storage.clear()?;
        self.run_interactive_flow().await?;
        Ok(self.token_source())
    }

    async fn run_interactive_flow(&self) -> ProviderResult<()> {
        let tokens = self.authorizer.authorize().await?;
        self.storage.set(tokens)?;
        info!(path = %self.storage.path().display(), "authorization complete, token saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;
    use chrono::{Duration, Utc};
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const SCOPE: &str = "https://www.googleapis.com/auth/calendar.readonly";

    fn scopes() -> Vec<String> {
        vec![SCOPE.to_string()]
    }

    #[derive(Default)]
    struct FakeAuthorizer {
        interactive: AtomicUsize,
        refreshes: AtomicUsize,
        refresh_failure: Option<ProviderErrorCode>,
    }

    impl FakeAuthorizer {
        fn failing_refresh(code: ProviderErrorCode) -> Self {
            Self {
                refresh_failure: Some(code),
                ..Default::default()
            }
        }

        fn interactive_runs(&self) -> usize {
            self.interactive.load(Ordering::SeqCst)
        }

        fn refresh_runs(&self) -> usize {
            self.refreshes.load(Ordering::SeqCst)
        }
    }

    impl Authorizer for FakeAuthorizer {
        fn authorize(&self) -> BoxFuture<'_, ProviderResult<TokenInfo>> {
            let n = self.interactive.fetch_add(1, Ordering::SeqCst) + 1;
            Box::pin(async move {
                Ok(TokenInfo::new(
                    format!("interactive-{}", n),
                    Some("refresh".to_string()),
                    Some(3600),
                    scopes(),
                ))
            })
        }

        fn refresh<'a>(&'a self, _refresh_token: &'a str) -> BoxFuture<'a, ProviderResult<RefreshedToken>> {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            let result = match self.refresh_failure {
                Some(code) => Err(ProviderError::new(code, "refresh failed")),
                None => Ok(RefreshedToken {
                    access_token: "refreshed".to_string(),
                    expires_in: Some(3600),
                    refresh_token: None,
                }),
            };
            Box::pin(async move { result })
        }
    }

    fn provider(path: &Path, authorizer: &Arc<FakeAuthorizer>) -> TokenProvider {
        TokenProvider::with_authorizer(TokenStorage::new(path), authorizer.clone(), scopes())
    }

    fn persist(path: &Path, tokens: TokenInfo) {
        TokenStorage::new(path).set(tokens).unwrap();
    }

    fn expired(refresh_token: Option<&str>) -> TokenInfo {
        let mut tokens = TokenInfo::new("stale", refresh_token.map(str::to_string), None, scopes());
        tokens.expires_at = Some(Utc::now() - Duration::minutes(5));
        tokens
    }

    #[tokio::test]
    async fn persisted_token_is_used_without_interaction() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        persist(&path, TokenInfo::new("stored", Some("refresh".to_string()), Some(3600), scopes()));

        let authorizer = Arc::new(FakeAuthorizer::default());
        let source = provider(&path, &authorizer).obtain_token_source().await.unwrap();

        assert_eq!(source.access_token().await.unwrap(), "stored");
        assert_eq!(authorizer.interactive_runs(), 0);
        assert_eq!(authorizer.refresh_runs(), 0);
    }

    #[tokio::test]
    async fn missing_token_runs_interactive_flow_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meetbar").join("token.json");

        let authorizer = Arc::new(FakeAuthorizer::default());
        let source = provider(&path, &authorizer).obtain_token_source().await.unwrap();

        assert_eq!(source.access_token().await.unwrap(), "interactive-1");
        assert_eq!(authorizer.interactive_runs(), 1);

        let reloaded = TokenStorage::new(&path);
        assert!(reloaded.load().unwrap());
        assert_eq!(reloaded.get().unwrap().access_token, "interactive-1");
    }

    #[tokio::test]
    async fn corrupt_token_file_runs_interactive_flow() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, "garbage").unwrap();

        let authorizer = Arc::new(FakeAuthorizer::default());
        provider(&path, &authorizer).obtain_token_source().await.unwrap();
        assert_eq!(authorizer.interactive_runs(), 1);
    }

    #[tokio::test]
    async fn missing_scope_runs_interactive_flow() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        persist(&path, TokenInfo::new("stored", None, None, vec!["other".to_string()]));

        let authorizer = Arc::new(FakeAuthorizer::default());
        provider(&path, &authorizer).obtain_token_source().await.unwrap();
        assert_eq!(authorizer.interactive_runs(), 1);
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_and_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        persist(&path, expired(Some("refresh")));

        let authorizer = Arc::new(FakeAuthorizer::default());
        let source = provider(&path, &authorizer).obtain_token_source().await.unwrap();

        assert_eq!(source.access_token().await.unwrap(), "refreshed");
        assert_eq!(authorizer.refresh_runs(), 1);
        assert_eq!(authorizer.interactive_runs(), 0);

        let reloaded = TokenStorage::new(&path);
        reloaded.load().unwrap();
        let tokens = reloaded.get().unwrap();
        assert_eq!(tokens.access_token, "refreshed");
        assert_eq!(tokens.refresh_token.as_deref(), Some("refresh"));
    }

    #[tokio::test]
    async fn rejected_refresh_repeats_interactive_flow_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        persist(&path, expired(Some("revoked")));

        let authorizer = Arc::new(FakeAuthorizer::failing_refresh(
            ProviderErrorCode::AuthenticationFailed,
        ));
        let source = provider(&path, &authorizer).obtain_token_source().await.unwrap();

        assert_eq!(authorizer.interactive_runs(), 1);
        assert_eq!(source.access_token().await.unwrap(), "interactive-1");
    }

    #[tokio::test]
    async fn refresh_network_error_keeps_stored_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        persist(&path, expired(Some("refresh")));

        let authorizer = Arc::new(FakeAuthorizer::failing_refresh(ProviderErrorCode::NetworkError));
        let source = provider(&path, &authorizer).obtain_token_source().await.unwrap();
        assert_eq!(authorizer.interactive_runs(), 0);
        assert_eq!(authorizer.refresh_runs(), 1);

        let err = source.access_token().await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::NetworkError);
        assert_eq!(authorizer.refresh_runs(), 2);
    }

    #[tokio::test]
    async fn failed_interactive_flow_is_returned() {
        struct Offline;

        impl Authorizer for Offline {
            fn authorize(&self) -> BoxFuture<'_, ProviderResult<TokenInfo>> {
                Box::pin(async { Err(ProviderError::network("token exchange request failed")) })
            }

            fn refresh<'a>(&'a self, _refresh_token: &'a str) -> BoxFuture<'a, ProviderResult<RefreshedToken>> {
                Box::pin(async { Err(ProviderError::network("offline")) })
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let provider = TokenProvider::with_authorizer(
            TokenStorage::new(dir.path().join("token.json")),
            Arc::new(Offline),
            scopes(),
        );
        let err = provider.obtain_token_source().await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::NetworkError);
        assert!(!dir.path().join("token.json").exists());
    }

    #[tokio::test]
    async fn expired_without_refresh_token_is_auth_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        let authorizer = Arc::new(FakeAuthorizer::default());
        let provider = provider(&path, &authorizer);
        provider.storage.set(expired(None)).unwrap();

        let err = provider.token_source().access_token().await.unwrap_err();
        assert!(err.is_auth_failure());
        assert_eq!(authorizer.refresh_runs(), 0);
    }

    #[tokio::test]
    async fn reauthorize_replaces_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        persist(&path, TokenInfo::new("stored", Some("refresh".to_string()), Some(3600), scopes()));

        let authorizer = Arc::new(FakeAuthorizer::default());
        let provider = provider(&path, &authorizer);
        provider.obtain_token_source().await.unwrap();

        let source = provider.reauthorize().await.unwrap();
        assert_eq!(source.access_token().await.unwrap(), "interactive-1");
        assert_eq!(authorizer.interactive_runs(), 1);
    }
}
