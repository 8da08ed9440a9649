//! How the poller obtains credentials and builds calendar sources from them.

use std::sync::{Mutex, PoisonError};

use meetbar_providers::google::{GoogleCalendarClient, GoogleConfig, TokenProvider, TokenSource};
use meetbar_providers::{BoxFuture, CalendarSource, ProviderError, ProviderResult};
use tracing::info;

/// Builds authorized calendar sources for the poller.
///
/// [`authorize`](Connector::authorize) runs once at start-up and may involve
/// the user; [`connect`](Connector::connect) only builds a source from the
/// credentials already obtained and is safe to retry.
pub trait Connector: Send + Sync {
    type Source: CalendarSource;

    /// Obtains credentials, interactively if needed.
    fn authorize(&self) -> BoxFuture<'_, ProviderResult<()>>;

    /// Builds a source from the current credentials.
    fn connect(&self) -> BoxFuture<'_, ProviderResult<Self::Source>>;

    /// Discards the current credentials and authorizes again.
    fn reauthorize(&self) -> BoxFuture<'_, ProviderResult<()>>;
}

/// Connects to Google Calendar through the persisted OAuth token.
pub struct GoogleConnector {
    config: GoogleConfig,
    tokens: TokenProvider,
    current: Mutex<Option<TokenSource>>,
}

impl GoogleConnector {
    pub fn new(config: GoogleConfig) -> ProviderResult<Self> {
        let tokens = TokenProvider::new(&config)?;
        Ok(Self::with_token_provider(config, tokens))
    }

    pub fn with_token_provider(config: GoogleConfig, tokens: TokenProvider) -> Self {
        Self {
            config,
            tokens,
            current: Mutex::new(None),
        }
    }

    fn store(&self, source: TokenSource) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(source);
    }

    fn current(&self) -> Option<TokenSource> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Connector for GoogleConnector {
    type Source = GoogleCalendarClient;

    fn authorize(&self) -> BoxFuture<'_, ProviderResult<()>> {
        Box::pin(async move {
            let source = self.tokens.obtain_token_source().await?;
            self.store(source);
            Ok(())
        })
    }

    fn connect(&self) -> BoxFuture<'_, ProviderResult<GoogleCalendarClient>> {
        Box::pin(async move {
            let tokens = self
                .current()
                .ok_or_else(|| ProviderError::internal("connect called before authorize"))?;
            GoogleCalendarClient::new(&self.config, tokens)
        })
    }

    fn reauthorize(&self) -> BoxFuture<'_, ProviderResult<()>> {
        Box::pin(async move {
            info!("authorizing meetbar again");
            let source = self.tokens.reauthorize().await?;
            self.store(source);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Poller, PollerConfig, PollerError, snapshot_channel};
    use meetbar_providers::ProviderErrorCode;
    use meetbar_providers::google::{
        Authorizer, OAuthCredentials, RefreshedToken, TokenInfo, TokenStorage,
    };
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Browser flow that either hands out a token or fails like an
    /// unreachable token endpoint.
    struct CountingAuthorizer {
        runs: AtomicUsize,
        offline: bool,
    }

    impl CountingAuthorizer {
        fn new(offline: bool) -> Arc<Self> {
            Arc::new(Self {
                runs: AtomicUsize::new(0),
                offline,
            })
        }

        fn runs(&self) -> usize {
            self.runs.load(Ordering::SeqCst)
        }
    }

    impl Authorizer for CountingAuthorizer {
        fn authorize(&self) -> BoxFuture<'_, ProviderResult<TokenInfo>> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            let result = if self.offline {
                Err(ProviderError::network("token exchange request failed"))
            } else {
                Ok(TokenInfo::new(
                    "fresh",
                    Some("refresh".to_string()),
                    Some(3600),
                    vec![GoogleConfig::DEFAULT_SCOPE.to_string()],
                ))
            };
            Box::pin(async move { result })
        }

        fn refresh<'a>(&'a self, _refresh_token: &'a str) -> BoxFuture<'a, ProviderResult<RefreshedToken>> {
            Box::pin(async { Err(ProviderError::network("offline")) })
        }
    }

    fn connector(dir: &tempfile::TempDir, authorizer: &Arc<CountingAuthorizer>) -> GoogleConnector {
        let config = GoogleConfig::new(OAuthCredentials::new("id", "secret"))
            .with_token_path(dir.path().join("token.json"));
        let tokens = TokenProvider::with_authorizer(
            TokenStorage::new(&config.token_path),
            authorizer.clone(),
            config.scopes.clone(),
        );
        GoogleConnector::with_token_provider(config, tokens)
    }

    #[tokio::test(start_paused = true)]
    async fn failed_browser_flow_is_fatal_and_runs_once() {
        let dir = tempfile::tempdir().unwrap();
        let authorizer = CountingAuthorizer::new(true);
        let (publisher, _subscriber) = snapshot_channel();
        let poller = Poller::new(connector(&dir, &authorizer), PollerConfig::default(), publisher);

        let Err(err) = poller.run().await;

        assert!(matches!(err, PollerError::Authorize(_)), "{err}");
        assert_eq!(err.provider_error().code(), ProviderErrorCode::NetworkError);
        assert_eq!(authorizer.runs(), 1);
    }

    #[tokio::test]
    async fn connect_reuses_the_obtained_token() {
        let dir = tempfile::tempdir().unwrap();
        let authorizer = CountingAuthorizer::new(false);
        let connector = connector(&dir, &authorizer);

        let err = connector.connect().await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::InternalError);

        connector.authorize().await.unwrap();
        connector.connect().await.unwrap();
        connector.connect().await.unwrap();
        assert_eq!(authorizer.runs(), 1);

        connector.reauthorize().await.unwrap();
        connector.connect().await.unwrap();
        assert_eq!(authorizer.runs(), 2);
    }
}
