//! OAuth 2.0 authorization code flow with PKCE for a desktop app.
//!
//! 1. Generate a code verifier, its S256 challenge and a random `state`
//! 2. Bind the loopback callback server on the fixed port
//! 3. Open the browser on Google's consent page
//! 4. Wait for exactly one `/callback` request carrying `code` and `state`
//! 5. Exchange the code (with the verifier) for access and refresh tokens
//!
//! The callback server owns its listener and is consumed by the wait, so the
//! port is released on success, error and timeout alike.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng as _;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{ProviderError, ProviderResult};
use crate::source::BoxFuture;

use super::auth::Authorizer;
use super::config::{GoogleConfig, OAuthCredentials};
use super::tokens::TokenInfo;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Redirect path served by the callback server.
pub const CALLBACK_PATH: &str = "/callback";

/// Bytes of entropy in the PKCE verifier, before base64 encoding.
const CODE_VERIFIER_LENGTH: usize = 32;

/// How long a connected browser gets to send its request line.
const REQUEST_READ_TIMEOUT: Duration = Duration::from_secs(5);

const SUCCESS_PAGE: &str = "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nConnection: close\r\n\r\n\
<html><body><h1>meetbar is authorized</h1>\
<p>You can close this window.</p></body></html>";

const FAILURE_PAGE: &str = "HTTP/1.1 400 Bad Request\r\nContent-Type: text/html; charset=utf-8\r\nConnection: close\r\n\r\n\
<html><body><h1>Authorization failed</h1>\
<p>You can close this window and check the meetbar logs.</p></body></html>";

const NOT_FOUND: &str = "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";

/// A successful token refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedToken {
    pub access_token: String,
    pub expires_in: Option<i64>,
    /// Set when Google rotated the refresh token.
    pub refresh_token: Option<String>,
}

/// OAuth client for Google APIs.
#[derive(Debug)]
pub struct OAuthClient {
    credentials: OAuthCredentials,
    scopes: Vec<String>,
    callback_port: u16,
    callback_timeout: Duration,
    http_client: reqwest::Client,
}

impl OAuthClient {
    /// Creates an OAuth client from the provider configuration.
    pub fn new(config: &GoogleConfig) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                ProviderError::internal(format!("failed to create HTTP client: {}", e))
                    .with_source(e)
            })?;

        Ok(Self {
            credentials: config.credentials.clone(),
            scopes: config.scopes.clone(),
            callback_port: config.callback_port,
            callback_timeout: config.callback_timeout,
            http_client,
        })
    }

    /// Runs the interactive flow and returns the obtained token.
    ///
    /// # Errors
    ///
    /// - configuration error if the callback port cannot be bound
    /// - authentication error on timeout, denial, missing code or state mismatch
    /// - network error if the code exchange request fails
    pub async fn authorize(&self) -> ProviderResult<TokenInfo> {
        let pkce = PkceFlow::new();
        let server = CallbackServer::bind(self.callback_port).await?;
        let redirect_uri = server.redirect_uri();
        let auth_url = pkce.build_auth_url(&self.credentials.client_id, &redirect_uri, &self.scopes)?;

        info!("starting OAuth flow, opening browser");
        debug!(url = %auth_url, "authorization URL");

        if let Err(e) = open::that(&auth_url) {
            warn!(error = %e, "failed to open browser");
            eprintln!("\nOpen this URL in your browser to authorize meetbar:\n\n{}\n", auth_url);
        }

        let callback = server.wait(&pkce.state, self.callback_timeout).await?;

        info!("received authorization code, exchanging for token");
        let response = self
            .token_request(
                &[
                    ("client_id", self.credentials.client_id.as_str()),
                    ("client_secret", self.credentials.client_secret.as_str()),
                    ("code", callback.code.as_str()),
                    ("code_verifier", pkce.verifier.as_str()),
                    ("grant_type", "authorization_code"),
                    ("redirect_uri", redirect_uri.as_str()),
                ],
                "token exchange",
            )
            .await?;

        let scopes = response
            .granted_scopes()
            .unwrap_or_else(|| self.scopes.clone());
        info!("obtained OAuth token");
        Ok(TokenInfo::new(
            response.access_token,
            response.refresh_token,
            response.expires_in,
            scopes,
        ))
    }

    /// Mints a new access token from a refresh token.
    ///
    /// A rejected refresh (revoked or expired grant) is an authentication
    /// error; Google-side failures are server errors.
    pub async fn refresh(&self, refresh_token: &str) -> ProviderResult<RefreshedToken> {
        let response = self
            .token_request(
                &[
                    ("client_id", self.credentials.client_id.as_str()),
                    ("client_secret", self.credentials.client_secret.as_str()),
                    ("refresh_token", refresh_token),
                    ("grant_type", "refresh_token"),
                ],
                "token refresh",
            )
            .await?;

        info!("refreshed access token");
        Ok(RefreshedToken {
            access_token: response.access_token,
            expires_in: response.expires_in,
            refresh_token: response.refresh_token,
        })
    }

    async fn token_request(
        &self,
        params: &[(&str, &str)],
        what: &str,
    ) -> ProviderResult<TokenResponse> {
        let response = self
            .http_client
            .post(GOOGLE_TOKEN_URL)
            .form(params)
            .send()
            .await
            .map_err(|e| {
                ProviderError::network(format!("{} request failed: {}", what, e)).with_source(e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ProviderError::network(format!("failed to read {} response: {}", what, e))
                .with_source(e)
        })?;

        if status.is_server_error() {
            return Err(ProviderError::server(format!(
                "{} failed ({}): {}",
                what, status, body
            )));
        }
        if !status.is_success() {
            return Err(ProviderError::authentication(format!(
                "{} rejected ({}): {}",
                what, status, body
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("invalid {} response: {}", what, e))
        })
    }
}

impl Authorizer for OAuthClient {
    fn authorize(&self) -> BoxFuture<'_, ProviderResult<TokenInfo>> {
        Box::pin(OAuthClient::authorize(self))
    }

    fn refresh<'a>(&'a self, refresh_token: &'a str) -> BoxFuture<'a, ProviderResult<RefreshedToken>> {
        Box::pin(OAuthClient::refresh(self, refresh_token))
    }
}

/// Response from Google's token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    /// Space separated list of granted scopes.
    #[serde(default)]
    scope: Option<String>,
}

impl TokenResponse {
    fn granted_scopes(&self) -> Option<Vec<String>> {
        self.scope
            .as_deref()
            .map(|s| s.split_whitespace().map(str::to_string).collect::<Vec<_>>())
            .filter(|scopes| !scopes.is_empty())
    }
}

/// PKCE flow state (RFC 7636).
#[derive(Debug)]
pub struct PkceFlow {
    /// High-entropy random string sent with the code exchange.
    pub verifier: String,
    /// base64url(SHA-256(verifier)).
    pub challenge: String,
    /// Echoed back by Google on the callback.
    pub state: String,
}

impl PkceFlow {
    pub fn new() -> Self {
        let verifier = random_token(CODE_VERIFIER_LENGTH);
        let challenge = Self::compute_challenge(&verifier);
        Self {
            verifier,
            challenge,
            state: random_token(16),
        }
    }

    fn compute_challenge(verifier: &str) -> String {
        URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
    }

    /// Builds the Google consent page URL.
    pub fn build_auth_url(
        &self,
        client_id: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> ProviderResult<String> {
        let scope = scopes.join(" ");
        let url = Url::parse_with_params(
            GOOGLE_AUTH_URL,
            &[
                ("client_id", client_id),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
                ("scope", scope.as_str()),
                ("code_challenge", self.challenge.as_str()),
                ("code_challenge_method", "S256"),
                ("state", self.state.as_str()),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )
        .map_err(|e| ProviderError::internal(format!("invalid authorization URL: {}", e)))?;
        Ok(url.into())
    }
}

impl Default for PkceFlow {
    fn default() -> Self {
        Self::new()
    }
}

fn random_token(len: usize) -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..len).map(|_| rng.random()).collect();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Query parameters of a successful redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: String,
    pub state: Option<String>,
}

/// Loopback HTTP listener for the OAuth redirect.
///
/// The listener is closed when the server is dropped, which [`wait`]
/// guarantees by taking `self`.
///
/// [`wait`]: CallbackServer::wait
#[derive(Debug)]
pub struct CallbackServer {
    listener: TcpListener,
    port: u16,
}

impl CallbackServer {
    /// Binds the loopback listener on `port`.
    pub async fn bind(port: u16) -> ProviderResult<Self> {
        let listener = TcpListener::bind(("127.0.0.1", port)).await.map_err(|e| {
            ProviderError::configuration(format!(
                "cannot listen for the OAuth callback on port {}: {}",
                port, e
            ))
            .with_source(e)
        })?;
        let port = listener.local_addr().map(|a| a.port()).unwrap_or(port);
        debug!(port, "bound OAuth callback server");
        Ok(Self { listener, port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn redirect_uri(&self) -> String {
        format!("http://127.0.0.1:{}{}", self.port, CALLBACK_PATH)
    }

    /// Waits for the callback, then closes the listener.
    ///
    /// Requests to other paths get a 404 and do not end the wait. A callback
    /// whose `state` differs from `expected_state` ends it with an error and
    /// the browser is shown the failure page.
    pub async fn wait(
        self,
        expected_state: &str,
        timeout: Duration,
    ) -> ProviderResult<CallbackParams> {
        let result = tokio::time::timeout(timeout, self.accept_callback(expected_state)).await;
        debug!(port = self.port, "closing OAuth callback server");
        result.unwrap_or_else(|_| {
            Err(ProviderError::authentication(format!(
                "no OAuth callback received within {}s",
                timeout.as_secs()
            )))
        })
    }

    async fn accept_callback(&self, expected_state: &str) -> ProviderResult<CallbackParams> {
        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!(error = %e, "failed to accept callback connection");
                    continue;
                }
            };
            debug!(%peer, "callback connection");
            if let Some(result) = handle_connection(stream, expected_state).await {
                return result;
            }
        }
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    expected_state: &str,
) -> Option<ProviderResult<CallbackParams>> {
    let mut request_line = String::new();
    {
        let mut reader = BufReader::new(&mut stream);
        match tokio::time::timeout(REQUEST_READ_TIMEOUT, reader.read_line(&mut request_line)).await
        {
            Ok(Ok(_)) => {}
            _ => return None,
        }
    }

    let result =
        request_target(&request_line).and_then(|target| parse_callback(target, expected_state));
    let page = match &result {
        None => NOT_FOUND,
        Some(Ok(_)) => SUCCESS_PAGE,
        Some(Err(_)) => FAILURE_PAGE,
    };
    let _ = stream.write_all(page.as_bytes()).await;
    let _ = stream.shutdown().await;
    result
}

/// Extracts the target of a `GET <target> HTTP/1.1` request line.
fn request_target(request_line: &str) -> Option<&str> {
    let mut parts = request_line.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("GET"), Some(target)) => Some(target),
        _ => None,
    }
}

/// Parses a request target; `None` if it is not the callback path.
fn parse_callback(target: &str, expected_state: &str) -> Option<ProviderResult<CallbackParams>> {
    let url = Url::parse(&format!("http://127.0.0.1{}", target)).ok()?;
    if url.path() != CALLBACK_PATH {
        return None;
    }

    let mut code = None;
    let mut state = None;
    let mut error = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Some(Err(ProviderError::authentication(format!(
            "authorization denied: {}",
            error
        ))));
    }

    if state.as_deref() != Some(expected_state) {
        return Some(Err(ProviderError::authentication(
            "OAuth state mismatch, ignoring callback",
        )));
    }

    Some(match code.filter(|c| !c.is_empty()) {
        Some(code) => Ok(CallbackParams { code, state }),
        None => Err(ProviderError::authentication(
            "missing authorization code in callback",
        )),
    })
}
