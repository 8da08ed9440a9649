//! Persisted OAuth token.
//!
//! The token lives in one JSON file readable only by the owner. Writes go to a
//! sibling temp file that is renamed over the original, so a crash never leaves
//! a half-written token behind.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};

/// Access tokens are treated as expired this long before Google says so.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// An OAuth token set as persisted on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub access_token: String,

    /// Used to mint new access tokens without user interaction.
    pub refresh_token: Option<String>,

    pub expires_at: Option<DateTime<Utc>>,

    /// Scopes the user granted.
    #[serde(default)]
    pub scopes: Vec<String>,

    /// When the access token was last minted, by the code exchange or a refresh.
    #[serde(default)]
    pub last_refresh: Option<DateTime<Utc>>,
}

impl TokenInfo {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at: expires_in_secs.map(expiry_from_now),
            scopes,
            last_refresh: Some(Utc::now()),
        }
    }

    /// Returns true if the access token is expired or about to expire.
    ///
    /// Tokens without an expiry never expire.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() >= at)
    }

    pub fn has_scopes(&self, required: &[String]) -> bool {
        required.iter().all(|scope| self.scopes.contains(scope))
    }

    /// Replaces the access token after a refresh. The refresh token is kept
    /// unless Google rotated it.
    pub fn refreshed(
        mut self,
        access_token: impl Into<String>,
        expires_in_secs: Option<i64>,
        rotated_refresh_token: Option<String>,
    ) -> Self {
        self.access_token = access_token.into();
        self.expires_at = expires_in_secs.map(expiry_from_now);
        self.last_refresh = Some(Utc::now());
        if rotated_refresh_token.is_some() {
            self.refresh_token = rotated_refresh_token;
        }
        self
    }
}

/// Lifetimes chrono cannot represent count as already expired.
fn expiry_from_now(secs: i64) -> DateTime<Utc> {
    let now = Utc::now();
    TimeDelta::try_seconds(secs.saturating_sub(EXPIRY_MARGIN_SECS))
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .unwrap_or(now)
}

/// File-backed token store with an in-memory copy.
#[derive(Debug)]
pub struct TokenStorage {
    path: PathBuf,
    tokens: RwLock<Option<TokenInfo>>,
}

impl TokenStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            tokens: RwLock::new(None),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<TokenInfo>> {
        self.tokens.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<TokenInfo>> {
        self.tokens.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Loads the token from disk into memory.
    ///
    /// Returns `Ok(false)` when there is no token file yet.
    pub fn load(&self) -> ProviderResult<bool> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no token file");
            return Ok(false);
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            ProviderError::configuration(format!("failed to read token file: {}", e)).with_source(e)
        })?;

        let tokens: TokenInfo = serde_json::from_str(&content).map_err(|e| {
            ProviderError::configuration(format!("failed to parse token file: {}", e))
        })?;

        info!(path = %self.path.display(), "loaded token");
        *self.write() = Some(tokens);
        Ok(true)
    }

    fn save(&self, tokens: &TokenInfo) -> ProviderResult<()> {
        if let Some(parent) = self.path.parent() {
            create_private_dir(parent)?;
        }

        let content = serde_json::to_string_pretty(tokens)
            .map_err(|e| ProviderError::internal(format!("failed to serialize token: {}", e)))?;

        let temp_path = self.path.with_extension("json.tmp");
        write_private_file(&temp_path, content.as_bytes()).map_err(|e| {
            ProviderError::configuration(format!("failed to write token file: {}", e)).with_source(e)
        })?;

        fs::rename(&temp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            ProviderError::configuration(format!("failed to replace token file: {}", e))
                .with_source(e)
        })?;

        debug!(path = %self.path.display(), "saved token");
        Ok(())
    }

    /// Returns a copy of the current token, if any.
    pub fn get(&self) -> Option<TokenInfo> {
        self.read().clone()
    }

    /// Replaces the token and writes it to disk.
    pub fn set(&self, tokens: TokenInfo) -> ProviderResult<()> {
        self.save(&tokens)?;
        *self.write() = Some(tokens);
        Ok(())
    }

    /// Removes the token from memory and disk.
    pub fn clear(&self) -> ProviderResult<()> {
        *self.write() = None;
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| {
                ProviderError::configuration(format!("failed to remove token file: {}", e))
                    .with_source(e)
            })?;
            info!(path = %self.path.display(), "cleared token");
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true when no token is loaded or it lacks a required scope.
    pub fn needs_reauth(&self, required_scopes: &[String]) -> bool {
        match self.read().as_ref() {
            None => true,
            Some(tokens) => !tokens.has_scopes(required_scopes),
        }
    }
}

#[cfg(unix)]
fn create_private_dir(path: &Path) -> ProviderResult<()> {
    use std::os::unix::fs::DirBuilderExt;

    fs::DirBuilder::new()
        .recursive(true)
        .mode(0o700)
        .create(path)
        .map_err(|e| {
            ProviderError::configuration(format!("failed to create token directory: {}", e))
                .with_source(e)
        })
}

#[cfg(not(unix))]
fn create_private_dir(path: &Path) -> ProviderResult<()> {
    fs::create_dir_all(path).map_err(|e| {
        ProviderError::configuration(format!("failed to create token directory: {}", e))
            .with_source(e)
    })
}

fn write_private_file(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(content)?;
    file.sync_all()
}
