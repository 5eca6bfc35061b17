//! Session token storage.
//!
//! A token store holds the single bearer credential of one session. It is
//! handed to the client at construction time; there is no process-wide slot.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::TokenResponse;

/// Default token file name within the shelfmark data directory.
pub const TOKEN_FILE: &str = "session.json";

/// Bearer credential for one session.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Advisory only; nothing evicts a token when it passes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Token {
    /// A token with no refresh token or expiry.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
        }
    }

    /// Check whether the advisory expiry has passed.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }

    /// Read the `userName` claim if the access token is a JWT.
    ///
    /// The signature is not checked; this is for display only.
    pub fn user_name_claim(&self) -> Option<String> {
        let payload = self.access_token.split('.').nth(1)?;
        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .ok()?;
        let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
        claims
            .get("userName")
            .and_then(|v| v.as_str())
            .map(str::to_string)
    }
}

impl From<TokenResponse> for Token {
    fn from(response: TokenResponse) -> Self {
        let expires_at = response.access_token_expiry.as_deref().and_then(|raw| {
            DateTime::parse_from_rfc3339(raw)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| tracing::debug!("Ignoring unparseable token expiry {:?}: {}", raw, e))
                .ok()
        });
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_at,
        }
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

// ============================================================================
// TokenStore Trait
// ============================================================================

/// Single-slot storage for the session's token.
pub trait TokenStore: Send + Sync + std::fmt::Debug {
    /// Current token, if any.
    fn token(&self) -> Option<Token>;

    /// Replace the current token.
    fn set_token(&self, token: Token) -> Result<()>;

    /// Remove the current token. Clearing an empty store is not an error.
    fn clear(&self) -> Result<()>;

    /// Check if a token is present.
    fn has_token(&self) -> bool {
        self.token().is_some()
    }
}

/// Token store shared between the client and the services built on it.
pub type SharedTokenStore = Arc<dyn TokenStore>;

// ============================================================================
// MemoryTokenStore
// ============================================================================

/// Token store that lives as long as the process.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    slot: RwLock<Option<Token>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: Token) -> Self {
        Self {
            slot: RwLock::new(Some(token)),
        }
    }

    /// Create a shared, empty in-memory store.
    pub fn shared() -> SharedTokenStore {
        Arc::new(Self::new())
    }
}

impl TokenStore for MemoryTokenStore {
    fn token(&self) -> Option<Token> {
        self.slot.read().clone()
    }

    fn set_token(&self, token: Token) -> Result<()> {
        *self.slot.write() = Some(token);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.slot.write() = None;
        Ok(())
    }
}

// ============================================================================
// FileTokenStore
// ============================================================================

/// Token store persisted to a JSON file, so a session survives restarts.
///
/// The file is read once at construction; afterwards the in-memory copy is
/// authoritative and every write goes through to disk.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    cached: RwLock<Option<Token>>,
}

impl FileTokenStore {
    /// Open the store in a data directory, loading any saved token.
    pub fn new(data_dir: &Path) -> Self {
        Self::with_path(data_dir.join(TOKEN_FILE))
    }

    /// Open the store at an explicit file path.
    pub fn with_path(path: PathBuf) -> Self {
        let cached = match Self::load(&path) {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!("Discarding unreadable session file: {}", e);
                None
            }
        };
        Self {
            path,
            cached: RwLock::new(cached),
        }
    }

    /// Get the token file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(path: &Path) -> Result<Option<Token>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Storage(format!("Failed to read {}: {}", path.display(), e)))?;
        let token = serde_json::from_str(&content)
            .map_err(|e| Error::Storage(format!("Failed to parse {}: {}", path.display(), e)))?;
        Ok(Some(token))
    }
}

impl TokenStore for FileTokenStore {
    fn token(&self) -> Option<Token> {
        self.cached.read().clone()
    }

    fn set_token(&self, token: Token) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::Storage(format!("Failed to create session directory: {}", e))
            })?;
        }

        let json = serde_json::to_string_pretty(&token)
            .map_err(|e| Error::Storage(format!("Failed to serialize token: {}", e)))?;
        std::fs::write(&self.path, json)
            .map_err(|e| Error::Storage(format!("Failed to write session file: {}", e)))?;

        *self.cached.write() = Some(token);
        tracing::debug!("Session saved to {}", self.path.display());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.cached.write() = None;
        if self.path.exists() {
            std::fs::remove_file(&self.path)
                .map_err(|e| Error::Storage(format!("Failed to delete session file: {}", e)))?;
        }
        Ok(())
    }
}
