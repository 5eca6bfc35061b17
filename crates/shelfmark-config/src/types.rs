//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! api_url = "https://books.example.com/api"
//! auth_mode = "oauth-enabled"      # or "password-only"
//! timeout_secs = 30
//!
//! [session]
//! token_file = "~/.config/shelfmark/session.json"
//!
//! [guard]
//! strategy = "identity"            # or "token-presence"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use shelfmark_client::{AuthMode, GuardStrategy};

/// Default request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All fields are optional so that partial configs (e.g., project-local
/// overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShelfmarkConfig {
    /// Base URL of the catalog API.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Which login flows are offered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_mode: Option<AuthMode>,

    /// Request timeout in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Session persistence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionConfig>,

    /// Route protection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guard: Option<GuardConfig>,
}

impl ShelfmarkConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> crate::Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> crate::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    pub fn merge(&mut self, other: ShelfmarkConfig) {
        if other.api_url.is_some() {
            self.api_url = other.api_url;
        }
        if other.auth_mode.is_some() {
            self.auth_mode = other.auth_mode;
        }
        if other.timeout_secs.is_some() {
            self.timeout_secs = other.timeout_secs;
        }
        if let Some(session) = other.session {
            let merged = self.session.get_or_insert_with(SessionConfig::default);
            if session.token_file.is_some() {
                merged.token_file = session.token_file;
            }
        }
        if let Some(guard) = other.guard {
            let merged = self.guard.get_or_insert_with(GuardConfig::default);
            if guard.strategy.is_some() {
                merged.strategy = guard.strategy;
            }
        }
    }

    /// Configured API base URL, ignoring blank values.
    pub fn api_url(&self) -> Option<&str> {
        self.api_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    pub fn auth_mode(&self) -> AuthMode {
        self.auth_mode.unwrap_or_default()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub fn guard_strategy(&self) -> GuardStrategy {
        self.guard
            .as_ref()
            .and_then(|g| g.strategy)
            .unwrap_or_default()
    }

    /// Explicitly configured session file, if any.
    pub fn token_file(&self) -> Option<PathBuf> {
        self.session.as_ref().and_then(|s| s.token_file.clone())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sections
// ─────────────────────────────────────────────────────────────────────────────

/// Session persistence settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Where the session token is saved. Defaults to `session.json` in the
    /// config directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_file: Option<PathBuf>,
}

/// Route guard settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<GuardStrategy>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config = ShelfmarkConfig::from_toml(
            r#"
api_url = "https://books.example.com/api"
auth_mode = "password-only"
timeout_secs = 5

[session]
token_file = "/tmp/shelfmark/session.json"

[guard]
strategy = "token-presence"
"#,
        )
        .unwrap();

        assert_eq!(config.api_url(), Some("https://books.example.com/api"));
        assert_eq!(config.auth_mode(), AuthMode::PasswordOnly);
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.guard_strategy(), GuardStrategy::TokenPresence);
        assert_eq!(
            config.token_file(),
            Some(PathBuf::from("/tmp/shelfmark/session.json"))
        );
    }

    #[test]
    fn test_defaults() {
        let config = ShelfmarkConfig::from_toml("").unwrap();
        assert!(config.api_url().is_none());
        assert_eq!(config.auth_mode(), AuthMode::OauthEnabled);
        assert_eq!(config.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(config.guard_strategy(), GuardStrategy::Identity);
        assert!(config.token_file().is_none());
    }

    #[test]
    fn test_blank_api_url_is_unset() {
        let config = ShelfmarkConfig::from_toml(r#"api_url = "  ""#).unwrap();
        assert!(config.api_url().is_none());
    }

    #[test]
    fn test_merge_overrides_only_set_fields() {
        let mut base = ShelfmarkConfig::from_toml(
            r#"
api_url = "https://base.example.com"
timeout_secs = 10

[guard]
strategy = "token-presence"
"#,
        )
        .unwrap();
        let overlay = ShelfmarkConfig::from_toml(
            r#"
api_url = "http://localhost:5000"

[session]
token_file = "session.json"
"#,
        )
        .unwrap();

        base.merge(overlay);
        assert_eq!(base.api_url(), Some("http://localhost:5000"));
        assert_eq!(base.timeout(), Duration::from_secs(10));
        assert_eq!(base.guard_strategy(), GuardStrategy::TokenPresence);
        assert_eq!(base.token_file(), Some(PathBuf::from("session.json")));
    }

    #[test]
    fn test_toml_roundtrip_skips_unset() {
        let config = ShelfmarkConfig {
            api_url: Some("http://localhost:5000".to_string()),
            ..Default::default()
        };
        let toml = config.to_toml().unwrap();
        assert_eq!(toml.trim(), r#"api_url = "http://localhost:5000""#);
    }

    #[test]
    fn test_unknown_auth_mode_rejected() {
        assert!(ShelfmarkConfig::from_toml(r#"auth_mode = "magic-link""#).is_err());
    }
}
