//! Authentication flows.
//!
//! [`AuthService`] drives the session through
//! `Anonymous → Authenticating → Authenticated` for password login and
//! OAuth code exchange, hands external-provider logins off to a
//! [`Navigator`], and tears the session down on logout.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::client::ShelfmarkClient;
use crate::error::{Error, GENERIC_ERROR_MESSAGE, Result};
use crate::token_store::{SharedTokenStore, Token};
use crate::types::{CodeExchangeRequest, ExternalProvider, LoginRequest, TokenResponse};

/// Which login flows the deployment offers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthMode {
    /// Email/user name and password only.
    PasswordOnly,
    /// Password plus external providers.
    #[default]
    OauthEnabled,
}

/// Where the session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Anonymous,
    Authenticating,
    Authenticated,
}

/// A login attempt failed. Displays as the message to show the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct LoginError {
    pub message: String,
    /// HTTP status, when the server answered.
    pub status: Option<u16>,
}

impl From<Error> for LoginError {
    fn from(e: Error) -> Self {
        let message = match &e {
            Error::Api { problem, .. } | Error::Network(problem) => problem
                .title()
                .unwrap_or(GENERIC_ERROR_MESSAGE)
                .to_string(),
            Error::Validation(message) => message.clone(),
            _ => GENERIC_ERROR_MESSAGE.to_string(),
        };
        Self {
            message,
            status: e.status(),
        }
    }
}

/// Hands a URL to whatever can leave the application for it (a browser).
pub trait Navigator: Send + Sync {
    fn navigate(&self, url: &Url) -> std::io::Result<()>;
}

/// Build the server's OAuth entry point for a provider.
///
/// Returns `None` when no API base is configured or the result is not a
/// valid URL.
pub fn external_login_url(
    api_base: &str,
    provider: ExternalProvider,
    return_path: &str,
) -> Option<Url> {
    let base = api_base.trim().trim_end_matches('/');
    if base.is_empty() {
        return None;
    }
    let mut target = Url::parse(&format!("{}/auth/{}", base, provider)).ok()?;
    target
        .query_pairs_mut()
        .append_pair("returnUrl", return_path);
    Some(target)
}

/// Send the user to the server's OAuth flow for `provider`.
///
/// This is a full hand-off: control returns to the app only through the
/// server's redirect. Returns `false`, without navigating, when the API base
/// is not configured; also `false` when the navigator fails.
pub fn start_external_login(
    api_base: &str,
    provider: ExternalProvider,
    return_path: &str,
    navigator: &dyn Navigator,
) -> bool {
    let Some(target) = external_login_url(api_base, provider, return_path) else {
        tracing::error!("API base URL is not configured; cannot start {} login", provider);
        return false;
    };

    match navigator.navigate(&target) {
        Ok(()) => {
            tracing::info!(%provider, "Handed off to external login");
            true
        }
        Err(e) => {
            tracing::error!("Failed to initiate {} login: {}", provider, e);
            false
        }
    }
}

/// Login, logout and external-provider flows for one session.
pub struct AuthService {
    client: ShelfmarkClient,
    mode: AuthMode,
    state: Mutex<AuthState>,
    last_error: Mutex<Option<String>>,
}

impl AuthService {
    /// Create a service over the client's session.
    ///
    /// Starts authenticated if the session's store already holds a token.
    pub fn new(client: ShelfmarkClient, mode: AuthMode) -> Self {
        let state = if client.token_store().has_token() {
            AuthState::Authenticated
        } else {
            AuthState::Anonymous
        };
        Self {
            client,
            mode,
            state: Mutex::new(state),
            last_error: Mutex::new(None),
        }
    }

    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    pub fn state(&self) -> AuthState {
        *self.state.lock()
    }

    /// Message from the most recent failed login, cleared on success.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }

    fn store(&self) -> &SharedTokenStore {
        self.client.token_store()
    }

    /// Log in with an email address or user name and a password.
    pub async fn login(&self, identifier: &str, password: &str) -> std::result::Result<(), LoginError> {
        let request = LoginRequest::new(identifier, password);
        let api = self.client.auth();
        self.complete_login(api.login(&request)).await
    }

    /// Finish an OAuth login by exchanging the provider's authorization code.
    pub async fn oauth_login(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> std::result::Result<(), LoginError> {
        if self.mode == AuthMode::PasswordOnly {
            return Err(LoginError::from(Error::Config(
                "external login is disabled".to_string(),
            )));
        }
        let request = CodeExchangeRequest {
            code: code.to_string(),
            redirect_uri: redirect_uri.to_string(),
        };
        let api = self.client.auth();
        self.complete_login(api.exchange_code(ExternalProvider::Google, &request))
            .await
    }

    /// Start an external-provider login against this client's API base.
    pub fn start_external_login(
        &self,
        provider: ExternalProvider,
        return_path: &str,
        navigator: &dyn Navigator,
    ) -> bool {
        if self.mode == AuthMode::PasswordOnly {
            tracing::warn!("External login requested but only password login is enabled");
            return false;
        }
        start_external_login(self.client.base_url().as_str(), provider, return_path, navigator)
    }

    /// End the session. Never fails: the local session is cleared even when
    /// the server cannot be reached.
    pub async fn logout(&self) {
        if let Err(e) = self.client.auth().logout().await {
            tracing::warn!("Logout request failed: {}", e);
        }
        if let Err(e) = self.store().clear() {
            tracing::error!("Failed to clear session: {}", e);
        }
        *self.state.lock() = AuthState::Anonymous;
        tracing::info!("Logged out");
    }

    /// Forget the session locally without telling the server.
    ///
    /// Used when the server has already rejected the token.
    pub fn expire(&self) -> Result<()> {
        let result = self.store().clear();
        *self.state.lock() = AuthState::Anonymous;
        result
    }

    async fn complete_login(
        &self,
        exchange: impl std::future::Future<Output = Result<TokenResponse>>,
    ) -> std::result::Result<(), LoginError> {
        *self.state.lock() = AuthState::Authenticating;

        let outcome = match exchange.await {
            Ok(tokens) => self.store().set_token(Token::from(tokens)),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => {
                *self.state.lock() = AuthState::Authenticated;
                *self.last_error.lock() = None;
                tracing::info!("Logged in");
                Ok(())
            }
            Err(e) => {
                tracing::debug!("Login failed: {}", e);
                let error = LoginError::from(e);
                *self.state.lock() = if self.store().has_token() {
                    AuthState::Authenticated
                } else {
                    AuthState::Anonymous
                };
                *self.last_error.lock() = Some(error.message.clone());
                Err(error)
            }
        }
    }
}
