//! Route protection.
//!
//! A [`RouteGuard`] decides, before a protected view is produced, whether the
//! session is authenticated. It never fails: anything other than a confirmed
//! identity is treated as anonymous.

use serde::{Deserialize, Serialize};

use crate::client::ShelfmarkClient;
use crate::types::CurrentUser;

/// How the guard establishes identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GuardStrategy {
    /// Ask the server (`GET /auth/me`).
    #[default]
    Identity,
    /// Trust a token being present in the session's store.
    TokenPresence,
}

/// Outcome of a guard check.
#[derive(Debug, Clone, PartialEq)]
pub enum Access {
    Authenticated(CurrentUser),
    Anonymous,
}

impl Access {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Access::Authenticated(_))
    }

    pub fn user(&self) -> Option<&CurrentUser> {
        match self {
            Access::Authenticated(user) => Some(user),
            Access::Anonymous => None,
        }
    }
}

/// What to show for a protected route.
#[derive(Debug, Clone, PartialEq)]
pub enum Guarded<T> {
    /// The protected view, rendered for the current user.
    Protected(T),
    /// The unauthenticated shell with a login link.
    LoginRequired,
}

/// Gate for views that require a session.
pub struct RouteGuard {
    client: ShelfmarkClient,
    strategy: GuardStrategy,
}

impl RouteGuard {
    pub fn new(client: ShelfmarkClient, strategy: GuardStrategy) -> Self {
        Self { client, strategy }
    }

    /// Determine whether the session is authenticated.
    pub async fn check(&self) -> Access {
        match self.strategy {
            GuardStrategy::Identity => self.check_identity().await,
            GuardStrategy::TokenPresence => self.check_token(),
        }
    }

    /// Produce the protected view for authenticated users, or the login shell.
    pub async fn render<T, F>(&self, view: F) -> Guarded<T>
    where
        F: FnOnce(&CurrentUser) -> T,
    {
        match self.check().await {
            Access::Authenticated(user) => Guarded::Protected(view(&user)),
            Access::Anonymous => Guarded::LoginRequired,
        }
    }

    async fn check_identity(&self) -> Access {
        // No token means the server can only say no.
        if !self.client.token_store().has_token() {
            return Access::Anonymous;
        }

        match self.client.auth().me().await {
            Ok(user) => Access::Authenticated(user),
            Err(e) if e.is_auth_error() => {
                tracing::debug!("Session not accepted: {}", e);
                Access::Anonymous
            }
            Err(e) => {
                tracing::error!("Failed to verify session, treating as anonymous: {}", e);
                Access::Anonymous
            }
        }
    }

    fn check_token(&self) -> Access {
        match self.client.token_store().token() {
            Some(token) => Access::Authenticated(CurrentUser {
                user_name: token.user_name_claim(),
                ..Default::default()
            }),
            None => Access::Anonymous,
        }
    }
}
