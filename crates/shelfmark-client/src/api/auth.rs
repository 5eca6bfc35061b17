//! Auth API.
//!
//! Login, logout and code exchange are sent without credentials; only
//! `/auth/me` carries the bearer token.

use crate::client::{Body, ShelfmarkClient};
use crate::error::Result;
use crate::types::{
    CodeExchangeRequest, CurrentUser, ExternalProvider, LoginRequest, TokenResponse,
};

/// Auth API client.
pub struct AuthApi {
    client: ShelfmarkClient,
}

impl AuthApi {
    pub(crate) fn new(client: ShelfmarkClient) -> Self {
        Self { client }
    }

    /// Exchange credentials for tokens.
    pub async fn login(&self, request: &LoginRequest) -> Result<TokenResponse> {
        self.client
            .post_anonymous("auth/login", Body::json(request)?)
            .await
    }

    /// Exchange a provider authorization code for tokens.
    pub async fn exchange_code(
        &self,
        provider: ExternalProvider,
        request: &CodeExchangeRequest,
    ) -> Result<TokenResponse> {
        self.client
            .post_anonymous(&format!("auth/{}/exchange", provider), Body::json(request)?)
            .await
    }

    /// End the server-side session.
    pub async fn logout(&self) -> Result<()> {
        self.client.post_anonymous("auth/logout", Body::Empty).await
    }

    /// Identity of the current session.
    pub async fn me(&self) -> Result<CurrentUser> {
        self.client.get("auth/me").await
    }
}
