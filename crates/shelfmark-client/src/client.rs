//! Main client implementation.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use url::Url;

use crate::api::{AuthApi, BooksApi};
use crate::error::{Error, ProblemDetails, Result};
use crate::token_store::{MemoryTokenStore, SharedTokenStore};

/// Default timeout for requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Capacity of the auth-failure channel. Slow observers only miss duplicates.
const AUTH_FAILURE_CAPACITY: usize = 16;

/// Request body variants.
#[derive(Debug, Default)]
pub enum Body {
    /// No body.
    #[default]
    Empty,
    /// Pre-encoded JSON; sent with `Content-Type: application/json`.
    Json(String),
    /// Multipart form; the transport sets the content type and boundary.
    Multipart(reqwest::multipart::Form),
}

impl Body {
    /// Encode a value as a JSON body.
    pub fn json<B: serde::Serialize + ?Sized>(value: &B) -> Result<Self> {
        Ok(Body::Json(serde_json::to_string(value)?))
    }
}

/// Whether a request carries the session's bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credentials {
    /// Attach `Authorization: Bearer <token>` when a token exists.
    Bearer,
    /// Never attach credentials.
    Anonymous,
}

/// Published when an authenticated request is rejected with 401.
///
/// The client only reports; what to do about it (clear the session, send the
/// user to the login screen) is up to whoever subscribes.
#[derive(Debug, Clone)]
pub struct AuthFailure {
    /// HTTP method of the rejected request.
    pub method: Method,
    /// API path of the rejected request.
    pub path: String,
    /// Problem document returned with the 401.
    pub problem: ProblemDetails,
}

/// Shelfmark API client.
///
/// Cheap to clone; clones share the HTTP connection pool, the cookie jar and
/// the session's token store.
///
/// # Example
///
/// ```no_run
/// use shelfmark_client::{BookQuery, ShelfmarkClient};
///
/// # async fn example() -> shelfmark_client::Result<()> {
/// let client = ShelfmarkClient::builder()
///     .base_url("http://localhost:5000")
///     .build()?;
///
/// let page = client.books().list(&BookQuery::default()).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ShelfmarkClient {
    inner: Arc<ClientInner>,
}

/// Inner client state (shared across clones).
pub(crate) struct ClientInner {
    /// HTTP client.
    pub(crate) http: reqwest::Client,
    /// Base URL for API requests.
    pub(crate) base_url: Url,
    /// Request timeout.
    pub(crate) timeout: Duration,
    /// Session token slot.
    pub(crate) tokens: SharedTokenStore,
    /// Auth failure notifications.
    pub(crate) auth_failures: broadcast::Sender<AuthFailure>,
}

impl std::fmt::Debug for ShelfmarkClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShelfmarkClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("timeout", &self.inner.timeout)
            .finish_non_exhaustive()
    }
}

impl ShelfmarkClient {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// The session's token store.
    pub fn token_store(&self) -> &SharedTokenStore {
        &self.inner.tokens
    }

    /// Subscribe to auth-failure notifications.
    pub fn subscribe_auth_failures(&self) -> broadcast::Receiver<AuthFailure> {
        self.inner.auth_failures.subscribe()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // API accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Access the auth endpoints.
    pub fn auth(&self) -> AuthApi {
        AuthApi::new(self.clone())
    }

    /// Access the books endpoints.
    pub fn books(&self) -> BooksApi {
        BooksApi::new(self.clone())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // HTTP methods
    // ─────────────────────────────────────────────────────────────────────────

    /// Build a URL for an API path.
    pub fn url(&self, path: &str) -> Result<Url> {
        let path = path.trim_start_matches('/');
        self.inner.base_url.join(path).map_err(Error::from)
    }

    /// Make an authenticated GET request.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let builder = self.request(Method::GET, path, Credentials::Bearer)?;
        self.execute(builder, Method::GET, path, Credentials::Bearer)
            .await
    }

    /// Make an authenticated GET request with query parameters.
    pub async fn get_with_query<T, Q>(&self, path: &str, query: &Q) -> Result<T>
    where
        T: DeserializeOwned,
        Q: serde::Serialize + ?Sized,
    {
        let builder = self.request(Method::GET, path, Credentials::Bearer)?.query(query);
        self.execute(builder, Method::GET, path, Credentials::Bearer)
            .await
    }

    /// Make an authenticated POST request.
    pub async fn post<T: DeserializeOwned>(&self, path: &str, body: Body) -> Result<T> {
        self.send(Method::POST, path, body, Credentials::Bearer).await
    }

    /// Make a POST request without credentials.
    pub async fn post_anonymous<T: DeserializeOwned>(&self, path: &str, body: Body) -> Result<T> {
        self.send(Method::POST, path, body, Credentials::Anonymous).await
    }

    /// Make an authenticated PUT request.
    pub async fn put<T: DeserializeOwned>(&self, path: &str, body: Body) -> Result<T> {
        self.send(Method::PUT, path, body, Credentials::Bearer).await
    }

    /// Make an authenticated DELETE request.
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(Method::DELETE, path, Body::Empty, Credentials::Bearer)
            .await
    }

    /// Send a request with an explicit body and credentials mode.
    pub async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Body,
        credentials: Credentials,
    ) -> Result<T> {
        let builder = match body {
            Body::Empty => self.request(method.clone(), path, credentials)?,
            Body::Json(json) => self
                .request(method.clone(), path, credentials)?
                .header(CONTENT_TYPE, "application/json")
                .body(json),
            Body::Multipart(form) => self.request(method.clone(), path, credentials)?.multipart(form),
        };
        self.execute(builder, method, path, credentials).await
    }

    /// Start a request with the common headers and, if allowed, the bearer token.
    fn request(&self, method: Method, path: &str, credentials: Credentials) -> Result<RequestBuilder> {
        let url = self.url(path)?;
        let mut builder = self
            .inner
            .http
            .request(method, url)
            .timeout(self.inner.timeout)
            .header(ACCEPT, "application/json");

        if credentials == Credentials::Bearer
            && let Some(token) = self.inner.tokens.token()
        {
            builder = builder.bearer_auth(&token.access_token);
        }

        Ok(builder)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        method: Method,
        path: &str,
        credentials: Credentials,
    ) -> Result<T> {
        tracing::debug!(%method, path, ?credentials, "Sending request");

        let response = builder.send().await.map_err(|e| {
            tracing::warn!(%method, path, "Request failed: {}", e);
            Error::from(e)
        })?;

        self.handle_response(response, method, path, credentials).await
    }

    /// Handle a response, extracting the body or error.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
        method: Method,
        path: &str,
        credentials: Credentials,
    ) -> Result<T> {
        let status = response.status();
        tracing::debug!(%method, path, status = status.as_u16(), "Received response");

        if status.is_success() {
            return decode_success(response).await;
        }

        let problem = extract_problem(response).await;

        if status == StatusCode::UNAUTHORIZED && credentials == Credentials::Bearer {
            tracing::info!(%method, path, "Session rejected by server");
            // No subscribers is fine; the error is still returned.
            let _ = self.inner.auth_failures.send(AuthFailure {
                method,
                path: path.to_string(),
                problem: problem.clone(),
            });
            return Err(Error::AuthExpired(problem));
        }

        Err(Error::Api {
            status: status.as_u16(),
            problem,
        })
    }
}

/// Decode a 2xx body. 204 and empty bodies decode from JSON `null`.
async fn decode_success<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let bytes = if response.status() == StatusCode::NO_CONTENT {
        Default::default()
    } else {
        response.bytes().await?
    };

    let decoded = if bytes.is_empty() {
        serde_json::from_value(serde_json::Value::Null)
    } else {
        serde_json::from_slice(&bytes)
    };

    decoded.map_err(|e| Error::Network(ProblemDetails::network(e.to_string())))
}

/// Extract a problem document from a failed response.
///
/// Any JSON object is kept as sent, even with members missing. Only a body
/// that is not a JSON object gets a synthesized `UnknownError`.
async fn extract_problem(response: reqwest::Response) -> ProblemDetails {
    let status = response.status();
    let fallback = || ProblemDetails::unknown(status.as_u16(), status.canonical_reason());

    match response.bytes().await {
        Ok(bytes) => serde_json::from_slice::<ProblemDetails>(&bytes).unwrap_or_else(|_| fallback()),
        Err(e) => {
            tracing::debug!("Failed to read error body: {}", e);
            fallback()
        }
    }
}

/// Builder for creating a ShelfmarkClient.
#[derive(Debug)]
pub struct ClientBuilder {
    base_url: Option<String>,
    tokens: Option<SharedTokenStore>,
    timeout: Duration,
    user_agent: Option<String>,
}

impl ClientBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            base_url: None,
            tokens: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
        }
    }

    /// Set the base URL of the API.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the session's token store. Defaults to an empty in-memory store.
    pub fn token_store(mut self, store: SharedTokenStore) -> Self {
        self.tokens = Some(store);
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<ShelfmarkClient> {
        let base_url = self
            .base_url
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| Error::Config("base_url is required".to_string()))?;

        // Parse and normalize base URL so relative joins keep its path
        let mut base_url = Url::parse(base_url.trim())?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!("'{}' cannot be an API base", base_url)));
        }
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("shelfmark-client/{}", env!("CARGO_PKG_VERSION")));

        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .cookie_store(true)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        let (auth_failures, _) = broadcast::channel(AUTH_FAILURE_CAPACITY);

        Ok(ShelfmarkClient {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                timeout: self.timeout,
                tokens: self.tokens.unwrap_or_else(MemoryTokenStore::shared),
                auth_failures,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
