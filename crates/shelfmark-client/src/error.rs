//! Client error types.
//!
//! Every failure that reaches the server side of the wire is normalized into
//! a [`ProblemDetails`] document, whether the server sent one or not.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Problem type used when the server's error body is not a problem document.
pub const UNKNOWN_ERROR: &str = "UnknownError";

/// Problem type used when no response was received.
pub const NETWORK_ERROR: &str = "NetworkError";

/// Message shown to users for failures that carry no API title.
pub const GENERIC_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// RFC 7807 error payload returned by the API on every non-2xx response.
///
/// Every member is optional on the wire. Absent members stay absent when the
/// document is serialized again, so a server body round-trips unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemDetails {
    /// Short human-readable summary.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    /// HTTP status code, 0 if the server omitted it.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub status: u16,
    /// Problem type identifier.
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    /// Human-readable explanation specific to this occurrence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// URI reference identifying this occurrence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    /// Extension members (validation errors, trace ids, ...).
    #[serde(flatten)]
    pub extensions: serde_json::Map<String, serde_json::Value>,
}

fn is_zero(status: &u16) -> bool {
    *status == 0
}

impl ProblemDetails {
    /// Create a problem document with only the required members.
    pub fn new(title: impl Into<String>, status: u16, kind: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            status,
            kind: kind.into(),
            detail: None,
            instance: None,
            extensions: serde_json::Map::new(),
        }
    }

    /// Synthesize a problem for an error response whose body could not be parsed.
    ///
    /// The title is the HTTP reason phrase, or "Request failed" if there is none.
    pub fn unknown(status: u16, status_text: Option<&str>) -> Self {
        let title = status_text
            .filter(|s| !s.is_empty())
            .unwrap_or("Request failed");
        Self::new(title, status, UNKNOWN_ERROR)
    }

    /// Synthesize a problem for a transport failure. The status is always 500.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(message, 500, NETWORK_ERROR)
    }

    /// The title, unless the server left it out.
    pub fn title(&self) -> Option<&str> {
        Some(self.title.as_str()).filter(|t| !t.trim().is_empty())
    }
}

/// Client error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Input was rejected locally before any request was made.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Server rejected the request.
    #[error("API error ({status}): {}", .problem.title)]
    Api {
        /// HTTP status code.
        status: u16,
        /// Problem document from the server, or a synthesized one.
        problem: ProblemDetails,
    },

    /// No usable response was received.
    #[error("Network error: {}", .0.title)]
    Network(ProblemDetails),

    /// An authenticated request came back 401; the session is over.
    #[error("Session expired: {}", .0.title)]
    AuthExpired(ProblemDetails),

    /// JSON serialization of a request body failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Token storage failed.
    #[error("Token storage error: {0}")]
    Storage(String),
}

impl Error {
    /// HTTP status associated with this error, if it came from the wire.
    ///
    /// Network failures report 500.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::Network(problem) => Some(problem.status),
            Error::AuthExpired(_) => Some(401),
            _ => None,
        }
    }

    /// The problem document carried by this error, if any.
    pub fn problem_details(&self) -> Option<&ProblemDetails> {
        match self {
            Error::Api { problem, .. } | Error::Network(problem) | Error::AuthExpired(problem) => {
                Some(problem)
            }
            _ => None,
        }
    }

    /// Message suitable for showing to a user.
    ///
    /// API-shaped errors surface their problem title; validation errors their
    /// message; everything else a generic fallback.
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation(message) => message.clone(),
            other => other
                .problem_details()
                .and_then(ProblemDetails::title)
                .unwrap_or(GENERIC_ERROR_MESSAGE)
                .to_string(),
        }
    }

    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Api { status: 404, .. })
    }

    /// Check if this is an authentication error.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Error::AuthExpired(_)) || matches!(self, Error::Api { status: 401, .. })
    }

    /// Check if this is a transport failure.
    pub fn is_network_error(&self) -> bool {
        matches!(self, Error::Network(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Network(ProblemDetails::network(e.to_string()))
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;
