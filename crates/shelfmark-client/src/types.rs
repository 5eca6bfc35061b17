//! Request and response types for the Shelfmark API.
//!
//! These types mirror the server's API contract (camelCase on the wire).

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Auth
// ─────────────────────────────────────────────────────────────────────────────

/// Password login request.
///
/// The server accepts either an email address or a user name.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum LoginRequest {
    /// Login by email address.
    Email {
        /// Email address.
        email: String,
        /// Password.
        password: String,
    },
    /// Login by user name.
    #[serde(rename_all = "camelCase")]
    UserName {
        /// User name.
        user_name: String,
        /// Password.
        password: String,
    },
}

impl LoginRequest {
    /// Build a request from whatever the user typed as their identifier.
    ///
    /// Anything containing `@` is treated as an email address.
    pub fn new(identifier: impl Into<String>, password: impl Into<String>) -> Self {
        let identifier = identifier.into();
        let password = password.into();
        if identifier.contains('@') {
            LoginRequest::Email {
                email: identifier,
                password,
            }
        } else {
            LoginRequest::UserName {
                user_name: identifier,
                password,
            }
        }
    }
}

/// External identity providers the server can broker a login with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExternalProvider {
    Google,
    Facebook,
}

impl ExternalProvider {
    /// Path segment used by the server's OAuth routes.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExternalProvider::Google => "google",
            ExternalProvider::Facebook => "facebook",
        }
    }
}

impl std::fmt::Display for ExternalProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExternalProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "google" => Ok(ExternalProvider::Google),
            "facebook" => Ok(ExternalProvider::Facebook),
            other => Err(format!("unknown provider '{}' (expected google or facebook)", other)),
        }
    }
}

/// OAuth authorization-code exchange request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeExchangeRequest {
    /// Authorization code returned by the provider.
    pub code: String,
    /// Redirect URI the code was issued for.
    pub redirect_uri: String,
}

/// Tokens issued by login and code exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    /// Bearer access token.
    pub access_token: String,
    /// Refresh token, if the server issued one.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Access token expiry (ISO 8601).
    #[serde(default)]
    pub access_token_expiry: Option<String>,
}

/// Identity returned by `/auth/me`.
///
/// Different server versions fill different fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl CurrentUser {
    /// Best available name to show for this user.
    pub fn display_name(&self) -> &str {
        self.user_name
            .as_deref()
            .or(self.name.as_deref())
            .or(self.email.as_deref())
            .unwrap_or("")
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Books
// ─────────────────────────────────────────────────────────────────────────────

/// A book in the user's catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authors: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    pub created_date: String,
    pub user_id: String,
}

/// Partial book recognized by the parse endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authors: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
}

/// Request to parse free text into book fields.
#[derive(Debug, Clone, Serialize)]
pub struct ParseTextRequest {
    pub text: String,
}

/// Sort key for book listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookOrderBy {
    Title,
    Author,
    Published,
    Added,
}

impl BookOrderBy {
    /// Wire name of the sort key.
    pub fn as_str(&self) -> &'static str {
        match self {
            BookOrderBy::Title => "Title",
            BookOrderBy::Author => "Author",
            BookOrderBy::Published => "Published",
            BookOrderBy::Added => "Added",
        }
    }
}

impl std::str::FromStr for BookOrderBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "title" => Ok(BookOrderBy::Title),
            "author" => Ok(BookOrderBy::Author),
            "published" => Ok(BookOrderBy::Published),
            "added" => Ok(BookOrderBy::Added),
            other => Err(format!(
                "unknown sort key '{}' (expected title, author, published or added)",
                other
            )),
        }
    }
}

/// Query parameters for listing books. Unset fields are left out of the URL.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<BookOrderBy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ascending: Option<bool>,
}

/// Server-computed pagination envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

impl<T> PagedResult<T> {
    /// Check the envelope's pagination invariants.
    pub fn is_consistent(&self) -> bool {
        if self.page < 1 || self.items.len() > self.page_size as usize {
            return false;
        }
        if self.page_size == 0 {
            return self.total_count == 0 && self.total_pages == 0;
        }
        u64::from(self.total_pages) == self.total_count.div_ceil(u64::from(self.page_size))
    }

    /// Whether a page after this one exists.
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}
