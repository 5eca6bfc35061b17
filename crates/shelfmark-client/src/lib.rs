//! HTTP client SDK for the Shelfmark book catalog API.
//!
//! This crate provides a typed client for the catalog server plus the
//! session-level services a front-end needs on top of it.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use shelfmark_client::{
//!     AuthMode, AuthService, BookOrderBy, BookQuery, Bookshelf, MemoryTokenStore,
//!     ShelfmarkClient,
//! };
//!
//! # async fn example() -> shelfmark_client::Result<()> {
//! let client = ShelfmarkClient::builder()
//!     .base_url("http://localhost:5000")
//!     .token_store(Arc::new(MemoryTokenStore::new()))
//!     .build()?;
//!
//! let auth = AuthService::new(client.clone(), AuthMode::PasswordOnly);
//! if let Err(e) = auth.login("reader@example.com", "secret").await {
//!     eprintln!("{}", e);
//!     return Ok(());
//! }
//!
//! let shelf = Bookshelf::new(client);
//! shelf
//!     .fetch_books(BookQuery {
//!         page: Some(1),
//!         page_size: Some(20),
//!         order_by: Some(BookOrderBy::Added),
//!         ascending: Some(false),
//!     })
//!     .await?;
//! for book in shelf.snapshot().books {
//!     println!("{}", book.title);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Components
//!
//! - [`token_store`] - single-slot session token storage (memory or file)
//! - [`client`] - request building, bearer auth, error normalization
//! - [`auth`] - password login, OAuth hand-off and code exchange, logout
//! - [`shelf`] - cached, paginated view of the user's books
//! - [`guard`] - authentication gate for protected views

pub mod api;
pub mod auth;
pub mod client;
pub mod error;
pub mod guard;
pub mod shelf;
pub mod token_store;
pub mod types;

pub use api::{ImageFile, NewBook};
pub use auth::{AuthMode, AuthService, AuthState, LoginError, Navigator};
pub use client::{AuthFailure, Body, ClientBuilder, Credentials, ShelfmarkClient};
pub use error::{Error, ProblemDetails, Result};
pub use guard::{Access, GuardStrategy, Guarded, RouteGuard};
pub use shelf::{Bookshelf, FetchOutcome, ShelfState};
pub use token_store::{
    FileTokenStore, MemoryTokenStore, SharedTokenStore, Token, TokenStore,
};
pub use types::*;
