//! API endpoint implementations.

mod auth;
mod books;

pub use auth::AuthApi;
pub use books::{BooksApi, ImageFile, NewBook};
