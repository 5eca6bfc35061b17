//! Client-side cache of the user's books.
//!
//! [`Bookshelf`] holds the most recently fetched page and the counts needed
//! for pagination controls. Fetches are numbered as they are issued; a
//! response is only applied if no newer fetch has been issued since, so a
//! slow response for an old page or sort order never overwrites a newer one.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::api::{ImageFile, NewBook};
use crate::client::ShelfmarkClient;
use crate::error::Result;
use crate::types::{Book, BookDraft, BookQuery, PagedResult};

/// Snapshot of the cached page.
#[derive(Debug, Clone, PartialEq)]
pub struct ShelfState {
    pub books: Vec<Book>,
    pub total_count: u64,
    pub total_pages: u32,
    pub current_page: u32,
    pub is_loading: bool,
}

impl Default for ShelfState {
    fn default() -> Self {
        Self {
            books: Vec::new(),
            total_count: 0,
            total_pages: 0,
            current_page: 1,
            is_loading: false,
        }
    }
}

/// Whether a fetch's response made it into the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied,
    /// A newer fetch was issued while this one was in flight.
    Superseded,
}

/// The user's books as last fetched.
pub struct Bookshelf {
    client: ShelfmarkClient,
    state: Mutex<ShelfState>,
    last_query: Mutex<BookQuery>,
    issued: AtomicU64,
}

impl Bookshelf {
    pub fn new(client: ShelfmarkClient) -> Self {
        Self {
            client,
            state: Mutex::new(ShelfState::default()),
            last_query: Mutex::new(BookQuery::default()),
            issued: AtomicU64::new(0),
        }
    }

    /// Copy of the current cache.
    pub fn snapshot(&self) -> ShelfState {
        self.state.lock().clone()
    }

    fn issue(&self) -> u64 {
        self.state.lock().is_loading = true;
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_latest(&self, ticket: u64) -> bool {
        self.issued.load(Ordering::SeqCst) == ticket
    }

    /// Fetch one page and replace the cache with it.
    pub async fn fetch_books(&self, query: BookQuery) -> Result<FetchOutcome> {
        let ticket = self.issue();
        *self.last_query.lock() = query.clone();

        let result = self.client.books().list(&query).await;

        if !self.is_latest(ticket) {
            tracing::debug!(ticket, "Discarding superseded page response");
            return Ok(FetchOutcome::Superseded);
        }

        let mut state = self.state.lock();
        state.is_loading = false;
        match result {
            Ok(page) => {
                apply_page(&mut state, page);
                Ok(FetchOutcome::Applied)
            }
            Err(e) => {
                tracing::error!("Failed to fetch books: {}", e);
                Err(e)
            }
        }
    }

    /// Fetch every book and replace the cached list with it.
    pub async fn fetch_all_books(&self) -> Result<FetchOutcome> {
        let ticket = self.issue();
        let result = self.client.books().all().await;

        if !self.is_latest(ticket) {
            return Ok(FetchOutcome::Superseded);
        }

        let mut state = self.state.lock();
        state.is_loading = false;
        match result {
            Ok(books) => {
                state.books = books;
                Ok(FetchOutcome::Applied)
            }
            Err(e) => {
                tracing::error!("Failed to fetch all books: {}", e);
                Err(e)
            }
        }
    }

    /// Delete a book and drop it from the cache.
    pub async fn delete_book(&self, id: &str) -> Result<()> {
        self.client.books().delete(id).await.inspect_err(|e| {
            tracing::error!("Failed to delete book {}: {}", id, e);
        })?;
        self.state.lock().books.retain(|book| book.id != id);
        Ok(())
    }

    /// Add a book, then refresh the cache with the last query.
    ///
    /// A failed refresh is logged; the created book is still returned.
    pub async fn add_book(&self, book: NewBook) -> Result<Book> {
        let created = self.client.books().create(book).await?;

        let query = self.last_query.lock().clone();
        if let Err(e) = self.fetch_books(query).await {
            tracing::warn!("Book added but refresh failed: {}", e);
        }
        Ok(created)
    }

    /// Recognize book fields in text. Blank text makes no request.
    pub async fn parse_book_text(&self, text: &str) -> Result<Option<BookDraft>> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        self.client.books().parse_text(text).await.map(Some)
    }

    /// Recognize book fields in an image.
    pub async fn parse_book_image(&self, image: ImageFile) -> Result<BookDraft> {
        self.client.books().parse_image(image).await
    }
}

fn apply_page(state: &mut ShelfState, page: PagedResult<Book>) {
    if !page.is_consistent() {
        tracing::warn!(
            page = page.page,
            page_size = page.page_size,
            total_count = page.total_count,
            total_pages = page.total_pages,
            "Server returned an inconsistent page envelope"
        );
    }
    state.total_count = page.total_count;
    state.total_pages = page.total_pages;
    state.current_page = page.page;
    state.books = page.items;
}
