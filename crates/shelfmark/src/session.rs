//! Per-invocation session: resolved config, API client and the auth-failure
//! observer.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use console::Style;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use url::Url;

use shelfmark_client::{
    AuthMode, AuthService, Bookshelf, FileTokenStore, Navigator, RouteGuard, SharedTokenStore,
    ShelfmarkClient,
};
use shelfmark_config::LoadedConfig;

use crate::commands::Context;

/// Everything a command needs to talk to the API.
pub struct Session {
    client: ShelfmarkClient,
    loaded: LoadedConfig,
    observer: JoinHandle<()>,
}

impl Session {
    /// Resolve config layers, open the session file and connect.
    pub fn open(ctx: &Context) -> Result<Self> {
        let loaded = ctx.load_config()?;
        let api_url = loaded.require_api_url()?.to_string();
        let token_file = loaded.token_file()?;
        tracing::debug!(api_url = %api_url, token_file = %token_file.display(), "Opening session");
        if ctx.verbose {
            eprintln!("{}", console::style(format!("Using {}", api_url)).dim());
        }

        let store: SharedTokenStore = Arc::new(FileTokenStore::with_path(token_file));
        let client = ShelfmarkClient::builder()
            .base_url(api_url)
            .token_store(store)
            .timeout(loaded.config.timeout())
            .user_agent(concat!("shelfmark/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create API client")?;

        let observer = spawn_auth_observer(&client);

        Ok(Self {
            client,
            loaded,
            observer,
        })
    }

    pub fn auth_mode(&self) -> AuthMode {
        self.loaded.config.auth_mode()
    }

    pub fn auth(&self) -> AuthService {
        AuthService::new(self.client.clone(), self.auth_mode())
    }

    pub fn guard(&self) -> RouteGuard {
        RouteGuard::new(self.client.clone(), self.loaded.config.guard_strategy())
    }

    pub fn shelf(&self) -> Bookshelf {
        Bookshelf::new(self.client.clone())
    }

    /// Drop the client and wait for the observer to drain pending failures.
    ///
    /// Services handed out by this session must be dropped first, or the
    /// channel stays open and the observer is aborted instead.
    pub async fn close(self) {
        let Self {
            client, observer, ..
        } = self;
        drop(client);

        let abort = observer.abort_handle();
        if tokio::time::timeout(std::time::Duration::from_secs(1), observer)
            .await
            .is_err()
        {
            abort.abort();
        }
    }
}

/// Watch for 401s on authenticated requests and end the local session.
fn spawn_auth_observer(client: &ShelfmarkClient) -> JoinHandle<()> {
    let mut failures = client.subscribe_auth_failures();
    // Only the store: holding a client clone would keep the channel open.
    let store = client.token_store().clone();

    tokio::spawn(async move {
        let mut notified = false;
        loop {
            match failures.recv().await {
                Ok(failure) => {
                    tracing::info!(
                        method = %failure.method,
                        path = %failure.path,
                        "Session rejected by server, clearing it"
                    );
                    if let Err(e) = store.clear() {
                        tracing::warn!("Failed to clear session: {}", e);
                    }
                    if !notified {
                        notified = true;
                        let yellow = Style::new().yellow();
                        eprintln!(
                            "{} Your session has expired. Run 'shelfmark login' to sign in again.",
                            yellow.apply_to("!")
                        );
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Auth failure observer lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

/// Opens provider login pages in the system browser.
pub struct BrowserNavigator;

impl Navigator for BrowserNavigator {
    fn navigate(&self, url: &Url) -> std::io::Result<()> {
        // Always echo the URL so headless sessions can copy it.
        println!("  {}", url);
        if std::env::var_os("SHELFMARK_NO_BROWSER").is_some() {
            return Ok(());
        }
        open::that(url.as_str())
    }
}
