//! CLI command handlers.

pub mod auth;
pub mod books;
pub mod config;

use anyhow::Result;
use console::Style;
use serde::Serialize;

use shelfmark_config::LoadedConfig;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// API URL from `--api-url`, overriding every config layer.
    pub api_url: Option<String>,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    /// Load config layers and apply the command-line override.
    pub fn load_config(&self) -> Result<LoadedConfig> {
        let mut loaded = shelfmark_config::load_config(None)?;
        for warning in &loaded.warnings {
            tracing::warn!("{}", warning);
        }
        if let Some(url) = self.api_url.as_ref().filter(|u| !u.trim().is_empty()) {
            loaded.config.api_url = Some(url.clone());
        }
        Ok(loaded)
    }
}

/// Pretty-print a value as JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a user-facing error line on stderr.
pub fn print_error(message: impl std::fmt::Display) {
    let red = Style::new().red();
    eprintln!("{} {}", red.apply_to("Error:"), message);
}
