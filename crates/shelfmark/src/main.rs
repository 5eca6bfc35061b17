//! Shelfmark - personal book catalog from the command line.
//!
//! Main entry point for the Shelfmark CLI.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod session;

use commands::{auth, books, config};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Shelfmark - personal book catalog
#[derive(Parser)]
#[command(name = "shelfmark")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Catalog API base URL (overrides config and SHELFMARK_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in with a password, an external provider, or an authorization code
    Login(auth::LoginArgs),

    /// Sign out and forget the saved session
    Logout,

    /// Show who is signed in
    Whoami,

    /// Manage your books
    Books(books::BooksArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Console (human-readable) + rotating JSON file
    let filter = if cli.verbose {
        "shelfmark=debug,shelfmark_client=debug,shelfmark_config=debug,warn"
    } else {
        "shelfmark=warn,shelfmark_client=warn,shelfmark_config=warn,error"
    };

    let log_dir = shelfmark_config::log_dir().unwrap_or_else(|| std::path::PathBuf::from("logs"));
    let file_appender = tracing_appender::rolling::daily(&log_dir, "shelfmark.log");
    let (non_blocking, log_guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(cli.verbose)
                .with_writer(std::io::stderr)
                .with_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "shelfmark=debug,shelfmark_client=debug,shelfmark_config=debug,info",
                )),
        )
        .init();

    let ctx = commands::Context {
        api_url: cli.api_url,
        json_output: cli.json,
        verbose: cli.verbose,
    };

    let result = match cli.command {
        Commands::Login(args) => auth::login(args, &ctx).await,
        Commands::Logout => auth::logout(&ctx).await,
        Commands::Whoami => auth::whoami(&ctx).await,
        Commands::Books(args) => books::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    };

    if let Err(e) = result {
        tracing::debug!("Command failed: {:?}", e);
        commands::print_error(format!("{:#}", e));
        drop(log_guard);
        std::process::exit(1);
    }
    Ok(())
}
