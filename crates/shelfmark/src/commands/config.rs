//! Config command - inspect the resolved configuration.

use anyhow::Result;
use clap::{Args, Subcommand};
use console::{Style, style};

use shelfmark_config::{API_URL_ENV, LoadedConfig};

use super::{Context, print_json};

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the resolved configuration and where it came from
    Show,

    /// Show the user config file path
    Path,
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Path => cmd_path(),
    }
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let loaded = ctx.load_config()?;
    let config = &loaded.config;

    if ctx.json_output {
        return print_json(&serde_json::json!({
            "config": config,
            "sources": loaded.loaded_from(),
            "warnings": loaded.warnings,
            "tokenFile": loaded.token_file().ok(),
        }));
    }

    let dim = Style::new().dim();
    println!("{}", style("Shelfmark Configuration").bold());
    println!("{}", dim.apply_to("─".repeat(50)));

    let sources = loaded.loaded_from();
    if sources.is_empty() {
        println!("{}", dim.apply_to("No config files loaded (using defaults)"));
    } else {
        for path in sources {
            println!("{} {}", dim.apply_to("loaded"), path.display());
        }
    }
    println!();

    println!("{:<14} {}", "api_url", api_url_line(&loaded, ctx));
    println!("{:<14} {}", "auth_mode", enum_name(&config.auth_mode()));
    println!("{:<14} {}s", "timeout", config.timeout().as_secs());
    println!(
        "{:<14} {}",
        "guard",
        enum_name(&config.guard_strategy())
    );
    match loaded.token_file() {
        Ok(path) => println!("{:<14} {}", "session", path.display()),
        Err(e) => println!("{:<14} {}", "session", dim.apply_to(e)),
    }

    if !loaded.warnings.is_empty() {
        let yellow = Style::new().yellow();
        println!();
        for warning in &loaded.warnings {
            println!("{} {}", yellow.apply_to("warning:"), warning);
        }
    }
    Ok(())
}

fn cmd_path() -> Result<()> {
    match shelfmark_config::xdg_config_path() {
        Some(path) => println!("{}", path.display()),
        None => println!("{}", style("No config directory available").dim()),
    }
    Ok(())
}

fn api_url_line(loaded: &LoadedConfig, ctx: &Context) -> String {
    let Some(url) = loaded.config.api_url() else {
        return style("(not set)").red().to_string();
    };
    let origin = if ctx.api_url.is_some() {
        " (from --api-url)".to_string()
    } else if loaded.api_url_from_env {
        format!(" (from {})", API_URL_ENV)
    } else {
        String::new()
    };
    format!("{}{}", url, style(origin).dim())
}

/// Config-file spelling of an enum value.
fn enum_name<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}
