//! Login, logout and whoami.

use std::io::{BufRead, Write};

use anyhow::{Context as _, Result, bail};
use clap::Args;
use console::{Style, style};

use shelfmark_client::{ExternalProvider, FileTokenStore, Guarded, TokenStore};

use super::{Context, print_json};
use crate::session::{BrowserNavigator, Session};

/// Arguments for the login command.
#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Email address or user name
    #[arg(short, long)]
    pub user: Option<String>,

    /// Sign in through an external provider (google, facebook)
    #[arg(long, conflicts_with_all = ["user", "code"])]
    pub provider: Option<ExternalProvider>,

    /// Path to return to after the provider login
    #[arg(long, default_value = "/", requires = "provider")]
    pub return_path: String,

    /// Authorization code from a completed provider login
    #[arg(long, requires = "redirect_uri", conflicts_with = "user")]
    pub code: Option<String>,

    /// Redirect URI the authorization code was issued for
    #[arg(long, requires = "code")]
    pub redirect_uri: Option<String>,
}

/// Run the login command.
pub async fn login(args: LoginArgs, ctx: &Context) -> Result<()> {
    let session = Session::open(ctx)?;
    let result = run_login(args, &session, ctx).await;
    session.close().await;
    result
}

async fn run_login(args: LoginArgs, session: &Session, ctx: &Context) -> Result<()> {
    let auth = session.auth();
    let green = Style::new().green();

    if let Some(provider) = args.provider {
        println!("Opening {} sign-in in your browser:", provider);
        if !auth.start_external_login(provider, &args.return_path, &BrowserNavigator) {
            bail!("{} sign-in is not available", provider);
        }
        println!();
        println!(
            "{}",
            style("After signing in, finish with: shelfmark login --code <CODE> --redirect-uri <URI>")
                .dim()
        );
        return Ok(());
    }

    let outcome = match (args.code, args.redirect_uri) {
        (Some(code), Some(redirect_uri)) => auth.oauth_login(&code, &redirect_uri).await,
        _ => {
            let identifier = match args.user {
                Some(user) => user,
                None => prompt_line("Email or user name: ")?,
            };
            let password = rpassword::prompt_password("Password: ")?;
            auth.login(&identifier, &password).await
        }
    };

    if let Err(e) = outcome {
        bail!(e);
    }

    if ctx.json_output {
        print_json(&serde_json::json!({ "authenticated": true }))?;
    } else {
        println!("{} Signed in", green.apply_to("✓"));
    }
    Ok(())
}

/// Run the logout command.
pub async fn logout(ctx: &Context) -> Result<()> {
    let loaded = ctx.load_config()?;
    if loaded.config.api_url().is_none() {
        // Nothing to tell the server; just forget the local session.
        let token_file = loaded.token_file()?;
        tracing::debug!(token_file = %token_file.display(), "No API URL, clearing session locally");
        FileTokenStore::with_path(token_file)
            .clear()
            .context("Failed to clear session")?;
    } else {
        let session = Session::open(ctx)?;
        session.auth().logout().await;
        session.close().await;
    }

    if ctx.json_output {
        print_json(&serde_json::json!({ "authenticated": false }))?;
    } else {
        let green = Style::new().green();
        println!("{} Signed out", green.apply_to("✓"));
    }
    Ok(())
}

/// Run the whoami command.
pub async fn whoami(ctx: &Context) -> Result<()> {
    let session = Session::open(ctx)?;
    let view = session.guard().render(|user| user.clone()).await;
    session.close().await;

    match view {
        Guarded::Protected(user) => {
            if ctx.json_output {
                print_json(&serde_json::json!({ "authenticated": true, "user": user }))?;
            } else {
                println!("{}", style(user.display_name()).bold());
                if let Some(email) = &user.email {
                    println!("{}", style(email).dim());
                }
            }
        }
        Guarded::LoginRequired => {
            if ctx.json_output {
                print_json(&serde_json::json!({ "authenticated": false }))?;
            } else {
                println!("Not signed in");
                println!("{}", style("Run 'shelfmark login' to sign in.").dim());
            }
        }
    }
    Ok(())
}

fn prompt_line(prompt: &str) -> Result<String> {
    print!("{}", prompt);
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().lock().read_line(&mut input)?;
    let input = input.trim();
    if input.is_empty() {
        bail!("no user name given");
    }
    Ok(input.to_string())
}
