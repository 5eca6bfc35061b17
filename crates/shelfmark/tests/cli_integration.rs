//! CLI integration tests for the Shelfmark command-line interface.
//!
//! These tests verify:
//! - Help text is displayed correctly
//! - Argument parsing works as expected
//! - Config resolution and offline behavior
//!
//! Note: These tests do not require a running API server. Every invocation
//! gets its own empty config directory and working directory.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// An isolated shelfmark invocation.
struct Sandbox {
    config_dir: TempDir,
    work_dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            config_dir: TempDir::new().unwrap(),
            work_dir: TempDir::new().unwrap(),
        }
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("shelfmark").unwrap();
        cmd.current_dir(self.work_dir.path())
            .env("SHELFMARK_CONFIG_DIR", self.config_dir.path())
            .env("SHELFMARK_NO_BROWSER", "1")
            .env_remove("SHELFMARK_API_URL")
            .env_remove("RUST_LOG");
        cmd
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_displays() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("personal book catalog"));
}

#[test]
fn test_version_displays() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("shelfmark"));
}

#[test]
fn test_help_lists_subcommands() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("logout"))
        .stdout(predicate::str::contains("whoami"))
        .stdout(predicate::str::contains("books"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_books_subcommands_listed() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["books", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("all"))
        .stdout(predicate::str::contains("add"))
        .stdout(predicate::str::contains("delete"))
        .stdout(predicate::str::contains("parse-text"))
        .stdout(predicate::str::contains("parse-image"));
}

#[test]
fn test_login_help() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["login", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--provider"))
        .stdout(predicate::str::contains("--redirect-uri"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Global Flag Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_global_flags_accepted() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["--verbose", "--json", "--api-url", "http://localhost:5000", "--help"])
        .assert()
        .success();
}

// ─────────────────────────────────────────────────────────────────────────────
// Invalid Input Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_unknown_subcommand_fails() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .arg("unknown-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_unknown_sort_key_fails() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["books", "list", "--order-by", "rating"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown sort key"));
}

#[test]
fn test_unknown_provider_fails() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["login", "--provider", "myspace"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown provider"));
}

#[test]
fn test_code_requires_redirect_uri() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["login", "--code", "abc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--redirect-uri"));
}

#[test]
fn test_provider_conflicts_with_user() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["login", "--provider", "google", "--user", "reader"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_delete_requires_id() {
    let sandbox = Sandbox::new();
    sandbox.cmd().args(["books", "delete"]).assert().failure();
}

// ─────────────────────────────────────────────────────────────────────────────
// Config Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_missing_api_url_is_reported() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["books", "all"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no API URL configured"));
}

#[test]
fn test_config_show_defaults() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No config files loaded"))
        .stdout(predicate::str::contains("oauth-enabled"))
        .stdout(predicate::str::contains("identity"));
}

#[test]
fn test_config_show_reads_project_file() {
    let sandbox = Sandbox::new();
    std::fs::write(
        sandbox.work_dir.path().join("shelfmark.toml"),
        "api_url = \"http://localhost:5000\"\nauth_mode = \"password-only\"\n",
    )
    .unwrap();

    sandbox
        .cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("http://localhost:5000"))
        .stdout(predicate::str::contains("password-only"));
}

#[test]
fn test_env_and_flag_precedence() {
    let sandbox = Sandbox::new();
    std::fs::write(
        sandbox.work_dir.path().join("shelfmark.toml"),
        "api_url = \"http://from-file:5000\"\n",
    )
    .unwrap();

    sandbox
        .cmd()
        .env("SHELFMARK_API_URL", "http://from-env:5000")
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("http://from-env:5000"));

    sandbox
        .cmd()
        .env("SHELFMARK_API_URL", "http://from-env:5000")
        .args(["--api-url", "http://from-flag:5000", "--json", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"api_url\": \"http://from-flag:5000\""));
}

#[test]
fn test_malformed_config_is_a_warning() {
    let sandbox = Sandbox::new();
    std::fs::write(
        sandbox.config_dir.path().join("config.toml"),
        "this is not valid toml {{{{",
    )
    .unwrap();

    sandbox
        .cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("warning:"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Offline Session Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_whoami_without_session() {
    // No saved token, so the guard never contacts the server.
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["--api-url", "http://127.0.0.1:9", "whoami"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Not signed in"));
}

#[test]
fn test_whoami_json_without_session() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["--api-url", "http://127.0.0.1:9", "--json", "whoami"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"authenticated\": false"));
}

#[test]
fn test_password_only_rejects_provider_login() {
    let sandbox = Sandbox::new();
    std::fs::write(
        sandbox.config_dir.path().join("config.toml"),
        "api_url = \"http://127.0.0.1:9\"\nauth_mode = \"password-only\"\n",
    )
    .unwrap();

    sandbox
        .cmd()
        .args(["login", "--provider", "google"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("google sign-in is not available"));
}

#[test]
fn test_provider_login_prints_url() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["--api-url", "http://127.0.0.1:9/api", "login", "--provider", "facebook"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "http://127.0.0.1:9/api/auth/facebook?returnUrl=%2F",
        ));
}

fn write_session(sandbox: &Sandbox) -> std::path::PathBuf {
    let token_file = sandbox.config_dir.path().join("session.json");
    std::fs::write(&token_file, r#"{"access_token":"T"}"#).unwrap();
    token_file
}

#[test]
fn test_logout_without_api_url_clears_session() {
    let sandbox = Sandbox::new();
    let token_file = write_session(&sandbox);

    sandbox
        .cmd()
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Signed out"));

    assert!(!token_file.exists());
}

#[test]
fn test_logout_with_unreachable_server_clears_session() {
    let sandbox = Sandbox::new();
    let token_file = write_session(&sandbox);

    sandbox
        .cmd()
        .args(["--api-url", "http://127.0.0.1:9", "--json", "logout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"authenticated\": false"));

    assert!(!token_file.exists());
}
