//! Config file discovery and layered merging.
//!
//! Resolution order (later overrides earlier):
//! 1. `~/.config/shelfmark/config.toml` (user config)
//! 2. `./shelfmark.toml` (project-local)
//! 3. `SHELFMARK_API_URL` environment variable
//! 4. CLI arguments (handled externally)

use std::path::{Path, PathBuf};

use shelfmark_client::token_store::TOKEN_FILE;

use crate::{ConfigError, Result, ShelfmarkConfig};

/// Default config filename for project-local config.
const PROJECT_CONFIG_FILE: &str = "shelfmark.toml";

/// Default config filename within the user config directory.
const USER_CONFIG_FILE: &str = "config.toml";

/// Application name for XDG directory resolution.
const APP_NAME: &str = "shelfmark";

/// Environment variable to override the config directory.
pub const CONFIG_DIR_ENV: &str = "SHELFMARK_CONFIG_DIR";

/// Environment variable supplying the API base URL.
pub const API_URL_ENV: &str = "SHELFMARK_API_URL";

/// Tracks where each config layer was loaded from.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    /// Path to the config file.
    pub path: PathBuf,
    /// Whether the file was found and loaded.
    pub loaded: bool,
}

/// Result of config discovery and loading.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The merged configuration.
    pub config: ShelfmarkConfig,
    /// Sources that were checked, in order of precedence (lowest first).
    pub sources: Vec<ConfigSource>,
    /// Primary source file (first successfully loaded), for save operations.
    pub source: Option<ConfigSource>,
    /// Warnings generated during loading (e.g., unparseable files).
    pub warnings: Vec<String>,
    /// Whether the API URL came from the environment.
    pub api_url_from_env: bool,
}

impl LoadedConfig {
    /// Get paths of sources that were actually loaded.
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .filter(|s| s.loaded)
            .map(|s| s.path.as_path())
            .collect()
    }

    /// The API base URL, or an error naming where it could be set.
    pub fn require_api_url(&self) -> Result<&str> {
        self.config
            .api_url()
            .ok_or_else(|| ConfigError::MissingApiUrl {
                hint: xdg_config_path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| PROJECT_CONFIG_FILE.to_string()),
            })
    }

    /// Session file: explicit `[session] token_file`, else the config dir default.
    pub fn token_file(&self) -> Result<PathBuf> {
        match self.config.token_file() {
            Some(path) => Ok(path),
            None => default_token_file().ok_or(ConfigError::NoConfigDir),
        }
    }
}

/// Load configuration by discovering and merging all config layers.
pub fn load_config(project_dir: Option<&Path>) -> Result<LoadedConfig> {
    load_config_with_options(project_dir, None)
}

/// Load configuration with explicit control over the user config directory.
///
/// `config_dir` overrides both `SHELFMARK_CONFIG_DIR` and the platform default.
pub fn load_config_with_options(
    project_dir: Option<&Path>,
    config_dir: Option<&Path>,
) -> Result<LoadedConfig> {
    load_layers(project_dir, config_dir, |key| std::env::var(key).ok())
}

fn load_layers(
    project_dir: Option<&Path>,
    config_dir: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<LoadedConfig> {
    let mut config = ShelfmarkConfig::new();
    let mut sources = Vec::new();
    let mut warnings = Vec::new();

    // 1. User config: explicit override, then env var, then platform default
    let user_config_path = match config_dir {
        Some(dir) => Some(dir.join(USER_CONFIG_FILE)),
        None => xdg_config_path(),
    };
    if let Some(path) = user_config_path {
        sources.push(load_layer(&mut config, &path, &mut warnings));
    }

    // 2. Project-local config
    let project_path = project_dir
        .map(|d| d.join(PROJECT_CONFIG_FILE))
        .unwrap_or_else(|| PathBuf::from(PROJECT_CONFIG_FILE));
    sources.push(load_layer(&mut config, &project_path, &mut warnings));

    // 3. Environment
    let api_url_from_env = apply_env(&mut config, env);

    let source = sources.iter().find(|s| s.loaded).cloned();

    Ok(LoadedConfig {
        config,
        sources,
        source,
        warnings,
        api_url_from_env,
    })
}

/// Load config from a specific file path (no discovery).
pub fn load_config_file(path: &Path) -> Result<ShelfmarkConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    ShelfmarkConfig::from_toml(&contents)
}

/// Save configuration to a file.
///
/// Creates parent directories if they don't exist.
pub fn save_config(config: &ShelfmarkConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteFile {
            path: parent.display().to_string(),
            source: e,
        })?;
    }

    let contents = config.to_toml()?;
    std::fs::write(path, contents).map_err(|e| ConfigError::WriteFile {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(())
}

/// Path of the user config file.
pub fn xdg_config_path() -> Option<PathBuf> {
    xdg_config_dir().map(|d| d.join(USER_CONFIG_FILE))
}

/// Get the config directory for shelfmark.
///
/// Checks `SHELFMARK_CONFIG_DIR` first, then falls back to the platform default
/// (`~/.config/shelfmark` on Linux, `~/Library/Application Support/shelfmark` on macOS).
pub fn xdg_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Default session file location.
pub fn default_token_file() -> Option<PathBuf> {
    xdg_config_dir().map(|d| d.join(TOKEN_FILE))
}

/// Directory for rolling log files.
pub fn log_dir() -> Option<PathBuf> {
    xdg_config_dir().map(|d| d.join("logs"))
}

/// Try to load a config file and merge it into the existing config.
///
/// A file that exists but cannot be read or parsed is skipped with a warning.
fn load_layer(config: &mut ShelfmarkConfig, path: &Path, warnings: &mut Vec<String>) -> ConfigSource {
    if !path.is_file() {
        return ConfigSource {
            path: path.to_path_buf(),
            loaded: false,
        };
    }

    match load_config_file(path) {
        Ok(layer) => {
            tracing::debug!(path = %path.display(), "Loaded config layer");
            config.merge(layer);
            ConfigSource {
                path: path.to_path_buf(),
                loaded: true,
            }
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Skipping config layer");
            warnings.push(format!("Failed to load {}: {}", path.display(), e));
            ConfigSource {
                path: path.to_path_buf(),
                loaded: false,
            }
        }
    }
}

/// Apply environment overrides. Returns whether the API URL was overridden.
fn apply_env(config: &mut ShelfmarkConfig, env: impl Fn(&str) -> Option<String>) -> bool {
    match env(API_URL_ENV) {
        Some(url) if !url.trim().is_empty() => {
            config.api_url = Some(url);
            true
        }
        _ => false,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use shelfmark_client::{AuthMode, GuardStrategy};
    use std::fs;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_xdg_config_path_shape() {
        if let Some(p) = xdg_config_path() {
            assert!(p.ends_with("config.toml"));
        }
    }

    #[test]
    fn test_load_config_file_not_found() {
        let err = load_config_file(Path::new("/nonexistent/config.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "this is not valid toml {{{{").unwrap();

        let err = load_config_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_config_no_files() {
        let project = TempDir::new().unwrap();
        let user = TempDir::new().unwrap();

        let loaded = load_layers(Some(project.path()), Some(user.path()), no_env).unwrap();
        assert!(loaded.config.api_url().is_none());
        assert!(loaded.loaded_from().is_empty());
        assert!(loaded.source.is_none());
        assert!(matches!(
            loaded.require_api_url(),
            Err(ConfigError::MissingApiUrl { .. })
        ));
    }

    #[test]
    fn test_project_overrides_user() {
        let user = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        fs::write(
            user.path().join("config.toml"),
            r#"
api_url = "https://books.example.com/api"
auth_mode = "password-only"

[guard]
strategy = "token-presence"
"#,
        )
        .unwrap();
        fs::write(
            project.path().join("shelfmark.toml"),
            r#"api_url = "http://localhost:5000""#,
        )
        .unwrap();

        let loaded = load_layers(Some(project.path()), Some(user.path()), no_env).unwrap();
        assert_eq!(loaded.require_api_url().unwrap(), "http://localhost:5000");
        assert_eq!(loaded.config.auth_mode(), AuthMode::PasswordOnly);
        assert_eq!(loaded.config.guard_strategy(), GuardStrategy::TokenPresence);
        assert_eq!(loaded.loaded_from().len(), 2);
        assert_eq!(
            loaded.source.unwrap().path,
            user.path().join("config.toml")
        );
        assert!(!loaded.api_url_from_env);
    }

    #[test]
    fn test_env_overrides_files() {
        let user = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        fs::write(
            project.path().join("shelfmark.toml"),
            r#"api_url = "http://localhost:5000""#,
        )
        .unwrap();

        let env = |key: &str| (key == API_URL_ENV).then(|| "https://staging.example.com".to_string());
        let loaded = load_layers(Some(project.path()), Some(user.path()), env).unwrap();
        assert_eq!(loaded.require_api_url().unwrap(), "https://staging.example.com");
        assert!(loaded.api_url_from_env);
    }

    #[test]
    fn test_blank_env_is_ignored() {
        let user = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        fs::write(
            project.path().join("shelfmark.toml"),
            r#"api_url = "http://localhost:5000""#,
        )
        .unwrap();

        let env = |_: &str| Some("   ".to_string());
        let loaded = load_layers(Some(project.path()), Some(user.path()), env).unwrap();
        assert_eq!(loaded.require_api_url().unwrap(), "http://localhost:5000");
        assert!(!loaded.api_url_from_env);
    }

    #[test]
    fn test_malformed_layer_is_a_warning() {
        let user = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        fs::write(
            user.path().join("config.toml"),
            r#"api_url = "https://books.example.com/api""#,
        )
        .unwrap();
        fs::write(project.path().join("shelfmark.toml"), "timeout_secs = \"soon\"").unwrap();

        let loaded = load_layers(Some(project.path()), Some(user.path()), no_env).unwrap();
        assert_eq!(loaded.warnings.len(), 1);
        assert!(loaded.warnings[0].contains("shelfmark.toml"));
        assert_eq!(
            loaded.require_api_url().unwrap(),
            "https://books.example.com/api"
        );
        assert_eq!(loaded.loaded_from().len(), 1);
    }

    #[test]
    fn test_explicit_token_file_wins() {
        let user = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        fs::write(
            project.path().join("shelfmark.toml"),
            "[session]\ntoken_file = \"/tmp/elsewhere.json\"\n",
        )
        .unwrap();

        let loaded = load_layers(Some(project.path()), Some(user.path()), no_env).unwrap();
        assert_eq!(
            loaded.token_file().unwrap(),
            PathBuf::from("/tmp/elsewhere.json")
        );
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = ShelfmarkConfig {
            api_url: Some("http://localhost:5000".to_string()),
            auth_mode: Some(AuthMode::PasswordOnly),
            ..Default::default()
        };
        save_config(&config, &path).unwrap();

        let reloaded = load_config_file(&path).unwrap();
        assert_eq!(reloaded, config);
    }
}
