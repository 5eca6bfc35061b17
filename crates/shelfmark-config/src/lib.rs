//! Configuration for the Shelfmark client.
//!
//! Provides TOML-based configuration with:
//! - Config file layering (user config dir + project-local overrides)
//! - An environment override for the API base URL
//! - Session file location and route-guard strategy

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    API_URL_ENV, CONFIG_DIR_ENV, ConfigSource, LoadedConfig, default_token_file, load_config,
    load_config_file, load_config_with_options, log_dir, save_config, xdg_config_dir,
    xdg_config_path,
};
pub use error::{ConfigError, Result};
pub use types::*;
