//! Application configuration.
//!
//! Values come from built-in defaults, then `config.toml` under the user's
//! config directory, then `GAMESHELF_*` environment variables.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::store::DEFAULT_DATA_FILE;

/// Directory name used under the platform config and data directories.
pub const APP_DIR: &str = "gameshelf";

/// Prefix for environment overrides, e.g. `GAMESHELF_DATA_FILE`.
pub const ENV_PREFIX: &str = "GAMESHELF";

const DEFAULT_CONFIG: &str = r#"# GameShelf configuration.
# Every key can also be set through a GAMESHELF_<KEY> environment variable.

# JSON document holding the library and the funds balance.
# data_file = "/path/to/games.json"

# Directory receiving gameshelf.log.
# log_dir = "/path/to/logs"
"#;

/// Resolved settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Location of the library document.
    pub data_file: PathBuf,
    /// Directory for log files.
    pub log_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        let root = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR);
        Self {
            data_file: root.join(DEFAULT_DATA_FILE),
            log_dir: root.join("logs"),
        }
    }
}

impl AppConfig {
    /// Load from the default config file location.
    pub fn load() -> Result<Self> {
        Self::load_from(config_path())
    }

    /// Load using `path` as the (optional) config file.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let defaults =
            Config::try_from(&AppConfig::default()).context("failed to build default config")?;
        let settings = Config::builder()
            .add_source(defaults)
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = settings
            .try_deserialize()
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }
}

/// Default config file path.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("config.toml")
}

/// Write a commented template to the default location unless one exists.
pub fn ensure_default_config() -> Result<()> {
    write_default_config(config_path())
}

fn write_default_config(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("failed to write config {}", path.display()))?;
    info!(path = %path.display(), "wrote default config");
    Ok(())
}
