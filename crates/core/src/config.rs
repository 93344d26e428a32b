//! Application configuration.

use std::{
    fs,
    path::{Path, PathBuf},
};

use ::config::{Config, Environment, File, FileFormat};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Directory under the user config dir holding Patio files.
pub const CONFIG_DIR: &str = "patio";
/// Base URL used until the user configures one.
pub const DEFAULT_API_URL: &str = "http://localhost:3000";

/// Settings resolved from defaults, `config.toml` and `PATIO_*` variables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    /// Base URL of the REST API, without trailing slash.
    pub api_url: String,
    /// File holding the persisted session.
    pub session_path: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            session_path: config_root().join("session.json"),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default config file and the environment.
    pub fn load() -> Result<Self> {
        Self::load_from(config_path())
    }

    /// Load configuration from `path` (optional) layered under `PATIO_*` variables.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let defaults = Self::default();
        let settings = Config::builder()
            .set_default("api_url", defaults.api_url.clone())?
            .set_default(
                "session_path",
                defaults.session_path.to_string_lossy().to_string(),
            )?
            .add_source(File::from(path).format(FileFormat::Toml).required(false))
            .add_source(Environment::with_prefix("PATIO"))
            .build()
            .with_context(|| format!("failed to read configuration {}", path.display()))?;

        let mut config: AppConfig = settings
            .try_deserialize()
            .context("failed to parse configuration")?;
        config.api_url = config.api_url.trim_end_matches('/').to_string();
        Ok(config)
    }
}

/// Root directory for Patio configuration and session files.
pub fn config_root() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR)
}

/// Path of the user's `config.toml`.
pub fn config_path() -> PathBuf {
    config_root().join("config.toml")
}

/// Write a default `config.toml` when none exists yet.
pub fn ensure_default_config() -> Result<()> {
    write_default_config(config_path())
}

fn write_default_config(path: PathBuf) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let contents = format!(
        "# Patio console configuration\n\
         # PATIO_API_URL overrides api_url.\n\
         api_url = \"{}\"\n",
        DEFAULT_API_URL
    );
    fs::write(&path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "wrote default configuration");
    Ok(())
}
