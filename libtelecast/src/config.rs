//! Configuration management for Telecast

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub accounts: AccountsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot API base URL, without the `/bot<token>` suffix
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl TelegramConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory for cached chat avatars
    pub avatar_dir: String,
    /// Directory for link session files
    pub session_dir: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountsConfig {
    /// Maximum number of linked Telegram accounts per team (unlimited when unset)
    pub max_per_team: Option<u32>,
}

fn default_api_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from the default location, falling back to defaults
    /// when no config file exists yet
    pub fn load_or_default() -> Result<Self> {
        let config_path = resolve_config_path()?;
        if !config_path.exists() {
            tracing::debug!(
                "No config file at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default_config());
        }
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        Ok(config)
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            database: DatabaseConfig {
                path: "~/.local/share/telecast/telecast.db".to_string(),
            },
            telegram: TelegramConfig::default(),
            storage: StorageConfig {
                avatar_dir: "~/.local/share/telecast/avatar".to_string(),
                session_dir: "~/.local/share/telecast/sessions".to_string(),
            },
            accounts: AccountsConfig::default(),
        }
    }

    /// Build a configuration rooted in a single directory
    ///
    /// Used by tests and by callers that keep all state side by side.
    pub fn rooted_at(dir: &Path) -> Self {
        let join = |name: &str| dir.join(name).to_string_lossy().to_string();
        Self {
            database: DatabaseConfig {
                path: join("telecast.db"),
            },
            telegram: TelegramConfig::default(),
            storage: StorageConfig {
                avatar_dir: join("avatar"),
                session_dir: join("sessions"),
            },
            accounts: AccountsConfig::default(),
        }
    }

    pub fn avatar_dir(&self) -> PathBuf {
        expand_path(&self.storage.avatar_dir)
    }

    pub fn session_dir(&self) -> PathBuf {
        expand_path(&self.storage.session_dir)
    }
}

/// Expand `~` and environment variables in a configured path
pub fn expand_path(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path)
        .map(|p| p.to_string())
        .unwrap_or_else(|_| shellexpand::tilde(path).to_string());
    PathBuf::from(expanded)
}

/// Resolve the configuration file path under the XDG base directories
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("TELECAST_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("telecast").join("config.toml"))
}
