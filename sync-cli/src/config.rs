//! Configuration management for todo-sync.
//!
//! Configuration is loaded from `config.toml` in the data directory. A
//! missing file means all defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use todo_sync_client::{SessionConfig, TcpTransportConfig};
use todo_sync_core::SyncOption;

/// File name of the configuration inside the data directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Profile defaults.
    #[serde(default)]
    pub user: UserConfig,
    /// Sync session settings.
    #[serde(default)]
    pub sync: SyncConfig,
    /// Share link settings.
    #[serde(default)]
    pub share: ShareConfig,
}

/// Profile defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserConfig {
    /// Name sent with share links when the profile has none.
    #[serde(default)]
    pub name: Option<String>,
}

/// Sync session settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Which device's name, picture and settings survive (default: no_sync).
    #[serde(default)]
    pub option: SyncOption,
    /// Address `host` listens on (default: 127.0.0.1:7878).
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
    /// Delay before tombstones are cleared after a sync (default: 1000 ms).
    #[serde(default = "default_tombstone_cleanup_ms")]
    pub tombstone_cleanup_ms: u64,
    /// Seconds to wait when dialing a host (default: 30).
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

/// Share link settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareConfig {
    /// Base URL share links are built on.
    #[serde(default = "default_share_base_url")]
    pub base_url: String,
}

// Default value functions
fn default_listen_address() -> String {
    "127.0.0.1:7878".to_string()
}

fn default_tombstone_cleanup_ms() -> u64 {
    1000
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_share_base_url() -> String {
    "https://todo.example.com/share".to_string()
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            option: SyncOption::default(),
            listen_address: default_listen_address(),
            tombstone_cleanup_ms: default_tombstone_cleanup_ms(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            base_url: default_share_base_url(),
        }
    }
}

impl AppConfig {
    /// Path of the config file inside `data_dir`.
    pub fn path(data_dir: &Path) -> PathBuf {
        data_dir.join(CONFIG_FILE)
    }

    /// Load configuration from a data directory, falling back to defaults.
    pub async fn load(data_dir: &Path) -> Result<Self, ConfigError> {
        let path = Self::path(data_dir);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => return Err(ConfigError::ReadError { path, source }),
        };
        toml::from_str(&content).map_err(|source| ConfigError::ParseError { path, source })
    }

    /// Save configuration to a data directory.
    pub async fn save(&self, data_dir: &Path) -> Result<(), ConfigError> {
        let path = Self::path(data_dir);
        let content = toml::to_string_pretty(self)?;
        tokio::fs::write(&path, content)
            .await
            .map_err(|source| ConfigError::WriteError { path, source })
    }

    /// Session settings for `host` and `join`.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::default()
            .with_sync_option(self.sync.option)
            .with_tombstone_cleanup_delay(Duration::from_millis(self.sync.tombstone_cleanup_ms))
    }

    /// Transport settings, listening on `listen` or the configured address.
    pub fn tcp_config(&self, listen: Option<&str>) -> TcpTransportConfig {
        TcpTransportConfig::default()
            .with_bind_address(listen.unwrap_or(self.sync.listen_address.as_str()))
            .with_connect_timeout(Duration::from_secs(self.sync.connect_timeout_secs))
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// Failed to serialize configuration.
    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
    /// Failed to write configuration file.
    #[error("failed to write config file {path}: {source}")]
    WriteError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
