//! Settings for the store, the remote and logging
//!
//! Values start from defaults, are replaced by `~/.config/rentready/config.toml`
//! and finally by `RENTREADY_<KEY>` variables, one per entry in [`CONFIG_KEYS`].

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::storage::StorageKind;

const ENV_PREFIX: &str = "RENTREADY";

/// Keys accepted by [`Config::set`]
pub const CONFIG_KEYS: &[&str] = &[
    "data_dir",
    "storage",
    "remote_url",
    "sync_enabled",
    "probe_interval_secs",
    "request_timeout_secs",
    "log_file",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Holds `rentready.db`
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Which local store backend to use
    #[serde(default)]
    pub storage: StorageKind,

    /// Base URL of the remote document store (optional)
    #[serde(default)]
    pub remote_url: Option<String>,

    /// Whether queued changes are pushed to the remote store
    #[serde(default)]
    pub sync_enabled: bool,

    /// Seconds between reachability probes in `watch`
    #[serde(default = "default_probe_interval")]
    pub probe_interval_secs: u64,

    /// Per-request timeout for the remote store
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Write logs here instead of stderr
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            storage: StorageKind::default(),
            remote_url: None,
            sync_enabled: false,
            probe_interval_secs: default_probe_interval(),
            request_timeout_secs: default_request_timeout(),
            log_file: None,
        }
    }
}

impl Config {
    /// Load from [`Config::config_file_path`] with environment overrides
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load from `path`, falling back to defaults when it is absent.
    ///
    /// Creates the data directory for the sqlite backend.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = match std::fs::read_to_string(path) {
            Ok(text) => toml::from_str(&text)
                .with_context(|| format!("Invalid config file {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                return Err(e).with_context(|| format!("Cannot read config file {}", path.display()))
            }
        };

        config.apply_env_overrides()?;
        config.create_data_dir()?;
        Ok(config)
    }

    /// Parse TOML text, then apply environment overrides
    pub fn load_from_str(text: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(text).context("Invalid config TOML")?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// `RENTREADY_<KEY>` wins over whatever was loaded
    fn apply_env_overrides(&mut self) -> Result<()> {
        for key in CONFIG_KEYS {
            let var = format!("{}_{}", ENV_PREFIX, key.to_uppercase());
            if let Ok(val) = std::env::var(&var) {
                self.set(key, &val)
                    .with_context(|| format!("Invalid value in {}", var))?;
            }
        }
        Ok(())
    }

    /// Set a single field from its string form.
    ///
    /// An empty string clears optional fields.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "data_dir" => self.data_dir = PathBuf::from(value),
            "storage" => {
                self.storage = value
                    .parse()
                    .with_context(|| format!("Unknown storage backend '{}'", value))?
            }
            "remote_url" => {
                self.remote_url = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                }
            }
            "sync_enabled" => {
                self.sync_enabled = value.eq_ignore_ascii_case("true") || value == "1"
            }
            "probe_interval_secs" => {
                self.probe_interval_secs = parse_secs(key, value)?;
            }
            "request_timeout_secs" => {
                self.request_timeout_secs = parse_secs(key, value)?;
            }
            "log_file" => {
                self.log_file = if value.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(value))
                }
            }
            other => bail!(
                "Unknown config key '{}'. Valid keys: {}",
                other,
                CONFIG_KEYS.join(", ")
            ),
        }
        Ok(())
    }

    fn create_data_dir(&self) -> Result<()> {
        if self.storage == StorageKind::Memory || self.data_dir.is_dir() {
            return Ok(());
        }
        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("Cannot create data directory {}", self.data_dir.display()))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Write as TOML, creating parent directories
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let text = toml::to_string_pretty(self).context("Cannot encode config as TOML")?;
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Cannot create {}", dir.display()))?;
        }
        std::fs::write(path, text)
            .with_context(|| format!("Cannot write config file {}", path.display()))
    }

    /// `RENTREADY_CONFIG`, or `config.toml` under the platform config dir
    pub fn config_file_path() -> PathBuf {
        match std::env::var_os(format!("{}_CONFIG", ENV_PREFIX)) {
            Some(path) => PathBuf::from(path),
            None => dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("rentready")
                .join("config.toml"),
        }
    }

    pub fn sqlite_path(&self) -> PathBuf {
        self.data_dir.join("rentready.db")
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

fn parse_secs(key: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .with_context(|| format!("{} must be a whole number of seconds, got '{}'", key, value))
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rentready")
}

fn default_probe_interval() -> u64 {
    15
}

fn default_request_timeout() -> u64 {
    10
}
