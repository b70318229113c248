// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Persistent configuration for ocs-remote.
//!
//! Stored as pretty JSON in `~/.ocs-remote/config.json`. Every field has a
//! default so an older or hand-edited file keeps loading.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Address the recorder app listens on out of the box.
pub const DEFAULT_ADDRESS: &str = "192.168.1.68:8000";

/// Recording name used when none is given.
pub const DEFAULT_SEQUENCE_NAME: &str = "sequence1";

/// Seconds between two reachability checks.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 4;

/// Maximum number of downloads waiting in the queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 200;

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// `host:port` of the recorder.
    #[serde(default = "default_address")]
    pub address: String,
    /// Where downloaded recordings land.
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
    /// Name sent with `start` when the user does not pick one.
    #[serde(default = "default_sequence_name")]
    pub sequence_name: String,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Applies to status, list and control calls. Downloads only get the
    /// connect timeout.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_address() -> String {
    DEFAULT_ADDRESS.to_string()
}

fn default_download_dir() -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| PathBuf::from("downloads"))
}

fn default_sequence_name() -> String {
    DEFAULT_SEQUENCE_NAME.to_string()
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: default_address(),
            download_dir: default_download_dir(),
            sequence_name: default_sequence_name(),
            poll_interval_secs: default_poll_interval_secs(),
            queue_capacity: default_queue_capacity(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Config {
    /// Default location of the config file.
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        Ok(home.join(".ocs-remote").join("config.json"))
    }

    /// Load from the default location, falling back to defaults when the file
    /// does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let config: Config = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?
        } else {
            Config::default()
        };

        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> std::result::Result<(), Error> {
        let address = self.address.trim();
        if address.is_empty() {
            return Err(Error::Config("address must not be empty".to_string()));
        }
        if address.contains("://") || address.contains('/') {
            return Err(Error::Config(format!(
                "address must be host:port without scheme or path, got '{}'",
                self.address
            )));
        }
        if self.queue_capacity == 0 {
            return Err(Error::Config("queue_capacity must be at least 1".to_string()));
        }
        if self.poll_interval_secs == 0 {
            return Err(Error::Config("poll_interval_secs must be at least 1".to_string()));
        }
        if self.connect_timeout_secs == 0 {
            return Err(Error::Config("connect_timeout_secs must be at least 1".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config("request_timeout_secs must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.address, "192.168.1.68:8000");
        assert_eq!(config.sequence_name, "sequence1");
        assert_eq!(config.poll_interval(), Duration::from_secs(4));
        assert_eq!(config.queue_capacity, 200);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = Config::default();
        config.address = "10.0.0.5:8080".to_string();
        config.download_dir = dir.path().join("videos");
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "address": "phone.local:9000" }"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.address, "phone.local:9000");
        assert_eq!(config.queue_capacity, DEFAULT_QUEUE_CAPACITY);
        assert_eq!(config.poll_interval_secs, DEFAULT_POLL_INTERVAL_SECS);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::default();
        config.queue_capacity = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.poll_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.connect_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.request_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.address = "http://192.168.1.68:8000".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.address = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
