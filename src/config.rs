// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Configuration module.
//!
//! Handles loading and saving application settings.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::bluetooth::DEFAULT_RFCOMM_CHANNEL;
use crate::link::LinkSettings;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Recorder to control.
    pub device: DeviceConfig,

    /// Link behaviour.
    pub link: LinkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Bluetooth address of the recorder's adapter, e.g. "00:11:22:33:44:55".
    pub address: String,

    /// RFCOMM channel of the serial port profile.
    pub channel: u8,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            channel: DEFAULT_RFCOMM_CHANNEL,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Timeout for connecting and writing in milliseconds. 0 disables it.
    pub io_timeout_ms: u64,

    /// Consecutive connection errors tolerated before giving up.
    pub max_connection_errors: u32,

    /// Delay before reconnecting after an error in milliseconds.
    pub reconnect_delay_ms: u64,

    /// How long a key is held before key-up is sent, in milliseconds.
    pub key_press_ms: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            io_timeout_ms: 5000,
            max_connection_errors: 3,
            reconnect_delay_ms: 100,
            key_press_ms: 100,
        }
    }
}

impl LinkConfig {
    pub fn io_timeout(&self) -> Option<Duration> {
        (self.io_timeout_ms > 0).then(|| Duration::from_millis(self.io_timeout_ms))
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn key_press(&self) -> Duration {
        Duration::from_millis(self.key_press_ms)
    }

    pub fn settings(&self) -> LinkSettings {
        LinkSettings {
            io_timeout: self.io_timeout(),
        }
    }
}

impl Config {
    /// Default location of the configuration file.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("zoom-remote")
            .join("config.toml")
    }

    /// Load configuration from the default file or create it.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load configuration from `path`, writing defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            let config = Self::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Save configuration to `path`.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_creates_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.device.channel, DEFAULT_RFCOMM_CHANNEL);
        assert_eq!(config.link.max_connection_errors, 3);
        assert_eq!(config.link.io_timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[device]\naddress = \"AA:BB:CC:DD:EE:FF\"\n\n[link]\nio_timeout_ms = 0\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.device.address, "AA:BB:CC:DD:EE:FF");
        assert_eq!(config.device.channel, 1);
        assert_eq!(config.link.io_timeout(), None);
        assert_eq!(config.link.reconnect_delay(), Duration::from_millis(100));
        assert!(config.link.settings().io_timeout.is_none());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.device.address = "00:11:22:33:44:55".to_string();
        config.link.key_press_ms = 250;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.device.address, "00:11:22:33:44:55");
        assert_eq!(loaded.link.key_press(), Duration::from_millis(250));
    }
}
