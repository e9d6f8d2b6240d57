// Copyright (c) 2026 roomhub
// Licensed under the MIT License. See LICENSE file in the project root.

//! Configuration module

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application name
    pub app_name: String,

    /// Application version
    pub version: String,

    /// Data directory
    pub data_dir: PathBuf,

    /// Log level
    pub log_level: String,

    /// Enable demo mode (simulated sensors)
    pub demo_mode: bool,

    /// Bus connection configuration
    pub mqtt: MqttConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Demo mode configuration
    pub demo: DemoConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "RoomHub".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            data_dir: PathBuf::from("./data"),
            log_level: "info".to_string(),
            demo_mode: true,
            mqtt: MqttConfig::default(),
            database: DatabaseConfig::default(),
            demo: DemoConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Load or create default configuration
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();

            // Create parent directories
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            config.save(path)?;
            Ok(config)
        }
    }

    /// Get configuration directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("roomhub"))
            .unwrap_or_else(|| PathBuf::from("./config"))
    }

    /// Get default configuration path
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}

/// Bus connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    /// Broker hostname
    pub broker: String,

    /// Broker port
    pub port: u16,

    /// Client identifier
    pub client_id: String,

    /// Optional username
    pub username: Option<String>,

    /// Optional password
    pub password: Option<String>,

    /// Keep-alive interval in seconds
    pub keep_alive_secs: u64,

    /// Base reconnect backoff in milliseconds
    pub reconnect_base_ms: u64,

    /// Maximum reconnect backoff in milliseconds
    pub reconnect_max_ms: u64,

    /// Reconnect attempts before raising an alarm
    pub retry_budget: u32,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker: "localhost".to_string(),
            port: 1883,
            client_id: "roomhub".to_string(),
            username: None,
            password: None,
            keep_alive_secs: 30,
            reconnect_base_ms: 1000,
            reconnect_max_ms: 30000,
            retry_budget: 5,
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database path
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/roomhub.db"),
        }
    }
}

/// Demo mode configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    /// Number of rooms to provision
    pub rooms: u32,

    /// Seconds between simulated sensor messages
    pub publish_interval_secs: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            rooms: 4,
            publish_interval_secs: 15,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_toml() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.mqtt.broker, "localhost");
        assert_eq!(parsed.mqtt.port, 1883);
        assert_eq!(parsed.demo.rooms, 4);
        assert!(parsed.demo_mode);
    }

    #[test]
    fn partial_files_are_rejected_not_defaulted() {
        // Sections are required; a truncated file is a load error rather
        // than silently running on defaults.
        let err = toml::from_str::<Config>("app_name = \"RoomHub\"");
        assert!(err.is_err());
    }
}
