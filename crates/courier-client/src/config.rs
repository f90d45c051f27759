//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/courier/config.toml` by default. Command-line flags take
//! precedence over file values.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for the courier client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Connection settings.
    #[serde(default)]
    pub connection: ConnectionSettings,
}

/// Connection settings for the two session channels.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    /// Address of the command service.
    pub server: String,

    /// Address of the notification broker.
    pub broker: String,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            server: "127.0.0.1:5555".to_string(),
            broker: "127.0.0.1:5558".to_string(),
        }
    }
}

impl ClientConfig {
    /// Loads configuration from the default path.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| format!("failed to read config: {}", e))?;
            toml::from_str(&content).map_err(|e| format!("failed to parse config: {}", e))
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &PathBuf) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("failed to read config: {}", e))?;
        toml::from_str(&content).map_err(|e| format!("failed to parse config: {}", e))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("courier")
            .join("config.toml")
    }
}
