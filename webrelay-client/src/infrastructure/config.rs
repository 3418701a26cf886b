//! Client configuration loaded from TOML.

use crate::application_service::relay_client::RelayClientConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Relay used when nothing else is configured.
pub const DEFAULT_RELAY_URL: &str = "ws://localhost:8080";

/// Peer the example client subscribes for.
pub const DEFAULT_PEER_ID: &str = "QmaSAmPPynrWfz1R8XvRm1GX6ghzPze6XSZCov6fWWUzSg";

/// Delay between reconnect attempts.
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 500;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Relay WebSocket URL (e.g., "ws://localhost:8080")
    #[serde(default = "default_url")]
    pub url: String,

    /// Base58 peer identifier the subscription key is derived from
    #[serde(default = "default_peer_id")]
    pub peer_id: String,

    /// Fixed delay before reconnecting, in milliseconds
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// Give up after this many consecutive failed connections (unbounded if unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_reconnect_attempts: Option<u32>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            peer_id: default_peer_id(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            max_reconnect_attempts: None,
        }
    }
}

fn default_url() -> String {
    DEFAULT_RELAY_URL.to_string()
}

fn default_peer_id() -> String {
    DEFAULT_PEER_ID.to_string()
}

fn default_reconnect_delay_ms() -> u64 {
    DEFAULT_RECONNECT_DELAY_MS
}

impl ClientConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Self::from_toml_str(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))
    }

    pub fn relay_client_config(&self) -> RelayClientConfig {
        RelayClientConfig {
            url: self.url.clone(),
            peer_id: self.peer_id.clone(),
            reconnect_delay: Duration::from_millis(self.reconnect_delay_ms),
            max_reconnect_attempts: self.max_reconnect_attempts,
        }
    }
}

/// Configuration error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Serialize error: {0}")]
    SerializeError(String),
}
