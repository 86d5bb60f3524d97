//! Core configuration types and loading.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use super::defaults::{
    default_max_line_len, default_port, default_realname, default_true, default_username,
};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Agent configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Where to connect.
    pub server: ServerConfig,
    /// Who to be.
    pub identity: IdentityConfig,
    /// Reconnection, pacing and line limits.
    #[serde(default)]
    pub connection: ConnectionConfig,
    /// Channels joined once the session is ready.
    #[serde(default)]
    pub channels: Vec<String>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Server endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Hostname or address (e.g., "irc.libera.chat").
    pub host: String,
    /// TCP port (default: 6667).
    #[serde(default = "default_port")]
    pub port: u16,
    /// Connection password sent as `PASS` (optional).
    pub password: Option<String>,
}

/// The agent's identity on the network.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    pub nick: String,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default = "default_realname")]
    pub realname: String,
}

/// Connection policy.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    /// Reconnect attempts before giving up; 0 retries forever.
    #[serde(default)]
    pub max_reconnects: u32,
    /// Throttle outbound lines to stay under the server's flood limit.
    #[serde(default = "default_true")]
    pub pacing: bool,
    /// Maximum line length in bytes, CRLF included (default: 512).
    #[serde(default = "default_max_line_len")]
    pub max_line_len: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_reconnects: 0,
            pacing: default_true(),
            max_line_len: default_max_line_len(),
        }
    }
}
