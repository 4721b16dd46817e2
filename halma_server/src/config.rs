// Server configuration.
//
// `ServerConfig` carries everything the listener needs. It has sensible
// defaults, can be loaded from a TOML file (missing keys fall back to the
// defaults), and the binary lets CLI flags override individual values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use halma_protocol::MAX_LINE_LENGTH;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Configuration for starting a game server.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// Listen port. 0 lets the OS pick a free port.
    pub port: u16,
    /// How long a new connection may take to send `SET_NAME`. 0 waits forever.
    pub handshake_timeout_secs: u64,
    /// Longest accepted inbound line, in bytes.
    pub max_line_length: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 12345,
            handshake_timeout_secs: 30,
            max_line_length: MAX_LINE_LENGTH,
        }
    }
}

impl ServerConfig {
    /// Parse a TOML document. Keys that are absent keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn handshake_timeout(&self) -> Option<Duration> {
        (self.handshake_timeout_secs > 0).then(|| Duration::from_secs(self.handshake_timeout_secs))
    }
}
