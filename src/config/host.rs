//! Host process configuration.
//!
//! These blocks live in the same TOML file as the settings document but are
//! read once at startup; a settings reload never touches them.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use super::defaults::{
    default_listen, default_max_line_len, default_reconnect_delay, default_registration_timeout,
};
use crate::error::ConfigError;

/// Top-level host configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HostConfig {
    /// Webhook / status / metrics listener.
    #[serde(default)]
    pub http: HttpConfig,
    /// Connection session timing.
    #[serde(default)]
    pub session: SessionOptions,
    /// Projects and build types known to the in-process build server
    /// before any event arrives.
    #[serde(default)]
    pub catalog: Vec<CatalogEntry>,
}

impl HostConfig {
    pub fn from_document(doc: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(doc)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_document(&content)
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Address to bind to (e.g., "127.0.0.1:8111").
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

/// One `[[catalog]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEntry {
    pub project: String,
    #[serde(default)]
    pub build_types: Vec<String>,
}

/// Timing and framing knobs for a connection session.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionOptions {
    /// Seconds to wait before retrying after a failed connect (default: 5).
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_secs: u64,

    /// Seconds allowed between connect and RPL_WELCOME (default: 60).
    #[serde(default = "default_registration_timeout")]
    pub registration_timeout_secs: u64,

    /// Maximum accepted line length in bytes (default: 512).
    #[serde(default = "default_max_line_len")]
    pub max_line_len: usize,

    /// Verify the server certificate against the system roots when using TLS.
    /// Off by default: IRC networks commonly run self-signed certificates.
    #[serde(default)]
    pub tls_verify: bool,
}

impl SessionOptions {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    pub fn registration_timeout(&self) -> Duration {
        Duration::from_secs(self.registration_timeout_secs)
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            reconnect_delay_secs: default_reconnect_delay(),
            registration_timeout_secs: default_registration_timeout(),
            max_line_len: default_max_line_len(),
            tls_verify: false,
        }
    }
}
