//! Unified error handling for ircbridge.
//!
//! One error enum per concern. None of them cross the plugin boundary:
//! config errors leave the current session running, transport errors feed
//! the reconnect policy, and CI errors become a reply line in chat.

use std::error::Error as StdError;
use std::fmt::Write as _;
use thiserror::Error;

// ============================================================================
// Configuration Errors
// ============================================================================

/// Why a settings document was rejected.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config")]
    Serialize(#[from] toml::ser::Error),

    #[error("missing [{0}] section")]
    MissingSection(&'static str),

    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("connection host is empty")]
    EmptyHost,

    #[error("no channels configured")]
    NoChannels,

    #[error("invalid project pattern for channel {channel}")]
    InvalidPattern {
        channel: String,
        #[source]
        source: regex::Error,
    },
}

// ============================================================================
// Transport Errors
// ============================================================================

/// Failures establishing or running the IRC link.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connect to {addr} failed")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TLS server name {0:?}")]
    ServerName(String),

    #[error("TLS handshake with {host} failed")]
    Tls {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("protocol error")]
    Protocol(#[from] ircbridge_proto::ProtocolError),

    #[error("connection closed by server")]
    Closed,

    #[error("registration timed out after {0}s")]
    RegistrationTimeout(u64),
}

// ============================================================================
// CI Server Errors
// ============================================================================

/// Errors raised by the CI server's query/command interface.
#[derive(Debug, Error)]
pub enum CiError {
    #[error("build server unavailable: {0}")]
    Unavailable(String),

    #[error("failed to queue build {build_type}: {reason}")]
    Enqueue { build_type: String, reason: String },

    #[error("internal error: {0}")]
    Internal(String),
}

/// Render an error followed by every nested cause, `": "`-separated.
pub fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let _ = write!(out, ": {}", cause);
        source = cause.source();
    }
    out
}
