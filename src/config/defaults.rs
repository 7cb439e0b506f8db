//! Default value functions for configuration.

use std::net::SocketAddr;

// =============================================================================
// Settings Document Defaults
// =============================================================================

pub fn default_port() -> u16 {
    super::DEFAULT_PORT
}

pub fn default_realname() -> String {
    super::DEFAULT_REALNAME.to_string()
}

// =============================================================================
// Session Defaults
// =============================================================================

pub fn default_reconnect_delay() -> u64 {
    5
}

pub fn default_registration_timeout() -> u64 {
    60
}

pub fn default_max_line_len() -> usize {
    ircbridge_proto::DEFAULT_MAX_LINE_LEN
}

// =============================================================================
// Host Defaults
// =============================================================================

pub fn default_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8111))
}
