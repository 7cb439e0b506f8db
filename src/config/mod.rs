//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - `settings`: the IRC settings document (server, identity, channels)
//! - `host`: options for the standalone host process (HTTP listener, session timing, catalog seed)
//! - `defaults`: serde default value functions shared by both

mod defaults;
mod host;
mod settings;

pub use host::{CatalogEntry, HostConfig, HttpConfig, SessionOptions};
pub use settings::{DEFAULT_PORT, DEFAULT_REALNAME, Settings};
