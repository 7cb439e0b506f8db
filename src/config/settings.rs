//! The IRC settings document.
//!
//! ```toml
//! [irc]
//! nickname = "teamcity"
//! username = "teamcity"
//! realname = "Teamcity IRC Plugin"
//! password = ""
//!
//! [irc.connection]
//! host = "irc.example.net"
//! port = 6667
//! ssl = false
//!
//! [[irc.channels]]
//! name = "#ci"
//!
//! [[irc.channels]]
//! name = "#web"
//! projects = "web.* api"
//! ```
//!
//! A [`Settings`] value is immutable: a reload parses a fresh document and
//! the plugin builds a new session from it.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::defaults::{default_port, default_realname};
use crate::error::ConfigError;
use crate::routing::{Channel, RoutingTable};

pub const DEFAULT_PORT: u16 = 6667;
pub const DEFAULT_REALNAME: &str = "Teamcity IRC Plugin";

/// Connection identity and channel routing for one session.
#[derive(Debug, Clone)]
pub struct Settings {
    pub hostname: String,
    pub port: u16,
    pub use_ssl: bool,
    pub nickname: String,
    pub username: String,
    pub realname: String,
    /// Server password; empty means none is sent.
    pub password: String,
    pub channels: RoutingTable,
}

impl Settings {
    /// Parse and validate a settings document.
    pub fn from_document(doc: &str) -> Result<Self, ConfigError> {
        let document: Document = toml::from_str(doc)?;
        document.try_into()
    }

    /// Load a settings document from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_document(&content)
    }

    /// Serialize back to the document format.
    pub fn to_document(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(&Document::from(self))?)
    }

    /// `host:port` as used for the TCP connect.
    pub fn address(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }
}

// ============================================================================
// Document model
// ============================================================================

#[derive(Debug, Deserialize, Serialize)]
struct Document {
    irc: Option<IrcSection>,
}

// Scalars come before sub-tables so the serializer emits a valid document.
#[derive(Debug, Deserialize, Serialize)]
struct IrcSection {
    nickname: Option<String>,
    username: Option<String>,
    #[serde(default = "default_realname")]
    realname: String,
    #[serde(default)]
    password: String,
    connection: Option<ConnectionSection>,
    channels: Option<Vec<ChannelEntry>>,
}

#[derive(Debug, Deserialize, Serialize)]
struct ConnectionSection {
    #[serde(default)]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default)]
    ssl: bool,
}

#[derive(Debug, Deserialize, Serialize)]
struct ChannelEntry {
    #[serde(default)]
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    projects: Option<String>,
}

impl TryFrom<Document> for Settings {
    type Error = ConfigError;

    fn try_from(document: Document) -> Result<Self, Self::Error> {
        let irc = document.irc.ok_or(ConfigError::MissingSection("irc"))?;
        let connection = irc
            .connection
            .ok_or(ConfigError::MissingSection("irc.connection"))?;

        let hostname = connection.host.trim().to_string();
        if hostname.is_empty() {
            return Err(ConfigError::EmptyHost);
        }

        let nickname = irc
            .nickname
            .map(|n| n.trim().to_string())
            .ok_or(ConfigError::MissingField("nickname"))?;
        let username = irc
            .username
            .map(|u| u.trim().to_string())
            .ok_or(ConfigError::MissingField("username"))?;

        let entries = irc
            .channels
            .ok_or(ConfigError::MissingSection("irc.channels"))?;

        let mut channels = RoutingTable::new();
        for entry in entries {
            let name = entry.name.trim();
            if name.is_empty() {
                continue;
            }
            let channel = Channel::new(name, entry.projects).map_err(|source| {
                ConfigError::InvalidPattern {
                    channel: name.to_string(),
                    source,
                }
            })?;
            channels.insert(channel);
        }

        if channels.is_empty() {
            return Err(ConfigError::NoChannels);
        }

        Ok(Settings {
            hostname,
            port: connection.port,
            use_ssl: connection.ssl,
            nickname,
            username,
            realname: irc.realname.trim().to_string(),
            password: irc.password.trim().to_string(),
            channels,
        })
    }
}

impl From<&Settings> for Document {
    fn from(settings: &Settings) -> Self {
        let channels = settings
            .channels
            .channels()
            .iter()
            .map(|c| ChannelEntry {
                name: c.name().to_string(),
                projects: c.projects().map(str::to_string),
            })
            .collect();

        Document {
            irc: Some(IrcSection {
                nickname: Some(settings.nickname.clone()),
                username: Some(settings.username.clone()),
                realname: settings.realname.clone(),
                password: settings.password.clone(),
                connection: Some(ConnectionSection {
                    host: settings.hostname.clone(),
                    port: settings.port,
                    ssl: settings.use_ssl,
                }),
                channels: Some(channels),
            }),
        }
    }
}
