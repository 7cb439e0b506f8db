//! Channel routing table.
//!
//! Each configured channel carries an optional project filter: whitespace
//! separated regular expressions matched case-insensitively against the
//! whole project name. A channel without a filter receives every project.

use regex::{Regex, RegexBuilder};
use std::hash::{Hash, Hasher};

/// A chat channel plus the project filter deciding what gets broadcast to it.
///
/// Identity is the channel name alone.
#[derive(Debug, Clone)]
pub struct Channel {
    name: String,
    projects: Option<String>,
    patterns: Vec<Regex>,
}

impl Channel {
    /// Build a channel, compiling its filter once.
    pub fn new(name: impl Into<String>, projects: Option<String>) -> Result<Self, regex::Error> {
        let patterns = projects
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .map(|token| {
                RegexBuilder::new(&format!("^(?:{})$", token))
                    .case_insensitive(true)
                    .build()
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name: name.into(),
            projects,
            patterns,
        })
    }

    /// A channel with no filter (used for channels joined through an invite).
    pub fn open(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            projects: None,
            patterns: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The filter as written in the settings document.
    pub fn projects(&self) -> Option<&str> {
        self.projects.as_deref()
    }

    pub fn is_open(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Whether build notifications for `project` belong in this channel.
    pub fn interested_in(&self, project: &str) -> bool {
        self.patterns.is_empty() || self.patterns.iter().any(|p| p.is_match(project))
    }
}

impl PartialEq for Channel {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Channel {}

impl Hash for Channel {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

/// Ordered set of channels keyed by name.
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    channels: Vec<Channel>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a channel. A channel with the same name is replaced in place.
    ///
    /// Returns `true` if the name was not present before.
    pub fn insert(&mut self, channel: Channel) -> bool {
        match self.channels.iter_mut().find(|c| c.name == channel.name) {
            Some(existing) => {
                *existing = channel;
                false
            }
            None => {
                self.channels.push(channel);
                true
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.channels.iter().any(|c| c.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| c.name == name)
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn names(&self) -> Vec<String> {
        self.channels.iter().map(|c| c.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Channels that want notifications for `project`, in table order.
    pub fn interested<'a>(&'a self, project: &'a str) -> impl Iterator<Item = &'a Channel> + 'a {
        self.channels.iter().filter(move |c| c.interested_in(project))
    }
}

impl FromIterator<Channel> for RoutingTable {
    fn from_iter<I: IntoIterator<Item = Channel>>(iter: I) -> Self {
        let mut table = RoutingTable::new();
        for channel in iter {
            table.insert(channel);
        }
        table
    }
}
