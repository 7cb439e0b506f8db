//! CI domain objects as the bridge sees them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Notifier-scoped user property holding a user's IRC nickname.
pub const NICKNAME_PROPERTY: &str = "ircNotifier.Nickname";

/// Outcome of a build or the current state of a build type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStatus {
    Success,
    Failure,
    Error,
    #[default]
    Unknown,
}

impl BuildStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, BuildStatus::Failure | BuildStatus::Error)
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BuildStatus::Success => "SUCCESS",
            BuildStatus::Failure => "FAILURE",
            BuildStatus::Error => "ERROR",
            BuildStatus::Unknown => "UNKNOWN",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A build configuration within a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildType {
    pub project: String,
    pub name: String,
    #[serde(default)]
    pub status: BuildStatus,
}

impl BuildType {
    pub fn new(project: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            name: name.into(),
            status: BuildStatus::Unknown,
        }
    }

    /// `"<project> :: <build type>"`
    pub fn full_name(&self) -> String {
        format!("{} :: {}", self.project, self.name)
    }
}

/// A comment attached to a build by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub author: String,
    pub text: String,
}

/// A build that is running or has just finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunningBuild {
    pub id: u64,
    pub number: String,
    pub project: String,
    pub build_type: String,
    #[serde(default)]
    pub status: BuildStatus,
    #[serde(default)]
    pub agent: String,
    #[serde(default)]
    pub comment: Option<Comment>,
    #[serde(default)]
    pub problems: Vec<String>,
}

impl RunningBuild {
    /// `"<project> :: <build type> #<number>"`
    pub fn qualified_name(&self) -> String {
        format!("{} :: {} #{}", self.project, self.build_type, self.number)
    }
}

/// A CI user affected by a personal notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

impl User {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            properties: HashMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// The nickname to message: the IRC nickname property if set and
    /// non-blank, else the login name.
    pub fn irc_nickname(&self) -> &str {
        self.property(NICKNAME_PROPERTY)
            .map(str::trim)
            .filter(|nick| !nick.is_empty())
            .unwrap_or(&self.username)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nickname_property_wins_over_login() {
        let user = User::new("jdoe").with_property(NICKNAME_PROPERTY, "johnny");
        assert_eq!(user.irc_nickname(), "johnny");
    }

    #[test]
    fn nickname_falls_back_to_login() {
        assert_eq!(User::new("jdoe").irc_nickname(), "jdoe");
        let blank = User::new("jdoe").with_property(NICKNAME_PROPERTY, "  ");
        assert_eq!(blank.irc_nickname(), "jdoe");
    }

    #[test]
    fn qualified_names() {
        let bt = BuildType::new("webapp", "Main");
        assert_eq!(bt.full_name(), "webapp :: Main");

        let build = RunningBuild {
            id: 7,
            number: "42".into(),
            project: "webapp".into(),
            build_type: "Main".into(),
            status: BuildStatus::Success,
            agent: "agent-1".into(),
            comment: None,
            problems: vec![],
        };
        assert_eq!(build.qualified_name(), "webapp :: Main #42");
    }

    #[test]
    fn status_failure_classes() {
        assert!(BuildStatus::Failure.is_failed());
        assert!(BuildStatus::Error.is_failed());
        assert!(!BuildStatus::Success.is_failed());
        assert!(!BuildStatus::Unknown.is_failed());
        assert_eq!(BuildStatus::Failure.to_string(), "FAILURE");
    }
}
