//! Lifecycle events pushed by the CI server.

use serde::{Deserialize, Serialize};

use super::types::{BuildType, RunningBuild, User};

/// A CI lifecycle event.
///
/// Serialized with an `event` tag, e.g.
/// `{"event": "build_finished", "build": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BuildEvent {
    BuildStarted {
        build: RunningBuild,
    },
    /// Outcome is carried in `build.status`.
    BuildFinished {
        build: RunningBuild,
    },
    BuildFailing {
        build: RunningBuild,
    },
    BuildProbablyHanging {
        build: RunningBuild,
    },
    BuildFailedToStart {
        build: RunningBuild,
    },
    ResponsibleAssigned {
        build_type: BuildType,
        users: Vec<User>,
    },
    ResponsibleChanged {
        build_type: BuildType,
        users: Vec<User>,
    },
    TestsResponsibilityAssigned {
        tests: Vec<String>,
        project: String,
        users: Vec<User>,
    },
    TestsResponsibilityChanged {
        tests: Vec<String>,
        project: String,
        users: Vec<User>,
    },
    TestsMuted {
        tests: Vec<String>,
        scope: String,
        users: Vec<User>,
    },
    TestsUnmuted {
        tests: Vec<String>,
        scope: String,
        users: Vec<User>,
    },
    LabelingFailed {
        build: RunningBuild,
        vcs_root: String,
        reason: String,
        users: Vec<User>,
    },
}

impl BuildEvent {
    /// Static event name, used for logging and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            BuildEvent::BuildStarted { .. } => "build_started",
            BuildEvent::BuildFinished { .. } => "build_finished",
            BuildEvent::BuildFailing { .. } => "build_failing",
            BuildEvent::BuildProbablyHanging { .. } => "build_probably_hanging",
            BuildEvent::BuildFailedToStart { .. } => "build_failed_to_start",
            BuildEvent::ResponsibleAssigned { .. } => "responsible_assigned",
            BuildEvent::ResponsibleChanged { .. } => "responsible_changed",
            BuildEvent::TestsResponsibilityAssigned { .. } => "tests_responsibility_assigned",
            BuildEvent::TestsResponsibilityChanged { .. } => "tests_responsibility_changed",
            BuildEvent::TestsMuted { .. } => "tests_muted",
            BuildEvent::TestsUnmuted { .. } => "tests_unmuted",
            BuildEvent::LabelingFailed { .. } => "labeling_failed",
        }
    }
}
