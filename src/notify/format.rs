//! Rendering events into chat lines.

use crate::ci::{BuildEvent, BuildStatus, RunningBuild, User};

/// Who a rendered event goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience<'a> {
    /// Channels interested in this project.
    Project(&'a str),
    /// Private messages to each user.
    Users(&'a [User]),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered<'a> {
    pub lines: Vec<String>,
    pub audience: Audience<'a>,
}

/// Headline plus an optional problem block:
///
/// ```text
/// Build webapp :: Main #88 failed (alice: flaky test) (on agent: linux-2)
/// Build Problems:
///     - Compilation error
///       at Foo.java:12
/// ```
///
/// Line breaks inside a comment are folded into the headline; a multi-line
/// problem continues on indented lines.
pub fn format_running_build(build: &RunningBuild, state: &str) -> Vec<String> {
    let mut headline = format!("Build {} {}", build.qualified_name(), state);
    if let Some(comment) = &build.comment {
        headline.push_str(&format!(" ({}: {})", comment.author, single_line(&comment.text)));
    }
    if !build.agent.is_empty() {
        headline.push_str(&format!(" (on agent: {})", build.agent));
    }

    let mut lines = vec![headline];
    if !build.problems.is_empty() {
        lines.push("Build Problems:".to_string());
        for problem in &build.problems {
            let mut parts = text_lines(problem);
            lines.push(format!("    - {}", parts.next().unwrap_or_default()));
            lines.extend(parts.map(|part| format!("      {}", part)));
        }
    }
    lines
}

/// Non-blank lines of `text`, split on CR and LF.
fn text_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split(['\r', '\n']).map(str::trim_end).filter(|l| !l.trim().is_empty())
}

/// `text` with its line breaks replaced by single spaces.
fn single_line(text: &str) -> String {
    text_lines(text).map(str::trim).collect::<Vec<_>>().join(" ")
}

/// `a`, `a and b`, `a, b and c`.
pub fn join_names(names: &[String]) -> String {
    match names {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}

fn lifecycle<'a>(build: &'a RunningBuild, state: &str) -> (Vec<String>, Audience<'a>) {
    (format_running_build(build, state), Audience::Project(&build.project))
}

pub fn render(event: &BuildEvent) -> Rendered<'_> {
    let (lines, audience) = match event {
        BuildEvent::BuildStarted { build } => lifecycle(build, "started"),
        BuildEvent::BuildFinished { build } => {
            let state = match build.status {
                BuildStatus::Success => "succeeded",
                status if status.is_failed() => "failed",
                _ => "finished",
            };
            lifecycle(build, state)
        }
        BuildEvent::BuildFailing { build } => lifecycle(build, "failing"),
        BuildEvent::BuildProbablyHanging { build } => lifecycle(build, "probably hanging"),
        BuildEvent::BuildFailedToStart { build } => lifecycle(build, "failed to start"),
        BuildEvent::ResponsibleAssigned { build_type, users } => (
            vec![format!("Build type {} was assigned to you.", build_type.full_name())],
            Audience::Users(users),
        ),
        BuildEvent::ResponsibleChanged { build_type, users } => (
            vec![format!("Responsible user changed for build type {}.", build_type.full_name())],
            Audience::Users(users),
        ),
        BuildEvent::TestsResponsibilityAssigned { tests, project, users } => (
            vec![format!(
                "Tests {} in project {} were assigned to you.",
                join_names(tests),
                project
            )],
            Audience::Users(users),
        ),
        BuildEvent::TestsResponsibilityChanged { tests, project, users } => (
            vec![format!(
                "Responsible user changed for tests {} in project {}.",
                join_names(tests),
                project
            )],
            Audience::Users(users),
        ),
        BuildEvent::TestsMuted { tests, scope, users } => (
            vec![format!("Tests {} muted in {}.", join_names(tests), scope)],
            Audience::Users(users),
        ),
        BuildEvent::TestsUnmuted { tests, scope, users } => (
            vec![format!("Tests {} unmuted in {}.", join_names(tests), scope)],
            Audience::Users(users),
        ),
        BuildEvent::LabelingFailed {
            build,
            vcs_root,
            reason,
            users,
        } => (
            vec![format!(
                "Labeling failed for build {} on VCS root {}: {}",
                build.qualified_name(),
                vcs_root,
                single_line(reason)
            )],
            Audience::Users(users),
        ),
    };

    Rendered { lines, audience }
}
