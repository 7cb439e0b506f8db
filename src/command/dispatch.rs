//! Executing bot commands against the build server.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error};

use super::parse::BotCommand;
use crate::ci::BuildServer;
use crate::error::{CiError, error_chain};
use crate::metrics;
use crate::telemetry::CommandTimer;

/// Reply when a command could not be carried out.
pub const COMMAND_FAILED: &str = "Command failed, see the build server log";

/// Help block, one reply line each.
pub const USAGE: &[&str] = &[
    "I understand these commands",
    "  build <project name> <build type name>",
    "         Start a build",
    "  help",
    "         Show this message",
    "  show <project name>",
    "         Show the status of the project",
    "  status",
    "         Show the running and queued builds",
];

/// Runs [`BotCommand`]s and produces reply lines.
#[derive(Clone)]
pub struct Dispatcher {
    server: Arc<dyn BuildServer>,
}

impl Dispatcher {
    pub fn new(server: Arc<dyn BuildServer>) -> Self {
        Self { server }
    }

    /// Execute `command` on behalf of `sender`.
    ///
    /// Never fails: build server errors and panics become
    /// [`COMMAND_FAILED`] and are logged.
    pub fn execute(&self, command: &BotCommand, sender: &str) -> Vec<String> {
        let _timer = CommandTimer::new(command.name());

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.run(command, sender)));
        match outcome {
            Ok(Ok(lines)) => {
                debug!(command = command.name(), lines = lines.len(), "Command executed");
                lines
            }
            Ok(Err(e)) => {
                error!(command = command.name(), error = %error_chain(&e), "Command failed");
                metrics::record_command_error(command.name());
                vec![COMMAND_FAILED.to_string()]
            }
            Err(_) => {
                error!(command = command.name(), "Build server panicked while handling command");
                metrics::record_command_error(command.name());
                vec![COMMAND_FAILED.to_string()]
            }
        }
    }

    fn run(&self, command: &BotCommand, sender: &str) -> Result<Vec<String>, CiError> {
        match command {
            BotCommand::Status => self.status(),
            BotCommand::Build {
                project,
                build_type,
            } => self.build(project, build_type, sender),
            BotCommand::Show { project } => self.show(project),
            BotCommand::Help => Ok(usage(false)),
            BotCommand::MissingParameters => Ok(vec!["Missing parameters".to_string()]),
            BotCommand::Unknown => Ok(usage(true)),
        }
    }

    fn status(&self) -> Result<Vec<String>, CiError> {
        let mut lines = Vec::new();

        let running = self.server.running_builds()?;
        if running.is_empty() {
            lines.push("No running builds".to_string());
        } else {
            lines.push("Running builds:".to_string());
            lines.extend(running.iter().map(|b| format!(" - {}", b.qualified_name())));
        }

        match self.server.queued_count()? {
            0 => lines.push("No queued builds".to_string()),
            n => lines.push(format!("{} queued builds", n)),
        }

        Ok(lines)
    }

    fn build(&self, project: &str, build_type: &str, sender: &str) -> Result<Vec<String>, CiError> {
        let Some(project) = self.server.find_project(project)? else {
            return Ok(vec!["Unknown project".to_string()]);
        };
        let Some(build_type) = self.server.find_build_type(&project, build_type)? else {
            return Ok(vec!["Unknown build type".to_string()]);
        };
        self.server.enqueue(&build_type, sender)?;
        Ok(vec!["Build queued".to_string()])
    }

    fn show(&self, project: &str) -> Result<Vec<String>, CiError> {
        let Some(project) = self.server.find_project(project)? else {
            return Ok(vec!["Unknown project".to_string()]);
        };
        Ok(self
            .server
            .build_types(&project)?
            .iter()
            .map(|bt| format!("{} - {}", bt.full_name(), bt.status))
            .collect())
    }
}

fn usage(confused: bool) -> Vec<String> {
    let mut lines = Vec::with_capacity(USAGE.len() + 1);
    if confused {
        lines.push("What?".to_string());
    }
    lines.extend(USAGE.iter().map(|l| l.to_string()));
    lines
}
