//! The CI server boundary.
//!
//! The bridge never owns build state. It reads and commands the build
//! server through [`BuildServer`] and receives lifecycle pushes as
//! [`BuildEvent`]s. [`MemoryBuildServer`] is the in-process implementation
//! used by the standalone host and by tests.

mod events;
mod memory;
mod types;

pub use events::BuildEvent;
pub use memory::{MemoryBuildServer, QueuedBuild};
pub use types::{BuildStatus, BuildType, Comment, NICKNAME_PROPERTY, Project, RunningBuild, User};

use crate::error::CiError;

/// Query/command interface of the CI server.
///
/// Implementations are called from the session's inbound task and must
/// return promptly.
pub trait BuildServer: Send + Sync {
    /// Builds currently executing.
    fn running_builds(&self) -> Result<Vec<RunningBuild>, CiError>;

    /// Number of builds waiting in the queue.
    fn queued_count(&self) -> Result<usize, CiError>;

    /// Find a project by its exact name.
    fn find_project(&self, name: &str) -> Result<Option<Project>, CiError>;

    /// All build types of a project, in display order.
    fn build_types(&self, project: &Project) -> Result<Vec<BuildType>, CiError>;

    /// Find a build type of `project` by its exact name.
    fn find_build_type(&self, project: &Project, name: &str) -> Result<Option<BuildType>, CiError> {
        Ok(self
            .build_types(project)?
            .into_iter()
            .find(|bt| bt.name == name))
    }

    /// Put a build of `build_type` on the queue, attributed to `triggered_by`.
    fn enqueue(&self, build_type: &BuildType, triggered_by: &str) -> Result<(), CiError>;
}
