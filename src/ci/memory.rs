//! In-process build server.
//!
//! Tracks a project catalog, running builds and the queue. Running builds
//! and build type statuses are fed from [`BuildEvent`]s; the queue is fed
//! by chat `build` commands and drained by whoever executes builds.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use tracing::{debug, info};

use super::events::BuildEvent;
use super::types::{BuildStatus, BuildType, Project, RunningBuild};
use super::BuildServer;
use crate::error::CiError;

/// A build waiting for an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueuedBuild {
    pub project: String,
    pub build_type: String,
    pub triggered_by: String,
    pub queued_at: DateTime<Utc>,
}

#[derive(Default)]
struct Inner {
    /// Project name -> build types in insertion order.
    catalog: BTreeMap<String, Vec<BuildType>>,
    running: BTreeMap<u64, RunningBuild>,
    queue: VecDeque<QueuedBuild>,
}

impl Inner {
    fn build_type_mut(&mut self, project: &str, name: &str) -> &mut BuildType {
        let types = self.catalog.entry(project.to_string()).or_default();
        match types.iter().position(|bt| bt.name == name) {
            Some(idx) => &mut types[idx],
            None => {
                types.push(BuildType::new(project, name));
                let last = types.len() - 1;
                &mut types[last]
            }
        }
    }
}

#[derive(Default)]
pub struct MemoryBuildServer {
    inner: RwLock<Inner>,
}

impl MemoryBuildServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a project with no build types. No-op if it exists.
    pub fn add_project(&self, name: &str) {
        self.inner.write().catalog.entry(name.to_string()).or_default();
    }

    /// Register a build type, creating its project as needed.
    pub fn add_build_type(&self, project: &str, name: &str) {
        self.inner.write().build_type_mut(project, name);
    }

    pub fn set_status(&self, project: &str, build_type: &str, status: BuildStatus) {
        self.inner.write().build_type_mut(project, build_type).status = status;
    }

    /// Snapshot of the queue, oldest first.
    pub fn queue(&self) -> Vec<QueuedBuild> {
        self.inner.read().queue.iter().cloned().collect()
    }

    /// Remove and return every queued build.
    pub fn drain_queue(&self) -> Vec<QueuedBuild> {
        self.inner.write().queue.drain(..).collect()
    }

    /// Fold a lifecycle event into the tracked state.
    pub fn observe(&self, event: &BuildEvent) {
        let mut inner = self.inner.write();
        match event {
            BuildEvent::BuildStarted { build } => {
                inner.build_type_mut(&build.project, &build.build_type);
                inner.running.insert(build.id, build.clone());
            }
            BuildEvent::BuildFailing { build } | BuildEvent::BuildProbablyHanging { build } => {
                inner.running.insert(build.id, build.clone());
            }
            BuildEvent::BuildFinished { build } => {
                inner.running.remove(&build.id);
                inner.build_type_mut(&build.project, &build.build_type).status = build.status;
            }
            BuildEvent::BuildFailedToStart { build } => {
                inner.running.remove(&build.id);
                inner.build_type_mut(&build.project, &build.build_type).status =
                    BuildStatus::Error;
            }
            _ => return,
        }
        debug!(event = event.kind(), running = inner.running.len(), "Build state updated");
    }
}

impl BuildServer for MemoryBuildServer {
    fn running_builds(&self) -> Result<Vec<RunningBuild>, CiError> {
        Ok(self.inner.read().running.values().cloned().collect())
    }

    fn queued_count(&self) -> Result<usize, CiError> {
        Ok(self.inner.read().queue.len())
    }

    fn find_project(&self, name: &str) -> Result<Option<Project>, CiError> {
        Ok(self
            .inner
            .read()
            .catalog
            .contains_key(name)
            .then(|| Project::new(name)))
    }

    fn build_types(&self, project: &Project) -> Result<Vec<BuildType>, CiError> {
        Ok(self
            .inner
            .read()
            .catalog
            .get(&project.name)
            .cloned()
            .unwrap_or_default())
    }

    fn enqueue(&self, build_type: &BuildType, triggered_by: &str) -> Result<(), CiError> {
        let mut inner = self.inner.write();
        let known = inner
            .catalog
            .get(&build_type.project)
            .is_some_and(|types| types.iter().any(|bt| bt.name == build_type.name));
        if !known {
            return Err(CiError::Enqueue {
                build_type: build_type.full_name(),
                reason: "build type no longer exists".to_string(),
            });
        }
        inner.queue.push_back(QueuedBuild {
            project: build_type.project.clone(),
            build_type: build_type.name.clone(),
            triggered_by: triggered_by.to_string(),
            queued_at: Utc::now(),
        });
        info!(
            build_type = %build_type.full_name(),
            triggered_by = triggered_by,
            queued = inner.queue.len(),
            "Build queued"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(id: u64, project: &str, status: BuildStatus) -> RunningBuild {
        RunningBuild {
            id,
            number: id.to_string(),
            project: project.into(),
            build_type: "Main".into(),
            status,
            agent: "agent".into(),
            comment: None,
            problems: vec![],
        }
    }

    #[test]
    fn catalog_lookup() {
        let server = MemoryBuildServer::new();
        server.add_build_type("webapp", "Main");
        server.add_build_type("webapp", "Nightly");
        server.add_build_type("webapp", "Main");
        server.add_project("empty");

        let project = server.find_project("webapp").unwrap().unwrap();
        let names: Vec<_> = server
            .build_types(&project)
            .unwrap()
            .into_iter()
            .map(|bt| bt.name)
            .collect();
        assert_eq!(names, vec!["Main", "Nightly"]);

        let empty = server.find_project("empty").unwrap().unwrap();
        assert!(server.build_types(&empty).unwrap().is_empty());
        assert!(server.find_project("missing").unwrap().is_none());
        assert!(server.find_build_type(&project, "main").unwrap().is_none());
    }

    #[test]
    fn lifecycle_events_track_running_builds() {
        let server = MemoryBuildServer::new();
        server.observe(&BuildEvent::BuildStarted {
            build: build(1, "webapp", BuildStatus::Unknown),
        });
        server.observe(&BuildEvent::BuildStarted {
            build: build(2, "mobile", BuildStatus::Unknown),
        });
        assert_eq!(server.running_builds().unwrap().len(), 2);

        server.observe(&BuildEvent::BuildFinished {
            build: build(1, "webapp", BuildStatus::Failure),
        });
        let running = server.running_builds().unwrap();
        assert_eq!(running.len(), 1);
        assert_eq!(running[0].project, "mobile");

        let project = server.find_project("webapp").unwrap().unwrap();
        let types = server.build_types(&project).unwrap();
        assert_eq!(types[0].status, BuildStatus::Failure);
    }

    #[test]
    fn enqueue_and_drain() {
        let server = MemoryBuildServer::new();
        server.add_build_type("webapp", "Main");
        let bt = BuildType::new("webapp", "Main");

        server.enqueue(&bt, "alice").unwrap();
        server.enqueue(&bt, "bob").unwrap();
        assert_eq!(server.queued_count().unwrap(), 2);

        let drained = server.drain_queue();
        assert_eq!(drained[0].triggered_by, "alice");
        assert_eq!(drained[1].triggered_by, "bob");
        assert_eq!(server.queued_count().unwrap(), 0);
    }

    #[test]
    fn enqueue_unknown_build_type_fails() {
        let server = MemoryBuildServer::new();
        let err = server
            .enqueue(&BuildType::new("ghost", "Main"), "alice")
            .unwrap_err();
        assert!(matches!(err, CiError::Enqueue { .. }));
    }
}
