//! HTTP surface of the standalone host.
//!
//! - `POST /events` - a JSON [`BuildEvent`]; updates the build server and notifies chat
//! - `GET /queue` - drains builds queued from chat
//! - `POST /reload` - re-reads the settings document from the config file
//! - `GET /status` - session status
//! - `GET /metrics` - Prometheus text format

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::ci::{BuildEvent, MemoryBuildServer, QueuedBuild};
use crate::config::Settings;
use crate::error::error_chain;
use crate::plugin::Plugin;
use crate::session::SessionStatus;

#[derive(Clone)]
pub struct AppState {
    pub plugin: Arc<Plugin>,
    pub server: Arc<MemoryBuildServer>,
    pub config_path: Arc<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct EventReceipt {
    pub event: &'static str,
    pub reached: usize,
}

#[derive(Debug, Serialize)]
pub struct ReloadReceipt {
    pub reloaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

async fn post_event(
    State(state): State<AppState>,
    Json(event): Json<BuildEvent>,
) -> Json<EventReceipt> {
    state.server.observe(&event);
    let reached = state.plugin.notifier().notify(&event);
    Json(EventReceipt {
        event: event.kind(),
        reached,
    })
}

async fn get_queue(State(state): State<AppState>) -> Json<Vec<QueuedBuild>> {
    Json(state.server.drain_queue())
}

async fn post_reload(State(state): State<AppState>) -> (StatusCode, Json<ReloadReceipt>) {
    let loaded = Settings::load(state.config_path.as_path());
    let error = loaded.as_ref().err().map(|e| error_chain(e));
    if state.plugin.reload(loaded) {
        (
            StatusCode::OK,
            Json(ReloadReceipt {
                reloaded: true,
                error: None,
            }),
        )
    } else {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ReloadReceipt {
                reloaded: false,
                error,
            }),
        )
    }
}

async fn get_status(State(state): State<AppState>) -> Result<Json<SessionStatus>, StatusCode> {
    state
        .plugin
        .session()
        .map(|s| Json(s.status()))
        .ok_or(StatusCode::SERVICE_UNAVAILABLE)
}

async fn metrics_handler() -> String {
    crate::metrics::gather_metrics()
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/events", post(post_event))
        .route("/queue", get(get_queue))
        .route("/reload", post(post_reload))
        .route("/status", get(get_status))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Serve the host routes until `shutdown` is cancelled.
pub async fn run_http_server(listen: SocketAddr, state: AppState, shutdown: CancellationToken) {
    let listener = match tokio::net::TcpListener::bind(&listen).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(addr = %listen, error = %e, "Failed to bind HTTP server");
            return;
        }
    };
    info!(addr = %listen, "HTTP server listening");

    let served = axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await;
    if let Err(e) = served {
        error!(error = %e, "HTTP server error");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ci::{BuildServer, BuildStatus, BuildType, RunningBuild};
    use crate::config::SessionOptions;
    use crate::session::RefusingConnector;
    use std::io::Write;

    const DOC: &str = r##"
[irc]
nickname = "bot"
username = "bot"

[irc.connection]
host = "irc.example.net"

[[irc.channels]]
name = "#ci"
"##;

    fn state(config: &tempfile::NamedTempFile) -> AppState {
        let server = Arc::new(MemoryBuildServer::new());
        let plugin = Plugin::new(
            server.clone(),
            Arc::new(RefusingConnector),
            SessionOptions::default(),
        );
        AppState {
            plugin: Arc::new(plugin),
            server,
            config_path: Arc::new(config.path().to_path_buf()),
        }
    }

    fn config_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn events_update_build_server() {
        let file = config_file(DOC);
        let state = state(&file);
        let build = RunningBuild {
            id: 9,
            number: "3".into(),
            project: "webapp".into(),
            build_type: "Main".into(),
            status: BuildStatus::Unknown,
            agent: "linux-1".into(),
            comment: None,
            problems: vec![],
        };

        let Json(receipt) = post_event(
            State(state.clone()),
            Json(BuildEvent::BuildStarted { build }),
        )
        .await;
        assert_eq!(receipt.event, "build_started");
        assert_eq!(receipt.reached, 0);
        assert_eq!(state.server.running_builds().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn queue_is_drained() {
        let file = config_file(DOC);
        let state = state(&file);
        state.server.add_build_type("webapp", "Main");
        state
            .server
            .enqueue(&BuildType::new("webapp", "Main"), "alice")
            .unwrap();

        let Json(first) = get_queue(State(state.clone())).await;
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].triggered_by, "alice");
        let Json(second) = get_queue(State(state)).await;
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn reload_and_status() {
        let file = config_file(DOC);
        let state = state(&file);
        assert_eq!(
            get_status(State(state.clone())).await.err(),
            Some(StatusCode::SERVICE_UNAVAILABLE)
        );

        let (code, Json(receipt)) = post_reload(State(state.clone())).await;
        assert_eq!(code, StatusCode::OK);
        assert!(receipt.reloaded);

        let Json(status) = get_status(State(state.clone())).await.unwrap();
        assert_eq!(status.server, "irc.example.net:6667");
        assert_eq!(status.nickname, "bot");
    }

    #[tokio::test]
    async fn failed_reload_reports_error() {
        let file = config_file("[irc]\nnickname = \"bot\"\n");
        let state = state(&file);

        let (code, Json(receipt)) = post_reload(State(state.clone())).await;
        assert_eq!(code, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(!receipt.reloaded);
        assert!(receipt.error.is_some());
        assert!(state.plugin.session().is_none());
    }
}
