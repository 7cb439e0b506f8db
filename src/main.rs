//! ircbridge - standalone host.
//!
//! Runs one IRC session against an in-process build server fed over HTTP.

use ircbridge::ci::MemoryBuildServer;
use ircbridge::config::{HostConfig, Settings};
use ircbridge::http::{self, AppState};
use ircbridge::metrics;
use ircbridge::plugin::Plugin;
use ircbridge::session::TcpConnector;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// How long to wait for QUIT to reach the server on shutdown.
const QUIT_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "ircbridge.toml".to_string());

    let host = HostConfig::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    metrics::init();

    let server = Arc::new(MemoryBuildServer::new());
    for entry in &host.catalog {
        server.add_project(&entry.project);
        for build_type in &entry.build_types {
            server.add_build_type(&entry.project, build_type);
        }
    }
    info!(projects = host.catalog.len(), "Build catalog seeded");

    let plugin = Arc::new(Plugin::new(
        server.clone(),
        Arc::new(TcpConnector),
        host.session.clone(),
    ));
    if !plugin.reload(Settings::load(&config_path)) {
        warn!(path = %config_path, "No IRC session started; fix the config and POST /reload");
    }

    let http_shutdown = CancellationToken::new();
    let http_task = {
        let state = AppState {
            plugin: plugin.clone(),
            server,
            config_path: Arc::new(PathBuf::from(&config_path)),
        };
        let token = http_shutdown.clone();
        let listen = host.http.listen;
        tokio::spawn(async move {
            http::run_http_server(listen, state, token).await;
        })
    };

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    if let Some(session) = plugin.shutdown() {
        if tokio::time::timeout(QUIT_GRACE, session.closed()).await.is_err() {
            warn!("IRC session did not close in time");
        }
    }

    http_shutdown.cancel();
    if let Err(e) = http_task.await {
        error!(error = %e, "HTTP task failed");
    }

    info!("ircbridge stopped");
    Ok(())
}
