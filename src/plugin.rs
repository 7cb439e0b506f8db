//! Lifecycle controller.
//!
//! Owns the current [`Session`] and swaps it on configuration reload. A
//! reload that fails validation leaves the running session untouched.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::ci::BuildServer;
use crate::command::Dispatcher;
use crate::config::{SessionOptions, Settings};
use crate::error::{ConfigError, error_chain};
use crate::notify::Notifier;
use crate::session::{Connector, Session};

/// QUIT reason when a reload replaces the session.
pub const RELOAD_REASON: &str = "Reloading configuration";

/// QUIT reason when the host shuts down.
pub const SHUTDOWN_REASON: &str = "Server shutting down...";

struct Active {
    settings: Arc<Settings>,
    session: Session,
}

pub struct Plugin {
    dispatcher: Dispatcher,
    connector: Arc<dyn Connector>,
    options: SessionOptions,
    notifier: Arc<Notifier>,
    active: Mutex<Option<Active>>,
}

impl Plugin {
    pub fn new(
        server: Arc<dyn BuildServer>,
        connector: Arc<dyn Connector>,
        options: SessionOptions,
    ) -> Self {
        Self {
            dispatcher: Dispatcher::new(server),
            connector,
            options,
            notifier: Arc::new(Notifier::new()),
            active: Mutex::new(None),
        }
    }

    pub fn notifier(&self) -> Arc<Notifier> {
        self.notifier.clone()
    }

    pub fn session(&self) -> Option<Session> {
        self.active.lock().as_ref().map(|a| a.session.clone())
    }

    pub fn settings(&self) -> Option<Arc<Settings>> {
        self.active.lock().as_ref().map(|a| a.settings.clone())
    }

    /// Parse `doc` and reload from it.
    pub fn load_document(&self, doc: &str) -> bool {
        self.reload(Settings::from_document(doc))
    }

    /// Replace the session with one built from `loaded`.
    ///
    /// On error the current session (if any) keeps running and `false` is
    /// returned. Must be called from within a Tokio runtime.
    pub fn reload(&self, loaded: Result<Settings, ConfigError>) -> bool {
        let settings = match loaded {
            Ok(settings) => Arc::new(settings),
            Err(e) => {
                error!(error = %error_chain(&e), "Invalid IRC settings, keeping current session");
                return false;
            }
        };

        let mut active = self.active.lock();
        if let Some(old) = active.take() {
            self.notifier.detach();
            old.session.shutdown(RELOAD_REASON);
        }

        let session = Session::spawn(
            settings.clone(),
            self.options.clone(),
            self.connector.clone(),
            self.dispatcher.clone(),
        );
        self.notifier.attach(session.clone());
        info!(
            server = %settings.address(),
            nick = %settings.nickname,
            channels = settings.channels.len(),
            "IRC session started"
        );
        *active = Some(Active { settings, session });
        true
    }

    /// Serialize the current settings; `None` when nothing is loaded.
    pub fn write_document(&self) -> Option<Result<String, ConfigError>> {
        self.settings().map(|s| s.to_document())
    }

    /// Quit and stop the current session. Returns it so the caller can
    /// await [`Session::closed`].
    pub fn shutdown(&self) -> Option<Session> {
        let active = self.active.lock().take();
        self.notifier.detach();
        match active {
            Some(Active { session, .. }) => {
                session.shutdown(SHUTDOWN_REASON);
                Some(session)
            }
            None => {
                warn!("Shutdown requested with no IRC session running");
                None
            }
        }
    }
}
