//! Notification bridge: CI lifecycle events to chat.
//!
//! Build lifecycle events are broadcast to every channel whose routing
//! filter accepts the build's project. Responsibility, mute and labeling
//! events go privately to each affected user's IRC nickname. With no
//! session attached, events are dropped.

mod format;

pub use format::{Audience, Rendered, format_running_build, join_names, render};

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::ci::BuildEvent;
use crate::metrics;
use crate::session::Session;
use crate::telemetry::spans;

#[derive(Default)]
pub struct Notifier {
    session: RwLock<Option<Session>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route future events to `session`, replacing any previous one.
    pub fn attach(&self, session: Session) {
        *self.session.write() = Some(session);
        info!("Session attached to notifier");
    }

    /// Stop routing events; returns the session that was attached.
    pub fn detach(&self) -> Option<Session> {
        self.session.write().take()
    }

    pub fn is_attached(&self) -> bool {
        self.session.read().is_some()
    }

    /// Deliver one event. Returns the number of recipients reached
    /// (channels for broadcasts, users for personal events).
    pub fn notify(&self, event: &BuildEvent) -> usize {
        let span = spans::notification(event.kind());
        let _enter = span.enter();

        let Some(session) = self.session.read().clone() else {
            debug!("No session attached, dropping notification");
            return 0;
        };

        let rendered = render(event);
        let reached = match rendered.audience {
            Audience::Project(project) => session.broadcast(project, &rendered.lines),
            Audience::Users(users) => users
                .iter()
                .filter(|user| {
                    let nick = user.irc_nickname();
                    info!(user = %user.username, nick = %nick, "Notifying user");
                    let sent = rendered
                        .lines
                        .iter()
                        .filter(|line| session.send_to_user(nick, line))
                        .count();
                    sent > 0
                })
                .count(),
        };

        metrics::record_notification(event.kind(), reached);
        debug!(reached = reached, "Notification delivered");
        reached
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ci::{BuildStatus, BuildType, MemoryBuildServer, NICKNAME_PROPERTY, RunningBuild, User};
    use crate::command::Dispatcher;
    use crate::config::Settings;
    use crate::routing::{Channel, RoutingTable};
    use ircbridge_proto::{Command, Message};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn settings() -> Arc<Settings> {
        let channels: RoutingTable = [
            Channel::open("#ci"),
            Channel::new("#web", Some("web.*".into())).unwrap(),
            Channel::new("#mobile", Some("mobile.*".into())).unwrap(),
        ]
        .into_iter()
        .collect();
        Arc::new(Settings {
            hostname: "irc.example.net".into(),
            port: 6667,
            use_ssl: false,
            nickname: "bot".into(),
            username: "bot".into(),
            realname: "Bot".into(),
            password: String::new(),
            channels,
        })
    }

    fn attached() -> (Notifier, Session, mpsc::Receiver<Message>) {
        let (session, rx) = Session::registered(
            settings(),
            Dispatcher::new(Arc::new(MemoryBuildServer::new())),
        );
        let notifier = Notifier::new();
        notifier.attach(session.clone());
        (notifier, session, rx)
    }

    fn sent(rx: &mut mpsc::Receiver<Message>) -> Vec<(String, String)> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            if let Command::PRIVMSG(target, text) = msg.command {
                out.push((target, text));
            }
        }
        out
    }

    fn failed_webapp_build() -> RunningBuild {
        RunningBuild {
            id: 3,
            number: "88".into(),
            project: "webapp".into(),
            build_type: "Main".into(),
            status: BuildStatus::Failure,
            agent: "linux-2".into(),
            comment: None,
            problems: vec![],
        }
    }

    #[test]
    fn failed_build_reaches_interested_channels_only() {
        let (notifier, _session, mut rx) = attached();
        let reached = notifier.notify(&BuildEvent::BuildFinished {
            build: failed_webapp_build(),
        });

        assert_eq!(reached, 2);
        let line = "Build webapp :: Main #88 failed (on agent: linux-2)".to_string();
        assert_eq!(
            sent(&mut rx),
            vec![("#ci".to_string(), line.clone()), ("#web".to_string(), line)]
        );
    }

    #[test]
    fn personal_events_go_to_nicknames() {
        let (notifier, _session, mut rx) = attached();
        let event = BuildEvent::ResponsibleAssigned {
            build_type: BuildType::new("webapp", "Main"),
            users: vec![
                User::new("jdoe").with_property(NICKNAME_PROPERTY, "johnny"),
                User::new("asmith"),
            ],
        };

        assert_eq!(notifier.notify(&event), 2);
        let text = "Build type webapp :: Main was assigned to you.".to_string();
        assert_eq!(
            sent(&mut rx),
            vec![("johnny".to_string(), text.clone()), ("asmith".to_string(), text)]
        );
    }

    #[test]
    fn detached_notifier_drops_events() {
        let (notifier, _session, mut rx) = attached();
        assert!(notifier.detach().is_some());
        assert!(!notifier.is_attached());

        let reached = notifier.notify(&BuildEvent::BuildStarted {
            build: failed_webapp_build(),
        });
        assert_eq!(reached, 0);
        assert!(sent(&mut rx).is_empty());
    }

    #[test]
    fn shut_down_session_drops_events() {
        let (notifier, session, mut rx) = attached();
        session.shutdown("Reloading configuration");

        let reached = notifier.notify(&BuildEvent::BuildFinished {
            build: failed_webapp_build(),
        });
        assert_eq!(reached, 0);
        assert!(sent(&mut rx).is_empty());
    }
}
