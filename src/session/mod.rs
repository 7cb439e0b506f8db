//! One IRC connection and its reconnect policy.
//!
//! A [`Session`] is a cheap, cloneable handle. The connection itself is
//! owned by a driver task (see `driver.rs`) that connects, registers,
//! pumps lines in both directions and reconnects until
//! [`Session::shutdown`] is called. Outbound traffic goes through a bounded
//! queue drained by the driver; every send is fire-and-forget.
//!
//! Session state (phase, working nickname, routing table) lives behind one
//! mutex so joins, invites and broadcasts never interleave.

mod connector;
mod driver;
mod events;
mod stream;
mod tls;

pub use connector::{BoxedIo, Connector, IrcIo, TcpConnector};
#[cfg(test)]
pub(crate) use connector::RefusingConnector;
pub use events::InboundEvent;
pub use stream::BridgeStream;
pub use tls::{TrustAllVerifier, upgrade_to_tls};

use chrono::{DateTime, Utc};
use ircbridge_proto::Message;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::command::{Addressed, BotCommand, Dispatcher};
use crate::config::{SessionOptions, Settings};
use crate::metrics;
use crate::routing::{Channel, RoutingTable};
use crate::telemetry::spans;

/// Outbound lines buffered for the driver.
const OUTBOUND_QUEUE: usize = 1024;

/// Where the session is in its connect/register life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Disconnected,
    /// Opening the transport.
    Connecting,
    /// Transport up, waiting for the welcome numeric.
    Registering,
    Connected,
    /// Shut down for good.
    Terminated,
}

/// Snapshot for the host's status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub phase: Phase,
    pub server: String,
    pub nickname: String,
    pub channels: Vec<String>,
    pub connect_attempts: u64,
    pub connected_since: Option<DateTime<Utc>>,
    pub shutting_down: bool,
}

/// Which link state a message needs before it may be queued.
#[derive(Debug, Clone, Copy)]
enum Gate {
    /// Any live link, registered or not (NICK, PONG).
    Link,
    /// Registration complete (JOIN, PRIVMSG).
    Registered,
}

struct State {
    phase: Phase,
    nickname: String,
    channels: RoutingTable,
    connect_attempts: u64,
    connected_since: Option<DateTime<Utc>>,
    quit_reason: Option<String>,
}

struct Shared {
    settings: Arc<Settings>,
    options: SessionOptions,
    dispatcher: Dispatcher,
    state: Mutex<State>,
    outbound: mpsc::Sender<Message>,
    shutdown: CancellationToken,
    finished: CancellationToken,
}

/// Handle to a running IRC session.
#[derive(Clone)]
pub struct Session {
    shared: Arc<Shared>,
}

impl Session {
    /// Start a session: the driver begins connecting immediately.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(
        settings: Arc<Settings>,
        options: SessionOptions,
        connector: Arc<dyn Connector>,
        dispatcher: Dispatcher,
    ) -> Self {
        let (session, outbound) = Self::new(settings, options, dispatcher);
        tokio::spawn(driver::run(session.clone(), outbound, connector));
        session
    }

    /// Build a session without a driver. The caller owns the outbound queue.
    pub(crate) fn new(
        settings: Arc<Settings>,
        options: SessionOptions,
        dispatcher: Dispatcher,
    ) -> (Self, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE);
        let state = State {
            phase: Phase::Disconnected,
            nickname: settings.nickname.clone(),
            channels: settings.channels.clone(),
            connect_attempts: 0,
            connected_since: None,
            quit_reason: None,
        };
        let shared = Shared {
            settings,
            options,
            dispatcher,
            state: Mutex::new(state),
            outbound: tx,
            shutdown: CancellationToken::new(),
            finished: CancellationToken::new(),
        };
        (
            Self {
                shared: Arc::new(shared),
            },
            rx,
        )
    }

    /// A detached session that has completed registration, with the JOINs
    /// already drained from the returned queue.
    #[cfg(test)]
    pub(crate) fn registered(
        settings: Arc<Settings>,
        dispatcher: Dispatcher,
    ) -> (Self, mpsc::Receiver<Message>) {
        let (session, mut rx) = Self::new(settings, SessionOptions::default(), dispatcher);
        session.link_up();
        session.handle_event(InboundEvent::Registered);
        while rx.try_recv().is_ok() {}
        (session, rx)
    }

    pub fn settings(&self) -> &Arc<Settings> {
        &self.shared.settings
    }

    pub fn options(&self) -> &SessionOptions {
        &self.shared.options
    }

    /// The nickname the server currently knows us by.
    pub fn nickname(&self) -> String {
        self.shared.state.lock().nickname.clone()
    }

    pub fn phase(&self) -> Phase {
        self.shared.state.lock().phase
    }

    pub fn is_connected(&self) -> bool {
        self.phase() == Phase::Connected
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shared.shutdown.is_cancelled()
    }

    pub fn status(&self) -> SessionStatus {
        let state = self.shared.state.lock();
        SessionStatus {
            phase: state.phase,
            server: self.shared.settings.address(),
            nickname: state.nickname.clone(),
            channels: state.channels.names(),
            connect_attempts: state.connect_attempts,
            connected_since: state.connected_since,
            shutting_down: self.is_shutting_down(),
        }
    }

    // ------------------------------------------------------------------
    // Outbound
    // ------------------------------------------------------------------

    pub fn send_to_channel(&self, channel: &str, text: &str) -> bool {
        self.privmsg(channel, text)
    }

    pub fn send_to_user(&self, nickname: &str, text: &str) -> bool {
        self.privmsg(nickname, text)
    }

    /// Message each nickname; returns how many were queued.
    pub fn send_to_users<'a, I>(&self, nicknames: I, text: &str) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        let phase = self.phase();
        nicknames
            .into_iter()
            .filter(|nick| self.enqueue(phase, Gate::Registered, Message::privmsg(*nick, text)))
            .count()
    }

    /// Send `lines` to every channel interested in `project`.
    ///
    /// Returns the number of channels reached.
    pub fn broadcast(&self, project: &str, lines: &[String]) -> usize {
        let state = self.shared.state.lock();
        let phase = state.phase;
        if phase != Phase::Connected || self.is_shutting_down() {
            debug!(project = project, "Not connected, dropping broadcast");
            return 0;
        }

        let mut reached = 0;
        for channel in state.channels.interested(project) {
            for line in lines {
                self.enqueue(phase, Gate::Registered, Message::privmsg(channel.name(), line));
            }
            reached += 1;
        }
        reached
    }

    /// Add a catch-all channel and join it. No-op if already present.
    pub fn join_channel(&self, name: &str) {
        let mut state = self.shared.state.lock();
        if state.channels.contains(name) {
            return;
        }
        state.channels.insert(Channel::open(name));
        self.enqueue(state.phase, Gate::Registered, Message::join(name));
    }

    /// Stop for good: QUIT with `reason` if connected, cancel any pending
    /// reconnect, and never reconnect again. Idempotent; the first reason
    /// wins.
    pub fn shutdown(&self, reason: &str) {
        {
            let mut state = self.shared.state.lock();
            if state.quit_reason.is_none() {
                state.quit_reason = Some(reason.to_string());
            }
        }
        if !self.shared.shutdown.is_cancelled() {
            info!(reason = reason, "Shutting down IRC session");
            self.shared.shutdown.cancel();
        }
    }

    /// Resolves once the driver has exited after [`Self::shutdown`].
    pub async fn closed(&self) {
        self.shared.finished.cancelled().await
    }

    fn privmsg(&self, target: &str, text: &str) -> bool {
        let phase = self.phase();
        self.enqueue(phase, Gate::Registered, Message::privmsg(target, text))
    }

    fn enqueue(&self, phase: Phase, gate: Gate, msg: Message) -> bool {
        if self.is_shutting_down() {
            return false;
        }
        let open = match gate {
            Gate::Link => matches!(phase, Phase::Registering | Phase::Connected),
            Gate::Registered => phase == Phase::Connected,
        };
        if !open {
            debug!(phase = ?phase, command = %msg.command.name(), "Link not ready, dropping message");
            metrics::record_message_dropped();
            return false;
        }
        match self.shared.outbound.try_send(msg) {
            Ok(()) => true,
            Err(TrySendError::Full(msg)) => {
                warn!(command = %msg.command.name(), "Outbound queue full, dropping message");
                metrics::record_message_dropped();
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    // ------------------------------------------------------------------
    // Inbound
    // ------------------------------------------------------------------

    /// React to one inbound event. Runs on the driver task.
    pub(crate) fn handle_event(&self, event: InboundEvent) {
        match event {
            InboundEvent::Registered => self.on_registered(),
            InboundEvent::NicknameInUse => self.on_nickname_in_use(),
            InboundEvent::ProtocolError { code, text } => {
                warn!(code = code, text = %text, "IRC error reply");
            }
            InboundEvent::Invite { from, channel } => {
                info!(from = %from, channel = %channel, "Invited to channel");
                self.accept_invite(&channel);
            }
            InboundEvent::Privmsg {
                sender,
                target,
                text,
            } => self.on_privmsg(&sender, &target, &text),
            InboundEvent::Ping { token } => {
                let phase = self.phase();
                self.enqueue(phase, Gate::Link, Message::pong(token));
            }
            InboundEvent::ServerError(text) => {
                warn!(text = %text, "IRC server error");
            }
        }
    }

    fn on_registered(&self) {
        let mut state = self.shared.state.lock();
        state.phase = Phase::Connected;
        state.connected_since = Some(Utc::now());
        metrics::set_link_up(true);
        info!(nick = %state.nickname, channels = state.channels.len(), "Registered with IRC server");

        for name in state.channels.names() {
            self.enqueue(Phase::Connected, Gate::Registered, Message::join(name));
        }
    }

    fn on_nickname_in_use(&self) {
        let mut state = self.shared.state.lock();
        state.nickname.push('_');
        warn!(nick = %state.nickname, "Nickname in use, retrying");
        self.enqueue(state.phase, Gate::Link, Message::nick(state.nickname.clone()));
    }

    fn accept_invite(&self, channel: &str) {
        let mut state = self.shared.state.lock();
        if !state.channels.contains(channel) {
            state.channels.insert(Channel::open(channel));
        }
        self.enqueue(state.phase, Gate::Registered, Message::join(channel));
    }

    fn on_privmsg(&self, sender: &str, target: &str, text: &str) {
        let nickname = self.nickname();
        let Some(addressed) = Addressed::classify(sender, target, text, &nickname) else {
            return;
        };

        let command = BotCommand::parse(&addressed.text);
        let reply_to = addressed.reply_target();
        let span = spans::command(command.name(), &addressed.sender, reply_to);
        let _enter = span.enter();

        let lines = self.shared.dispatcher.execute(&command, &addressed.sender);
        for line in &lines {
            self.privmsg(reply_to, &addressed.format_reply(line));
        }
        debug!(lines = lines.len(), "Replied to command");
    }

    // ------------------------------------------------------------------
    // Driver hooks
    // ------------------------------------------------------------------

    fn cancelled(&self) -> &CancellationToken {
        &self.shared.shutdown
    }

    fn begin_connect(&self) {
        let mut state = self.shared.state.lock();
        state.phase = Phase::Connecting;
        state.connect_attempts += 1;
        metrics::record_connect_attempt();
    }

    /// Transport is up; registration starts with the configured nickname.
    fn link_up(&self) -> String {
        let mut state = self.shared.state.lock();
        state.phase = Phase::Registering;
        state.nickname = self.shared.settings.nickname.clone();
        state.nickname.clone()
    }

    fn link_down(&self) {
        let mut state = self.shared.state.lock();
        state.phase = Phase::Disconnected;
        state.connected_since = None;
        metrics::set_link_up(false);
    }

    fn terminate(&self) {
        self.shared.state.lock().phase = Phase::Terminated;
        metrics::set_link_up(false);
        self.shared.finished.cancel();
    }

    fn quit_reason(&self) -> Option<String> {
        self.shared.state.lock().quit_reason.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ci::MemoryBuildServer;
    use ircbridge_proto::Command;

    fn settings() -> Settings {
        let mut channels = RoutingTable::new();
        channels.insert(Channel::open("#ci"));
        channels.insert(Channel::new("#web", Some("web.*".into())).unwrap());
        channels.insert(Channel::new("#mobile", Some("mobile.*".into())).unwrap());
        Settings {
            hostname: "irc.example.net".into(),
            port: 6667,
            use_ssl: false,
            nickname: "bot".into(),
            username: "bot".into(),
            realname: "Bot".into(),
            password: String::new(),
            channels,
        }
    }

    fn detached() -> (Session, mpsc::Receiver<Message>, Arc<MemoryBuildServer>) {
        let server = Arc::new(MemoryBuildServer::new());
        let (session, rx) = Session::new(
            Arc::new(settings()),
            SessionOptions::default(),
            Dispatcher::new(server.clone()),
        );
        (session, rx, server)
    }

    fn registered() -> (Session, mpsc::Receiver<Message>, Arc<MemoryBuildServer>) {
        let (session, mut rx, server) = detached();
        session.link_up();
        session.handle_event(InboundEvent::Registered);
        drain(&mut rx);
        (session, rx, server)
    }

    fn drain(rx: &mut mpsc::Receiver<Message>) -> Vec<Command> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg.command);
        }
        out
    }

    fn privmsg(target: &str, text: &str) -> Command {
        Command::PRIVMSG(target.into(), text.into())
    }

    #[test]
    fn registration_joins_configured_channels() {
        let (session, mut rx, _) = detached();
        session.link_up();
        assert_eq!(session.phase(), Phase::Registering);

        session.handle_event(InboundEvent::Registered);
        assert!(session.is_connected());
        assert_eq!(
            drain(&mut rx),
            vec![
                Command::JOIN("#ci".into(), None),
                Command::JOIN("#web".into(), None),
                Command::JOIN("#mobile".into(), None),
            ]
        );
    }

    #[test]
    fn nickname_collision_appends_underscore() {
        let (session, mut rx, _) = detached();
        session.link_up();

        session.handle_event(InboundEvent::NicknameInUse);
        session.handle_event(InboundEvent::NicknameInUse);

        assert_eq!(session.nickname(), "bot__");
        assert_eq!(session.phase(), Phase::Registering);
        assert_eq!(
            drain(&mut rx),
            vec![Command::NICK("bot_".into()), Command::NICK("bot__".into())]
        );
    }

    #[test]
    fn new_link_resets_nickname() {
        let (session, _rx, _) = detached();
        session.link_up();
        session.handle_event(InboundEvent::NicknameInUse);
        session.link_down();
        assert_eq!(session.link_up(), "bot");
        assert_eq!(session.nickname(), "bot");
    }

    #[test]
    fn answers_ping_before_registration() {
        let (session, mut rx, _) = detached();
        session.link_up();
        session.handle_event(InboundEvent::Ping {
            token: "irc.example.net".into(),
        });
        assert_eq!(
            drain(&mut rx),
            vec![Command::PONG("irc.example.net".into(), None)]
        );
    }

    #[test]
    fn channel_mention_gets_prefixed_reply() {
        let (session, mut rx, _) = registered();
        session.handle_event(InboundEvent::Privmsg {
            sender: "alice".into(),
            target: "#ci".into(),
            text: "bot: status".into(),
        });
        assert_eq!(
            drain(&mut rx),
            vec![
                privmsg("#ci", "alice: No running builds"),
                privmsg("#ci", "alice: No queued builds"),
            ]
        );
    }

    #[test]
    fn direct_message_gets_private_reply() {
        let (session, mut rx, server) = registered();
        server.add_build_type("alpha", "Main");
        session.handle_event(InboundEvent::Privmsg {
            sender: "alice".into(),
            target: "bot".into(),
            text: "build alpha Main".into(),
        });
        assert_eq!(drain(&mut rx), vec![privmsg("alice", "Build queued")]);
        assert_eq!(server.queue()[0].triggered_by, "alice");
    }

    #[test]
    fn channel_chatter_is_ignored() {
        let (session, mut rx, _) = registered();
        session.handle_event(InboundEvent::Privmsg {
            sender: "alice".into(),
            target: "#ci".into(),
            text: "anyone seen the build?".into(),
        });
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn commands_follow_working_nickname() {
        let (session, mut rx, _) = detached();
        session.link_up();
        session.handle_event(InboundEvent::NicknameInUse);
        session.handle_event(InboundEvent::Registered);
        drain(&mut rx);

        session.handle_event(InboundEvent::Privmsg {
            sender: "alice".into(),
            target: "#ci".into(),
            text: "bot_: help".into(),
        });
        let replies = drain(&mut rx);
        assert_eq!(replies[0], privmsg("#ci", "alice: I understand these commands"));
    }

    #[test]
    fn invite_joins_and_routes_everything() {
        let (session, mut rx, _) = registered();
        session.handle_event(InboundEvent::Invite {
            from: "alice".into(),
            channel: "#secret".into(),
        });
        assert_eq!(drain(&mut rx), vec![Command::JOIN("#secret".into(), None)]);

        let reached = session.broadcast("anything", &["hello".to_string()]);
        assert_eq!(reached, 2);
        assert_eq!(
            drain(&mut rx),
            vec![privmsg("#ci", "hello"), privmsg("#secret", "hello")]
        );
    }

    #[test]
    fn invite_to_known_channel_keeps_its_filter() {
        let (session, mut rx, _) = registered();
        session.handle_event(InboundEvent::Invite {
            from: "alice".into(),
            channel: "#web".into(),
        });
        assert_eq!(drain(&mut rx), vec![Command::JOIN("#web".into(), None)]);
        assert_eq!(session.broadcast("mobile-app", &["x".to_string()]), 2);
    }

    #[test]
    fn join_channel_is_idempotent() {
        let (session, mut rx, _) = registered();
        session.join_channel("#ci");
        assert!(drain(&mut rx).is_empty());

        session.join_channel("#ops");
        assert_eq!(drain(&mut rx), vec![Command::JOIN("#ops".into(), None)]);
        assert!(session.status().channels.contains(&"#ops".to_string()));
    }

    #[test]
    fn join_while_disconnected_is_remembered() {
        let (session, mut rx, _) = detached();
        session.join_channel("#ops");
        assert!(drain(&mut rx).is_empty());

        session.link_up();
        session.handle_event(InboundEvent::Registered);
        assert!(drain(&mut rx).contains(&Command::JOIN("#ops".into(), None)));
    }

    #[test]
    fn broadcast_filters_by_project() {
        let (session, mut rx, _) = registered();
        let lines = vec!["Build webapp :: Main #7 failed".to_string()];
        assert_eq!(session.broadcast("webapp", &lines), 2);
        assert_eq!(
            drain(&mut rx),
            vec![
                privmsg("#ci", "Build webapp :: Main #7 failed"),
                privmsg("#web", "Build webapp :: Main #7 failed"),
            ]
        );
    }

    #[test]
    fn nothing_is_sent_before_registration() {
        let (session, mut rx, _) = detached();
        assert!(!session.send_to_channel("#ci", "hello"));
        assert_eq!(session.broadcast("webapp", &["x".to_string()]), 0);

        session.link_up();
        assert!(!session.send_to_user("alice", "hello"));
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn nothing_is_sent_after_shutdown() {
        let (session, mut rx, _) = registered();
        session.shutdown("Reloading configuration");
        session.shutdown("second reason is ignored");

        assert!(session.is_shutting_down());
        assert!(!session.send_to_channel("#ci", "hello"));
        assert_eq!(session.send_to_users(["alice", "bob"], "hello"), 0);
        session.join_channel("#late");
        session.handle_event(InboundEvent::Ping { token: "x".into() });
        assert!(drain(&mut rx).is_empty());
        assert_eq!(session.quit_reason().as_deref(), Some("Reloading configuration"));
    }

    #[test]
    fn send_to_users_counts_queued() {
        let (session, mut rx, _) = registered();
        assert_eq!(session.send_to_users(["alice", "bob"], "hi"), 2);
        assert_eq!(
            drain(&mut rx),
            vec![privmsg("alice", "hi"), privmsg("bob", "hi")]
        );
    }

    #[test]
    fn status_snapshot() {
        let (session, _rx, _) = registered();
        let status = session.status();
        assert_eq!(status.phase, Phase::Connected);
        assert_eq!(status.server, "irc.example.net:6667");
        assert_eq!(status.channels, vec!["#ci", "#web", "#mobile"]);
        assert!(status.connected_since.is_some());
        assert!(!status.shutting_down);
    }
}
