//! The task that owns the IRC link.
//!
//! Connect failures wait `reconnect_delay` before the next attempt; a link
//! that drops after connecting is retried immediately. Both waits end early
//! on shutdown.

use futures_util::{SinkExt, StreamExt};
use ircbridge_proto::{Command, IrcCodec, Message};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use tracing::{Instrument, debug, error, info, warn};

use super::{BoxedIo, Connector, InboundEvent, Phase, Session};
use crate::config::Settings;
use crate::error::{TransportError, error_chain};
use crate::metrics;
use crate::telemetry::spans;

/// How a live link ended.
enum LinkEnd {
    Shutdown,
    Lost(TransportError),
}

pub(super) async fn run(
    session: Session,
    mut outbound: mpsc::Receiver<Message>,
    connector: Arc<dyn Connector>,
) {
    let settings = session.settings().clone();
    let span = spans::session(&settings.hostname, settings.port, &settings.nickname);

    async {
        drive(&session, &mut outbound, connector.as_ref()).await;
        session.terminate();
        info!("IRC session terminated");
    }
    .instrument(span)
    .await
}

async fn drive(
    session: &Session,
    outbound: &mut mpsc::Receiver<Message>,
    connector: &dyn Connector,
) {
    let settings = session.settings();
    let options = session.options();
    let shutdown = session.cancelled().clone();

    loop {
        if shutdown.is_cancelled() {
            return;
        }

        session.begin_connect();
        info!(addr = %settings.address(), tls = settings.use_ssl, "Connecting to IRC server");

        let connected = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return,
            result = connector.connect(settings, options) => result,
        };

        match connected {
            Ok(io) => {
                info!("Connected to IRC server");
                let end = run_link(session, io, outbound).await;
                session.link_down();
                discard_stale(outbound);
                match end {
                    LinkEnd::Shutdown => return,
                    LinkEnd::Lost(e) => {
                        warn!(error = %error_chain(&e), "Disconnected from IRC server, reconnecting");
                    }
                }
            }
            Err(e) => {
                session.link_down();
                error!(
                    error = %error_chain(&e),
                    retry_in_secs = options.reconnect_delay_secs,
                    "Failed to connect to IRC server"
                );
                metrics::record_reconnect_scheduled();
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => return,
                    _ = tokio::time::sleep(options.reconnect_delay()) => {}
                }
            }
        }
    }
}

async fn run_link(
    session: &Session,
    io: BoxedIo,
    outbound: &mut mpsc::Receiver<Message>,
) -> LinkEnd {
    let options = session.options();
    let shutdown = session.cancelled().clone();
    let mut framed = Framed::new(io, IrcCodec::with_max_len(options.max_line_len));

    discard_stale(outbound);
    let nickname = session.link_up();
    for msg in registration(session.settings(), &nickname) {
        if let Err(e) = framed.send(msg).await {
            return LinkEnd::Lost(e.into());
        }
        metrics::record_message_sent();
    }

    let registration_timeout = tokio::time::sleep(options.registration_timeout());
    tokio::pin!(registration_timeout);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                let reason = session.quit_reason();
                if let Err(e) = framed.send(Message::quit(reason)).await {
                    debug!(error = %error_chain(&e), "Failed to send QUIT");
                }
                if let Err(e) = SinkExt::<Message>::close(&mut framed).await {
                    debug!(error = %error_chain(&e), "Failed to close IRC link");
                }
                return LinkEnd::Shutdown;
            }
            _ = &mut registration_timeout, if session.phase() == Phase::Registering => {
                return LinkEnd::Lost(TransportError::RegistrationTimeout(
                    options.registration_timeout_secs,
                ));
            }
            Some(msg) = outbound.recv() => {
                if let Err(e) = framed.send(msg).await {
                    return LinkEnd::Lost(e.into());
                }
                metrics::record_message_sent();
            }
            inbound = framed.next() => match inbound {
                Some(Ok(msg)) => {
                    if let Some(event) = InboundEvent::from_message(&msg) {
                        session.handle_event(event);
                    }
                }
                Some(Err(e)) => return LinkEnd::Lost(e.into()),
                None => return LinkEnd::Lost(TransportError::Closed),
            },
        }
    }
}

/// PASS (when set), NICK and USER.
fn registration(settings: &Settings, nickname: &str) -> Vec<Message> {
    let mut msgs = Vec::with_capacity(3);
    if !settings.password.is_empty() {
        msgs.push(Command::PASS(settings.password.clone()).into());
    }
    msgs.push(Message::nick(nickname));
    msgs.push(
        Command::USER(
            settings.username.clone(),
            "0".to_string(),
            settings.realname.clone(),
        )
        .into(),
    );
    msgs
}

/// Drop anything queued for a link that no longer exists.
fn discard_stale(outbound: &mut mpsc::Receiver<Message>) {
    let mut dropped = 0usize;
    while outbound.try_recv().is_ok() {
        dropped += 1;
    }
    if dropped > 0 {
        debug!(dropped = dropped, "Discarded messages queued for a dead link");
    }
}
