//! Inbound IRC traffic the session reacts to.

use ircbridge_proto::{Command, Message, Response};

/// An inbound protocol event, reduced to what the session handles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// `001`: registration complete.
    Registered,
    /// `433`: the nickname we asked for is taken.
    NicknameInUse,
    /// Any other numeric error reply.
    ProtocolError { code: u16, text: String },
    Invite { from: String, channel: String },
    Privmsg {
        sender: String,
        target: String,
        text: String,
    },
    Ping { token: String },
    /// `ERROR` from the server, usually right before it closes the link.
    ServerError(String),
}

impl InboundEvent {
    /// Classify a parsed line; `None` for traffic the session ignores.
    pub fn from_message(msg: &Message) -> Option<Self> {
        match &msg.command {
            Command::Response(Response::RPL_WELCOME, _) => Some(Self::Registered),
            Command::Response(Response::ERR_NICKNAMEINUSE, _) => Some(Self::NicknameInUse),
            Command::Response(resp, args) if resp.is_error() => Some(Self::ProtocolError {
                code: resp.code(),
                text: args.last().cloned().unwrap_or_default(),
            }),
            Command::Numeric(code, args) if (400..600).contains(code) => {
                Some(Self::ProtocolError {
                    code: *code,
                    text: args.last().cloned().unwrap_or_default(),
                })
            }
            Command::INVITE(_, channel) => Some(Self::Invite {
                from: msg.source_nickname().unwrap_or_default().to_string(),
                channel: channel.clone(),
            }),
            Command::PRIVMSG(target, text) => {
                let sender = msg.source_nickname()?;
                // CTCP requests are not commands.
                if text.starts_with('\u{1}') {
                    return None;
                }
                Some(Self::Privmsg {
                    sender: sender.to_string(),
                    target: target.clone(),
                    text: text.clone(),
                })
            }
            Command::PING(token, _) => Some(Self::Ping {
                token: token.clone(),
            }),
            Command::ERROR(text) => Some(Self::ServerError(text.clone())),
            _ => None,
        }
    }
}
