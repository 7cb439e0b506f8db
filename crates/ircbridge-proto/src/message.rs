//! Owned IRC messages.

use std::fmt;
use std::str::FromStr;

use crate::command::Command;
use crate::error::{MessageParseError, ProtocolError};
use crate::prefix::Prefix;

/// An owned IRC message.
///
/// IRCv3 tags are accepted on input and dropped; the bridge never sends them.
///
/// # Example
///
/// ```
/// use ircbridge_proto::Message;
///
/// let msg: Message = ":nick!user@host PRIVMSG #channel :Hello!".parse().unwrap();
/// assert_eq!(msg.source_nickname(), Some("nick"));
///
/// let msg = Message::privmsg("#channel", "Hello!");
/// assert_eq!(msg.to_string(), "PRIVMSG #channel :Hello!");
/// ```
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Message {
    /// Message prefix/source (e.g., `nick!user@host`).
    pub prefix: Option<Prefix>,
    /// The IRC command and its parameters.
    pub command: Command,
}

impl Message {
    /// Create a new message from raw components.
    pub fn new(
        prefix: Option<&str>,
        command: &str,
        args: Vec<&str>,
    ) -> Result<Message, MessageParseError> {
        Ok(Message {
            prefix: prefix.map(Prefix::parse),
            command: Command::new(command, args)?,
        })
    }

    /// Get the nickname from the message prefix, if present.
    pub fn source_nickname(&self) -> Option<&str> {
        self.prefix.as_ref().and_then(Prefix::nick)
    }

    /// Create a PRIVMSG message to a target with text.
    #[must_use]
    pub fn privmsg(target: impl Into<String>, text: impl Into<String>) -> Self {
        Command::PRIVMSG(target.into(), text.into()).into()
    }

    /// Create a JOIN message for a channel.
    #[must_use]
    pub fn join(channel: impl Into<String>) -> Self {
        Command::JOIN(channel.into(), None).into()
    }

    /// Create a PART message for a channel.
    #[must_use]
    pub fn part(channel: impl Into<String>, reason: Option<String>) -> Self {
        Command::PART(channel.into(), reason).into()
    }

    /// Create a NICK message.
    #[must_use]
    pub fn nick(nickname: impl Into<String>) -> Self {
        Command::NICK(nickname.into()).into()
    }

    /// Create a QUIT message with an optional reason.
    #[must_use]
    pub fn quit(reason: Option<String>) -> Self {
        Command::QUIT(reason).into()
    }

    /// Create a PONG answering a server PING token.
    #[must_use]
    pub fn pong(token: impl Into<String>) -> Self {
        Command::PONG(token.into(), None).into()
    }
}

impl From<Command> for Message {
    fn from(command: Command) -> Self {
        Message {
            prefix: None,
            command,
        }
    }
}

impl FromStr for Message {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Message, Self::Err> {
        let invalid = |cause| ProtocolError::InvalidMessage {
            string: s.to_owned(),
            cause,
        };

        let mut rest = s.trim_end_matches(['\r', '\n']);
        if rest.trim().is_empty() {
            return Err(invalid(MessageParseError::EmptyMessage));
        }

        // Tags are skipped entirely.
        if rest.starts_with('@') {
            rest = rest.split_once(' ').map_or("", |(_, tail)| tail);
        }
        rest = rest.trim_start_matches(' ');

        let mut prefix = None;
        if let Some(stripped) = rest.strip_prefix(':') {
            let (source, tail) = stripped.split_once(' ').unwrap_or((stripped, ""));
            prefix = Some(source);
            rest = tail.trim_start_matches(' ');
        }

        let (command, mut rest) = rest.split_once(' ').unwrap_or((rest, ""));
        if command.is_empty() {
            return Err(invalid(MessageParseError::MissingCommand));
        }

        let mut args = Vec::new();
        loop {
            rest = rest.trim_start_matches(' ');
            if rest.is_empty() {
                break;
            }
            if let Some(trailing) = rest.strip_prefix(':') {
                args.push(trailing);
                break;
            }
            let (arg, tail) = rest.split_once(' ').unwrap_or((rest, ""));
            args.push(arg);
            rest = tail;
        }

        Message::new(prefix, command, args).map_err(invalid)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = &self.prefix {
            write!(f, ":{} ", prefix)?;
        }
        write!(f, "{}", self.command)
    }
}
