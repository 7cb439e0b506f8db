//! # ircbridge-proto
//!
//! The slice of the IRC client protocol that ircbridge speaks: registration,
//! channel membership, private messages, invites and the numeric replies the
//! session reacts to.
//!
//! ## Quick Start
//!
//! ```rust
//! use ircbridge_proto::{Command, Message};
//!
//! let msg: Message = ":alice!a@example.com PRIVMSG #ci :teamcity: status"
//!     .parse()
//!     .expect("valid IRC line");
//! assert_eq!(msg.source_nickname(), Some("alice"));
//! assert!(matches!(msg.command, Command::PRIVMSG(_, _)));
//!
//! let reply = Message::privmsg("#ci", "alice: No running builds");
//! assert_eq!(reply.to_string(), "PRIVMSG #ci :alice: No running builds");
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod command;
pub mod error;
pub mod irc;
pub mod message;
pub mod prefix;
pub mod response;

pub use self::command::Command;
pub use self::error::{MessageParseError, ProtocolError};
pub use self::irc::IrcCodec;
pub use self::message::Message;
pub use self::prefix::Prefix;
pub use self::response::Response;

/// Default maximum IRC line length in bytes, including the CRLF terminator.
pub const DEFAULT_MAX_LINE_LEN: usize = 512;
