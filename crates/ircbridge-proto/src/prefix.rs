//! IRC message prefix (message source).
//!
//! A prefix is either a server name or a user's `nick!user@host` mask.

use std::fmt;

/// Where a message came from.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum Prefix {
    /// A server, e.g. `irc.example.net`.
    ServerName(String),
    /// A user mask split into nickname, username and hostname. Missing
    /// parts are empty.
    Nickname(String, String, String),
}

impl Prefix {
    /// Lenient parse. A source with neither `!` nor `@` is a server name
    /// when it contains a dot and a bare nickname otherwise.
    pub fn parse(source: &str) -> Self {
        let (rest, host) = source.split_once('@').unwrap_or((source, ""));
        let (nick, user) = rest.split_once('!').unwrap_or((rest, ""));

        if nick.len() == source.len() && nick.contains('.') {
            return Prefix::ServerName(source.to_owned());
        }
        Prefix::Nickname(nick.to_owned(), user.to_owned(), host.to_owned())
    }

    pub fn new(nick: impl Into<String>, user: impl Into<String>, host: impl Into<String>) -> Self {
        Prefix::Nickname(nick.into(), user.into(), host.into())
    }

    /// The nickname of a user source.
    pub fn nick(&self) -> Option<&str> {
        match self {
            Prefix::Nickname(nick, ..) if !nick.is_empty() => Some(nick),
            _ => None,
        }
    }
}

impl From<&str> for Prefix {
    fn from(source: &str) -> Self {
        Prefix::parse(source)
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (nick, user, host) = match self {
            Prefix::ServerName(name) => return f.write_str(name),
            Prefix::Nickname(nick, user, host) => (nick, user, host),
        };
        f.write_str(nick)?;
        if !user.is_empty() {
            write!(f, "!{user}")?;
        }
        if !host.is_empty() {
            write!(f, "@{host}")?;
        }
        Ok(())
    }
}
