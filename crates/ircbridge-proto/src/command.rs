//! IRC commands used by a notification bot.
//!
//! Known commands with the arguments they need become typed variants.
//! A known command missing required arguments, and any command this crate
//! does not model, is kept as [`Command::Raw`] so a single odd line never
//! tears down a session.

use std::fmt;

use crate::error::MessageParseError;
use crate::response::Response;

/// IRC command with its parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Command {
    /// `PASS password`
    PASS(String),
    /// `NICK nickname`
    NICK(String),
    /// `USER username mode realname`
    USER(String, String, String),
    /// `JOIN channel [key]`
    JOIN(String, Option<String>),
    /// `PART channel [message]`
    PART(String, Option<String>),
    /// `QUIT [message]`
    QUIT(Option<String>),
    /// `PRIVMSG target text`
    PRIVMSG(String, String),
    /// `NOTICE target text`
    NOTICE(String, String),
    /// `INVITE nickname channel`
    INVITE(String, String),
    /// `PING server [server2]`
    PING(String, Option<String>),
    /// `PONG server [server2]`
    PONG(String, Option<String>),
    /// `ERROR message`
    ERROR(String),
    /// A numeric reply this crate names.
    Response(Response, Vec<String>),
    /// Any other three-digit numeric reply.
    Numeric(u16, Vec<String>),
    /// Anything else, verbatim.
    Raw(String, Vec<String>),
}

impl Command {
    /// Build a command from its name and parameters.
    pub fn new(cmd: &str, args: Vec<&str>) -> Result<Command, MessageParseError> {
        if cmd.is_empty() {
            return Err(MessageParseError::MissingCommand);
        }
        if !cmd.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(MessageParseError::InvalidCommand(cmd.to_owned()));
        }

        if cmd.len() == 3 && cmd.chars().all(|c| c.is_ascii_digit()) {
            let code: u16 = cmd
                .parse()
                .map_err(|_| MessageParseError::InvalidCommand(cmd.to_owned()))?;
            let args = args.into_iter().map(str::to_owned).collect();
            return Ok(match Response::from_code(code) {
                Some(resp) => Command::Response(resp, args),
                None => Command::Numeric(code, args),
            });
        }

        let upper = cmd.to_ascii_uppercase();
        let owned = |i: usize| args.get(i).map(|s| (*s).to_owned());

        let parsed = match (upper.as_str(), args.len()) {
            ("PASS", 1..) => Some(Command::PASS(args[0].to_owned())),
            ("NICK", 1..) => Some(Command::NICK(args[0].to_owned())),
            ("USER", 4..) => Some(Command::USER(
                args[0].to_owned(),
                args[1].to_owned(),
                args[3].to_owned(),
            )),
            ("JOIN", 1..) => Some(Command::JOIN(args[0].to_owned(), owned(1))),
            ("PART", 1..) => Some(Command::PART(args[0].to_owned(), owned(1))),
            ("QUIT", _) => Some(Command::QUIT(owned(0))),
            ("PRIVMSG", 2..) => Some(Command::PRIVMSG(args[0].to_owned(), args[1].to_owned())),
            ("NOTICE", 2..) => Some(Command::NOTICE(args[0].to_owned(), args[1].to_owned())),
            ("INVITE", 2..) => Some(Command::INVITE(args[0].to_owned(), args[1].to_owned())),
            ("PING", 1..) => Some(Command::PING(args[0].to_owned(), owned(1))),
            ("PONG", 1..) => Some(Command::PONG(args[0].to_owned(), owned(1))),
            ("ERROR", 1..) => Some(Command::ERROR(args[0].to_owned())),
            _ => None,
        };

        Ok(parsed.unwrap_or_else(|| {
            Command::Raw(upper, args.into_iter().map(str::to_owned).collect())
        }))
    }

    /// The wire name of this command (`"PRIVMSG"`, `"433"`, ...).
    pub fn name(&self) -> String {
        match self {
            Command::PASS(_) => "PASS".into(),
            Command::NICK(_) => "NICK".into(),
            Command::USER(..) => "USER".into(),
            Command::JOIN(..) => "JOIN".into(),
            Command::PART(..) => "PART".into(),
            Command::QUIT(_) => "QUIT".into(),
            Command::PRIVMSG(..) => "PRIVMSG".into(),
            Command::NOTICE(..) => "NOTICE".into(),
            Command::INVITE(..) => "INVITE".into(),
            Command::PING(..) => "PING".into(),
            Command::PONG(..) => "PONG".into(),
            Command::ERROR(_) => "ERROR".into(),
            Command::Response(resp, _) => resp.to_string(),
            Command::Numeric(code, _) => format!("{:03}", code),
            Command::Raw(name, _) => name.clone(),
        }
    }
}

/// Check if a string needs colon-prefixing as a trailing IRC argument.
fn needs_colon_prefix(s: &str) -> bool {
    s.is_empty() || s.contains(' ') || s.starts_with(':')
}

/// Write a command whose last argument is only colon-prefixed when required.
fn write_cmd(f: &mut fmt::Formatter<'_>, cmd: &str, args: &[&str]) -> fmt::Result {
    f.write_str(cmd)?;
    if let Some((last, rest)) = args.split_last() {
        for arg in rest {
            write!(f, " {}", arg)?;
        }
        if needs_colon_prefix(last) {
            write!(f, " :{}", last)?;
        } else {
            write!(f, " {}", last)?;
        }
    }
    Ok(())
}

/// Write a command whose last argument is always free-form text.
fn write_cmd_freeform(f: &mut fmt::Formatter<'_>, cmd: &str, args: &[&str]) -> fmt::Result {
    f.write_str(cmd)?;
    if let Some((last, rest)) = args.split_last() {
        for arg in rest {
            write!(f, " {}", arg)?;
        }
        write!(f, " :{}", last)?;
    }
    Ok(())
}

fn as_strs(args: &[String]) -> Vec<&str> {
    args.iter().map(String::as_str).collect()
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::PASS(p) => write_cmd(f, "PASS", &[p]),
            Command::NICK(n) => write_cmd(f, "NICK", &[n]),
            Command::USER(u, m, r) => write_cmd_freeform(f, "USER", &[u, m, "*", r]),
            Command::JOIN(c, Some(k)) => write_cmd(f, "JOIN", &[c, k]),
            Command::JOIN(c, None) => write_cmd(f, "JOIN", &[c]),
            Command::PART(c, Some(m)) => write_cmd_freeform(f, "PART", &[c, m]),
            Command::PART(c, None) => write_cmd(f, "PART", &[c]),
            Command::QUIT(Some(m)) => write_cmd_freeform(f, "QUIT", &[m]),
            Command::QUIT(None) => write_cmd(f, "QUIT", &[]),
            Command::PRIVMSG(t, m) => write_cmd_freeform(f, "PRIVMSG", &[t, m]),
            Command::NOTICE(t, m) => write_cmd_freeform(f, "NOTICE", &[t, m]),
            Command::INVITE(n, c) => write_cmd(f, "INVITE", &[n, c]),
            Command::PING(s, Some(t)) => write_cmd(f, "PING", &[s, t]),
            Command::PING(s, None) => write_cmd(f, "PING", &[s]),
            Command::PONG(s, Some(t)) => write_cmd(f, "PONG", &[s, t]),
            Command::PONG(s, None) => write_cmd(f, "PONG", &[s]),
            Command::ERROR(m) => write_cmd_freeform(f, "ERROR", &[m]),
            Command::Response(resp, args) => write_cmd(f, &resp.to_string(), &as_strs(args)),
            Command::Numeric(code, args) => write_cmd(f, &format!("{:03}", code), &as_strs(args)),
            Command::Raw(name, args) => write_cmd(f, name, &as_strs(args)),
        }
    }
}
