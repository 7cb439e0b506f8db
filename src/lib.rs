//! ircbridge - CI build events to IRC, build commands back from chat.
//!
//! A [`plugin::Plugin`] owns one IRC [`session::Session`]. Build lifecycle
//! events flow through [`notify::Notifier`] to the channels whose project
//! filter matches; addressed chat messages are parsed into
//! [`command::BotCommand`]s and run against a [`ci::BuildServer`].

pub mod ci;
pub mod command;
pub mod config;
pub mod error;
pub mod http;
pub mod metrics;
pub mod notify;
pub mod plugin;
pub mod routing;
pub mod session;
pub mod telemetry;
