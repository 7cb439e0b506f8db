//! Chat commands addressed to the bot.
//!
//! A PRIVMSG is first classified by [`Addressed::classify`] (direct message
//! or `"<nick>:"` mention in a channel), the remaining text is parsed into a
//! [`BotCommand`], and the [`Dispatcher`] turns it into reply lines by
//! querying the build server.

mod addressing;
mod dispatch;
mod parse;

pub use addressing::{Addressed, Addressing};
pub use dispatch::{COMMAND_FAILED, Dispatcher, USAGE};
pub use parse::{BotCommand, parse_arguments};
