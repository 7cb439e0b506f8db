//! IRC numeric replies the bridge recognises.
//!
//! Only the registration numerics and the error replies a client session
//! acts on or logs are named here; any other numeric is carried through as
//! [`crate::Command::Numeric`].
//!
//! # Reference
//! - RFC 2812: Internet Relay Chat: Client Protocol

#![allow(non_camel_case_types)]

use std::fmt;

macro_rules! responses {
    ($( $(#[$doc:meta])* $name:ident = $code:literal ),* $(,)?) => {
        /// IRC server response code.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        #[repr(u16)]
        #[non_exhaustive]
        pub enum Response {
            $( $(#[$doc])* $name = $code, )*
        }

        impl Response {
            /// Look up a known response by its numeric code.
            pub fn from_code(code: u16) -> Option<Response> {
                match code {
                    $( $code => Some(Response::$name), )*
                    _ => None,
                }
            }
        }
    };
}

responses! {
    /// 001 - Welcome to the IRC network
    RPL_WELCOME = 1,
    /// 002 - Your host is running version
    RPL_YOURHOST = 2,
    /// 003 - Server creation date
    RPL_CREATED = 3,
    /// 004 - Server info
    RPL_MYINFO = 4,
    /// 005 - Server supported features (ISUPPORT)
    RPL_ISUPPORT = 5,
    /// 375 - Start of MOTD
    RPL_MOTDSTART = 375,
    /// 376 - End of MOTD
    RPL_ENDOFMOTD = 376,
    /// 401 - No such nick/channel
    ERR_NOSUCHNICK = 401,
    /// 403 - No such channel
    ERR_NOSUCHCHANNEL = 403,
    /// 404 - Cannot send to channel
    ERR_CANNOTSENDTOCHAN = 404,
    /// 405 - Too many channels
    ERR_TOOMANYCHANNELS = 405,
    /// 421 - Unknown command
    ERR_UNKNOWNCOMMAND = 421,
    /// 422 - MOTD file is missing
    ERR_NOMOTD = 422,
    /// 431 - No nickname given
    ERR_NONICKNAMEGIVEN = 431,
    /// 432 - Erroneous nickname
    ERR_ERRONEOUSNICKNAME = 432,
    /// 433 - Nickname is already in use
    ERR_NICKNAMEINUSE = 433,
    /// 436 - Nickname collision
    ERR_NICKCOLLISION = 436,
    /// 437 - Nick/channel is temporarily unavailable
    ERR_UNAVAILRESOURCE = 437,
    /// 451 - You have not registered
    ERR_NOTREGISTERED = 451,
    /// 461 - Not enough parameters
    ERR_NEEDMOREPARAMS = 461,
    /// 462 - You may not reregister
    ERR_ALREADYREGISTRED = 462,
    /// 464 - Password incorrect
    ERR_PASSWDMISMATCH = 464,
    /// 465 - You are banned from this server
    ERR_YOUREBANNEDCREEP = 465,
    /// 471 - Cannot join channel (+l)
    ERR_CHANNELISFULL = 471,
    /// 473 - Cannot join channel (+i)
    ERR_INVITEONLYCHAN = 473,
    /// 474 - Cannot join channel (+b)
    ERR_BANNEDFROMCHAN = 474,
    /// 475 - Cannot join channel (+k)
    ERR_BADCHANNELKEY = 475,
}

impl Response {
    /// The numeric value of this response.
    pub fn code(&self) -> u16 {
        *self as u16
    }

    /// Whether this is an error reply (400-599).
    pub fn is_error(&self) -> bool {
        (400..600).contains(&self.code())
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.code())
    }
}
