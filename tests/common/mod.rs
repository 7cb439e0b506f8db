//! Shared harness for integration tests.

#![allow(dead_code)]

mod server;

pub use server::{FakeIrcServer, ServerPeer};

/// A settings document pointing at `port` on localhost.
pub fn settings_document(port: u16) -> String {
    format!(
        r##"
[irc]
nickname = "bot"
username = "bot"
realname = "CI notifications"

[irc.connection]
host = "127.0.0.1"
port = {port}

[[irc.channels]]
name = "#ci"

[[irc.channels]]
name = "#web"
projects = "web.*"

[[irc.channels]]
name = "#mobile"
projects = "mobile.*"
"##
    )
}
