//! Telemetry utilities for command timing and span correlation.

use std::time::Instant;

/// Guard for timing chat command execution.
///
/// Records command latency when dropped.
pub struct CommandTimer {
    command: &'static str,
    start: Instant,
}

impl CommandTimer {
    pub fn new(command: &'static str) -> Self {
        Self {
            command,
            start: Instant::now(),
        }
    }
}

impl Drop for CommandTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        crate::metrics::record_command(self.command, duration);
    }
}

/// Standardized span constructors.
pub mod spans {
    use tracing::{Span, info_span};

    /// Span covering one session's whole connect/reconnect life.
    pub fn session(host: &str, port: u16, nickname: &str) -> Span {
        info_span!("session", host = %host, port = port, nick = %nickname)
    }

    /// Span for a chat command execution.
    pub fn command(name: &str, sender: &str, target: &str) -> Span {
        info_span!("command", name = %name, sender = %sender, target = %target)
    }

    /// Span for delivering one lifecycle event.
    pub fn notification(event: &str) -> Span {
        info_span!("notification", event = %event)
    }
}
