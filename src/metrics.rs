//! Prometheus metrics for the bridge.
//!
//! - `ircbridge_connect_attempts_total` - TCP/TLS connect attempts
//! - `ircbridge_reconnects_scheduled_total` - delayed retries after a failed connect
//! - `ircbridge_link_up` - 1 while registered with the IRC server
//! - `ircbridge_messages_sent_total` - lines written to the IRC server
//! - `ircbridge_messages_dropped_total` - outbound lines dropped (queue full or link down)
//! - `ircbridge_command_total{command}` - chat commands handled
//! - `ircbridge_command_duration_seconds{command}` - chat command latency
//! - `ircbridge_command_errors_total{command}` - chat commands whose CI call failed
//! - `ircbridge_notifications_total{event}` - lifecycle events delivered
//! - `ircbridge_notification_fanout` - recipients per delivered event
//!
//! Every recorder is a no-op until [`init`] has run, so library code and
//! tests never need a registry.

use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

// ========================================================================
// Link
// ========================================================================

pub static CONNECT_ATTEMPTS: OnceLock<IntCounter> = OnceLock::new();

pub static RECONNECTS_SCHEDULED: OnceLock<IntCounter> = OnceLock::new();

pub static LINK_UP: OnceLock<IntGauge> = OnceLock::new();

pub static MESSAGES_SENT: OnceLock<IntCounter> = OnceLock::new();

pub static MESSAGES_DROPPED: OnceLock<IntCounter> = OnceLock::new();

// ========================================================================
// Chat commands
// ========================================================================

pub static COMMAND_COUNTER: OnceLock<IntCounterVec> = OnceLock::new();

pub static COMMAND_LATENCY: OnceLock<HistogramVec> = OnceLock::new();

pub static COMMAND_ERRORS: OnceLock<IntCounterVec> = OnceLock::new();

// ========================================================================
// Notifications
// ========================================================================

pub static NOTIFICATIONS: OnceLock<IntCounterVec> = OnceLock::new();

/// Recipients (channels or users) per delivered event.
pub static NOTIFICATION_FANOUT: OnceLock<Histogram> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Safe to call more than once; later calls are ignored.
pub fn init() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            if $metric.get().is_none() {
                match $init {
                    Ok(m) => {
                        if let Err(e) = r.register(Box::new(m.clone())) {
                            tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
                        }
                        let _ = $metric.set(m);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, concat!("Failed to create metric ", stringify!($metric)));
                    }
                }
            }
        };
    }

    register!(CONNECT_ATTEMPTS, IntCounter::new("ircbridge_connect_attempts_total", "IRC connect attempts"));
    register!(RECONNECTS_SCHEDULED, IntCounter::new("ircbridge_reconnects_scheduled_total", "Delayed reconnects after a failed connect"));
    register!(LINK_UP, IntGauge::new("ircbridge_link_up", "1 while registered with the IRC server"));
    register!(MESSAGES_SENT, IntCounter::new("ircbridge_messages_sent_total", "Lines written to the IRC server"));
    register!(MESSAGES_DROPPED, IntCounter::new("ircbridge_messages_dropped_total", "Outbound lines dropped"));

    register!(COMMAND_COUNTER, IntCounterVec::new(Opts::new("ircbridge_command_total", "Chat commands handled by type"), &["command"]));
    register!(COMMAND_LATENCY, HistogramVec::new(
        HistogramOpts::new("ircbridge_command_duration_seconds", "Chat command latency by type")
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        &["command"]));
    register!(COMMAND_ERRORS, IntCounterVec::new(Opts::new("ircbridge_command_errors_total", "Chat commands whose build server call failed"), &["command"]));

    register!(NOTIFICATIONS, IntCounterVec::new(Opts::new("ircbridge_notifications_total", "Lifecycle events delivered by type"), &["event"]));
    register!(NOTIFICATION_FANOUT, Histogram::with_opts(
        HistogramOpts::new("ircbridge_notification_fanout", "Recipients per delivered event")
            .buckets(vec![0.0, 1.0, 2.0, 5.0, 10.0, 25.0, 50.0])));
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

// ============================================================================
// Recorders
// ============================================================================

#[inline]
fn inc(metric: &OnceLock<IntCounter>) {
    if let Some(c) = metric.get() {
        c.inc();
    }
}

#[inline]
pub fn record_connect_attempt() {
    inc(&CONNECT_ATTEMPTS);
}

#[inline]
pub fn record_reconnect_scheduled() {
    inc(&RECONNECTS_SCHEDULED);
}

#[inline]
pub fn record_message_sent() {
    inc(&MESSAGES_SENT);
}

#[inline]
pub fn record_message_dropped() {
    inc(&MESSAGES_DROPPED);
}

#[inline]
pub fn set_link_up(up: bool) {
    if let Some(g) = LINK_UP.get() {
        g.set(i64::from(up));
    }
}

/// Record a chat command execution with latency.
#[inline]
pub fn record_command(command: &str, duration_secs: f64) {
    if let Some(c) = COMMAND_COUNTER.get() {
        c.with_label_values(&[command]).inc();
    }
    if let Some(h) = COMMAND_LATENCY.get() {
        h.with_label_values(&[command]).observe(duration_secs);
    }
}

#[inline]
pub fn record_command_error(command: &str) {
    if let Some(c) = COMMAND_ERRORS.get() {
        c.with_label_values(&[command]).inc();
    }
}

#[inline]
pub fn record_notification(event: &str, recipients: usize) {
    if let Some(c) = NOTIFICATIONS.get() {
        c.with_label_values(&[event]).inc();
    }
    if let Some(h) = NOTIFICATION_FANOUT.get() {
        h.observe(recipients as f64);
    }
}
