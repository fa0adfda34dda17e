//! Prometheus metrics for slirc-bridge.
//!
//! Counters are registered once by [`init`] and exposed on the intake
//! server's `/metrics` route. Recording before `init` is a no-op.
//!
//! - `bridge_messages_received_total` - protocol messages read from the server
//! - `bridge_keepalives_total` - PINGs answered
//! - `bridge_events_delivered_total` - events accepted by the consumer
//! - `bridge_delivery_failures_total{error}` - failed deliveries by cause
//! - `bridge_events_dropped_total` - events dropped with the delivery pool full
//! - `bridge_commands_total{result}` - intake requests by outcome

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

// ========================================================================
// Counters
// ========================================================================

pub static MESSAGES_RECEIVED: OnceLock<IntCounter> = OnceLock::new();

pub static KEEPALIVES: OnceLock<IntCounter> = OnceLock::new();

pub static EVENTS_DELIVERED: OnceLock<IntCounter> = OnceLock::new();

pub static DELIVERY_FAILURES: OnceLock<IntCounterVec> = OnceLock::new();

/// Events dropped because every delivery slot was busy.
pub static EVENTS_DROPPED: OnceLock<IntCounter> = OnceLock::new();

pub static COMMANDS: OnceLock<IntCounterVec> = OnceLock::new();

/// Register all metrics. Safe to call more than once.
pub fn init() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            match $init {
                Ok(m) => {
                    if $metric.set(m.clone()).is_ok() {
                        if let Err(e) = r.register(Box::new(m)) {
                            tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, concat!("Failed to create metric ", stringify!($metric)));
                }
            }
        };
    }

    register!(MESSAGES_RECEIVED, IntCounter::new("bridge_messages_received_total", "Protocol messages read from the server"));
    register!(KEEPALIVES, IntCounter::new("bridge_keepalives_total", "PING requests answered"));
    register!(EVENTS_DELIVERED, IntCounter::new("bridge_events_delivered_total", "Events accepted by the consumer"));
    register!(DELIVERY_FAILURES, IntCounterVec::new(Opts::new("bridge_delivery_failures_total", "Failed event deliveries by cause"), &["error"]));
    register!(EVENTS_DROPPED, IntCounter::new("bridge_events_dropped_total", "Events dropped with the delivery pool full"));
    register!(COMMANDS, IntCounterVec::new(Opts::new("bridge_commands_total", "Command intake requests by outcome"), &["result"]));
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
// Helper functions
// ============================================================================

#[inline]
fn inc(metric: &OnceLock<IntCounter>) {
    if let Some(c) = metric.get() {
        c.inc();
    }
}

#[inline]
fn inc_labeled(metric: &OnceLock<IntCounterVec>, label: &str) {
    if let Some(c) = metric.get() {
        c.with_label_values(&[label]).inc();
    }
}

#[inline]
pub fn record_message_received() {
    inc(&MESSAGES_RECEIVED);
}

#[inline]
pub fn record_keepalive() {
    inc(&KEEPALIVES);
}

#[inline]
pub fn record_event_delivered() {
    inc(&EVENTS_DELIVERED);
}

/// Record a failed delivery, labeled by [`crate::error::DeliveryError::error_code`].
#[inline]
pub fn record_delivery_failure(error: &str) {
    inc_labeled(&DELIVERY_FAILURES, error);
}

#[inline]
pub fn record_event_dropped() {
    inc(&EVENTS_DROPPED);
}

/// Record an intake request outcome (`accepted` or an error code).
#[inline]
pub fn record_command(result: &str) {
    inc_labeled(&COMMANDS, result);
}
