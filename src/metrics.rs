//! Prometheus metrics collection for roomlink.
//!
//! Metrics are registered once via [`init`] and exposed on `/metrics` by
//! [`crate::http`]. Every recording helper is a no-op until `init` has run,
//! so library users who never call it pay nothing.
//!
//! - `roomlink_envelopes_emitted_total` - local `emit` calls
//! - `roomlink_envelopes_relayed_total` - envelopes written to peer links
//! - `roomlink_envelopes_queued_total` - envelopes buffered while not active
//! - `roomlink_status_transitions_total{status}` - status events by kind
//! - `roomlink_downstream_links` - links currently held as coordinator
//! - `roomlink_rendezvous_claims_total{outcome}` - claims seen by the server

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

// ========================================================================
// Session metrics
// ========================================================================

/// Total envelopes emitted by local callers.
pub static ENVELOPES_EMITTED: OnceLock<IntCounter> = OnceLock::new();

/// Total envelope writes to peer links (one per recipient).
pub static ENVELOPES_RELAYED: OnceLock<IntCounter> = OnceLock::new();

/// Total envelopes a subordinate wrote to its upstream link.
pub static ENVELOPES_SENT_UPSTREAM: OnceLock<IntCounter> = OnceLock::new();

/// Total envelopes buffered in the outbound queue.
pub static ENVELOPES_QUEUED: OnceLock<IntCounter> = OnceLock::new();

/// Total envelopes evicted from a full outbound queue.
pub static QUEUE_EVICTIONS: OnceLock<IntCounter> = OnceLock::new();

/// Total subscriber failures isolated by the event bus.
pub static HANDLER_FAILURES: OnceLock<IntCounter> = OnceLock::new();

/// Status transitions by status kind.
pub static STATUS_TRANSITIONS: OnceLock<IntCounterVec> = OnceLock::new();

/// Downstream links held while coordinating.
pub static DOWNSTREAM_LINKS: OnceLock<IntGauge> = OnceLock::new();

/// Relay fan-out: recipients per forwarded envelope.
pub static RELAY_FANOUT: OnceLock<Histogram> = OnceLock::new();

// ========================================================================
// Rendezvous server metrics
// ========================================================================

/// Claims processed by outcome (granted, collision, released).
pub static RENDEZVOUS_CLAIMS: OnceLock<IntCounterVec> = OnceLock::new();

/// Claims currently held.
pub static ACTIVE_CLAIMS: OnceLock<IntGauge> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Call once at startup before any metrics are recorded.
pub fn init() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            let m = $init.expect(concat!(stringify!($metric), " creation failed"));
            if let Err(e) = r.register(Box::new(m.clone())) {
                tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
            }
            let _ = $metric.set(m);
        };
    }

    register!(ENVELOPES_EMITTED, IntCounter::new("roomlink_envelopes_emitted_total", "Envelopes emitted locally"));
    register!(ENVELOPES_RELAYED, IntCounter::new("roomlink_envelopes_relayed_total", "Envelope writes to peer links"));
    register!(ENVELOPES_SENT_UPSTREAM, IntCounter::new("roomlink_envelopes_sent_upstream_total", "Envelopes sent by a subordinate to its coordinator"));
    register!(ENVELOPES_QUEUED, IntCounter::new("roomlink_envelopes_queued_total", "Envelopes buffered while not active"));
    register!(QUEUE_EVICTIONS, IntCounter::new("roomlink_queue_evictions_total", "Envelopes evicted from a full outbound queue"));
    register!(HANDLER_FAILURES, IntCounter::new("roomlink_handler_failures_total", "Event subscribers that panicked"));
    register!(STATUS_TRANSITIONS, IntCounterVec::new(Opts::new("roomlink_status_transitions_total", "Session status transitions"), &["status"]));
    register!(DOWNSTREAM_LINKS, IntGauge::new("roomlink_downstream_links", "Downstream links held as coordinator"));
    register!(RELAY_FANOUT, Histogram::with_opts(
        HistogramOpts::new("roomlink_relay_fanout", "Recipients per relayed envelope")
            .buckets(vec![0.0, 1.0, 2.0, 5.0, 10.0, 25.0, 50.0, 100.0])));

    register!(RENDEZVOUS_CLAIMS, IntCounterVec::new(Opts::new("roomlink_rendezvous_claims_total", "Rendezvous claims by outcome"), &["outcome"]));
    register!(ACTIVE_CLAIMS, IntGauge::new("roomlink_rendezvous_active_claims", "Rendezvous claims currently held"));
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
// Recording helpers
// ============================================================================

#[inline]
fn inc(metric: &OnceLock<IntCounter>, by: u64) {
    if let Some(c) = metric.get() {
        c.inc_by(by);
    }
}

#[inline]
pub fn record_emitted() {
    inc(&ENVELOPES_EMITTED, 1);
}

#[inline]
pub fn record_queued() {
    inc(&ENVELOPES_QUEUED, 1);
}

#[inline]
pub fn record_eviction() {
    inc(&QUEUE_EVICTIONS, 1);
}

#[inline]
pub fn record_handler_failure() {
    inc(&HANDLER_FAILURES, 1);
}

#[inline]
pub fn record_sent_upstream() {
    inc(&ENVELOPES_SENT_UPSTREAM, 1);
}

/// Record one relayed envelope and how many links it was written to.
/// Broadcasts that reached nobody are not observed.
#[inline]
pub fn record_relay(recipients: usize) {
    if recipients == 0 {
        return;
    }
    inc(&ENVELOPES_RELAYED, recipients as u64);
    if let Some(h) = RELAY_FANOUT.get() {
        h.observe(recipients as f64);
    }
}

#[inline]
pub fn record_status(status: &str) {
    if let Some(c) = STATUS_TRANSITIONS.get() {
        c.with_label_values(&[status]).inc();
    }
}

#[inline]
pub fn set_downstream_links(count: usize) {
    if let Some(g) = DOWNSTREAM_LINKS.get() {
        g.set(count as i64);
    }
}

/// Record a rendezvous claim outcome and adjust the held-claims gauge.
#[inline]
pub fn record_claim(outcome: &str) {
    if let Some(c) = RENDEZVOUS_CLAIMS.get() {
        c.with_label_values(&[outcome]).inc();
    }
    if let Some(g) = ACTIVE_CLAIMS.get() {
        match outcome {
            "granted" => g.inc(),
            "released" => g.dec(),
            _ => {}
        }
    }
}
