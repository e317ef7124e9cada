//! Prometheus metrics for coinwatch.
//!
//! Covers:
//! - Feed connection state and reconnects
//! - Raw messages received and decode failures
//! - Events evaluated and alerts fired
//! - Notification outcomes and latency
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A registration failure means a
//! duplicate metric name, which is a programming error surfaced at first
//! use, never in steady state.

use crate::error::TelemetryResult;
use once_cell::sync::Lazy;
use prometheus::{
    register_gauge, register_gauge_vec, register_histogram_vec, register_int_counter,
    register_int_counter_vec, Encoder, Gauge, GaugeVec, HistogramVec, IntCounter, IntCounterVec,
    TextEncoder,
};
use serde::Serialize;

/// Feed connection state (1 = connected, 0 = disconnected).
pub static WS_CONNECTED: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "coinwatch_ws_connected",
        "Feed connection state (1=connected)"
    )
    .unwrap()
});

/// Labels: state (disconnected/connecting/connected/reconnecting)
pub static WS_STATE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "coinwatch_ws_state",
        "Feed connection state machine",
        &["state"]
    )
    .unwrap()
});

pub static WS_RECONNECT_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "coinwatch_ws_reconnect_total",
        "Feed reconnection attempts",
        &["reason"]
    )
    .unwrap()
});

pub static FEED_MESSAGES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "coinwatch_feed_messages_total",
        "Raw feed messages received"
    )
    .unwrap()
});

/// Labels: reason (json/missing_field/invalid_number/.../unsupported)
pub static DECODE_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "coinwatch_decode_failures_total",
        "Feed messages that did not decode into market events",
        &["reason"]
    )
    .unwrap()
});

/// Labels: kind (ticker/book)
pub static EVENTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "coinwatch_events_total",
        "Market events evaluated",
        &["kind"]
    )
    .unwrap()
});

/// Labels: kind (large_order/price_deviation)
pub static ALERTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!("coinwatch_alerts_total", "Alerts fired", &["kind"]).unwrap()
});

/// Labels: outcome (sent/failed/dropped)
pub static NOTIFICATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "coinwatch_notifications_total",
        "Notification outcomes",
        &["outcome"]
    )
    .unwrap()
});

pub static NOTIFY_LATENCY_MS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "coinwatch_notify_latency_ms",
        "Notifier round-trip latency in milliseconds",
        &["notifier"],
        vec![10.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0]
    )
    .unwrap()
});

/// Point-in-time totals for the periodic summary log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub feed_messages: u64,
    pub decode_failures: u64,
    pub events: u64,
    pub alerts: u64,
    pub notifications_sent: u64,
    pub notifications_failed: u64,
    pub notifications_dropped: u64,
    pub reconnects: u64,
}

/// Metrics facade.
pub struct Metrics;

impl Metrics {
    pub fn ws_connected() {
        WS_CONNECTED.set(1.0);
    }

    pub fn ws_disconnected() {
        WS_CONNECTED.set(0.0);
    }

    /// Only the active state is 1, all others 0.
    pub fn ws_state_set(state: &str) {
        for s in &["disconnected", "connecting", "connected", "reconnecting"] {
            WS_STATE.with_label_values(&[s]).set(0.0);
        }
        WS_STATE.with_label_values(&[state]).set(1.0);
    }

    pub fn ws_reconnect(reason: &str) {
        WS_RECONNECT_TOTAL.with_label_values(&[reason]).inc();
    }

    pub fn feed_message() {
        FEED_MESSAGES_TOTAL.inc();
    }

    pub fn decode_failure(reason: &str) {
        DECODE_FAILURES_TOTAL.with_label_values(&[reason]).inc();
    }

    pub fn event_evaluated(kind: &str) {
        EVENTS_TOTAL.with_label_values(&[kind]).inc();
    }

    pub fn alert_fired(kind: &str) {
        ALERTS_TOTAL.with_label_values(&[kind]).inc();
    }

    pub fn notification_sent(notifier: &str, latency_ms: f64) {
        NOTIFICATIONS_TOTAL.with_label_values(&["sent"]).inc();
        NOTIFY_LATENCY_MS
            .with_label_values(&[notifier])
            .observe(latency_ms);
    }

    pub fn notification_failed() {
        NOTIFICATIONS_TOTAL.with_label_values(&["failed"]).inc();
    }

    pub fn notification_dropped() {
        NOTIFICATIONS_TOTAL.with_label_values(&["dropped"]).inc();
    }

    /// Current totals across all label values.
    pub fn snapshot() -> MetricsSnapshot {
        MetricsSnapshot {
            feed_messages: FEED_MESSAGES_TOTAL.get(),
            decode_failures: sum_counters(&DECODE_FAILURES_TOTAL),
            events: sum_counters(&EVENTS_TOTAL),
            alerts: sum_counters(&ALERTS_TOTAL),
            notifications_sent: NOTIFICATIONS_TOTAL.with_label_values(&["sent"]).get(),
            notifications_failed: NOTIFICATIONS_TOTAL.with_label_values(&["failed"]).get(),
            notifications_dropped: NOTIFICATIONS_TOTAL.with_label_values(&["dropped"]).get(),
            reconnects: sum_counters(&WS_RECONNECT_TOTAL),
        }
    }

    /// Prometheus text exposition of the default registry.
    pub fn render() -> TelemetryResult<String> {
        let families = prometheus::gather();
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

fn sum_counters(vec: &IntCounterVec) -> u64 {
    use prometheus::core::Collector;

    vec.collect()
        .iter()
        .flat_map(|family| family.get_metric())
        .map(|m| m.get_counter().get_value() as u64)
        .sum()
}
