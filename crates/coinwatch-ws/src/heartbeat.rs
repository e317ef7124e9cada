//! Heartbeat tracking for the feed connection.
//!
//! The feed streams continuously while subscribed, so a ping is only sent
//! after `interval_ms` without any inbound traffic. A ping that is not
//! answered within `timeout_ms` marks the connection dead.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
struct HeartbeatState {
    last_ping: Option<DateTime<Utc>>,
    last_pong: Option<DateTime<Utc>>,
    last_message: DateTime<Utc>,
    waiting_for_pong: bool,
}

impl HeartbeatState {
    fn fresh() -> Self {
        Self {
            last_ping: None,
            last_pong: None,
            last_message: Utc::now(),
            waiting_for_pong: false,
        }
    }
}

/// Heartbeat manager shared between the session reader and the
/// connection loop.
#[derive(Debug)]
pub struct HeartbeatManager {
    interval_ms: u64,
    timeout_ms: u64,
    state: RwLock<HeartbeatState>,
}

impl HeartbeatManager {
    pub fn new(interval_ms: u64, timeout_ms: u64) -> Self {
        Self {
            interval_ms,
            timeout_ms,
            state: RwLock::new(HeartbeatState::fresh()),
        }
    }

    /// Reset on every new session.
    pub fn reset(&self) {
        *self.state.write() = HeartbeatState::fresh();
    }

    pub fn record_ping(&self) {
        let now = Utc::now();
        let mut state = self.state.write();
        state.last_ping = Some(now);
        state.waiting_for_pong = true;
    }

    pub fn record_pong(&self) {
        let now = Utc::now();
        let mut state = self.state.write();
        state.last_pong = Some(now);
        state.last_message = now;
        state.waiting_for_pong = false;

        if let Some(ping_time) = state.last_ping {
            debug!(rtt_ms = (now - ping_time).num_milliseconds(), "Received pong");
        }
    }

    /// Any inbound frame counts as liveness.
    pub fn record_message(&self) {
        self.state.write().last_message = Utc::now();
    }

    pub fn is_timed_out(&self) -> bool {
        let state = self.state.read();
        match (state.waiting_for_pong, state.last_ping) {
            (true, Some(ping_time)) => {
                (Utc::now() - ping_time).num_milliseconds() > self.timeout_ms as i64
            }
            _ => false,
        }
    }

    pub fn time_since_last_message_ms(&self) -> i64 {
        (Utc::now() - self.state.read().last_message).num_milliseconds()
    }

    /// Idle for a full interval and no ping outstanding.
    pub fn should_send_heartbeat(&self) -> bool {
        if self.state.read().waiting_for_pong {
            return false;
        }
        self.time_since_last_message_ms() >= self.interval_ms as i64
    }

    /// How often the connection loop should evaluate the heartbeat.
    pub fn check_period(&self) -> Duration {
        Duration::from_millis((self.interval_ms / 2).max(1))
    }

    pub fn stats(&self) -> HeartbeatStats {
        let state = *self.state.read();
        HeartbeatStats {
            last_ping: state.last_ping,
            last_pong: state.last_pong,
            last_message: state.last_message,
            waiting_for_pong: state.waiting_for_pong,
            time_since_last_message_ms: (Utc::now() - state.last_message).num_milliseconds(),
        }
    }
}

/// Heartbeat statistics.
#[derive(Debug, Clone)]
pub struct HeartbeatStats {
    pub last_ping: Option<DateTime<Utc>>,
    pub last_pong: Option<DateTime<Utc>>,
    pub last_message: DateTime<Utc>,
    pub waiting_for_pong: bool,
    pub time_since_last_message_ms: i64,
}
