//! Reconnecting feed connection manager.
//!
//! Owns the session lifecycle: connect + subscribe, forward raw payloads
//! to the pipeline, heartbeat, and reconnect with exponential backoff.

use crate::error::{WsError, WsResult};
use crate::heartbeat::HeartbeatManager;
use crate::message::SubscriptionSpec;
use crate::session::FeedSession;
use coinwatch_telemetry::Metrics;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Feed websocket URL.
    pub url: String,
    /// Products and channels to subscribe to on every (re)connect.
    pub subscription: SubscriptionSpec,
    /// Maximum consecutive failed attempts (0 = infinite).
    pub max_reconnect_attempts: u32,
    /// Base delay for exponential backoff.
    pub reconnect_base_delay_ms: u64,
    /// Maximum delay for exponential backoff.
    pub reconnect_max_delay_ms: u64,
    /// Idle time before a ping is sent.
    pub heartbeat_interval_ms: u64,
    /// Pong must arrive within this.
    pub heartbeat_timeout_ms: u64,
    /// Subscription acknowledgement must arrive within this.
    pub subscription_ack_timeout_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            subscription: SubscriptionSpec::new(Vec::new(), Vec::new()),
            max_reconnect_attempts: 0,
            reconnect_base_delay_ms: 1000,
            reconnect_max_delay_ms: 60000,
            heartbeat_interval_ms: 30000,
            heartbeat_timeout_ms: 10000,
            subscription_ack_timeout_ms: 5000,
        }
    }
}

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
        }
    }
}

/// How a session pump ended.
enum SessionEnd {
    /// Shutdown requested or the pipeline went away.
    Stop,
    /// The session failed; reconnect.
    Failed(WsError),
}

enum LoopAction {
    Shutdown,
    Frame(WsResult<Vec<u8>>),
    HeartbeatCheck,
}

/// Feed connection manager.
pub struct ConnectionManager {
    config: ConnectionConfig,
    state: Arc<RwLock<ConnectionState>>,
    heartbeat: Arc<HeartbeatManager>,
    message_tx: mpsc::Sender<Vec<u8>>,
    reconnect_count: Arc<RwLock<u32>>,
    shutdown_token: CancellationToken,
}

impl ConnectionManager {
    /// Create a new connection manager forwarding raw payloads to `message_tx`.
    pub fn new(config: ConnectionConfig, message_tx: mpsc::Sender<Vec<u8>>) -> Self {
        let heartbeat = Arc::new(HeartbeatManager::new(
            config.heartbeat_interval_ms,
            config.heartbeat_timeout_ms,
        ));
        Self {
            config,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            heartbeat,
            message_tx,
            reconnect_count: Arc::new(RwLock::new(0)),
            shutdown_token: CancellationToken::new(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Consecutive failed attempts since the last established session.
    pub fn reconnect_count(&self) -> u32 {
        *self.reconnect_count.read()
    }

    /// Signal graceful shutdown.
    pub fn shutdown(&self) {
        info!("ConnectionManager shutdown requested");
        self.shutdown_token.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    /// Run until shutdown, or until the reconnect budget is exhausted.
    pub async fn run(&self) -> WsResult<()> {
        let mut attempt = 0u32;

        loop {
            if self.is_shutdown() {
                info!("Shutdown requested, exiting connect loop");
                self.set_state(ConnectionState::Disconnected);
                return Ok(());
            }

            self.set_state(ConnectionState::Connecting);

            let failure = match self.open_session().await {
                Ok(Some(session)) => {
                    attempt = 0;
                    *self.reconnect_count.write() = 0;
                    self.set_state(ConnectionState::Connected);
                    info!(url = %self.config.url, "Feed session established");

                    match self.pump(session).await {
                        SessionEnd::Stop => {
                            self.set_state(ConnectionState::Disconnected);
                            return Ok(());
                        }
                        SessionEnd::Failed(e) => e,
                    }
                }
                // Shutdown while connecting
                Ok(None) => {
                    self.set_state(ConnectionState::Disconnected);
                    return Ok(());
                }
                Err(e) => e,
            };

            error!(error = %failure, "Feed session error");

            if self.is_shutdown() {
                info!("Shutdown requested after disconnect, not reconnecting");
                self.set_state(ConnectionState::Disconnected);
                return Ok(());
            }

            attempt += 1;
            *self.reconnect_count.write() = attempt;
            Metrics::ws_reconnect(reconnect_reason(&failure));

            if self.config.max_reconnect_attempts > 0
                && attempt >= self.config.max_reconnect_attempts
            {
                error!(attempt, "Max reconnection attempts reached");
                self.set_state(ConnectionState::Disconnected);
                return Err(WsError::ConnectionFailed(format!(
                    "Max reconnection attempts reached ({attempt}): {failure}"
                )));
            }

            self.set_state(ConnectionState::Reconnecting);

            let delay = self.calculate_backoff_delay(attempt);
            warn!(attempt, delay_ms = delay.as_millis() as u64, "Reconnecting");

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = self.shutdown_token.cancelled() => {
                    info!("Shutdown requested during backoff, exiting");
                    self.set_state(ConnectionState::Disconnected);
                    return Ok(());
                }
            }
        }
    }

    /// Connect and subscribe, racing the shutdown token.
    async fn open_session(&self) -> WsResult<Option<FeedSession>> {
        let ack_timeout = Duration::from_millis(self.config.subscription_ack_timeout_ms);
        tokio::select! {
            () = self.shutdown_token.cancelled() => Ok(None),
            result = FeedSession::connect_with_heartbeat(
                &self.config.url,
                &self.config.subscription,
                ack_timeout,
                Some(self.heartbeat.clone()),
            ) => result.map(Some),
        }
    }

    /// Forward payloads until the session fails or shutdown is requested.
    async fn pump(&self, mut session: FeedSession) -> SessionEnd {
        let mut check = tokio::time::interval(self.heartbeat.check_period());
        // The first tick completes immediately
        check.tick().await;

        loop {
            let action = tokio::select! {
                biased;
                () = self.shutdown_token.cancelled() => LoopAction::Shutdown,
                frame = session.next_message() => LoopAction::Frame(frame),
                _ = check.tick() => LoopAction::HeartbeatCheck,
            };

            match action {
                LoopAction::Shutdown => {
                    info!("Shutdown signal received in message loop");
                    if let Err(e) = session.close().await {
                        warn!(error = %e, "Failed to send Close frame during shutdown");
                    }
                    return SessionEnd::Stop;
                }
                LoopAction::Frame(Ok(payload)) => {
                    if self.message_tx.send(payload).await.is_err() {
                        warn!("Message receiver dropped, closing feed session");
                        let _ = session.close().await;
                        return SessionEnd::Stop;
                    }
                }
                LoopAction::Frame(Err(e)) => return SessionEnd::Failed(e),
                LoopAction::HeartbeatCheck => {
                    if self.heartbeat.is_timed_out() {
                        error!("Heartbeat timeout");
                        return SessionEnd::Failed(WsError::HeartbeatTimeout);
                    }
                    if self.heartbeat.should_send_heartbeat() {
                        if let Err(e) = session.ping().await {
                            return SessionEnd::Failed(e);
                        }
                        debug!("Sent heartbeat ping");
                    }
                }
            }
        }
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.write() = state;
        Metrics::ws_state_set(state.as_str());
        if state == ConnectionState::Connected {
            Metrics::ws_connected();
        } else {
            Metrics::ws_disconnected();
        }
    }

    fn calculate_backoff_delay(&self, attempt: u32) -> Duration {
        backoff_delay(
            self.config.reconnect_base_delay_ms,
            self.config.reconnect_max_delay_ms,
            attempt,
        ) + Duration::from_millis(rand_jitter())
    }
}

/// Exponential backoff without jitter: base * 2^(attempt-1), capped at max.
fn backoff_delay(base_ms: u64, max_ms: u64, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(10);
    let delay = base_ms.saturating_mul(1u64 << exponent).min(max_ms);
    Duration::from_millis(delay)
}

/// Random jitter (0-1000ms).
fn rand_jitter() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    (nanos % 1000) as u64
}

fn reconnect_reason(error: &WsError) -> &'static str {
    match error {
        WsError::ConnectionFailed(_) => "connect_failed",
        WsError::ConnectionClosed { .. } => "closed",
        WsError::SubscriptionRejected(_) => "subscription_rejected",
        WsError::SubscriptionAckTimeout(_) => "ack_timeout",
        WsError::HeartbeatTimeout => "heartbeat_timeout",
        WsError::SendFailed(_) => "send_failed",
        WsError::Tungstenite(_) => "transport",
        WsError::Json(_) => "json",
    }
}
