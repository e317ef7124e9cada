//! Feed session error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WsError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection closed: code={code}, reason={reason}")]
    ConnectionClosed { code: u16, reason: String },

    #[error("Subscription rejected by feed: {0}")]
    SubscriptionRejected(String),

    #[error("Subscription not acknowledged within {0}ms")]
    SubscriptionAckTimeout(u64),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Heartbeat timeout")]
    HeartbeatTimeout,

    #[error("Tungstenite error: {0}")]
    Tungstenite(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WsError {
    /// Abnormal closure (1006): the stream ended without a Close frame.
    pub fn stream_ended(context: &str) -> Self {
        Self::ConnectionClosed {
            code: 1006,
            reason: format!("Stream ended {context}"),
        }
    }
}

pub type WsResult<T> = Result<T, WsError>;
