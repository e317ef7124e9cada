//! Decode error types.

use thiserror::Error;

/// Why a raw feed message produced no events.
///
/// Every variant is non-fatal: the caller logs it and moves on to the next
/// message.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Invalid number in {field}: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("Invalid side: {0:?}")]
    InvalidSide(String),

    #[error("Negative {field}: {value}")]
    NegativeValue { field: &'static str, value: String },

    #[error("Malformed change at index {index}: expected [side, price, size]")]
    MalformedChange { index: usize },

    #[error("Unsupported message type: {0}")]
    Unsupported(String),

    #[error("Feed reported error: {0}")]
    FeedError(String),
}

impl DecodeError {
    /// Short label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Json(_) => "json",
            Self::MissingField(_) => "missing_field",
            Self::InvalidNumber { .. } => "invalid_number",
            Self::InvalidSide(_) => "invalid_side",
            Self::NegativeValue { .. } => "negative_value",
            Self::MalformedChange { .. } => "malformed_change",
            Self::Unsupported(_) => "unsupported",
            Self::FeedError(_) => "feed_error",
        }
    }

    /// Control traffic (subscriptions, heartbeats) rather than bad data.
    pub fn is_control(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }
}

pub type DecodeResult<T> = Result<T, DecodeError>;
