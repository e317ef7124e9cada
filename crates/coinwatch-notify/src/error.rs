//! Notification error types.

use thiserror::Error;

/// Notification failures. All are logged and never stop the pipeline.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Provider rejected message: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Notification timed out after {0}ms")]
    Timeout(u64),

    #[error("Missing credential: {0}")]
    MissingCredential(&'static str),

    #[error("Notification queue full, message dropped")]
    QueueFull,

    #[error("Dispatcher is shut down")]
    Closed,

    #[error("Notification failed: {0}")]
    Failed(String),
}

pub type NotifyResult<T> = Result<T, NotifyError>;
