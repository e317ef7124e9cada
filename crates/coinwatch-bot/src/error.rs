//! Application error types.

use thiserror::Error;

/// Application-level errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] coinwatch_ws::WsError),

    #[error("Detector error: {0}")]
    Detector(#[from] coinwatch_detector::DetectorError),

    #[error("Notification error: {0}")]
    Notify(#[from] coinwatch_notify::NotifyError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] coinwatch_telemetry::TelemetryError),

    #[error("Invalid product: {0}")]
    Core(#[from] coinwatch_core::CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Feed task failed: {0}")]
    Task(String),
}

pub type AppResult<T> = Result<T, AppError>;
