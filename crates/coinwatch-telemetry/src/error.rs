//! Telemetry error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Logging initialization failed: {0}")]
    LoggingInit(String),

    #[error("Unknown log format: {0:?} (expected \"pretty\" or \"json\")")]
    UnknownLogFormat(String),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("Metrics output is not UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

pub type TelemetryResult<T> = Result<T, TelemetryError>;
