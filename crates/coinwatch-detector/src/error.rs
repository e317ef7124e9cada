//! Detector error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type DetectorResult<T> = Result<T, DetectorError>;
