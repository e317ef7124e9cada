//! Error types for coinwatch-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid side: {0:?}")]
    InvalidSide(String),

    #[error("Invalid product id: {0:?}")]
    InvalidProductId(String),

    #[error("Decimal parse error: {0}")]
    DecimalParse(#[from] rust_decimal::Error),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
