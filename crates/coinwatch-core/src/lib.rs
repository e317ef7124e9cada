//! Core domain types for coinwatch.
//!
//! - `Price`, `Size`: exact decimal newtypes for feed values
//! - `Side`: buy/sell as reported by the feed
//! - `ProductId`: exchange product identifier (`BTC-USD`)

pub mod decimal;
pub mod error;
pub mod product;
pub mod side;

pub use decimal::{Price, Size};
pub use error::{CoreError, Result};
pub use product::ProductId;
pub use side::Side;
