//! Feed message decoding.
//!
//! Turns raw feed payloads into typed [`MarketEvent`]s: `ticker` messages
//! become one `TickerTick`, `l2update` diffs become one `BookChange` per
//! change entry.

pub mod decoder;
pub mod error;
pub mod event;

pub use decoder::{decode, decode_str};
pub use error::{DecodeError, DecodeResult};
pub use event::{EventKind, MarketEvent};
