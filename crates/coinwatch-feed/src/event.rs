//! Typed market events.

use coinwatch_core::{Price, ProductId, Side, Size};
use serde::{Deserialize, Serialize};

/// Which feed stream an event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Ticker,
    Book,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ticker => "ticker",
            Self::Book => "book",
        }
    }
}

/// A decoded market event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MarketEvent {
    /// Last trade from the `ticker` channel.
    TickerTick {
        product_id: ProductId,
        price: Price,
        side: Side,
        size: Size,
        /// Feed timestamp, if the message carried one.
        time: Option<String>,
    },
    /// One `[side, price, size]` entry of an `l2update` diff.
    BookChange {
        product_id: ProductId,
        side: Side,
        price: Price,
        size: Size,
        timestamp: String,
    },
}

impl MarketEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::TickerTick { .. } => EventKind::Ticker,
            Self::BookChange { .. } => EventKind::Book,
        }
    }

    pub fn product_id(&self) -> &ProductId {
        match self {
            Self::TickerTick { product_id, .. } | Self::BookChange { product_id, .. } => product_id,
        }
    }

    pub fn price(&self) -> Price {
        match self {
            Self::TickerTick { price, .. } | Self::BookChange { price, .. } => *price,
        }
    }

    pub fn size(&self) -> Size {
        match self {
            Self::TickerTick { size, .. } | Self::BookChange { size, .. } => *size,
        }
    }

    pub fn side(&self) -> Side {
        match self {
            Self::TickerTick { side, .. } | Self::BookChange { side, .. } => *side,
        }
    }

    pub fn timestamp(&self) -> Option<&str> {
        match self {
            Self::TickerTick { time, .. } => time.as_deref(),
            Self::BookChange { timestamp, .. } => Some(timestamp.as_str()),
        }
    }

    /// Price and size are both non-negative.
    pub fn is_valid(&self) -> bool {
        !self.price().is_negative() && !self.size().is_negative()
    }
}
