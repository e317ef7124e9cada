//! Alert occurrences produced by the evaluator.

use coinwatch_core::{ProductId, Side};
use coinwatch_feed::EventKind;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    LargeOrder,
    PriceDeviation,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LargeOrder => "large_order",
            Self::PriceDeviation => "price_deviation",
        }
    }
}

/// One rule firing for one event. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertOccurrence {
    pub kind: AlertKind,
    pub product_id: ProductId,
    /// Order side for large orders; None for price deviations.
    pub side: Option<Side>,
    /// Event size (large order) or current price (price deviation).
    pub amount: Decimal,
    /// Rule threshold (large order) or session baseline (price deviation).
    pub reference_value: Decimal,
    /// Threshold of the rule that fired.
    pub threshold: Decimal,
    /// Feed timestamp of the triggering event, when it had one.
    pub timestamp: Option<String>,
    /// Stream the triggering event came from.
    pub source: EventKind,
}
