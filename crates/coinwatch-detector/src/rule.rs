//! Alert rules.

use crate::alert::AlertKind;
use crate::error::{DetectorError, DetectorResult};
use coinwatch_core::Size;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A stateless threshold rule. Both thresholds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Rule {
    /// Fires when an event's size is at least `min_size`.
    LargeOrder { min_size: Size },
    /// Fires when `price / baseline` is at least `min_ratio`.
    PriceDeviation { min_ratio: Decimal },
}

impl Rule {
    pub fn large_order(min_size: Decimal) -> DetectorResult<Self> {
        if min_size <= Decimal::ZERO {
            return Err(DetectorError::InvalidRule(format!(
                "large order threshold must be positive, got {min_size}"
            )));
        }
        Ok(Self::LargeOrder {
            min_size: Size::new(min_size),
        })
    }

    pub fn price_deviation(min_ratio: Decimal) -> DetectorResult<Self> {
        if min_ratio <= Decimal::ZERO {
            return Err(DetectorError::InvalidRule(format!(
                "price deviation ratio must be positive, got {min_ratio}"
            )));
        }
        Ok(Self::PriceDeviation { min_ratio })
    }

    pub fn kind(&self) -> AlertKind {
        match self {
            Self::LargeOrder { .. } => AlertKind::LargeOrder,
            Self::PriceDeviation { .. } => AlertKind::PriceDeviation,
        }
    }

    /// The configured threshold as a plain decimal.
    pub fn threshold(&self) -> Decimal {
        match self {
            Self::LargeOrder { min_size } => min_size.inner(),
            Self::PriceDeviation { min_ratio } => *min_ratio,
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LargeOrder { min_size } => write!(f, "large_order(size >= {min_size})"),
            Self::PriceDeviation { min_ratio } => {
                write!(f, "price_deviation(ratio >= {min_ratio})")
            }
        }
    }
}
