//! Detector configuration.

use crate::error::{DetectorError, DetectorResult};
use crate::rule::Rule;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Thresholds for the built-in rule set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Minimum size for a large-order alert (inclusive).
    #[serde(default = "default_large_order_threshold")]
    pub large_order_threshold: Decimal,
    /// Minimum `price / baseline` for a deviation alert (inclusive).
    #[serde(default = "default_price_deviation_ratio")]
    pub price_deviation_ratio: Decimal,
}

fn default_large_order_threshold() -> Decimal {
    Decimal::from(10)
}

fn default_price_deviation_ratio() -> Decimal {
    Decimal::new(105, 2) // 1.05
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            large_order_threshold: default_large_order_threshold(),
            price_deviation_ratio: default_price_deviation_ratio(),
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> DetectorResult<()> {
        if self.large_order_threshold <= Decimal::ZERO {
            return Err(DetectorError::ConfigError(format!(
                "large_order_threshold ({}) must be positive",
                self.large_order_threshold
            )));
        }
        if self.price_deviation_ratio <= Decimal::ZERO {
            return Err(DetectorError::ConfigError(format!(
                "price_deviation_ratio ({}) must be positive",
                self.price_deviation_ratio
            )));
        }
        Ok(())
    }

    /// Rules in evaluation order: large order, then price deviation.
    pub fn rules(&self) -> DetectorResult<Vec<Rule>> {
        self.validate()?;
        Ok(vec![
            Rule::large_order(self.large_order_threshold)?,
            Rule::price_deviation(self.price_deviation_ratio)?,
        ])
    }
}
