//! Trade side as reported by the feed.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Side of a trade or order-book change: buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Wire name used by the feed.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = CoreError;

    /// Parses the feed's side strings. Matching is exact: the feed
    /// always sends lowercase.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buy" => Ok(Self::Buy),
            "sell" => Ok(Self::Sell),
            other => Err(CoreError::InvalidSide(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_parse() {
        assert_eq!("buy".parse::<Side>().unwrap(), Side::Buy);
        assert_eq!("sell".parse::<Side>().unwrap(), Side::Sell);
        assert!(matches!(
            "BUY".parse::<Side>(),
            Err(CoreError::InvalidSide(s)) if s == "BUY"
        ));
        assert!("".parse::<Side>().is_err());
    }

    #[test]
    fn test_side_serde_lowercase() {
        let json = serde_json::to_string(&Side::Sell).unwrap();
        assert_eq!(json, "\"sell\"");
        let side: Side = serde_json::from_str("\"buy\"").unwrap();
        assert_eq!(side, Side::Buy);
    }
}
