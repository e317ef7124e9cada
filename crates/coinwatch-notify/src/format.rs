//! Alert message templates.

use coinwatch_detector::{AlertKind, AlertOccurrence};
use rust_decimal::Decimal;

/// Default asset display name.
pub const DEFAULT_ASSET_NAME: &str = "Bitcoin";

/// Renders alerts into the text sent to the user.
#[derive(Debug, Clone)]
pub struct MessageFormatter {
    asset_name: String,
}

impl Default for MessageFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_ASSET_NAME)
    }
}

impl MessageFormatter {
    pub fn new(asset_name: impl Into<String>) -> Self {
        Self {
            asset_name: asset_name.into(),
        }
    }

    pub fn asset_name(&self) -> &str {
        &self.asset_name
    }

    /// - large order: `A buy order worth of 12 Bitcoin was made`
    /// - deviation: `The price of Bitcoin is >= 5% higher than $30000, with
    ///   a current value of $31500`
    pub fn render(&self, alert: &AlertOccurrence) -> String {
        match alert.kind {
            AlertKind::LargeOrder => {
                let side = alert.side.map(|s| s.as_str()).unwrap_or("unknown");
                format!(
                    "A {} order worth of {} {} was made",
                    side,
                    alert.amount.normalize(),
                    self.asset_name
                )
            }
            AlertKind::PriceDeviation => format!(
                "The price of {} is >= {} higher than ${}, with a current value of ${}",
                self.asset_name,
                margin_text(alert.threshold),
                alert.reference_value.normalize(),
                alert.amount.normalize()
            ),
        }
    }
}

/// `1.05` → `5`, `1.125` → `12.5`. None when the percentage does not fit
/// in a `Decimal`.
fn percent_above(ratio: Decimal) -> Option<Decimal> {
    ratio
        .checked_sub(Decimal::ONE)?
        .checked_mul(Decimal::ONE_HUNDRED)
        .map(|pct| pct.normalize())
}

/// `5%`, or the raw ratio (`1000x`) when the percentage overflows.
fn margin_text(ratio: Decimal) -> String {
    match percent_above(ratio) {
        Some(pct) => format!("{pct}%"),
        None => format!("{}x", ratio.normalize()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coinwatch_core::{ProductId, Side};
    use coinwatch_feed::EventKind;
    use rust_decimal_macros::dec;

    fn alert(kind: AlertKind, side: Option<Side>, amount: Decimal, reference: Decimal) -> AlertOccurrence {
        AlertOccurrence {
            kind,
            product_id: ProductId::new("BTC-USD").unwrap(),
            side,
            amount,
            reference_value: reference,
            threshold: if kind == AlertKind::LargeOrder { dec!(10) } else { dec!(1.05) },
            timestamp: None,
            source: EventKind::Ticker,
        }
    }

    #[test]
    fn test_large_order_message() {
        let formatter = MessageFormatter::default();
        let text = formatter.render(&alert(
            AlertKind::LargeOrder,
            Some(Side::Buy),
            dec!(12.00000000),
            dec!(10),
        ));
        assert_eq!(text, "A buy order worth of 12 Bitcoin was made");
    }

    #[test]
    fn test_price_deviation_message() {
        let formatter = MessageFormatter::default();
        let text = formatter.render(&alert(
            AlertKind::PriceDeviation,
            None,
            dec!(31500.00),
            dec!(30000.00),
        ));
        assert_eq!(
            text,
            "The price of Bitcoin is >= 5% higher than $30000, with a current value of $31500"
        );
    }

    #[test]
    fn test_custom_asset_name() {
        let formatter = MessageFormatter::new("Ether");
        let text = formatter.render(&alert(
            AlertKind::LargeOrder,
            Some(Side::Sell),
            dec!(10.5),
            dec!(10),
        ));
        assert_eq!(text, "A sell order worth of 10.5 Ether was made");
    }

    #[test]
    fn test_percent_above() {
        assert_eq!(percent_above(dec!(1.05)).unwrap().to_string(), "5");
        assert_eq!(percent_above(dec!(1.125)).unwrap().to_string(), "12.5");
        assert_eq!(percent_above(dec!(2)).unwrap().to_string(), "100");
        assert_eq!(margin_text(dec!(0.95)), "-5%");
    }

    #[test]
    fn test_huge_ratio_renders_without_overflow() {
        let ratio = Decimal::from_i128_with_scale(10i128.pow(27), 0);
        assert_eq!(percent_above(ratio), None);

        let mut occurrence = alert(
            AlertKind::PriceDeviation,
            None,
            dec!(31500),
            dec!(30000),
        );
        occurrence.threshold = ratio;
        let text = MessageFormatter::default().render(&occurrence);
        assert_eq!(
            text,
            "The price of Bitcoin is >= 1000000000000000000000000000x higher than $30000, with a current value of $31500"
        );
    }
}
