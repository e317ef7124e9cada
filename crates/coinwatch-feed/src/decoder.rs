//! Raw feed payload → `MarketEvent`s.
//!
//! Fields are matched by name and unknown fields are ignored. The message
//! type comes from `type`; when it is absent the shape decides (`changes`
//! means a book diff, `price` means a ticker).
//!
//! Numeric fields are accepted as decimal strings (what the feed sends) or
//! JSON numbers, and parsed into exact decimals.

use crate::error::{DecodeError, DecodeResult};
use crate::event::MarketEvent;
use coinwatch_core::{Price, ProductId, Side, Size};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use tracing::trace;

/// Union of the fields read from any feed message.
#[derive(Debug, Default, Deserialize)]
struct RawMessage {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    product_id: Option<String>,
    #[serde(default)]
    price: Option<Value>,
    #[serde(default)]
    side: Option<String>,
    #[serde(default)]
    last_size: Option<Value>,
    #[serde(default)]
    changes: Option<Vec<Value>>,
    #[serde(default)]
    time: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

impl RawMessage {
    fn resolved_kind(&self) -> &str {
        match self.kind.as_deref() {
            Some(kind) => kind,
            None if self.changes.is_some() => "l2update",
            None if self.price.is_some() => "ticker",
            None => "<untyped>",
        }
    }
}

/// Decode one raw feed message.
///
/// A ticker yields exactly one event. A book diff yields one event per
/// change in array order; any malformed change rejects the whole message.
pub fn decode(raw: &[u8]) -> DecodeResult<Vec<MarketEvent>> {
    let msg: RawMessage = serde_json::from_slice(raw)?;
    let kind = msg.resolved_kind().to_string();

    match kind.as_str() {
        "ticker" => decode_ticker(msg).map(|event| vec![event]),
        "l2update" => decode_book(msg),
        "error" => {
            let message = msg.message.unwrap_or_default();
            Err(DecodeError::FeedError(match msg.reason {
                Some(reason) if !reason.is_empty() => format!("{message}: {reason}"),
                _ => message,
            }))
        }
        other => Err(DecodeError::Unsupported(other.to_string())),
    }
}

/// Convenience wrapper for text frames.
pub fn decode_str(raw: &str) -> DecodeResult<Vec<MarketEvent>> {
    decode(raw.as_bytes())
}

fn decode_ticker(msg: RawMessage) -> DecodeResult<MarketEvent> {
    let product_id = product_id(msg.product_id)?;
    let price = parse_price("price", msg.price.as_ref())?;
    let size = parse_size("last_size", msg.last_size.as_ref())?;
    let side = parse_side(msg.side.as_deref())?;

    trace!(%product_id, %price, %size, %side, "Ticker decoded");
    Ok(MarketEvent::TickerTick {
        product_id,
        price,
        side,
        size,
        time: msg.time,
    })
}

fn decode_book(msg: RawMessage) -> DecodeResult<Vec<MarketEvent>> {
    let product_id = product_id(msg.product_id)?;
    let changes = msg.changes.ok_or(DecodeError::MissingField("changes"))?;
    let timestamp = msg.time.ok_or(DecodeError::MissingField("time"))?;

    changes
        .iter()
        .enumerate()
        .map(|(index, change)| {
            let entry = match change.as_array() {
                Some(entry) if entry.len() >= 3 => entry,
                _ => return Err(DecodeError::MalformedChange { index }),
            };
            let side = parse_side(entry[0].as_str())?;
            let price = parse_price("changes.price", Some(&entry[1]))?;
            let size = parse_size("changes.size", Some(&entry[2]))?;

            Ok(MarketEvent::BookChange {
                product_id: product_id.clone(),
                side,
                price,
                size,
                timestamp: timestamp.clone(),
            })
        })
        .collect()
}

fn product_id(raw: Option<String>) -> DecodeResult<ProductId> {
    raw.and_then(|id| ProductId::new(id).ok())
        .ok_or(DecodeError::MissingField("product_id"))
}

fn parse_side(raw: Option<&str>) -> DecodeResult<Side> {
    let raw = raw.ok_or(DecodeError::MissingField("side"))?;
    raw.parse()
        .map_err(|_| DecodeError::InvalidSide(raw.to_string()))
}

fn parse_price(field: &'static str, raw: Option<&Value>) -> DecodeResult<Price> {
    parse_non_negative(field, raw).map(Price::new)
}

fn parse_size(field: &'static str, raw: Option<&Value>) -> DecodeResult<Size> {
    parse_non_negative(field, raw).map(Size::new)
}

fn parse_non_negative(field: &'static str, raw: Option<&Value>) -> DecodeResult<Decimal> {
    let text = match raw {
        None => return Err(DecodeError::MissingField(field)),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => {
            return Err(DecodeError::InvalidNumber {
                field,
                value: other.to_string(),
            })
        }
    };

    let value: Decimal = text
        .trim()
        .parse()
        .map_err(|_| DecodeError::InvalidNumber {
            field,
            value: text.clone(),
        })?;

    if value.is_sign_negative() && !value.is_zero() {
        return Err(DecodeError::NegativeValue { field, value: text });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use rust_decimal_macros::dec;

    const TICKER: &str = r#"{
        "type": "ticker",
        "sequence": 37475248783,
        "product_id": "BTC-USD",
        "price": "30000.00",
        "open_24h": "29500.00",
        "side": "buy",
        "time": "2022-10-19T23:28:22.061769Z",
        "trade_id": 370843401,
        "last_size": "0.00015"
    }"#;

    #[test]
    fn test_decode_ticker() {
        let events = decode_str(TICKER).unwrap();
        assert_eq!(events.len(), 1);
        match &events[0] {
            MarketEvent::TickerTick {
                product_id,
                price,
                side,
                size,
                time,
            } => {
                assert_eq!(product_id.as_str(), "BTC-USD");
                assert_eq!(*price, Price::new(dec!(30000)));
                assert_eq!(*side, Side::Buy);
                assert_eq!(*size, Size::new(dec!(0.00015)));
                assert_eq!(time.as_deref(), Some("2022-10-19T23:28:22.061769Z"));
            }
            other => panic!("Expected TickerTick, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_ticker_without_type_is_inferred() {
        let raw = r#"{"product_id":"BTC-USD","price":"1","side":"sell","last_size":"2"}"#;
        let events = decode_str(raw).unwrap();
        assert_eq!(events[0].kind(), EventKind::Ticker);
        assert_eq!(events[0].timestamp(), None);
    }

    #[test]
    fn test_decode_ticker_numeric_json_values() {
        let raw = r#"{"type":"ticker","product_id":"BTC-USD","price":30000.5,"side":"buy","last_size":10}"#;
        let events = decode_str(raw).unwrap();
        assert_eq!(events[0].price(), Price::new(dec!(30000.5)));
        assert_eq!(events[0].size(), Size::new(dec!(10)));
    }

    #[test]
    fn test_decode_ticker_missing_fields() {
        let raw = r#"{"type":"ticker","product_id":"BTC-USD","side":"buy","last_size":"1"}"#;
        assert!(matches!(
            decode_str(raw),
            Err(DecodeError::MissingField("price"))
        ));

        let raw = r#"{"type":"ticker","product_id":"BTC-USD","price":"1","side":"buy"}"#;
        assert!(matches!(
            decode_str(raw),
            Err(DecodeError::MissingField("last_size"))
        ));

        let raw = r#"{"type":"ticker","price":"1","side":"buy","last_size":"1"}"#;
        assert!(matches!(
            decode_str(raw),
            Err(DecodeError::MissingField("product_id"))
        ));

        let raw = r#"{"type":"ticker","product_id":"BTC-USD","price":"1","last_size":"1"}"#;
        assert!(matches!(
            decode_str(raw),
            Err(DecodeError::MissingField("side"))
        ));
    }

    #[test]
    fn test_decode_ticker_invalid_number() {
        let raw = r#"{"type":"ticker","product_id":"BTC-USD","price":"abc","side":"buy","last_size":"1"}"#;
        match decode_str(raw) {
            Err(DecodeError::InvalidNumber { field, value }) => {
                assert_eq!(field, "price");
                assert_eq!(value, "abc");
            }
            other => panic!("Expected InvalidNumber, got {other:?}"),
        }

        let raw = r#"{"type":"ticker","product_id":"BTC-USD","price":"","side":"buy","last_size":"1"}"#;
        assert!(matches!(
            decode_str(raw),
            Err(DecodeError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_negative_and_bad_side() {
        let raw = r#"{"type":"ticker","product_id":"BTC-USD","price":"-1","side":"buy","last_size":"1"}"#;
        assert!(matches!(
            decode_str(raw),
            Err(DecodeError::NegativeValue { field: "price", .. })
        ));

        let raw = r#"{"type":"ticker","product_id":"BTC-USD","price":"1","side":"hold","last_size":"1"}"#;
        assert!(matches!(
            decode_str(raw),
            Err(DecodeError::InvalidSide(s)) if s == "hold"
        ));
    }

    #[test]
    fn test_decode_zero_is_valid() {
        let raw = r#"{"type":"l2update","product_id":"BTC-USD","changes":[["sell","30000","0"]],"time":"t"}"#;
        let events = decode_str(raw).unwrap();
        assert!(events[0].size().is_zero());
    }

    #[test]
    fn test_decode_book_diff_in_order() {
        let raw = r#"{
            "type": "l2update",
            "product_id": "BTC-USD",
            "changes": [["buy", "30000.00", "5"], ["sell", "30010.50", "12"]],
            "time": "2022-10-19T23:28:22.061769Z"
        }"#;
        let events = decode_str(raw).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].side(), Side::Buy);
        assert_eq!(events[0].size(), Size::new(dec!(5)));
        assert_eq!(events[1].side(), Side::Sell);
        assert_eq!(events[1].price(), Price::new(dec!(30010.50)));
        assert_eq!(events[1].timestamp(), Some("2022-10-19T23:28:22.061769Z"));
        assert!(events.iter().all(|e| e.kind() == EventKind::Book));
    }

    #[test]
    fn test_decode_book_without_type_is_inferred() {
        let raw = r#"{"product_id":"BTC-USD","changes":[["buy","1","2"]],"time":"t"}"#;
        assert_eq!(decode_str(raw).unwrap()[0].kind(), EventKind::Book);
    }

    #[test]
    fn test_decode_book_empty_changes() {
        let raw = r#"{"type":"l2update","product_id":"BTC-USD","changes":[],"time":"t"}"#;
        assert!(decode_str(raw).unwrap().is_empty());
    }

    #[test]
    fn test_decode_book_malformed_change_rejects_message() {
        let raw = r#"{"type":"l2update","product_id":"BTC-USD","changes":[["buy","1","2"],["sell","3"]],"time":"t"}"#;
        assert!(matches!(
            decode_str(raw),
            Err(DecodeError::MalformedChange { index: 1 })
        ));

        let raw = r#"{"type":"l2update","product_id":"BTC-USD","changes":["buy"],"time":"t"}"#;
        assert!(matches!(
            decode_str(raw),
            Err(DecodeError::MalformedChange { index: 0 })
        ));
    }

    #[test]
    fn test_decode_book_missing_time() {
        let raw = r#"{"type":"l2update","product_id":"BTC-USD","changes":[["buy","1","2"]]}"#;
        assert!(matches!(
            decode_str(raw),
            Err(DecodeError::MissingField("time"))
        ));
    }

    #[test]
    fn test_decode_control_messages() {
        let raw = r#"{"type":"subscriptions","channels":[{"name":"ticker","product_ids":["BTC-USD"]}]}"#;
        let err = decode_str(raw).unwrap_err();
        assert!(err.is_control());
        assert_eq!(err.reason(), "unsupported");

        let raw = r#"{"type":"heartbeat","sequence":90,"last_trade_id":20,"product_id":"BTC-USD","time":"t"}"#;
        assert!(matches!(decode_str(raw), Err(DecodeError::Unsupported(t)) if t == "heartbeat"));

        assert!(matches!(decode_str("{}"), Err(DecodeError::Unsupported(_))));
    }

    #[test]
    fn test_decode_feed_error() {
        let raw = r#"{"type":"error","message":"Failed to subscribe","reason":"bad product"}"#;
        match decode_str(raw) {
            Err(DecodeError::FeedError(msg)) => assert_eq!(msg, "Failed to subscribe: bad product"),
            other => panic!("Expected FeedError, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_invalid_json() {
        assert!(matches!(decode(b"not json"), Err(DecodeError::Json(_))));
        assert!(matches!(decode(b"[1,2]"), Err(DecodeError::Json(_))));
    }
}
