//! Feed wire messages.
//!
//! Outgoing: the subscribe request.
//! Incoming: only the control envelope is inspected here (`type`,
//! `message`, `reason`); market data payloads are passed through as raw
//! bytes and decoded downstream.

use serde::{Deserialize, Serialize};

// ============================================================================
// Outgoing
// ============================================================================

/// Channels and products to subscribe to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionSpec {
    /// Product ids, e.g. `["BTC-USD"]`.
    pub product_ids: Vec<String>,
    /// Channel names, e.g. `["ticker", "level2"]`.
    pub channels: Vec<String>,
}

impl SubscriptionSpec {
    pub fn new(product_ids: Vec<String>, channels: Vec<String>) -> Self {
        Self {
            product_ids,
            channels,
        }
    }

    /// Single product on the given channels.
    pub fn single(product_id: impl Into<String>, channels: &[&str]) -> Self {
        Self {
            product_ids: vec![product_id.into()],
            channels: channels.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// One entry of the request `channels` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSpec {
    pub name: String,
    pub product_ids: Vec<String>,
}

/// Outgoing request to the feed.
///
/// Serializes as
/// `{"type":"subscribe","channels":[{"name":"ticker","product_ids":["BTC-USD"]}]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub channels: Vec<ChannelSpec>,
}

impl FeedRequest {
    /// Create a subscribe request.
    pub fn subscribe(spec: &SubscriptionSpec) -> Self {
        Self {
            kind: "subscribe".to_string(),
            channels: spec
                .channels
                .iter()
                .map(|name| ChannelSpec {
                    name: name.clone(),
                    product_ids: spec.product_ids.clone(),
                })
                .collect(),
        }
    }
}

// ============================================================================
// Incoming
// ============================================================================

/// Minimal view of an incoming message, enough to route control traffic.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedEnvelope {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Routing decision for an incoming payload during the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    /// `type: "subscriptions"`: the feed accepted the subscribe request.
    SubscriptionsAck,
    /// `type: "error"` with the feed's message and reason joined.
    Error(String),
    /// Anything else, including payloads that are not JSON objects.
    Data,
}

/// Classify a raw payload.
///
/// Unparseable payloads are `Data`: the decoder owns reporting them.
pub fn classify(payload: &[u8]) -> ControlMessage {
    let Ok(envelope) = serde_json::from_slice::<FeedEnvelope>(payload) else {
        return ControlMessage::Data;
    };

    match envelope.kind.as_deref() {
        Some("subscriptions") => ControlMessage::SubscriptionsAck,
        Some("error") => {
            let message = envelope.message.unwrap_or_default();
            let text = match envelope.reason {
                Some(reason) if !reason.is_empty() => format!("{message}: {reason}"),
                _ => message,
            };
            ControlMessage::Error(text)
        }
        _ => ControlMessage::Data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_subscribe_request_shape() {
        let spec = SubscriptionSpec::single("BTC-USD", &["ticker"]);
        let value = serde_json::to_value(FeedRequest::subscribe(&spec)).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "subscribe",
                "channels": [{"name": "ticker", "product_ids": ["BTC-USD"]}]
            })
        );
    }

    #[test]
    fn test_subscribe_request_multiple_channels() {
        let spec = SubscriptionSpec::new(
            vec!["BTC-USD".to_string()],
            vec!["ticker".to_string(), "level2".to_string()],
        );
        let req = FeedRequest::subscribe(&spec);
        assert_eq!(req.kind, "subscribe");
        assert_eq!(req.channels.len(), 2);
        assert_eq!(req.channels[1].name, "level2");
        assert_eq!(req.channels[1].product_ids, vec!["BTC-USD"]);
    }

    #[test]
    fn test_classify_ack() {
        let raw = br#"{"type":"subscriptions","channels":[{"name":"ticker","product_ids":["BTC-USD"]}]}"#;
        assert_eq!(classify(raw), ControlMessage::SubscriptionsAck);
    }

    #[test]
    fn test_classify_error() {
        let raw = br#"{"type":"error","message":"Failed to subscribe","reason":"BTC-XYZ is not a valid product"}"#;
        assert_eq!(
            classify(raw),
            ControlMessage::Error("Failed to subscribe: BTC-XYZ is not a valid product".to_string())
        );

        let raw = br#"{"type":"error","message":"rate limited"}"#;
        assert_eq!(classify(raw), ControlMessage::Error("rate limited".to_string()));
    }

    #[test]
    fn test_classify_data() {
        assert_eq!(
            classify(br#"{"type":"ticker","price":"1"}"#),
            ControlMessage::Data
        );
        assert_eq!(classify(b"not json"), ControlMessage::Data);
        assert_eq!(classify(b"[1,2,3]"), ControlMessage::Data);
    }
}
