//! Websocket client for the exchange market-data feed.
//!
//! - `FeedSession`: one connection, subscribe handshake with ack timeout,
//!   raw payload reads
//! - `ConnectionManager`: reconnection with exponential backoff, heartbeat,
//!   forwarding to the pipeline over a channel
//! - `message`: subscribe request and control envelope

pub mod connection;
pub mod error;
pub mod heartbeat;
pub mod message;
pub mod session;

pub use connection::{ConnectionConfig, ConnectionManager, ConnectionState};
pub use error::{WsError, WsResult};
pub use heartbeat::{HeartbeatManager, HeartbeatStats};
pub use message::{classify, ChannelSpec, ControlMessage, FeedEnvelope, FeedRequest, SubscriptionSpec};
pub use session::FeedSession;

use std::sync::Once;

static INIT_CRYPTO: Once = Once::new();

/// Install the TLS crypto provider.
/// Must be called before any `wss://` connection is made.
pub fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
