//! A single subscribed feed connection.
//!
//! `FeedSession::connect` opens the socket, sends the subscribe request and
//! waits for the feed's `subscriptions` acknowledgement. Market data that
//! races ahead of the acknowledgement is buffered and returned first by
//! `next_message`, so nothing is lost during the handshake.

use crate::error::{WsError, WsResult};
use crate::heartbeat::HeartbeatManager;
use crate::message::{classify, ControlMessage, FeedRequest, SubscriptionSpec};
use futures_util::{SinkExt, StreamExt};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::{
    connect_async_tls_with_config, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, info, warn};

type FeedStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct FeedSession {
    stream: FeedStream,
    pending: VecDeque<Vec<u8>>,
    heartbeat: Option<Arc<HeartbeatManager>>,
}

impl FeedSession {
    /// Connect, subscribe and wait for the acknowledgement.
    pub async fn connect(
        endpoint: &str,
        spec: &SubscriptionSpec,
        ack_timeout: Duration,
    ) -> WsResult<Self> {
        Self::connect_with_heartbeat(endpoint, spec, ack_timeout, None).await
    }

    pub async fn connect_with_heartbeat(
        endpoint: &str,
        spec: &SubscriptionSpec,
        ack_timeout: Duration,
        heartbeat: Option<Arc<HeartbeatManager>>,
    ) -> WsResult<Self> {
        info!(%endpoint, "Connecting to feed");

        // TCP_NODELAY: ticks are small and latency matters more than batching
        let (stream, _response) = connect_async_tls_with_config(endpoint, None, true, None)
            .await
            .map_err(|e| WsError::ConnectionFailed(e.to_string()))?;

        if let Some(hb) = &heartbeat {
            hb.reset();
        }

        let mut session = Self {
            stream,
            pending: VecDeque::new(),
            heartbeat,
        };
        session.subscribe(spec, ack_timeout).await?;
        Ok(session)
    }

    async fn subscribe(&mut self, spec: &SubscriptionSpec, ack_timeout: Duration) -> WsResult<()> {
        let request = serde_json::to_string(&FeedRequest::subscribe(spec))?;
        self.stream.send(Message::Text(request)).await?;
        debug!(
            products = ?spec.product_ids,
            channels = ?spec.channels,
            "Subscribe request sent"
        );

        match tokio::time::timeout(ack_timeout, self.await_ack()).await {
            Ok(result) => result,
            Err(_) => {
                warn!(timeout_ms = ack_timeout.as_millis() as u64, "Subscription ack timed out");
                Err(WsError::SubscriptionAckTimeout(ack_timeout.as_millis() as u64))
            }
        }
    }

    async fn await_ack(&mut self) -> WsResult<()> {
        loop {
            let payload = self.read_frame().await?;
            match classify(&payload) {
                ControlMessage::SubscriptionsAck => {
                    info!(buffered = self.pending.len(), "Subscription acknowledged");
                    return Ok(());
                }
                ControlMessage::Error(message) => {
                    return Err(WsError::SubscriptionRejected(message));
                }
                ControlMessage::Data => self.pending.push_back(payload),
            }
        }
    }

    /// Next raw data payload. Ping/pong frames are consumed here.
    pub async fn next_message(&mut self) -> WsResult<Vec<u8>> {
        if let Some(payload) = self.pending.pop_front() {
            return Ok(payload);
        }
        self.read_frame().await
    }

    async fn read_frame(&mut self) -> WsResult<Vec<u8>> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    self.record_message();
                    return Ok(text.into_bytes());
                }
                Some(Ok(Message::Binary(data))) => {
                    self.record_message();
                    return Ok(data);
                }
                Some(Ok(Message::Ping(data))) => {
                    self.record_message();
                    self.stream.send(Message::Pong(data)).await?;
                }
                Some(Ok(Message::Pong(_))) => {
                    if let Some(hb) = &self.heartbeat {
                        hb.record_pong();
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = close_details(frame);
                    warn!(code, %reason, "Feed closed by server");
                    return Err(WsError::ConnectionClosed { code, reason });
                }
                Some(Ok(Message::Frame(_))) => {}
                Some(Err(e)) => return Err(e.into()),
                None => return Err(WsError::stream_ended("while reading")),
            }
        }
    }

    /// Send a websocket ping.
    pub async fn ping(&mut self) -> WsResult<()> {
        self.stream
            .send(Message::Ping(Vec::new()))
            .await
            .map_err(|e| WsError::SendFailed(e.to_string()))?;
        if let Some(hb) = &self.heartbeat {
            hb.record_ping();
        }
        Ok(())
    }

    /// Send a Close frame. The session is unusable afterwards.
    pub async fn close(&mut self) -> WsResult<()> {
        self.pending.clear();
        self.stream
            .close(None)
            .await
            .map_err(|e| WsError::SendFailed(e.to_string()))
    }

    /// Payloads received before the acknowledgement and not yet consumed.
    pub fn buffered(&self) -> usize {
        self.pending.len()
    }

    fn record_message(&self) {
        if let Some(hb) = &self.heartbeat {
            hb.record_message();
        }
    }
}

fn close_details(frame: Option<CloseFrame<'_>>) -> (u16, String) {
    frame
        .map(|f| (f.code.into(), f.reason.to_string()))
        .unwrap_or((1000, "Normal close".to_string()))
}
