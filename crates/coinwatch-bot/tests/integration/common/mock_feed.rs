//! Mock market-data feed for integration tests.
//!
//! Accepts websocket connections, answers the subscribe request according
//! to an [`AckBehavior`], streams scripted payloads and records everything
//! the client sends.

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::{accept_async, tungstenite::Message};

/// How the server answers a subscribe request.
#[derive(Debug, Clone)]
pub enum AckBehavior {
    /// `{"type":"subscriptions",...}`
    Ack,
    /// `{"type":"error","message":"Failed to subscribe","reason":...}`
    Reject(String),
    /// Never answer.
    Silent,
}

/// What the server does on each connection.
#[derive(Debug, Clone)]
pub struct FeedScript {
    pub ack: AckBehavior,
    /// Sent after the subscribe request, before the answer.
    pub before_ack: Vec<String>,
    /// Sent after the answer.
    pub after_ack: Vec<String>,
    /// Send a Close frame once `after_ack` is out.
    pub close_after: bool,
}

impl Default for FeedScript {
    fn default() -> Self {
        Self {
            ack: AckBehavior::Ack,
            before_ack: Vec::new(),
            after_ack: Vec::new(),
            close_after: false,
        }
    }
}

impl FeedScript {
    pub fn streaming(messages: Vec<String>) -> Self {
        Self {
            after_ack: messages,
            ..Default::default()
        }
    }
}

pub struct MockFeedServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    received: Arc<Mutex<Vec<String>>>,
    connections: Arc<Mutex<u32>>,
}

impl MockFeedServer {
    /// Start on an ephemeral port.
    pub async fn start(script: FeedScript) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let received = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(Mutex::new(0));
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let received_clone = received.clone();
        let connections_clone = connections.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Ok((stream, _)) = listener.accept() => {
                        tokio::spawn(handle_connection(
                            stream,
                            script.clone(),
                            received_clone.clone(),
                            connections_clone.clone(),
                        ));
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            received,
            connections,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub async fn connection_count(&self) -> u32 {
        *self.connections.lock().await
    }

    /// Text frames received from clients, in order.
    pub async fn received_messages(&self) -> Vec<String> {
        self.received.lock().await.clone()
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

async fn handle_connection(
    stream: TcpStream,
    script: FeedScript,
    received: Arc<Mutex<Vec<String>>>,
    connections: Arc<Mutex<u32>>,
) {
    *connections.lock().await += 1;

    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("WebSocket handshake failed: {e}");
            return;
        }
    };

    let (mut write, mut read) = ws_stream.split();

    while let Some(msg) = read.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                received.lock().await.push(text.clone());

                let Ok(parsed) = serde_json::from_str::<serde_json::Value>(&text) else {
                    continue;
                };
                if parsed.get("type") != Some(&serde_json::json!("subscribe")) {
                    continue;
                }

                for payload in &script.before_ack {
                    let _ = write.send(Message::Text(payload.clone())).await;
                }

                let answer = match &script.ack {
                    AckBehavior::Ack => Some(serde_json::json!({
                        "type": "subscriptions",
                        "channels": parsed.get("channels").cloned().unwrap_or_default(),
                    })),
                    AckBehavior::Reject(reason) => Some(serde_json::json!({
                        "type": "error",
                        "message": "Failed to subscribe",
                        "reason": reason,
                    })),
                    AckBehavior::Silent => None,
                };
                if let Some(answer) = answer {
                    let _ = write.send(Message::Text(answer.to_string())).await;
                }

                for payload in &script.after_ack {
                    let _ = write.send(Message::Text(payload.clone())).await;
                }

                if script.close_after {
                    let _ = write.send(Message::Close(None)).await;
                    return;
                }
            }
            Ok(Message::Ping(data)) => {
                let _ = write.send(Message::Pong(data)).await;
            }
            Ok(Message::Close(_)) => break,
            Err(_) => break,
            _ => {}
        }
    }
}

/// Ticker payload for BTC-USD.
pub fn ticker(price: &str, size: &str) -> String {
    serde_json::json!({
        "type": "ticker",
        "sequence": 1,
        "product_id": "BTC-USD",
        "price": price,
        "side": "buy",
        "last_size": size,
        "time": "2022-10-19T23:28:22.061769Z",
    })
    .to_string()
}

/// Order-book diff payload for BTC-USD.
pub fn l2update(changes: &[(&str, &str, &str)]) -> String {
    let changes: Vec<_> = changes
        .iter()
        .map(|(side, price, size)| serde_json::json!([side, price, size]))
        .collect();
    serde_json::json!({
        "type": "l2update",
        "product_id": "BTC-USD",
        "changes": changes,
        "time": "2022-10-19T23:28:22.061769Z",
    })
    .to_string()
}
