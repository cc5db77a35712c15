//! Local WebSocket server mimicking the OpenAI Realtime endpoint.
//!
//! Accepts a single connection, records the handshake headers, forwards every
//! text frame it receives to the test and sends whatever the test queues.

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;

/// What the client presented during the upgrade.
#[derive(Debug, Clone)]
pub struct Handshake {
    pub path_and_query: String,
    pub authorization: Option<String>,
    pub beta: Option<String>,
}

/// Test-side handle to the mock server.
pub struct RealtimeMock {
    pub addr: SocketAddr,
    pub handshakes: mpsc::UnboundedReceiver<Handshake>,
    /// Parsed JSON of every text frame from the client
    pub received: mpsc::UnboundedReceiver<Value>,
    /// Text frames to send; dropping it closes the socket
    pub outgoing: mpsc::UnboundedSender<String>,
    /// Resolves when the client side of the socket is gone
    pub finished: tokio::task::JoinHandle<()>,
}

impl RealtimeMock {
    pub fn url(&self) -> String {
        format!("ws://{}/v1/realtime", self.addr)
    }
}

/// Start the server. Upgrades without `Authorization: Bearer {api_key}` are
/// rejected with 401.
pub async fn spawn_realtime_mock(api_key: &str) -> RealtimeMock {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let expected = format!("Bearer {api_key}");

    let (handshake_tx, handshakes) = mpsc::unbounded_channel();
    let (received_tx, received) = mpsc::unbounded_channel();
    let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<String>();

    let finished = tokio::spawn(async move {
        let Ok((stream, _)) = listener.accept().await else {
            return;
        };

        let callback = |request: &Request, response: Response| {
            let header = |name: &str| {
                request
                    .headers()
                    .get(name)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string)
            };
            let handshake = Handshake {
                path_and_query: request
                    .uri()
                    .path_and_query()
                    .map(|p| p.to_string())
                    .unwrap_or_default(),
                authorization: header("authorization"),
                beta: header("openai-beta"),
            };
            let authorized = handshake.authorization.as_deref() == Some(expected.as_str());
            let _ = handshake_tx.send(handshake);

            if authorized {
                Ok(response)
            } else {
                let mut rejection = ErrorResponse::new(Some("invalid api key".to_string()));
                *rejection.status_mut() = StatusCode::UNAUTHORIZED;
                Err(rejection)
            }
        };

        let Ok(ws_stream) = accept_hdr_async(stream, callback).await else {
            return;
        };
        let (mut write, mut read) = ws_stream.split();

        loop {
            tokio::select! {
                message = read.next() => match message {
                    Some(Ok(Message::Text(text))) => {
                        if let Ok(json) = serde_json::from_str::<Value>(text.as_str()) {
                            let _ = received_tx.send(json);
                        }
                    }
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    Some(Ok(_)) => {}
                },
                queued = outgoing_rx.recv() => match queued {
                    Some(text) => {
                        if write.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    None => {
                        let _ = write.send(Message::Close(None)).await;
                        break;
                    }
                },
            }
        }
    });

    RealtimeMock {
        addr,
        handshakes,
        received,
        outgoing,
        finished,
    }
}
