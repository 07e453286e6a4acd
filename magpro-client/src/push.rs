//! Server push channel
//!
//! Maintains a WebSocket connection to the server's `/ws` endpoint on a
//! background task. Incoming events and connection transitions are
//! forwarded to the worker over an mpsc channel; the task reconnects on a
//! fixed delay until shut down.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use shared::PushEvent;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

/// Delay between reconnection attempts, in seconds
pub const RECONNECT_DELAY_SECS: u64 = 5;

/// Signal forwarded from the push channel to the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushSignal {
    /// Connection established.
    Connected,
    /// Event received from the server.
    Event(PushEvent),
    /// An established connection dropped; reconnection is underway.
    Disconnected,
}

/// Handle to the background push task.
pub struct PushChannel {
    shutdown: CancellationToken,
    handle: JoinHandle<()>,
}

impl PushChannel {
    /// Spawn the channel, connecting to `ws_url` and forwarding signals to
    /// `tx` until shut down.
    pub fn spawn(ws_url: String, tx: mpsc::Sender<PushSignal>) -> Self {
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(run_loop(ws_url, tx, shutdown.clone()));
        Self { shutdown, handle }
    }

    /// Request shutdown. Idempotent; repeated calls are no-ops.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Shut down and wait for the background task to finish.
    pub async fn close(self) {
        self.shutdown.cancel();
        let _ = self.handle.await;
    }
}

async fn run_loop(url: String, tx: mpsc::Sender<PushSignal>, shutdown: CancellationToken) {
    loop {
        if shutdown.is_cancelled() {
            break;
        }

        match connect_async(&url).await {
            Ok((ws, _)) => {
                tracing::info!(url, "push channel connected");
                let _ = tx.send(PushSignal::Connected).await;
                run_session(ws, &tx, &shutdown).await;
                if shutdown.is_cancelled() {
                    break;
                }
                tracing::warn!(url, "push channel disconnected");
                let _ = tx.send(PushSignal::Disconnected).await;
            }
            Err(err) => {
                tracing::warn!(url, error = %err, "push channel connect failed");
            }
        }

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(Duration::from_secs(RECONNECT_DELAY_SECS)) => {}
        }
    }
    tracing::info!("push channel stopped");
}

async fn run_session(
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    tx: &mpsc::Sender<PushSignal>,
    shutdown: &CancellationToken,
) {
    let (mut sink, mut stream) = ws.split();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                let _ = sink.close().await;
                return;
            }
            message = stream.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<PushEvent>(text.as_str()) {
                        Ok(PushEvent::Unknown) => {
                            tracing::debug!("ignoring unknown push event");
                        }
                        Ok(event) => {
                            let _ = tx.send(PushSignal::Event(event)).await;
                        }
                        Err(err) => {
                            tracing::warn!(error = %err, "malformed push message");
                        }
                    }
                }
                Some(Ok(Message::Ping(payload))) => {
                    let _ = sink.send(Message::Pong(payload)).await;
                }
                Some(Ok(Message::Close(_))) | None => return,
                Some(Err(err)) => {
                    tracing::warn!(error = %err, "push channel stream error");
                    return;
                }
                Some(Ok(_)) => {}
            }
        }
    }
}
