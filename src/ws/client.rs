//! Reconnecting WebSocket client

use super::{WsConfig, WsError, WsMessage};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// WebSocket client with automatic reconnection and exponential backoff
pub struct WsClient {
    config: WsConfig,
}

impl WsClient {
    /// Create a new WebSocket client with the given configuration
    pub fn new(config: WsConfig) -> Self {
        Self { config }
    }

    /// Connect and return a message receiver plus an outbound sender
    ///
    /// Spawns a background task owning the connection. The consumer gets a
    /// `Connected` message after every (re)connect and is expected to send
    /// its subscription payload through the returned sender.
    pub fn connect(&self) -> (mpsc::Receiver<WsMessage>, mpsc::Sender<String>) {
        let (msg_tx, msg_rx) = mpsc::channel(1024);
        let (send_tx, send_rx) = mpsc::channel(256);
        let config = self.config.clone();

        tokio::spawn(async move {
            if let Err(e) = run_connection_loop(config, msg_tx, send_rx).await {
                tracing::error!(error = %e, "WebSocket connection loop failed");
            }
        });

        (msg_rx, send_tx)
    }
}

/// Run the connection loop with automatic reconnection
async fn run_connection_loop(
    config: WsConfig,
    tx: mpsc::Sender<WsMessage>,
    mut send_rx: mpsc::Receiver<String>,
) -> Result<(), WsError> {
    let mut reconnect_attempts = 0;
    let mut reconnect_delay = config.initial_reconnect_delay;

    loop {
        match connect_and_stream(&config, &tx, &mut send_rx).await {
            Ok(()) => {
                tracing::info!("WebSocket connection closed cleanly");
                let _ = tx.send(WsMessage::Disconnected).await;
                break;
            }
            Err(e) => {
                reconnect_attempts += 1;
                tracing::warn!(
                    error = %e,
                    attempt = reconnect_attempts,
                    "WebSocket connection error, reconnecting..."
                );

                // Check max reconnects (0 = infinite)
                if config.max_reconnect_attempts > 0
                    && reconnect_attempts >= config.max_reconnect_attempts
                {
                    tracing::error!("Max reconnection attempts reached");
                    let _ = tx.send(WsMessage::Disconnected).await;
                    return Err(WsError::MaxReconnectsExceeded);
                }

                // Receiver dropped means nobody is listening any more
                if tx.is_closed() {
                    tracing::info!("Receiver dropped, stopping reconnection");
                    break;
                }

                let _ = tx
                    .send(WsMessage::Reconnecting {
                        attempt: reconnect_attempts,
                    })
                    .await;

                sleep(reconnect_delay).await;
                reconnect_delay = (reconnect_delay * 2).min(config.max_reconnect_delay);
            }
        }
    }

    Ok(())
}

/// One connection lifetime: stream frames until the socket dies
async fn connect_and_stream(
    config: &WsConfig,
    tx: &mpsc::Sender<WsMessage>,
    send_rx: &mut mpsc::Receiver<String>,
) -> Result<(), WsError> {
    let (stream, _) = connect_async(&config.url)
        .await
        .map_err(|e| WsError::ConnectionFailed(e.to_string()))?;

    let (mut sink, mut source) = stream.split();

    if tx.send(WsMessage::Connected).await.is_err() {
        return Ok(());
    }

    let mut send_closed = false;
    loop {
        tokio::select! {
            frame = source.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        if tx.send(WsMessage::Text(text.to_string())).await.is_err() {
                            return Ok(());
                        }
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        if sink.send(Message::Pong(payload)).await.is_err() {
                            return Err(WsError::ConnectionFailed("pong failed".to_string()));
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        return Err(WsError::ConnectionFailed("stream closed".to_string()));
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        return Err(WsError::ConnectionFailed(e.to_string()));
                    }
                }
            }
            outbound = send_rx.recv(), if !send_closed => {
                match outbound {
                    Some(payload) => {
                        if sink.send(Message::text(payload)).await.is_err() {
                            return Err(WsError::ConnectionFailed("send failed".to_string()));
                        }
                    }
                    // Sender dropped: keep streaming inbound frames
                    None => send_closed = true,
                }
            }
        }
    }
}
