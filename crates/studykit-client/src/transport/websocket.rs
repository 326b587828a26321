//! WebSocket connector for the terminal protocol.
//!
//! Each protocol frame is one WebSocket text message. A background task owns
//! the socket and bridges it to the [`DuplexChannel`] handed to the session.

use futures_util::{SinkExt, StreamExt};
use studykit_core::transport::{Connector, DuplexChannel, TransportEvent};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use super::validate_endpoint;

/// Opens terminal connections over WebSocket.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    capacity: usize,
}

impl Default for WebSocketConnector {
    fn default() -> Self {
        Self { capacity: 256 }
    }
}

impl WebSocketConnector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Connector for WebSocketConnector {
    fn open(&self, endpoint: &str) -> DuplexChannel {
        let (channel, events, outgoing) = DuplexChannel::pair(self.capacity);
        tokio::spawn(run_connection(endpoint.to_string(), events, outgoing));
        channel
    }
}

/// Connect, then pump frames both ways until either side closes.
async fn run_connection(
    url: String,
    events: mpsc::Sender<TransportEvent>,
    mut outgoing: mpsc::Receiver<String>,
) {
    if let Err(e) = validate_endpoint(&url) {
        let _ = events.send(TransportEvent::Error(e.to_string())).await;
        let _ = events.send(TransportEvent::Closed).await;
        return;
    }

    let ws = match connect_async(url.as_str()).await {
        Ok((ws, _response)) => ws,
        Err(e) => {
            tracing::error!("WebSocket connect error: {}", e);
            let _ = events.send(TransportEvent::Error(e.to_string())).await;
            let _ = events.send(TransportEvent::Closed).await;
            return;
        }
    };

    tracing::info!("WebSocket connected to {}", url);
    if events.send(TransportEvent::Open).await.is_err() {
        return;
    }

    let (mut sink, mut stream) = ws.split();

    loop {
        tokio::select! {
            out = outgoing.recv() => {
                match out {
                    Some(text) => {
                        if let Err(e) = sink.send(Message::Text(text)).await {
                            tracing::error!("WebSocket write error: {}", e);
                            let _ = events.send(TransportEvent::Error(e.to_string())).await;
                            break;
                        }
                    }
                    None => {
                        // Session dropped its sender: close politely.
                        let _ = sink.send(Message::Close(None)).await;
                        tracing::debug!("WebSocket closed by client");
                        return;
                    }
                }
            }

            msg = stream.next() => {
                let text = match msg {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Binary(data))) => String::from_utf8_lossy(&data).into_owned(),
                    Some(Ok(Message::Ping(payload))) => {
                        let _ = sink.send(Message::Pong(payload)).await;
                        continue;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::debug!("WebSocket close frame received");
                        break;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        tracing::error!("WebSocket read error: {}", e);
                        let _ = events.send(TransportEvent::Error(e.to_string())).await;
                        break;
                    }
                };

                if events.send(TransportEvent::Message(text)).await.is_err() {
                    tracing::debug!("terminal session gone, closing socket");
                    let _ = sink.send(Message::Close(None)).await;
                    return;
                }
            }
        }
    }

    let _ = events.send(TransportEvent::Closed).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bad_scheme_reports_error_then_closed() {
        let mut channel = WebSocketConnector::new().open("http://example.com/terminal");
        assert!(matches!(
            channel.events.recv().await,
            Some(TransportEvent::Error(_))
        ));
        assert_eq!(channel.events.recv().await, Some(TransportEvent::Closed));
    }

    #[tokio::test]
    async fn refused_connection_reports_error_then_closed() {
        // Port 9 (discard) on loopback is not expected to accept WebSocket upgrades.
        let mut channel = WebSocketConnector::new().open("ws://127.0.0.1:9/terminal");
        assert!(matches!(
            channel.events.recv().await,
            Some(TransportEvent::Error(_))
        ));
        assert_eq!(channel.events.recv().await, Some(TransportEvent::Closed));
    }
}
