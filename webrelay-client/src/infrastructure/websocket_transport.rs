//! WebSocket transport built on tokio-tungstenite.

use crate::port::relay_transport::{RelayConnection, RelayTransport};
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

/// Connects to relays over `ws://` (or `wss://`).
#[derive(Debug, Clone, Default)]
pub struct WebSocketTransport;

impl WebSocketTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RelayTransport for WebSocketTransport {
    type Connection = WebSocketConnection;

    async fn connect(&self, url: &str) -> Result<Self::Connection> {
        let (stream, response) = connect_async(url)
            .await
            .with_context(|| format!("Failed to connect to {}", url))?;
        debug!("WebSocket handshake with {} completed: {}", url, response.status());
        Ok(WebSocketConnection { stream })
    }
}

/// An open WebSocket to the relay.
pub struct WebSocketConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl RelayConnection for WebSocketConnection {
    async fn send_text(&mut self, text: String) -> Result<()> {
        self.stream
            .send(Message::Text(text))
            .await
            .context("Failed to send WebSocket frame")
    }

    async fn next_text(&mut self) -> Option<Result<String>> {
        while let Some(frame) = self.stream.next().await {
            match frame {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Binary(bytes)) => {
                    return Some(Ok(String::from_utf8_lossy(&bytes).into_owned()))
                }
                Ok(Message::Close(reason)) => {
                    debug!("Relay closed connection: {:?}", reason);
                    return None;
                }
                // Ping/Pong are answered by tungstenite itself
                Ok(_) => continue,
                Err(WsError::ConnectionClosed) => return None,
                Err(e) => return Some(Err(e.into())),
            }
        }
        None
    }

    async fn close(&mut self) -> Result<()> {
        match self.stream.close(None).await {
            Ok(()) | Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(e).context("Failed to close WebSocket"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = WebSocketTransport::new()
            .connect(&format!("ws://{}", addr))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_text_and_binary_frames() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            let received = ws.next().await.unwrap().unwrap();
            ws.send(Message::Text("text frame".to_string())).await.unwrap();
            ws.send(Message::Binary(b"binary frame".to_vec())).await.unwrap();
            ws.close(None).await.unwrap();
            // wait for the client's close reply
            while let Some(Ok(_)) = ws.next().await {}
            received
        });

        let mut conn = WebSocketTransport::new()
            .connect(&format!("ws://{}", addr))
            .await
            .unwrap();
        conn.send_text("hello".to_string()).await.unwrap();

        assert_eq!(conn.next_text().await.unwrap().unwrap(), "text frame");
        assert_eq!(conn.next_text().await.unwrap().unwrap(), "binary frame");
        assert!(conn.next_text().await.is_none());
        assert!(conn.close().await.is_ok());

        let received = server.await.unwrap();
        assert_eq!(received, Message::Text("hello".to_string()));
    }
}
