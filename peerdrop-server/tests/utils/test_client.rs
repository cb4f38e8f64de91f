use anyhow::{Context, Result, bail};
use futures::{SinkExt, StreamExt};
use peerdrop_core::{ClientMessage, ServerMessage, SessionId};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use super::signal_helpers::SIGNAL_TIMEOUT_MS;

/// Raw WebSocket client speaking the relay's JSON protocol.
pub struct TestClient {
    pub session_id: SessionId,
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestClient {
    /// Connects and consumes the `welcome` frame.
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        let url = format!("ws://{}/ws", addr);
        let (socket, _) = connect_async(url.as_str())
            .await
            .with_context(|| format!("Failed to connect to {}", url))?;

        let mut client = Self {
            session_id: SessionId::new(),
            socket,
        };

        match client.recv().await? {
            ServerMessage::Welcome { session_id, .. } => client.session_id = session_id,
            other => bail!("Expected welcome, got {:?}", other),
        }

        tracing::debug!("[TestClient] Connected as {}", client.session_id);
        Ok(client)
    }

    pub async fn send(&mut self, msg: &ClientMessage) -> Result<()> {
        let json = serde_json::to_string(msg)?;
        self.send_raw(json).await
    }

    pub async fn send_raw(&mut self, text: String) -> Result<()> {
        self.socket
            .send(Message::Text(text.into()))
            .await
            .context("Failed to send frame")
    }

    pub async fn recv(&mut self) -> Result<ServerMessage> {
        self.recv_timeout(SIGNAL_TIMEOUT_MS)
            .await?
            .context("Timeout waiting for a server message")
    }

    /// `None` if nothing arrives within `timeout_ms`.
    pub async fn recv_timeout(&mut self, timeout_ms: u64) -> Result<Option<ServerMessage>> {
        let deadline = Duration::from_millis(timeout_ms);

        loop {
            let next = match tokio::time::timeout(deadline, self.socket.next()).await {
                Ok(next) => next,
                Err(_) => return Ok(None),
            };

            match next {
                Some(Ok(Message::Text(text))) => {
                    let msg = serde_json::from_str(text.as_str())
                        .context("Server sent an undecodable frame")?;
                    return Ok(Some(msg));
                }
                Some(Ok(Message::Close(_))) | None => bail!("Connection closed"),
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e).context("WebSocket error"),
            }
        }
    }

    /// Skips frames until `pred` matches.
    pub async fn recv_until<F>(&mut self, mut pred: F) -> Result<ServerMessage>
    where
        F: FnMut(&ServerMessage) -> bool,
    {
        loop {
            let msg = self.recv().await?;
            if pred(&msg) {
                return Ok(msg);
            }
            tracing::debug!("[TestClient] Skipping {:?}", msg);
        }
    }

    pub async fn close(mut self) -> Result<()> {
        self.socket
            .close(None)
            .await
            .context("Failed to close socket")
    }
}
