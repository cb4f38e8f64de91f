use anyhow::{Context, Result, bail};
use futures::stream::SplitStream;
use futures::{SinkExt, StreamExt};
use peerdrop_core::{ClientMessage, IceServerConfig, ServerMessage, SessionId};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

const WELCOME_TIMEOUT: Duration = Duration::from_secs(10);

type RelaySocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket connection to the relay.
///
/// Outgoing messages go through an unbounded queue drained by a writer task,
/// so [`SignalingClient::sender`] handles can be given to other components.
pub struct SignalingClient {
    session_id: SessionId,
    ice_servers: Vec<IceServerConfig>,
    outgoing: mpsc::UnboundedSender<ClientMessage>,
    incoming: mpsc::UnboundedReceiver<ServerMessage>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl SignalingClient {
    /// Connects to a relay WebSocket URL such as `ws://host:3000/ws` and
    /// waits for its `welcome`.
    pub async fn connect(url: &str) -> Result<Self> {
        let (socket, _) = connect_async(url)
            .await
            .with_context(|| format!("Failed to connect to relay at {}", url))?;
        let (mut write, mut read) = socket.split();

        let welcome = tokio::time::timeout(WELCOME_TIMEOUT, read_welcome(&mut read))
            .await
            .context("Timed out waiting for welcome")??;

        let (session_id, ice_servers) = match welcome {
            ServerMessage::Welcome {
                session_id,
                ice_servers,
            } => (session_id, ice_servers),
            other => bail!("Expected welcome, got {:?}", other),
        };
        info!("Connected to relay as {}", session_id);

        let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<ClientMessage>();
        let (incoming_tx, incoming) = mpsc::unbounded_channel();

        let writer = tokio::spawn(async move {
            while let Some(msg) = outgoing_rx.recv().await {
                let json = match serde_json::to_string(&msg) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!("Failed to encode {:?}: {}", msg, e);
                        continue;
                    }
                };
                if write.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            let _ = write.close().await;
        });

        let reader = tokio::spawn(async move {
            while let Some(msg) = read.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        match serde_json::from_str::<ServerMessage>(text.as_str()) {
                            Ok(msg) => {
                                if incoming_tx.send(msg).is_err() {
                                    break;
                                }
                            }
                            Err(e) => warn!("Undecodable relay message: {}", e),
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Relay connection error: {}", e);
                        break;
                    }
                }
            }
            debug!("Relay reader finished");
        });

        Ok(Self {
            session_id,
            ice_servers,
            outgoing,
            incoming,
            reader,
            writer,
        })
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// ICE servers announced by the relay.
    pub fn ice_servers(&self) -> &[IceServerConfig] {
        &self.ice_servers
    }

    pub fn sender(&self) -> mpsc::UnboundedSender<ClientMessage> {
        self.outgoing.clone()
    }

    pub fn send(&self, msg: ClientMessage) -> Result<()> {
        self.outgoing
            .send(msg)
            .map_err(|_| anyhow::anyhow!("Relay connection is closed"))
    }

    /// Next relay message; `None` once the connection is gone.
    pub async fn recv(&mut self) -> Option<ServerMessage> {
        self.incoming.recv().await
    }
}

async fn read_welcome(read: &mut SplitStream<RelaySocket>) -> Result<ServerMessage> {
    while let Some(msg) = read.next().await {
        match msg.context("Relay connection failed")? {
            Message::Text(text) => {
                return serde_json::from_str(text.as_str())
                    .context("Relay sent an undecodable greeting");
            }
            Message::Close(_) => break,
            _ => continue,
        }
    }
    bail!("Relay closed the connection before welcome")
}

impl Drop for SignalingClient {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
    }
}
