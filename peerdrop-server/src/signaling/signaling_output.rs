use async_trait::async_trait;
use peerdrop_core::{ServerMessage, SessionId};

/// Outbound path from the relay to connected sessions. The WebSocket layer
/// implements it for real clients; tests capture what would be sent.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    /// Queue a message for one session. Returns `false` when the session has
    /// no live connection; the message is dropped.
    async fn deliver(&self, session_id: SessionId, msg: ServerMessage) -> bool;
}
