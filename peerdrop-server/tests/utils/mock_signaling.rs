use async_trait::async_trait;
use peerdrop_core::{ServerMessage, SessionId};
use peerdrop_server::SignalingOutput;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

/// Mock SignalingOutput that captures everything the relay sends.
#[derive(Clone)]
pub struct MockSignalingOutput {
    tx: mpsc::UnboundedSender<(SessionId, ServerMessage)>,
    sent: Arc<Mutex<Vec<(SessionId, ServerMessage)>>>,
    /// Sessions treated as disconnected; delivery to them fails.
    gone: Arc<Mutex<HashSet<SessionId>>>,
}

impl MockSignalingOutput {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(SessionId, ServerMessage)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let output = Self {
            tx,
            sent: Arc::new(Mutex::new(Vec::new())),
            gone: Arc::new(Mutex::new(HashSet::new())),
        };
        (output, rx)
    }

    pub fn new_stored_only() -> Self {
        Self::new().0
    }

    pub async fn mark_gone(&self, session_id: SessionId) {
        self.gone.lock().await.insert(session_id);
    }

    /// Everything delivered to one session, in order.
    pub async fn sent_to(&self, session_id: SessionId) -> Vec<ServerMessage> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|(id, _)| *id == session_id)
            .map(|(_, msg)| msg.clone())
            .collect()
    }

    pub async fn total_sent(&self) -> usize {
        self.sent.lock().await.len()
    }

    pub async fn clear(&self) {
        self.sent.lock().await.clear();
    }
}

impl Default for MockSignalingOutput {
    fn default() -> Self {
        Self::new_stored_only()
    }
}

#[async_trait]
impl SignalingOutput for MockSignalingOutput {
    async fn deliver(&self, session_id: SessionId, msg: ServerMessage) -> bool {
        if self.gone.lock().await.contains(&session_id) {
            tracing::debug!("[MockSignaling] {} is gone", session_id);
            return false;
        }

        tracing::debug!("[MockSignaling] deliver to {}", session_id);
        self.sent.lock().await.push((session_id, msg.clone()));
        let _ = self.tx.send((session_id, msg));
        true
    }
}
