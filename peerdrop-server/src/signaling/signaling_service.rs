use crate::signaling::SignalingOutput;
use async_trait::async_trait;
use axum::extract::ws::Message;
use dashmap::DashMap;
use peerdrop_core::{ServerMessage, SessionId};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error};

struct SignalingInner {
    sessions: DashMap<SessionId, mpsc::UnboundedSender<Message>>,
}

/// Outbound WebSocket queues, one per connected session. Messages to one
/// session are written in the order they were queued.
#[derive(Clone)]
pub struct SignalingService {
    inner: Arc<SignalingInner>,
}

impl SignalingService {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SignalingInner {
                sessions: DashMap::new(),
            }),
        }
    }

    pub fn add_session(&self, session_id: SessionId, tx: mpsc::UnboundedSender<Message>) {
        self.inner.sessions.insert(session_id, tx);
    }

    pub fn remove_session(&self, session_id: &SessionId) {
        self.inner.sessions.remove(session_id);
    }

    pub fn session_count(&self) -> usize {
        self.inner.sessions.len()
    }

    pub fn send_signal(&self, session_id: SessionId, msg: &ServerMessage) -> bool {
        let Some(session) = self.inner.sessions.get(&session_id) else {
            debug!("Dropping signal for disconnected session {}", session_id);
            return false;
        };

        match serde_json::to_string(msg) {
            Ok(json) => {
                if let Err(e) = session.send(Message::Text(json.into())) {
                    error!("Failed to queue WS message for {}: {:?}", session_id, e);
                    return false;
                }
                true
            }
            Err(e) => {
                error!("Failed to serialize signal message: {}", e);
                false
            }
        }
    }
}

impl Default for SignalingService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SignalingOutput for SignalingService {
    async fn deliver(&self, session_id: SessionId, msg: ServerMessage) -> bool {
        self.send_signal(session_id, &msg)
    }
}
