use crate::gate::{JoinRequest, RoomGate};
use crate::room::{JoinError, RoomRegistry};
use crate::signaling::SignalingOutput;
use peerdrop_core::{
    ClientMessage, IceServerConfig, JoinRejection, PeerIdentity, RoomId, ServerMessage, SessionId,
    SignalPayload, UserId,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

struct RelayInner {
    registry: RoomRegistry,
    output: Arc<dyn SignalingOutput>,
    gate: Arc<dyn RoomGate>,
    ice_servers: Vec<IceServerConfig>,
}

/// Room membership plus best-effort forwarding of handshake messages between
/// members of the same room.
///
/// Calls for one session must not overlap; the WebSocket reader awaits each
/// dispatch before reading the next frame. Calls for different sessions may
/// run concurrently.
#[derive(Clone)]
pub struct SignalingRelay {
    inner: Arc<RelayInner>,
}

impl SignalingRelay {
    pub fn new(
        output: Arc<dyn SignalingOutput>,
        gate: Arc<dyn RoomGate>,
        ice_servers: Vec<IceServerConfig>,
    ) -> Self {
        Self {
            inner: Arc::new(RelayInner {
                registry: RoomRegistry::new(),
                output,
                gate,
                ice_servers,
            }),
        }
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.inner.registry
    }

    /// Greets a freshly connected session with its id and the ICE servers
    /// clients should use.
    pub async fn connect(&self, session_id: SessionId) {
        info!("Session {} connected", session_id);
        self.send(
            session_id,
            ServerMessage::Welcome {
                session_id,
                ice_servers: self.inner.ice_servers.clone(),
            },
        )
        .await;
    }

    pub async fn dispatch(&self, session_id: SessionId, msg: ClientMessage) {
        match msg {
            ClientMessage::Join {
                room_id,
                user_id,
                access_code,
            } => self.join(session_id, room_id, user_id, access_code).await,
            ClientMessage::Leave { room_id } => self.leave(session_id, &room_id).await,
            ClientMessage::Offer {
                room_id,
                target_session_id,
                sdp,
            } => {
                self.relay(
                    session_id,
                    room_id,
                    target_session_id,
                    SignalPayload::Offer { sdp },
                )
                .await
            }
            ClientMessage::Answer {
                room_id,
                target_session_id,
                sdp,
            } => {
                self.relay(
                    session_id,
                    room_id,
                    target_session_id,
                    SignalPayload::Answer { sdp },
                )
                .await
            }
            ClientMessage::Candidate {
                room_id,
                target_session_id,
                candidate,
            } => {
                self.relay(
                    session_id,
                    room_id,
                    target_session_id,
                    SignalPayload::Candidate { candidate },
                )
                .await
            }
            ClientMessage::ChatMessage {
                room_id,
                message,
                user_id,
            } => {
                self.broadcast_chat(session_id, room_id, message, user_id)
                    .await
            }
        }
    }

    pub async fn join(
        &self,
        session_id: SessionId,
        room_id: RoomId,
        user_id: Option<UserId>,
        access_code: Option<String>,
    ) {
        let request = JoinRequest {
            room_id: room_id.clone(),
            session_id,
            user_id: user_id.clone(),
            access_code,
        };

        let admission = match self.inner.gate.admit(&request).await {
            Ok(admission) => admission,
            Err(reason) => {
                info!("Join of {} to room {} rejected: {}", session_id, room_id, reason);
                self.send(session_id, ServerMessage::JoinRejected { room_id, reason })
                    .await;
                return;
            }
        };

        // A session lives in one room at a time; switching rooms is a leave
        // followed by a join.
        if let Some(current) = self.inner.registry.room_of(&session_id) {
            if current != room_id {
                self.leave(session_id, &current).await;
            }
        }

        let identity = PeerIdentity::new(session_id, user_id.clone(), room_id.clone());
        let outcome = match self.inner.registry.join(identity, admission.capacity) {
            Ok(outcome) => outcome,
            Err(JoinError::Full(_)) => {
                info!("Room {} is full, refusing {}", room_id, session_id);
                self.send(
                    session_id,
                    ServerMessage::JoinRejected {
                        room_id,
                        reason: JoinRejection::Full,
                    },
                )
                .await;
                return;
            }
            Err(e @ JoinError::AlreadyInRoom(_)) => {
                warn!("Join of {} to room {} raced: {}", session_id, room_id, e);
                return;
            }
        };

        info!(
            "Session {} joined room {} ({} members)",
            session_id,
            room_id,
            outcome.participants.len()
        );

        self.send(
            session_id,
            ServerMessage::RoomParticipants {
                room_id: room_id.clone(),
                session_ids: outcome.participants.clone(),
            },
        )
        .await;

        if outcome.rejoined {
            return;
        }

        for member in outcome.participants.iter().filter(|id| **id != session_id) {
            self.send(
                *member,
                ServerMessage::PeerJoined {
                    room_id: room_id.clone(),
                    session_id,
                    user_id: user_id.clone(),
                },
            )
            .await;
        }
    }

    /// Removes the session from whatever room it is in. `room_id` is what the
    /// client named; membership is resolved from the registry.
    pub async fn leave(&self, session_id: SessionId, room_id: &RoomId) {
        let Some(outcome) = self.inner.registry.leave(&session_id) else {
            debug!("Session {} left room {} without being in it", session_id, room_id);
            return;
        };

        if &outcome.room_id != room_id {
            debug!(
                "Session {} asked to leave {} but was in {}",
                session_id, room_id, outcome.room_id
            );
        }

        info!("Session {} left room {}", session_id, outcome.room_id);

        for member in outcome.remaining {
            self.send(
                member,
                ServerMessage::PeerLeft {
                    room_id: outcome.room_id.clone(),
                    session_id,
                },
            )
            .await;
        }
    }

    /// Forwards a handshake payload to `target` when both ends are members of
    /// `room_id`. Anything else is dropped without telling the sender.
    pub async fn relay(
        &self,
        session_id: SessionId,
        room_id: RoomId,
        target: SessionId,
        payload: SignalPayload,
    ) {
        let kind = payload.kind();
        let registry = &self.inner.registry;

        if !registry.contains(&room_id, &session_id) || !registry.contains(&room_id, &target) {
            debug!(
                "Dropping {} from {} to {}: not both in room {}",
                kind, session_id, target, room_id
            );
            return;
        }

        debug!("Relaying {} from {} to {}", kind, session_id, target);
        self.send(target, payload.into_server_message(room_id, session_id))
            .await;
    }

    pub async fn broadcast_chat(
        &self,
        session_id: SessionId,
        room_id: RoomId,
        message: String,
        user_id: Option<UserId>,
    ) {
        let registry = &self.inner.registry;
        if !registry.contains(&room_id, &session_id) {
            debug!("Dropping chat from {}: not in room {}", session_id, room_id);
            return;
        }

        for member in registry.session_ids(&room_id) {
            if member == session_id {
                continue;
            }
            self.send(
                member,
                ServerMessage::ChatMessage {
                    room_id: room_id.clone(),
                    from_session_id: session_id,
                    message: message.clone(),
                    user_id: user_id.clone(),
                },
            )
            .await;
        }
    }

    /// Implicit leave for a closed connection. Once this returns nothing is
    /// routed to the session anymore.
    pub async fn disconnect(&self, session_id: SessionId) {
        if let Some(room_id) = self.inner.registry.room_of(&session_id) {
            self.leave(session_id, &room_id).await;
        }
        info!("Session {} disconnected", session_id);
    }

    async fn send(&self, session_id: SessionId, msg: ServerMessage) {
        if !self.inner.output.deliver(session_id, msg).await {
            debug!("Session {} is gone, message dropped", session_id);
        }
    }
}
