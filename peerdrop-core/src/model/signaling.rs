use crate::model::peer::{SessionId, UserId};
use crate::model::room::RoomId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn stun(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
        }
    }
}

/// Frames a client sends to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    Join {
        room_id: RoomId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_id: Option<UserId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        access_code: Option<String>,
    },
    Leave {
        room_id: RoomId,
    },
    Offer {
        room_id: RoomId,
        target_session_id: SessionId,
        sdp: String,
    },
    Answer {
        room_id: RoomId,
        target_session_id: SessionId,
        sdp: String,
    },
    Candidate {
        room_id: RoomId,
        target_session_id: SessionId,
        candidate: Value,
    },
    ChatMessage {
        room_id: RoomId,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_id: Option<UserId>,
    },
}

impl ClientMessage {
    pub fn join(room_id: impl Into<RoomId>, user_id: Option<UserId>) -> Self {
        Self::Join {
            room_id: room_id.into(),
            user_id,
            access_code: None,
        }
    }

    pub fn offer(room_id: RoomId, target_session_id: SessionId, sdp: String) -> Self {
        Self::Offer {
            room_id,
            target_session_id,
            sdp,
        }
    }

    pub fn answer(room_id: RoomId, target_session_id: SessionId, sdp: String) -> Self {
        Self::Answer {
            room_id,
            target_session_id,
            sdp,
        }
    }

    pub fn candidate(room_id: RoomId, target_session_id: SessionId, candidate: Value) -> Self {
        Self::Candidate {
            room_id,
            target_session_id,
            candidate,
        }
    }

    pub fn room_id(&self) -> &RoomId {
        match self {
            Self::Join { room_id, .. }
            | Self::Leave { room_id }
            | Self::Offer { room_id, .. }
            | Self::Answer { room_id, .. }
            | Self::Candidate { room_id, .. }
            | Self::ChatMessage { room_id, .. } => room_id,
        }
    }
}

/// Why the room gate refused a join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(rename_all = "kebab-case")]
pub enum JoinRejection {
    #[error("room not found")]
    NotFound,
    #[error("room has expired")]
    Expired,
    #[error("access denied")]
    AccessDenied,
    #[error("room is full")]
    Full,
}

/// Frames the relay sends to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    Welcome {
        session_id: SessionId,
        ice_servers: Vec<IceServerConfig>,
    },
    RoomParticipants {
        room_id: RoomId,
        session_ids: Vec<SessionId>,
    },
    PeerJoined {
        room_id: RoomId,
        session_id: SessionId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_id: Option<UserId>,
    },
    PeerLeft {
        room_id: RoomId,
        session_id: SessionId,
    },
    Offer {
        room_id: RoomId,
        from_session_id: SessionId,
        sdp: String,
    },
    Answer {
        room_id: RoomId,
        from_session_id: SessionId,
        sdp: String,
    },
    Candidate {
        room_id: RoomId,
        from_session_id: SessionId,
        candidate: Value,
    },
    ChatMessage {
        room_id: RoomId,
        from_session_id: SessionId,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_id: Option<UserId>,
    },
    JoinRejected {
        room_id: RoomId,
        reason: JoinRejection,
    },
    Error {
        message: String,
    },
}

/// The three handshake message kinds the relay forwards point-to-point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    Offer,
    Answer,
    Candidate,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Offer => "offer",
            Self::Answer => "answer",
            Self::Candidate => "candidate",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of a relayed handshake message, forwarded without inspection.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalPayload {
    Offer { sdp: String },
    Answer { sdp: String },
    Candidate { candidate: Value },
}

impl SignalPayload {
    pub fn kind(&self) -> SignalKind {
        match self {
            Self::Offer { .. } => SignalKind::Offer,
            Self::Answer { .. } => SignalKind::Answer,
            Self::Candidate { .. } => SignalKind::Candidate,
        }
    }

    pub fn into_server_message(self, room_id: RoomId, from_session_id: SessionId) -> ServerMessage {
        match self {
            Self::Offer { sdp } => ServerMessage::Offer {
                room_id,
                from_session_id,
                sdp,
            },
            Self::Answer { sdp } => ServerMessage::Answer {
                room_id,
                from_session_id,
                sdp,
            },
            Self::Candidate { candidate } => ServerMessage::Candidate {
                room_id,
                from_session_id,
                candidate,
            },
        }
    }
}
