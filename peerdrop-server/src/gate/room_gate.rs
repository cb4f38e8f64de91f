use async_trait::async_trait;
use peerdrop_core::{JoinRejection, RoomId, SessionId, UserId};

/// What a client asked for when it sent `join`.
#[derive(Debug, Clone)]
pub struct JoinRequest {
    pub room_id: RoomId,
    pub session_id: SessionId,
    pub user_id: Option<UserId>,
    pub access_code: Option<String>,
}

/// Terms under which a join was admitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Admission {
    /// Maximum number of members the room may hold, if limited.
    pub capacity: Option<usize>,
}

/// Room metadata check consulted before every join: existence, lock and
/// expiry live with whatever store owns the rooms, not with the relay.
#[async_trait]
pub trait RoomGate: Send + Sync + 'static {
    async fn admit(&self, request: &JoinRequest) -> Result<Admission, JoinRejection>;
}

/// Admits every join, optionally applying one capacity to all rooms.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenGate {
    capacity: Option<usize>,
}

impl OpenGate {
    pub fn new(capacity: Option<usize>) -> Self {
        Self { capacity }
    }
}

#[async_trait]
impl RoomGate for OpenGate {
    async fn admit(&self, _request: &JoinRequest) -> Result<Admission, JoinRejection> {
        Ok(Admission {
            capacity: self.capacity,
        })
    }
}
