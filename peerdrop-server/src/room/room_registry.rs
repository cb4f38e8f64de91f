use crate::room::Room;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use peerdrop_core::{PeerIdentity, RoomId, SessionId};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    #[error("room {0} is full")]
    Full(RoomId),

    /// The session must leave its current room before joining another one.
    #[error("session is already a member of room {0}")]
    AlreadyInRoom(RoomId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    /// Every session in the room after the join, the caller included.
    pub participants: Vec<SessionId>,
    /// The session was already a member; its identity was refreshed.
    pub rejoined: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveOutcome {
    pub room_id: RoomId,
    pub remaining: Vec<SessionId>,
    pub room_closed: bool,
}

/// In-memory room membership.
///
/// Each room lives in its own `DashMap` entry, so joins and leaves on one room
/// are serialized by that entry's guard while different rooms proceed
/// independently. A second index maps each session to the single room it is
/// in. No guard on one map is ever held while touching the other.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: DashMap<RoomId, Room>,
    sessions: DashMap<SessionId, RoomId>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the session to `identity.room_id`, creating the room on first
    /// join. `capacity` caps the member count; a re-join never counts twice.
    pub fn join(
        &self,
        identity: PeerIdentity,
        capacity: Option<usize>,
    ) -> Result<JoinOutcome, JoinError> {
        let session_id = identity.session_id;
        let room_id = identity.room_id.clone();

        if let Some(current) = self.room_of(&session_id) {
            if current != room_id {
                return Err(JoinError::AlreadyInRoom(current));
            }
        }

        let outcome = match self.rooms.entry(room_id.clone()) {
            Entry::Occupied(mut entry) => {
                let room = entry.get_mut();
                let already_member = room.contains(&session_id);

                if let Some(limit) = capacity {
                    if !already_member && room.len() >= limit {
                        return Err(JoinError::Full(room_id));
                    }
                }

                let rejoined = room.insert(identity).is_some();
                JoinOutcome {
                    participants: room.session_ids(),
                    rejoined,
                }
            }
            Entry::Vacant(entry) => {
                if capacity == Some(0) {
                    return Err(JoinError::Full(room_id));
                }

                info!("Creating room {}", room_id);
                let mut room = Room::new(room_id.clone());
                room.insert(identity);
                let participants = room.session_ids();
                entry.insert(room);
                JoinOutcome {
                    participants,
                    rejoined: false,
                }
            }
        };

        self.sessions.insert(session_id, room_id);
        Ok(outcome)
    }

    /// Removes the session from the room it is in, deleting the room if it
    /// becomes empty. `None` when the session was not in any room.
    pub fn leave(&self, session_id: &SessionId) -> Option<LeaveOutcome> {
        let (_, room_id) = self.sessions.remove(session_id)?;

        let remaining = match self.rooms.get_mut(&room_id) {
            Some(mut room) => {
                room.remove(session_id);
                room.session_ids()
            }
            None => Vec::new(),
        };

        let room_closed = self
            .rooms
            .remove_if(&room_id, |_, room| room.is_empty())
            .is_some();

        if room_closed {
            info!("Room {} is empty, removing it", room_id);
        } else {
            debug!(
                "Session {} left room {} ({} remaining)",
                session_id,
                room_id,
                remaining.len()
            );
        }

        Some(LeaveOutcome {
            room_id,
            remaining,
            room_closed,
        })
    }

    pub fn room_of(&self, session_id: &SessionId) -> Option<RoomId> {
        self.sessions.get(session_id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, room_id: &RoomId, session_id: &SessionId) -> bool {
        self.rooms
            .get(room_id)
            .is_some_and(|room| room.contains(session_id))
    }

    pub fn session_ids(&self, room_id: &RoomId) -> Vec<SessionId> {
        self.rooms
            .get(room_id)
            .map(|room| room.session_ids())
            .unwrap_or_default()
    }

    pub fn members(&self, room_id: &RoomId) -> Vec<PeerIdentity> {
        self.rooms
            .get(room_id)
            .map(|room| room.members())
            .unwrap_or_default()
    }

    pub fn member_count(&self, room_id: &RoomId) -> usize {
        self.rooms.get(room_id).map_or(0, |room| room.len())
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}
