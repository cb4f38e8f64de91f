use peerdrop_core::{PeerIdentity, RoomId, SessionId};
use std::collections::HashMap;

/// Membership of one room. Only the registry mutates it, under the room's
/// map entry guard.
#[derive(Debug)]
pub struct Room {
    id: RoomId,
    members: HashMap<SessionId, PeerIdentity>,
}

impl Room {
    pub fn new(id: RoomId) -> Self {
        Self {
            id,
            members: HashMap::new(),
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    /// Returns the identity previously stored for the same session, if any.
    pub(crate) fn insert(&mut self, identity: PeerIdentity) -> Option<PeerIdentity> {
        self.members.insert(identity.session_id, identity)
    }

    pub(crate) fn remove(&mut self, session_id: &SessionId) -> Option<PeerIdentity> {
        self.members.remove(session_id)
    }

    pub fn contains(&self, session_id: &SessionId) -> bool {
        self.members.contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn session_ids(&self) -> Vec<SessionId> {
        self.members.keys().copied().collect()
    }

    pub fn members(&self) -> Vec<PeerIdentity> {
        self.members.values().cloned().collect()
    }
}
