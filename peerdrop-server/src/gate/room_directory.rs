use crate::config::RelayConfig;
use crate::gate::{Admission, JoinRequest, RoomGate};
use async_trait::async_trait;
use dashmap::DashMap;
use peerdrop_core::{JoinRejection, RoomId};
use std::time::SystemTime;
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct RoomPolicy {
    /// Locked rooms admit only joins presenting this code.
    pub access_code: Option<String>,
    pub max_participants: Option<usize>,
    pub expires_at: Option<SystemTime>,
}

impl RoomPolicy {
    pub fn is_expired(&self, now: SystemTime) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-memory stand-in for the room metadata store.
#[derive(Debug, Default)]
pub struct RoomDirectory {
    rooms: DashMap<RoomId, RoomPolicy>,
    /// Reject rooms that were never registered.
    strict: bool,
    default_capacity: Option<usize>,
}

impl RoomDirectory {
    pub fn new(strict: bool, default_capacity: Option<usize>) -> Self {
        Self {
            rooms: DashMap::new(),
            strict,
            default_capacity,
        }
    }

    /// Directory holding every room the relay was started with.
    pub fn from_config(config: &RelayConfig) -> Self {
        let directory = Self::new(config.strict_rooms, config.room_capacity);
        let now = SystemTime::now();
        for spec in &config.rooms {
            directory.register(spec.room_id.clone(), spec.policy(now));
        }
        info!(
            "Room directory: {} registered rooms, strict={}",
            config.rooms.len(),
            config.strict_rooms
        );
        directory
    }

    pub fn register(&self, room_id: RoomId, policy: RoomPolicy) {
        self.rooms.insert(room_id, policy);
    }

    pub fn unregister(&self, room_id: &RoomId) -> Option<RoomPolicy> {
        self.rooms.remove(room_id).map(|(_, policy)| policy)
    }

    fn check(&self, request: &JoinRequest, now: SystemTime) -> Result<Admission, JoinRejection> {
        let Some(policy) = self.rooms.get(&request.room_id) else {
            if self.strict {
                return Err(JoinRejection::NotFound);
            }
            return Ok(Admission {
                capacity: self.default_capacity,
            });
        };

        if policy.is_expired(now) {
            return Err(JoinRejection::Expired);
        }

        if let Some(code) = &policy.access_code {
            if request.access_code.as_deref() != Some(code.as_str()) {
                return Err(JoinRejection::AccessDenied);
            }
        }

        Ok(Admission {
            capacity: policy.max_participants.or(self.default_capacity),
        })
    }
}

#[async_trait]
impl RoomGate for RoomDirectory {
    async fn admit(&self, request: &JoinRequest) -> Result<Admission, JoinRejection> {
        let verdict = self.check(request, SystemTime::now());
        if let Err(reason) = &verdict {
            debug!(
                "Room {} refused session {}: {}",
                request.room_id, request.session_id, reason
            );
        }
        verdict
    }
}
