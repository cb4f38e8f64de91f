use crate::gate::RoomPolicy;
use peerdrop_core::utils::{DEFAULT_STUN_ADDR, DEFAULT_STUN_ADDR_2};
use peerdrop_core::{IceServerConfig, RoomId};
use std::net::{AddrParseError, SocketAddr};
use std::num::ParseIntError;
use std::str::FromStr;
use std::time::{Duration, SystemTime};
use thiserror::Error;

pub const ENV_BIND: &str = "PEERDROP_BIND";
pub const ENV_ICE_SERVERS: &str = "PEERDROP_ICE_SERVERS";
pub const ENV_TURN_USERNAME: &str = "PEERDROP_TURN_USERNAME";
pub const ENV_TURN_CREDENTIAL: &str = "PEERDROP_TURN_CREDENTIAL";
pub const ENV_ROOM_CAPACITY: &str = "PEERDROP_ROOM_CAPACITY";
pub const ENV_STRICT_ROOMS: &str = "PEERDROP_STRICT_ROOMS";
pub const ENV_ROOMS: &str = "PEERDROP_ROOMS";

pub const DEFAULT_BIND: &str = "0.0.0.0:3000";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid bind address {value:?}: {source}")]
    InvalidBind {
        value: String,
        source: AddrParseError,
    },

    #[error("invalid room capacity {value:?}: {source}")]
    InvalidCapacity {
        value: String,
        source: ParseIntError,
    },

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("invalid value {value:?} for {key}, expected true or false")]
    InvalidFlag { key: &'static str, value: String },

    #[error("invalid room {value:?}: {reason}")]
    InvalidRoom { value: String, reason: String },
}

/// A room registered at startup, written `ID[:CODE[:MAX[:TTL_SECS]]]`.
/// An empty `CODE` leaves the room unlocked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSpec {
    pub room_id: RoomId,
    pub access_code: Option<String>,
    pub max_participants: Option<usize>,
    pub ttl: Option<Duration>,
}

impl RoomSpec {
    pub fn policy(&self, now: SystemTime) -> RoomPolicy {
        RoomPolicy {
            access_code: self.access_code.clone(),
            max_participants: self.max_participants,
            expires_at: self.ttl.map(|ttl| now + ttl),
        }
    }
}

impl FromStr for RoomSpec {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ConfigError::InvalidRoom {
            value: value.to_owned(),
            reason: reason.to_owned(),
        };

        let mut parts = value.trim().splitn(4, ':');
        let room_id = parts.next().unwrap_or_default();
        if room_id.is_empty() {
            return Err(invalid("missing room id"));
        }

        let access_code = parts
            .next()
            .filter(|code| !code.is_empty())
            .map(str::to_owned);
        let max_participants = parts
            .next()
            .filter(|max| !max.is_empty())
            .map(|max| max.parse::<usize>())
            .transpose()
            .map_err(|e| invalid(&format!("bad member limit: {e}")))?;
        let ttl = parts
            .next()
            .map(|secs| secs.parse::<u64>())
            .transpose()
            .map_err(|e| invalid(&format!("bad ttl: {e}")))?
            .map(Duration::from_secs);

        Ok(Self {
            room_id: RoomId::from(room_id),
            access_code,
            max_participants,
            ttl,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    pub bind: SocketAddr,
    /// Handed to every client in `welcome`.
    pub ice_servers: Vec<IceServerConfig>,
    /// Member limit for rooms without their own policy.
    pub room_capacity: Option<usize>,
    /// Refuse joins to rooms that were never registered.
    pub strict_rooms: bool,
    /// Rooms registered in the room directory at startup.
    pub rooms: Vec<RoomSpec>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 3000)),
            ice_servers: vec![
                IceServerConfig::stun(DEFAULT_STUN_ADDR),
                IceServerConfig::stun(DEFAULT_STUN_ADDR_2),
            ],
            room_capacity: None,
            strict_rooms: false,
            rooms: Vec::new(),
        }
    }
}

impl RelayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for the `PEERDROP_*`
    /// keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_BIND) {
            config.bind = parse_bind(&value)?;
        }

        if let Some(value) = lookup(ENV_ROOM_CAPACITY) {
            let capacity =
                value
                    .trim()
                    .parse::<usize>()
                    .map_err(|source| ConfigError::InvalidCapacity {
                        value: value.clone(),
                        source,
                    })?;
            config.room_capacity = Some(capacity);
        }

        if let Some(value) = lookup(ENV_STRICT_ROOMS) {
            config.strict_rooms = parse_flag(ENV_STRICT_ROOMS, &value)?;
        }

        if let Some(value) = lookup(ENV_ROOMS) {
            config.rooms = value
                .split(',')
                .map(str::trim)
                .filter(|spec| !spec.is_empty())
                .map(RoomSpec::from_str)
                .collect::<Result<_, _>>()?;
        }

        if let Some(value) = lookup(ENV_ICE_SERVERS) {
            let urls: Vec<String> = value
                .split(',')
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(str::to_owned)
                .collect();
            if urls.is_empty() {
                return Err(ConfigError::Empty(ENV_ICE_SERVERS));
            }
            config.ice_servers = ice_servers_from_urls(
                urls,
                lookup(ENV_TURN_USERNAME),
                lookup(ENV_TURN_CREDENTIAL),
            );
        }

        Ok(config)
    }
}

pub fn parse_bind(value: &str) -> Result<SocketAddr, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|source| ConfigError::InvalidBind {
            value: value.to_owned(),
            source,
        })
}

fn parse_flag(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            key,
            value: value.to_owned(),
        }),
    }
}

/// One entry per URL; TURN entries carry the shared credentials.
pub fn ice_servers_from_urls(
    urls: Vec<String>,
    username: Option<String>,
    credential: Option<String>,
) -> Vec<IceServerConfig> {
    urls.into_iter()
        .map(|url| {
            if url.starts_with("turn:") || url.starts_with("turns:") {
                IceServerConfig {
                    urls: vec![url],
                    username: username.clone(),
                    credential: credential.clone(),
                }
            } else {
                IceServerConfig::stun(url)
            }
        })
        .collect()
}
