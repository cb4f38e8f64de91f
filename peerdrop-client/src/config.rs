use peerdrop_core::IceServerConfig;
use peerdrop_core::utils::{DEFAULT_CHUNK_SIZE, DEFAULT_STUN_ADDR, DEFAULT_STUN_ADDR_2};
use std::time::Duration;

pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_FILE_SIZE: u64 = 2 * 1024 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Replaced by whatever the relay announces in `welcome`, if non-empty.
    pub ice_servers: Vec<IceServerConfig>,
    pub chunk_size: u32,
    /// How long a peer may stay `connecting` before it is marked failed.
    pub handshake_timeout: Duration,
    /// Largest declared file size a receiver will buffer.
    pub max_file_size: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![
                IceServerConfig::stun(DEFAULT_STUN_ADDR),
                IceServerConfig::stun(DEFAULT_STUN_ADDR_2),
            ],
            chunk_size: DEFAULT_CHUNK_SIZE,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl ClientConfig {
    pub fn with_ice_servers(mut self, ice_servers: Vec<IceServerConfig>) -> Self {
        if !ice_servers.is_empty() {
            self.ice_servers = ice_servers;
        }
        self
    }
}
