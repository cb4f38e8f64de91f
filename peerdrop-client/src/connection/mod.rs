mod manager;
mod peer_connection;
mod peer_state;

pub use manager::*;
pub use peer_state::*;
