pub use peerdrop_core::model::{RoomId, SessionId};

pub mod model {
    pub use peerdrop_core::model::*;
    pub use peerdrop_core::utils::*;
}

#[cfg(feature = "server")]
pub mod server {
    pub use peerdrop_server::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use peerdrop_client::*;
}
