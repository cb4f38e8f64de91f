pub mod peer_harness;
pub mod relay;

pub use peer_harness::*;
pub use relay::*;
