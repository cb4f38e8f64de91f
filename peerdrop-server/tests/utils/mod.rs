pub mod mock_signaling;
pub mod test_client;

pub use mock_signaling::*;
pub use signal_helpers::*;
pub use test_client::*;
