pub mod config;
pub mod gate;
pub mod room;
pub mod server;
pub mod signaling;

pub use config::*;
pub use gate::*;
pub use room::*;
pub use server::*;
pub use signaling::*;
