pub mod activity;
pub mod config;
pub mod connection;
pub mod error;
pub mod signaling;
pub mod transfer;

pub use activity::*;
pub use config::*;
pub use connection::*;
pub use error::*;
pub use signaling::*;
pub use transfer::*;
