mod frame;
mod frame_channel;
mod receiver;
mod sender;

pub use frame::*;
pub use frame_channel::*;
pub use receiver::*;
pub use sender::*;
