mod room_directory;
mod room_gate;

pub use room_directory::*;
pub use room_gate::*;
