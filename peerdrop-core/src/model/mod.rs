mod error;
mod peer;
mod room;
mod signaling;
mod transfer;

pub use error::ProtocolError;
pub use peer::{PeerIdentity, SessionId, UserId};
pub use room::RoomId;
pub use signaling::{
    ClientMessage, IceServerConfig, JoinRejection, ServerMessage, SignalKind, SignalPayload,
};
pub use transfer::{FileMetadata, FileTransfer, TransferId, TransferMessage, TransferStatus};
