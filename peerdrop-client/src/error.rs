use crate::connection::{PeerState, PeerTransition};
use peerdrop_core::ProtocolError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("data channel closed before the transfer finished")]
    ChannelClosed,

    #[error("failed to send frame: {0}")]
    Send(String),

    #[error("transfer already finished")]
    AlreadyFinished,

    #[error("metadata declares {declared} bytes but {actual} were supplied")]
    SizeMismatch { declared: u64, actual: u64 },
}

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("peer state {from:?} does not allow {transition:?}")]
    InvalidTransition {
        from: PeerState,
        transition: PeerTransition,
    },

    #[error("connection manager has stopped")]
    ManagerStopped,

    #[error(transparent)]
    Rtc(#[from] anyhow::Error),
}
