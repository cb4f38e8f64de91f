use crate::error::ConnectionError;
use std::fmt;

/// Lifecycle of the connection to one remote peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeerState {
    New,
    Connecting,
    Connected,
    Failed,
    Closed,
}

/// Named edges of the peer state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerTransition {
    /// We built and sent the offer.
    OfferCreated,
    /// The remote offer was applied and answered.
    OfferReceived,
    /// The data channel reported open.
    ChannelOpened,
    /// Negotiation, ICE or the handshake timer gave up.
    Fail,
    /// Local teardown or the remote peer left.
    Close,
}

impl PeerState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed | Self::Closed)
    }

    pub fn apply(self, transition: PeerTransition) -> Result<PeerState, ConnectionError> {
        use PeerState::*;
        use PeerTransition::*;

        let next = match (self, transition) {
            (New, OfferCreated | OfferReceived) => Connecting,
            (Connecting, ChannelOpened) => Connected,
            (New | Connecting | Connected, Fail) => Failed,
            (New | Connecting | Connected, Close) => Closed,
            (from, transition) => {
                return Err(ConnectionError::InvalidTransition { from, transition });
            }
        };
        Ok(next)
    }
}

impl fmt::Display for PeerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::New => "new",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Failed => "failed",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}
