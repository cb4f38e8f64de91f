use crate::config::ClientConfig;
use crate::connection::peer_connection::{PeerConnection, PeerEvent, PeerEventKind};
use crate::connection::{PeerState, PeerTransition};
use crate::error::ConnectionError;
use crate::transfer::{Frame, RtcFrameChannel};
use peerdrop_core::{ClientMessage, RoomId, ServerMessage, SessionId};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;

/// What the manager reports to its owner.
pub enum ManagerEvent {
    StateChanged { peer: SessionId, state: PeerState },
    ChannelReady { peer: SessionId, channel: Arc<RtcFrameChannel> },
    ChannelClosed { peer: SessionId },
    Frame { peer: SessionId, frame: Frame },
}

enum ManagerCommand {
    Connect(SessionId),
    Signal(ServerMessage),
    Close(SessionId),
    CloseAll,
}

/// Cheap, cloneable way to drive a running [`ConnectionManager`].
#[derive(Clone)]
pub struct ConnectionHandle {
    cmd_tx: mpsc::Sender<ManagerCommand>,
}

impl ConnectionHandle {
    /// Start the initiator handshake toward `peer`.
    pub async fn connect(&self, peer: SessionId) -> Result<(), ConnectionError> {
        self.send(ManagerCommand::Connect(peer)).await
    }

    /// Feed a message received from the relay.
    pub async fn handle_signal(&self, msg: ServerMessage) -> Result<(), ConnectionError> {
        self.send(ManagerCommand::Signal(msg)).await
    }

    pub async fn close(&self, peer: SessionId) -> Result<(), ConnectionError> {
        self.send(ManagerCommand::Close(peer)).await
    }

    pub async fn close_all(&self) -> Result<(), ConnectionError> {
        self.send(ManagerCommand::CloseAll).await
    }

    async fn send(&self, cmd: ManagerCommand) -> Result<(), ConnectionError> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| ConnectionError::ManagerStopped)
    }
}

struct PeerRecord {
    state: PeerState,
    transport_state: RTCPeerConnectionState,
    connection: PeerConnection,
    /// We sent the offer.
    initiator: bool,
    timer: Option<JoinHandle<()>>,
}

impl PeerRecord {
    fn new(connection: PeerConnection, initiator: bool) -> Self {
        Self {
            state: PeerState::New,
            transport_state: RTCPeerConnectionState::New,
            connection,
            initiator,
            timer: None,
        }
    }

    fn stop_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

/// Owns every peer connection of one client session and drives their state
/// machines from relay messages and webrtc callbacks.
pub struct ConnectionManager {
    local: SessionId,
    room_id: RoomId,
    config: ClientConfig,
    peers: HashMap<SessionId, PeerRecord>,
    next_generation: u64,
    command_rx: mpsc::Receiver<ManagerCommand>,
    peer_rx: mpsc::Receiver<PeerEvent>,
    peer_tx: mpsc::Sender<PeerEvent>,
    /// Outbound relay messages.
    signal_tx: mpsc::UnboundedSender<ClientMessage>,
    event_tx: mpsc::UnboundedSender<ManagerEvent>,
}

impl ConnectionManager {
    pub fn new(
        local: SessionId,
        room_id: RoomId,
        config: ClientConfig,
        signal_tx: mpsc::UnboundedSender<ClientMessage>,
    ) -> (
        Self,
        ConnectionHandle,
        mpsc::UnboundedReceiver<ManagerEvent>,
    ) {
        let (cmd_tx, command_rx) = mpsc::channel(64);
        let (peer_tx, peer_rx) = mpsc::channel(256);
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let manager = Self {
            local,
            room_id,
            config,
            peers: HashMap::new(),
            next_generation: 0,
            command_rx,
            peer_rx,
            peer_tx,
            signal_tx,
            event_tx,
        };

        (manager, ConnectionHandle { cmd_tx }, event_rx)
    }

    /// Event loop. Returns once every [`ConnectionHandle`] is dropped; all
    /// peers are closed on the way out.
    pub async fn run(mut self) {
        info!("Connection manager for {} started", self.local);

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(cmd) => self.handle_command(cmd).await,
                        None => {
                            debug!("All connection handles dropped");
                            break;
                        }
                    }
                }

                evt = self.peer_rx.recv() => {
                    match evt {
                        Some(evt) => self.handle_peer_event(evt).await,
                        None => {
                            warn!("Peer event channel closed unexpectedly");
                            break;
                        }
                    }
                }
            }
        }

        self.close_all().await;
        info!("Connection manager for {} finished", self.local);
    }

    async fn handle_command(&mut self, cmd: ManagerCommand) {
        match cmd {
            ManagerCommand::Connect(peer) => self.connect(peer).await,
            ManagerCommand::Signal(msg) => self.handle_signal(msg).await,
            ManagerCommand::Close(peer) => self.close(peer).await,
            ManagerCommand::CloseAll => self.close_all().await,
        }
    }

    async fn connect(&mut self, peer: SessionId) {
        if peer == self.local {
            debug!("Refusing to connect to ourselves");
            return;
        }
        if let Some(record) = self.peers.get(&peer) {
            if !record.state.is_terminal() {
                debug!("Already {} with {}", record.state, peer);
                return;
            }
        }
        self.discard(peer).await;

        let Some(connection) = self.build_connection(peer).await else {
            return;
        };
        let generation = connection.generation();

        let offer = connection.create_offer().await;
        self.peers.insert(peer, PeerRecord::new(connection, true));

        match offer {
            Ok(sdp) => {
                self.transition(peer, PeerTransition::OfferCreated).await;
                self.signal(ClientMessage::offer(self.room_id.clone(), peer, sdp));
                self.start_timer(peer, generation);
            }
            Err(e) => {
                error!("Failed to create offer for {}: {:?}", peer, e);
                self.transition(peer, PeerTransition::Fail).await;
            }
        }
    }

    async fn handle_signal(&mut self, msg: ServerMessage) {
        match msg {
            ServerMessage::Offer {
                room_id,
                from_session_id,
                sdp,
            } if room_id == self.room_id => self.on_offer(from_session_id, sdp).await,
            ServerMessage::Answer {
                room_id,
                from_session_id,
                sdp,
            } if room_id == self.room_id => self.on_answer(from_session_id, sdp).await,
            ServerMessage::Candidate {
                room_id,
                from_session_id,
                candidate,
            } if room_id == self.room_id => self.on_candidate(from_session_id, candidate).await,
            ServerMessage::PeerLeft {
                room_id,
                session_id,
            } if room_id == self.room_id => {
                if self.peers.contains_key(&session_id) {
                    info!("Peer {} left the room", session_id);
                    self.close(session_id).await;
                }
            }
            other => debug!("Connection manager ignores {:?}", other),
        }
    }

    async fn on_offer(&mut self, peer: SessionId, sdp: String) {
        if let Some(record) = self.peers.get(&peer) {
            // Both sides offered at once: the lower session id keeps its offer.
            if record.initiator && record.state == PeerState::Connecting && self.local < peer {
                debug!("Ignoring colliding offer from {}", peer);
                return;
            }
            info!("Replacing connection to {} with a new offer", peer);
        }
        self.discard(peer).await;

        let Some(mut connection) = self.build_connection(peer).await else {
            return;
        };
        let generation = connection.generation();

        let answer = connection.accept_offer(sdp).await;
        self.peers.insert(peer, PeerRecord::new(connection, false));

        match answer {
            Ok(sdp) => {
                self.transition(peer, PeerTransition::OfferReceived).await;
                self.signal(ClientMessage::answer(self.room_id.clone(), peer, sdp));
                self.start_timer(peer, generation);
            }
            Err(e) => {
                error!("Failed to answer offer from {}: {:?}", peer, e);
                self.transition(peer, PeerTransition::Fail).await;
            }
        }
    }

    async fn on_answer(&mut self, peer: SessionId, sdp: String) {
        let Some(record) = self.peers.get_mut(&peer) else {
            debug!("Dropping answer from unknown peer {}", peer);
            return;
        };
        if record.state != PeerState::Connecting || !record.initiator {
            debug!("Dropping unexpected answer from {} ({})", peer, record.state);
            return;
        }

        if let Err(e) = record.connection.apply_answer(sdp).await {
            error!("Failed to apply answer from {}: {:?}", peer, e);
            self.transition(peer, PeerTransition::Fail).await;
        }
    }

    async fn on_candidate(&mut self, peer: SessionId, candidate: Value) {
        let Some(record) = self.peers.get_mut(&peer) else {
            debug!("Dropping candidate from unknown peer {}", peer);
            return;
        };
        if record.state.is_terminal() {
            return;
        }

        if let Err(e) = record.connection.add_candidate(candidate).await {
            warn!("Failed to add ICE candidate from {}: {:?}", peer, e);
        }
    }

    async fn handle_peer_event(&mut self, event: PeerEvent) {
        let PeerEvent {
            peer,
            generation,
            kind,
        } = event;

        let Some(record) = self.peers.get_mut(&peer) else {
            return;
        };
        if record.connection.generation() != generation {
            debug!("Dropping stale event for {}", peer);
            return;
        }

        match kind {
            PeerEventKind::ChannelOpen { channel, closed } => {
                if self.transition(peer, PeerTransition::ChannelOpened).await {
                    let channel = Arc::new(RtcFrameChannel::new(channel, closed));
                    self.emit(ManagerEvent::ChannelReady { peer, channel });
                }
            }
            PeerEventKind::ChannelClosed => {
                self.emit(ManagerEvent::ChannelClosed { peer });
                self.close(peer).await;
            }
            PeerEventKind::Frame(frame) => self.emit(ManagerEvent::Frame { peer, frame }),
            PeerEventKind::CandidateGenerated(candidate) => {
                self.signal(ClientMessage::candidate(
                    self.room_id.clone(),
                    peer,
                    candidate,
                ));
            }
            PeerEventKind::TransportState(state) => {
                record.transport_state = state;
                match state {
                    RTCPeerConnectionState::Failed => {
                        warn!("Transport to {} failed", peer);
                        self.transition(peer, PeerTransition::Fail).await;
                    }
                    RTCPeerConnectionState::Closed => {
                        self.transition(peer, PeerTransition::Close).await;
                    }
                    _ => {}
                }
            }
            PeerEventKind::HandshakeTimeout => {
                if record.state == PeerState::Connecting {
                    warn!(
                        "Handshake with {} timed out after {:?} (transport {})",
                        peer, self.config.handshake_timeout, record.transport_state
                    );
                    self.transition(peer, PeerTransition::Fail).await;
                }
            }
        }
    }

    /// Applies `transition` to `peer`'s record. Returns whether it was legal.
    async fn transition(&mut self, peer: SessionId, transition: PeerTransition) -> bool {
        let Some(record) = self.peers.get_mut(&peer) else {
            return false;
        };

        let next = match record.state.apply(transition) {
            Ok(next) => next,
            Err(e) => {
                debug!("Peer {}: {}", peer, e);
                return false;
            }
        };

        debug!("Peer {}: {} -> {}", peer, record.state, next);
        record.state = next;

        if next != PeerState::Connecting {
            record.stop_timer();
        }
        if next.is_terminal() {
            if let Err(e) = record.connection.close().await {
                debug!("Closing connection to {}: {:?}", peer, e);
            }
        }

        self.emit(ManagerEvent::StateChanged { peer, state: next });
        true
    }

    async fn close(&mut self, peer: SessionId) {
        self.transition(peer, PeerTransition::Close).await;
        self.peers.remove(&peer);
    }

    async fn close_all(&mut self) {
        let peers: Vec<SessionId> = self.peers.keys().copied().collect();
        for peer in peers {
            self.close(peer).await;
        }
    }

    /// Drops a record without reporting; used before replacing it.
    async fn discard(&mut self, peer: SessionId) {
        if let Some(mut record) = self.peers.remove(&peer) {
            record.stop_timer();
            if !record.state.is_terminal() {
                let _ = record.connection.close().await;
            }
        }
    }

    async fn build_connection(&mut self, peer: SessionId) -> Option<PeerConnection> {
        self.next_generation += 1;
        let res = PeerConnection::new(
            peer,
            self.next_generation,
            &self.config.ice_servers,
            self.peer_tx.clone(),
        )
        .await;

        match res {
            Ok(connection) => Some(connection),
            Err(e) => {
                error!("Failed to set up connection to {}: {:?}", peer, e);
                self.emit(ManagerEvent::StateChanged {
                    peer,
                    state: PeerState::Failed,
                });
                None
            }
        }
    }

    fn start_timer(&mut self, peer: SessionId, generation: u64) {
        let Some(record) = self.peers.get_mut(&peer) else {
            return;
        };

        let tx = self.peer_tx.clone();
        let timeout = self.config.handshake_timeout;
        record.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let _ = tx
                .send(PeerEvent {
                    peer,
                    generation,
                    kind: PeerEventKind::HandshakeTimeout,
                })
                .await;
        }));
    }

    fn signal(&self, msg: ClientMessage) {
        if self.signal_tx.send(msg).is_err() {
            warn!("Signaling channel closed, message dropped");
        }
    }

    fn emit(&self, event: ManagerEvent) {
        let _ = self.event_tx.send(event);
    }
}
