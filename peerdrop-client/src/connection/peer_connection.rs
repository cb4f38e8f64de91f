use crate::transfer::Frame;
use anyhow::{Context, Result};
use peerdrop_core::utils::FILE_CHANNEL_LABEL;
use peerdrop_core::{IceServerConfig, SessionId};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::data_channel::RTCDataChannel;
use webrtc::data_channel::data_channel_init::RTCDataChannelInit;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

/// Raised by webrtc callbacks for the manager loop.
pub(crate) struct PeerEvent {
    pub peer: SessionId,
    /// Distinguishes a replaced connection's late callbacks from the live one.
    pub generation: u64,
    pub kind: PeerEventKind,
}

pub(crate) enum PeerEventKind {
    ChannelOpen {
        channel: Arc<RTCDataChannel>,
        closed: watch::Receiver<bool>,
    },
    ChannelClosed,
    Frame(Frame),
    CandidateGenerated(Value),
    TransportState(RTCPeerConnectionState),
    HandshakeTimeout,
}

/// One webrtc-rs peer connection to a remote session, with the `files` data
/// channel wired into the manager's event queue.
pub(crate) struct PeerConnection {
    remote: SessionId,
    generation: u64,
    pc: Arc<RTCPeerConnection>,
    event_tx: mpsc::Sender<PeerEvent>,
    /// Remote candidates that arrived before the remote description.
    pending_candidates: Vec<RTCIceCandidateInit>,
    has_remote_description: bool,
}

impl PeerConnection {
    pub async fn new(
        remote: SessionId,
        generation: u64,
        ice_servers: &[IceServerConfig],
        event_tx: mpsc::Sender<PeerEvent>,
    ) -> Result<Self> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut media_engine)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: ice_servers
                .iter()
                .map(|server| RTCIceServer {
                    urls: server.urls.clone(),
                    username: server.username.clone().unwrap_or_default(),
                    credential: server.credential.clone().unwrap_or_default(),
                })
                .collect(),
            ..Default::default()
        };

        let pc = Arc::new(
            api.new_peer_connection(rtc_config)
                .await
                .context("Failed to create peer connection")?,
        );

        let state_tx = event_tx.clone();
        pc.on_peer_connection_state_change(Box::new(move |state: RTCPeerConnectionState| {
            let tx = state_tx.clone();
            Box::pin(async move {
                info!("Peer connection to {} is {}", remote, state);
                let _ = tx
                    .send(PeerEvent {
                        peer: remote,
                        generation,
                        kind: PeerEventKind::TransportState(state),
                    })
                    .await;
            })
        }));

        let ice_tx = event_tx.clone();
        pc.on_ice_candidate(Box::new(move |candidate: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();
            Box::pin(async move {
                let Some(candidate) = candidate else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let Ok(value) = serde_json::to_value(&init) else {
                    return;
                };
                let _ = tx
                    .send(PeerEvent {
                        peer: remote,
                        generation,
                        kind: PeerEventKind::CandidateGenerated(value),
                    })
                    .await;
            })
        }));

        let dc_tx = event_tx.clone();
        pc.on_data_channel(Box::new(move |dc: Arc<RTCDataChannel>| {
            let tx = dc_tx.clone();
            Box::pin(async move {
                if dc.label() != FILE_CHANNEL_LABEL {
                    debug!("Ignoring data channel '{}' from {}", dc.label(), remote);
                    return;
                }
                debug!("Remote data channel '{}' from {}", dc.label(), remote);
                wire_channel(&dc, remote, generation, tx);
            })
        }));

        Ok(Self {
            remote,
            generation,
            pc,
            event_tx,
            pending_candidates: Vec::new(),
            has_remote_description: false,
        })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Initiator side: opens the ordered `files` channel and returns the
    /// applied local offer.
    pub async fn create_offer(&self) -> Result<String> {
        let init = RTCDataChannelInit {
            ordered: Some(true),
            ..Default::default()
        };
        let dc = self
            .pc
            .create_data_channel(FILE_CHANNEL_LABEL, Some(init))
            .await
            .context("Failed to create data channel")?;
        wire_channel(&dc, self.remote, self.generation, self.event_tx.clone());

        let offer = self
            .pc
            .create_offer(None)
            .await
            .context("Failed to create offer")?;
        self.pc
            .set_local_description(offer.clone())
            .await
            .context("Failed to set local description")?;

        Ok(offer.sdp)
    }

    /// Responder side: applies the remote offer and returns the applied
    /// local answer.
    pub async fn accept_offer(&mut self, sdp: String) -> Result<String> {
        let offer = RTCSessionDescription::offer(sdp)?;
        self.pc
            .set_remote_description(offer)
            .await
            .context("Failed to apply remote offer")?;
        self.has_remote_description = true;

        let answer = self
            .pc
            .create_answer(None)
            .await
            .context("Failed to create answer")?;
        self.pc
            .set_local_description(answer.clone())
            .await
            .context("Failed to set local description")?;

        self.flush_candidates().await?;
        Ok(answer.sdp)
    }

    pub async fn apply_answer(&mut self, sdp: String) -> Result<()> {
        let answer = RTCSessionDescription::answer(sdp)?;
        self.pc
            .set_remote_description(answer)
            .await
            .context("Failed to apply remote answer")?;
        self.has_remote_description = true;
        self.flush_candidates().await
    }

    /// Applies a remote candidate, or holds it until the remote description
    /// is in place.
    pub async fn add_candidate(&mut self, candidate: Value) -> Result<()> {
        let init: RTCIceCandidateInit =
            serde_json::from_value(candidate).context("Failed to parse ICE candidate")?;

        if !self.has_remote_description {
            debug!("Buffering candidate from {}", self.remote);
            self.pending_candidates.push(init);
            return Ok(());
        }

        self.pc
            .add_ice_candidate(init)
            .await
            .context("Failed to add ICE candidate")
    }

    async fn flush_candidates(&mut self) -> Result<()> {
        for init in std::mem::take(&mut self.pending_candidates) {
            self.pc
                .add_ice_candidate(init)
                .await
                .context("Failed to add buffered ICE candidate")?;
        }
        Ok(())
    }

    pub async fn close(&self) -> Result<()> {
        self.pc.close().await?;
        Ok(())
    }
}

fn wire_channel(
    dc: &Arc<RTCDataChannel>,
    remote: SessionId,
    generation: u64,
    tx: mpsc::Sender<PeerEvent>,
) {
    let (closed_tx, closed_rx) = watch::channel(false);
    let closed_tx = Arc::new(closed_tx);

    let open_tx = tx.clone();
    let open_dc = dc.clone();
    dc.on_open(Box::new(move || {
        let tx = open_tx.clone();
        let channel = open_dc.clone();
        let closed = closed_rx.clone();
        Box::pin(async move {
            info!("Data channel to {} is open", remote);
            let _ = tx
                .send(PeerEvent {
                    peer: remote,
                    generation,
                    kind: PeerEventKind::ChannelOpen { channel, closed },
                })
                .await;
        })
    }));

    let close_tx = tx.clone();
    dc.on_close(Box::new(move || {
        let tx = close_tx.clone();
        let closed_tx = closed_tx.clone();
        Box::pin(async move {
            debug!("Data channel to {} closed", remote);
            let _ = closed_tx.send(true);
            let _ = tx
                .send(PeerEvent {
                    peer: remote,
                    generation,
                    kind: PeerEventKind::ChannelClosed,
                })
                .await;
        })
    }));

    dc.on_message(Box::new(move |msg: DataChannelMessage| {
        let tx = tx.clone();
        Box::pin(async move {
            let frame = if msg.is_string {
                Frame::Text(String::from_utf8_lossy(&msg.data).into_owned())
            } else {
                Frame::Binary(msg.data)
            };
            let _ = tx
                .send(PeerEvent {
                    peer: remote,
                    generation,
                    kind: PeerEventKind::Frame(frame),
                })
                .await;
        })
    }));
}
