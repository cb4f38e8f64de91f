use anyhow::{Context, Result, bail};
use peerdrop_client::{
    ClientConfig, ConnectionHandle, ConnectionManager, ManagerEvent, PeerState, SignalingClient,
};
use peerdrop_core::{ClientMessage, RoomId, ServerMessage, SessionId};
use std::time::Duration;
use tokio::sync::mpsc;

/// Timeout for connection establishment (ms).
pub const CONNECTION_TIMEOUT_MS: u64 = 15000;

/// One client session: relay connection, joined room, running manager.
pub struct TestPeer {
    pub session_id: SessionId,
    pub handle: ConnectionHandle,
    pub events: mpsc::UnboundedReceiver<ManagerEvent>,
    /// Relay messages the harness saw, for assertions.
    pub relay_log: mpsc::UnboundedReceiver<ServerMessage>,
}

impl TestPeer {
    pub async fn join(relay_url: &str, room: &str, config: ClientConfig) -> Result<Self> {
        let mut signaling = SignalingClient::connect(relay_url).await?;
        let session_id = signaling.session_id();
        let room_id = RoomId::from(room);

        signaling.send(ClientMessage::join(room_id.clone(), None))?;
        loop {
            match signaling.recv().await {
                Some(ServerMessage::RoomParticipants { .. }) => break,
                Some(_) => continue,
                None => bail!("Relay closed before participants"),
            }
        }

        let config = config.with_ice_servers(signaling.ice_servers().to_vec());
        let (manager, handle, events) =
            ConnectionManager::new(session_id, room_id, config, signaling.sender());
        tokio::spawn(manager.run());

        let (log_tx, relay_log) = mpsc::unbounded_channel();
        let pump = handle.clone();
        tokio::spawn(async move {
            while let Some(msg) = signaling.recv().await {
                let _ = log_tx.send(msg.clone());
                if pump.handle_signal(msg).await.is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            session_id,
            handle,
            events,
            relay_log,
        })
    }

    /// Waits for an event matching `pred`, skipping the rest.
    pub async fn wait_for<F>(&mut self, timeout_ms: u64, mut pred: F) -> Result<ManagerEvent>
    where
        F: FnMut(&ManagerEvent) -> bool,
    {
        let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            let event = tokio::time::timeout_at(deadline, self.events.recv())
                .await
                .context("Timed out waiting for manager event")?
                .context("Manager stopped")?;
            if pred(&event) {
                return Ok(event);
            }
        }
    }

    pub async fn wait_for_state(&mut self, peer: SessionId, state: PeerState) -> Result<()> {
        self.wait_for(CONNECTION_TIMEOUT_MS, |event| {
            matches!(event, ManagerEvent::StateChanged { peer: p, state: s } if *p == peer && *s == state)
        })
        .await
        .with_context(|| format!("Peer {} never reached {}", peer, state))?;
        Ok(())
    }
}
