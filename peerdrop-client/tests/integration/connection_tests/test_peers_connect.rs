use peerdrop_client::{ClientConfig, ManagerEvent, PeerState};
use peerdrop_core::{RoomId, ServerMessage};

use crate::integration::init_tracing;
use crate::utils::{CONNECTION_TIMEOUT_MS, TestPeer, spawn_relay};

fn loopback_config() -> ClientConfig {
    ClientConfig {
        ice_servers: Vec::new(),
        ..Default::default()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_two_peers_open_file_channel() {
    init_tracing();

    let relay = spawn_relay().await.expect("Failed to start relay");
    let mut a = TestPeer::join(&relay, "r1", loopback_config()).await.expect("a joins");
    let mut b = TestPeer::join(&relay, "r1", loopback_config()).await.expect("b joins");

    a.handle.connect(b.session_id).await.unwrap();

    a.wait_for_state(b.session_id, PeerState::Connecting).await.unwrap();
    a.wait_for_state(b.session_id, PeerState::Connected).await.unwrap();
    b.wait_for_state(a.session_id, PeerState::Connected).await.unwrap();

    // b learnt about a through the relay before any offer arrived.
    let mut saw_offer = false;
    while let Ok(msg) = b.relay_log.try_recv() {
        if matches!(msg, ServerMessage::Offer { from_session_id, .. } if from_session_id == a.session_id) {
            saw_offer = true;
        }
    }
    assert!(saw_offer);

    a.handle.close_all().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_peer_left_closes_the_connection() {
    init_tracing();

    let relay = spawn_relay().await.expect("Failed to start relay");
    let mut a = TestPeer::join(&relay, "r1", loopback_config()).await.expect("a joins");
    let b = TestPeer::join(&relay, "r1", loopback_config()).await.expect("b joins");

    a.handle.connect(b.session_id).await.unwrap();
    a.wait_for(CONNECTION_TIMEOUT_MS, |e| matches!(e, ManagerEvent::ChannelReady { .. }))
        .await
        .expect("channel ready");

    a.handle
        .handle_signal(ServerMessage::PeerLeft {
            room_id: RoomId::from("r1"),
            session_id: b.session_id,
        })
        .await
        .unwrap();

    a.wait_for_state(b.session_id, PeerState::Closed).await.unwrap();
}
