use peerdrop_client::{ClientConfig, PeerState};

use crate::integration::init_tracing;
use crate::utils::{TestPeer, spawn_relay};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_both_sides_offer_at_once() {
    init_tracing();

    let config = ClientConfig {
        ice_servers: Vec::new(),
        ..Default::default()
    };
    let relay = spawn_relay().await.expect("Failed to start relay");
    let mut a = TestPeer::join(&relay, "r1", config.clone()).await.expect("a joins");
    let mut b = TestPeer::join(&relay, "r1", config).await.expect("b joins");

    let (ra, rb) = tokio::join!(
        a.handle.connect(b.session_id),
        b.handle.connect(a.session_id)
    );
    ra.unwrap();
    rb.unwrap();

    a.wait_for_state(b.session_id, PeerState::Connected).await.unwrap();
    b.wait_for_state(a.session_id, PeerState::Connected).await.unwrap();

    a.handle.close_all().await.unwrap();
}
