use peerdrop_core::{ClientMessage, RoomId, SessionId};
use peerdrop_server::{OpenGate, SignalingRelay};
use serde_json::json;
use std::sync::Arc;

use crate::integration::init_tracing;
use crate::utils::{MockSignalingOutput, SILENCE_MS, join_room, spawn_relay};

fn relay_with_mock() -> (SignalingRelay, MockSignalingOutput) {
    let output = MockSignalingOutput::new_stored_only();
    let relay = SignalingRelay::new(
        Arc::new(output.clone()),
        Arc::new(OpenGate::default()),
        Vec::new(),
    );
    (relay, output)
}

#[tokio::test]
async fn test_cross_room_relay_is_dropped() {
    init_tracing();

    let relay = spawn_relay().await.expect("Failed to start relay");

    let (mut a, _) = join_room(&relay, "r1").await.expect("join a");
    let (mut b, _) = join_room(&relay, "r2").await.expect("join b");

    // a names its own room, b is elsewhere.
    a.send(&ClientMessage::offer(RoomId::from("r1"), b.session_id, "x".into()))
        .await
        .unwrap();
    // a names b's room, but a is not in it.
    a.send(&ClientMessage::offer(RoomId::from("r2"), b.session_id, "y".into()))
        .await
        .unwrap();

    assert!(b.recv_timeout(SILENCE_MS).await.unwrap().is_none());
    assert!(a.recv_timeout(SILENCE_MS).await.unwrap().is_none());
}

#[tokio::test]
async fn test_non_member_relay_sends_nothing() {
    init_tracing();

    let (relay, output) = relay_with_mock();
    let r1 = RoomId::from("r1");
    let (a, ghost) = (SessionId::new(), SessionId::new());

    relay.join(a, r1.clone(), None, None).await;
    output.clear().await;

    relay
        .dispatch(a, ClientMessage::candidate(r1.clone(), ghost, json!({})))
        .await;
    relay
        .dispatch(ghost, ClientMessage::offer(r1, a, "v=0".into()))
        .await;

    assert_eq!(output.total_sent().await, 0);
}

#[tokio::test]
async fn test_failed_delivery_does_not_affect_others() {
    init_tracing();

    let (relay, output) = relay_with_mock();
    let r1 = RoomId::from("r1");
    let (a, b, c) = (SessionId::new(), SessionId::new(), SessionId::new());

    for session in [a, b, c] {
        relay.join(session, r1.clone(), None, None).await;
    }
    output.mark_gone(b).await;
    output.clear().await;

    relay
        .broadcast_chat(a, r1.clone(), "still here?".into(), None)
        .await;

    assert!(output.sent_to(b).await.is_empty());
    assert_eq!(output.sent_to(c).await.len(), 1);
    assert_eq!(relay.registry().member_count(&r1), 3);
}
