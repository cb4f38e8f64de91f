use peerdrop_core::{ClientMessage, ServerMessage};

use crate::integration::init_tracing;
use crate::utils::{TestClient, spawn_relay};

#[tokio::test]
async fn test_malformed_frame_gets_error_reply() {
    init_tracing();

    let relay = spawn_relay().await.expect("Failed to start relay");
    let mut client = TestClient::connect(relay.addr).await.expect("connect");

    client
        .send_raw(r#"{"type":"teleport","roomId":"r1"}"#.into())
        .await
        .unwrap();

    let msg = client.recv().await.expect("reply");
    assert!(matches!(msg, ServerMessage::Error { .. }), "got {:?}", msg);
}

#[tokio::test]
async fn test_connection_survives_bad_frames() {
    init_tracing();

    let relay = spawn_relay().await.expect("Failed to start relay");
    let mut client = TestClient::connect(relay.addr).await.expect("connect");

    for junk in ["not json", "{}", r#"{"type":"offer"}"#] {
        client.send_raw(junk.into()).await.unwrap();
        let msg = client.recv().await.expect("reply");
        assert!(matches!(msg, ServerMessage::Error { .. }));
    }

    client.send(&ClientMessage::join("r1", None)).await.unwrap();
    let msg = client.recv().await.expect("participants");
    assert!(matches!(msg, ServerMessage::RoomParticipants { .. }));
}

#[tokio::test]
async fn test_blank_room_id_is_refused() {
    init_tracing();

    let relay = spawn_relay().await.expect("Failed to start relay");
    let mut client = TestClient::connect(relay.addr).await.expect("connect");

    client
        .send_raw(r#"{"type":"join","roomId":""}"#.into())
        .await
        .unwrap();

    let msg = client.recv().await.expect("reply");
    assert!(matches!(msg, ServerMessage::Error { .. }), "got {:?}", msg);
    assert_eq!(relay.state.relay.registry().room_count(), 0);
}
