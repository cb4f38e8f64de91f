use peerdrop_core::{ClientMessage, RoomId, ServerMessage, UserId};

use crate::integration::init_tracing;
use crate::utils::{SILENCE_MS, join_room, spawn_relay};

#[tokio::test]
async fn test_chat_reaches_other_members_only() {
    init_tracing();

    let relay = spawn_relay().await.expect("Failed to start relay");

    let (mut a, _) = join_room(&relay, "r1").await.expect("join a");
    let (mut b, _) = join_room(&relay, "r1").await.expect("join b");
    let (mut outsider, _) = join_room(&relay, "r2").await.expect("join outsider");

    a.send(&ClientMessage::ChatMessage {
        room_id: RoomId::from("r1"),
        message: "hello".into(),
        user_id: Some(UserId::from("alice")),
    })
    .await
    .unwrap();

    let msg = b
        .recv_until(|m| matches!(m, ServerMessage::ChatMessage { .. }))
        .await
        .expect("chat at b");
    assert_eq!(
        msg,
        ServerMessage::ChatMessage {
            room_id: RoomId::from("r1"),
            from_session_id: a.session_id,
            message: "hello".into(),
            user_id: Some(UserId::from("alice")),
        }
    );

    // a only ever hears about b joining.
    let echo = a.recv_timeout(SILENCE_MS).await.unwrap();
    assert!(matches!(echo, Some(ServerMessage::PeerJoined { .. })));
    assert!(a.recv_timeout(SILENCE_MS).await.unwrap().is_none());
    assert!(outsider.recv_timeout(SILENCE_MS).await.unwrap().is_none());
}
