use peerdrop_core::{ClientMessage, RoomId, ServerMessage};

use crate::integration::init_tracing;
use crate::utils::{SILENCE_MS, join_room, spawn_relay, wait_for_members};

#[tokio::test]
async fn test_participants_include_the_joiner() {
    init_tracing();

    let relay = spawn_relay().await.expect("Failed to start relay");

    let (a, first) = join_room(&relay, "r1").await.expect("join a");
    assert_eq!(first, vec![a.session_id]);

    let (b, second) = join_room(&relay, "r1").await.expect("join b");
    assert_eq!(second.len(), 2);
    assert!(second.contains(&a.session_id));
    assert!(second.contains(&b.session_id));
}

#[tokio::test]
async fn test_three_peers_see_each_other_join() {
    init_tracing();

    let relay = spawn_relay().await.expect("Failed to start relay");

    let (mut a, _) = join_room(&relay, "r1").await.expect("join a");
    let (mut b, _) = join_room(&relay, "r1").await.expect("join b");
    let (c, participants) = join_room(&relay, "r1").await.expect("join c");

    assert_eq!(participants.len(), 3);

    for client in [&mut a, &mut b] {
        let msg = client
            .recv_until(|m| {
                matches!(m, ServerMessage::PeerJoined { session_id, .. } if *session_id == c.session_id)
            })
            .await
            .expect("peer-joined for c");
        assert!(matches!(msg, ServerMessage::PeerJoined { .. }));
    }
}

#[tokio::test]
async fn test_leave_notifies_and_empties_room() {
    init_tracing();

    let relay = spawn_relay().await.expect("Failed to start relay");

    let (mut a, _) = join_room(&relay, "r1").await.expect("join a");
    let (mut b, _) = join_room(&relay, "r1").await.expect("join b");

    b.send(&ClientMessage::Leave {
        room_id: RoomId::from("r1"),
    })
    .await
    .unwrap();

    let msg = a
        .recv_until(|m| matches!(m, ServerMessage::PeerLeft { .. }))
        .await
        .expect("peer-left");
    assert_eq!(
        msg,
        ServerMessage::PeerLeft {
            room_id: RoomId::from("r1"),
            session_id: b.session_id,
        }
    );

    a.send(&ClientMessage::Leave {
        room_id: RoomId::from("r1"),
    })
    .await
    .unwrap();
    wait_for_members(&relay, "r1", 0).await.expect("room emptied");
    assert_eq!(relay.state.relay.registry().room_count(), 0);

    // Nobody is left to tell.
    assert!(b.recv_timeout(SILENCE_MS).await.unwrap().is_none());
}

#[tokio::test]
async fn test_socket_close_is_an_implicit_leave() {
    init_tracing();

    let relay = spawn_relay().await.expect("Failed to start relay");

    let (mut a, _) = join_room(&relay, "r1").await.expect("join a");
    let (b, _) = join_room(&relay, "r1").await.expect("join b");
    let b_id = b.session_id;

    b.close().await.expect("close b");

    let msg = a
        .recv_until(|m| matches!(m, ServerMessage::PeerLeft { .. }))
        .await
        .expect("peer-left");
    assert!(matches!(msg, ServerMessage::PeerLeft { session_id, .. } if session_id == b_id));

    wait_for_members(&relay, "r1", 1).await.expect("one member left");
}

#[tokio::test]
async fn test_joining_another_room_moves_the_session() {
    init_tracing();

    let relay = spawn_relay().await.expect("Failed to start relay");

    let (mut a, _) = join_room(&relay, "r1").await.expect("join a");
    let (mut b, _) = join_room(&relay, "r1").await.expect("join b");

    b.send(&ClientMessage::join("r2", None)).await.unwrap();
    b.recv_until(|m| matches!(m, ServerMessage::RoomParticipants { .. }))
        .await
        .expect("participants for r2");

    a.recv_until(|m| matches!(m, ServerMessage::PeerLeft { .. }))
        .await
        .expect("peer-left in r1");

    let registry = relay.state.relay.registry();
    assert_eq!(registry.room_of(&b.session_id), Some(RoomId::from("r2")));
    assert_eq!(registry.member_count(&RoomId::from("r1")), 1);
}
