use peerdrop_core::{ClientMessage, RoomId, ServerMessage};
use serde_json::json;

use crate::integration::init_tracing;
use crate::utils::{SILENCE_MS, join_room, spawn_relay, wait_for_members};

#[tokio::test]
async fn test_offer_answer_candidate_round_trip() {
    init_tracing();

    let relay = spawn_relay().await.expect("Failed to start relay");
    let r1 = RoomId::from("r1");

    let (mut a, _) = join_room(&relay, "r1").await.expect("join a");
    let (mut b, _) = join_room(&relay, "r1").await.expect("join b");

    a.send(&ClientMessage::offer(r1.clone(), b.session_id, "v=0 offer".into()))
        .await
        .unwrap();
    let offer = b
        .recv_until(|m| matches!(m, ServerMessage::Offer { .. }))
        .await
        .expect("offer at b");
    assert_eq!(
        offer,
        ServerMessage::Offer {
            room_id: r1.clone(),
            from_session_id: a.session_id,
            sdp: "v=0 offer".into(),
        }
    );

    b.send(&ClientMessage::answer(r1.clone(), a.session_id, "v=0 answer".into()))
        .await
        .unwrap();
    let answer = a
        .recv_until(|m| matches!(m, ServerMessage::Answer { .. }))
        .await
        .expect("answer at a");
    assert!(matches!(answer, ServerMessage::Answer { from_session_id, .. } if from_session_id == b.session_id));

    let candidate = json!({"candidate": "candidate:1 1 udp 2122260223 192.168.1.2 54321 typ host", "sdpMid": "0", "sdpMLineIndex": 0});
    a.send(&ClientMessage::candidate(r1.clone(), b.session_id, candidate.clone()))
        .await
        .unwrap();
    let got = b
        .recv_until(|m| matches!(m, ServerMessage::Candidate { .. }))
        .await
        .expect("candidate at b");
    assert_eq!(
        got,
        ServerMessage::Candidate {
            room_id: r1,
            from_session_id: a.session_id,
            candidate,
        }
    );
}

#[tokio::test]
async fn test_answer_to_departed_peer_goes_nowhere() {
    init_tracing();

    let relay = spawn_relay().await.expect("Failed to start relay");
    let r1 = RoomId::from("r1");

    let (mut a, _) = join_room(&relay, "r1").await.expect("join a");
    let (mut b, _) = join_room(&relay, "r1").await.expect("join b");
    let a_id = a.session_id;

    a.send(&ClientMessage::offer(r1.clone(), b.session_id, "offer".into()))
        .await
        .unwrap();
    b.recv_until(|m| matches!(m, ServerMessage::Offer { .. }))
        .await
        .expect("offer at b");

    a.close().await.expect("close a");
    b.recv_until(|m| matches!(m, ServerMessage::PeerLeft { .. }))
        .await
        .expect("peer-left at b");
    wait_for_members(&relay, "r1", 1).await.unwrap();

    b.send(&ClientMessage::answer(r1.clone(), a_id, "answer".into()))
        .await
        .unwrap();

    // No error back to the sender and the room is unchanged.
    assert!(b.recv_timeout(SILENCE_MS).await.unwrap().is_none());
    assert_eq!(relay.state.relay.registry().session_ids(&r1), vec![b.session_id]);
}

#[tokio::test]
async fn test_messages_from_one_sender_arrive_in_order() {
    init_tracing();

    let relay = spawn_relay().await.expect("Failed to start relay");
    let r1 = RoomId::from("r1");

    let (mut a, _) = join_room(&relay, "r1").await.expect("join a");
    let (mut b, _) = join_room(&relay, "r1").await.expect("join b");

    for i in 0..50 {
        a.send(&ClientMessage::candidate(r1.clone(), b.session_id, json!({ "seq": i })))
            .await
            .unwrap();
    }

    for i in 0..50 {
        let msg = b
            .recv_until(|m| matches!(m, ServerMessage::Candidate { .. }))
            .await
            .expect("candidate");
        let ServerMessage::Candidate { candidate, .. } = msg else {
            unreachable!();
        };
        assert_eq!(candidate["seq"], i);
    }
}
