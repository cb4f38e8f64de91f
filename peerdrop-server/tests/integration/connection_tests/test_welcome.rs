use futures::StreamExt;
use peerdrop_core::{IceServerConfig, ServerMessage};
use peerdrop_server::{AppState, OpenGate, RelayConfig, serve_on};
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::integration::init_tracing;
use crate::utils::{TestClient, spawn_relay};

#[tokio::test]
async fn test_each_connection_gets_a_fresh_session() {
    init_tracing();

    let relay = spawn_relay().await.expect("Failed to start relay");

    let a = TestClient::connect(relay.addr).await.expect("connect a");
    let b = TestClient::connect(relay.addr).await.expect("connect b");

    assert_ne!(a.session_id, b.session_id);
}

#[tokio::test]
async fn test_welcome_carries_configured_ice_servers() {
    init_tracing();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let config = RelayConfig {
        bind: addr,
        ice_servers: vec![IceServerConfig {
            urls: vec!["turn:turn.example.org:3478".into()],
            username: Some("user".into()),
            credential: Some("pass".into()),
        }],
        ..Default::default()
    };
    let state = AppState::new(&config, Arc::new(OpenGate::default()));
    tokio::spawn(serve_on(listener, state));

    let url = format!("ws://{}/ws", addr);
    let (mut socket, _) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .expect("Failed to connect");

    let Some(Ok(tokio_tungstenite::tungstenite::Message::Text(text))) = socket.next().await else {
        panic!("expected a text frame");
    };
    let msg: ServerMessage = serde_json::from_str(text.as_str()).unwrap();

    let ServerMessage::Welcome { ice_servers, .. } = msg else {
        panic!("expected welcome, got {:?}", msg);
    };
    assert_eq!(ice_servers, config.ice_servers);
}
