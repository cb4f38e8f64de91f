use crate::server::AppState;
use axum::extract::State;
use axum::extract::WebSocketUpgrade;
use axum::extract::ws::{Message, WebSocket};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use peerdrop_core::{ClientMessage, ServerMessage, SessionId};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let session_id = SessionId::new();
    info!("New WebSocket connection: {}", session_id);

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    state.signaling.add_session(session_id, tx);
    state.relay.connect(session_id).await;

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let state = state.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => {
                        match serde_json::from_str::<ClientMessage>(text.as_str()) {
                            Ok(msg) => state.relay.dispatch(session_id, msg).await,
                            Err(e) => {
                                warn!("Invalid message from {}: {}", session_id, e);
                                state.signaling.send_signal(
                                    session_id,
                                    &ServerMessage::Error {
                                        message: format!("invalid message: {e}"),
                                    },
                                );
                            }
                        }
                    }
                    Message::Binary(_) => {
                        debug!("Ignoring binary frame from {}", session_id);
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    state.relay.disconnect(session_id).await;
    state.signaling.remove_session(&session_id);
    info!("WebSocket disconnected: {}", session_id);
}
