use crate::config::RelayConfig;
use crate::gate::{RoomDirectory, RoomGate};
use crate::signaling::{SignalingRelay, SignalingService, ws_handler};
use anyhow::Context;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Shared by every connection handler.
#[derive(Clone)]
pub struct AppState {
    pub relay: SignalingRelay,
    pub signaling: SignalingService,
}

impl AppState {
    pub fn new(config: &RelayConfig, gate: Arc<dyn RoomGate>) -> Self {
        let signaling = SignalingService::new();
        let relay = SignalingRelay::new(
            Arc::new(signaling.clone()),
            gate,
            config.ice_servers.clone(),
        );
        Self { relay, signaling }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .layer(cors)
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let registry = state.relay.registry();
    Json(json!({
        "status": "ok",
        "rooms": registry.room_count(),
        "sessions": state.signaling.session_count(),
    }))
}

pub async fn serve(config: RelayConfig) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    let rooms = Arc::new(RoomDirectory::from_config(&config));
    serve_on(listener, AppState::new(&config, rooms)).await
}

pub async fn serve_on(listener: TcpListener, state: AppState) -> anyhow::Result<()> {
    let addr = listener.local_addr().context("Listener has no address")?;
    info!("Signaling relay listening on http://{}", addr);

    axum::serve(listener, router(state))
        .await
        .context("Relay server stopped")
}
