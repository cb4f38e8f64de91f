use anyhow::{Context, Result};
use peerdrop_server::{AppState, OpenGate, RelayConfig, serve_on};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Starts an in-process relay on a loopback port and returns its `/ws` URL.
pub async fn spawn_relay() -> Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .context("Failed to bind test listener")?;
    let addr: SocketAddr = listener.local_addr()?;

    // Host candidates are enough on loopback.
    let config = RelayConfig {
        bind: addr,
        ice_servers: Vec::new(),
        ..Default::default()
    };
    let state = AppState::new(&config, Arc::new(OpenGate::default()));

    tokio::spawn(async move {
        if let Err(e) = serve_on(listener, state).await {
            tracing::error!("Test relay stopped: {:?}", e);
        }
    });

    Ok(format!("ws://{}/ws", addr))
}
