use anyhow::{Context, Result, bail};
use bytes::Bytes;
use colored::*;
use peerdrop::client::{
    ClientConfig, ConnectionManager, FileSender, ManagerEvent, OutgoingFile, PeerState,
    SignalingClient, TracingTransferLog, guess_mime,
};
use peerdrop::model::{ClientMessage, RoomId, ServerMessage, UserId};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// How long to keep the connection up after the last frame went out.
const LINGER: Duration = Duration::from_secs(5);

pub async fn run(
    relay: &str,
    room: &str,
    path: &Path,
    user: Option<String>,
    chunk_size: Option<u32>,
) -> Result<()> {
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .context("File path has no usable name")?
        .to_owned();
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file = OutgoingFile::new(
        name.clone(),
        guess_mime(&name).essence_str(),
        Bytes::from(data),
    );

    let mut signaling = SignalingClient::connect(relay).await?;
    let room_id = RoomId::from(room);
    let local = signaling.session_id();

    let mut config = ClientConfig::default().with_ice_servers(signaling.ice_servers().to_vec());
    if let Some(chunk_size) = chunk_size {
        config.chunk_size = chunk_size;
    }

    signaling.send(ClientMessage::join(room_id.clone(), user.map(UserId::from)))?;
    println!(
        "{} {} ({} bytes) in room {}",
        "📤 Offering".green().bold(),
        name.cyan(),
        file.size(),
        room.cyan()
    );

    let sender = FileSender::new(
        room_id.clone(),
        local,
        config.chunk_size,
        Arc::new(TracingTransferLog),
    );
    let (manager, handle, mut events) =
        ConnectionManager::new(local, room_id.clone(), config, signaling.sender());
    let manager = tokio::spawn(manager.run());

    let recipient = loop {
        tokio::select! {
            msg = signaling.recv() => {
                let Some(msg) = msg else {
                    bail!("Relay connection closed");
                };
                match &msg {
                    ServerMessage::RoomParticipants { session_ids, .. } => {
                        let others: Vec<_> = session_ids.iter().filter(|id| **id != local).collect();
                        if others.is_empty() {
                            println!("{}", "⏳ Waiting for a peer to join...".yellow());
                        }
                        for peer in others {
                            handle.connect(*peer).await?;
                        }
                    }
                    ServerMessage::PeerJoined { session_id, .. } => {
                        println!("{} {}", "👋 Peer joined:".cyan(), session_id);
                        handle.connect(*session_id).await?;
                    }
                    ServerMessage::JoinRejected { reason, .. } => {
                        bail!("Relay refused to join {}: {}", room, reason);
                    }
                    _ => {}
                }
                handle.handle_signal(msg).await?;
            }

            event = events.recv() => {
                match event {
                    Some(ManagerEvent::ChannelReady { peer, channel }) => break (peer, channel),
                    Some(ManagerEvent::StateChanged { peer, state: PeerState::Failed }) => {
                        println!("{} {}", "❌ Connection failed with".red(), peer);
                    }
                    Some(ManagerEvent::StateChanged { peer, state }) => {
                        debug!("Peer {} is {}", peer, state);
                    }
                    Some(_) => {}
                    None => bail!("Connection manager stopped"),
                }
            }
        }
    };

    let (peer, channel) = recipient;
    println!("{} {}", "🔗 Connected to".green(), peer);

    let transfer = sender
        .send(channel.as_ref(), &file, |percent| {
            print!("\r   {:>5.1}%", percent);
            let _ = std::io::stdout().flush();
        })
        .await;
    println!();

    if transfer.is_ok() {
        println!("{}", "✨ Transfer complete".green().bold());

        let _ = tokio::time::timeout(LINGER, async {
            while let Some(event) = events.recv().await {
                if matches!(event, ManagerEvent::ChannelClosed { peer: p } if p == peer) {
                    break;
                }
            }
        })
        .await;
    }

    handle.close_all().await?;
    drop(handle);
    let _ = manager.await;

    let transfer = transfer.with_context(|| format!("Failed to send {} to {}", name, peer))?;
    debug!("Transfer {} finished", transfer.id());
    Ok(())
}
