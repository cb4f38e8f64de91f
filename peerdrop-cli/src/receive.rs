use anyhow::{Context, Result, bail};
use colored::*;
use dialoguer::Confirm;
use peerdrop::client::{
    ClientConfig, ConnectionManager, FileReceiver, ManagerEvent, PeerState, ReceiveEvent,
    ReceivedFile, SignalingClient,
};
use peerdrop::model::{ClientMessage, RoomId, ServerMessage, SessionId};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub async fn run(relay: &str, room: &str, out: &Path, force: bool) -> Result<()> {
    tokio::fs::create_dir_all(out)
        .await
        .with_context(|| format!("Failed to create {}", out.display()))?;

    let mut signaling = SignalingClient::connect(relay).await?;
    let room_id = RoomId::from(room);
    let local = signaling.session_id();

    let config = ClientConfig::default().with_ice_servers(signaling.ice_servers().to_vec());
    let max_file_size = config.max_file_size;

    signaling.send(ClientMessage::join(room_id.clone(), None))?;
    println!(
        "{} {} as {}",
        "📥 Waiting for files in room".green().bold(),
        room.cyan(),
        local
    );

    let (manager, handle, mut events) =
        ConnectionManager::new(local, room_id, config, signaling.sender());
    let manager = tokio::spawn(manager.run());

    let mut receivers: HashMap<SessionId, FileReceiver> = HashMap::new();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("\n{}", "👋 Leaving room".yellow());
                break;
            }

            msg = signaling.recv() => {
                let Some(msg) = msg else {
                    println!("{}", "Relay connection closed".red());
                    break;
                };
                match &msg {
                    ServerMessage::RoomParticipants { session_ids, .. } => {
                        for peer in session_ids.iter().filter(|id| **id != local) {
                            handle.connect(*peer).await?;
                        }
                    }
                    ServerMessage::PeerJoined { session_id, .. } => {
                        println!("{} {}", "👋 Peer joined:".cyan(), session_id);
                    }
                    ServerMessage::JoinRejected { reason, .. } => {
                        bail!("Relay refused to join {}: {}", room, reason);
                    }
                    _ => {}
                }
                handle.handle_signal(msg).await?;
            }

            event = events.recv() => {
                let Some(event) = event else {
                    warn!("Connection manager stopped");
                    break;
                };
                match event {
                    ManagerEvent::ChannelReady { peer, .. } => {
                        println!("{} {}", "🔗 Connected to".green(), peer);
                        receivers.insert(peer, FileReceiver::new(Some(peer), max_file_size));
                    }
                    ManagerEvent::Frame { peer, frame } => {
                        let Some(receiver) = receivers.get_mut(&peer) else {
                            debug!("Frame from {} before its channel opened", peer);
                            continue;
                        };
                        match receiver.on_frame(frame) {
                            ReceiveEvent::Started(meta) => {
                                println!(
                                    "{} {} ({} bytes) from {}",
                                    "📦 Receiving".cyan().bold(),
                                    meta.name,
                                    meta.size,
                                    peer
                                );
                            }
                            ReceiveEvent::Progress { percent, .. } => {
                                print!("\r   {:>5.1}%", percent);
                                let _ = std::io::stdout().flush();
                            }
                            ReceiveEvent::Completed(file) => {
                                println!();
                                match save(out, &file, force).await {
                                    Ok(Some(path)) => println!(
                                        "{} {}",
                                        "✨ Saved".green().bold(),
                                        path.display()
                                    ),
                                    Ok(None) => println!("{} {}", "Skipped".yellow(), file.metadata.name),
                                    Err(e) => println!("{} {:#}", "❌ Could not save:".red().bold(), e),
                                }
                            }
                            ReceiveEvent::Failed(transfer) => {
                                println!();
                                println!(
                                    "{} {}",
                                    "❌ Transfer failed:".red().bold(),
                                    transfer.failure().unwrap_or("unknown error")
                                );
                            }
                        }
                    }
                    ManagerEvent::ChannelClosed { peer } => {
                        if let Some(mut receiver) = receivers.remove(&peer) {
                            if let Some(transfer) = receiver.channel_closed() {
                                println!(
                                    "\n{} {}",
                                    "❌ Connection lost while receiving".red(),
                                    transfer.metadata().name
                                );
                            }
                        }
                    }
                    ManagerEvent::StateChanged { peer, state: PeerState::Failed } => {
                        println!("{} {}", "❌ Connection failed with".red(), peer);
                    }
                    ManagerEvent::StateChanged { peer, state } => {
                        debug!("Peer {} is {}", peer, state);
                    }
                }
            }
        }
    }

    handle.close_all().await?;
    drop(handle);
    let _ = manager.await;
    Ok(())
}

/// Writes `file` under `out`. Returns `None` when the user declines to
/// overwrite an existing file.
async fn save(out: &Path, file: &ReceivedFile, force: bool) -> Result<Option<PathBuf>> {
    let name = Path::new(&file.metadata.name)
        .file_name()
        .context("Sender supplied an unusable file name")?;
    let path = out.join(name);

    if !force && tokio::fs::try_exists(&path).await? {
        let prompt = format!("{} exists. Overwrite?", path.display());
        let overwrite = tokio::task::spawn_blocking(move || {
            Confirm::new()
                .with_prompt(prompt)
                .default(false)
                .interact()
        })
        .await??;

        if !overwrite {
            return Ok(None);
        }
    }

    tokio::fs::write(&path, &file.data)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(Some(path))
}
