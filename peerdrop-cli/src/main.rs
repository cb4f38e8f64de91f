mod receive;
mod send;
mod serve;

use anyhow::Result;
use clap::{Parser, Subcommand};
use peerdrop::server::RoomSpec;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "peerdrop", version, about = "Peer-to-peer file drop over WebRTC")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the signaling relay.
    Serve {
        /// Address to listen on (overrides PEERDROP_BIND).
        #[arg(long)]
        bind: Option<String>,

        /// STUN/TURN URL handed to clients; repeat for several.
        #[arg(long = "ice-server")]
        ice_servers: Vec<String>,

        /// Default member limit per room.
        #[arg(long)]
        room_capacity: Option<usize>,

        /// Credentials attached to `turn:`/`turns:` servers.
        #[arg(long, env = "PEERDROP_TURN_USERNAME")]
        turn_username: Option<String>,

        #[arg(long, env = "PEERDROP_TURN_CREDENTIAL", hide_env_values = true)]
        turn_credential: Option<String>,

        /// Refuse joins to rooms that were not registered with --room.
        #[arg(long)]
        strict_rooms: bool,

        /// Register a room as ID[:CODE[:MAX[:TTL_SECS]]]; repeat for several.
        #[arg(long = "room")]
        rooms: Vec<RoomSpec>,
    },

    /// Send a file to the first peer that connects in a room.
    Send {
        /// Relay WebSocket URL, e.g. ws://localhost:3000/ws
        #[arg(long, env = "PEERDROP_RELAY")]
        relay: String,

        #[arg(long)]
        room: String,

        file: PathBuf,

        #[arg(long)]
        user: Option<String>,

        #[arg(long)]
        chunk_size: Option<u32>,
    },

    /// Wait in a room and save whatever peers send.
    Receive {
        #[arg(long, env = "PEERDROP_RELAY")]
        relay: String,

        #[arg(long)]
        room: String,

        #[arg(long, default_value = ".")]
        out: PathBuf,

        /// Overwrite existing files without asking.
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Commands::Serve {
            bind,
            ice_servers,
            room_capacity,
            turn_username,
            turn_credential,
            strict_rooms,
            rooms,
        } => {
            serve::run(serve::ServeArgs {
                bind,
                ice_servers,
                room_capacity,
                turn_username,
                turn_credential,
                strict_rooms,
                rooms,
            })
            .await
        }
        Commands::Send {
            relay,
            room,
            file,
            user,
            chunk_size,
        } => send::run(&relay, &room, &file, user, chunk_size).await,
        Commands::Receive {
            relay,
            room,
            out,
            force,
        } => receive::run(&relay, &room, &out, force).await,
    }
}
