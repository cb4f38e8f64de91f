use anyhow::{Context, Result};
use colored::*;
use peerdrop::server::{RelayConfig, RoomSpec, ice_servers_from_urls, parse_bind};

pub struct ServeArgs {
    pub bind: Option<String>,
    pub ice_servers: Vec<String>,
    pub room_capacity: Option<usize>,
    pub turn_username: Option<String>,
    pub turn_credential: Option<String>,
    pub strict_rooms: bool,
    pub rooms: Vec<RoomSpec>,
}

pub async fn run(args: ServeArgs) -> Result<()> {
    let mut config = RelayConfig::from_env().context("Invalid relay configuration")?;

    if let Some(bind) = args.bind {
        config.bind = parse_bind(&bind)?;
    }
    if !args.ice_servers.is_empty() {
        config.ice_servers =
            ice_servers_from_urls(args.ice_servers, args.turn_username, args.turn_credential);
    }
    if args.room_capacity.is_some() {
        config.room_capacity = args.room_capacity;
    }
    if args.strict_rooms {
        config.strict_rooms = true;
    }
    config.rooms.extend(args.rooms);

    println!(
        "{} {}",
        "📡 Relay listening on".green().bold(),
        format!("ws://{}/ws", config.bind).cyan()
    );
    for server in &config.ice_servers {
        println!("   ICE: {}", server.urls.join(", "));
    }
    for room in &config.rooms {
        let lock = if room.access_code.is_some() { " 🔒" } else { "" };
        println!("   Room: {}{}", room.room_id.as_str().cyan(), lock);
    }
    if config.strict_rooms {
        println!("   {}", "Only registered rooms can be joined".yellow());
    }

    peerdrop::server::serve(config).await
}
