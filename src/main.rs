//! Headless client for the Minecraft 1.7 wire protocol.
//!
//! Two modes: `ping` queries a server's status and prints the JSON, `join`
//! logs in and runs the play-mode loop (keep-alive echo included) until the
//! server disconnects us or Ctrl-C.

use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{debug, error, info, trace, warn};

use andesite::client::Client;
use andesite::dispatch::GameEvent;
use andesite::error::ClientError;

/// Interval between simulation ticks (one server tick at 20 Hz).
const TICK_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Parser)]
#[command(name = "andesite", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Query a server's status and print the JSON response.
    Ping {
        /// Server hostname or IP address.
        host: String,
        /// Server port.
        #[arg(long, default_value_t = 25565)]
        port: u16,
    },
    /// Log in to a server and run the play-mode loop until interrupted.
    Join {
        /// Server hostname or IP address.
        host: String,
        /// Server port.
        #[arg(long, default_value_t = 25565)]
        port: u16,
        /// Username to present at login.
        #[arg(long, default_value = "andesite")]
        username: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Ping { host, port } => ping(host, port).await,
        Command::Join {
            host,
            port,
            username,
        } => join(host, port, &username).await,
    }
}

/// Run the status-query mode: one exchange, print, done.
async fn ping(host: String, port: u16) -> Result<(), ClientError> {
    info!(%host, port, "pinging server");
    let json = Client::ping(host, port).await?;

    // Pretty-print when the server returned valid JSON, raw otherwise.
    match serde_json::from_str::<serde_json::Value>(&json) {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value).unwrap_or(json));
        }
        Err(_) => println!("{json}"),
    }
    Ok(())
}

/// Run the play mode loop: select between the tick and the inbound packet
/// source, dispatching whatever is ready first.
async fn join(host: String, port: u16, username: &str) -> Result<(), ClientError> {
    let mut client = Client::join(host, port, username).await?;

    let mut tick = tokio::time::interval(TICK_INTERVAL);
    let mut ticks: u64 = 0;

    loop {
        tokio::select! {
            _ = tick.tick() => {
                ticks += 1;
                // A renderer would draw a frame here; headless, we only count.
                if ticks % 200 == 0 {
                    trace!(ticks, "tick");
                }
            }
            packet = client.recv() => {
                let Some(packet) = packet else {
                    warn!("inbound pipeline terminated, treating as disconnect");
                    break;
                };
                match client.handle(&packet).await {
                    Ok(event) => log_event(&event),
                    Err(e) if e.is_fatal() => {
                        error!("session failed: {e}");
                        break;
                    }
                    Err(e) => warn!(id = packet.id, "discarding malformed packet: {e}"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, shutting down");
                break;
            }
        }
    }

    client.shutdown();
    Ok(())
}

fn log_event(event: &GameEvent) {
    match event {
        GameEvent::KeepAlive(keep_alive) => {
            debug!(token = keep_alive.token, "keep-alive echoed");
        }
        GameEvent::JoinGame(join) => {
            info!(
                entity_id = join.entity_id,
                game_mode = join.game_mode,
                dimension = join.dimension,
                difficulty = join.difficulty,
                level_type = %join.level_type,
                "joined game"
            );
        }
        GameEvent::TimeUpdate(time) => {
            trace!(
                world_age = time.world_age,
                time_of_day = time.time_of_day,
                "time update"
            );
        }
        GameEvent::PlayerPositionAndLook(pos) => {
            debug!(x = pos.x, y = pos.y, z = pos.z, "position update");
        }
        GameEvent::PlayerAbilities(abilities) => {
            debug!(flags = abilities.flags, "player abilities");
        }
        GameEvent::MapChunkBulk(chunks) => {
            debug!(
                columns = chunks.column_count,
                bytes = chunks.data.len(),
                "map chunk bulk"
            );
        }
        GameEvent::Unknown { id } => {
            trace!(id, "unhandled packet");
        }
    }
}
