//! piano-world-client binary
//!
//! Headless room client: joins the room, mirrors it into a [`RoomCache`] and
//! logs what happens. Useful for poking a server without the game.
//!
//! ## Configuration (flags / env, falling back to `network_config.txt`)
//!
//! | Key                        | Default              | Description                  |
//! |----------------------------|----------------------|------------------------------|
//! | `PIANO_WORLD_CONFIG`       | `network_config.txt` | host/port file               |
//! | `PIANO_WORLD_HOST`         | *(from file)*        | overrides the file's host    |
//! | `PIANO_WORLD_PORT`         | *(from file)*        | overrides the file's port    |
//! | `PIANO_WORLD_TICK_RATE_HZ` | `60`                 | dispatch rate                |

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use piano_world::{
    config::{NetworkConfig, DEFAULT_CONFIG_FILE},
    Client, EventHandler, KeyEvent, MoveEvent, RoomCache, SessionOptions, UserId, Vec3,
};
use serde_json::json;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "piano-world-client", about = "Piano World room client", version)]
struct Args {
    /// host=/port= file, created with defaults if missing
    #[arg(long, env = "PIANO_WORLD_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Server host
    #[arg(long, env = "PIANO_WORLD_HOST")]
    host: Option<String>,

    /// Server port
    #[arg(long, env = "PIANO_WORLD_PORT")]
    port: Option<u16>,

    /// Tick rate (Hz)
    #[arg(long, env = "PIANO_WORLD_TICK_RATE_HZ", default_value_t = 60.0)]
    tick_rate_hz: f32,

    /// Print every delivered event as a JSON line on stdout
    #[arg(long)]
    json: bool,

    /// Send our pose (origin, facing forward) every tick
    #[arg(long)]
    announce: bool,
}

// ---------------------------------------------------------------------------
// Event sink
// ---------------------------------------------------------------------------

/// Mirrors events into the cache and optionally echoes them.
struct Room {
    cache: RoomCache,
    json: bool,
}

impl Room {
    fn emit(&self, value: serde_json::Value) {
        if self.json {
            println!("{}", value);
        }
    }
}

impl EventHandler for Room {
    fn on_join(&mut self, sender: UserId) {
        log::info!("{} joined", sender);
        self.cache.on_join(sender);
        self.emit(json!({ "kind": "Join", "sender": sender }));
    }

    fn on_disconnect(&mut self, sender: UserId) {
        log::info!("{} left", sender);
        self.cache.on_disconnect(sender);
        self.emit(json!({ "kind": "Disconnect", "sender": sender }));
    }

    fn on_move(&mut self, event: &MoveEvent, sender: UserId) {
        self.cache.on_move(event, sender);
        self.emit(json!({ "kind": "Move", "sender": sender, "event": event }));
    }

    fn on_key(&mut self, event: &KeyEvent, sender: UserId) {
        log::debug!("{} key {} velocity {}", sender, event.key(), event.velocity());
        self.cache.on_key(event, sender);
        self.emit(json!({ "kind": "Key", "sender": sender, "event": event }));
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("piano_world=debug".parse()?),
        )
        .init();

    let args = Args::parse();

    let file = NetworkConfig::load_or_create(&args.config);
    let net = NetworkConfig {
        host: args.host.unwrap_or(file.host),
        port: args.port.unwrap_or(file.port),
    };

    log::info!(
        "Starting piano-world-client (server={}:{}, tick={}Hz)",
        net.host,
        net.port,
        args.tick_rate_hz,
    );

    // Connect + handshake block for several seconds at worst.
    let mut client = tokio::task::spawn_blocking(move || {
        let transport = net.transport().with_connect_timeout(Duration::from_secs(2));
        let mut client = Client::new(transport, SessionOptions::default());
        let id = client.connect();
        (client, id)
    })
    .await
    .context("connect task panicked")
    .and_then(|(client, id)| {
        let id = id.context("could not join the room")?;
        log::info!("joined as {}", id);
        Ok(client)
    })?;

    let mut room = Room {
        cache: RoomCache::new(),
        json: args.json,
    };

    let period = Duration::from_secs_f32(1.0 / args.tick_rate_hz.max(1.0));
    let mut timer = tokio::time::interval(period);
    let mut stats_timer = tokio::time::interval(Duration::from_secs(10));

    loop {
        tokio::select! {
            _ = timer.tick() => {
                if args.announce {
                    client.send_move(Vec3::zero(), Vec3::zero());
                }
                client.tick(&mut room);
                if !client.session().is_receiving() {
                    // frames queued just before the thread exited
                    client.tick(&mut room);
                    log::warn!("connection lost ({})", client.state());
                    break;
                }
            }
            _ = stats_timer.tick() => {
                let stats = room.cache.stats();
                tracing::info!(
                    players = stats.players,
                    sounding_keys = stats.sounding_keys,
                    sounding_notes = stats.sounding_notes,
                    "room stats"
                );
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("Received Ctrl-C, shutting down");
                break;
            }
        }
    }

    client.close();
    Ok(())
}
