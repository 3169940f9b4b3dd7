use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::*;
use proxima_client::{BrokerStatus, ClientConfig, ClientEvent, LocalSample, spawn_client};
use proxima_core::ClientId;
use proxima_core::utils::{DEFAULT_CHANNEL, DEFAULT_RANGE};
use proxima_server::BrokerConfig;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "proxima", version, about = "Proximity voice signaling")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the proximity broker.
    Serve(ServeArgs),
    /// Run a headless client fed with `map x y [name]` lines on stdin.
    Client(ClientArgs),
}

#[derive(Args)]
struct ServeArgs {
    #[arg(long, env = "PROXIMA_BIND", default_value = "0.0.0.0:8080")]
    bind: SocketAddr,

    #[arg(long, env = "PROXIMA_RANGE", default_value_t = DEFAULT_RANGE)]
    range: u32,

    /// Seconds of silence before a client is dropped.
    #[arg(long, env = "PROXIMA_STALE_TIMEOUT", default_value_t = 15)]
    stale_timeout: u64,

    #[arg(
        long,
        env = "PROXIMA_SWEEP_INTERVAL",
        default_value_t = 5,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    sweep_interval: u64,

    #[arg(long, env = "PROXIMA_OUTBOX_CAPACITY", default_value_t = 100)]
    outbox_capacity: usize,
}

#[derive(Args)]
struct ClientArgs {
    #[arg(long, env = "PROXIMA_BROKER_URL", default_value = "ws://127.0.0.1:8080/ws")]
    broker_url: String,

    /// Session id; random when omitted.
    #[arg(long, env = "PROXIMA_CLIENT_ID")]
    client_id: Option<String>,

    #[arg(long, env = "PROXIMA_CHANNEL", default_value_t = DEFAULT_CHANNEL)]
    channel: i32,

    #[arg(long, env = "PROXIMA_RANGE", default_value_t = DEFAULT_RANGE)]
    range: u32,

    #[arg(long, env = "PROXIMA_FULL_VOLUME_RADIUS", default_value_t = 4)]
    full_volume_radius: u32,

    /// Seconds between forced position reports.
    #[arg(long, env = "PROXIMA_FORCE_INTERVAL", default_value_t = 5)]
    force_interval: u64,

    #[arg(long, env = "PROXIMA_HANDSHAKE_TIMEOUT", default_value_t = 15)]
    handshake_timeout: u64,

    /// Milliseconds between outgoing connection attempts.
    #[arg(long, env = "PROXIMA_ATTEMPT_STAGGER", default_value_t = 250)]
    attempt_stagger: u64,

    #[arg(long, env = "PROXIMA_RECONNECT_DELAY", default_value_t = 2)]
    reconnect_delay: u64,

    /// STUN/TURN urls; the public STUN list when omitted.
    #[arg(long = "ice-server", env = "PROXIMA_ICE_SERVERS", value_delimiter = ',')]
    ice_servers: Vec<String>,
}

impl ServeArgs {
    fn into_config(self) -> BrokerConfig {
        BrokerConfig {
            bind: self.bind,
            range: self.range,
            stale_timeout: Duration::from_secs(self.stale_timeout),
            sweep_interval: Duration::from_secs(self.sweep_interval),
            outbox_capacity: self.outbox_capacity,
        }
    }
}

impl ClientArgs {
    fn into_config(self) -> ClientConfig {
        let defaults = ClientConfig::new(self.broker_url);
        ClientConfig {
            client_id: self.client_id.map(ClientId::from).unwrap_or(defaults.client_id.clone()),
            channel: self.channel,
            range: self.range,
            full_volume_radius: self.full_volume_radius,
            force_interval: Duration::from_secs(self.force_interval),
            handshake_timeout: Duration::from_secs(self.handshake_timeout),
            attempt_stagger: Duration::from_millis(self.attempt_stagger),
            reconnect_delay: Duration::from_secs(self.reconnect_delay),
            ice_servers: if self.ice_servers.is_empty() {
                defaults.ice_servers.clone()
            } else {
                self.ice_servers
            },
            ..defaults
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Commands::Serve(args) => {
            let config = args.into_config();
            println!("{} {}", "Broker listening on".green().bold(), config.bind);
            proxima_server::serve(config).await
        }
        Commands::Client(args) => run_client(args.into_config()).await,
    }
}

async fn run_client(config: ClientConfig) -> Result<()> {
    println!("{} {}", "Client id".cyan().bold(), config.client_id);
    let mut client = spawn_client(config);
    tokio::spawn(feed_stdin(client.samples()));

    loop {
        tokio::select! {
            event = client.next_event() => match event {
                Some(event) => print_event(&event),
                None => break,
            },
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for ctrl-c")?;
                break;
            }
        }
    }

    println!("{}", "Shutting down".yellow());
    client.shutdown().await;
    Ok(())
}

fn print_event(event: &ClientEvent) {
    match event {
        ClientEvent::Status(BrokerStatus::Connected) => println!("{}", "broker connected".green()),
        ClientEvent::Status(BrokerStatus::Connecting) => {
            println!("{}", "connecting to broker".dimmed())
        }
        ClientEvent::Status(BrokerStatus::Disconnected) => {
            println!("{}", "broker unreachable".red().bold())
        }
        ClientEvent::PeerConnected(peer) => println!("{} {}", "+".green().bold(), peer),
        ClientEvent::PeerGone(peer) => println!("{} {}", "-".red().bold(), peer),
        ClientEvent::PeerGain {
            peer,
            gain,
            character_name,
        } => println!("  {} ({}) gain {:.2}", peer, character_name.bold(), gain),
        ClientEvent::BrokerError(text) => println!("{} {}", "broker:".red(), text),
    }
}

/// Reads `map x y [name]` lines until stdin closes.
async fn feed_stdin(samples: mpsc::Sender<LocalSample>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut name = String::new();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => return,
            Err(e) => {
                warn!("stdin: {}", e);
                return;
            }
        };
        let Some(sample) = parse_sample(&line, &mut name) else {
            if !line.trim().is_empty() {
                eprintln!("{} expected `map x y [name]`", "ignored:".yellow());
            }
            continue;
        };
        if samples.send(sample).await.is_err() {
            return;
        }
    }
}

/// A name given once sticks for later lines that omit it.
fn parse_sample(line: &str, name: &mut String) -> Option<LocalSample> {
    let mut fields = line.split_whitespace();
    let map_id = fields.next()?.parse().ok()?;
    let x = fields.next()?.parse().ok()?;
    let y = fields.next()?.parse().ok()?;
    if let Some(given) = fields.next() {
        *name = given.to_string();
    }
    Some(LocalSample {
        map_id,
        x,
        y,
        character_name: name.clone(),
    })
}
