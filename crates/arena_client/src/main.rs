//! Grid Arena - reference test client.
//!
//! Connects to a running server, plays a short scripted session (move,
//! move, harvest, move, craft), logs every reply, then lingers to observe
//! tick broadcasts. Useful as a connectivity smoke test and as a worked
//! example of the wire protocol.

use std::io;
use std::time::Duration;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use arena_server::protocol::{ClientCommand, ServerMessage};

#[derive(Parser)]
#[command(name = "arena_client")]
#[command(about = "Scripted reference client for the grid world server")]
#[command(version)]
struct Cli {
    /// Server address
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Server game port
    #[arg(long, default_value_t = 8765)]
    port: u16,

    /// Pause between scripted commands, in milliseconds
    #[arg(long, default_value_t = 1000)]
    pause_ms: u64,

    /// How long to keep observing broadcasts after the script, in seconds
    #[arg(long, default_value_t = 5)]
    linger_secs: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let fallback = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();

    if let Err(err) = run_session(&cli).await {
        tracing::error!(%err, "session failed - is the server running?");
        std::process::exit(1);
    }
}

async fn run_session(cli: &Cli) -> io::Result<()> {
    tracing::info!(host = %cli.host, port = cli.port, "connecting");
    let stream = TcpStream::connect((cli.host.as_str(), cli.port)).await?;
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    let Some(welcome) = lines.next_line().await? else {
        tracing::error!("server closed the connection before the welcome");
        return Ok(());
    };
    log_server_message(&welcome);

    let script = [
        ClientCommand::Move { dx: 1, dy: 0 },
        ClientCommand::Move { dx: 0, dy: 1 },
        ClientCommand::Harvest {},
        ClientCommand::Move { dx: -1, dy: 0 },
        ClientCommand::Craft {},
    ];

    for (step, command) in script.iter().enumerate() {
        let line = serde_json::to_string(command).map_err(io::Error::other)?;
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        tracing::info!(step = step + 1, action = command.name(), "sent command");

        sleep(Duration::from_millis(cli.pause_ms)).await;

        // Drain whatever the server has sent meanwhile.
        loop {
            match timeout(Duration::from_millis(100), lines.next_line()).await {
                Ok(Ok(Some(line))) => log_server_message(&line),
                Ok(Ok(None)) => {
                    tracing::info!("server closed the connection");
                    return Ok(());
                }
                Ok(Err(err)) => return Err(err),
                Err(_) => break,
            }
        }
    }

    tracing::info!(secs = cli.linger_secs, "script finished, observing broadcasts");
    let deadline = Instant::now() + Duration::from_secs(cli.linger_secs);
    while Instant::now() < deadline {
        match timeout(Duration::from_millis(250), lines.next_line()).await {
            Ok(Ok(Some(line))) => log_server_message(&line),
            Ok(Ok(None)) => break,
            Ok(Err(err)) => return Err(err),
            Err(_) => {}
        }
    }
    Ok(())
}

fn log_server_message(line: &str) {
    match serde_json::from_str::<ServerMessage>(line) {
        Ok(ServerMessage::ConnectionEstablished { agent_id }) => {
            tracing::info!(agent_id, "connection established");
        }
        Ok(ServerMessage::ActionConfirmed { action, success }) => {
            tracing::info!(%action, success, "action confirmed");
        }
        Ok(ServerMessage::GameState {
            tick,
            agent_state,
            world_info,
        }) => {
            tracing::info!(
                tick,
                x = agent_state.x,
                y = agent_state.y,
                inventory = ?agent_state.inventory,
                resources = world_info.total_resources,
                "game state"
            );
        }
        Ok(ServerMessage::Error { message }) => {
            tracing::warn!(%message, "server reported an error");
        }
        Err(err) => tracing::warn!(%err, line, "unparseable server message"),
    }
}
