//! Grid Arena - Dedicated Server

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use arena_server::ServerConfig;

#[derive(Parser)]
#[command(name = "arena_server")]
#[command(about = "Shared grid world server - JSON lines over TCP")]
#[command(version)]
struct Cli {
    /// Path to a RON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address override
    #[arg(long)]
    host: Option<String>,

    /// Game port override
    #[arg(long)]
    port: Option<u16>,

    /// Status page port override
    #[arg(long)]
    status_port: Option<u16>,

    /// Enable verbose logging to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let fallback = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();

    let mut config = match &cli.config {
        Some(path) => match ServerConfig::load(path) {
            Ok(config) => config,
            Err(err) => {
                tracing::error!(%err, "failed to load configuration");
                std::process::exit(1);
            }
        },
        None => ServerConfig::default(),
    };
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(status_port) = cli.status_port {
        config.status_port = status_port;
    }
    if let Err(err) = config.sim.validate() {
        tracing::error!(%err, "invalid simulation configuration");
        std::process::exit(1);
    }

    tracing::info!("Starting Grid Arena dedicated server");
    if let Err(err) = arena_server::run(config).await {
        tracing::error!(%err, "server terminated");
        std::process::exit(1);
    }
}
