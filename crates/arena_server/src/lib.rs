//! # Arena Dedicated Server
//!
//! Network server for the shared grid world.
//!
//! Exposes the deterministic [`arena_core`] simulation to remote clients
//! over a JSON-lines TCP protocol, with a read-only HTTP status page on a
//! second port. One pipeline task owns the world; one task serves each
//! connection; channels connect the two (see [`pipeline`]).

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod connection;
pub mod pipeline;
pub mod protocol;
pub mod status;

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use arena_core::config::SimulationConfig;
use arena_core::simulation::Simulation;

use crate::connection::serve_connection;
use crate::pipeline::{ConnectionId, Pipeline};

/// Error type for configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] ron::error::SpannedError),
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address for both listeners.
    pub host: String,
    /// Port for the game protocol.
    pub port: u16,
    /// Port for the HTTP status page.
    pub status_port: u16,
    /// Milliseconds between world ticks.
    pub tick_interval_ms: u64,
    /// Simulation parameters.
    pub sim: SimulationConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8765,
            status_port: 8766,
            tick_interval_ms: 1000,
            sim: SimulationConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load a configuration from a RON file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the file is missing, unreadable, or
    /// not valid RON.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        let config: Self = ron::from_str(&contents)?;
        Ok(config)
    }
}

/// Run the server until ctrl-c.
///
/// Binds the game and status listeners, spawns the pipeline task that owns
/// the world, and serves each accepted connection on its own task. The
/// simulation configuration must already be validated.
///
/// # Errors
///
/// Returns the underlying I/O error when a listener cannot be bound.
pub async fn run(config: ServerConfig) -> std::io::Result<()> {
    let sim = Simulation::new(config.sim.clone());
    let (pipeline, summary_rx) = Pipeline::new(sim);

    let (request_tx, request_rx) = mpsc::channel(256);
    let tick_interval = Duration::from_millis(config.tick_interval_ms);
    let pipeline_task = tokio::spawn(pipeline.run(request_rx, tick_interval));

    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    tracing::info!(host = %config.host, port = config.port, "listening for clients");

    let status_listener = TcpListener::bind((config.host.as_str(), config.status_port)).await?;
    tracing::info!(port = config.status_port, "status page available");
    let status_task = tokio::spawn(status::run_status_server(
        status_listener,
        summary_rx,
        config.port,
    ));

    let mut next_conn: ConnectionId = 1;
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    let conn = next_conn;
                    next_conn += 1;
                    tokio::spawn(serve_connection(stream, addr, conn, request_tx.clone()));
                }
                Err(err) => tracing::warn!(%err, "accept failed"),
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown requested");
                break;
            }
        }
    }

    // Dropping the last request sender lets the pipeline drain and stop
    // once every connection task has finished.
    drop(request_tx);
    status_task.abort();
    let _ = pipeline_task.await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8765);
        assert_eq!(config.status_port, 8766);
        assert_eq!(config.tick_interval_ms, 1000);
        assert!(config.sim.validate().is_ok());
    }

    #[test]
    fn test_load_missing_file() {
        let result = ServerConfig::load(Path::new("/nonexistent/server.ron"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_ron_file_with_partial_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"(
    port: 9000,
    tick_interval_ms: 250,
    sim: (
        width: 16,
        height: 16,
        spawn_interval: 5,
        max_resources: 20,
        harvest_cap: 10,
        spawn_quantity_min: 20,
        spawn_quantity_max: 100,
        recipe: (ore: 1, fuel: 1, components: 1),
        seed: 99,
    ),
)"#
        )
        .unwrap();

        let config = ServerConfig::load(file.path()).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.tick_interval_ms, 250);
        // Fields absent from the file keep their defaults.
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.status_port, 8766);
        assert_eq!(config.sim.width, 16);
        assert_eq!(config.sim.seed, 99);
    }

    #[test]
    fn test_load_rejects_bad_ron() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "this is not ron").unwrap();
        assert!(matches!(
            ServerConfig::load(file.path()),
            Err(ConfigError::ParseError(_))
        ));
    }
}
