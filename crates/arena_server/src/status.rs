//! Read-only HTTP status page.
//!
//! A minimal HTTP/1.1 responder on its own listener: every request is
//! answered with a single HTML page rendered from the pipeline's latest
//! [`WorldSummary`], then the connection is closed. No request routing, no
//! mutation capability.
//!
//! The corpus this server grew from carries no HTTP framework, and a
//! one-page status view does not justify one.

use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;

use arena_core::simulation::WorldSummary;

/// Serve status requests until the listener fails or the task is aborted.
pub async fn run_status_server(
    listener: TcpListener,
    summary: watch::Receiver<WorldSummary>,
    game_port: u16,
) {
    loop {
        let (stream, addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                tracing::warn!(%err, "status listener accept failed");
                continue;
            }
        };
        let snapshot = *summary.borrow();
        tokio::spawn(serve_status_request(stream, addr, snapshot, game_port));
    }
}

/// Answer one request with the status page.
async fn serve_status_request(
    mut stream: TcpStream,
    addr: SocketAddr,
    summary: WorldSummary,
    game_port: u16,
) {
    // Read and discard the request head; the page is the answer to every
    // path.
    let mut head = [0u8; 1024];
    let _ = stream.read(&mut head).await;

    let body = status_html(&summary, game_port);
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    if let Err(err) = stream.write_all(response.as_bytes()).await {
        tracing::debug!(%addr, %err, "status response failed");
    }
    let _ = stream.shutdown().await;
}

/// Render the status page for a world summary.
fn status_html(summary: &WorldSummary, game_port: u16) -> String {
    let (width, height) = summary.dimensions;
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Grid Arena Server Status</title>
    <style>
        body {{ font-family: Arial, sans-serif; margin: 40px; }}
        .status {{ background: #f0f0f0; padding: 20px; border-radius: 5px; }}
        code {{ background: #e8e8e8; padding: 2px 4px; border-radius: 3px; }}
    </style>
</head>
<body>
    <h1>Grid Arena</h1>
    <div class="status">
        <h2>Server Status: Online</h2>
        <p><strong>Game endpoint:</strong> <code>tcp://localhost:{game_port}</code> (JSON lines)</p>
        <p><strong>World Tick:</strong> {tick}</p>
        <p><strong>World Size:</strong> {width}x{height}</p>
        <p><strong>Connected Agents:</strong> {agents}</p>
        <p><strong>Resource Deposits:</strong> {resources}</p>
        <p><strong>Total Entities:</strong> {entities}</p>
    </div>
    <h3>Available Actions</h3>
    <ul>
        <li><code>{{"action": "move", "params": {{"dx": 1, "dy": 0}}}}</code> - move your agent</li>
        <li><code>{{"action": "harvest", "params": {{}}}}</code> - harvest the deposit you stand on</li>
        <li><code>{{"action": "craft", "params": {{}}}}</code> - craft components from ORE + FUEL</li>
    </ul>
    <p>Run <code>arena-client</code> for a scripted reference session.</p>
</body>
</html>
"#,
        game_port = game_port,
        tick = summary.tick,
        width = width,
        height = height,
        agents = summary.total_agents,
        resources = summary.total_resources,
        entities = summary.total_entities,
    )
}
