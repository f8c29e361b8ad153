//! Per-connection tasks.
//!
//! Each accepted socket gets one task: it registers an agent with the
//! pipeline, then loops reading JSON lines and forwarding parsed commands.
//! A paired writer task drains this connection's outbound channel so the
//! pipeline never blocks on a slow client.
//!
//! The connection moves through `Connecting -> Registered -> Active ->
//! Disconnected`; the disconnect notification is sent on every exit path -
//! graceful close, protocol failure, or I/O error - exactly once, after
//! which nothing references the agent again.

use std::io;
use std::net::SocketAddr;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};

use crate::pipeline::{ConnectionId, WorldRequest};
use crate::protocol::{parse_client_command, ServerMessage};

/// Serve one client connection to completion.
pub async fn serve_connection(
    stream: TcpStream,
    addr: SocketAddr,
    conn: ConnectionId,
    requests: mpsc::Sender<WorldRequest>,
) {
    tracing::info!(conn, %addr, "client connected");

    let (reader, writer) = stream.into_split();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let writer_task = tokio::spawn(write_outbound(writer, outbound_rx));

    if let Err(err) = drive_session(reader, conn, &requests, &outbound_tx).await {
        // Connection faults trigger cleanup and a log line; they are never
        // propagated to other clients.
        tracing::warn!(conn, %addr, %err, "connection error");
    }

    // Exactly-once cleanup, on every exit path. The pipeline side is
    // idempotent as well.
    let _ = requests.send(WorldRequest::Disconnect { conn }).await;
    drop(outbound_tx);
    let _ = writer_task.await;
    tracing::info!(conn, %addr, "client disconnected");
}

/// Register, greet, then pump client lines into the pipeline.
async fn drive_session(
    reader: OwnedReadHalf,
    conn: ConnectionId,
    requests: &mpsc::Sender<WorldRequest>,
    outbound: &mpsc::UnboundedSender<ServerMessage>,
) -> io::Result<()> {
    let (reply_tx, reply_rx) = oneshot::channel();
    let register = WorldRequest::Register {
        conn,
        outbound: outbound.clone(),
        reply: reply_tx,
    };
    if requests.send(register).await.is_err() {
        // Pipeline already stopped; the server is shutting down.
        return Ok(());
    }

    let agent_id = match reply_rx.await {
        Ok(Ok(snapshot)) => snapshot.id,
        Ok(Err(err)) => {
            let _ = outbound.send(ServerMessage::error(format!("Registration failed: {err}")));
            return Ok(());
        }
        Err(_) => return Ok(()),
    };
    let _ = outbound.send(ServerMessage::ConnectionEstablished { agent_id });

    let mut lines = BufReader::new(reader).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_client_command(line) {
            Ok(command) => {
                if requests
                    .send(WorldRequest::Action { conn, command })
                    .await
                    .is_err()
                {
                    break;
                }
            }
            Err(err) => {
                tracing::debug!(conn, %err, "protocol error");
                if outbound.send(ServerMessage::error(err.to_string())).is_err() {
                    break;
                }
            }
        }
    }
    Ok(())
}

/// Drain the outbound channel onto the socket until either side closes.
async fn write_outbound(
    mut writer: OwnedWriteHalf,
    mut outbound: mpsc::UnboundedReceiver<ServerMessage>,
) {
    while let Some(message) = outbound.recv().await {
        if writer
            .write_all(message.to_json_line().as_bytes())
            .await
            .is_err()
        {
            break;
        }
    }
    let _ = writer.shutdown().await;
}
