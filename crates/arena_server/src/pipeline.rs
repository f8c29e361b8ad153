//! The world-owning pipeline actor.
//!
//! Exactly one task owns the [`Simulation`]; connection tasks talk to it
//! through a single [`WorldRequest`] channel. That channel is the only
//! mutation path - there is no inline-apply shortcut - so actions from all
//! connections are serialized in FIFO arrival order and applied exactly
//! once, at the next tick boundary.
//!
//! Per tick, strictly in order:
//!
//! 1. drain every action queued since the previous tick and apply it;
//! 2. advance the tick (economic policy runs inside);
//! 3. send each acting connection an `action_confirmed` followed by its
//!    personalized `game_state`;
//! 4. broadcast a personalized `game_state` to every connection.
//!
//! Every snapshot a client sees therefore reflects a post-action,
//! post-tick world. A send failure marks only that connection for removal;
//! the loop itself never terminates on a client fault.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, MissedTickBehavior};

use arena_core::components::EntityId;
use arena_core::error::WorldError;
use arena_core::simulation::{AgentSnapshot, Simulation, WorldSummary};

use crate::protocol::{ClientCommand, ServerMessage};

/// Identifies one client connection for the lifetime of the process.
pub type ConnectionId = u64;

/// Requests a connection task may send to the pipeline.
#[derive(Debug)]
pub enum WorldRequest {
    /// Bind a new connection to a freshly registered agent.
    Register {
        /// The requesting connection.
        conn: ConnectionId,
        /// Channel the pipeline uses for all messages to this client.
        outbound: mpsc::UnboundedSender<ServerMessage>,
        /// Registration result, delivered once.
        reply: oneshot::Sender<Result<AgentSnapshot, WorldError>>,
    },
    /// Queue an action for application at the next tick.
    Action {
        /// The submitting connection.
        conn: ConnectionId,
        /// The parsed wire command.
        command: ClientCommand,
    },
    /// The connection is gone; remove its agent. Idempotent.
    Disconnect {
        /// The departed connection.
        conn: ConnectionId,
    },
}

/// Per-connection state held by the pipeline.
struct ClientHandle {
    agent_id: EntityId,
    outbound: mpsc::UnboundedSender<ServerMessage>,
}

/// The single task that owns the world.
pub struct Pipeline {
    sim: Simulation,
    clients: HashMap<ConnectionId, ClientHandle>,
    /// Actions queued since the previous tick, in arrival order.
    pending: Vec<(ConnectionId, ClientCommand)>,
    summary_tx: watch::Sender<WorldSummary>,
}

impl Pipeline {
    /// Create a pipeline around a simulation.
    ///
    /// Returns the pipeline and a watch receiver that observes the world
    /// summary after every tick (used by the status page).
    #[must_use]
    pub fn new(sim: Simulation) -> (Self, watch::Receiver<WorldSummary>) {
        let (summary_tx, summary_rx) = watch::channel(sim.summary());
        (
            Self {
                sim,
                clients: HashMap::new(),
                pending: Vec::new(),
                summary_tx,
            },
            summary_rx,
        )
    }

    /// Run until every request sender is dropped.
    ///
    /// Suspends only at the tick timer and the request channel; every
    /// world mutation happens inline on this task.
    pub async fn run(mut self, mut requests: mpsc::Receiver<WorldRequest>, tick_interval: Duration) {
        let mut ticker = tokio::time::interval_at(Instant::now() + tick_interval, tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.run_tick(),
                request = requests.recv() => match request {
                    Some(request) => self.handle_request(request),
                    None => {
                        tracing::info!("request channel closed, pipeline stopping");
                        break;
                    }
                },
            }
        }
    }

    /// Handle one request from a connection task.
    fn handle_request(&mut self, request: WorldRequest) {
        match request {
            WorldRequest::Register {
                conn,
                outbound,
                reply,
            } => self.register(conn, outbound, reply),
            WorldRequest::Action { conn, command } => {
                if self.clients.contains_key(&conn) {
                    self.pending.push((conn, command));
                } else {
                    // The connection disconnected after queueing; its agent
                    // id must never be referenced again.
                    tracing::debug!(conn, "dropping action from unregistered connection");
                }
            }
            WorldRequest::Disconnect { conn } => self.disconnect(conn),
        }
    }

    fn register(
        &mut self,
        conn: ConnectionId,
        outbound: mpsc::UnboundedSender<ServerMessage>,
        reply: oneshot::Sender<Result<AgentSnapshot, WorldError>>,
    ) {
        match self.sim.register_agent() {
            Ok(snapshot) => {
                let agent_id = snapshot.id;
                self.clients.insert(
                    conn,
                    ClientHandle {
                        agent_id,
                        outbound,
                    },
                );
                if reply.send(Ok(snapshot)).is_err() {
                    // The connection died during the handshake; roll back.
                    self.clients.remove(&conn);
                    self.sim.remove_agent(agent_id);
                }
            }
            Err(err) => {
                tracing::warn!(conn, %err, "registration rejected");
                let _ = reply.send(Err(err));
            }
        }
    }

    /// Remove a connection and its agent. Safe to call repeatedly and at
    /// any point relative to the tick cycle.
    fn disconnect(&mut self, conn: ConnectionId) {
        if let Some(client) = self.clients.remove(&conn) {
            self.sim.remove_agent(client.agent_id);
            tracing::info!(conn, agent = client.agent_id, "connection unbound");
        }
    }

    /// One tick cycle: drain, apply, advance, reply, broadcast.
    fn run_tick(&mut self) {
        let actions = std::mem::take(&mut self.pending);
        let mut outcomes: Vec<(ConnectionId, &'static str, bool)> = Vec::new();

        for (conn, command) in actions {
            let Some(client) = self.clients.get(&conn) else {
                continue;
            };
            let agent_id = client.agent_id;
            match self.sim.apply_command(agent_id, command.to_command()) {
                Ok(success) => outcomes.push((conn, command.name(), success)),
                Err(err) => {
                    // Unknown agent or invariant violation: reject the
                    // mutation and tell the client, keep the loop alive.
                    tracing::error!(conn, agent = agent_id, %err, "command rejected");
                    self.send_to(conn, ServerMessage::error(format!("Action failed: {err}")));
                }
            }
        }

        let events = self.sim.tick();
        if !events.spawned.is_empty() {
            tracing::info!(
                tick = self.sim.summary().tick,
                spawned = events.spawned.len(),
                "resource spawn event"
            );
        }

        let mut failed: Vec<ConnectionId> = Vec::new();
        for (conn, action, success) in outcomes {
            let delivered = self.send_to(conn, ServerMessage::action_confirmed(action, success))
                && self.send_game_state(conn);
            if !delivered {
                failed.push(conn);
            }
        }

        let connected: Vec<ConnectionId> = self.clients.keys().copied().collect();
        for conn in connected {
            if !self.send_game_state(conn) {
                failed.push(conn);
            }
        }

        failed.sort_unstable();
        failed.dedup();
        for conn in failed {
            tracing::warn!(conn, "dropping connection after failed send");
            self.disconnect(conn);
        }

        let _ = self.summary_tx.send(self.sim.summary());
    }

    /// Send a personalized snapshot to one connection.
    fn send_game_state(&self, conn: ConnectionId) -> bool {
        let Some(client) = self.clients.get(&conn) else {
            return false;
        };
        let Some(snapshot) = self.sim.agent_snapshot(client.agent_id) else {
            // Registered connection without a live agent: treat as a dead
            // client so the inconsistency cannot linger.
            tracing::error!(conn, agent = client.agent_id, "registered agent missing from world");
            return false;
        };
        client
            .outbound
            .send(ServerMessage::game_state(self.sim.summary(), &snapshot))
            .is_ok()
    }

    fn send_to(&self, conn: ConnectionId, message: ServerMessage) -> bool {
        self.clients
            .get(&conn)
            .is_some_and(|client| client.outbound.send(message).is_ok())
    }
}
