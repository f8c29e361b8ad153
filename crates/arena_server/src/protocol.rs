//! JSON wire protocol for client connections.
//!
//! Messages travel as JSON lines (one JSON object per line) over a
//! persistent TCP connection.
//!
//! # Protocol Flow
//!
//! 1. Server accepts the connection, registers an agent, and sends
//!    `{"type":"connection_established","agent_id":N}`
//! 2. The client sends commands as JSON lines
//! 3. At each tick the server applies queued commands; for each one the
//!    issuing client receives an `action_confirmed` followed by a
//!    `game_state`, and every client then receives a `game_state`
//!    broadcast reflecting the post-tick world
//! 4. Malformed or unknown input yields `{"type":"error","message":...}`
//!    to the offending client only
//!
//! # Example Session
//!
//! ```text
//! <- {"type":"connection_established","agent_id":1}
//! -> {"action":"move","params":{"dx":1,"dy":0}}
//! <- {"type":"action_confirmed","action":"move","success":true}
//! <- {"type":"game_state","tick":3,"agent_state":{...},"world_info":{...}}
//! -> {"action":"harvest","params":{}}
//! <- {"type":"action_confirmed","action":"harvest","success":false}
//! <- {"type":"game_state","tick":4,...}
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use arena_core::components::{Command, EntityId, Inventory};
use arena_core::simulation::{AgentSnapshot, WorldSummary};

// ============================================================================
// Input Commands (client -> server)
// ============================================================================

/// Commands a client may submit.
///
/// The wire shape is `{"action": <name>, "params": {...}}`; `move` takes
/// `dx`/`dy` deltas (defaulting to 0), `harvest` and `craft` take empty
/// params.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "params", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Move the agent by a relative offset.
    Move {
        /// Column delta, typically -1/0/1.
        #[serde(default)]
        dx: i32,
        /// Row delta, typically -1/0/1.
        #[serde(default)]
        dy: i32,
    },
    /// Harvest from a deposit in the agent's cell.
    Harvest {},
    /// Craft components from carried materials.
    Craft {},
}

impl ClientCommand {
    /// Every action name the protocol understands.
    pub const KNOWN_ACTIONS: [&'static str; 3] = ["move", "harvest", "craft"];

    /// Wire-level action name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Move { .. } => "move",
            Self::Harvest {} => "harvest",
            Self::Craft {} => "craft",
        }
    }

    /// The simulation command this wire command maps to.
    #[must_use]
    pub const fn to_command(self) -> Command {
        match self {
            Self::Move { dx, dy } => Command::Move { dx, dy },
            Self::Harvest {} => Command::Harvest,
            Self::Craft {} => Command::Craft,
        }
    }
}

/// Why a client line could not be turned into a command.
///
/// Protocol errors are reported to the offending client only and never
/// mutate the world.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The line is not valid JSON.
    #[error("Invalid JSON format")]
    InvalidJson,
    /// The object carries no string `action` field.
    #[error("Missing action field")]
    MissingAction,
    /// The action name is not one the server understands.
    #[error("Unknown action: {0}")]
    UnknownAction(String),
    /// A known action with params of the wrong shape.
    #[error("Invalid parameters for action: {0}")]
    InvalidParams(String),
}

/// Parse one client line into a command, classifying failures.
///
/// # Errors
///
/// Returns a [`ProtocolError`] distinguishing malformed JSON, a missing or
/// unknown action name, and malformed params for a known action.
pub fn parse_client_command(line: &str) -> Result<ClientCommand, ProtocolError> {
    let value: serde_json::Value =
        serde_json::from_str(line).map_err(|_| ProtocolError::InvalidJson)?;
    let Some(action) = value.get("action").and_then(serde_json::Value::as_str) else {
        return Err(ProtocolError::MissingAction);
    };
    if !ClientCommand::KNOWN_ACTIONS.contains(&action) {
        return Err(ProtocolError::UnknownAction(action.to_string()));
    }
    let action = action.to_string();
    serde_json::from_value(value).map_err(|_| ProtocolError::InvalidParams(action))
}

// ============================================================================
// Output Messages (server -> client)
// ============================================================================

/// An agent's personalized view of itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentState {
    /// The agent's entity id.
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
    /// Carried resources, keyed by upper-case kind.
    pub inventory: Inventory,
}

/// Shared world counters included with every snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldInfo {
    /// World dimensions as `[width, height]`.
    pub dimensions: (u32, u32),
    /// Total entities of any kind.
    pub total_entities: usize,
    /// Number of agents.
    pub total_agents: usize,
    /// Number of resource deposits.
    pub total_resources: usize,
}

impl From<WorldSummary> for WorldInfo {
    fn from(summary: WorldSummary) -> Self {
        Self {
            dimensions: summary.dimensions,
            total_entities: summary.total_entities,
            total_agents: summary.total_agents,
            total_resources: summary.total_resources,
        }
    }
}

/// Messages the server sends to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent once, immediately after registration.
    ConnectionEstablished {
        /// Id of the agent bound to this connection.
        agent_id: EntityId,
    },
    /// Acknowledges one applied action.
    ActionConfirmed {
        /// Wire-level action name.
        action: String,
        /// Whether the action succeeded (policy failures are `false`).
        success: bool,
    },
    /// A personalized snapshot of the post-tick world.
    GameState {
        /// Current tick.
        tick: u64,
        /// This connection's own agent.
        agent_state: AgentState,
        /// Shared world counters.
        world_info: WorldInfo,
    },
    /// A protocol or processing error, for this client only.
    Error {
        /// Human-readable description.
        message: String,
    },
}

impl ServerMessage {
    /// Create an action acknowledgment.
    #[must_use]
    pub fn action_confirmed(action: &str, success: bool) -> Self {
        Self::ActionConfirmed {
            action: action.to_string(),
            success,
        }
    }

    /// Create a personalized game-state snapshot.
    #[must_use]
    pub fn game_state(summary: WorldSummary, agent: &AgentSnapshot) -> Self {
        Self::GameState {
            tick: summary.tick,
            agent_state: AgentState {
                id: agent.id,
                name: agent.name.clone(),
                x: agent.position.x,
                y: agent.position.y,
                inventory: agent.inventory.clone(),
            },
            world_info: summary.into(),
        }
    }

    /// Create an error message.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Serialize as one newline-terminated JSON line.
    #[must_use]
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                r#"{{"type":"error","message":"Serialization failed: {}"}}"#,
                e
            )
        });
        json.push('\n');
        json
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_core::components::{Position, ResourceKind};

    #[test]
    fn test_parse_move_command() {
        let command = parse_client_command(r#"{"action":"move","params":{"dx":1,"dy":0}}"#);
        assert_eq!(command, Ok(ClientCommand::Move { dx: 1, dy: 0 }));
    }

    #[test]
    fn test_parse_move_defaults_missing_deltas() {
        let command = parse_client_command(r#"{"action":"move","params":{"dx":1}}"#);
        assert_eq!(command, Ok(ClientCommand::Move { dx: 1, dy: 0 }));
    }

    #[test]
    fn test_parse_harvest_and_craft() {
        let harvest = parse_client_command(r#"{"action":"harvest","params":{}}"#);
        assert_eq!(harvest, Ok(ClientCommand::Harvest {}));
        let craft = parse_client_command(r#"{"action":"craft","params":{}}"#);
        assert_eq!(craft, Ok(ClientCommand::Craft {}));
    }

    #[test]
    fn test_parse_classifies_malformed_json() {
        assert_eq!(
            parse_client_command("not json at all"),
            Err(ProtocolError::InvalidJson)
        );
    }

    #[test]
    fn test_parse_classifies_unknown_action() {
        let error = parse_client_command(r#"{"action":"teleport","params":{}}"#);
        assert_eq!(error, Err(ProtocolError::UnknownAction("teleport".to_string())));
        assert_eq!(
            error.unwrap_err().to_string(),
            "Unknown action: teleport"
        );
    }

    #[test]
    fn test_parse_classifies_missing_action() {
        assert_eq!(
            parse_client_command(r#"{"params":{}}"#),
            Err(ProtocolError::MissingAction)
        );
    }

    #[test]
    fn test_parse_classifies_bad_params() {
        let error = parse_client_command(r#"{"action":"move","params":{"dx":"east"}}"#);
        assert_eq!(error, Err(ProtocolError::InvalidParams("move".to_string())));
    }

    #[test]
    fn test_connection_established_wire_shape() {
        let json = ServerMessage::ConnectionEstablished { agent_id: 7 }.to_json_line();
        assert_eq!(
            json,
            "{\"type\":\"connection_established\",\"agent_id\":7}\n"
        );
    }

    #[test]
    fn test_action_confirmed_wire_shape() {
        let json = ServerMessage::action_confirmed("move", true).to_json_line();
        assert_eq!(
            json,
            "{\"type\":\"action_confirmed\",\"action\":\"move\",\"success\":true}\n"
        );
    }

    #[test]
    fn test_error_wire_shape() {
        let json = ServerMessage::error("Invalid JSON format").to_json_line();
        assert_eq!(
            json,
            "{\"type\":\"error\",\"message\":\"Invalid JSON format\"}\n"
        );
    }

    #[test]
    fn test_game_state_wire_shape() {
        let mut inventory = Inventory::new();
        inventory.add(ResourceKind::Ore, 5);
        let agent = AgentSnapshot {
            id: 3,
            name: "RemoteAgent_1".to_string(),
            position: Position::new(4, 2),
            inventory,
        };
        let summary = WorldSummary {
            tick: 150,
            dimensions: (10, 10),
            total_entities: 12,
            total_agents: 1,
            total_resources: 11,
        };

        let json = ServerMessage::game_state(summary, &agent).to_json_line();
        assert!(json.contains(r#""type":"game_state""#));
        assert!(json.contains(r#""tick":150"#));
        assert!(json.contains(r#""agent_state":{"id":3,"name":"RemoteAgent_1","x":4,"y":2,"inventory":{"ORE":5}}"#));
        assert!(json.contains(r#""world_info":{"dimensions":[10,10],"total_entities":12,"total_agents":1,"total_resources":11}"#));
    }
}
