//! Error types for the world simulation.

use thiserror::Error;

use crate::components::EntityId;

/// Result type alias using [`WorldError`].
pub type Result<T> = std::result::Result<T, WorldError>;

/// Top-level error type for all world simulation errors.
#[derive(Debug, Error)]
pub enum WorldError {
    /// Position outside the world grid.
    #[error("Position ({x}, {y}) is out of bounds")]
    OutOfBounds {
        /// X coordinate of the rejected position.
        x: i32,
        /// Y coordinate of the rejected position.
        y: i32,
    },

    /// Invalid entity reference.
    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),

    /// Operation requires an agent but the entity is not one.
    #[error("Entity {0} is not an agent")]
    NotAnAgent(EntityId),

    /// No cell is available for a newly registered agent.
    #[error("No spawn cell available: every cell already holds an agent")]
    NoSpawnAvailable,

    /// The grid and the position index disagree.
    ///
    /// This is an invariant violation: the affected mutation must be
    /// rejected and the condition surfaced to an operator, never absorbed.
    #[error("Grid/index inconsistency for entity {entity}: {detail}")]
    IndexInconsistency {
        /// Entity whose bookkeeping disagrees.
        entity: EntityId,
        /// Human-readable description of the disagreement.
        detail: String,
    },

    /// Rejected configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
