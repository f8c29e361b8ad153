//! # Arena Core
//!
//! Deterministic shared-world simulation core for the grid arena server.
//!
//! This crate contains **only** deterministic logic:
//! - No networking or IO
//! - No system randomness (the spawn RNG is seeded from config)
//! - Consistent iteration order (sorted entity ids, ordered cell sets)
//!
//! This separation enables:
//! - A single-threaded serving pipeline that owns the world outright
//! - Headless and in-process testing of every action and policy
//! - Reproducible worlds from a seed
//!
//! ## Crate Structure
//!
//! - [`components`] - entity, inventory, position, and command types
//! - [`world`] - the spatial world: grid, registry, position index
//! - [`economy`] - resource spawning and crafting policy
//! - [`simulation`] - the facade the serving pipeline drives
//! - [`config`] - simulation configuration

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod components;
pub mod config;
pub mod economy;
pub mod error;
pub mod simulation;
pub mod world;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::components::{Command, Entity, EntityId, Inventory, Position, ResourceKind};
    pub use crate::config::{CraftRecipe, SimulationConfig};
    pub use crate::economy::EconomicEngine;
    pub use crate::error::{Result, WorldError};
    pub use crate::simulation::{AgentSnapshot, Simulation, TickEvents, WorldSummary};
    pub use crate::world::SpatialWorld;
}
