//! Test fixtures and helpers.
//!
//! Pre-built worlds and simulations for consistent testing.

use arena_core::components::{Inventory, Position, ResourceKind};
use arena_core::config::SimulationConfig;
use arena_core::simulation::Simulation;

/// A 5x5 simulation with a fixed seed and no automatic spawning for a
/// long while (spawn interval pushed far out so tests control the world).
#[must_use]
pub fn quiet_sim_5x5() -> Simulation {
    Simulation::new(
        SimulationConfig::default()
            .with_dimensions(5, 5)
            .with_seed(7)
            .with_spawn_interval(1_000_000),
    )
}

/// A simulation with one registered agent, returning both.
#[must_use]
pub fn sim_with_agent() -> (Simulation, u64) {
    let mut sim = quiet_sim_5x5();
    let agent = sim.register_agent().expect("fixture world has room");
    (sim, agent.id)
}

/// A simulation whose agent stands on a deposit of `kind` with `quantity`.
#[must_use]
pub fn sim_with_agent_on_deposit(kind: ResourceKind, quantity: u32) -> (Simulation, u64) {
    let mut sim = quiet_sim_5x5();
    let agent = sim.register_agent().expect("fixture world has room");
    sim.insert_resource(kind, quantity, agent.position)
        .expect("agent position is in bounds");
    (sim, agent.id)
}

/// An inventory holding the given ore and fuel counts.
#[must_use]
pub fn stocked_inventory(ore: u32, fuel: u32) -> Inventory {
    let mut inventory = Inventory::new();
    inventory.add(ResourceKind::Ore, ore);
    inventory.add(ResourceKind::Fuel, fuel);
    inventory
}

/// The center cell of a width x height world, matching the registration
/// spawn policy.
#[must_use]
pub fn center_of(width: u32, height: u32) -> Position {
    Position::new((width / 2) as i32, (height / 2) as i32)
}
