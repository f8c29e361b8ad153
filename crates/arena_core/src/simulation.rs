//! The simulation facade: agent lifecycle, action application, tick step.
//!
//! [`Simulation`] owns the [`SpatialWorld`] and the [`EconomicEngine`] and
//! is the only way the serving layer mutates either. All operations are
//! deterministic; the caller (a single pipeline task) provides mutual
//! exclusion by ownership.
//!
//! # Action semantics
//!
//! Policy failures - a blocked move, a harvest that finds nothing, a craft
//! without materials - are normal outcomes reported as `Ok(false)`. Errors
//! are reserved for unknown ids, non-agent targets, and invariant
//! violations.

use serde::{Deserialize, Serialize};

use crate::components::{Command, Entity, EntityId, Inventory, Position, ResourceKind};
use crate::config::SimulationConfig;
use crate::economy::EconomicEngine;
use crate::error::{Result, WorldError};
use crate::world::SpatialWorld;

/// A registered agent, as handed back to the serving layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    /// The agent's entity id.
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// Current position.
    pub position: Position,
    /// Carried resources.
    pub inventory: Inventory,
}

/// Shared world counters for broadcasts and the status page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldSummary {
    /// Current tick.
    pub tick: u64,
    /// World dimensions as `(width, height)`.
    pub dimensions: (u32, u32),
    /// Total entities of any kind.
    pub total_entities: usize,
    /// Number of agents.
    pub total_agents: usize,
    /// Number of resource deposits.
    pub total_resources: usize,
}

/// Events generated during a tick.
#[derive(Debug, Clone, Default)]
pub struct TickEvents {
    /// Deposits spawned by the economy this tick.
    pub spawned: Vec<EntityId>,
}

/// The authoritative world simulation.
pub struct Simulation {
    world: SpatialWorld,
    economy: EconomicEngine,
    config: SimulationConfig,
    /// Registration counter, used for agent naming.
    agents_registered: u64,
}

impl Simulation {
    /// Create a simulation from a validated configuration.
    ///
    /// # Example
    ///
    /// ```
    /// use arena_core::config::SimulationConfig;
    /// use arena_core::simulation::Simulation;
    ///
    /// let sim = Simulation::new(SimulationConfig::default());
    /// assert_eq!(sim.summary().tick, 0);
    /// ```
    #[must_use]
    pub fn new(config: SimulationConfig) -> Self {
        let world = SpatialWorld::new(config.width, config.height);
        let economy = EconomicEngine::new(&config);
        Self {
            world,
            economy,
            config,
            agents_registered: 0,
        }
    }

    /// Read access to the world.
    #[must_use]
    pub fn world(&self) -> &SpatialWorld {
        &self.world
    }

    /// Direct mutable access to the world, for world initialization and
    /// tests. Live traffic mutates only through the methods below.
    pub fn world_mut(&mut self) -> &mut SpatialWorld {
        &mut self.world
    }

    /// Place a resource deposit, as part of world initialization.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::OutOfBounds`] if `pos` is outside the grid.
    pub fn insert_resource(
        &mut self,
        kind: ResourceKind,
        quantity: u32,
        pos: Position,
    ) -> Result<EntityId> {
        self.world.spawn(Entity::Resource { kind, quantity }, pos)
    }

    /// Register a new agent for a connection.
    ///
    /// The preferred spawn is the world's center cell. If that cell already
    /// holds an agent, the nearest agent-free cell by Chebyshev ring scan
    /// (ring, then row, then column order - deterministic) is used instead;
    /// co-location with resource deposits is allowed.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::NoSpawnAvailable`] when every cell already
    /// holds an agent.
    pub fn register_agent(&mut self) -> Result<AgentSnapshot> {
        let center = Position::new(
            (self.world.width() / 2) as i32,
            (self.world.height() / 2) as i32,
        );
        let spawn = self
            .find_spawn_cell(center)
            .ok_or(WorldError::NoSpawnAvailable)?;

        self.agents_registered += 1;
        let name = format!("RemoteAgent_{}", self.agents_registered);
        let id = self.world.spawn(
            Entity::Agent {
                name: name.clone(),
                inventory: Inventory::new(),
            },
            spawn,
        )?;
        tracing::info!(agent = id, %name, position = %spawn, "agent registered");

        Ok(AgentSnapshot {
            id,
            name,
            position: spawn,
            inventory: Inventory::new(),
        })
    }

    /// Nearest agent-free in-bounds cell to `center`, scanning outward ring
    /// by ring in a fixed order.
    fn find_spawn_cell(&self, center: Position) -> Option<Position> {
        let max_radius = self.world.width().max(self.world.height()) as i32;
        for radius in 0..=max_radius {
            for dy in -radius..=radius {
                for dx in -radius..=radius {
                    if dx.abs().max(dy.abs()) != radius {
                        continue;
                    }
                    let pos = center.offset(dx, dy);
                    if self.world.in_bounds(pos) && self.world.agent_at(pos).is_none() {
                        return Some(pos);
                    }
                }
            }
        }
        None
    }

    /// Remove a connection's agent from the world.
    ///
    /// Idempotent: removing an already-removed agent is a no-op. This must
    /// be the final operation associated with the connection; the id is
    /// never referenced afterwards.
    pub fn remove_agent(&mut self, id: EntityId) {
        match self.world.get(id) {
            Some(Entity::Agent { .. }) => {
                if let Ok(Entity::Agent { name, .. }) = self.world.remove(id) {
                    tracing::info!(agent = id, %name, "agent removed");
                }
            }
            Some(_) => tracing::warn!(entity = id, "remove_agent called on a non-agent"),
            None => {}
        }
    }

    /// Apply a queued command for an agent.
    ///
    /// Returns `Ok(true)` on success and `Ok(false)` for policy failures.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::EntityNotFound`] / [`WorldError::NotAnAgent`]
    /// for invalid targets; grid/index errors propagate unmodified.
    pub fn apply_command(&mut self, agent: EntityId, command: Command) -> Result<bool> {
        let entity = self.world.get(agent).ok_or(WorldError::EntityNotFound(agent))?;
        if !entity.is_agent() {
            return Err(WorldError::NotAnAgent(agent));
        }

        let success = match command {
            Command::Move { dx, dy } => self.apply_move(agent, dx, dy)?,
            Command::Harvest => self.apply_harvest(agent)?,
            Command::Craft => self.economy.craft_component(&mut self.world, agent)?,
        };
        tracing::debug!(agent, action = command.name(), success, "applied command");
        Ok(success)
    }

    /// Move the agent by `(dx, dy)`.
    ///
    /// Fails (as policy, not error) when the target is out of bounds or
    /// holds another agent. Resource deposits are not displaced; the agent
    /// simply shares their cell.
    fn apply_move(&mut self, agent: EntityId, dx: i32, dy: i32) -> Result<bool> {
        let position = self
            .world
            .position_of(agent)
            .ok_or(WorldError::EntityNotFound(agent))?;
        let target = position.offset(dx, dy);
        if !self.world.in_bounds(target) {
            return Ok(false);
        }
        if self
            .world
            .agent_at(target)
            .is_some_and(|occupant| occupant != agent)
        {
            return Ok(false);
        }
        self.world.move_entity(agent, target)?;
        Ok(true)
    }

    /// Harvest from a deposit in the agent's cell.
    ///
    /// Selection among multiple deposits is the lowest entity id - an
    /// implementation-defined but deterministic choice. Extracts up to the
    /// configured per-action cap, credits the agent, and removes the
    /// deposit once a harvest observes quantity zero. A deposit that was
    /// already empty is removed without crediting anything.
    fn apply_harvest(&mut self, agent: EntityId) -> Result<bool> {
        let position = self
            .world
            .position_of(agent)
            .ok_or(WorldError::EntityNotFound(agent))?;
        let deposit = self
            .world
            .entities_at(position)
            .into_iter()
            .find(|id| self.world.get(*id).is_some_and(Entity::is_resource));
        let Some(deposit) = deposit else {
            return Ok(false);
        };

        let Some(Entity::Resource { kind, quantity }) = self.world.get_mut(deposit) else {
            return Err(WorldError::EntityNotFound(deposit));
        };
        let kind = *kind;
        let harvested = (*quantity).min(self.config.harvest_cap);
        *quantity -= harvested;
        let depleted = *quantity == 0;

        if depleted {
            self.world.remove(deposit)?;
            tracing::debug!(deposit, %kind, "deposit depleted");
        }
        if harvested == 0 {
            return Ok(false);
        }
        if let Some(Entity::Agent { inventory, .. }) = self.world.get_mut(agent) {
            inventory.add(kind, harvested);
        }
        Ok(true)
    }

    /// Advance the simulation by one tick.
    ///
    /// Increments the tick counter, then consults the economy's spawn
    /// cadence exactly once and runs the spawn policy when due. The caller
    /// drains all queued actions before calling this.
    pub fn tick(&mut self) -> TickEvents {
        let mut events = TickEvents::default();
        let tick = self.world.advance_tick();

        if self.economy.should_spawn_this_tick() {
            events.spawned = self
                .economy
                .spawn_resources(&mut self.world, self.config.max_resources);
            if !events.spawned.is_empty() {
                tracing::debug!(tick, count = events.spawned.len(), "spawn event");
            }
        }

        #[cfg(debug_assertions)]
        if let Err(err) = self.world.check_consistency() {
            tracing::error!(tick, %err, "world invariant violated");
        }

        events
    }

    /// Shared world counters for broadcasts and the status page.
    #[must_use]
    pub fn summary(&self) -> WorldSummary {
        WorldSummary {
            tick: self.world.tick(),
            dimensions: self.world.dimensions(),
            total_entities: self.world.len(),
            total_agents: self.world.agent_ids().len(),
            total_resources: self.world.resource_ids().len(),
        }
    }

    /// Snapshot of an agent's state, if it is still in the world.
    #[must_use]
    pub fn agent_snapshot(&self, id: EntityId) -> Option<AgentSnapshot> {
        let position = self.world.position_of(id)?;
        match self.world.get(id) {
            Some(Entity::Agent { name, inventory }) => Some(AgentSnapshot {
                id,
                name: name.clone(),
                position,
                inventory: inventory.clone(),
            }),
            _ => None,
        }
    }
}
