//! Economic policy: periodic resource spawning and crafting.
//!
//! [`EconomicEngine`] is a policy layer over [`SpatialWorld`]: it owns no
//! entities, only the spawn cadence counter and a seeded deterministic RNG.
//! Crafting is stateless per call.
//!
//! All randomness is seeded; the core never touches system randomness.

use crate::components::{Entity, EntityId, Position, ResourceKind};
use crate::config::{CraftRecipe, SimulationConfig};
use crate::error::{Result, WorldError};
use crate::world::SpatialWorld;

/// Simple deterministic RNG for resource spawning.
struct SpawnRng {
    state: u64,
}

impl SpawnRng {
    fn new(seed: u64) -> Self {
        Self {
            state: seed.wrapping_add(0x9E37_79B9_7F4A_7C15),
        }
    }

    fn next(&mut self) -> u64 {
        self.state = self.state.wrapping_mul(0x5_DEEC_E66D).wrapping_add(11);
        self.state
    }

    /// Uniform draw in `[min, max)`. Returns `min` for an empty range.
    fn next_range(&mut self, min: u32, max: u32) -> u32 {
        let range = max.saturating_sub(min) as u64;
        if range == 0 {
            return min;
        }
        min + (self.next() % range) as u32
    }

    /// Uniform index into a slice of length `len` (which must be non-zero).
    fn next_index(&mut self, len: usize) -> usize {
        (self.next() % len as u64) as usize
    }
}

/// Manages economic activity: spawn cadence, deposit placement, crafting.
pub struct EconomicEngine {
    spawn_interval: u32,
    spawn_counter: u32,
    quantity_min: u32,
    quantity_max: u32,
    recipe: CraftRecipe,
    rng: SpawnRng,
}

impl EconomicEngine {
    /// Create an engine from the simulation configuration.
    #[must_use]
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            spawn_interval: config.spawn_interval,
            spawn_counter: 0,
            quantity_min: config.spawn_quantity_min,
            quantity_max: config.spawn_quantity_max,
            recipe: config.recipe,
            rng: SpawnRng::new(config.seed),
        }
    }

    /// Whether a spawn event is due.
    ///
    /// Calling this is itself the tick: the internal counter increments
    /// once per call and the method returns `true` (resetting the counter)
    /// every `spawn_interval` calls. It must be invoked exactly once per
    /// world tick.
    pub fn should_spawn_this_tick(&mut self) -> bool {
        self.spawn_counter += 1;
        if self.spawn_counter >= self.spawn_interval {
            self.spawn_counter = 0;
            return true;
        }
        false
    }

    /// Spawn new deposits on empty cells, up to `max_resources` total.
    ///
    /// No-op when the world already holds `max_resources` deposits.
    /// Otherwise draws cells uniformly without replacement from the
    /// currently empty cells (cells with zero entities of any kind), a kind
    /// uniformly from the harvestable kinds, and a quantity uniformly from
    /// the configured range. Returns the ids of the spawned deposits.
    ///
    /// Empty-cell enumeration is O(width * height) per call; that is the
    /// scaling limit of this policy and acceptable at the target world
    /// sizes of at most a few hundred cells.
    pub fn spawn_resources(
        &mut self,
        world: &mut SpatialWorld,
        max_resources: usize,
    ) -> Vec<EntityId> {
        let current = world.resource_ids().len();
        if current >= max_resources {
            return Vec::new();
        }

        let mut empty_cells: Vec<Position> = Vec::new();
        for y in 0..world.height() as i32 {
            for x in 0..world.width() as i32 {
                let pos = Position::new(x, y);
                if world.entities_at(pos).is_empty() {
                    empty_cells.push(pos);
                }
            }
        }

        let to_spawn = (max_resources - current).min(empty_cells.len());
        let mut spawned = Vec::with_capacity(to_spawn);
        for _ in 0..to_spawn {
            let pick = self.rng.next_index(empty_cells.len());
            let pos = empty_cells.swap_remove(pick);
            let kind =
                ResourceKind::HARVESTABLE[self.rng.next_index(ResourceKind::HARVESTABLE.len())];
            let quantity = self.rng.next_range(self.quantity_min, self.quantity_max + 1);
            match world.spawn(Entity::Resource { kind, quantity }, pos) {
                Ok(id) => {
                    tracing::debug!(deposit = id, %kind, quantity, %pos, "spawned resource");
                    spawned.push(id);
                }
                Err(err) => tracing::error!(%err, %pos, "resource spawn rejected"),
            }
        }
        spawned
    }

    /// Craft one batch of components from the agent's inventory.
    ///
    /// Succeeds iff the inventory covers the recipe; debits the materials
    /// and credits the components atomically. Insufficient materials are a
    /// policy failure (`Ok(false)`) with no mutation.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::EntityNotFound`] for an unknown id and
    /// [`WorldError::NotAnAgent`] if the entity is not an agent.
    pub fn craft_component(&self, world: &mut SpatialWorld, agent: EntityId) -> Result<bool> {
        let entity = world.get_mut(agent).ok_or(WorldError::EntityNotFound(agent))?;
        let Entity::Agent { inventory, .. } = entity else {
            return Err(WorldError::NotAnAgent(agent));
        };

        if inventory.count(ResourceKind::Ore) < self.recipe.ore
            || inventory.count(ResourceKind::Fuel) < self.recipe.fuel
        {
            return Ok(false);
        }

        inventory.remove(ResourceKind::Ore, self.recipe.ore);
        inventory.remove(ResourceKind::Fuel, self.recipe.fuel);
        inventory.add(ResourceKind::Components, self.recipe.components);
        Ok(true)
    }
}
