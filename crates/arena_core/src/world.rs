//! The spatial world: grid, entity registry, and position index.
//!
//! [`SpatialWorld`] owns three pieces of bookkeeping that must always agree:
//!
//! - the **grid**: one ordered set of entity ids per cell;
//! - the **registry**: entity id to payload;
//! - the **position index**: entity id to position, the single source of
//!   truth for "where is X".
//!
//! Every mutation goes through the methods here, which update all three
//! atomically. [`check_consistency`](SpatialWorld::check_consistency)
//! verifies the bidirectional invariant and is run after each tick in debug
//! builds.
//!
//! This module is pure data-structure logic: no I/O, no randomness, no
//! occupancy policy. Agent-vs-agent collision rules are enforced by the
//! caller so the world stays reusable by both agent movement and spawn
//! logic.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeSet, HashMap};
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::components::{Entity, EntityId, Position};
use crate::error::{Result, WorldError};

/// A 2D grid world with an entity registry and position index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpatialWorld {
    width: u32,
    height: u32,
    tick: u64,
    /// Row-major cells; each holds the ids located there, in ascending order.
    cells: Vec<BTreeSet<EntityId>>,
    entities: HashMap<EntityId, Entity>,
    positions: HashMap<EntityId, Position>,
    next_id: EntityId,
}

impl SpatialWorld {
    /// Create an empty world of the given dimensions.
    ///
    /// # Example
    ///
    /// ```
    /// use arena_core::world::SpatialWorld;
    ///
    /// let world = SpatialWorld::new(10, 10);
    /// assert_eq!(world.dimensions(), (10, 10));
    /// assert!(world.is_empty());
    /// ```
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        let cell_count = (width as usize) * (height as usize);
        Self {
            width,
            height,
            tick: 0,
            cells: vec![BTreeSet::new(); cell_count],
            entities: HashMap::new(),
            positions: HashMap::new(),
            next_id: 1,
        }
    }

    /// World width in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// World height in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// World dimensions as `(width, height)`.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Current tick number.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Advance the tick counter and return the new value.
    pub fn advance_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    /// Whether a position lies inside the grid.
    #[must_use]
    pub const fn in_bounds(&self, pos: Position) -> bool {
        pos.x >= 0 && (pos.x as u32) < self.width && pos.y >= 0 && (pos.y as u32) < self.height
    }

    /// Row-major cell index; caller must have bounds-checked `pos`.
    fn cell_index(&self, pos: Position) -> usize {
        (pos.y as usize) * (self.width as usize) + (pos.x as usize)
    }

    /// Place a new entity at `pos` and return its freshly allocated id.
    ///
    /// Ids are allocated internally, so a duplicate registration is
    /// unrepresentable.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::OutOfBounds`] if `pos` is outside the grid.
    pub fn spawn(&mut self, entity: Entity, pos: Position) -> Result<EntityId> {
        if !self.in_bounds(pos) {
            return Err(WorldError::OutOfBounds { x: pos.x, y: pos.y });
        }
        let id = self.next_id;
        self.next_id += 1;
        let index = self.cell_index(pos);
        self.cells[index].insert(id);
        self.entities.insert(id, entity);
        self.positions.insert(id, pos);
        Ok(id)
    }

    /// Remove an entity from the world, returning its payload.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::EntityNotFound`] for an unknown id.
    pub fn remove(&mut self, id: EntityId) -> Result<Entity> {
        let entity = self
            .entities
            .remove(&id)
            .ok_or(WorldError::EntityNotFound(id))?;
        if let Some(pos) = self.positions.remove(&id) {
            let index = self.cell_index(pos);
            self.cells[index].remove(&id);
        }
        Ok(entity)
    }

    /// Relocate an entity to `new_pos`, updating grid and index atomically.
    ///
    /// Occupancy-agnostic: any cell contents are allowed. Callers enforce
    /// the at-most-one-agent rule before moving agents.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::OutOfBounds`] if `new_pos` is outside the grid,
    /// or [`WorldError::EntityNotFound`] for an unknown id.
    pub fn move_entity(&mut self, id: EntityId, new_pos: Position) -> Result<()> {
        if !self.in_bounds(new_pos) {
            return Err(WorldError::OutOfBounds {
                x: new_pos.x,
                y: new_pos.y,
            });
        }
        let old_pos = *self
            .positions
            .get(&id)
            .ok_or(WorldError::EntityNotFound(id))?;
        let old_index = self.cell_index(old_pos);
        let new_index = self.cell_index(new_pos);
        self.cells[old_index].remove(&id);
        self.cells[new_index].insert(id);
        self.positions.insert(id, new_pos);
        Ok(())
    }

    /// Snapshot of the ids at `pos`, in ascending id order.
    ///
    /// Returns a copy, never a live reference; empty for out-of-bounds
    /// positions.
    #[must_use]
    pub fn entities_at(&self, pos: Position) -> Vec<EntityId> {
        if !self.in_bounds(pos) {
            return Vec::new();
        }
        self.cells[self.cell_index(pos)].iter().copied().collect()
    }

    /// Ids of all entities within `radius` of `pos` (Chebyshev metric).
    #[must_use]
    pub fn entities_near(&self, pos: Position, radius: i32) -> Vec<EntityId> {
        let mut nearby = Vec::new();
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                nearby.extend(self.entities_at(pos.offset(dx, dy)));
            }
        }
        nearby
    }

    /// The agent occupying `pos`, if any.
    ///
    /// At most one agent can occupy a cell after a completed move, so a
    /// single id suffices.
    #[must_use]
    pub fn agent_at(&self, pos: Position) -> Option<EntityId> {
        self.entities_at(pos)
            .into_iter()
            .find(|id| self.entities.get(id).is_some_and(Entity::is_agent))
    }

    /// Ids of all agents, in ascending order. Linear scan of the registry.
    #[must_use]
    pub fn agent_ids(&self) -> Vec<EntityId> {
        self.ids_matching(Entity::is_agent)
    }

    /// Ids of all resource deposits, in ascending order. Linear scan.
    #[must_use]
    pub fn resource_ids(&self) -> Vec<EntityId> {
        self.ids_matching(Entity::is_resource)
    }

    fn ids_matching(&self, predicate: impl Fn(&Entity) -> bool) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self
            .entities
            .iter()
            .filter(|(_, entity)| predicate(entity))
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Get an entity's payload by id.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Get a mutable reference to an entity's payload.
    ///
    /// Payloads carry no position, so this cannot desynchronize the index.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Where an entity is, per the position index.
    #[must_use]
    pub fn position_of(&self, id: EntityId) -> Option<Position> {
        self.positions.get(&id).copied()
    }

    /// Number of entities in the world.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the world holds no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// All entity ids in ascending order, for deterministic iteration.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<_> = self.entities.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Verify the bidirectional grid/index invariant.
    ///
    /// Every registered entity must appear in exactly the cell its index
    /// entry names, and every cell member must have a matching index entry.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::IndexInconsistency`] describing the first
    /// disagreement found. A violation must be surfaced, never absorbed.
    pub fn check_consistency(&self) -> Result<()> {
        for (&id, &pos) in &self.positions {
            if !self.entities.contains_key(&id) {
                return Err(WorldError::IndexInconsistency {
                    entity: id,
                    detail: "indexed but not registered".to_string(),
                });
            }
            if !self.in_bounds(pos) {
                return Err(WorldError::IndexInconsistency {
                    entity: id,
                    detail: format!("indexed at out-of-bounds {pos}"),
                });
            }
            if !self.cells[self.cell_index(pos)].contains(&id) {
                return Err(WorldError::IndexInconsistency {
                    entity: id,
                    detail: format!("indexed at {pos} but absent from that cell"),
                });
            }
        }
        for (index, cell) in self.cells.iter().enumerate() {
            for &id in cell {
                let expected = self.positions.get(&id).copied();
                let actual = Position::new(
                    (index % self.width as usize) as i32,
                    (index / self.width as usize) as i32,
                );
                if expected != Some(actual) {
                    return Err(WorldError::IndexInconsistency {
                        entity: id,
                        detail: format!("present in cell {actual} but indexed at {expected:?}"),
                    });
                }
            }
        }
        if self.entities.len() != self.positions.len() {
            return Err(WorldError::IndexInconsistency {
                entity: 0,
                detail: format!(
                    "registry holds {} entities but index holds {}",
                    self.entities.len(),
                    self.positions.len()
                ),
            });
        }
        Ok(())
    }

    /// Deterministic digest of the world state.
    ///
    /// Two worlds with identical state produce identical hashes; used for
    /// diagnostics and determinism tests.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.tick.hash(&mut hasher);

        let ids = self.sorted_ids();
        ids.len().hash(&mut hasher);
        for id in ids {
            id.hash(&mut hasher);
            if let Some(pos) = self.positions.get(&id) {
                pos.hash(&mut hasher);
            }
            match self.entities.get(&id) {
                Some(Entity::Resource { kind, quantity }) => {
                    0u8.hash(&mut hasher);
                    kind.hash(&mut hasher);
                    quantity.hash(&mut hasher);
                }
                Some(Entity::Agent { name, inventory }) => {
                    1u8.hash(&mut hasher);
                    name.hash(&mut hasher);
                    for (kind, count) in inventory.iter() {
                        kind.hash(&mut hasher);
                        count.hash(&mut hasher);
                    }
                }
                None => {}
            }
        }
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Inventory, ResourceKind};

    fn ore(quantity: u32) -> Entity {
        Entity::Resource {
            kind: ResourceKind::Ore,
            quantity,
        }
    }

    fn agent(name: &str) -> Entity {
        Entity::Agent {
            name: name.to_string(),
            inventory: Inventory::new(),
        }
    }

    #[test]
    fn test_spawn_places_entity() {
        let mut world = SpatialWorld::new(5, 5);
        let id = world.spawn(ore(50), Position::new(2, 3)).unwrap();

        assert_eq!(world.position_of(id), Some(Position::new(2, 3)));
        assert_eq!(world.entities_at(Position::new(2, 3)), vec![id]);
        assert_eq!(world.len(), 1);
    }

    #[test]
    fn test_spawn_out_of_bounds_rejected() {
        let mut world = SpatialWorld::new(5, 5);
        let result = world.spawn(ore(50), Position::new(5, 0));
        assert!(matches!(result, Err(WorldError::OutOfBounds { x: 5, y: 0 })));
        assert!(world.is_empty());
    }

    #[test]
    fn test_remove_clears_all_bookkeeping() {
        let mut world = SpatialWorld::new(5, 5);
        let pos = Position::new(1, 1);
        let id = world.spawn(agent("A"), pos).unwrap();

        let removed = world.remove(id).unwrap();
        assert!(removed.is_agent());
        assert!(world.entities_at(pos).is_empty());
        assert_eq!(world.position_of(id), None);
        assert!(matches!(
            world.remove(id),
            Err(WorldError::EntityNotFound(_))
        ));
    }

    #[test]
    fn test_move_relocates_grid_and_index() {
        let mut world = SpatialWorld::new(5, 5);
        let id = world.spawn(agent("A"), Position::new(0, 0)).unwrap();

        world.move_entity(id, Position::new(4, 4)).unwrap();
        assert!(world.entities_at(Position::new(0, 0)).is_empty());
        assert_eq!(world.entities_at(Position::new(4, 4)), vec![id]);
        assert_eq!(world.position_of(id), Some(Position::new(4, 4)));
    }

    #[test]
    fn test_move_out_of_bounds_leaves_entity_in_place() {
        let mut world = SpatialWorld::new(5, 5);
        let id = world.spawn(agent("A"), Position::new(2, 2)).unwrap();

        let result = world.move_entity(id, Position::new(-1, 2));
        assert!(result.is_err());
        assert_eq!(world.position_of(id), Some(Position::new(2, 2)));
        world.check_consistency().unwrap();
    }

    #[test]
    fn test_entities_at_is_a_snapshot() {
        let mut world = SpatialWorld::new(5, 5);
        let pos = Position::new(2, 2);
        let id = world.spawn(ore(10), pos).unwrap();

        let snapshot = world.entities_at(pos);
        world.remove(id).unwrap();
        // The snapshot is unaffected by later mutation.
        assert_eq!(snapshot, vec![id]);
        assert!(world.entities_at(pos).is_empty());
    }

    #[test]
    fn test_entities_near_uses_chebyshev_radius() {
        let mut world = SpatialWorld::new(10, 10);
        let center = world.spawn(agent("A"), Position::new(5, 5)).unwrap();
        let diagonal = world.spawn(ore(5), Position::new(6, 6)).unwrap();
        let far = world.spawn(ore(5), Position::new(8, 5)).unwrap();

        let near = world.entities_near(Position::new(5, 5), 1);
        assert!(near.contains(&center));
        assert!(near.contains(&diagonal));
        assert!(!near.contains(&far));
    }

    #[test]
    fn test_entities_near_clips_at_world_edge() {
        let mut world = SpatialWorld::new(3, 3);
        let id = world.spawn(ore(5), Position::new(0, 0)).unwrap();
        let near = world.entities_near(Position::new(0, 0), 2);
        assert_eq!(near, vec![id]);
    }

    #[test]
    fn test_kind_queries() {
        let mut world = SpatialWorld::new(5, 5);
        let a = world.spawn(agent("A"), Position::new(0, 0)).unwrap();
        let r1 = world.spawn(ore(10), Position::new(1, 0)).unwrap();
        let r2 = world.spawn(ore(10), Position::new(2, 0)).unwrap();

        assert_eq!(world.agent_ids(), vec![a]);
        assert_eq!(world.resource_ids(), vec![r1, r2]);
        assert_eq!(world.agent_at(Position::new(0, 0)), Some(a));
        assert_eq!(world.agent_at(Position::new(1, 0)), None);
    }

    #[test]
    fn test_consistency_holds_after_mutation_sequence() {
        let mut world = SpatialWorld::new(4, 4);
        let a = world.spawn(agent("A"), Position::new(0, 0)).unwrap();
        let r = world.spawn(ore(10), Position::new(1, 1)).unwrap();
        world.move_entity(a, Position::new(1, 1)).unwrap();
        world.remove(r).unwrap();
        world.move_entity(a, Position::new(3, 3)).unwrap();

        world.check_consistency().unwrap();
        assert_eq!(world.entities_at(Position::new(1, 1)), Vec::<u64>::new());
    }

    #[test]
    fn test_state_hash_deterministic() {
        let build = || {
            let mut world = SpatialWorld::new(5, 5);
            world.spawn(ore(42), Position::new(1, 2)).unwrap();
            world.spawn(agent("A"), Position::new(3, 3)).unwrap();
            world.advance_tick();
            world
        };
        assert_eq!(build().state_hash(), build().state_hash());
    }

    #[test]
    fn test_state_hash_changes_with_state() {
        let mut world = SpatialWorld::new(5, 5);
        let before = world.state_hash();
        world.spawn(ore(1), Position::new(0, 0)).unwrap();
        assert_ne!(before, world.state_hash());
    }

    #[test]
    fn test_ids_are_never_reused() {
        let mut world = SpatialWorld::new(5, 5);
        let first = world.spawn(ore(1), Position::new(0, 0)).unwrap();
        world.remove(first).unwrap();
        let second = world.spawn(ore(1), Position::new(0, 0)).unwrap();
        assert_ne!(first, second);
    }
}
