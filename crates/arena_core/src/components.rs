//! Core data types for the simulation world.
//!
//! Components are pure data with no behavior beyond their own bookkeeping.
//! Entities are a tagged union with per-kind payload; capability checks are
//! exhaustive pattern matches over the variant.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for entities.
///
/// Allocated by the world from a monotonic counter and never reused
/// for the lifetime of a world.
pub type EntityId = u64;

// ============================================================================
// Position
// ============================================================================

/// Integer coordinate pair on the world grid.
///
/// A position is valid for a given world iff `0 <= x < width` and
/// `0 <= y < height`; validity is checked by the world, not here.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct Position {
    /// X coordinate (column).
    pub x: i32,
    /// Y coordinate (row).
    pub y: i32,
}

impl Position {
    /// Create a new position.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The position displaced by `(dx, dy)`.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Chebyshev (chessboard) distance to another position.
    ///
    /// This is the metric used for neighborhood queries: all eight
    /// surrounding cells are at distance 1.
    #[must_use]
    pub const fn chebyshev_distance(self, other: Self) -> i32 {
        let dx = (self.x - other.x).abs();
        let dy = (self.y - other.y).abs();
        if dx > dy {
            dx
        } else {
            dy
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// ============================================================================
// Resources and inventories
// ============================================================================

/// Kind of resource.
///
/// Serialized in upper case (`"ORE"`, `"FUEL"`, `"COMPONENTS"`) everywhere,
/// including inventory keys on the wire.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResourceKind {
    /// Raw ore, harvested from deposits.
    Ore,
    /// Fuel, harvested from deposits.
    Fuel,
    /// Crafted components; never spawned, only produced by crafting.
    Components,
}

impl ResourceKind {
    /// The kinds that spawn naturally and can be harvested.
    pub const HARVESTABLE: [Self; 2] = [Self::Ore, Self::Fuel];

    /// Upper-case name, matching the serialized form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ore => "ORE",
            Self::Fuel => "FUEL",
            Self::Components => "COMPONENTS",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mapping from resource kind to a non-negative count.
///
/// An absent key means a count of zero; counts that reach zero are pruned
/// so the map never carries empty entries. Serializes as a plain map
/// (`{"ORE": 5, "FUEL": 2}`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Inventory {
    counts: BTreeMap<ResourceKind, u32>,
}

impl Inventory {
    /// Create an empty inventory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count of a given kind; zero when absent.
    #[must_use]
    pub fn count(&self, kind: ResourceKind) -> u32 {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    /// Add `quantity` of `kind`.
    pub fn add(&mut self, kind: ResourceKind, quantity: u32) {
        if quantity == 0 {
            return;
        }
        let count = self.counts.entry(kind).or_insert(0);
        *count = count.saturating_add(quantity);
    }

    /// Remove up to `quantity` of `kind`, clamped to what is available.
    ///
    /// Returns the amount actually removed. A count that reaches zero is
    /// pruned from the map.
    pub fn remove(&mut self, kind: ResourceKind, quantity: u32) -> u32 {
        let Some(count) = self.counts.get_mut(&kind) else {
            return 0;
        };
        let removed = quantity.min(*count);
        *count -= removed;
        if *count == 0 {
            self.counts.remove(&kind);
        }
        removed
    }

    /// Whether the inventory holds nothing at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Iterate over held kinds and their counts, in kind order.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceKind, u32)> + '_ {
        self.counts.iter().map(|(kind, count)| (*kind, *count))
    }
}

// ============================================================================
// Entities
// ============================================================================

/// An entity's payload: what occupies a cell.
///
/// Positions are intentionally *not* stored here - the world's position
/// index is the single source of truth for "where is X", so mutating a
/// payload can never desynchronize the spatial index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Entity {
    /// A harvestable, depletable deposit.
    Resource {
        /// What the deposit yields.
        kind: ResourceKind,
        /// Remaining quantity; the world removes the deposit when a
        /// harvest observes zero.
        quantity: u32,
    },
    /// A connection-bound, client-controlled entity.
    Agent {
        /// Display name, assigned at registration.
        name: String,
        /// Resources the agent is carrying.
        inventory: Inventory,
    },
}

impl Entity {
    /// Whether this entity is an agent.
    #[must_use]
    pub const fn is_agent(&self) -> bool {
        matches!(self, Self::Agent { .. })
    }

    /// Whether this entity is a resource deposit.
    #[must_use]
    pub const fn is_resource(&self) -> bool {
        matches!(self, Self::Resource { .. })
    }
}

// ============================================================================
// Commands
// ============================================================================

/// A queued client action awaiting application by the pipeline.
///
/// Commands mutate the world only through
/// [`Simulation::apply_command`](crate::simulation::Simulation::apply_command);
/// a rejected command is a policy failure (`Ok(false)`), not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Relocate the agent by a relative offset.
    Move {
        /// Column delta, typically -1/0/1.
        dx: i32,
        /// Row delta, typically -1/0/1.
        dy: i32,
    },
    /// Harvest from a deposit in the agent's cell.
    Harvest,
    /// Craft one batch of components from carried materials.
    Craft,
}

impl Command {
    /// Wire-level action name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Move { .. } => "move",
            Self::Harvest => "harvest",
            Self::Craft => "craft",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_offset_and_distance() {
        let origin = Position::new(2, 3);
        assert_eq!(origin.offset(1, -1), Position::new(3, 2));
        assert_eq!(origin.chebyshev_distance(Position::new(4, 4)), 2);
        assert_eq!(origin.chebyshev_distance(origin), 0);
    }

    #[test]
    fn test_resource_kind_serializes_upper_case() {
        let json = serde_json::to_string(&ResourceKind::Ore).unwrap();
        assert_eq!(json, r#""ORE""#);
        let kind: ResourceKind = serde_json::from_str(r#""COMPONENTS""#).unwrap();
        assert_eq!(kind, ResourceKind::Components);
    }

    #[test]
    fn test_inventory_absent_key_is_zero() {
        let inventory = Inventory::new();
        assert_eq!(inventory.count(ResourceKind::Ore), 0);
        assert!(inventory.is_empty());
    }

    #[test]
    fn test_inventory_add_and_remove() {
        let mut inventory = Inventory::new();
        inventory.add(ResourceKind::Ore, 10);
        assert_eq!(inventory.count(ResourceKind::Ore), 10);

        let removed = inventory.remove(ResourceKind::Ore, 4);
        assert_eq!(removed, 4);
        assert_eq!(inventory.count(ResourceKind::Ore), 6);
    }

    #[test]
    fn test_inventory_removal_clamped_and_pruned() {
        let mut inventory = Inventory::new();
        inventory.add(ResourceKind::Fuel, 3);

        // Removing more than held is clamped, never negative.
        let removed = inventory.remove(ResourceKind::Fuel, 100);
        assert_eq!(removed, 3);
        assert_eq!(inventory.count(ResourceKind::Fuel), 0);

        // The zeroed entry is pruned.
        assert!(inventory.is_empty());
        assert_eq!(inventory.remove(ResourceKind::Fuel, 1), 0);
    }

    #[test]
    fn test_inventory_serializes_as_plain_map() {
        let mut inventory = Inventory::new();
        inventory.add(ResourceKind::Ore, 5);
        inventory.add(ResourceKind::Fuel, 2);

        let json = serde_json::to_string(&inventory).unwrap();
        assert_eq!(json, r#"{"ORE":5,"FUEL":2}"#);
    }

    #[test]
    fn test_command_names() {
        assert_eq!(Command::Move { dx: 1, dy: 0 }.name(), "move");
        assert_eq!(Command::Harvest.name(), "harvest");
        assert_eq!(Command::Craft.name(), "craft");
    }
}
