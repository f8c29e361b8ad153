//! Simulation configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Result, WorldError};

/// The crafting recipe: materials consumed and components produced per craft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CraftRecipe {
    /// Ore debited per craft.
    pub ore: u32,
    /// Fuel debited per craft.
    pub fuel: u32,
    /// Components credited per craft.
    pub components: u32,
}

impl Default for CraftRecipe {
    fn default() -> Self {
        Self {
            ore: 1,
            fuel: 1,
            components: 1,
        }
    }
}

/// Configuration for a simulation world.
///
/// All fields have defaults, so configuration files may override any
/// subset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// World width in cells.
    pub width: u32,
    /// World height in cells.
    pub height: u32,
    /// Ticks between automatic resource-spawn events.
    pub spawn_interval: u32,
    /// Maximum number of resource deposits in the world at once.
    pub max_resources: usize,
    /// Maximum units harvested by a single harvest action.
    pub harvest_cap: u32,
    /// Minimum quantity of a freshly spawned deposit.
    pub spawn_quantity_min: u32,
    /// Maximum quantity of a freshly spawned deposit.
    pub spawn_quantity_max: u32,
    /// Crafting recipe.
    pub recipe: CraftRecipe,
    /// Seed for the deterministic spawn RNG.
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            width: 10,
            height: 10,
            spawn_interval: 10,
            max_resources: 50,
            harvest_cap: 10,
            spawn_quantity_min: 20,
            spawn_quantity_max: 100,
            recipe: CraftRecipe::default(),
            seed: 12345,
        }
    }
}

impl SimulationConfig {
    /// Set the world dimensions.
    #[must_use]
    pub const fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the RNG seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the spawn interval in ticks.
    #[must_use]
    pub const fn with_spawn_interval(mut self, ticks: u32) -> Self {
        self.spawn_interval = ticks;
        self
    }

    /// Set the resource cap.
    #[must_use]
    pub const fn with_max_resources(mut self, cap: usize) -> Self {
        self.max_resources = cap;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidConfig`] for zero dimensions, a zero
    /// spawn interval, or an inverted spawn quantity range.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(WorldError::InvalidConfig(format!(
                "world dimensions must be at least 1x1, got {}x{}",
                self.width, self.height
            )));
        }
        if self.spawn_interval == 0 {
            return Err(WorldError::InvalidConfig(
                "spawn_interval must be at least 1 tick".to_string(),
            ));
        }
        if self.spawn_quantity_min == 0 || self.spawn_quantity_min > self.spawn_quantity_max {
            return Err(WorldError::InvalidConfig(format!(
                "spawn quantity range [{}, {}] is empty or starts at zero",
                self.spawn_quantity_min, self.spawn_quantity_max
            )));
        }
        Ok(())
    }
}
