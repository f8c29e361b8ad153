//! Property tests for the grid/index invariant.
//!
//! For any sequence of add/move/remove operations, every entity's id must
//! appear in exactly the cell the position index names, and the registry,
//! index, and grid must agree in both directions.

use arena_core::components::{Entity, Inventory, Position, ResourceKind};
use arena_core::world::SpatialWorld;
use proptest::prelude::*;

/// One step of a randomized world workout.
#[derive(Debug, Clone, Copy)]
enum Op {
    SpawnResource { x: i32, y: i32, quantity: u32 },
    SpawnAgent { x: i32, y: i32 },
    Move { slot: usize, x: i32, y: i32 },
    Remove { slot: usize },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    // Coordinates deliberately overshoot the 8x8 grid so out-of-bounds
    // rejections are exercised alongside successful mutations.
    prop_oneof![
        (-2..10i32, -2..10i32, 1..200u32)
            .prop_map(|(x, y, quantity)| Op::SpawnResource { x, y, quantity }),
        (-2..10i32, -2..10i32).prop_map(|(x, y)| Op::SpawnAgent { x, y }),
        (0..32usize, -2..10i32, -2..10i32).prop_map(|(slot, x, y)| Op::Move { slot, x, y }),
        (0..32usize).prop_map(|slot| Op::Remove { slot }),
    ]
}

proptest! {
    #[test]
    fn grid_and_index_agree_after_any_op_sequence(ops in prop::collection::vec(op_strategy(), 1..64)) {
        let mut world = SpatialWorld::new(8, 8);
        let mut live: Vec<u64> = Vec::new();

        for op in ops {
            match op {
                Op::SpawnResource { x, y, quantity } => {
                    if let Ok(id) = world.spawn(
                        Entity::Resource { kind: ResourceKind::Ore, quantity },
                        Position::new(x, y),
                    ) {
                        live.push(id);
                    }
                }
                Op::SpawnAgent { x, y } => {
                    if let Ok(id) = world.spawn(
                        Entity::Agent { name: "P".to_string(), inventory: Inventory::new() },
                        Position::new(x, y),
                    ) {
                        live.push(id);
                    }
                }
                Op::Move { slot, x, y } => {
                    if let Some(&id) = live.get(slot % live.len().max(1)) {
                        let _ = world.move_entity(id, Position::new(x, y));
                    }
                }
                Op::Remove { slot } => {
                    if !live.is_empty() {
                        let id = live.swap_remove(slot % live.len());
                        world.remove(id).unwrap();
                    }
                }
            }

            world.check_consistency().unwrap();
            for &id in &live {
                let pos = world.position_of(id).unwrap();
                prop_assert!(world.entities_at(pos).contains(&id));
            }
        }
    }

    #[test]
    fn state_hash_is_a_pure_function_of_operations(ops in prop::collection::vec(op_strategy(), 1..32)) {
        let run = |ops: &[Op]| {
            let mut world = SpatialWorld::new(8, 8);
            let mut live: Vec<u64> = Vec::new();
            for op in ops {
                match *op {
                    Op::SpawnResource { x, y, quantity } => {
                        if let Ok(id) = world.spawn(
                            Entity::Resource { kind: ResourceKind::Fuel, quantity },
                            Position::new(x, y),
                        ) {
                            live.push(id);
                        }
                    }
                    Op::SpawnAgent { x, y } => {
                        if let Ok(id) = world.spawn(
                            Entity::Agent { name: "P".to_string(), inventory: Inventory::new() },
                            Position::new(x, y),
                        ) {
                            live.push(id);
                        }
                    }
                    Op::Move { slot, x, y } => {
                        if let Some(&id) = live.get(slot % live.len().max(1)) {
                            let _ = world.move_entity(id, Position::new(x, y));
                        }
                    }
                    Op::Remove { slot } => {
                        if !live.is_empty() {
                            let id = live.swap_remove(slot % live.len());
                            let _ = world.remove(id);
                        }
                    }
                }
            }
            world.state_hash()
        };

        prop_assert_eq!(run(&ops), run(&ops));
    }
}
