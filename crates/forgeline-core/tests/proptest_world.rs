//! Property-based tests for the Forgeline core world.
//!
//! Uses proptest to generate random command sequences and inventory
//! operations, then verify structural invariants hold.

use forgeline_core::building::{BuildingKind, SlotRole};
use forgeline_core::conveyor::LinkFacing;
use forgeline_core::id::{BuildingId, SegmentId};
use forgeline_core::math::Vec2;
use forgeline_core::player::{MoveIntent, PlayerInventory};
use forgeline_core::resource::ResourceKind;
use forgeline_core::slot::{InventorySlot, SLOT_CAPACITY};
use forgeline_core::spatial::{Direction, TilePos};
use forgeline_core::test_utils::*;
use forgeline_core::world::World;
use proptest::prelude::*;

// ===========================================================================
// Generators
// ===========================================================================

const DIRECTIONS: [Direction; 4] = [
    Direction::North,
    Direction::East,
    Direction::South,
    Direction::West,
];

/// World commands with index-based references, resolved modulo the live
/// entity lists at application time.
#[derive(Debug, Clone)]
enum WorldOp {
    SpawnNode(i32, i32, usize),
    PlaceBuilding(u8, i32, i32),
    BuildBuilding(usize),
    PlaceSegment(i8, i8, u8),
    BuildSegment(usize),
    Link(usize, usize, bool),
    Step(u8),
}

fn arb_op_sequence(max_ops: usize) -> impl Strategy<Value = Vec<WorldOp>> {
    proptest::collection::vec(
        prop_oneof![
            (-200..200i32, -200..200i32, 0..ResourceKind::ALL.len())
                .prop_map(|(x, y, k)| WorldOp::SpawnNode(x, y, k)),
            (0..3u8, -200..200i32, -200..200i32)
                .prop_map(|(b, x, y)| WorldOp::PlaceBuilding(b, x, y)),
            (0..50usize).prop_map(WorldOp::BuildBuilding),
            (any::<i8>(), any::<i8>(), 0..4u8)
                .prop_map(|(x, y, d)| WorldOp::PlaceSegment(x, y, d)),
            (0..50usize).prop_map(WorldOp::BuildSegment),
            (0..50usize, 0..50usize, any::<bool>()).prop_map(|(s, b, f)| WorldOp::Link(s, b, f)),
            (0..8u8).prop_map(WorldOp::Step),
        ],
        1..=max_ops,
    )
}

/// Apply an op sequence, resolving indices against the ids created so far.
fn apply_ops(world: &mut World, ops: &[WorldOp]) -> (Vec<BuildingId>, Vec<SegmentId>) {
    let mut buildings: Vec<BuildingId> = Vec::new();
    let mut segments: Vec<SegmentId> = Vec::new();

    for op in ops {
        match *op {
            WorldOp::SpawnNode(x, y, k) => {
                world.spawn_node(Vec2::from_int(x, y), ResourceKind::ALL[k]);
            }
            WorldOp::PlaceBuilding(b, x, y) => {
                let kind = match b % 3 {
                    0 => BuildingKind::Miner,
                    1 => BuildingKind::Smelter,
                    _ => BuildingKind::ArmsFactory,
                };
                buildings.push(world.place_building(kind, Vec2::from_int(x, y)));
            }
            WorldOp::BuildBuilding(idx) => {
                if !buildings.is_empty() {
                    let id = buildings[idx % buildings.len()];
                    world.build_building(id).unwrap();
                }
            }
            WorldOp::PlaceSegment(x, y, d) => {
                let dir = DIRECTIONS[(d as usize) % DIRECTIONS.len()];
                // Collisions on the small grid are expected; skip them.
                if let Ok(id) = world.place_segment(TilePos::new(i32::from(x), i32::from(y)), dir)
                {
                    segments.push(id);
                }
            }
            WorldOp::BuildSegment(idx) => {
                if !segments.is_empty() {
                    let id = segments[idx % segments.len()];
                    world.build_segment(id).unwrap();
                }
            }
            WorldOp::Link(s, b, input_facing) => {
                if !segments.is_empty() && !buildings.is_empty() {
                    let facing = if input_facing {
                        LinkFacing::Input
                    } else {
                        LinkFacing::Output
                    };
                    world
                        .link_segment(
                            segments[s % segments.len()],
                            buildings[b % buildings.len()],
                            facing,
                        )
                        .unwrap();
                }
            }
            WorldOp::Step(n) => {
                for _ in 0..n {
                    world.step();
                }
            }
        }
    }

    (buildings, segments)
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Command safety: any sequence of commands on a fresh world doesn't
    /// panic, and entity counts match what was placed.
    #[test]
    fn command_safety(ops in arb_op_sequence(60)) {
        let mut world = tick_world();
        let (buildings, segments) = apply_ops(&mut world, &ops);

        prop_assert_eq!(world.building_count(), buildings.len());
        prop_assert_eq!(world.segment_count(), segments.len());
        world.step();
    }

    /// Determinism: identical command histories produce identical state
    /// hashes, tick after tick.
    #[test]
    fn deterministic_replay(ops in arb_op_sequence(40)) {
        let mut world_a = tick_world();
        let mut world_b = tick_world();
        apply_ops(&mut world_a, &ops);
        apply_ops(&mut world_b, &ops);

        for _ in 0..20 {
            world_a.step();
            world_b.step();
            prop_assert_eq!(world_a.state_hash(), world_b.state_hash());
        }
    }

    /// Manual transfers conserve units: coal is never created or destroyed
    /// moving between the player and a fuel slot, even when transfers fail.
    #[test]
    fn transfers_conserve_coal(
        start in 1..=400u32,
        ops in proptest::collection::vec((any::<bool>(), 1..=120u32), 1..40),
    ) {
        let mut world = tick_world();
        let smelter = built_building(&mut world, BuildingKind::Smelter, Vec2::ZERO);
        stock_player(&mut world, ResourceKind::Coal, start);

        for (to_building, amount) in ops {
            if to_building {
                let _ = world.transfer_to_building(
                    smelter,
                    SlotRole::Fuel,
                    ResourceKind::Coal,
                    amount,
                );
            } else {
                let _ = world.transfer_from_building(smelter, SlotRole::Fuel, amount);
            }
            let total =
                player_total(&world, ResourceKind::Coal)
                    + slot_count(&world, smelter, SlotRole::Fuel);
            prop_assert_eq!(total, start);
        }
    }

    /// Slot invariant: the count never exceeds capacity, and a slot is
    /// empty exactly when it has no kind.
    #[test]
    fn slot_count_kind_invariant(
        ops in proptest::collection::vec(
            (any::<bool>(), 0..ResourceKind::ALL.len(), 0..150u32),
            1..60,
        ),
    ) {
        let mut slot = InventorySlot::empty();
        for (is_deposit, k, amount) in ops {
            if is_deposit {
                let _ = slot.deposit(ResourceKind::ALL[k], amount);
            } else {
                let _ = slot.withdraw(amount);
            }
            prop_assert!(slot.count() <= SLOT_CAPACITY);
            prop_assert_eq!(slot.count() == 0, slot.kind().is_none());
        }
    }

    /// Inventory deposits are all-or-nothing and agree with the advertised
    /// free capacity.
    #[test]
    fn deposit_succeeds_iff_capacity(
        prefill in proptest::collection::vec((0..ResourceKind::ALL.len(), 1..=99u32), 0..5),
        kind_idx in 0..ResourceKind::ALL.len(),
        amount in 1..=500u32,
    ) {
        let mut inventory = PlayerInventory::default();
        for (k, amt) in prefill {
            let _ = inventory.try_deposit(ResourceKind::ALL[k], amt);
        }

        let kind = ResourceKind::ALL[kind_idx];
        let free = inventory.free_capacity_for(kind);
        let before = inventory;
        let result = inventory.try_deposit(kind, amount);

        if amount <= free {
            prop_assert!(result.is_ok());
            prop_assert_eq!(inventory.total_of(kind), before.total_of(kind) + amount);
        } else {
            prop_assert!(result.is_err());
            prop_assert_eq!(inventory, before);
        }
    }

    /// Movement intents clamp to unit length no matter the raw axes.
    #[test]
    fn move_intent_always_clamped(x in any::<i8>(), y in any::<i8>()) {
        let intent = MoveIntent::new(x, y);
        let direction = intent.direction();
        prop_assert!(direction.length() <= fixed(1.001));
        prop_assert_eq!(intent.is_idle(), direction == Vec2::ZERO);
    }
}
