//! Lockstep guarantees: identical command histories produce identical state
//! hashes, and delta-time pacing is indistinguishable from pure tick
//! stepping as long as no backlog is discarded.

use forgeline_core::building::{BuildingKind, SlotRole};
use forgeline_core::conveyor::LinkFacing;
use forgeline_core::event::EventKind;
use forgeline_core::fixed::Fixed64;
use forgeline_core::math::Vec2;
use forgeline_core::player::{InputSnapshot, MoveIntent};
use forgeline_core::resource::ResourceKind;
use forgeline_core::sim::{AdvanceResult, SimulationStrategy, TICK_MS};
use forgeline_core::spatial::{Direction, TilePos};
use forgeline_core::test_utils::*;
use forgeline_core::world::World;
use forgeline_defense::{DefenseModule, default_hostile_speed, default_turret_range};

/// One fixed scenario applied to a fresh world: a fueled smelting line, a
/// defense module with a camper in the player's path, and a held move-south
/// input. Every test below replays exactly this history.
fn scripted_world(strategy: SimulationStrategy) -> World {
    let mut world = World::new(strategy);

    let miner = built_miner_on_node(&mut world, ResourceKind::Iron, Vec2::from_int(0, 0));
    let belt = belt_line(&mut world, TilePos::new(1, 0), Direction::East, 2);
    let smelter = built_building(&mut world, BuildingKind::Smelter, Vec2::from_int(96, 0));
    world.link_segment(belt[0], miner, LinkFacing::Output).unwrap();
    world.link_segment(belt[1], smelter, LinkFacing::Input).unwrap();
    stock_slot(&mut world, smelter, SlotRole::Fuel, ResourceKind::Coal, 10);

    let mut defense = DefenseModule::new();
    defense.add_turret(Vec2::from_int(-40, 0), default_turret_range()).unwrap();
    defense.spawn_hostile(Vec2::from_int(-200, 0), default_hostile_speed()).unwrap();
    // Parked in the avatar's lane: the walk south grazes it, so contact
    // damage ends up in the state hash.
    defense.spawn_hostile(Vec2::from_int(0, 90), Fixed64::ZERO).unwrap();
    world.register_module(Box::new(defense));

    world.apply_input(InputSnapshot { movement: MoveIntent::new(0, 1), mine_pressed: false });
    world
}

#[test]
fn identical_histories_identical_hashes() {
    let mut a = scripted_world(SimulationStrategy::Tick);
    let mut b = scripted_world(SimulationStrategy::Tick);

    for _ in 0..200 {
        a.step();
        b.step();
        assert_eq!(a.state_hash(), b.state_hash(), "diverged at tick {}", a.tick());
    }
    assert!(a.player().damage_taken() > 0, "the scripted walk must graze the camper");
    assert_eq!(
        a.events().total_emitted(EventKind::CycleCompleted),
        b.events().total_emitted(EventKind::CycleCompleted)
    );

    // One world drops the held input; the histories are no longer the same
    // and the hashes say so immediately.
    b.apply_input(InputSnapshot::default());
    a.step();
    b.step();
    assert_ne!(a.state_hash(), b.state_hash());
}

#[test]
fn frame_pacing_does_not_change_the_simulation() {
    let mut ticked = scripted_world(SimulationStrategy::Tick);
    for _ in 0..100 {
        ticked.step();
    }

    // Steady 100 ms frames.
    let mut steady = scripted_world(SimulationStrategy::Delta { max_steps_per_advance: 8 });
    for _ in 0..50 {
        let result = steady.advance(2 * TICK_MS);
        assert_eq!(result.steps_run, 2);
        assert_eq!(result.discarded_ms, 0);
    }

    // Ragged frames, same 5000 ms total, never past the catch-up bound.
    let mut ragged = scripted_world(SimulationStrategy::Delta { max_steps_per_advance: 8 });
    let frames =
        [350, 30, 120, 250, 250, 400, 100, 400, 400, 400, 400, 400, 400, 400, 400, 300u64];
    assert_eq!(frames.iter().sum::<u64>(), 5000);
    let mut steps = 0;
    for frame in frames {
        let result = ragged.advance(frame);
        assert_eq!(result.discarded_ms, 0);
        steps += result.steps_run;
    }
    assert_eq!(steps, 100, "sub-tick remainders carry, they are never lost");

    assert_eq!(ticked.tick(), 100);
    assert_eq!(steady.tick(), 100);
    assert_eq!(ragged.tick(), 100);
    assert_eq!(ticked.state_hash(), steady.state_hash());
    assert_eq!(ticked.state_hash(), ragged.state_hash());
}

#[test]
fn catch_up_bound_discards_whole_tick_backlog() {
    let mut world = scripted_world(SimulationStrategy::Delta { max_steps_per_advance: 4 });

    // A one-second stall owes 20 ticks; only 4 run and the 16-tick backlog
    // is dropped on the floor rather than replayed.
    let result = world.advance(1000);
    assert_eq!(result.steps_run, 4);
    assert_eq!(result.discarded_ms, 800);
    assert_eq!(world.tick(), 4);

    // Normal pacing resumes cleanly afterwards.
    let result = world.advance(TICK_MS);
    assert_eq!(result, AdvanceResult { steps_run: 1, discarded_ms: 0 });
    assert_eq!(world.tick(), 5);

    // Sub-tick remainders below the bound are kept, not discarded.
    let result = world.advance(75);
    assert_eq!(result, AdvanceResult { steps_run: 1, discarded_ms: 0 });
    let result = world.advance(25);
    assert_eq!(result, AdvanceResult { steps_run: 1, discarded_ms: 0 });
    assert_eq!(world.tick(), 7);

    // A paused world ignores elapsed time entirely.
    world.pause();
    assert_eq!(world.advance(500), AdvanceResult::default());
    assert_eq!(world.tick(), 7);
    world.resume();
    let result = world.advance(TICK_MS);
    assert_eq!(result.steps_run, 1);
    assert_eq!(world.tick(), 8);
}
