//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use slotmap::SlotMap;

use crate::building::{Building, BuildingKind, SlotRole};
use crate::conveyor::LinkFacing;
use crate::event::EventBus;
use crate::fixed::{Fixed64, Ticks};
use crate::id::{BuildingId, SegmentId};
use crate::math::Vec2;
use crate::module::ModuleContext;
use crate::player::Player;
use crate::resource::ResourceKind;
use crate::sim::SimulationStrategy;
use crate::spatial::{Direction, TILE_SIZE, TilePos};
use crate::world::World;

// ===========================================================================
// Fixed-point helper
// ===========================================================================

pub fn fixed(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

// ===========================================================================
// World constructors
// ===========================================================================

pub fn tick_world() -> World {
    World::new(SimulationStrategy::Tick)
}

// ===========================================================================
// Layout helpers
// ===========================================================================

/// Place and finish a building in one call.
pub fn built_building(world: &mut World, kind: BuildingKind, position: Vec2) -> BuildingId {
    let id = world.place_building(kind, position);
    world.build_building(id).unwrap();
    id
}

/// Spawn a node of `kind` and a built miner right on top of it.
pub fn built_miner_on_node(world: &mut World, kind: ResourceKind, position: Vec2) -> BuildingId {
    world.spawn_node(position, kind);
    built_building(world, BuildingKind::Miner, position)
}

/// A straight run of built segments starting at `start`, all facing
/// `direction`, each tile feeding the next.
pub fn belt_line(
    world: &mut World,
    start: TilePos,
    direction: Direction,
    length: usize,
) -> Vec<SegmentId> {
    let mut segments = Vec::with_capacity(length);
    let mut tile = start;
    for _ in 0..length {
        let id = world.place_segment(tile, direction).unwrap();
        world.build_segment(id).unwrap();
        segments.push(id);
        tile = tile.step(direction);
    }
    segments
}

// ===========================================================================
// Inventory helpers
// ===========================================================================

/// Put units straight into the player inventory.
pub fn stock_player(world: &mut World, kind: ResourceKind, amount: u32) {
    world
        .player_mut()
        .inventory_mut()
        .try_deposit(kind, amount)
        .unwrap();
}

/// Put units straight into a building slot, bypassing transfer rules.
pub fn stock_slot(
    world: &mut World,
    building: BuildingId,
    role: SlotRole,
    kind: ResourceKind,
    amount: u32,
) {
    world
        .building_mut(building)
        .unwrap()
        .slot_mut(role)
        .unwrap()
        .deposit(kind, amount)
        .unwrap();
}

/// Start a unit moving across a segment, as if just pulled.
pub fn start_unit(world: &mut World, segment: SegmentId, kind: ResourceKind) {
    world.segment_mut(segment).unwrap().begin_transport(kind);
}

// ===========================================================================
// Query helpers
// ===========================================================================

/// Count of units in a building slot; 0 when the slot does not exist.
pub fn slot_count(world: &World, building: BuildingId, role: SlotRole) -> u32 {
    world
        .building(building)
        .and_then(|b| b.slot(role))
        .map(|s| s.count())
        .unwrap_or(0)
}

/// Total units of `kind` across the player inventory.
pub fn player_total(world: &World, kind: ResourceKind) -> u32 {
    world.player().inventory().total_of(kind)
}

/// Step the world `n` times.
pub fn run_ticks(world: &mut World, n: u64) {
    for _ in 0..n {
        world.step();
    }
}

// ===========================================================================
// Factory builders (for integration tests and benchmarks)
// ===========================================================================

/// Handles to the pieces of a [`build_smelting_line`] layout.
pub struct SmeltingLine {
    pub world: World,
    pub miner: BuildingId,
    pub belt: Vec<SegmentId>,
    pub smelter: BuildingId,
}

/// An iron node with a bound miner, a belt of `belt_length` segments, and a
/// fueled smelter at the end. Both belt endpoints are linked.
pub fn build_smelting_line(belt_length: usize) -> SmeltingLine {
    assert!(belt_length >= 1);
    let mut world = tick_world();

    let miner = built_miner_on_node(&mut world, ResourceKind::Iron, Vec2::from_int(0, 0));
    let belt = belt_line(&mut world, TilePos::new(1, 0), Direction::East, belt_length);
    let smelter = built_building(
        &mut world,
        BuildingKind::Smelter,
        Vec2::from_int((belt_length as i32 + 1) * TILE_SIZE, 0),
    );

    world.link_segment(belt[0], miner, LinkFacing::Output).unwrap();
    world
        .link_segment(*belt.last().unwrap(), smelter, LinkFacing::Input)
        .unwrap();
    stock_slot(&mut world, smelter, SlotRole::Fuel, ResourceKind::Coal, 99);

    SmeltingLine {
        world,
        miner,
        belt,
        smelter,
    }
}

/// `rows` independent smelting lines stacked vertically, each with its own
/// node, miner, belt, and fueled smelter. Scales linearly for benchmarks.
pub fn build_factory_rows(rows: usize, belt_length: usize) -> World {
    assert!(belt_length >= 1);
    let mut world = tick_world();

    for r in 0..rows {
        let y = (r as i32) * 2;
        let miner =
            built_miner_on_node(&mut world, ResourceKind::Iron, Vec2::from_int(0, y * TILE_SIZE));
        let belt = belt_line(&mut world, TilePos::new(1, y), Direction::East, belt_length);
        let smelter = built_building(
            &mut world,
            BuildingKind::Smelter,
            Vec2::from_int((belt_length as i32 + 1) * TILE_SIZE, y * TILE_SIZE),
        );
        world.link_segment(belt[0], miner, LinkFacing::Output).unwrap();
        world
            .link_segment(*belt.last().unwrap(), smelter, LinkFacing::Input)
            .unwrap();
        stock_slot(&mut world, smelter, SlotRole::Fuel, ResourceKind::Coal, 99);
    }

    world
}

// ===========================================================================
// Module harness
// ===========================================================================

/// Minimal world-shaped state for exercising a [`crate::module::Module`]
/// without a full `World`.
pub struct ModuleHarness {
    pub buildings: SlotMap<BuildingId, Building>,
    pub player: Player,
    pub events: EventBus,
}

impl ModuleHarness {
    pub fn new() -> Self {
        Self {
            buildings: SlotMap::with_key(),
            player: Player::new(Vec2::ZERO),
            events: EventBus::default(),
        }
    }

    /// Reset the player to a fresh avatar at `position`.
    pub fn place_player(&mut self, position: Vec2) {
        self.player = Player::new(position);
    }

    /// Insert an already-built building.
    pub fn add_built_building(&mut self, kind: BuildingKind, position: Vec2) -> BuildingId {
        let mut building = match kind {
            BuildingKind::Miner => Building::miner(position, None),
            BuildingKind::Smelter => Building::smelter(position),
            BuildingKind::ArmsFactory => Building::arms_factory(position),
        };
        building.build();
        self.buildings.insert(building)
    }

    /// Borrow the harness as a module context for one tick.
    pub fn context(&mut self, tick: Ticks) -> ModuleContext<'_> {
        ModuleContext {
            tick,
            buildings: &self.buildings,
            player: &mut self.player,
            events: &mut self.events,
        }
    }
}

impl Default for ModuleHarness {
    fn default() -> Self {
        Self::new()
    }
}
