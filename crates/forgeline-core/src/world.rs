//! The simulation world: owns all entity storage and runs the tick pipeline.
//!
//! # Architecture
//!
//! The `World` owns:
//! - Resource nodes, production [`Building`]s, and conveyor [`Segment`]s in
//!   slotmaps, plus the [`SegmentGrid`] tile index
//! - The [`Player`] avatar and the most recent [`InputSnapshot`]
//! - A [`SimState`] (tick counter, delta accumulator) and the
//!   [`SimulationStrategy`] chosen at construction
//! - An [`EventBus`] and any registered [`Module`]s
//!
//! # Tick pipeline
//!
//! Each step increments the tick counter first, then runs five phases with
//! the new value:
//! 1. **Player** -- movement and hand mining from the latched input
//! 2. **Transport** -- conveyor steps, on the conveyor cadence
//! 3. **Production** -- building steps, on the production cadence
//! 4. **Modules** -- registered extensions (the defense layer lives here)
//! 5. **Bookkeeping** -- event delivery, state hash
//!
//! Transport runs before production, so a unit extracted this tick is
//! pulled onto a belt no earlier than the next conveyor step.

use slotmap::SlotMap;

use crate::building::{Building, BuildingKind, ProductionOutcome, SlotRole};
use crate::conveyor::{LinkFacing, Segment, SegmentLink, TransportState};
use crate::event::{DropSource, Event, EventBus, EventKind, Listener};
use crate::fixed::{Fixed64, Ticks};
use crate::id::{BuildingId, NodeId, SegmentId};
use crate::math::Vec2;
use crate::module::{Module, ModuleContext};
use crate::player::{HandMineOutcome, InputSnapshot, InventoryError, MoveIntent, Player};
use crate::query::{BuildingSnapshot, NodeSnapshot, PlayerSnapshot, SegmentSnapshot};
use crate::resource::ResourceKind;
use crate::sim::{
    AdvanceResult, CONVEYOR_STEP_INTERVAL, PRODUCTION_STEP_INTERVAL, SimState, SimulationStrategy,
    StateHash, TICK_MS, on_cadence,
};
use crate::slot::SlotError;
use crate::spatial::{Direction, SegmentGrid, SpatialError, TilePos};

/// Interaction radius in world units: hand mining reaches this far, and a
/// miner binds to the nearest node within it at placement.
pub const MINING_RADIUS: i32 = 30;

// ---------------------------------------------------------------------------
// Resource nodes
// ---------------------------------------------------------------------------

/// A deposit the player or a bound miner extracts from. Nodes never deplete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ResourceNode {
    pub position: Vec2,
    pub kind: ResourceKind,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a world command was rejected. Commands that fail leave every
/// inventory involved untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    #[error("unknown building")]
    UnknownBuilding,
    #[error("unknown segment")]
    UnknownSegment,
    #[error("building has no {role:?} slot")]
    NoSuchSlot { role: SlotRole },
    #[error("output slots do not take manual deposits")]
    DepositIntoOutput,
    #[error("{kind:?} has no place in this building")]
    IncompatibleResource { kind: ResourceKind },
    #[error(transparent)]
    Spatial(#[from] SpatialError),
    #[error(transparent)]
    Slot(#[from] SlotError),
    #[error(transparent)]
    Inventory(#[from] InventoryError),
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct World {
    strategy: SimulationStrategy,
    sim: SimState,
    paused: bool,

    nodes: SlotMap<NodeId, ResourceNode>,
    buildings: SlotMap<BuildingId, Building>,
    segments: SlotMap<SegmentId, Segment>,
    grid: SegmentGrid,

    player: Player,
    /// Latched input, applied every tick until replaced.
    input: InputSnapshot,

    events: EventBus,
    modules: Vec<Box<dyn Module>>,

    last_state_hash: u64,
}

impl World {
    pub fn new(strategy: SimulationStrategy) -> Self {
        Self {
            strategy,
            sim: SimState::new(),
            paused: false,
            nodes: SlotMap::with_key(),
            buildings: SlotMap::with_key(),
            segments: SlotMap::with_key(),
            grid: SegmentGrid::new(),
            player: Player::new(Vec2::ZERO),
            input: InputSnapshot::default(),
            events: EventBus::default(),
            modules: Vec::new(),
            last_state_hash: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Layout commands
    // -----------------------------------------------------------------------

    /// Add a resource node. Infallible; nodes may share positions.
    pub fn spawn_node(&mut self, position: Vec2, kind: ResourceKind) -> NodeId {
        let id = self.nodes.insert(ResourceNode { position, kind });
        self.events.emit(Event::NodeSpawned {
            node: id,
            kind,
            tick: self.sim.tick,
        });
        id
    }

    /// Place a building blueprint. It does nothing until built.
    ///
    /// A miner binds here, once, to the kind of the nearest node within
    /// [`MINING_RADIUS`]; with no node in range it stays unbound forever.
    pub fn place_building(&mut self, kind: BuildingKind, position: Vec2) -> BuildingId {
        let building = match kind {
            BuildingKind::Miner => {
                let bound = self
                    .nearest_node_within(position, Fixed64::from_num(MINING_RADIUS))
                    .map(|(_, kind)| kind);
                Building::miner(position, bound)
            }
            BuildingKind::Smelter => Building::smelter(position),
            BuildingKind::ArmsFactory => Building::arms_factory(position),
        };
        let id = self.buildings.insert(building);
        self.events.emit(Event::BuildingPlaced {
            building: id,
            kind,
            tick: self.sim.tick,
        });
        id
    }

    /// Finish a building's construction. Repeat calls are no-ops.
    pub fn build_building(&mut self, id: BuildingId) -> Result<(), WorldError> {
        let building = self.buildings.get_mut(id).ok_or(WorldError::UnknownBuilding)?;
        if !building.is_built() {
            building.build();
            self.events.emit(Event::BuildingBuilt {
                building: id,
                tick: self.sim.tick,
            });
        }
        Ok(())
    }

    /// Place a conveyor segment blueprint on a free tile.
    pub fn place_segment(
        &mut self,
        tile: TilePos,
        direction: Direction,
    ) -> Result<SegmentId, WorldError> {
        let id = self.segments.insert(Segment::new(tile, direction));
        if let Err(err) = self.grid.insert(tile, id) {
            self.segments.remove(id);
            return Err(err.into());
        }
        self.events.emit(Event::SegmentPlaced {
            segment: id,
            tick: self.sim.tick,
        });
        Ok(id)
    }

    /// Finish a segment's construction. Repeat calls are no-ops.
    pub fn build_segment(&mut self, id: SegmentId) -> Result<(), WorldError> {
        let segment = self.segments.get_mut(id).ok_or(WorldError::UnknownSegment)?;
        if !segment.is_built() {
            segment.mark_built();
            self.events.emit(Event::SegmentBuilt {
                segment: id,
                tick: self.sim.tick,
            });
        }
        Ok(())
    }

    /// Attach a segment to a building. `Output` makes the segment pull from
    /// the building; `Input` makes arriving units deliver into it. A segment
    /// holds one link; relinking replaces it.
    pub fn link_segment(
        &mut self,
        segment: SegmentId,
        building: BuildingId,
        facing: LinkFacing,
    ) -> Result<(), WorldError> {
        if !self.buildings.contains_key(building) {
            return Err(WorldError::UnknownBuilding);
        }
        let seg = self.segments.get_mut(segment).ok_or(WorldError::UnknownSegment)?;
        seg.set_link(SegmentLink { building, facing });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Manual transfers (player inventory <-> building slots)
    // -----------------------------------------------------------------------

    /// Move units from the player inventory into a building slot.
    ///
    /// All-or-nothing: the slot is probed on a copy first, so a rejection at
    /// either end leaves both inventories untouched.
    pub fn transfer_to_building(
        &mut self,
        building: BuildingId,
        role: SlotRole,
        kind: ResourceKind,
        amount: u32,
    ) -> Result<(), WorldError> {
        let result = self.deposit_into_building(building, role, kind, amount);
        if let Err(error) = result {
            tracing::debug!(?building, ?role, ?kind, amount, %error, "manual deposit rejected");
        }
        result
    }

    fn deposit_into_building(
        &mut self,
        building: BuildingId,
        role: SlotRole,
        kind: ResourceKind,
        amount: u32,
    ) -> Result<(), WorldError> {
        let target = self.buildings.get(building).ok_or(WorldError::UnknownBuilding)?;
        if role == SlotRole::Output {
            return Err(WorldError::DepositIntoOutput);
        }
        let slot = target.slot(role).ok_or(WorldError::NoSuchSlot { role })?;
        if !target.manual_deposit_allowed(role, kind) {
            return Err(WorldError::IncompatibleResource { kind });
        }

        let mut probe = *slot;
        probe.deposit(kind, amount)?;
        self.player.inventory_mut().try_withdraw(kind, amount)?;

        let deposited = self
            .buildings
            .get_mut(building)
            .and_then(|b| b.slot_mut(role))
            .map(|s| s.deposit(kind, amount).is_ok());
        debug_assert_eq!(deposited, Some(true));
        Ok(())
    }

    /// Move units from a building slot into the player inventory. Works on
    /// any slot, including outputs. All-or-nothing like the deposit path.
    pub fn transfer_from_building(
        &mut self,
        building: BuildingId,
        role: SlotRole,
        amount: u32,
    ) -> Result<ResourceKind, WorldError> {
        let result = self.withdraw_from_building(building, role, amount);
        if let Err(error) = result {
            tracing::debug!(?building, ?role, amount, %error, "manual withdrawal rejected");
        }
        result
    }

    fn withdraw_from_building(
        &mut self,
        building: BuildingId,
        role: SlotRole,
        amount: u32,
    ) -> Result<ResourceKind, WorldError> {
        let source = self.buildings.get(building).ok_or(WorldError::UnknownBuilding)?;
        let slot = source.slot(role).ok_or(WorldError::NoSuchSlot { role })?;

        let mut slot_probe = *slot;
        let kind = slot_probe.withdraw(amount)?;
        let mut inventory_probe = *self.player.inventory();
        inventory_probe.try_deposit(kind, amount)?;

        let withdrawn = self
            .buildings
            .get_mut(building)
            .and_then(|b| b.slot_mut(role))
            .map(|s| s.withdraw(amount).is_ok());
        debug_assert_eq!(withdrawn, Some(true));
        let deposited = self.player.inventory_mut().try_deposit(kind, amount).is_ok();
        debug_assert!(deposited);
        Ok(kind)
    }

    // -----------------------------------------------------------------------
    // Input
    // -----------------------------------------------------------------------

    /// Replace the latched input. It stays in effect until the next call,
    /// so a held button is simply a snapshot that is not replaced.
    pub fn apply_input(&mut self, input: InputSnapshot) {
        self.input = input;
    }

    /// Replace only the movement part of the latched input.
    pub fn move_player(&mut self, intent: MoveIntent) {
        self.input.movement = intent;
    }

    /// Clear the movement intent; the mining flag is untouched.
    pub fn stop_player(&mut self) {
        self.input.movement = MoveIntent::default();
    }

    /// Press or release the hand-mining button.
    pub fn set_mining_pressed(&mut self, pressed: bool) {
        self.input.mine_pressed = pressed;
    }

    // -----------------------------------------------------------------------
    // Modules
    // -----------------------------------------------------------------------

    /// Register a module. Modules run each tick in registration order.
    pub fn register_module(&mut self, module: Box<dyn Module>) {
        self.modules.push(module);
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    pub fn module_by_name(&self, name: &str) -> Option<&dyn Module> {
        self.modules
            .iter()
            .find(|m| m.name() == name)
            .map(|m| m.as_ref())
    }

    /// Find a registered module by concrete type.
    pub fn find_module<M: Module + 'static>(&self) -> Option<&M> {
        self.modules
            .iter()
            .find_map(|m| m.as_any().downcast_ref::<M>())
    }

    pub fn find_module_mut<M: Module + 'static>(&mut self) -> Option<&mut M> {
        self.modules
            .iter_mut()
            .find_map(|m| m.as_any_mut().downcast_mut::<M>())
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Register an event listener. Delivery happens during bookkeeping.
    pub fn on_event(&mut self, kind: EventKind, listener: Listener) {
        self.events.on(kind, listener);
    }

    pub fn suppress_event(&mut self, kind: EventKind) {
        self.events.suppress(kind);
    }

    // -----------------------------------------------------------------------
    // Pause / resume
    // -----------------------------------------------------------------------

    /// While paused, `advance` and `step` are no-ops; commands still work.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    // -----------------------------------------------------------------------
    // Read access
    // -----------------------------------------------------------------------

    pub fn tick(&self) -> Ticks {
        self.sim.tick
    }

    /// Hash computed at the end of the most recent step.
    pub fn state_hash(&self) -> u64 {
        self.last_state_hash
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn grid(&self) -> &SegmentGrid {
        &self.grid
    }

    pub fn node(&self, id: NodeId) -> Option<&ResourceNode> {
        self.nodes.get(id)
    }

    pub fn building(&self, id: BuildingId) -> Option<&Building> {
        self.buildings.get(id)
    }

    pub fn segment(&self, id: SegmentId) -> Option<&Segment> {
        self.segments.get(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn building_count(&self) -> usize {
        self.buildings.len()
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    // -----------------------------------------------------------------------
    // Test access
    // -----------------------------------------------------------------------

    #[cfg(any(test, feature = "test-utils"))]
    pub(crate) fn player_mut(&mut self) -> &mut Player {
        &mut self.player
    }

    #[cfg(any(test, feature = "test-utils"))]
    pub(crate) fn building_mut(&mut self, id: BuildingId) -> Option<&mut Building> {
        self.buildings.get_mut(id)
    }

    #[cfg(any(test, feature = "test-utils"))]
    pub(crate) fn segment_mut(&mut self, id: SegmentId) -> Option<&mut Segment> {
        self.segments.get_mut(id)
    }

    // -----------------------------------------------------------------------
    // Snapshots
    // -----------------------------------------------------------------------

    /// Create a snapshot of the player avatar.
    pub fn snapshot_player(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            position: self.player.position(),
            intent: self.player.intent(),
            mining_progress: self.player.mining_progress_ratio(),
            damage_taken: self.player.damage_taken(),
            slots: *self.player.inventory().slots(),
        }
    }

    /// Create a snapshot of a single resource node.
    pub fn snapshot_node(&self, id: NodeId) -> Option<NodeSnapshot> {
        let node = self.nodes.get(id)?;
        Some(NodeSnapshot {
            id,
            position: node.position,
            kind: node.kind,
        })
    }

    /// Create snapshots of all resource nodes.
    pub fn snapshot_all_nodes(&self) -> Vec<NodeSnapshot> {
        self.nodes
            .keys()
            .filter_map(|id| self.snapshot_node(id))
            .collect()
    }

    /// Create a snapshot of a single building.
    pub fn snapshot_building(&self, id: BuildingId) -> Option<BuildingSnapshot> {
        let building = self.buildings.get(id)?;
        Some(BuildingSnapshot {
            id,
            kind: building.kind(),
            position: building.position(),
            built: building.is_built(),
            mining_kind: building.mining_kind(),
            progress: building.progress_ratio(),
            fuel: building.slot(SlotRole::Fuel).copied(),
            input: building.slot(SlotRole::Input).copied(),
            output: building.slot(SlotRole::Output).copied(),
        })
    }

    /// Create snapshots of all buildings.
    pub fn snapshot_all_buildings(&self) -> Vec<BuildingSnapshot> {
        self.buildings
            .keys()
            .filter_map(|id| self.snapshot_building(id))
            .collect()
    }

    /// Create a snapshot of a single conveyor segment.
    pub fn snapshot_segment(&self, id: SegmentId) -> Option<SegmentSnapshot> {
        let seg = self.segments.get(id)?;
        Some(SegmentSnapshot {
            id,
            tile: seg.tile,
            direction: seg.direction,
            built: seg.is_built(),
            state: seg.state(),
            buffered: seg.buffered_kind(),
            stalled: seg.is_stalled(),
            item_position: seg.item_world_position(),
            link: seg.link(),
        })
    }

    /// Create snapshots of all conveyor segments.
    pub fn snapshot_all_segments(&self) -> Vec<SegmentSnapshot> {
        self.segments
            .keys()
            .filter_map(|id| self.snapshot_segment(id))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Advance
    // -----------------------------------------------------------------------

    /// Advance the simulation according to the configured strategy.
    ///
    /// - **Tick mode**: `elapsed_ms` is ignored; exactly one step runs.
    /// - **Delta mode**: `elapsed_ms` accumulates; as many fixed steps run
    ///   as fit, bounded by the strategy's catch-up limit.
    pub fn advance(&mut self, elapsed_ms: u64) -> AdvanceResult {
        if self.paused {
            return AdvanceResult::default();
        }
        let mut result = AdvanceResult::default();

        match self.strategy.clone() {
            SimulationStrategy::Tick => {
                self.step_internal(&mut result);
            }
            SimulationStrategy::Delta {
                max_steps_per_advance,
            } => {
                self.sim.accumulator_ms += elapsed_ms;
                let max_steps = max_steps_per_advance.max(1);
                while self.sim.accumulator_ms >= TICK_MS && result.steps_run < max_steps {
                    self.sim.accumulator_ms -= TICK_MS;
                    self.step_internal(&mut result);
                }
                if self.sim.accumulator_ms >= TICK_MS {
                    // Catch-up bound hit: drop the whole-tick backlog.
                    let backlog = self.sim.accumulator_ms - self.sim.accumulator_ms % TICK_MS;
                    self.sim.accumulator_ms -= backlog;
                    result.discarded_ms = backlog;
                }
            }
        }

        result
    }

    /// Run a single simulation step (convenience for tick mode).
    pub fn step(&mut self) -> AdvanceResult {
        self.advance(0)
    }

    fn step_internal(&mut self, result: &mut AdvanceResult) {
        // Increment first: a subsystem with interval N first fires on tick N.
        self.sim.tick += 1;
        let tick = self.sim.tick;

        self.phase_player(tick);
        if on_cadence(tick, CONVEYOR_STEP_INTERVAL) {
            self.phase_transport(tick);
        }
        if on_cadence(tick, PRODUCTION_STEP_INTERVAL) {
            self.phase_production(tick);
        }
        self.phase_modules(tick);
        self.phase_bookkeeping();

        result.steps_run += 1;
    }

    // -----------------------------------------------------------------------
    // Phase 1: Player
    // -----------------------------------------------------------------------

    fn phase_player(&mut self, tick: Ticks) {
        self.player.set_intent(self.input.movement);
        self.player.step_movement();

        let target = if self.input.mine_pressed {
            self.nearest_node_within(self.player.position(), Fixed64::from_num(MINING_RADIUS))
                .map(|(_, kind)| kind)
        } else {
            None
        };
        match self.player.step_mining(target) {
            Some(HandMineOutcome::Collected { kind }) => {
                self.events.emit(Event::PlayerMined { kind, tick });
            }
            Some(HandMineOutcome::Dropped { kind }) => {
                self.events.emit(Event::ItemDropped {
                    kind,
                    source: DropSource::HandMining,
                    tick,
                });
            }
            None => {}
        }
    }

    fn nearest_node_within(
        &self,
        position: Vec2,
        radius: Fixed64,
    ) -> Option<(NodeId, ResourceKind)> {
        let radius_sq = radius * radius;
        let mut best: Option<(NodeId, ResourceKind, Fixed64)> = None;
        for (id, node) in &self.nodes {
            let d2 = position.distance_squared(node.position);
            if d2 > radius_sq {
                continue;
            }
            // Strictly closer wins; insertion order breaks exact ties.
            if best.map_or(true, |(_, _, best_d2)| d2 < best_d2) {
                best = Some((id, node.kind, d2));
            }
        }
        best.map(|(id, kind, _)| (id, kind))
    }

    // -----------------------------------------------------------------------
    // Phase 2: Transport
    // -----------------------------------------------------------------------

    fn phase_transport(&mut self, tick: Ticks) {
        let ids: Vec<SegmentId> = self.segments.keys().collect();
        for id in ids {
            self.step_segment(id, tick);
        }
    }

    fn step_segment(&mut self, id: SegmentId, tick: Ticks) {
        let Some(seg) = self.segments.get(id) else {
            return;
        };
        if !seg.is_built() {
            return;
        }
        let state = seg.state();
        let link = seg.link();
        let handoff_waiting = seg.buffered_kind().is_some();

        match state {
            TransportState::Idle => {
                // Intake: a buffered handoff wins over a pull. An unclaimable
                // buffer (deposited this very tick) still blocks pulling, so
                // the handoff cannot be queue-jumped.
                let claimed = self
                    .segments
                    .get_mut(id)
                    .and_then(|s| s.claim_buffered(tick));
                let intake = claimed.or_else(|| {
                    if handoff_waiting {
                        return None;
                    }
                    let link = link?;
                    if link.facing != LinkFacing::Output {
                        return None;
                    }
                    self.buildings.get_mut(link.building).and_then(|b| b.try_pull())
                });
                if let Some(kind) = intake
                    && let Some(s) = self.segments.get_mut(id)
                {
                    s.begin_transport(kind);
                }
            }
            TransportState::Transporting { .. } => {
                let arrived = self.segments.get_mut(id).and_then(|s| s.advance());
                if let Some(kind) = arrived {
                    self.resolve_handoff(id, kind, tick);
                }
            }
        }
    }

    /// A unit reached the exit edge: deliver to the linked building, hand
    /// off to the next segment, or drop off the end of the line.
    fn resolve_handoff(&mut self, id: SegmentId, kind: ResourceKind, tick: Ticks) {
        let Some(seg) = self.segments.get(id) else {
            return;
        };
        let link = seg.link();
        let direction = seg.direction;

        if let Some(link) = link
            && link.facing == LinkFacing::Input
        {
            let accepted = self
                .buildings
                .get_mut(link.building)
                .is_some_and(|b| b.try_accept(kind));
            if accepted {
                if let Some(s) = self.segments.get_mut(id) {
                    s.finish();
                }
                self.events.emit(Event::ItemDelivered {
                    segment: id,
                    building: link.building,
                    kind,
                    tick,
                });
            } else {
                self.stall_segment(id, kind, tick);
            }
            return;
        }

        match self.grid.neighbor_ahead(id, direction) {
            Some(next) => {
                let open = self.segments.get(next).is_some_and(Segment::can_buffer);
                if open {
                    if let Some(s) = self.segments.get_mut(next) {
                        s.buffer(kind, tick);
                    }
                    if let Some(s) = self.segments.get_mut(id) {
                        s.finish();
                    }
                } else {
                    self.stall_segment(id, kind, tick);
                }
            }
            None => {
                if let Some(s) = self.segments.get_mut(id) {
                    s.finish();
                }
                self.events.emit(Event::ItemDropped {
                    kind,
                    source: DropSource::TransportEnd { segment: id },
                    tick,
                });
            }
        }
    }

    /// Park the unit just short of the exit. Re-emitted on every blocked
    /// step, like back-pressure polling.
    fn stall_segment(&mut self, id: SegmentId, kind: ResourceKind, tick: Ticks) {
        if let Some(s) = self.segments.get_mut(id) {
            s.stall();
        }
        self.events.emit(Event::SegmentStalled {
            segment: id,
            kind,
            tick,
        });
    }

    // -----------------------------------------------------------------------
    // Phase 3: Production
    // -----------------------------------------------------------------------

    fn phase_production(&mut self, tick: Ticks) {
        let ids: Vec<BuildingId> = self.buildings.keys().collect();
        for id in ids {
            let outcome = self.buildings.get_mut(id).and_then(|b| b.step_production());
            let Some(outcome) = outcome else {
                continue;
            };
            match outcome {
                ProductionOutcome::Extracted { kind } => {
                    self.events.emit(Event::ItemMined {
                        building: id,
                        kind,
                        tick,
                    });
                }
                ProductionOutcome::ExtractionDropped { kind } => {
                    self.events.emit(Event::ItemDropped {
                        kind,
                        source: DropSource::MinerOverflow { building: id },
                        tick,
                    });
                }
                ProductionOutcome::CycleCompleted { product } => {
                    self.events.emit(Event::CycleCompleted {
                        building: id,
                        product,
                        tick,
                    });
                }
                ProductionOutcome::CycleInterrupted => {
                    self.events.emit(Event::CycleInterrupted {
                        building: id,
                        tick,
                    });
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Phase 4: Modules
    // -----------------------------------------------------------------------

    fn phase_modules(&mut self, tick: Ticks) {
        // Take/restore so the context can borrow the rest of the world.
        let mut modules = std::mem::take(&mut self.modules);
        for module in &mut modules {
            let mut ctx = ModuleContext {
                tick,
                buildings: &self.buildings,
                player: &mut self.player,
                events: &mut self.events,
            };
            module.on_tick(&mut ctx);
        }
        self.modules = modules;
    }

    // -----------------------------------------------------------------------
    // Phase 5: Bookkeeping
    // -----------------------------------------------------------------------

    fn phase_bookkeeping(&mut self) {
        self.events.deliver();
        self.last_state_hash = self.compute_state_hash();
        tracing::debug!(
            tick = self.sim.tick,
            state_hash = self.last_state_hash,
            "tick complete"
        );
    }

    /// Deterministic hash of everything that feeds future ticks. Slotmap
    /// iteration order is stable for identical operation histories.
    fn compute_state_hash(&self) -> u64 {
        let mut hasher = StateHash::new();
        hasher.write_u64(self.sim.tick);

        hasher.write_fixed64(self.player.position().x);
        hasher.write_fixed64(self.player.position().y);
        hasher.write_u32(self.player.damage_taken());
        hasher.write_fixed64(self.player.mining_progress_ratio());
        for slot in self.player.inventory().slots() {
            hasher.write_u8(slot.kind().map_or(u8::MAX, |k| k as u8));
            hasher.write_u32(slot.count());
        }

        for (_, node) in &self.nodes {
            hasher.write_u8(node.kind as u8);
            hasher.write_fixed64(node.position.x);
            hasher.write_fixed64(node.position.y);
        }

        for (_, building) in &self.buildings {
            hasher.write_u8(building.kind() as u8);
            hasher.write_u8(building.is_built() as u8);
            hasher.write_u8(building.mining_kind().map_or(u8::MAX, |k| k as u8));
            hasher.write_fixed64(building.progress_ratio());
            for role in [SlotRole::Fuel, SlotRole::Input, SlotRole::Output] {
                if let Some(slot) = building.slot(role) {
                    hasher.write_u8(slot.kind().map_or(u8::MAX, |k| k as u8));
                    hasher.write_u32(slot.count());
                }
            }
        }

        for (_, seg) in &self.segments {
            hasher.write_i32(seg.tile.x);
            hasher.write_i32(seg.tile.y);
            hasher.write_u8(seg.is_built() as u8);
            match seg.state() {
                TransportState::Idle => hasher.write_u8(0),
                TransportState::Transporting { kind, progress } => {
                    hasher.write_u8(1);
                    hasher.write_u8(kind as u8);
                    hasher.write_fixed64(progress);
                }
            }
            hasher.write_u8(seg.buffered_kind().map_or(u8::MAX, |k| k as u8));
        }

        hasher.finish()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
