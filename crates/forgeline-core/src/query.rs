//! Read-only query API for inspecting world state.
//!
//! Provides snapshot types that aggregate world state into convenient views
//! for rendering, UI, and tooling. All types are owned copies -- no
//! references into internal world storage.

use crate::building::BuildingKind;
use crate::conveyor::{SegmentLink, TransportState};
use crate::fixed::Fixed64;
use crate::id::{BuildingId, NodeId, SegmentId};
use crate::math::Vec2;
use crate::player::{MoveIntent, PLAYER_SLOTS};
use crate::resource::ResourceKind;
use crate::slot::InventorySlot;
use crate::spatial::{Direction, TilePos};

// ---------------------------------------------------------------------------
// Player snapshot
// ---------------------------------------------------------------------------

/// An aggregated, read-only view of the player avatar.
#[derive(Debug, Clone)]
pub struct PlayerSnapshot {
    /// World position of the avatar's center.
    pub position: Vec2,
    /// Movement intent in effect this tick.
    pub intent: MoveIntent,
    /// Hand-mining progress as a 0..1 fraction. 0 when not mining.
    pub mining_progress: Fixed64,
    /// Lifetime damage taken.
    pub damage_taken: u32,
    /// Copy of all inventory slots, in slot order.
    pub slots: [InventorySlot; PLAYER_SLOTS],
}

// ---------------------------------------------------------------------------
// Resource node snapshot
// ---------------------------------------------------------------------------

/// A read-only view of a single resource node.
#[derive(Debug, Clone)]
pub struct NodeSnapshot {
    /// The node's ID.
    pub id: NodeId,
    /// World position of the deposit.
    pub position: Vec2,
    /// What the deposit yields.
    pub kind: ResourceKind,
}

// ---------------------------------------------------------------------------
// Building snapshot
// ---------------------------------------------------------------------------

/// An aggregated, read-only view of a single building.
///
/// Slot copies are `None` where the building variant has no such slot
/// (miners carry only an output).
#[derive(Debug, Clone)]
pub struct BuildingSnapshot {
    /// The building's ID.
    pub id: BuildingId,
    /// Which building this is.
    pub kind: BuildingKind,
    /// World position of the building's center.
    pub position: Vec2,
    /// Whether construction has finished.
    pub built: bool,
    /// The resource a miner is bound to; `None` for other kinds or when
    /// the miner was placed out of range of every node.
    pub mining_kind: Option<ResourceKind>,
    /// Work progress as a 0..1 fraction. 0 when idle.
    pub progress: Fixed64,
    /// Copy of the fuel slot, if the building has one.
    pub fuel: Option<InventorySlot>,
    /// Copy of the input slot, if the building has one.
    pub input: Option<InventorySlot>,
    /// Copy of the output slot, if the building has one.
    pub output: Option<InventorySlot>,
}

// ---------------------------------------------------------------------------
// Segment snapshot
// ---------------------------------------------------------------------------

/// An aggregated, read-only view of a single conveyor segment.
#[derive(Debug, Clone)]
pub struct SegmentSnapshot {
    /// The segment's ID.
    pub id: SegmentId,
    /// Grid tile the segment occupies.
    pub tile: TilePos,
    /// Travel direction across the tile.
    pub direction: Direction,
    /// Whether construction has finished.
    pub built: bool,
    /// Idle or transporting, with progress.
    pub state: TransportState,
    /// Kind of a handoff unit waiting to enter, if any.
    pub buffered: Option<ResourceKind>,
    /// Whether the carried unit is parked against a blocked exit.
    pub stalled: bool,
    /// World position of the carried unit, for rendering. `None` when idle.
    pub item_position: Option<Vec2>,
    /// The building link, if the segment has been attached to one.
    pub link: Option<SegmentLink>,
}
