//! Tile positions, belt directions, and the segment lookup grid.
//!
//! Conveyor segments live on an integer tile grid; buildings and mobile
//! entities use continuous [`Vec2`] world coordinates. The [`SegmentGrid`]
//! is owned by the world and passed by reference wherever a neighbor lookup
//! is needed, so independent worlds in one process never see each other's
//! belts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use slotmap::SecondaryMap;
use thiserror::Error;

use crate::fixed::Fixed64;
use crate::id::SegmentId;
use crate::math::Vec2;

/// Side length of one belt tile in world units.
pub const TILE_SIZE: i32 = 32;

// ---------------------------------------------------------------------------
// Tile positions
// ---------------------------------------------------------------------------

/// Integer tile coordinates. `Ord` so tile iteration is deterministic.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TilePos {
    pub x: i32,
    pub y: i32,
}

impl TilePos {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The tile one step ahead in `dir`.
    pub fn step(self, dir: Direction) -> TilePos {
        let (dx, dy) = dir.offset();
        TilePos {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// World-space center of this tile.
    pub fn world_center(self) -> Vec2 {
        let half = TILE_SIZE / 2;
        Vec2::new(
            Fixed64::from_num(self.x * TILE_SIZE + half),
            Fixed64::from_num(self.y * TILE_SIZE + half),
        )
    }
}

// ---------------------------------------------------------------------------
// Directions
// ---------------------------------------------------------------------------

/// The four belt directions. Y grows southward (screen convention).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    /// Tile-grid offset of one step in this direction.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
        }
    }

    /// Unit vector in world space.
    pub fn unit_vec(self) -> Vec2 {
        let (dx, dy) = self.offset();
        Vec2::from_int(dx, dy)
    }
}

// ---------------------------------------------------------------------------
// Segment grid
// ---------------------------------------------------------------------------

/// Rejected grid mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SpatialError {
    #[error("tile ({},{}) is already occupied", at.x, at.y)]
    Occupied { at: TilePos },
}

/// Bidirectional tile <-> segment index used for belt-to-belt handoff.
///
/// One segment per tile. Segments are never removed in normal play, so the
/// grid only grows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SegmentGrid {
    tiles: BTreeMap<TilePos, SegmentId>,
    positions: SecondaryMap<SegmentId, TilePos>,
}

impl SegmentGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `tile` for `segment`. Fails if the tile is occupied.
    pub fn insert(&mut self, tile: TilePos, segment: SegmentId) -> Result<(), SpatialError> {
        if self.tiles.contains_key(&tile) {
            return Err(SpatialError::Occupied { at: tile });
        }
        self.tiles.insert(tile, segment);
        self.positions.insert(segment, tile);
        Ok(())
    }

    /// The segment occupying `tile`, if any.
    pub fn segment_at(&self, tile: TilePos) -> Option<SegmentId> {
        self.tiles.get(&tile).copied()
    }

    /// The tile a segment occupies.
    pub fn position_of(&self, segment: SegmentId) -> Option<TilePos> {
        self.positions.get(segment).copied()
    }

    /// The segment one tile ahead of `segment` in `dir`, if any.
    pub fn neighbor_ahead(&self, segment: SegmentId, dir: Direction) -> Option<SegmentId> {
        let tile = self.position_of(segment)?;
        self.segment_at(tile.step(dir))
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Iterate tiles in deterministic (row-major by `Ord`) order.
    pub fn iter(&self) -> impl Iterator<Item = (TilePos, SegmentId)> + '_ {
        self.tiles.iter().map(|(tile, id)| (*tile, *id))
    }
}

// ===========================================================================
// Tests
// ===========================================================================
