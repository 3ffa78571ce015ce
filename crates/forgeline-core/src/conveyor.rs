//! Conveyor segments: single-unit directional belt tiles.
//!
//! A segment is a small state machine driven on the conveyor cadence. It
//! holds at most one resource unit at a time, either *buffered* (handed off
//! by the upstream neighbor, waiting to start) or *transporting* (moving
//! across the tile with a progress ratio), never both. The world-coupled
//! sides of the protocol (pulling from buildings, delivery, handoff, drops)
//! live in [`crate::world`]; this module owns the per-segment state and the
//! pure transitions.
//!
//! Buffered units carry the tick they were deposited and may only start
//! moving on a *later* tick. That pins handoff latency to exactly one
//! conveyor step no matter in which order the world walks the segments.

use serde::{Deserialize, Serialize};

use crate::fixed::{Fixed64, Ticks};
use crate::id::BuildingId;
use crate::math::Vec2;
use crate::resource::ResourceKind;
use crate::spatial::{Direction, TILE_SIZE, TilePos};

/// Conveyor steps needed to cross one segment: ceil(1.0 / 0.08).
pub const STEPS_TO_CROSS: u32 = 13;

/// Progress gained per conveyor step while transporting.
pub fn transport_step() -> Fixed64 {
    Fixed64::from_num(0.08)
}

/// Progress a segment parks at while the next hop is occupied.
pub fn stall_clamp() -> Fixed64 {
    Fixed64::from_num(0.99)
}

// ---------------------------------------------------------------------------
// Links
// ---------------------------------------------------------------------------

/// Which way a segment's building link points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkFacing {
    /// The segment's end feeds the building: arriving units are offered to
    /// the building's accept rule.
    Input,
    /// The segment's start draws from the building: an idle segment pulls
    /// one unit from the building's output.
    Output,
}

/// A segment's non-owning link to at most one adjacent building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentLink {
    pub building: BuildingId,
    pub facing: LinkFacing,
}

// ---------------------------------------------------------------------------
// Transport state
// ---------------------------------------------------------------------------

/// A unit parked in the intake buffer, stamped with its deposit tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferedUnit {
    pub kind: ResourceKind,
    pub deposited_at: Ticks,
}

/// What a segment is doing with its (at most one) unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportState {
    Idle,
    Transporting {
        kind: ResourceKind,
        /// 0 at the entry edge, 1 at the exit edge. Clamped to [0, 1].
        progress: Fixed64,
    },
}

// ---------------------------------------------------------------------------
// Segment
// ---------------------------------------------------------------------------

/// One tile of belt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub tile: TilePos,
    pub direction: Direction,
    built: bool,
    link: Option<SegmentLink>,
    buffered: Option<BufferedUnit>,
    state: TransportState,
}

impl Segment {
    /// A freshly placed, unbuilt segment. It ignores ticks until built.
    pub fn new(tile: TilePos, direction: Direction) -> Self {
        Self {
            tile,
            direction,
            built: false,
            link: None,
            buffered: None,
            state: TransportState::Idle,
        }
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    pub(crate) fn mark_built(&mut self) {
        self.built = true;
    }

    pub fn link(&self) -> Option<SegmentLink> {
        self.link
    }

    /// Replace the building link. A segment holds at most one.
    pub(crate) fn set_link(&mut self, link: SegmentLink) {
        self.link = Some(link);
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    /// The buffered unit's kind, if one is waiting to start.
    pub fn buffered_kind(&self) -> Option<ResourceKind> {
        self.buffered.map(|b| b.kind)
    }

    /// Transport progress while moving, None when idle.
    pub fn progress(&self) -> Option<Fixed64> {
        match self.state {
            TransportState::Transporting { progress, .. } => Some(progress),
            TransportState::Idle => None,
        }
    }

    /// Whether this segment holds a unit in either form.
    pub fn is_occupied(&self) -> bool {
        self.buffered.is_some() || matches!(self.state, TransportState::Transporting { .. })
    }

    /// Whether an upstream neighbor may hand a unit into this segment.
    pub fn can_buffer(&self) -> bool {
        self.built && !self.is_occupied()
    }

    /// Park a handed-off unit in the intake buffer.
    pub(crate) fn buffer(&mut self, kind: ResourceKind, now: Ticks) {
        debug_assert!(self.can_buffer(), "buffering into an occupied segment");
        self.buffered = Some(BufferedUnit {
            kind,
            deposited_at: now,
        });
    }

    /// Take the buffered unit if it was deposited before `now`. Units
    /// deposited this very tick stay put until the next conveyor step.
    pub(crate) fn claim_buffered(&mut self, now: Ticks) -> Option<ResourceKind> {
        let unit = self.buffered?;
        if unit.deposited_at >= now {
            return None;
        }
        self.buffered = None;
        Some(unit.kind)
    }

    /// Start moving a unit across the tile from the entry edge.
    pub(crate) fn begin_transport(&mut self, kind: ResourceKind) {
        debug_assert!(
            !self.is_occupied(),
            "starting transport on an occupied segment"
        );
        self.state = TransportState::Transporting {
            kind,
            progress: Fixed64::ZERO,
        };
    }

    /// Advance one conveyor step. Returns the carried kind once the unit
    /// reaches the exit edge (progress clamps at 1.0 until resolved).
    pub(crate) fn advance(&mut self) -> Option<ResourceKind> {
        let TransportState::Transporting { kind, progress } = &mut self.state else {
            debug_assert!(false, "advance called on an idle segment");
            return None;
        };
        *progress = (*progress + transport_step()).min(Fixed64::ONE);
        if *progress >= Fixed64::ONE {
            Some(*kind)
        } else {
            None
        }
    }

    /// The unit left the segment (delivered, handed off, or dropped).
    pub(crate) fn finish(&mut self) {
        self.state = TransportState::Idle;
    }

    /// Park just short of the exit because the next hop is occupied. The
    /// next advance pushes past 1.0 again and retries.
    pub(crate) fn stall(&mut self) {
        if let TransportState::Transporting { progress, .. } = &mut self.state {
            *progress = stall_clamp();
        }
    }

    /// Whether the segment is parked at the stall clamp.
    pub fn is_stalled(&self) -> bool {
        matches!(
            self.state,
            TransportState::Transporting { progress, .. } if progress == stall_clamp()
        )
    }

    /// World position of the carried unit: linear interpolation from entry
    /// edge to exit edge by progress. Rendering convenience only.
    pub fn item_world_position(&self) -> Option<Vec2> {
        let TransportState::Transporting { progress, .. } = self.state else {
            return None;
        };
        let center = self.tile.world_center();
        let half = self.direction.unit_vec().scaled(Fixed64::from_num(TILE_SIZE / 2));
        let entry = center - half;
        let exit = center + half;
        Some(entry.lerp(exit, progress))
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn built_segment() -> Segment {
        let mut seg = Segment::new(TilePos::new(0, 0), Direction::East);
        seg.mark_built();
        seg
    }

    // -----------------------------------------------------------------------
    // Test 1: Crossing takes exactly STEPS_TO_CROSS advances
    // -----------------------------------------------------------------------
    #[test]
    fn crossing_takes_exactly_thirteen_steps() {
        let mut seg = built_segment();
        seg.begin_transport(ResourceKind::Iron);

        for step in 1..STEPS_TO_CROSS {
            assert_eq!(seg.advance(), None, "arrived early at step {step}");
        }
        assert_eq!(seg.advance(), Some(ResourceKind::Iron));
    }

    // -----------------------------------------------------------------------
    // Test 2: Progress clamps at 1.0, never past it
    // -----------------------------------------------------------------------
    #[test]
    fn progress_clamps_at_one() {
        let mut seg = built_segment();
        seg.begin_transport(ResourceKind::Coal);

        for _ in 0..STEPS_TO_CROSS + 5 {
            seg.advance();
            let progress = seg.progress().unwrap();
            assert!(progress <= Fixed64::ONE);
        }
        assert_eq!(seg.progress(), Some(Fixed64::ONE));
    }

    // -----------------------------------------------------------------------
    // Test 3: Stall parks at 0.99 and the next advance arrives again
    // -----------------------------------------------------------------------
    #[test]
    fn stall_parks_and_retries() {
        let mut seg = built_segment();
        seg.begin_transport(ResourceKind::Iron);
        for _ in 0..STEPS_TO_CROSS {
            seg.advance();
        }

        seg.stall();
        assert!(seg.is_stalled());
        assert_eq!(seg.progress(), Some(stall_clamp()));

        // Retry: one more step pushes past the clamp and re-arrives.
        assert_eq!(seg.advance(), Some(ResourceKind::Iron));
        assert!(!seg.is_stalled());
    }

    // -----------------------------------------------------------------------
    // Test 4: Never buffered and transporting at once
    // -----------------------------------------------------------------------
    #[test]
    fn buffer_and_transport_are_exclusive() {
        let mut seg = built_segment();
        assert!(seg.can_buffer());

        seg.buffer(ResourceKind::Iron, 4);
        assert!(seg.is_occupied());
        assert!(!seg.can_buffer());

        let claimed = seg.claim_buffered(6).unwrap();
        seg.begin_transport(claimed);
        assert!(seg.buffered_kind().is_none());
        assert!(!seg.can_buffer());
    }

    // -----------------------------------------------------------------------
    // Test 5: Buffered units age one tick before they can start
    // -----------------------------------------------------------------------
    #[test]
    fn buffered_unit_waits_one_tick() {
        let mut seg = built_segment();
        seg.buffer(ResourceKind::Copper, 10);

        // Same tick: not claimable.
        assert_eq!(seg.claim_buffered(10), None);
        assert_eq!(seg.buffered_kind(), Some(ResourceKind::Copper));

        // Later tick: claimable exactly once.
        assert_eq!(seg.claim_buffered(12), Some(ResourceKind::Copper));
        assert_eq!(seg.claim_buffered(14), None);
    }

    // -----------------------------------------------------------------------
    // Test 6: Unbuilt segments never accept handoffs
    // -----------------------------------------------------------------------
    #[test]
    fn unbuilt_segment_cannot_buffer() {
        let seg = Segment::new(TilePos::new(0, 0), Direction::North);
        assert!(!seg.can_buffer());
    }

    // -----------------------------------------------------------------------
    // Test 7: finish returns the segment to idle
    // -----------------------------------------------------------------------
    #[test]
    fn finish_returns_to_idle() {
        let mut seg = built_segment();
        seg.begin_transport(ResourceKind::Stone);
        for _ in 0..STEPS_TO_CROSS {
            seg.advance();
        }
        seg.finish();
        assert_eq!(seg.state(), TransportState::Idle);
        assert!(seg.can_buffer());
    }

    // -----------------------------------------------------------------------
    // Test 8: Item position interpolates entry edge to exit edge
    // -----------------------------------------------------------------------
    #[test]
    fn item_position_lerps_along_direction() {
        let mut seg = built_segment();
        assert_eq!(seg.item_world_position(), None);

        seg.begin_transport(ResourceKind::Iron);
        // Entry edge of tile (0,0) moving east is the west edge midpoint.
        assert_eq!(seg.item_world_position(), Some(Vec2::from_int(0, 16)));

        for _ in 0..STEPS_TO_CROSS {
            seg.advance();
        }
        // Arrived: exit edge.
        assert_eq!(seg.item_world_position(), Some(Vec2::from_int(32, 16)));
    }

    // -----------------------------------------------------------------------
    // Test 9: Step constant agrees with the progress increment
    // -----------------------------------------------------------------------
    #[test]
    fn steps_to_cross_matches_increment() {
        // 12 steps stay under 1.0, the 13th reaches it.
        let short = transport_step() * Fixed64::from_num(STEPS_TO_CROSS - 1);
        let full = transport_step() * Fixed64::from_num(STEPS_TO_CROSS);
        assert!(short < Fixed64::ONE);
        assert!(full >= Fixed64::ONE);
    }
}
