//! Module system for extending the simulation with custom behaviors.
//!
//! Modules hook into the world's tick pipeline via the [`Module`] trait.
//! They run in registration order during the modules phase, after transport
//! and production, receiving a [`ModuleContext`] with mutable access to the
//! player and the event bus. The defense layer is built on this seam; the
//! world itself never needs to know it exists.

use slotmap::SlotMap;

use crate::building::Building;
use crate::event::EventBus;
use crate::fixed::Ticks;
use crate::id::BuildingId;
use crate::player::Player;

/// A simulation extension called once per tick.
///
/// `on_tick` defaults to a no-op so observers can implement only the
/// downcast hooks. Modules keep their own entity storage; the context only
/// carries the shared state every extension needs.
pub trait Module: std::fmt::Debug {
    /// Stable name used for lookup and diagnostics.
    fn name(&self) -> &str;

    /// Called once per simulation tick, after transport and production.
    fn on_tick(&mut self, ctx: &mut ModuleContext<'_>) {
        let _ = ctx;
    }

    /// Downcast to `&dyn Any` for access to the concrete module type.
    fn as_any(&self) -> &dyn std::any::Any;

    /// Downcast to `&mut dyn Any` for mutable access to the concrete type.
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}

/// Mutable context passed to modules during `on_tick`.
pub struct ModuleContext<'a> {
    /// The tick being simulated.
    pub tick: Ticks,
    /// Production buildings, read-only.
    pub buildings: &'a SlotMap<BuildingId, Building>,
    /// The player avatar. Modules may move it or damage it.
    pub player: &'a mut Player,
    /// The event bus for emitting simulation events.
    pub events: &'a mut EventBus,
}

// ===========================================================================
// Tests
// ===========================================================================
