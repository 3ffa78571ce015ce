//! Forgeline Core -- the simulation engine for a factory-automation game.
//!
//! This crate provides the world model: resource nodes, production
//! buildings, single-unit conveyor segments, the player avatar, events,
//! queries, and deterministic fixed-point arithmetic.
//!
//! # Five-Phase Tick Pipeline
//!
//! Each call to [`world::World::step`] advances the simulation by one tick
//! through the following phases:
//!
//! 1. **Player** -- Apply latched input: movement and hand mining.
//! 2. **Transport** -- Advance conveyor segments on the conveyor cadence;
//!    pull from, deliver to, and hand off between segments.
//! 3. **Production** -- Miners extract and fabricators work their recipes,
//!    on the production cadence.
//! 4. **Modules** -- Registered extension systems (the defense layer) run.
//! 5. **Bookkeeping** -- Deliver buffered events and compute the state hash.
//!
//! # Key Types
//!
//! - [`world::World`] -- Main simulation state and pipeline orchestrator.
//! - [`building::Building`] -- Miners and recipe fabricators with role-keyed
//!   inventory slots.
//! - [`conveyor::Segment`] -- One tile of belt carrying at most one unit.
//! - [`player::Player`] -- The avatar: movement, hand mining, and a
//!   five-slot inventory.
//! - [`fixed::Fixed64`] -- Q32.32 fixed-point type for deterministic math.
//! - [`event::EventBus`] -- Subscription-based event bus with buffered
//!   delivery.
//! - [`module::Module`] -- Extension trait for systems that run inside the
//!   tick pipeline.

pub mod building;
pub mod conveyor;
pub mod event;
pub mod fixed;
pub mod id;
pub mod math;
pub mod module;
pub mod player;
pub mod query;
pub mod resource;
pub mod sim;
pub mod slot;
pub mod spatial;
pub mod world;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
