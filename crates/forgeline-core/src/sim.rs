//! Simulation timing, strategy, and state-hash types.
//!
//! The world runs one fixed pipeline per tick; a [`SimulationStrategy`]
//! only controls how many ticks an `advance` call executes. Everything that
//! looks like a slower timer (conveyor steps, production steps, turret
//! cooldowns) is expressed as a multiple of the base tick, so a single
//! driver clocks the whole simulation.

use crate::fixed::{Fixed64, Ticks};

/// Length of one simulation tick in milliseconds.
pub const TICK_MS: u64 = 50;

/// Ticks per wall-clock second at the nominal rate.
pub const TICKS_PER_SECOND: u64 = 1000 / TICK_MS;

/// Ticks between conveyor transport steps (100 ms cadence).
pub const CONVEYOR_STEP_INTERVAL: Ticks = 2;

/// Ticks between building production steps (100 ms cadence).
pub const PRODUCTION_STEP_INTERVAL: Ticks = 2;

/// Whether a subsystem with the given tick interval runs on this tick.
///
/// The world increments its tick counter before running phases, so the
/// first firing of an interval-N subsystem lands on tick N.
pub fn on_cadence(tick: Ticks, interval: Ticks) -> bool {
    interval != 0 && tick % interval == 0
}

// ---------------------------------------------------------------------------
// Simulation strategy
// ---------------------------------------------------------------------------

/// How the world advances time. Chosen at construction.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum SimulationStrategy {
    /// Single step per call. The host calls `World::step()` at a fixed rate.
    /// Deterministic by construction.
    Tick,

    /// Real-time mode. The host calls `World::advance(elapsed_ms)` with
    /// wall-clock time; the world accumulates it and runs as many fixed
    /// ticks as fit, carrying the remainder forward.
    Delta {
        /// Upper bound on ticks run by one `advance` call. Time beyond the
        /// bound is discarded instead of snowballing after a long stall.
        max_steps_per_advance: u64,
    },
}

// ---------------------------------------------------------------------------
// Simulation state
// ---------------------------------------------------------------------------

/// Mutable timing state tracked by the world.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SimState {
    /// Current tick counter. Incremented by 1 per simulation step.
    pub tick: Ticks,

    /// Milliseconds accumulated toward the next tick in delta mode.
    /// Always less than [`TICK_MS`] between `advance` calls.
    pub accumulator_ms: u64,
}

impl SimState {
    pub fn new() -> Self {
        Self {
            tick: 0,
            accumulator_ms: 0,
        }
    }
}

impl Default for SimState {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Advance result
// ---------------------------------------------------------------------------

/// Result of a `World::advance()` call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AdvanceResult {
    /// Simulation steps actually executed.
    pub steps_run: u64,
    /// Milliseconds discarded by the catch-up bound, if any.
    pub discarded_ms: u64,
}

// ---------------------------------------------------------------------------
// State hash
// ---------------------------------------------------------------------------

/// Deterministic hash of simulation state for desync detection.
///
/// FNV-1a (64-bit), for speed and simplicity. Not cryptographic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHash(pub u64);

impl StateHash {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    pub fn new() -> Self {
        Self(Self::FNV_OFFSET)
    }

    /// Feed bytes into the hash.
    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(Self::FNV_PRIME);
        }
    }

    pub fn write_u8(&mut self, v: u8) {
        self.write(&[v]);
    }

    pub fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_fixed64(&mut self, v: Fixed64) {
        self.write(&v.to_bits().to_le_bytes());
    }

    pub fn finish(self) -> u64 {
        self.0
    }
}

impl Default for StateHash {
    fn default() -> Self {
        Self::new()
    }
}
