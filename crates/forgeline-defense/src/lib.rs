//! Turret defense layer for the Forgeline engine.
//!
//! Runs turrets, hostiles, and cosmetic projectiles as a [`Module`] inside
//! the world's tick pipeline. Hostiles home toward the player and deal
//! contact damage; turrets pick the nearest hostile in range on a fixed
//! cooldown and apply damage at fire time; projectiles are presentation
//! only and never hurt anything.
//!
//! # Design
//!
//! - Entity storage lives here, not in the core: turrets, hostiles, and
//!   projectiles are slotmap-keyed and iterate deterministically.
//! - Per tick, in order: hostiles move and apply contact damage, in-flight
//!   projectiles advance, then turrets count down and fire. A projectile
//!   spawned this tick first moves on the next one.
//! - Target selection re-reads the live hostile set on every fire attempt;
//!   there is no stored target to go stale.
//! - Damage lands when the turret fires. The projectile flies to the
//!   hostile's position at fire time, even if the hostile dies first.
//! - Contact damage feeds the core event bus (`PlayerDamaged`); everything
//!   else is reported on this module's own drained [`DefenseEvent`] stream.

use serde::{Deserialize, Serialize};
use slotmap::{SlotMap, new_key_type};
use thiserror::Error;

use forgeline_core::event::{Event, EventBus};
use forgeline_core::fixed::{Fixed64, Ticks};
use forgeline_core::math::{Vec2, aabb_overlap};
use forgeline_core::module::{Module, ModuleContext};
use forgeline_core::player::{Player, player_half_extent};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Ticks between fire attempts, per turret (1 s). The countdown starts at
/// placement and resets on every attempt, whether or not a target existed.
pub const TURRET_COOLDOWN_TICKS: u32 = 20;

/// Damage applied to the selected hostile at fire time.
pub const TURRET_DAMAGE: u32 = 1;

/// Health a hostile spawns with.
pub const HOSTILE_SPAWN_HEALTH: u32 = 2;

/// Damage dealt to the player per tick of AABB contact.
pub const CONTACT_DAMAGE: u32 = 1;

/// Half the hostile's collision box edge, in world units.
pub fn hostile_half_extent() -> Fixed64 {
    Fixed64::from_num(12)
}

/// Default hostile movement per tick, in world units.
pub fn default_hostile_speed() -> Fixed64 {
    Fixed64::from_num(1.5)
}

/// Projectile movement per tick, in world units.
pub fn projectile_speed() -> Fixed64 {
    Fixed64::from_num(8)
}

/// Default turret acquisition radius, in world units.
pub fn default_turret_range() -> Fixed64 {
    Fixed64::from_num(120)
}

// ---------------------------------------------------------------------------
// Ids
// ---------------------------------------------------------------------------

new_key_type! {
    /// Identifies a stationary turret.
    pub struct TurretId;

    /// Identifies a live hostile.
    pub struct HostileId;

    /// Identifies a projectile in flight.
    pub struct ProjectileId;
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DefenseError {
    #[error("turret range must be positive, got {0}")]
    InvalidRange(Fixed64),
    #[error("hostile speed must not be negative, got {0}")]
    InvalidSpeed(Fixed64),
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// A stationary defender. Fires on its cooldown at the nearest hostile in
/// range; never moves, never runs out of ammunition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turret {
    position: Vec2,
    range: Fixed64,
    /// Ticks until the next fire attempt. Stays in [1, cooldown] between
    /// ticks; reaching 0 fires and resets.
    cooldown: u32,
}

impl Turret {
    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn range(&self) -> Fixed64 {
        self.range
    }

    /// Ticks remaining until the next fire attempt.
    pub fn cooldown(&self) -> u32 {
        self.cooldown
    }
}

/// A mobile agent homing straight toward the player. No pathfinding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hostile {
    position: Vec2,
    health: u32,
    speed: Fixed64,
}

impl Hostile {
    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn health(&self) -> u32 {
        self.health
    }

    pub fn speed(&self) -> Fixed64 {
        self.speed
    }
}

/// A cosmetic tracer flying from a turret to where its target stood at fire
/// time. Despawns on arrival; applies no damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projectile {
    position: Vec2,
    target: Vec2,
}

impl Projectile {
    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn target(&self) -> Vec2 {
        self.target
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Defense happenings, drained by the embedder each tick (or whenever).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefenseEvent {
    /// A turret selected a target and applied damage.
    TurretFired {
        turret: TurretId,
        hostile: HostileId,
        /// Target health after the shot.
        remaining_health: u32,
        tick: Ticks,
    },
    /// A shot brought a hostile to zero health; it is already removed.
    HostileSlain {
        hostile: HostileId,
        turret: TurretId,
        tick: Ticks,
    },
    /// A hostile overlapped the player this tick.
    PlayerHit {
        hostile: HostileId,
        /// The player's cumulative damage counter after this hit.
        total_damage: u32,
        tick: Ticks,
    },
    /// A projectile reached its destination and despawned.
    ProjectileLanded { projectile: ProjectileId, tick: Ticks },
}

impl DefenseEvent {
    /// The tick this event occurred on.
    pub fn tick(&self) -> Ticks {
        match self {
            DefenseEvent::TurretFired { tick, .. }
            | DefenseEvent::HostileSlain { tick, .. }
            | DefenseEvent::PlayerHit { tick, .. }
            | DefenseEvent::ProjectileLanded { tick, .. } => *tick,
        }
    }
}

// ---------------------------------------------------------------------------
// Defense module
// ---------------------------------------------------------------------------

/// The defense subsystem. Register it on a world with
/// `world.register_module(Box::new(DefenseModule::new()))` and it runs in
/// the modules phase of every tick.
#[derive(Debug, Default)]
pub struct DefenseModule {
    turrets: SlotMap<TurretId, Turret>,
    hostiles: SlotMap<HostileId, Hostile>,
    projectiles: SlotMap<ProjectileId, Projectile>,
    pending: Vec<DefenseEvent>,
}

impl DefenseModule {
    pub fn new() -> Self {
        Self::default()
    }

    // -- Commands --

    /// Place a turret. Its first fire attempt comes
    /// [`TURRET_COOLDOWN_TICKS`] ticks later.
    pub fn add_turret(&mut self, position: Vec2, range: Fixed64) -> Result<TurretId, DefenseError> {
        if range <= Fixed64::ZERO {
            return Err(DefenseError::InvalidRange(range));
        }
        Ok(self.turrets.insert(Turret {
            position,
            range,
            cooldown: TURRET_COOLDOWN_TICKS,
        }))
    }

    /// Spawn a hostile with [`HOSTILE_SPAWN_HEALTH`] health. A speed of zero
    /// is allowed and leaves it stationary.
    pub fn spawn_hostile(
        &mut self,
        position: Vec2,
        speed: Fixed64,
    ) -> Result<HostileId, DefenseError> {
        if speed < Fixed64::ZERO {
            return Err(DefenseError::InvalidSpeed(speed));
        }
        Ok(self.hostiles.insert(Hostile {
            position,
            health: HOSTILE_SPAWN_HEALTH,
            speed,
        }))
    }

    // -- Views --

    pub fn turret(&self, id: TurretId) -> Option<&Turret> {
        self.turrets.get(id)
    }

    pub fn turrets(&self) -> impl Iterator<Item = (TurretId, &Turret)> + '_ {
        self.turrets.iter()
    }

    pub fn turret_count(&self) -> usize {
        self.turrets.len()
    }

    pub fn hostile(&self, id: HostileId) -> Option<&Hostile> {
        self.hostiles.get(id)
    }

    pub fn hostiles(&self) -> impl Iterator<Item = (HostileId, &Hostile)> + '_ {
        self.hostiles.iter()
    }

    pub fn hostile_count(&self) -> usize {
        self.hostiles.len()
    }

    pub fn projectile(&self, id: ProjectileId) -> Option<&Projectile> {
        self.projectiles.get(id)
    }

    pub fn projectiles(&self) -> impl Iterator<Item = (ProjectileId, &Projectile)> + '_ {
        self.projectiles.iter()
    }

    pub fn projectile_count(&self) -> usize {
        self.projectiles.len()
    }

    // -- Event stream --

    /// Events accumulated since the last drain, in occurrence order.
    pub fn pending_events(&self) -> &[DefenseEvent] {
        &self.pending
    }

    /// Take all accumulated events, leaving the stream empty.
    pub fn drain_events(&mut self) -> Vec<DefenseEvent> {
        std::mem::take(&mut self.pending)
    }

    // -- Tick phases --

    /// Move every hostile toward the player, then apply contact damage.
    /// Contact goes to both the module stream and the core bus.
    fn step_hostiles(&mut self, tick: Ticks, player: &mut Player, events: &mut EventBus) {
        let Self {
            hostiles, pending, ..
        } = self;
        let player_pos = player.position();
        let player_half = player_half_extent();

        for (hostile_id, hostile) in hostiles.iter_mut() {
            let direction = (player_pos - hostile.position).normalized();
            hostile.position = hostile.position + direction.scaled(hostile.speed);

            if aabb_overlap(
                hostile.position,
                hostile_half_extent(),
                player_pos,
                player_half,
            ) {
                player.take_damage(CONTACT_DAMAGE);
                pending.push(DefenseEvent::PlayerHit {
                    hostile: hostile_id,
                    total_damage: player.damage_taken(),
                    tick,
                });
                events.emit(Event::PlayerDamaged {
                    amount: CONTACT_DAMAGE,
                    total: player.damage_taken(),
                    tick,
                });
            }
        }
    }

    /// Advance every projectile along its straight line; despawn arrivals.
    fn step_projectiles(&mut self, tick: Ticks) {
        let Self {
            projectiles,
            pending,
            ..
        } = self;
        let speed = projectile_speed();
        let reach_sq = speed * speed;

        projectiles.retain(|projectile_id, projectile| {
            if projectile.position.distance_squared(projectile.target) <= reach_sq {
                pending.push(DefenseEvent::ProjectileLanded {
                    projectile: projectile_id,
                    tick,
                });
                return false;
            }
            let direction = (projectile.target - projectile.position).normalized();
            projectile.position = projectile.position + direction.scaled(speed);
            true
        });
    }

    /// Count down every turret; at zero, attempt to fire and reset.
    fn step_turrets(&mut self, tick: Ticks) {
        let Self {
            turrets,
            hostiles,
            projectiles,
            pending,
        } = self;

        for (turret_id, turret) in turrets.iter_mut() {
            turret.cooldown -= 1;
            if turret.cooldown > 0 {
                continue;
            }
            turret.cooldown = TURRET_COOLDOWN_TICKS;

            // Fire attempt. Nothing in range is a no-op, not an error.
            let Some(target_id) = nearest_in_range(turret.position, turret.range, hostiles) else {
                continue;
            };
            let Some(hostile) = hostiles.get_mut(target_id) else {
                continue;
            };

            hostile.health = hostile.health.saturating_sub(TURRET_DAMAGE);
            let remaining = hostile.health;
            let impact = hostile.position;

            projectiles.insert(Projectile {
                position: turret.position,
                target: impact,
            });
            pending.push(DefenseEvent::TurretFired {
                turret: turret_id,
                hostile: target_id,
                remaining_health: remaining,
                tick,
            });

            if remaining == 0 {
                hostiles.remove(target_id);
                pending.push(DefenseEvent::HostileSlain {
                    hostile: target_id,
                    turret: turret_id,
                    tick,
                });
            }
        }
    }
}

impl Module for DefenseModule {
    fn name(&self) -> &str {
        "defense"
    }

    fn on_tick(&mut self, ctx: &mut ModuleContext<'_>) {
        self.step_hostiles(ctx.tick, ctx.player, ctx.events);
        self.step_projectiles(ctx.tick);
        self.step_turrets(ctx.tick);
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

/// The hostile nearest `origin` within `range`, by Euclidean distance.
/// Ties resolve to the first hostile in storage iteration order.
fn nearest_in_range(
    origin: Vec2,
    range: Fixed64,
    hostiles: &SlotMap<HostileId, Hostile>,
) -> Option<HostileId> {
    let range_sq = range * range;
    let mut best: Option<(HostileId, Fixed64)> = None;

    for (hostile_id, hostile) in hostiles.iter() {
        let dist_sq = origin.distance_squared(hostile.position);
        if dist_sq > range_sq {
            continue;
        }
        // Strict less-than keeps the first-encountered hostile on ties.
        match best {
            Some((_, best_sq)) if dist_sq >= best_sq => {}
            _ => best = Some((hostile_id, dist_sq)),
        }
    }

    best.map(|(hostile_id, _)| hostile_id)
}

// ===========================================================================
// Tests
// ===========================================================================
