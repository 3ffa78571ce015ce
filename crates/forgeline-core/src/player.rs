//! The player avatar: movement intent, the five-slot inventory, hand
//! mining, and the damage tally.
//!
//! Movement and hand mining are resolved by the world each tick; this module
//! owns the state those phases mutate and the atomic multi-slot inventory
//! operations commands rely on.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fixed::Fixed64;
use crate::math::Vec2;
use crate::resource::ResourceKind;
use crate::slot::InventorySlot;

/// Slots in the player inventory.
pub const PLAYER_SLOTS: usize = 5;

/// Ticks the mine button must be held near a node to collect one unit
/// (30 x 50 ms = 1.5 s).
pub const HAND_MINE_TICKS: u32 = 30;

/// Player movement per tick, in world units.
pub fn player_speed() -> Fixed64 {
    Fixed64::from_num(3)
}

/// Half the player's collision box edge, in world units.
pub fn player_half_extent() -> Fixed64 {
    Fixed64::from_num(16)
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A per-axis movement request, each axis in {-1, 0, 1}.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveIntent {
    x: i8,
    y: i8,
}

impl MoveIntent {
    /// Build an intent, clamping each axis into {-1, 0, 1}.
    pub fn new(x: i8, y: i8) -> Self {
        Self {
            x: x.clamp(-1, 1),
            y: y.clamp(-1, 1),
        }
    }

    pub fn is_idle(self) -> bool {
        self.x == 0 && self.y == 0
    }

    /// Unit direction vector; diagonals are normalized so speed is uniform.
    /// Axis-aligned intents skip the square root and stay exact.
    pub fn direction(self) -> Vec2 {
        let v = Vec2::from_int(i32::from(self.x), i32::from(self.y));
        if self.x == 0 || self.y == 0 {
            return v;
        }
        v.normalized()
    }
}

/// Everything the outside world tells the player for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSnapshot {
    pub movement: MoveIntent,
    pub mine_pressed: bool,
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InventoryError {
    #[error("amount must be at least 1")]
    InvalidAmount,
    #[error("inventory cannot take {requested} more {kind:?} ({free} free)")]
    Full {
        kind: ResourceKind,
        requested: u32,
        free: u32,
    },
    #[error("inventory holds {available} {kind:?} but {requested} were requested")]
    Insufficient {
        kind: ResourceKind,
        requested: u32,
        available: u32,
    },
}

/// Five typed slots with atomic multi-slot deposit and withdrawal.
///
/// Both operations are all-or-nothing: capacity and availability are checked
/// across the whole inventory first, and on failure nothing is touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInventory {
    slots: [InventorySlot; PLAYER_SLOTS],
}

impl PlayerInventory {
    pub fn slot(&self, index: usize) -> Option<&InventorySlot> {
        self.slots.get(index)
    }

    pub fn slots(&self) -> &[InventorySlot; PLAYER_SLOTS] {
        &self.slots
    }

    /// Units of `kind` held across all slots.
    pub fn total_of(&self, kind: ResourceKind) -> u32 {
        self.slots
            .iter()
            .filter(|s| s.kind() == Some(kind))
            .map(InventorySlot::count)
            .sum()
    }

    /// Units of `kind` the inventory could still absorb.
    pub fn free_capacity_for(&self, kind: ResourceKind) -> u32 {
        self.slots.iter().map(|s| s.free_space_for(kind)).sum()
    }

    /// Deposit `amount` units, topping up same-kind slots front to back
    /// before opening empty ones.
    pub fn try_deposit(&mut self, kind: ResourceKind, amount: u32) -> Result<(), InventoryError> {
        if amount == 0 {
            return Err(InventoryError::InvalidAmount);
        }
        let free = self.free_capacity_for(kind);
        if amount > free {
            return Err(InventoryError::Full {
                kind,
                requested: amount,
                free,
            });
        }

        let mut remaining = amount;
        // Pass 0 tops up slots already holding the kind; pass 1 opens empties.
        for pass in 0..2 {
            for slot in &mut self.slots {
                if remaining == 0 {
                    return Ok(());
                }
                let eligible = if pass == 0 {
                    slot.kind() == Some(kind)
                } else {
                    slot.is_empty()
                };
                if !eligible {
                    continue;
                }
                let take = remaining.min(slot.free_space_for(kind));
                if take == 0 {
                    continue;
                }
                let deposited = slot.deposit(kind, take).is_ok();
                debug_assert!(deposited);
                remaining -= take;
            }
        }
        debug_assert_eq!(remaining, 0);
        Ok(())
    }

    /// Withdraw `amount` units of `kind`, draining slots front to back.
    pub fn try_withdraw(&mut self, kind: ResourceKind, amount: u32) -> Result<(), InventoryError> {
        if amount == 0 {
            return Err(InventoryError::InvalidAmount);
        }
        let available = self.total_of(kind);
        if amount > available {
            return Err(InventoryError::Insufficient {
                kind,
                requested: amount,
                available,
            });
        }

        let mut remaining = amount;
        for slot in &mut self.slots {
            if remaining == 0 {
                break;
            }
            if slot.kind() != Some(kind) {
                continue;
            }
            let take = remaining.min(slot.count());
            let withdrawn = slot.withdraw(take).is_ok();
            debug_assert!(withdrawn);
            remaining -= take;
        }
        debug_assert_eq!(remaining, 0);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// One unit collected (or lost) by hand mining.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandMineOutcome {
    Collected { kind: ResourceKind },
    /// The inventory had no room; the unit was dropped.
    Dropped { kind: ResourceKind },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    position: Vec2,
    intent: MoveIntent,
    inventory: PlayerInventory,
    /// Consecutive ticks the mine button has been held in range of a node.
    mining_ticks: u32,
    /// Total contact damage taken. Uncapped; death is not enacted here.
    damage_taken: u32,
}

impl Player {
    pub(crate) fn new(position: Vec2) -> Self {
        Self {
            position,
            intent: MoveIntent::default(),
            inventory: PlayerInventory::default(),
            mining_ticks: 0,
            damage_taken: 0,
        }
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn intent(&self) -> MoveIntent {
        self.intent
    }

    pub fn inventory(&self) -> &PlayerInventory {
        &self.inventory
    }

    pub(crate) fn inventory_mut(&mut self) -> &mut PlayerInventory {
        &mut self.inventory
    }

    pub fn damage_taken(&self) -> u32 {
        self.damage_taken
    }

    /// Hand-mining completion ratio in [0, 1], for presentation.
    pub fn mining_progress_ratio(&self) -> Fixed64 {
        Fixed64::from_num(self.mining_ticks) / Fixed64::from_num(HAND_MINE_TICKS)
    }

    /// Register contact damage. The counter saturates rather than wraps.
    pub fn take_damage(&mut self, amount: u32) {
        self.damage_taken = self.damage_taken.saturating_add(amount);
    }

    pub(crate) fn set_intent(&mut self, intent: MoveIntent) {
        self.intent = intent;
    }

    /// Advance one tick of movement along the stored intent.
    pub(crate) fn step_movement(&mut self) {
        if self.intent.is_idle() {
            return;
        }
        self.position = self.position + self.intent.direction().scaled(player_speed());
    }

    /// Advance one tick of hand mining. `target` is the kind of the nearest
    /// node in range while the mine button is held, or None, which resets
    /// the hold.
    pub(crate) fn step_mining(&mut self, target: Option<ResourceKind>) -> Option<HandMineOutcome> {
        let Some(kind) = target else {
            self.mining_ticks = 0;
            return None;
        };
        self.mining_ticks += 1;
        if self.mining_ticks < HAND_MINE_TICKS {
            return None;
        }
        self.mining_ticks = 0;
        if self.inventory.try_deposit(kind, 1).is_ok() {
            Some(HandMineOutcome::Collected { kind })
        } else {
            Some(HandMineOutcome::Dropped { kind })
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
