//! The typed counted stack that every building and the player store
//! resources in.
//!
//! A slot holds at most [`SLOT_CAPACITY`] units of a single
//! [`ResourceKind`]. The representation keeps one invariant at all times:
//! `count == 0` exactly when `kind` is `None`. Validation happens before any
//! write, so a failed operation leaves the slot untouched.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::resource::ResourceKind;

/// Maximum units a single slot holds.
pub const SLOT_CAPACITY: u32 = 99;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a slot mutation was rejected. All variants are local and recoverable;
/// the slot is unchanged on any error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SlotError {
    /// Amounts must be at least 1. Zero-amount mutations are rejected
    /// defensively instead of passing as no-ops.
    #[error("amount must be at least 1")]
    InvalidAmount,

    #[error("slot holds {held}/{capacity}, cannot take {requested} more")]
    CapacityExceeded {
        held: u32,
        capacity: u32,
        requested: u32,
    },

    #[error("slot holds {held:?}, cannot accept {offered:?}")]
    TypeMismatch {
        held: ResourceKind,
        offered: ResourceKind,
    },

    #[error("slot holds {available}, cannot withdraw {requested}")]
    InsufficientQuantity { available: u32, requested: u32 },
}

// ---------------------------------------------------------------------------
// InventorySlot
// ---------------------------------------------------------------------------

/// A typed counted stack: up to 99 units of one resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InventorySlot {
    kind: Option<ResourceKind>,
    count: u32,
}

impl InventorySlot {
    /// A slot holding nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The kind currently held, or None when empty.
    pub fn kind(&self) -> Option<ResourceKind> {
        self.kind
    }

    /// Units currently held.
    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count == SLOT_CAPACITY
    }

    /// How many units of `kind` this slot could still take: the full
    /// capacity when empty, the remaining headroom for the same kind, zero
    /// for a different kind.
    pub fn free_space_for(&self, kind: ResourceKind) -> u32 {
        match self.kind {
            None => SLOT_CAPACITY,
            Some(held) if held == kind => SLOT_CAPACITY - self.count,
            Some(_) => 0,
        }
    }

    /// Whether a deposit of `amount` units of `kind` would succeed.
    /// Zero amounts are never accepted.
    pub fn can_accept(&self, kind: ResourceKind, amount: u32) -> bool {
        amount >= 1 && amount <= self.free_space_for(kind)
    }

    /// Add `amount` units of `kind`. Fails without mutating on a kind
    /// conflict, on overflow past capacity, or on a zero amount.
    pub fn deposit(&mut self, kind: ResourceKind, amount: u32) -> Result<(), SlotError> {
        if amount == 0 {
            return Err(SlotError::InvalidAmount);
        }
        if let Some(held) = self.kind
            && held != kind
        {
            return Err(SlotError::TypeMismatch {
                held,
                offered: kind,
            });
        }
        if amount > SLOT_CAPACITY - self.count {
            return Err(SlotError::CapacityExceeded {
                held: self.count,
                capacity: SLOT_CAPACITY,
                requested: amount,
            });
        }
        self.kind = Some(kind);
        self.count += amount;
        Ok(())
    }

    /// Remove `amount` units, returning the kind removed. The kind resets to
    /// None when the count reaches zero.
    pub fn withdraw(&mut self, amount: u32) -> Result<ResourceKind, SlotError> {
        if amount == 0 {
            return Err(SlotError::InvalidAmount);
        }
        let Some(kind) = self.kind else {
            return Err(SlotError::InsufficientQuantity {
                available: 0,
                requested: amount,
            });
        };
        if amount > self.count {
            return Err(SlotError::InsufficientQuantity {
                available: self.count,
                requested: amount,
            });
        }
        self.count -= amount;
        if self.count == 0 {
            self.kind = None;
        }
        Ok(kind)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
