//! Resource kinds and the conversion mappings between them.
//!
//! The kind set is closed: every recipe and routing rule in the simulation
//! is a total function over this enum, so adding a kind forces the compiler
//! to surface every site that must learn about it.

use serde::{Deserialize, Serialize};

/// Every resource the simulation moves through slots and belts.
///
/// An empty slot is `Option::<ResourceKind>::None`; there is no dedicated
/// "nothing" variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Iron,
    Copper,
    Coal,
    Stone,
    IronIngot,
    CopperIngot,
    Ammunition,
}

impl ResourceKind {
    /// All kinds, in declaration order. Handy for exhaustive tests and UI.
    pub const ALL: [ResourceKind; 7] = [
        ResourceKind::Iron,
        ResourceKind::Copper,
        ResourceKind::Coal,
        ResourceKind::Stone,
        ResourceKind::IronIngot,
        ResourceKind::CopperIngot,
        ResourceKind::Ammunition,
    ];

    /// Whether this kind burns as production fuel.
    pub fn is_fuel(self) -> bool {
        matches!(self, ResourceKind::Coal)
    }

    /// The smelting product for a raw ore, or None for kinds a smelter
    /// rejects.
    pub fn smelts_into(self) -> Option<ResourceKind> {
        match self {
            ResourceKind::Iron => Some(ResourceKind::IronIngot),
            ResourceKind::Copper => Some(ResourceKind::CopperIngot),
            _ => None,
        }
    }

    /// The arms-factory product for an ingot, or None for kinds it rejects.
    pub fn forges_into(self) -> Option<ResourceKind> {
        match self {
            ResourceKind::IronIngot | ResourceKind::CopperIngot => {
                Some(ResourceKind::Ammunition)
            }
            _ => None,
        }
    }

    /// Stable lowercase name for logs and debug UI.
    pub fn name(self) -> &'static str {
        match self {
            ResourceKind::Iron => "iron",
            ResourceKind::Copper => "copper",
            ResourceKind::Coal => "coal",
            ResourceKind::Stone => "stone",
            ResourceKind::IronIngot => "iron_ingot",
            ResourceKind::CopperIngot => "copper_ingot",
            ResourceKind::Ammunition => "ammunition",
        }
    }
}
