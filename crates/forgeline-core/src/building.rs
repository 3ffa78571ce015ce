//! Production buildings: miners, smelters, and the arms factory.
//!
//! All three share one shape -- a fixed world position, a built flag, slots,
//! and a progress counter stepped on the production cadence -- but split into
//! two state machines:
//!
//! - [`Miner`]: a source. Counts down a fixed extraction interval and
//!   deposits one unit of its bound kind into its output slot, dropping the
//!   unit when the slot will not take it.
//! - [`Fabricator`]: a converter (smelter or arms factory, chosen by
//!   [`Recipe`]). Runs fuel + input -> product cycles with just-in-time
//!   precondition checks; an interrupted cycle loses all progress and
//!   consumes nothing.
//!
//! Conveyors talk to buildings only through [`Building::try_pull`] and
//! [`Building::try_accept`], so belt code never branches on the variant.

use serde::{Deserialize, Serialize};

use crate::fixed::Fixed64;
use crate::math::Vec2;
use crate::resource::ResourceKind;
use crate::slot::InventorySlot;

/// Production steps between miner extractions (15 x 0.1 s = 1.5 s).
pub const MINER_EXTRACT_STEPS: u32 = 15;

/// Production steps in one smelting cycle (30 x 0.1 s = 3.0 s).
pub const SMELTER_CYCLE_STEPS: u32 = 30;

/// Production steps in one arms-factory cycle (40 x 0.1 s = 4.0 s).
pub const ARMS_CYCLE_STEPS: u32 = 40;

// ---------------------------------------------------------------------------
// Kinds, recipes, slot roles
// ---------------------------------------------------------------------------

/// The placeable building variants, as commands and views name them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildingKind {
    Miner,
    Smelter,
    ArmsFactory,
}

/// Which conversion a [`Fabricator`] runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipe {
    /// Ore -> ingot (iron, copper). 3.0 s cycle.
    Smelting,
    /// Ingot -> ammunition. 4.0 s cycle.
    Forging,
}

impl Recipe {
    /// Production steps in one full cycle.
    pub fn cycle_steps(self) -> u32 {
        match self {
            Recipe::Smelting => SMELTER_CYCLE_STEPS,
            Recipe::Forging => ARMS_CYCLE_STEPS,
        }
    }

    /// The product for a given input kind, or None if this recipe rejects it.
    pub fn product_of(self, input: ResourceKind) -> Option<ResourceKind> {
        match self {
            Recipe::Smelting => input.smelts_into(),
            Recipe::Forging => input.forges_into(),
        }
    }

    /// Whether `kind` may enter the input slot.
    pub fn accepts_input(self, kind: ResourceKind) -> bool {
        self.product_of(kind).is_some()
    }
}

/// Addresses one slot of a building for manual transfers and views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotRole {
    Fuel,
    Input,
    Output,
}

/// What a production step did, for event reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductionOutcome {
    /// A miner put one unit into its output slot.
    Extracted { kind: ResourceKind },
    /// A miner's output would not take the unit; it was dropped.
    ExtractionDropped { kind: ResourceKind },
    /// A fabricator finished a cycle: 1 fuel + 1 input became 1 product.
    CycleCompleted { product: ResourceKind },
    /// A running cycle lost its preconditions and reset with no partial
    /// credit and nothing consumed.
    CycleInterrupted,
}

// ---------------------------------------------------------------------------
// Miner
// ---------------------------------------------------------------------------

/// Extracts its bound resource kind on a fixed cadence.
///
/// The binding is latched when the world places the miner: the nearest node
/// within placement range fixes `mining_kind` once, and there is no
/// re-binding. A miner placed away from every node stays unbound and
/// no-ops forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Miner {
    position: Vec2,
    built: bool,
    mining_kind: Option<ResourceKind>,
    output: InventorySlot,
    /// Production steps until the next extraction. Stays in 1..=interval.
    countdown: u32,
}

impl Miner {
    pub(crate) fn new(position: Vec2, mining_kind: Option<ResourceKind>) -> Self {
        Self {
            position,
            built: false,
            mining_kind,
            output: InventorySlot::empty(),
            countdown: MINER_EXTRACT_STEPS,
        }
    }

    pub fn mining_kind(&self) -> Option<ResourceKind> {
        self.mining_kind
    }

    fn step(&mut self) -> Option<ProductionOutcome> {
        let kind = self.mining_kind?;
        debug_assert!(self.countdown >= 1);
        self.countdown -= 1;
        if self.countdown > 0 {
            return None;
        }
        self.countdown = MINER_EXTRACT_STEPS;
        if self.output.deposit(kind, 1).is_ok() {
            Some(ProductionOutcome::Extracted { kind })
        } else {
            // Overflow policy: drop the unit, never block the extractor.
            Some(ProductionOutcome::ExtractionDropped { kind })
        }
    }

    fn progress_ratio(&self) -> Fixed64 {
        let done = MINER_EXTRACT_STEPS - self.countdown;
        Fixed64::from_num(done) / Fixed64::from_num(MINER_EXTRACT_STEPS)
    }
}

// ---------------------------------------------------------------------------
// Fabricator (smelter / arms factory)
// ---------------------------------------------------------------------------

/// Cycle progress of a fabricator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessState {
    Idle,
    Working { steps_done: u32 },
}

/// Converts 1 fuel + 1 input into 1 product per completed cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fabricator {
    position: Vec2,
    built: bool,
    recipe: Recipe,
    fuel: InventorySlot,
    input: InventorySlot,
    output: InventorySlot,
    state: ProcessState,
}

impl Fabricator {
    pub(crate) fn new(position: Vec2, recipe: Recipe) -> Self {
        Self {
            position,
            built: false,
            recipe,
            fuel: InventorySlot::empty(),
            input: InventorySlot::empty(),
            output: InventorySlot::empty(),
            state: ProcessState::Idle,
        }
    }

    pub fn recipe(&self) -> Recipe {
        self.recipe
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    /// A cycle may run only while fuel, a valid input, and room for the
    /// product are all present. Checked just-in-time on every step.
    fn preconditions_hold(&self) -> bool {
        let Some(fuel_kind) = self.fuel.kind() else {
            return false;
        };
        if !fuel_kind.is_fuel() {
            return false;
        }
        let Some(input_kind) = self.input.kind() else {
            return false;
        };
        let Some(product) = self.recipe.product_of(input_kind) else {
            return false;
        };
        self.output.can_accept(product, 1)
    }

    fn step(&mut self) -> Option<ProductionOutcome> {
        let ready = self.preconditions_hold();
        match self.state {
            ProcessState::Idle => {
                if ready {
                    self.state = ProcessState::Working { steps_done: 1 };
                }
                None
            }
            ProcessState::Working { steps_done } => {
                if !ready {
                    self.state = ProcessState::Idle;
                    return Some(ProductionOutcome::CycleInterrupted);
                }
                let steps_done = steps_done + 1;
                if steps_done < self.recipe.cycle_steps() {
                    self.state = ProcessState::Working { steps_done };
                    return None;
                }

                // Completion is atomic: preconditions were re-checked above,
                // so none of these can fail.
                let input_kind = self.input.kind()?;
                let product = self.recipe.product_of(input_kind)?;
                let fuel_ok = self.fuel.withdraw(1).is_ok();
                let input_ok = self.input.withdraw(1).is_ok();
                let output_ok = self.output.deposit(product, 1).is_ok();
                debug_assert!(fuel_ok && input_ok && output_ok);

                self.state = ProcessState::Idle;
                Some(ProductionOutcome::CycleCompleted { product })
            }
        }
    }

    fn progress_ratio(&self) -> Fixed64 {
        match self.state {
            ProcessState::Idle => Fixed64::ZERO,
            ProcessState::Working { steps_done } => {
                Fixed64::from_num(steps_done) / Fixed64::from_num(self.recipe.cycle_steps())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Building (the tagged capability seam)
// ---------------------------------------------------------------------------

/// Any production building. Conveyors and the world dispatch through this
/// enum; adding a variant touches this module only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Building {
    Miner(Miner),
    Fabricator(Fabricator),
}

impl Building {
    pub(crate) fn miner(position: Vec2, mining_kind: Option<ResourceKind>) -> Self {
        Building::Miner(Miner::new(position, mining_kind))
    }

    pub(crate) fn smelter(position: Vec2) -> Self {
        Building::Fabricator(Fabricator::new(position, Recipe::Smelting))
    }

    pub(crate) fn arms_factory(position: Vec2) -> Self {
        Building::Fabricator(Fabricator::new(position, Recipe::Forging))
    }

    pub fn kind(&self) -> BuildingKind {
        match self {
            Building::Miner(_) => BuildingKind::Miner,
            Building::Fabricator(f) => match f.recipe {
                Recipe::Smelting => BuildingKind::Smelter,
                Recipe::Forging => BuildingKind::ArmsFactory,
            },
        }
    }

    pub fn position(&self) -> Vec2 {
        match self {
            Building::Miner(m) => m.position,
            Building::Fabricator(f) => f.position,
        }
    }

    pub fn is_built(&self) -> bool {
        match self {
            Building::Miner(m) => m.built,
            Building::Fabricator(f) => f.built,
        }
    }

    /// Activate the building. Idempotent; a second build changes nothing.
    pub(crate) fn build(&mut self) {
        match self {
            Building::Miner(m) => m.built = true,
            Building::Fabricator(f) => f.built = true,
        }
    }

    /// The miner's latched binding; None for fabricators and unbound miners.
    pub fn mining_kind(&self) -> Option<ResourceKind> {
        match self {
            Building::Miner(m) => m.mining_kind(),
            Building::Fabricator(_) => None,
        }
    }

    /// A slot by role, or None where the variant has no such slot
    /// (miners only have an output).
    pub fn slot(&self, role: SlotRole) -> Option<&InventorySlot> {
        match (self, role) {
            (Building::Miner(m), SlotRole::Output) => Some(&m.output),
            (Building::Miner(_), _) => None,
            (Building::Fabricator(f), SlotRole::Fuel) => Some(&f.fuel),
            (Building::Fabricator(f), SlotRole::Input) => Some(&f.input),
            (Building::Fabricator(f), SlotRole::Output) => Some(&f.output),
        }
    }

    pub fn slot_mut(&mut self, role: SlotRole) -> Option<&mut InventorySlot> {
        match (self, role) {
            (Building::Miner(m), SlotRole::Output) => Some(&mut m.output),
            (Building::Miner(_), _) => None,
            (Building::Fabricator(f), SlotRole::Fuel) => Some(&mut f.fuel),
            (Building::Fabricator(f), SlotRole::Input) => Some(&mut f.input),
            (Building::Fabricator(f), SlotRole::Output) => Some(&mut f.output),
        }
    }

    /// Cycle (or extraction-interval) completion ratio in [0, 1].
    pub fn progress_ratio(&self) -> Fixed64 {
        match self {
            Building::Miner(m) => m.progress_ratio(),
            Building::Fabricator(f) => f.progress_ratio(),
        }
    }

    /// Whether a manual transfer may place `kind` into the `role` slot.
    /// Output slots never take manual deposits, and miners take nothing.
    pub fn manual_deposit_allowed(&self, role: SlotRole, kind: ResourceKind) -> bool {
        match (self, role) {
            (Building::Fabricator(_), SlotRole::Fuel) => kind.is_fuel(),
            (Building::Fabricator(f), SlotRole::Input) => f.recipe.accepts_input(kind),
            _ => false,
        }
    }

    /// Belt pull capability: withdraw one unit from the output slot.
    /// Unbuilt buildings and empty outputs yield None.
    pub fn try_pull(&mut self) -> Option<ResourceKind> {
        if !self.is_built() {
            return None;
        }
        let output = self.slot_mut(SlotRole::Output)?;
        output.withdraw(1).ok()
    }

    /// Belt accept capability: route one arriving unit to the slot its kind
    /// belongs in (fuel -> fuel slot, recipe input -> input slot). Returns
    /// false, mutating nothing, when the unit has no home here.
    pub fn try_accept(&mut self, kind: ResourceKind) -> bool {
        if !self.is_built() {
            return false;
        }
        let Building::Fabricator(f) = self else {
            return false;
        };
        if kind.is_fuel() {
            f.fuel.deposit(kind, 1).is_ok()
        } else if f.recipe.accepts_input(kind) {
            f.input.deposit(kind, 1).is_ok()
        } else {
            false
        }
    }

    /// One production step (0.1 s cadence). No-op until built.
    pub(crate) fn step_production(&mut self) -> Option<ProductionOutcome> {
        if !self.is_built() {
            return None;
        }
        match self {
            Building::Miner(m) => m.step(),
            Building::Fabricator(f) => f.step(),
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn built_miner(kind: ResourceKind) -> Building {
        let mut b = Building::miner(Vec2::ZERO, Some(kind));
        b.build();
        b
    }

    fn stocked_smelter(fuel: u32, input_kind: ResourceKind, input: u32) -> Building {
        let mut b = Building::smelter(Vec2::ZERO);
        b.build();
        b.slot_mut(SlotRole::Fuel)
            .unwrap()
            .deposit(ResourceKind::Coal, fuel)
            .unwrap();
        b.slot_mut(SlotRole::Input)
            .unwrap()
            .deposit(input_kind, input)
            .unwrap();
        b
    }

    fn run_steps(b: &mut Building, steps: u32) -> Vec<ProductionOutcome> {
        (0..steps).filter_map(|_| b.step_production()).collect()
    }

    // -----------------------------------------------------------------------
    // Test 1: Miner extracts exactly on its cadence
    // -----------------------------------------------------------------------
    #[test]
    fn miner_extracts_on_cadence() {
        let mut miner = built_miner(ResourceKind::Iron);

        let outcomes = run_steps(&mut miner, MINER_EXTRACT_STEPS - 1);
        assert!(outcomes.is_empty(), "extracted before the interval elapsed");

        assert_eq!(
            miner.step_production(),
            Some(ProductionOutcome::Extracted {
                kind: ResourceKind::Iron
            })
        );
        assert_eq!(miner.slot(SlotRole::Output).unwrap().count(), 1);

        // The countdown restarts: another full interval to the next unit.
        let outcomes = run_steps(&mut miner, MINER_EXTRACT_STEPS - 1);
        assert!(outcomes.is_empty());
        assert!(miner.step_production().is_some());
        assert_eq!(miner.slot(SlotRole::Output).unwrap().count(), 2);
    }

    // -----------------------------------------------------------------------
    // Test 2: Full output drops the unit instead of blocking
    // -----------------------------------------------------------------------
    #[test]
    fn miner_drops_on_full_output() {
        let mut miner = built_miner(ResourceKind::Iron);
        miner
            .slot_mut(SlotRole::Output)
            .unwrap()
            .deposit(ResourceKind::Iron, 99)
            .unwrap();

        let outcomes = run_steps(&mut miner, MINER_EXTRACT_STEPS);
        assert_eq!(
            outcomes,
            vec![ProductionOutcome::ExtractionDropped {
                kind: ResourceKind::Iron
            }]
        );
        assert_eq!(miner.slot(SlotRole::Output).unwrap().count(), 99);
    }

    // -----------------------------------------------------------------------
    // Test 3: Kind-blocked output also drops
    // -----------------------------------------------------------------------
    #[test]
    fn miner_drops_on_kind_conflict() {
        let mut miner = built_miner(ResourceKind::Iron);
        miner
            .slot_mut(SlotRole::Output)
            .unwrap()
            .deposit(ResourceKind::Stone, 1)
            .unwrap();

        let outcomes = run_steps(&mut miner, MINER_EXTRACT_STEPS);
        assert_eq!(
            outcomes,
            vec![ProductionOutcome::ExtractionDropped {
                kind: ResourceKind::Iron
            }]
        );
    }

    // -----------------------------------------------------------------------
    // Test 4: Unbound and unbuilt miners no-op
    // -----------------------------------------------------------------------
    #[test]
    fn unbound_and_unbuilt_miners_noop() {
        let mut unbound = Building::miner(Vec2::ZERO, None);
        unbound.build();
        assert!(run_steps(&mut unbound, MINER_EXTRACT_STEPS * 3).is_empty());

        let mut unbuilt = Building::miner(Vec2::ZERO, Some(ResourceKind::Coal));
        assert!(run_steps(&mut unbuilt, MINER_EXTRACT_STEPS * 3).is_empty());
        assert!(unbuilt.slot(SlotRole::Output).unwrap().is_empty());
    }

    // -----------------------------------------------------------------------
    // Test 5: Build is idempotent and does not reset the countdown
    // -----------------------------------------------------------------------
    #[test]
    fn rebuild_does_not_reset_countdown() {
        let mut miner = built_miner(ResourceKind::Copper);
        run_steps(&mut miner, 10);
        miner.build();
        let outcomes = run_steps(&mut miner, MINER_EXTRACT_STEPS - 10);
        assert_eq!(outcomes.len(), 1);
    }

    // -----------------------------------------------------------------------
    // Test 6: Smelter conservation -- one cycle, exact amounts
    // -----------------------------------------------------------------------
    #[test]
    fn smelter_cycle_conserves_exactly() {
        let mut smelter = stocked_smelter(5, ResourceKind::Iron, 3);

        // First step enters Working; the cycle completes on step 30.
        let outcomes = run_steps(&mut smelter, SMELTER_CYCLE_STEPS - 1);
        assert!(outcomes.is_empty());
        assert!(smelter.slot(SlotRole::Output).unwrap().is_empty());

        assert_eq!(
            smelter.step_production(),
            Some(ProductionOutcome::CycleCompleted {
                product: ResourceKind::IronIngot
            })
        );
        assert_eq!(smelter.slot(SlotRole::Fuel).unwrap().count(), 4);
        assert_eq!(smelter.slot(SlotRole::Input).unwrap().count(), 2);
        assert_eq!(
            smelter.slot(SlotRole::Output).unwrap().kind(),
            Some(ResourceKind::IronIngot)
        );
        assert_eq!(smelter.slot(SlotRole::Output).unwrap().count(), 1);
    }

    // -----------------------------------------------------------------------
    // Test 7: Copper smelts into copper ingots
    // -----------------------------------------------------------------------
    #[test]
    fn smelter_maps_copper_to_copper_ingot() {
        let mut smelter = stocked_smelter(1, ResourceKind::Copper, 1);
        let outcomes = run_steps(&mut smelter, SMELTER_CYCLE_STEPS);
        assert_eq!(
            outcomes,
            vec![ProductionOutcome::CycleCompleted {
                product: ResourceKind::CopperIngot
            }]
        );
    }

    // -----------------------------------------------------------------------
    // Test 8: Mid-cycle fuel loss resets progress, consumes nothing
    // -----------------------------------------------------------------------
    #[test]
    fn interrupted_cycle_resets_without_consuming() {
        let mut smelter = stocked_smelter(1, ResourceKind::Iron, 1);
        run_steps(&mut smelter, 10);
        assert!(matches!(
            smelter,
            Building::Fabricator(f) if matches!(f.state(), ProcessState::Working { .. })
        ));

        // External withdrawal mid-cycle.
        smelter.slot_mut(SlotRole::Fuel).unwrap().withdraw(1).unwrap();

        assert_eq!(
            smelter.step_production(),
            Some(ProductionOutcome::CycleInterrupted)
        );
        assert_eq!(smelter.slot(SlotRole::Input).unwrap().count(), 1);
        assert!(smelter.slot(SlotRole::Output).unwrap().is_empty());

        // Restock: a full cycle is required again, no partial credit.
        smelter
            .slot_mut(SlotRole::Fuel)
            .unwrap()
            .deposit(ResourceKind::Coal, 1)
            .unwrap();
        let outcomes = run_steps(&mut smelter, SMELTER_CYCLE_STEPS - 1);
        assert!(outcomes.is_empty());
        assert_eq!(
            smelter.step_production(),
            Some(ProductionOutcome::CycleCompleted {
                product: ResourceKind::IronIngot
            })
        );
    }

    // -----------------------------------------------------------------------
    // Test 9: Full output blocks the cycle and consumes nothing
    // -----------------------------------------------------------------------
    #[test]
    fn full_output_blocks_without_consuming() {
        let mut smelter = stocked_smelter(2, ResourceKind::Iron, 2);
        smelter
            .slot_mut(SlotRole::Output)
            .unwrap()
            .deposit(ResourceKind::IronIngot, 99)
            .unwrap();

        // Never starts: stays idle across two full cycle lengths.
        assert!(run_steps(&mut smelter, SMELTER_CYCLE_STEPS * 2).is_empty());
        assert_eq!(smelter.slot(SlotRole::Fuel).unwrap().count(), 2);
        assert_eq!(smelter.slot(SlotRole::Input).unwrap().count(), 2);
        assert_eq!(smelter.slot(SlotRole::Output).unwrap().count(), 99);
    }

    // -----------------------------------------------------------------------
    // Test 10: Output filled mid-cycle interrupts on the next step
    // -----------------------------------------------------------------------
    #[test]
    fn output_filled_mid_cycle_interrupts() {
        let mut smelter = stocked_smelter(1, ResourceKind::Iron, 1);
        run_steps(&mut smelter, 20);

        smelter
            .slot_mut(SlotRole::Output)
            .unwrap()
            .deposit(ResourceKind::IronIngot, 99)
            .unwrap();

        assert_eq!(
            smelter.step_production(),
            Some(ProductionOutcome::CycleInterrupted)
        );
        assert_eq!(smelter.slot(SlotRole::Fuel).unwrap().count(), 1);
        assert_eq!(smelter.slot(SlotRole::Input).unwrap().count(), 1);
    }

    // -----------------------------------------------------------------------
    // Test 11: Arms factory forges ingots into ammunition over 40 steps
    // -----------------------------------------------------------------------
    #[test]
    fn arms_factory_forges_ammunition() {
        for ingot in [ResourceKind::IronIngot, ResourceKind::CopperIngot] {
            let mut arms = Building::arms_factory(Vec2::ZERO);
            arms.build();
            arms.slot_mut(SlotRole::Fuel)
                .unwrap()
                .deposit(ResourceKind::Coal, 1)
                .unwrap();
            arms.slot_mut(SlotRole::Input)
                .unwrap()
                .deposit(ingot, 1)
                .unwrap();

            let outcomes = run_steps(&mut arms, ARMS_CYCLE_STEPS - 1);
            assert!(outcomes.is_empty(), "{ingot:?} finished early");
            assert_eq!(
                arms.step_production(),
                Some(ProductionOutcome::CycleCompleted {
                    product: ResourceKind::Ammunition
                })
            );
        }
    }

    // -----------------------------------------------------------------------
    // Test 12: Smelter rejects non-ore inputs via preconditions
    // -----------------------------------------------------------------------
    #[test]
    fn smelter_ignores_invalid_input_kind() {
        let mut smelter = Building::smelter(Vec2::ZERO);
        smelter.build();
        smelter
            .slot_mut(SlotRole::Fuel)
            .unwrap()
            .deposit(ResourceKind::Coal, 1)
            .unwrap();
        // Stone in the input slot (placed manually) never smelts.
        smelter
            .slot_mut(SlotRole::Input)
            .unwrap()
            .deposit(ResourceKind::Stone, 1)
            .unwrap();

        assert!(run_steps(&mut smelter, SMELTER_CYCLE_STEPS * 2).is_empty());
        assert_eq!(smelter.slot(SlotRole::Fuel).unwrap().count(), 1);
    }

    // -----------------------------------------------------------------------
    // Test 13: try_pull draws from the output slot only when built
    // -----------------------------------------------------------------------
    #[test]
    fn try_pull_from_output() {
        let mut smelter = Building::smelter(Vec2::ZERO);
        smelter.build();
        smelter
            .slot_mut(SlotRole::Output)
            .unwrap()
            .deposit(ResourceKind::IronIngot, 2)
            .unwrap();

        assert_eq!(smelter.try_pull(), Some(ResourceKind::IronIngot));
        assert_eq!(smelter.slot(SlotRole::Output).unwrap().count(), 1);
        assert_eq!(smelter.try_pull(), Some(ResourceKind::IronIngot));
        assert_eq!(smelter.try_pull(), None);

        let mut unbuilt = Building::smelter(Vec2::ZERO);
        unbuilt
            .slot_mut(SlotRole::Output)
            .unwrap()
            .deposit(ResourceKind::IronIngot, 1)
            .unwrap();
        assert_eq!(unbuilt.try_pull(), None);
    }

    // -----------------------------------------------------------------------
    // Test 14: try_accept routes by kind
    // -----------------------------------------------------------------------
    #[test]
    fn try_accept_routes_by_kind() {
        let mut smelter = Building::smelter(Vec2::ZERO);
        smelter.build();

        assert!(smelter.try_accept(ResourceKind::Coal));
        assert_eq!(smelter.slot(SlotRole::Fuel).unwrap().count(), 1);

        assert!(smelter.try_accept(ResourceKind::Iron));
        assert_eq!(smelter.slot(SlotRole::Input).unwrap().count(), 1);

        // No home for stone in a smelter.
        assert!(!smelter.try_accept(ResourceKind::Stone));

        // Arms factory takes ingots, not ores.
        let mut arms = Building::arms_factory(Vec2::ZERO);
        arms.build();
        assert!(arms.try_accept(ResourceKind::IronIngot));
        assert!(!arms.try_accept(ResourceKind::Iron));
    }

    // -----------------------------------------------------------------------
    // Test 15: Miners and unbuilt buildings accept nothing
    // -----------------------------------------------------------------------
    #[test]
    fn miners_and_unbuilt_accept_nothing() {
        let mut miner = built_miner(ResourceKind::Iron);
        assert!(!miner.try_accept(ResourceKind::Coal));

        let mut unbuilt = Building::smelter(Vec2::ZERO);
        assert!(!unbuilt.try_accept(ResourceKind::Coal));
    }

    // -----------------------------------------------------------------------
    // Test 16: try_accept fails cleanly on a full target slot
    // -----------------------------------------------------------------------
    #[test]
    fn try_accept_full_slot_fails() {
        let mut smelter = Building::smelter(Vec2::ZERO);
        smelter.build();
        smelter
            .slot_mut(SlotRole::Fuel)
            .unwrap()
            .deposit(ResourceKind::Coal, 99)
            .unwrap();
        assert!(!smelter.try_accept(ResourceKind::Coal));
        assert_eq!(smelter.slot(SlotRole::Fuel).unwrap().count(), 99);
    }

    // -----------------------------------------------------------------------
    // Test 17: Progress ratio tracks the cycle
    // -----------------------------------------------------------------------
    #[test]
    fn progress_ratio_tracks_cycle() {
        let mut smelter = stocked_smelter(1, ResourceKind::Iron, 1);
        assert_eq!(smelter.progress_ratio(), Fixed64::ZERO);

        run_steps(&mut smelter, 15);
        assert_eq!(smelter.progress_ratio(), Fixed64::from_num(0.5));

        run_steps(&mut smelter, 15);
        // Cycle complete, back to idle.
        assert_eq!(smelter.progress_ratio(), Fixed64::ZERO);
    }

    // -----------------------------------------------------------------------
    // Test 18: Slot roles match the variant shape
    // -----------------------------------------------------------------------
    #[test]
    fn slot_roles_match_variant() {
        let miner = Building::miner(Vec2::ZERO, None);
        assert!(miner.slot(SlotRole::Output).is_some());
        assert!(miner.slot(SlotRole::Fuel).is_none());
        assert!(miner.slot(SlotRole::Input).is_none());

        let smelter = Building::smelter(Vec2::ZERO);
        for role in [SlotRole::Fuel, SlotRole::Input, SlotRole::Output] {
            assert!(smelter.slot(role).is_some());
        }
    }
}
