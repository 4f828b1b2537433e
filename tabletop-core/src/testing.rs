//! Testing utilities for tabletop sessions.
//!
//! This module provides tools for integration testing:
//! - `TestHarness` for scripted encounters on a deterministically seeded table
//! - `seeded_roller` and `roster_with_initiatives` fixtures
//! - Assertion helpers for verifying turn order and combat state

use crate::config::TableConfig;
use crate::dice::DiceRoller;
use crate::roster::{CombatantId, NewCombatant, Roster};
use crate::table::Table;

/// Seed used by [`TestHarness::new`].
pub const DEFAULT_TEST_SEED: u64 = 42;

/// A dice roller with a fixed seed.
pub fn seeded_roller(seed: u64) -> DiceRoller {
    DiceRoller::seeded(seed)
}

/// A roster holding `(name, initiative)` pairs in the given order.
pub fn roster_with_initiatives(entries: &[(&str, i32)]) -> Roster {
    let mut roster = Roster::new();
    for &(name, initiative) in entries {
        roster.add(NewCombatant::new(name).with_initiative(initiative));
    }
    roster
}

/// Test harness for scripted encounters.
pub struct TestHarness {
    /// The table under test. Rolls are reproducible for a given seed.
    pub table: Table,
}

impl TestHarness {
    /// Create a harness over an empty table with the default seed.
    pub fn new() -> Self {
        Self::with_seed(DEFAULT_TEST_SEED)
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::with_config(TableConfig::new(), seed)
    }

    pub fn with_config(config: TableConfig, seed: u64) -> Self {
        Self {
            table: Table::with_roller(config, seeded_roller(seed)),
        }
    }

    /// Create a harness pre-populated with `(name, initiative)` pairs, in order.
    pub fn with_initiatives(entries: &[(&str, i32)]) -> Self {
        let mut harness = Self::new();
        for &(name, initiative) in entries {
            harness.add(name, initiative);
        }
        harness
    }

    /// Add a combatant with a fixed initiative.
    pub fn add(&mut self, name: &str, initiative: i32) -> CombatantId {
        self.table
            .add_combatant(NewCombatant::new(name).with_initiative(initiative))
    }

    /// Look up a combatant's id by name.
    pub fn id_of(&self, name: &str) -> Option<CombatantId> {
        self.table
            .roster()
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.id.clone())
    }

    /// Start combat, returning the first combatant's name.
    pub fn start(&mut self) -> String {
        self.table
            .combat()
            .start_combat()
            .map(|c| c.name.clone())
            .unwrap_or_else(|e| panic!("start_combat failed: {e}"))
    }

    /// Advance one turn, returning the new active combatant's name.
    pub fn advance(&mut self) -> String {
        self.table
            .combat()
            .next_turn()
            .map(|c| c.name.clone())
            .unwrap_or_else(|e| panic!("next_turn failed: {e}"))
    }

    /// Name of the combatant whose turn it is.
    pub fn current_name(&self) -> Option<&str> {
        self.table.roster().active().map(|c| c.name.as_str())
    }

    /// Roster names in their current order.
    pub fn names(&self) -> Vec<String> {
        self.table.roster().iter().map(|c| c.name.clone()).collect()
    }

    pub fn in_combat(&self) -> bool {
        self.table.roster().active_index().is_some()
    }

    pub fn round(&self) -> u32 {
        self.table.roster().round()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Assertion helpers
// ============================================================================

/// Assert the roster is in exactly this order.
#[track_caller]
pub fn assert_turn_order(harness: &TestHarness, expected: &[&str]) {
    let actual = harness.names();
    assert_eq!(actual, expected, "Unexpected turn order");
}

/// Assert it is `name`'s turn.
#[track_caller]
pub fn assert_active(harness: &TestHarness, name: &str) {
    assert_eq!(
        harness.current_name(),
        Some(name),
        "Expected it to be {name}'s turn"
    );
}

/// Assert combat is running.
#[track_caller]
pub fn assert_in_combat(harness: &TestHarness) {
    assert!(harness.in_combat(), "Expected to be in combat");
}

/// Assert combat is NOT running.
#[track_caller]
pub fn assert_not_in_combat(harness: &TestHarness) {
    assert!(!harness.in_combat(), "Expected to NOT be in combat");
}
