//! Initiative order and turn tracking.
//!
//! [`CombatManager`] is a short-lived handle over a [`Roster`]. It never
//! copies the roster; every transition is applied to the roster's own
//! active pointer, so the map and the tracker always agree on whose turn it is.
//!
//! Two states exist: *Idle* (no active pointer) and *InCombat*. Starting
//! combat on an empty roster is refused and leaves the roster Idle.

use rand::Rng;
use std::cmp::Ordering;
use thiserror::Error;
use tracing::{debug, info};

use crate::dice::DiceRoller;
use crate::roster::{Combatant, CombatantId, Roster, RosterError};

/// Errors from combat operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CombatError {
    #[error("No combatants in the roster")]
    EmptyRoster,

    #[error("Combat has not started")]
    NotInCombat,

    #[error(transparent)]
    Roster(#[from] RosterError),
}

/// Highest initiative first. Used with a stable sort, so ties keep roster order.
fn by_initiative(a: &Combatant, b: &Combatant) -> Ordering {
    b.initiative.cmp(&a.initiative)
}

/// Turn-order operations over a borrowed roster.
#[derive(Debug)]
pub struct CombatManager<'r> {
    roster: &'r mut Roster,
}

impl<'r> CombatManager<'r> {
    pub fn new(roster: &'r mut Roster) -> Self {
        Self { roster }
    }

    pub fn roster(&self) -> &Roster {
        &*self.roster
    }

    /// Sort the roster by initiative and hand the first turn to the top entry.
    pub fn start_combat(&mut self) -> Result<&Combatant, CombatError> {
        if self.roster.is_empty() {
            return Err(CombatError::EmptyRoster);
        }

        self.roster.combatants.sort_by(by_initiative);
        self.roster.active = Some(0);
        self.roster.round = 1;

        let first = &self.roster.combatants[0];
        info!(
            combatants = self.roster.combatants.len(),
            first = %first.name,
            "Combat started"
        );
        Ok(first)
    }

    /// Advance to the next combatant, wrapping to the top of the order.
    pub fn next_turn(&mut self) -> Result<&Combatant, CombatError> {
        let len = self.roster.len();
        if len == 0 {
            return Err(CombatError::EmptyRoster);
        }
        let active = self.roster.active.ok_or(CombatError::NotInCombat)?;

        let next = (active + 1) % len;
        if next == 0 {
            self.roster.round += 1;
            debug!(round = self.roster.round, "New round");
        }
        self.roster.active = Some(next);

        let current = &self.roster.combatants[next];
        debug!(name = %current.name, round = self.roster.round, "Next turn");
        Ok(current)
    }

    /// The combatant whose turn it is.
    pub fn current_combatant(&self) -> Result<&Combatant, CombatError> {
        if self.roster.is_empty() {
            return Err(CombatError::EmptyRoster);
        }
        self.roster.active().ok_or(CombatError::NotInCombat)
    }

    /// Overwrite a combatant's initiative score in place.
    ///
    /// The roster is not re-sorted; the new score takes effect at the next
    /// [`start_combat`](Self::start_combat).
    pub fn set_initiative(&mut self, id: &CombatantId, value: i32) -> Result<(), CombatError> {
        let combatant = self.roster.get_mut(id)?;
        combatant.initiative = value;
        debug!(id = %id, initiative = value, "Initiative set");
        Ok(())
    }

    /// Roll a d20 plus `modifier` and store it as the combatant's initiative.
    ///
    /// Returns the stored total. An unknown id fails without rolling.
    pub fn roll_initiative<R: Rng>(
        &mut self,
        id: &CombatantId,
        modifier: i32,
        roller: &mut DiceRoller<R>,
    ) -> Result<i32, CombatError> {
        if !self.roster.contains(id) {
            return Err(RosterError::NotFound(id.clone()).into());
        }
        let total = roller.d20() as i32 + modifier;
        self.set_initiative(id, total)?;
        Ok(total)
    }

    /// Snapshot of the roster in initiative order. The roster itself is untouched.
    pub fn combat_order(&self) -> Vec<Combatant> {
        let mut order = self.roster.combatants.clone();
        order.sort_by(by_initiative);
        order
    }

    /// Return to Idle.
    pub fn end_combat(&mut self) {
        if self.roster.active.take().is_some() {
            info!(rounds = self.roster.round, "Combat ended");
        }
        self.roster.round = 0;
    }

    pub fn is_active(&self) -> bool {
        self.roster.active.is_some()
    }

    pub fn round(&self) -> u32 {
        self.roster.round
    }
}
