//! The combat roster.
//!
//! [`Roster`] is the single owner of every tracked combatant and of the
//! active-turn pointer. Map placements and the combat tracker refer to
//! entries by [`CombatantId`]; all mutation goes through the roster so the
//! active index can never point past the end of the list.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::dice::ability_modifier;

/// Errors from roster lookups and mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RosterError {
    #[error("Combatant not found: {0}")]
    NotFound(CombatantId),

    #[error("Combatant id already in use: {0}")]
    DuplicateId(CombatantId),
}

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a roster entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CombatantId(pub String);

impl CombatantId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CombatantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CombatantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CombatantId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for CombatantId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ============================================================================
// Abilities
// ============================================================================

/// The six ability scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ability {
    Strength,
    Dexterity,
    Constitution,
    Intelligence,
    Wisdom,
    Charisma,
}

impl Ability {
    pub const ALL: [Ability; 6] = [
        Ability::Strength,
        Ability::Dexterity,
        Ability::Constitution,
        Ability::Intelligence,
        Ability::Wisdom,
        Ability::Charisma,
    ];

    pub fn abbreviation(&self) -> &'static str {
        match self {
            Ability::Strength => "STR",
            Ability::Dexterity => "DEX",
            Ability::Constitution => "CON",
            Ability::Intelligence => "INT",
            Ability::Wisdom => "WIS",
            Ability::Charisma => "CHA",
        }
    }

    /// Accepts either the abbreviation or the full name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Ability> {
        let name = name.trim().to_lowercase();
        Ability::ALL.into_iter().find(|a| {
            a.abbreviation().eq_ignore_ascii_case(&name) || format!("{a:?}").to_lowercase() == name
        })
    }
}

impl fmt::Display for Ability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.abbreviation())
    }
}

/// Ability scores for a combatant. Scores are free-form integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityScores {
    pub strength: i32,
    pub dexterity: i32,
    pub constitution: i32,
    pub intelligence: i32,
    pub wisdom: i32,
    pub charisma: i32,
}

impl AbilityScores {
    pub fn new(str: i32, dex: i32, con: i32, int: i32, wis: i32, cha: i32) -> Self {
        Self {
            strength: str,
            dexterity: dex,
            constitution: con,
            intelligence: int,
            wisdom: wis,
            charisma: cha,
        }
    }

    pub fn get(&self, ability: Ability) -> i32 {
        match ability {
            Ability::Strength => self.strength,
            Ability::Dexterity => self.dexterity,
            Ability::Constitution => self.constitution,
            Ability::Intelligence => self.intelligence,
            Ability::Wisdom => self.wisdom,
            Ability::Charisma => self.charisma,
        }
    }

    pub fn set(&mut self, ability: Ability, score: i32) {
        match ability {
            Ability::Strength => self.strength = score,
            Ability::Dexterity => self.dexterity = score,
            Ability::Constitution => self.constitution = score,
            Ability::Intelligence => self.intelligence = score,
            Ability::Wisdom => self.wisdom = score,
            Ability::Charisma => self.charisma = score,
        }
    }

    pub fn modifier(&self, ability: Ability) -> i32 {
        ability_modifier(self.get(ability))
    }
}

impl Default for AbilityScores {
    fn default() -> Self {
        Self::new(10, 10, 10, 10, 10, 10)
    }
}

// ============================================================================
// Combatants
// ============================================================================

/// What side of the table a combatant is on. Drives token colour on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CombatantKind {
    #[default]
    Player,
    Enemy,
    Npc,
    Other,
}

impl CombatantKind {
    pub fn label(&self) -> &'static str {
        match self {
            CombatantKind::Player => "player",
            CombatantKind::Enemy => "enemy",
            CombatantKind::Npc => "npc",
            CombatantKind::Other => "other",
        }
    }

    pub fn from_name(name: &str) -> Option<CombatantKind> {
        match name.trim().to_lowercase().as_str() {
            "player" | "pc" => Some(CombatantKind::Player),
            "enemy" | "monster" => Some(CombatantKind::Enemy),
            "npc" => Some(CombatantKind::Npc),
            "other" => Some(CombatantKind::Other),
            _ => None,
        }
    }
}

impl fmt::Display for CombatantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A roster entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combatant {
    pub id: CombatantId,
    pub name: String,
    pub kind: CombatantKind,
    pub initiative: i32,
    pub hp: i32,
    pub ac: i32,
    #[serde(default)]
    pub attributes: AbilityScores,
    #[serde(default)]
    pub notes: String,
}

/// Payload for adding a combatant; the roster assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCombatant {
    pub name: String,
    pub kind: CombatantKind,
    pub hp: i32,
    pub ac: i32,
    pub initiative: i32,
    pub attributes: AbilityScores,
    pub notes: String,
}

impl NewCombatant {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: CombatantKind::default(),
            hp: 10,
            ac: 10,
            initiative: 0,
            attributes: AbilityScores::default(),
            notes: String::new(),
        }
    }

    pub fn with_kind(mut self, kind: CombatantKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_hp(mut self, hp: i32) -> Self {
        self.hp = hp;
        self
    }

    pub fn with_ac(mut self, ac: i32) -> Self {
        self.ac = ac;
        self
    }

    pub fn with_initiative(mut self, initiative: i32) -> Self {
        self.initiative = initiative;
        self
    }

    pub fn with_attributes(mut self, attributes: AbilityScores) -> Self {
        self.attributes = attributes;
        self
    }

    fn into_combatant(self, id: CombatantId) -> Combatant {
        Combatant {
            id,
            name: self.name,
            kind: self.kind,
            initiative: self.initiative,
            hp: self.hp,
            ac: self.ac,
            attributes: self.attributes,
            notes: self.notes,
        }
    }
}

/// Partial update merged into an existing combatant. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CombatantPatch {
    pub name: Option<String>,
    pub kind: Option<CombatantKind>,
    pub initiative: Option<i32>,
    pub hp: Option<i32>,
    pub ac: Option<i32>,
    pub attributes: Option<AbilityScores>,
    pub notes: Option<String>,
}

impl CombatantPatch {
    fn apply(self, combatant: &mut Combatant) {
        if let Some(name) = self.name {
            combatant.name = name;
        }
        if let Some(kind) = self.kind {
            combatant.kind = kind;
        }
        if let Some(initiative) = self.initiative {
            combatant.initiative = initiative;
        }
        if let Some(hp) = self.hp {
            combatant.hp = hp;
        }
        if let Some(ac) = self.ac {
            combatant.ac = ac;
        }
        if let Some(attributes) = self.attributes {
            combatant.attributes = attributes;
        }
        if let Some(notes) = self.notes {
            combatant.notes = notes;
        }
    }
}

// ============================================================================
// Roster
// ============================================================================

/// Ordered combatants plus the active-turn pointer.
///
/// `active` is `None` while no combat is running. When set it is always a
/// valid index into `combatants`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    pub(crate) combatants: Vec<Combatant>,
    #[serde(default)]
    pub(crate) active: Option<usize>,
    #[serde(default)]
    pub(crate) round: u32,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new combatant with a fresh id.
    pub fn add(&mut self, new: NewCombatant) -> &Combatant {
        let combatant = new.into_combatant(CombatantId::new());
        debug!(id = %combatant.id, name = %combatant.name, "Adding combatant");
        self.combatants.push(combatant);
        &self.combatants[self.combatants.len() - 1]
    }

    /// Insert a fully-formed combatant, keeping its id.
    pub fn insert(&mut self, combatant: Combatant) -> Result<&Combatant, RosterError> {
        if self.contains(&combatant.id) {
            return Err(RosterError::DuplicateId(combatant.id));
        }
        debug!(id = %combatant.id, name = %combatant.name, "Inserting combatant");
        self.combatants.push(combatant);
        Ok(&self.combatants[self.combatants.len() - 1])
    }

    /// Clone an entry under a fresh id, appending `" (Copy)"` to its name.
    pub fn duplicate(&mut self, id: &CombatantId) -> Result<&Combatant, RosterError> {
        let mut copy = self.get(id)?.clone();
        copy.id = CombatantId::new();
        copy.name = format!("{} (Copy)", copy.name);
        self.insert(copy)
    }

    pub fn get(&self, id: &CombatantId) -> Result<&Combatant, RosterError> {
        self.combatants
            .iter()
            .find(|c| &c.id == id)
            .ok_or_else(|| RosterError::NotFound(id.clone()))
    }

    pub fn get_mut(&mut self, id: &CombatantId) -> Result<&mut Combatant, RosterError> {
        self.combatants
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or_else(|| RosterError::NotFound(id.clone()))
    }

    pub fn position(&self, id: &CombatantId) -> Option<usize> {
        self.combatants.iter().position(|c| &c.id == id)
    }

    pub fn contains(&self, id: &CombatantId) -> bool {
        self.position(id).is_some()
    }

    /// Merge `patch` into the entry with `id`.
    pub fn update(
        &mut self,
        id: &CombatantId,
        patch: CombatantPatch,
    ) -> Result<&Combatant, RosterError> {
        let combatant = self.get_mut(id)?;
        patch.apply(combatant);
        Ok(&*combatant)
    }

    /// Remove the entry with `id`, keeping the active pointer valid.
    ///
    /// Removing an entry before the active one shifts the pointer down.
    /// Removing the active entry hands the turn to the entry that followed
    /// it (wrapping to the top and starting a new round). Emptying the
    /// roster ends combat.
    pub fn remove(&mut self, id: &CombatantId) -> Result<Combatant, RosterError> {
        let index = self
            .position(id)
            .ok_or_else(|| RosterError::NotFound(id.clone()))?;
        let removed = self.combatants.remove(index);
        debug!(id = %removed.id, name = %removed.name, "Removed combatant");

        if let Some(active) = self.active {
            if self.combatants.is_empty() {
                self.active = None;
                self.round = 0;
            } else if index < active {
                self.active = Some(active - 1);
            } else if active >= self.combatants.len() {
                self.active = Some(0);
                self.round += 1;
            }
        }

        Ok(removed)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Combatant> {
        self.combatants.iter()
    }

    pub fn as_slice(&self) -> &[Combatant] {
        &self.combatants
    }

    pub fn len(&self) -> usize {
        self.combatants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combatants.is_empty()
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    /// The combatant whose turn it is, if combat is running.
    pub fn active(&self) -> Option<&Combatant> {
        self.active.and_then(|i| self.combatants.get(i))
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    /// Drop an out-of-range active pointer, e.g. after restoring a snapshot.
    ///
    /// Returns `true` if the roster was already consistent.
    pub fn validate(&mut self) -> bool {
        match self.active {
            Some(i) if i >= self.combatants.len() => {
                warn!(index = i, len = self.combatants.len(), "Discarding invalid active index");
                self.active = None;
                self.round = 0;
                false
            }
            _ => true,
        }
    }
}
