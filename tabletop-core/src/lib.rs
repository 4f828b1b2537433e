//! Tabletop engine: grid map, combatant roster and initiative tracking.
//!
//! This crate provides:
//! - Dice notation parsing and rolling with an injectable RNG
//! - A roster of combatants with ability scores and turn-order tracking
//! - A grid map with terrain, fog of war and placed tokens
//! - A capped log of formatted roll results
//! - Snapshot persistence over a pluggable key-value store
//!
//! # Quick Start
//!
//! ```ignore
//! use tabletop_core::{DirectoryStore, NewCombatant, Table, TableConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut table = Table::new(TableConfig::new());
//!
//!     let aria = table.add_combatant(NewCombatant::new("Aria").with_initiative(15));
//!     table.add_combatant(NewCombatant::new("Goblin").with_initiative(12));
//!
//!     let first = table.combat().start_combat()?;
//!     println!("{} goes first", first.name);
//!
//!     table.roll_initiative_for(&aria)?;
//!     table.save(&DirectoryStore::new("saves")).await?;
//!     Ok(())
//! }
//! ```

pub mod combat;
pub mod config;
pub mod dice;
pub mod map;
pub mod persist;
pub mod roll_log;
pub mod roster;
pub mod table;
pub mod testing;

// Primary public API
pub use combat::{CombatError, CombatManager};
pub use config::TableConfig;
pub use dice::{DiceError, DiceExpression, DiceResult, DiceRoller};
pub use map::{Cell, GridSettings, Layer, MapData, MapError, Mode, TerrainKind, Tool};
pub use persist::{DirectoryStore, KeyValueStore, MemoryStore, PersistError};
pub use roll_log::RollLog;
pub use roster::{
    Ability, AbilityScores, Combatant, CombatantId, CombatantKind, CombatantPatch, NewCombatant,
    Roster, RosterError,
};
pub use table::{ClickOutcome, Table, TableError};
pub use testing::TestHarness;
