//! Table - the primary public API for a tabletop session.
//!
//! A [`Table`] is built once from a [`TableConfig`] and owns everything a
//! session touches: the map (and through it the roster), the dice roller,
//! the roll log and the editing state (tool, layer, brush, selection).
//! Front ends hold one `Table` and route every user action through it.

use rand::rngs::StdRng;
use rand::Rng;
use thiserror::Error;
use tracing::{debug, info};

use crate::combat::{CombatError, CombatManager};
use crate::config::TableConfig;
use crate::dice::{parse_dice_type, DiceError, DiceResult, DiceRoller};
use crate::map::{Cell, GridSettings, Layer, MapData, MapError, Mode, TerrainKind, Tool};
use crate::persist::{load_map, save_map, KeyValueStore, PersistError};
use crate::roll_log::{self, RollLog};
use crate::roster::{
    Ability, Combatant, CombatantId, CombatantPatch, NewCombatant, Roster, RosterError,
};

/// Errors from Table operations.
#[derive(Debug, Error)]
pub enum TableError {
    #[error(transparent)]
    Dice(#[from] DiceError),

    #[error(transparent)]
    Roster(#[from] RosterError),

    #[error(transparent)]
    Combat(#[from] CombatError),

    #[error(transparent)]
    Map(#[from] MapError),

    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),

    #[error("No combatant selected")]
    NoSelection,
}

/// What a click on the map did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    TerrainPainted(Cell, TerrainKind),
    TerrainErased(Cell),
    TokenPlaced(CombatantId, Cell),
    FogToggled { cell: Cell, fogged: bool },
    Selected(CombatantId),
    Nothing(Cell),
}

/// A running tabletop session.
#[derive(Debug)]
pub struct Table<R = StdRng> {
    config: TableConfig,
    map: MapData,
    roller: DiceRoller<R>,
    log: RollLog,
    tool: Tool,
    layer: Layer,
    brush: TerrainKind,
    selected: Option<CombatantId>,
}

impl Table<StdRng> {
    /// A table rolling from operating-system entropy.
    pub fn new(config: TableConfig) -> Self {
        Self::with_roller(config, DiceRoller::from_entropy())
    }
}

impl<R: Rng> Table<R> {
    pub fn with_roller(config: TableConfig, roller: DiceRoller<R>) -> Self {
        let map = MapData::with_grid(GridSettings::new(
            config.grid_size,
            config.grid_color.clone(),
        ));
        let log = RollLog::new(config.log_capacity);
        Self {
            config,
            map,
            roller,
            log,
            tool: Tool::default(),
            layer: Layer::default(),
            brush: TerrainKind::Wall,
            selected: None,
        }
    }

    // --- Accessors ----------------------------------------------------------

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn map(&self) -> &MapData {
        &self.map
    }

    pub fn roster(&self) -> &Roster {
        self.map.roster()
    }

    pub fn log(&self) -> &RollLog {
        &self.log
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn layer(&self) -> Layer {
        self.layer
    }

    pub fn brush(&self) -> TerrainKind {
        self.brush
    }

    pub fn mode(&self) -> Mode {
        self.map.mode
    }

    pub fn selected(&self) -> Option<&Combatant> {
        self.selected
            .as_ref()
            .and_then(|id| self.map.roster().get(id).ok())
    }

    // --- Editing state ------------------------------------------------------

    pub fn set_tool(&mut self, tool: Tool) {
        self.tool = tool;
    }

    pub fn set_layer(&mut self, layer: Layer) {
        self.layer = layer;
    }

    pub fn set_brush(&mut self, kind: TerrainKind) {
        self.brush = kind;
    }

    pub fn toggle_mode(&mut self) -> Mode {
        self.map.toggle_mode()
    }

    pub fn set_grid_size(&mut self, size: u32) {
        self.map.set_grid_size(size);
    }

    pub fn set_grid_color(&mut self, color: impl Into<String>) {
        self.map.grid.color = color.into();
    }

    // --- Dice ---------------------------------------------------------------

    /// Roll `count` dice of `dice_type` (e.g. `"d8"`) plus `modifier`.
    pub fn quick_roll(
        &mut self,
        dice_type: &str,
        count: u32,
        modifier: i32,
    ) -> Result<DiceResult, TableError> {
        let sides = parse_dice_type(dice_type)?;
        let result = self.roller.roll(dice_type, count, modifier)?;
        self.log
            .push(roll_log::quick_roll_entry(&format!("d{sides}"), count, &result));
        Ok(result)
    }

    /// Roll free-text notation such as `"2d6+3"`.
    pub fn roll_expression(&mut self, expression: &str) -> Result<DiceResult, TableError> {
        let result = self.roller.parse_expression(expression)?;
        self.log
            .push(roll_log::expression_entry(expression, &result));
        Ok(result)
    }

    /// Roll a d20 check against one of a combatant's ability scores.
    pub fn ability_check(
        &mut self,
        id: &CombatantId,
        ability: Ability,
    ) -> Result<DiceResult, TableError> {
        let combatant = self.map.roster().get(id)?;
        let score = combatant.attributes.get(ability);
        let name = combatant.name.clone();

        let result = self.roller.roll_attribute(score);
        self.log
            .push(roll_log::check_entry(&name, ability, &result));
        Ok(result)
    }

    // --- Roster -------------------------------------------------------------

    /// Add a combatant. The first combatant added becomes the selection.
    pub fn add_combatant(&mut self, new: NewCombatant) -> CombatantId {
        let id = self.map.add_combatant(new).id.clone();
        if self.selected.is_none() {
            self.selected = Some(id.clone());
        }
        id
    }

    pub fn duplicate_combatant(&mut self, id: &CombatantId) -> Result<CombatantId, TableError> {
        Ok(self.map.duplicate_combatant(id)?.id.clone())
    }

    pub fn duplicate_selected(&mut self) -> Result<CombatantId, TableError> {
        let id = self.selected.clone().ok_or(TableError::NoSelection)?;
        self.duplicate_combatant(&id)
    }

    pub fn update_combatant(
        &mut self,
        id: &CombatantId,
        patch: CombatantPatch,
    ) -> Result<(), TableError> {
        self.map.update_combatant(id, patch)?;
        Ok(())
    }

    pub fn remove_combatant(&mut self, id: &CombatantId) -> Result<Combatant, TableError> {
        let removed = self.map.remove_combatant(id)?;
        if self.selected.as_ref() == Some(id) {
            self.selected = None;
        }
        Ok(removed)
    }

    pub fn select(&mut self, id: &CombatantId) -> Result<(), TableError> {
        self.map.roster().get(id)?;
        self.selected = Some(id.clone());
        Ok(())
    }

    // --- Combat -------------------------------------------------------------

    /// Turn-order handle over the roster.
    pub fn combat(&mut self) -> CombatManager<'_> {
        self.map.combat()
    }

    /// Roll initiative for a combatant using its Dexterity modifier.
    pub fn roll_initiative_for(&mut self, id: &CombatantId) -> Result<i32, TableError> {
        let combatant = self.map.roster().get(id)?;
        let modifier = combatant.attributes.modifier(Ability::Dexterity);
        let name = combatant.name.clone();

        let total = self
            .map
            .combat()
            .roll_initiative(id, modifier, &mut self.roller)?;
        self.log
            .push(roll_log::initiative_entry(&name, total, modifier));
        Ok(total)
    }

    // --- Map ----------------------------------------------------------------

    /// Handle a click at pixel position (`px`, `py`).
    ///
    /// In edit mode the active tool is applied to the clicked cell. In play
    /// mode a token under the cursor becomes the selection.
    pub fn click(&mut self, px: i32, py: i32) -> Result<ClickOutcome, TableError> {
        let cell = self.map.grid.snap(px, py);

        if self.map.mode == Mode::Play {
            let Some(token) = self.map.token_at(cell) else {
                return Ok(ClickOutcome::Nothing(cell));
            };
            let id = token.id.clone();
            self.selected = Some(id.clone());
            return Ok(ClickOutcome::Selected(id));
        }

        let outcome = match self.tool {
            Tool::Draw => {
                self.map.paint_terrain(cell, self.brush);
                ClickOutcome::TerrainPainted(cell, self.brush)
            }
            Tool::Erase => {
                if self.map.erase_terrain(cell) {
                    ClickOutcome::TerrainErased(cell)
                } else {
                    ClickOutcome::Nothing(cell)
                }
            }
            Tool::Token => {
                let id = self.selected.clone().ok_or(TableError::NoSelection)?;
                self.map.place_token(&id, cell)?;
                if self.config.auto_reveal {
                    self.map.reveal_around(cell, self.config.reveal_radius);
                }
                ClickOutcome::TokenPlaced(id, cell)
            }
            Tool::Fog => {
                let fogged = self.map.toggle_fog(cell);
                ClickOutcome::FogToggled { cell, fogged }
            }
        };
        debug!(?outcome, "Map click");
        Ok(outcome)
    }

    pub fn reveal_all_fog(&mut self) {
        self.map.reveal_all_fog();
    }

    pub fn hide_all_fog(&mut self, cols: u32, rows: u32) -> Result<(), TableError> {
        self.map.hide_all_fog(cols, rows)?;
        Ok(())
    }

    // --- Persistence --------------------------------------------------------

    /// Save the map under the configured storage key.
    pub async fn save<S: KeyValueStore + ?Sized>(&self, store: &S) -> Result<(), TableError> {
        save_map(store, &self.config.storage_key, &self.map).await?;
        Ok(())
    }

    /// Replace the map with the saved snapshot, if there is one.
    ///
    /// Returns `false` and leaves the table untouched when nothing was saved.
    pub async fn load<S: KeyValueStore + ?Sized>(&mut self, store: &S) -> Result<bool, TableError> {
        let Some(map) = load_map(store, &self.config.storage_key).await? else {
            return Ok(false);
        };
        self.map = map;
        if let Some(id) = &self.selected {
            if !self.map.roster().contains(id) {
                self.selected = None;
            }
        }
        info!(combatants = self.map.roster().len(), "Table restored");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::MemoryStore;

    fn table() -> Table {
        Table::with_roller(TableConfig::new(), DiceRoller::seeded(1))
    }

    #[test]
    fn test_quick_roll_logs() {
        let mut table = table();
        let result = table.quick_roll("d6", 2, 3).unwrap();
        assert_eq!(result.rolls().len(), 2);
        assert!(table.log().latest().unwrap().starts_with("2d6 +3 = "));

        assert!(matches!(
            table.quick_roll("six", 1, 0),
            Err(TableError::Dice(DiceError::InvalidDiceType(_)))
        ));
        assert_eq!(table.log().len(), 1);
    }

    #[test]
    fn test_roll_expression_logs() {
        let mut table = table();
        let result = table.roll_expression("1d20-1").unwrap();
        assert_eq!(result.modifier(), -1);
        assert!(table.log().latest().unwrap().starts_with("1d20-1 = "));
        assert!(table.roll_expression("roll something").is_err());
    }

    #[test]
    fn test_log_capacity_from_config() {
        let mut table = Table::with_roller(
            TableConfig::new().with_log_capacity(2),
            DiceRoller::seeded(2),
        );
        for _ in 0..5 {
            table.quick_roll("d4", 1, 0).unwrap();
        }
        assert_eq!(table.log().len(), 2);
    }

    #[test]
    fn test_first_added_is_selected() {
        let mut table = table();
        let first = table.add_combatant(NewCombatant::new("Aria"));
        table.add_combatant(NewCombatant::new("Borin"));
        assert_eq!(table.selected().unwrap().id, first);

        table.remove_combatant(&first).unwrap();
        assert!(table.selected().is_none());
        assert!(matches!(
            table.duplicate_selected(),
            Err(TableError::NoSelection)
        ));
    }

    #[test]
    fn test_roll_initiative_uses_dexterity() {
        let mut table = table();
        let mut scores = crate::roster::AbilityScores::default();
        scores.set(Ability::Dexterity, 16);
        let id = table.add_combatant(NewCombatant::new("Aria").with_attributes(scores));

        let total = table.roll_initiative_for(&id).unwrap();
        assert!((4..=23).contains(&total));
        assert_eq!(table.roster().get(&id).unwrap().initiative, total);
        assert!(table
            .log()
            .latest()
            .unwrap()
            .starts_with("Aria: Initiative Roll: "));
    }

    #[test]
    fn test_ability_check() {
        let mut table = table();
        let id = table.add_combatant(NewCombatant::new("Aria"));
        let result = table.ability_check(&id, Ability::Strength).unwrap();
        assert_eq!(result.modifier(), 0);
        assert!(table.log().latest().unwrap().contains("STR Check"));
        assert!(table
            .ability_check(&"missing".into(), Ability::Strength)
            .is_err());
    }

    #[test]
    fn test_click_edit_tools() {
        let mut table = table();
        assert_eq!(
            table.click(60, 10).unwrap(),
            ClickOutcome::TerrainPainted(Cell::new(50, 0), TerrainKind::Wall)
        );

        table.set_tool(Tool::Erase);
        assert_eq!(
            table.click(99, 49).unwrap(),
            ClickOutcome::TerrainErased(Cell::new(50, 0))
        );
        assert_eq!(
            table.click(99, 49).unwrap(),
            ClickOutcome::Nothing(Cell::new(50, 0))
        );

        table.set_tool(Tool::Fog);
        assert_eq!(
            table.click(0, 0).unwrap(),
            ClickOutcome::FogToggled {
                cell: Cell::new(0, 0),
                fogged: true
            }
        );
    }

    #[test]
    fn test_click_token_places_and_reveals() {
        let mut table = table();
        table.set_tool(Tool::Token);
        assert!(matches!(table.click(0, 0), Err(TableError::NoSelection)));

        let id = table.add_combatant(NewCombatant::new("Aria"));
        table.hide_all_fog(10, 10).unwrap();
        let outcome = table.click(260, 260).unwrap();

        assert_eq!(outcome, ClickOutcome::TokenPlaced(id.clone(), Cell::new(250, 250)));
        assert_eq!(table.map().placement(&id).unwrap().cell, Cell::new(250, 250));
        assert!(!table.map().is_fogged(Cell::new(250, 250)));
        assert_eq!(table.map().fog().len(), 75);
    }

    #[test]
    fn test_extreme_input_is_an_error_not_a_panic() {
        let mut table = table();
        assert_eq!(
            table.click(i32::MIN, 0).unwrap(),
            ClickOutcome::TerrainPainted(Cell::new(-2_147_483_600, 0), TerrainKind::Wall)
        );

        table.set_grid_size(50_000_000);
        table.hide_all_fog(100, 1).unwrap();
        assert!(matches!(
            table.hide_all_fog(u32::MAX, 2),
            Err(TableError::Map(MapError::FogAreaTooLarge { .. }))
        ));

        assert!(matches!(
            table.roll_expression("1d20+2147483647"),
            Err(TableError::Dice(DiceError::ModifierOutOfRange(_)))
        ));
        assert!(matches!(
            table.quick_roll("d6", u32::MAX, 0),
            Err(TableError::Dice(DiceError::TooManyDice(_)))
        ));
        assert!(table.log().is_empty());
    }

    #[test]
    fn test_click_play_mode_selects() {
        let mut table = table();
        let aria = table.add_combatant(NewCombatant::new("Aria"));
        let borin = table.add_combatant(NewCombatant::new("Borin"));
        table.select(&borin).unwrap();
        table.set_tool(Tool::Token);
        table.click(100, 100).unwrap();
        table.select(&aria).unwrap();

        table.toggle_mode();
        assert_eq!(table.click(120, 130).unwrap(), ClickOutcome::Selected(borin.clone()));
        assert_eq!(table.selected().unwrap().id, borin);
        assert_eq!(
            table.click(0, 0).unwrap(),
            ClickOutcome::Nothing(Cell::new(0, 0))
        );
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let store = MemoryStore::new();
        let mut table = table();
        assert!(!table.load(&store).await.unwrap());

        let id = table.add_combatant(NewCombatant::new("Aria").with_initiative(12));
        table.combat().start_combat().unwrap();
        table.save(&store).await.unwrap();

        let mut restored = Table::with_roller(TableConfig::new(), DiceRoller::seeded(9));
        assert!(restored.load(&store).await.unwrap());
        assert_eq!(restored.roster().get(&id).unwrap().initiative, 12);
        assert_eq!(restored.combat().current_combatant().unwrap().id, id);
    }
}
