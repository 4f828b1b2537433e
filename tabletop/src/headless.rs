//! Headless console for the tabletop.
//!
//! A line-oriented protocol for driving a [`Table`] from a terminal or a
//! script. Each input line is one command (see `help`); each reply line
//! starts with a tag such as `[ROLL]`, `[TURN]` or `[ERROR]`.

use std::io::{self, BufRead, Write};

use rand::Rng;
use tabletop_core::{
    ClickOutcome, Combatant, CombatantId, CombatantPatch, KeyValueStore, NewCombatant,
    RosterError, Table, TableError,
};
use tracing::debug;

use crate::commands::{Command, HELP};

/// A table plus the store it saves to.
pub struct Console<S, R> {
    table: Table<R>,
    store: S,
}

/// Result of running one line.
#[derive(Debug, Default)]
pub struct Reply {
    pub lines: Vec<String>,
    pub quit: bool,
}

impl Reply {
    fn line(text: impl Into<String>) -> Self {
        Self {
            lines: vec![text.into()],
            quit: false,
        }
    }

    fn error(err: impl std::fmt::Display) -> Self {
        Self::line(format!("[ERROR] {err}"))
    }
}

fn describe(index: usize, c: &Combatant, active: bool) -> String {
    format!(
        "{} {}. {} ({}) HP {} AC {} Init {}",
        if active { ">" } else { " " },
        index + 1,
        c.name,
        c.kind,
        c.hp,
        c.ac,
        c.initiative
    )
}

impl<S: KeyValueStore, R: Rng> Console<S, R> {
    pub fn new(table: Table<R>, store: S) -> Self {
        Self { table, store }
    }

    pub fn table(&self) -> &Table<R> {
        &self.table
    }

    /// Resolve a combatant reference: 1-based position, exact id, then name.
    fn resolve(&self, who: &str) -> Result<CombatantId, TableError> {
        let roster = self.table.roster();
        if let Ok(position) = who.parse::<usize>() {
            if let Some(c) = position.checked_sub(1).and_then(|i| roster.as_slice().get(i)) {
                return Ok(c.id.clone());
            }
        }
        roster
            .iter()
            .find(|c| c.id.as_str() == who)
            .or_else(|| roster.iter().find(|c| c.name.eq_ignore_ascii_case(who)))
            .map(|c| c.id.clone())
            .ok_or_else(|| RosterError::NotFound(who.into()).into())
    }

    fn name_of(&self, id: &CombatantId) -> String {
        self.table
            .roster()
            .get(id)
            .map(|c| c.name.clone())
            .unwrap_or_default()
    }

    fn latest_roll(&self) -> Reply {
        Reply::line(format!("[ROLL] {}", self.table.log().latest().unwrap_or("")))
    }

    fn turn(&self) -> Reply {
        match self.table.roster().active() {
            Some(c) => Reply::line(format!(
                "[TURN] Round {}: {}",
                self.table.roster().round(),
                c.name
            )),
            None => Reply::line("[TURN] No combat"),
        }
    }

    /// Parse and run one input line.
    pub async fn handle_line(&mut self, line: &str) -> Reply {
        match Command::parse(line) {
            Ok(Some(command)) => {
                debug!(?command, "Console command");
                self.execute(command).await.unwrap_or_else(Reply::error)
            }
            Ok(None) => Reply::default(),
            Err(e) => Reply::error(e),
        }
    }

    /// Run a parsed command.
    pub async fn execute(&mut self, command: Command) -> Result<Reply, TableError> {
        let reply = match command {
            Command::Roll(expression) => {
                self.table.roll_expression(&expression)?;
                self.latest_roll()
            }
            Command::Quick {
                dice_type,
                count,
                modifier,
            } => {
                self.table.quick_roll(&dice_type, count, modifier)?;
                self.latest_roll()
            }

            Command::Add {
                name,
                kind,
                hp,
                ac,
                initiative,
            } => {
                let mut new = NewCombatant::new(name).with_kind(kind);
                if let Some(hp) = hp {
                    new = new.with_hp(hp);
                }
                if let Some(ac) = ac {
                    new = new.with_ac(ac);
                }
                if let Some(initiative) = initiative {
                    new = new.with_initiative(initiative);
                }
                let id = self.table.add_combatant(new);
                self.added(&id)
            }
            Command::Duplicate(who) => {
                let id = match who {
                    Some(who) => {
                        let id = self.resolve(&who)?;
                        self.table.duplicate_combatant(&id)?
                    }
                    None => self.table.duplicate_selected()?,
                };
                self.added(&id)
            }
            Command::Remove(who) => {
                let id = self.resolve(&who)?;
                let removed = self.table.remove_combatant(&id)?;
                Reply::line(format!("[REMOVED] {}", removed.name))
            }
            Command::Select(who) => {
                let id = self.resolve(&who)?;
                self.table.select(&id)?;
                Reply::line(format!("[SELECTED] {}", self.name_of(&id)))
            }
            Command::Initiative { who, value } => {
                let id = self.resolve(&who)?;
                self.table.combat().set_initiative(&id, value)?;
                Reply::line(format!("[UPDATED] {} initiative {value}", self.name_of(&id)))
            }
            Command::RollInitiative(who) => {
                let id = self.resolve(&who)?;
                self.table.roll_initiative_for(&id)?;
                self.latest_roll()
            }
            Command::Check { who, ability } => {
                let id = self.resolve(&who)?;
                self.table.ability_check(&id, ability)?;
                self.latest_roll()
            }
            Command::Hp { who, value } => {
                let id = self.resolve(&who)?;
                let patch = CombatantPatch {
                    hp: Some(value),
                    ..Default::default()
                };
                self.table.update_combatant(&id, patch)?;
                Reply::line(format!("[UPDATED] {} HP {value}", self.name_of(&id)))
            }
            Command::Ac { who, value } => {
                let id = self.resolve(&who)?;
                let patch = CombatantPatch {
                    ac: Some(value),
                    ..Default::default()
                };
                self.table.update_combatant(&id, patch)?;
                Reply::line(format!("[UPDATED] {} AC {value}", self.name_of(&id)))
            }
            Command::Rename { who, name } => {
                let id = self.resolve(&who)?;
                let old = self.name_of(&id);
                let patch = CombatantPatch {
                    name: Some(name),
                    ..Default::default()
                };
                self.table.update_combatant(&id, patch)?;
                Reply::line(format!("[UPDATED] {old} is now {}", self.name_of(&id)))
            }
            Command::Notes { who, text } => {
                let id = self.resolve(&who)?;
                let patch = CombatantPatch {
                    notes: Some(text),
                    ..Default::default()
                };
                self.table.update_combatant(&id, patch)?;
                Reply::line(format!("[UPDATED] {} notes", self.name_of(&id)))
            }
            Command::Score {
                who,
                ability,
                score,
            } => {
                let id = self.resolve(&who)?;
                let mut attributes = self.table.roster().get(&id)?.attributes;
                attributes.set(ability, score);
                let patch = CombatantPatch {
                    attributes: Some(attributes),
                    ..Default::default()
                };
                self.table.update_combatant(&id, patch)?;
                Reply::line(format!(
                    "[UPDATED] {} {ability} {score} ({:+})",
                    self.name_of(&id),
                    attributes.modifier(ability)
                ))
            }

            Command::Start => {
                self.table.combat().start_combat()?;
                self.turn()
            }
            Command::Next => {
                self.table.combat().next_turn()?;
                self.turn()
            }
            Command::End => {
                self.table.combat().end_combat();
                Reply::line("[COMBAT] Combat ended")
            }
            Command::Order => {
                let active = self.table.roster().active().map(|c| c.id.clone());
                let order = self.table.combat().combat_order();
                let mut lines = vec!["[ORDER]".to_string()];
                lines.extend(
                    order
                        .iter()
                        .enumerate()
                        .map(|(i, c)| describe(i, c, active.as_ref() == Some(&c.id))),
                );
                Reply { lines, quit: false }
            }
            Command::List => {
                let roster = self.table.roster();
                let mut lines = vec![format!("[ROSTER] {} combatants", roster.len())];
                lines.extend(
                    roster
                        .iter()
                        .enumerate()
                        .map(|(i, c)| describe(i, c, roster.active_index() == Some(i))),
                );
                Reply { lines, quit: false }
            }

            Command::Click { x, y } => {
                let text = match self.table.click(x, y)? {
                    ClickOutcome::TerrainPainted(cell, kind) => {
                        format!("Painted {kind:?} at ({}, {})", cell.x, cell.y)
                    }
                    ClickOutcome::TerrainErased(cell) => {
                        format!("Erased terrain at ({}, {})", cell.x, cell.y)
                    }
                    ClickOutcome::TokenPlaced(id, cell) => {
                        format!("Placed {} at ({}, {})", self.name_of(&id), cell.x, cell.y)
                    }
                    ClickOutcome::FogToggled { cell, fogged } => format!(
                        "{} fog at ({}, {})",
                        if fogged { "Added" } else { "Cleared" },
                        cell.x,
                        cell.y
                    ),
                    ClickOutcome::Selected(id) => format!("Selected {}", self.name_of(&id)),
                    ClickOutcome::Nothing(cell) => {
                        format!("Nothing at ({}, {})", cell.x, cell.y)
                    }
                };
                Reply::line(format!("[MAP] {text}"))
            }
            Command::Tool(tool) => {
                self.table.set_tool(tool);
                Reply::line(format!("[SETTINGS] Tool {tool:?}"))
            }
            Command::Layer(layer) => {
                self.table.set_layer(layer);
                Reply::line(format!("[SETTINGS] Layer {layer:?}"))
            }
            Command::Brush(kind) => {
                self.table.set_brush(kind);
                Reply::line(format!("[SETTINGS] Brush {kind:?}"))
            }
            Command::Mode => {
                let mode = self.table.toggle_mode();
                Reply::line(format!("[SETTINGS] Mode {mode:?}"))
            }
            Command::Grid(size) => {
                self.table.set_grid_size(size);
                Reply::line(format!("[SETTINGS] Grid size {}", self.table.map().grid.size))
            }
            Command::Color(color) => {
                self.table.set_grid_color(color);
                Reply::line(format!(
                    "[SETTINGS] Grid color {}",
                    self.table.map().grid.color
                ))
            }
            Command::FogReveal => {
                self.table.reveal_all_fog();
                Reply::line("[FOG] Revealed all")
            }
            Command::FogHide { cols, rows } => {
                self.table.hide_all_fog(cols, rows)?;
                Reply::line(format!("[FOG] Covered {cols}x{rows} cells"))
            }

            Command::Log => {
                let mut lines = vec!["[LOG]".to_string()];
                lines.extend(self.table.log().entries().map(|e| format!("  {e}")));
                Reply { lines, quit: false }
            }
            Command::Save => {
                self.table.save(&self.store).await?;
                Reply::line(format!(
                    "[SAVED] Map saved as {}",
                    self.table.config().storage_key
                ))
            }
            Command::Load => {
                if self.table.load(&self.store).await? {
                    Reply::line(format!(
                        "[LOADED] {} combatants",
                        self.table.roster().len()
                    ))
                } else {
                    Reply::line("[LOADED] No saved map")
                }
            }
            Command::Help => Reply {
                lines: std::iter::once("[HELP]".to_string())
                    .chain(HELP.iter().map(|h| format!("  {h}")))
                    .collect(),
                quit: false,
            },
            Command::Quit => Reply {
                lines: vec!["Goodbye!".to_string()],
                quit: true,
            },
        };
        Ok(reply)
    }

    fn added(&self, id: &CombatantId) -> Reply {
        let roster = self.table.roster();
        match roster.position(id).zip(roster.get(id).ok()) {
            Some((index, c)) => Reply::line(format!("[ADDED] {}", describe(index, c, false).trim_start())),
            None => Reply::default(),
        }
    }
}

/// Run the console on stdin/stdout until `quit` or end of input.
pub async fn run_console<S: KeyValueStore, R: Rng>(table: Table<R>, store: S) -> io::Result<()> {
    let mut console = Console::new(table, store);

    println!("=== Tabletop Console ===");
    println!(
        "Grid {}px, {} combatants. Type help for commands.",
        console.table().map().grid.size,
        console.table().roster().len()
    );
    println!();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = line?;
        let reply = console.handle_line(&line).await;
        for text in &reply.lines {
            writeln!(stdout, "{text}")?;
        }
        stdout.flush()?;
        if reply.quit {
            break;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabletop_core::testing::seeded_roller;
    use tabletop_core::{MemoryStore, TableConfig};

    fn console() -> Console<MemoryStore, rand::rngs::StdRng> {
        Console::new(
            Table::with_roller(TableConfig::new(), seeded_roller(5)),
            MemoryStore::new(),
        )
    }

    async fn run(console: &mut Console<MemoryStore, rand::rngs::StdRng>, line: &str) -> Vec<String> {
        console.handle_line(line).await.lines
    }

    #[tokio::test]
    async fn test_encounter_script() {
        let mut console = console();
        run(&mut console, "add Aria player 12 15 5").await;
        run(&mut console, r#"add "Goblin Boss" enemy 21 17 20"#).await;
        run(&mut console, "add Borin player 14 18 12").await;

        assert_eq!(run(&mut console, "start").await, vec!["[TURN] Round 1: Goblin Boss"]);
        assert_eq!(run(&mut console, "next").await, vec!["[TURN] Round 1: Borin"]);
        assert_eq!(run(&mut console, "next").await, vec!["[TURN] Round 1: Aria"]);
        assert_eq!(run(&mut console, "next").await, vec!["[TURN] Round 2: Goblin Boss"]);

        let list = run(&mut console, "list").await;
        assert_eq!(list[0], "[ROSTER] 3 combatants");
        assert!(list[1].starts_with("> 1. Goblin Boss (enemy)"));

        assert_eq!(run(&mut console, "end").await, vec!["[COMBAT] Combat ended"]);
        assert!(run(&mut console, "next").await[0].starts_with("[ERROR]"));
    }

    #[tokio::test]
    async fn test_who_resolution() {
        let mut console = console();
        run(&mut console, "add Aria").await;
        run(&mut console, "add Borin").await;

        assert_eq!(run(&mut console, "select 2").await, vec!["[SELECTED] Borin"]);
        assert_eq!(run(&mut console, "select aria").await, vec!["[SELECTED] Aria"]);
        assert!(run(&mut console, "select 9").await[0].starts_with("[ERROR]"));

        let id = console.table().roster().as_slice()[1].id.to_string();
        assert_eq!(
            run(&mut console, &format!("remove {id}")).await,
            vec!["[REMOVED] Borin"]
        );
    }

    #[tokio::test]
    async fn test_rolls_are_reported_and_logged() {
        let mut console = console();
        let reply = run(&mut console, "roll 2d6+3").await;
        assert!(reply[0].starts_with("[ROLL] 2d6+3 = "));

        let reply = run(&mut console, "quick d20 1 2").await;
        assert!(reply[0].starts_with("[ROLL] 1d20 +2 = "));

        run(&mut console, "add Aria").await;
        run(&mut console, "score Aria dex 14").await;
        let reply = run(&mut console, "rollinit Aria").await;
        assert!(reply[0].starts_with("[ROLL] Aria: Initiative Roll: "));
        assert!(reply[0].ends_with("(1d20 +2)"));

        let log = run(&mut console, "log").await;
        assert_eq!(log.len(), 4);
        assert!(run(&mut console, "roll nothing").await[0].starts_with("[ERROR]"));
    }

    #[tokio::test]
    async fn test_map_and_persistence() {
        let mut console = console();
        run(&mut console, "add Aria").await;
        assert_eq!(
            run(&mut console, "click 75 10").await,
            vec!["[MAP] Painted Wall at (50, 0)"]
        );
        run(&mut console, "tool token").await;
        assert_eq!(
            run(&mut console, "click 110 110").await,
            vec!["[MAP] Placed Aria at (100, 100)"]
        );

        assert_eq!(
            run(&mut console, "save").await,
            vec!["[SAVED] Map saved as ttrpgMapData"]
        );
        run(&mut console, "remove Aria").await;
        assert_eq!(run(&mut console, "load").await, vec!["[LOADED] 1 combatants"]);
        assert!(console
            .table()
            .map()
            .placement(&console.table().roster().as_slice()[0].id)
            .is_some());
    }

    #[tokio::test]
    async fn test_edit_commands_patch_the_combatant() {
        let mut console = console();
        run(&mut console, "add Goblin enemy 7 13 9").await;

        assert_eq!(
            run(&mut console, "ac Goblin 15").await,
            vec!["[UPDATED] Goblin AC 15"]
        );
        assert_eq!(
            run(&mut console, "notes 1 Hiding behind the cart").await,
            vec!["[UPDATED] Goblin notes"]
        );
        assert_eq!(
            run(&mut console, r#"rename goblin "Goblin Archer""#).await,
            vec!["[UPDATED] Goblin is now Goblin Archer"]
        );

        let c = &console.table().roster().as_slice()[0];
        assert_eq!(c.name, "Goblin Archer");
        assert_eq!(c.ac, 15);
        assert_eq!(c.notes, "Hiding behind the cart");
        assert_eq!(c.hp, 7);
        assert_eq!(c.initiative, 9);

        assert!(run(&mut console, "ac Nobody 12").await[0].starts_with("[ERROR]"));
    }

    #[tokio::test]
    async fn test_extreme_map_input_reports_errors() {
        let mut console = console();
        assert_eq!(
            run(&mut console, "grid 50000000").await,
            vec!["[SETTINGS] Grid size 1000"]
        );
        assert!(run(&mut console, "click -2147483648 0").await[0].starts_with("[MAP] Painted"));
        assert!(run(&mut console, "fog hide 4294967295 2").await[0].starts_with("[ERROR]"));
        assert!(run(&mut console, "quick d6 4294967295").await[0].starts_with("[ERROR]"));
        assert_eq!(
            run(&mut console, "fog hide 3 2").await,
            vec!["[FOG] Covered 3x2 cells"]
        );
    }

    #[tokio::test]
    async fn test_quit_and_unknown() {
        let mut console = console();
        assert!(console.handle_line("quit").await.quit);
        assert!(console.handle_line("").await.lines.is_empty());
        assert_eq!(
            run(&mut console, "dance").await,
            vec!["[ERROR] Unknown command: dance. Type help for help."]
        );
    }
}
