//! Console command parsing.
//!
//! One command per line. Words are separated by whitespace; a double-quoted
//! run counts as one word so names may contain spaces (`add "Goblin Boss"`).

use tabletop_core::{Ability, CombatantKind, Layer, TerrainKind, Tool};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command: {0}. Type help for help.")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("Not a number: {0}")]
    BadNumber(String),

    #[error("Unknown {kind}: {value}")]
    BadName { kind: &'static str, value: String },

    #[error("Unterminated quote")]
    UnterminatedQuote,
}

/// A parsed console command. Combatants are referred to by `who`: a 1-based
/// roster position, an id, or a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Roll(String),
    Quick {
        dice_type: String,
        count: u32,
        modifier: i32,
    },
    Add {
        name: String,
        kind: CombatantKind,
        hp: Option<i32>,
        ac: Option<i32>,
        initiative: Option<i32>,
    },
    Duplicate(Option<String>),
    Remove(String),
    Select(String),
    Initiative { who: String, value: i32 },
    RollInitiative(String),
    Check { who: String, ability: Ability },
    Hp { who: String, value: i32 },
    Ac { who: String, value: i32 },
    Rename { who: String, name: String },
    Notes { who: String, text: String },
    Score { who: String, ability: Ability, score: i32 },
    Start,
    Next,
    End,
    Order,
    List,
    Click { x: i32, y: i32 },
    Tool(Tool),
    Layer(Layer),
    Brush(TerrainKind),
    Mode,
    Grid(u32),
    Color(String),
    FogReveal,
    FogHide { cols: u32, rows: u32 },
    Log,
    Save,
    Load,
    Help,
    Quit,
}

pub const HELP: &[&str] = &[
    "roll <expr>                      - Roll dice notation, e.g. roll 2d6+3",
    "quick <dN> [count] [mod]         - Quick roll, e.g. quick d20 1 5",
    "add <name> [kind] [hp] [ac] [init] - Add a combatant (kind: player|enemy|npc|other)",
    "dup [who]                        - Duplicate a combatant (default: selected)",
    "remove <who>                     - Remove a combatant",
    "select <who>                     - Select a combatant for token placement",
    "init <who> <value>               - Set initiative",
    "rollinit <who>                   - Roll d20 + DEX modifier for initiative",
    "check <who> <ability>            - Roll an ability check (str, dex, ...)",
    "hp <who> <value>                 - Set hit points",
    "score <who> <ability> <value>    - Set an ability score",
    "ac <who> <value>                 - Set armor class",
    "rename <who> <name>              - Rename a combatant",
    "notes <who> <text>               - Replace a combatant's notes",
    "start | next | end               - Run combat",
    "order                            - Show initiative order",
    "list                             - Show the roster",
    "click <x> <y>                    - Click the map at a pixel position",
    "tool <draw|erase|token|fog>      - Choose the edit tool",
    "layer <base|object|token|effect|fog> - Choose the active layer",
    "brush <wall|water|difficult|other> - Terrain painted by the draw tool",
    "mode                             - Toggle edit/play mode",
    "grid <size> | color <hex>        - Grid settings",
    "fog reveal | fog hide <cols> <rows> - Clear or cover the map",
    "log                              - Show recent rolls",
    "save | load                      - Save or restore the map",
    "quit                             - Exit",
];

/// Split a line into words, honouring double quotes.
fn tokenize(line: &str) -> Result<Vec<String>, CommandError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut started = false;

    for c in line.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                started = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if started {
                    words.push(std::mem::take(&mut current));
                    started = false;
                }
            }
            c => {
                current.push(c);
                started = true;
            }
        }
    }

    if in_quotes {
        return Err(CommandError::UnterminatedQuote);
    }
    if started {
        words.push(current);
    }
    Ok(words)
}

fn number<T: std::str::FromStr>(word: &str) -> Result<T, CommandError> {
    word.parse()
        .map_err(|_| CommandError::BadNumber(word.to_string()))
}

fn optional_number<T: std::str::FromStr>(word: Option<&String>) -> Result<Option<T>, CommandError> {
    word.map(|w| number(w)).transpose()
}

fn ability(word: &str) -> Result<Ability, CommandError> {
    Ability::from_name(word).ok_or_else(|| CommandError::BadName {
        kind: "ability",
        value: word.to_string(),
    })
}

impl Command {
    /// Parse one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
        let words = tokenize(line)?;
        let Some((name, args)) = words.split_first() else {
            return Ok(None);
        };

        let command = match (name.to_lowercase().as_str(), args) {
            ("roll", []) => return Err(CommandError::Usage("roll <expr>")),
            ("roll", rest) => Command::Roll(rest.join(" ")),

            ("quick", [dice_type, rest @ ..]) if rest.len() <= 2 => Command::Quick {
                dice_type: dice_type.clone(),
                count: optional_number(rest.first())?.unwrap_or(1),
                modifier: optional_number(rest.get(1))?.unwrap_or(0),
            },
            ("quick", _) => return Err(CommandError::Usage("quick <dN> [count] [mod]")),

            ("add", [name, rest @ ..]) if rest.len() <= 4 => {
                let kind = match rest.first() {
                    Some(word) => {
                        CombatantKind::from_name(word).ok_or_else(|| CommandError::BadName {
                            kind: "combatant kind",
                            value: word.clone(),
                        })?
                    }
                    None => CombatantKind::default(),
                };
                Command::Add {
                    name: name.clone(),
                    kind,
                    hp: optional_number(rest.get(1))?,
                    ac: optional_number(rest.get(2))?,
                    initiative: optional_number(rest.get(3))?,
                }
            }
            ("add", _) => return Err(CommandError::Usage("add <name> [kind] [hp] [ac] [init]")),

            ("dup", []) => Command::Duplicate(None),
            ("dup", [who]) => Command::Duplicate(Some(who.clone())),
            ("remove", [who]) => Command::Remove(who.clone()),
            ("select", [who]) => Command::Select(who.clone()),
            ("init", [who, value]) => Command::Initiative {
                who: who.clone(),
                value: number(value)?,
            },
            ("rollinit", [who]) => Command::RollInitiative(who.clone()),
            ("check", [who, name]) => Command::Check {
                who: who.clone(),
                ability: ability(name)?,
            },
            ("hp", [who, value]) => Command::Hp {
                who: who.clone(),
                value: number(value)?,
            },
            ("score", [who, name, value]) => Command::Score {
                who: who.clone(),
                ability: ability(name)?,
                score: number(value)?,
            },
            ("ac", [who, value]) => Command::Ac {
                who: who.clone(),
                value: number(value)?,
            },
            ("rename", [who, name]) => Command::Rename {
                who: who.clone(),
                name: name.clone(),
            },
            ("notes", [who, rest @ ..]) if !rest.is_empty() => Command::Notes {
                who: who.clone(),
                text: rest.join(" "),
            },
            ("dup", _) => return Err(CommandError::Usage("dup [who]")),
            ("remove", _) => return Err(CommandError::Usage("remove <who>")),
            ("select", _) => return Err(CommandError::Usage("select <who>")),
            ("init", _) => return Err(CommandError::Usage("init <who> <value>")),
            ("rollinit", _) => return Err(CommandError::Usage("rollinit <who>")),
            ("check", _) => return Err(CommandError::Usage("check <who> <ability>")),
            ("hp", _) => return Err(CommandError::Usage("hp <who> <value>")),
            ("score", _) => return Err(CommandError::Usage("score <who> <ability> <value>")),
            ("ac", _) => return Err(CommandError::Usage("ac <who> <value>")),
            ("rename", _) => return Err(CommandError::Usage("rename <who> <name>")),
            ("notes", _) => return Err(CommandError::Usage("notes <who> <text>")),

            ("start", []) => Command::Start,
            ("next", []) => Command::Next,
            ("end", []) => Command::End,
            ("order", []) => Command::Order,
            ("list", []) => Command::List,

            ("click", [x, y]) => Command::Click {
                x: number(x)?,
                y: number(y)?,
            },
            ("click", _) => return Err(CommandError::Usage("click <x> <y>")),
            ("tool", [name]) => Command::Tool(Tool::from_name(name).ok_or_else(|| {
                CommandError::BadName {
                    kind: "tool",
                    value: name.clone(),
                }
            })?),
            ("layer", [name]) => Command::Layer(Layer::from_name(name).ok_or_else(|| {
                CommandError::BadName {
                    kind: "layer",
                    value: name.clone(),
                }
            })?),
            ("brush", [name]) => Command::Brush(TerrainKind::from_name(name).ok_or_else(|| {
                CommandError::BadName {
                    kind: "terrain",
                    value: name.clone(),
                }
            })?),
            ("tool", _) => return Err(CommandError::Usage("tool <draw|erase|token|fog>")),
            ("layer", _) => return Err(CommandError::Usage("layer <name>")),
            ("brush", _) => return Err(CommandError::Usage("brush <terrain>")),
            ("mode", []) => Command::Mode,
            ("grid", [size]) => Command::Grid(number(size)?),
            ("grid", _) => return Err(CommandError::Usage("grid <size>")),
            ("color", [color]) => Command::Color(color.clone()),
            ("color", _) => return Err(CommandError::Usage("color <hex>")),

            ("fog", [action]) if action == "reveal" => Command::FogReveal,
            ("fog", [action, cols, rows]) if action == "hide" => Command::FogHide {
                cols: number(cols)?,
                rows: number(rows)?,
            },
            ("fog", _) => return Err(CommandError::Usage("fog reveal | fog hide <cols> <rows>")),

            ("log", []) => Command::Log,
            ("save", []) => Command::Save,
            ("load", []) => Command::Load,
            ("help", _) => Command::Help,
            ("quit", _) | ("exit", _) => Command::Quit,

            (other, _) => return Err(CommandError::Unknown(other.to_string())),
        };

        Ok(Some(command))
    }
}
