//! Grid map state.
//!
//! [`MapData`] is the whole persisted object graph: grid settings, token
//! placements, fog and terrain overlays, the roster and the edit/play mode.
//! Coordinates are in pixels and always aligned to the grid.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::combat::CombatManager;
use crate::roster::{
    Combatant, CombatantId, CombatantPatch, NewCombatant, Roster, RosterError,
};

pub const DEFAULT_GRID_SIZE: u32 = 50;
pub const DEFAULT_GRID_COLOR: &str = "#cccccc";

/// Largest grid cell size in pixels. Larger requests are clamped.
pub const MAX_GRID_SIZE: u32 = 1_000;

/// Most cells a single bulk fog cover may create.
pub const MAX_FOG_CELLS: u64 = 250_000;

/// Errors from map operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    #[error("Fog area {cols}x{rows} exceeds {MAX_FOG_CELLS} cells")]
    FogAreaTooLarge { cols: u32, rows: u32 },
}

// ============================================================================
// Grid
// ============================================================================

/// Grid cell size (pixels) and line colour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSettings {
    pub size: u32,
    pub color: String,
}

impl GridSettings {
    /// Size is clamped to `1..=MAX_GRID_SIZE`.
    pub fn new(size: u32, color: impl Into<String>) -> Self {
        Self {
            size: size.clamp(1, MAX_GRID_SIZE),
            color: color.into(),
        }
    }

    /// Snap a pixel position to the top-left corner of its cell.
    pub fn snap(&self, px: i32, py: i32) -> Cell {
        let size = i64::from(self.size.clamp(1, MAX_GRID_SIZE));
        Cell::new(snap_axis(px, size), snap_axis(py, size))
    }
}

fn snap_axis(p: i32, size: i64) -> i32 {
    let floor = i64::from(p).div_euclid(size) * size;
    // A cell starting below i32::MIN is not addressable; use the next one up.
    i32::try_from(floor)
        .or_else(|_| i32::try_from(floor + size))
        .unwrap_or(p)
}

impl Default for GridSettings {
    fn default() -> Self {
        Self::new(DEFAULT_GRID_SIZE, DEFAULT_GRID_COLOR)
    }
}

/// Top-left pixel corner of a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The cell `dx`, `dy` cells away on a grid of `size` pixels.
    ///
    /// Saturates at the edge of the `i32` coordinate space.
    pub fn offset(&self, dx: i32, dy: i32, size: u32) -> Cell {
        let size = i32::try_from(size).unwrap_or(i32::MAX);
        Cell::new(
            self.x.saturating_add(dx.saturating_mul(size)),
            self.y.saturating_add(dy.saturating_mul(size)),
        )
    }
}

// ============================================================================
// Overlays and modes
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerrainKind {
    Wall,
    Water,
    Difficult,
    Other,
}

impl TerrainKind {
    pub fn from_name(name: &str) -> Option<TerrainKind> {
        match name.trim().to_lowercase().as_str() {
            "wall" => Some(TerrainKind::Wall),
            "water" => Some(TerrainKind::Water),
            "difficult" => Some(TerrainKind::Difficult),
            "other" => Some(TerrainKind::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainCell {
    pub cell: Cell,
    pub kind: TerrainKind,
}

/// A roster entry placed on the map. Holds only the id, never a copy of the stats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedToken {
    pub id: CombatantId,
    pub cell: Cell,
}

/// Edit mode paints the map; play mode selects tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Mode {
    #[default]
    Edit,
    Play,
}

/// Active editing tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    #[default]
    Draw,
    Erase,
    Token,
    Fog,
}

impl Tool {
    pub fn from_name(name: &str) -> Option<Tool> {
        match name.trim().to_lowercase().as_str() {
            "draw" => Some(Tool::Draw),
            "erase" => Some(Tool::Erase),
            "token" => Some(Tool::Token),
            "fog" => Some(Tool::Fog),
            _ => None,
        }
    }
}

/// Active drawing layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layer {
    #[default]
    BaseMap,
    Object,
    Token,
    Effect,
    Fog,
}

impl Layer {
    pub fn from_name(name: &str) -> Option<Layer> {
        match name.trim().to_lowercase().as_str() {
            "basemap" | "base" => Some(Layer::BaseMap),
            "object" => Some(Layer::Object),
            "token" => Some(Layer::Token),
            "effect" => Some(Layer::Effect),
            "fog" => Some(Layer::Fog),
            _ => None,
        }
    }
}

// ============================================================================
// Map data
// ============================================================================

/// Everything that gets saved: grid, overlays, placements, roster and mode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapData {
    pub grid: GridSettings,
    #[serde(default)]
    tokens: Vec<PlacedToken>,
    #[serde(default)]
    fog: Vec<Cell>,
    #[serde(default)]
    terrain: Vec<TerrainCell>,
    #[serde(default)]
    roster: Roster,
    #[serde(default)]
    pub mode: Mode,
}

impl MapData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_grid(grid: GridSettings) -> Self {
        Self {
            grid,
            ..Self::default()
        }
    }

    /// Clamped to `1..=MAX_GRID_SIZE`.
    pub fn set_grid_size(&mut self, size: u32) {
        self.grid.size = size.clamp(1, MAX_GRID_SIZE);
    }

    pub fn toggle_mode(&mut self) -> Mode {
        self.mode = match self.mode {
            Mode::Edit => Mode::Play,
            Mode::Play => Mode::Edit,
        };
        debug!(mode = ?self.mode, "Mode toggled");
        self.mode
    }

    // --- Roster -------------------------------------------------------------

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Turn-order handle over the roster.
    pub fn combat(&mut self) -> CombatManager<'_> {
        CombatManager::new(&mut self.roster)
    }

    pub fn add_combatant(&mut self, new: NewCombatant) -> &Combatant {
        self.roster.add(new)
    }

    pub fn duplicate_combatant(&mut self, id: &CombatantId) -> Result<&Combatant, RosterError> {
        self.roster.duplicate(id)
    }

    pub fn update_combatant(
        &mut self,
        id: &CombatantId,
        patch: CombatantPatch,
    ) -> Result<&Combatant, RosterError> {
        self.roster.update(id, patch)
    }

    /// Remove a combatant from the roster and lift its token off the map.
    pub fn remove_combatant(&mut self, id: &CombatantId) -> Result<Combatant, RosterError> {
        let removed = self.roster.remove(id)?;
        self.tokens.retain(|t| &t.id != id);
        Ok(removed)
    }

    // --- Tokens -------------------------------------------------------------

    pub fn tokens(&self) -> &[PlacedToken] {
        &self.tokens
    }

    /// Put a roster entry on the map, or move it if it is already placed.
    pub fn place_token(&mut self, id: &CombatantId, cell: Cell) -> Result<(), RosterError> {
        if !self.roster.contains(id) {
            return Err(RosterError::NotFound(id.clone()));
        }

        match self.tokens.iter_mut().find(|t| &t.id == id) {
            Some(token) => token.cell = cell,
            None => self.tokens.push(PlacedToken {
                id: id.clone(),
                cell,
            }),
        }
        debug!(id = %id, x = cell.x, y = cell.y, "Token placed");
        Ok(())
    }

    pub fn token_at(&self, cell: Cell) -> Option<&PlacedToken> {
        self.tokens.iter().find(|t| t.cell == cell)
    }

    pub fn placement(&self, id: &CombatantId) -> Option<&PlacedToken> {
        self.tokens.iter().find(|t| &t.id == id)
    }

    /// Placement of the combatant whose turn it is.
    pub fn active_token(&self) -> Option<&PlacedToken> {
        let active = self.roster.active()?;
        self.placement(&active.id)
    }

    // --- Terrain ------------------------------------------------------------

    pub fn terrain(&self) -> &[TerrainCell] {
        &self.terrain
    }

    pub fn terrain_at(&self, cell: Cell) -> Option<TerrainKind> {
        self.terrain.iter().find(|t| t.cell == cell).map(|t| t.kind)
    }

    /// Paint `kind` on `cell`, replacing whatever was there.
    pub fn paint_terrain(&mut self, cell: Cell, kind: TerrainKind) {
        self.terrain.retain(|t| t.cell != cell);
        self.terrain.push(TerrainCell { cell, kind });
    }

    /// Returns `true` if there was terrain to erase.
    pub fn erase_terrain(&mut self, cell: Cell) -> bool {
        let before = self.terrain.len();
        self.terrain.retain(|t| t.cell != cell);
        self.terrain.len() != before
    }

    // --- Fog ----------------------------------------------------------------

    pub fn fog(&self) -> &[Cell] {
        &self.fog
    }

    pub fn is_fogged(&self, cell: Cell) -> bool {
        self.fog.contains(&cell)
    }

    /// Flip fog on `cell`. Returns `true` if the cell is now fogged.
    pub fn toggle_fog(&mut self, cell: Cell) -> bool {
        if self.is_fogged(cell) {
            self.fog.retain(|&f| f != cell);
            false
        } else {
            self.fog.push(cell);
            true
        }
    }

    pub fn reveal_all_fog(&mut self) {
        self.fog.clear();
    }

    /// Cover a `cols` x `rows` area starting at the origin.
    ///
    /// Areas over [`MAX_FOG_CELLS`] are rejected and the fog is left as is.
    pub fn hide_all_fog(&mut self, cols: u32, rows: u32) -> Result<(), MapError> {
        if u64::from(cols) * u64::from(rows) > MAX_FOG_CELLS {
            return Err(MapError::FogAreaTooLarge { cols, rows });
        }
        let origin = Cell::new(0, 0);
        let size = self.grid.size;
        // Both bounds are at most MAX_FOG_CELLS here.
        let (cols, rows) = (cols as i32, rows as i32);
        self.fog = (0..rows)
            .flat_map(|row| (0..cols).map(move |col| origin.offset(col, row, size)))
            .collect();
        Ok(())
    }

    /// Clear fog in the square of `radius` cells around `center`.
    pub fn reveal_around(&mut self, center: Cell, radius: u32) {
        let radius = i64::from(radius);
        let size = i64::from(self.grid.size.max(1));
        self.fog.retain(|f| {
            let dx = (i64::from(f.x) - i64::from(center.x)) / size;
            let dy = (i64::from(f.y) - i64::from(center.y)) / size;
            dx.abs() > radius || dy.abs() > radius
        });
    }

    // --- Snapshots ----------------------------------------------------------

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Restore from a snapshot, dropping anything that no longer lines up
    /// (an out-of-range active pointer, placements for unknown ids).
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut map: MapData = serde_json::from_str(json)?;
        map.repair();
        Ok(map)
    }

    fn repair(&mut self) {
        self.grid.size = self.grid.size.clamp(1, MAX_GRID_SIZE);
        self.roster.validate();

        let before = self.tokens.len();
        let roster = &self.roster;
        self.tokens.retain(|t| roster.contains(&t.id));
        if self.tokens.len() != before {
            warn!(dropped = before - self.tokens.len(), "Dropped placements for unknown combatants");
        }
    }
}
