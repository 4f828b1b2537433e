//! Table configuration.

use std::path::PathBuf;
use tracing::warn;

use crate::map::{DEFAULT_GRID_COLOR, DEFAULT_GRID_SIZE};
use crate::persist::DEFAULT_STORAGE_KEY;
use crate::roll_log::DEFAULT_LOG_CAPACITY;

pub const ENV_SAVE_DIR: &str = "TABLETOP_SAVE_DIR";
pub const ENV_GRID_SIZE: &str = "TABLETOP_GRID_SIZE";
pub const ENV_LOG_CAPACITY: &str = "TABLETOP_LOG_CAPACITY";
pub const ENV_AUTO_REVEAL: &str = "TABLETOP_AUTO_REVEAL";

/// Configuration for creating a new [`Table`](crate::Table).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableConfig {
    /// Grid cell size in pixels for a fresh map.
    pub grid_size: u32,

    /// Grid line colour for a fresh map.
    pub grid_color: String,

    /// How many roll results the log keeps.
    pub log_capacity: usize,

    /// Key the map snapshot is saved under.
    pub storage_key: String,

    /// Directory for file-backed saves.
    pub save_dir: PathBuf,

    /// Clear fog around a token when it is placed.
    pub auto_reveal: bool,

    /// Radius, in cells, cleared by auto-reveal.
    pub reveal_radius: u32,
}

impl TableConfig {
    pub fn new() -> Self {
        Self {
            grid_size: DEFAULT_GRID_SIZE,
            grid_color: DEFAULT_GRID_COLOR.to_string(),
            log_capacity: DEFAULT_LOG_CAPACITY,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            save_dir: PathBuf::from("saves"),
            auto_reveal: true,
            reveal_radius: 2,
        }
    }

    /// Defaults overlaid with `TABLETOP_*` environment variables.
    pub fn from_env() -> Self {
        Self::new().with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`. Unparseable values are skipped.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(dir) = lookup(ENV_SAVE_DIR) {
            self.save_dir = PathBuf::from(dir);
        }
        if let Some(size) = parse_var(&lookup, ENV_GRID_SIZE) {
            self.grid_size = size;
        }
        if let Some(capacity) = parse_var(&lookup, ENV_LOG_CAPACITY) {
            self.log_capacity = capacity;
        }
        if let Some(auto_reveal) = parse_var(&lookup, ENV_AUTO_REVEAL) {
            self.auto_reveal = auto_reveal;
        }
        self
    }

    pub fn with_grid_size(mut self, size: u32) -> Self {
        self.grid_size = size;
        self
    }

    pub fn with_grid_color(mut self, color: impl Into<String>) -> Self {
        self.grid_color = color.into();
        self
    }

    pub fn with_log_capacity(mut self, capacity: usize) -> Self {
        self.log_capacity = capacity;
        self
    }

    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    pub fn with_save_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.save_dir = dir.into();
        self
    }

    pub fn with_auto_reveal(mut self, enabled: bool) -> Self {
        self.auto_reveal = enabled;
        self
    }

    pub fn with_reveal_radius(mut self, radius: u32) -> Self {
        self.reveal_radius = radius;
        self
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring unparseable environment value");
            None
        }
    }
}
