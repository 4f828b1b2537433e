//! Capped history of formatted roll results, newest first.

use std::collections::VecDeque;

use crate::dice::DiceResult;
use crate::roster::Ability;

pub const DEFAULT_LOG_CAPACITY: usize = 10;

#[derive(Debug, Clone)]
pub struct RollLog {
    entries: VecDeque<String>,
    capacity: usize,
}

impl RollLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Prepend an entry, dropping the oldest once the log is full.
    pub fn push(&mut self, entry: impl Into<String>) {
        if self.capacity == 0 {
            return;
        }
        self.entries.push_front(entry.into());
        self.entries.truncate(self.capacity);
    }

    /// Entries, newest first.
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn latest(&self) -> Option<&str> {
        self.entries.front().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for RollLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

fn signed(value: i32) -> String {
    if value >= 0 {
        format!("+{value}")
    } else {
        value.to_string()
    }
}

/// `"2d6 +3 = 11 (4, 4 +3)"`; the modifier is left out when zero.
pub fn quick_roll_entry(dice_type: &str, count: u32, result: &DiceResult) -> String {
    match result.modifier() {
        0 => format!("{count}{dice_type} = {result}"),
        m => format!("{count}{dice_type} {} = {result}", signed(m)),
    }
}

/// `"2d6+3 = 11 (4, 4 +3)"`, echoing the text the user typed.
pub fn expression_entry(expression: &str, result: &DiceResult) -> String {
    format!("{} = {result}", expression.trim())
}

/// `"Aria: Initiative Roll: 17 (1d20 +2)"`.
pub fn initiative_entry(name: &str, total: i32, modifier: i32) -> String {
    format!("{name}: Initiative Roll: {total} (1d20 {})", signed(modifier))
}

/// `"Aria: DEX Check: 15 (1d20 +3)"`.
pub fn check_entry(name: &str, ability: Ability, result: &DiceResult) -> String {
    format!(
        "{name}: {} Check: {} (1d20 {})",
        ability.abbreviation(),
        result.total(),
        signed(result.modifier())
    )
}
