use std::fmt;

use serde::{Deserialize, Serialize};

/// Position of a step within its connection's registry, starting at 1.
/// `0` means "no step applied".
pub type Version = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// Direction needed to go from `from` to `to`, `None` when already there.
    pub fn between(from: Version, to: Version) -> Option<Self> {
        match to.cmp(&from) {
            std::cmp::Ordering::Greater => Some(Direction::Up),
            std::cmp::Ordering::Less => Some(Direction::Down),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Step numbers to execute, in execution order, when moving from `from` to `to`.
///
/// Up walks `from + 1 ..= to` ascending; down walks `from` down to `to + 1`.
pub fn step_path(from: Version, to: Version) -> Vec<Version> {
    match Direction::between(from, to) {
        Some(Direction::Up) => (from + 1..=to).collect(),
        Some(Direction::Down) => (to + 1..=from).rev().collect(),
        None => Vec::new(),
    }
}
