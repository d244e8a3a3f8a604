//! The two competing sides.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the two sides of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Team {
    /// Blue side. Acts first in every decision phase and wins exhausted ties.
    Blue,
    /// Red side.
    Red,
}

impl Team {
    /// Both teams in decision order.
    pub const ALL: [Team; 2] = [Team::Blue, Team::Red];

    /// The opposing team.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Team::Blue => Team::Red,
            Team::Red => Team::Blue,
        }
    }

    /// Index into per-team arrays (Blue = 0, Red = 1).
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Team::Blue => 0,
            Team::Red => 1,
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Team::Blue => write!(f, "BLUE"),
            Team::Red => write!(f, "RED"),
        }
    }
}
