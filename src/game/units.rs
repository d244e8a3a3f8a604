//! Towers, debris and their identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::game::{Coord, Team, TowerType};

/// Stable tower identifier. Never reused within a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TowerId(pub u32);

impl fmt::Display for TowerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

/// Stable debris identifier. Never reused within a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DebrisId(pub u32);

impl fmt::Display for DebrisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "D{}", self.0)
    }
}

/// A tower on its owner's board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tower {
    /// Identifier.
    pub id: TowerId,
    /// Owning team.
    pub team: Team,
    /// Tower kind.
    pub kind: TowerType,
    /// Tile the tower stands on.
    pub coord: Coord,
    /// Ticks until the tower may activate again (0 = ready).
    pub cooldown: u32,
}

/// A debris travelling down the path towards the opponent of its sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Debris {
    /// Identifier.
    pub id: DebrisId,
    /// Sending team. The debris travels on the opponent's board.
    pub team: Team,
    /// Index into the map path. Only ever increases.
    pub progress: u32,
    /// Remaining health.
    pub health: u64,
    /// Health at creation; determined its price.
    pub max_health: u64,
    /// Ticks between path steps.
    pub lane: u32,
    /// Ticks until the next path step.
    pub move_cooldown: u32,
    /// Damage queued by towers this tick, applied during combat resolution.
    pub pending_damage: u64,
    /// Total damage absorbed so far.
    pub damage_taken: u64,
}

impl Debris {
    /// The team whose base this debris is heading for.
    #[must_use]
    pub const fn target(&self) -> Team {
        self.team.opponent()
    }
}

/// How a gunship picks among several debris in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SnipePriority {
    /// Furthest along the path.
    First,
    /// Least far along the path.
    Last,
    /// Most remaining health.
    Strong,
    /// Least remaining health.
    Weak,
    /// Closest to the gunship.
    Close,
}

impl fmt::Display for SnipePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SnipePriority::First => "FIRST",
            SnipePriority::Last => "LAST",
            SnipePriority::Strong => "STRONG",
            SnipePriority::Weak => "WEAK",
            SnipePriority::Close => "CLOSE",
        };
        f.write_str(name)
    }
}
