//! Tower kinds and their static stats.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::game::Coord;

/// Kind of tower a team can build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TowerType {
    /// Single-target gun. Fires through `auto_snipe`.
    Gunship,
    /// Area damage against everything in range. Fires through `auto_bomb`.
    Bomber,
    /// Produces income every cadence.
    SolarFarm,
    /// Amplifies solar farms within its range.
    Reinforcer,
}

impl TowerType {
    /// All tower kinds in catalog order.
    pub const ALL: [TowerType; 4] = [
        TowerType::Gunship,
        TowerType::Bomber,
        TowerType::SolarFarm,
        TowerType::Reinforcer,
    ];

    /// Whether this kind deals damage.
    #[must_use]
    pub const fn is_combat(self) -> bool {
        matches!(self, TowerType::Gunship | TowerType::Bomber)
    }
}

impl fmt::Display for TowerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TowerType::Gunship => "GUNSHIP",
            TowerType::Bomber => "BOMBER",
            TowerType::SolarFarm => "SOLAR_FARM",
            TowerType::Reinforcer => "REINFORCER",
        };
        f.write_str(name)
    }
}

/// Static stats of one tower kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TowerStats {
    /// Build cost.
    pub cost: u64,
    /// Range as a squared distance.
    pub range: u64,
    /// Damage per activation (zero for economy towers).
    pub damage: u64,
    /// Ticks between activations.
    pub cadence: u32,
}

impl TowerStats {
    /// Check whether `target` is within range of a tower at `origin`.
    #[must_use]
    #[inline]
    pub const fn in_range(&self, origin: Coord, target: Coord) -> bool {
        origin.distance_sq(target) <= self.range
    }
}

/// Lookup table from tower kind to stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TowerCatalog {
    /// Gunship stats.
    pub gunship: TowerStats,
    /// Bomber stats.
    pub bomber: TowerStats,
    /// Solar farm stats.
    pub solar_farm: TowerStats,
    /// Reinforcer stats.
    pub reinforcer: TowerStats,
}

impl Default for TowerCatalog {
    fn default() -> Self {
        Self {
            gunship: TowerStats {
                cost: 1000,
                range: 60,
                damage: 25,
                cadence: 20,
            },
            bomber: TowerStats {
                cost: 1750,
                range: 10,
                damage: 6,
                cadence: 15,
            },
            solar_farm: TowerStats {
                cost: 2000,
                range: 0,
                damage: 0,
                cadence: 10,
            },
            reinforcer: TowerStats {
                cost: 3000,
                range: 5,
                damage: 0,
                cadence: 0,
            },
        }
    }
}

impl TowerCatalog {
    /// Get the stats for a tower kind.
    #[must_use]
    #[inline]
    pub const fn stats(&self, kind: TowerType) -> TowerStats {
        match kind {
            TowerType::Gunship => self.gunship,
            TowerType::Bomber => self.bomber,
            TowerType::SolarFarm => self.solar_farm,
            TowerType::Reinforcer => self.reinforcer,
        }
    }
}
