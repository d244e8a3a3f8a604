//! Reference strategies.
//!
//! The engine only ever sees [`Strategy`]; these are the stock competitors
//! used by the CLI, the tournament runner and the tests.

mod coverage;
mod defender;
mod farmer;
mod faulty;
mod idle;
mod rusher;

pub use coverage::Coverage;
pub use defender::Defender;
pub use farmer::Farmer;
pub use faulty::{FaultMode, Faulty};
pub use idle::Idle;
pub use rusher::Rusher;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::Strategy;
use crate::error::StrategyError;
use crate::game::{Controller, MapModel, SnipePriority, TowerCatalog, TowerType};

/// Fire every tower the team owns: gunships snipe with `priority`, bombers
/// bomb. Towers cooling down are skipped by the controller.
///
/// # Errors
///
/// Propagates controller errors.
pub fn fire_all(rc: &mut Controller<'_>, priority: SnipePriority) -> Result<(), StrategyError> {
    for tower in rc.get_towers(rc.get_ally_team()) {
        match tower.kind {
            TowerType::Gunship => {
                rc.auto_snipe(tower.id, priority)?;
            }
            TowerType::Bomber => {
                rc.auto_bomb(tower.id)?;
            }
            TowerType::SolarFarm | TowerType::Reinforcer => {}
        }
    }
    Ok(())
}

/// Stock strategies selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Does nothing.
    Idle,
    /// Gunships and bombers on the best-covered tiles.
    Defender,
    /// Sends debris whenever affordable.
    Rusher,
    /// Solar farms first, then debris waves.
    Farmer,
}

impl StrategyKind {
    /// Every stock strategy.
    pub const ALL: [Self; 4] = [Self::Idle, Self::Defender, Self::Rusher, Self::Farmer];

    /// Construct the strategy for one match.
    #[must_use]
    pub fn build(self, map: MapModel, catalog: &TowerCatalog) -> Box<dyn Strategy> {
        match self {
            Self::Idle => Box::new(Idle),
            Self::Defender => Box::new(Defender::new(&map, catalog)),
            Self::Rusher => Box::new(Rusher::default()),
            Self::Farmer => Box::new(Farmer::new(map, catalog)),
        }
    }

    /// Lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Defender => "defender",
            Self::Rusher => "rusher",
            Self::Farmer => "farmer",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Name that matches no stock strategy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown strategy '{0}' (expected one of: idle, defender, rusher, farmer)")]
pub struct UnknownStrategy(pub String);

impl FromStr for StrategyKind {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownStrategy(s.to_string()))
    }
}
