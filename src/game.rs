//! Game layer for Sentinel.
//!
//! Implements the rules of a match:
//! - Map with a debris path and buildable space
//! - Tower catalog and calibratable rules
//! - Economy (passive income, solar farms, reinforcers)
//! - Combat and movement resolution
//! - The per-team controller that strategies act through

mod catalog;
mod combat;
mod controller;
mod economy;
mod invariants;
mod map;
mod rules;
mod state;
mod team;
mod units;

pub use catalog::{TowerCatalog, TowerStats, TowerType};
pub use combat::{
    CombatReport, Removal, RemovalCause, bomb, resolve_combat, select_target, snipe,
};
pub use controller::{Controller, ControllerReport};
pub use economy::{IncomeReport, apply_economy, solar_yield};
pub use invariants::{InvariantViolation, assert_invariants, check_invariants, check_transition};
pub use map::{Coord, MapError, MapModel, MapSpec, TileKind};
pub use rules::Rules;
pub use state::{GameState, PlacementError, Snapshot, SpawnError};
pub use team::Team;
pub use units::{Debris, DebrisId, SnipePriority, Tower, TowerId};
