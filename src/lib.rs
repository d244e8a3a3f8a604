// Allow unwrap and unreadable literals in tests (test code is not production)
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::unreadable_literal))]
//! Sentinel: a deterministic two-team tower-defense engine for bot competitions.
//!
//! Two strategies (BLUE and RED) take turns issuing commands through a
//! per-team [`Controller`]. The engine enforces legality, resolves economy,
//! combat and movement in a fixed order, and declares a winner:
//! - Bit-exact deterministic resolution (ordered maps, integer maths)
//! - Per-call and wall-clock budgets for strategy code
//! - Faults and timeouts contained to the offending team's tick
//! - Replay logs with periodic snapshots for post-hoc reconstruction
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │        Tournament Runner            │
//! ├─────────────────────────────────────┤
//! │  TickEngine  ──observes──► Replay   │
//! ├─────────────────────────────────────┤
//! │  Controller (per-team legality)     │
//! ├─────────────────────────────────────┤
//! │  GameState · TowerCatalog · Map     │
//! └─────────────────────────────────────┘
//! ```

pub mod engine;
pub mod error;
pub mod game;
pub mod replay;
pub mod strategies;
pub mod tournament;

pub use error::{ControllerError, MatchError, StrategyError};

// Re-export key game types at crate root for convenience
pub use engine::{EndReason, MatchConfig, MatchResult, MatchStatus, Strategy, TickEngine};
pub use game::{
    Controller, Coord, Debris, DebrisId, GameState, MapModel, Rules, SnipePriority, Team, Tower,
    TowerCatalog, TowerId, TowerStats, TowerType,
};
