//! Tournament runner.
//!
//! Provides a pure function interface: `(seed, blue, red) -> MatchResult`.
//! The map is generated from the seed, so a seed plus two strategy kinds is
//! enough to replay any game of a tournament.
//!
//! [`run_tournament`] plays the games of a round-robin in parallel with
//! rayon, folding results into per-thread [`TournamentStats`] that are merged
//! at the end.

// Stats use intentional casts for averages
#![allow(clippy::cast_precision_loss)]

mod mapgen;

pub use mapgen::{MapGenError, generate_map};

use std::sync::Arc;

use indicatif::ProgressBar;
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::engine::{MatchConfig, MatchResult, TickEngine};
use crate::error::MatchError;
use crate::strategies::StrategyKind;

/// Error type for a single tournament game.
#[derive(Debug, Error)]
pub enum TournamentError {
    /// The seed produced no usable map.
    #[error(transparent)]
    MapGen(#[from] MapGenError),
    /// The match ended without a result.
    #[error(transparent)]
    Match(#[from] MatchError),
}

/// Settings shared by every game of a tournament.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TournamentConfig {
    /// Width of generated maps.
    pub map_width: u32,
    /// Height of generated maps.
    pub map_height: u32,
    /// Per-match settings.
    pub match_config: MatchConfig,
}

impl Default for TournamentConfig {
    fn default() -> Self {
        Self {
            map_width: 24,
            map_height: 12,
            match_config: MatchConfig::default(),
        }
    }
}

/// Build, but do not start, the match for `seed`.
///
/// # Errors
///
/// Returns an error if the map cannot be generated.
pub fn setup_match(
    seed: u64,
    blue: StrategyKind,
    red: StrategyKind,
    config: &TournamentConfig,
) -> Result<TickEngine, TournamentError> {
    let map = generate_map(seed, config.map_width, config.map_height)?;
    let catalog = config.match_config.catalog;
    let blue = blue.build(map.clone(), &catalog);
    let red = red.build(map.clone(), &catalog);
    Ok(TickEngine::new(
        Arc::new(map),
        blue,
        red,
        config.match_config,
    ))
}

/// Play one seeded match to completion.
///
/// # Errors
///
/// Returns an error if the map cannot be generated or the match is invalid.
pub fn run_seeded_match(
    seed: u64,
    blue: StrategyKind,
    red: StrategyKind,
    config: &TournamentConfig,
) -> Result<MatchResult, TournamentError> {
    let mut engine = setup_match(seed, blue, red, config)?;
    Ok(engine.run_game()?)
}

/// Which entrants play game `game`: every ordered pair in turn, so each
/// entrant plays both sides.
///
/// Returns `None` with fewer than two entrants.
#[must_use]
pub fn pairing(entrants: usize, game: u64) -> Option<(usize, usize)> {
    let pairs = entrants.checked_mul(entrants.checked_sub(1)?)?;
    if pairs == 0 {
        return None;
    }
    let slot = usize::try_from(game % pairs as u64).ok()?;
    let blue = slot / (entrants - 1);
    let mut red = slot % (entrants - 1);
    if red >= blue {
        red += 1;
    }
    Some((blue, red))
}

/// Aggregated tournament results.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TournamentStats {
    /// Games with a result.
    pub games_played: u64,
    /// Games without a result (contract violation, bad map).
    pub invalid: u64,
    /// Win count per entrant.
    pub wins: Vec<u64>,
    /// Games with a result per entrant.
    pub appearances: Vec<u64>,
    /// Faults per entrant.
    pub faults: Vec<u64>,
    /// Own base health left at the end, summed per entrant.
    base_health: Vec<u64>,
    /// Total turns across all games.
    total_turns: u64,
}

impl TournamentStats {
    /// Create new stats for n entrants.
    #[must_use]
    pub fn new(entrants: usize) -> Self {
        Self {
            games_played: 0,
            invalid: 0,
            wins: vec![0; entrants],
            appearances: vec![0; entrants],
            faults: vec![0; entrants],
            base_health: vec![0; entrants],
            total_turns: 0,
        }
    }

    /// Add a finished game between entrants `blue` and `red`.
    pub fn add_result(&mut self, blue: usize, red: usize, result: &MatchResult) {
        self.games_played += 1;
        self.total_turns += u64::from(result.turns);
        for (side, entrant) in [blue, red].into_iter().enumerate() {
            if entrant >= self.wins.len() {
                continue;
            }
            self.appearances[entrant] += 1;
            self.faults[entrant] += u64::from(result.faults[side]);
            self.base_health[entrant] += result.base_health[side];
            if result.winner.index() == side {
                self.wins[entrant] += 1;
            }
        }
    }

    /// Count a game that produced no result.
    pub fn add_invalid(&mut self) {
        self.invalid += 1;
    }

    /// Merge another set of stats into this one.
    pub fn merge(&mut self, other: &Self) {
        self.games_played += other.games_played;
        self.invalid += other.invalid;
        self.total_turns += other.total_turns;
        for (a, b) in self.wins.iter_mut().zip(&other.wins) {
            *a += b;
        }
        for (a, b) in self.appearances.iter_mut().zip(&other.appearances) {
            *a += b;
        }
        for (a, b) in self.faults.iter_mut().zip(&other.faults) {
            *a += b;
        }
        for (a, b) in self.base_health.iter_mut().zip(&other.base_health) {
            *a += b;
        }
    }

    /// Win rate for an entrant over the games it played (0.0-1.0).
    #[must_use]
    pub fn win_rate(&self, entrant: usize) -> f64 {
        let played = self.appearances.get(entrant).copied().unwrap_or(0);
        if played == 0 {
            return 0.0;
        }
        self.wins.get(entrant).copied().unwrap_or(0) as f64 / played as f64
    }

    /// Average base health an entrant finished with.
    #[must_use]
    pub fn avg_base_health(&self, entrant: usize) -> f64 {
        let played = self.appearances.get(entrant).copied().unwrap_or(0);
        if played == 0 {
            return 0.0;
        }
        self.base_health.get(entrant).copied().unwrap_or(0) as f64 / played as f64
    }

    /// Average game length.
    #[must_use]
    pub fn avg_turns(&self) -> f64 {
        if self.games_played == 0 {
            return 0.0;
        }
        self.total_turns as f64 / self.games_played as f64
    }
}

/// Play `games` seeded games between `entrants` in parallel.
///
/// Game `i` uses seed `base_seed + i` and the entrants given by
/// [`pairing`]. With `decision_timeout_ms` unset, results are identical for
/// any thread count; a wall-clock timeout makes faults depend on load.
#[must_use]
pub fn run_tournament(
    entrants: &[StrategyKind],
    games: u64,
    base_seed: u64,
    config: &TournamentConfig,
    progress: Option<&ProgressBar>,
) -> TournamentStats {
    let n = entrants.len();
    (0..games)
        .into_par_iter()
        .fold(
            || TournamentStats::new(n),
            |mut local, i| {
                let Some((blue, red)) = pairing(n, i) else {
                    return local;
                };
                let seed = base_seed.wrapping_add(i);
                match run_seeded_match(seed, entrants[blue], entrants[red], config) {
                    Ok(result) => {
                        debug!(
                            seed,
                            blue = %entrants[blue],
                            red = %entrants[red],
                            winner = %result.winner,
                            "game finished"
                        );
                        local.add_result(blue, red, &result);
                    }
                    Err(err) => {
                        warn!(seed, %err, "game produced no result");
                        local.add_invalid();
                    }
                }
                if let Some(pb) = progress {
                    pb.inc(1);
                }
                local
            },
        )
        .reduce(
            || TournamentStats::new(n),
            |mut a, b| {
                a.merge(&b);
                a
            },
        )
}
