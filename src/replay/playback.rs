//! Deterministic re-simulation of a recorded match.

use std::sync::Arc;

use crate::engine::{EndReason, evaluate_termination};
use crate::game::{
    Coord, GameState, MapModel, Team, apply_economy, bomb, resolve_combat, snipe,
};
use crate::replay::{Action, Event, ReplayError, ReplayLog};

/// Where playback ended up after the match was decided.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackOutcome {
    /// State after the deciding tick.
    pub state: GameState,
    /// Winning team.
    pub winner: Team,
    /// Ticks played.
    pub turns: u32,
    /// How the winner was decided.
    pub reason: EndReason,
}

/// Steps through a replay log one tick at a time.
#[derive(Debug)]
pub struct Playback<'a> {
    log: &'a ReplayLog,
    state: GameState,
    ending: Option<(Team, EndReason)>,
}

impl<'a> Playback<'a> {
    /// Start at tick 0.
    ///
    /// # Errors
    ///
    /// Returns an error if the log is truncated or its map is invalid.
    pub fn new(log: &'a ReplayLog) -> Result<Self, ReplayError> {
        Self::at_tick(log, 0)
    }

    /// Start at `tick`, from the latest snapshot at or before it.
    ///
    /// # Errors
    ///
    /// Returns an error if the log is truncated, its map is invalid, the tick
    /// was never played, or an event fails to reproduce.
    pub fn at_tick(log: &'a ReplayLog, tick: u32) -> Result<Self, ReplayError> {
        if log.truncated {
            return Err(ReplayError::Truncated);
        }
        if tick > log.ticks {
            return Err(ReplayError::TickOutOfRange {
                requested: tick,
                ticks: log.ticks,
            });
        }
        let snapshot = log
            .snapshots
            .iter()
            .rev()
            .find(|s| s.turn <= tick)
            .ok_or(ReplayError::NoSnapshot(tick))?;

        let map = Arc::new(MapModel::from_spec(&log.header.map)?);
        let state =
            GameState::from_snapshot(map, log.header.catalog, log.header.rules, snapshot);
        let mut playback = Self {
            log,
            state,
            ending: None,
        };
        while playback.state.turn() < tick {
            playback.step()?;
        }
        Ok(playback)
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &GameState {
        &self.state
    }

    /// Replay one tick.
    ///
    /// # Errors
    ///
    /// Returns an error if the log ends here or an event fails to reproduce.
    pub fn step(&mut self) -> Result<Option<(Team, EndReason)>, ReplayError> {
        let tick = self.state.turn();
        if self.ending.is_some() || tick >= self.log.ticks {
            return Err(ReplayError::TickOutOfRange {
                requested: tick + 1,
                ticks: self.log.ticks,
            });
        }

        apply_economy(&mut self.state);
        for event in self.log.events_at(tick) {
            apply_event(&mut self.state, event)?;
        }
        resolve_combat(&mut self.state);
        let ending = evaluate_termination(&self.state, self.log.header.turn_limit);
        self.state.advance_turn();

        self.ending = ending;
        Ok(ending)
    }

    /// Replay to the deciding tick.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError::Unfinished`] if the log stops before the match
    /// was decided, or any error from [`step`](Self::step).
    pub fn finish(mut self) -> Result<PlaybackOutcome, ReplayError> {
        loop {
            if let Some((winner, reason)) = self.ending {
                return Ok(PlaybackOutcome {
                    turns: self.state.turn(),
                    state: self.state,
                    winner,
                    reason,
                });
            }
            if self.state.turn() >= self.log.ticks {
                return Err(ReplayError::Unfinished);
            }
            self.step()?;
        }
    }
}

/// Re-apply one recorded action, checking it reproduces.
fn apply_event(state: &mut GameState, event: &Event) -> Result<(), ReplayError> {
    let diverged = |detail: String| ReplayError::Divergence {
        tick: event.tick,
        detail,
    };
    let team = event.team;

    match &event.action {
        Action::Build { tower, kind, x, y } => {
            let id = state
                .place_tower(team, *kind, Coord::new(*x, *y))
                .map_err(|e| diverged(e.to_string()))?;
            if id != *tower {
                return Err(diverged(format!("built {id}, recorded {tower}")));
            }
        }
        Action::Sell { tower, refund } => {
            let owned = state.get_tower(*tower).is_some_and(|t| t.team == team);
            let removed = owned.then(|| state.remove_tower(*tower)).flatten();
            let Some((_, paid)) = removed else {
                return Err(diverged(format!("{team} cannot sell {tower}")));
            };
            if paid != *refund {
                return Err(diverged(format!("refund {paid}, recorded {refund}")));
            }
            state.credit(team, paid);
        }
        Action::Send {
            debris,
            lane,
            health,
        } => {
            let id = state
                .spawn_debris(team, *lane, *health)
                .map_err(|e| diverged(e.to_string()))?;
            if id != *debris {
                return Err(diverged(format!("sent {id}, recorded {debris}")));
            }
        }
        Action::Snipe {
            tower,
            priority,
            target,
        } => {
            let hit = snipe(state, *tower, *priority);
            if hit != Some(*target) {
                return Err(diverged(format!("{tower} hit {hit:?}, recorded {target}")));
            }
        }
        Action::Bomb { tower, hits } => {
            let actual = bomb(state, *tower);
            if actual != *hits {
                return Err(diverged(format!("{tower} hit {actual:?}, recorded {hits:?}")));
            }
        }
        Action::Fault { .. } => {}
    }
    Ok(())
}

/// Replay a finished match from its first snapshot to its result.
///
/// # Errors
///
/// Returns an error if the log is truncated, unfinished, or diverges.
pub fn reconstruct(log: &ReplayLog) -> Result<PlaybackOutcome, ReplayError> {
    Playback::new(log)?.finish()
}

/// State at the start of `tick`.
///
/// # Errors
///
/// Returns an error if the log is truncated, the tick was never played, or
/// the log diverges before it.
pub fn state_at(log: &ReplayLog, tick: u32) -> Result<GameState, ReplayError> {
    Ok(Playback::at_tick(log, tick)?.state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{MatchConfig, Strategy, TickEngine};
    use crate::error::StrategyError;
    use crate::game::{Controller, MapSpec, SnipePriority, TowerType};

    /// Builds a gunship, then sends and shoots on a fixed rhythm.
    struct Busy;

    impl Strategy for Busy {
        fn name(&self) -> &'static str {
            "busy"
        }

        fn play_turn(&mut self, rc: &mut Controller<'_>) -> Result<(), StrategyError> {
            let me = rc.get_ally_team();
            if rc.get_turn() == 0 {
                let y = if me == Team::Blue { 0 } else { 2 };
                rc.build_tower(TowerType::Gunship, 4, y)?;
            }
            if rc.get_turn() % 7 == 3 && rc.can_send_debris(2, 30) {
                rc.send_debris(2, 30)?;
            }
            for tower in rc.get_towers(me) {
                rc.auto_snipe(tower.id, SnipePriority::Strong)?;
            }
            Ok(())
        }
    }

    fn record(turn_limit: u32, snapshot_interval: u32) -> (ReplayLog, GameState) {
        let spec = MapSpec {
            name: "playback".to_string(),
            width: 12,
            height: 3,
            path: (0..12).map(|x| (x, 1)).collect(),
            blocked: Vec::new(),
        };
        let map = Arc::new(MapModel::from_spec(&spec).unwrap());
        let config = MatchConfig {
            turn_limit,
            snapshot_interval,
            decision_timeout_ms: None,
            ..MatchConfig::default()
        };
        let mut engine = TickEngine::new(map, Box::new(Busy), Box::new(Busy), config);
        engine.run_game().unwrap();
        let state = engine.state().clone();
        (engine.into_replay(), state)
    }

    #[test]
    fn test_reconstruct_matches_live_run() {
        let (log, live) = record(120, 25);
        let result = log.result.unwrap();

        let outcome = reconstruct(&log).unwrap();
        assert_eq!(outcome.winner, result.winner);
        assert_eq!(outcome.turns, result.turns);
        assert_eq!(outcome.reason, result.reason);
        assert_eq!(outcome.state, live);
    }

    #[test]
    fn test_stepping_reproduces_snapshots() {
        let (log, _) = record(120, 25);
        assert_eq!(log.snapshots.len(), 5);

        let mut playback = Playback::new(&log).unwrap();
        for snapshot in &log.snapshots {
            while playback.state().turn() < snapshot.turn {
                playback.step().unwrap();
            }
            assert_eq!(playback.state().snapshot(), *snapshot);
        }
    }

    #[test]
    fn test_state_at_uses_nearest_snapshot() {
        let (log, _) = record(120, 25);
        let from_zero = {
            let mut playback = Playback::new(&log).unwrap();
            while playback.state().turn() < 60 {
                playback.step().unwrap();
            }
            playback.state().clone()
        };
        assert_eq!(state_at(&log, 60).unwrap(), from_zero);
    }

    #[test]
    fn test_truncated_log_refused() {
        let (mut log, _) = record(30, 10);
        log.truncated = true;
        assert!(matches!(reconstruct(&log), Err(ReplayError::Truncated)));
    }

    #[test]
    fn test_tampered_log_diverges() {
        let (mut log, _) = record(60, 0);
        let send = log
            .events
            .iter_mut()
            .find(|e| matches!(e.action, Action::Send { .. }))
            .unwrap();
        if let Action::Send { debris, .. } = &mut send.action {
            debris.0 += 100;
        }
        assert!(matches!(reconstruct(&log), Err(ReplayError::Divergence { .. })));
    }

    #[test]
    fn test_tick_out_of_range() {
        let (log, _) = record(30, 10);
        assert!(matches!(
            state_at(&log, 31),
            Err(ReplayError::TickOutOfRange { .. })
        ));
        assert!(state_at(&log, 30).is_ok());
    }
}
