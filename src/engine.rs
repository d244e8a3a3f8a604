//! Match engine.
//!
//! A [`TickEngine`] owns one match from setup to result. Every tick runs the
//! same phases in the same order:
//!
//! 1. Economy: passive income and solar farms, Blue then Red.
//! 2. Decision: Blue's strategy, then Red's, each through its own controller.
//! 3. Combat: queued damage, movement, arrivals, tower cooldowns.
//! 4. Termination check.
//! 5. Turn advance and periodic snapshot.
//!
//! Strategy faults (errors, panics, blown budgets) roll the team's state
//! changes back and forfeit its tick. Contract violations end the match as
//! invalid.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::{ControllerError, MatchError, StrategyError};
use crate::game::{
    Controller, GameState, MapModel, Rules, Team, TowerCatalog, apply_economy, assert_invariants,
    resolve_combat,
};
use crate::replay::{Action, ReplayHeader, ReplayLog, ReplayRecorder};

/// A competitor. Constructed once per match with its own copy of the map.
pub trait Strategy {
    /// Display name, stored in replays.
    fn name(&self) -> &str;

    /// Decide this tick's actions through `rc`.
    ///
    /// # Errors
    ///
    /// Any error forfeits the team's actions for this tick.
    fn play_turn(&mut self, rc: &mut Controller<'_>) -> Result<(), StrategyError>;
}

/// Match settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Ticks before the tie-break decides the match.
    pub turn_limit: u32,
    /// Wall-clock budget per decision call, in milliseconds.
    pub decision_timeout_ms: Option<u64>,
    /// Controller calls allowed per decision call.
    pub call_budget: u64,
    /// Ticks between replay snapshots (0 = tick 0 only).
    pub snapshot_interval: u32,
    /// Events kept before the replay is truncated.
    pub max_replay_events: usize,
    /// Economy and pricing rules.
    pub rules: Rules,
    /// Tower stats.
    pub catalog: TowerCatalog,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            turn_limit: 2000,
            decision_timeout_ms: Some(100),
            call_budget: 100_000,
            snapshot_interval: 100,
            max_replay_events: 1_000_000,
            rules: Rules::default(),
            catalog: TowerCatalog::default(),
        }
    }
}

/// Lifecycle of a [`TickEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStatus {
    /// Created, no tick played yet.
    Setup,
    /// At least one tick played.
    Running,
    /// Result decided, cancelled or invalidated.
    Finished,
}

/// How a match was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// One base fell.
    BaseDestroyed,
    /// Both bases fell on the same tick; decided by tie-break.
    MutualDestruction,
    /// Turn limit reached; decided by tie-break.
    TurnLimit,
}

/// Final outcome of a valid match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Winning team.
    pub winner: Team,
    /// Ticks played.
    pub turns: u32,
    /// How the winner was decided.
    pub reason: EndReason,
    /// Final base health (Blue, Red).
    pub base_health: [u64; 2],
    /// Final balance (Blue, Red).
    pub balances: [u64; 2],
    /// Forfeited decisions (Blue, Red).
    pub faults: [u32; 2],
}

/// Decide whether the tick just resolved ends the match.
///
/// Called after combat and before the turn counter advances. Both bases
/// falling together, or the turn limit, go to [`GameState::leader`].
#[must_use]
pub fn evaluate_termination(state: &GameState, turn_limit: u32) -> Option<(Team, EndReason)> {
    let blue_down = state.base_health(Team::Blue) == 0;
    let red_down = state.base_health(Team::Red) == 0;
    match (blue_down, red_down) {
        (true, true) => Some((state.leader(), EndReason::MutualDestruction)),
        (true, false) => Some((Team::Red, EndReason::BaseDestroyed)),
        (false, true) => Some((Team::Blue, EndReason::BaseDestroyed)),
        (false, false) if state.turn() + 1 >= turn_limit => {
            Some((state.leader(), EndReason::TurnLimit))
        }
        (false, false) => None,
    }
}

/// Runs one match. Not restartable.
pub struct TickEngine {
    state: GameState,
    strategies: [Box<dyn Strategy>; 2],
    config: MatchConfig,
    status: MatchStatus,
    recorder: ReplayRecorder,
    faults: [u32; 2],
    cancel: Arc<AtomicBool>,
    result: Option<MatchResult>,
}

impl std::fmt::Debug for TickEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickEngine")
            .field("blue", &self.strategies[0].name())
            .field("red", &self.strategies[1].name())
            .field("turn", &self.state.turn())
            .field("status", &self.status)
            .field("faults", &self.faults)
            .finish_non_exhaustive()
    }
}

impl TickEngine {
    /// Set up a match on `map` between `blue` and `red`.
    #[must_use]
    pub fn new(
        map: Arc<MapModel>,
        blue: Box<dyn Strategy>,
        red: Box<dyn Strategy>,
        config: MatchConfig,
    ) -> Self {
        let state = GameState::new(map, config.catalog, config.rules);
        let names = [blue.name().to_string(), red.name().to_string()];
        let header = ReplayHeader::new(&state, &config, names);
        let recorder = ReplayRecorder::new(header, &state, config.max_replay_events);
        Self {
            state,
            strategies: [blue, red],
            config,
            status: MatchStatus::Setup,
            recorder,
            faults: [0; 2],
            cancel: Arc::new(AtomicBool::new(false)),
            result: None,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &GameState {
        &self.state
    }

    /// Lifecycle status.
    #[must_use]
    pub const fn status(&self) -> MatchStatus {
        self.status
    }

    /// Settings in effect.
    #[must_use]
    pub const fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Result, once the match has been decided.
    #[must_use]
    pub const fn result(&self) -> Option<&MatchResult> {
        self.result.as_ref()
    }

    /// Replay recorded so far.
    #[must_use]
    pub const fn replay(&self) -> &ReplayLog {
        self.recorder.log()
    }

    /// Take the replay.
    #[must_use]
    pub fn into_replay(self) -> ReplayLog {
        self.recorder.into_log()
    }

    /// Flag another thread can set to cancel the match at the next tick
    /// boundary.
    #[must_use]
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Stop the match at the current tick boundary.
    ///
    /// The replay keeps every completed tick and has no result.
    pub fn cancel(&mut self) {
        if self.status != MatchStatus::Finished {
            info!(tick = self.state.turn(), "match cancelled");
            self.status = MatchStatus::Finished;
        }
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Play ticks until the match is decided.
    ///
    /// # Errors
    ///
    /// Returns an error if a strategy breaks the controller contract, the
    /// match is cancelled, or it already finished.
    pub fn run_game(&mut self) -> Result<MatchResult, MatchError> {
        loop {
            if let Some(result) = self.step()? {
                return Ok(result);
            }
        }
    }

    /// Play one tick.
    ///
    /// Returns the result on the tick that decides the match.
    ///
    /// # Errors
    ///
    /// Returns an error if a strategy breaks the controller contract, the
    /// match is cancelled, or it already finished.
    pub fn step(&mut self) -> Result<Option<MatchResult>, MatchError> {
        if self.cancel.load(Ordering::Relaxed) {
            self.cancel();
            return Err(MatchError::Cancelled {
                tick: self.state.turn(),
            });
        }
        match self.status {
            MatchStatus::Finished => return Err(MatchError::AlreadyFinished),
            MatchStatus::Setup => {
                info!(
                    map = self.state.map().name(),
                    blue = self.strategies[0].name(),
                    red = self.strategies[1].name(),
                    turn_limit = self.config.turn_limit,
                    "match started"
                );
                self.status = MatchStatus::Running;
            }
            MatchStatus::Running => {}
        }
        let tick = self.state.turn();

        // Phase 1: economy
        let income = apply_economy(&mut self.state);

        // Phase 2: decisions, Blue first
        for team in Team::ALL {
            self.decide(team)?;
        }

        // Phase 3: combat and movement
        let combat = resolve_combat(&mut self.state);
        if !combat.removals.is_empty() {
            debug!(
                tick,
                destroyed = combat.destroyed(),
                arrived = combat.arrived(),
                blue_base_damage = combat.base_damage[0],
                red_base_damage = combat.base_damage[1],
                "combat resolved"
            );
        }

        // Phase 4: termination
        let ending = evaluate_termination(&self.state, self.config.turn_limit);

        // Phase 5: advance
        self.state.advance_turn();
        assert_invariants(&self.state);
        self.recorder.end_tick(&self.state);
        debug!(
            tick,
            blue_income = income.income[0],
            red_income = income.income[1],
            blue_balance = self.state.balance(Team::Blue),
            red_balance = self.state.balance(Team::Red),
            "tick complete"
        );

        Ok(ending.map(|(winner, reason)| self.finish(winner, reason)))
    }

    fn finish(&mut self, winner: Team, reason: EndReason) -> MatchResult {
        let result = MatchResult {
            winner,
            turns: self.state.turn(),
            reason,
            base_health: [
                self.state.base_health(Team::Blue),
                self.state.base_health(Team::Red),
            ],
            balances: [
                self.state.balance(Team::Blue),
                self.state.balance(Team::Red),
            ],
            faults: self.faults,
        };
        info!(
            %winner,
            turns = result.turns,
            ?reason,
            blue_base = result.base_health[0],
            red_base = result.base_health[1],
            "match finished"
        );
        self.recorder.finish(result);
        self.result = Some(result);
        self.status = MatchStatus::Finished;
        result
    }

    /// Run one team's decision call.
    fn decide(&mut self, team: Team) -> Result<(), MatchError> {
        let tick = self.state.turn();
        let backup = self.state.clone();
        let deadline = self
            .config
            .decision_timeout_ms
            .map(|ms| Instant::now() + Duration::from_millis(ms));

        let strategy = &mut self.strategies[team.index()];
        let mut rc = Controller::new(team, &mut self.state, self.config.call_budget, deadline);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| strategy.play_turn(&mut rc)));
        let report = rc.finish();

        if let Some(ControllerError::ContractViolation { action, detail }) = report.violation {
            let detail = format!("{action}: {detail}");
            error!(tick, %team, %detail, "contract violation; match invalid");
            self.status = MatchStatus::Finished;
            return Err(MatchError::ContractViolation { team, tick, detail });
        }

        let overtime = deadline.is_some_and(|d| Instant::now() > d);
        let fault = match outcome {
            Err(payload) => Some(format!("panicked: {}", panic_message(payload.as_ref()))),
            Ok(Err(err)) => Some(err.to_string()),
            Ok(Ok(())) if report.exhausted || overtime => {
                Some(ControllerError::BudgetExhausted.to_string())
            }
            Ok(Ok(())) => None,
        };

        match fault {
            Some(reason) => {
                warn!(tick, %team, %reason, "strategy fault; tick forfeited");
                self.state = backup;
                self.faults[team.index()] += 1;
                self.recorder.record(tick, team, Action::Fault { reason });
            }
            None => self.recorder.record_all(tick, team, report.actions),
        }
        Ok(())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Coord, MapSpec, TowerType};

    struct Idle;

    impl Strategy for Idle {
        fn name(&self) -> &'static str {
            "idle"
        }

        fn play_turn(&mut self, _rc: &mut Controller<'_>) -> Result<(), StrategyError> {
            Ok(())
        }
    }

    /// Runs a closure on each tick.
    struct Scripted<F>(F);

    impl<F> Strategy for Scripted<F>
    where
        F: FnMut(&mut Controller<'_>) -> Result<(), StrategyError>,
    {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn play_turn(&mut self, rc: &mut Controller<'_>) -> Result<(), StrategyError> {
            (self.0)(rc)
        }
    }

    fn create_map() -> Arc<MapModel> {
        let spec = MapSpec {
            name: "engine".to_string(),
            width: 10,
            height: 3,
            path: (0..10).map(|x| (x, 1)).collect(),
            blocked: Vec::new(),
        };
        Arc::new(MapModel::from_spec(&spec).unwrap())
    }

    fn config(turn_limit: u32) -> MatchConfig {
        MatchConfig {
            turn_limit,
            decision_timeout_ms: None,
            ..MatchConfig::default()
        }
    }

    #[test]
    fn test_idle_match_goes_to_tie_break() {
        let mut engine = TickEngine::new(create_map(), Box::new(Idle), Box::new(Idle), config(50));
        assert_eq!(engine.status(), MatchStatus::Setup);
        let result = engine.run_game().unwrap();
        assert_eq!(result.winner, Team::Blue);
        assert_eq!(result.turns, 50);
        assert_eq!(result.reason, EndReason::TurnLimit);
        assert_eq!(engine.status(), MatchStatus::Finished);
        assert_eq!(engine.run_game(), Err(MatchError::AlreadyFinished));
    }

    #[test]
    fn test_richer_team_wins_tie_break() {
        let red = Scripted(|rc: &mut Controller<'_>| {
            if rc.get_turn() == 0 {
                rc.send_debris(1, 1)?;
            }
            Ok(())
        });
        let mut engine = TickEngine::new(create_map(), Box::new(Idle), Box::new(red), config(5));
        let result = engine.run_game().unwrap();
        // Red spent 3 on a debris that has not arrived yet
        assert_eq!(result.winner, Team::Blue);
        assert_eq!(result.balances[0] - result.balances[1], 3);
    }

    #[test]
    fn test_debris_reaching_base() {
        let blue = Scripted(|rc: &mut Controller<'_>| {
            if rc.get_turn() == 0 {
                rc.send_debris(1, 100)?;
            }
            Ok(())
        });
        let mut engine = TickEngine::new(create_map(), Box::new(blue), Box::new(Idle), config(50));
        let result = engine.run_game().unwrap();
        assert_eq!(result.base_health, [2500, 2400]);
        assert_eq!(result.winner, Team::Blue);
    }

    #[test]
    fn test_base_destroyed_ends_match() {
        let mut cfg = config(500);
        cfg.rules.base_health = 50;
        let blue = Scripted(|rc: &mut Controller<'_>| {
            if rc.get_turn() == 0 {
                rc.send_debris(1, 60)?;
            }
            Ok(())
        });
        let mut engine = TickEngine::new(create_map(), Box::new(blue), Box::new(Idle), cfg);
        let result = engine.run_game().unwrap();
        assert_eq!(result.reason, EndReason::BaseDestroyed);
        assert_eq!(result.winner, Team::Blue);
        // Sent on tick 0, steps once per tick, arrives after 10 steps
        assert_eq!(result.turns, 10);
    }

    #[test]
    fn test_strategy_error_forfeits_tick() {
        let blue = Scripted(|rc: &mut Controller<'_>| {
            let turn = rc.get_turn();
            if turn == 5 {
                rc.send_debris(1, 10)?;
                return Err(StrategyError::failed("bad tick"));
            }
            Ok(())
        });
        let mut engine = TickEngine::new(create_map(), Box::new(blue), Box::new(Idle), config(20));
        let result = engine.run_game().unwrap();
        assert_eq!(result.turns, 20);
        assert_eq!(result.faults, [1, 0]);
        // The debris bought before the error was rolled back
        assert_eq!(result.balances[0], result.balances[1]);
        assert_eq!(engine.state().debris().count(), 0);

        let log = engine.replay();
        assert_eq!(log.events.len(), 1);
        assert_eq!(log.events[0].tick, 5);
        assert!(matches!(log.events[0].action, Action::Fault { .. }));
    }

    #[test]
    fn test_panic_is_contained() {
        let red = Scripted(|rc: &mut Controller<'_>| {
            assert!(rc.get_turn() != 5, "red exploded");
            Ok(())
        });
        let mut engine = TickEngine::new(create_map(), Box::new(Idle), Box::new(red), config(10));
        let result = engine.run_game().unwrap();
        assert_eq!(result.turns, 10);
        assert_eq!(result.faults, [0, 1]);
        match &engine.replay().events[0].action {
            Action::Fault { reason } => assert!(reason.contains("red exploded")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_overtime_forfeits_tick() {
        let blue = Scripted(|rc: &mut Controller<'_>| {
            rc.send_debris(1, 10)?;
            std::thread::sleep(Duration::from_millis(25));
            Ok(())
        });
        let cfg = MatchConfig {
            decision_timeout_ms: Some(5),
            ..config(3)
        };
        let mut engine = TickEngine::new(create_map(), Box::new(blue), Box::new(Idle), cfg);
        let result = engine.run_game().unwrap();

        assert_eq!(result.faults, [3, 0]);
        // Every purchase was rolled back
        assert_eq!(engine.state().debris().count(), 0);
        assert_eq!(result.balances[0], result.balances[1]);
        let log = engine.replay();
        assert_eq!(log.events.len(), 3);
        assert!(
            log.events
                .iter()
                .all(|e| e.team == Team::Blue && matches!(e.action, Action::Fault { .. }))
        );
    }

    #[test]
    fn test_huge_rules_do_not_panic() {
        let mut cfg = config(30);
        cfg.rules.starting_balance = u64::MAX - 10_000;
        cfg.rules.reinforcer_bonus_percent = u64::MAX / 2;
        let blue = Scripted(|rc: &mut Controller<'_>| {
            if rc.get_turn() == 0 {
                rc.build_tower(TowerType::SolarFarm, 3, 0)?;
                rc.build_tower(TowerType::Reinforcer, 4, 0)?;
                rc.build_tower(TowerType::Reinforcer, 3, 2)?;
            }
            Ok(())
        });
        let mut engine = TickEngine::new(create_map(), Box::new(blue), Box::new(Idle), cfg);
        let result = engine.run_game().unwrap();
        assert_eq!(result.reason, EndReason::TurnLimit);
        // The amplified farm saturates rather than wrapping
        assert_eq!(result.balances[0], u64::MAX);
        assert_eq!(result.winner, Team::Blue);
    }

    #[test]
    fn test_call_budget_forfeits_tick() {
        let blue = Scripted(|rc: &mut Controller<'_>| {
            rc.send_debris(1, 1)?;
            for _ in 0..10 {
                let _ = rc.get_turn();
            }
            Ok(())
        });
        let mut cfg = config(3);
        cfg.call_budget = 5;
        let mut engine = TickEngine::new(create_map(), Box::new(blue), Box::new(Idle), cfg);
        let result = engine.run_game().unwrap();
        assert_eq!(result.faults, [3, 0]);
        assert_eq!(engine.state().debris().count(), 0);
    }

    #[test]
    fn test_contract_violation_invalidates_match() {
        let blue = Scripted(|rc: &mut Controller<'_>| {
            if rc.get_turn() == 2 {
                // Swallowing the error does not hide the violation
                let _ = rc.build_tower(TowerType::Gunship, 3, 1);
            }
            Ok(())
        });
        let mut engine = TickEngine::new(create_map(), Box::new(blue), Box::new(Idle), config(20));
        let err = engine.run_game().unwrap_err();
        assert!(matches!(
            err,
            MatchError::ContractViolation {
                team: Team::Blue,
                tick: 2,
                ..
            }
        ));
        assert_eq!(engine.status(), MatchStatus::Finished);
        assert!(engine.replay().result.is_none());
    }

    #[test]
    fn test_cancel_at_tick_boundary() {
        let mut engine = TickEngine::new(create_map(), Box::new(Idle), Box::new(Idle), config(100));
        for _ in 0..3 {
            assert_eq!(engine.step(), Ok(None));
        }
        let handle = engine.cancel_handle();
        handle.store(true, Ordering::Relaxed);
        assert_eq!(engine.step(), Err(MatchError::Cancelled { tick: 3 }));
        assert_eq!(engine.status(), MatchStatus::Finished);
        let log = engine.into_replay();
        assert_eq!(log.ticks, 3);
        assert!(log.result.is_none());
    }

    #[test]
    fn test_gunship_one_shots_weak_debris() {
        let mut cfg = config(60);
        cfg.rules.starting_balance = 5000;
        let blue = Scripted(|rc: &mut Controller<'_>| {
            match rc.get_turn() {
                0 => {
                    rc.build_tower(TowerType::Gunship, 5, 0)?;
                }
                _ => {
                    for tower in rc.get_towers(Team::Blue) {
                        rc.auto_snipe(tower.id, crate::game::SnipePriority::First)?;
                    }
                }
            }
            Ok(())
        });
        let red = Scripted(|rc: &mut Controller<'_>| {
            if rc.get_turn() == 15 {
                rc.send_debris(1, 20)?;
            }
            Ok(())
        });
        let mut engine = TickEngine::new(create_map(), Box::new(blue), Box::new(red), cfg);
        let result = engine.run_game().unwrap();
        assert_eq!(result.base_health[0], 2500);
        assert!(engine.state().tower_at(Team::Blue, Coord::new(5, 0)).is_some());
        assert!(
            engine
                .replay()
                .events
                .iter()
                .any(|e| matches!(e.action, Action::Snipe { .. }))
        );
    }

    #[test]
    fn test_evaluate_termination() {
        let mut state = GameState::new(create_map(), TowerCatalog::default(), Rules::default());
        assert_eq!(evaluate_termination(&state, 10), None);
        assert_eq!(
            evaluate_termination(&state, 1),
            Some((Team::Blue, EndReason::TurnLimit))
        );

        state.damage_base(Team::Blue, 5000);
        assert_eq!(
            evaluate_termination(&state, 10),
            Some((Team::Red, EndReason::BaseDestroyed))
        );

        state.damage_base(Team::Red, 5000);
        state.credit(Team::Red, 1);
        assert_eq!(
            evaluate_termination(&state, 10),
            Some((Team::Red, EndReason::MutualDestruction))
        );
    }
}
