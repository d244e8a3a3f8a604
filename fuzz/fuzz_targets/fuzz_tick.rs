#![no_main]

//! Full tick fuzzer.
//!
//! This fuzz target drives the controller with arbitrary calls, legal or not,
//! and runs the tick phases in engine order:
//! 1. Economy
//! 2. Blue's calls, then Red's, each through its own controller
//! 3. Combat and movement
//! 4. Turn advance
//!
//! A contract violation must leave the state exactly as the last legal call
//! left it, and invariants must hold after every tick.

use std::sync::Arc;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sentinel::game::{
    MapModel, MapSpec, apply_economy, check_invariants, check_transition, resolve_combat,
};
use sentinel::{Controller, GameState, Rules, SnipePriority, Team, TowerCatalog, TowerId, TowerType};

/// A fuzzer-generated controller call.
#[derive(Arbitrary, Debug, Clone)]
enum FuzzCall {
    /// Build a tower, checking legality first when `checked`.
    Build { kind: u8, x: i8, y: i8, checked: bool },
    /// Sell a tower by raw id.
    Sell { id: u8, checked: bool },
    /// Send a debris.
    Send { lane: u8, health: u16, checked: bool },
    /// Fire a tower by raw id.
    Fire { id: u8, priority: u8 },
}

/// Structured input for tick fuzzing.
#[derive(Arbitrary, Debug)]
struct TickInput {
    /// Starting balance for both teams.
    starting_balance: u16,
    /// Calls for Blue.
    blue_calls: Vec<FuzzCall>,
    /// Calls for Red.
    red_calls: Vec<FuzzCall>,
    /// Number of ticks to simulate.
    num_ticks: u8,
}

fuzz_target!(|input: TickInput| {
    // Cap values to avoid excessive runtime
    let num_ticks = (input.num_ticks % 40).max(1);
    let blue_calls: Vec<_> = input.blue_calls.into_iter().take(16).collect();
    let red_calls: Vec<_> = input.red_calls.into_iter().take(16).collect();

    // Winding path across a 10x6 board
    let spec = MapSpec {
        name: "fuzz".to_string(),
        width: 10,
        height: 6,
        path: (0..5)
            .map(|x| (x, 1))
            .chain((2..5).map(|y| (4, y)))
            .chain((5..10).map(|x| (x, 4)))
            .collect(),
        blocked: vec![(0, 5), (9, 0)],
    };
    let Ok(map) = MapModel::from_spec(&spec) else {
        return;
    };
    let rules = Rules {
        starting_balance: u64::from(input.starting_balance),
        ..Rules::default()
    };
    let mut state = GameState::new(Arc::new(map), TowerCatalog::default(), rules);

    let violations = check_invariants(&state);
    assert!(violations.is_empty(), "Invariants violated at start: {violations:?}");

    for tick in 0..num_ticks {
        let before = state.clone();

        // Phase 1: economy
        apply_economy(&mut state);

        // Phase 2: decisions, Blue first
        for (team, calls) in [(Team::Blue, &blue_calls), (Team::Red, &red_calls)] {
            let backup = state.clone();
            let mut rc = Controller::new(team, &mut state, 10_000, None);
            for call in calls {
                if apply_call(&mut rc, call).is_err() {
                    break;
                }
            }
            let report = rc.finish();
            if report.violation.is_some() {
                // The engine ends the match here; keep fuzzing from the backup
                state = backup;
            }
        }

        // Phase 3: combat
        resolve_combat(&mut state);

        // Phase 4: advance
        state.advance_turn();

        let violations = check_invariants(&state);
        assert!(
            violations.is_empty(),
            "Invariants violated after tick {tick}: {violations:?}"
        );
        let violations = check_transition(&before, &state);
        assert!(
            violations.is_empty(),
            "Transition violated on tick {tick}: {violations:?}"
        );

        if state.base_health(Team::Blue) == 0 || state.base_health(Team::Red) == 0 {
            break;
        }
    }
});

fn tower_kind(raw: u8) -> TowerType {
    match raw % 4 {
        0 => TowerType::Gunship,
        1 => TowerType::Bomber,
        2 => TowerType::SolarFarm,
        _ => TowerType::Reinforcer,
    }
}

fn snipe_priority(raw: u8) -> SnipePriority {
    match raw % 5 {
        0 => SnipePriority::First,
        1 => SnipePriority::Last,
        2 => SnipePriority::Strong,
        3 => SnipePriority::Weak,
        _ => SnipePriority::Close,
    }
}

/// Apply a fuzzer-generated call. Unchecked calls may break the contract.
fn apply_call(rc: &mut Controller<'_>, call: &FuzzCall) -> Result<(), sentinel::ControllerError> {
    match *call {
        FuzzCall::Build { kind, x, y, checked } => {
            let kind = tower_kind(kind);
            let (x, y) = (i32::from(x), i32::from(y));
            if !checked || rc.can_build_tower(kind, x, y) {
                rc.build_tower(kind, x, y)?;
            }
        }
        FuzzCall::Sell { id, checked } => {
            let id = TowerId(u32::from(id));
            if !checked || rc.can_sell_tower(id) {
                rc.sell_tower(id)?;
            }
        }
        FuzzCall::Send { lane, health, checked } => {
            let (lane, health) = (u32::from(lane), u64::from(health));
            if !checked || rc.can_send_debris(lane, health) {
                rc.send_debris(lane, health)?;
            }
        }
        FuzzCall::Fire { id, priority } => {
            let id = TowerId(u32::from(id));
            let Some(tower) = rc.get_towers(rc.get_ally_team()).into_iter().find(|t| t.id == id)
            else {
                return Ok(());
            };
            match tower.kind {
                TowerType::Gunship => {
                    rc.auto_snipe(id, snipe_priority(priority))?;
                }
                TowerType::Bomber => {
                    rc.auto_bomb(id)?;
                }
                TowerType::SolarFarm | TowerType::Reinforcer => {}
            }
        }
    }
    Ok(())
}
