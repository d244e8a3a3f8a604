//! Output formatting utilities for CLI.

// Averages and percentages are reported as floats
#![allow(clippy::cast_precision_loss)]

use std::fmt::Write as _;

use sentinel::replay::{Action, Event, ReplayLog};
use sentinel::strategies::StrategyKind;
use sentinel::tournament::TournamentStats;
use sentinel::{GameState, MatchResult, Team, TowerType};
use serde::Serialize;

/// JSON-serializable match report.
#[derive(Debug, Serialize)]
pub(super) struct JsonMatchReport<'a> {
    /// Seed the map was generated from (null for map files).
    pub(super) seed: Option<u64>,
    /// Map name.
    pub(super) map: &'a str,
    /// Strategy names (Blue, Red).
    pub(super) strategies: &'a [String; 2],
    /// Outcome.
    pub(super) result: &'a MatchResult,
}

/// Format a match result as human-readable text.
pub(super) fn format_result_text(
    result: &MatchResult,
    names: &[String; 2],
    map: &str,
    seed: Option<u64>,
) -> String {
    let mut output = String::new();

    match seed {
        Some(seed) => {
            let _ = writeln!(output, "Match Result (map: {map}, seed: {seed})");
        }
        None => {
            let _ = writeln!(output, "Match Result (map: {map})");
        }
    }
    let winner_name = &names[result.winner.index()];
    let _ = writeln!(output, "  Winner: {} ({winner_name})", result.winner);
    let _ = writeln!(output, "  Reason: {:?}", result.reason);
    let _ = writeln!(output, "  Turns: {}\n", result.turns);

    for team in Team::ALL {
        let i = team.index();
        let _ = write!(
            output,
            "  {team:<4} {:<10} base {:>5}  balance {:>7}",
            names[i], result.base_health[i], result.balances[i]
        );
        if result.faults[i] > 0 {
            let _ = write!(output, "  [{} faults]", result.faults[i]);
        }
        output.push('\n');
    }

    output
}

/// Describe one recorded action.
pub(super) fn describe_action(action: &Action) -> String {
    match action {
        Action::Build { tower, kind, x, y } => format!("build {kind:?} {tower} at ({x}, {y})"),
        Action::Sell { tower, refund } => format!("sell {tower} for {refund}"),
        Action::Send {
            debris,
            lane,
            health,
        } => format!("send {debris} (lane {lane}, health {health})"),
        Action::Snipe {
            tower,
            priority,
            target,
        } => format!("{tower} snipes {target} ({priority})"),
        Action::Bomb { tower, hits } => {
            let hits: Vec<String> = hits.iter().map(ToString::to_string).collect();
            format!("{tower} bombs {}", hits.join(", "))
        }
        Action::Fault { reason } => format!("FAULT: {reason}"),
    }
}

/// Format one recorded event.
pub(super) fn format_event(event: &Event) -> String {
    format!(
        "  [{:>5}] {:<4} {}",
        event.tick,
        event.team,
        describe_action(&event.action)
    )
}

/// Summarise a state: balances, bases and units per team.
pub(super) fn format_state_text(state: &GameState, names: &[String; 2]) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "Turn {}", state.turn());
    for team in Team::ALL {
        let count = |kind: TowerType| state.towers_of(team).filter(|t| t.kind == kind).count();
        let incoming: Vec<_> = state.debris_of(team.opponent()).collect();
        let incoming_health: u64 = incoming.iter().map(|d| d.health).sum();
        let _ = writeln!(
            output,
            "  {team:<4} {:<10} base {:>5}  balance {:>7}",
            names[team.index()],
            state.base_health(team),
            state.balance(team)
        );
        let _ = writeln!(
            output,
            "       towers: {} gunship, {} bomber, {} solar farm, {} reinforcer",
            count(TowerType::Gunship),
            count(TowerType::Bomber),
            count(TowerType::SolarFarm),
            count(TowerType::Reinforcer)
        );
        let _ = writeln!(
            output,
            "       incoming debris: {} ({} health)",
            incoming.len(),
            incoming_health
        );
    }
    output
}

/// Format a replay log's header and outcome.
pub(super) fn format_replay_summary(log: &ReplayLog) -> String {
    let mut output = String::new();
    let header = &log.header;
    let _ = writeln!(output, "Replay (version {})", header.version);
    let _ = writeln!(
        output,
        "  Map: {} ({}x{}, path length {})",
        header.map.name,
        header.map.width,
        header.map.height,
        header.map.path.len()
    );
    let _ = writeln!(
        output,
        "  BLUE: {}  RED: {}",
        header.strategies[0], header.strategies[1]
    );
    let _ = writeln!(output, "  Ticks: {}", log.ticks);
    let _ = writeln!(
        output,
        "  Events: {}{}",
        log.events.len(),
        if log.truncated { " (truncated)" } else { "" }
    );
    let _ = writeln!(output, "  Snapshots: {}", log.snapshots.len());
    let faults = log.faults();
    let _ = writeln!(output, "  Faults: BLUE {}, RED {}", faults[0], faults[1]);
    match &log.result {
        Some(result) => {
            let _ = writeln!(
                output,
                "  Result: {} wins ({:?}) after {} turns",
                result.winner, result.reason, result.turns
            );
        }
        None => output.push_str("  Result: none (cancelled or invalid)\n"),
    }
    output
}

/// JSON-serializable tournament result.
#[derive(Debug, Serialize)]
pub(super) struct JsonTournamentResult {
    /// Games with a result.
    games_played: u64,
    /// Games without a result.
    invalid: u64,
    /// Per-entrant statistics.
    entrants: Vec<JsonTournamentEntrant>,
    /// Average game length in turns.
    avg_turns: f64,
}

/// JSON-serializable per-entrant tournament stats.
#[derive(Debug, Serialize)]
pub(super) struct JsonTournamentEntrant {
    /// Strategy name.
    strategy: String,
    /// Games played.
    games: u64,
    /// Number of wins.
    wins: u64,
    /// Win rate (0.0-1.0).
    win_rate: f64,
    /// Average base health at the end of a game.
    avg_base_health: f64,
    /// Forfeited decisions.
    faults: u64,
}

impl JsonTournamentResult {
    /// Create from stats and entrants.
    pub(super) fn from_stats(stats: &TournamentStats, entrants: &[StrategyKind]) -> Self {
        let entrants = entrants
            .iter()
            .enumerate()
            .map(|(i, kind)| JsonTournamentEntrant {
                strategy: kind.to_string(),
                games: stats.appearances.get(i).copied().unwrap_or(0),
                wins: stats.wins.get(i).copied().unwrap_or(0),
                win_rate: stats.win_rate(i),
                avg_base_health: stats.avg_base_health(i),
                faults: stats.faults.get(i).copied().unwrap_or(0),
            })
            .collect();

        Self {
            games_played: stats.games_played,
            invalid: stats.invalid,
            entrants,
            avg_turns: stats.avg_turns(),
        }
    }
}

/// Format tournament stats as human-readable text.
pub(super) fn format_tournament_text(stats: &TournamentStats, entrants: &[StrategyKind]) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "Tournament Results ({} games)", stats.games_played);
    output.push_str("========================================\n\n");

    output.push_str("Win Rates:\n");
    for (i, kind) in entrants.iter().enumerate() {
        let wins = stats.wins.get(i).copied().unwrap_or(0);
        let games = stats.appearances.get(i).copied().unwrap_or(0);
        let _ = writeln!(
            output,
            "  {}. {:<10} {:>5.1}% ({wins}/{games} wins)",
            i + 1,
            kind.name(),
            stats.win_rate(i) * 100.0
        );
    }
    if stats.invalid > 0 {
        let _ = writeln!(output, "  Invalid games: {}", stats.invalid);
    }

    output.push_str("\nAverage Base Health:\n");
    for (i, kind) in entrants.iter().enumerate() {
        let faults = stats.faults.get(i).copied().unwrap_or(0);
        let _ = write!(
            output,
            "  {}. {:<10} {:>7.1}",
            i + 1,
            kind.name(),
            stats.avg_base_health(i)
        );
        if faults > 0 {
            let _ = write!(output, "  [{faults} faults]");
        }
        output.push('\n');
    }

    let _ = writeln!(output, "\nAverage Game Length: {:.0} turns", stats.avg_turns());

    output
}

/// Format tournament stats as CSV.
pub(super) fn format_tournament_csv(stats: &TournamentStats, entrants: &[StrategyKind]) -> String {
    let mut output = String::new();

    // Header
    output.push_str("entrant,strategy,games,wins,win_rate,avg_base_health,faults\n");

    // Data rows
    for (i, kind) in entrants.iter().enumerate() {
        let _ = writeln!(
            output,
            "{},{},{},{},{:.4},{:.2},{}",
            i + 1,
            kind.name(),
            stats.appearances.get(i).copied().unwrap_or(0),
            stats.wins.get(i).copied().unwrap_or(0),
            stats.win_rate(i),
            stats.avg_base_health(i),
            stats.faults.get(i).copied().unwrap_or(0)
        );
    }

    output
}
