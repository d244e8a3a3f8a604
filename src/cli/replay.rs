//! Replay command implementation.

use super::output::{format_event, format_replay_summary, format_state_text};
use super::{CliError, OutputFormat};
use sentinel::replay::{Event, ReplayLog, reconstruct, state_at};
use sentinel::game::Snapshot;
use serde::Serialize;
use std::path::PathBuf;

/// JSON view of one tick of a replay.
#[derive(Debug, Serialize)]
struct JsonTick<'a> {
    /// State at the start of the tick.
    state: Snapshot,
    /// Actions taken during the tick.
    events: Vec<&'a Event>,
}

/// Execute the replay command.
///
/// Without `--tick`, prints the log's summary. With it, rebuilds the state at
/// the start of that tick and lists the actions taken during it.
///
/// # Errors
///
/// Returns an error if the log cannot be loaded or played back, or if
/// verification finds a mismatch.
pub(crate) fn execute(
    recording_path: PathBuf,
    tick: Option<u32>,
    verify: bool,
    format: OutputFormat,
) -> Result<(), CliError> {
    let log = ReplayLog::load(&recording_path)?;

    match tick {
        Some(tick) => print_tick(&log, tick, format)?,
        None => match format {
            OutputFormat::Text => print!("{}", format_replay_summary(&log)),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&log.result)?),
        },
    }

    if verify {
        verify_result(&log)?;
        if format == OutputFormat::Text {
            println!("\nReplay verified: playback reproduces the recorded result.");
        }
    }

    Ok(())
}

fn print_tick(log: &ReplayLog, tick: u32, format: OutputFormat) -> Result<(), CliError> {
    let state = state_at(log, tick)?;
    let events: Vec<&Event> = log.events_at(tick).collect();
    match format {
        OutputFormat::Text => {
            print!("{}", format_state_text(&state, &log.header.strategies));
            if events.is_empty() {
                println!("\n  (no actions)");
            } else {
                println!("\nActions:");
                for event in events {
                    println!("{}", format_event(event));
                }
            }
        }
        OutputFormat::Json => {
            let view = JsonTick {
                state: state.snapshot(),
                events,
            };
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
    }
    Ok(())
}

/// Replay the whole log and compare against its recorded result.
fn verify_result(log: &ReplayLog) -> Result<(), CliError> {
    let recorded = log
        .result
        .as_ref()
        .ok_or_else(|| CliError::new("replay has no recorded result to verify"))?;
    let outcome = reconstruct(log)?;

    let mismatch =
        |what: &str| CliError::new(format!("replay verification failed: {what} differs"));
    if outcome.winner != recorded.winner {
        return Err(mismatch("winner"));
    }
    if outcome.turns != recorded.turns {
        return Err(mismatch("turn count"));
    }
    if outcome.reason != recorded.reason {
        return Err(mismatch("end reason"));
    }
    let state = &outcome.state;
    let teams = sentinel::Team::ALL;
    if teams.map(|t| state.base_health(t)) != recorded.base_health {
        return Err(mismatch("base health"));
    }
    if teams.map(|t| state.balance(t)) != recorded.balances {
        return Err(mismatch("balance"));
    }
    Ok(())
}
