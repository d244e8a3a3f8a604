//! Match replay logs.
//!
//! A [`ReplayRecorder`] watches a running match and keeps:
//! - a header with everything constant for the match (map, catalog, rules)
//! - one [`Event`] per successful controller mutation, tagged with tick and team
//! - one [`Event`] per forfeited decision (`Action::Fault`)
//! - full snapshots at tick 0 and every `snapshot_interval` ticks
//!
//! The log is observational: the engine never reads it back, and a recorder
//! that runs out of room only warns and stops appending events.
//!
//! # Time Travel
//!
//! Matches are deterministic, so [`playback`] rebuilds any tick by loading the
//! latest snapshot at or before it and re-applying recorded actions through
//! the same state operations and tick phases the engine uses.

mod playback;

pub use playback::{Playback, PlaybackOutcome, reconstruct, state_at};

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::engine::{MatchConfig, MatchResult};
use crate::game::{
    DebrisId, GameState, MapError, MapSpec, Rules, SnipePriority, Snapshot, Team, TowerCatalog,
    TowerId, TowerType,
};

/// Replay file format version.
pub const REPLAY_VERSION: u32 = 1;

/// One successful mutation, or a forfeited decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    /// A tower was built.
    Build {
        /// Id handed out.
        tower: TowerId,
        /// Tower kind.
        #[serde(rename = "type")]
        kind: TowerType,
        /// Column.
        x: i32,
        /// Row.
        y: i32,
    },
    /// A tower was sold.
    Sell {
        /// Tower removed.
        tower: TowerId,
        /// Amount credited back.
        refund: u64,
    },
    /// A debris was sent.
    Send {
        /// Id handed out.
        debris: DebrisId,
        /// Ticks between path steps.
        lane: u32,
        /// Starting health.
        health: u64,
    },
    /// A gunship fired.
    Snipe {
        /// Gunship.
        tower: TowerId,
        /// Targeting policy used.
        priority: SnipePriority,
        /// Debris hit.
        target: DebrisId,
    },
    /// A bomber fired.
    Bomb {
        /// Bomber.
        tower: TowerId,
        /// Debris hit, in id order.
        hits: Vec<DebrisId>,
    },
    /// The team's decision was forfeited and its actions discarded.
    Fault {
        /// What went wrong.
        reason: String,
    },
}

/// A recorded action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Tick during which the action happened.
    pub tick: u32,
    /// Acting team.
    pub team: Team,
    /// What happened.
    pub action: Action,
}

/// Everything constant for a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayHeader {
    /// Replay format version.
    pub version: u32,
    /// Map the match was played on.
    pub map: MapSpec,
    /// Tower stats in effect.
    pub catalog: TowerCatalog,
    /// Rules in effect.
    pub rules: Rules,
    /// Turn limit in effect.
    pub turn_limit: u32,
    /// Ticks between snapshots (0 = only tick 0).
    pub snapshot_interval: u32,
    /// Strategy names, Blue then Red.
    pub strategies: [String; 2],
}

impl ReplayHeader {
    /// Build a header for a match about to start.
    #[must_use]
    pub fn new(state: &GameState, config: &MatchConfig, strategies: [String; 2]) -> Self {
        Self {
            version: REPLAY_VERSION,
            map: state.map().to_spec(),
            catalog: *state.catalog(),
            rules: *state.rules(),
            turn_limit: config.turn_limit,
            snapshot_interval: config.snapshot_interval,
            strategies,
        }
    }
}

/// Ordered record of one match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayLog {
    /// Match constants.
    pub header: ReplayHeader,
    /// Actions in the order they happened.
    pub events: Vec<Event>,
    /// Snapshots taken at tick boundaries, in tick order.
    pub snapshots: Vec<Snapshot>,
    /// Ticks fully played.
    pub ticks: u32,
    /// Final result; `None` if the match was cancelled or invalidated.
    pub result: Option<MatchResult>,
    /// Whether events were dropped after hitting the recorder's cap.
    pub truncated: bool,
}

/// Errors from saving, loading or replaying a log.
#[derive(Debug, Error)]
pub enum ReplayError {
    /// Filesystem failure.
    #[error("replay file {path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// Malformed JSON.
    #[error("malformed replay: {0}")]
    Json(#[from] serde_json::Error),
    /// The header's map does not validate.
    #[error("replay map is invalid: {0}")]
    Map(#[from] MapError),
    /// Events were dropped while recording.
    #[error("replay is truncated and cannot be played back")]
    Truncated,
    /// Unknown format version.
    #[error("unsupported replay version {0}")]
    Version(u32),
    /// No snapshot at or before the requested tick.
    #[error("no snapshot at or before tick {0}")]
    NoSnapshot(u32),
    /// Requested tick was never played.
    #[error("tick {requested} is past the end of the replay ({ticks} ticks)")]
    TickOutOfRange {
        /// Requested tick.
        requested: u32,
        /// Ticks in the log.
        ticks: u32,
    },
    /// The log ended before the match did.
    #[error("replay has no result (match cancelled or invalid)")]
    Unfinished,
    /// Re-applying an event did not reproduce the recording.
    #[error("replay diverged on tick {tick}: {detail}")]
    Divergence {
        /// Tick being replayed.
        tick: u32,
        /// What differed.
        detail: String,
    },
}

impl ReplayLog {
    /// Write the log as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), ReplayError> {
        let file = File::create(path).map_err(|source| ReplayError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    /// Read a log written by [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not a replay, or has
    /// an unknown version.
    pub fn load(path: &Path) -> Result<Self, ReplayError> {
        let file = File::open(path).map_err(|source| ReplayError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let log: Self = serde_json::from_reader(BufReader::new(file))?;
        if log.header.version != REPLAY_VERSION {
            return Err(ReplayError::Version(log.header.version));
        }
        Ok(log)
    }

    /// Events of one tick, in recorded order.
    pub fn events_at(&self, tick: u32) -> impl Iterator<Item = &Event> {
        let start = self.events.partition_point(|e| e.tick < tick);
        self.events[start..].iter().take_while(move |e| e.tick == tick)
    }

    /// Number of forfeited decisions per team (Blue, Red).
    #[must_use]
    pub fn faults(&self) -> [u32; 2] {
        let mut faults = [0; 2];
        for event in &self.events {
            if matches!(event.action, Action::Fault { .. }) {
                faults[event.team.index()] += 1;
            }
        }
        faults
    }
}

/// Collects a [`ReplayLog`] while a match runs.
#[derive(Debug)]
pub struct ReplayRecorder {
    log: ReplayLog,
    max_events: usize,
}

impl ReplayRecorder {
    /// Start recording; snapshots the opening state as tick 0.
    #[must_use]
    pub fn new(header: ReplayHeader, initial: &GameState, max_events: usize) -> Self {
        Self {
            log: ReplayLog {
                header,
                events: Vec::new(),
                snapshots: vec![initial.snapshot()],
                ticks: 0,
                result: None,
                truncated: false,
            },
            max_events,
        }
    }

    /// Append one event, dropping it once the cap is reached.
    pub fn record(&mut self, tick: u32, team: Team, action: Action) {
        if self.log.events.len() >= self.max_events {
            if !self.log.truncated {
                warn!(
                    tick,
                    max_events = self.max_events,
                    "replay event cap reached; further events are dropped"
                );
                self.log.truncated = true;
            }
            return;
        }
        self.log.events.push(Event { tick, team, action });
    }

    /// Append a team's committed actions for a tick.
    pub fn record_all(&mut self, tick: u32, team: Team, actions: Vec<Action>) {
        for action in actions {
            self.record(tick, team, action);
        }
    }

    /// Close a tick; snapshots `state` when the interval says so.
    pub fn end_tick(&mut self, state: &GameState) {
        self.log.ticks = state.turn();
        let interval = self.log.header.snapshot_interval;
        if interval > 0 && state.turn().is_multiple_of(interval) {
            debug!(tick = state.turn(), "replay snapshot");
            self.log.snapshots.push(state.snapshot());
        }
    }

    /// Store the final result.
    pub fn finish(&mut self, result: MatchResult) {
        self.log.result = Some(result);
    }

    /// The log so far.
    #[must_use]
    pub const fn log(&self) -> &ReplayLog {
        &self.log
    }

    /// Take the log.
    #[must_use]
    pub fn into_log(self) -> ReplayLog {
        self.log
    }
}
