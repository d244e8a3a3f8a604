//! CLI command implementations for Sentinel.

pub(crate) mod replay;
pub(crate) mod run;
pub(crate) mod tournament;

mod output;

use clap::ValueEnum;
use sentinel::MatchConfig;
use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;

/// Output format for the `run` and `replay` commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Output format for the `tournament` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum TournamentFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON output.
    Json,
    /// CSV format.
    Csv,
}

/// CLI error type.
#[derive(Debug)]
pub(crate) struct CliError {
    message: String,
}

impl CliError {
    /// Create a new CLI error.
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for CliError {}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        Self::new(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(format!("JSON error: {e}"))
    }
}

impl From<sentinel::game::MapError> for CliError {
    fn from(e: sentinel::game::MapError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<sentinel::MatchError> for CliError {
    fn from(e: sentinel::MatchError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<sentinel::tournament::MapGenError> for CliError {
    fn from(e: sentinel::tournament::MapGenError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<sentinel::tournament::TournamentError> for CliError {
    fn from(e: sentinel::tournament::TournamentError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<sentinel::replay::ReplayError> for CliError {
    fn from(e: sentinel::replay::ReplayError) -> Self {
        Self::new(e.to_string())
    }
}

/// Load match settings from a JSON file, or use the defaults.
///
/// Missing fields in the file keep their default values.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub(crate) fn load_config(path: Option<&Path>) -> Result<MatchConfig, CliError> {
    let Some(path) = path else {
        return Ok(MatchConfig::default());
    };
    let text = fs::read_to_string(path)
        .map_err(|e| CliError::new(format!("Failed to read {}: {e}", path.display())))?;
    serde_json::from_str(&text)
        .map_err(|e| CliError::new(format!("Invalid config {}: {e}", path.display())))
}

/// The given seed, or one derived from the clock.
pub(crate) fn resolve_seed(seed: Option<u64>) -> u64 {
    seed.unwrap_or_else(|| {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_nanos() & u128::from(u64::MAX)).unwrap_or(42))
            .unwrap_or(42)
    })
}
