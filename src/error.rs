//! Error types shared between the controller, strategies and the engine.

use thiserror::Error;

use crate::game::Team;

/// Errors returned by [`Controller`](crate::game::Controller) mutators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    /// A mutator was called while its legality check reports `false`.
    ///
    /// This is a broken contract, not a game situation: the engine
    /// invalidates the match once the strategy call returns.
    #[error("contract violation in {action}: {detail}")]
    ContractViolation {
        /// Name of the offending operation.
        action: &'static str,
        /// What precondition failed.
        detail: String,
    },
    /// The call or wall-clock budget for this decision is spent.
    #[error("decision budget exhausted")]
    BudgetExhausted,
}

/// Failure raised by strategy code during `play_turn`.
///
/// Any error forfeits the team's actions for the tick; the match continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StrategyError {
    /// A controller call failed and the strategy propagated it.
    #[error(transparent)]
    Controller(#[from] ControllerError),
    /// Strategy-specific failure.
    #[error("strategy failed: {0}")]
    Failed(String),
}

impl StrategyError {
    /// Create a strategy-specific failure.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Errors that end a match without a valid result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    /// A strategy invoked a mutator with a false precondition.
    #[error("match invalid: {team} broke the controller contract on tick {tick}: {detail}")]
    ContractViolation {
        /// Offending team.
        team: Team,
        /// Tick on which the violation happened.
        tick: u32,
        /// Description from the controller.
        detail: String,
    },
    /// The match was cancelled before it finished.
    #[error("match cancelled at tick {tick}")]
    Cancelled {
        /// Tick boundary at which cancellation happened.
        tick: u32,
    },
    /// The engine is not in a state that allows this operation.
    #[error("engine is already finished")]
    AlreadyFinished,
}
