use crate::engine::Strategy;
use crate::error::StrategyError;
use crate::game::Controller;

/// Never acts.
#[derive(Debug, Clone, Copy, Default)]
pub struct Idle;

impl Strategy for Idle {
    fn name(&self) -> &'static str {
        "idle"
    }

    fn play_turn(&mut self, _rc: &mut Controller<'_>) -> Result<(), StrategyError> {
        Ok(())
    }
}
