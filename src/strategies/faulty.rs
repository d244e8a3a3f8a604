use crate::engine::Strategy;
use crate::error::StrategyError;
use crate::game::Controller;

/// How a [`Faulty`] strategy misbehaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultMode {
    /// Return an error.
    Error,
    /// Panic.
    Panic,
    /// Keep querying until the budget runs out.
    Spin,
}

/// Wraps another strategy and misbehaves on chosen ticks.
///
/// Used to exercise fault containment.
pub struct Faulty {
    inner: Box<dyn Strategy>,
    ticks: Vec<u32>,
    mode: FaultMode,
}

impl std::fmt::Debug for Faulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Faulty")
            .field("inner", &self.inner.name())
            .field("ticks", &self.ticks)
            .field("mode", &self.mode)
            .finish()
    }
}

impl Faulty {
    /// Misbehave with `mode` on each of `ticks`, otherwise act like `inner`.
    #[must_use]
    pub fn new(inner: Box<dyn Strategy>, ticks: Vec<u32>, mode: FaultMode) -> Self {
        Self { inner, ticks, mode }
    }
}

impl Strategy for Faulty {
    fn name(&self) -> &'static str {
        "faulty"
    }

    fn play_turn(&mut self, rc: &mut Controller<'_>) -> Result<(), StrategyError> {
        let turn = rc.get_turn();
        // Act first so there is something to roll back
        self.inner.play_turn(rc)?;
        if !self.ticks.contains(&turn) {
            return Ok(());
        }
        match self.mode {
            FaultMode::Error => Err(StrategyError::failed(format!("planned fault on tick {turn}"))),
            FaultMode::Panic => panic!("planned panic on tick {turn}"),
            FaultMode::Spin => {
                while !rc.budget_exhausted() {
                    let _ = rc.get_turn();
                }
                Ok(())
            }
        }
    }
}
