use crate::engine::Strategy;
use crate::error::StrategyError;
use crate::game::Controller;

/// Sends the healthiest debris it can afford, every tick.
#[derive(Debug, Clone, Copy)]
pub struct Rusher {
    /// Health sent when affordable.
    pub ideal_health: u64,
    /// Health sent otherwise.
    pub fallback_health: u64,
    /// Ticks between path steps.
    pub lane: u32,
}

impl Default for Rusher {
    fn default() -> Self {
        Self {
            ideal_health: 50,
            fallback_health: 24,
            lane: 1,
        }
    }
}

impl Strategy for Rusher {
    fn name(&self) -> &'static str {
        "rusher"
    }

    fn play_turn(&mut self, rc: &mut Controller<'_>) -> Result<(), StrategyError> {
        for health in [self.ideal_health, self.fallback_health] {
            if rc.can_send_debris(self.lane, health) {
                rc.send_debris(self.lane, health)?;
                break;
            }
        }
        Ok(())
    }
}
