//! Calibratable match rules.
//!
//! None of these numbers are sacred: they are tuned against reference matches
//! and can be overridden per match through the JSON config.

use serde::{Deserialize, Serialize};

/// Economy, base and debris pricing rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rules {
    /// Balance each team starts with.
    pub starting_balance: u64,
    /// Income credited to each team every tick.
    pub passive_income: u64,
    /// Income a solar farm produces each time its cadence elapses.
    pub solar_yield: u64,
    /// Extra solar yield, in percent, per reinforcer in range of the farm.
    pub reinforcer_bonus_percent: u64,
    /// Health each base starts with.
    pub base_health: u64,
    /// Percent of a debris' remaining health dealt to the base on arrival.
    pub arrival_damage_percent: u64,
    /// Percent of the build cost refunded when a tower is sold.
    pub refund_percent: u64,
    /// Smallest health a debris may be sent with.
    pub min_debris_health: u64,
    /// Slowest allowed debris lane (ticks between path steps).
    pub max_debris_lane: u32,
    /// Cost per point of debris health.
    pub debris_cost_per_health: u64,
    /// Speed premium: `health * premium / lane` is added on top, rounded up.
    pub debris_speed_premium: u64,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            starting_balance: 1500,
            passive_income: 10,
            solar_yield: 50,
            reinforcer_bonus_percent: 20,
            base_health: 2500,
            arrival_damage_percent: 100,
            refund_percent: 80,
            min_debris_health: 1,
            max_debris_lane: 20,
            debris_cost_per_health: 1,
            debris_speed_premium: 2,
        }
    }
}

impl Rules {
    /// Price of sending one debris.
    ///
    /// Strictly increasing in `health` and non-increasing in `lane`: a
    /// sturdier debris always costs more, a slower one never costs more.
    /// `lane` must be at least 1.
    #[must_use]
    pub const fn debris_cost(&self, lane: u32, health: u64) -> u64 {
        let lane = if lane == 0 { 1 } else { lane as u64 };
        let base = health.saturating_mul(self.debris_cost_per_health);
        let premium = health.saturating_mul(self.debris_speed_premium).div_ceil(lane);
        base.saturating_add(premium)
    }

    /// Refund for selling a tower that cost `cost`.
    #[must_use]
    pub const fn refund(&self, cost: u64) -> u64 {
        cost.saturating_mul(self.refund_percent) / 100
    }

    /// Base damage dealt by a debris arriving with `health` left.
    #[must_use]
    pub const fn arrival_damage(&self, health: u64) -> u64 {
        health.saturating_mul(self.arrival_damage_percent) / 100
    }

    /// Whether `lane` is an allowed debris lane.
    #[must_use]
    pub const fn lane_allowed(&self, lane: u32) -> bool {
        lane >= 1 && lane <= self.max_debris_lane
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debris_cost_monotonic_in_health() {
        let rules = Rules::default();
        for lane in 1..=rules.max_debris_lane {
            let mut last = 0;
            for health in 1..200 {
                let cost = rules.debris_cost(lane, health);
                assert!(cost > last, "lane {lane} health {health}");
                last = cost;
            }
        }
    }

    #[test]
    fn test_debris_cost_faster_is_pricier() {
        let rules = Rules::default();
        assert!(rules.debris_cost(1, 51) >= rules.debris_cost(2, 51));
        assert!(rules.debris_cost(2, 51) >= rules.debris_cost(20, 51));
        // 51 + 51 * 2 / 1
        assert_eq!(rules.debris_cost(1, 51), 153);
        // 51 + ceil(102 / 4)
        assert_eq!(rules.debris_cost(4, 51), 77);
    }

    #[test]
    fn test_refund_is_eighty_percent() {
        let rules = Rules::default();
        assert_eq!(rules.refund(1000), 800);
        assert_eq!(rules.refund(1750), 1400);
    }

    #[test]
    fn test_lane_bounds() {
        let rules = Rules::default();
        assert!(!rules.lane_allowed(0));
        assert!(rules.lane_allowed(1));
        assert!(rules.lane_allowed(20));
        assert!(!rules.lane_allowed(21));
    }
}
