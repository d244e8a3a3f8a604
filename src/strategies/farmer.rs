//! Economy-first strategy.
//!
//! Keeps one gunship for cover, grows a block of solar farms with a
//! reinforcer beside them, and once rich enough cashes everything out into a
//! wave of debris sent one per tick.

use crate::engine::Strategy;
use crate::error::StrategyError;
use crate::game::{Controller, Coord, MapModel, SnipePriority, TowerCatalog, TowerType};
use crate::strategies::{Coverage, fire_all};

/// Survives two gunship hits.
const WAVE_HEALTH: u64 = 51;

/// Farm, then flood.
#[derive(Debug, Clone)]
pub struct Farmer {
    map: MapModel,
    coverage: Coverage,
    /// Solar farms to build before the first wave.
    farm_target: usize,
    /// Debris per wave.
    wave_size: u32,
    /// Debris still to send in the current wave.
    sending: u32,
}

impl Farmer {
    /// Three farms, waves of twelve.
    #[must_use]
    pub fn new(map: MapModel, catalog: &TowerCatalog) -> Self {
        let coverage = Coverage::new(&map, catalog);
        Self {
            map,
            coverage,
            farm_target: 3,
            wave_size: 12,
            sending: 0,
        }
    }

    /// Free buildable tile with the least gunship coverage.
    fn farm_tile(&self, rc: &Controller<'_>) -> Option<Coord> {
        let me = rc.get_ally_team();
        let mut spaces: Vec<Coord> = self.map.spaces().collect();
        spaces.sort_by_key(|c| (self.coverage.score(TowerType::Gunship, *c), c.y, c.x));
        spaces.into_iter().find(|c| rc.is_placeable(me, c.x, c.y))
    }

    /// Free tile within reinforcer range of the most farms.
    fn reinforcer_tile(&self, rc: &Controller<'_>, farms: &[Coord]) -> Option<Coord> {
        let me = rc.get_ally_team();
        let reach = rc.get_tower_stats(TowerType::Reinforcer);
        let mut best: Option<(usize, Coord)> = None;
        for spot in self.map.spaces() {
            if !rc.is_placeable(me, spot.x, spot.y) {
                continue;
            }
            let boosted = farms.iter().filter(|f| reach.in_range(spot, **f)).count();
            if boosted > 0 && best.is_none_or(|(n, _)| boosted > n) {
                best = Some((boosted, spot));
            }
        }
        best.map(|(_, spot)| spot)
    }
}

impl Strategy for Farmer {
    fn name(&self) -> &'static str {
        "farmer"
    }

    fn play_turn(&mut self, rc: &mut Controller<'_>) -> Result<(), StrategyError> {
        let me = rc.get_ally_team();
        let towers = rc.get_towers(me);
        let farms: Vec<Coord> = towers
            .iter()
            .filter(|t| t.kind == TowerType::SolarFarm)
            .map(|t| t.coord)
            .collect();
        let has_gunship = towers.iter().any(|t| t.kind == TowerType::Gunship);
        let has_reinforcer = towers.iter().any(|t| t.kind == TowerType::Reinforcer);

        if self.sending > 0 {
            if rc.can_send_debris(1, WAVE_HEALTH) {
                rc.send_debris(1, WAVE_HEALTH)?;
                self.sending -= 1;
            } else {
                // Out of money mid-wave: start saving again
                self.sending = 0;
            }
        } else if let Some(tile) = (!has_gunship)
            .then(|| self.coverage.best(TowerType::Gunship))
            .flatten()
        {
            if rc.can_build_tower(TowerType::Gunship, tile.x, tile.y) {
                rc.build_tower(TowerType::Gunship, tile.x, tile.y)?;
                self.coverage.claim(tile);
            }
        } else if farms.len() < self.farm_target {
            if let Some(tile) = self.farm_tile(rc)
                && rc.can_build_tower(TowerType::SolarFarm, tile.x, tile.y)
            {
                rc.build_tower(TowerType::SolarFarm, tile.x, tile.y)?;
                self.coverage.claim(tile);
            }
        } else if let Some(tile) = (!has_reinforcer)
            .then(|| self.reinforcer_tile(rc, &farms))
            .flatten()
        {
            if rc.can_build_tower(TowerType::Reinforcer, tile.x, tile.y) {
                rc.build_tower(TowerType::Reinforcer, tile.x, tile.y)?;
                self.coverage.claim(tile);
            }
        } else {
            let wave_cost = rc.get_debris_cost(1, WAVE_HEALTH) * u64::from(self.wave_size);
            if rc.get_balance(me) >= wave_cost {
                self.sending = self.wave_size;
            }
        }

        fire_all(rc, SnipePriority::First)
    }
}
