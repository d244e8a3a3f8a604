use crate::engine::Strategy;
use crate::error::StrategyError;
use crate::game::{Controller, MapModel, SnipePriority, TowerCatalog, TowerType};
use crate::strategies::{Coverage, fire_all};

/// Builds gunships and bombers on the tiles covering the most path, in a
/// fixed ratio, and fires everything every tick.
#[derive(Debug, Clone)]
pub struct Defender {
    coverage: Coverage,
    gun_rate: usize,
    bomb_rate: usize,
    priority: SnipePriority,
}

impl Defender {
    /// Two gunships per two bombers, sniping the strongest debris.
    #[must_use]
    pub fn new(map: &MapModel, catalog: &TowerCatalog) -> Self {
        Self::with_ratio(map, catalog, 2, 2, SnipePriority::Strong)
    }

    /// Custom build ratio and snipe priority.
    #[must_use]
    pub fn with_ratio(
        map: &MapModel,
        catalog: &TowerCatalog,
        gun_rate: usize,
        bomb_rate: usize,
        priority: SnipePriority,
    ) -> Self {
        Self {
            coverage: Coverage::new(map, catalog),
            gun_rate,
            bomb_rate: bomb_rate.max(usize::from(gun_rate == 0)),
            priority,
        }
    }

    /// Which combat tower comes next in the rotation.
    fn next_kind(&self, built: usize) -> TowerType {
        if built % (self.gun_rate + self.bomb_rate) < self.gun_rate {
            TowerType::Gunship
        } else {
            TowerType::Bomber
        }
    }
}

impl Strategy for Defender {
    fn name(&self) -> &'static str {
        "defender"
    }

    fn play_turn(&mut self, rc: &mut Controller<'_>) -> Result<(), StrategyError> {
        let me = rc.get_ally_team();
        let built = rc
            .get_towers(me)
            .iter()
            .filter(|t| t.kind.is_combat())
            .count();
        let kind = self.next_kind(built);

        if rc.get_balance(me) >= rc.get_tower_stats(kind).cost
            && let Some(tile) = self.coverage.best(kind)
        {
            if rc.can_build_tower(kind, tile.x, tile.y) {
                rc.build_tower(kind, tile.x, tile.y)?;
            }
            self.coverage.claim(tile);
        }

        fire_all(rc, self.priority)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::MapSpec;

    #[test]
    fn test_rotation() {
        let spec = MapSpec {
            name: "rot".to_string(),
            width: 4,
            height: 3,
            path: (0..4).map(|x| (x, 1)).collect(),
            blocked: Vec::new(),
        };
        let map = MapModel::from_spec(&spec).unwrap();
        let defender = Defender::new(&map, &TowerCatalog::default());
        let kinds: Vec<TowerType> = (0..5).map(|n| defender.next_kind(n)).collect();
        assert_eq!(
            kinds,
            vec![
                TowerType::Gunship,
                TowerType::Gunship,
                TowerType::Bomber,
                TowerType::Bomber,
                TowerType::Gunship
            ]
        );
    }
}
