//! Passive income.
//!
//! Every tick each team receives the flat passive income. Solar farms whose
//! cooldown has run out pay their yield on top and restart their cadence.
//! Each reinforcer of the same team within reinforcer range of a farm adds
//! `reinforcer_bonus_percent` to that farm's yield.

use crate::game::{GameState, Team, Tower, TowerType};

/// Income credited during one economy phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IncomeReport {
    /// Total income per team (Blue, Red).
    pub income: [u64; 2],
    /// Number of solar farms that paid out, per team.
    pub farms_paid: [u32; 2],
}

/// Yield of one solar farm, including reinforcer bonuses.
#[must_use]
pub fn solar_yield(state: &GameState, farm: &Tower) -> u64 {
    let reinforcer = state.catalog.stats(TowerType::Reinforcer);
    let boosters = state
        .towers_of(farm.team)
        .filter(|t| t.kind == TowerType::Reinforcer)
        .filter(|t| reinforcer.in_range(t.coord, farm.coord))
        .count() as u64;

    let percent = boosters
        .saturating_mul(state.rules.reinforcer_bonus_percent)
        .saturating_add(100);
    state.rules.solar_yield.saturating_mul(percent) / 100
}

/// Run the economy phase for both teams, Blue first.
pub fn apply_economy(state: &mut GameState) -> IncomeReport {
    let mut report = IncomeReport::default();
    let cadence = state.catalog.stats(TowerType::SolarFarm).cadence;

    for team in Team::ALL {
        let mut income = state.rules.passive_income;

        let ready: Vec<Tower> = state
            .towers_of(team)
            .filter(|t| t.kind == TowerType::SolarFarm && t.cooldown == 0)
            .copied()
            .collect();
        for farm in &ready {
            income = income.saturating_add(solar_yield(state, farm));
            if let Some(tower) = state.towers.get_mut(&farm.id) {
                tower.cooldown = cadence;
            }
        }

        state.credit(team, income);
        report.income[team.index()] = income;
        report.farms_paid[team.index()] = u32::try_from(ready.len()).unwrap_or(u32::MAX);
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Coord, MapModel, MapSpec, Rules, TowerCatalog, resolve_combat};
    use std::sync::Arc;

    fn create_test_game() -> GameState {
        let spec = MapSpec {
            name: "eco".to_string(),
            width: 8,
            height: 8,
            path: (0..8).map(|x| (x, 0)).collect(),
            blocked: Vec::new(),
        };
        let map = Arc::new(MapModel::from_spec(&spec).unwrap());
        let mut game = GameState::new(map, TowerCatalog::default(), Rules::default());
        game.credit(Team::Blue, 100_000);
        game
    }

    #[test]
    fn test_passive_income_only() {
        let mut game = create_test_game();
        let before = [game.balance(Team::Blue), game.balance(Team::Red)];
        let report = apply_economy(&mut game);
        assert_eq!(report.income, [10, 10]);
        assert_eq!(game.balance(Team::Blue), before[0] + 10);
        assert_eq!(game.balance(Team::Red), before[1] + 10);
    }

    #[test]
    fn test_solar_farm_pays_on_cadence() {
        let mut game = create_test_game();
        game.place_tower(Team::Blue, TowerType::SolarFarm, Coord::new(3, 3))
            .unwrap();

        let mut paid_ticks = Vec::new();
        for tick in 0..25 {
            let report = apply_economy(&mut game);
            if report.farms_paid[0] > 0 {
                paid_ticks.push(tick);
                assert_eq!(report.income[0], 60);
            }
            resolve_combat(&mut game);
        }
        assert_eq!(paid_ticks, vec![10, 20]);
    }

    #[test]
    fn test_reinforcers_amplify_yield() {
        let mut game = create_test_game();
        let farm = game
            .place_tower(Team::Blue, TowerType::SolarFarm, Coord::new(3, 3))
            .unwrap();
        game.place_tower(Team::Blue, TowerType::Reinforcer, Coord::new(3, 4))
            .unwrap();
        game.place_tower(Team::Blue, TowerType::Reinforcer, Coord::new(4, 4))
            .unwrap();
        // Out of range: 3^2 + 3^2 = 18 > 5
        game.place_tower(Team::Blue, TowerType::Reinforcer, Coord::new(6, 6))
            .unwrap();

        let tower = *game.get_tower(farm).unwrap();
        // 50 * (100 + 2 * 20) / 100
        assert_eq!(solar_yield(&game, &tower), 70);
    }

    #[test]
    fn test_enemy_reinforcers_do_not_count() {
        let mut game = create_test_game();
        game.credit(Team::Red, 100_000);
        let farm = game
            .place_tower(Team::Blue, TowerType::SolarFarm, Coord::new(3, 3))
            .unwrap();
        game.place_tower(Team::Red, TowerType::Reinforcer, Coord::new(3, 4))
            .unwrap();

        let tower = *game.get_tower(farm).unwrap();
        assert_eq!(solar_yield(&game, &tower), 50);
    }
}
