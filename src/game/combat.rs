//! Combat and movement resolution.
//!
//! Towers only queue damage while strategies are deciding. Queued damage lands
//! in [`resolve_combat`], which also moves debris and settles arrivals, so the
//! order in which Blue and Red act never changes what a debris survives.

use crate::game::{Debris, DebrisId, GameState, SnipePriority, Team, Tower, TowerId, TowerType};

/// Why a debris left the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalCause {
    /// Health reached zero. The sender's investment is lost.
    Destroyed,
    /// Reached the end of the path and hit the base.
    Arrived {
        /// Damage dealt to the target base.
        base_damage: u64,
    },
}

/// A debris removed during combat resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Removal {
    /// Final state of the debris.
    pub debris: Debris,
    /// Why it was removed.
    pub cause: RemovalCause,
}

/// Everything that happened during one combat resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CombatReport {
    /// Debris removed this tick, in id order (destroyed first, then arrivals).
    pub removals: Vec<Removal>,
    /// Base damage taken per team (Blue, Red).
    pub base_damage: [u64; 2],
}

impl CombatReport {
    /// Number of debris destroyed by towers.
    #[must_use]
    pub fn destroyed(&self) -> usize {
        self.removals
            .iter()
            .filter(|r| r.cause == RemovalCause::Destroyed)
            .count()
    }

    /// Number of debris that reached a base.
    #[must_use]
    pub fn arrived(&self) -> usize {
        self.removals.len() - self.destroyed()
    }
}

/// Health a debris will have once its queued damage lands.
#[inline]
const fn effective_health(debris: &Debris) -> u64 {
    debris.health.saturating_sub(debris.pending_damage)
}

/// Debris on `tower`'s board within range, skipping those already doomed.
fn targets_in_range<'a>(
    state: &'a GameState,
    tower: &'a Tower,
    include_doomed: bool,
) -> impl Iterator<Item = &'a Debris> + 'a {
    let tower_stats = state.catalog.stats(tower.kind);
    state
        .debris
        .values()
        .filter(move |d| d.target() == tower.team)
        .filter(move |d| include_doomed || effective_health(d) > 0)
        .filter(move |d| {
            state
                .map
                .path_tile(d.progress)
                .is_some_and(|pos| tower_stats.in_range(tower.coord, pos))
        })
}

/// Pick a gunship target according to `priority`.
///
/// Only enemy debris in range whose queued damage does not already kill them
/// are considered. Ties go to the lowest debris id.
#[must_use]
pub fn select_target(
    state: &GameState,
    tower: &Tower,
    priority: SnipePriority,
) -> Option<DebrisId> {
    let position = |d: &Debris| state.map.path_tile(d.progress).unwrap_or(tower.coord);

    // Candidates arrive in id order, so replacing only on a strictly better
    // key keeps the lowest id among equals.
    let mut best: Option<(&Debris, i128)> = None;
    for debris in targets_in_range(state, tower, false) {
        let key: i128 = match priority {
            SnipePriority::First => i128::from(debris.progress),
            SnipePriority::Last => -i128::from(debris.progress),
            SnipePriority::Strong => i128::from(effective_health(debris)),
            SnipePriority::Weak => -i128::from(effective_health(debris)),
            SnipePriority::Close => -i128::from(tower.coord.distance_sq(position(debris))),
        };
        if best.is_none_or(|(_, best_key)| key > best_key) {
            best = Some((debris, key));
        }
    }
    best.map(|(d, _)| d.id)
}

/// Fire a ready gunship at the target chosen by `priority`.
///
/// Returns the debris hit, or `None` if the tower is not a ready gunship or
/// nothing is in range. The cooldown only resets when a shot is fired.
pub fn snipe(
    state: &mut GameState,
    tower_id: TowerId,
    priority: SnipePriority,
) -> Option<DebrisId> {
    let tower = *state.towers.get(&tower_id)?;
    if tower.kind != TowerType::Gunship || tower.cooldown > 0 {
        return None;
    }
    let target = select_target(state, &tower, priority)?;
    let tower_stats = state.catalog.stats(tower.kind);

    if let Some(debris) = state.debris.get_mut(&target) {
        debris.pending_damage = debris.pending_damage.saturating_add(tower_stats.damage);
    }
    if let Some(tower) = state.towers.get_mut(&tower_id) {
        tower.cooldown = tower_stats.cadence;
    }
    Some(target)
}

/// Fire a ready bomber at every enemy debris in range.
///
/// Returns the debris hit in id order. A bomber with nothing in range does
/// not fire and keeps its cooldown.
pub fn bomb(state: &mut GameState, tower_id: TowerId) -> Vec<DebrisId> {
    let Some(tower) = state.towers.get(&tower_id).copied() else {
        return Vec::new();
    };
    if tower.kind != TowerType::Bomber || tower.cooldown > 0 {
        return Vec::new();
    }
    let hits: Vec<DebrisId> = targets_in_range(state, &tower, true).map(|d| d.id).collect();
    if hits.is_empty() {
        return hits;
    }

    let tower_stats = state.catalog.stats(tower.kind);
    for id in &hits {
        if let Some(debris) = state.debris.get_mut(id) {
            debris.pending_damage = debris.pending_damage.saturating_add(tower_stats.damage);
        }
    }
    if let Some(tower) = state.towers.get_mut(&tower_id) {
        tower.cooldown = tower_stats.cadence;
    }
    hits
}

/// Resolve queued damage, movement and arrivals, then tick tower cooldowns.
///
/// 1. Queued damage lands; debris at zero health are removed.
/// 2. Survivors count down their move cooldown and step along the path.
/// 3. Debris stepping past the last tile are removed and hit the base.
/// 4. Every tower's cooldown drops by one.
pub fn resolve_combat(state: &mut GameState) -> CombatReport {
    let mut report = CombatReport::default();

    // Phase 1: damage
    let mut destroyed = Vec::new();
    for debris in state.debris.values_mut() {
        if debris.pending_damage > 0 {
            let dealt = debris.pending_damage.min(debris.health);
            debris.health -= dealt;
            debris.damage_taken += dealt;
            debris.pending_damage = 0;
        }
        if debris.health == 0 {
            destroyed.push(debris.id);
        }
    }
    for id in destroyed {
        if let Some(debris) = state.debris.remove(&id) {
            report.removals.push(Removal {
                debris,
                cause: RemovalCause::Destroyed,
            });
        }
    }

    // Phase 2: movement
    let path_length = state.map.path_length();
    let mut arrived = Vec::new();
    for debris in state.debris.values_mut() {
        debris.move_cooldown = debris.move_cooldown.saturating_sub(1);
        if debris.move_cooldown == 0 {
            debris.progress += 1;
            debris.move_cooldown = debris.lane;
        }
        if debris.progress >= path_length {
            arrived.push(debris.id);
        }
    }

    // Phase 3: arrivals
    for id in arrived {
        if let Some(debris) = state.debris.remove(&id) {
            let base_damage = state.rules.arrival_damage(debris.health);
            let target: Team = debris.target();
            state.damage_base(target, base_damage);
            report.base_damage[target.index()] += base_damage;
            report.removals.push(Removal {
                debris,
                cause: RemovalCause::Arrived { base_damage },
            });
        }
    }

    // Phase 4: cooldowns
    for tower in state.towers.values_mut() {
        tower.cooldown = tower.cooldown.saturating_sub(1);
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Coord, MapModel, MapSpec, Rules, TowerCatalog};
    use std::sync::Arc;

    /// 10-tile straight path along y = 1 with open rows above and below.
    fn create_test_game() -> GameState {
        let spec = MapSpec {
            name: "lane".to_string(),
            width: 10,
            height: 3,
            path: (0..10).map(|x| (x, 1)).collect(),
            blocked: Vec::new(),
        };
        let map = Arc::new(MapModel::from_spec(&spec).unwrap());
        let mut game = GameState::new(map, TowerCatalog::default(), Rules::default());
        game.credit(Team::Blue, 100_000);
        game.credit(Team::Red, 100_000);
        game
    }

    /// Place a tower and clear its cooldown so it can fire immediately.
    fn ready_tower(game: &mut GameState, team: Team, kind: TowerType, coord: Coord) -> TowerId {
        let id = game.place_tower(team, kind, coord).unwrap();
        game.towers.get_mut(&id).unwrap().cooldown = 0;
        id
    }

    fn set_progress(game: &mut GameState, id: DebrisId, progress: u32) {
        game.debris.get_mut(&id).unwrap().progress = progress;
    }

    #[test]
    fn test_snipe_first_prefers_progress() {
        let mut game = create_test_game();
        let gun = ready_tower(&mut game, Team::Red, TowerType::Gunship, Coord::new(4, 0));
        let behind = game.spawn_debris(Team::Blue, 1, 10).unwrap();
        let ahead = game.spawn_debris(Team::Blue, 1, 10).unwrap();
        set_progress(&mut game, behind, 2);
        set_progress(&mut game, ahead, 5);

        assert_eq!(snipe(&mut game, gun, SnipePriority::First), Some(ahead));
        assert_eq!(game.get_debris(ahead).unwrap().pending_damage, 25);
        assert_eq!(game.get_tower(gun).unwrap().cooldown, 20);
    }

    #[test]
    fn test_snipe_strong_prefers_health() {
        let mut game = create_test_game();
        let gun = ready_tower(&mut game, Team::Red, TowerType::Gunship, Coord::new(4, 0));
        let weak = game.spawn_debris(Team::Blue, 1, 10).unwrap();
        let strong = game.spawn_debris(Team::Blue, 1, 40).unwrap();
        set_progress(&mut game, weak, 6);
        set_progress(&mut game, strong, 3);

        assert_eq!(snipe(&mut game, gun, SnipePriority::Strong), Some(strong));
    }

    #[test]
    fn test_snipe_tie_breaks_on_lowest_id() {
        let mut game = create_test_game();
        let tower_coord = Coord::new(4, 0);
        let gun = ready_tower(&mut game, Team::Red, TowerType::Gunship, tower_coord);
        let a = game.spawn_debris(Team::Blue, 1, 30).unwrap();
        let b = game.spawn_debris(Team::Blue, 1, 30).unwrap();
        set_progress(&mut game, a, 4);
        set_progress(&mut game, b, 4);

        let tower = *game.get_tower(gun).unwrap();
        for priority in [
            SnipePriority::First,
            SnipePriority::Last,
            SnipePriority::Strong,
            SnipePriority::Weak,
            SnipePriority::Close,
        ] {
            assert_eq!(select_target(&game, &tower, priority), Some(a), "{priority}");
        }
    }

    #[test]
    fn test_snipe_ignores_own_and_out_of_range_debris() {
        let mut game = create_test_game();
        let gun = ready_tower(&mut game, Team::Red, TowerType::Gunship, Coord::new(0, 0));
        // Red's own debris travels on Blue's board
        game.spawn_debris(Team::Red, 1, 10).unwrap();
        // Blue debris far down the path: (9,1) is 82 away squared
        let far = game.spawn_debris(Team::Blue, 1, 10).unwrap();
        set_progress(&mut game, far, 9);

        assert_eq!(snipe(&mut game, gun, SnipePriority::First), None);
        // Did not fire, so cooldown stays ready
        assert_eq!(game.get_tower(gun).unwrap().cooldown, 0);
    }

    #[test]
    fn test_snipe_skips_doomed_debris() {
        let mut game = create_test_game();
        let gun_a = ready_tower(&mut game, Team::Red, TowerType::Gunship, Coord::new(4, 0));
        let gun_b = ready_tower(&mut game, Team::Red, TowerType::Gunship, Coord::new(5, 0));
        let first = game.spawn_debris(Team::Blue, 1, 20).unwrap();
        let second = game.spawn_debris(Team::Blue, 1, 20).unwrap();
        set_progress(&mut game, first, 5);
        set_progress(&mut game, second, 4);

        assert_eq!(snipe(&mut game, gun_a, SnipePriority::First), Some(first));
        assert_eq!(snipe(&mut game, gun_b, SnipePriority::First), Some(second));
    }

    #[test]
    fn test_snipe_on_cooldown_is_noop() {
        let mut game = create_test_game();
        let gun = game
            .place_tower(Team::Red, TowerType::Gunship, Coord::new(4, 0))
            .unwrap();
        game.spawn_debris(Team::Blue, 1, 10).unwrap();
        assert_eq!(snipe(&mut game, gun, SnipePriority::First), None);
        assert_eq!(game.get_tower(gun).unwrap().cooldown, 20);
    }

    #[test]
    fn test_bomb_hits_everything_in_range() {
        let mut game = create_test_game();
        let bomber = ready_tower(&mut game, Team::Blue, TowerType::Bomber, Coord::new(4, 0));
        let near = game.spawn_debris(Team::Red, 1, 30).unwrap();
        let also_near = game.spawn_debris(Team::Red, 1, 30).unwrap();
        let far = game.spawn_debris(Team::Red, 1, 30).unwrap();
        set_progress(&mut game, near, 3);
        set_progress(&mut game, also_near, 6);
        set_progress(&mut game, far, 9);

        let hits = bomb(&mut game, bomber);
        assert_eq!(hits, vec![near, also_near]);
        assert_eq!(game.get_debris(near).unwrap().pending_damage, 6);
        assert_eq!(game.get_debris(far).unwrap().pending_damage, 0);
        assert_eq!(game.get_tower(bomber).unwrap().cooldown, 15);
    }

    #[test]
    fn test_resolve_applies_damage_and_removes_dead() {
        let mut game = create_test_game();
        let id = game.spawn_debris(Team::Blue, 1, 20).unwrap();
        game.debris.get_mut(&id).unwrap().pending_damage = 25;

        let report = resolve_combat(&mut game);
        assert_eq!(report.destroyed(), 1);
        assert_eq!(report.removals[0].debris.damage_taken, 20);
        assert!(game.get_debris(id).is_none());
        assert_eq!(game.base_health(Team::Red), 2500);
    }

    #[test]
    fn test_resolve_moves_by_lane() {
        let mut game = create_test_game();
        let fast = game.spawn_debris(Team::Blue, 1, 5).unwrap();
        let slow = game.spawn_debris(Team::Blue, 3, 5).unwrap();

        for _ in 0..3 {
            resolve_combat(&mut game);
        }
        assert_eq!(game.get_debris(fast).unwrap().progress, 3);
        assert_eq!(game.get_debris(slow).unwrap().progress, 1);
    }

    #[test]
    fn test_arrival_damages_opposing_base() {
        let mut game = create_test_game();
        let id = game.spawn_debris(Team::Blue, 1, 40).unwrap();
        set_progress(&mut game, id, 9);

        let report = resolve_combat(&mut game);
        assert_eq!(report.arrived(), 1);
        assert_eq!(report.base_damage, [0, 40]);
        assert_eq!(game.base_health(Team::Red), 2460);
        assert_eq!(game.base_health(Team::Blue), 2500);
        assert!(game.get_debris(id).is_none());
    }

    #[test]
    fn test_cooldowns_tick_down() {
        let mut game = create_test_game();
        let gun = game
            .place_tower(Team::Blue, TowerType::Gunship, Coord::new(0, 0))
            .unwrap();
        resolve_combat(&mut game);
        assert_eq!(game.get_tower(gun).unwrap().cooldown, 19);
    }
}
