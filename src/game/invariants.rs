//! Game invariants - sanity checks that detect bugs.
//!
//! These should NEVER trigger: the controller and the state mutators refuse
//! anything that would break them. If one fires, the engine has a bug.

use std::collections::BTreeSet;

use crate::game::{GameState, TileKind};

/// Invariant violation error.
#[derive(Debug, Clone)]
pub struct InvariantViolation {
    /// Description of the violated invariant.
    pub message: String,
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invariant violation: {}", self.message)
    }
}

impl std::error::Error for InvariantViolation {}

fn violation(message: String) -> InvariantViolation {
    InvariantViolation { message }
}

/// Check all invariants of a state at a tick boundary.
///
/// Returns a list of violations found, or empty if all invariants hold.
#[must_use]
pub fn check_invariants(state: &GameState) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    // Bases never heal past their starting health
    for (i, health) in state.base_health.iter().enumerate() {
        if *health > state.rules.base_health {
            violations.push(violation(format!(
                "Team {i} base health {health} exceeds starting health {}",
                state.rules.base_health
            )));
        }
    }

    // One tower per tile per board, only on buildable space
    let mut seen = BTreeSet::new();
    for tower in state.towers.values() {
        if !seen.insert((tower.team, tower.coord)) {
            violations.push(violation(format!(
                "Two {} towers share tile {}",
                tower.team, tower.coord
            )));
        }
        if state.map.tile(tower.coord) != Some(TileKind::Space) {
            violations.push(violation(format!(
                "Tower {} stands on non-buildable tile {}",
                tower.id, tower.coord
            )));
        }
        if state.occupancy.get(&(tower.team, tower.coord)) != Some(&tower.id) {
            violations.push(violation(format!(
                "Occupancy index is missing tower {}",
                tower.id
            )));
        }
        if tower.id.0 >= state.next_tower_id {
            violations.push(violation(format!(
                "Tower {} not below next id {}",
                tower.id, state.next_tower_id
            )));
        }
    }
    if state.occupancy.len() != state.towers.len() {
        violations.push(violation(format!(
            "Occupancy index has {} entries for {} towers",
            state.occupancy.len(),
            state.towers.len()
        )));
    }

    // Live debris are on the path, alive, and fully accounted for
    let path_length = state.map.path_length();
    for debris in state.debris.values() {
        if debris.progress >= path_length {
            violations.push(violation(format!(
                "Debris {} at progress {} is past the path end {}",
                debris.id, debris.progress, path_length
            )));
        }
        if debris.health == 0 {
            violations.push(violation(format!("Dead debris {} still live", debris.id)));
        }
        if debris.pending_damage != 0 {
            violations.push(violation(format!(
                "Debris {} carries {} unresolved damage",
                debris.id, debris.pending_damage
            )));
        }
        if debris.health + debris.damage_taken != debris.max_health {
            violations.push(violation(format!(
                "Debris {} health {} + damage {} != max {}",
                debris.id, debris.health, debris.damage_taken, debris.max_health
            )));
        }
        if debris.id.0 >= state.next_debris_id {
            violations.push(violation(format!(
                "Debris {} not below next id {}",
                debris.id, state.next_debris_id
            )));
        }
    }

    violations
}

/// Check invariants that relate two consecutive tick boundaries.
///
/// Debris never move backwards and id counters never go down.
#[must_use]
pub fn check_transition(before: &GameState, after: &GameState) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    for debris in after.debris.values() {
        if let Some(prev) = before.debris.get(&debris.id)
            && debris.progress < prev.progress
        {
            violations.push(violation(format!(
                "Debris {} moved back from {} to {}",
                debris.id, prev.progress, debris.progress
            )));
        }
    }
    if after.next_tower_id < before.next_tower_id || after.next_debris_id < before.next_debris_id {
        violations.push(violation("Id counters went backwards".to_string()));
    }
    if after.turn != before.turn + 1 {
        violations.push(violation(format!(
            "Turn went from {} to {}",
            before.turn, after.turn
        )));
    }

    violations
}

/// Assert all game invariants hold, panicking if any are violated.
///
/// Only active in debug builds. No-op in release builds.
///
/// # Panics
///
/// Panics with detailed message if any invariant is violated.
#[cfg(debug_assertions)]
pub fn assert_invariants(state: &GameState) {
    let violations = check_invariants(state);
    if !violations.is_empty() {
        let messages: Vec<_> = violations.iter().map(|v| v.message.as_str()).collect();
        panic!("Game invariant violations:\n  - {}", messages.join("\n  - "));
    }
}

/// No-op in release builds.
#[cfg(not(debug_assertions))]
pub fn assert_invariants(_state: &GameState) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{
        Coord, MapModel, MapSpec, Rules, Team, TowerCatalog, TowerType, resolve_combat,
    };
    use std::sync::Arc;

    fn create_valid_game() -> GameState {
        let spec = MapSpec {
            name: "inv".to_string(),
            width: 6,
            height: 3,
            path: (0..6).map(|x| (x, 1)).collect(),
            blocked: Vec::new(),
        };
        let map = Arc::new(MapModel::from_spec(&spec).unwrap());
        let mut game = GameState::new(map, TowerCatalog::default(), Rules::default());
        game.place_tower(Team::Blue, TowerType::Gunship, Coord::new(2, 0))
            .unwrap();
        game.spawn_debris(Team::Red, 1, 10).unwrap();
        game
    }

    #[test]
    fn test_valid_game_passes() {
        let game = create_valid_game();
        let violations = check_invariants(&game);
        assert!(violations.is_empty(), "{violations:?}");
    }

    #[test]
    fn test_saturated_balance_is_valid() {
        let mut game = create_valid_game();
        game.credit(Team::Red, u64::MAX);
        assert_eq!(game.balance(Team::Red), u64::MAX);
        assert!(check_invariants(&game).is_empty());
    }

    #[test]
    fn test_tower_on_path_detected() {
        let mut game = create_valid_game();
        let tower = game.towers.values_mut().next().unwrap();
        let old = tower.coord;
        tower.coord = Coord::new(2, 1);
        let id = tower.id;
        game.occupancy.remove(&(Team::Blue, old));
        game.occupancy.insert((Team::Blue, Coord::new(2, 1)), id);

        let violations = check_invariants(&game);
        assert!(!violations.is_empty());
        assert!(violations[0].message.contains("non-buildable"));
    }

    #[test]
    fn test_debris_past_end_detected() {
        let mut game = create_valid_game();
        game.debris.values_mut().next().unwrap().progress = 6;

        let violations = check_invariants(&game);
        assert!(violations.iter().any(|v| v.message.contains("past the path end")));
    }

    #[test]
    fn test_reused_id_detected() {
        let mut game = create_valid_game();
        game.next_debris_id = 1;

        let violations = check_invariants(&game);
        assert!(violations.iter().any(|v| v.message.contains("next id")));
    }

    #[test]
    fn test_transition_checks_progress() {
        let before = create_valid_game();
        let mut after = before.clone();
        resolve_combat(&mut after);
        after.advance_turn();
        assert!(check_transition(&before, &after).is_empty());

        let mut backwards = after.clone();
        backwards.debris.values_mut().next().unwrap().progress = 0;
        let mut forwards = before.clone();
        forwards.debris.values_mut().next().unwrap().progress = 3;
        assert!(!check_transition(&forwards, &backwards).is_empty());
    }
}
