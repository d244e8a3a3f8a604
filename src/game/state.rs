//! Game state management.
//!
//! Each team has its own board built from the shared map: a team's towers
//! stand on its board, and debris sent by the opponent walks the path of that
//! same board towards the team's base. Tile occupancy is therefore tracked
//! per `(team, coord)`.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::{
    Coord, Debris, DebrisId, MapModel, Rules, Team, TileKind, Tower, TowerCatalog, TowerId,
    TowerType,
};

/// Why a tower cannot be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PlacementError {
    /// The tile is outside the map.
    #[error("tile {0} is outside the map")]
    OutOfBounds(Coord),
    /// The tile is blocked or part of the path.
    #[error("tile {0} is not buildable space")]
    NotBuildable(Coord),
    /// Another tower already stands on the tile.
    #[error("tile {coord} is occupied by {by}")]
    Occupied {
        /// Requested tile.
        coord: Coord,
        /// Tower standing there.
        by: TowerId,
    },
    /// The team cannot pay for the tower.
    #[error("cost {cost} exceeds balance {balance}")]
    InsufficientFunds {
        /// Price of the tower.
        cost: u64,
        /// Current balance.
        balance: u64,
    },
}

/// Why a debris cannot be sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SpawnError {
    /// Health below the viable minimum.
    #[error("health {health} is below the minimum {min}")]
    HealthTooLow {
        /// Requested health.
        health: u64,
        /// Minimum allowed.
        min: u64,
    },
    /// Lane outside `1..=max`.
    #[error("lane {lane} is outside 1..={max}")]
    LaneNotAllowed {
        /// Requested lane.
        lane: u32,
        /// Slowest allowed lane.
        max: u32,
    },
    /// The team cannot pay for the debris.
    #[error("cost {cost} exceeds balance {balance}")]
    InsufficientFunds {
        /// Price of the debris.
        cost: u64,
        /// Current balance.
        balance: u64,
    },
}

/// Serialisable copy of everything that changes during a match.
///
/// The map, catalog and rules are constant for a match and live in the
/// replay header instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Turn counter at the moment of the snapshot.
    pub turn: u32,
    /// Balance per team (Blue, Red).
    pub balance: [u64; 2],
    /// Base health per team (Blue, Red).
    pub base_health: [u64; 2],
    /// Live towers in id order.
    pub towers: Vec<Tower>,
    /// Live debris in id order.
    pub debris: Vec<Debris>,
    /// Next tower id to hand out.
    pub next_tower_id: u32,
    /// Next debris id to hand out.
    pub next_debris_id: u32,
}

/// Complete mutable state of one match.
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    /// The shared, immutable map.
    pub(crate) map: Arc<MapModel>,
    /// Tower stats for this match.
    pub(crate) catalog: TowerCatalog,
    /// Economy and pricing rules for this match.
    pub(crate) rules: Rules,
    /// Current turn number (0-indexed).
    pub(crate) turn: u32,
    /// Balance per team.
    pub(crate) balance: [u64; 2],
    /// Base health per team.
    pub(crate) base_health: [u64; 2],
    /// Live towers, ordered by id.
    pub(crate) towers: BTreeMap<TowerId, Tower>,
    /// Live debris, ordered by id.
    pub(crate) debris: BTreeMap<DebrisId, Debris>,
    /// Which tower stands on each occupied tile of each board.
    pub(crate) occupancy: BTreeMap<(Team, Coord), TowerId>,
    /// Next tower id.
    pub(crate) next_tower_id: u32,
    /// Next debris id.
    pub(crate) next_debris_id: u32,
}

impl GameState {
    /// Create the opening state of a match.
    #[must_use]
    pub fn new(map: Arc<MapModel>, catalog: TowerCatalog, rules: Rules) -> Self {
        Self {
            map,
            catalog,
            rules,
            turn: 0,
            balance: [rules.starting_balance; 2],
            base_health: [rules.base_health; 2],
            towers: BTreeMap::new(),
            debris: BTreeMap::new(),
            occupancy: BTreeMap::new(),
            next_tower_id: 1,
            next_debris_id: 1,
        }
    }

    /// Rebuild a state from a snapshot taken on the same map.
    #[must_use]
    pub fn from_snapshot(
        map: Arc<MapModel>,
        catalog: TowerCatalog,
        rules: Rules,
        snapshot: &Snapshot,
    ) -> Self {
        let towers: BTreeMap<TowerId, Tower> =
            snapshot.towers.iter().map(|t| (t.id, *t)).collect();
        let occupancy = towers
            .values()
            .map(|t| ((t.team, t.coord), t.id))
            .collect();
        Self {
            map,
            catalog,
            rules,
            turn: snapshot.turn,
            balance: snapshot.balance,
            base_health: snapshot.base_health,
            towers,
            debris: snapshot.debris.iter().map(|d| (d.id, *d)).collect(),
            occupancy,
            next_tower_id: snapshot.next_tower_id,
            next_debris_id: snapshot.next_debris_id,
        }
    }

    /// Take a serialisable snapshot of the mutable state.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            turn: self.turn,
            balance: self.balance,
            base_health: self.base_health,
            towers: self.towers.values().copied().collect(),
            debris: self.debris.values().copied().collect(),
            next_tower_id: self.next_tower_id,
            next_debris_id: self.next_debris_id,
        }
    }

    /// The match map.
    #[must_use]
    pub fn map(&self) -> &MapModel {
        &self.map
    }

    /// Shared handle to the match map.
    #[must_use]
    pub fn map_handle(&self) -> Arc<MapModel> {
        Arc::clone(&self.map)
    }

    /// The tower catalog for this match.
    #[must_use]
    pub const fn catalog(&self) -> &TowerCatalog {
        &self.catalog
    }

    /// The rules for this match.
    #[must_use]
    pub const fn rules(&self) -> &Rules {
        &self.rules
    }

    /// Get the current turn number.
    #[must_use]
    pub const fn turn(&self) -> u32 {
        self.turn
    }

    /// Current balance of a team.
    #[must_use]
    pub const fn balance(&self, team: Team) -> u64 {
        self.balance[team.index()]
    }

    /// Remaining base health of a team.
    #[must_use]
    pub const fn base_health(&self, team: Team) -> u64 {
        self.base_health[team.index()]
    }

    /// All live towers in id order.
    pub fn towers(&self) -> impl Iterator<Item = &Tower> {
        self.towers.values()
    }

    /// Towers owned by a team, in id order.
    pub fn towers_of(&self, team: Team) -> impl Iterator<Item = &Tower> {
        self.towers.values().filter(move |t| t.team == team)
    }

    /// All live debris in id order.
    pub fn debris(&self) -> impl Iterator<Item = &Debris> {
        self.debris.values()
    }

    /// Debris sent by a team, in id order.
    pub fn debris_of(&self, team: Team) -> impl Iterator<Item = &Debris> {
        self.debris.values().filter(move |d| d.team == team)
    }

    /// Get a tower by id.
    #[must_use]
    pub fn get_tower(&self, id: TowerId) -> Option<&Tower> {
        self.towers.get(&id)
    }

    /// Get a debris by id.
    #[must_use]
    pub fn get_debris(&self, id: DebrisId) -> Option<&Debris> {
        self.debris.get(&id)
    }

    /// The tower standing on a tile of a team's board.
    #[must_use]
    pub fn tower_at(&self, team: Team, coord: Coord) -> Option<&Tower> {
        self.occupancy
            .get(&(team, coord))
            .and_then(|id| self.towers.get(id))
    }

    /// Whether a team could put a tower on a tile, ignoring cost.
    #[must_use]
    pub fn is_placeable(&self, team: Team, coord: Coord) -> bool {
        self.map.tile(coord) == Some(TileKind::Space)
            && !self.occupancy.contains_key(&(team, coord))
    }

    /// Check every precondition of [`place_tower`](Self::place_tower).
    ///
    /// # Errors
    ///
    /// Returns the first failing precondition.
    pub fn check_placement(
        &self,
        team: Team,
        kind: TowerType,
        coord: Coord,
    ) -> Result<u64, PlacementError> {
        match self.map.tile(coord) {
            None => return Err(PlacementError::OutOfBounds(coord)),
            Some(TileKind::Path | TileKind::Blocked) => {
                return Err(PlacementError::NotBuildable(coord));
            }
            Some(TileKind::Space) => {}
        }
        if let Some(&by) = self.occupancy.get(&(team, coord)) {
            return Err(PlacementError::Occupied { coord, by });
        }
        let cost = self.catalog.stats(kind).cost;
        let balance = self.balance(team);
        if cost > balance {
            return Err(PlacementError::InsufficientFunds { cost, balance });
        }
        Ok(cost)
    }

    /// Add to a team's balance.
    pub fn credit(&mut self, team: Team, amount: u64) {
        let balance = &mut self.balance[team.index()];
        *balance = balance.saturating_add(amount);
    }

    /// Take from a team's balance.
    ///
    /// Returns `false` without touching the balance if it would go negative.
    pub fn debit(&mut self, team: Team, amount: u64) -> bool {
        let balance = &mut self.balance[team.index()];
        match balance.checked_sub(amount) {
            Some(rest) => {
                *balance = rest;
                true
            }
            None => false,
        }
    }

    /// Build a tower, paying its catalog cost.
    ///
    /// The new tower starts with its full cadence as cooldown.
    ///
    /// # Errors
    ///
    /// Returns an error if the tile is out of bounds, not buildable,
    /// occupied, or the team cannot pay.
    pub fn place_tower(
        &mut self,
        team: Team,
        kind: TowerType,
        coord: Coord,
    ) -> Result<TowerId, PlacementError> {
        let cost = self.check_placement(team, kind, coord)?;
        let paid = self.debit(team, cost);
        debug_assert!(paid, "check_placement verified the balance");

        let id = TowerId(self.next_tower_id);
        self.next_tower_id += 1;
        self.towers.insert(
            id,
            Tower {
                id,
                team,
                kind,
                coord,
                cooldown: self.catalog.stats(kind).cadence,
            },
        );
        self.occupancy.insert((team, coord), id);
        Ok(id)
    }

    /// Remove a tower and free its tile.
    ///
    /// Returns the removed tower and the refund owed to its team. Crediting
    /// the refund is left to the caller.
    pub fn remove_tower(&mut self, id: TowerId) -> Option<(Tower, u64)> {
        let tower = self.towers.remove(&id)?;
        self.occupancy.remove(&(tower.team, tower.coord));
        let refund = self.rules.refund(self.catalog.stats(tower.kind).cost);
        Some((tower, refund))
    }

    /// Check every precondition of [`spawn_debris`](Self::spawn_debris).
    ///
    /// # Errors
    ///
    /// Returns the first failing precondition.
    pub fn check_spawn(&self, team: Team, lane: u32, health: u64) -> Result<u64, SpawnError> {
        if health < self.rules.min_debris_health {
            return Err(SpawnError::HealthTooLow {
                health,
                min: self.rules.min_debris_health,
            });
        }
        if !self.rules.lane_allowed(lane) {
            return Err(SpawnError::LaneNotAllowed {
                lane,
                max: self.rules.max_debris_lane,
            });
        }
        let cost = self.rules.debris_cost(lane, health);
        let balance = self.balance(team);
        if cost > balance {
            return Err(SpawnError::InsufficientFunds { cost, balance });
        }
        Ok(cost)
    }

    /// Send a debris towards the opposing base, paying its price.
    ///
    /// # Errors
    ///
    /// Returns an error if the health or lane is not allowed or the team
    /// cannot pay.
    pub fn spawn_debris(
        &mut self,
        team: Team,
        lane: u32,
        health: u64,
    ) -> Result<DebrisId, SpawnError> {
        let cost = self.check_spawn(team, lane, health)?;
        let paid = self.debit(team, cost);
        debug_assert!(paid, "check_spawn verified the balance");

        let id = DebrisId(self.next_debris_id);
        self.next_debris_id += 1;
        self.debris.insert(
            id,
            Debris {
                id,
                team,
                progress: 0,
                health,
                max_health: health,
                lane,
                move_cooldown: lane,
                pending_damage: 0,
                damage_taken: 0,
            },
        );
        Ok(id)
    }

    /// Damage a team's base, saturating at zero.
    pub fn damage_base(&mut self, team: Team, amount: u64) {
        let health = &mut self.base_health[team.index()];
        *health = health.saturating_sub(amount);
    }

    /// Advance to the next turn.
    pub fn advance_turn(&mut self) {
        self.turn += 1;
    }

    /// The team ahead on the tie-break ladder.
    ///
    /// Higher base health wins, then higher balance, then Blue.
    #[must_use]
    pub fn leader(&self) -> Team {
        let key = |team: Team| (self.base_health(team), self.balance(team));
        if key(Team::Red) > key(Team::Blue) {
            Team::Red
        } else {
            Team::Blue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::MapSpec;

    fn create_test_game() -> GameState {
        let spec = MapSpec {
            name: "test".to_string(),
            width: 6,
            height: 3,
            path: (0..6).map(|x| (x, 1)).collect(),
            blocked: vec![(5, 0)],
        };
        let map = Arc::new(MapModel::from_spec(&spec).unwrap());
        GameState::new(map, TowerCatalog::default(), Rules::default())
    }

    #[test]
    fn test_game_state_creation() {
        let game = create_test_game();
        assert_eq!(game.turn(), 0);
        assert_eq!(game.balance(Team::Blue), 1500);
        assert_eq!(game.balance(Team::Red), 1500);
        assert_eq!(game.base_health(Team::Blue), 2500);
        assert_eq!(game.towers().count(), 0);
    }

    #[test]
    fn test_debit_refuses_overdraft() {
        let mut game = create_test_game();
        assert!(!game.debit(Team::Blue, 1501));
        assert_eq!(game.balance(Team::Blue), 1500);
        assert!(game.debit(Team::Blue, 1500));
        assert_eq!(game.balance(Team::Blue), 0);
    }

    #[test]
    fn test_place_tower_debits_exact_cost() {
        let mut game = create_test_game();
        let id = game
            .place_tower(Team::Blue, TowerType::Gunship, Coord::new(2, 0))
            .unwrap();
        assert_eq!(game.balance(Team::Blue), 500);
        assert_eq!(game.balance(Team::Red), 1500);

        let tower = game.get_tower(id).unwrap();
        assert_eq!(tower.cooldown, 20);
        assert!(!game.is_placeable(Team::Blue, Coord::new(2, 0)));
        // Red has its own board
        assert!(game.is_placeable(Team::Red, Coord::new(2, 0)));
    }

    #[test]
    fn test_place_tower_rejections() {
        let mut game = create_test_game();
        assert_eq!(
            game.place_tower(Team::Blue, TowerType::Gunship, Coord::new(9, 0)),
            Err(PlacementError::OutOfBounds(Coord::new(9, 0)))
        );
        assert_eq!(
            game.place_tower(Team::Blue, TowerType::Gunship, Coord::new(1, 1)),
            Err(PlacementError::NotBuildable(Coord::new(1, 1)))
        );
        assert_eq!(
            game.place_tower(Team::Blue, TowerType::Gunship, Coord::new(5, 0)),
            Err(PlacementError::NotBuildable(Coord::new(5, 0)))
        );
        assert_eq!(
            game.place_tower(Team::Blue, TowerType::Reinforcer, Coord::new(0, 0)),
            Err(PlacementError::InsufficientFunds {
                cost: 3000,
                balance: 1500
            })
        );

        let first = game
            .place_tower(Team::Blue, TowerType::Gunship, Coord::new(0, 0))
            .unwrap();
        game.credit(Team::Blue, 5000);
        assert_eq!(
            game.place_tower(Team::Blue, TowerType::Bomber, Coord::new(0, 0)),
            Err(PlacementError::Occupied {
                coord: Coord::new(0, 0),
                by: first
            })
        );
        // Nothing was charged for the rejected attempts
        assert_eq!(game.balance(Team::Blue), 5500);
    }

    #[test]
    fn test_remove_tower_frees_tile_and_refunds() {
        let mut game = create_test_game();
        let id = game
            .place_tower(Team::Red, TowerType::Gunship, Coord::new(3, 2))
            .unwrap();
        let (tower, refund) = game.remove_tower(id).unwrap();
        assert_eq!(tower.id, id);
        assert_eq!(refund, 800);
        assert!(game.is_placeable(Team::Red, Coord::new(3, 2)));
        assert!(game.remove_tower(id).is_none());
    }

    #[test]
    fn test_tower_ids_never_reused() {
        let mut game = create_test_game();
        game.credit(Team::Blue, 10_000);
        let a = game
            .place_tower(Team::Blue, TowerType::Gunship, Coord::new(0, 0))
            .unwrap();
        game.remove_tower(a);
        let b = game
            .place_tower(Team::Blue, TowerType::Gunship, Coord::new(0, 0))
            .unwrap();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn test_spawn_debris() {
        let mut game = create_test_game();
        let id = game.spawn_debris(Team::Blue, 1, 50).unwrap();
        let debris = game.get_debris(id).unwrap();
        assert_eq!(debris.progress, 0);
        assert_eq!(debris.health, 50);
        assert_eq!(debris.max_health, 50);
        assert_eq!(debris.target(), Team::Red);
        assert_eq!(game.balance(Team::Blue), 1500 - 150);
    }

    #[test]
    fn test_spawn_debris_rejections() {
        let mut game = create_test_game();
        assert_eq!(
            game.spawn_debris(Team::Blue, 1, 0),
            Err(SpawnError::HealthTooLow { health: 0, min: 1 })
        );
        assert_eq!(
            game.spawn_debris(Team::Blue, 0, 10),
            Err(SpawnError::LaneNotAllowed { lane: 0, max: 20 })
        );
        assert!(matches!(
            game.spawn_debris(Team::Blue, 1, 1000),
            Err(SpawnError::InsufficientFunds { .. })
        ));
        assert_eq!(game.balance(Team::Blue), 1500);
        assert_eq!(game.debris().count(), 0);
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let mut game = create_test_game();
        game.place_tower(Team::Blue, TowerType::Gunship, Coord::new(1, 0))
            .unwrap();
        game.spawn_debris(Team::Red, 2, 30).unwrap();
        game.advance_turn();

        let snapshot = game.snapshot();
        let rebuilt = GameState::from_snapshot(
            game.map_handle(),
            *game.catalog(),
            *game.rules(),
            &snapshot,
        );
        assert_eq!(rebuilt, game);
    }

    #[test]
    fn test_leader_tie_break() {
        let mut game = create_test_game();
        // Fully tied: Blue by convention
        assert_eq!(game.leader(), Team::Blue);

        game.credit(Team::Red, 1);
        assert_eq!(game.leader(), Team::Red);

        game.damage_base(Team::Red, 1);
        assert_eq!(game.leader(), Team::Blue);
    }
}
