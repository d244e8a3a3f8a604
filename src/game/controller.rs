//! Per-team command facade.
//!
//! A [`Controller`] is the only handle a strategy gets on the match. It is
//! scoped to one team and one decision call, answers read-only queries, and
//! gates every mutation behind the same check its `can_*` query reports.
//!
//! Two tiers of refusal:
//! - `can_*` returning `false` is an ordinary game situation.
//! - Calling a mutator anyway is a contract violation. The call fails with
//!   [`ControllerError::ContractViolation`] and the violation is latched, so
//!   the engine invalidates the match even if the strategy ignores the error.

use std::cell::Cell;
use std::time::Instant;

use crate::error::ControllerError;
use crate::game::{
    Coord, Debris, DebrisId, GameState, MapModel, SnipePriority, Team, Tower, TowerId, TowerStats,
    TowerType, bomb, snipe,
};
use crate::replay::Action;

/// What a decision call left behind once the strategy returned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControllerReport {
    /// Successful mutations, in call order.
    pub actions: Vec<Action>,
    /// First contract violation, if any.
    pub violation: Option<ControllerError>,
    /// Whether the call or time budget ran out during the call.
    pub exhausted: bool,
    /// Facade calls made.
    pub calls: u64,
}

/// Capability surface handed to a strategy for one decision call.
pub struct Controller<'a> {
    team: Team,
    state: &'a mut GameState,
    actions: Vec<Action>,
    calls: Cell<u64>,
    call_budget: u64,
    deadline: Option<Instant>,
    exhausted: Cell<bool>,
    violation: Option<ControllerError>,
}

impl std::fmt::Debug for Controller<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("team", &self.team)
            .field("turn", &self.state.turn())
            .field("calls", &self.calls.get())
            .field("exhausted", &self.exhausted.get())
            .finish_non_exhaustive()
    }
}

impl<'a> Controller<'a> {
    /// Open a facade for `team` over `state`.
    ///
    /// `call_budget` bounds the number of facade calls; `deadline` bounds
    /// wall-clock time. Both are checked on every call.
    pub fn new(
        team: Team,
        state: &'a mut GameState,
        call_budget: u64,
        deadline: Option<Instant>,
    ) -> Self {
        Self {
            team,
            state,
            actions: Vec::new(),
            calls: Cell::new(0),
            call_budget,
            deadline,
            exhausted: Cell::new(false),
            violation: None,
        }
    }

    /// Close the facade and hand its buffered actions to the engine.
    #[must_use]
    pub fn finish(self) -> ControllerReport {
        ControllerReport {
            actions: self.actions,
            violation: self.violation,
            exhausted: self.exhausted.get(),
            calls: self.calls.get(),
        }
    }

    /// Count one facade call. Returns `false` once a budget is spent.
    fn charge(&self) -> bool {
        let calls = self.calls.get() + 1;
        self.calls.set(calls);
        let over_time = self.deadline.is_some_and(|d| Instant::now() >= d);
        if calls > self.call_budget || over_time {
            self.exhausted.set(true);
        }
        !self.exhausted.get()
    }

    /// Charge a mutating call, refusing it once the budget is gone.
    fn charge_mutation(&self) -> Result<(), ControllerError> {
        if self.charge() {
            Ok(())
        } else {
            Err(ControllerError::BudgetExhausted)
        }
    }

    /// Latch and return a contract violation.
    fn violate(&mut self, action: &'static str, detail: String) -> ControllerError {
        let err = ControllerError::ContractViolation { action, detail };
        if self.violation.is_none() {
            self.violation = Some(err.clone());
        }
        err
    }

    /// Whether the budget ran out. Strategies may poll this to stop early.
    #[must_use]
    pub fn budget_exhausted(&self) -> bool {
        self.exhausted.get()
    }

    // --- Queries ---

    /// Current turn number.
    #[must_use]
    pub fn get_turn(&self) -> u32 {
        self.charge();
        self.state.turn()
    }

    /// Balance of either team.
    #[must_use]
    pub fn get_balance(&self, team: Team) -> u64 {
        self.charge();
        self.state.balance(team)
    }

    /// Remaining base health of either team.
    #[must_use]
    pub fn get_base_health(&self, team: Team) -> u64 {
        self.charge();
        self.state.base_health(team)
    }

    /// Towers owned by a team, in id order.
    #[must_use]
    pub fn get_towers(&self, team: Team) -> Vec<Tower> {
        self.charge();
        self.state.towers_of(team).copied().collect()
    }

    /// Debris sent by a team, in id order.
    ///
    /// Debris threatening you are `get_debris(get_enemy_team())`.
    #[must_use]
    pub fn get_debris(&self, team: Team) -> Vec<Debris> {
        self.charge();
        self.state.debris_of(team).copied().collect()
    }

    /// The team this facade acts for.
    #[must_use]
    pub const fn get_ally_team(&self) -> Team {
        self.team
    }

    /// The opposing team.
    #[must_use]
    pub const fn get_enemy_team(&self) -> Team {
        self.team.opponent()
    }

    /// Whether `team` could place a tower at `(x, y)`, ignoring cost.
    #[must_use]
    pub fn is_placeable(&self, team: Team, x: i32, y: i32) -> bool {
        self.charge();
        self.state.is_placeable(team, Coord::new(x, y))
    }

    /// The match map.
    #[must_use]
    pub fn get_map(&self) -> &MapModel {
        self.state.map()
    }

    /// Price of a debris with the given lane and health.
    #[must_use]
    pub fn get_debris_cost(&self, lane: u32, health: u64) -> u64 {
        self.charge();
        self.state.rules().debris_cost(lane, health)
    }

    /// Catalog entry for a tower type.
    #[must_use]
    pub fn get_tower_stats(&self, kind: TowerType) -> TowerStats {
        self.state.catalog().stats(kind)
    }

    // --- Legality checks ---

    /// Whether [`build_tower`](Self::build_tower) would succeed.
    #[must_use]
    pub fn can_build_tower(&self, kind: TowerType, x: i32, y: i32) -> bool {
        self.charge();
        self.state
            .check_placement(self.team, kind, Coord::new(x, y))
            .is_ok()
    }

    /// Whether [`send_debris`](Self::send_debris) would succeed.
    #[must_use]
    pub fn can_send_debris(&self, lane: u32, health: u64) -> bool {
        self.charge();
        self.state.check_spawn(self.team, lane, health).is_ok()
    }

    /// Whether [`sell_tower`](Self::sell_tower) would succeed.
    #[must_use]
    pub fn can_sell_tower(&self, id: TowerId) -> bool {
        self.charge();
        self.owned(id).is_some()
    }

    /// Whether an owned combat tower is off cooldown.
    #[must_use]
    pub fn can_fire(&self, id: TowerId) -> bool {
        self.charge();
        self.owned(id)
            .is_some_and(|t| t.kind.is_combat() && t.cooldown == 0)
    }

    fn owned(&self, id: TowerId) -> Option<&Tower> {
        self.state.get_tower(id).filter(|t| t.team == self.team)
    }

    /// Check the tower is ours and of the expected kind.
    fn owned_of_kind(
        &mut self,
        action: &'static str,
        id: TowerId,
        kind: TowerType,
    ) -> Result<Tower, ControllerError> {
        match self.owned(id).copied() {
            Some(tower) if tower.kind == kind => Ok(tower),
            Some(tower) => Err(self.violate(
                action,
                format!("{id} is a {}, not a {kind}", tower.kind),
            )),
            None => Err(self.violate(action, format!("{id} is not a {} tower", self.team))),
        }
    }

    // --- Mutators ---

    /// Build a tower on the team's board.
    ///
    /// # Errors
    ///
    /// Returns a contract violation if [`can_build_tower`](Self::can_build_tower)
    /// is false, or `BudgetExhausted` once the budget is spent.
    pub fn build_tower(
        &mut self,
        kind: TowerType,
        x: i32,
        y: i32,
    ) -> Result<TowerId, ControllerError> {
        self.charge_mutation()?;
        let coord = Coord::new(x, y);
        match self.state.place_tower(self.team, kind, coord) {
            Ok(tower) => {
                self.actions.push(Action::Build { tower, kind, x, y });
                Ok(tower)
            }
            Err(err) => Err(self.violate("build_tower", err.to_string())),
        }
    }

    /// Sell one of the team's towers, crediting the refund.
    ///
    /// # Errors
    ///
    /// Returns a contract violation if the tower is not ours, or
    /// `BudgetExhausted` once the budget is spent.
    pub fn sell_tower(&mut self, id: TowerId) -> Result<u64, ControllerError> {
        self.charge_mutation()?;
        if self.owned(id).is_none() {
            return Err(self.violate("sell_tower", format!("{id} is not a {} tower", self.team)));
        }
        let Some((_, refund)) = self.state.remove_tower(id) else {
            return Err(self.violate("sell_tower", format!("{id} vanished")));
        };
        self.state.credit(self.team, refund);
        self.actions.push(Action::Sell { tower: id, refund });
        Ok(refund)
    }

    /// Send a debris at the enemy base.
    ///
    /// # Errors
    ///
    /// Returns a contract violation if [`can_send_debris`](Self::can_send_debris)
    /// is false, or `BudgetExhausted` once the budget is spent.
    pub fn send_debris(&mut self, lane: u32, health: u64) -> Result<DebrisId, ControllerError> {
        self.charge_mutation()?;
        match self.state.spawn_debris(self.team, lane, health) {
            Ok(debris) => {
                self.actions.push(Action::Send { debris, lane, health });
                Ok(debris)
            }
            Err(err) => Err(self.violate("send_debris", err.to_string())),
        }
    }

    /// Fire a gunship at the enemy debris chosen by `priority`.
    ///
    /// Returns the debris hit, or `None` when the gunship is cooling down or
    /// has nothing in range. Neither is a violation.
    ///
    /// # Errors
    ///
    /// Returns a contract violation if `id` is not one of our gunships, or
    /// `BudgetExhausted` once the budget is spent.
    pub fn auto_snipe(
        &mut self,
        id: TowerId,
        priority: SnipePriority,
    ) -> Result<Option<DebrisId>, ControllerError> {
        self.charge_mutation()?;
        self.owned_of_kind("auto_snipe", id, TowerType::Gunship)?;
        let hit = snipe(self.state, id, priority);
        if let Some(target) = hit {
            self.actions.push(Action::Snipe {
                tower: id,
                priority,
                target,
            });
        }
        Ok(hit)
    }

    /// Fire a bomber at every enemy debris in range.
    ///
    /// Returns the debris hit; empty when cooling down or nothing is in range.
    ///
    /// # Errors
    ///
    /// Returns a contract violation if `id` is not one of our bombers, or
    /// `BudgetExhausted` once the budget is spent.
    pub fn auto_bomb(&mut self, id: TowerId) -> Result<Vec<DebrisId>, ControllerError> {
        self.charge_mutation()?;
        self.owned_of_kind("auto_bomb", id, TowerType::Bomber)?;
        let hits = bomb(self.state, id);
        if !hits.is_empty() {
            self.actions.push(Action::Bomb {
                tower: id,
                hits: hits.clone(),
            });
        }
        Ok(hits)
    }
}
