//! Gather the stones still missing for the next incantation.
//!
//! Each tick runs the first rule that fires, in this order:
//!
//! 1. Food guard: at or below the level-scaled safety floor, hand over to
//!    food collection.
//! 2. Inventory query when forced or when the refresh interval elapsed.
//! 3. Look when forced, stale, or never received.
//! 4. Take a missing stone lying on the agent's own tile.
//! 5. Follow the queued movement plan.
//! 6. Re-target: closest visible tile of the rarest missing, non-blacklisted kind.
//! 7. Finish when nothing is missing, otherwise take one exploration step.
//!
//! Two consecutive take failures on one kind blacklist it until the state is
//! re-entered. Two consecutive movement failures discard the current path.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::time::Duration;

use zappy_types::{Action, CommandKind, CommandResult, Event, MovementCommand, RelativePosition, ResourceKind};

use super::{forager_owns, inventory_due, needs_look, next_move};
use crate::config::CollectionConfig;
use crate::context::PlannerContext;
use crate::observer::PlannerEvent;
use crate::pathing::PathPlanner;
use crate::state::{Decision, State, StateKind};
use crate::targeting::{RARITY_ORDER, ResourceTarget, select_target};

/// Fields reset on every activation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionProgress {
    /// Tile currently walked to.
    pub target: Option<ResourceTarget>,
    /// Remaining movement toward the target.
    pub plan: VecDeque<MovementCommand>,
    /// Kind of the last failed take.
    pub failing_kind: Option<ResourceKind>,
    /// Consecutive take failures on `failing_kind`.
    pub take_failures: u32,
    /// Kinds excluded from targeting for this activation.
    pub blacklist: BTreeSet<ResourceKind>,
    /// Units picked up during this activation.
    pub collected: BTreeMap<ResourceKind, u32>,
    /// When inventory was last queried or received.
    pub last_inventory_check: Option<Duration>,
}

/// Resource collection state.
pub struct CollectResourcesState {
    config: CollectionConfig,
    paths: Box<dyn PathPlanner>,
    progress: CollectionProgress,
}

impl CollectResourcesState {
    /// A collection state using `paths` for movement.
    pub fn new(config: CollectionConfig, paths: Box<dyn PathPlanner>) -> Self {
        Self {
            config,
            paths,
            progress: CollectionProgress::default(),
        }
    }

    /// Current activation fields.
    pub const fn progress(&self) -> &CollectionProgress {
        &self.progress
    }

    fn retarget(&mut self, ctx: &PlannerContext, missing: &BTreeMap<ResourceKind, u32>) -> Option<Action> {
        let target = select_target(missing, ctx.model.vision(), &self.progress.blacklist)?;
        if self.progress.target != Some(target) {
            ctx.report(&PlannerEvent::TargetSelected { target });
        }
        let mut path = self
            .paths
            .plan_path(target.position, ctx.model.orientation(), ctx.model.vision());
        path.truncate(self.config.path_cap);

        self.progress.target = Some(target);
        self.progress.plan = path.into();
        next_move(&mut self.progress.plan)
    }

    fn drop_path(&mut self) {
        self.progress.target = None;
        self.progress.plan.clear();
    }

    fn on_take_failed(&mut self, resource: ResourceKind, ctx: &PlannerContext) {
        if self.progress.failing_kind == Some(resource) {
            self.progress.take_failures = self.progress.take_failures.saturating_add(1);
        } else {
            self.progress.failing_kind = Some(resource);
            self.progress.take_failures = 1;
        }
        if self.progress.take_failures >= self.config.take_failure_limit
            && self.progress.blacklist.insert(resource)
        {
            ctx.report(&PlannerEvent::ResourceBlacklisted {
                resource,
                failures: self.progress.take_failures,
            });
        }
        self.drop_path();
        ctx.flags.request_vision_refresh();
    }
}

impl State for CollectResourcesState {
    fn kind(&self) -> StateKind {
        StateKind::CollectResources
    }

    fn on_enter(&mut self, ctx: &mut PlannerContext) {
        self.progress = CollectionProgress {
            last_inventory_check: Some(ctx.now()),
            ..CollectionProgress::default()
        };
        ctx.flags.reset_stuck_moves();
        ctx.flags.request_vision_refresh();
    }

    fn execute(&mut self, ctx: &PlannerContext) -> Decision {
        let model = &ctx.model;

        if model.food_count() <= self.config.safety_threshold(model.level()) {
            return Decision::Finished(StateKind::CollectFood);
        }

        if inventory_due(ctx, self.progress.last_inventory_check, self.config.inventory_interval()) {
            self.progress.last_inventory_check = Some(ctx.now());
            return Decision::Act(Action::Inventory);
        }

        if needs_look(ctx) {
            return Decision::Act(Action::Look);
        }

        let missing = model.missing_resources();
        if let Some(here) = model.vision().current_tile() {
            // Blacklisting only steers targeting; a missing stone underfoot is always taken.
            let pickup = RARITY_ORDER
                .into_iter()
                .find(|&kind| missing.contains_key(&kind) && here.quantity(kind) > 0);
            if let Some(resource) = pickup {
                return Decision::Act(Action::Take(resource));
            }
        }

        if let Some(action) = next_move(&mut self.progress.plan) {
            return Decision::Act(action);
        }

        if let Some(action) = self.retarget(ctx, &missing) {
            return Decision::Act(action);
        }

        if missing.is_empty() {
            return Decision::Finished(StateKind::Explore);
        }

        let step = self.paths.plan_exploration(model.orientation(), model.vision());
        Decision::Act(Action::from(step))
    }

    fn on_command_success(&mut self, result: &CommandResult, ctx: &mut PlannerContext) {
        match result.action {
            Action::Take(resource) => {
                let count = self.progress.collected.entry(resource).or_insert(0);
                *count = count.saturating_add(1);
                ctx.model.vision_mut().remove_resource_at(RelativePosition::ORIGIN, resource);
                self.drop_path();
                self.progress.failing_kind = None;
                self.progress.take_failures = 0;
                self.progress.blacklist.remove(&resource);
                ctx.report(&PlannerEvent::ResourceCollected { resource });
            }
            Action::Forward => {
                let facing = ctx.model.orientation();
                self.progress.target = self.progress.target.map(|target| target.after_step(facing));
                ctx.flags.reset_stuck_moves();
                ctx.flags.request_vision_refresh();
            }
            Action::Left | Action::Right => {
                ctx.flags.reset_stuck_moves();
                ctx.flags.request_vision_refresh();
            }
            Action::Inventory => self.progress.last_inventory_check = Some(ctx.now()),
            Action::Look | Action::ConnectNbr | Action::Fork => {}
        }
    }

    fn on_command_failed(&mut self, result: &CommandResult, ctx: &mut PlannerContext) {
        match result.action {
            Action::Take(resource) => self.on_take_failed(resource, ctx),
            Action::Forward | Action::Left | Action::Right => {
                let failures = ctx.flags.record_stuck_move();
                if failures >= self.config.stuck_move_limit {
                    self.drop_path();
                    ctx.flags.reset_stuck_moves();
                    ctx.report(&PlannerEvent::PathInvalidated { failures });
                }
            }
            Action::Inventory | Action::Look | Action::ConnectNbr | Action::Fork => {}
        }
    }

    fn on_event(&mut self, event: Event, ctx: &PlannerContext) -> Option<StateKind> {
        let model = &ctx.model;
        match event {
            Event::FoodEmergency => Some(StateKind::Emergency),
            Event::FoodLow => (model.food_count() <= self.config.safety_threshold(model.level()))
                .then_some(StateKind::CollectFood),
            Event::ResourcesCollected => model.missing_resources().is_empty().then_some(StateKind::Explore),
        }
    }

    fn on_exit(&mut self, ctx: &mut PlannerContext) {
        self.progress = CollectionProgress::default();
        ctx.flags.reset_stuck_moves();
    }

    fn owns(&self, kind: CommandKind) -> bool {
        forager_owns(kind)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::pathing::GridPathPlanner;
    use crate::states::testing::{Fixture, fixture, look, resolve};

    fn state() -> CollectResourcesState {
        CollectResourcesState::new(CollectionConfig::default(), Box::new(GridPathPlanner::new(4)))
    }

    /// An entered state whose first look has resolved with `payload`.
    fn entered(fx: &mut Fixture, payload: &str) -> CollectResourcesState {
        let mut state = state();
        state.on_enter(&mut fx.ctx);
        assert_eq!(state.execute(&fx.ctx), Decision::Act(Action::Look));
        resolve(&mut fx.ctx, &look(payload));
        state.on_command_success(&look(payload), &mut fx.ctx);
        state
    }

    fn succeed(state: &mut CollectResourcesState, fx: &mut Fixture, action: Action) {
        let result = CommandResult::success(action, None);
        resolve(&mut fx.ctx, &result);
        state.on_command_success(&result, &mut fx.ctx);
    }

    fn fail(state: &mut CollectResourcesState, fx: &mut Fixture, action: Action) {
        let result = CommandResult::failure(action, None);
        resolve(&mut fx.ctx, &result);
        state.on_command_failed(&result, &mut fx.ctx);
    }

    #[test]
    fn takes_missing_stone_underfoot_then_completes() {
        let mut fx = fixture(1, 40);
        let mut state = entered(&mut fx, "[player linemate, , , ]");

        assert_eq!(
            state.execute(&fx.ctx),
            Decision::Act(Action::Take(ResourceKind::Linemate))
        );
        succeed(&mut state, &mut fx, Action::Take(ResourceKind::Linemate));

        assert!(fx.ctx.model.missing_resources().is_empty());
        assert_eq!(state.progress().collected.get(&ResourceKind::Linemate), Some(&1));
        assert_eq!(
            fx.ctx.model.vision().current_tile().map(|tile| tile.quantity(ResourceKind::Linemate)),
            Some(0)
        );
        assert_eq!(state.execute(&fx.ctx), Decision::Finished(StateKind::Explore));
    }

    #[test]
    fn food_guard_preempts_everything() {
        let mut fx = fixture(1, 20);
        let mut state = state();
        state.on_enter(&mut fx.ctx);
        fx.ctx.flags.request_inventory_refresh();
        assert_eq!(state.execute(&fx.ctx), Decision::Finished(StateKind::CollectFood));
    }

    #[test]
    fn food_guard_uses_level_scaled_floor() {
        let mut fx = fixture(4, 35);
        let mut state = state();
        state.on_enter(&mut fx.ctx);
        assert_eq!(state.execute(&fx.ctx), Decision::Finished(StateKind::CollectFood));

        fx.ctx.model.set_food(36);
        assert_eq!(state.execute(&fx.ctx), Decision::Act(Action::Look));
    }

    #[test]
    fn inventory_is_refreshed_periodically() {
        let mut fx = fixture(1, 40);
        let mut state = entered(&mut fx, "[player, , , ]");
        fx.clock.advance(Duration::from_secs(12));
        assert_eq!(state.execute(&fx.ctx), Decision::Act(Action::Inventory));
        // Recorded at issue time, so the next tick moves on.
        assert_ne!(state.execute(&fx.ctx), Decision::Act(Action::Inventory));
    }

    #[test]
    fn rarer_visible_stone_is_targeted_first() {
        let mut fx = fixture(3, 40);
        // Level 3 needs linemate 2, sibur 1, phiras 2.
        let mut state = entered(&mut fx, "[player, linemate, , phiras]");
        assert_eq!(state.execute(&fx.ctx), Decision::Act(Action::Forward));
        let target = state.progress().target.unwrap();
        assert_eq!(target.resource, ResourceKind::Phiras);
        assert_eq!(target.position, RelativePosition::new(1, -1));
        assert_eq!(
            state.progress().plan,
            VecDeque::from(vec![MovementCommand::Right, MovementCommand::Forward])
        );
    }

    #[test]
    fn movement_success_schedules_look_and_tracks_target() {
        let mut fx = fixture(1, 40);
        let mut state = entered(&mut fx, "[player, , linemate, ]");
        assert_eq!(state.execute(&fx.ctx), Decision::Act(Action::Forward));
        succeed(&mut state, &mut fx, Action::Forward);

        assert_eq!(state.progress().target.map(|t| t.position), Some(RelativePosition::ORIGIN));
        assert!(fx.ctx.flags.vision_refresh_requested());
        assert_eq!(state.execute(&fx.ctx), Decision::Act(Action::Look));
    }

    #[test]
    fn two_take_failures_blacklist_the_kind() {
        let mut fx = fixture(1, 40);
        let mut state = entered(&mut fx, "[player linemate, , , ]");
        let take = Action::Take(ResourceKind::Linemate);

        fail(&mut state, &mut fx, take);
        assert!(state.progress().blacklist.is_empty());
        assert!(fx.ctx.flags.vision_refresh_requested());
        resolve(&mut fx.ctx, &look("[player linemate, , , ]"));
        assert_eq!(state.execute(&fx.ctx), Decision::Act(take));

        fail(&mut state, &mut fx, take);
        assert!(state.progress().blacklist.contains(&ResourceKind::Linemate));
        assert_eq!(
            fx.observer.count(|event| matches!(event, PlannerEvent::ResourceBlacklisted { .. })),
            1
        );

        resolve(&mut fx.ctx, &look("[player linemate, , , ]"));
        assert_eq!(state.execute(&fx.ctx), Decision::Act(take));

        state.on_exit(&mut fx.ctx);
        state.on_enter(&mut fx.ctx);
        assert!(state.progress().blacklist.is_empty());
    }

    #[test]
    fn blacklisted_kind_is_not_targeted() {
        let mut fx = fixture(1, 40);
        let mut state = entered(&mut fx, "[player linemate, , , ]");
        let take = Action::Take(ResourceKind::Linemate);
        fail(&mut state, &mut fx, take);
        fail(&mut state, &mut fx, take);
        assert!(state.progress().blacklist.contains(&ResourceKind::Linemate));

        // Linemate is visible ahead but not underfoot.
        resolve(&mut fx.ctx, &look("[player, , linemate, ]"));
        assert_eq!(state.execute(&fx.ctx), Decision::Act(Action::Forward));
        assert!(state.progress().target.is_none());
        assert_eq!(
            fx.observer.count(|event| matches!(event, PlannerEvent::TargetSelected { .. })),
            0
        );
    }

    #[test]
    fn failures_on_different_kinds_do_not_accumulate() {
        let mut fx = fixture(2, 40);
        let mut state = entered(&mut fx, "[player, , , ]");
        fail(&mut state, &mut fx, Action::Take(ResourceKind::Sibur));
        fail(&mut state, &mut fx, Action::Take(ResourceKind::Deraumere));
        assert!(state.progress().blacklist.is_empty());
        assert_eq!(state.progress().take_failures, 1);
    }

    #[test]
    fn take_success_clears_blacklist_entry() {
        let mut fx = fixture(1, 40);
        let mut state = entered(&mut fx, "[player linemate, , , ]");
        let take = Action::Take(ResourceKind::Linemate);
        fail(&mut state, &mut fx, take);
        fail(&mut state, &mut fx, take);
        succeed(&mut state, &mut fx, take);
        assert!(state.progress().blacklist.is_empty());
        assert_eq!(state.progress().take_failures, 0);
    }

    #[test]
    fn repeated_movement_failures_drop_the_path() {
        let mut fx = fixture(1, 40);
        let mut state = entered(&mut fx, "[player, , , , , , linemate, , ]");
        assert_eq!(state.execute(&fx.ctx), Decision::Act(Action::Forward));
        assert!(state.progress().target.is_some());

        fail(&mut state, &mut fx, Action::Forward);
        assert!(state.progress().target.is_some());
        fail(&mut state, &mut fx, Action::Forward);
        assert!(state.progress().target.is_none());
        assert!(state.progress().plan.is_empty());
        assert_eq!(
            fx.observer.count(|event| matches!(event, PlannerEvent::PathInvalidated { failures: 2 })),
            1
        );
    }

    #[test]
    fn explores_when_nothing_useful_is_visible() {
        let mut fx = fixture(1, 40);
        let mut state = entered(&mut fx, "[player, food, , sibur]");
        assert_eq!(state.execute(&fx.ctx), Decision::Act(Action::Forward));
        assert!(state.progress().target.is_none());
    }

    #[test]
    fn events_are_rechecked_against_the_model() {
        let mut fx = fixture(1, 40);
        let mut state = state();
        state.on_enter(&mut fx.ctx);

        assert_eq!(state.on_event(Event::FoodEmergency, &fx.ctx), Some(StateKind::Emergency));
        assert_eq!(state.on_event(Event::FoodLow, &fx.ctx), None);
        assert_eq!(state.on_event(Event::ResourcesCollected, &fx.ctx), None);

        fx.ctx.model.set_food(25);
        assert_eq!(state.on_event(Event::FoodLow, &fx.ctx), Some(StateKind::CollectFood));
        fx.ctx.model.add_resource(ResourceKind::Linemate, 1).unwrap();
        assert_eq!(state.on_event(Event::ResourcesCollected, &fx.ctx), Some(StateKind::Explore));
    }

    #[test]
    fn on_enter_is_idempotent() {
        let mut fx = fixture(1, 40);
        let mut state = entered(&mut fx, "[player, linemate, , ]");
        state.execute(&fx.ctx);
        fail(&mut state, &mut fx, Action::Take(ResourceKind::Linemate));

        state.on_enter(&mut fx.ctx);
        let once = state.progress().clone();
        state.on_enter(&mut fx.ctx);
        assert_eq!(state.progress(), &once);
        assert!(once.target.is_none());
        assert!(once.plan.is_empty());
        assert_eq!(once.take_failures, 0);
    }

    #[test]
    fn owns_foraging_commands_only() {
        let state = state();
        assert!(state.owns(CommandKind::Take));
        assert!(state.owns(CommandKind::Forward));
        assert!(state.owns(CommandKind::Look));
        assert!(!state.owns(CommandKind::Fork));
        assert!(!state.owns(CommandKind::ConnectNbr));
    }
}
