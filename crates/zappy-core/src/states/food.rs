//! Regular and emergency foraging.
//!
//! Both modes share one loop: refresh what is known, eat what lies
//! underfoot, walk to the closest visible food, otherwise explore. They
//! differ in when they stop and whether inventory is polled periodically.

use std::collections::VecDeque;
use std::time::Duration;

use zappy_agent::FoodAlertConfig;
use zappy_types::{Action, CommandKind, CommandResult, Event, MovementCommand, RelativePosition, ResourceKind};

use super::{forager_owns, inventory_due, needs_look, next_move};
use crate::config::CollectionConfig;
use crate::context::PlannerContext;
use crate::observer::PlannerEvent;
use crate::pathing::PathPlanner;
use crate::state::{Decision, State, StateKind};
use crate::targeting::{ResourceTarget, nearest_visible};

/// Fields reset on every activation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForagingProgress {
    /// Food tile currently walked to.
    pub target: Option<ResourceTarget>,
    /// Remaining movement toward it.
    pub plan: VecDeque<MovementCommand>,
    /// When inventory was last queried or received.
    pub last_inventory_check: Option<Duration>,
}

/// Food collection, in regular or emergency mode.
pub struct FoodState {
    kind: StateKind,
    collection: CollectionConfig,
    alerts: FoodAlertConfig,
    paths: Box<dyn PathPlanner>,
    progress: ForagingProgress,
}

impl FoodState {
    /// Forage until satiated, then explore.
    pub fn collect(collection: CollectionConfig, alerts: FoodAlertConfig, paths: Box<dyn PathPlanner>) -> Self {
        Self::with_kind(StateKind::CollectFood, collection, alerts, paths)
    }

    /// Forage without periodic inventory polling until out of danger.
    pub fn emergency(collection: CollectionConfig, alerts: FoodAlertConfig, paths: Box<dyn PathPlanner>) -> Self {
        Self::with_kind(StateKind::Emergency, collection, alerts, paths)
    }

    fn with_kind(
        kind: StateKind,
        collection: CollectionConfig,
        alerts: FoodAlertConfig,
        paths: Box<dyn PathPlanner>,
    ) -> Self {
        Self {
            kind,
            collection,
            alerts,
            paths,
            progress: ForagingProgress::default(),
        }
    }

    /// Current activation fields.
    pub const fn progress(&self) -> &ForagingProgress {
        &self.progress
    }

    const fn is_emergency(&self) -> bool {
        matches!(self.kind, StateKind::Emergency)
    }

    /// Successor once enough food is held.
    fn finished(&self, food: u32) -> Option<StateKind> {
        if self.is_emergency() {
            (food >= self.alerts.emergency_recovered).then_some(StateKind::CollectFood)
        } else {
            (food >= self.alerts.satiated).then_some(StateKind::Explore)
        }
    }

    fn drop_path(&mut self) {
        self.progress.target = None;
        self.progress.plan.clear();
    }
}

impl State for FoodState {
    fn kind(&self) -> StateKind {
        self.kind
    }

    fn on_enter(&mut self, ctx: &mut PlannerContext) {
        self.progress = ForagingProgress {
            last_inventory_check: Some(ctx.now()),
            ..ForagingProgress::default()
        };
        ctx.flags.reset_stuck_moves();
        ctx.flags.request_vision_refresh();
    }

    fn execute(&mut self, ctx: &PlannerContext) -> Decision {
        let model = &ctx.model;

        if let Some(next) = self.finished(model.food_count()) {
            return Decision::Finished(next);
        }

        let polling = if self.is_emergency() {
            ctx.flags.inventory_refresh_requested()
        } else {
            inventory_due(ctx, self.progress.last_inventory_check, self.collection.inventory_interval())
        };
        if polling {
            self.progress.last_inventory_check = Some(ctx.now());
            return Decision::Act(Action::Inventory);
        }

        if needs_look(ctx) {
            return Decision::Act(Action::Look);
        }

        let food_here = model
            .vision()
            .current_tile()
            .is_some_and(|tile| tile.quantity(ResourceKind::Food) > 0);
        if food_here {
            return Decision::Act(Action::Take(ResourceKind::Food));
        }

        if let Some(action) = next_move(&mut self.progress.plan) {
            return Decision::Act(action);
        }

        if let Some(position) = nearest_visible(model.vision(), ResourceKind::Food) {
            let mut path = self.paths.plan_path(position, model.orientation(), model.vision());
            path.truncate(self.collection.path_cap);
            self.progress.target = Some(ResourceTarget::new(position, ResourceKind::Food));
            self.progress.plan = path.into();
            if let Some(action) = next_move(&mut self.progress.plan) {
                return Decision::Act(action);
            }
        }

        let step = self.paths.plan_exploration(model.orientation(), model.vision());
        Decision::Act(Action::from(step))
    }

    fn on_command_success(&mut self, result: &CommandResult, ctx: &mut PlannerContext) {
        match result.action {
            Action::Take(resource) => {
                ctx.model.vision_mut().remove_resource_at(RelativePosition::ORIGIN, resource);
                self.drop_path();
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
            Action::Take(_) => {
                self.drop_path();
                ctx.flags.request_vision_refresh();
            }
            Action::Forward | Action::Left | Action::Right => {
                let failures = ctx.flags.record_stuck_move();
                if failures >= self.collection.stuck_move_limit {
                    self.drop_path();
                    ctx.flags.reset_stuck_moves();
                    ctx.report(&PlannerEvent::PathInvalidated { failures });
                }
            }
            Action::Inventory | Action::Look | Action::ConnectNbr | Action::Fork => {}
        }
    }

    fn on_event(&mut self, event: Event, _ctx: &PlannerContext) -> Option<StateKind> {
        match event {
            Event::FoodEmergency if !self.is_emergency() => Some(StateKind::Emergency),
            _ => None,
        }
    }

    fn on_exit(&mut self, ctx: &mut PlannerContext) {
        self.progress = ForagingProgress::default();
        ctx.flags.reset_stuck_moves();
    }

    fn owns(&self, kind: CommandKind) -> bool {
        forager_owns(kind)
    }
}
