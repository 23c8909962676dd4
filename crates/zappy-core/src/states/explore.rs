//! Wander and decide what to do next.
//!
//! Explore is the hub state: it forages when food runs low, collects when
//! stones are missing, reproduces when the level, food reserve and cooldown
//! allow it, and otherwise keeps walking.

use std::time::Duration;

use zappy_types::{Action, CommandKind, CommandResult, Event};

use super::{inventory_due, needs_look};
use crate::config::PlannerConfig;
use crate::context::PlannerContext;
use crate::pathing::PathPlanner;
use crate::state::{Decision, State, StateKind};

/// Exploration state.
pub struct ExploreState {
    config: PlannerConfig,
    paths: Box<dyn PathPlanner>,
    last_inventory_check: Option<Duration>,
}

impl ExploreState {
    /// An exploration state using `paths` for its steps.
    pub fn new(config: PlannerConfig, paths: Box<dyn PathPlanner>) -> Self {
        Self {
            config,
            paths,
            last_inventory_check: None,
        }
    }

    fn may_reproduce(&self, ctx: &PlannerContext) -> bool {
        let reproduction = &self.config.reproduction;
        let level = ctx.model.level();
        level >= reproduction.min_level
            && ctx.model.food_count() >= reproduction.min_food_for_fork(level)
            && ctx.reproduction.cooldown_elapsed(ctx.now(), reproduction.cooldown())
    }
}

impl State for ExploreState {
    fn kind(&self) -> StateKind {
        StateKind::Explore
    }

    fn on_enter(&mut self, ctx: &mut PlannerContext) {
        // Decisions below need a fresh inventory.
        self.last_inventory_check = None;
        ctx.flags.reset_stuck_moves();
    }

    fn execute(&mut self, ctx: &PlannerContext) -> Decision {
        let model = &ctx.model;

        if self.config.food.is_low(model.food_count()) {
            return Decision::Finished(StateKind::CollectFood);
        }

        if inventory_due(ctx, self.last_inventory_check, self.config.collection.inventory_interval()) {
            self.last_inventory_check = Some(ctx.now());
            return Decision::Act(Action::Inventory);
        }

        if !model.missing_resources().is_empty() {
            return Decision::Finished(StateKind::CollectResources);
        }

        if self.may_reproduce(ctx) {
            return Decision::Finished(StateKind::Reproduction);
        }

        if needs_look(ctx) {
            return Decision::Act(Action::Look);
        }

        let step = self.paths.plan_exploration(model.orientation(), model.vision());
        Decision::Act(Action::from(step))
    }

    fn on_command_success(&mut self, result: &CommandResult, ctx: &mut PlannerContext) {
        match result.action {
            Action::Inventory => self.last_inventory_check = Some(ctx.now()),
            Action::Forward | Action::Left | Action::Right => {
                ctx.flags.reset_stuck_moves();
                ctx.flags.request_vision_refresh();
            }
            Action::Take(_) | Action::Look | Action::ConnectNbr | Action::Fork => {}
        }
    }

    fn on_command_failed(&mut self, result: &CommandResult, ctx: &mut PlannerContext) {
        if result.action.movement().is_some() {
            ctx.flags.record_stuck_move();
        }
    }

    fn on_event(&mut self, event: Event, _ctx: &PlannerContext) -> Option<StateKind> {
        match event {
            Event::FoodEmergency => Some(StateKind::Emergency),
            Event::FoodLow => Some(StateKind::CollectFood),
            Event::ResourcesCollected => None,
        }
    }

    fn on_exit(&mut self, ctx: &mut PlannerContext) {
        self.last_inventory_check = None;
        ctx.flags.reset_stuck_moves();
    }

    fn owns(&self, kind: CommandKind) -> bool {
        kind.is_movement() || matches!(kind, CommandKind::Look | CommandKind::Inventory)
    }
}
