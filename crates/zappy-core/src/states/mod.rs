//! Concrete planner states and the factory that builds them.
//!
//! # Modules
//!
//! - [`collect_resources`] -- Gather the stones still missing for the next incantation.
//! - [`reproduction`] -- Probe for a free slot, fork if needed, create an agent.
//! - [`food`] -- Regular and emergency foraging.
//! - [`explore`] -- Wander and pick the next goal.

pub mod collect_resources;
pub mod explore;
pub mod food;
pub mod reproduction;

use std::sync::Arc;
use std::time::Duration;

use zappy_types::{Action, CommandKind, MovementCommand};

pub use collect_resources::CollectResourcesState;
pub use explore::ExploreState;
pub use food::FoodState;
pub use reproduction::{ForkStage, ReproductionState};

use crate::config::PlannerConfig;
use crate::context::PlannerContext;
use crate::pathing::PathPlannerFactory;
use crate::spawner::AgentSpawner;
use crate::state::{State, StateKind};

/// Builds a fresh state for a [`StateKind`].
#[derive(Clone)]
pub struct StateFactory {
    config: PlannerConfig,
    spawner: Arc<dyn AgentSpawner>,
    paths: PathPlannerFactory,
}

impl StateFactory {
    /// A factory wiring every state to the same configuration and collaborators.
    pub fn new(config: PlannerConfig, spawner: Arc<dyn AgentSpawner>, paths: PathPlannerFactory) -> Self {
        Self {
            config,
            spawner,
            paths,
        }
    }

    /// A new, not yet entered, state of `kind`.
    pub fn create(&self, kind: StateKind) -> Box<dyn State> {
        match kind {
            StateKind::CollectResources => {
                Box::new(CollectResourcesState::new(self.config.collection.clone(), (self.paths)()))
            }
            StateKind::Reproduction => Box::new(ReproductionState::new(
                self.config.reproduction.clone(),
                Arc::clone(&self.spawner),
            )),
            StateKind::CollectFood => Box::new(FoodState::collect(
                self.config.collection.clone(),
                self.config.food.clone(),
                (self.paths)(),
            )),
            StateKind::Emergency => Box::new(FoodState::emergency(
                self.config.collection.clone(),
                self.config.food.clone(),
                (self.paths)(),
            )),
            StateKind::Explore => Box::new(ExploreState::new(self.config.clone(), (self.paths)())),
        }
    }
}

impl std::fmt::Debug for StateFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateFactory")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Whether the snapshot must be refreshed before deciding on vision.
fn needs_look(ctx: &PlannerContext) -> bool {
    let vision = ctx.model.vision();
    ctx.flags.vision_refresh_requested() || !vision.has_data() || vision.is_stale()
}

/// Whether an inventory query is due.
fn inventory_due(ctx: &PlannerContext, last_check: Option<Duration>, interval: Duration) -> bool {
    ctx.flags.inventory_refresh_requested()
        || last_check.is_none_or(|last| ctx.now().saturating_sub(last) >= interval)
}

/// Whether a state that walks and picks up owns results of `kind`.
const fn forager_owns(kind: CommandKind) -> bool {
    kind.is_movement() || matches!(kind, CommandKind::Take | CommandKind::Look | CommandKind::Inventory)
}

/// Pop the next queued movement as an action.
fn next_move(plan: &mut std::collections::VecDeque<MovementCommand>) -> Option<Action> {
    plan.pop_front().map(Action::from)
}
