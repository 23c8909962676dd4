//! The planner: owns the active state and drives it once per tick.
//!
//! Tick flow:
//!
//! 1. While an action is in flight, [`Planner::tick`] returns `None` without
//!    consulting the state.
//! 2. Otherwise the active state's [`Decision`] is interpreted: an action is
//!    issued, a wait yields nothing, a finished state is swapped for its
//!    successor after the edge is validated.
//! 3. [`Planner::on_command_result`] folds the result into the model, routes
//!    it to the state if the state owns that command kind, then offers every
//!    event the model raised.

use std::sync::Arc;

use zappy_agent::{AgentError, AgentModel};
use zappy_types::{Action, CommandResult, Event};

use crate::clock::{Clock, MonotonicClock};
use crate::config::PlannerConfig;
use crate::context::PlannerContext;
use crate::observer::{NoopObserver, PlannerEvent, PlannerObserver};
use crate::pathing::{PathPlannerFactory, grid_planner_factory};
use crate::spawner::AgentSpawner;
use crate::state::{Decision, State, StateKind};
use crate::states::StateFactory;

/// Errors raised while assembling a planner.
#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    /// No create-agent capability was wired.
    #[error("no agent spawner configured")]
    MissingSpawner,

    /// The initial agent model could not be built.
    #[error("invalid agent model: {0}")]
    Model(#[from] AgentError),
}

/// Assembles a [`Planner`] from configuration and collaborators.
pub struct PlannerBuilder {
    config: PlannerConfig,
    level: u32,
    food: u32,
    initial_state: StateKind,
    spawner: Option<Arc<dyn AgentSpawner>>,
    clock: Option<Arc<dyn Clock>>,
    observer: Option<Arc<dyn PlannerObserver>>,
    paths: Option<PathPlannerFactory>,
}

impl PlannerBuilder {
    /// A builder for a level 1 agent with 10 food, starting in [`StateKind::Explore`].
    pub fn new(config: PlannerConfig) -> Self {
        Self {
            config,
            level: 1,
            food: 10,
            initial_state: StateKind::Explore,
            spawner: None,
            clock: None,
            observer: None,
            paths: None,
        }
    }

    /// Starting level.
    #[must_use]
    pub const fn level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    /// Starting food count.
    #[must_use]
    pub const fn food(mut self, food: u32) -> Self {
        self.food = food;
        self
    }

    /// State entered on build.
    #[must_use]
    pub const fn initial_state(mut self, kind: StateKind) -> Self {
        self.initial_state = kind;
        self
    }

    /// The create-agent capability. Required.
    #[must_use]
    pub fn spawner(mut self, spawner: Arc<dyn AgentSpawner>) -> Self {
        self.spawner = Some(spawner);
        self
    }

    /// Time source; defaults to [`MonotonicClock`].
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Event sink; defaults to [`NoopObserver`].
    #[must_use]
    pub fn observer(mut self, observer: Arc<dyn PlannerObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Path planner factory; defaults to the grid planner.
    #[must_use]
    pub fn path_planner(mut self, paths: PathPlannerFactory) -> Self {
        self.paths = Some(paths);
        self
    }

    /// Build the planner and enter the initial state.
    pub fn build(self) -> Result<Planner, PlannerError> {
        let spawner = self.spawner.ok_or(PlannerError::MissingSpawner)?;
        let model = AgentModel::new(self.level, self.food, self.config.food.clone())?;
        let clock = self.clock.unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        let observer = self.observer.unwrap_or_else(|| Arc::new(NoopObserver));
        let paths = self
            .paths
            .unwrap_or_else(|| grid_planner_factory(&self.config.exploration));

        let factory = StateFactory::new(self.config, spawner, paths);
        let mut ctx = PlannerContext::new(model, clock, observer);
        let mut state = factory.create(self.initial_state);
        state.on_enter(&mut ctx);
        ctx.report(&PlannerEvent::StateEntered { state: state.kind() });

        Ok(Planner {
            ctx,
            state,
            factory,
            in_flight: None,
        })
    }
}

/// The finite-state-machine planner for one agent.
pub struct Planner {
    ctx: PlannerContext,
    state: Box<dyn State>,
    factory: StateFactory,
    in_flight: Option<Action>,
}

impl Planner {
    /// Decide this tick's action, if any.
    pub fn tick(&mut self) -> Option<Action> {
        if self.in_flight.is_some() {
            return None;
        }
        match self.state.execute(&self.ctx) {
            Decision::Act(action) => {
                self.ctx.report(&PlannerEvent::ActionIssued {
                    state: self.state.kind(),
                    action,
                });
                self.in_flight = Some(action);
                Some(action)
            }
            Decision::Wait => None,
            Decision::Finished(next) => {
                self.transition(next);
                None
            }
        }
    }

    /// Fold a resolved command into the model and the active state.
    pub fn on_command_result(&mut self, result: &CommandResult) {
        self.in_flight = None;

        let (result, events) = match self.ctx.model.apply_result(result) {
            Ok(events) => (result.clone(), events),
            Err(err) => {
                self.ctx.report(&PlannerEvent::MalformedPayload {
                    kind: result.kind(),
                    reason: err.to_string(),
                });
                (CommandResult::failure(result.action, result.payload.clone()), Vec::new())
            }
        };

        self.ctx.record_resolution(&result);
        if result.succeeded {
            match result.action {
                Action::Look => self.ctx.flags.clear_vision_refresh(),
                Action::Inventory => self.ctx.flags.clear_inventory_refresh(),
                _ => {}
            }
        }

        if self.state.owns(result.kind()) {
            if result.succeeded {
                self.state.on_command_success(&result, &mut self.ctx);
            } else {
                self.state.on_command_failed(&result, &mut self.ctx);
            }
        } else {
            self.ctx.report(&PlannerEvent::ResultDropped {
                state: self.state.kind(),
                kind: result.kind(),
            });
        }

        for event in events {
            self.handle_event(event);
        }
    }

    /// Offer an event to the active state, transitioning if it asks to.
    pub fn handle_event(&mut self, event: Event) {
        if let Some(next) = self.state.on_event(event, &self.ctx) {
            self.transition(next);
        }
    }

    /// The active state's kind.
    pub fn current_state(&self) -> StateKind {
        self.state.kind()
    }

    /// The action awaiting its result, if any.
    pub const fn in_flight(&self) -> Option<Action> {
        self.in_flight
    }

    /// Shared context.
    pub const fn context(&self) -> &PlannerContext {
        &self.ctx
    }

    /// Mutable shared context, for hosts that learn facts out of band.
    pub const fn context_mut(&mut self) -> &mut PlannerContext {
        &mut self.ctx
    }

    fn transition(&mut self, next: StateKind) {
        let current = self.state.kind();
        if !current.can_transition_to(next) {
            self.ctx.report(&PlannerEvent::TransitionRejected { from: current, to: next });
            return;
        }
        self.state.on_exit(&mut self.ctx);
        self.ctx.report(&PlannerEvent::StateExited { state: current });

        self.state = self.factory.create(next);
        self.state.on_enter(&mut self.ctx);
        self.ctx.report(&PlannerEvent::StateEntered { state: next });
    }
}

impl std::fmt::Debug for Planner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Planner")
            .field("state", &self.state.kind())
            .field("in_flight", &self.in_flight)
            .field("ctx", &self.ctx)
            .finish_non_exhaustive()
    }
}
