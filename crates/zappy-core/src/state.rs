//! The state abstraction driven by the [`Planner`].
//!
//! Exactly one [`State`] is active at a time. The planner calls
//! [`State::execute`] once per tick and interprets the returned
//! [`Decision`]; command results and model events are routed back through
//! the remaining hooks. Transitions are expressed as [`StateKind`] values so
//! every edge can be checked against [`StateKind::can_transition_to`].
//!
//! [`Planner`]: crate::machine::Planner

use std::fmt;

use zappy_types::{Action, CommandKind, CommandResult, Event};

use crate::context::PlannerContext;

/// The closed set of planner states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StateKind {
    /// Gather the stones needed for the next incantation.
    CollectResources,
    /// Probe for a free slot, fork if needed, then create an agent.
    Reproduction,
    /// Forage until satiated.
    CollectFood,
    /// Forage urgently until out of danger.
    Emergency,
    /// Wander and decide what to do next.
    Explore,
}

impl StateKind {
    /// Every state kind.
    pub const ALL: [Self; 5] = [
        Self::CollectResources,
        Self::Reproduction,
        Self::CollectFood,
        Self::Emergency,
        Self::Explore,
    ];

    /// Display name used in logs.
    pub const fn name(self) -> &'static str {
        match self {
            Self::CollectResources => "collect_resources",
            Self::Reproduction => "reproduction",
            Self::CollectFood => "collect_food",
            Self::Emergency => "emergency",
            Self::Explore => "explore",
        }
    }

    /// States this one may hand control to.
    pub const fn successors(self) -> &'static [Self] {
        match self {
            Self::CollectResources | Self::Reproduction => {
                &[Self::Emergency, Self::CollectFood, Self::Explore]
            }
            Self::CollectFood => &[Self::Emergency, Self::Explore],
            Self::Emergency => &[Self::CollectFood],
            Self::Explore => &[
                Self::Emergency,
                Self::CollectFood,
                Self::CollectResources,
                Self::Reproduction,
            ],
        }
    }

    /// Whether `self -> next` is an allowed edge.
    pub fn can_transition_to(self, next: Self) -> bool {
        self.successors().contains(&next)
    }
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a state wants to happen this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Issue this action.
    Act(Action),
    /// Nothing to do yet; an in-flight result or a later tick will advance the state.
    Wait,
    /// The state's work is over; hand control to the given successor.
    Finished(StateKind),
}

/// A unit of planner behavior.
///
/// `on_enter` and `on_exit` bracket every activation and each runs exactly
/// once per activation. `execute` must only touch state-local fields; model
/// updates happen in the result callbacks.
pub trait State: Send {
    /// Which state this is.
    fn kind(&self) -> StateKind;

    /// Reset every state-local field. Calling it twice in a row is the same as once.
    fn on_enter(&mut self, ctx: &mut PlannerContext);

    /// Decide this tick's action.
    fn execute(&mut self, ctx: &PlannerContext) -> Decision;

    /// A previously issued action succeeded. The model already reflects it.
    fn on_command_success(&mut self, result: &CommandResult, ctx: &mut PlannerContext);

    /// A previously issued action failed.
    fn on_command_failed(&mut self, result: &CommandResult, ctx: &mut PlannerContext);

    /// Offered every event raised while active; a returned kind forces a transition.
    fn on_event(&mut self, event: Event, ctx: &PlannerContext) -> Option<StateKind>;

    /// Release state-local plan, target and blacklist fields.
    fn on_exit(&mut self, ctx: &mut PlannerContext);

    /// Whether results of this command kind are routed to this state.
    fn owns(&self, kind: CommandKind) -> bool;
}
