//! Finite-state-machine planner for the Zappy agent.
//!
//! Each tick the [`Planner`] asks its active state for a decision, hands
//! the resulting action to the command layer, and later folds the resolved
//! result back into the agent model before routing it to the state that
//! issued it. States never talk to the network; they only decide.
//!
//! # Modules
//!
//! - [`clock`] -- Injectable time source ([`Clock`], [`MonotonicClock`], [`ManualClock`])
//! - [`config`] -- Configuration loading from `zappy-config.yaml`
//! - [`context`] -- Shared tick context, flags, and reproduction ledger
//! - [`machine`] -- The [`Planner`] and its builder
//! - [`observer`] -- Structured planner events and their sinks
//! - [`pathing`] -- [`PathPlanner`] trait and the greedy grid planner
//! - [`spawner`] -- The injected create-agent capability
//! - [`state`] -- [`State`] trait, [`StateKind`], [`Decision`]
//! - [`states`] -- Concrete states and the [`StateFactory`]
//! - [`targeting`] -- Rarity-ordered resource target selection
//!
//! [`StateFactory`]: states::StateFactory

pub mod clock;
pub mod config;
pub mod context;
pub mod machine;
pub mod observer;
pub mod pathing;
pub mod spawner;
pub mod state;
pub mod states;
pub mod targeting;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{ConfigError, PlannerConfig, ZappyConfig};
pub use context::PlannerContext;
pub use machine::{Planner, PlannerBuilder, PlannerError};
pub use observer::{NoopObserver, PlannerEvent, PlannerObserver, RecordingObserver, TracingObserver};
pub use pathing::{GridPathPlanner, PathPlanner, PathPlannerFactory, grid_planner_factory};
pub use spawner::{AgentSpawner, RecordingSpawner, SpawnError};
pub use state::{Decision, State, StateKind};
