//! One agent: a planner driven on a fixed interval against the world.
//!
//! The agent joins the world, builds its [`Planner`], and then on every
//! interval tick asks the planner for an action, sends it to the world and
//! feeds the reply back. It stops when the engine shuts down, when the
//! world no longer knows it (starvation), or when the world is gone.
//!
//! [`Planner`]: zappy_core::Planner

use std::sync::Arc;

use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};
use zappy_core::{PlannerBuilder, TracingObserver};
use zappy_types::AgentId;

use crate::spawner::TaskSpawner;
use crate::world::WorldError;

/// How an agent task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentOutcome {
    /// The engine shut down.
    Stopped {
        /// The agent.
        agent: AgentId,
        /// Actions sent to the world.
        actions: u64,
    },
    /// The world removed the agent for lack of food.
    Starved {
        /// The agent.
        agent: AgentId,
        /// Actions sent to the world.
        actions: u64,
    },
    /// The agent never got to play.
    Rejected {
        /// The agent.
        agent: AgentId,
    },
    /// The world stopped answering.
    Lost {
        /// The agent.
        agent: AgentId,
    },
}

impl AgentOutcome {
    /// The agent this outcome belongs to.
    pub const fn agent(&self) -> AgentId {
        match self {
            Self::Stopped { agent, .. }
            | Self::Starved { agent, .. }
            | Self::Rejected { agent }
            | Self::Lost { agent } => *agent,
        }
    }

    /// Actions the agent sent to the world.
    pub const fn actions(&self) -> u64 {
        match self {
            Self::Stopped { actions, .. } | Self::Starved { actions, .. } => *actions,
            Self::Rejected { .. } | Self::Lost { .. } => 0,
        }
    }
}

/// Run `agent` until it stops, then hand its slot back to `spawner`.
pub async fn run_agent(agent: AgentId, spawner: TaskSpawner) -> AgentOutcome {
    let outcome = drive(agent, &spawner).await;
    spawner.release();
    outcome
}

async fn drive(agent: AgentId, spawner: &TaskSpawner) -> AgentOutcome {
    let world = spawner.world();
    let start = match world.connect(agent).await {
        Ok(start) => start,
        Err(err) => {
            warn!(agent_id = %agent, error = %err, "agent could not join");
            return AgentOutcome::Rejected { agent };
        }
    };

    let built = PlannerBuilder::new(spawner.planner_config().clone())
        .level(start.level)
        .food(start.food)
        .spawner(Arc::new(spawner.clone()))
        .observer(Arc::new(TracingObserver::new(agent)))
        .build();
    let mut planner = match built {
        Ok(planner) => planner,
        Err(err) => {
            error!(agent_id = %agent, error = %err, "planner construction failed");
            world.disconnect(agent).await;
            return AgentOutcome::Rejected { agent };
        }
    };
    info!(agent_id = %agent, level = start.level, food = start.food, "agent joined");

    let mut shutdown = spawner.shutdown();
    let mut interval = tokio::time::interval(spawner.tick_interval().max(std::time::Duration::from_millis(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut actions: u64 = 0;

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                let stop = changed.is_err() || *shutdown.borrow();
                if stop {
                    world.disconnect(agent).await;
                    info!(agent_id = %agent, actions, state = %planner.current_state(), "agent stopped");
                    return AgentOutcome::Stopped { agent, actions };
                }
            }
            _ = interval.tick() => {
                let Some(action) = planner.tick() else {
                    continue;
                };
                actions = actions.saturating_add(1);
                match world.execute(agent, action).await {
                    Ok(result) => planner.on_command_result(&result),
                    Err(WorldError::UnknownAgent(_)) => {
                        info!(agent_id = %agent, actions, state = %planner.current_state(), "agent starved");
                        return AgentOutcome::Starved { agent, actions };
                    }
                    Err(err) => {
                        warn!(agent_id = %agent, error = %err, "world unreachable");
                        return AgentOutcome::Lost { agent };
                    }
                }
            }
        }
    }
}
