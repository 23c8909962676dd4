//! Task-backed agent creation.
//!
//! [`TaskSpawner`] is the engine's [`AgentSpawner`]: creating an agent
//! starts a new tokio task running its own planner and returns at once.
//! Every spawned agent gets a clone of the spawner, so children can create
//! children of their own until `max_agents` run at the same time.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use zappy_core::{AgentSpawner, PlannerConfig, SpawnError};
use zappy_types::AgentId;

use crate::agent::{AgentOutcome, run_agent};
use crate::server::WorldHandle;

struct Shared {
    runtime: Handle,
    world: WorldHandle,
    planner: PlannerConfig,
    tick_interval: Duration,
    max_agents: u32,
    running: AtomicU32,
    shutdown: watch::Receiver<bool>,
    tasks: Mutex<Vec<JoinHandle<AgentOutcome>>>,
}

/// Starts agents as tokio tasks.
#[derive(Clone)]
pub struct TaskSpawner {
    shared: Arc<Shared>,
}

impl TaskSpawner {
    /// A spawner running agents on `runtime` against `world`.
    pub fn new(
        runtime: Handle,
        world: WorldHandle,
        planner: PlannerConfig,
        tick_interval: Duration,
        max_agents: u32,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                runtime,
                world,
                planner,
                tick_interval,
                max_agents,
                running: AtomicU32::new(0),
                shutdown,
                tasks: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Start one agent task without waiting for it.
    pub fn spawn_agent(&self) -> Result<AgentId, SpawnError> {
        if *self.shared.shutdown.borrow() {
            return Err(SpawnError::Unavailable {
                reason: String::from("engine is shutting down"),
            });
        }
        let limit = self.shared.max_agents;
        self.shared
            .running
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |running| {
                (running < limit).then_some(running.saturating_add(1))
            })
            .map_err(|_running| SpawnError::LimitReached { limit })?;

        let agent = AgentId::new();
        let task = self.shared.runtime.spawn(run_agent(agent, self.clone()));
        self.shared
            .tasks
            .lock()
            .map_err(|err| SpawnError::Unavailable {
                reason: err.to_string(),
            })?
            .push(task);
        info!(agent_id = %agent, running = self.running(), "agent task started");
        Ok(agent)
    }

    /// Agents currently running.
    pub fn running(&self) -> u32 {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Wait for every started agent, including those started while waiting.
    pub async fn join_all(&self) -> Vec<AgentOutcome> {
        let mut outcomes = Vec::new();
        loop {
            let batch: Vec<JoinHandle<AgentOutcome>> = match self.shared.tasks.lock() {
                Ok(mut tasks) => tasks.drain(..).collect(),
                Err(err) => {
                    warn!(error = %err, "agent task list poisoned");
                    break;
                }
            };
            if batch.is_empty() {
                break;
            }
            for task in batch {
                match task.await {
                    Ok(outcome) => outcomes.push(outcome),
                    Err(err) => warn!(error = %err, "agent task failed"),
                }
            }
        }
        outcomes
    }

    pub(crate) fn world(&self) -> &WorldHandle {
        &self.shared.world
    }

    pub(crate) fn planner_config(&self) -> &PlannerConfig {
        &self.shared.planner
    }

    pub(crate) fn tick_interval(&self) -> Duration {
        self.shared.tick_interval
    }

    pub(crate) fn shutdown(&self) -> watch::Receiver<bool> {
        self.shared.shutdown.clone()
    }

    /// Hand back the slot of an agent whose task is ending.
    pub(crate) fn release(&self) {
        let released = self
            .shared
            .running
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |running| running.checked_sub(1));
        if released.is_err() {
            warn!("agent released with no agent running");
        }
    }
}

impl AgentSpawner for TaskSpawner {
    fn create_new_agent(&self) -> Result<(), SpawnError> {
        self.spawn_agent().map(|_agent| ())
    }
}

impl std::fmt::Debug for TaskSpawner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskSpawner")
            .field("running", &self.running())
            .field("max_agents", &self.shared.max_agents)
            .finish_non_exhaustive()
    }
}
