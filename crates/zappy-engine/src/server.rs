//! The world task: sole owner of the [`World`], reached through a channel.
//!
//! Agents talk to the world through a cloneable [`WorldHandle`]. Each call
//! sends a [`WorldRequest`] over an mpsc channel and waits for the reply on
//! a oneshot channel. Between requests the task advances the world on a
//! fixed interval and, once the tick limit is reached, flips the shutdown
//! watch so every agent task stops.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};
use zappy_types::{Action, AgentId, CommandResult};

use crate::world::{PlayerStart, World, WorldError};

/// Capacity of the request channel.
const REQUEST_BUFFER: usize = 256;

/// A request addressed to the world task.
#[derive(Debug)]
pub enum WorldRequest {
    /// Join the map.
    Connect {
        /// Joining agent.
        agent: AgentId,
        /// Where to send the outcome.
        reply: oneshot::Sender<Result<PlayerStart, WorldError>>,
    },
    /// Run one command.
    Execute {
        /// Issuing agent.
        agent: AgentId,
        /// The command.
        action: Action,
        /// Where to send the outcome.
        reply: oneshot::Sender<Result<CommandResult, WorldError>>,
    },
    /// Leave the map.
    Disconnect {
        /// Leaving agent.
        agent: AgentId,
    },
}

/// Cloneable access to the world task.
#[derive(Debug, Clone)]
pub struct WorldHandle {
    requests: mpsc::Sender<WorldRequest>,
}

impl WorldHandle {
    /// Join the map, consuming a team slot.
    pub async fn connect(&self, agent: AgentId) -> Result<PlayerStart, WorldError> {
        let (reply, response) = oneshot::channel();
        self.send(WorldRequest::Connect { agent, reply }).await?;
        response.await.map_err(|_closed| WorldError::Closed)?
    }

    /// Run `action` for `agent` and wait for the server's reply.
    pub async fn execute(&self, agent: AgentId, action: Action) -> Result<CommandResult, WorldError> {
        let (reply, response) = oneshot::channel();
        self.send(WorldRequest::Execute { agent, action, reply }).await?;
        response.await.map_err(|_closed| WorldError::Closed)?
    }

    /// Leave the map. A stopped world is ignored.
    pub async fn disconnect(&self, agent: AgentId) {
        if self.send(WorldRequest::Disconnect { agent }).await.is_err() {
            debug!(agent_id = %agent, "world already stopped on disconnect");
        }
    }

    async fn send(&self, request: WorldRequest) -> Result<(), WorldError> {
        self.requests
            .send(request)
            .await
            .map_err(|_closed| WorldError::Closed)
    }
}

/// How the world run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldSummary {
    /// World ticks run.
    pub ticks: u64,
    /// Players still on the map.
    pub population: usize,
    /// Players that starved during the run.
    pub starved: u32,
}

/// Start the world task.
///
/// The task stops after `max_ticks` world ticks, or when every handle has
/// been dropped, and then sends `true` on `shutdown`.
pub fn spawn_world(
    world: World,
    tick_interval: Duration,
    max_ticks: u64,
    shutdown: watch::Sender<bool>,
) -> (WorldHandle, JoinHandle<WorldSummary>) {
    let (requests, inbox) = mpsc::channel(REQUEST_BUFFER);
    let task = tokio::spawn(run_world(world, inbox, tick_interval, max_ticks, shutdown));
    (WorldHandle { requests }, task)
}

async fn run_world(
    mut world: World,
    mut inbox: mpsc::Receiver<WorldRequest>,
    tick_interval: Duration,
    max_ticks: u64,
    shutdown: watch::Sender<bool>,
) -> WorldSummary {
    let mut interval = tokio::time::interval(tick_interval.max(Duration::from_millis(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut starved: u32 = 0;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                for agent in world.advance() {
                    starved = starved.saturating_add(1);
                    info!(agent_id = %agent, tick = world.tick(), "agent starved");
                }
                if world.tick() >= max_ticks {
                    info!(tick = world.tick(), population = world.population(), "tick limit reached");
                    break;
                }
            }
            request = inbox.recv() => {
                let Some(request) = request else {
                    debug!("all world handles dropped");
                    break;
                };
                handle_request(&mut world, request);
            }
        }
    }

    if shutdown.send(true).is_err() {
        debug!("no agent listening for shutdown");
    }
    WorldSummary {
        ticks: world.tick(),
        population: world.population(),
        starved,
    }
}

fn handle_request(world: &mut World, request: WorldRequest) {
    match request {
        WorldRequest::Connect { agent, reply } => {
            let outcome = world.connect(agent);
            if let Ok(start) = &outcome {
                debug!(agent_id = %agent, food = start.food, free_slots = world.free_slots(), "agent connected");
            }
            if reply.send(outcome).is_err() {
                debug!(agent_id = %agent, "connect reply dropped");
            }
        }
        WorldRequest::Execute { agent, action, reply } => {
            let outcome = world.execute(agent, action);
            if reply.send(outcome).is_err() {
                debug!(agent_id = %agent, "execute reply dropped");
            }
        }
        WorldRequest::Disconnect { agent } => {
            if world.disconnect(agent) {
                debug!(agent_id = %agent, "agent disconnected");
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use zappy_core::config::WorldConfig;

    use super::*;

    fn start(max_ticks: u64) -> (WorldHandle, JoinHandle<WorldSummary>, watch::Receiver<bool>) {
        let world = World::new(&WorldConfig::default()).unwrap();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (handle, task) = spawn_world(world, Duration::from_millis(1), max_ticks, shutdown_tx);
        (handle, task, shutdown_rx)
    }

    #[tokio::test]
    async fn requests_are_answered_through_the_handle() {
        let (handle, _task, _shutdown) = start(10_000);
        let agent = AgentId::new();

        let joined = handle.connect(agent).await.unwrap();
        assert_eq!(joined.food, 10);

        let reply = handle.execute(agent, Action::Inventory).await.unwrap();
        assert!(reply.succeeded);
        assert!(reply.payload.unwrap().starts_with("[food "));

        let slots = handle.execute(agent, Action::ConnectNbr).await.unwrap();
        assert_eq!(slots.payload.as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn strangers_are_rejected() {
        let (handle, _task, _shutdown) = start(10_000);
        let outcome = handle.execute(AgentId::new(), Action::Look).await;
        assert!(matches!(outcome, Err(WorldError::UnknownAgent(_))));
    }

    #[tokio::test]
    async fn stops_at_the_tick_limit_and_signals_shutdown() {
        let (handle, task, shutdown) = start(3);
        let summary = task.await.unwrap();
        assert_eq!(summary.ticks, 3);
        assert!(*shutdown.borrow());

        let outcome = handle.connect(AgentId::new()).await;
        assert!(matches!(outcome, Err(WorldError::Closed)));
    }
}
