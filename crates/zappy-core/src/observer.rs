//! Structured event sink for planner observability.
//!
//! Planner components never log directly. They report a typed
//! [`PlannerEvent`] to the [`PlannerObserver`] injected into the
//! [`PlannerContext`], and the sink decides what to do with it.
//!
//! - [`TracingObserver`] renders events as `tracing` records tagged with the agent ID.
//! - [`RecordingObserver`] keeps them in memory for assertions.
//! - [`NoopObserver`] drops them.
//!
//! [`PlannerContext`]: crate::context::PlannerContext

use std::sync::Mutex;
use std::time::Duration;

use tracing::{debug, error, info, warn};
use zappy_types::{Action, AgentId, CommandKind, ResourceKind};

use crate::state::StateKind;
use crate::states::ForkStage;
use crate::targeting::ResourceTarget;

/// Something worth reporting that happened inside the planner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannerEvent {
    /// A state became active.
    StateEntered {
        /// The new state.
        state: StateKind,
    },
    /// A state stopped being active.
    StateExited {
        /// The old state.
        state: StateKind,
    },
    /// A state asked for a successor it may not hand control to.
    TransitionRejected {
        /// The active state.
        from: StateKind,
        /// The requested successor.
        to: StateKind,
    },
    /// An action was handed to the command layer.
    ActionIssued {
        /// The state that chose it.
        state: StateKind,
        /// The action.
        action: Action,
    },
    /// A late result was not routed because the active state does not own its kind.
    ResultDropped {
        /// The active state.
        state: StateKind,
        /// Kind of the dropped result.
        kind: CommandKind,
    },
    /// A reply payload could not be folded into the model.
    MalformedPayload {
        /// Kind of the offending command.
        kind: CommandKind,
        /// Why it was rejected.
        reason: String,
    },
    /// A new resource target was chosen.
    TargetSelected {
        /// The target.
        target: ResourceTarget,
    },
    /// A take succeeded.
    ResourceCollected {
        /// What was picked up.
        resource: ResourceKind,
    },
    /// A resource kind was excluded from targeting after repeated take failures.
    ResourceBlacklisted {
        /// The excluded kind.
        resource: ResourceKind,
        /// Consecutive failures that led to it.
        failures: u32,
    },
    /// Repeated movement failures discarded the current path.
    PathInvalidated {
        /// Consecutive movement failures.
        failures: u32,
    },
    /// The reproduction stage changed.
    ForkStageChanged {
        /// Previous stage.
        from: ForkStage,
        /// New stage.
        to: ForkStage,
    },
    /// The create-agent capability was invoked successfully.
    AgentCreated,
    /// The create-agent capability reported an error.
    AgentCreationFailed {
        /// The spawner's error message.
        reason: String,
    },
    /// A reproduction activation ran out of time.
    ReproductionTimedOut {
        /// Time spent in the activation.
        elapsed: Duration,
    },
    /// A reproduction activation ended.
    ReproductionFinished {
        /// Whether a new agent was created.
        completed: bool,
    },
}

/// A sink for [`PlannerEvent`]s.
pub trait PlannerObserver: Send + Sync {
    /// Receive one event.
    fn observe(&self, event: &PlannerEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl PlannerObserver for NoopObserver {
    fn observe(&self, _event: &PlannerEvent) {}
}

/// Emits every event as a structured `tracing` record.
#[derive(Debug, Clone, Copy)]
pub struct TracingObserver {
    agent: AgentId,
}

impl TracingObserver {
    /// An observer tagging records with `agent`.
    pub const fn new(agent: AgentId) -> Self {
        Self { agent }
    }
}

impl PlannerObserver for TracingObserver {
    fn observe(&self, event: &PlannerEvent) {
        let agent = self.agent;
        match event {
            PlannerEvent::StateEntered { state } => {
                info!(agent_id = %agent, state = %state, "state entered");
            }
            PlannerEvent::StateExited { state } => {
                debug!(agent_id = %agent, state = %state, "state exited");
            }
            PlannerEvent::TransitionRejected { from, to } => {
                warn!(agent_id = %agent, from = %from, to = %to, "transition rejected");
            }
            PlannerEvent::ActionIssued { state, action } => {
                debug!(agent_id = %agent, state = %state, action = %action.wire(), "action issued");
            }
            PlannerEvent::ResultDropped { state, kind } => {
                debug!(agent_id = %agent, state = %state, kind = ?kind, "late result dropped");
            }
            PlannerEvent::MalformedPayload { kind, reason } => {
                warn!(agent_id = %agent, kind = ?kind, reason = %reason, "malformed payload");
            }
            PlannerEvent::TargetSelected { target } => {
                debug!(
                    agent_id = %agent,
                    resource = %target.resource,
                    position = %target.position,
                    "target selected"
                );
            }
            PlannerEvent::ResourceCollected { resource } => {
                info!(agent_id = %agent, resource = %resource, "resource collected");
            }
            PlannerEvent::ResourceBlacklisted { resource, failures } => {
                warn!(agent_id = %agent, resource = %resource, failures, "resource blacklisted");
            }
            PlannerEvent::PathInvalidated { failures } => {
                warn!(agent_id = %agent, failures, "path invalidated");
            }
            PlannerEvent::ForkStageChanged { from, to } => {
                debug!(agent_id = %agent, from = ?from, to = ?to, "fork stage changed");
            }
            PlannerEvent::AgentCreated => {
                info!(agent_id = %agent, "agent created");
            }
            PlannerEvent::AgentCreationFailed { reason } => {
                error!(agent_id = %agent, reason = %reason, "agent creation failed");
            }
            PlannerEvent::ReproductionTimedOut { elapsed } => {
                warn!(agent_id = %agent, elapsed_ms = elapsed.as_millis(), "reproduction timed out");
            }
            PlannerEvent::ReproductionFinished { completed } => {
                info!(agent_id = %agent, completed, "reproduction finished");
            }
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<PlannerEvent>>,
}

impl RecordingObserver {
    /// An empty recorder.
    pub const fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    /// Every event observed so far, in order.
    pub fn events(&self) -> Vec<PlannerEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Number of recorded events matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&PlannerEvent) -> bool) -> usize {
        self.events
            .lock()
            .map(|events| events.iter().filter(|event| predicate(event)).count())
            .unwrap_or(0)
    }
}

impl PlannerObserver for RecordingObserver {
    fn observe(&self, event: &PlannerEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
