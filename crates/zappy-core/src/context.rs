//! Shared tick context owned by the planner and lent to the active state.
//!
//! The context bundles the agent model, the cross-cutting flags states use
//! to talk to each other, the last successful result of every command kind,
//! reproduction bookkeeping, and the injected clock and observer.
//!
//! Flags live in [`Cell`]s so a state can request a refresh from
//! [`State::execute`], which only borrows the context immutably.
//!
//! [`State::execute`]: crate::state::State::execute

use std::cell::Cell;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use zappy_agent::AgentModel;
use zappy_types::{CommandKind, CommandResult};

use crate::clock::Clock;
use crate::observer::{PlannerEvent, PlannerObserver};

/// Named flags shared across states.
///
/// The planner owns them; states set and read them but never add new ones.
#[derive(Debug, Default)]
pub struct SharedFlags {
    refresh_vision: Cell<bool>,
    refresh_inventory: Cell<bool>,
    stuck_moves: Cell<u32>,
}

impl SharedFlags {
    /// Ask for a look before the next decision that depends on vision.
    pub fn request_vision_refresh(&self) {
        self.refresh_vision.set(true);
    }

    /// Whether a look has been requested.
    pub fn vision_refresh_requested(&self) -> bool {
        self.refresh_vision.get()
    }

    /// Drop a pending look request.
    pub fn clear_vision_refresh(&self) {
        self.refresh_vision.set(false);
    }

    /// Ask for an inventory query before the periodic one is due.
    pub fn request_inventory_refresh(&self) {
        self.refresh_inventory.set(true);
    }

    /// Whether an inventory query has been requested.
    pub fn inventory_refresh_requested(&self) -> bool {
        self.refresh_inventory.get()
    }

    /// Drop a pending inventory request.
    pub fn clear_inventory_refresh(&self) {
        self.refresh_inventory.set(false);
    }

    /// Count one more consecutive movement failure and return the new count.
    pub fn record_stuck_move(&self) -> u32 {
        let count = self.stuck_moves.get().saturating_add(1);
        self.stuck_moves.set(count);
        count
    }

    /// Consecutive movement failures so far.
    pub fn stuck_moves(&self) -> u32 {
        self.stuck_moves.get()
    }

    /// Forget movement failures.
    pub fn reset_stuck_moves(&self) {
        self.stuck_moves.set(0);
    }
}

/// A successful result and the order in which it resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedResult {
    /// The result as delivered by the command layer.
    pub result: CommandResult,
    /// Resolution sequence number; later results have larger numbers.
    pub sequence: u64,
}

/// Outcome history of reproduction activations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReproductionLedger {
    /// Activations that created an agent or were abandoned.
    pub attempts: u32,
    /// Activations that created an agent.
    pub completed: u32,
    /// When the most recent activation ended.
    pub last_attempt: Option<Duration>,
}

impl ReproductionLedger {
    /// Record the end of an activation at `at`.
    pub const fn record(&mut self, completed: bool, at: Duration) {
        self.attempts = self.attempts.saturating_add(1);
        if completed {
            self.completed = self.completed.saturating_add(1);
        }
        self.last_attempt = Some(at);
    }

    /// Whether at least `cooldown` has passed since the last activation ended.
    pub fn cooldown_elapsed(&self, now: Duration, cooldown: Duration) -> bool {
        self.last_attempt
            .is_none_or(|last| now.saturating_sub(last) >= cooldown)
    }
}

/// Everything a state may read or update besides its own fields.
pub struct PlannerContext {
    /// The agent's ground truth.
    pub model: AgentModel,
    /// Cross-state flags.
    pub flags: SharedFlags,
    /// Reproduction history.
    pub reproduction: ReproductionLedger,
    last_success: BTreeMap<CommandKind, ResolvedResult>,
    sequence: u64,
    clock: Arc<dyn Clock>,
    observer: Arc<dyn PlannerObserver>,
}

impl PlannerContext {
    /// A fresh context around `model`.
    pub fn new(model: AgentModel, clock: Arc<dyn Clock>, observer: Arc<dyn PlannerObserver>) -> Self {
        Self {
            model,
            flags: SharedFlags::default(),
            reproduction: ReproductionLedger::default(),
            last_success: BTreeMap::new(),
            sequence: 0,
            clock,
            observer,
        }
    }

    /// Current time according to the injected clock.
    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    /// Send `event` to the injected observer.
    pub fn report(&self, event: &PlannerEvent) {
        self.observer.observe(event);
    }

    /// Most recent successful result of `kind`.
    pub fn last_success(&self, kind: CommandKind) -> Option<&ResolvedResult> {
        self.last_success.get(&kind)
    }

    /// Sequence number of the latest resolved result.
    ///
    /// A state remembers this when issuing an action; any result with a
    /// larger number resolved after that point.
    pub const fn resolution_sequence(&self) -> u64 {
        self.sequence
    }

    /// Number a newly resolved result and remember it if it succeeded.
    pub fn record_resolution(&mut self, result: &CommandResult) -> u64 {
        self.sequence = self.sequence.saturating_add(1);
        if result.succeeded {
            self.last_success.insert(
                result.kind(),
                ResolvedResult {
                    result: result.clone(),
                    sequence: self.sequence,
                },
            );
        }
        self.sequence
    }
}

impl std::fmt::Debug for PlannerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlannerContext")
            .field("model", &self.model)
            .field("flags", &self.flags)
            .field("reproduction", &self.reproduction)
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}
