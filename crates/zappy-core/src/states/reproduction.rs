//! Create a new agent, forking a slot only when none is free.
//!
//! The state probes free slots with `Connect_nbr`. A free slot means the
//! agent can be created straight away; no slot means a `Fork` first. Agent
//! creation itself is deferred to the tick after the decision so it happens
//! at a single point. A food reserve and a wall-clock timeout guard the
//! whole activation.

use std::sync::Arc;
use std::time::Duration;

use zappy_agent::perception::parse_slot_count;
use zappy_types::{Action, CommandKind, CommandResult, Event};

use crate::config::ReproductionConfig;
use crate::context::PlannerContext;
use crate::observer::PlannerEvent;
use crate::spawner::AgentSpawner;
use crate::state::{Decision, State, StateKind};

/// Phase of a reproduction activation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ForkStage {
    /// Nothing issued yet.
    #[default]
    Init,
    /// Slot probe issued, waiting for its count.
    AwaitSlotCheck,
    /// Fork issued, waiting for its result.
    AwaitForkResult,
    /// Creation decided, happens on the next tick.
    PendingAgentCreation,
    /// Finished, successfully or not.
    Done,
}

/// Fields reset on every activation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReproductionProgress {
    /// Current phase.
    pub stage: ForkStage,
    /// The create-agent capability has been invoked.
    pub new_agent_created: bool,
    /// Creation is due on the next tick.
    pub should_create_agent: bool,
    /// Probe and fork failures so far.
    pub fork_attempts: u32,
    /// Food reserve required to fork, fixed at entry.
    pub min_food_for_fork: u32,
    /// When the activation started.
    pub entered_at: Duration,
    /// Resolution sequence at the time the last probe was issued.
    pub probe_sequence: u64,
}

/// Reproduction state.
pub struct ReproductionState {
    config: ReproductionConfig,
    spawner: Arc<dyn AgentSpawner>,
    progress: ReproductionProgress,
}

impl ReproductionState {
    /// A reproduction state creating agents through `spawner`.
    pub fn new(config: ReproductionConfig, spawner: Arc<dyn AgentSpawner>) -> Self {
        Self {
            config,
            spawner,
            progress: ReproductionProgress::default(),
        }
    }

    /// Current activation fields.
    pub const fn progress(&self) -> &ReproductionProgress {
        &self.progress
    }

    /// Whether this activation created an agent.
    pub const fn is_complete(&self) -> bool {
        matches!(self.progress.stage, ForkStage::Done) && self.progress.new_agent_created
    }

    fn advance(&mut self, to: ForkStage, ctx: &PlannerContext) {
        let from = self.progress.stage;
        if from != to {
            self.progress.stage = to;
            ctx.report(&PlannerEvent::ForkStageChanged { from, to });
        }
    }

    fn record_failure(&mut self, ctx: &PlannerContext) {
        self.progress.fork_attempts = self.progress.fork_attempts.saturating_add(1);
        if self.progress.fork_attempts >= self.config.max_attempts {
            self.advance(ForkStage::Done, ctx);
        } else {
            self.advance(ForkStage::Init, ctx);
        }
    }

    fn create_agent(&mut self, ctx: &PlannerContext) {
        match self.spawner.create_new_agent() {
            Ok(()) => ctx.report(&PlannerEvent::AgentCreated),
            // Marked created anyway so a broken spawner cannot be re-triggered forever.
            Err(err) => ctx.report(&PlannerEvent::AgentCreationFailed {
                reason: err.to_string(),
            }),
        }
        self.progress.new_agent_created = true;
        self.progress.should_create_agent = false;
        self.advance(ForkStage::Done, ctx);
        ctx.flags.request_vision_refresh();
    }

    fn check_slots(&mut self, ctx: &PlannerContext) -> Decision {
        let Some(probe) = ctx
            .last_success(CommandKind::ConnectNbr)
            .filter(|resolved| resolved.sequence > self.progress.probe_sequence)
        else {
            return Decision::Wait;
        };

        let slots = match parse_slot_count(probe.result.payload.as_deref().unwrap_or_default()) {
            Ok(slots) => slots,
            Err(err) => {
                ctx.report(&PlannerEvent::MalformedPayload {
                    kind: CommandKind::ConnectNbr,
                    reason: err.to_string(),
                });
                self.record_failure(ctx);
                return Decision::Wait;
            }
        };

        if slots > 0 {
            self.progress.should_create_agent = true;
            self.advance(ForkStage::PendingAgentCreation, ctx);
            Decision::Wait
        } else if ctx.model.food_count() >= self.progress.min_food_for_fork {
            self.advance(ForkStage::AwaitForkResult, ctx);
            Decision::Act(Action::Fork)
        } else {
            self.advance(ForkStage::Done, ctx);
            Decision::Finished(StateKind::Explore)
        }
    }
}

impl State for ReproductionState {
    fn kind(&self) -> StateKind {
        StateKind::Reproduction
    }

    fn on_enter(&mut self, ctx: &mut PlannerContext) {
        self.progress = ReproductionProgress {
            min_food_for_fork: self.config.min_food_for_fork(ctx.model.level()),
            entered_at: ctx.now(),
            probe_sequence: ctx.resolution_sequence(),
            ..ReproductionProgress::default()
        };
    }

    fn execute(&mut self, ctx: &PlannerContext) -> Decision {
        if ctx.model.food_count() < self.progress.min_food_for_fork {
            return Decision::Finished(StateKind::CollectFood);
        }

        let elapsed = ctx.now().saturating_sub(self.progress.entered_at);
        if elapsed > self.config.timeout() {
            if self.progress.stage != ForkStage::Done {
                ctx.report(&PlannerEvent::ReproductionTimedOut { elapsed });
                self.advance(ForkStage::Done, ctx);
            }
            return Decision::Finished(StateKind::Explore);
        }

        if self.progress.should_create_agent && !self.progress.new_agent_created {
            self.create_agent(ctx);
            return Decision::Wait;
        }

        match self.progress.stage {
            ForkStage::Init => {
                self.progress.probe_sequence = ctx.resolution_sequence();
                self.advance(ForkStage::AwaitSlotCheck, ctx);
                Decision::Act(Action::ConnectNbr)
            }
            ForkStage::AwaitSlotCheck => self.check_slots(ctx),
            ForkStage::AwaitForkResult | ForkStage::PendingAgentCreation => Decision::Wait,
            ForkStage::Done => Decision::Finished(StateKind::Explore),
        }
    }

    fn on_command_success(&mut self, result: &CommandResult, ctx: &mut PlannerContext) {
        if result.action == Action::Fork && self.progress.stage == ForkStage::AwaitForkResult {
            self.progress.should_create_agent = true;
            self.advance(ForkStage::PendingAgentCreation, ctx);
        }
    }

    fn on_command_failed(&mut self, result: &CommandResult, ctx: &mut PlannerContext) {
        let awaited = match result.action {
            Action::ConnectNbr => self.progress.stage == ForkStage::AwaitSlotCheck,
            Action::Fork => self.progress.stage == ForkStage::AwaitForkResult,
            _ => false,
        };
        if awaited {
            self.record_failure(ctx);
        }
    }

    fn on_event(&mut self, event: Event, ctx: &PlannerContext) -> Option<StateKind> {
        match event {
            Event::FoodEmergency => Some(StateKind::Emergency),
            Event::FoodLow => {
                (ctx.model.food_count() <= self.progress.min_food_for_fork).then_some(StateKind::CollectFood)
            }
            Event::ResourcesCollected => None,
        }
    }

    fn on_exit(&mut self, ctx: &mut PlannerContext) {
        // Leaving before `Done` (food guard, food events) is an interruption, not an attempt.
        if self.progress.stage == ForkStage::Done {
            let completed = self.is_complete();
            ctx.reproduction.record(completed, ctx.now());
            ctx.report(&PlannerEvent::ReproductionFinished { completed });
        }
        self.progress = ReproductionProgress::default();
    }

    fn owns(&self, kind: CommandKind) -> bool {
        matches!(kind, CommandKind::ConnectNbr | CommandKind::Fork)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::context::ReproductionLedger;
    use crate::spawner::RecordingSpawner;
    use crate::states::testing::{Fixture, fixture, resolve};

    fn state(spawner: &Arc<RecordingSpawner>) -> ReproductionState {
        let spawner: Arc<dyn AgentSpawner> = spawner.clone();
        ReproductionState::new(ReproductionConfig::default(), spawner)
    }

    fn deliver(state: &mut ReproductionState, fx: &mut Fixture, result: &CommandResult) {
        resolve(&mut fx.ctx, result);
        if result.succeeded {
            state.on_command_success(result, &mut fx.ctx);
        } else {
            state.on_command_failed(result, &mut fx.ctx);
        }
    }

    fn slots(count: &str) -> CommandResult {
        CommandResult::success(Action::ConnectNbr, Some(count.to_owned()))
    }

    /// An entered state that has issued its slot probe.
    fn probing(fx: &mut Fixture, spawner: &Arc<RecordingSpawner>) -> ReproductionState {
        let mut state = state(spawner);
        state.on_enter(&mut fx.ctx);
        assert_eq!(state.execute(&fx.ctx), Decision::Act(Action::ConnectNbr));
        assert_eq!(state.progress().stage, ForkStage::AwaitSlotCheck);
        state
    }

    #[test]
    fn min_food_is_fixed_at_entry() {
        let spawner = Arc::new(RecordingSpawner::new());
        let mut fx = fixture(3, 40);
        let mut state = state(&spawner);
        state.on_enter(&mut fx.ctx);
        assert_eq!(state.progress().min_food_for_fork, 19);

        let mut low = fixture(2, 40);
        state.on_enter(&mut low.ctx);
        assert_eq!(state.progress().min_food_for_fork, 13);
    }

    #[test]
    fn waits_until_the_probe_resolves() {
        let spawner = Arc::new(RecordingSpawner::new());
        let mut fx = fixture(2, 30);
        let mut state = probing(&mut fx, &spawner);
        assert_eq!(state.execute(&fx.ctx), Decision::Wait);
        assert_eq!(state.progress().stage, ForkStage::AwaitSlotCheck);
    }

    #[test]
    fn no_slot_and_enough_food_forks() {
        let spawner = Arc::new(RecordingSpawner::new());
        let mut fx = fixture(2, 30);
        let mut state = probing(&mut fx, &spawner);
        deliver(&mut state, &mut fx, &slots("0"));

        assert_eq!(state.execute(&fx.ctx), Decision::Act(Action::Fork));
        assert_eq!(state.progress().stage, ForkStage::AwaitForkResult);
        assert_eq!(state.execute(&fx.ctx), Decision::Wait);

        deliver(&mut state, &mut fx, &CommandResult::success(Action::Fork, Some("ok".into())));
        assert_eq!(state.progress().stage, ForkStage::PendingAgentCreation);
        assert!(state.progress().should_create_agent);

        assert_eq!(state.execute(&fx.ctx), Decision::Wait);
        assert_eq!(spawner.calls(), 1);
        assert!(state.is_complete());
        assert_eq!(state.execute(&fx.ctx), Decision::Finished(StateKind::Explore));
    }

    #[test]
    fn free_slot_creates_agent_without_forking() {
        let spawner = Arc::new(RecordingSpawner::new());
        let mut fx = fixture(2, 30);
        let mut state = probing(&mut fx, &spawner);
        deliver(&mut state, &mut fx, &slots("2"));

        assert_eq!(state.execute(&fx.ctx), Decision::Wait);
        assert!(state.progress().should_create_agent);
        assert_eq!(state.progress().stage, ForkStage::PendingAgentCreation);
        assert_eq!(spawner.calls(), 0);

        assert_eq!(state.execute(&fx.ctx), Decision::Wait);
        assert_eq!(spawner.calls(), 1);
        assert_eq!(state.progress().stage, ForkStage::Done);
        assert!(state.progress().new_agent_created);
        assert!(!state.progress().should_create_agent);
        assert!(fx.ctx.flags.vision_refresh_requested());
    }

    #[test]
    fn stale_probe_results_are_ignored() {
        let spawner = Arc::new(RecordingSpawner::new());
        let mut fx = fixture(2, 30);
        resolve(&mut fx.ctx, &slots("5"));
        let mut state = probing(&mut fx, &spawner);
        assert_eq!(state.execute(&fx.ctx), Decision::Wait);
        assert!(!state.progress().should_create_agent);
    }

    #[test]
    fn abandons_after_two_failures() {
        let spawner = Arc::new(RecordingSpawner::new());
        let mut fx = fixture(2, 30);
        let mut state = probing(&mut fx, &spawner);

        deliver(&mut state, &mut fx, &CommandResult::failure(Action::ConnectNbr, None));
        assert_eq!(state.progress().stage, ForkStage::Init);
        assert_eq!(state.progress().fork_attempts, 1);

        assert_eq!(state.execute(&fx.ctx), Decision::Act(Action::ConnectNbr));
        deliver(&mut state, &mut fx, &slots("0"));
        assert_eq!(state.execute(&fx.ctx), Decision::Act(Action::Fork));
        deliver(&mut state, &mut fx, &CommandResult::failure(Action::Fork, None));

        assert_eq!(state.progress().stage, ForkStage::Done);
        assert_eq!(state.progress().fork_attempts, 2);
        assert!(!state.is_complete());
        assert_eq!(state.execute(&fx.ctx), Decision::Finished(StateKind::Explore));
        assert_eq!(spawner.calls(), 0);
    }

    #[test]
    fn malformed_probe_counts_as_a_failure() {
        let spawner = Arc::new(RecordingSpawner::new());
        let mut fx = fixture(2, 30);
        let mut state = probing(&mut fx, &spawner);
        deliver(&mut state, &mut fx, &slots("ko"));
        assert_eq!(state.execute(&fx.ctx), Decision::Wait);
        assert_eq!(state.progress().fork_attempts, 1);
        assert_eq!(state.progress().stage, ForkStage::Init);
        assert_eq!(
            fx.observer.count(|event| matches!(event, PlannerEvent::MalformedPayload { .. })),
            1
        );
    }

    #[test]
    fn food_guard_hands_over_without_touching_the_stage() {
        let spawner = Arc::new(RecordingSpawner::new());
        let mut fx = fixture(2, 30);
        let mut state = probing(&mut fx, &spawner);
        fx.ctx.model.set_food(12);
        assert_eq!(state.execute(&fx.ctx), Decision::Finished(StateKind::CollectFood));
        assert_eq!(state.progress().stage, ForkStage::AwaitSlotCheck);
    }

    #[test]
    fn interrupted_activation_leaves_the_ledger_alone() {
        let spawner = Arc::new(RecordingSpawner::new());
        let mut fx = fixture(2, 30);
        let mut state = probing(&mut fx, &spawner);
        fx.ctx.model.set_food(12);
        assert_eq!(state.execute(&fx.ctx), Decision::Finished(StateKind::CollectFood));
        state.on_exit(&mut fx.ctx);

        assert_eq!(fx.ctx.reproduction, ReproductionLedger::default());
        assert!(fx.ctx.reproduction.cooldown_elapsed(fx.ctx.now(), Duration::from_secs(60)));
        assert_eq!(
            fx.observer.count(|event| matches!(event, PlannerEvent::ReproductionFinished { .. })),
            0
        );
    }

    #[test]
    fn never_forks_below_the_reserve() {
        let spawner = Arc::new(RecordingSpawner::new());
        let mut fx = fixture(3, 40);
        let mut state = probing(&mut fx, &spawner);
        deliver(&mut state, &mut fx, &slots("0"));
        fx.ctx.model.set_food(18);
        assert_ne!(state.execute(&fx.ctx), Decision::Act(Action::Fork));
    }

    #[test]
    fn times_out_after_thirty_seconds() {
        let spawner = Arc::new(RecordingSpawner::new());
        let mut fx = fixture(2, 30);
        let mut state = probing(&mut fx, &spawner);
        fx.clock.advance(Duration::from_secs(30));
        assert_eq!(state.execute(&fx.ctx), Decision::Wait);
        fx.clock.advance(Duration::from_millis(1));
        assert_eq!(state.execute(&fx.ctx), Decision::Finished(StateKind::Explore));
        assert_eq!(state.progress().stage, ForkStage::Done);
        assert_eq!(
            fx.observer.count(|event| matches!(event, PlannerEvent::ReproductionTimedOut { .. })),
            1
        );
    }

    #[test]
    fn failing_spawner_is_marked_created_anyway() {
        let spawner = Arc::new(RecordingSpawner::failing());
        let mut fx = fixture(2, 30);
        let mut state = probing(&mut fx, &spawner);
        deliver(&mut state, &mut fx, &slots("1"));
        state.execute(&fx.ctx);
        state.execute(&fx.ctx);
        state.execute(&fx.ctx);
        assert_eq!(spawner.calls(), 1);
        assert!(state.progress().new_agent_created);
        assert_eq!(
            fx.observer.count(|event| matches!(event, PlannerEvent::AgentCreationFailed { .. })),
            1
        );
    }

    #[test]
    fn events_respect_the_reserve() {
        let spawner = Arc::new(RecordingSpawner::new());
        let mut fx = fixture(2, 30);
        let mut state = probing(&mut fx, &spawner);
        assert_eq!(state.on_event(Event::FoodEmergency, &fx.ctx), Some(StateKind::Emergency));
        assert_eq!(state.on_event(Event::FoodLow, &fx.ctx), None);
        fx.ctx.model.set_food(13);
        assert_eq!(state.on_event(Event::FoodLow, &fx.ctx), Some(StateKind::CollectFood));
        assert_eq!(state.on_event(Event::ResourcesCollected, &fx.ctx), None);
    }

    #[test]
    fn exit_records_the_outcome() {
        let spawner = Arc::new(RecordingSpawner::new());
        let mut fx = fixture(2, 30);
        let mut state = probing(&mut fx, &spawner);
        deliver(&mut state, &mut fx, &slots("1"));
        state.execute(&fx.ctx);
        state.execute(&fx.ctx);
        fx.clock.advance(Duration::from_secs(3));
        state.on_exit(&mut fx.ctx);

        assert_eq!(fx.ctx.reproduction.completed, 1);
        assert_eq!(fx.ctx.reproduction.attempts, 1);
        assert_eq!(fx.ctx.reproduction.last_attempt, Some(Duration::from_secs(3)));
        assert_eq!(state.progress(), &ReproductionProgress::default());
    }

    #[test]
    fn on_enter_is_idempotent() {
        let spawner = Arc::new(RecordingSpawner::new());
        let mut fx = fixture(2, 30);
        let mut state = probing(&mut fx, &spawner);
        deliver(&mut state, &mut fx, &CommandResult::failure(Action::ConnectNbr, None));

        state.on_enter(&mut fx.ctx);
        let once = state.progress().clone();
        state.on_enter(&mut fx.ctx);
        assert_eq!(state.progress(), &once);
        assert_eq!(once.stage, ForkStage::Init);
        assert_eq!(once.fork_attempts, 0);
    }

    #[test]
    fn owns_slot_commands_only() {
        let spawner = Arc::new(RecordingSpawner::new());
        let state = state(&spawner);
        assert!(state.owns(CommandKind::ConnectNbr));
        assert!(state.owns(CommandKind::Fork));
        assert!(!state.owns(CommandKind::Take));
        assert!(!state.owns(CommandKind::Look));
    }
}
