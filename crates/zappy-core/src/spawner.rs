//! The create-agent capability consumed by the reproduction state.
//!
//! The planner only triggers agent creation; the spawned agent runs on its
//! own and is never awaited or supervised from here.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Errors reported by an [`AgentSpawner`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpawnError {
    /// The host refuses to run more agents.
    #[error("agent limit of {limit} reached")]
    LimitReached {
        /// Configured maximum.
        limit: u32,
    },

    /// The host could not start the agent.
    #[error("spawner unavailable: {reason}")]
    Unavailable {
        /// Description of the failure.
        reason: String,
    },
}

/// Starts a brand-new agent alongside the current one.
pub trait AgentSpawner: Send + Sync {
    /// Hand off creation of one agent without waiting for it to run.
    fn create_new_agent(&self) -> Result<(), SpawnError>;
}

/// A spawner that only counts calls, optionally failing each one.
#[derive(Debug, Default)]
pub struct RecordingSpawner {
    calls: AtomicU32,
    fail: AtomicBool,
}

impl RecordingSpawner {
    /// A spawner whose calls succeed.
    pub const fn new() -> Self {
        Self {
            calls: AtomicU32::new(0),
            fail: AtomicBool::new(false),
        }
    }

    /// A spawner whose calls fail with [`SpawnError::Unavailable`].
    pub const fn failing() -> Self {
        Self {
            calls: AtomicU32::new(0),
            fail: AtomicBool::new(true),
        }
    }

    /// Number of `create_new_agent` calls so far.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AgentSpawner for RecordingSpawner {
    fn create_new_agent(&self) -> Result<(), SpawnError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(SpawnError::Unavailable {
                reason: String::from("recording spawner set to fail"),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_spawner_counts_calls() {
        let spawner = RecordingSpawner::new();
        assert!(spawner.create_new_agent().is_ok());
        assert!(spawner.create_new_agent().is_ok());
        assert_eq!(spawner.calls(), 2);
    }

    #[test]
    fn failing_spawner_still_counts() {
        let spawner = RecordingSpawner::failing();
        assert!(matches!(
            spawner.create_new_agent(),
            Err(SpawnError::Unavailable { .. })
        ));
        assert_eq!(spawner.calls(), 1);
    }
}
