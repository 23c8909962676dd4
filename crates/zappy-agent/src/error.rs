//! Error types for the zappy-agent crate.
//!
//! All operations that can fail return typed errors rather than panicking.
//! None of these are fatal to a running planner: callers report them and
//! keep the previous model state.

use zappy_types::{CommandKind, ResourceKind};

/// Errors that can occur while updating or querying the agent model.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// A reply payload could not be parsed.
    #[error("malformed {command:?} payload {payload:?}: {reason}")]
    MalformedPayload {
        /// The command whose reply was malformed.
        command: CommandKind,
        /// The raw payload.
        payload: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A command that returns data resolved without a payload.
    #[error("{0:?} result carried no payload")]
    MissingPayload(CommandKind),

    /// A payload named a resource the game does not have.
    #[error("unknown resource name: {0}")]
    UnknownResource(String),

    /// Attempted to remove more of a resource than the agent holds.
    #[error("insufficient resource: wanted {requested} of {resource} but only have {available}")]
    InsufficientResource {
        /// The resource type being removed.
        resource: ResourceKind,
        /// The quantity the caller attempted to remove.
        requested: u32,
        /// The quantity the agent actually holds.
        available: u32,
    },

    /// An arithmetic overflow occurred while updating a counter.
    #[error("arithmetic overflow: {context}")]
    ArithmeticOverflow {
        /// Description of what was being computed.
        context: String,
    },

    /// A level outside `1..=8`.
    #[error("invalid level: {0}")]
    InvalidLevel(u32),
}
