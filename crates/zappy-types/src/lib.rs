//! Shared type definitions for the Zappy agent planner.
//!
//! This crate is the vocabulary every other crate in the workspace speaks:
//! the resources found on the map, the agent's orientation, the primitive
//! commands it can issue, the results those commands resolve to, and the
//! events raised by the agent model.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrapper for agent identifiers
//! - [`enums`] -- Resources, orientation, movement primitives, command kinds, events
//! - [`actions`] -- Issued actions and their resolved results
//! - [`position`] -- Relative tile offsets

pub mod actions;
pub mod enums;
pub mod ids;
pub mod position;

// Re-export all public types at crate root for convenience.
pub use actions::{Action, CommandResult};
pub use enums::{CommandKind, Direction, Event, MovementCommand, ResourceKind, UnknownResource};
pub use ids::AgentId;
pub use position::RelativePosition;
