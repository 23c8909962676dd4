//! Agent model, vision snapshot, and payload parsing for the Zappy agent planner.
//!
//! This crate holds the agent's ground truth and everything that operates on
//! it without touching I/O or planning. It sits between `zappy-types` (the
//! shared vocabulary) and `zappy-core` (the state machine that reads it).
//!
//! # Modules
//!
//! - [`config`] -- Food alert thresholds ([`FoodAlertConfig`])
//! - [`elevation`] -- Incantation requirements per level
//! - [`error`] -- Error types for model operations ([`AgentError`])
//! - [`inventory`] -- Inventory arithmetic and missing-resource computation
//! - [`model`] -- The mutable [`AgentModel`] and result application
//! - [`perception`] -- Parsing of look, inventory and slot-count payloads
//! - [`vision`] -- The queryable [`VisionSnapshot`]

pub mod config;
pub mod elevation;
pub mod error;
pub mod inventory;
pub mod model;
pub mod perception;
pub mod vision;

// Re-export primary types at crate root for convenience.
pub use config::FoodAlertConfig;
pub use elevation::{MAX_LEVEL, requirements_for_level};
pub use error::AgentError;
pub use inventory::missing_resources;
pub use model::AgentModel;
pub use vision::{TileObservation, VisionSnapshot};
