//! Error types for the engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during engine startup and the run itself.

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: zappy_core::ConfigError,
    },

    /// World construction or a world request failed.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: crate::world::WorldError,
    },

    /// The first agent could not be started.
    #[error("spawner error: {source}")]
    Spawner {
        /// The underlying spawner error.
        #[from]
        source: zappy_core::SpawnError,
    },

    /// A background task panicked or was cancelled.
    #[error("task error: {message}")]
    Task {
        /// Description of the task failure.
        message: String,
    },

    /// The tracing subscriber could not be installed.
    #[error("logging error: {message}")]
    Logging {
        /// Description of the failure.
        message: String,
    },
}
