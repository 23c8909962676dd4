//! Engine binary for the Zappy agent.
//!
//! Runs a team of planner-driven agents against an in-memory world that
//! answers in the game server's wire formats.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `zappy-config.yaml` (or `ZAPPY_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Build the world and start its task
//! 4. Start the first agent through the task spawner
//! 5. Wait for the tick limit, then for every agent task
//! 6. Log the result

mod agent;
mod error;
mod server;
mod spawner;
mod world;

use std::path::PathBuf;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use zappy_core::config::{LoggingConfig, ZappyConfig};

use crate::agent::AgentOutcome;
use crate::error::EngineError;
use crate::spawner::TaskSpawner;
use crate::world::World;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "zappy-config.yaml";

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if configuration, logging, the world or the first agent
/// cannot be set up, or if the world task fails.
#[tokio::main]
async fn main() -> Result<(), EngineError> {
    // 1. Load configuration.
    let (config, source) = load_config()?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging)?;
    info!(
        config = source.as_ref().map_or_else(|| String::from("defaults"), |path| path.display().to_string()),
        "zappy-engine starting"
    );
    info!(
        width = config.world.width,
        height = config.world.height,
        seed = config.world.seed,
        max_ticks = config.world.max_ticks,
        max_agents = config.world.max_agents,
        "Configuration loaded"
    );

    // 3. Build the world and start its task.
    let world = World::new(&config.world)?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (handle, world_task) = server::spawn_world(
        world,
        config.world.tick_interval(),
        config.world.max_ticks,
        shutdown_tx,
    );

    // 4. Start the first agent.
    let spawner = TaskSpawner::new(
        Handle::current(),
        handle,
        config.planner.clone(),
        config.world.tick_interval(),
        config.world.max_agents,
        shutdown_rx,
    );
    let first = spawner.spawn_agent()?;
    info!(agent_id = %first, "first agent started");

    // 5. Wait for the world, then for the agents.
    let summary = world_task.await.map_err(|err| EngineError::Task {
        message: err.to_string(),
    })?;
    let outcomes = spawner.join_all().await;

    // 6. Log results.
    for outcome in &outcomes {
        debug!(agent_id = %outcome.agent(), actions = outcome.actions(), outcome = ?outcome, "agent finished");
    }
    let actions: u64 = outcomes.iter().map(AgentOutcome::actions).sum();
    let starved = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, AgentOutcome::Starved { .. }))
        .count();
    let survived = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, AgentOutcome::Stopped { .. }))
        .count();
    info!(
        ticks = summary.ticks,
        agents = outcomes.len(),
        survived,
        starved,
        starved_in_world = summary.starved,
        actions,
        population = summary.population,
        "zappy-engine shutdown complete"
    );

    Ok(())
}

/// Load configuration from `ZAPPY_CONFIG` or `zappy-config.yaml`.
///
/// A missing default file yields the built-in defaults; a missing file named
/// through `ZAPPY_CONFIG` is an error.
fn load_config() -> Result<(ZappyConfig, Option<PathBuf>), EngineError> {
    if let Ok(path) = std::env::var("ZAPPY_CONFIG") {
        let path = PathBuf::from(path);
        let config = ZappyConfig::from_file(&path)?;
        return Ok((config, Some(path)));
    }

    let path = PathBuf::from(DEFAULT_CONFIG_PATH);
    if path.exists() {
        let config = ZappyConfig::from_file(&path)?;
        Ok((config, Some(path)))
    } else {
        let mut config = ZappyConfig::default();
        config.logging.apply_env_overrides();
        Ok((config, None))
    }
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
fn init_tracing(logging: &LoggingConfig) -> Result<(), EngineError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let installed = if logging.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|err| EngineError::Logging {
        message: err.to_string(),
    })
}
