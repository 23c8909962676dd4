//! Configuration loading and typed config structures for the Zappy agent.
//!
//! The canonical configuration lives in `zappy-config.yaml` at the project
//! root. This module defines strongly-typed structs that mirror the YAML
//! structure, and provides a loader that reads it. Every field has a default,
//! so an empty document yields the stock planner.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use zappy_agent::FoodAlertConfig;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
///
/// Mirrors the structure of `zappy-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ZappyConfig {
    /// Decision-making parameters.
    #[serde(default)]
    pub planner: PlannerConfig,

    /// In-memory world used by the engine binary.
    #[serde(default)]
    pub world: WorldConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ZappyConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `ZAPPY_LOG` overrides `logging.level` when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.logging.apply_env_overrides();
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Planner
// ---------------------------------------------------------------------------

/// Parameters shared by every planner state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PlannerConfig {
    /// Resource collection tuning.
    #[serde(default)]
    pub collection: CollectionConfig,

    /// Reproduction tuning.
    #[serde(default)]
    pub reproduction: ReproductionConfig,

    /// Food alert thresholds.
    #[serde(default)]
    pub food: FoodAlertConfig,

    /// Exploration tuning.
    #[serde(default)]
    pub exploration: ExplorationConfig,
}

/// One tier of the food safety floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SafetyTier {
    /// Tier applies from this level upwards.
    pub min_level: u32,
    /// Percentage applied to the base floor.
    pub percent: u32,
}

/// Resource collection tuning.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CollectionConfig {
    /// Milliseconds between periodic inventory queries (default: 12000).
    #[serde(default = "default_inventory_interval_ms")]
    pub inventory_interval_ms: u64,

    /// Maximum number of movement commands kept from one planned path (default: 10).
    #[serde(default = "default_path_cap")]
    pub path_cap: usize,

    /// Consecutive take failures before a kind is blacklisted (default: 2).
    #[serde(default = "default_take_failure_limit")]
    pub take_failure_limit: u32,

    /// Consecutive movement failures before the path is dropped (default: 2).
    #[serde(default = "default_stuck_move_limit")]
    pub stuck_move_limit: u32,

    /// Food floor at low levels (default: 25).
    #[serde(default = "default_food_safety_base")]
    pub food_safety_base: u32,

    /// Level-scaled tiers; only the highest matching tier applies
    /// (default: 140% from level 4, 180% from level 7).
    #[serde(default = "default_food_safety_tiers")]
    pub food_safety_tiers: Vec<SafetyTier>,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            inventory_interval_ms: default_inventory_interval_ms(),
            path_cap: default_path_cap(),
            take_failure_limit: default_take_failure_limit(),
            stuck_move_limit: default_stuck_move_limit(),
            food_safety_base: default_food_safety_base(),
            food_safety_tiers: default_food_safety_tiers(),
        }
    }
}

impl CollectionConfig {
    /// Interval between periodic inventory queries.
    pub const fn inventory_interval(&self) -> Duration {
        Duration::from_millis(self.inventory_interval_ms)
    }

    /// Food count at or below which collection hands over to food gathering.
    pub fn safety_threshold(&self, level: u32) -> u32 {
        let percent = self
            .food_safety_tiers
            .iter()
            .filter(|tier| tier.min_level <= level)
            .max_by_key(|tier| tier.min_level)
            .map_or(100, |tier| tier.percent);
        scale_percent(self.food_safety_base, percent)
    }
}

/// Reproduction tuning.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReproductionConfig {
    /// Estimated food spent by a fork (default: 3).
    #[serde(default = "default_fork_cost")]
    pub fork_cost: u32,

    /// Extra food kept in reserve on top of the fork cost (default: 10).
    #[serde(default = "default_safety_margin")]
    pub safety_margin: u32,

    /// Level from which the reserve is scaled up (default: 3).
    #[serde(default = "default_scaled_from_level")]
    pub scaled_from_level: u32,

    /// Percentage applied to the reserve from that level (default: 150).
    #[serde(default = "default_scaled_percent")]
    pub scaled_percent: u32,

    /// Milliseconds an activation may last before it is abandoned (default: 30000).
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Probe and fork failures tolerated per activation (default: 2).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Lowest level at which exploration considers reproducing (default: 2).
    #[serde(default = "default_min_level")]
    pub min_level: u32,

    /// Milliseconds between two reproduction attempts (default: 60000).
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
}

impl Default for ReproductionConfig {
    fn default() -> Self {
        Self {
            fork_cost: default_fork_cost(),
            safety_margin: default_safety_margin(),
            scaled_from_level: default_scaled_from_level(),
            scaled_percent: default_scaled_percent(),
            timeout_ms: default_timeout_ms(),
            max_attempts: default_max_attempts(),
            min_level: default_min_level(),
            cooldown_ms: default_cooldown_ms(),
        }
    }
}

impl ReproductionConfig {
    /// Food that must be held before forking at `level`.
    pub fn min_food_for_fork(&self, level: u32) -> u32 {
        let reserve = self.fork_cost.saturating_add(self.safety_margin);
        if level >= self.scaled_from_level {
            scale_percent(reserve, self.scaled_percent)
        } else {
            reserve
        }
    }

    /// Wall-clock budget for one activation.
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Minimum spacing between attempts.
    pub const fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

/// Exploration tuning.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExplorationConfig {
    /// Forward steps taken before considering a turn (default: 4).
    #[serde(default = "default_run_length")]
    pub run_length: u32,
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        Self {
            run_length: default_run_length(),
        }
    }
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// In-memory world used by the engine binary.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorldConfig {
    /// Map width in tiles (default: 10).
    #[serde(default = "default_width")]
    pub width: u32,

    /// Map height in tiles (default: 10).
    #[serde(default = "default_height")]
    pub height: u32,

    /// Random seed for resource placement (default: 42).
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Milliseconds between two agent ticks (default: 20).
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// World ticks before shutdown (default: 2000).
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,

    /// Free team slots at start (default: 2).
    #[serde(default = "default_team_slots")]
    pub team_slots: u32,

    /// Upper bound on concurrently running agents (default: 6).
    #[serde(default = "default_max_agents")]
    pub max_agents: u32,

    /// World ticks per unit of food consumed (default: 126).
    #[serde(default = "default_food_interval_ticks")]
    pub food_interval_ticks: u64,

    /// World ticks between resource regeneration passes (default: 20).
    #[serde(default = "default_regeneration_interval_ticks")]
    pub regeneration_interval_ticks: u64,

    /// Food held by a newly connected agent (default: 10).
    #[serde(default = "default_starting_food")]
    pub starting_food: u32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            seed: default_seed(),
            tick_interval_ms: default_tick_interval_ms(),
            max_ticks: default_max_ticks(),
            team_slots: default_team_slots(),
            max_agents: default_max_agents(),
            food_interval_ticks: default_food_interval_ticks(),
            regeneration_interval_ticks: default_regeneration_interval_ticks(),
            starting_food: default_starting_food(),
        }
    }
}

impl WorldConfig {
    /// Interval between two agent ticks.
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, e.g. `info` or `zappy_core=debug` (default: info).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output (default: false).
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl LoggingConfig {
    /// Override the level with `ZAPPY_LOG` when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("ZAPPY_LOG") {
            self.level = val;
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers and defaults
// ---------------------------------------------------------------------------

fn scale_percent(value: u32, percent: u32) -> u32 {
    value
        .checked_mul(percent)
        .and_then(|scaled| scaled.checked_div(100))
        .unwrap_or(u32::MAX)
}

const fn default_inventory_interval_ms() -> u64 {
    12_000
}

const fn default_path_cap() -> usize {
    10
}

const fn default_take_failure_limit() -> u32 {
    2
}

const fn default_stuck_move_limit() -> u32 {
    2
}

const fn default_food_safety_base() -> u32 {
    25
}

fn default_food_safety_tiers() -> Vec<SafetyTier> {
    vec![
        SafetyTier {
            min_level: 4,
            percent: 140,
        },
        SafetyTier {
            min_level: 7,
            percent: 180,
        },
    ]
}

const fn default_fork_cost() -> u32 {
    3
}

const fn default_safety_margin() -> u32 {
    10
}

const fn default_scaled_from_level() -> u32 {
    3
}

const fn default_scaled_percent() -> u32 {
    150
}

const fn default_timeout_ms() -> u64 {
    30_000
}

const fn default_max_attempts() -> u32 {
    2
}

const fn default_min_level() -> u32 {
    2
}

const fn default_cooldown_ms() -> u64 {
    60_000
}

const fn default_run_length() -> u32 {
    4
}

const fn default_width() -> u32 {
    10
}

const fn default_height() -> u32 {
    10
}

const fn default_seed() -> u64 {
    42
}

const fn default_tick_interval_ms() -> u64 {
    20
}

const fn default_max_ticks() -> u64 {
    2000
}

const fn default_team_slots() -> u32 {
    2
}

const fn default_max_agents() -> u32 {
    6
}

const fn default_food_interval_ticks() -> u64 {
    126
}

const fn default_regeneration_interval_ticks() -> u64 {
    20
}

const fn default_starting_food() -> u32 {
    10
}

fn default_log_level() -> String {
    String::from("info")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ZappyConfig::default();
        assert_eq!(config.planner.collection.path_cap, 10);
        assert_eq!(config.planner.collection.inventory_interval(), Duration::from_secs(12));
        assert_eq!(config.planner.reproduction.timeout(), Duration::from_secs(30));
        assert_eq!(config.planner.food.low_threshold, 20);
        assert_eq!(config.world.seed, 42);
    }

    #[test]
    fn safety_threshold_tiers() {
        let collection = CollectionConfig::default();
        assert_eq!(collection.safety_threshold(1), 25);
        assert_eq!(collection.safety_threshold(3), 25);
        assert_eq!(collection.safety_threshold(4), 35);
        assert_eq!(collection.safety_threshold(6), 35);
        assert_eq!(collection.safety_threshold(7), 45);
        assert_eq!(collection.safety_threshold(8), 45);
    }

    #[test]
    fn safety_threshold_is_monotonic() {
        let collection = CollectionConfig::default();
        let thresholds: Vec<u32> = (1..=8).map(|level| collection.safety_threshold(level)).collect();
        assert!(thresholds.windows(2).all(|pair| pair.first() <= pair.last()));
    }

    #[test]
    fn min_food_for_fork_scales_from_level_three() {
        let reproduction = ReproductionConfig::default();
        assert_eq!(reproduction.min_food_for_fork(1), 13);
        assert_eq!(reproduction.min_food_for_fork(2), 13);
        assert_eq!(reproduction.min_food_for_fork(3), 19);
        assert_eq!(reproduction.min_food_for_fork(8), 19);
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r"
planner:
  collection:
    inventory_interval_ms: 6000
    path_cap: 6
    food_safety_base: 30
    food_safety_tiers:
      - min_level: 2
        percent: 200
  reproduction:
    timeout_ms: 10000
    max_attempts: 3
  food:
    low_threshold: 25
    satiated: 60
  exploration:
    run_length: 3
world:
  width: 20
  height: 15
  seed: 7
  max_agents: 3
logging:
  json: true
";
        let config = ZappyConfig::parse(yaml);
        assert!(config.is_ok(), "parse failed: {config:?}");
        let config = config.unwrap_or_default();
        assert_eq!(config.planner.collection.path_cap, 6);
        assert_eq!(config.planner.collection.safety_threshold(1), 30);
        assert_eq!(config.planner.collection.safety_threshold(2), 60);
        assert_eq!(config.planner.collection.take_failure_limit, 2);
        assert_eq!(config.planner.reproduction.max_attempts, 3);
        assert_eq!(config.planner.reproduction.fork_cost, 3);
        assert_eq!(config.planner.food.low_threshold, 25);
        assert_eq!(config.planner.food.emergency_threshold, 10);
        assert_eq!(config.planner.exploration.run_length, 3);
        assert_eq!(config.world.width, 20);
        assert_eq!(config.world.max_agents, 3);
        assert!(config.logging.json);
    }

    #[test]
    fn parse_empty_yaml() {
        let config = ZappyConfig::parse("");
        assert!(config.is_ok());
    }

    #[test]
    fn parse_invalid_yaml_is_an_error() {
        let config = ZappyConfig::parse("planner: [unclosed");
        assert!(matches!(config, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("zappy-config.yaml");
        if path.exists() {
            let config = ZappyConfig::from_file(&path);
            assert!(config.is_ok(), "Failed to load project config: {config:?}");
        }
    }
}
