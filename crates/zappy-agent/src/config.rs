//! Food alert thresholds.
//!
//! The agent model raises [`Event::FoodLow`] and [`Event::FoodEmergency`]
//! when its food count crosses these values. The planner loads them from the
//! `planner.food` section of `zappy-config.yaml`.
//!
//! [`Event::FoodLow`]: zappy_types::Event::FoodLow
//! [`Event::FoodEmergency`]: zappy_types::Event::FoodEmergency

use serde::Deserialize;

/// Food thresholds shared by the agent model and the food states.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FoodAlertConfig {
    /// Food at or below this raises `FoodLow` (default: 20).
    #[serde(default = "default_low_threshold")]
    pub low_threshold: u32,

    /// Food at or below this raises `FoodEmergency` (default: 10).
    #[serde(default = "default_emergency_threshold")]
    pub emergency_threshold: u32,

    /// Food collection stops once this much is held (default: 50).
    #[serde(default = "default_satiated")]
    pub satiated: u32,

    /// Emergency foraging hands back to regular collection at this level (default: 20).
    #[serde(default = "default_emergency_recovered")]
    pub emergency_recovered: u32,
}

impl Default for FoodAlertConfig {
    fn default() -> Self {
        Self {
            low_threshold: default_low_threshold(),
            emergency_threshold: default_emergency_threshold(),
            satiated: default_satiated(),
            emergency_recovered: default_emergency_recovered(),
        }
    }
}

impl FoodAlertConfig {
    /// Whether `food` is at or below the low threshold.
    pub const fn is_low(&self, food: u32) -> bool {
        food <= self.low_threshold
    }

    /// Whether `food` is at or below the emergency threshold.
    pub const fn is_emergency(&self, food: u32) -> bool {
        food <= self.emergency_threshold
    }
}

const fn default_low_threshold() -> u32 {
    20
}

const fn default_emergency_threshold() -> u32 {
    10
}

const fn default_satiated() -> u32 {
    50
}

const fn default_emergency_recovered() -> u32 {
    20
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = FoodAlertConfig::default();
        assert_eq!(cfg.low_threshold, 20);
        assert_eq!(cfg.emergency_threshold, 10);
        assert_eq!(cfg.satiated, 50);
        assert_eq!(cfg.emergency_recovered, 20);
    }

    #[test]
    fn thresholds_are_inclusive() {
        let cfg = FoodAlertConfig::default();
        assert!(cfg.is_low(20));
        assert!(!cfg.is_low(21));
        assert!(cfg.is_emergency(10));
        assert!(!cfg.is_emergency(11));
    }
}
