//! The agent's mutable ground truth.
//!
//! [`AgentModel`] holds level, food, stone inventory, orientation and the
//! vision snapshot. The command layer folds every resolved result into it
//! through [`AgentModel::apply_result`], which returns the events raised by
//! the resulting change.
//!
//! Events are edge triggered: crossing into the low or emergency food band
//! raises one event, staying there raises nothing, and recovering above the
//! low threshold re-arms both.

use std::collections::BTreeMap;

use zappy_types::{Action, CommandResult, Direction, Event, ResourceKind};

use crate::config::FoodAlertConfig;
use crate::elevation::requirements_for_level;
use crate::error::AgentError;
use crate::inventory;
use crate::perception::{parse_inventory, parse_look};
use crate::vision::VisionSnapshot;

/// Which food band the agent was last seen in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum FoodBand {
    Normal,
    Low,
    Emergency,
}

/// Level, food, inventory, orientation and vision of one agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentModel {
    level: u32,
    food_count: u32,
    inventory: BTreeMap<ResourceKind, u32>,
    orientation: Direction,
    vision: VisionSnapshot,
    requirements: BTreeMap<ResourceKind, u32>,
    alerts: FoodAlertConfig,
    band: FoodBand,
}

impl AgentModel {
    /// A model at `level` holding `food_count` food and no stones, facing north.
    pub fn new(level: u32, food_count: u32, alerts: FoodAlertConfig) -> Result<Self, AgentError> {
        let requirements = requirements_for_level(level)?.stones;
        let band = band_for(&alerts, food_count);
        Ok(Self {
            level,
            food_count,
            inventory: BTreeMap::new(),
            orientation: Direction::North,
            vision: VisionSnapshot::new(),
            requirements,
            alerts,
            band,
        })
    }

    /// Current elevation level.
    pub const fn level(&self) -> u32 {
        self.level
    }

    /// Units of food held.
    pub const fn food_count(&self) -> u32 {
        self.food_count
    }

    /// Stones held; absent kinds are zero.
    pub const fn inventory(&self) -> &BTreeMap<ResourceKind, u32> {
        &self.inventory
    }

    /// Facing direction.
    pub const fn orientation(&self) -> Direction {
        self.orientation
    }

    /// The latest vision snapshot.
    pub const fn vision(&self) -> &VisionSnapshot {
        &self.vision
    }

    /// Mutable access for local vision corrections (optimistic decrements).
    pub const fn vision_mut(&mut self) -> &mut VisionSnapshot {
        &mut self.vision
    }

    /// Stones needed for the incantation from the current level.
    pub const fn incantation_requirements(&self) -> &BTreeMap<ResourceKind, u32> {
        &self.requirements
    }

    /// Stones still missing for the next incantation.
    pub fn missing_resources(&self) -> BTreeMap<ResourceKind, u32> {
        inventory::missing_resources(&self.inventory, &self.requirements)
    }

    /// Overwrite the food count.
    pub fn set_food(&mut self, food_count: u32) -> Vec<Event> {
        self.food_count = food_count;
        self.food_events()
    }

    /// Set the facing direction.
    pub const fn set_orientation(&mut self, orientation: Direction) {
        self.orientation = orientation;
    }

    /// Add `amount` of `resource`; food goes to the food count.
    pub fn add_resource(&mut self, resource: ResourceKind, amount: u32) -> Result<Vec<Event>, AgentError> {
        if resource == ResourceKind::Food {
            let food = self.food_count.checked_add(amount).ok_or_else(|| AgentError::ArithmeticOverflow {
                context: format!("adding {amount} food"),
            })?;
            return Ok(self.set_food(food));
        }
        let before = self.missing_resources().is_empty();
        inventory::add_resource(&mut self.inventory, resource, amount)?;
        Ok(self.collection_events(before))
    }

    /// Fold a resolved command into the model.
    ///
    /// Failed commands leave the model untouched. On error the model is
    /// unchanged as well.
    pub fn apply_result(&mut self, result: &CommandResult) -> Result<Vec<Event>, AgentError> {
        if !result.succeeded {
            return Ok(Vec::new());
        }

        match result.action {
            Action::Look => {
                let payload = payload_of(result)?;
                let tiles = parse_look(payload, self.orientation)?;
                self.vision.replace(tiles);
                Ok(Vec::new())
            }
            Action::Inventory => {
                let payload = payload_of(result)?;
                let mut counts = parse_inventory(payload)?;
                let food = counts.remove(&ResourceKind::Food);
                let before = self.missing_resources().is_empty();
                counts.retain(|_, quantity| *quantity > 0);
                self.inventory = counts;
                let mut events = self.collection_events(before);
                if let Some(food) = food {
                    events.extend(self.set_food(food));
                }
                Ok(events)
            }
            Action::Take(resource) => self.add_resource(resource, 1),
            Action::Left | Action::Right | Action::Forward => {
                if let Some(movement) = result.action.movement() {
                    self.orientation = self.orientation.after(movement);
                }
                self.vision.mark_stale();
                Ok(Vec::new())
            }
            Action::ConnectNbr | Action::Fork => Ok(Vec::new()),
        }
    }

    fn food_events(&mut self) -> Vec<Event> {
        let band = band_for(&self.alerts, self.food_count);
        let previous = std::mem::replace(&mut self.band, band);
        if band <= previous {
            return Vec::new();
        }
        match band {
            FoodBand::Emergency => vec![Event::FoodEmergency],
            FoodBand::Low => vec![Event::FoodLow],
            FoodBand::Normal => Vec::new(),
        }
    }

    fn collection_events(&self, was_complete: bool) -> Vec<Event> {
        if !was_complete && self.missing_resources().is_empty() {
            vec![Event::ResourcesCollected]
        } else {
            Vec::new()
        }
    }
}

const fn band_for(alerts: &FoodAlertConfig, food: u32) -> FoodBand {
    if alerts.is_emergency(food) {
        FoodBand::Emergency
    } else if alerts.is_low(food) {
        FoodBand::Low
    } else {
        FoodBand::Normal
    }
}

fn payload_of(result: &CommandResult) -> Result<&str, AgentError> {
    result
        .payload
        .as_deref()
        .ok_or(AgentError::MissingPayload(result.kind()))
}
