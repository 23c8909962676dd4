//! Enumeration types for the Zappy agent planner.
//!
//! Resource names, orientation and command kinds mirror the game server's
//! vocabulary so that wire payloads can be mapped onto them directly.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// An item lying on a map tile or carried by an agent.
///
/// Declaration order matches the server's numbering (food is 0, thystame 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Food units keep the agent alive.
    Food,
    /// The most common stone.
    Linemate,
    /// Second most common stone.
    Deraumere,
    /// Mid-rarity stone.
    Sibur,
    /// Mid-rarity stone.
    Mendiane,
    /// Rare stone.
    Phiras,
    /// The rarest stone.
    Thystame,
}

impl ResourceKind {
    /// Every resource kind, in server order.
    pub const ALL: [Self; 7] = [
        Self::Food,
        Self::Linemate,
        Self::Deraumere,
        Self::Sibur,
        Self::Mendiane,
        Self::Phiras,
        Self::Thystame,
    ];

    /// The six incantation stones, in server order.
    pub const STONES: [Self; 6] = [
        Self::Linemate,
        Self::Deraumere,
        Self::Sibur,
        Self::Mendiane,
        Self::Phiras,
        Self::Thystame,
    ];

    /// Lowercase wire name (`"linemate"`, `"food"`, ...).
    pub const fn name(self) -> &'static str {
        match self {
            Self::Food => "food",
            Self::Linemate => "linemate",
            Self::Deraumere => "deraumere",
            Self::Sibur => "sibur",
            Self::Mendiane => "mendiane",
            Self::Phiras => "phiras",
            Self::Thystame => "thystame",
        }
    }

    /// Look up a resource by its wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Whether this kind is one of the incantation stones.
    pub const fn is_stone(self) -> bool {
        !matches!(self, Self::Food)
    }

    /// Spawn density on the map, in tiles per thousand.
    pub const fn density_per_mille(self) -> u32 {
        match self {
            Self::Food => 500,
            Self::Linemate => 300,
            Self::Deraumere => 150,
            Self::Sibur | Self::Mendiane => 100,
            Self::Phiras => 80,
            Self::Thystame => 50,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a string does not name a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownResource(pub String);

impl fmt::Display for UnknownResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown resource: {}", self.0)
    }
}

impl std::error::Error for UnknownResource {}

impl FromStr for ResourceKind {
    type Err = UnknownResource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| UnknownResource(s.to_owned()))
    }
}

// ---------------------------------------------------------------------------
// Orientation
// ---------------------------------------------------------------------------

/// The cardinal direction an agent faces.
///
/// Unit vectors use screen coordinates: north is `(0, -1)`, south `(0, 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Facing up the map.
    North,
    /// Facing right.
    East,
    /// Facing down the map.
    South,
    /// Facing left.
    West,
}

impl Direction {
    /// Direction after a `Left` command (counter-clockwise quarter turn).
    #[must_use]
    pub const fn turned_left(self) -> Self {
        match self {
            Self::North => Self::West,
            Self::West => Self::South,
            Self::South => Self::East,
            Self::East => Self::North,
        }
    }

    /// Direction after a `Right` command (clockwise quarter turn).
    #[must_use]
    pub const fn turned_right(self) -> Self {
        match self {
            Self::North => Self::East,
            Self::East => Self::South,
            Self::South => Self::West,
            Self::West => Self::North,
        }
    }

    /// Unit step `(dx, dy)` taken by a `Forward` command.
    pub const fn vector(self) -> (i32, i32) {
        match self {
            Self::North => (0, -1),
            Self::East => (1, 0),
            Self::South => (0, 1),
            Self::West => (-1, 0),
        }
    }

    /// Direction after applying a movement primitive.
    #[must_use]
    pub const fn after(self, command: MovementCommand) -> Self {
        match command {
            MovementCommand::Forward => self,
            MovementCommand::Left => self.turned_left(),
            MovementCommand::Right => self.turned_right(),
        }
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// A primitive movement command produced by the path planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementCommand {
    /// Step one tile in the facing direction.
    Forward,
    /// Rotate a quarter turn counter-clockwise.
    Left,
    /// Rotate a quarter turn clockwise.
    Right,
}

/// The kind of a command, without its parameters.
///
/// Used to key last-known results and to decide which state owns a
/// late-arriving result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CommandKind {
    /// `Forward`.
    Forward,
    /// `Left`.
    Left,
    /// `Right`.
    Right,
    /// `Take <resource>`.
    Take,
    /// `Inventory`.
    Inventory,
    /// `Look`.
    Look,
    /// `Connect_nbr` (free slot probe).
    ConnectNbr,
    /// `Fork`.
    Fork,
}

impl CommandKind {
    /// Whether this kind moves or rotates the agent.
    pub const fn is_movement(self) -> bool {
        matches!(self, Self::Forward | Self::Left | Self::Right)
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// A signal raised by the agent model and offered once to the active state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Event {
    /// Food dropped to the emergency threshold.
    FoodEmergency,
    /// Food dropped to the low threshold.
    FoodLow,
    /// Every resource required for the next incantation is held.
    ResourcesCollected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_names_round_trip_through_from_str() {
        for kind in ResourceKind::ALL {
            assert_eq!(kind.name().parse::<ResourceKind>(), Ok(kind));
        }
        assert!("player".parse::<ResourceKind>().is_err());
    }

    #[test]
    fn stones_exclude_food() {
        assert!(!ResourceKind::Food.is_stone());
        assert!(ResourceKind::STONES.iter().all(|kind| kind.is_stone()));
    }

    #[test]
    fn resources_serialize_with_wire_names() {
        let json = serde_json::to_string(&ResourceKind::Thystame).unwrap_or_default();
        assert_eq!(json, "\"thystame\"");
    }

    #[test]
    fn four_turns_return_to_start() {
        let mut facing = Direction::North;
        for _ in 0..4 {
            facing = facing.turned_right();
        }
        assert_eq!(facing, Direction::North);
        assert_eq!(Direction::North.turned_left(), Direction::West);
        assert_eq!(Direction::West.turned_right(), Direction::North);
    }

    #[test]
    fn forward_keeps_direction() {
        assert_eq!(Direction::East.after(MovementCommand::Forward), Direction::East);
        assert_eq!(Direction::East.after(MovementCommand::Left), Direction::North);
        assert_eq!(Direction::East.after(MovementCommand::Right), Direction::South);
    }

    #[test]
    fn only_moves_and_turns_are_movement() {
        assert!(CommandKind::Forward.is_movement());
        assert!(CommandKind::Right.is_movement());
        assert!(!CommandKind::Take.is_movement());
        assert!(!CommandKind::Fork.is_movement());
    }
}
