//! Tile offsets relative to the agent.

use serde::{Deserialize, Serialize};

/// A world-aligned offset `(dx, dy)` from the agent's own tile.
///
/// `dx` grows to the east and `dy` grows to the south, matching
/// [`Direction::vector`](crate::Direction::vector).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct RelativePosition {
    /// East-west offset in tiles.
    pub dx: i32,
    /// North-south offset in tiles.
    pub dy: i32,
}

impl RelativePosition {
    /// The agent's own tile.
    pub const ORIGIN: Self = Self { dx: 0, dy: 0 };

    /// Build an offset.
    pub const fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }

    /// Whether this is the agent's own tile.
    pub const fn is_origin(self) -> bool {
        self.dx == 0 && self.dy == 0
    }

    /// Manhattan distance from the agent.
    pub const fn manhattan(self) -> u32 {
        self.dx.unsigned_abs().saturating_add(self.dy.unsigned_abs())
    }
}

impl From<(i32, i32)> for RelativePosition {
    fn from((dx, dy): (i32, i32)) -> Self {
        Self { dx, dy }
    }
}

impl core::fmt::Display for RelativePosition {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {})", self.dx, self.dy)
    }
}
