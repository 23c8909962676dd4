//! Incantation requirements per level.
//!
//! Raising from level `n` to `n + 1` needs a number of agents on the same
//! tile and a fixed set of stones. Level 8 is the ceiling and has no
//! further requirements.

use std::collections::BTreeMap;

use zappy_types::ResourceKind;

use crate::error::AgentError;

/// The highest reachable level.
pub const MAX_LEVEL: u32 = 8;

/// Rows for levels 1..=7:
/// players, linemate, deraumere, sibur, mendiane, phiras, thystame.
const ELEVATION_TABLE: [[u32; 7]; 7] = [
    [1, 1, 0, 0, 0, 0, 0],
    [2, 1, 1, 1, 0, 0, 0],
    [2, 2, 0, 1, 0, 2, 0],
    [4, 1, 1, 2, 0, 1, 0],
    [4, 1, 2, 1, 3, 0, 0],
    [6, 1, 2, 3, 0, 1, 0],
    [6, 2, 2, 2, 2, 2, 1],
];

/// What an incantation from a given level needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElevationRequirement {
    /// Agents of the same level that must share the tile.
    pub players: u32,
    /// Stones consumed by the ritual; zero quantities are omitted.
    pub stones: BTreeMap<ResourceKind, u32>,
}

/// Requirements for raising from `level` to `level + 1`.
///
/// Returns an empty requirement at [`MAX_LEVEL`].
pub fn requirements_for_level(level: u32) -> Result<ElevationRequirement, AgentError> {
    if level == MAX_LEVEL {
        return Ok(ElevationRequirement::default());
    }
    let row = level
        .checked_sub(1)
        .and_then(|index| usize::try_from(index).ok())
        .and_then(|index| ELEVATION_TABLE.get(index))
        .ok_or(AgentError::InvalidLevel(level))?;

    let mut cells = row.iter().copied();
    let players = cells.next().unwrap_or(0);
    let stones = ResourceKind::STONES
        .into_iter()
        .zip(cells)
        .filter(|&(_, quantity)| quantity > 0)
        .collect();

    Ok(ElevationRequirement { players, stones })
}
