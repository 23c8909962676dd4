//! Parsing of the server's reply payloads into model values.
//!
//! Formats:
//!
//! - look: `[player food linemate, food, , thystame]` -- one comma-separated
//!   entry per tile, line by line, line `l` holding `2l + 1` tiles ordered
//!   from offset `-l` to `l`; a word repeated `n` times means `n` units.
//! - inventory: `[food 10, linemate 0, deraumere 1, ...]`
//! - connect_nbr: a bare decimal count.

use std::collections::BTreeMap;

use zappy_types::{CommandKind, Direction, RelativePosition, ResourceKind};

use crate::error::AgentError;
use crate::vision::TileObservation;

/// Word the server uses for an agent standing on a tile.
const PLAYER_WORD: &str = "player";

/// World-aligned offset of the look tile at `line`, `offset` for an agent facing `facing`.
pub const fn look_position(facing: Direction, line: i32, offset: i32) -> RelativePosition {
    match facing {
        Direction::North => RelativePosition::new(offset, line.saturating_neg()),
        Direction::South => RelativePosition::new(offset, line),
        Direction::East => RelativePosition::new(line, offset),
        Direction::West => RelativePosition::new(line.saturating_neg(), offset),
    }
}

/// Parse a look reply observed while facing `facing`.
pub fn parse_look(payload: &str, facing: Direction) -> Result<Vec<TileObservation>, AgentError> {
    let body = strip_brackets(payload, CommandKind::Look)?;
    let mut tiles = Vec::new();
    let mut line: i32 = 0;
    let mut offset: i32 = 0;

    for entry in body.split(',') {
        let mut tile = TileObservation::empty(look_position(facing, line, offset));
        for word in entry.split_whitespace() {
            if word == PLAYER_WORD {
                tile.players = tile.players.saturating_add(1);
                continue;
            }
            let resource = ResourceKind::from_name(word)
                .ok_or_else(|| AgentError::UnknownResource(word.to_owned()))?;
            let count = tile.resources.entry(resource).or_insert(0);
            *count = count.saturating_add(1);
        }
        tiles.push(tile);

        if offset >= line {
            line = line.saturating_add(1);
            offset = line.saturating_neg();
        } else {
            offset = offset.saturating_add(1);
        }
    }

    Ok(tiles)
}

/// Parse an inventory reply into per-resource counts (food included).
pub fn parse_inventory(payload: &str) -> Result<BTreeMap<ResourceKind, u32>, AgentError> {
    let body = strip_brackets(payload, CommandKind::Inventory)?;
    let mut counts = BTreeMap::new();

    for entry in body.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
        let mut words = entry.split_whitespace();
        let (Some(name), Some(raw), None) = (words.next(), words.next(), words.next()) else {
            return Err(malformed(CommandKind::Inventory, payload, format!("bad entry {entry:?}")));
        };
        let resource =
            ResourceKind::from_name(name).ok_or_else(|| AgentError::UnknownResource(name.to_owned()))?;
        let quantity = raw
            .parse::<u32>()
            .map_err(|err| malformed(CommandKind::Inventory, payload, err.to_string()))?;
        counts.insert(resource, quantity);
    }

    Ok(counts)
}

/// Parse a connect_nbr reply into a free slot count.
pub fn parse_slot_count(payload: &str) -> Result<u32, AgentError> {
    payload
        .trim()
        .parse::<u32>()
        .map_err(|err| malformed(CommandKind::ConnectNbr, payload, err.to_string()))
}

fn strip_brackets(payload: &str, command: CommandKind) -> Result<&str, AgentError> {
    payload
        .trim()
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| malformed(command, payload, String::from("expected [ ... ]")))
}

fn malformed(command: CommandKind, payload: &str, reason: String) -> AgentError {
    AgentError::MalformedPayload {
        command,
        payload: payload.to_owned(),
        reason,
    }
}
