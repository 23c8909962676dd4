//! Issued actions and their resolved results.
//!
//! An [`Action`] is what the planner hands to the command layer on a tick.
//! The command layer eventually answers with a [`CommandResult`] carrying the
//! same action back, whether it succeeded, and the raw reply payload.

use serde::{Deserialize, Serialize};

use crate::enums::{CommandKind, MovementCommand, ResourceKind};

/// A single primitive command requested of the command layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Step one tile forward.
    Forward,
    /// Turn left.
    Left,
    /// Turn right.
    Right,
    /// Pick up one unit of a resource from the current tile.
    Take(ResourceKind),
    /// Query the carried inventory.
    Inventory,
    /// Query the visible tiles.
    Look,
    /// Probe how many agents can still join the team.
    ConnectNbr,
    /// Open a new team slot.
    Fork,
}

impl Action {
    /// The parameterless kind of this action.
    pub const fn kind(self) -> CommandKind {
        match self {
            Self::Forward => CommandKind::Forward,
            Self::Left => CommandKind::Left,
            Self::Right => CommandKind::Right,
            Self::Take(_) => CommandKind::Take,
            Self::Inventory => CommandKind::Inventory,
            Self::Look => CommandKind::Look,
            Self::ConnectNbr => CommandKind::ConnectNbr,
            Self::Fork => CommandKind::Fork,
        }
    }

    /// The command line sent to the server, without the trailing newline.
    pub fn wire(self) -> String {
        match self {
            Self::Forward => String::from("Forward"),
            Self::Left => String::from("Left"),
            Self::Right => String::from("Right"),
            Self::Take(resource) => format!("Take {resource}"),
            Self::Inventory => String::from("Inventory"),
            Self::Look => String::from("Look"),
            Self::ConnectNbr => String::from("Connect_nbr"),
            Self::Fork => String::from("Fork"),
        }
    }

    /// The movement primitive this action performs, if any.
    pub const fn movement(self) -> Option<MovementCommand> {
        match self {
            Self::Forward => Some(MovementCommand::Forward),
            Self::Left => Some(MovementCommand::Left),
            Self::Right => Some(MovementCommand::Right),
            _ => None,
        }
    }
}

impl From<MovementCommand> for Action {
    fn from(command: MovementCommand) -> Self {
        match command {
            MovementCommand::Forward => Self::Forward,
            MovementCommand::Left => Self::Left,
            MovementCommand::Right => Self::Right,
        }
    }
}

/// The resolved outcome of a previously issued [`Action`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    /// The action that resolved.
    pub action: Action,
    /// Whether the server accepted it.
    pub succeeded: bool,
    /// Raw reply, when the command returns data (look, inventory, slot count).
    pub payload: Option<String>,
}

impl CommandResult {
    /// A successful result.
    pub const fn success(action: Action, payload: Option<String>) -> Self {
        Self {
            action,
            succeeded: true,
            payload,
        }
    }

    /// A failed result.
    pub const fn failure(action: Action, payload: Option<String>) -> Self {
        Self {
            action,
            succeeded: false,
            payload,
        }
    }

    /// The kind of the resolved action.
    pub const fn kind(&self) -> CommandKind {
        self.action.kind()
    }
}
