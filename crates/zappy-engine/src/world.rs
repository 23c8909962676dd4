//! In-memory torus world answering commands in the game server's wire formats.
//!
//! The world is plain synchronous state. [`World::execute`] answers one
//! command for one player; [`World::advance`] runs one world tick, draining
//! food, removing starved players and topping resources back up to their
//! density. The world task in [`crate::server`] owns the only instance.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use zappy_agent::perception::look_position;
use zappy_core::config::WorldConfig;
use zappy_types::{Action, AgentId, CommandResult, Direction, ResourceKind};

const FACINGS: [Direction; 4] = [Direction::North, Direction::East, Direction::South, Direction::West];

const PLAYER_WORD: &str = "player";

/// Errors raised by the world and its task.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// The configured map has no tiles.
    #[error("map of {width}x{height} has no tiles")]
    EmptyMap {
        /// Configured width.
        width: u32,
        /// Configured height.
        height: u32,
    },

    /// The agent never joined or has starved.
    #[error("agent not in world: {0}")]
    UnknownAgent(AgentId),

    /// Every team slot is taken.
    #[error("no free team slot")]
    NoFreeSlot,

    /// Arithmetic overflow during a checked operation.
    #[error("arithmetic overflow in world calculation")]
    ArithmeticOverflow,

    /// The world task is no longer running.
    #[error("world task stopped")]
    Closed,
}

/// What a newly connected player starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerStart {
    /// Starting level.
    pub level: u32,
    /// Starting food units.
    pub food: u32,
}

#[derive(Debug, Clone)]
struct Player {
    x: u32,
    y: u32,
    facing: Direction,
    level: u32,
    food: u32,
    stones: BTreeMap<ResourceKind, u32>,
}

type Tile = BTreeMap<ResourceKind, u32>;

/// The simulated map and everyone on it.
#[derive(Debug)]
pub struct World {
    width: u32,
    height: u32,
    tiles: Vec<Tile>,
    players: BTreeMap<AgentId, Player>,
    capacity: u32,
    food_interval: u64,
    regeneration_interval: u64,
    starting_food: u32,
    tick: u64,
    rng: StdRng,
}

impl World {
    /// Build a world from `config` and scatter the initial resources.
    pub fn new(config: &WorldConfig) -> Result<Self, WorldError> {
        let area = config
            .width
            .checked_mul(config.height)
            .filter(|area| *area > 0)
            .ok_or(WorldError::EmptyMap {
                width: config.width,
                height: config.height,
            })?;
        let area = usize::try_from(area).ok().ok_or(WorldError::ArithmeticOverflow)?;

        let mut world = Self {
            width: config.width,
            height: config.height,
            tiles: vec![Tile::new(); area],
            players: BTreeMap::new(),
            capacity: config.team_slots,
            food_interval: config.food_interval_ticks.max(1),
            regeneration_interval: config.regeneration_interval_ticks.max(1),
            starting_food: config.starting_food,
            tick: 0,
            rng: StdRng::seed_from_u64(config.seed),
        };
        world.regenerate();
        Ok(world)
    }

    /// World ticks elapsed.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Players currently on the map.
    pub fn population(&self) -> usize {
        self.players.len()
    }

    /// Team slots still open, as reported by `Connect_nbr`.
    pub fn free_slots(&self) -> u32 {
        let connected = u32::try_from(self.players.len()).unwrap_or(u32::MAX);
        self.capacity.saturating_sub(connected)
    }

    /// Units of `kind` lying on the map.
    pub fn total(&self, kind: ResourceKind) -> u64 {
        self.tiles
            .iter()
            .map(|tile| u64::from(tile.get(&kind).copied().unwrap_or(0)))
            .sum()
    }

    /// Put `agent` on a random tile, consuming a team slot.
    pub fn connect(&mut self, agent: AgentId) -> Result<PlayerStart, WorldError> {
        if self.free_slots() == 0 {
            return Err(WorldError::NoFreeSlot);
        }
        let player = Player {
            x: self.rng.random_range(0..self.width),
            y: self.rng.random_range(0..self.height),
            facing: FACINGS.choose(&mut self.rng).copied().unwrap_or(Direction::North),
            level: 1,
            food: self.starting_food,
            stones: BTreeMap::new(),
        };
        let start = PlayerStart {
            level: player.level,
            food: player.food,
        };
        self.players.insert(agent, player);
        Ok(start)
    }

    /// Remove `agent` from the map, freeing its slot.
    pub fn disconnect(&mut self, agent: AgentId) -> bool {
        self.players.remove(&agent).is_some()
    }

    /// Answer one command issued by `agent`.
    pub fn execute(&mut self, agent: AgentId, action: Action) -> Result<CommandResult, WorldError> {
        let player = self.players.get(&agent).ok_or(WorldError::UnknownAgent(agent))?;
        let (x, y, facing, level) = (player.x, player.y, player.facing, player.level);

        match action {
            Action::Forward => {
                let (dx, dy) = facing.vector();
                let (nx, ny) = self.wrap(x, y, dx, dy)?;
                let player = self.player_mut(agent)?;
                player.x = nx;
                player.y = ny;
                Ok(ok(action))
            }
            Action::Left => {
                self.player_mut(agent)?.facing = facing.turned_left();
                Ok(ok(action))
            }
            Action::Right => {
                self.player_mut(agent)?.facing = facing.turned_right();
                Ok(ok(action))
            }
            Action::Look => {
                let payload = self.look_payload(x, y, facing, level)?;
                Ok(CommandResult::success(action, Some(payload)))
            }
            Action::Inventory => {
                let payload = inventory_payload(player);
                Ok(CommandResult::success(action, Some(payload)))
            }
            Action::Take(resource) => self.take(agent, resource),
            Action::ConnectNbr => Ok(CommandResult::success(action, Some(self.free_slots().to_string()))),
            Action::Fork => {
                self.capacity = self.capacity.checked_add(1).ok_or(WorldError::ArithmeticOverflow)?;
                Ok(ok(action))
            }
        }
    }

    /// Run one world tick and return the players that starved during it.
    pub fn advance(&mut self) -> Vec<AgentId> {
        self.tick = self.tick.saturating_add(1);

        let mut starved = Vec::new();
        if self.tick.checked_rem(self.food_interval) == Some(0) {
            for (agent, player) in &mut self.players {
                player.food = player.food.saturating_sub(1);
                if player.food == 0 {
                    starved.push(*agent);
                }
            }
            for agent in &starved {
                self.players.remove(agent);
            }
        }

        if self.tick.checked_rem(self.regeneration_interval) == Some(0) {
            self.regenerate();
        }
        starved
    }

    /// Top every resource back up to its density.
    fn regenerate(&mut self) {
        let area = u64::try_from(self.tiles.len()).unwrap_or(u64::MAX);
        for kind in ResourceKind::ALL {
            let target = area
                .saturating_mul(u64::from(kind.density_per_mille()))
                .checked_div(1000)
                .unwrap_or(0)
                .max(1);
            let present = self.total(kind);
            for _ in present..target {
                self.drop_resource(kind);
            }
        }
    }

    fn drop_resource(&mut self, kind: ResourceKind) {
        let index = self.rng.random_range(0..self.tiles.len());
        if let Some(tile) = self.tiles.get_mut(index) {
            let count = tile.entry(kind).or_insert(0);
            *count = count.saturating_add(1);
        }
    }

    fn take(&mut self, agent: AgentId, resource: ResourceKind) -> Result<CommandResult, WorldError> {
        let action = Action::Take(resource);
        let player = self.players.get_mut(&agent).ok_or(WorldError::UnknownAgent(agent))?;
        let index = tile_index(self.width, player.x, player.y).ok_or(WorldError::ArithmeticOverflow)?;

        let Some(available) = self
            .tiles
            .get_mut(index)
            .and_then(|tile| tile.get_mut(&resource))
            .filter(|count| **count > 0)
        else {
            return Ok(ko(action));
        };
        *available = available.saturating_sub(1);

        if resource == ResourceKind::Food {
            player.food = player.food.checked_add(1).ok_or(WorldError::ArithmeticOverflow)?;
        } else {
            let held = player.stones.entry(resource).or_insert(0);
            *held = held.saturating_add(1);
        }
        Ok(ok(action))
    }

    fn look_payload(&self, x: u32, y: u32, facing: Direction, level: u32) -> Result<String, WorldError> {
        let depth = i32::try_from(level).ok().ok_or(WorldError::ArithmeticOverflow)?;
        let mut tiles = Vec::new();
        for line in 0..=depth {
            for offset in line.saturating_neg()..=line {
                let position = look_position(facing, line, offset);
                let (tx, ty) = self.wrap(x, y, position.dx, position.dy)?;
                tiles.push(self.describe(tx, ty));
            }
        }
        Ok(format!("[{}]", tiles.join(",")))
    }

    fn describe(&self, x: u32, y: u32) -> String {
        let here = self
            .players
            .values()
            .filter(|player| player.x == x && player.y == y)
            .count();
        let mut words: Vec<&str> = std::iter::repeat_n(PLAYER_WORD, here).collect();
        if let Some(tile) = tile_index(self.width, x, y).and_then(|index| self.tiles.get(index)) {
            for (kind, count) in tile {
                let count = usize::try_from(*count).unwrap_or(0);
                words.extend(std::iter::repeat_n(kind.name(), count));
            }
        }
        words.join(" ")
    }

    fn wrap(&self, x: u32, y: u32, dx: i32, dy: i32) -> Result<(u32, u32), WorldError> {
        let nx = wrap_axis(x, dx, self.width).ok_or(WorldError::ArithmeticOverflow)?;
        let ny = wrap_axis(y, dy, self.height).ok_or(WorldError::ArithmeticOverflow)?;
        Ok((nx, ny))
    }

    fn player_mut(&mut self, agent: AgentId) -> Result<&mut Player, WorldError> {
        self.players.get_mut(&agent).ok_or(WorldError::UnknownAgent(agent))
    }
}

fn wrap_axis(value: u32, delta: i32, size: u32) -> Option<u32> {
    let moved = i64::from(value).checked_add(i64::from(delta))?;
    u32::try_from(moved.checked_rem_euclid(i64::from(size))?).ok()
}

fn tile_index(width: u32, x: u32, y: u32) -> Option<usize> {
    let index = y.checked_mul(width)?.checked_add(x)?;
    usize::try_from(index).ok()
}

fn inventory_payload(player: &Player) -> String {
    let mut entries = vec![format!("{} {}", ResourceKind::Food.name(), player.food)];
    for kind in ResourceKind::STONES {
        let count = player.stones.get(&kind).copied().unwrap_or(0);
        entries.push(format!("{} {count}", kind.name()));
    }
    format!("[{}]", entries.join(", "))
}

fn ok(action: Action) -> CommandResult {
    CommandResult::success(action, Some(String::from("ok")))
}

fn ko(action: Action) -> CommandResult {
    CommandResult::failure(action, Some(String::from("ko")))
}

#[cfg(test)]
impl World {
    fn clear_tiles(&mut self) {
        for tile in &mut self.tiles {
            tile.clear();
        }
    }

    fn place(&mut self, x: u32, y: u32, kind: ResourceKind, count: u32) {
        if let Some(tile) = tile_index(self.width, x, y).and_then(|index| self.tiles.get_mut(index)) {
            tile.insert(kind, count);
        }
    }

    fn put(&mut self, agent: AgentId, x: u32, y: u32, facing: Direction) {
        if let Some(player) = self.players.get_mut(&agent) {
            player.x = x;
            player.y = y;
            player.facing = facing;
        }
    }

    fn food_of(&self, agent: AgentId) -> Option<u32> {
        self.players.get(&agent).map(|player| player.food)
    }

    fn position_of(&self, agent: AgentId) -> Option<(u32, u32, Direction)> {
        self.players
            .get(&agent)
            .map(|player| (player.x, player.y, player.facing))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use zappy_agent::perception::{parse_inventory, parse_look};
    use zappy_types::RelativePosition;

    use super::*;

    fn config() -> WorldConfig {
        WorldConfig::default()
    }

    fn joined(config: &WorldConfig) -> (World, AgentId) {
        let mut world = World::new(config).unwrap();
        let agent = AgentId::new();
        world.connect(agent).unwrap();
        world.clear_tiles();
        world.put(agent, 5, 5, Direction::North);
        (world, agent)
    }

    #[test]
    fn empty_map_is_rejected() {
        let config = WorldConfig {
            width: 0,
            ..config()
        };
        assert!(matches!(World::new(&config), Err(WorldError::EmptyMap { .. })));
    }

    #[test]
    fn resources_are_spawned_by_density() {
        let world = World::new(&config()).unwrap();
        assert_eq!(world.total(ResourceKind::Food), 50);
        assert_eq!(world.total(ResourceKind::Linemate), 30);
        assert_eq!(world.total(ResourceKind::Thystame), 5);
    }

    #[test]
    fn same_seed_same_world() {
        let mut a = World::new(&config()).unwrap();
        let mut b = World::new(&config()).unwrap();
        let (first, second) = (AgentId::new(), AgentId::new());
        a.connect(first).unwrap();
        b.connect(second).unwrap();
        assert_eq!(a.position_of(first), b.position_of(second));
    }

    #[test]
    fn slots_are_consumed_and_forked() {
        let mut world = World::new(&config()).unwrap();
        let first = AgentId::new();
        world.connect(first).unwrap();

        let reply = world.execute(first, Action::ConnectNbr).unwrap();
        assert_eq!(reply.payload.as_deref(), Some("1"));

        world.connect(AgentId::new()).unwrap();
        assert!(matches!(world.connect(AgentId::new()), Err(WorldError::NoFreeSlot)));

        assert!(world.execute(first, Action::Fork).unwrap().succeeded);
        assert_eq!(world.free_slots(), 1);
    }

    #[test]
    fn forward_wraps_around_the_edges() {
        let (mut world, agent) = joined(&config());
        world.put(agent, 3, 0, Direction::North);
        world.execute(agent, Action::Forward).unwrap();
        assert_eq!(world.position_of(agent), Some((3, 9, Direction::North)));

        world.execute(agent, Action::Left).unwrap();
        world.execute(agent, Action::Forward).unwrap();
        assert_eq!(world.position_of(agent), Some((2, 9, Direction::West)));
    }

    #[test]
    fn look_reply_reads_back_through_the_parser() {
        let (mut world, agent) = joined(&config());
        world.place(5, 4, ResourceKind::Linemate, 2);
        world.place(6, 4, ResourceKind::Food, 1);

        let reply = world.execute(agent, Action::Look).unwrap();
        let tiles = parse_look(reply.payload.as_deref().unwrap(), Direction::North).unwrap();
        assert_eq!(tiles.len(), 4);

        let own = tiles.iter().find(|tile| tile.position.is_origin()).unwrap();
        assert_eq!(own.players, 1);
        let ahead = tiles
            .iter()
            .find(|tile| tile.position == RelativePosition::new(0, -1))
            .unwrap();
        assert_eq!(ahead.quantity(ResourceKind::Linemate), 2);
        let right = tiles
            .iter()
            .find(|tile| tile.position == RelativePosition::new(1, -1))
            .unwrap();
        assert_eq!(right.quantity(ResourceKind::Food), 1);
    }

    #[test]
    fn take_moves_items_to_the_player() {
        let (mut world, agent) = joined(&config());
        world.place(5, 5, ResourceKind::Food, 1);
        world.place(5, 5, ResourceKind::Sibur, 1);

        assert!(world.execute(agent, Action::Take(ResourceKind::Food)).unwrap().succeeded);
        assert!(!world.execute(agent, Action::Take(ResourceKind::Food)).unwrap().succeeded);
        assert!(world.execute(agent, Action::Take(ResourceKind::Sibur)).unwrap().succeeded);

        let reply = world.execute(agent, Action::Inventory).unwrap();
        let counts = parse_inventory(reply.payload.as_deref().unwrap()).unwrap();
        assert_eq!(counts.get(&ResourceKind::Food), Some(&11));
        assert_eq!(counts.get(&ResourceKind::Sibur), Some(&1));
        assert_eq!(counts.get(&ResourceKind::Thystame), Some(&0));
    }

    #[test]
    fn food_drain_starves_players() {
        let config = WorldConfig {
            food_interval_ticks: 1,
            starting_food: 2,
            ..config()
        };
        let (mut world, agent) = joined(&config);
        assert!(world.advance().is_empty());
        assert_eq!(world.food_of(agent), Some(1));
        assert_eq!(world.advance(), vec![agent]);
        assert!(matches!(
            world.execute(agent, Action::Look),
            Err(WorldError::UnknownAgent(_))
        ));
        assert_eq!(world.free_slots(), 2);
    }

    #[test]
    fn regeneration_restores_density() {
        let config = WorldConfig {
            regeneration_interval_ticks: 1,
            ..config()
        };
        let (mut world, _agent) = joined(&config);
        assert_eq!(world.total(ResourceKind::Phiras), 0);
        world.advance();
        assert_eq!(world.total(ResourceKind::Phiras), 8);
        assert_eq!(world.tick(), 1);
    }
}
