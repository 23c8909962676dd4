//! Path planning capability and its grid implementation.
//!
//! States consume [`PathPlanner`] as a black box: a target offset, the
//! agent's facing and the current vision go in, primitive movement commands
//! come out. Callers cap the length of a returned path themselves.
//!
//! [`GridPathPlanner`] walks the offset greedily and explores in straight
//! runs, turning toward the side of the vision cone that holds more items.

use std::sync::Arc;

use zappy_agent::VisionSnapshot;
use zappy_types::{Direction, MovementCommand, RelativePosition};

use crate::config::ExplorationConfig;

/// Produces movement commands toward a target or for exploration.
pub trait PathPlanner: Send {
    /// Commands that bring an agent facing `facing` onto `target`.
    fn plan_path(
        &mut self,
        target: RelativePosition,
        facing: Direction,
        vision: &VisionSnapshot,
    ) -> Vec<MovementCommand>;

    /// One exploratory movement.
    fn plan_exploration(&mut self, facing: Direction, vision: &VisionSnapshot) -> MovementCommand;
}

/// Builds a fresh path planner for each state instance.
pub type PathPlannerFactory = Arc<dyn Fn() -> Box<dyn PathPlanner> + Send + Sync>;

/// A factory producing [`GridPathPlanner`]s with the given exploration tuning.
pub fn grid_planner_factory(config: &ExplorationConfig) -> PathPlannerFactory {
    let run_length = config.run_length;
    Arc::new(move || Box::new(GridPathPlanner::new(run_length)))
}

/// Greedy path planner over world-aligned offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridPathPlanner {
    run_length: u32,
    steps_in_run: u32,
    just_turned: bool,
    prefer_left: bool,
}

impl GridPathPlanner {
    /// A planner that explores in runs of `run_length` forward steps.
    pub const fn new(run_length: u32) -> Self {
        Self {
            run_length,
            steps_in_run: 0,
            just_turned: false,
            prefer_left: false,
        }
    }

    fn turn_toward_richer_side(&mut self, facing: Direction, vision: &VisionSnapshot) -> MovementCommand {
        let right = facing.turned_right();
        let (mut left_items, mut right_items) = (0_u32, 0_u32);
        for tile in vision.tiles() {
            let side = lateral(tile.position, right);
            if side > 0 {
                right_items = right_items.saturating_add(tile.total_items());
            } else if side < 0 {
                left_items = left_items.saturating_add(tile.total_items());
            }
        }
        match left_items.cmp(&right_items) {
            std::cmp::Ordering::Greater => MovementCommand::Left,
            std::cmp::Ordering::Less => MovementCommand::Right,
            std::cmp::Ordering::Equal => {
                self.prefer_left = !self.prefer_left;
                if self.prefer_left {
                    MovementCommand::Left
                } else {
                    MovementCommand::Right
                }
            }
        }
    }
}

impl PathPlanner for GridPathPlanner {
    fn plan_path(
        &mut self,
        target: RelativePosition,
        facing: Direction,
        _vision: &VisionSnapshot,
    ) -> Vec<MovementCommand> {
        let mut commands = Vec::new();
        let (mut dx, mut dy) = (target.dx, target.dy);
        let mut facing = facing;
        // Each turn is followed by a forward step, so this never runs out early.
        let budget = target.manhattan().saturating_mul(2).saturating_add(4);

        for _ in 0..budget {
            if dx == 0 && dy == 0 {
                break;
            }
            let command = if reduces(facing, dx, dy) {
                MovementCommand::Forward
            } else if reduces(facing.turned_right(), dx, dy) {
                MovementCommand::Right
            } else if reduces(facing.turned_left(), dx, dy) {
                MovementCommand::Left
            } else {
                MovementCommand::Right
            };
            if command == MovementCommand::Forward {
                let (vx, vy) = facing.vector();
                dx = dx.saturating_sub(vx);
                dy = dy.saturating_sub(vy);
            }
            facing = facing.after(command);
            commands.push(command);
        }

        commands
    }

    fn plan_exploration(&mut self, facing: Direction, vision: &VisionSnapshot) -> MovementCommand {
        if !self.just_turned && self.steps_in_run >= self.run_length {
            self.just_turned = true;
            self.steps_in_run = 0;
            return self.turn_toward_richer_side(facing, vision);
        }
        self.just_turned = false;
        self.steps_in_run = self.steps_in_run.saturating_add(1);
        MovementCommand::Forward
    }
}

/// Whether stepping along `facing` brings `(dx, dy)` closer to zero.
const fn reduces(facing: Direction, dx: i32, dy: i32) -> bool {
    let (vx, vy) = facing.vector();
    (vx != 0 && vx == dx.signum()) || (vy != 0 && vy == dy.signum())
}

/// Signed distance of `position` to the right of the facing axis.
const fn lateral(position: RelativePosition, right: Direction) -> i32 {
    match right {
        Direction::East => position.dx,
        Direction::West => position.dx.saturating_neg(),
        Direction::South => position.dy,
        Direction::North => position.dy.saturating_neg(),
    }
}

#[cfg(test)]
mod tests {
    use zappy_agent::TileObservation;
    use zappy_types::ResourceKind;

    use super::*;

    fn walk(start: Direction, commands: &[MovementCommand]) -> (RelativePosition, Direction) {
        let (mut x, mut y) = (0_i32, 0_i32);
        let mut facing = start;
        for &command in commands {
            if command == MovementCommand::Forward {
                let (vx, vy) = facing.vector();
                x = x.saturating_add(vx);
                y = y.saturating_add(vy);
            }
            facing = facing.after(command);
        }
        (RelativePosition::new(x, y), facing)
    }

    #[test]
    fn straight_ahead_is_all_forward() {
        let mut planner = GridPathPlanner::new(4);
        let path = planner.plan_path(RelativePosition::new(0, -3), Direction::North, &VisionSnapshot::new());
        assert_eq!(path, vec![MovementCommand::Forward; 3]);
    }

    #[test]
    fn paths_reach_their_target_from_every_facing() {
        let targets = [(1, -1), (-2, -2), (3, 0), (0, 2), (-1, 3)];
        for facing in [Direction::North, Direction::East, Direction::South, Direction::West] {
            for (dx, dy) in targets {
                let target = RelativePosition::new(dx, dy);
                let mut planner = GridPathPlanner::new(4);
                let path = planner.plan_path(target, facing, &VisionSnapshot::new());
                assert_eq!(walk(facing, &path).0, target, "from {facing:?} to {target}");
            }
        }
    }

    #[test]
    fn origin_needs_no_commands() {
        let mut planner = GridPathPlanner::new(4);
        assert!(planner
            .plan_path(RelativePosition::ORIGIN, Direction::West, &VisionSnapshot::new())
            .is_empty());
    }

    #[test]
    fn exploration_runs_then_turns_once() {
        let mut planner = GridPathPlanner::new(2);
        let vision = VisionSnapshot::new();
        let moves: Vec<MovementCommand> = (0..6)
            .map(|_| planner.plan_exploration(Direction::North, &vision))
            .collect();
        assert_eq!(moves.first(), Some(&MovementCommand::Forward));
        assert_eq!(moves.get(1), Some(&MovementCommand::Forward));
        assert_ne!(moves.get(2), Some(&MovementCommand::Forward));
        assert_eq!(moves.get(3), Some(&MovementCommand::Forward));
        assert!(moves.windows(2).all(|pair| pair.contains(&MovementCommand::Forward)));
    }

    #[test]
    fn exploration_turns_toward_richer_side() {
        let mut vision = VisionSnapshot::new();
        vision.replace(vec![
            TileObservation::empty(RelativePosition::ORIGIN),
            TileObservation {
                position: RelativePosition::new(1, -1),
                resources: [(ResourceKind::Food, 3)].into_iter().collect(),
                players: 0,
            },
        ]);
        let mut planner = GridPathPlanner::new(0);
        assert_eq!(planner.plan_exploration(Direction::North, &vision), MovementCommand::Right);
        assert_eq!(planner.plan_exploration(Direction::East, &vision), MovementCommand::Forward);
    }

    #[test]
    fn factory_builds_independent_planners() {
        let factory = grid_planner_factory(&ExplorationConfig::default());
        let mut first = factory();
        let mut second = factory();
        let vision = VisionSnapshot::new();
        for _ in 0..4 {
            first.plan_exploration(Direction::North, &vision);
        }
        assert_eq!(second.plan_exploration(Direction::North, &vision), MovementCommand::Forward);
    }
}
