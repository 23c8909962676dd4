//! Target selection over the vision snapshot.
//!
//! Missing stones are ranked by a fixed rarity order, rarest first. The
//! selector walks that order, skips blacklisted kinds, and returns the
//! Manhattan-closest visible tile of the first kind it can see. Ties keep
//! look order.

use std::collections::{BTreeMap, BTreeSet};

use zappy_agent::VisionSnapshot;
use zappy_types::{Direction, RelativePosition, ResourceKind};

/// Stones ordered rarest first.
pub const RARITY_ORDER: [ResourceKind; 6] = [
    ResourceKind::Thystame,
    ResourceKind::Phiras,
    ResourceKind::Mendiane,
    ResourceKind::Sibur,
    ResourceKind::Deraumere,
    ResourceKind::Linemate,
];

/// A tile to walk to and the resource to pick up there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceTarget {
    /// World-aligned offset from the agent.
    pub position: RelativePosition,
    /// What to take on arrival.
    pub resource: ResourceKind,
}

impl ResourceTarget {
    /// A target at `position` for `resource`.
    pub const fn new(position: RelativePosition, resource: ResourceKind) -> Self {
        Self { position, resource }
    }

    /// The same target seen from one tile further along `facing`.
    #[must_use]
    pub const fn after_step(self, facing: Direction) -> Self {
        let (vx, vy) = facing.vector();
        Self {
            position: RelativePosition::new(
                self.position.dx.saturating_sub(vx),
                self.position.dy.saturating_sub(vy),
            ),
            resource: self.resource,
        }
    }
}

/// Missing kinds in rarity order, excluding `blacklist`.
pub fn prioritized<'a>(
    missing: &'a BTreeMap<ResourceKind, u32>,
    blacklist: &'a BTreeSet<ResourceKind>,
) -> impl Iterator<Item = ResourceKind> + 'a {
    RARITY_ORDER
        .into_iter()
        .filter(move |kind| missing.get(kind).is_some_and(|&short| short > 0))
        .filter(move |kind| !blacklist.contains(kind))
}

/// Pick the closest visible tile of the highest-priority missing kind.
///
/// The agent's own tile is never a target; picking up there is handled
/// before targeting.
pub fn select_target(
    missing: &BTreeMap<ResourceKind, u32>,
    vision: &VisionSnapshot,
    blacklist: &BTreeSet<ResourceKind>,
) -> Option<ResourceTarget> {
    let visible = vision.visible_resources();
    prioritized(missing, blacklist).find_map(|resource| {
        let positions = visible.get(&resource)?;
        closest(positions.iter().copied()).map(|position| ResourceTarget::new(position, resource))
    })
}

/// Closest visible tile holding `resource`, other than the agent's own.
pub fn nearest_visible(vision: &VisionSnapshot, resource: ResourceKind) -> Option<RelativePosition> {
    closest(
        vision
            .tiles()
            .iter()
            .filter(|tile| tile.quantity(resource) > 0)
            .map(|tile| tile.position),
    )
}

fn closest(positions: impl Iterator<Item = RelativePosition>) -> Option<RelativePosition> {
    positions
        .filter(|position| !position.is_origin())
        .min_by_key(|position| position.manhattan())
}
