//! The agent's queryable view of nearby tiles.
//!
//! A snapshot is replaced wholesale whenever a look succeeds. Between looks
//! it may be stale: the agent moved, turned, or something else flagged it.
//! Staleness is explicit -- consumers check [`VisionSnapshot::is_stale`]
//! rather than assuming the tiles still describe the world.

use std::collections::BTreeMap;

use zappy_types::{RelativePosition, ResourceKind};

/// What a single visible tile held when it was observed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TileObservation {
    /// Offset from the agent at observation time.
    pub position: RelativePosition,
    /// Resource counts on the tile; absent kinds are zero.
    pub resources: BTreeMap<ResourceKind, u32>,
    /// Agents standing on the tile (the observer included on its own tile).
    pub players: u32,
}

impl TileObservation {
    /// An empty tile at `position`.
    pub const fn empty(position: RelativePosition) -> Self {
        Self {
            position,
            resources: BTreeMap::new(),
            players: 0,
        }
    }

    /// Quantity of `resource` on this tile.
    pub fn quantity(&self, resource: ResourceKind) -> u32 {
        self.resources.get(&resource).copied().unwrap_or(0)
    }

    /// Total number of resource units on this tile.
    pub fn total_items(&self) -> u32 {
        self.resources.values().fold(0_u32, |acc, &n| acc.saturating_add(n))
    }
}

/// An ordered list of observed tiles plus freshness bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisionSnapshot {
    tiles: Vec<TileObservation>,
    received: bool,
    stale: bool,
}

impl VisionSnapshot {
    /// A snapshot that has never received data.
    pub const fn new() -> Self {
        Self {
            tiles: Vec::new(),
            received: false,
            stale: false,
        }
    }

    /// Replace every tile with a fresh observation and clear staleness.
    ///
    /// A tile at the origin is inserted when the observation lacks one, so a
    /// fresh snapshot always describes the agent's own tile.
    pub fn replace(&mut self, mut tiles: Vec<TileObservation>) {
        if !tiles.iter().any(|tile| tile.position.is_origin()) {
            tiles.insert(0, TileObservation::empty(RelativePosition::ORIGIN));
        }
        self.tiles = tiles;
        self.received = true;
        self.stale = false;
    }

    /// Flag the snapshot as out of date.
    pub const fn mark_stale(&mut self) {
        self.stale = true;
    }

    /// Whether something invalidated the snapshot since the last look.
    pub const fn is_stale(&self) -> bool {
        self.stale
    }

    /// Whether any look has ever succeeded.
    pub const fn has_data(&self) -> bool {
        self.received
    }

    /// Observed tiles in look order.
    pub fn tiles(&self) -> &[TileObservation] {
        &self.tiles
    }

    /// The observation at `position`, if visible.
    pub fn tile_at(&self, position: RelativePosition) -> Option<&TileObservation> {
        self.tiles.iter().find(|tile| tile.position == position)
    }

    /// The agent's own tile.
    pub fn current_tile(&self) -> Option<&TileObservation> {
        self.tile_at(RelativePosition::ORIGIN)
    }

    /// Index of visible resource kind to every position holding at least one unit.
    ///
    /// Positions are listed in look order.
    pub fn visible_resources(&self) -> BTreeMap<ResourceKind, Vec<RelativePosition>> {
        let mut index: BTreeMap<ResourceKind, Vec<RelativePosition>> = BTreeMap::new();
        for tile in &self.tiles {
            for (&resource, &quantity) in &tile.resources {
                if quantity > 0 {
                    index.entry(resource).or_default().push(tile.position);
                }
            }
        }
        index
    }

    /// Optimistically remove one unit of `resource` at `position`.
    ///
    /// Returns `false` when the tile is not visible or holds none.
    pub fn remove_resource_at(&mut self, position: RelativePosition, resource: ResourceKind) -> bool {
        let Some(tile) = self.tiles.iter_mut().find(|tile| tile.position == position) else {
            return false;
        };
        match tile.resources.get_mut(&resource) {
            Some(quantity) if *quantity > 1 => {
                *quantity = quantity.saturating_sub(1);
                true
            }
            Some(_) => {
                tile.resources.remove(&resource);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(dx: i32, dy: i32, entries: &[(ResourceKind, u32)]) -> TileObservation {
        TileObservation {
            position: RelativePosition::new(dx, dy),
            resources: entries.iter().copied().collect(),
            players: 0,
        }
    }

    #[test]
    fn new_snapshot_has_no_data() {
        let vision = VisionSnapshot::new();
        assert!(!vision.has_data());
        assert!(!vision.is_stale());
        assert!(vision.current_tile().is_none());
    }

    #[test]
    fn replace_clears_staleness() {
        let mut vision = VisionSnapshot::new();
        vision.replace(vec![tile(0, 0, &[])]);
        vision.mark_stale();
        assert!(vision.is_stale());
        vision.replace(vec![tile(0, 0, &[(ResourceKind::Food, 1)])]);
        assert!(!vision.is_stale());
        assert!(vision.has_data());
    }

    #[test]
    fn replace_always_includes_origin() {
        let mut vision = VisionSnapshot::new();
        vision.replace(vec![tile(0, -1, &[(ResourceKind::Sibur, 1)])]);
        assert_eq!(vision.tiles().len(), 2);
        assert!(vision.current_tile().is_some());
    }

    #[test]
    fn visible_resources_index_in_look_order() {
        let mut vision = VisionSnapshot::new();
        vision.replace(vec![
            tile(0, 0, &[(ResourceKind::Food, 1)]),
            tile(-1, -1, &[(ResourceKind::Linemate, 2)]),
            tile(0, -1, &[(ResourceKind::Food, 0)]),
            tile(1, -1, &[(ResourceKind::Linemate, 1), (ResourceKind::Food, 3)]),
        ]);
        let index = vision.visible_resources();
        assert_eq!(
            index.get(&ResourceKind::Linemate),
            Some(&vec![RelativePosition::new(-1, -1), RelativePosition::new(1, -1)])
        );
        assert_eq!(
            index.get(&ResourceKind::Food),
            Some(&vec![RelativePosition::ORIGIN, RelativePosition::new(1, -1)])
        );
    }

    #[test]
    fn remove_resource_decrements_then_drops() {
        let mut vision = VisionSnapshot::new();
        vision.replace(vec![tile(0, 0, &[(ResourceKind::Phiras, 2)])]);
        assert!(vision.remove_resource_at(RelativePosition::ORIGIN, ResourceKind::Phiras));
        assert_eq!(vision.current_tile().map(|t| t.quantity(ResourceKind::Phiras)), Some(1));
        assert!(vision.remove_resource_at(RelativePosition::ORIGIN, ResourceKind::Phiras));
        assert_eq!(vision.current_tile().map(|t| t.quantity(ResourceKind::Phiras)), Some(0));
        assert!(!vision.remove_resource_at(RelativePosition::ORIGIN, ResourceKind::Phiras));
    }

    #[test]
    fn remove_resource_on_unseen_tile_is_noop() {
        let mut vision = VisionSnapshot::new();
        assert!(!vision.remove_resource_at(RelativePosition::new(3, 3), ResourceKind::Food));
    }
}
