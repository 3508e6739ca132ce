//! # World Module
//!
//! Terrain and map representation for the combat grid.
//!
//! A map arrives as a flat list of `(position, terrain)` records plus explicit
//! dimensions. Squares without a record are ordinary floor.

use crate::config::FEET_PER_SQUARE;
use crate::GridPosition;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Terrain a grid square can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TerrainType {
    #[default]
    Normal,
    Difficult,
    Water,
    Lava,
    Pit,
    Wall,
    Door,
    Stairs,
}

impl TerrainType {
    /// Distance units (feet) it costs to enter a square of this terrain.
    ///
    /// Returns `None` for impassable terrain.
    ///
    /// # Examples
    ///
    /// ```
    /// use skirmish::TerrainType;
    ///
    /// assert_eq!(TerrainType::Normal.movement_cost(), Some(5));
    /// assert_eq!(TerrainType::Water.movement_cost(), Some(10));
    /// assert_eq!(TerrainType::Wall.movement_cost(), None);
    /// ```
    pub fn movement_cost(self) -> Option<u32> {
        match self {
            TerrainType::Normal | TerrainType::Door | TerrainType::Stairs => Some(FEET_PER_SQUARE),
            TerrainType::Difficult | TerrainType::Water | TerrainType::Lava => {
                Some(FEET_PER_SQUARE * 2)
            }
            TerrainType::Pit | TerrainType::Wall => None,
        }
    }

    /// Whether a creature can move through this terrain at all.
    pub fn is_passable(self) -> bool {
        self.movement_cost().is_some()
    }

    /// Whether this terrain stops line of sight.
    pub fn blocks_sight(self) -> bool {
        matches!(self, TerrainType::Wall)
    }
}

/// A single terrain record on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub position: GridPosition,
    pub terrain: TerrainType,
}

impl Tile {
    /// Creates a new tile record.
    pub fn new(position: GridPosition, terrain: TerrainType) -> Self {
        Self { position, terrain }
    }
}

/// Width and height of the playable grid, anchored at (0, 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridBounds {
    pub width: u32,
    pub height: u32,
}

impl GridBounds {
    /// Creates bounds covering `0..width` by `0..height`.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Checks whether a position lies within the grid.
    pub fn contains(&self, position: GridPosition) -> bool {
        position.x >= 0
            && position.y >= 0
            && (position.x as u32) < self.width
            && (position.y as u32) < self.height
    }
}

impl Default for GridBounds {
    fn default() -> Self {
        Self::new(
            crate::config::DEFAULT_GRID_WIDTH,
            crate::config::DEFAULT_GRID_HEIGHT,
        )
    }
}

/// Terrain lookup keyed by position.
///
/// # Examples
///
/// ```
/// use skirmish::{GridPosition, TerrainMap, TerrainType, Tile};
///
/// let map = TerrainMap::from_tiles(vec![Tile::new(GridPosition::new(1, 1), TerrainType::Wall)]);
/// assert_eq!(map.terrain_at(GridPosition::new(1, 1)), TerrainType::Wall);
/// assert_eq!(map.terrain_at(GridPosition::new(2, 2)), TerrainType::Normal);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TerrainMap {
    tiles: HashMap<GridPosition, TerrainType>,
}

impl TerrainMap {
    /// Creates an empty map where every square is normal terrain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a map from a flat list of records. Later records win.
    pub fn from_tiles(tiles: impl IntoIterator<Item = Tile>) -> Self {
        Self {
            tiles: tiles
                .into_iter()
                .map(|tile| (tile.position, tile.terrain))
                .collect(),
        }
    }

    /// Sets the terrain of a single square.
    pub fn set(&mut self, position: GridPosition, terrain: TerrainType) {
        self.tiles.insert(position, terrain);
    }

    /// Returns the terrain at a position, defaulting to `Normal`.
    pub fn terrain_at(&self, position: GridPosition) -> TerrainType {
        self.tiles.get(&position).copied().unwrap_or_default()
    }

    /// Cost to enter a square, `None` when impassable.
    pub fn movement_cost(&self, position: GridPosition) -> Option<u32> {
        self.terrain_at(position).movement_cost()
    }

    /// Number of explicit records held.
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Whether the map has no explicit records.
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Iterates explicit records.
    pub fn tiles(&self) -> impl Iterator<Item = Tile> + '_ {
        self.tiles
            .iter()
            .map(|(&position, &terrain)| Tile::new(position, terrain))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terrain_costs() {
        assert_eq!(TerrainType::Door.movement_cost(), Some(5));
        assert_eq!(TerrainType::Stairs.movement_cost(), Some(5));
        assert_eq!(TerrainType::Difficult.movement_cost(), Some(10));
        assert_eq!(TerrainType::Lava.movement_cost(), Some(10));
        assert!(!TerrainType::Pit.is_passable());
        assert!(!TerrainType::Wall.is_passable());
    }

    #[test]
    fn test_bounds_contains() {
        let bounds = GridBounds::new(10, 5);
        assert!(bounds.contains(GridPosition::new(0, 0)));
        assert!(bounds.contains(GridPosition::new(9, 4)));
        assert!(!bounds.contains(GridPosition::new(10, 4)));
        assert!(!bounds.contains(GridPosition::new(-1, 0)));
        assert!(!bounds.contains(GridPosition::new(3, 5)));
    }

    #[test]
    fn test_terrain_map_defaults_to_normal() {
        let mut map = TerrainMap::new();
        assert!(map.is_empty());
        map.set(GridPosition::new(4, 4), TerrainType::Lava);
        assert_eq!(map.len(), 1);
        assert_eq!(map.movement_cost(GridPosition::new(4, 4)), Some(10));
        assert_eq!(map.movement_cost(GridPosition::new(0, 0)), Some(5));
    }

    #[test]
    fn test_later_records_win() {
        let pos = GridPosition::new(1, 2);
        let map = TerrainMap::from_tiles(vec![
            Tile::new(pos, TerrainType::Wall),
            Tile::new(pos, TerrainType::Door),
        ]);
        assert_eq!(map.terrain_at(pos), TerrainType::Door);
    }
}
