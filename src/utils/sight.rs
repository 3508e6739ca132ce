//! # Line of Sight
//!
//! Square-to-square visibility across the terrain grid.

use crate::{GridPosition, TerrainMap};

/// Squares on the Bresenham line from `from` to `to`, both ends included.
pub fn line_between(from: GridPosition, to: GridPosition) -> Vec<GridPosition> {
    let dx = (to.x - from.x).abs();
    let dy = -(to.y - from.y).abs();
    let step_x = if from.x < to.x { 1 } else { -1 };
    let step_y = if from.y < to.y { 1 } else { -1 };

    let mut line = Vec::with_capacity((dx.max(-dy) + 1) as usize);
    let mut error = dx + dy;
    let (mut x, mut y) = (from.x, from.y);

    loop {
        line.push(GridPosition::new(x, y));
        if x == to.x && y == to.y {
            break;
        }
        let doubled = 2 * error;
        if doubled >= dy {
            error += dy;
            x += step_x;
        }
        if doubled <= dx {
            error += dx;
            y += step_y;
        }
    }

    line
}

/// Whether anything between two squares blocks sight.
///
/// The endpoints themselves never block.
///
/// # Examples
///
/// ```
/// use skirmish::{has_line_of_sight, GridPosition, TerrainMap, TerrainType};
///
/// let mut map = TerrainMap::new();
/// map.set(GridPosition::new(2, 0), TerrainType::Wall);
/// assert!(!has_line_of_sight(&map, GridPosition::new(0, 0), GridPosition::new(4, 0)));
/// assert!(has_line_of_sight(&map, GridPosition::new(0, 1), GridPosition::new(4, 1)));
/// ```
pub fn has_line_of_sight(terrain: &TerrainMap, from: GridPosition, to: GridPosition) -> bool {
    let line = line_between(from, to);
    line.iter()
        .skip(1)
        .take(line.len().saturating_sub(2))
        .all(|&square| !terrain.terrain_at(square).blocks_sight())
}
