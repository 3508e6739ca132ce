//! # Game Module
//!
//! Combat state, the grid world, and the creatures that fight on it.
//!
//! This module contains the stateful half of Skirmish:
//! - Grid coordinates and terrain
//! - Creatures and their combat statistics
//! - Initiative, turn order and death saves
//! - The combat orchestrator and its event stream

pub mod entities;
pub mod events;
pub mod state;
pub mod turns;
pub mod world;

pub use entities::*;
pub use events::*;
pub use state::*;
pub use turns::*;
pub use world::*;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a square on the logical combat grid.
///
/// The grid is unbounded; bounds are supplied separately where a search needs
/// them.
///
/// # Examples
///
/// ```
/// use skirmish::GridPosition;
///
/// let pos = GridPosition::new(10, 5);
/// assert_eq!(pos.x, 10);
/// assert_eq!(pos.y, 5);
///
/// let adjacent = pos.adjacent_positions();
/// assert_eq!(adjacent.len(), 8); // All 8 surrounding squares
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPosition {
    pub x: i32,
    pub y: i32,
}

impl GridPosition {
    /// Creates a new position with the given coordinates.
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns the origin position (0, 0).
    pub fn origin() -> Self {
        Self::new(0, 0)
    }

    /// Chebyshev (king-move) distance in squares.
    ///
    /// # Examples
    ///
    /// ```
    /// use skirmish::GridPosition;
    ///
    /// let a = GridPosition::new(0, 0);
    /// assert_eq!(a.chebyshev_distance(GridPosition::new(3, -4)), 4);
    /// ```
    pub fn chebyshev_distance(self, other: GridPosition) -> u32 {
        (self.x - other.x)
            .unsigned_abs()
            .max((self.y - other.y).unsigned_abs())
    }

    /// Calculates the Euclidean distance to another position.
    pub fn euclidean_distance(self, other: GridPosition) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        (dx * dx + dy * dy).sqrt()
    }

    /// Whether the step to `other` is a diagonal move between neighbours.
    pub fn is_diagonal_to(self, other: GridPosition) -> bool {
        (self.x - other.x).abs() == 1 && (self.y - other.y).abs() == 1
    }

    /// Returns all 8 adjacent positions, orthogonal ones first.
    pub fn adjacent_positions(self) -> Vec<GridPosition> {
        vec![
            GridPosition::new(self.x, self.y - 1),     // N
            GridPosition::new(self.x - 1, self.y),     // W
            GridPosition::new(self.x + 1, self.y),     // E
            GridPosition::new(self.x, self.y + 1),     // S
            GridPosition::new(self.x - 1, self.y - 1), // NW
            GridPosition::new(self.x + 1, self.y - 1), // NE
            GridPosition::new(self.x - 1, self.y + 1), // SW
            GridPosition::new(self.x + 1, self.y + 1), // SE
        ]
    }
}

impl std::ops::Add for GridPosition {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

impl std::ops::Sub for GridPosition {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

impl std::fmt::Display for GridPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Unique identifier for creatures.
pub type CreatureId = Uuid;

/// Creates a new unique creature ID.
pub fn new_creature_id() -> CreatureId {
    Uuid::new_v4()
}
