//! # Area Module
//!
//! Area-of-effect resolution: which squares a spell shape strikes.
//!
//! Sizes are in feet and converted at 5 feet per square. Every candidate
//! square in the bounding box around the origin is tested against the shape,
//! so the result is a pure function of the shape parameters and previews always
//! match the final cast.

pub mod outline;
pub mod presets;

pub use outline::*;
pub use presets::*;

use crate::utils::{angle_difference, feet_to_tiles, heading_degrees, unit_vector};
use crate::GridPosition;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Absorbs floating point noise at exact shape boundaries.
const EPSILON: f64 = 1e-9;

/// Half the fixed 60 degree arc of a cone.
pub const CONE_HALF_ANGLE: f64 = 30.0;

/// Half the width of a line effect, in squares.
pub const LINE_HALF_WIDTH: f64 = 0.5;

/// Area-of-effect shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AoeShape {
    /// Radius around the origin
    Sphere,
    /// Side length, centred on the origin square
    Cube,
    /// Length, 60 degree arc
    Cone,
    /// Length, one square wide
    Line,
    /// Radius; treated as a sphere on the flat grid
    Cylinder,
}

impl AoeShape {
    /// Whether the offset `(dx, dy)` from the origin falls inside the shape.
    ///
    /// `size` is the shape size in squares and `direction` the heading in degrees.
    pub fn contains_offset(self, dx: i32, dy: i32, size: f64, direction: f64) -> bool {
        let (dx, dy) = (dx as f64, dy as f64);
        match self {
            AoeShape::Sphere | AoeShape::Cylinder => (dx * dx + dy * dy).sqrt() <= size + EPSILON,
            AoeShape::Cube => {
                let half = size / 2.0;
                dx.abs() <= half + EPSILON && dy.abs() <= half + EPSILON
            }
            AoeShape::Cone => {
                if dx == 0.0 && dy == 0.0 {
                    return true;
                }
                let distance = (dx * dx + dy * dy).sqrt();
                distance <= size + EPSILON
                    && angle_difference(heading_degrees(dx, dy), direction)
                        <= CONE_HALF_ANGLE + EPSILON
            }
            AoeShape::Line => {
                let (ux, uy) = unit_vector(direction);
                let along = dx * ux + dy * uy;
                let across = (dx * uy - dy * ux).abs();
                across <= LINE_HALF_WIDTH + EPSILON
                    && along >= -EPSILON
                    && along <= size + EPSILON
            }
        }
    }

    /// Whether the shape uses a direction.
    pub fn is_directional(self) -> bool {
        matches!(self, AoeShape::Cone | AoeShape::Line)
    }
}

/// An area-of-effect template placed on the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaOfEffect {
    pub shape: AoeShape,
    pub origin: GridPosition,
    /// Radius, side or length in feet depending on the shape
    pub size_feet: u32,
    /// Heading in degrees, 0 along +x
    pub direction: Option<f64>,
    /// Display colour; ignored by tile resolution
    pub color: String,
    /// Display opacity; ignored by tile resolution
    pub opacity: f64,
}

impl AreaOfEffect {
    /// Creates an undirected template with default display styling.
    pub fn new(shape: AoeShape, origin: GridPosition, size_feet: u32) -> Self {
        Self {
            shape,
            origin,
            size_feet,
            direction: None,
            color: "#ff6a00".to_string(),
            opacity: 0.35,
        }
    }

    /// Points the template in a direction, in degrees.
    pub fn with_direction(mut self, degrees: f64) -> Self {
        self.direction = Some(degrees);
        self
    }

    /// Builds a template from a spell preset.
    pub fn from_preset(preset: &SpellPreset, origin: GridPosition, direction: Option<f64>) -> Self {
        let mut aoe = Self::new(preset.shape, origin, preset.size_feet);
        aoe.direction = direction;
        aoe
    }

    /// Shape size converted to squares.
    pub fn size_in_tiles(&self) -> f64 {
        feet_to_tiles(self.size_feet)
    }

    /// Heading used for directional shapes; undirected templates face +x.
    pub fn heading(&self) -> f64 {
        self.direction.unwrap_or(0.0)
    }

    /// Every grid square the effect strikes.
    ///
    /// # Examples
    ///
    /// ```
    /// use skirmish::{AoeShape, AreaOfEffect, GridPosition};
    ///
    /// let burst = AreaOfEffect::new(AoeShape::Sphere, GridPosition::new(5, 5), 5);
    /// let tiles = burst.affected_tiles();
    /// assert!(tiles.contains(&GridPosition::new(5, 4)));
    /// assert!(!tiles.contains(&GridPosition::new(3, 5)));
    /// ```
    pub fn affected_tiles(&self) -> HashSet<GridPosition> {
        let size = self.size_in_tiles();
        if !size.is_finite() {
            return HashSet::new();
        }
        let reach = size.ceil() as i32;
        let heading = self.heading();

        let mut tiles = HashSet::new();
        for dy in -reach..=reach {
            for dx in -reach..=reach {
                if self.shape.contains_offset(dx, dy, size, heading) {
                    tiles.insert(GridPosition::new(self.origin.x + dx, self.origin.y + dy));
                }
            }
        }
        tiles
    }

    /// Whether a particular square is struck.
    pub fn affects(&self, position: GridPosition) -> bool {
        let offset = position - self.origin;
        self.shape
            .contains_offset(offset.x, offset.y, self.size_in_tiles(), self.heading())
    }
}
