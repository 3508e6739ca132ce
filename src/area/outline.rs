//! # Shape Outlines
//!
//! Analytic boundaries of area-of-effect templates in world coordinates, for
//! the rendering layer to draw as previews.
//!
//! Every outline is anchored at the centre of the origin square. Cubes are
//! centred on that point and snapped to the whole squares the tile resolver
//! covers.

use super::{AoeShape, AreaOfEffect, CONE_HALF_ANGLE, EPSILON, LINE_HALF_WIDTH};
use crate::utils::unit_vector;
use crate::GridPosition;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// A point in world (pixel) space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Centre of a grid square for a given square size.
    pub fn tile_center(position: GridPosition, tile_size: f64) -> Self {
        Self::new(
            (position.x as f64 + 0.5) * tile_size,
            (position.y as f64 + 0.5) * tile_size,
        )
    }

    fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Boundary primitive of a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShapeOutline {
    Circle {
        center: Point,
        radius: f64,
    },
    Rectangle {
        top_left: Point,
        width: f64,
        height: f64,
    },
    /// Two radii from the apex joined by an arc
    Wedge {
        apex: Point,
        radius: f64,
        start_degrees: f64,
        end_degrees: f64,
    },
    Polygon {
        points: Vec<Point>,
    },
}

impl ShapeOutline {
    /// Builds the outline of a template for squares of `tile_size` world units.
    pub fn for_area(aoe: &AreaOfEffect, tile_size: f64) -> Self {
        let center = Point::tile_center(aoe.origin, tile_size);
        let extent = aoe.size_in_tiles() * tile_size;

        match aoe.shape {
            AoeShape::Sphere | AoeShape::Cylinder => ShapeOutline::Circle {
                center,
                radius: extent,
            },
            AoeShape::Cube => {
                let reach = (aoe.size_in_tiles() / 2.0 + EPSILON).floor();
                let side = (2.0 * reach + 1.0) * tile_size;
                ShapeOutline::Rectangle {
                    top_left: center.offset(-side / 2.0, -side / 2.0),
                    width: side,
                    height: side,
                }
            }
            AoeShape::Cone => ShapeOutline::Wedge {
                apex: center,
                radius: extent,
                start_degrees: aoe.heading() - CONE_HALF_ANGLE,
                end_degrees: aoe.heading() + CONE_HALF_ANGLE,
            },
            AoeShape::Line => {
                let (ux, uy) = unit_vector(aoe.heading());
                let half_width = LINE_HALF_WIDTH * tile_size;
                let (px, py) = (-uy * half_width, ux * half_width);
                let end = center.offset(ux * extent, uy * extent);
                ShapeOutline::Polygon {
                    points: vec![
                        center.offset(px, py),
                        end.offset(px, py),
                        end.offset(-px, -py),
                        center.offset(-px, -py),
                    ],
                }
            }
        }
    }

    /// SVG path data tracing the outline.
    ///
    /// # Examples
    ///
    /// ```
    /// use skirmish::{Point, ShapeOutline};
    ///
    /// let square = ShapeOutline::Rectangle {
    ///     top_left: Point::new(0.0, 0.0),
    ///     width: 10.0,
    ///     height: 10.0,
    /// };
    /// assert_eq!(square.svg_path(), "M 0.00 0.00 H 10.00 V 10.00 H 0.00 Z");
    /// ```
    pub fn svg_path(&self) -> String {
        let mut path = String::new();
        // Writing into a String cannot fail
        let _ = match self {
            ShapeOutline::Circle { center, radius } => write!(
                path,
                "M {:.2} {:.2} A {r:.2} {r:.2} 0 1 0 {:.2} {:.2} A {r:.2} {r:.2} 0 1 0 {:.2} {:.2} Z",
                center.x - radius,
                center.y,
                center.x + radius,
                center.y,
                center.x - radius,
                center.y,
                r = radius,
            ),
            ShapeOutline::Rectangle {
                top_left,
                width,
                height,
            } => write!(
                path,
                "M {:.2} {:.2} H {:.2} V {:.2} H {:.2} Z",
                top_left.x,
                top_left.y,
                top_left.x + width,
                top_left.y + height,
                top_left.x,
            ),
            ShapeOutline::Wedge {
                apex,
                radius,
                start_degrees,
                end_degrees,
            } => {
                let (sx, sy) = unit_vector(*start_degrees);
                let (ex, ey) = unit_vector(*end_degrees);
                let large_arc = u8::from(end_degrees - start_degrees > 180.0);
                write!(
                    path,
                    "M {:.2} {:.2} L {:.2} {:.2} A {r:.2} {r:.2} 0 {large_arc} 1 {:.2} {:.2} Z",
                    apex.x,
                    apex.y,
                    apex.x + sx * radius,
                    apex.y + sy * radius,
                    apex.x + ex * radius,
                    apex.y + ey * radius,
                    r = radius,
                )
            }
            ShapeOutline::Polygon { points } => {
                for (index, point) in points.iter().enumerate() {
                    let command = if index == 0 { "M" } else { " L" };
                    let _ = write!(path, "{command} {:.2} {:.2}", point.x, point.y);
                }
                write!(path, " Z")
            }
        };
        path
    }
}

impl AreaOfEffect {
    /// Boundary of this template for squares of `tile_size` world units.
    pub fn outline(&self, tile_size: f64) -> ShapeOutline {
        ShapeOutline::for_area(self, tile_size)
    }
}
