//! # Grid Mathematics
//!
//! Small geometry helpers shared by the area resolver and line of sight.

use crate::config::FEET_PER_SQUARE;

/// Converts a distance in feet into grid squares.
pub fn feet_to_tiles(feet: u32) -> f64 {
    feet as f64 / FEET_PER_SQUARE as f64
}

/// Absolute shortest difference between two headings, in degrees `[0, 180]`.
///
/// # Examples
///
/// ```
/// use skirmish::angle_difference;
///
/// assert_eq!(angle_difference(350.0, 10.0), 20.0);
/// assert_eq!(angle_difference(-90.0, 270.0), 0.0);
/// ```
pub fn angle_difference(a: f64, b: f64) -> f64 {
    let diff = (a - b).rem_euclid(360.0);
    if diff > 180.0 {
        360.0 - diff
    } else {
        diff
    }
}

/// Heading of the vector `(dx, dy)` in degrees, 0 along +x.
pub fn heading_degrees(dx: f64, dy: f64) -> f64 {
    dy.atan2(dx).to_degrees()
}

/// Unit vector for a heading in degrees.
pub fn unit_vector(degrees: f64) -> (f64, f64) {
    let radians = degrees.to_radians();
    (radians.cos(), radians.sin())
}
