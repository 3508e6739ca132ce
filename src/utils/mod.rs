//! # Utilities Module
//!
//! Stateless grid algorithms: movement searches, line of sight and the
//! geometry helpers they share.

pub mod math;
pub mod pathfinding;
pub mod sight;

pub use self::math::*;
pub use self::pathfinding::*;
pub use self::sight::*;
