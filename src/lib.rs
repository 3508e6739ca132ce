//! # Skirmish
//!
//! Tactical grid combat for a squares-based tabletop role-playing game.
//!
//! ## Architecture Overview
//!
//! Skirmish is the combat core of a larger virtual-tabletop application. It
//! answers three questions and nothing else:
//!
//! - **Where can I go?** Reachability and optimal paths over a terrain grid
//!   ([`utils::pathfinding`]).
//! - **What does this spell hit?** Area-of-effect rasterization and boundary
//!   outlines ([`area`]).
//! - **What happens in this round?** A combat orchestrator that owns the
//!   creature registry, resolves attacks, damage, healing, saves and death, and
//!   drives initiative and turn order ([`game::CombatOrchestrator`]).
//!
//! Dice and 5e formulas live in [`rules`] and are consumed through the
//! [`rules::DiceRoller`] seam, so every outcome is reproducible from a seed.
//! Rendering is an optional collaborator notified through
//! [`rendering::PresentationHooks`].
//!
//! Everything is single-threaded and synchronous. Events raised by the
//! orchestrator are delivered to subscribers before the triggering call returns.

pub mod area;
pub mod game;
pub mod rendering;
pub mod rules;
pub mod utils;

// Core module re-exports
pub use area::*;
pub use game::*;
pub use rendering::*;
pub use rules::*;
pub use utils::*;

// Explicit re-exports for commonly used types
pub use game::{
    // From entities
    Ability,
    CombatantStats,
    Condition,
    Creature,
    CreatureKind,
    DamageType,
    HitPoints,
    LifeState,
    SizeClass,
    Skill,
    // From events
    CombatEvent,
    SubscriptionId,
    // From state
    AttackOptions,
    CombatConfig,
    CombatOrchestrator,
    // From turns
    DeathSaves,
    InitiativeEntry,
    TurnOrder,
    // From world
    GridBounds,
    GridPosition,
    TerrainMap,
    TerrainType,
    Tile,
};

pub use area::{AoeShape, AreaOfEffect, ShapeOutline, SpellPreset};

pub use utils::{PathResult, ReachableTiles};

/// Core error type for the Skirmish combat engine.
#[derive(thiserror::Error, Debug)]
pub enum SkirmishError {
    /// A referenced creature or its stats are not registered
    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: CreatureId },

    /// The operation is not legal in the current combat state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A dice formula could not be parsed
    #[error("Invalid dice formula: {0}")]
    InvalidFormula(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl SkirmishError {
    /// Shorthand for a missing creature.
    pub fn creature_not_found(id: CreatureId) -> Self {
        SkirmishError::NotFound {
            what: "Creature",
            id,
        }
    }

    /// Shorthand for missing combat stats.
    pub fn stats_not_found(id: CreatureId) -> Self {
        SkirmishError::NotFound { what: "Stats", id }
    }
}

/// Result type used throughout the Skirmish codebase.
pub type SkirmishResult<T> = Result<T, SkirmishError>;

/// Version information for the crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Combat configuration constants.
pub mod config {
    /// Distance units covered by one grid square
    pub const FEET_PER_SQUARE: u32 = 5;

    /// Default grid width in squares
    pub const DEFAULT_GRID_WIDTH: u32 = 30;

    /// Default grid height in squares
    pub const DEFAULT_GRID_HEIGHT: u32 = 20;

    /// Default size of one square in world (pixel) units for outlines
    pub const DEFAULT_TILE_SIZE: f64 = 64.0;

    /// Default seed for the dice roller
    pub const DEFAULT_SEED: u64 = 12345;

    /// Successes needed to stabilize on death saves
    pub const DEATH_SAVE_SUCCESSES: u8 = 3;

    /// Failures that kill on death saves
    pub const DEATH_SAVE_FAILURES: u8 = 3;

    /// A d20 result at or above this is a death save success
    pub const DEATH_SAVE_DC: u32 = 10;

    /// Floor of the concentration saving throw DC
    pub const MIN_CONCENTRATION_DC: i32 = 10;

    /// Most dice a single parsed formula may roll
    pub const MAX_FORMULA_DICE: u32 = 1000;

    /// Largest die a parsed formula may name
    pub const MAX_DIE_SIDES: u32 = 1000;
}
