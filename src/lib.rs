//! # Dungeon
//!
//! A deterministic, turn-based dungeon-crawler simulation engine.
//!
//! ## Architecture Overview
//!
//! The engine is the hard core behind a terminal dungeon game. Rendering and
//! input devices live outside the crate and talk to it through a narrow
//! interface: one [`Action`] in per player turn, an ordered list of
//! [`GameEvent`]s and a copy-out [`SessionView`] back out.
//!
//! - **Random Stream**: seeded ChaCha streams, forked per concern so layout,
//!   combat and AI draws never perturb each other
//! - **Generation**: room-and-corridor levels, connected by construction
//! - **Entity Registry**: sole owner of actors and items plus a position index
//! - **Action Resolver**: validates and applies a single actor's action
//! - **Turn Scheduler**: player turn, NPC turns, end-of-level and game-over
//! - **Game Session**: the top-level owner exposed to presentation layers
//!
//! ## Determinism
//!
//! A [`GameSession`] built from the same [`SessionConfig`] produces the same
//! level, the same placements and the same events for the same actions. Saved
//! sessions restore the random streams bit-exactly, so a resumed game continues
//! exactly as the original would have.

pub mod game;
pub mod generation;
pub mod input;
pub mod utils;

// Core module re-exports
pub use game::*;
pub use generation::*;
pub use input::*;
pub use utils::*;

/// Core error type for the dungeon engine.
///
/// Rejected actions are not errors; they surface as an
/// [`ActionOutcome`] with `applied == false`.
#[derive(thiserror::Error, Debug)]
pub enum DungeonError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// A configuration parameter is unusable
    #[error("Invalid configuration `{parameter}`: {reason}")]
    InvalidConfig {
        parameter: &'static str,
        reason: String,
    },

    /// Game state is invalid
    #[error("Invalid game state: {0}")]
    InvalidState(String),

    /// The referenced entity does not exist
    #[error("Unknown entity: {0}")]
    UnknownEntity(EntityId),

    /// Generation failed
    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    /// A text command could not be understood
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl DungeonError {
    /// Shorthand for building an [`DungeonError::InvalidConfig`].
    pub fn invalid_config(parameter: &'static str, reason: impl Into<String>) -> Self {
        DungeonError::InvalidConfig {
            parameter,
            reason: reason.into(),
        }
    }
}

/// Result type used throughout the dungeon codebase.
pub type DungeonResult<T> = Result<T, DungeonError>;

/// Version information for the engine.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine configuration defaults.
pub mod config {
    /// Default dungeon width in tiles
    pub const DEFAULT_DUNGEON_WIDTH: u32 = 80;

    /// Default dungeon height in tiles
    pub const DEFAULT_DUNGEON_HEIGHT: u32 = 40;

    /// Largest accepted width or height. Keeps the tile grid allocatable and
    /// every coordinate well inside `i32`.
    pub const MAX_DUNGEON_DIMENSION: u32 = 1024;

    /// Default seed when none is supplied
    pub const DEFAULT_SEED: u64 = 42;

    /// Room placement attempts before generation settles for fewer rooms
    pub const DEFAULT_PLACEMENT_ATTEMPTS: u32 = 200;

    /// Default player starting health
    pub const DEFAULT_PLAYER_HEALTH: u32 = 30;

    /// Default player attack
    pub const DEFAULT_PLAYER_ATTACK: u32 = 5;

    /// Default player defense
    pub const DEFAULT_PLAYER_DEFENSE: u32 = 1;

    /// Largest variance roll subtracted from a defender's defense
    pub const DEFAULT_COMBAT_VARIANCE: u32 = 2;

    /// Chebyshev distance at which chasing monsters notice the player
    pub const DEFAULT_DETECTION_RADIUS: u32 = 6;

    /// Euclidean radius of the player's field of view
    pub const DEFAULT_SIGHT_RADIUS: u32 = 5;

    /// Euclidean radius revealed by a flare
    pub const DEFAULT_FLARE_RADIUS: u32 = 12;

    /// Highest monster level generation may spawn
    pub const DEFAULT_MAX_MONSTER_LEVEL: u32 = 4;

    /// Treasures scattered over a generated level
    pub const DEFAULT_TREASURE_COUNT: u32 = 3;
}
