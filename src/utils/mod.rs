//! # Utilities Module
//!
//! Deterministic randomness and grid pathfinding shared by generation and the
//! turn loop.

pub mod pathfinding;
pub mod random;

pub use pathfinding::*;
pub use random::*;
