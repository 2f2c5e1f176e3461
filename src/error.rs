//! Error types for level setup and simulation invariants

use thiserror::Error;

use crate::sim::GameState;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("biome {index} ends at segment {end}, not after the previous end {previous}")]
    BiomeOrder { index: usize, end: u32, previous: u32 },

    #[error("biome {index} is unbounded but is not the last biome")]
    UnboundedNotLast { index: usize },

    #[error("base speed {speed} is outside 0..={max}")]
    SpeedOutOfRange { speed: f64, max: f64 },

    #[error("biome {index} brings the scroll speed to {speed}, outside 0..={max}")]
    BiomeSpeed { index: usize, speed: f64, max: f64 },

    #[error("biome {index} terrain range {min}..{max} is not inside 0..=1")]
    TerrainRange { index: usize, min: f32, max: f32 },
}

/// Errors raised by the level.
#[derive(Debug, Error)]
pub enum LevelError {
    #[error("tile ({x}, {y}) is outside the rolling window")]
    OutOfWindow { x: i64, y: i64 },

    #[error("invalid state transition {from:?} -> {to:?}")]
    InvalidTransition { from: GameState, to: GameState },

    #[error("a player entity is already live")]
    DuplicatePlayer,

    #[error("biome table is empty")]
    EmptyBiomeTable,

    #[error(transparent)]
    Config(#[from] ConfigError),
}
