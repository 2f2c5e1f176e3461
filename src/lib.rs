//! Tile Raider - a side-scrolling tile-world arcade shooter
//!
//! Core modules:
//! - `sim`: Deterministic simulation (segments, entities, collisions, biomes)
//! - `render`: Vertex emission into host-supplied append-only writers
//! - `persistence`: String-keyed store used for high scores and config
//! - `config`: Data-driven game configuration

pub mod config;
pub mod error;
pub mod highscores;
pub mod persistence;
pub mod render;
pub mod sim;

pub use config::GameConfig;
pub use error::{ConfigError, LevelError};
pub use highscores::HighScores;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Tile edge length in world pixels
    pub const TILE_SIZE: f32 = 16.0;

    /// Segment dimensions in tiles
    pub const SEGMENT_WIDTH: usize = 128;
    pub const SEGMENT_HEIGHT: usize = 32;
    /// Number of segments held by the rolling window
    pub const WINDOW_SEGMENTS: usize = 4;

    /// Visible area in world pixels
    pub const SCREEN_WIDTH: f32 = 640.0;
    pub const SCREEN_HEIGHT: f32 = SEGMENT_HEIGHT as f32 * TILE_SIZE;

    /// Scroll speed before biome modifiers (pixels per tick)
    pub const BASE_SPEED: f64 = 0.8;
    /// Fraction of the gap closed per tick when the biome speed changes
    pub const BIOME_SPEED_EASING: f32 = 0.01;
    /// Upper bound on the combined scroll speed, well under one segment per tick
    pub const MAX_SPEED: f64 = 64.0;

    /// Player defaults
    pub const PLAYER_SIZE: f32 = 24.0;
    pub const PLAYER_HEALTH: i32 = 30;
    pub const PLAYER_SPEED: f32 = 3.0;
    pub const PLAYER_FIRE_COOLDOWN: u32 = 12;
    pub const TERRAIN_DAMAGE: i32 = 10;
    /// Ticks of invulnerability after taking a hit
    pub const PLAYER_HIT_GRACE: u32 = 40;

    /// Points per tile scrolled
    pub const DISTANCE_POINTS: i64 = 1;

    /// Bounded retries for randomized placement
    pub const MAX_PLACEMENT_ATTEMPTS: u32 = 16;
}

/// Convert a world pixel position to the tile that contains it
#[inline]
pub fn world_to_tile(pos: Vec2) -> (i64, i64) {
    (
        (pos.x / consts::TILE_SIZE).floor() as i64,
        (pos.y / consts::TILE_SIZE).floor() as i64,
    )
}

/// Convert a tile coordinate to the world position of its center
#[inline]
pub fn tile_to_world(x: i64, y: i64) -> Vec2 {
    Vec2::new(
        (x as f32 + 0.5) * consts::TILE_SIZE,
        (y as f32 + 0.5) * consts::TILE_SIZE,
    )
}

/// Initialise the logging backend for the current platform
pub fn init_logging() {
    #[cfg(target_arch = "wasm32")]
    {
        console_error_panic_hook::set_once();
        let _ = console_log::init_with_level(log::Level::Info);
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or("info"),
        )
        .try_init();
    }
}
