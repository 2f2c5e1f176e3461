//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only (one `Level::tick` per frame)
//! - Seeded RNG only
//! - Stable iteration order (entity insertion order, row-major tiles)
//! - No rendering backend or platform dependencies

pub mod arena;
pub mod biome;
pub mod collider;
pub mod entity;
pub mod event;
pub mod input;
pub mod level;
pub mod segment;
pub mod terrain;
pub mod tile;

pub use arena::{Arena, EntityHandle};
pub use biome::{AlienKind, Biome, BiomeManager, EnemyPlacer, Evolution, WeightedTable};
pub use collider::BoxCollider;
pub use entity::{
    AlienEntity, BulletEntity, Collision, Entity, EntityCore, EntityKind, ParticleEntity,
    PlayerEntity, PowerUpEntity, PowerUpKind,
};
pub use event::GameEvent;
pub use input::InputState;
pub use level::{GameState, Level, LevelSegment};
pub use segment::Segment;
pub use terrain::TerrainCarver;
pub use tile::TileId;
