//! Entity trait and the state every entity shares
//!
//! Entities live in the level's arena and are driven through the `Entity`
//! trait. During its own tick an entity is moved out of the arena, so it can
//! hold `&mut Level` while querying collisions and spawning other entities.
//! Back-references (who fired a bullet) are `EntityHandle`s resolved through
//! the level and may fail to resolve once the referenced entity is gone.

mod alien;
mod bullet;
mod particle;
mod player;
mod powerup;

pub use alien::AlienEntity;
pub use bullet::BulletEntity;
pub use particle::{ParticleEntity, spawn_blow};
pub use player::PlayerEntity;
pub use powerup::{PowerUpEntity, PowerUpKind};

use std::fmt;

use glam::Vec2;

use super::arena::EntityHandle;
use super::collider::BoxCollider;
use super::level::Level;
use crate::render::{BufferWriter, Sprite, TileSet, colors};

/// Coarse entity category used by collision predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Player,
    Bullet,
    PowerUp,
    Alien,
    Particle,
}

/// State shared by all entities
#[derive(Debug, Clone)]
pub struct EntityCore {
    /// Assigned when the entity is handed to the level
    pub handle: Option<EntityHandle>,
    /// Center in world pixels
    pub pos: Vec2,
    pub size: f32,
    pub angle: f32,
    /// Collider relative to `pos`
    pub collider: BoxCollider,
    pub health: i32,
    pub dead: bool,
    /// Overlaps the screen this tick
    pub visible: bool,
    pub age: u64,
}

impl EntityCore {
    pub fn new(size: f32, pos: Vec2, health: i32) -> Self {
        Self {
            handle: None,
            pos,
            size,
            angle: 0.0,
            collider: BoxCollider::centered(size, size),
            health,
            dead: false,
            visible: false,
            age: 0,
        }
    }

    pub fn with_collider(mut self, collider: BoxCollider) -> Self {
        self.collider = collider;
        self
    }

    /// Collider in world space
    pub fn box_collider(&self) -> BoxCollider {
        self.collider.offset(self.pos)
    }

    /// Bookkeeping every entity runs once per tick
    pub fn tick(&mut self, level: &Level) {
        self.age += 1;
        self.visible = level.is_on_screen(&self.box_collider());
    }

    /// Subtract health (negative heals); returns true if this hit killed it
    pub fn apply_damage(&mut self, amount: i32) -> bool {
        if self.dead {
            return false;
        }
        self.health -= amount;
        if self.health <= 0 {
            self.dead = true;
            return true;
        }
        false
    }

    /// Emit a quad at this entity's screen position
    pub fn emit_quad(
        &self,
        level: &Level,
        writer: &mut BufferWriter,
        sprite: Sprite,
        size: f32,
        angle: f32,
        color: [u8; 4],
    ) {
        writer.quad(level.to_screen(self.pos), size, angle, sprite, color);
    }
}

/// Result of a collision query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collision {
    Miss,
    /// First solid tile in row-major order, absolute tile coordinates
    Tile { x: i64, y: i64 },
    Entity(EntityHandle),
}

pub trait Entity: fmt::Debug {
    fn core(&self) -> &EntityCore;

    fn core_mut(&mut self) -> &mut EntityCore;

    fn kind(&self) -> EntityKind;

    /// Advance one step
    fn tick(&mut self, level: &mut Level) {
        self.core_mut().tick(level);
    }

    /// Emit this entity's quads; must not change any state
    fn draw(&self, level: &Level, tileset: &TileSet, writer: &mut BufferWriter);

    /// Collider outline for debugging
    fn debug_draw(&self, level: &Level, tileset: &TileSet, writer: &mut BufferWriter) {
        let b = self.core().box_collider();
        let offset = level.to_screen(Vec2::ZERO);
        writer.wireframe(b.offset(offset), 1.0, tileset.sprite(0, 0), colors::COLLIDER);
    }

    /// Whether this entity is willing to collide with `other`.
    /// A hit requires both sides to agree.
    fn should_collide(&self, _other: &dyn Entity) -> bool {
        true
    }

    /// Something dealt damage to this entity (negative amounts heal)
    fn on_damage(&mut self, _level: &mut Level, damage: i32, _damager: Option<&dyn Entity>) {
        self.core_mut().apply_damage(damage);
    }

    /// Whether the entity may be placed at its current position
    fn check_placement(&self, level: &Level) -> bool {
        !level.overlaps_solid(&self.core().box_collider())
    }

    /// Whether the player is responsible for this entity's actions
    fn is_caused_by_player(&self) -> bool {
        false
    }

    /// Entity that spawned this one, if any
    fn parent(&self) -> Option<EntityHandle> {
        None
    }

    fn should_remove(&self) -> bool {
        self.core().dead
    }

    fn as_player(&self) -> Option<&PlayerEntity> {
        None
    }

    fn as_player_mut(&mut self) -> Option<&mut PlayerEntity> {
        None
    }
}
