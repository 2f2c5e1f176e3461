//! Short-lived visual particles

use glam::Vec2;
use rand::Rng;

use super::{Entity, EntityCore, EntityKind};
use crate::render::{BufferWriter, TileSet, colors};
use crate::sim::level::Level;

#[derive(Debug, Clone)]
pub struct ParticleEntity {
    core: EntityCore,
    vel: Vec2,
    lifetime: u64,
    color: [u8; 4],
}

impl ParticleEntity {
    pub fn new(pos: Vec2, vel: Vec2, lifetime: u64, color: [u8; 4]) -> Self {
        Self {
            core: EntityCore::new(4.0, pos, 1),
            vel,
            lifetime,
            color,
        }
    }

    /// Remaining life in [0, 1]
    pub fn life(&self) -> f32 {
        1.0 - (self.core.age as f32 / self.lifetime.max(1) as f32).min(1.0)
    }
}

impl Entity for ParticleEntity {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Particle
    }

    fn tick(&mut self, level: &mut Level) {
        self.core.pos += self.vel;
        self.vel *= 0.92;
        self.core.angle += 0.2;
        self.core.tick(level);
        if self.core.age >= self.lifetime {
            self.core.dead = true;
        }
    }

    fn draw(&self, level: &Level, tileset: &TileSet, writer: &mut BufferWriter) {
        let mut color = self.color;
        color[3] = (self.life() * 255.0) as u8;
        let size = self.core.size * (0.5 + self.life());
        self.core
            .emit_quad(level, writer, tileset.sprite(6, 0), size, self.core.angle, color);
    }

    fn should_collide(&self, _other: &dyn Entity) -> bool {
        false
    }

    fn on_damage(&mut self, _level: &mut Level, _damage: i32, _damager: Option<&dyn Entity>) {}
}

/// Burst of particles flying out from `pos`
pub fn spawn_blow(level: &mut Level, pos: Vec2, count: u32) {
    for _ in 0..count {
        let (angle, speed, lifetime) = {
            let rng = level.rng();
            (
                rng.random_range(0.0..std::f32::consts::TAU),
                rng.random_range(0.5..3.0),
                rng.random_range(15..40),
            )
        };
        let vel = Vec2::from_angle(angle) * speed;
        level.emit(Box::new(ParticleEntity::new(pos, vel, lifetime, colors::PARTICLE)));
    }
}
