//! The player's ship

use glam::Vec2;

use super::{BulletEntity, Collision, Entity, EntityCore, EntityKind, spawn_blow};
use crate::consts::*;
use crate::render::{BufferWriter, TileSet, colors};
use crate::sim::collider::BoxCollider;
use crate::sim::event::GameEvent;
use crate::sim::level::{GameState, Level};

/// Ticks a shield power-up lasts
pub const SHIELD_TICKS: u32 = 300;
const BULLET_SPEED: f32 = 8.0;
const BULLET_DAMAGE: i32 = 1;

#[derive(Debug, Clone)]
pub struct PlayerEntity {
    core: EntityCore,
    pub max_health: i32,
    pub shield_ticks: u32,
    pub double_barrel_ticks: u32,
    fire_cooldown: u32,
    /// Invulnerability after a hit
    grace_ticks: u32,
}

impl PlayerEntity {
    pub fn new(pos: Vec2) -> Self {
        let core = EntityCore::new(PLAYER_SIZE, pos, PLAYER_HEALTH)
            .with_collider(BoxCollider::centered(PLAYER_SIZE, PLAYER_SIZE * 0.6));
        Self {
            core,
            max_health: PLAYER_HEALTH,
            shield_ticks: 0,
            double_barrel_ticks: 0,
            fire_cooldown: 0,
            grace_ticks: 0,
        }
    }

    pub fn health(&self) -> i32 {
        self.core.health
    }

    pub fn is_shielded(&self) -> bool {
        self.shield_ticks > 0
    }

    pub fn enable_shield(&mut self, level: &mut Level) {
        self.shield_ticks = SHIELD_TICKS;
        level.push_event(GameEvent::ShieldUp);
    }

    /// Keep the ship inside the visible area
    pub fn clamp(&mut self, level: &Level) {
        let half = self.core.size / 2.0;
        let left = level.scroll() as f32;
        self.core.pos.x = self
            .core
            .pos
            .x
            .clamp(left + half, left + SCREEN_WIDTH - half);
        self.core.pos.y = self.core.pos.y.clamp(half, SCREEN_HEIGHT - half);
    }

    fn fire(&mut self, level: &mut Level) {
        let nose = self.core.pos + Vec2::new(self.core.size / 2.0, 0.0);
        let vel = Vec2::new(BULLET_SPEED + level.speed() as f32, 0.0);
        let offsets: &[f32] = if self.double_barrel_ticks > 0 {
            &[-6.0, 6.0]
        } else {
            &[0.0]
        };
        for &dy in offsets {
            level.emit(Box::new(BulletEntity::new(
                nose + Vec2::new(0.0, dy),
                vel,
                BULLET_DAMAGE,
                self.core.handle,
                true,
            )));
        }
        level.push_event(GameEvent::Shot { by_player: true });
        self.fire_cooldown = PLAYER_FIRE_COOLDOWN;
    }
}

impl Entity for PlayerEntity {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Player
    }

    fn tick(&mut self, level: &mut Level) {
        self.shield_ticks = self.shield_ticks.saturating_sub(1);
        self.double_barrel_ticks = self.double_barrel_ticks.saturating_sub(1);
        self.fire_cooldown = self.fire_cooldown.saturating_sub(1);
        self.grace_ticks = self.grace_ticks.saturating_sub(1);

        let input = level.input();
        let previous = self.core.pos;

        // Ride along with the scroll, then apply steering
        self.core.pos.x += level.speed() as f32;
        self.core.pos += input.axis() * PLAYER_SPEED;
        self.clamp(level);
        self.core.angle = input.axis().y * 0.15;

        if let Collision::Tile { .. } = level.check_collision(&*self) {
            self.core.pos = previous;
            self.clamp(level);
            self.on_damage(level, TERRAIN_DAMAGE, None);
        }

        if input.fire && self.fire_cooldown == 0 && !self.core.dead {
            self.fire(level);
        }

        self.core.tick(level);
    }

    fn draw(&self, level: &Level, tileset: &TileSet, writer: &mut BufferWriter) {
        let color = if self.grace_ticks % 8 >= 4 {
            colors::PLAYER_HURT
        } else {
            colors::WHITE
        };
        self.core
            .emit_quad(level, writer, tileset.sprite(0, 0), self.core.size, self.core.angle, color);
        if self.is_shielded() {
            self.core.emit_quad(
                level,
                writer,
                tileset.sprite(7, 0),
                self.core.size * 1.5,
                self.core.age as f32 * 0.1,
                colors::PLAYER_SHIELD,
            );
        }
    }

    fn should_collide(&self, other: &dyn Entity) -> bool {
        match other.kind() {
            EntityKind::Particle => false,
            EntityKind::Alien => !self.is_shielded(),
            EntityKind::Bullet => !other.is_caused_by_player(),
            EntityKind::PowerUp | EntityKind::Player => true,
        }
    }

    fn on_damage(&mut self, level: &mut Level, damage: i32, _damager: Option<&dyn Entity>) {
        if self.core.dead {
            return;
        }

        if damage < 0 {
            self.core.health = (self.core.health - damage).min(self.max_health);
            return;
        }

        if self.is_shielded() || self.grace_ticks > 0 {
            return;
        }

        self.grace_ticks = PLAYER_HIT_GRACE;
        if self.core.apply_damage(damage) {
            log::info!("Player destroyed at scroll {:.0}", level.scroll());
            spawn_blow(level, self.core.pos, 24);
            level.push_event(GameEvent::Explosion { pos: self.core.pos });
            if let Err(e) = level.set_state(GameState::Dead) {
                log::error!("Player death ignored: {}", e);
            }
        } else {
            level.push_event(GameEvent::PlayerHit {
                health: self.core.health,
            });
        }
    }

    fn as_player(&self) -> Option<&PlayerEntity> {
        Some(self)
    }

    fn as_player_mut(&mut self) -> Option<&mut PlayerEntity> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::entity::ParticleEntity;

    #[test]
    fn test_shield_blocks_alien_contact() {
        let mut player = PlayerEntity::new(Vec2::ZERO);
        let alien = crate::sim::entity::AlienEntity::new(
            crate::sim::AlienKind::Mine,
            crate::sim::Evolution::Low,
            Vec2::ZERO,
        );
        assert!(player.should_collide(&alien));
        player.shield_ticks = 10;
        assert!(!player.should_collide(&alien));
    }

    #[test]
    fn test_player_ignores_own_bullets_and_particles() {
        let player = PlayerEntity::new(Vec2::ZERO);
        let own = BulletEntity::new(Vec2::ZERO, Vec2::X, 1, None, true);
        let hostile = BulletEntity::new(Vec2::ZERO, Vec2::X, 1, None, false);
        let spark = ParticleEntity::new(Vec2::ZERO, Vec2::X, 5, colors::PARTICLE);
        assert!(!player.should_collide(&own));
        assert!(player.should_collide(&hostile));
        assert!(!player.should_collide(&spark));
    }
}
