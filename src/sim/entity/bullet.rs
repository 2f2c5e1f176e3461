//! Projectiles fired by the player and by turrets

use glam::Vec2;

use super::{Collision, Entity, EntityCore, EntityKind, spawn_blow};
use crate::render::{BufferWriter, TileSet, colors};
use crate::sim::arena::EntityHandle;
use crate::sim::collider::BoxCollider;
use crate::sim::level::Level;

/// Ticks before a bullet expires on its own
const BULLET_LIFETIME: u64 = 240;

#[derive(Debug, Clone)]
pub struct BulletEntity {
    core: EntityCore,
    vel: Vec2,
    damage: i32,
    /// Weak reference to the shooter
    parent: Option<EntityHandle>,
    from_player: bool,
}

impl BulletEntity {
    pub fn new(
        pos: Vec2,
        vel: Vec2,
        damage: i32,
        parent: Option<EntityHandle>,
        from_player: bool,
    ) -> Self {
        let mut core = EntityCore::new(8.0, pos, 1);
        core.angle = vel.y.atan2(vel.x);
        Self {
            core: core.with_collider(BoxCollider::centered(8.0, 4.0)),
            vel,
            damage,
            parent,
            from_player,
        }
    }

    pub fn damage(&self) -> i32 {
        self.damage
    }
}

impl Entity for BulletEntity {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Bullet
    }

    fn tick(&mut self, level: &mut Level) {
        self.core.pos += self.vel;
        self.core.tick(level);

        if self.core.age > BULLET_LIFETIME || !self.core.visible {
            self.core.dead = true;
            return;
        }

        match level.check_collision(&*self) {
            Collision::Miss => {}
            Collision::Tile { .. } => {
                spawn_blow(level, self.core.pos, 3);
                self.core.dead = true;
            }
            Collision::Entity(other) => {
                level.damage(other, self.damage, Some(&*self));
                self.core.dead = true;
            }
        }
    }

    fn draw(&self, level: &Level, tileset: &TileSet, writer: &mut BufferWriter) {
        let color = if self.from_player {
            colors::BULLET_PLAYER
        } else {
            colors::BULLET_ALIEN
        };
        self.core
            .emit_quad(level, writer, tileset.sprite(1, 0), self.core.size, self.core.angle, color);
    }

    fn should_collide(&self, other: &dyn Entity) -> bool {
        if other.core().handle.is_some() && other.core().handle == self.parent {
            return false;
        }
        match other.kind() {
            EntityKind::Bullet | EntityKind::Particle => false,
            EntityKind::Player => !self.from_player,
            EntityKind::Alien => self.from_player,
            EntityKind::PowerUp => self.from_player,
        }
    }

    fn on_damage(&mut self, _level: &mut Level, _damage: i32, _damager: Option<&dyn Entity>) {}

    fn check_placement(&self, _level: &Level) -> bool {
        true
    }

    fn is_caused_by_player(&self) -> bool {
        self.from_player
    }

    fn parent(&self) -> Option<EntityHandle> {
        self.parent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::entity::ParticleEntity;

    #[test]
    fn test_bullets_ignore_each_other_and_particles() {
        let a = BulletEntity::new(Vec2::ZERO, Vec2::X, 1, None, true);
        let b = BulletEntity::new(Vec2::ZERO, Vec2::X, 1, None, false);
        let p = ParticleEntity::new(Vec2::ZERO, Vec2::X, 5, colors::PARTICLE);
        assert!(!a.should_collide(&b));
        assert!(!a.should_collide(&p));
    }

    #[test]
    fn test_ownership_flags() {
        let a = BulletEntity::new(Vec2::ZERO, Vec2::X, 3, None, true);
        assert!(a.is_caused_by_player());
        assert_eq!(a.damage(), 3);
        assert_eq!(a.parent(), None);
    }
}
