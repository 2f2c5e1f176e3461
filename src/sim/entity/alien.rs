//! Alien enemies
//!
//! One entity type covers every archetype; the archetype picks the movement
//! and attack pattern and the evolution tier scales health, fire rate and
//! the points awarded.

use glam::Vec2;

use super::{BulletEntity, Entity, EntityCore, EntityKind, spawn_blow};
use crate::render::{BufferWriter, TileSet, colors};
use crate::sim::biome::{AlienKind, Evolution};
use crate::sim::event::GameEvent;
use crate::sim::level::Level;

pub const ALIEN_SIZE: f32 = 24.0;
const CONTACT_DAMAGE: i32 = 10;
const TURRET_RELOAD: u32 = 150;
const TURRET_BULLET_SPEED: f32 = 2.5;
const TURRET_BULLET_DAMAGE: i32 = 10;

#[derive(Debug, Clone)]
pub struct AlienEntity {
    core: EntityCore,
    archetype: AlienKind,
    tier: Evolution,
    /// Placement position, movement patterns oscillate around it
    anchor: Vec2,
    /// Vertical patrol direction
    heading: f32,
    reload: u32,
}

impl AlienEntity {
    pub fn new(archetype: AlienKind, tier: Evolution, pos: Vec2) -> Self {
        let base_health = match archetype {
            AlienKind::Mine => 1,
            AlienKind::Sweeper => 2,
            AlienKind::Turret => 4,
            AlienKind::Vertical => 3,
        };
        Self {
            core: EntityCore::new(ALIEN_SIZE, pos, base_health * tier.factor()),
            archetype,
            tier,
            anchor: pos,
            heading: 1.0,
            reload: TURRET_RELOAD,
        }
    }

    pub fn archetype(&self) -> AlienKind {
        self.archetype
    }

    pub fn tier(&self) -> Evolution {
        self.tier
    }

    /// Points for destroying this alien
    pub fn points(&self) -> i64 {
        let base = match self.archetype {
            AlienKind::Mine => 10,
            AlienKind::Sweeper => 25,
            AlienKind::Turret => 50,
            AlienKind::Vertical => 40,
        };
        base * self.tier.factor() as i64
    }

    fn movement(&mut self, level: &Level) {
        let t = self.core.age as f32;
        let factor = self.tier.factor() as f32;
        match self.archetype {
            AlienKind::Mine => {
                self.core.angle += 0.02;
                self.core.pos.y = self.anchor.y + (t * 0.05).sin() * 4.0;
            }
            AlienKind::Sweeper => {
                self.core.pos.x -= 0.5 + 0.25 * factor;
                self.core.pos.y = self.anchor.y + (t * 0.04).sin() * 24.0;
            }
            AlienKind::Turret => {
                if let Some(target) = level.player_position() {
                    let d = target - self.core.pos;
                    self.core.angle = d.y.atan2(d.x);
                }
            }
            AlienKind::Vertical => {
                let previous = self.core.pos;
                self.core.pos.y += self.heading * (0.5 + 0.5 * factor);
                if level.overlaps_solid(&self.core.box_collider())
                    || !level.is_in_bounds(&self.core.box_collider())
                {
                    self.core.pos = previous;
                    self.heading = -self.heading;
                }
            }
        }
    }

    fn attack(&mut self, level: &mut Level) {
        if self.archetype != AlienKind::Turret {
            return;
        }
        self.reload = self.reload.saturating_sub(self.tier.factor() as u32);
        if self.reload > 0 {
            return;
        }
        self.reload = TURRET_RELOAD;
        let Some(target) = level.player_position() else {
            return;
        };
        let dir = (target - self.core.pos).normalize_or_zero();
        if dir == Vec2::ZERO {
            return;
        }
        level.emit(Box::new(BulletEntity::new(
            self.core.pos + dir * ALIEN_SIZE / 2.0,
            dir * TURRET_BULLET_SPEED,
            TURRET_BULLET_DAMAGE,
            self.core.handle,
            false,
        )));
        level.push_event(GameEvent::Shot { by_player: false });
    }

    fn explode(&mut self, level: &mut Level) {
        spawn_blow(level, self.core.pos, 10);
        level.push_event(GameEvent::Explosion { pos: self.core.pos });
    }
}

impl Entity for AlienEntity {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Alien
    }

    fn tick(&mut self, level: &mut Level) {
        self.core.tick(level);
        // Dormant until scrolled into view
        if !self.core.visible {
            return;
        }

        self.movement(level);
        self.attack(level);

        let Some(player) = level.player() else {
            return;
        };
        if level.touches(&*self, player) {
            level.damage(player, CONTACT_DAMAGE, Some(&*self));
            if matches!(self.archetype, AlienKind::Mine | AlienKind::Sweeper) {
                self.core.dead = true;
                self.explode(level);
            }
        }
    }

    fn draw(&self, level: &Level, tileset: &TileSet, writer: &mut BufferWriter) {
        let column = match self.archetype {
            AlienKind::Mine => 2,
            AlienKind::Sweeper => 3,
            AlienKind::Turret => 4,
            AlienKind::Vertical => 5,
        };
        let color = match self.tier {
            Evolution::Low => colors::EVOLUTION_LOW,
            Evolution::Medium => colors::EVOLUTION_MEDIUM,
            Evolution::High => colors::EVOLUTION_HIGH,
        };
        self.core.emit_quad(
            level,
            writer,
            tileset.sprite(column, 0),
            self.core.size,
            self.core.angle,
            color,
        );
    }

    fn should_collide(&self, other: &dyn Entity) -> bool {
        match other.kind() {
            EntityKind::Player => true,
            EntityKind::Bullet => other.is_caused_by_player(),
            _ => false,
        }
    }

    fn on_damage(&mut self, level: &mut Level, damage: i32, _damager: Option<&dyn Entity>) {
        if self.core.apply_damage(damage) {
            level.add_score(self.points());
            self.explode(level);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evolution_scales_health_and_points() {
        let low = AlienEntity::new(AlienKind::Turret, Evolution::Low, Vec2::ZERO);
        let high = AlienEntity::new(AlienKind::Turret, Evolution::High, Vec2::ZERO);
        assert_eq!(high.core().health, low.core().health * 3);
        assert_eq!(high.points(), low.points() * 3);
    }

    #[test]
    fn test_aliens_ignore_each_other_and_hostile_fire() {
        let a = AlienEntity::new(AlienKind::Mine, Evolution::Low, Vec2::ZERO);
        let b = AlienEntity::new(AlienKind::Sweeper, Evolution::Low, Vec2::ZERO);
        let hostile = BulletEntity::new(Vec2::ZERO, Vec2::X, 1, None, false);
        let friendly = BulletEntity::new(Vec2::ZERO, Vec2::X, 1, None, true);
        assert!(!a.should_collide(&b));
        assert!(!a.should_collide(&hostile));
        assert!(a.should_collide(&friendly));
    }
}
