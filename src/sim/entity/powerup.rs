//! Collectible power-ups
//!
//! A power-up is collected when the player touches it, or when a bullet the
//! player fired hits it. Either way the effect goes to the player, resolved
//! through the level; if the player is gone the hit is simply ignored.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{Collision, Entity, EntityCore, EntityKind, PlayerEntity, spawn_blow};
use crate::render::{BufferWriter, TileSet, colors};
use crate::sim::arena::EntityHandle;
use crate::sim::event::GameEvent;
use crate::sim::level::Level;

/// Health restored by a LIVE power-up
pub const LIVE_HEAL: i32 = 10;
/// Ticks of double fire granted by a DOUBLE_BARREL power-up
pub const DOUBLE_BARREL_TICKS: u32 = 50;

/// Resample attempts before falling back to a direct draw
const MAX_PICK_ATTEMPTS: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerUpKind {
    Live,
    DoubleBarrel,
    Shield,
}

impl PowerUpKind {
    /// Bucket a roll in [0, 100): LIVE [0, 30), DOUBLE_BARREL [30, 60),
    /// SHIELD [60, 80). The rest means "roll again".
    pub fn from_roll(roll: u32) -> Option<Self> {
        match roll {
            0..30 => Some(PowerUpKind::Live),
            30..60 => Some(PowerUpKind::DoubleBarrel),
            60..80 => Some(PowerUpKind::Shield),
            _ => None,
        }
    }

    /// Random kind weighted 30/30/20
    pub fn random_pick<R: Rng + ?Sized>(rng: &mut R) -> Self {
        for _ in 0..MAX_PICK_ATTEMPTS {
            if let Some(kind) = Self::from_roll(rng.random_range(0..100)) {
                return kind;
            }
        }
        // Only the accepting buckets remain, so the distribution is unchanged
        Self::from_roll(rng.random_range(0..80)).unwrap_or(PowerUpKind::Live)
    }

    fn sprite_column(&self) -> u16 {
        match self {
            PowerUpKind::Live => 0,
            PowerUpKind::DoubleBarrel => 1,
            PowerUpKind::Shield => 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PowerUpEntity {
    core: EntityCore,
    kind: PowerUpKind,
}

impl PowerUpEntity {
    pub fn new(pos: Vec2, kind: PowerUpKind) -> Self {
        Self {
            core: EntityCore::new(32.0, pos, 1),
            kind,
        }
    }

    pub fn power_up_kind(&self) -> PowerUpKind {
        self.kind
    }

    fn apply_effect(&self, level: &mut Level, player: &mut PlayerEntity) {
        match self.kind {
            PowerUpKind::Live => player.on_damage(level, -LIVE_HEAL, Some(self)),
            PowerUpKind::DoubleBarrel => player.double_barrel_ticks += DOUBLE_BARREL_TICKS,
            PowerUpKind::Shield => player.enable_shield(level),
        }
    }

    /// Grant the effect to the player behind `handle` and disappear
    fn collect(&mut self, level: &mut Level, handle: EntityHandle) {
        if self.core.dead {
            return;
        }
        let granted = level.with_entity_mut(handle, |entity, level| {
            entity
                .as_player_mut()
                .map(|player| self.apply_effect(level, player))
                .is_some()
        });
        if granted == Some(true) {
            level.push_event(GameEvent::Coin { kind: self.kind });
            spawn_blow(level, self.core.pos, 6);
            self.core.dead = true;
        }
    }
}

impl Entity for PowerUpEntity {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn kind(&self) -> EntityKind {
        EntityKind::PowerUp
    }

    fn tick(&mut self, level: &mut Level) {
        self.core.angle = (self.core.age as f32 * 0.07).sin() * 0.5;

        if let Collision::Entity(other) = level.check_collision(&*self) {
            let touched_player = level
                .entity(other)
                .is_some_and(|e| e.kind() == EntityKind::Player);
            if touched_player {
                self.collect(level, other);
            }
        }

        self.core.tick(level);
    }

    fn draw(&self, level: &Level, tileset: &TileSet, writer: &mut BufferWriter) {
        let sprite = tileset.sprite(self.kind.sprite_column(), 1);
        self.core
            .emit_quad(level, writer, sprite, self.core.size, self.core.angle, colors::WHITE);
    }

    fn should_collide(&self, other: &dyn Entity) -> bool {
        match other.kind() {
            EntityKind::Player => true,
            EntityKind::Bullet => other.is_caused_by_player(),
            _ => false,
        }
    }

    /// Shooting a power-up collects it for the shooter's owner
    fn on_damage(&mut self, level: &mut Level, _damage: i32, damager: Option<&dyn Entity>) {
        let Some(damager) = damager.filter(|d| d.is_caused_by_player()) else {
            return;
        };
        if let Some(parent) = damager.parent() {
            self.collect(level, parent);
        }
    }

    fn check_placement(&self, _level: &Level) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{RngCore, SeedableRng};
    use rand_pcg::Pcg32;

    #[test]
    fn test_bucket_boundaries() {
        assert_eq!(PowerUpKind::from_roll(0), Some(PowerUpKind::Live));
        assert_eq!(PowerUpKind::from_roll(29), Some(PowerUpKind::Live));
        assert_eq!(PowerUpKind::from_roll(30), Some(PowerUpKind::DoubleBarrel));
        assert_eq!(PowerUpKind::from_roll(59), Some(PowerUpKind::DoubleBarrel));
        assert_eq!(PowerUpKind::from_roll(60), Some(PowerUpKind::Shield));
        assert_eq!(PowerUpKind::from_roll(79), Some(PowerUpKind::Shield));
        assert_eq!(PowerUpKind::from_roll(80), None);
        assert_eq!(PowerUpKind::from_roll(99), None);
    }

    #[test]
    fn test_distribution_matches_bucket_widths() {
        let mut rng = Pcg32::seed_from_u64(2024);
        let mut counts = [0u32; 3];
        let draws = 100_000;
        for _ in 0..draws {
            match PowerUpKind::random_pick(&mut rng) {
                PowerUpKind::Live => counts[0] += 1,
                PowerUpKind::DoubleBarrel => counts[1] += 1,
                PowerUpKind::Shield => counts[2] += 1,
            }
        }
        let expected = [0.375, 0.375, 0.25];
        for (count, p) in counts.iter().zip(expected) {
            let freq = *count as f64 / draws as f64;
            assert!((freq - p).abs() < 0.01, "frequency {freq} expected {p}");
        }
    }

    /// Always lands in the resample region of [0, 100)
    struct Stuck;

    impl RngCore for Stuck {
        fn next_u32(&mut self) -> u32 {
            u32::MAX
        }

        fn next_u64(&mut self) -> u64 {
            u64::MAX
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            dest.fill(0xFF);
        }
    }

    #[test]
    fn test_adversarial_source_terminates() {
        let kind = PowerUpKind::random_pick(&mut Stuck);
        assert!(matches!(
            kind,
            PowerUpKind::Live | PowerUpKind::DoubleBarrel | PowerUpKind::Shield
        ));
    }

    #[test]
    fn test_power_ups_only_collide_with_player_side() {
        use crate::sim::entity::BulletEntity;

        let p = PowerUpEntity::new(Vec2::ZERO, PowerUpKind::Shield);
        let friendly = BulletEntity::new(Vec2::ZERO, Vec2::X, 1, None, true);
        let hostile = BulletEntity::new(Vec2::ZERO, Vec2::X, 1, None, false);
        assert!(p.should_collide(&friendly));
        assert!(!p.should_collide(&hostile));
    }
}
