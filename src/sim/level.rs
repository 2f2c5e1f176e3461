//! The scrolling level
//!
//! Owns the rolling window of segments, the entity arena and the game state.
//! Per tick: scroll, roll the window (generating a new segment on the right),
//! promote pending entities, tick every live entity, purge the dead.
//!
//! Entities created while a tick is running go into the pending buffer and
//! only become visible to scans and collision queries on the next tick.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::arena::{Arena, EntityHandle};
use super::biome::BiomeManager;
use super::collider::BoxCollider;
use super::entity::{
    AlienEntity, Collision, Entity, EntityKind, PlayerEntity, PowerUpEntity, PowerUpKind,
};
use super::event::GameEvent;
use super::input::InputState;
use super::segment::Segment;
use super::terrain::TerrainCarver;
use super::tile::{self, TileId};
use crate::config::GameConfig;
use crate::consts::*;
use crate::error::LevelError;
use crate::highscores::{HighScoreEntry, HighScores, now_millis};
use crate::persistence::{KeyValueStore, MemoryStore};
use crate::render::{BufferWriter, TileSet, colors};
use crate::{tile_to_world, world_to_tile};

/// Segment type held by the rolling window
pub type LevelSegment = Segment<SEGMENT_WIDTH, SEGMENT_HEIGHT>;

/// Current phase of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameState {
    /// World is static, waiting for the start trigger
    Begin,
    /// Scrolling and simulating
    Playing,
    /// Player destroyed; terminal for this level
    Dead,
}

/// Spacing between members of an alien group, in alien sizes
const GROUP_SPACING: f32 = 1.5;

pub struct Level {
    biomes: BiomeManager,
    rng: Pcg32,
    seed: u64,
    state: GameState,

    score: i64,
    hi: i64,

    base_speed: f64,
    /// Biome speed modifier, eased toward the current biome's value
    biome_speed: f32,
    /// Left edge of the screen in world pixels
    scroll: f64,
    /// Whole tiles scrolled and already scored
    distance: i64,
    age: u64,

    /// Segments generated so far
    total: u32,
    biome_index: Option<usize>,
    segments: [LevelSegment; WINDOW_SEGMENTS],
    carver: TerrainCarver,

    pending: Vec<(EntityHandle, Box<dyn Entity>)>,
    entities: Arena<Box<dyn Entity>>,
    player: Option<EntityHandle>,

    input: InputState,
    events: Vec<GameEvent>,

    store: Box<dyn KeyValueStore>,
    highscores: HighScores,
    debug: bool,
}

impl Level {
    /// Build a level from config. Segment 0 starts empty so the player has
    /// room; the remaining window slots are generated immediately.
    pub fn new(config: &GameConfig, store: Box<dyn KeyValueStore>) -> Result<Self, LevelError> {
        config.validate()?;
        let biomes = config.biomes();
        if biomes.is_empty() {
            return Err(LevelError::EmptyBiomeTable);
        }

        let seed = config.seed.unwrap_or_else(rand::random);
        let highscores = HighScores::load(store.as_ref());
        let hi = highscores.top_score().unwrap_or(0);
        log::info!(
            "Level created: seed {}, {} biomes, base speed {:.2}",
            seed,
            biomes.len(),
            config.base_speed
        );

        let mut level = Self {
            biomes,
            rng: Pcg32::seed_from_u64(seed),
            seed,
            state: GameState::Begin,
            score: 0,
            hi,
            base_speed: config.base_speed,
            biome_speed: 0.0,
            scroll: 0.0,
            distance: 0,
            age: 0,
            total: 0,
            biome_index: None,
            segments: std::array::from_fn(|i| LevelSegment::new((i * SEGMENT_WIDTH) as i64)),
            carver: TerrainCarver::new(),
            pending: Vec::new(),
            entities: Arena::new(),
            player: None,
            input: InputState::default(),
            events: Vec::new(),
            store,
            highscores,
            debug: config.debug_colliders,
        };

        for slot in 1..WINDOW_SEGMENTS {
            level.generate(slot);
        }
        level.biome_speed = level.biomes.speed_modifier(level.total);

        Ok(level)
    }

    /// Seeded level over the given biomes, backed by an in-memory store
    pub fn with_seed(biomes: BiomeManager, seed: u64) -> Result<Self, LevelError> {
        let config = GameConfig {
            seed: Some(seed),
            biomes: Some(biomes),
            ..Default::default()
        };
        Self::new(&config, Box::new(MemoryStore::new()))
    }

    /// Put the player at the left of the screen, vertically centered
    pub fn spawn_initial(&mut self) -> Result<EntityHandle, LevelError> {
        let pos = Vec2::new(64.0, SCREEN_HEIGHT / 2.0);
        let handle = self.add_entity(Box::new(PlayerEntity::new(pos)))?;
        self.promote_pending();
        Ok(handle)
    }

    // === State ===

    pub fn state(&self) -> GameState {
        self.state
    }

    /// Begin -> Playing and Playing -> Dead are the only transitions.
    /// Requesting the current state is a no-op.
    pub fn set_state(&mut self, next: GameState) -> Result<(), LevelError> {
        match (self.state, next) {
            (from, to) if from == to => return Ok(()),
            (GameState::Begin, GameState::Playing) | (GameState::Playing, GameState::Dead) => {}
            (from, to) => return Err(LevelError::InvalidTransition { from, to }),
        }

        log::info!("State {:?} -> {:?}", self.state, next);
        self.state = next;

        if next == GameState::Dead {
            log::info!(
                "Run over: score {}, {} segments, {} ticks",
                self.score,
                self.total,
                self.age
            );
            self.push_event(GameEvent::PlayerDied { score: self.score });
            let run = HighScoreEntry {
                score: self.score,
                segments: self.total,
                timestamp: now_millis(),
            };
            if let Some(rank) = self.highscores.record(run) {
                log::info!("New high score #{}: {}", rank, self.score);
                self.highscores.save(self.store.as_mut());
            }
        }
        Ok(())
    }

    /// The start trigger
    pub fn start(&mut self) -> Result<(), LevelError> {
        self.set_state(GameState::Playing)
    }

    // === Tick ===

    pub fn tick(&mut self) {
        self.age += 1;

        if self.state == GameState::Playing {
            self.advance_scroll();
        }

        self.promote_pending();

        if self.state == GameState::Begin {
            return;
        }

        for handle in self.entities.handles() {
            let Some(mut entity) = self.entities.take(handle) else {
                continue;
            };
            if !entity.should_remove() {
                entity.tick(self);
            }
            self.entities.restore(handle, entity);
        }

        self.purge();
    }

    fn advance_scroll(&mut self) {
        let target = self.biomes.speed_modifier(self.total);
        self.biome_speed += (target - self.biome_speed) * BIOME_SPEED_EASING;
        self.scroll += self.speed();

        while self.scroll / TILE_SIZE as f64 >= self.segments[0].end() as f64 {
            self.roll_window();
        }

        let tiles = (self.scroll / TILE_SIZE as f64).floor() as i64;
        if tiles > self.distance {
            self.add_score((tiles - self.distance) * DISTANCE_POINTS);
            self.distance = tiles;
        }
    }

    /// Drop the leftmost segment and generate a new one on the right
    fn roll_window(&mut self) {
        self.segments.rotate_left(1);
        let start = self.segments[WINDOW_SEGMENTS - 2].end();
        self.segments[WINDOW_SEGMENTS - 1].reset(start);
        self.generate(WINDOW_SEGMENTS - 1);
        log::debug!(
            "Window rolled: columns {}..{}",
            self.segments[0].start(),
            self.segments[WINDOW_SEGMENTS - 1].end()
        );
    }

    fn promote_pending(&mut self) {
        for (handle, entity) in std::mem::take(&mut self.pending) {
            if !self.entities.insert(handle, entity) {
                log::error!("Pending entity {:?} lost its slot", handle);
            }
        }
    }

    /// Remove dead entities and anything scrolled off the left edge
    fn purge(&mut self) {
        let left = self.scroll as f32;
        let player = self.player;
        self.entities.retain(|e| {
            if e.should_remove() {
                return false;
            }
            e.core().handle == player || e.core().box_collider().x1 >= left
        });
    }

    // === Generation ===

    /// Fill the window slot with terrain, aliens and power-ups for the
    /// biome at the current segment counter
    fn generate(&mut self, slot: usize) {
        let index = self.biomes.index_for(self.total);
        if index != self.biome_index {
            if let Some(index) = index {
                log::info!("Entering biome {} at segment {}", index, self.total);
                self.push_event(GameEvent::BiomeChanged { index });
            }
            self.biome_index = index;
        }

        let Some(biome) = index.and_then(|i| self.biomes.get(i)).cloned() else {
            return;
        };

        let density = biome.roll_density(&mut self.rng);
        self.carver
            .carve(&mut self.segments[slot], density, &mut self.rng);

        for placer in &biome.placers {
            for _ in 0..placer.count {
                self.place_group(placer.margin, slot);
            }
        }

        if biome.roll_power_up(&mut self.rng) {
            self.place_power_up(slot);
        }

        self.total += 1;
    }

    /// A placed alien plus the rest of its group, lined up behind it
    fn place_group(&mut self, margin: u32, slot: usize) {
        let Some(leader) = self.random_alien(margin, slot) else {
            return;
        };
        let kind = leader.archetype();
        let tier = leader.tier();
        let origin = leader.core().pos;
        let spacing = leader.core().size * GROUP_SPACING;
        let count = tier.scale_group(kind.group_size());
        self.emit(Box::new(leader));

        for i in 1..count {
            let member = AlienEntity::new(kind, tier, origin + Vec2::new(i as f32 * spacing, 0.0));
            if member.check_placement(self) {
                self.emit(Box::new(member));
            }
        }
    }

    /// Pick an alien from the current biome and a site in the given window
    /// slot whose footprint, grown by `margin` tiles, is clear of solid
    /// tiles. Gives up after a bounded number of attempts.
    pub fn random_alien(&mut self, margin: u32, slot: usize) -> Option<AlienEntity> {
        let (kind, tier) = {
            let biome = self.biomes.current(self.total)?;
            biome.pick_alien(&mut self.rng)?
        };
        let start = self.segments.get(slot)?.start();
        let clearance = margin as f32 * TILE_SIZE;

        for _ in 0..MAX_PLACEMENT_ATTEMPTS {
            let x = start + self.rng.random_range(0..SEGMENT_WIDTH as i64);
            let y = self.rng.random_range(0..SEGMENT_HEIGHT as i64);
            let alien = AlienEntity::new(kind, tier, tile_to_world(x, y));
            let footprint = alien.core().box_collider().expand(clearance);
            if self.is_in_bounds(&footprint) && !self.overlaps_solid(&footprint) {
                return Some(alien);
            }
        }

        log::debug!("No site for {:?} in slot {}", kind, slot);
        None
    }

    fn place_power_up(&mut self, slot: usize) {
        let start = self.segments[slot].start();
        let kind = PowerUpKind::random_pick(&mut self.rng);

        for _ in 0..MAX_PLACEMENT_ATTEMPTS {
            let x = start + self.rng.random_range(0..SEGMENT_WIDTH as i64);
            let y = self.rng.random_range(0..SEGMENT_HEIGHT as i64);
            let open = self.get_tile(x, y).is_ok_and(|id| !tile::is_solid(id));
            if !open {
                continue;
            }
            let power_up = PowerUpEntity::new(tile_to_world(x, y), kind);
            if power_up.check_placement(self) {
                self.emit(Box::new(power_up));
                return;
            }
        }
    }

    // === Entities ===

    /// Hand an entity to the level. It is held in the pending buffer and
    /// becomes live at the start of the next tick.
    pub fn add_entity(&mut self, mut entity: Box<dyn Entity>) -> Result<EntityHandle, LevelError> {
        let is_player = entity.kind() == EntityKind::Player;
        if is_player && self.has_player() {
            log::error!("Rejected a second player entity");
            debug_assert!(!self.has_player(), "second player entity added");
            return Err(LevelError::DuplicatePlayer);
        }

        let handle = self.entities.reserve();
        entity.core_mut().handle = Some(handle);
        if is_player {
            self.player = Some(handle);
        }
        self.pending.push((handle, entity));
        Ok(handle)
    }

    /// `add_entity` for callers that cannot do anything about a rejection
    pub fn emit(&mut self, entity: Box<dyn Entity>) {
        if let Err(e) = self.add_entity(entity) {
            log::error!("Entity dropped: {}", e);
        }
    }

    fn has_player(&self) -> bool {
        self.player.is_some_and(|h| self.entities.is_current(h))
    }

    pub fn entity(&self, handle: EntityHandle) -> Option<&dyn Entity> {
        self.entities.get(handle).map(|e| e.as_ref())
    }

    /// Live entities in insertion order
    pub fn entities(&self) -> impl Iterator<Item = (EntityHandle, &dyn Entity)> {
        self.entities.iter().map(|(h, e)| (h, e.as_ref()))
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn player(&self) -> Option<EntityHandle> {
        self.player
    }

    pub fn player_entity(&self) -> Option<&PlayerEntity> {
        self.player
            .and_then(|h| self.entities.get(h))
            .and_then(|e| e.as_player())
    }

    pub fn player_position(&self) -> Option<Vec2> {
        self.player_entity().map(|p| p.core().pos)
    }

    /// Deal damage to an entity. Does nothing if the handle does not resolve,
    /// which includes the entity currently being ticked.
    pub fn damage(&mut self, target: EntityHandle, amount: i32, damager: Option<&dyn Entity>) {
        let Some(mut entity) = self.entities.take(target) else {
            return;
        };
        entity.on_damage(self, amount, damager);
        self.entities.restore(target, entity);
    }

    /// Run `f` with mutable access to both an entity and the level
    pub fn with_entity_mut<R>(
        &mut self,
        handle: EntityHandle,
        f: impl FnOnce(&mut dyn Entity, &mut Level) -> R,
    ) -> Option<R> {
        let mut entity = self.entities.take(handle)?;
        let result = f(entity.as_mut(), self);
        self.entities.restore(handle, entity);
        Some(result)
    }

    // === Collision ===

    /// First solid tile the entity overlaps in row-major order, otherwise
    /// the first live entity in insertion order that both sides agree to
    /// collide with.
    pub fn check_collision(&self, me: &dyn Entity) -> Collision {
        let own = me.core().box_collider();
        if let Some((x, y)) = self.first_solid_tile(&own) {
            return Collision::Tile { x, y };
        }

        let me_handle = me.core().handle;
        self.entities
            .iter()
            .filter(|&(h, _)| Some(h) != me_handle)
            .find(|&(_, other)| Self::contact(me, &own, &**other))
            .map_or(Collision::Miss, |(h, _)| Collision::Entity(h))
    }

    /// Whether the entity is in contact with one specific target, ignoring
    /// tiles and whatever else it overlaps
    pub fn touches(&self, me: &dyn Entity, target: EntityHandle) -> bool {
        if me.core().handle == Some(target) {
            return false;
        }
        let own = me.core().box_collider();
        self.entities
            .get(target)
            .is_some_and(|other| Self::contact(me, &own, &**other))
    }

    fn contact(me: &dyn Entity, own: &BoxCollider, other: &dyn Entity) -> bool {
        !other.core().dead
            && me.should_collide(other)
            && other.should_collide(me)
            && own.intersects(&other.core().box_collider())
    }

    /// Whether any solid tile overlaps the box
    pub fn overlaps_solid(&self, b: &BoxCollider) -> bool {
        self.first_solid_tile(b).is_some()
    }

    fn first_solid_tile(&self, b: &BoxCollider) -> Option<(i64, i64)> {
        let x0 = (b.x0 / TILE_SIZE).floor() as i64;
        let x1 = (b.x1 / TILE_SIZE).ceil() as i64;
        let y0 = (b.y0 / TILE_SIZE).floor() as i64;
        let y1 = (b.y1 / TILE_SIZE).ceil() as i64;

        for y in y0..y1 {
            for x in x0..x1 {
                if !self.get_tile(x, y).is_ok_and(tile::is_solid) {
                    continue;
                }
                let cell = BoxCollider::new(
                    x as f32 * TILE_SIZE,
                    y as f32 * TILE_SIZE,
                    (x + 1) as f32 * TILE_SIZE,
                    (y + 1) as f32 * TILE_SIZE,
                );
                if cell.intersects(b) {
                    return Some((x, y));
                }
            }
        }
        None
    }

    // === Tiles ===

    /// Map absolute tile coordinates to (window slot, local x, local y)
    fn locate(&self, x: i64, y: i64) -> Option<(usize, usize, usize)> {
        if !(0..SEGMENT_HEIGHT as i64).contains(&y) {
            return None;
        }
        let offset = x - self.segments[0].start();
        if offset < 0 {
            return None;
        }
        let slot = (offset / SEGMENT_WIDTH as i64) as usize;
        if slot >= WINDOW_SEGMENTS {
            return None;
        }
        let local = (offset % SEGMENT_WIDTH as i64) as usize;
        Some((slot, local, y as usize))
    }

    pub fn get_tile(&self, x: i64, y: i64) -> Result<TileId, LevelError> {
        self.locate(x, y)
            .and_then(|(slot, lx, ly)| self.segments[slot].get(lx, ly))
            .ok_or(LevelError::OutOfWindow { x, y })
    }

    pub fn set_tile(&mut self, x: i64, y: i64, tile: TileId) -> Result<(), LevelError> {
        let (slot, lx, ly) = self.locate(x, y).ok_or(LevelError::OutOfWindow { x, y })?;
        self.segments[slot].set(lx, ly, tile);
        Ok(())
    }

    /// Window segment by slot, 0 being the leftmost
    pub fn segment(&self, slot: usize) -> Option<&LevelSegment> {
        self.segments.get(slot)
    }

    pub fn to_tile_pos(&self, pos: Vec2) -> (i64, i64) {
        world_to_tile(pos)
    }

    pub fn to_entity_pos(&self, x: i64, y: i64) -> Vec2 {
        tile_to_world(x, y)
    }

    // === Scrolling and view ===

    /// Current scroll speed in pixels per tick
    /// Current scroll speed in pixels per tick, never negative
    pub fn speed(&self) -> f64 {
        (self.base_speed + self.biome_speed as f64).clamp(0.0, MAX_SPEED)
    }

    pub fn scroll(&self) -> f64 {
        self.scroll
    }

    /// Sub-tile part of the scroll offset in pixels
    pub fn skip(&self) -> f32 {
        (self.scroll % TILE_SIZE as f64) as f32
    }

    pub fn to_screen(&self, pos: Vec2) -> Vec2 {
        pos - Vec2::new(self.scroll as f32, 0.0)
    }

    fn screen_box(&self) -> BoxCollider {
        let left = self.scroll as f32;
        BoxCollider::new(left, 0.0, left + SCREEN_WIDTH, SCREEN_HEIGHT)
    }

    pub fn is_on_screen(&self, b: &BoxCollider) -> bool {
        self.screen_box().intersects(b)
    }

    /// Whether the box lies fully inside the rolling window
    pub fn is_in_bounds(&self, b: &BoxCollider) -> bool {
        let left = self.segments[0].start() as f32 * TILE_SIZE;
        let right = self.segments[WINDOW_SEGMENTS - 1].end() as f32 * TILE_SIZE;
        b.x0 >= left && b.x1 <= right && b.y0 >= 0.0 && b.y1 <= SCREEN_HEIGHT
    }

    // === Score, input, events ===

    pub fn score(&self) -> i64 {
        self.score
    }

    pub fn hi(&self) -> i64 {
        self.hi
    }

    pub fn add_score(&mut self, points: i64) {
        self.score += points;
        if self.score > self.hi {
            self.hi = self.score;
        }
    }

    pub fn highscores(&self) -> &HighScores {
        &self.highscores
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn age(&self) -> u64 {
        self.age
    }

    pub fn total_segments(&self) -> u32 {
        self.total
    }

    pub fn biome_index(&self) -> Option<usize> {
        self.biome_index
    }

    pub fn rng(&mut self) -> &mut Pcg32 {
        &mut self.rng
    }

    pub fn input(&self) -> InputState {
        self.input
    }

    pub fn set_input(&mut self, input: InputState) {
        self.input = input;
    }

    pub fn push_event(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Take the events raised since the last drain
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    // === Drawing ===

    /// Emit tiles and entities into `game_writer` and the HUD into
    /// `text_writer`. Reads state only.
    pub fn draw(
        &self,
        font: &TileSet,
        text_writer: &mut BufferWriter,
        tileset: &TileSet,
        game_writer: &mut BufferWriter,
    ) {
        self.draw_tiles(tileset, game_writer);

        for (_, entity) in self.entities.iter() {
            if self.is_on_screen(&entity.core().box_collider()) {
                entity.draw(self, tileset, game_writer);
            }
            if self.debug {
                entity.debug_draw(self, tileset, game_writer);
            }
        }

        self.draw_hud(font, text_writer);
    }

    fn draw_tiles(&self, tileset: &TileSet, writer: &mut BufferWriter) {
        let first = (self.scroll / TILE_SIZE as f64).floor() as i64;
        let columns = (SCREEN_WIDTH / TILE_SIZE) as i64 + 1;
        let skip = self.skip();

        for y in 0..SEGMENT_HEIGHT as i64 {
            for x in first..first + columns {
                let Ok(id) = self.get_tile(x, y) else {
                    continue;
                };
                let Some(sprite) = tile::info(id).and_then(|t| t.sprite) else {
                    continue;
                };
                let x0 = (x - first) as f32 * TILE_SIZE - skip;
                let y0 = y as f32 * TILE_SIZE;
                writer.rect(
                    x0,
                    y0,
                    x0 + TILE_SIZE,
                    y0 + TILE_SIZE,
                    tileset.sprite_index(sprite),
                    colors::WHITE,
                );
            }
        }
    }

    fn draw_hud(&self, font: &TileSet, writer: &mut BufferWriter) {
        const GLYPH: f32 = 8.0;

        writer.text(4.0, 4.0, GLYPH, &format!("SCORE {:>7}", self.score), font, colors::HUD);
        let hi = format!("HI {:>7}", self.hi);
        let hi_x = SCREEN_WIDTH - 4.0 - hi.len() as f32 * GLYPH;
        writer.text(hi_x, 4.0, GLYPH, &hi, font, colors::HUD);

        if let Some(player) = self.player_entity() {
            let health = format!("HP {:>3}", player.health().max(0));
            writer.text(4.0, SCREEN_HEIGHT - 12.0, GLYPH, &health, font, colors::HUD);
        }

        let banner = match self.state {
            GameState::Begin => Some("PRESS FIRE"),
            GameState::Playing => None,
            GameState::Dead => Some("GAME OVER"),
        };
        if let Some(banner) = banner {
            let x = (SCREEN_WIDTH - banner.len() as f32 * GLYPH * 2.0) / 2.0;
            writer.text(x, SCREEN_HEIGHT / 2.0 - GLYPH, GLYPH * 2.0, banner, font, colors::HUD);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::biome::{AlienKind, Evolution};
    use crate::sim::entity::{BulletEntity, ParticleEntity};
    use crate::sim::tile::{AIR, ROCK};
    use proptest::prelude::*;

    /// One unbounded biome: no terrain, no aliens, no power-ups
    fn open_biomes() -> BiomeManager {
        let mut biomes = BiomeManager::new();
        biomes.begin_biome().set_power_up_rarity(0);
        biomes
    }

    fn fast_level(biomes: BiomeManager, seed: u64) -> Level {
        let config = GameConfig {
            seed: Some(seed),
            base_speed: 48.0,
            biomes: Some(biomes),
            ..Default::default()
        };
        Level::new(&config, Box::new(MemoryStore::new())).unwrap()
    }

    fn assert_window_contiguous(level: &Level) {
        for i in 0..WINDOW_SEGMENTS - 1 {
            let a = level.segment(i).unwrap();
            let b = level.segment(i + 1).unwrap();
            assert_eq!(b.start(), a.end());
            assert_eq!(b.start(), a.start() + SEGMENT_WIDTH as i64);
        }
    }

    #[test]
    fn test_empty_biome_table_rejected() {
        let result = Level::with_seed(BiomeManager::new(), 1);
        assert!(matches!(result, Err(LevelError::EmptyBiomeTable)));
    }

    #[test]
    fn test_state_machine() {
        let mut level = Level::with_seed(open_biomes(), 1).unwrap();
        assert_eq!(level.state(), GameState::Begin);
        assert!(matches!(
            level.set_state(GameState::Dead),
            Err(LevelError::InvalidTransition { .. })
        ));

        level.start().unwrap();
        assert_eq!(level.state(), GameState::Playing);
        assert!(level.set_state(GameState::Begin).is_err());

        level.set_state(GameState::Dead).unwrap();
        assert!(level.set_state(GameState::Playing).is_err());
        assert!(level.set_state(GameState::Begin).is_err());
        assert!(level.set_state(GameState::Dead).is_ok());
        assert_eq!(level.state(), GameState::Dead);

        let died = level
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, GameEvent::PlayerDied { .. }))
            .count();
        assert_eq!(died, 1);
    }

    #[test]
    fn test_begin_state_is_static() {
        let mut level = Level::with_seed(open_biomes(), 1).unwrap();
        level.spawn_initial().unwrap();
        for _ in 0..50 {
            level.tick();
        }
        assert_eq!(level.scroll(), 0.0);
        assert_eq!(level.score(), 0);
    }

    #[test]
    fn test_pending_entity_invisible_until_next_tick() {
        let mut level = Level::with_seed(open_biomes(), 3).unwrap();
        level.start().unwrap();

        let pos = Vec2::new(300.0, 100.0);
        let handle = level
            .add_entity(Box::new(PowerUpEntity::new(pos, PowerUpKind::Live)))
            .unwrap();
        let query = BulletEntity::new(pos, Vec2::ZERO, 1, None, true);

        assert!(level.entity(handle).is_none());
        assert_eq!(level.entities().count(), 0);
        assert_eq!(level.check_collision(&query), Collision::Miss);

        level.tick();

        assert!(level.entity(handle).is_some());
        assert_eq!(level.check_collision(&query), Collision::Entity(handle));
    }

    #[test]
    fn test_entities_added_during_tick_wait_a_tick() {
        let mut level = Level::with_seed(open_biomes(), 3).unwrap();
        level.start().unwrap();
        level.spawn_initial().unwrap();
        level.set_input(InputState {
            fire: true,
            ..Default::default()
        });

        level.tick();
        // The shot is pending, only the player is live
        assert_eq!(level.entity_count(), 1);
        level.tick();
        assert!(level.entities().any(|(_, e)| e.kind() == EntityKind::Bullet));
    }

    #[test]
    fn test_out_of_window_access_is_an_error() {
        let mut level = Level::with_seed(open_biomes(), 5).unwrap();
        let right = (WINDOW_SEGMENTS * SEGMENT_WIDTH) as i64;

        assert!(level.get_tile(0, 0).is_ok());
        assert!(level.get_tile(right - 1, SEGMENT_HEIGHT as i64 - 1).is_ok());
        assert!(matches!(
            level.get_tile(-1, 0),
            Err(LevelError::OutOfWindow { x: -1, y: 0 })
        ));
        assert!(level.get_tile(right, 0).is_err());
        assert!(level.get_tile(0, SEGMENT_HEIGHT as i64).is_err());
        assert!(level.set_tile(0, -1, ROCK).is_err());

        level.set_tile(200, 10, ROCK).unwrap();
        assert_eq!(level.get_tile(200, 10).unwrap(), ROCK);
    }

    #[test]
    fn test_scrolled_out_columns_leave_the_window() {
        let mut level = fast_level(open_biomes(), 5);
        level.start().unwrap();
        while level.segment(0).unwrap().start() == 0 {
            level.tick();
        }
        assert!(level.get_tile(0, 0).is_err());
        assert_window_contiguous(&level);
    }

    #[test]
    fn test_tile_hit_is_first_in_row_major_order() {
        let mut level = Level::with_seed(open_biomes(), 9).unwrap();
        // Box covers tiles x 9..=10, y 5..=6
        let query = PowerUpEntity::new(Vec2::new(160.0, 96.0), PowerUpKind::Live);
        level.set_tile(9, 6, ROCK).unwrap();
        level.set_tile(10, 5, ROCK).unwrap();

        let first = level.check_collision(&query);
        assert_eq!(first, Collision::Tile { x: 10, y: 5 });
        for _ in 0..10 {
            assert_eq!(level.check_collision(&query), first);
        }

        level.set_tile(10, 5, AIR).unwrap();
        assert_eq!(level.check_collision(&query), Collision::Tile { x: 9, y: 6 });
    }

    #[test]
    fn test_entity_hit_is_first_in_insertion_order() {
        let mut level = Level::with_seed(open_biomes(), 9).unwrap();
        let pos = Vec2::new(200.0, 200.0);
        let first = level
            .add_entity(Box::new(PowerUpEntity::new(pos, PowerUpKind::Live)))
            .unwrap();
        let _second = level
            .add_entity(Box::new(PowerUpEntity::new(pos + Vec2::X, PowerUpKind::Shield)))
            .unwrap();
        level.tick();

        let query = BulletEntity::new(pos, Vec2::ZERO, 1, None, true);
        for _ in 0..10 {
            assert_eq!(level.check_collision(&query), Collision::Entity(first));
        }

        // Particles never agree to collide
        let spark = ParticleEntity::new(pos, Vec2::ZERO, 10, colors::PARTICLE);
        assert_eq!(level.check_collision(&spark), Collision::Miss);
    }

    #[test]
    fn test_open_world_run_survives_and_scores_distance() {
        let mut level = Level::with_seed(open_biomes(), 11).unwrap();
        level.start().unwrap();
        level.spawn_initial().unwrap();

        let mut last = level.score();
        for _ in 0..30 {
            for _ in 0..100 {
                level.tick();
            }
            assert_eq!(level.state(), GameState::Playing);
            assert!(level.score() > last);
            last = level.score();
        }
        assert!(level.player_entity().is_some());
        let tiles = (level.scroll() / TILE_SIZE as f64).floor() as i64;
        assert_eq!(level.score(), tiles * DISTANCE_POINTS);
    }

    #[test]
    fn test_biome_changes_are_reported() {
        let mut biomes = BiomeManager::new();
        biomes.begin_biome().set_power_up_rarity(0).set_end_segment(2);
        biomes.begin_biome().set_power_up_rarity(0).set_speed(0.5);

        let mut level = Level::with_seed(biomes, 2).unwrap();
        let changes: Vec<_> = level
            .drain_events()
            .into_iter()
            .filter_map(|e| match e {
                GameEvent::BiomeChanged { index } => Some(index),
                _ => None,
            })
            .collect();
        assert_eq!(changes, vec![0, 1]);
        assert_eq!(level.biome_index(), Some(1));
        assert!((level.speed() - (BASE_SPEED + 0.5)).abs() < 1e-6);
    }

    #[test]
    fn test_speed_eases_toward_biome_modifier() {
        let mut biomes = BiomeManager::new();
        biomes.begin_biome().set_power_up_rarity(0).set_end_segment(4);
        biomes.begin_biome().set_power_up_rarity(0).set_speed(1.0);

        let mut level = fast_level(biomes, 4);
        level.start().unwrap();
        let before = level.speed();
        while level.total_segments() < 5 {
            level.tick();
        }
        let mut previous = level.speed();
        for _ in 0..5 {
            level.tick();
            assert!(level.speed() > previous);
            previous = level.speed();
        }
        assert!(previous > before);
        assert!(previous < before + 1.0);
    }

    #[test]
    fn test_player_shot_collects_power_up_for_player() {
        let mut level = Level::with_seed(open_biomes(), 13).unwrap();
        level.start().unwrap();
        level.spawn_initial().unwrap();
        let player_pos = level.player_position().unwrap();
        let target = level
            .add_entity(Box::new(PowerUpEntity::new(
                player_pos + Vec2::new(120.0, 0.0),
                PowerUpKind::Shield,
            )))
            .unwrap();

        level.set_input(InputState {
            fire: true,
            ..Default::default()
        });
        let mut events = Vec::new();
        for _ in 0..40 {
            level.tick();
            events.extend(level.drain_events());
        }

        assert!(events.contains(&GameEvent::Coin {
            kind: PowerUpKind::Shield
        }));
        assert!(events.contains(&GameEvent::ShieldUp));
        assert!(level.player_entity().unwrap().is_shielded());
        assert!(level.entity(target).is_none());
    }

    #[test]
    fn test_orphan_bullet_does_not_collect_power_up() {
        let mut level = Level::with_seed(open_biomes(), 13).unwrap();
        level.start().unwrap();
        let pos = Vec2::new(300.0, 200.0);
        let target = level
            .add_entity(Box::new(PowerUpEntity::new(pos, PowerUpKind::Live)))
            .unwrap();
        level.emit(Box::new(BulletEntity::new(pos, Vec2::ZERO, 1, None, true)));

        level.tick();
        level.tick();

        let events = level.drain_events();
        assert!(!events.iter().any(|e| matches!(e, GameEvent::Coin { .. })));
        assert!(level.entity(target).is_some());
    }

    #[test]
    fn test_alien_kill_scores_points() {
        let mut level = Level::with_seed(open_biomes(), 17).unwrap();
        level.start().unwrap();
        let pos = Vec2::new(300.0, 200.0);
        let alien = AlienEntity::new(AlienKind::Mine, Evolution::Low, pos);
        let points = alien.points();
        let handle = level.add_entity(Box::new(alien)).unwrap();
        level.tick();

        let score = level.score();
        let bullet = BulletEntity::new(pos, Vec2::ZERO, 1, None, true);
        level.damage(handle, 1, Some(&bullet));
        assert_eq!(level.score(), score + points);
        assert!(level.entity(handle).is_some_and(|e| e.should_remove()));
    }

    #[test]
    fn test_score_raises_hi() {
        let mut level = Level::with_seed(open_biomes(), 1).unwrap();
        level.add_score(50);
        assert_eq!(level.hi(), 50);
        level.add_score(25);
        assert_eq!(level.hi(), 75);
    }

    #[test]
    fn test_death_records_high_score() {
        let mut level = Level::with_seed(open_biomes(), 1).unwrap();
        level.start().unwrap();
        level.add_score(120);
        level.set_state(GameState::Dead).unwrap();
        assert_eq!(level.highscores().top_score(), Some(120));
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic(expected = "second player"))]
    fn test_second_player_rejected() {
        let mut level = Level::with_seed(open_biomes(), 1).unwrap();
        level.spawn_initial().unwrap();
        let result = level.add_entity(Box::new(PlayerEntity::new(Vec2::ZERO)));
        assert!(matches!(result, Err(LevelError::DuplicatePlayer)));
    }

    #[test]
    fn test_draw_does_not_mutate() {
        let mut level = Level::with_seed(BiomeManager::standard(), 21).unwrap();
        level.start().unwrap();
        level.spawn_initial().unwrap();
        for _ in 0..20 {
            level.tick();
        }
        let font = TileSet::new(16, 16);
        let tiles = TileSet::new(8, 8);
        let mut text = BufferWriter::new();
        let mut game = BufferWriter::new();
        let (scroll, score, count) = (level.scroll(), level.score(), level.entity_count());
        level.draw(&font, &mut text, &tiles, &mut game);
        assert!(!text.is_empty());
        assert!(!game.is_empty());
        assert_eq!(
            (level.scroll(), level.score(), level.entity_count()),
            (scroll, score, count)
        );
    }

    #[test]
    fn test_same_seed_same_world() {
        let a = Level::with_seed(BiomeManager::standard(), 77).unwrap();
        let b = Level::with_seed(BiomeManager::standard(), 77).unwrap();
        for slot in 0..WINDOW_SEGMENTS {
            assert_eq!(a.segment(slot), b.segment(slot));
        }
        assert_eq!(a.entity_count(), b.entity_count());
    }

    #[test]
    fn test_invalid_speed_or_terrain_config_is_an_error() {
        for json in [
            r#"{ "seed": 1, "biomes": [ { "speed": -2.0, "power_up_rarity": 0 } ] }"#,
            r#"{ "seed": 1, "biomes": [ { "terrain": [-3e38, 3e38] } ] }"#,
        ] {
            let config: GameConfig = serde_json::from_str(json).unwrap();
            let result = Level::new(&config, Box::new(MemoryStore::new()));
            assert!(matches!(result, Err(LevelError::Config(_))), "{json}");
        }
    }

    #[test]
    fn test_scroll_never_runs_backwards() {
        let mut biomes = BiomeManager::new();
        biomes.begin_biome().set_speed(-0.5).set_end_segment(5);
        biomes.begin_biome().set_speed(0.5).set_power_up_rarity(0);
        let mut level = Level::with_seed(biomes, 1).unwrap();
        level.start().unwrap();

        let mut before = level.scroll();
        for _ in 0..2_000 {
            level.tick();
            assert!(level.speed() >= 0.0);
            assert!(level.scroll() >= before);
            before = level.scroll();
        }
    }

    fn mines_only() -> BiomeManager {
        let mut biomes = BiomeManager::new();
        biomes
            .begin_biome()
            .add_alien(AlienKind::Mine, 1)
            .set_power_up_rarity(0);
        biomes
    }

    #[test]
    fn test_random_alien_gives_up_on_a_solid_slot() {
        let mut level = Level::with_seed(mines_only(), 3).unwrap();
        assert!(level.random_alien(0, 1).is_some());

        let start = level.segment(1).unwrap().start();
        for x in start..start + SEGMENT_WIDTH as i64 {
            for y in 0..SEGMENT_HEIGHT as i64 {
                level.set_tile(x, y, ROCK).unwrap();
            }
        }
        for _ in 0..20 {
            assert!(level.random_alien(0, 1).is_none());
        }
    }

    #[test]
    fn test_random_alien_gives_up_when_margin_cannot_fit() {
        let mut level = Level::with_seed(mines_only(), 3).unwrap();
        assert!(level.random_alien(SEGMENT_HEIGHT as u32, 2).is_none());
        assert!(level.random_alien(0, WINDOW_SEGMENTS).is_none());
    }

    #[test]
    fn test_biome_without_aliens_places_none() {
        let mut biomes = BiomeManager::new();
        biomes
            .begin_biome()
            .add_enemy_placer(4, 0)
            .set_power_up_rarity(0);
        let mut level = fast_level(biomes, 8);
        assert!(level.random_alien(0, 1).is_none());

        level.spawn_initial().unwrap();
        level.start().unwrap();
        for _ in 0..100 {
            level.tick();
        }
        assert!(level.total_segments() > WINDOW_SEGMENTS as u32);
        assert!(level.entities().all(|(_, e)| e.kind() != EntityKind::Alien));
    }

    #[test]
    fn test_alien_contact_not_hidden_by_earlier_overlap() {
        let mut level = Level::with_seed(open_biomes(), 5).unwrap();
        let pos = Vec2::new(64.0, SCREEN_HEIGHT / 2.0);
        // Insertion order: alien, a player bullet on top of it, then the player
        let alien = AlienEntity::new(AlienKind::Mine, Evolution::Low, pos);
        level.add_entity(Box::new(alien)).unwrap();
        level
            .add_entity(Box::new(BulletEntity::new(pos, Vec2::ZERO, 1, None, true)))
            .unwrap();
        level.spawn_initial().unwrap();
        level.start().unwrap();
        level.tick();

        let health = level.player_entity().map(|p| p.health());
        assert!(health.is_some_and(|h| h < PLAYER_HEALTH));
        assert!(
            level
                .drain_events()
                .iter()
                .any(|e| matches!(e, GameEvent::PlayerHit { .. }))
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_window_stays_contiguous(seed in any::<u64>(), ticks in 1usize..200) {
            let mut level = fast_level(BiomeManager::standard(), seed);
            level.start().unwrap();
            for _ in 0..ticks {
                level.tick();
                assert_window_contiguous(&level);
            }
            let first = level.segment(0).unwrap().start() as f64;
            prop_assert!(level.scroll() / TILE_SIZE as f64 >= first);
            prop_assert!(level.scroll() / (TILE_SIZE as f64) < first + SEGMENT_WIDTH as f64);
        }
    }
}
