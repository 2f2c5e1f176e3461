//! Biome rule tables
//!
//! A biome covers a half-open range of generated segments and decides what
//! the generator puts into each new segment: terrain density, which aliens
//! and how evolved, how many placement passes, and how often power-ups show.
//! Biomes are stored in order; each one starts where the previous ended.

use rand::Rng;
use rand::distr::weighted::WeightedIndex;
use serde::{Deserialize, Serialize};

use crate::consts::MAX_SPEED;
use crate::error::ConfigError;

/// Alien archetypes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlienKind {
    /// Stationary, explodes on contact
    Mine,
    /// Drifts toward the player in a sine sweep
    Sweeper,
    /// Anchored, fires at the player
    Turret,
    /// Patrols up and down between obstacles
    Vertical,
}

impl AlienKind {
    /// How many aliens of this kind one placement spawns at the lowest tier
    pub fn group_size(&self) -> u32 {
        match self {
            AlienKind::Mine => 3,
            AlienKind::Sweeper => 2,
            AlienKind::Turret => 1,
            AlienKind::Vertical => 1,
        }
    }
}

/// Difficulty grade applied to a placed alien
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Evolution {
    Low,
    Medium,
    High,
}

impl Evolution {
    /// Multiplier applied to health, fire rate and points
    pub fn factor(&self) -> i32 {
        match self {
            Evolution::Low => 1,
            Evolution::Medium => 2,
            Evolution::High => 3,
        }
    }

    /// Stronger tiers come in smaller groups
    pub fn scale_group(&self, base: u32) -> u32 {
        match self {
            Evolution::High => base.saturating_sub(1).max(1),
            _ => base,
        }
    }
}

/// One entry of a weighted table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weighted<T> {
    pub value: T,
    pub weight: u32,
}

/// Values drawn with probability proportional to their weight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightedTable<T> {
    entries: Vec<Weighted<T>>,
}

impl<T> Default for WeightedTable<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T: Copy> WeightedTable<T> {
    pub fn add(&mut self, value: T, weight: u32) {
        self.entries.push(Weighted { value, weight });
    }

    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(|e| e.weight == 0)
    }

    /// Draw one value; `None` when the table has no positive weight
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<T> {
        let dist = WeightedIndex::<u32>::new(self.entries.iter().map(|e| e.weight)).ok()?;
        Some(self.entries[rng.sample(&dist)].value)
    }
}

/// A placement pass run once per generated segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyPlacer {
    /// Placements attempted by this pass
    pub count: u32,
    /// Clearance in tiles kept around each alien
    pub margin: u32,
}

/// Power-up rarity used when a biome does not set one
pub const DEFAULT_POWER_UP_RARITY: u32 = 10;

fn default_power_up_rarity() -> u32 {
    DEFAULT_POWER_UP_RARITY
}

/// Spawn and terrain rules for a contiguous range of segments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Biome {
    /// Terrain carve density range, each in [0, 1]
    #[serde(default)]
    pub terrain: (f32, f32),
    #[serde(default)]
    pub aliens: WeightedTable<AlienKind>,
    #[serde(default)]
    pub evolutions: WeightedTable<Evolution>,
    #[serde(default)]
    pub placers: Vec<EnemyPlacer>,
    /// Percent chance per segment of placing a power-up
    #[serde(default = "default_power_up_rarity")]
    pub power_up_rarity: u32,
    /// Added to the base scroll speed while this biome is current
    #[serde(default)]
    pub speed: f32,
    /// Exclusive end of the segment range, `None` for unbounded
    #[serde(default)]
    pub end: Option<u32>,
}

impl Default for Biome {
    fn default() -> Self {
        Self {
            terrain: (0.0, 0.0),
            aliens: WeightedTable::default(),
            evolutions: WeightedTable::default(),
            placers: Vec::new(),
            power_up_rarity: DEFAULT_POWER_UP_RARITY,
            speed: 0.0,
            end: None,
        }
    }
}

impl Biome {
    pub fn set_terrain(&mut self, min: f32, max: f32) -> &mut Self {
        let min = min.clamp(0.0, 1.0);
        self.terrain = (min, max.clamp(0.0, 1.0).max(min));
        self
    }

    pub fn add_alien(&mut self, kind: AlienKind, weight: u32) -> &mut Self {
        self.aliens.add(kind, weight);
        self
    }

    pub fn add_evolution(&mut self, tier: Evolution, weight: u32) -> &mut Self {
        self.evolutions.add(tier, weight);
        self
    }

    pub fn add_enemy_placer(&mut self, count: u32, margin: u32) -> &mut Self {
        self.placers.push(EnemyPlacer { count, margin });
        self
    }

    pub fn set_power_up_rarity(&mut self, rarity: u32) -> &mut Self {
        self.power_up_rarity = rarity.min(100);
        self
    }

    pub fn set_speed(&mut self, speed: f32) -> &mut Self {
        self.speed = speed;
        self
    }

    pub fn set_end_segment(&mut self, end: u32) -> &mut Self {
        self.end = Some(end);
        self
    }

    /// Random terrain density inside the configured range
    pub fn roll_density<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        let (min, max) = self.terrain;
        if max > min {
            rng.random_range(min..max)
        } else {
            min
        }
    }

    /// Draw an archetype and its tier; `None` when the biome has no aliens
    pub fn pick_alien<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<(AlienKind, Evolution)> {
        let kind = self.aliens.pick(rng)?;
        let tier = self.evolutions.pick(rng).unwrap_or(Evolution::Low);
        Some((kind, tier))
    }

    /// Whether this segment gets a power-up
    pub fn roll_power_up<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        self.power_up_rarity > 0 && rng.random_range(0..100) < self.power_up_rarity
    }
}

/// Ordered biome list resolved by the cumulative segment counter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BiomeManager {
    biomes: Vec<Biome>,
}

impl BiomeManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new biome and return it for configuration
    pub fn begin_biome(&mut self) -> &mut Biome {
        self.biomes.push(Biome::default());
        let last = self.biomes.len() - 1;
        &mut self.biomes[last]
    }

    pub fn len(&self) -> usize {
        self.biomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.biomes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Biome> {
        self.biomes.get(index)
    }

    /// Half-open segment range of the biome at `index`
    pub fn range(&self, index: usize) -> Option<(u32, Option<u32>)> {
        let biome = self.biomes.get(index)?;
        let start = match index {
            0 => 0,
            _ => self.biomes[index - 1].end.unwrap_or(u32::MAX),
        };
        Some((start, biome.end))
    }

    /// Index of the first biome whose range contains `total`.
    /// Counters past every finite range resolve to the last biome.
    pub fn index_for(&self, total: u32) -> Option<usize> {
        if self.biomes.is_empty() {
            return None;
        }
        let found = self
            .biomes
            .iter()
            .position(|b| b.end.is_none_or(|end| total < end));
        Some(found.unwrap_or(self.biomes.len() - 1))
    }

    /// Biome active at the given segment counter
    pub fn current(&self, total: u32) -> Option<&Biome> {
        self.index_for(total).map(|i| &self.biomes[i])
    }

    /// Scroll speed modifier at the given segment counter
    pub fn speed_modifier(&self, total: u32) -> f32 {
        self.current(total).map_or(0.0, |b| b.speed)
    }

    /// Check that ranges are ordered, only the last one is unbounded and
    /// every terrain range is a valid density interval
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut previous = 0u32;
        let last = self.biomes.len().saturating_sub(1);
        for (index, biome) in self.biomes.iter().enumerate() {
            let (min, max) = biome.terrain;
            if !(0.0..=1.0).contains(&min) || !(min..=1.0).contains(&max) {
                return Err(ConfigError::TerrainRange { index, min, max });
            }
            match biome.end {
                Some(end) if end <= previous => {
                    return Err(ConfigError::BiomeOrder {
                        index,
                        end,
                        previous,
                    });
                }
                Some(end) => previous = end,
                None if index != last => return Err(ConfigError::UnboundedNotLast { index }),
                None => {}
            }
        }
        Ok(())
    }

    /// Check that every biome keeps `base + modifier` inside `0..=MAX_SPEED`
    pub fn validate_speeds(&self, base: f64) -> Result<(), ConfigError> {
        for (index, biome) in self.biomes.iter().enumerate() {
            let speed = base + biome.speed as f64;
            if !(0.0..=MAX_SPEED).contains(&speed) {
                return Err(ConfigError::BiomeSpeed {
                    index,
                    speed,
                    max: MAX_SPEED,
                });
            }
        }
        Ok(())
    }

    /// The built-in campaign
    pub fn standard() -> Self {
        use AlienKind::*;
        use Evolution::*;

        let mut biomes = Self::new();

        biomes
            .begin_biome() // opening, mines only
            .set_terrain(0.0, 0.25)
            .add_alien(Mine, 1)
            .add_evolution(Low, 1)
            .add_evolution(Medium, 1)
            .add_evolution(High, 1)
            .add_enemy_placer(1, 0)
            .set_power_up_rarity(30)
            .set_end_segment(6);

        biomes
            .begin_biome() // sweepers
            .set_terrain(0.0, 0.25)
            .add_alien(Sweeper, 2)
            .add_alien(Mine, 1)
            .add_evolution(Low, 1)
            .add_evolution(Medium, 1)
            .add_enemy_placer(1, 0)
            .set_power_up_rarity(30)
            .set_speed(0.1)
            .set_end_segment(20);

        biomes
            .begin_biome() // turrets show up
            .set_terrain(0.0, 0.27)
            .add_alien(Sweeper, 3)
            .add_alien(Turret, 1)
            .add_alien(Mine, 1)
            .add_evolution(Low, 1)
            .add_evolution(Medium, 1)
            .add_enemy_placer(1, 0)
            .set_speed(0.2)
            .set_end_segment(60);

        biomes
            .begin_biome() // strong sweepers
            .set_terrain(0.1, 0.28)
            .add_alien(Sweeper, 3)
            .add_evolution(High, 1)
            .add_enemy_placer(1, 0)
            .add_enemy_placer(1, 1)
            .set_speed(0.3)
            .set_end_segment(72);

        biomes
            .begin_biome() // mixed
            .set_terrain(0.0, 0.26)
            .add_alien(Sweeper, 3)
            .add_alien(Turret, 2)
            .add_alien(Mine, 1)
            .add_alien(Vertical, 2)
            .add_evolution(Low, 1)
            .add_evolution(Medium, 3)
            .add_enemy_placer(1, 0)
            .set_speed(0.35)
            .set_end_segment(100);

        biomes
            .begin_biome() // high evolution
            .set_terrain(0.0, 0.26)
            .add_alien(Sweeper, 1)
            .add_alien(Turret, 1)
            .add_evolution(Low, 1)
            .add_evolution(Medium, 4)
            .add_evolution(High, 1)
            .add_enemy_placer(1, 0)
            .add_enemy_placer(1, 4)
            .set_speed(0.45)
            .set_end_segment(140);

        biomes
            .begin_biome() // turret heavy
            .set_terrain(0.0, 0.27)
            .add_alien(Sweeper, 1)
            .add_alien(Turret, 5)
            .add_evolution(Low, 2)
            .add_evolution(Medium, 2)
            .add_evolution(High, 1)
            .add_enemy_placer(1, 0)
            .add_enemy_placer(1, 4)
            .set_speed(0.55)
            .set_end_segment(180);

        biomes
            .begin_biome() // endless
            .set_terrain(0.0, 0.26)
            .add_alien(Sweeper, 1)
            .add_alien(Turret, 1)
            .add_evolution(Medium, 3)
            .add_evolution(High, 1)
            .add_enemy_placer(1, 0)
            .add_enemy_placer(1, 5)
            .set_speed(0.7);

        biomes
    }
}
