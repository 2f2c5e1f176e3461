//! Game configuration
//!
//! Persisted in the host's key-value store next to the high scores. Every
//! field has a default so partial JSON documents load fine.

use serde::{Deserialize, Serialize};

use crate::consts::{BASE_SPEED, MAX_SPEED};
use crate::error::ConfigError;
use crate::persistence::KeyValueStore;
use crate::sim::BiomeManager;

fn default_base_speed() -> f64 {
    BASE_SPEED
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    /// RNG seed; drawn from the OS when absent
    #[serde(default)]
    pub seed: Option<u64>,
    /// Scroll speed in pixels per tick before biome modifiers
    #[serde(default = "default_base_speed")]
    pub base_speed: f64,
    /// Draw collider outlines
    #[serde(default)]
    pub debug_colliders: bool,
    /// Replaces the built-in biome table
    #[serde(default)]
    pub biomes: Option<BiomeManager>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            seed: None,
            base_speed: BASE_SPEED,
            debug_colliders: false,
            biomes: None,
        }
    }
}

impl GameConfig {
    const STORAGE_KEY: &'static str = "config";

    /// Parse and validate a JSON document
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject tables the generator cannot run and speeds that would stall,
    /// reverse or outrun the rolling window
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=MAX_SPEED).contains(&self.base_speed) {
            return Err(ConfigError::SpeedOutOfRange {
                speed: self.base_speed,
                max: MAX_SPEED,
            });
        }
        let biomes = self.biomes();
        biomes.validate()?;
        biomes.validate_speeds(self.base_speed)
    }

    /// The configured biome table, or the built-in campaign
    pub fn biomes(&self) -> BiomeManager {
        self.biomes.clone().unwrap_or_else(BiomeManager::standard)
    }

    /// Load from the store, falling back to defaults
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let Some(json) = store.get(Self::STORAGE_KEY) else {
            log::info!("No config found, using defaults");
            return Self::default();
        };
        match Self::from_json(&json) {
            Ok(config) => {
                log::info!("Config loaded");
                config
            }
            Err(e) => {
                log::warn!("Ignoring stored config: {}", e);
                Self::default()
            }
        }
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) {
        match self.to_json() {
            Ok(json) => {
                store.set(Self::STORAGE_KEY, &json);
                log::info!("Config saved");
            }
            Err(e) => log::error!("Failed to serialize config: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;

    #[test]
    fn test_partial_document_uses_defaults() {
        let config = GameConfig::from_json(r#"{ "seed": 7 }"#).unwrap();
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.base_speed, BASE_SPEED);
        assert!(config.biomes.is_none());
    }

    #[test]
    fn test_base_speed_out_of_range_rejected() {
        for json in [r#"{ "base_speed": -1.0 }"#, r#"{ "base_speed": 1e12 }"#] {
            let err = GameConfig::from_json(json).unwrap_err();
            assert!(matches!(err, ConfigError::SpeedOutOfRange { .. }), "{json}");
        }
    }

    #[test]
    fn test_biome_speed_cannot_reverse_scroll() {
        let json = r#"{ "seed": 1, "biomes": [ { "speed": -2.0, "power_up_rarity": 0 } ] }"#;
        let err = GameConfig::from_json(json).unwrap_err();
        assert!(matches!(err, ConfigError::BiomeSpeed { index: 0, .. }));

        // A negative modifier is fine while the sum stays non-negative
        let json = r#"{ "base_speed": 3.0, "biomes": [ { "speed": -2.0 } ] }"#;
        assert!(GameConfig::from_json(json).is_ok());
    }

    #[test]
    fn test_default_table_checked_against_base_speed() {
        let config = GameConfig {
            base_speed: MAX_SPEED,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BiomeSpeed { .. })
        ));
    }

    #[test]
    fn test_unsampleable_terrain_rejected() {
        let json = r#"{ "seed": 1, "biomes": [ { "terrain": [-3e38, 3e38] } ] }"#;
        let err = GameConfig::from_json(json).unwrap_err();
        assert!(matches!(err, ConfigError::TerrainRange { index: 0, .. }));
    }

    #[test]
    fn test_unordered_biomes_rejected() {
        let json = r#"{ "biomes": [ { "end": 10 }, { "end": 5 }, {} ] }"#;
        let err = GameConfig::from_json(json).unwrap_err();
        assert!(matches!(err, ConfigError::BiomeOrder { index: 1, .. }));
    }

    #[test]
    fn test_store_round_trip() {
        let mut store = MemoryStore::new();
        let config = GameConfig {
            seed: Some(99),
            debug_colliders: true,
            biomes: Some(BiomeManager::standard()),
            ..Default::default()
        };
        config.save(&mut store);
        assert_eq!(GameConfig::load(&store), config);
    }

    #[test]
    fn test_malformed_store_falls_back() {
        let mut store = MemoryStore::new();
        store.set(GameConfig::STORAGE_KEY, "[1, 2");
        assert_eq!(GameConfig::load(&store), GameConfig::default());
    }
}
