//! Events raised during a tick for the host (audio cues, HUD flashes)

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::entity::PowerUpKind;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Player or alien fired
    Shot { by_player: bool },
    /// Power-up collected
    Coin { kind: PowerUpKind },
    /// Something blew up
    Explosion { pos: Vec2 },
    /// Player lost health
    PlayerHit { health: i32 },
    /// Player's shield came up
    ShieldUp,
    /// Player ran out of health
    PlayerDied { score: i64 },
    /// The generator moved into a new biome
    BiomeChanged { index: usize },
}
