//! Tile ids and the tile-type table

/// Tile id stored in segments
pub type TileId = u8;

pub const AIR: TileId = 0;
pub const ROCK: TileId = 1;
/// Rock with open space above it
pub const ROCK_TOP: TileId = 2;
/// Rock with open space below it
pub const ROCK_BOTTOM: TileId = 3;
/// Loose boulder scattered by the carver
pub const BOULDER: TileId = 4;
/// Background decoration, never solid
pub const MOSS: TileId = 5;

/// Static properties of a tile id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileInfo {
    pub solid: bool,
    /// Sprite index in the tileset, `None` for empty tiles
    pub sprite: Option<u16>,
}

const TILES: [TileInfo; 6] = [
    TileInfo { solid: false, sprite: None },
    TileInfo { solid: true, sprite: Some(16) },
    TileInfo { solid: true, sprite: Some(17) },
    TileInfo { solid: true, sprite: Some(18) },
    TileInfo { solid: true, sprite: Some(19) },
    TileInfo { solid: false, sprite: Some(20) },
];

/// Look up a tile id in the table
pub fn info(id: TileId) -> Option<&'static TileInfo> {
    TILES.get(id as usize)
}

/// Unknown ids count as solid so corrupted tiles never let entities through
#[inline]
pub fn is_solid(id: TileId) -> bool {
    info(id).is_none_or(|t| t.solid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solidity_table() {
        assert!(!is_solid(AIR));
        assert!(!is_solid(MOSS));
        assert!(is_solid(ROCK));
        assert!(is_solid(ROCK_TOP));
        assert!(is_solid(BOULDER));
        assert!(is_solid(200));
    }
}
