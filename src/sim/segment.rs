//! Fixed-size tile grid chunk of the scrolling world

use super::tile::{AIR, TileId, is_solid};

/// A `W x H` grid of tile ids starting at an absolute world tile column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment<const W: usize, const H: usize> {
    /// Absolute tile column of the first column in this segment
    start: i64,
    tiles: Box<[[TileId; W]; H]>,
}

impl<const W: usize, const H: usize> Segment<W, H> {
    /// Empty segment starting at the given world column
    pub fn new(start: i64) -> Self {
        Self {
            start,
            tiles: Box::new([[AIR; W]; H]),
        }
    }

    /// First world column covered by this segment
    #[inline]
    pub fn start(&self) -> i64 {
        self.start
    }

    /// One past the last world column covered by this segment
    #[inline]
    pub fn end(&self) -> i64 {
        self.start + W as i64
    }

    /// Tile at local coordinates, `None` outside the grid
    pub fn get(&self, x: usize, y: usize) -> Option<TileId> {
        self.tiles.get(y).and_then(|row| row.get(x)).copied()
    }

    /// Set the tile at local coordinates; returns false outside the grid
    pub fn set(&mut self, x: usize, y: usize, tile: TileId) -> bool {
        match self.tiles.get_mut(y).and_then(|row| row.get_mut(x)) {
            Some(cell) => {
                *cell = tile;
                true
            }
            None => false,
        }
    }

    pub fn is_solid(&self, x: usize, y: usize) -> bool {
        self.get(x, y).is_some_and(is_solid)
    }

    /// Reset every tile to air
    pub fn clear(&mut self) {
        for row in self.tiles.iter_mut() {
            row.fill(AIR);
        }
    }

    /// Reuse this segment's storage for a new world position
    pub fn reset(&mut self, start: i64) {
        self.start = start;
        self.clear();
    }

    pub fn solid_count(&self) -> usize {
        self.tiles
            .iter()
            .flat_map(|row| row.iter())
            .filter(|&&t| is_solid(t))
            .count()
    }
}
