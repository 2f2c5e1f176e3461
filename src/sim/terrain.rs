//! Terrain carving for freshly generated segments
//!
//! Floor and ceiling are random walks whose maximum thickness follows the
//! density; boulders are scattered in proportion to it. The walk state is
//! kept between segments so terrain stays continuous across boundaries.

use rand::Rng;

use super::segment::Segment;
use super::tile::{AIR, BOULDER, MOSS, ROCK, ROCK_BOTTOM, ROCK_TOP};

/// Open rows always left between ceiling and floor
const MIN_PASSAGE: usize = 12;
/// Boulders per segment at density 1.0
const BOULDERS_AT_FULL_DENSITY: f32 = 40.0;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerrainCarver {
    floor: usize,
    ceiling: usize,
}

impl TerrainCarver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current floor and ceiling thickness in rows
    pub fn heights(&self) -> (usize, usize) {
        (self.floor, self.ceiling)
    }

    /// Fill `segment` with terrain of the given density in [0, 1]
    pub fn carve<const W: usize, const H: usize, R: Rng + ?Sized>(
        &mut self,
        segment: &mut Segment<W, H>,
        density: f32,
        rng: &mut R,
    ) {
        let density = density.clamp(0.0, 1.0);
        let budget = H.saturating_sub(MIN_PASSAGE) / 2;
        let max_thickness = ((density * H as f32) as usize).min(budget);

        if max_thickness == 0 {
            self.floor = 0;
            self.ceiling = 0;
            return;
        }

        for x in 0..W {
            self.floor = step(self.floor, max_thickness, rng);
            self.ceiling = step(self.ceiling, max_thickness, rng);

            for y in 0..self.ceiling {
                let tile = if y + 1 == self.ceiling { ROCK_BOTTOM } else { ROCK };
                segment.set(x, y, tile);
            }
            for depth in 0..self.floor {
                let y = H - 1 - depth;
                let tile = if depth + 1 == self.floor { ROCK_TOP } else { ROCK };
                segment.set(x, y, tile);
            }
            if self.floor > 0 && rng.random_bool(0.1) {
                segment.set(x, H - 1 - self.floor, MOSS);
            }
        }

        let boulders = (density * BOULDERS_AT_FULL_DENSITY) as usize;
        for _ in 0..boulders {
            let x = rng.random_range(0..W);
            let y = rng.random_range(0..H);
            if segment.get(x, y) == Some(AIR) {
                place_boulder(segment, x, y);
            }
        }
    }
}

fn step<R: Rng + ?Sized>(current: usize, max: usize, rng: &mut R) -> usize {
    match rng.random_range(0..3) {
        0 => current.saturating_sub(1),
        1 => current,
        _ => (current + 1).min(max),
    }
    .min(max)
}

/// Boulder of up to 2x2 tiles, only written over air
fn place_boulder<const W: usize, const H: usize>(segment: &mut Segment<W, H>, x: usize, y: usize) {
    for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
        if segment.get(x + dx, y + dy) == Some(AIR) {
            segment.set(x + dx, y + dy, BOULDER);
        }
    }
}
