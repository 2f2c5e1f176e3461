//! Vertex type emitted by the simulation's draw pass

use bytemuck::{Pod, Zeroable};

/// Screen-space vertex with texture coordinates and an RGBA8 color
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
    pub color: [u8; 4],
}

impl Vertex {
    pub const fn new(x: f32, y: f32, u: f32, v: f32, color: [u8; 4]) -> Self {
        Self {
            position: [x, y],
            uv: [u, v],
            color,
        }
    }
}

/// Colors for game elements
pub mod colors {
    pub const WHITE: [u8; 4] = [255, 255, 255, 255];
    pub const PLAYER_SHIELD: [u8; 4] = [120, 200, 255, 160];
    pub const PLAYER_HURT: [u8; 4] = [255, 120, 120, 255];
    pub const BULLET_PLAYER: [u8; 4] = [255, 240, 150, 255];
    pub const BULLET_ALIEN: [u8; 4] = [255, 90, 90, 255];
    pub const EVOLUTION_LOW: [u8; 4] = [200, 255, 200, 255];
    pub const EVOLUTION_MEDIUM: [u8; 4] = [255, 220, 120, 255];
    pub const EVOLUTION_HIGH: [u8; 4] = [255, 110, 200, 255];
    pub const PARTICLE: [u8; 4] = [255, 180, 80, 255];
    pub const COLLIDER: [u8; 4] = [0, 255, 0, 200];
    pub const HUD: [u8; 4] = [230, 230, 230, 255];
}
