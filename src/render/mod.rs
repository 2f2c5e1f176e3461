//! Draw emission
//!
//! The simulation never touches the GPU. It appends quads to `BufferWriter`s
//! supplied by the host, which uploads and draws them however it likes.

pub mod vertex;

pub use vertex::{Vertex, colors};

use glam::Vec2;

use crate::sim::BoxCollider;

/// Texture-space rectangle of one sprite
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sprite {
    pub u0: f32,
    pub v0: f32,
    pub u1: f32,
    pub v1: f32,
}

/// A square grid of equally sized sprites in one texture
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileSet {
    columns: u16,
    rows: u16,
}

impl TileSet {
    pub fn new(columns: u16, rows: u16) -> Self {
        Self {
            columns: columns.max(1),
            rows: rows.max(1),
        }
    }

    /// Sprite at a grid cell
    pub fn sprite(&self, column: u16, row: u16) -> Sprite {
        let w = 1.0 / self.columns as f32;
        let h = 1.0 / self.rows as f32;
        let u0 = (column % self.columns) as f32 * w;
        let v0 = (row % self.rows) as f32 * h;
        Sprite {
            u0,
            v0,
            u1: u0 + w,
            v1: v0 + h,
        }
    }

    /// Sprite by linear index, row-major
    pub fn sprite_index(&self, index: u16) -> Sprite {
        self.sprite(index % self.columns, index / self.columns)
    }
}

/// Append-only vertex sink
#[derive(Debug, Default)]
pub struct BufferWriter {
    vertices: Vec<Vertex>,
}

impl BufferWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Raw bytes ready for upload
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Drop everything written so far (after the host uploaded it)
    pub fn clear(&mut self) {
        self.vertices.clear();
    }

    /// Axis-aligned quad as two triangles
    pub fn rect(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, sprite: Sprite, color: [u8; 4]) {
        let corners = [
            Vertex::new(x0, y0, sprite.u0, sprite.v0, color),
            Vertex::new(x1, y0, sprite.u1, sprite.v0, color),
            Vertex::new(x1, y1, sprite.u1, sprite.v1, color),
            Vertex::new(x0, y1, sprite.u0, sprite.v1, color),
        ];
        self.push_quad(corners);
    }

    /// Square quad of edge `size` centered on `center`, rotated by `angle`
    pub fn quad(&mut self, center: Vec2, size: f32, angle: f32, sprite: Sprite, color: [u8; 4]) {
        let half = size / 2.0;
        let rot = Vec2::from_angle(angle);
        let corner = |dx: f32, dy: f32, u: f32, v: f32| {
            let p = center + rot.rotate(Vec2::new(dx, dy));
            Vertex::new(p.x, p.y, u, v, color)
        };
        self.push_quad([
            corner(-half, -half, sprite.u0, sprite.v0),
            corner(half, -half, sprite.u1, sprite.v0),
            corner(half, half, sprite.u1, sprite.v1),
            corner(-half, half, sprite.u0, sprite.v1),
        ]);
    }

    /// Outline of a box made of four thin quads
    pub fn wireframe(&mut self, b: BoxCollider, width: f32, sprite: Sprite, color: [u8; 4]) {
        self.rect(b.x0, b.y0, b.x1, b.y0 + width, sprite, color);
        self.rect(b.x0, b.y1 - width, b.x1, b.y1, sprite, color);
        self.rect(b.x0, b.y0, b.x0 + width, b.y1, sprite, color);
        self.rect(b.x1 - width, b.y0, b.x1, b.y1, sprite, color);
    }

    /// Text in a monospace font whose tileset is indexed by ASCII code
    pub fn text(&mut self, x: f32, y: f32, size: f32, text: &str, font: &TileSet, color: [u8; 4]) {
        for (i, ch) in text.bytes().enumerate() {
            if ch == b' ' {
                continue;
            }
            let x0 = x + i as f32 * size;
            self.rect(x0, y, x0 + size, y + size, font.sprite_index(ch as u16), color);
        }
    }

    fn push_quad(&mut self, [a, b, c, d]: [Vertex; 4]) {
        self.vertices.extend_from_slice(&[a, b, c, c, d, a]);
    }
}
