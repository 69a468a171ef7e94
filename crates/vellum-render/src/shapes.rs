//! Geometry providers for common shapes.
//!
//! Convex shapes are emitted as triangle fans over their outline only (no centre
//! vertex), so [`Paint::Wireframe`](crate::Paint::Wireframe) draws exactly the outline.

use std::f32::consts::TAU;

use glam::Vec2;
use vellum_backend::Primitive;
use vellum_core::geometry::Rect;

use crate::mesh::{Geometry, GeometryProvider};
use crate::texture::TileSheet;

/// An axis-aligned rectangle with its top-left corner at the local origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rectangle {
    pub size: Vec2,
    /// Texture region mapped onto the rectangle
    pub uv: Rect<f32>,
}

impl Rectangle {
    pub fn new(size: Vec2) -> Self {
        Self {
            size,
            uv: Rect::new(0.0, 0.0, 1.0, 1.0),
        }
    }

    pub fn with_uv(mut self, uv: Rect<f32>) -> Self {
        self.uv = uv;
        self
    }
}

impl GeometryProvider for Rectangle {
    fn geometry(&self) -> Geometry {
        let Vec2 { x: w, y: h } = self.size;
        let uv = self.uv;
        Geometry::new(
            Primitive::TriangleFan,
            vec![Vec2::ZERO, Vec2::new(w, 0.0), Vec2::new(w, h), Vec2::new(0.0, h)],
        )
        .with_uvs(vec![
            Vec2::new(uv.x, uv.y),
            Vec2::new(uv.right(), uv.y),
            Vec2::new(uv.right(), uv.bottom()),
            Vec2::new(uv.x, uv.bottom()),
        ])
    }
}

/// A regular polygon approximating a circle centred on the local origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub radius: f32,
    pub segments: u32,
}

impl Circle {
    pub const DEFAULT_SEGMENTS: u32 = 32;

    pub fn new(radius: f32) -> Self {
        Self {
            radius,
            segments: Self::DEFAULT_SEGMENTS,
        }
    }

    pub fn with_segments(mut self, segments: u32) -> Self {
        self.segments = segments.max(3);
        self
    }
}

impl GeometryProvider for Circle {
    fn geometry(&self) -> Geometry {
        let segments = self.segments.max(3);
        let (positions, uvs): (Vec<Vec2>, Vec<Vec2>) = (0..segments)
            .map(|i| {
                let dir = Vec2::from_angle(i as f32 / segments as f32 * TAU);
                (dir * self.radius, dir * 0.5 + Vec2::splat(0.5))
            })
            .unzip();
        Geometry::new(Primitive::TriangleFan, positions).with_uvs(uvs)
    }
}

/// A thick line from `from` to `to`, as a quad.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSegment {
    pub from: Vec2,
    pub to: Vec2,
    pub thickness: f32,
}

impl LineSegment {
    pub fn new(from: Vec2, to: Vec2, thickness: f32) -> Self {
        Self {
            from,
            to,
            thickness,
        }
    }
}

impl GeometryProvider for LineSegment {
    fn geometry(&self) -> Geometry {
        let dir = (self.to - self.from).normalize_or_zero();
        let offset = dir.perp() * (self.thickness * 0.5);
        Geometry::new(
            Primitive::TriangleFan,
            vec![
                self.from + offset,
                self.to + offset,
                self.to - offset,
                self.from - offset,
            ],
        )
    }
}

/// A grid of tiles drawn from a [`TileSheet`] in one mesh.
///
/// `tiles` is row-major; `None` leaves a cell empty.
#[derive(Debug, Clone, PartialEq)]
pub struct TileLayer {
    columns: u32,
    tile_size: Vec2,
    tiles: Vec<Option<u32>>,
    uvs: Vec<Rect<f32>>,
}

impl TileLayer {
    /// `tile_size` is the on-screen size of one cell in local units.
    pub fn new(sheet: &TileSheet, columns: u32, tile_size: Vec2, tiles: Vec<Option<u32>>) -> Self {
        let uvs = (0..sheet.tile_count())
            .filter_map(|i| sheet.uv_rect(i))
            .collect();
        Self {
            columns: columns.max(1),
            tile_size,
            tiles,
            uvs,
        }
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn rows(&self) -> u32 {
        (self.tiles.len() as u32).div_ceil(self.columns)
    }

    pub fn tile(&self, column: u32, row: u32) -> Option<u32> {
        let index = (row * self.columns + column) as usize;
        self.tiles.get(index).copied().flatten()
    }

    /// Change one cell. Rebuild the mesh geometry afterwards to see it.
    pub fn set_tile(&mut self, column: u32, row: u32, tile: Option<u32>) {
        if column >= self.columns {
            tracing::warn!(column, columns = self.columns, "tile column out of range ignored");
            return;
        }
        let index = (row * self.columns + column) as usize;
        if index >= self.tiles.len() {
            self.tiles.resize(index + 1, None);
        }
        self.tiles[index] = tile;
    }
}

impl GeometryProvider for TileLayer {
    fn geometry(&self) -> Geometry {
        let mut positions = Vec::new();
        let mut uvs = Vec::new();

        for (index, tile) in self.tiles.iter().enumerate() {
            let Some(uv) = tile.and_then(|t| self.uvs.get(t as usize)) else {
                continue;
            };
            let cell = Vec2::new(
                (index as u32 % self.columns) as f32,
                (index as u32 / self.columns) as f32,
            );
            let min = cell * self.tile_size;
            let max = min + self.tile_size;

            let corners = [
                (Vec2::new(min.x, min.y), Vec2::new(uv.x, uv.y)),
                (Vec2::new(max.x, min.y), Vec2::new(uv.right(), uv.y)),
                (Vec2::new(max.x, max.y), Vec2::new(uv.right(), uv.bottom())),
                (Vec2::new(min.x, max.y), Vec2::new(uv.x, uv.bottom())),
            ];
            for i in [0, 1, 2, 0, 2, 3] {
                positions.push(corners[i].0);
                uvs.push(corners[i].1);
            }
        }

        Geometry::new(Primitive::Triangles, positions).with_uvs(uvs)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{Color, GraphicsContext, ImageData, Texture};
    use vellum_core::geometry::Size;

    #[test]
    fn rectangle_outline_is_clockwise_from_origin() {
        let geometry = Rectangle::new(Vec2::new(4.0, 2.0)).geometry();
        assert_eq!(geometry.primitive, Primitive::TriangleFan);
        assert_eq!(geometry.positions[2], Vec2::new(4.0, 2.0));
        assert_eq!(geometry.uvs[2], Vec2::ONE);
    }

    #[test]
    fn circle_has_no_centre_vertex() {
        let geometry = Circle::new(10.0).with_segments(8).geometry();
        assert_eq!(geometry.vertex_count(), 8);
        assert!(geometry
            .positions
            .iter()
            .all(|p| (p.length() - 10.0).abs() < 1e-4));
    }

    #[test]
    fn line_segment_has_requested_thickness() {
        let geometry = LineSegment::new(Vec2::ZERO, Vec2::new(10.0, 0.0), 2.0).geometry();
        assert_eq!(geometry.positions[0], Vec2::new(0.0, 1.0));
        assert_eq!(geometry.positions[3], Vec2::new(0.0, -1.0));
    }

    #[test]
    fn tile_layer_skips_empty_cells() {
        let ctx = GraphicsContext::headless();
        let texture = Texture::from_image(&ctx, &ImageData::solid(32, 16, Color::WHITE)).unwrap();
        let sheet = TileSheet::new(Arc::new(texture), Size::new(16, 16)).unwrap();

        let tiles = vec![Some(1), None, None, Some(0)];
        let mut layer = TileLayer::new(&sheet, 2, Vec2::splat(8.0), tiles);
        assert_eq!(layer.rows(), 2);
        assert_eq!(layer.geometry().vertex_count(), 12);

        layer.set_tile(1, 0, Some(7));
        // Index 7 is not on a two-tile sheet, so the cell stays empty.
        assert_eq!(layer.geometry().vertex_count(), 12);

        let geometry = layer.geometry();
        assert_eq!(geometry.positions[0], Vec2::ZERO);
        assert_eq!(geometry.uvs[0], Vec2::new(0.5, 0.0));
        assert_eq!(geometry.positions[6], Vec2::new(8.0, 8.0));
    }
}
