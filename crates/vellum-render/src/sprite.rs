//! Textured rectangles.
//!
//! A [`Sprite`] is a [`Mesh`] built from a [`Rectangle`] sized to a texture (or to one
//! tile of a [`TileSheet`]) and always drawn with that texture.

use std::sync::Arc;

use glam::Vec2;

use crate::context::GraphicsContext;
use crate::mesh::{Mesh, Paint};
use crate::shader::Shader;
use crate::shapes::Rectangle;
use crate::surface::Surface;
use crate::texture::{Texture, TileSheet};
use crate::transform::Transform2D;

#[derive(Debug)]
pub struct Sprite {
    mesh: Mesh,
    texture: Arc<Texture>,
}

impl Sprite {
    /// A sprite showing the whole texture at its pixel size.
    pub fn new(ctx: &GraphicsContext, texture: Arc<Texture>, shader: Arc<Shader>) -> Self {
        let size = texture.size().to_f32();
        let rect = Rectangle::new(Vec2::new(size.width, size.height));
        Self {
            mesh: Mesh::from_provider(ctx, &rect, shader),
            texture,
        }
    }

    /// A sprite showing tile `index` of `sheet`, or `None` if there is no such tile.
    pub fn from_tile(
        ctx: &GraphicsContext,
        sheet: &TileSheet,
        index: u32,
        shader: Arc<Shader>,
    ) -> Option<Self> {
        let uv = sheet.uv_rect(index)?;
        let tile = sheet.tile_size().to_f32();
        let rect = Rectangle::new(Vec2::new(tile.width, tile.height)).with_uv(uv);
        Some(Self {
            mesh: Mesh::from_provider(ctx, &rect, shader),
            texture: sheet.texture().clone(),
        })
    }

    pub fn texture(&self) -> &Arc<Texture> {
        &self.texture
    }

    pub fn transform(&self) -> &Transform2D {
        &self.mesh.transform
    }

    pub fn transform_mut(&mut self) -> &mut Transform2D {
        &mut self.mesh.transform
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn mesh_mut(&mut self) -> &mut Mesh {
        &mut self.mesh
    }

    pub fn draw(&mut self, surface: &Surface) {
        self.mesh.draw(surface, Paint::Texture(&self.texture));
    }

    /// Dispose the mesh. The texture is shared and left alone.
    pub fn dispose(&self, ctx: &GraphicsContext) {
        self.mesh.dispose(ctx);
    }
}
