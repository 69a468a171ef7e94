//! Textures, render targets and tile sheets.
//!
//! # Orientation
//!
//! Image data arrives top row first, while the backend's texture origin is the
//! bottom-left corner. Pixel data is never rewritten to fix this. Instead each
//! [`Texture`] records whether its rows are stored top-first (`flipped`), and draws
//! pass that to the shader, which picks the matching texture coordinate.
//!
//! - Textures created from [`ImageData`] are flipped.
//! - Render targets are written by the backend bottom-first and are not flipped.

use std::sync::Arc;

use vellum_backend::{FramebufferHandle, TextureFilter, TextureHandle};
use vellum_core::geometry::{Rect, Size};
use vellum_core::profiling::profile_function;

use crate::color::Color;
use crate::context::GraphicsContext;
use crate::error::{RenderError, Result};
use crate::gc::GpuResource;

/// Whether color channels are already multiplied by alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlphaMode {
    #[default]
    Straight,
    Premultiplied,
}

/// Decoded RGBA8 pixels, top row first.
///
/// This is the hand-off point with whatever decodes image files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    size: Size<u32>,
    pixels: Vec<u8>,
    alpha: AlphaMode,
}

impl ImageData {
    /// Wrap decoded pixels, checking that there are exactly `width * height` of them.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>, alpha: AlphaMode) -> Result<Self> {
        let size = Size::new(width, height);
        let expected = size.area() * 4;
        if pixels.len() != expected {
            return Err(RenderError::InvalidPixelData {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            size,
            pixels,
            alpha,
        })
    }

    /// An image filled with one color.
    pub fn solid(width: u32, height: u32, color: Color) -> Self {
        let size = Size::new(width, height);
        Self {
            size,
            pixels: color.to_rgba_u8().repeat(size.area()),
            alpha: AlphaMode::Straight,
        }
    }

    pub fn size(&self) -> Size<u32> {
        self.size
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn alpha_mode(&self) -> AlphaMode {
        self.alpha
    }

    /// Convert straight alpha to premultiplied. Already premultiplied data is unchanged.
    pub fn into_premultiplied(mut self) -> Self {
        if self.alpha == AlphaMode::Premultiplied {
            return self;
        }
        for px in self.pixels.chunks_exact_mut(4) {
            let a = px[3] as u32;
            for c in &mut px[..3] {
                *c = ((*c as u32 * a + 127) / 255) as u8;
            }
        }
        self.alpha = AlphaMode::Premultiplied;
        self
    }
}

fn check_size(ctx: &GraphicsContext, resource: &'static str, size: Size<u32>) -> Result<()> {
    let max = ctx.capabilities().max_texture_size;
    if size.width == 0 || size.height == 0 {
        return Err(RenderError::InvalidResourceSize {
            resource,
            width: size.width,
            height: size.height,
            reason: "dimensions must be non-zero".to_string(),
        });
    }
    if size.width > max || size.height > max {
        return Err(RenderError::InvalidResourceSize {
            resource,
            width: size.width,
            height: size.height,
            reason: format!("exceeds the backend limit of {max}"),
        });
    }
    Ok(())
}

/// A 2D GPU image.
#[derive(Debug)]
pub struct Texture {
    resource: GpuResource<TextureHandle>,
    size: Size<u32>,
    flipped: bool,
    alpha: AlphaMode,
    filter: TextureFilter,
}

impl Texture {
    /// Upload decoded image data.
    pub fn from_image(ctx: &GraphicsContext, image: &ImageData) -> Result<Self> {
        Self::with_mipmaps(ctx, std::slice::from_ref(image))
    }

    /// Upload a full mip chain, largest level first.
    ///
    /// Level `i` must be exactly `max(1, base >> i)` on each axis.
    pub fn with_mipmaps(ctx: &GraphicsContext, levels: &[ImageData]) -> Result<Self> {
        profile_function!();

        let Some(base) = levels.first() else {
            return Err(RenderError::InvalidResourceSize {
                resource: "mipmap",
                width: 0,
                height: 0,
                reason: "no mip levels supplied".to_string(),
            });
        };
        check_size(ctx, "texture", base.size)?;

        for (level, image) in levels.iter().enumerate().skip(1) {
            let expected = mip_size(base.size, level as u32);
            if image.size != expected {
                return Err(RenderError::InvalidResourceSize {
                    resource: "mipmap",
                    width: image.size.width,
                    height: image.size.height,
                    reason: format!(
                        "level {level} should be {}x{}",
                        expected.width, expected.height
                    ),
                });
            }
        }
        if levels.iter().any(|l| l.alpha != base.alpha) {
            tracing::warn!("mip levels mix straight and premultiplied alpha");
        }

        let backend = ctx.backend();
        let handle = backend.create_texture();
        backend.bind_texture(0, Some(handle));
        for (level, image) in levels.iter().enumerate() {
            backend.texture_image(handle, level as u32, image.size, Some(&image.pixels));
        }
        backend.texture_filter(handle, TextureFilter::default());

        tracing::trace!(
            texture = handle.raw(),
            width = base.size.width,
            height = base.size.height,
            levels = levels.len(),
            "texture uploaded"
        );

        Ok(Self {
            resource: ctx.track(handle),
            size: base.size,
            flipped: true,
            alpha: base.alpha,
            filter: TextureFilter::default(),
        })
    }

    /// Allocate storage without pixel data, in backend orientation.
    pub fn empty(ctx: &GraphicsContext, size: Size<u32>) -> Result<Self> {
        check_size(ctx, "texture", size)?;

        let backend = ctx.backend();
        let handle = backend.create_texture();
        backend.bind_texture(0, Some(handle));
        backend.texture_image(handle, 0, size, None);
        backend.texture_filter(handle, TextureFilter::default());

        Ok(Self {
            resource: ctx.track(handle),
            size,
            flipped: false,
            alpha: AlphaMode::Premultiplied,
            filter: TextureFilter::default(),
        })
    }

    pub fn handle(&self) -> TextureHandle {
        self.resource.handle()
    }

    pub fn size(&self) -> Size<u32> {
        self.size
    }

    pub fn width(&self) -> u32 {
        self.size.width
    }

    pub fn height(&self) -> u32 {
        self.size.height
    }

    /// Rows are stored top row first. See the module docs.
    pub fn is_flipped(&self) -> bool {
        self.flipped
    }

    pub fn alpha_mode(&self) -> AlphaMode {
        self.alpha
    }

    pub fn filter(&self) -> TextureFilter {
        self.filter
    }

    pub fn set_filter(&mut self, ctx: &GraphicsContext, filter: TextureFilter) {
        self.filter = filter;
        ctx.backend().texture_filter(self.handle(), filter);
    }

    /// Bind to sampler `unit`.
    pub fn bind(&self, ctx: &GraphicsContext, unit: u32) {
        ctx.backend().bind_texture(unit, Some(self.handle()));
    }

    pub fn dispose(&self, ctx: &GraphicsContext) {
        self.resource.dispose(ctx.backend());
    }

    pub fn is_disposed(&self) -> bool {
        self.resource.is_disposed()
    }
}

fn mip_size(base: Size<u32>, level: u32) -> Size<u32> {
    Size::new(
        base.width.checked_shr(level).unwrap_or(0).max(1),
        base.height.checked_shr(level).unwrap_or(0).max(1),
    )
}

/// A texture that can also be bound as a draw destination.
#[derive(Debug)]
pub struct RenderTarget {
    texture: Texture,
    framebuffer: GpuResource<FramebufferHandle>,
}

impl RenderTarget {
    pub fn new(ctx: &GraphicsContext, size: Size<u32>) -> Result<Self> {
        let texture = Texture::empty(ctx, size)?;
        let framebuffer = ctx.backend().create_framebuffer(texture.handle());
        tracing::debug!(
            framebuffer = framebuffer.raw(),
            width = size.width,
            height = size.height,
            "render target created"
        );
        Ok(Self {
            texture,
            framebuffer: ctx.track(framebuffer),
        })
    }

    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    pub fn framebuffer(&self) -> FramebufferHandle {
        self.framebuffer.handle()
    }

    pub fn size(&self) -> Size<u32> {
        self.texture.size()
    }

    /// Make this target the draw destination.
    pub fn bind(&self, ctx: &GraphicsContext) {
        ctx.backend().bind_framebuffer(Some(self.framebuffer()));
    }

    pub fn dispose(&self, ctx: &GraphicsContext) {
        self.framebuffer.dispose(ctx.backend());
        self.texture.dispose(ctx);
    }
}

/// A texture cut into equally sized tiles, numbered row by row from the top left.
#[derive(Debug)]
pub struct TileSheet {
    texture: Arc<Texture>,
    tile_size: Size<u32>,
    columns: u32,
    rows: u32,
}

impl TileSheet {
    /// Fails unless `tile_size` divides the texture exactly on both axes.
    pub fn new(texture: Arc<Texture>, tile_size: Size<u32>) -> Result<Self> {
        let size = texture.size();
        if tile_size.width == 0
            || tile_size.height == 0
            || size.width % tile_size.width != 0
            || size.height % tile_size.height != 0
        {
            return Err(RenderError::InvalidResourceSize {
                resource: "tile sheet",
                width: size.width,
                height: size.height,
                reason: format!(
                    "not divisible into {}x{} tiles",
                    tile_size.width, tile_size.height
                ),
            });
        }
        Ok(Self {
            columns: size.width / tile_size.width,
            rows: size.height / tile_size.height,
            texture,
            tile_size,
        })
    }

    pub fn texture(&self) -> &Arc<Texture> {
        &self.texture
    }

    pub fn tile_size(&self) -> Size<u32> {
        self.tile_size
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn tile_count(&self) -> u32 {
        self.columns * self.rows
    }

    /// Normalized top-left-origin texture rectangle of tile `index`.
    pub fn uv_rect(&self, index: u32) -> Option<Rect<f32>> {
        if index >= self.tile_count() {
            return None;
        }
        let w = 1.0 / self.columns as f32;
        let h = 1.0 / self.rows as f32;
        Some(Rect::new(
            (index % self.columns) as f32 * w,
            (index / self.columns) as f32 * h,
            w,
            h,
        ))
    }
}
