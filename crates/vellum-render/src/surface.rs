//! Presentable surfaces.
//!
//! A [`Surface`] is one drawable area of the platform (a window, a canvas). It owns the
//! projection and viewport state, its cameras and its post-processing chain. The
//! platform layer creates the real surface and hands over its size and scale factor.

use std::cell::Cell;
use std::sync::Arc;

use glam::{Mat4, Vec2};
use vellum_backend::SurfaceId;
use vellum_core::alloc::SlotMap;
use vellum_core::geometry::{Rect, Size};
use vellum_core::profiling::{self, profile_function};

use crate::camera::{Camera, CameraId};
use crate::color::Color;
use crate::context::GraphicsContext;
use crate::error::Result;
use crate::gc::DrainStats;
use crate::post::{Effect, EffectChain, EffectId, PostEffect};
use crate::projection::Projection;
use crate::texture::RenderTarget;

/// Parameters of a new [`Surface`].
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceDescriptor {
    /// Logical width in pixels
    pub width: u32,
    /// Logical height in pixels
    pub height: u32,
    /// Device pixels per logical pixel, per axis
    pub scale_factor: Vec2,
    /// World-unit height of the projection box; `0.0` projects in logical pixels
    pub ortho_size: f32,
    pub near: f32,
    pub far: f32,
    pub clear_color: Color,
    pub label: Option<String>,
}

impl Default for SurfaceDescriptor {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            scale_factor: Vec2::ONE,
            ortho_size: 0.0,
            near: Projection::DEFAULT_NEAR,
            far: Projection::DEFAULT_FAR,
            clear_color: Color::BLACK,
            label: None,
        }
    }
}

impl SurfaceDescriptor {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn with_scale_factor(mut self, scale_factor: Vec2) -> Self {
        self.scale_factor = scale_factor;
        self
    }

    pub fn with_ortho_size(mut self, ortho_size: f32) -> Self {
        self.ortho_size = ortho_size;
        self
    }

    pub fn with_depth_range(mut self, near: f32, far: f32) -> Self {
        self.near = near;
        self.far = far;
        self
    }

    pub fn with_clear_color(mut self, color: Color) -> Self {
        self.clear_color = color;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// What one [`Surface::present`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Number of the frame just presented, starting at 1
    pub frame: u64,
    pub draw_calls: u32,
    pub effect_passes: u32,
    pub deleted: DrainStats,
}

/// A drawable area with its own projection, cameras and effect chain.
///
/// Scene content drawn between two [`present`](Self::present) calls lands in the first
/// enabled effect's target, or directly in the surface when no effect is enabled.
pub struct Surface {
    id: SurfaceId,
    context: Arc<GraphicsContext>,
    label: String,
    clear_color: Color,
    projection: Projection,
    cameras: SlotMap<Camera>,
    active_camera: Option<CameraId>,
    effects: EffectChain,
    draw_calls: Cell<u32>,
    frame: u64,
}

impl Surface {
    /// Create a surface. It becomes current if no surface is current yet.
    pub fn new(context: Arc<GraphicsContext>, desc: SurfaceDescriptor) -> Self {
        let id = context.allocate_surface_id();
        let label = desc.label.unwrap_or_else(|| format!("surface#{}", id.0));

        let mut projection = Projection::new(Size::new(desc.width, desc.height), desc.scale_factor);
        projection.set_depth_range(desc.near, desc.far);
        projection.set_ortho_size(desc.ortho_size);

        if context.current_surface().is_none() {
            context.make_current(id);
        }
        tracing::info!(
            surface = %label,
            width = desc.width,
            height = desc.height,
            scale_x = desc.scale_factor.x,
            scale_y = desc.scale_factor.y,
            "surface created"
        );

        let surface = Self {
            id,
            context,
            label,
            clear_color: desc.clear_color,
            projection,
            cameras: SlotMap::new(),
            active_camera: None,
            effects: EffectChain::new(),
            draw_calls: Cell::new(0),
            frame: 0,
        };
        if surface.is_current() {
            surface.prepare_scene();
        }
        surface
    }

    pub fn id(&self) -> SurfaceId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn context(&self) -> &GraphicsContext {
        &self.context
    }

    pub fn is_current(&self) -> bool {
        self.context.current_surface() == Some(self.id)
    }

    /// Route backend calls to this surface and restore its scene state.
    pub fn make_current(&self) {
        if !self.is_current() {
            self.context.make_current(self.id);
            self.bind_scene_target();
        }
    }

    pub fn clear_color(&self) -> Color {
        self.clear_color
    }

    pub fn set_clear_color(&mut self, color: Color) {
        self.clear_color = color;
    }

    /// Frames presented so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    fn bind_scene_target(&self) {
        let backend = self.context.backend();
        backend.bind_framebuffer(self.effects.framebuffer(self.effects.scene_destination()));
        self.projection.apply(backend);
    }

    fn prepare_scene(&self) {
        self.bind_scene_target();
        self.context.backend().clear(self.clear_color.to_array());
    }

    pub(crate) fn record_draw(&self) {
        self.draw_calls.set(self.draw_calls.get() + 1);
    }

    // Cameras

    /// Add a camera. The first camera added becomes the active one.
    pub fn add_camera(&mut self, camera: Camera) -> CameraId {
        let id = self.cameras.insert(camera);
        if self.active_camera.is_none() {
            self.active_camera = Some(id);
        }
        id
    }

    pub fn camera(&self, id: CameraId) -> Option<&Camera> {
        self.cameras.get(id)
    }

    pub fn camera_mut(&mut self, id: CameraId) -> Option<&mut Camera> {
        self.cameras.get_mut(id)
    }

    pub fn active_camera(&self) -> Option<CameraId> {
        self.active_camera
    }

    /// Returns `false` and leaves the active camera alone if `id` is not a camera here.
    pub fn set_active_camera(&mut self, id: Option<CameraId>) -> bool {
        match id {
            Some(id) if !self.cameras.contains(id) => false,
            _ => {
                self.active_camera = id;
                true
            }
        }
    }

    pub fn remove_camera(&mut self, id: CameraId) -> Option<Camera> {
        let camera = self.cameras.remove(id)?;
        if self.active_camera == Some(id) {
            self.active_camera = None;
        }
        Some(camera)
    }

    /// Projection and view matrices for a draw through `camera`, or through the active
    /// camera when `camera` is `None`.
    pub fn camera_matrices(&self, camera: Option<CameraId>) -> (Mat4, Mat4) {
        let camera = camera
            .or(self.active_camera)
            .and_then(|id| self.cameras.get(id));
        let projection = camera
            .and_then(Camera::projection)
            .unwrap_or_else(|| self.projection.matrix());
        let view = camera.map_or(Mat4::IDENTITY, Camera::view_matrix);
        (projection, view)
    }

    // Projection

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn size(&self) -> Size<u32> {
        self.projection.surface_size()
    }

    fn apply_projection(&self) {
        if self.is_current() {
            self.projection.apply(self.context.backend());
        }
    }

    /// Set the viewport in logical pixels, top-left origin.
    pub fn set_viewport(&mut self, viewport: Rect<f32>) {
        self.projection.set_viewport(viewport);
        self.apply_projection();
    }

    /// Set or clear the scissor box in logical pixels, top-left origin.
    pub fn set_scissor(&mut self, scissor: Option<Rect<f32>>) {
        self.projection.set_scissor(scissor);
        self.apply_projection();
    }

    pub fn set_ortho_size(&mut self, size: f32) {
        self.projection.set_ortho_size(size);
    }

    pub fn set_depth_range(&mut self, near: f32, far: f32) {
        self.projection.set_depth_range(near, far);
    }

    /// Resize after the platform surface changed size. The viewport resets to the full
    /// surface.
    ///
    /// Effect targets keep the size they were allocated with. Remove and re-add effects
    /// to get targets matching the new size.
    pub fn resize(&mut self, size: Size<u32>) {
        tracing::debug!(
            surface = %self.label,
            width = size.width,
            height = size.height,
            "surface resized"
        );
        self.projection.set_surface_size(size);
        self.apply_projection();
    }

    pub fn set_scale_factor(&mut self, scale_factor: Vec2) {
        self.projection.set_scale_factor(scale_factor);
        self.apply_projection();
    }

    /// Logical pointer position to world space, through the active camera.
    pub fn screen_to_world(&self, screen: Vec2) -> Vec2 {
        let view = self.projection.screen_to_world(screen);
        match self.active_camera.and_then(|id| self.cameras.get(id)) {
            Some(camera) => camera.view_to_world(view),
            None => view,
        }
    }

    pub fn world_to_screen(&self, world: Vec2) -> Vec2 {
        let view = match self.active_camera.and_then(|id| self.cameras.get(id)) {
            Some(camera) => camera.world_to_view(world),
            None => world,
        };
        self.projection.world_to_screen(view)
    }

    // Effects

    pub fn effects(&self) -> &EffectChain {
        &self.effects
    }

    pub fn effect(&self, id: EffectId) -> Option<&Effect> {
        self.effects.get(id)
    }

    /// Toggling [`Effect::set_enabled`] takes effect from the next frame.
    pub fn effect_mut(&mut self, id: EffectId) -> Option<&mut Effect> {
        self.effects.get_mut(id)
    }

    /// Append an effect, allocating its target at the current surface size.
    pub fn add_effect(&mut self, effect: PostEffect) -> Result<EffectId> {
        self.insert_effect(usize::MAX, effect)
    }

    /// Insert an effect at `index` (clamped to the end of the list).
    pub fn insert_effect(&mut self, index: usize, effect: PostEffect) -> Result<EffectId> {
        let before = self.effects.scene_destination();
        let size = self.projection.backend_size();
        let id = self.effects.insert(&self.context, index, effect, size)?;
        self.rebind_scene_if_moved(before);
        Ok(id)
    }

    /// Remove an effect and delete its resources now.
    pub fn remove_effect(&mut self, id: EffectId) -> bool {
        let before = self.effects.scene_destination();
        let removed = self.effects.remove(&self.context, id);
        if removed {
            self.rebind_scene_if_moved(before);
        }
        removed
    }

    fn rebind_scene_if_moved(&self, before: crate::post::Destination) {
        if self.effects.scene_destination() != before && self.is_current() {
            self.prepare_scene();
        }
    }

    /// The target scene content currently renders into; `None` is the surface itself.
    pub fn scene_target(&self) -> Option<&RenderTarget> {
        match self.effects.scene_destination() {
            crate::post::Destination::Effect(id) => self.effects.get(id).map(Effect::target),
            crate::post::Destination::Surface => None,
        }
    }

    // Frame

    /// Finish the frame.
    ///
    /// In order: runs the effect chain, presents, drains deferred deletions, then binds
    /// and clears the scene target for the next frame.
    pub fn present(&mut self) -> FrameStats {
        profile_function!();

        self.make_current();
        let backend_size = self.projection.backend_size();
        let surface_viewport =
            Rect::new(0, 0, backend_size.width as i32, backend_size.height as i32);
        let effect_passes = self
            .effects
            .execute(&self.context, surface_viewport, self.clear_color);

        self.context.backend().present();
        let deleted = self.context.drain_deletions();

        self.frame += 1;
        let stats = FrameStats {
            frame: self.frame,
            draw_calls: self.draw_calls.replace(0),
            effect_passes,
            deleted,
        };

        self.effects.latch();
        self.prepare_scene();
        profiling::new_frame();

        tracing::debug!(
            surface = %self.label,
            frame = stats.frame,
            draw_calls = stats.draw_calls,
            effect_passes = stats.effect_passes,
            deleted = stats.deleted.deleted(),
            "frame presented"
        );
        stats
    }

    /// Read RGBA8 pixels of the scene target.
    ///
    /// `rect` is in logical pixels with a top-left origin, relative to the scene target.
    /// Rows come back top row first. The part of `rect` outside the target is dropped.
    pub fn read_pixels(&self, rect: Rect<u32>) -> Vec<u8> {
        let target = match self.scene_target() {
            Some(target) => target.size(),
            None => self.projection.backend_size(),
        };
        let bounds = Rect::new(0, 0, target.width as i32, target.height as i32);
        let scale = self.projection.scale_factor();
        let logical = Rect::new(
            rect.x as f32,
            rect.y as f32,
            rect.width as f32,
            rect.height as f32,
        );
        let Some(region) = logical
            .scale(scale.x, scale.y)
            .flip_y(target.height as f32)
            .round()
            .intersection(&bounds)
        else {
            return Vec::new();
        };
        let pixels = self.context.backend().read_pixels(region);

        let stride = region.width.max(0) as usize * 4;
        if stride == 0 {
            return pixels;
        }
        pixels
            .chunks_exact(stride)
            .rev()
            .flatten()
            .copied()
            .collect()
    }

    /// Delete every effect's resources now.
    pub fn dispose(&mut self) {
        self.effects.dispose_all(&self.context);
    }
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("size", &self.size())
            .field("effects", &self.effects.len())
            .field("cameras", &self.cameras.len())
            .field("frame", &self.frame)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GraphicsContextDescriptor, Shader};
    use vellum_backend::{BackendCall, RecordingBackend};

    fn setup() -> (Arc<RecordingBackend>, Arc<GraphicsContext>) {
        let backend = Arc::new(RecordingBackend::new());
        let ctx = GraphicsContext::new(backend.clone(), GraphicsContextDescriptor::new());
        (backend, ctx)
    }

    #[test]
    fn first_surface_becomes_current() {
        let (backend, ctx) = setup();
        let first = Surface::new(ctx.clone(), SurfaceDescriptor::new(100, 100));
        let second = Surface::new(ctx.clone(), SurfaceDescriptor::new(50, 50));

        assert!(first.is_current());
        assert!(!second.is_current());
        assert_eq!(backend.count(|c| matches!(c, BackendCall::MakeCurrent(_))), 1);

        second.make_current();
        assert_eq!(ctx.current_surface(), Some(second.id()));
    }

    #[test]
    fn first_camera_wins_active() {
        let (_backend, ctx) = setup();
        let mut surface = Surface::new(ctx, SurfaceDescriptor::default());
        let a = surface.add_camera(Camera::new(Vec2::ZERO));
        let b = surface.add_camera(Camera::new(Vec2::ONE));

        assert_eq!(surface.active_camera(), Some(a));
        assert!(surface.set_active_camera(Some(b)));
        surface.remove_camera(b);
        assert_eq!(surface.active_camera(), None);
        assert!(!surface.set_active_camera(Some(b)));
    }

    #[test]
    fn camera_projection_overrides_surface() {
        let (_backend, ctx) = setup();
        let mut surface = Surface::new(ctx, SurfaceDescriptor::new(200, 100));
        let custom = Mat4::from_scale(glam::Vec3::splat(2.0));
        let id = surface.add_camera(Camera::new(Vec2::new(10.0, 0.0)).with_projection(custom));

        let (projection, view) = surface.camera_matrices(None);
        assert_eq!(projection, custom);
        assert_eq!(view, surface.camera(id).unwrap().view_matrix());

        surface.camera_mut(id).unwrap().set_projection(None);
        let (projection, _) = surface.camera_matrices(Some(id));
        assert_eq!(projection, surface.projection().matrix());
    }

    #[test]
    fn present_runs_in_order() {
        let (backend, ctx) = setup();
        let mut surface = Surface::new(ctx.clone(), SurfaceDescriptor::new(64, 64));
        let shader = Arc::new(Shader::effect(&ctx).unwrap());
        surface.add_effect(PostEffect::new("fx", shader)).unwrap();
        drop(ctx.track(ctx.backend().create_buffer()));
        backend.clear_calls();

        let stats = surface.present();

        assert_eq!(stats.frame, 1);
        assert_eq!(stats.effect_passes, 1);
        assert_eq!(stats.deleted.buffers, 1);

        let calls = backend.calls();
        let draw = calls.iter().position(|c| matches!(c, BackendCall::Draw { .. })).unwrap();
        let present = calls.iter().position(|c| *c == BackendCall::Present).unwrap();
        let delete = calls
            .iter()
            .position(|c| matches!(c, BackendCall::DeleteBuffer(_)))
            .unwrap();
        assert!(draw < present && present < delete);
        // Scene target bound again for the next frame.
        let fb = surface.scene_target().unwrap().framebuffer();
        assert_eq!(backend.bound_framebuffer(), Some(fb));
    }

    #[test]
    fn resize_keeps_effect_targets() {
        let (_backend, ctx) = setup();
        let mut surface = Surface::new(ctx.clone(), SurfaceDescriptor::new(64, 32));
        let shader = Arc::new(Shader::effect(&ctx).unwrap());
        let fx = surface.add_effect(PostEffect::new("fx", shader)).unwrap();

        surface.resize(Size::new(128, 128));

        assert_eq!(surface.size(), Size::new(128, 128));
        assert_eq!(surface.effect(fx).unwrap().target().size(), Size::new(64, 32));
    }

    #[test]
    fn read_pixels_flips_to_backend_rows() {
        let (backend, ctx) = setup();
        let surface = Surface::new(
            ctx,
            SurfaceDescriptor::new(100, 50).with_scale_factor(Vec2::new(2.0, 2.0)),
        );
        backend.set_pixel_fill([1, 2, 3, 4]);

        let pixels = surface.read_pixels(Rect::new(10, 5, 4, 2));

        assert_eq!(pixels.len(), 8 * 4 * 4);
        assert!(backend.calls().contains(&BackendCall::ReadPixels(Rect::new(20, 86, 8, 4))));
    }

    #[test]
    fn read_pixels_flips_within_scene_target() {
        let (backend, ctx) = setup();
        let mut surface = Surface::new(ctx.clone(), SurfaceDescriptor::new(64, 32));
        let shader = Arc::new(Shader::effect(&ctx).unwrap());
        surface.add_effect(PostEffect::new("fx", shader)).unwrap();
        surface.resize(Size::new(128, 128));

        let pixels = surface.read_pixels(Rect::new(0, 0, 4, 2));

        assert_eq!(pixels.len(), 4 * 2 * 4);
        assert!(backend.calls().contains(&BackendCall::ReadPixels(Rect::new(0, 30, 4, 2))));
    }

    #[test]
    fn read_pixels_clips_to_scene_target() {
        let (backend, ctx) = setup();
        let mut surface = Surface::new(ctx.clone(), SurfaceDescriptor::new(64, 32));
        let shader = Arc::new(Shader::effect(&ctx).unwrap());
        surface.add_effect(PostEffect::new("fx", shader)).unwrap();
        surface.resize(Size::new(128, 128));
        backend.clear_calls();

        let pixels = surface.read_pixels(Rect::new(60, 0, 10, 2));
        assert_eq!(pixels.len(), 4 * 2 * 4);
        assert!(backend.calls().contains(&BackendCall::ReadPixels(Rect::new(60, 30, 4, 2))));

        assert!(surface.read_pixels(Rect::new(100, 0, 4, 4)).is_empty());
        assert_eq!(backend.count(|c| matches!(c, BackendCall::ReadPixels(_))), 1);
    }

    #[test]
    fn screen_to_world_goes_through_active_camera() {
        let (_backend, ctx) = setup();
        let mut surface = Surface::new(ctx, SurfaceDescriptor::new(100, 100));
        surface.add_camera(Camera::new(Vec2::new(30.0, 0.0)));

        let world = surface.screen_to_world(Vec2::new(10.0, 10.0));
        assert_eq!(world, Vec2::new(40.0, 10.0));
        assert_eq!(surface.world_to_screen(world), Vec2::new(10.0, 10.0));
    }
}
