//! Surface projection, viewport and scissor state.
//!
//! All rectangles here are logical pixels with a top-left origin. They are scaled by
//! the device scale factor (independently per axis) and flipped to the backend's
//! bottom-left origin only when issued.

use glam::{Mat4, Vec2};
use vellum_backend::RenderBackend;
use vellum_core::geometry::{Rect, Size};

/// Orthographic projection of one surface.
///
/// With an ortho size `S` set, the projection box is `S * aspect` wide and `S` tall,
/// where the aspect ratio is that of the current viewport. With `S == 0` the box is
/// the viewport's pixel size, so one world unit is one logical pixel.
///
/// ```
/// use glam::Vec2;
/// use vellum_core::geometry::{Rect, Size};
/// use vellum_render::Projection;
///
/// let mut projection = Projection::new(Size::new(800, 600), Vec2::ONE);
/// projection.set_ortho_size(10.0);
///
/// let world = projection.screen_to_world(Vec2::new(400.0, 300.0));
/// assert!((world - Vec2::new(6.6667, 5.0)).length() < 1e-3);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    surface_size: Size<u32>,
    scale_factor: Vec2,
    viewport: Rect<f32>,
    scissor: Option<Rect<f32>>,
    ortho_size: f32,
    near: f32,
    far: f32,
    aspect: f32,
    matrix: Mat4,
}

impl Projection {
    pub const DEFAULT_NEAR: f32 = -1.0;
    pub const DEFAULT_FAR: f32 = 1.0;

    /// Pixel projection over the whole surface, near/far at -1/1.
    pub fn new(surface_size: Size<u32>, scale_factor: Vec2) -> Self {
        let viewport = Rect::from_size(surface_size.to_f32());
        let mut projection = Self {
            surface_size,
            scale_factor,
            viewport,
            scissor: None,
            ortho_size: 0.0,
            near: Self::DEFAULT_NEAR,
            far: Self::DEFAULT_FAR,
            aspect: viewport.aspect_ratio(),
            matrix: Mat4::IDENTITY,
        };
        projection.update();
        projection
    }

    fn update(&mut self) {
        let size = self.ortho_box();
        // Y-down: top edge is y = 0.
        self.matrix = Mat4::orthographic_rh_gl(0.0, size.x, size.y, 0.0, self.near, self.far);
    }

    pub fn matrix(&self) -> Mat4 {
        self.matrix
    }

    /// Width and height of the projection box in world units.
    pub fn ortho_box(&self) -> Vec2 {
        if self.ortho_size != 0.0 {
            Vec2::new(self.ortho_size * self.aspect, self.ortho_size)
        } else {
            Vec2::new(self.viewport.width, self.viewport.height)
        }
    }

    pub fn surface_size(&self) -> Size<u32> {
        self.surface_size
    }

    /// Surface size in backend pixels.
    pub fn backend_size(&self) -> Size<u32> {
        Size::new(
            (self.surface_size.width as f32 * self.scale_factor.x).round() as u32,
            (self.surface_size.height as f32 * self.scale_factor.y).round() as u32,
        )
    }

    pub fn scale_factor(&self) -> Vec2 {
        self.scale_factor
    }

    pub fn set_scale_factor(&mut self, scale_factor: Vec2) {
        self.scale_factor = scale_factor;
    }

    /// Resize the surface and reset the viewport to cover it.
    pub fn set_surface_size(&mut self, size: Size<u32>) {
        self.surface_size = size;
        self.set_viewport(Rect::from_size(size.to_f32()));
    }

    pub fn viewport(&self) -> Rect<f32> {
        self.viewport
    }

    /// Set the viewport; the cached aspect ratio and matrix follow it.
    pub fn set_viewport(&mut self, viewport: Rect<f32>) {
        self.viewport = viewport;
        self.aspect = viewport.aspect_ratio();
        self.update();
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect
    }

    pub fn ortho_size(&self) -> f32 {
        self.ortho_size
    }

    /// World-unit height of the projection box; `0.0` for a pixel projection.
    pub fn set_ortho_size(&mut self, size: f32) {
        self.ortho_size = size;
        self.update();
    }

    pub fn depth_range(&self) -> (f32, f32) {
        (self.near, self.far)
    }

    pub fn set_depth_range(&mut self, near: f32, far: f32) {
        self.near = near;
        self.far = far;
        self.update();
    }

    pub fn scissor(&self) -> Option<Rect<f32>> {
        self.scissor
    }

    pub fn set_scissor(&mut self, scissor: Option<Rect<f32>>) {
        self.scissor = scissor;
    }

    /// Scale and flip a logical rectangle into backend pixels.
    pub fn backend_rect(&self, rect: Rect<f32>) -> Rect<i32> {
        let surface_height = self.surface_size.height as f32 * self.scale_factor.y;
        rect.scale(self.scale_factor.x, self.scale_factor.y)
            .flip_y(surface_height)
            .round()
    }

    /// The viewport in backend pixels, bottom-left origin.
    pub fn backend_viewport(&self) -> Rect<i32> {
        self.backend_rect(self.viewport)
    }

    /// The scissor box in backend pixels, bottom-left origin.
    pub fn backend_scissor(&self) -> Option<Rect<i32>> {
        self.scissor.map(|rect| self.backend_rect(rect))
    }

    /// Issue viewport and scissor state.
    pub fn apply(&self, backend: &dyn RenderBackend) {
        backend.set_viewport(self.backend_viewport());
        backend.set_scissor(self.backend_scissor());
    }

    /// Convert a logical pointer position to world space.
    pub fn screen_to_world(&self, screen: Vec2) -> Vec2 {
        let size = Vec2::new(self.viewport.width, self.viewport.height);
        if size.x == 0.0 || size.y == 0.0 {
            return Vec2::ZERO;
        }
        let origin = Vec2::new(self.viewport.x, self.viewport.y);
        (screen - origin) * self.ortho_box() / size
    }

    pub fn world_to_screen(&self, world: Vec2) -> Vec2 {
        let size = Vec2::new(self.viewport.width, self.viewport.height);
        let ortho = self.ortho_box();
        if ortho.x == 0.0 || ortho.y == 0.0 {
            return Vec2::new(self.viewport.x, self.viewport.y);
        }
        world * size / ortho + Vec2::new(self.viewport.x, self.viewport.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    fn clip(projection: &Projection, world: Vec2) -> Vec2 {
        let p = projection.matrix() * Vec4::new(world.x, world.y, 0.0, 1.0);
        Vec2::new(p.x / p.w, p.y / p.w)
    }

    #[test]
    fn box_corners_map_to_clip_corners() {
        let mut projection = Projection::new(Size::new(800, 600), Vec2::ONE);
        projection.set_ortho_size(10.0);
        let box_size = projection.ortho_box();
        assert!((box_size.x - 10.0 * 800.0 / 600.0).abs() < 1e-4);

        assert!(clip(&projection, Vec2::ZERO).abs_diff_eq(Vec2::new(-1.0, 1.0), 1e-5));
        assert!(clip(&projection, box_size).abs_diff_eq(Vec2::new(1.0, -1.0), 1e-5));
    }

    #[test]
    fn pixel_projection_uses_viewport_size() {
        let projection = Projection::new(Size::new(320, 200), Vec2::ONE);
        assert_eq!(projection.ortho_box(), Vec2::new(320.0, 200.0));
        assert!(clip(&projection, Vec2::new(160.0, 100.0)).abs_diff_eq(Vec2::ZERO, 1e-5));
    }

    #[test]
    fn screen_world_round_trip() {
        let mut projection = Projection::new(Size::new(1024, 768), Vec2::ONE);
        projection.set_viewport(Rect::new(100.0, 50.0, 640.0, 480.0));
        projection.set_ortho_size(12.0);

        for screen in [Vec2::new(100.0, 50.0), Vec2::new(333.3, 211.0), Vec2::new(740.0, 530.0)] {
            let back = projection.world_to_screen(projection.screen_to_world(screen));
            assert!(back.abs_diff_eq(screen, 1e-3), "{screen} -> {back}");
        }
    }

    #[test]
    fn viewport_change_updates_aspect() {
        let mut projection = Projection::new(Size::new(800, 600), Vec2::ONE);
        projection.set_viewport(Rect::new(0.0, 0.0, 200.0, 100.0));
        assert_eq!(projection.aspect_ratio(), 2.0);
    }

    #[test]
    fn viewport_and_scissor_flip_with_per_axis_scale() {
        let mut projection = Projection::new(Size::new(400, 300), Vec2::new(2.0, 1.5));
        projection.set_viewport(Rect::new(10.0, 20.0, 100.0, 50.0));
        projection.set_scissor(Some(Rect::new(0.0, 0.0, 40.0, 40.0)));

        // backend height 450; y = 450 - 30 - 75
        assert_eq!(projection.backend_viewport(), Rect::new(20, 345, 200, 75));
        assert_eq!(projection.backend_scissor(), Some(Rect::new(0, 390, 80, 60)));
        assert_eq!(projection.backend_size(), Size::new(800, 450));
    }
}
