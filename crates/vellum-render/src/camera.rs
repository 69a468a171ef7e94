//! 2D cameras.
//!
//! A camera contributes the view matrix of every draw that uses it and may also
//! replace the surface projection. Cameras live in their [`Surface`](crate::Surface)
//! and are referred to by [`CameraId`].
//!
//! ```
//! use glam::Vec2;
//! use vellum_render::Camera;
//!
//! let camera = Camera::new(Vec2::new(100.0, 40.0)).with_pivot(Vec2::new(400.0, 300.0));
//! let view = camera.view_matrix();
//! // The camera position ends up at the pivot (for example the viewport centre).
//! let at = view.transform_point3(glam::Vec3::new(100.0, 40.0, 0.0));
//! assert_eq!(at.truncate(), Vec2::new(400.0, 300.0));
//! ```

use glam::{Mat4, Vec2};
use vellum_core::alloc::SlotId;

/// Identifies a camera within its surface.
pub type CameraId = SlotId;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Camera {
    pub position: Vec2,
    pub pivot: Vec2,
    view_override: Option<Mat4>,
    projection: Option<Mat4>,
}

impl Camera {
    pub fn new(position: Vec2) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn with_pivot(mut self, pivot: Vec2) -> Self {
        self.pivot = pivot;
        self
    }

    /// Replace the surface projection for draws through this camera.
    pub fn with_projection(mut self, projection: Mat4) -> Self {
        self.projection = Some(projection);
        self
    }

    /// `translate(-position + pivot)` unless overridden.
    pub fn view_matrix(&self) -> Mat4 {
        self.view_override.unwrap_or_else(|| {
            Mat4::from_translation((self.pivot - self.position).extend(0.0))
        })
    }

    pub fn set_view_override(&mut self, view: Option<Mat4>) {
        self.view_override = view;
    }

    /// The camera's own projection, if it declares one.
    pub fn projection(&self) -> Option<Mat4> {
        self.projection
    }

    pub fn set_projection(&mut self, projection: Option<Mat4>) {
        self.projection = projection;
    }

    /// Map a point from the camera's view space back to world space.
    pub fn view_to_world(&self, view: Vec2) -> Vec2 {
        self.view_matrix()
            .inverse()
            .transform_point3(view.extend(0.0))
            .truncate()
    }

    pub fn world_to_view(&self, world: Vec2) -> Vec2 {
        self.view_matrix().transform_point3(world.extend(0.0)).truncate()
    }
}
