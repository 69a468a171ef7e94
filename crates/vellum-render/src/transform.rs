//! Local transforms of drawables.
//!
//! # Composition
//!
//! Written with row vectors (applied left to right) the local matrix is
//!
//! ```text
//! T(-pivot) · S(scale) · R(rotation) · T(position)
//! ```
//!
//! so scaling and rotation happen around the pivot, and the pivot is *not* added back
//! afterwards: a drawable at `position` with pivot `p` has its pivot point land on
//! `position`. The full per-draw matrix is `projection · view · local` in glam's
//! column-vector form.
//!
//! Logical space is Y-down, so a positive `rotation` turns clockwise on screen.

use glam::{Mat4, Vec2, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform2D {
    pub position: Vec2,
    pub pivot: Vec2,
    pub scale: Vec2,
    /// Radians, clockwise on screen.
    pub rotation: f32,
}

impl Default for Transform2D {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform2D {
    pub const IDENTITY: Self = Self {
        position: Vec2::ZERO,
        pivot: Vec2::ZERO,
        scale: Vec2::ONE,
        rotation: 0.0,
    };

    pub fn from_position(position: Vec2) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    pub fn with_pivot(mut self, pivot: Vec2) -> Self {
        self.pivot = pivot;
        self
    }

    pub fn with_scale(mut self, scale: Vec2) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn translate(&mut self, delta: Vec2) {
        self.position += delta;
    }

    pub fn rotate(&mut self, radians: f32) {
        self.rotation += radians;
    }

    pub fn local_matrix(&self) -> Mat4 {
        Mat4::from_translation(self.position.extend(0.0))
            * Mat4::from_rotation_z(self.rotation)
            * Mat4::from_scale(Vec3::new(self.scale.x, self.scale.y, 1.0))
            * Mat4::from_translation((-self.pivot).extend(0.0))
    }

    /// Map a point from local to parent space.
    pub fn transform_point(&self, local: Vec2) -> Vec2 {
        self.local_matrix().transform_point3(local.extend(0.0)).truncate()
    }
}

/// `projection · view · local`, the matrix handed to the shader.
pub fn compose_mvp(projection: Mat4, view: Mat4, local: Mat4) -> Mat4 {
    projection * view * local
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use super::*;

    fn close(a: Vec2, b: Vec2) -> bool {
        a.abs_diff_eq(b, 1e-4)
    }

    #[test]
    fn pivot_lands_on_position() {
        let t = Transform2D::from_position(Vec2::new(100.0, 50.0))
            .with_pivot(Vec2::new(8.0, 8.0))
            .with_scale(Vec2::splat(3.0))
            .with_rotation(1.0);
        assert!(close(t.transform_point(Vec2::new(8.0, 8.0)), Vec2::new(100.0, 50.0)));
    }

    #[test]
    fn order_is_pivot_scale_rotate_translate() {
        let t = Transform2D::from_position(Vec2::new(10.0, 0.0))
            .with_pivot(Vec2::new(1.0, 0.0))
            .with_scale(Vec2::new(2.0, 1.0))
            .with_rotation(FRAC_PI_2);
        // (3,0) - pivot = (2,0); scaled (4,0); rotated a quarter turn (0,4); moved (10,4)
        assert!(close(t.transform_point(Vec2::new(3.0, 0.0)), Vec2::new(10.0, 4.0)));
    }

    #[test]
    fn positive_rotation_is_clockwise_in_y_down_space() {
        let t = Transform2D::IDENTITY.with_rotation(FRAC_PI_2);
        // +X (right) turns to +Y (down on screen).
        assert!(close(t.transform_point(Vec2::X), Vec2::Y));
    }

    #[test]
    fn mvp_applies_local_first() {
        let local = Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0));
        let view = Mat4::from_scale(Vec3::splat(2.0));
        let mvp = compose_mvp(Mat4::IDENTITY, view, local);
        assert_eq!(mvp.transform_point3(Vec3::ZERO), Vec3::new(2.0, 0.0, 0.0));
    }
}
