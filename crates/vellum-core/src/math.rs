//! Math types.
//!
//! CPU-side math uses the SIMD-accelerated [`glam`] types re-exported from [`fast`].
//! Anything that is copied into a GPU buffer goes through the `#[repr(C)]` types in
//! [`packed`], which are [`bytemuck::Pod`] and have a fixed layout.
//!
//! ```
//! use vellum_core::math::{Mat4, PackedVec2, Vec2, Vec3};
//!
//! let position = Vec2::new(10.0, 20.0);
//! let model = Mat4::from_translation(Vec3::new(position.x, position.y, 0.0));
//!
//! let packed: PackedVec2 = position.into();
//! let bytes: &[u8] = bytemuck::bytes_of(&packed);
//! assert_eq!(bytes.len(), 8);
//! # let _ = model;
//! ```
//!
//! [`glam`]: https://docs.rs/glam

pub mod fast {
    pub use glam::*;
}

/// `#[repr(C)]` vectors for vertex and instance uploads.
pub mod packed {
    use bytemuck::{Pod, Zeroable};

    /// A 2D vector with guaranteed layout.
    ///
    /// ```text
    /// Offset | Field | Size
    /// -------|-------|------
    /// 0      | x     | 4 bytes (f32)
    /// 4      | y     | 4 bytes (f32)
    /// Total: 8 bytes
    /// ```
    #[repr(C)]
    #[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
    pub struct Vec2 {
        pub x: f32,
        pub y: f32,
    }

    /// A 4D vector with guaranteed layout. Also used for packed RGBA tints.
    #[repr(C)]
    #[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
    pub struct Vec4 {
        pub x: f32,
        pub y: f32,
        pub z: f32,
        pub w: f32,
    }

    impl Vec2 {
        pub const fn new(x: f32, y: f32) -> Self {
            Self { x, y }
        }
    }

    impl Vec4 {
        pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
            Self { x, y, z, w }
        }
    }

    impl From<glam::Vec2> for Vec2 {
        fn from(v: glam::Vec2) -> Self {
            Self { x: v.x, y: v.y }
        }
    }

    impl From<Vec2> for glam::Vec2 {
        fn from(v: Vec2) -> Self {
            glam::Vec2::new(v.x, v.y)
        }
    }

    impl From<glam::Vec4> for Vec4 {
        fn from(v: glam::Vec4) -> Self {
            Self {
                x: v.x,
                y: v.y,
                z: v.z,
                w: v.w,
            }
        }
    }

    impl From<Vec4> for glam::Vec4 {
        fn from(v: Vec4) -> Self {
            glam::Vec4::new(v.x, v.y, v.z, v.w)
        }
    }

    static_assertions::assert_eq_size!(Vec2, [f32; 2]);
    static_assertions::assert_eq_size!(Vec4, [f32; 4]);
}

pub use fast::*;
pub use packed::{Vec2 as PackedVec2, Vec4 as PackedVec4};

/// Tolerance used by [`approx_eq`].
pub const EPSILON: f32 = 1e-4;

/// Compare two floats within [`EPSILON`].
#[inline]
pub fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() <= EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_round_trips_through_glam() {
        let v = Vec2::new(1.5, -2.0);
        let packed: PackedVec2 = v.into();
        assert_eq!(Vec2::from(packed), v);
    }

    #[test]
    fn approx_eq_tolerates_rounding() {
        assert!(approx_eq(0.1 + 0.2, 0.3));
        assert!(!approx_eq(0.0, 0.01));
    }
}
