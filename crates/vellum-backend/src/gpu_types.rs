//! Opaque GPU handles and the small value types the backend interface speaks.
//!
//! Handles are plain backend-assigned integers. They carry no ownership; the
//! resource objects in `vellum-render` own them and decide when they die.

use std::fmt;

use thiserror::Error;

macro_rules! gpu_handle {
    ($(#[$meta:meta])* $name:ident => $variant:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            /// The raw backend identifier.
            pub const fn raw(self) -> u32 {
                self.0
            }
        }

        impl From<$name> for GpuHandle {
            fn from(handle: $name) -> Self {
                GpuHandle::$variant(handle)
            }
        }
    };
}

gpu_handle!(
    /// Vertex or index buffer.
    BufferHandle => Buffer
);
gpu_handle!(
    /// Vertex array object aggregating attribute bindings.
    VertexArrayHandle => VertexArray
);
gpu_handle!(
    /// 2D texture image.
    TextureHandle => Texture
);
gpu_handle!(
    /// Off-screen framebuffer with one color attachment.
    FramebufferHandle => Framebuffer
);
gpu_handle!(
    /// Linked shader program.
    ProgramHandle => Program
);

/// Any handle the backend can delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuHandle {
    Buffer(BufferHandle),
    VertexArray(VertexArrayHandle),
    Texture(TextureHandle),
    Framebuffer(FramebufferHandle),
    Program(ProgramHandle),
}

impl GpuHandle {
    pub fn raw(self) -> u32 {
        match self {
            GpuHandle::Buffer(h) => h.0,
            GpuHandle::VertexArray(h) => h.0,
            GpuHandle::Texture(h) => h.0,
            GpuHandle::Framebuffer(h) => h.0,
            GpuHandle::Program(h) => h.0,
        }
    }
}

impl fmt::Display for GpuHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            GpuHandle::Buffer(_) => "buffer",
            GpuHandle::VertexArray(_) => "vertex-array",
            GpuHandle::Texture(_) => "texture",
            GpuHandle::Framebuffer(_) => "framebuffer",
            GpuHandle::Program(_) => "program",
        };
        write!(f, "{kind}#{}", self.raw())
    }
}

/// Location of a named uniform inside a linked program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub i32);

/// Identifies a presentable surface (window, canvas, swapchain).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    Vertex,
    Index,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BufferUsage {
    /// Uploaded once, drawn many times
    #[default]
    Static,
    /// Rewritten occasionally
    Dynamic,
    /// Rewritten every frame
    Stream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Primitive {
    #[default]
    Triangles,
    TriangleStrip,
    TriangleFan,
    Lines,
    LineStrip,
    LineLoop,
    Points,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureFilter {
    Nearest,
    #[default]
    Linear,
}

/// A float vertex attribute sourced from the currently bound vertex buffer.
///
/// Data is tightly packed `f32` with `components` per element. A `divisor` of
/// zero advances per vertex; one advances per drawn instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    pub location: u32,
    pub components: u8,
    pub divisor: u32,
}

impl VertexAttribute {
    pub const fn per_vertex(location: u32, components: u8) -> Self {
        Self {
            location,
            components,
            divisor: 0,
        }
    }

    pub const fn per_instance(location: u32, components: u8) -> Self {
        Self {
            location,
            components,
            divisor: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Vec2([f32; 2]),
    Vec4([f32; 4]),
    /// Column-major 4x4 matrix
    Mat4([f32; 16]),
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        UniformValue::Int(v)
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Float(v)
    }
}

impl From<bool> for UniformValue {
    fn from(v: bool) -> Self {
        UniformValue::Int(v as i32)
    }
}

impl From<[f32; 2]> for UniformValue {
    fn from(v: [f32; 2]) -> Self {
        UniformValue::Vec2(v)
    }
}

impl From<[f32; 4]> for UniformValue {
    fn from(v: [f32; 4]) -> Self {
        UniformValue::Vec4(v)
    }
}

impl From<[f32; 16]> for UniformValue {
    fn from(v: [f32; 16]) -> Self {
        UniformValue::Mat4(v)
    }
}

impl From<vellum_core::math::Vec2> for UniformValue {
    fn from(v: vellum_core::math::Vec2) -> Self {
        UniformValue::Vec2(v.to_array())
    }
}

impl From<vellum_core::math::Mat4> for UniformValue {
    fn from(m: vellum_core::math::Mat4) -> Self {
        UniformValue::Mat4(m.to_cols_array())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Link,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
            ShaderStage::Link => "link",
        })
    }
}

/// Returned by [`RenderBackend::compile_program`](crate::RenderBackend::compile_program)
/// with the backend's diagnostic text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{stage} stage failed: {log}")]
pub struct CompileFailure {
    pub stage: ShaderStage,
    pub log: String,
}

/// Everything a backend needs to build one program.
#[derive(Debug, Clone, Copy)]
pub struct ProgramDescriptor<'a> {
    pub label: Option<&'a str>,
    pub vertex: &'a str,
    pub fragment: &'a str,
    /// Explicit `(location, name)` pairs for backends that cannot introspect
    /// attribute bindings.
    pub attribute_bindings: &'a [(u32, &'a str)],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Null,
    Desktop,
    Mobile,
    DirectX,
    Recording,
}

/// What a backend can do, fixed for the lifetime of the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendCapabilities {
    pub kind: BackendKind,
    /// The context fell back to a legacy profile; programs must use legacy sources.
    pub legacy_shaders: bool,
    pub max_texture_size: u32,
}

impl BackendCapabilities {
    pub const fn modern(kind: BackendKind) -> Self {
        Self {
            kind,
            legacy_shaders: false,
            max_texture_size: 8192,
        }
    }

    pub const fn legacy(kind: BackendKind) -> Self {
        Self {
            kind,
            legacy_shaders: true,
            max_texture_size: 2048,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_display_names_kind() {
        let handle: GpuHandle = TextureHandle(7).into();
        assert_eq!(handle.to_string(), "texture#7");
        assert_eq!(handle.raw(), 7);
    }

    #[test]
    fn handles_of_different_kinds_never_compare_equal() {
        let a: GpuHandle = BufferHandle(1).into();
        let b: GpuHandle = TextureHandle(1).into();
        assert_ne!(a, b);
    }

    #[test]
    fn compile_failure_display() {
        let err = CompileFailure {
            stage: ShaderStage::Fragment,
            log: "0:12: undeclared identifier".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "fragment stage failed: 0:12: undeclared identifier"
        );
    }
}
