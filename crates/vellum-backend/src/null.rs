//! A backend that accepts every call and draws nothing.
//!
//! Useful for headless runs and servers, and as the reference for what the
//! minimum valid backend looks like.

use std::sync::atomic::{AtomicI32, AtomicU32, Ordering};

use vellum_core::geometry::{Rect, Size};

use crate::backend::RenderBackend;
use crate::gpu_types::*;

/// No-op [`RenderBackend`].
///
/// Hands out unique, never-reused handle values and otherwise ignores every call.
/// `read_pixels` returns transparent black.
#[derive(Debug)]
pub struct NullBackend {
    capabilities: BackendCapabilities,
    next_handle: AtomicU32,
    next_location: AtomicI32,
}

impl NullBackend {
    pub fn new() -> Self {
        Self::with_capabilities(BackendCapabilities::modern(BackendKind::Null))
    }

    /// A null backend that reports a legacy-only shader profile.
    pub fn legacy() -> Self {
        Self::with_capabilities(BackendCapabilities::legacy(BackendKind::Null))
    }

    pub fn with_capabilities(capabilities: BackendCapabilities) -> Self {
        Self {
            capabilities,
            next_handle: AtomicU32::new(1),
            next_location: AtomicI32::new(0),
        }
    }

    fn next(&self) -> u32 {
        self.next_handle.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for NullBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderBackend for NullBackend {
    fn capabilities(&self) -> BackendCapabilities {
        self.capabilities
    }

    fn make_current(&self, _surface: SurfaceId) {}

    fn create_buffer(&self) -> BufferHandle {
        BufferHandle(self.next())
    }

    fn bind_buffer(&self, _target: BufferTarget, _buffer: Option<BufferHandle>) {}

    fn buffer_data(&self, _target: BufferTarget, _data: &[u8], _usage: BufferUsage) {}

    fn buffer_sub_data(&self, _target: BufferTarget, _offset: usize, _data: &[u8]) {}

    fn delete_buffer(&self, _buffer: BufferHandle) {}

    fn create_vertex_array(&self) -> VertexArrayHandle {
        VertexArrayHandle(self.next())
    }

    fn bind_vertex_array(&self, _array: Option<VertexArrayHandle>) {}

    fn vertex_attribute(&self, _attribute: VertexAttribute) {}

    fn delete_vertex_array(&self, _array: VertexArrayHandle) {}

    fn create_texture(&self) -> TextureHandle {
        TextureHandle(self.next())
    }

    fn bind_texture(&self, _unit: u32, _texture: Option<TextureHandle>) {}

    fn texture_image(
        &self,
        _texture: TextureHandle,
        _level: u32,
        _size: Size<u32>,
        _pixels: Option<&[u8]>,
    ) {
    }

    fn texture_filter(&self, _texture: TextureHandle, _filter: TextureFilter) {}

    fn delete_texture(&self, _texture: TextureHandle) {}

    fn create_framebuffer(&self, _color: TextureHandle) -> FramebufferHandle {
        FramebufferHandle(self.next())
    }

    fn bind_framebuffer(&self, _framebuffer: Option<FramebufferHandle>) {}

    fn delete_framebuffer(&self, _framebuffer: FramebufferHandle) {}

    fn compile_program(
        &self,
        _desc: &ProgramDescriptor<'_>,
    ) -> Result<ProgramHandle, CompileFailure> {
        Ok(ProgramHandle(self.next()))
    }

    fn use_program(&self, _program: Option<ProgramHandle>) {}

    fn uniform_location(&self, _program: ProgramHandle, _name: &str) -> Option<UniformLocation> {
        Some(UniformLocation(
            self.next_location.fetch_add(1, Ordering::Relaxed),
        ))
    }

    fn set_uniform(&self, _location: UniformLocation, _value: UniformValue) {}

    fn delete_program(&self, _program: ProgramHandle) {}

    fn set_viewport(&self, _rect: Rect<i32>) {}

    fn set_scissor(&self, _rect: Option<Rect<i32>>) {}

    fn clear(&self, _color: [f32; 4]) {}

    fn draw(&self, _primitive: Primitive, _first: u32, _count: u32) {}

    fn draw_instanced(&self, _primitive: Primitive, _first: u32, _count: u32, _instances: u32) {}

    fn read_pixels(&self, rect: Rect<i32>) -> Vec<u8> {
        let w = rect.width.max(0) as usize;
        let h = rect.height.max(0) as usize;
        vec![0; w * h * 4]
    }

    fn present(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_unique_across_kinds() {
        let backend = NullBackend::new();
        let a = backend.create_buffer().raw();
        let b = backend.create_texture().raw();
        let c = backend.create_vertex_array().raw();
        assert!(a != b && b != c && a != c);
    }

    #[test]
    fn read_pixels_returns_rgba8_sized_buffer() {
        let backend = NullBackend::new();
        assert_eq!(backend.read_pixels(Rect::new(0, 0, 4, 3)).len(), 48);
        assert!(backend.read_pixels(Rect::new(0, 0, -1, 3)).is_empty());
    }

    #[test]
    fn legacy_profile_is_reported() {
        assert!(NullBackend::legacy().capabilities().legacy_shaders);
        assert!(!NullBackend::new().capabilities().legacy_shaders);
    }
}
