//! The capability surface every platform backend implements.
//!
//! The `RenderBackend` trait is the only place vellum talks to a GPU. Desktop GL,
//! GLES, DirectX-class and null backends all implement the same fixed set of
//! imperative operations, so everything above it is backend-agnostic.

use vellum_core::geometry::{Rect, Size};

use crate::gpu_types::*;

/// Imperative GPU operations, GL-style.
///
/// # Binding Model
///
/// Buffers, vertex arrays, programs and framebuffers have a single "currently
/// bound" slot each, and that slot is backend-global mutable state. Callers never
/// rely on a previous call's binding surviving: every operation that depends on
/// bound state rebinds what it needs first.
///
/// # Threading
///
/// Methods take `&self` so a backend can be shared as `Arc<dyn RenderBackend>`, but
/// they must only be called on the thread that owns the graphics context. Code
/// running elsewhere (for example a `Drop` on another thread) must go through the
/// deletion queues in `vellum-render` instead.
///
/// # Deletion
///
/// Deleting an unknown or already-deleted handle is a silent no-op, never a panic.
///
/// # Example
///
/// ```rust
/// use vellum_backend::{BufferTarget, BufferUsage, NullBackend, RenderBackend};
///
/// fn upload(backend: &dyn RenderBackend, data: &[u8]) {
///     let buffer = backend.create_buffer();
///     backend.bind_buffer(BufferTarget::Vertex, Some(buffer));
///     backend.buffer_data(BufferTarget::Vertex, data, BufferUsage::Static);
///     backend.delete_buffer(buffer);
/// }
///
/// upload(&NullBackend::new(), &[0u8; 16]);
/// ```
pub trait RenderBackend: Send + Sync {
    /// Fixed description of what this backend supports.
    fn capabilities(&self) -> BackendCapabilities;

    /// Route all following calls to `surface`'s context.
    fn make_current(&self, surface: SurfaceId);

    // Buffer operations

    fn create_buffer(&self) -> BufferHandle;

    fn bind_buffer(&self, target: BufferTarget, buffer: Option<BufferHandle>);

    /// Replace the contents of the buffer bound to `target`, reallocating it.
    fn buffer_data(&self, target: BufferTarget, data: &[u8], usage: BufferUsage);

    /// Overwrite `data.len()` bytes at `offset` in the buffer bound to `target`.
    fn buffer_sub_data(&self, target: BufferTarget, offset: usize, data: &[u8]);

    fn delete_buffer(&self, buffer: BufferHandle);

    // Vertex array operations

    fn create_vertex_array(&self) -> VertexArrayHandle;

    fn bind_vertex_array(&self, array: Option<VertexArrayHandle>);

    /// Record `attribute` in the bound vertex array, sourced from the bound vertex buffer.
    fn vertex_attribute(&self, attribute: VertexAttribute);

    fn delete_vertex_array(&self, array: VertexArrayHandle);

    // Texture operations

    fn create_texture(&self) -> TextureHandle;

    /// Bind `texture` to sampler unit `unit`.
    fn bind_texture(&self, unit: u32, texture: Option<TextureHandle>);

    /// Define mip `level` of `texture`. `pixels` is bottom-row-first RGBA8, or
    /// `None` to allocate uninitialized storage.
    fn texture_image(
        &self,
        texture: TextureHandle,
        level: u32,
        size: Size<u32>,
        pixels: Option<&[u8]>,
    );

    fn texture_filter(&self, texture: TextureHandle, filter: TextureFilter);

    fn delete_texture(&self, texture: TextureHandle);

    // Framebuffer operations

    /// Create a framebuffer whose color attachment is `color`.
    fn create_framebuffer(&self, color: TextureHandle) -> FramebufferHandle;

    /// Bind a draw destination; `None` is the surface's default framebuffer.
    fn bind_framebuffer(&self, framebuffer: Option<FramebufferHandle>);

    fn delete_framebuffer(&self, framebuffer: FramebufferHandle);

    // Program operations

    fn compile_program(&self, desc: &ProgramDescriptor<'_>)
    -> Result<ProgramHandle, CompileFailure>;

    fn use_program(&self, program: Option<ProgramHandle>);

    /// Look up a uniform by name. `None` if the program has no active uniform of that name.
    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation>;

    /// Write a uniform of the program currently in use.
    fn set_uniform(&self, location: UniformLocation, value: UniformValue);

    fn delete_program(&self, program: ProgramHandle);

    // Fixed-function state and draws

    /// Set the viewport in backend pixels, bottom-left origin.
    fn set_viewport(&self, rect: Rect<i32>);

    /// Set (or disable with `None`) the scissor box in backend pixels, bottom-left origin.
    fn set_scissor(&self, rect: Option<Rect<i32>>);

    /// Clear the bound framebuffer's color to RGBA.
    fn clear(&self, color: [f32; 4]);

    fn draw(&self, primitive: Primitive, first: u32, count: u32);

    fn draw_instanced(&self, primitive: Primitive, first: u32, count: u32, instances: u32);

    /// Read RGBA8 pixels from the bound framebuffer, bottom row first.
    fn read_pixels(&self, rect: Rect<i32>) -> Vec<u8>;

    /// Swap the current surface's back buffer to the screen.
    fn present(&self);

    /// Delete any handle by dispatching on its kind.
    fn delete_handle(&self, handle: GpuHandle) {
        match handle {
            GpuHandle::Buffer(h) => self.delete_buffer(h),
            GpuHandle::VertexArray(h) => self.delete_vertex_array(h),
            GpuHandle::Texture(h) => self.delete_texture(h),
            GpuHandle::Framebuffer(h) => self.delete_framebuffer(h),
            GpuHandle::Program(h) => self.delete_program(h),
        }
    }
}
