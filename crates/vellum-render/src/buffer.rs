//! Vertex buffers and vertex arrays.

use bytemuck::Pod;
use vellum_backend::{BufferHandle, BufferTarget, BufferUsage, VertexArrayHandle, VertexAttribute};
use vellum_core::profiling::profile_function;

use crate::context::GraphicsContext;
use crate::gc::GpuResource;

/// A GPU buffer with its size tracked on the CPU.
///
/// Every operation binds the buffer before touching it; nothing relies on a previous
/// binding still being in place.
#[derive(Debug)]
pub struct GpuBuffer {
    resource: GpuResource<BufferHandle>,
    target: BufferTarget,
    usage: BufferUsage,
    size: usize,
}

impl GpuBuffer {
    /// Create an empty buffer.
    pub fn new(ctx: &GraphicsContext, target: BufferTarget, usage: BufferUsage) -> Self {
        let handle = ctx.backend().create_buffer();
        Self {
            resource: ctx.track(handle),
            target,
            usage,
            size: 0,
        }
    }

    /// Create a buffer and upload `data` into it.
    pub fn with_data<T: Pod>(
        ctx: &GraphicsContext,
        target: BufferTarget,
        usage: BufferUsage,
        data: &[T],
    ) -> Self {
        let mut buffer = Self::new(ctx, target, usage);
        buffer.upload(ctx, data);
        buffer
    }

    pub fn handle(&self) -> BufferHandle {
        self.resource.handle()
    }

    /// Size of the last full upload, in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    pub fn bind(&self, ctx: &GraphicsContext) {
        ctx.backend().bind_buffer(self.target, Some(self.handle()));
    }

    /// Replace the whole buffer with `data`.
    pub fn upload<T: Pod>(&mut self, ctx: &GraphicsContext, data: &[T]) {
        profile_function!();
        if self.is_disposed() {
            tracing::warn!(buffer = self.handle().raw(), "upload to a disposed buffer ignored");
            return;
        }

        let bytes: &[u8] = bytemuck::cast_slice(data);
        self.bind(ctx);
        ctx.backend().buffer_data(self.target, bytes, self.usage);
        self.size = bytes.len();
    }

    /// Overwrite part of the buffer, starting `offset` bytes in.
    ///
    /// Writes that would run past the end of the last full upload are dropped with a
    /// warning.
    pub fn upload_at<T: Pod>(&self, ctx: &GraphicsContext, offset: usize, data: &[T]) {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        if self.is_disposed() || offset + bytes.len() > self.size {
            tracing::warn!(
                buffer = self.handle().raw(),
                offset,
                len = bytes.len(),
                size = self.size,
                "partial upload out of range or to a disposed buffer ignored"
            );
            return;
        }

        self.bind(ctx);
        ctx.backend().buffer_sub_data(self.target, offset, bytes);
    }

    /// Describe `attribute` as sourced from this buffer in the bound vertex array.
    pub fn attach(&self, ctx: &GraphicsContext, attribute: VertexAttribute) {
        self.bind(ctx);
        ctx.backend().vertex_attribute(attribute);
    }

    pub fn dispose(&self, ctx: &GraphicsContext) {
        self.resource.dispose(ctx.backend());
    }

    pub fn is_disposed(&self) -> bool {
        self.resource.is_disposed()
    }
}

/// Aggregates the attribute bindings of one drawable.
#[derive(Debug)]
pub struct VertexArray {
    resource: GpuResource<VertexArrayHandle>,
}

impl VertexArray {
    pub fn new(ctx: &GraphicsContext) -> Self {
        let handle = ctx.backend().create_vertex_array();
        Self {
            resource: ctx.track(handle),
        }
    }

    pub fn handle(&self) -> VertexArrayHandle {
        self.resource.handle()
    }

    pub fn bind(&self, ctx: &GraphicsContext) {
        ctx.backend().bind_vertex_array(Some(self.handle()));
    }

    pub fn unbind(ctx: &GraphicsContext) {
        ctx.backend().bind_vertex_array(None);
    }

    pub fn dispose(&self, ctx: &GraphicsContext) {
        self.resource.dispose(ctx.backend());
    }

    pub fn is_disposed(&self) -> bool {
        self.resource.is_disposed()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::GraphicsContextDescriptor;
    use vellum_backend::RecordingBackend;

    fn context() -> (Arc<RecordingBackend>, Arc<GraphicsContext>) {
        let backend = Arc::new(RecordingBackend::new());
        let ctx = GraphicsContext::new(backend.clone(), GraphicsContextDescriptor::new());
        (backend, ctx)
    }

    #[test]
    fn partial_upload_lands_at_offset() {
        let (backend, ctx) = context();
        let buffer = GpuBuffer::with_data(
            &ctx,
            BufferTarget::Vertex,
            BufferUsage::Dynamic,
            &[0.0f32; 4],
        );

        buffer.upload_at(&ctx, 8, &[1.0f32]);

        let contents = backend.buffer_contents(buffer.handle()).unwrap();
        let floats: Vec<f32> = contents
            .chunks_exact(4)
            .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        assert_eq!(floats, vec![0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn out_of_range_partial_upload_is_dropped() {
        let (backend, ctx) = context();
        let buffer = GpuBuffer::with_data(
            &ctx,
            BufferTarget::Vertex,
            BufferUsage::Dynamic,
            &[0.0f32; 2],
        );
        backend.clear_calls();

        buffer.upload_at(&ctx, 4, &[1.0f32, 2.0]);

        assert_eq!(backend.call_count(), 0);
    }

    #[test]
    fn drop_defers_delete_to_drain() {
        let (backend, ctx) = context();
        let array = VertexArray::new(&ctx);
        let handle = array.handle();

        drop(array);
        assert_eq!(backend.delete_count(handle), 0);

        ctx.drain_deletions();
        assert_eq!(backend.delete_count(handle), 1);
    }
}
