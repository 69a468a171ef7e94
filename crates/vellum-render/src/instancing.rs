//! Per-instance attribute arrays for batched drawables.
//!
//! Each attribute keeps a CPU mirror next to its GPU buffer. Reads always come from
//! the mirror, so they reflect the last write whichever upload path was used:
//!
//! - [`InstanceAttribute::set`] writes the mirror and uploads just that slot.
//! - [`InstanceAttribute::set_deferred`] writes the mirror only; follow a batch of
//!   those with one [`InstanceAttribute::upload_all`].

use bytemuck::Pod;
use glam::Vec2;
use vellum_backend::{BufferTarget, BufferUsage, VertexAttribute};
use vellum_core::math::PackedVec2;
use vellum_core::profiling::profile_function;

use crate::buffer::GpuBuffer;
use crate::color::Color;
use crate::context::GraphicsContext;
use crate::shader::builtin;

/// One per-instance attribute, advanced once per drawn instance.
///
/// `T` must be a tightly packed run of `f32`s (1 to 4 of them).
#[derive(Debug)]
pub struct InstanceAttribute<T: Pod> {
    location: u32,
    buffer: GpuBuffer,
    mirror: Vec<T>,
}

impl<T: Pod> InstanceAttribute<T> {
    pub fn new(ctx: &GraphicsContext, location: u32, initial: Vec<T>) -> Self {
        let buffer =
            GpuBuffer::with_data(ctx, BufferTarget::Vertex, BufferUsage::Dynamic, &initial);
        Self {
            location,
            buffer,
            mirror: initial,
        }
    }

    pub fn len(&self) -> usize {
        self.mirror.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mirror.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<T> {
        self.mirror.get(index).copied()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.mirror
    }

    pub fn buffer(&self) -> &GpuBuffer {
        &self.buffer
    }

    /// Write one instance and upload only its bytes.
    pub fn set(&mut self, ctx: &GraphicsContext, index: usize, value: T) {
        if self.set_deferred(index, value) {
            let offset = index * std::mem::size_of::<T>();
            self.buffer.upload_at(ctx, offset, std::slice::from_ref(&value));
        }
    }

    /// Write one instance in the mirror only. Returns `false` for an out-of-range index.
    pub fn set_deferred(&mut self, index: usize, value: T) -> bool {
        match self.mirror.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => {
                tracing::warn!(
                    index,
                    len = self.mirror.len(),
                    "instance write out of range ignored"
                );
                false
            }
        }
    }

    /// Re-upload the whole mirror.
    pub fn upload_all(&mut self, ctx: &GraphicsContext) {
        profile_function!();
        self.buffer.upload(ctx, &self.mirror);
    }

    /// Bind into the current vertex array with a divisor of one.
    pub fn attach(&self, ctx: &GraphicsContext) {
        let components = (std::mem::size_of::<T>() / std::mem::size_of::<f32>()) as u8;
        self.buffer
            .attach(ctx, VertexAttribute::per_instance(self.location, components));
    }

    pub fn dispose(&self, ctx: &GraphicsContext) {
        self.buffer.dispose(ctx);
    }
}

/// The four per-instance arrays the built-in mesh shader understands.
#[derive(Debug)]
pub struct InstanceBuffers {
    pub position: InstanceAttribute<PackedVec2>,
    pub scale: InstanceAttribute<PackedVec2>,
    /// Added after shading
    pub add_tint: InstanceAttribute<Color>,
    /// Multiplied into the vertex color
    pub mul_tint: InstanceAttribute<Color>,
}

impl InstanceBuffers {
    /// `count` instances at the origin, unscaled and untinted.
    pub fn new(ctx: &GraphicsContext, count: usize) -> Self {
        Self {
            position: InstanceAttribute::new(
                ctx,
                builtin::ATTR_INSTANCE_POSITION,
                vec![PackedVec2::new(0.0, 0.0); count],
            ),
            scale: InstanceAttribute::new(
                ctx,
                builtin::ATTR_INSTANCE_SCALE,
                vec![PackedVec2::new(1.0, 1.0); count],
            ),
            add_tint: InstanceAttribute::new(
                ctx,
                builtin::ATTR_INSTANCE_ADD,
                vec![Color::TRANSPARENT; count],
            ),
            mul_tint: InstanceAttribute::new(
                ctx,
                builtin::ATTR_INSTANCE_MUL,
                vec![Color::WHITE; count],
            ),
        }
    }

    pub fn count(&self) -> usize {
        self.position.len()
    }

    pub fn position(&self, index: usize) -> Option<Vec2> {
        self.position.get(index).map(Vec2::from)
    }

    pub fn set_position(&mut self, ctx: &GraphicsContext, index: usize, position: Vec2) {
        self.position.set(ctx, index, position.into());
    }

    pub fn scale(&self, index: usize) -> Option<Vec2> {
        self.scale.get(index).map(Vec2::from)
    }

    pub fn set_scale(&mut self, ctx: &GraphicsContext, index: usize, scale: Vec2) {
        self.scale.set(ctx, index, scale.into());
    }

    /// Re-upload all four arrays.
    pub fn upload_all(&mut self, ctx: &GraphicsContext) {
        self.position.upload_all(ctx);
        self.scale.upload_all(ctx);
        self.add_tint.upload_all(ctx);
        self.mul_tint.upload_all(ctx);
    }

    pub(crate) fn attach(&self, ctx: &GraphicsContext) {
        self.position.attach(ctx);
        self.scale.attach(ctx);
        self.add_tint.attach(ctx);
        self.mul_tint.attach(ctx);
    }

    pub fn dispose(&self, ctx: &GraphicsContext) {
        self.position.dispose(ctx);
        self.scale.dispose(ctx);
        self.add_tint.dispose(ctx);
        self.mul_tint.dispose(ctx);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::GraphicsContextDescriptor;
    use vellum_backend::{BackendCall, RecordingBackend};

    fn context() -> (Arc<RecordingBackend>, Arc<GraphicsContext>) {
        let backend = Arc::new(RecordingBackend::new());
        let ctx = GraphicsContext::new(backend.clone(), GraphicsContextDescriptor::new());
        (backend, ctx)
    }

    fn gpu_floats(
        backend: &RecordingBackend,
        attribute: &InstanceAttribute<PackedVec2>,
    ) -> Vec<f32> {
        backend
            .buffer_contents(attribute.buffer().handle())
            .unwrap()
            .chunks_exact(4)
            .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
            .collect()
    }

    #[test]
    fn immediate_write_uploads_one_slot() {
        let (backend, ctx) = context();
        let mut instances = InstanceBuffers::new(&ctx, 4);
        backend.clear_calls();

        instances.set_position(&ctx, 2, Vec2::new(5.0, 6.0));

        assert_eq!(instances.position(2), Some(Vec2::new(5.0, 6.0)));
        assert!(backend.calls().contains(&BackendCall::BufferSubData {
            buffer: Some(instances.position.buffer().handle()),
            offset: 16,
            size: 8,
        }));
        assert_eq!(
            gpu_floats(&backend, &instances.position),
            vec![0.0, 0.0, 0.0, 0.0, 5.0, 6.0, 0.0, 0.0]
        );
    }

    #[test]
    fn deferred_writes_need_upload_all() {
        let (backend, ctx) = context();
        let mut instances = InstanceBuffers::new(&ctx, 3);
        backend.clear_calls();

        for i in 0..3 {
            instances
                .scale
                .set_deferred(i, PackedVec2::new(i as f32, 2.0));
        }
        assert_eq!(backend.call_count(), 0);
        assert_eq!(instances.scale(1), Some(Vec2::new(1.0, 2.0)));

        instances.scale.upload_all(&ctx);
        assert_eq!(
            gpu_floats(&backend, &instances.scale),
            vec![0.0, 2.0, 1.0, 2.0, 2.0, 2.0]
        );
    }

    #[test]
    fn out_of_range_write_is_ignored() {
        let (backend, ctx) = context();
        let mut instances = InstanceBuffers::new(&ctx, 1);
        backend.clear_calls();

        instances.set_position(&ctx, 5, Vec2::ONE);

        assert_eq!(instances.count(), 1);
        assert_eq!(backend.call_count(), 0);
    }

    #[test]
    fn attributes_use_instance_divisor() {
        let (backend, ctx) = context();
        let instances = InstanceBuffers::new(&ctx, 1);
        instances.attach(&ctx);

        let divisors: Vec<u32> = backend
            .calls()
            .iter()
            .filter_map(|c| match c {
                BackendCall::VertexAttribute(a) => Some(a.divisor),
                _ => None,
            })
            .collect();
        assert_eq!(divisors, vec![1, 1, 1, 1]);
    }
}
