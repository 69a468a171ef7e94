//! Call-recording implementation of [`RenderBackend`] for tests.
//!
//! Every call is appended to a log that tests assert on. The recorder also
//! emulates just enough GPU state (live handles, buffer contents, bound
//! framebuffer, uniform values) to check lifetime and upload behaviour.

use parking_lot::Mutex;
use vellum_core::alloc::{HashMap, HashSet};
use vellum_core::geometry::{Rect, Size};

use crate::backend::RenderBackend;
use crate::gpu_types::*;

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    MakeCurrent(SurfaceId),
    CreateBuffer(BufferHandle),
    BindBuffer {
        target: BufferTarget,
        buffer: Option<BufferHandle>,
    },
    BufferData {
        buffer: Option<BufferHandle>,
        size: usize,
        usage: BufferUsage,
    },
    BufferSubData {
        buffer: Option<BufferHandle>,
        offset: usize,
        size: usize,
    },
    DeleteBuffer(BufferHandle),
    CreateVertexArray(VertexArrayHandle),
    BindVertexArray(Option<VertexArrayHandle>),
    VertexAttribute(VertexAttribute),
    DeleteVertexArray(VertexArrayHandle),
    CreateTexture(TextureHandle),
    BindTexture {
        unit: u32,
        texture: Option<TextureHandle>,
    },
    TextureImage {
        texture: TextureHandle,
        level: u32,
        size: Size<u32>,
        has_pixels: bool,
    },
    TextureFilter {
        texture: TextureHandle,
        filter: TextureFilter,
    },
    DeleteTexture(TextureHandle),
    CreateFramebuffer {
        framebuffer: FramebufferHandle,
        color: TextureHandle,
    },
    BindFramebuffer(Option<FramebufferHandle>),
    DeleteFramebuffer(FramebufferHandle),
    CompileProgram {
        program: ProgramHandle,
        label: Option<String>,
        vertex: String,
    },
    UseProgram(Option<ProgramHandle>),
    UniformLocation {
        program: ProgramHandle,
        name: String,
    },
    SetUniform {
        location: UniformLocation,
        value: UniformValue,
    },
    DeleteProgram(ProgramHandle),
    SetViewport(Rect<i32>),
    SetScissor(Option<Rect<i32>>),
    Clear([f32; 4]),
    Draw {
        primitive: Primitive,
        first: u32,
        count: u32,
    },
    DrawInstanced {
        primitive: Primitive,
        first: u32,
        count: u32,
        instances: u32,
    },
    ReadPixels(Rect<i32>),
    Present,
}

#[derive(Default)]
struct RecorderState {
    calls: Vec<BackendCall>,
    next_handle: u32,
    next_location: i32,
    live: HashSet<GpuHandle>,
    deletes: HashMap<GpuHandle, usize>,
    buffer_contents: HashMap<BufferHandle, Vec<u8>>,
    bound_vertex: Option<BufferHandle>,
    bound_index: Option<BufferHandle>,
    bound_framebuffer: Option<FramebufferHandle>,
    program_in_use: Option<ProgramHandle>,
    locations: HashMap<(ProgramHandle, String), UniformLocation>,
    uniform_values: HashMap<(ProgramHandle, UniformLocation), UniformValue>,
    fail_next_compile: Option<CompileFailure>,
    pixel_fill: [u8; 4],
}

impl RecorderState {
    fn allocate(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }

    fn bound(&self, target: BufferTarget) -> Option<BufferHandle> {
        match target {
            BufferTarget::Vertex => self.bound_vertex,
            BufferTarget::Index => self.bound_index,
        }
    }

    fn delete(&mut self, handle: GpuHandle) {
        *self.deletes.entry(handle).or_default() += 1;
        if !self.live.remove(&handle) {
            tracing::trace!(%handle, "recording backend: delete of dead handle");
        }
        if let GpuHandle::Buffer(buffer) = handle {
            self.buffer_contents.remove(&buffer);
        }
    }
}

/// Mock [`RenderBackend`] that records calls for verification.
///
/// # Interior Mutability
///
/// Trait methods take `&self` but must record, so all state sits behind one
/// `parking_lot::Mutex`. That keeps the recorder `Send + Sync` so tests can
/// share it across threads through an `Arc`.
///
/// # Example
///
/// ```rust
/// use vellum_backend::{BackendCall, RecordingBackend, RenderBackend};
///
/// let backend = RecordingBackend::new();
/// let buffer = backend.create_buffer();
/// backend.delete_buffer(buffer);
/// backend.delete_buffer(buffer);
///
/// assert_eq!(backend.delete_count(buffer), 2);
/// assert!(!backend.is_live(buffer));
/// assert_eq!(backend.count(|c| matches!(c, BackendCall::CreateBuffer(_))), 1);
/// ```
pub struct RecordingBackend {
    capabilities: BackendCapabilities,
    state: Mutex<RecorderState>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::with_capabilities(BackendCapabilities::modern(BackendKind::Recording))
    }

    /// A recorder that reports a legacy-only shader profile.
    pub fn legacy() -> Self {
        Self::with_capabilities(BackendCapabilities::legacy(BackendKind::Recording))
    }

    pub fn with_capabilities(capabilities: BackendCapabilities) -> Self {
        Self {
            capabilities,
            state: Mutex::new(RecorderState::default()),
        }
    }

    /// Get a copy of all recorded calls.
    pub fn calls(&self) -> Vec<BackendCall> {
        self.state.lock().calls.clone()
    }

    /// Count recorded calls matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&BackendCall) -> bool) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| predicate(call))
            .count()
    }

    /// Get total number of recorded calls.
    pub fn call_count(&self) -> usize {
        self.state.lock().calls.len()
    }

    /// Clear recorded calls (useful between test steps). Emulated GPU state is kept.
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// How many times `handle` was passed to a delete operation.
    pub fn delete_count(&self, handle: impl Into<GpuHandle>) -> usize {
        self.state
            .lock()
            .deletes
            .get(&handle.into())
            .copied()
            .unwrap_or(0)
    }

    pub fn is_live(&self, handle: impl Into<GpuHandle>) -> bool {
        self.state.lock().live.contains(&handle.into())
    }

    /// Number of handles created and not yet deleted.
    pub fn live_count(&self) -> usize {
        self.state.lock().live.len()
    }

    /// Current emulated contents of `buffer`.
    pub fn buffer_contents(&self, buffer: BufferHandle) -> Option<Vec<u8>> {
        self.state.lock().buffer_contents.get(&buffer).cloned()
    }

    pub fn bound_framebuffer(&self) -> Option<FramebufferHandle> {
        self.state.lock().bound_framebuffer
    }

    /// Every framebuffer bind, in call order.
    pub fn framebuffer_binds(&self) -> Vec<Option<FramebufferHandle>> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                BackendCall::BindFramebuffer(fb) => Some(*fb),
                _ => None,
            })
            .collect()
    }

    /// Last value written to `name` in `program`, if any.
    pub fn uniform_value(&self, program: ProgramHandle, name: &str) -> Option<UniformValue> {
        let state = self.state.lock();
        let location = state.locations.get(&(program, name.to_string()))?;
        state.uniform_values.get(&(program, *location)).copied()
    }

    /// Number of uniform location lookups issued for `name`.
    pub fn uniform_lookups(&self, name: &str) -> usize {
        self.count(|call| matches!(call, BackendCall::UniformLocation { name: n, .. } if n == name))
    }

    /// Make the next `compile_program` fail with `log`.
    pub fn fail_next_compile(&self, stage: ShaderStage, log: impl Into<String>) {
        self.state.lock().fail_next_compile = Some(CompileFailure {
            stage,
            log: log.into(),
        });
    }

    /// Byte pattern returned for every pixel by `read_pixels`.
    pub fn set_pixel_fill(&self, rgba: [u8; 4]) {
        self.state.lock().pixel_fill = rgba;
    }
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderBackend for RecordingBackend {
    fn capabilities(&self) -> BackendCapabilities {
        self.capabilities
    }

    fn make_current(&self, surface: SurfaceId) {
        self.state.lock().calls.push(BackendCall::MakeCurrent(surface));
    }

    fn create_buffer(&self) -> BufferHandle {
        let mut state = self.state.lock();
        let buffer = BufferHandle(state.allocate());
        state.live.insert(buffer.into());
        state.calls.push(BackendCall::CreateBuffer(buffer));
        buffer
    }

    fn bind_buffer(&self, target: BufferTarget, buffer: Option<BufferHandle>) {
        let mut state = self.state.lock();
        match target {
            BufferTarget::Vertex => state.bound_vertex = buffer,
            BufferTarget::Index => state.bound_index = buffer,
        }
        state.calls.push(BackendCall::BindBuffer { target, buffer });
    }

    fn buffer_data(&self, target: BufferTarget, data: &[u8], usage: BufferUsage) {
        let mut state = self.state.lock();
        let buffer = state.bound(target);
        if let Some(buffer) = buffer {
            state.buffer_contents.insert(buffer, data.to_vec());
        }
        state.calls.push(BackendCall::BufferData {
            buffer,
            size: data.len(),
            usage,
        });
    }

    fn buffer_sub_data(&self, target: BufferTarget, offset: usize, data: &[u8]) {
        let mut state = self.state.lock();
        let buffer = state.bound(target);
        let contents = match buffer {
            Some(b) => state.buffer_contents.get_mut(&b),
            None => None,
        };
        if let Some(contents) = contents {
            let end = offset + data.len();
            if contents.len() < end {
                contents.resize(end, 0);
            }
            contents[offset..end].copy_from_slice(data);
        }
        state.calls.push(BackendCall::BufferSubData {
            buffer,
            offset,
            size: data.len(),
        });
    }

    fn delete_buffer(&self, buffer: BufferHandle) {
        let mut state = self.state.lock();
        state.delete(buffer.into());
        state.calls.push(BackendCall::DeleteBuffer(buffer));
    }

    fn create_vertex_array(&self) -> VertexArrayHandle {
        let mut state = self.state.lock();
        let array = VertexArrayHandle(state.allocate());
        state.live.insert(array.into());
        state.calls.push(BackendCall::CreateVertexArray(array));
        array
    }

    fn bind_vertex_array(&self, array: Option<VertexArrayHandle>) {
        self.state
            .lock()
            .calls
            .push(BackendCall::BindVertexArray(array));
    }

    fn vertex_attribute(&self, attribute: VertexAttribute) {
        self.state
            .lock()
            .calls
            .push(BackendCall::VertexAttribute(attribute));
    }

    fn delete_vertex_array(&self, array: VertexArrayHandle) {
        let mut state = self.state.lock();
        state.delete(array.into());
        state.calls.push(BackendCall::DeleteVertexArray(array));
    }

    fn create_texture(&self) -> TextureHandle {
        let mut state = self.state.lock();
        let texture = TextureHandle(state.allocate());
        state.live.insert(texture.into());
        state.calls.push(BackendCall::CreateTexture(texture));
        texture
    }

    fn bind_texture(&self, unit: u32, texture: Option<TextureHandle>) {
        self.state
            .lock()
            .calls
            .push(BackendCall::BindTexture { unit, texture });
    }

    fn texture_image(
        &self,
        texture: TextureHandle,
        level: u32,
        size: Size<u32>,
        pixels: Option<&[u8]>,
    ) {
        self.state.lock().calls.push(BackendCall::TextureImage {
            texture,
            level,
            size,
            has_pixels: pixels.is_some(),
        });
    }

    fn texture_filter(&self, texture: TextureHandle, filter: TextureFilter) {
        self.state
            .lock()
            .calls
            .push(BackendCall::TextureFilter { texture, filter });
    }

    fn delete_texture(&self, texture: TextureHandle) {
        let mut state = self.state.lock();
        state.delete(texture.into());
        state.calls.push(BackendCall::DeleteTexture(texture));
    }

    fn create_framebuffer(&self, color: TextureHandle) -> FramebufferHandle {
        let mut state = self.state.lock();
        let framebuffer = FramebufferHandle(state.allocate());
        state.live.insert(framebuffer.into());
        state
            .calls
            .push(BackendCall::CreateFramebuffer { framebuffer, color });
        framebuffer
    }

    fn bind_framebuffer(&self, framebuffer: Option<FramebufferHandle>) {
        let mut state = self.state.lock();
        state.bound_framebuffer = framebuffer;
        state.calls.push(BackendCall::BindFramebuffer(framebuffer));
    }

    fn delete_framebuffer(&self, framebuffer: FramebufferHandle) {
        let mut state = self.state.lock();
        state.delete(framebuffer.into());
        state.calls.push(BackendCall::DeleteFramebuffer(framebuffer));
    }

    fn compile_program(
        &self,
        desc: &ProgramDescriptor<'_>,
    ) -> Result<ProgramHandle, CompileFailure> {
        let mut state = self.state.lock();
        if let Some(failure) = state.fail_next_compile.take() {
            return Err(failure);
        }
        let program = ProgramHandle(state.allocate());
        state.live.insert(program.into());
        state.calls.push(BackendCall::CompileProgram {
            program,
            label: desc.label.map(str::to_string),
            vertex: desc.vertex.to_string(),
        });
        Ok(program)
    }

    fn use_program(&self, program: Option<ProgramHandle>) {
        let mut state = self.state.lock();
        state.program_in_use = program;
        state.calls.push(BackendCall::UseProgram(program));
    }

    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        let mut state = self.state.lock();
        state.calls.push(BackendCall::UniformLocation {
            program,
            name: name.to_string(),
        });
        let key = (program, name.to_string());
        if let Some(location) = state.locations.get(&key) {
            return Some(*location);
        }
        let location = UniformLocation(state.next_location);
        state.next_location += 1;
        state.locations.insert(key, location);
        Some(location)
    }

    fn set_uniform(&self, location: UniformLocation, value: UniformValue) {
        let mut state = self.state.lock();
        if let Some(program) = state.program_in_use {
            state.uniform_values.insert((program, location), value);
        }
        state
            .calls
            .push(BackendCall::SetUniform { location, value });
    }

    fn delete_program(&self, program: ProgramHandle) {
        let mut state = self.state.lock();
        state.delete(program.into());
        state.calls.push(BackendCall::DeleteProgram(program));
    }

    fn set_viewport(&self, rect: Rect<i32>) {
        self.state.lock().calls.push(BackendCall::SetViewport(rect));
    }

    fn set_scissor(&self, rect: Option<Rect<i32>>) {
        self.state.lock().calls.push(BackendCall::SetScissor(rect));
    }

    fn clear(&self, color: [f32; 4]) {
        self.state.lock().calls.push(BackendCall::Clear(color));
    }

    fn draw(&self, primitive: Primitive, first: u32, count: u32) {
        self.state.lock().calls.push(BackendCall::Draw {
            primitive,
            first,
            count,
        });
    }

    fn draw_instanced(&self, primitive: Primitive, first: u32, count: u32, instances: u32) {
        self.state.lock().calls.push(BackendCall::DrawInstanced {
            primitive,
            first,
            count,
            instances,
        });
    }

    fn read_pixels(&self, rect: Rect<i32>) -> Vec<u8> {
        let mut state = self.state.lock();
        state.calls.push(BackendCall::ReadPixels(rect));
        let count = rect.width.max(0) as usize * rect.height.max(0) as usize;
        state.pixel_fill.repeat(count)
    }

    fn present(&self) {
        self.state.lock().calls.push(BackendCall::Present);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_upload_is_emulated() {
        let mock = RecordingBackend::new();
        let buffer = mock.create_buffer();
        mock.bind_buffer(BufferTarget::Vertex, Some(buffer));
        mock.buffer_data(BufferTarget::Vertex, &[0u8; 8], BufferUsage::Dynamic);
        mock.buffer_sub_data(BufferTarget::Vertex, 4, &[1, 2, 3, 4]);

        assert_eq!(
            mock.buffer_contents(buffer),
            Some(vec![0, 0, 0, 0, 1, 2, 3, 4])
        );
    }

    #[test]
    fn test_delete_is_counted_even_when_dead() {
        let mock = RecordingBackend::new();
        let texture = mock.create_texture();
        assert!(mock.is_live(texture));

        mock.delete_texture(texture);
        mock.delete_texture(texture);

        assert!(!mock.is_live(texture));
        assert_eq!(mock.delete_count(texture), 2);
        assert_eq!(mock.live_count(), 0);
    }

    #[test]
    fn test_forced_compile_failure_is_one_shot() {
        let mock = RecordingBackend::new();
        mock.fail_next_compile(ShaderStage::Vertex, "syntax error");
        let desc = ProgramDescriptor {
            label: Some("broken"),
            vertex: "",
            fragment: "",
            attribute_bindings: &[],
        };

        let err = mock.compile_program(&desc).unwrap_err();
        assert_eq!(err.stage, ShaderStage::Vertex);
        assert!(mock.compile_program(&desc).is_ok());
    }

    #[test]
    fn test_uniform_values_are_scoped_to_program_in_use() {
        let mock = RecordingBackend::new();
        let desc = ProgramDescriptor {
            label: None,
            vertex: "",
            fragment: "",
            attribute_bindings: &[],
        };
        let program = mock.compile_program(&desc).unwrap();
        let location = mock.uniform_location(program, "u_time").unwrap();

        mock.use_program(Some(program));
        mock.set_uniform(location, UniformValue::Float(2.5));

        assert_eq!(
            mock.uniform_value(program, "u_time"),
            Some(UniformValue::Float(2.5))
        );
        assert_eq!(mock.uniform_lookups("u_time"), 1);
    }

    #[test]
    fn test_clear_calls() {
        let mock = RecordingBackend::new();
        mock.create_buffer();
        assert_eq!(mock.call_count(), 1);

        mock.clear_calls();
        assert_eq!(mock.call_count(), 0);
        assert_eq!(mock.live_count(), 1);
    }
}
