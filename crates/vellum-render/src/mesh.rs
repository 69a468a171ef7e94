//! The drawable type.
//!
//! There is a single drawable, [`Mesh`]. Shapes are not subtypes of it; they are
//! [`GeometryProvider`]s that produce a [`Geometry`] for a mesh, optionally paired
//! with a [`UniformHook`] that writes extra uniforms before each draw.

use std::sync::Arc;

use glam::{Mat4, Vec2};
use vellum_backend::{BufferTarget, BufferUsage, Primitive, VertexAttribute};
use vellum_core::profiling::profile_function;

use crate::buffer::{GpuBuffer, VertexArray};
use crate::camera::CameraId;
use crate::color::Color;
use crate::context::GraphicsContext;
use crate::instancing::InstanceBuffers;
use crate::shader::{Shader, builtin};
use crate::surface::Surface;
use crate::texture::Texture;
use crate::transform::{Transform2D, compose_mvp};

/// CPU-side vertex data of a mesh, in local logical units.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Geometry {
    pub primitive: Primitive,
    pub positions: Vec<Vec2>,
    /// Top-left-origin texture coordinates; empty means all zero
    pub uvs: Vec<Vec2>,
    /// Per-vertex colors; empty means all white
    pub colors: Vec<Color>,
}

impl Geometry {
    pub fn new(primitive: Primitive, positions: Vec<Vec2>) -> Self {
        Self {
            primitive,
            positions,
            uvs: Vec::new(),
            colors: Vec::new(),
        }
    }

    pub fn with_uvs(mut self, uvs: Vec<Vec2>) -> Self {
        self.uvs = uvs;
        self
    }

    pub fn with_colors(mut self, colors: Vec<Color>) -> Self {
        self.colors = colors;
        self
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    fn packed_uvs(&self) -> Vec<Vec2> {
        let mut uvs = self.uvs.clone();
        uvs.resize(self.positions.len(), Vec2::ZERO);
        uvs
    }

    fn packed_colors(&self) -> Vec<Color> {
        let mut colors = self.colors.clone();
        colors.resize(self.positions.len(), Color::WHITE);
        colors
    }
}

/// Something that can produce mesh geometry.
pub trait GeometryProvider {
    fn geometry(&self) -> Geometry;
}

impl GeometryProvider for Geometry {
    fn geometry(&self) -> Geometry {
        self.clone()
    }
}

/// Writes extra uniforms right before a draw, after the built-in ones.
pub trait UniformHook: Send {
    fn apply(&mut self, ctx: &GraphicsContext, shader: &Shader);
}

impl<F> UniformHook for F
where
    F: FnMut(&GraphicsContext, &Shader) + Send,
{
    fn apply(&mut self, ctx: &GraphicsContext, shader: &Shader) {
        self(ctx, shader)
    }
}

/// How a draw fills the mesh.
#[derive(Debug, Clone, Copy)]
pub enum Paint<'a> {
    Color(Color),
    /// Sampled texture, modulated by vertex colors
    Texture(&'a Texture),
    /// Outline only, as a line loop over the vertices
    Wireframe(Color),
}

/// A drawable: GPU vertex data, a shader and a transform.
///
/// Replacing geometry through [`geometry_mut`](Self::geometry_mut) or
/// [`set_geometry`](Self::set_geometry) does not reach the GPU until
/// [`upload`](Self::upload) is called; until then draws use the previous upload.
pub struct Mesh {
    geometry: Geometry,
    uploaded_vertices: u32,
    uploaded_primitive: Primitive,
    shader: Arc<Shader>,
    array: VertexArray,
    positions: GpuBuffer,
    uvs: GpuBuffer,
    colors: GpuBuffer,
    instances: Option<InstanceBuffers>,
    hook: Option<Box<dyn UniformHook>>,
    pub transform: Transform2D,
    /// Camera used by draws; `None` uses the surface's active camera.
    pub camera: Option<CameraId>,
}

impl Mesh {
    /// Create GPU buffers for `geometry` and upload it.
    pub fn new(ctx: &GraphicsContext, geometry: Geometry, shader: Arc<Shader>) -> Self {
        let mut mesh = Self {
            array: VertexArray::new(ctx),
            positions: GpuBuffer::new(ctx, BufferTarget::Vertex, BufferUsage::Static),
            uvs: GpuBuffer::new(ctx, BufferTarget::Vertex, BufferUsage::Static),
            colors: GpuBuffer::new(ctx, BufferTarget::Vertex, BufferUsage::Static),
            uploaded_vertices: 0,
            uploaded_primitive: geometry.primitive,
            geometry,
            shader,
            instances: None,
            hook: None,
            transform: Transform2D::default(),
            camera: None,
        };
        mesh.upload(ctx);
        mesh
    }

    pub fn from_provider(
        ctx: &GraphicsContext,
        provider: &impl GeometryProvider,
        shader: Arc<Shader>,
    ) -> Self {
        Self::new(ctx, provider.geometry(), shader)
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Edit the CPU copy. Call [`upload`](Self::upload) before the change is drawn.
    pub fn geometry_mut(&mut self) -> &mut Geometry {
        &mut self.geometry
    }

    pub fn set_geometry(&mut self, geometry: Geometry) {
        self.geometry = geometry;
    }

    pub fn shader(&self) -> &Arc<Shader> {
        &self.shader
    }

    pub fn with_transform(mut self, transform: Transform2D) -> Self {
        self.transform = transform;
        self
    }

    /// Push the CPU geometry to the GPU and rebuild attribute bindings.
    pub fn upload(&mut self, ctx: &GraphicsContext) {
        profile_function!();

        let positions: Vec<vellum_core::math::PackedVec2> =
            self.geometry.positions.iter().map(|&p| p.into()).collect();
        let uvs: Vec<vellum_core::math::PackedVec2> = self
            .geometry
            .packed_uvs()
            .into_iter()
            .map(Into::into)
            .collect();

        self.positions.upload(ctx, &positions);
        self.uvs.upload(ctx, &uvs);
        self.colors.upload(ctx, &self.geometry.packed_colors());
        self.uploaded_vertices = self.geometry.vertex_count() as u32;
        self.uploaded_primitive = self.geometry.primitive;

        self.bind_attributes(ctx);
    }

    fn bind_attributes(&self, ctx: &GraphicsContext) {
        self.array.bind(ctx);
        self.positions
            .attach(ctx, VertexAttribute::per_vertex(builtin::ATTR_POSITION, 2));
        self.uvs
            .attach(ctx, VertexAttribute::per_vertex(builtin::ATTR_UV, 2));
        self.colors
            .attach(ctx, VertexAttribute::per_vertex(builtin::ATTR_COLOR, 4));
        if let Some(instances) = &self.instances {
            instances.attach(ctx);
        }
        VertexArray::unbind(ctx);
    }

    /// Draw `count` copies in one call, driven by per-instance arrays.
    pub fn enable_instancing(
        &mut self,
        ctx: &GraphicsContext,
        count: usize,
    ) -> &mut InstanceBuffers {
        if let Some(old) = self.instances.take() {
            old.dispose(ctx);
        }
        let instances = self.instances.insert(InstanceBuffers::new(ctx, count));
        self.array.bind(ctx);
        instances.attach(ctx);
        VertexArray::unbind(ctx);
        instances
    }

    pub fn instances(&self) -> Option<&InstanceBuffers> {
        self.instances.as_ref()
    }

    pub fn instances_mut(&mut self) -> Option<&mut InstanceBuffers> {
        self.instances.as_mut()
    }

    pub fn set_uniform_hook(&mut self, hook: impl UniformHook + 'static) {
        self.hook = Some(Box::new(hook));
    }

    pub(crate) fn set_boxed_uniform_hook(&mut self, hook: Box<dyn UniformHook>) {
        self.hook = Some(hook);
    }

    pub fn clear_uniform_hook(&mut self) {
        self.hook = None;
    }

    /// Draw through `surface`'s projection and camera.
    pub fn draw(&mut self, surface: &Surface, paint: Paint<'_>) {
        surface.make_current();
        let (projection, view) = surface.camera_matrices(self.camera);
        let mvp = compose_mvp(projection, view, self.transform.local_matrix());
        if self.draw_with_matrix(surface.context(), mvp, paint) {
            surface.record_draw();
        }
    }

    /// Draw with an explicit final matrix, bypassing surface and camera.
    ///
    /// Returns `false` if nothing was drawn.
    pub fn draw_with_matrix(
        &mut self,
        ctx: &GraphicsContext,
        mvp: Mat4,
        paint: Paint<'_>,
    ) -> bool {
        profile_function!();

        if self.array.is_disposed() {
            tracing::warn!("draw of a disposed mesh ignored");
            return false;
        }
        if self.uploaded_vertices == 0 {
            return false;
        }

        let shader = &self.shader;
        shader.bind(ctx);
        shader.set_uniform(ctx, builtin::U_MVP, mvp);

        let mut primitive = self.uploaded_primitive;
        match paint {
            Paint::Color(color) => {
                shader.set_uniform(ctx, builtin::U_COLOR, color);
                shader.set_uniform(ctx, builtin::U_USE_TEXTURE, false);
            }
            Paint::Texture(texture) => {
                texture.bind(ctx, 0);
                shader.set_uniform(ctx, builtin::U_TEXTURE, 0);
                shader.set_uniform(ctx, builtin::U_USE_TEXTURE, true);
                shader.set_uniform(ctx, builtin::U_FLIP_Y, texture.is_flipped());
                shader.set_uniform(ctx, builtin::U_COLOR, Color::WHITE);
            }
            Paint::Wireframe(color) => {
                shader.set_uniform(ctx, builtin::U_COLOR, color);
                shader.set_uniform(ctx, builtin::U_USE_TEXTURE, false);
                primitive = Primitive::LineLoop;
            }
        }
        shader.set_uniform(ctx, builtin::U_INSTANCED, self.instances.is_some());

        if let Some(hook) = self.hook.as_mut() {
            hook.apply(ctx, shader);
        }

        self.array.bind(ctx);
        match &self.instances {
            Some(instances) => ctx.backend().draw_instanced(
                primitive,
                0,
                self.uploaded_vertices,
                instances.count() as u32,
            ),
            None => ctx.backend().draw(primitive, 0, self.uploaded_vertices),
        }
        VertexArray::unbind(ctx);
        true
    }

    /// Delete all GPU handles now. The shader is shared and left alone.
    pub fn dispose(&self, ctx: &GraphicsContext) {
        self.array.dispose(ctx);
        self.positions.dispose(ctx);
        self.uvs.dispose(ctx);
        self.colors.dispose(ctx);
        if let Some(instances) = &self.instances {
            instances.dispose(ctx);
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.array.is_disposed()
    }
}

impl std::fmt::Debug for Mesh {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mesh")
            .field("vertices", &self.uploaded_vertices)
            .field("primitive", &self.uploaded_primitive)
            .field("shader", &self.shader.label())
            .field("instanced", &self.instances.is_some())
            .field("transform", &self.transform)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GraphicsContextDescriptor, SurfaceDescriptor};
    use vellum_backend::{BackendCall, RecordingBackend, UniformValue};
    use vellum_core::geometry::Rect;

    fn setup() -> (Arc<RecordingBackend>, Arc<GraphicsContext>, Arc<Shader>) {
        let backend = Arc::new(RecordingBackend::new());
        let ctx = GraphicsContext::new(backend.clone(), GraphicsContextDescriptor::new());
        let shader = Arc::new(Shader::mesh(&ctx).unwrap());
        (backend, ctx, shader)
    }

    fn triangle() -> Geometry {
        Geometry::new(
            Primitive::Triangles,
            vec![Vec2::ZERO, Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0)],
        )
    }

    #[test]
    fn geometry_changes_wait_for_upload() {
        let (backend, ctx, shader) = setup();
        let mut mesh = Mesh::new(&ctx, triangle(), shader);

        mesh.geometry_mut().positions.push(Vec2::ONE);
        mesh.geometry_mut().primitive = Primitive::TriangleFan;
        mesh.draw_with_matrix(&ctx, Mat4::IDENTITY, Paint::Color(Color::RED));
        mesh.upload(&ctx);
        mesh.draw_with_matrix(&ctx, Mat4::IDENTITY, Paint::Color(Color::RED));

        let draws: Vec<_> = backend
            .calls()
            .into_iter()
            .filter(|c| matches!(c, BackendCall::Draw { .. }))
            .collect();
        assert_eq!(
            draws,
            vec![
                BackendCall::Draw {
                    primitive: Primitive::Triangles,
                    first: 0,
                    count: 3
                },
                BackendCall::Draw {
                    primitive: Primitive::TriangleFan,
                    first: 0,
                    count: 4
                },
            ]
        );
    }

    #[test]
    fn texture_paint_sets_flip_uniform() {
        let (backend, ctx, shader) = setup();
        let image = crate::ImageData::solid(2, 2, Color::WHITE);
        let texture = Texture::from_image(&ctx, &image).unwrap();
        let mut mesh = Mesh::new(&ctx, triangle(), shader.clone());

        mesh.draw_with_matrix(&ctx, Mat4::IDENTITY, Paint::Texture(&texture));

        assert_eq!(
            backend.uniform_value(shader.handle(), builtin::U_FLIP_Y),
            Some(UniformValue::Int(1))
        );
        assert!(backend.calls().contains(&BackendCall::BindTexture {
            unit: 0,
            texture: Some(texture.handle())
        }));
    }

    #[test]
    fn wireframe_draws_line_loop() {
        let (backend, ctx, shader) = setup();
        let mut mesh = Mesh::new(&ctx, triangle(), shader);

        mesh.draw_with_matrix(&ctx, Mat4::IDENTITY, Paint::Wireframe(Color::GREEN));

        assert_eq!(
            backend.count(|c| matches!(
                c,
                BackendCall::Draw {
                    primitive: Primitive::LineLoop,
                    ..
                }
            )),
            1
        );
    }

    #[test]
    fn uniform_hook_runs_each_draw() {
        let (backend, ctx, shader) = setup();
        let mut mesh = Mesh::new(&ctx, triangle(), shader.clone());
        let mut time = 0.0f32;
        mesh.set_uniform_hook(move |ctx: &GraphicsContext, shader: &Shader| {
            time += 0.5;
            shader.set_uniform(ctx, "u_time", time);
        });

        mesh.draw_with_matrix(&ctx, Mat4::IDENTITY, Paint::Color(Color::WHITE));
        mesh.draw_with_matrix(&ctx, Mat4::IDENTITY, Paint::Color(Color::WHITE));

        assert_eq!(
            backend.uniform_value(shader.handle(), "u_time"),
            Some(UniformValue::Float(1.0))
        );
        assert_eq!(backend.uniform_lookups("u_time"), 1);
    }

    #[test]
    fn instanced_mesh_issues_one_instanced_draw() {
        let (backend, ctx, shader) = setup();
        let mut mesh = Mesh::new(&ctx, triangle(), shader);
        mesh.enable_instancing(&ctx, 100);

        mesh.draw_with_matrix(&ctx, Mat4::IDENTITY, Paint::Color(Color::WHITE));

        assert_eq!(
            backend.count(|c| matches!(c, BackendCall::DrawInstanced { instances: 100, .. })),
            1
        );
        assert_eq!(backend.count(|c| matches!(c, BackendCall::Draw { .. })), 0);
    }

    #[test]
    fn disposed_mesh_does_not_draw_and_drop_is_harmless() {
        let (backend, ctx, shader) = setup();
        let mut mesh = Mesh::new(&ctx, triangle(), shader.clone());
        let live_before = backend.live_count();

        mesh.dispose(&ctx);
        assert!(!mesh.draw_with_matrix(&ctx, Mat4::IDENTITY, Paint::Color(Color::WHITE)));
        drop(mesh);

        assert_eq!(ctx.drain_deletions().deleted(), 0);
        // vertex array and three buffers
        assert_eq!(backend.live_count(), live_before - 4);
        assert!(backend.is_live(shader.handle()));
    }

    #[test]
    fn draw_makes_target_surface_current() {
        let (backend, ctx, shader) = setup();
        let mut first = Surface::new(ctx.clone(), SurfaceDescriptor::new(32, 32));
        let mut second = Surface::new(ctx.clone(), SurfaceDescriptor::new(16, 16));
        assert!(first.is_current());
        let mut mesh = Mesh::new(&ctx, triangle(), shader);
        backend.clear_calls();

        mesh.draw(&second, Paint::Color(Color::WHITE));

        assert!(second.is_current());
        assert!(!first.is_current());
        let calls = backend.calls();
        let switch = calls
            .iter()
            .position(|c| *c == BackendCall::MakeCurrent(second.id()))
            .unwrap();
        let draw = calls
            .iter()
            .position(|c| matches!(c, BackendCall::Draw { .. }))
            .unwrap();
        assert!(switch < draw);
        assert!(calls.contains(&BackendCall::SetViewport(Rect::new(0, 0, 16, 16))));

        assert_eq!(second.present().draw_calls, 1);
        assert_eq!(first.present().draw_calls, 0);
    }
}
