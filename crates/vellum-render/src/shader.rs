//! Shader programs and their uniform location cache.
//!
//! A [`ShaderDescriptor`] carries a modern source pair and, optionally, a legacy pair.
//! Which one compiles is decided once, from the context's [`ShaderDialect`], when the
//! [`Shader`] is built. Nothing checks the dialect again at draw time.
//!
//! ```
//! use vellum_render::{GraphicsContext, Shader};
//!
//! let ctx = GraphicsContext::headless();
//! let shader = Shader::mesh(&ctx).unwrap();
//!
//! shader.set_uniform(&ctx, "u_use_texture", false);
//! shader.set_uniform(&ctx, "u_use_texture", true);
//! assert_eq!(shader.cached_uniforms(), 1);
//! ```

use std::borrow::Cow;

use parking_lot::Mutex;
use vellum_backend::{
    BackendCapabilities, ProgramDescriptor, ProgramHandle, UniformLocation, UniformValue,
};
use vellum_core::alloc::HashMap;

use crate::context::GraphicsContext;
use crate::error::{RenderError, Result};
use crate::gc::GpuResource;

/// Attribute locations and uniform names shared by the built-in shaders.
pub mod builtin {
    pub const ATTR_POSITION: u32 = 0;
    pub const ATTR_UV: u32 = 1;
    pub const ATTR_COLOR: u32 = 2;
    pub const ATTR_INSTANCE_POSITION: u32 = 3;
    pub const ATTR_INSTANCE_SCALE: u32 = 4;
    pub const ATTR_INSTANCE_ADD: u32 = 5;
    pub const ATTR_INSTANCE_MUL: u32 = 6;

    pub const U_MVP: &str = "u_mvp";
    pub const U_COLOR: &str = "u_color";
    pub const U_TEXTURE: &str = "u_texture";
    pub const U_USE_TEXTURE: &str = "u_use_texture";
    pub const U_FLIP_Y: &str = "u_flip_y";
    pub const U_INSTANCED: &str = "u_instanced";

    pub const MESH_VERTEX: &str = include_str!("shaders/mesh_330.vert");
    pub const MESH_FRAGMENT: &str = include_str!("shaders/mesh_330.frag");
    pub const MESH_VERTEX_LEGACY: &str = include_str!("shaders/mesh_120.vert");
    pub const MESH_FRAGMENT_LEGACY: &str = include_str!("shaders/mesh_120.frag");

    pub const EFFECT_VERTEX: &str = include_str!("shaders/effect_330.vert");
    pub const EFFECT_FRAGMENT: &str = include_str!("shaders/effect_330.frag");
    pub const EFFECT_VERTEX_LEGACY: &str = include_str!("shaders/effect_120.vert");
    pub const EFFECT_FRAGMENT_LEGACY: &str = include_str!("shaders/effect_120.frag");

    /// Bindings for backends that cannot introspect attribute locations.
    pub const ATTRIBUTE_BINDINGS: [(u32, &str); 7] = [
        (ATTR_POSITION, "a_position"),
        (ATTR_UV, "a_uv"),
        (ATTR_COLOR, "a_color"),
        (ATTR_INSTANCE_POSITION, "a_instance_position"),
        (ATTR_INSTANCE_SCALE, "a_instance_scale"),
        (ATTR_INSTANCE_ADD, "a_instance_add"),
        (ATTR_INSTANCE_MUL, "a_instance_mul"),
    ];
}

/// Source language generation a backend accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderDialect {
    /// GLSL 330 class
    Modern,
    /// GLSL 120 class, used when the context fell back to a legacy profile
    Legacy,
}

impl ShaderDialect {
    pub fn for_capabilities(capabilities: BackendCapabilities) -> Self {
        if capabilities.legacy_shaders {
            ShaderDialect::Legacy
        } else {
            ShaderDialect::Modern
        }
    }
}

/// A vertex and fragment source pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSources {
    pub vertex: Cow<'static, str>,
    pub fragment: Cow<'static, str>,
}

impl StageSources {
    pub fn new(
        vertex: impl Into<Cow<'static, str>>,
        fragment: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }
}

/// Everything needed to build a [`Shader`].
#[derive(Debug, Clone)]
pub struct ShaderDescriptor {
    pub label: Cow<'static, str>,
    pub modern: StageSources,
    pub legacy: Option<StageSources>,
    pub attribute_bindings: Vec<(u32, Cow<'static, str>)>,
}

impl ShaderDescriptor {
    pub fn new(label: impl Into<Cow<'static, str>>, modern: StageSources) -> Self {
        Self {
            label: label.into(),
            modern,
            legacy: None,
            attribute_bindings: Vec::new(),
        }
    }

    pub fn with_legacy(mut self, legacy: StageSources) -> Self {
        self.legacy = Some(legacy);
        self
    }

    pub fn with_attribute(mut self, location: u32, name: impl Into<Cow<'static, str>>) -> Self {
        self.attribute_bindings.push((location, name.into()));
        self
    }

    /// The flat/textured/instanced program used by meshes.
    pub fn mesh() -> Self {
        Self::with_builtin_bindings(
            "mesh",
            StageSources::new(builtin::MESH_VERTEX, builtin::MESH_FRAGMENT),
            StageSources::new(builtin::MESH_VERTEX_LEGACY, builtin::MESH_FRAGMENT_LEGACY),
        )
    }

    /// Pass-through full-screen effect program.
    pub fn effect() -> Self {
        Self::with_builtin_bindings(
            "effect",
            StageSources::new(builtin::EFFECT_VERTEX, builtin::EFFECT_FRAGMENT),
            StageSources::new(builtin::EFFECT_VERTEX_LEGACY, builtin::EFFECT_FRAGMENT_LEGACY),
        )
    }

    fn with_builtin_bindings(
        label: &'static str,
        modern: StageSources,
        legacy: StageSources,
    ) -> Self {
        let mut desc = Self::new(label, modern).with_legacy(legacy);
        desc.attribute_bindings = builtin::ATTRIBUTE_BINDINGS
            .iter()
            .map(|&(location, name)| (location, Cow::Borrowed(name)))
            .collect();
        desc
    }
}

/// A linked program plus a name to location cache.
///
/// Each uniform name is looked up through the backend at most once; later writes
/// reuse the cached answer, including the answer "no such uniform".
pub struct Shader {
    resource: GpuResource<ProgramHandle>,
    label: String,
    dialect: ShaderDialect,
    uniforms: Mutex<HashMap<String, Option<UniformLocation>>>,
}

impl Shader {
    /// Compile `desc` with the dialect of `ctx`.
    pub fn new(ctx: &GraphicsContext, desc: &ShaderDescriptor) -> Result<Self> {
        let dialect = ctx.shader_dialect();
        let sources = match dialect {
            ShaderDialect::Modern => &desc.modern,
            ShaderDialect::Legacy => desc.legacy.as_ref().ok_or_else(|| {
                tracing::error!(shader = %desc.label, "legacy backend but no legacy source");
                RenderError::UnsupportedBackendVersion {
                    label: desc.label.to_string(),
                }
            })?,
        };

        let bindings: Vec<(u32, &str)> = desc
            .attribute_bindings
            .iter()
            .map(|(location, name)| (*location, name.as_ref()))
            .collect();

        let program = ctx
            .backend()
            .compile_program(&ProgramDescriptor {
                label: Some(&desc.label),
                vertex: &sources.vertex,
                fragment: &sources.fragment,
                attribute_bindings: &bindings,
            })
            .map_err(|failure| {
                tracing::error!(shader = %desc.label, stage = %failure.stage, "{}", failure.log);
                RenderError::ShaderCompilation {
                    label: desc.label.to_string(),
                    stage: failure.stage,
                    log: failure.log,
                }
            })?;

        tracing::debug!(shader = %desc.label, ?dialect, program = program.raw(), "shader compiled");

        Ok(Self {
            resource: ctx.track(program),
            label: desc.label.to_string(),
            dialect,
            uniforms: Mutex::new(HashMap::default()),
        })
    }

    /// Built-in mesh program.
    pub fn mesh(ctx: &GraphicsContext) -> Result<Self> {
        Self::new(ctx, &ShaderDescriptor::mesh())
    }

    /// Built-in pass-through effect program.
    pub fn effect(ctx: &GraphicsContext) -> Result<Self> {
        Self::new(ctx, &ShaderDescriptor::effect())
    }

    pub fn handle(&self) -> ProgramHandle {
        self.resource.handle()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn dialect(&self) -> ShaderDialect {
        self.dialect
    }

    pub fn bind(&self, ctx: &GraphicsContext) {
        ctx.backend().use_program(Some(self.handle()));
    }

    /// Cached uniform lookup.
    pub fn uniform_location(&self, ctx: &GraphicsContext, name: &str) -> Option<UniformLocation> {
        let mut uniforms = self.uniforms.lock();
        if let Some(location) = uniforms.get(name) {
            return *location;
        }

        let location = ctx.backend().uniform_location(self.handle(), name);
        if location.is_none() {
            tracing::trace!(shader = %self.label, uniform = name, "uniform not active");
        }
        uniforms.insert(name.to_string(), location);
        location
    }

    /// Bind the program and write a uniform. Returns `false` if the program has no
    /// active uniform called `name`.
    pub fn set_uniform(
        &self,
        ctx: &GraphicsContext,
        name: &str,
        value: impl Into<UniformValue>,
    ) -> bool {
        let Some(location) = self.uniform_location(ctx, name) else {
            return false;
        };
        self.bind(ctx);
        ctx.backend().set_uniform(location, value.into());
        true
    }

    /// Number of names in the location cache.
    pub fn cached_uniforms(&self) -> usize {
        self.uniforms.lock().len()
    }

    pub fn dispose(&self, ctx: &GraphicsContext) {
        self.resource.dispose(ctx.backend());
    }

    pub fn is_disposed(&self) -> bool {
        self.resource.is_disposed()
    }
}

impl std::fmt::Debug for Shader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shader")
            .field("label", &self.label)
            .field("program", &self.handle())
            .field("dialect", &self.dialect)
            .finish()
    }
}
