//! Post-processing effect chain.
//!
//! Effects run in list order. Each enabled effect owns a render target that receives
//! whatever the previous link produced (scene content for the first enabled effect),
//! and draws a full-screen quad sampling that target into the *next* enabled effect's
//! target, or into the surface if it is the last one. Disabled effects are skipped
//! entirely and never count as a link.
//!
//! ```text
//! [A on] [B off] [C on]
//!
//! scene ──▶ A.target ──A──▶ C.target ──C──▶ surface
//! ```
//!
//! Targets are sized to the surface when an effect is added and are not resized when
//! the surface is.
//!
//! Enabled flags are latched once per frame by the owning surface. The scene target
//! and the passes of a frame are both decided from the latched state, so toggling an
//! effect between two presents only changes the chain from the next frame on.

use std::sync::Arc;

use glam::{Mat4, Vec2};
use vellum_backend::{FramebufferHandle, Primitive};
use vellum_core::geometry::{Rect, Size};
use vellum_core::profiling::{profile_function, profile_scope};

use crate::color::Color;
use crate::context::GraphicsContext;
use crate::error::Result;
use crate::mesh::{Geometry, Mesh, Paint, UniformHook};
use crate::shader::Shader;
use crate::texture::RenderTarget;

/// Identifies an effect within its surface's chain. Stable across inserts and removals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EffectId(u64);

/// Where one link of the chain draws to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destination {
    /// The surface's default framebuffer
    Surface,
    /// The render target of another effect
    Effect(EffectId),
}

/// One pass of a frame's chain: `effect` samples its own target into `destination`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainStep {
    pub effect: EffectId,
    pub destination: Destination,
}

/// Description of an effect before it joins a surface.
pub struct PostEffect {
    label: String,
    shader: Arc<Shader>,
    enabled: bool,
    hook: Option<Box<dyn UniformHook>>,
}

impl PostEffect {
    pub fn new(label: impl Into<String>, shader: Arc<Shader>) -> Self {
        Self {
            label: label.into(),
            shader,
            enabled: true,
            hook: None,
        }
    }

    /// Called every frame right before the effect's quad is drawn, with the effect's
    /// shader bound. Use it for time uniforms or extra textures.
    pub fn with_hook(mut self, hook: impl UniformHook + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Quad covering clip space, top-left texture origin.
fn fullscreen_quad() -> Geometry {
    Geometry::new(
        Primitive::TriangleFan,
        vec![
            Vec2::new(-1.0, 1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, -1.0),
            Vec2::new(-1.0, -1.0),
        ],
    )
    .with_uvs(vec![
        Vec2::new(0.0, 0.0),
        Vec2::new(1.0, 0.0),
        Vec2::new(1.0, 1.0),
        Vec2::new(0.0, 1.0),
    ])
}

/// An effect that is part of a chain and owns its GPU resources.
pub struct Effect {
    id: EffectId,
    label: String,
    enabled: bool,
    /// `enabled` as of the start of the current frame
    active: bool,
    target: RenderTarget,
    quad: Mesh,
}

impl Effect {
    fn allocate(
        ctx: &GraphicsContext,
        id: EffectId,
        desc: PostEffect,
        size: Size<u32>,
    ) -> Result<Self> {
        let target = RenderTarget::new(ctx, size)?;
        let mut quad = Mesh::new(ctx, fullscreen_quad(), desc.shader);
        if let Some(hook) = desc.hook {
            quad.set_boxed_uniform_hook(hook);
        }
        tracing::debug!(
            effect = %desc.label,
            width = size.width,
            height = size.height,
            "effect allocated"
        );
        Ok(Self {
            id,
            label: desc.label,
            enabled: desc.enabled,
            active: desc.enabled,
            target,
            quad,
        })
    }

    pub fn id(&self) -> EffectId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether this effect is part of the current frame's chain.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Takes effect from the next frame.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// The target this effect reads from.
    pub fn target(&self) -> &RenderTarget {
        &self.target
    }

    pub fn shader(&self) -> &Arc<Shader> {
        self.quad.shader()
    }

    pub fn set_hook(&mut self, hook: impl UniformHook + 'static) {
        self.quad.set_uniform_hook(hook);
    }

    fn dispose(&self, ctx: &GraphicsContext) {
        self.target.dispose(ctx);
        self.quad.dispose(ctx);
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("enabled", &self.enabled)
            .field("active", &self.active)
            .field("framebuffer", &self.target.framebuffer())
            .finish()
    }
}

/// Ordered effects of one surface.
#[derive(Debug, Default)]
pub struct EffectChain {
    effects: Vec<Effect>,
    next_id: u64,
}

impl EffectChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Effect> {
        self.effects.iter()
    }

    pub fn get(&self, id: EffectId) -> Option<&Effect> {
        self.effects.iter().find(|e| e.id == id)
    }

    pub fn get_mut(&mut self, id: EffectId) -> Option<&mut Effect> {
        self.effects.iter_mut().find(|e| e.id == id)
    }

    /// Current list index of `id`.
    pub fn position(&self, id: EffectId) -> Option<usize> {
        self.effects.iter().position(|e| e.id == id)
    }

    /// Allocate a target for `desc` and place it at `index` (clamped to the end).
    pub(crate) fn insert(
        &mut self,
        ctx: &GraphicsContext,
        index: usize,
        desc: PostEffect,
        size: Size<u32>,
    ) -> Result<EffectId> {
        let id = EffectId(self.next_id);
        let effect = Effect::allocate(ctx, id, desc, size)?;
        self.next_id += 1;
        let index = index.min(self.effects.len());
        self.effects.insert(index, effect);
        Ok(id)
    }

    /// Remove `id` and delete its GPU resources now.
    pub(crate) fn remove(&mut self, ctx: &GraphicsContext, id: EffectId) -> bool {
        match self.position(id) {
            Some(index) => {
                let effect = self.effects.remove(index);
                effect.dispose(ctx);
                true
            }
            None => false,
        }
    }

    /// Where scene content should be drawn before the chain runs.
    pub fn scene_destination(&self) -> Destination {
        self.effects
            .iter()
            .find(|e| e.active)
            .map_or(Destination::Surface, |e| Destination::Effect(e.id))
    }

    /// The passes of one frame, in order.
    pub fn plan(&self) -> Vec<ChainStep> {
        let active: Vec<EffectId> = self
            .effects
            .iter()
            .filter(|e| e.active)
            .map(|e| e.id)
            .collect();

        active
            .iter()
            .enumerate()
            .map(|(i, &effect)| ChainStep {
                effect,
                destination: active
                    .get(i + 1)
                    .map_or(Destination::Surface, |&next| Destination::Effect(next)),
            })
            .collect()
    }

    /// Apply pending enable/disable changes. Called at frame boundaries.
    pub(crate) fn latch(&mut self) {
        for effect in &mut self.effects {
            if effect.active != effect.enabled {
                tracing::debug!(
                    effect = %effect.label,
                    enabled = effect.enabled,
                    "effect toggled"
                );
                effect.active = effect.enabled;
            }
        }
    }

    /// Framebuffer for `destination`; `None` is the surface.
    pub fn framebuffer(&self, destination: Destination) -> Option<FramebufferHandle> {
        match destination {
            Destination::Surface => None,
            Destination::Effect(id) => self.get(id).map(|e| e.target.framebuffer()),
        }
    }

    /// Run every pass. Returns the number of passes drawn.
    pub(crate) fn execute(
        &mut self,
        ctx: &GraphicsContext,
        surface_viewport: Rect<i32>,
        surface_clear: Color,
    ) -> u32 {
        profile_function!();

        let backend = ctx.backend();
        let mut passes = 0;
        for step in self.plan() {
            profile_scope!("effect_pass");

            let (viewport, clear) = match step.destination {
                Destination::Surface => (surface_viewport, surface_clear),
                Destination::Effect(id) => match self.get(id) {
                    Some(next) => {
                        let size = next.target.size();
                        (
                            Rect::new(0, 0, size.width as i32, size.height as i32),
                            Color::TRANSPARENT,
                        )
                    }
                    None => continue,
                },
            };
            backend.bind_framebuffer(self.framebuffer(step.destination));
            backend.set_viewport(viewport);
            backend.set_scissor(None);
            backend.clear(clear.to_array());

            let Some(effect) = self.get_mut(step.effect) else {
                continue;
            };
            tracing::trace!(
                effect = %effect.label,
                destination = ?step.destination,
                "effect pass"
            );
            let paint = Paint::Texture(effect.target.texture());
            if effect.quad.draw_with_matrix(ctx, Mat4::IDENTITY, paint) {
                passes += 1;
            }
        }
        passes
    }

    /// Delete every effect's resources now.
    pub(crate) fn dispose_all(&mut self, ctx: &GraphicsContext) {
        for effect in self.effects.drain(..) {
            effect.dispose(ctx);
        }
    }
}
