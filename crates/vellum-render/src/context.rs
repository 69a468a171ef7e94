use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;
use vellum_backend::{BackendCapabilities, GpuHandle, NullBackend, RenderBackend, SurfaceId};
use vellum_core::Config;
use vellum_core::profiling::init_profiling;

use crate::gc::{DeletionQueues, DrainStats, GpuResource};
use crate::shader::ShaderDialect;

/// Descriptor for creating a [`GraphicsContext`].
#[derive(Debug, Clone, Default)]
pub struct GraphicsContextDescriptor {
    /// Name used in log output.
    pub label: Option<String>,
    pub config: Config,
}

impl GraphicsContextDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }
}

/// The rendering context every resource and surface is created against.
///
/// Shared as `Arc<GraphicsContext>` and passed explicitly to every rendering call.
/// It owns the backend, the deferred-deletion queues and the "current surface" id.
///
/// # Threading
///
/// The context is `Send + Sync` so resources holding it can be dropped anywhere, but
/// anything that reaches the backend (draws, uploads, [`drain_deletions`]) must stay
/// on the render thread.
///
/// # Example
///
/// ```
/// use vellum_render::{GraphicsContext, GraphicsContextDescriptor};
///
/// let ctx = GraphicsContext::headless();
/// assert!(ctx.current_surface().is_none());
/// assert_eq!(ctx.drain_deletions().deleted(), 0);
/// ```
///
/// [`drain_deletions`]: Self::drain_deletions
pub struct GraphicsContext {
    label: String,
    backend: Arc<dyn RenderBackend>,
    capabilities: BackendCapabilities,
    queues: Arc<DeletionQueues>,
    current_surface: Mutex<Option<SurfaceId>>,
    next_surface: AtomicU32,
    config: Config,
}

impl GraphicsContext {
    /// Wrap `backend` in a new context.
    ///
    /// A config with profiling enabled initializes it for the process if nothing has yet.
    /// `ProfilingMode::Off` leaves the process-wide profiling state alone.
    pub fn new(backend: Arc<dyn RenderBackend>, desc: GraphicsContextDescriptor) -> Arc<Self> {
        if desc.config.profiling.is_enabled() {
            init_profiling(desc.config.profiling);
        }

        let capabilities = backend.capabilities();
        let label = desc.label.unwrap_or_else(|| "vellum".to_string());
        tracing::info!(
            label = %label,
            backend = ?capabilities.kind,
            legacy_shaders = capabilities.legacy_shaders,
            "graphics context created"
        );

        Arc::new(Self {
            label,
            backend,
            capabilities,
            queues: Arc::new(DeletionQueues::new()),
            current_surface: Mutex::new(None),
            next_surface: AtomicU32::new(1),
            config: desc.config,
        })
    }

    /// A context over [`NullBackend`], for headless runs.
    pub fn headless() -> Arc<Self> {
        Self::new(Arc::new(NullBackend::new()), GraphicsContextDescriptor::default())
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn backend(&self) -> &dyn RenderBackend {
        self.backend.as_ref()
    }

    pub fn capabilities(&self) -> BackendCapabilities {
        self.capabilities
    }

    /// Shader dialect every program built on this context compiles with.
    pub fn shader_dialect(&self) -> ShaderDialect {
        ShaderDialect::for_capabilities(self.capabilities)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn deletion_queues(&self) -> &Arc<DeletionQueues> {
        &self.queues
    }

    /// Take ownership of a freshly created handle.
    pub fn track<H>(&self, handle: H) -> GpuResource<H>
    where
        H: Copy + Into<GpuHandle>,
    {
        GpuResource::new(handle, self.queues.clone())
    }

    pub fn current_surface(&self) -> Option<SurfaceId> {
        *self.current_surface.lock()
    }

    /// Route all following backend calls to `surface`.
    pub fn make_current(&self, surface: SurfaceId) {
        let mut current = self.current_surface.lock();
        if *current != Some(surface) {
            tracing::trace!(surface = surface.0, "making surface current");
            *current = Some(surface);
            self.backend.make_current(surface);
        }
    }

    pub(crate) fn allocate_surface_id(&self) -> SurfaceId {
        SurfaceId(self.next_surface.fetch_add(1, Ordering::Relaxed))
    }

    /// Delete every queued handle. [`Surface::present`](crate::Surface::present) calls
    /// this once per frame; call it yourself only when no surface is presenting.
    pub fn drain_deletions(&self) -> DrainStats {
        self.queues.drain(self.backend.as_ref())
    }
}

impl std::fmt::Debug for GraphicsContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphicsContext")
            .field("label", &self.label)
            .field("capabilities", &self.capabilities)
            .field("current_surface", &self.current_surface())
            .field("queues", &self.queues)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_backend::{BackendCall, RecordingBackend};
    use vellum_core::ProfilingMode;
    use vellum_core::profiling::profiling_mode;

    #[test]
    fn make_current_is_forwarded_once() {
        let backend = Arc::new(RecordingBackend::new());
        let ctx = GraphicsContext::new(backend.clone(), GraphicsContextDescriptor::new());

        ctx.make_current(SurfaceId(3));
        ctx.make_current(SurfaceId(3));

        assert_eq!(ctx.current_surface(), Some(SurfaceId(3)));
        assert_eq!(
            backend.count(|c| matches!(c, BackendCall::MakeCurrent(_))),
            1
        );
    }

    #[test]
    fn default_context_keeps_profiling_enabled() {
        let config = Config::default().with_profiling(ProfilingMode::On);
        let _profiled = GraphicsContext::new(
            Arc::new(NullBackend::new()),
            GraphicsContextDescriptor::new().with_config(config),
        );
        let _plain = GraphicsContext::headless();

        assert_eq!(profiling_mode(), Some(ProfilingMode::On));
    }

    #[test]
    fn legacy_backend_selects_legacy_dialect() {
        let ctx = GraphicsContext::new(
            Arc::new(NullBackend::legacy()),
            GraphicsContextDescriptor::new().with_label("legacy"),
        );
        assert_eq!(ctx.shader_dialect(), ShaderDialect::Legacy);
        assert_eq!(ctx.label(), "legacy");
    }

    #[test]
    fn surface_ids_are_unique() {
        let ctx = GraphicsContext::headless();
        assert_ne!(ctx.allocate_surface_id(), ctx.allocate_surface_id());
    }
}
