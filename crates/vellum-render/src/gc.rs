//! Deferred deletion of GPU handles.
//!
//! Resource objects can be dropped on any thread, but backend calls may only run on
//! the thread that owns the graphics context. Dropping a resource therefore never
//! touches the backend: it appends the handle to one of four queues, and the render
//! thread drains the queues once per frame from [`Surface::present`].
//!
//! Explicit disposal ([`GpuResource::dispose`]) deletes immediately instead. Both paths
//! flip the same `disposed` flag, so whichever runs first wins and the other does
//! nothing.
//!
//! ```
//! use std::sync::Arc;
//! use vellum_backend::{NullBackend, RenderBackend};
//! use vellum_render::gc::{DeletionQueues, GpuResource};
//!
//! let backend = NullBackend::new();
//! let queues = Arc::new(DeletionQueues::new());
//!
//! let buffer = GpuResource::new(backend.create_buffer(), queues.clone());
//! drop(buffer);
//! assert_eq!(queues.pending(), 1);
//!
//! let stats = queues.drain(&backend);
//! assert_eq!(stats.buffers, 1);
//! assert_eq!(queues.pending(), 0);
//! ```
//!
//! [`Surface::present`]: crate::Surface::present

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use vellum_backend::{GpuHandle, RenderBackend};
use vellum_core::alloc::HashSet;
use vellum_core::profiling::profile_function;

/// Which deletion queue a handle goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueKind {
    Buffer,
    VertexArray,
    /// Textures and the framebuffers of render targets
    Texture,
    Shader,
}

impl QueueKind {
    pub const ALL: [QueueKind; 4] = [
        QueueKind::Buffer,
        QueueKind::VertexArray,
        QueueKind::Texture,
        QueueKind::Shader,
    ];

    pub fn of(handle: GpuHandle) -> Self {
        match handle {
            GpuHandle::Buffer(_) => QueueKind::Buffer,
            GpuHandle::VertexArray(_) => QueueKind::VertexArray,
            GpuHandle::Texture(_) | GpuHandle::Framebuffer(_) => QueueKind::Texture,
            GpuHandle::Program(_) => QueueKind::Shader,
        }
    }
}

/// What one drain deleted, per queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainStats {
    pub buffers: usize,
    pub vertex_arrays: usize,
    pub textures: usize,
    pub shaders: usize,
    /// Queued handles that were no longer registered and were skipped
    pub stale: usize,
}

impl DrainStats {
    /// Handles actually deleted through the backend.
    pub fn deleted(&self) -> usize {
        self.buffers + self.vertex_arrays + self.textures + self.shaders
    }

    fn count(&mut self, kind: QueueKind) {
        match kind {
            QueueKind::Buffer => self.buffers += 1,
            QueueKind::VertexArray => self.vertex_arrays += 1,
            QueueKind::Texture => self.textures += 1,
            QueueKind::Shader => self.shaders += 1,
        }
    }
}

/// Registry of live handles plus the four deferred-deletion queues.
///
/// # Thread Safety
///
/// [`enqueue`](Self::enqueue) and [`register`](Self::register) may be called from any
/// thread. [`drain`](Self::drain) and [`delete_now`](Self::delete_now) call into the
/// backend and belong on the render thread.
///
/// A handle is passed to the backend's delete only while it is registered, and
/// deleting unregisters it. That is what makes deletion at-most-once even if a handle
/// is queued twice or queued after an explicit delete.
#[derive(Default)]
pub struct DeletionQueues {
    buffers: Mutex<Vec<GpuHandle>>,
    vertex_arrays: Mutex<Vec<GpuHandle>>,
    textures: Mutex<Vec<GpuHandle>>,
    shaders: Mutex<Vec<GpuHandle>>,
    live: Mutex<HashSet<GpuHandle>>,
}

impl DeletionQueues {
    pub fn new() -> Self {
        Self::default()
    }

    fn queue(&self, kind: QueueKind) -> &Mutex<Vec<GpuHandle>> {
        match kind {
            QueueKind::Buffer => &self.buffers,
            QueueKind::VertexArray => &self.vertex_arrays,
            QueueKind::Texture => &self.textures,
            QueueKind::Shader => &self.shaders,
        }
    }

    /// Start tracking a freshly created handle.
    pub fn register(&self, handle: GpuHandle) {
        if !self.live.lock().insert(handle) {
            tracing::warn!(%handle, "handle registered twice; the backend reused a live id");
        } else {
            tracing::trace!(%handle, "registered");
        }
    }

    pub fn is_live(&self, handle: GpuHandle) -> bool {
        self.live.lock().contains(&handle)
    }

    /// Number of registered handles not yet deleted.
    pub fn live_count(&self) -> usize {
        self.live.lock().len()
    }

    /// Queue `handle` for deletion on the next drain. Safe from any thread.
    pub fn enqueue(&self, handle: GpuHandle) {
        tracing::trace!(%handle, "queued for deletion");
        self.queue(QueueKind::of(handle)).lock().push(handle);
    }

    /// Handles waiting across all queues.
    pub fn pending(&self) -> usize {
        QueueKind::ALL.iter().map(|&k| self.pending_in(k)).sum()
    }

    pub fn pending_in(&self, kind: QueueKind) -> usize {
        self.queue(kind).lock().len()
    }

    /// Delete `handle` right away if it is still registered.
    ///
    /// Returns `false` (and calls nothing) for handles that were already deleted or
    /// never registered.
    pub fn delete_now(&self, backend: &dyn RenderBackend, handle: GpuHandle) -> bool {
        // The registry lock is released before the backend call.
        let was_live = self.live.lock().remove(&handle);
        if was_live {
            tracing::trace!(%handle, "deleted");
            backend.delete_handle(handle);
        } else {
            tracing::trace!(%handle, "skipping delete of stale handle");
        }
        was_live
    }

    /// Delete everything queued so far. Render thread only.
    ///
    /// Each queue is swapped out under its lock, so handles queued by other threads
    /// while the drain runs land in the fresh queue and are picked up next time.
    pub fn drain(&self, backend: &dyn RenderBackend) -> DrainStats {
        profile_function!();

        let mut stats = DrainStats::default();
        for kind in QueueKind::ALL {
            let batch = std::mem::take(&mut *self.queue(kind).lock());
            for handle in batch {
                if self.delete_now(backend, handle) {
                    stats.count(kind);
                } else {
                    stats.stale += 1;
                }
            }
        }

        if stats.deleted() > 0 || stats.stale > 0 {
            tracing::debug!(
                deleted = stats.deleted(),
                stale = stats.stale,
                "drained deletion queues"
            );
        }
        stats
    }
}

impl fmt::Debug for DeletionQueues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeletionQueues")
            .field("live", &self.live_count())
            .field("pending", &self.pending())
            .finish()
    }
}

/// Owns one GPU handle and guarantees it is deleted exactly once.
///
/// Dropping the resource queues the handle; [`dispose`](Self::dispose) deletes it on
/// the spot. Either way, later disposal attempts are no-ops.
pub struct GpuResource<H>
where
    H: Copy + Into<GpuHandle>,
{
    handle: H,
    disposed: AtomicBool,
    queues: Arc<DeletionQueues>,
}

impl<H> GpuResource<H>
where
    H: Copy + Into<GpuHandle>,
{
    /// Take ownership of `handle` and register it as live.
    pub fn new(handle: H, queues: Arc<DeletionQueues>) -> Self {
        queues.register(handle.into());
        Self {
            handle,
            disposed: AtomicBool::new(false),
            queues,
        }
    }

    pub fn handle(&self) -> H {
        self.handle
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Delete the handle immediately. Render thread only.
    pub fn dispose(&self, backend: &dyn RenderBackend) {
        if !self.disposed.swap(true, Ordering::AcqRel) {
            self.queues.delete_now(backend, self.handle.into());
        }
    }

    /// Queue the handle for the next drain. Safe from any thread.
    pub fn release(&self) {
        if !self.disposed.swap(true, Ordering::AcqRel) {
            self.queues.enqueue(self.handle.into());
        }
    }
}

impl<H> Drop for GpuResource<H>
where
    H: Copy + Into<GpuHandle>,
{
    fn drop(&mut self) {
        self.release();
    }
}

impl<H> fmt::Debug for GpuResource<H>
where
    H: Copy + Into<GpuHandle>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuResource")
            .field("handle", &self.handle.into())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
