//! Handle ownership across threads: explicit disposal racing implicit release, and
//! deferred queues filled while the render thread drains them.

use std::sync::Arc;
use std::thread;

use vellum_backend::{BufferHandle, RecordingBackend, RenderBackend, TextureHandle};
use vellum_render::{GpuResource, GraphicsContext, GraphicsContextDescriptor};

fn setup() -> (Arc<RecordingBackend>, Arc<GraphicsContext>) {
    let backend = Arc::new(RecordingBackend::new());
    let ctx = GraphicsContext::new(backend.clone(), GraphicsContextDescriptor::new());
    (backend, ctx)
}

#[test]
fn dispose_racing_release_deletes_once() {
    let (backend, ctx) = setup();

    let resources: Vec<Arc<GpuResource<BufferHandle>>> = (0..64)
        .map(|_| Arc::new(ctx.track(ctx.backend().create_buffer())))
        .collect();
    let handles: Vec<BufferHandle> = resources.iter().map(|r| r.handle()).collect();

    thread::scope(|scope| {
        for resource in &resources {
            let releasing = resource.clone();
            scope.spawn(move || releasing.release());
            let ctx = &ctx;
            let disposing = resource.clone();
            scope.spawn(move || disposing.dispose(ctx.backend()));
        }
    });
    drop(resources);
    ctx.drain_deletions();
    ctx.drain_deletions();

    for handle in handles {
        assert_eq!(backend.delete_count(handle), 1, "{handle:?}");
    }
    assert_eq!(ctx.deletion_queues().live_count(), 0);
}

#[test]
fn drain_misses_nothing_enqueued_concurrently() {
    let (backend, ctx) = setup();
    const PRODUCERS: usize = 4;
    const PER_PRODUCER: usize = 250;

    let handles: Vec<Vec<TextureHandle>> = (0..PRODUCERS)
        .map(|_| {
            (0..PER_PRODUCER)
                .map(|_| ctx.backend().create_texture())
                .collect()
        })
        .collect();
    let resources: Vec<Vec<GpuResource<TextureHandle>>> = handles
        .iter()
        .map(|batch| batch.iter().map(|&h| ctx.track(h)).collect())
        .collect();

    let mut deleted = 0;
    thread::scope(|scope| {
        let workers: Vec<_> = resources
            .into_iter()
            .map(|batch| scope.spawn(move || drop(batch)))
            .collect();

        while workers.iter().any(|w| !w.is_finished()) {
            deleted += ctx.drain_deletions().textures;
            thread::yield_now();
        }
    });
    deleted += ctx.drain_deletions().textures;

    assert_eq!(deleted, PRODUCERS * PER_PRODUCER);
    assert_eq!(ctx.deletion_queues().pending(), 0);
    for handle in handles.into_iter().flatten() {
        assert_eq!(backend.delete_count(handle), 1);
        assert!(!backend.is_live(handle));
    }
}

#[test]
fn stale_handles_are_ignored() {
    let (backend, ctx) = setup();
    let texture = ctx.backend().create_texture();
    let resource = ctx.track(texture);

    resource.dispose(ctx.backend());
    // Someone queues the same raw handle again after it was deleted.
    ctx.deletion_queues().enqueue(texture.into());
    let stats = ctx.drain_deletions();

    assert_eq!(stats.stale, 1);
    assert_eq!(stats.textures, 0);
    assert_eq!(backend.delete_count(texture), 1);
}

#[test]
fn drain_counts_each_kind() {
    let (_backend, ctx) = setup();
    let backend: &dyn RenderBackend = ctx.backend();

    drop(ctx.track(backend.create_buffer()));
    drop(ctx.track(backend.create_buffer()));
    drop(ctx.track(backend.create_vertex_array()));
    let texture = backend.create_texture();
    drop(ctx.track(backend.create_framebuffer(texture)));
    drop(ctx.track(texture));

    let stats = ctx.drain_deletions();
    assert_eq!(stats.buffers, 2);
    assert_eq!(stats.vertex_arrays, 1);
    // Framebuffers share the texture queue.
    assert_eq!(stats.textures, 2);
    assert_eq!(stats.shaders, 0);
    assert_eq!(stats.deleted(), 5);
}
