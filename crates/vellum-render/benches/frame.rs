//! Benchmarks for per-draw matrix composition and the deferred-deletion drain

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use glam::Vec2;
use vellum_backend::{NullBackend, RenderBackend};
use vellum_core::geometry::Size;
use vellum_render::{Camera, DeletionQueues, Projection, Transform2D, compose_mvp};

fn bench_compose_mvp(c: &mut Criterion) {
    let mut group = c.benchmark_group("compose_mvp");

    let mut projection = Projection::new(Size::new(1920, 1080), Vec2::ONE);
    projection.set_ortho_size(20.0);
    let camera = Camera::new(Vec2::new(12.0, -4.0)).with_pivot(Vec2::new(960.0, 540.0));

    for count in [100, 1000, 10000] {
        group.throughput(Throughput::Elements(count as u64));

        let transforms: Vec<Transform2D> = (0..count)
            .map(|i| {
                Transform2D::from_position(Vec2::new(i as f32, (i * 7 % 300) as f32))
                    .with_pivot(Vec2::splat(0.5))
                    .with_rotation(i as f32 * 0.01)
            })
            .collect();

        group.bench_with_input(BenchmarkId::from_parameter(count), &transforms, |b, transforms| {
            b.iter(|| {
                let projection = projection.matrix();
                let view = camera.view_matrix();
                for transform in transforms {
                    black_box(compose_mvp(projection, view, transform.local_matrix()));
                }
            });
        });
    }

    group.finish();
}

fn bench_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("deletion_drain");
    let backend = NullBackend::new();

    for count in [100, 1000, 10000] {
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter_batched(
                || {
                    let queues = DeletionQueues::new();
                    for _ in 0..count {
                        let handle = backend.create_buffer().into();
                        queues.register(handle);
                        queues.enqueue(handle);
                    }
                    queues
                },
                |queues| black_box(queues.drain(&backend)),
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_compose_mvp, bench_drain);
criterion_main!(benches);
