//! Benchmarks for SlotMap

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use vellum_core::alloc::{SlotId, SlotMap};

fn bench_slot_map_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("slot_map_insert");

    for size in [10, 100, 1000, 10000] {
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let mut map = SlotMap::new();
                for i in 0..size {
                    map.insert(black_box(i as f32));
                }
                map
            });
        });
    }

    group.finish();
}

fn bench_slot_map_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("slot_map_get");

    for size in [100, 1000, 10000] {
        group.throughput(Throughput::Elements(size as u64));

        let mut map = SlotMap::new();
        let ids: Vec<SlotId> = (0..size).map(|i| map.insert(i as f32)).collect();

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let mut sum = 0.0;
                for &id in &ids {
                    sum += map.get(black_box(id)).copied().unwrap_or_default();
                }
                sum
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_slot_map_insert, bench_slot_map_get);
criterion_main!(benches);
