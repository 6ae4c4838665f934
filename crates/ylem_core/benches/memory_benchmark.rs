//! # Object Memory Benchmark
//!
//! ARCHITECT'S REQUIREMENTS:
//! - O(1) build when the newest storage has room
//! - O(1) destroy by handle
//! - Slot recycling must not degrade with churn
//!
//! Run with: `cargo bench --package ylem_core`

// Benchmarks don't need docs and may have intentionally unused code
#![allow(missing_docs)]
#![allow(dead_code)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ylem_core::{Constructible, Datatype, Handle, MemoryAllocator, MemorySystem};

/// Instances per storage, matching the engine's default for objects.
const DATA_SIZE: u32 = 256;

struct Object {
    handle: Handle,
    position: [f32; 4],
}

impl Object {
    fn at(i: u32) -> Self {
        let f = i as f32;
        Self {
            handle: Handle::default(),
            position: [f, f * 0.5, f * 0.25, 1.0],
        }
    }
}

impl Constructible for Object {
    fn handle(&self) -> &Handle {
        &self.handle
    }

    fn handle_mut(&mut self) -> &mut Handle {
        &mut self.handle
    }
}

/// Benchmark: Build N objects from an empty allocator.
fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_objects");

    for count in [1_000u32, 10_000, 100_000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                let mut objects = MemoryAllocator::new(Datatype::Object.into(), DATA_SIZE);
                for i in 0..count {
                    black_box(objects.build_in(Object::at(i)));
                }
                objects.number_of_instances()
            });
        });
    }

    group.finish();
}

/// Benchmark: Destroy and rebuild one object in a full allocator.
fn bench_churn(c: &mut Criterion) {
    let mut objects = MemoryAllocator::new(Datatype::Object.into(), DATA_SIZE);
    let mut handles: Vec<Handle> = (0..10 * DATA_SIZE)
        .filter_map(|i| objects.build_in(Object::at(i)).map(|object| *object.handle()))
        .collect();
    let mut cursor = 0;

    c.bench_function("destroy_rebuild_churn", |b| {
        b.iter(|| {
            let victim = handles[cursor];
            let _ = objects.destroy(victim);
            if let Some(object) = objects.build_in(Object::at(cursor as u32)) {
                handles[cursor] = *object.handle();
            }
            cursor = (cursor + 1) % handles.len();
        });
    });
}

/// Benchmark: Lookup by handle.
fn bench_get(c: &mut Criterion) {
    let mut objects = MemoryAllocator::new(Datatype::Object.into(), DATA_SIZE);
    let handles: Vec<Handle> = (0..10 * DATA_SIZE)
        .filter_map(|i| objects.build_in(Object::at(i)).map(|object| *object.handle()))
        .collect();

    c.bench_function("get_by_handle", |b| {
        b.iter(|| {
            let mut sum = 0.0f32;
            for handle in &handles {
                if let Some(object) = objects.get(*handle) {
                    sum += object.position[0];
                }
            }
            black_box(sum)
        });
    });
}

/// Benchmark: Destroy through the registry's type-erased path.
fn bench_registry_destroy(c: &mut Criterion) {
    c.bench_function("registry_build_destroy", |b| {
        let mut memory = MemorySystem::new(Datatype::Universe);
        b.iter(|| {
            let allocator = memory
                .get_or_create_storage_allocator::<Object>(Datatype::Object.into())
                .ok();
            let handle = allocator
                .and_then(|objects| objects.build_in(Object::at(1)))
                .map(|object| *object.handle());
            if let Some(mut handle) = handle {
                black_box(memory.destroy(&mut handle));
            }
        });
    });
}

criterion_group!(
    benches,
    bench_build,
    bench_churn,
    bench_get,
    bench_registry_destroy
);
criterion_main!(benches);
