//! Sort and transpose costs in isolation.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use glam::Vec3;
use particle_kernel::soa::{self, SoaBlock};
use particle_kernel::sort;
use particle_kernel::{scatter_box, Particle, Scatter, SimulationConfig, SpatialGrid};

const COUNT: usize = 65_536;

fn particles() -> Vec<Particle> {
    let mut particles = scatter_box(Vec3::ZERO, Vec3::splat(4.0), Scatter::new(COUNT, 11));
    for p in &mut particles {
        p.params.lifetime = 100.0;
    }
    particles
}

fn bench_hash_and_sort(c: &mut Criterion) {
    let config = SimulationConfig::default();
    let grid = SpatialGrid::new(&config);
    let source = particles();

    c.bench_function("hash_sort_64k", |b| {
        b.iter_batched_ref(
            || source.clone(),
            |particles| {
                sort::assign_hashes(particles, &grid, 0.0, config.particles_per_task);
                sort::sort_by_hash(particles);
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_transpose(c: &mut Criterion) {
    let mut particles = particles();
    let mut blocks = vec![SoaBlock::default(); soa::soa_blocks(COUNT)];

    c.bench_function("to_soa_64k", |b| {
        b.iter(|| soa::to_soa(black_box(&particles), &mut blocks))
    });
    c.bench_function("from_soa_64k", |b| {
        b.iter(|| soa::from_soa(black_box(&blocks), &mut particles))
    });
}

criterion_group!(benches, bench_hash_and_sort, bench_transpose);
criterion_main!(benches);
