//! Tick throughput per solver.
//!
//! Run with: cargo bench -p particle-kernel --bench update

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use glam::Vec3;
use particle_kernel::{scatter_box, Scatter, SimulationConfig, SolverType, World};

const DT: f32 = 1.0 / 600.0;

fn block_world(solver: SolverType, count: usize) -> World {
    let mut world = World::new(SimulationConfig {
        solver,
        max_particles: count as u32,
        world_extent: [2.56, 2.56, 2.56],
        world_div: [32, 32, 32],
        particle_size: 0.04,
        ..Default::default()
    });
    let particles = scatter_box(Vec3::ZERO, Vec3::splat(1.5), Scatter::new(count, 7));
    world.add_particles(&particles);
    world
}

fn bench_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("update");
    group.sample_size(20);

    for &count in &[16_384usize, 65_536] {
        group.throughput(Throughput::Elements(count as u64));
        for solver in [
            SolverType::NoInteraction,
            SolverType::Impulse,
            SolverType::Sph,
            SolverType::SphEstimate,
        ] {
            let mut world = block_world(solver, count);
            group.bench_with_input(BenchmarkId::new(format!("{solver:?}"), count), &count, |b, _| {
                b.iter(|| {
                    world.add_directional_force(Vec3::NEG_Y, 9.8);
                    world.add_plane_collider(0, Vec3::Y, Vec3::new(0.0, -2.0, 0.0));
                    world.update(DT);
                })
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_update);
criterion_main!(benches);
