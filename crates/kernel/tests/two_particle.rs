//! Two-particle symmetry test for the impulse solver.
//!
//! Verifies that the contact response between two overlapping particles is
//! equal and opposite and that it conserves momentum over several ticks.

use glam::Vec3;
use particle_kernel::{Particle, SimulationConfig, SimulationKernel, SolverType, World};

fn impulse_world() -> World {
    World::new(SimulationConfig {
        solver: SolverType::Impulse,
        world_extent: [1.0, 1.0, 1.0],
        world_div: [8, 8, 8],
        max_particles: 128,
        particle_size: 0.08,
        ..Default::default()
    })
}

fn momentum(particles: &[Particle]) -> Vec3 {
    particles.iter().map(Particle::velocity).sum()
}

#[test]
fn responses_equal_and_opposite() {
    let mut world = impulse_world();
    // Separated by one radius, so they overlap by one radius.
    world.add_particles(&[
        Particle::new(Vec3::new(-0.04, 0.0, 0.0), Vec3::ZERO),
        Particle::new(Vec3::new(0.04, 0.0, 0.0), Vec3::ZERO),
    ]);
    world.step(1.0 / 600.0);

    let p = world.particles();
    assert_eq!(p.len(), 2);
    let (left, right) = if p[0].position[0] < p[1].position[0] {
        (p[0], p[1])
    } else {
        (p[1], p[0])
    };
    let vl = left.velocity();
    let vr = right.velocity();

    assert!(vl.x < 0.0, "left particle should be pushed left, got {vl:?}");
    assert!(vr.x > 0.0, "right particle should be pushed right, got {vr:?}");
    let tol = 1.0e-6 * vl.x.abs().max(1.0);
    assert!((vl.x + vr.x).abs() < tol, "vx not equal and opposite: {} vs {}", vl.x, vr.x);
    assert!(vl.y.abs() < tol && vl.z.abs() < tol, "response should be along x, got {vl:?}");
}

#[test]
fn separated_particles_do_not_interact() {
    let mut world = impulse_world();
    world.add_particles(&[
        Particle::new(Vec3::new(-0.1, 0.0, 0.0), Vec3::ZERO),
        Particle::new(Vec3::new(0.1, 0.0, 0.0), Vec3::ZERO),
    ]);
    world.step(1.0 / 600.0);
    for p in world.particles() {
        assert_eq!(p.velocity(), Vec3::ZERO, "particles beyond one diameter must not interact");
    }
}

#[test]
fn momentum_conserved() {
    let mut world = impulse_world();
    world.add_particles(&[
        Particle::new(Vec3::new(-0.06, 0.0, 0.0), Vec3::new(1.0, 0.2, 0.0)),
        Particle::new(Vec3::new(0.06, 0.01, 0.0), Vec3::new(-0.5, 0.0, 0.1)),
    ]);
    let initial = momentum(world.particles());

    let dt = 1.0 / 600.0;
    let mut touched = false;
    for _ in 0..40 {
        world.step(dt);
        let p = world.particles();
        touched |= (p[0].position() - p[1].position()).length() < 0.16;
    }
    assert!(touched, "particles never came into contact");

    let fin = momentum(world.particles());
    assert!(
        (fin - initial).length() < 1.0e-4,
        "momentum drifted: initial {initial:?}, final {fin:?}"
    );
}
