//! SPH with an otherwise default configuration.
//!
//! A 3x3x3 cluster packed at half the rest spacing is well above rest
//! density, so one tick must push every outer particle away from the center.

use glam::Vec3;
use particle_kernel::config::REST_SPACING_RATIO;
use particle_kernel::{Particle, SimulationConfig, SolverType, World};

// Middle of one grid cell at the default grid, so the cluster shares a cell.
const CENTER: Vec3 = Vec3::new(0.16, 0.16, 0.16);

fn compressed_cluster(spacing: f32) -> Vec<Particle> {
    let mut particles = Vec::new();
    for iz in -1..=1 {
        for iy in -1..=1 {
            for ix in -1..=1 {
                let offset = Vec3::new(ix as f32, iy as f32, iz as f32) * spacing;
                particles.push(Particle::new(CENTER + offset, Vec3::ZERO));
            }
        }
    }
    particles
}

fn assert_cluster_expands(solver: SolverType) {
    let config = SimulationConfig {
        solver,
        ..Default::default()
    };
    let spacing = 0.5 * config.particle_size / REST_SPACING_RATIO;
    let rest_density = config.sph_rest_density;
    let mut world = World::new(config);
    world.add_particles(&compressed_cluster(spacing));

    world.update(1.0 / 60.0);
    assert_eq!(world.particle_count(), 27);

    let mut outward = 0;
    for p in world.particles() {
        let offset = p.position() - CENTER;
        assert!(p.velocity().is_finite(), "{solver:?}: non-finite velocity");
        if offset.length() < 1.0e-3 {
            assert!(
                p.params.density > rest_density,
                "{solver:?}: center density {} should exceed rest density {rest_density}",
                p.params.density
            );
            continue;
        }
        assert!(
            p.velocity().dot(offset) > 0.0,
            "{solver:?}: particle at {offset} moves {} instead of outward",
            p.velocity()
        );
        outward += 1;
    }
    assert_eq!(outward, 26);
}

#[test]
fn sph_pushes_compressed_cluster_apart() {
    assert_cluster_expands(SolverType::Sph);
}

#[test]
fn sph_estimate_pushes_compressed_cluster_apart() {
    assert_cluster_expands(SolverType::SphEstimate);
}

#[test]
fn no_interaction_leaves_cluster_at_rest() {
    let config = SimulationConfig {
        solver: SolverType::NoInteraction,
        ..Default::default()
    };
    let spacing = 0.5 * config.particle_size / REST_SPACING_RATIO;
    let mut world = World::new(config);
    world.add_particles(&compressed_cluster(spacing));
    world.update(1.0 / 60.0);
    assert!(world.particles().iter().all(|p| p.velocity() == Vec3::ZERO));
}
