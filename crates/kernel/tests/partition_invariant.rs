//! Property tests for the sort and compaction phase.
//!
//! For random particle sets, after one update:
//! - the cell ranges exactly partition `[0, particle_count)`,
//! - every particle's stored hash equals the index of the cell it sits in,
//! - hashes are non-decreasing over the live prefix,
//! - only live particles remain in the live prefix.

use glam::Vec3;
use particle_kernel::{CellHash, Particle, SimulationConfig, SolverType, World};
use proptest::prelude::*;

const DT: f32 = 0.01;

fn particle_strategy() -> impl Strategy<Value = (Particle, f32)> {
    (
        (-1.5f32..1.5, -1.5f32..1.5, -1.5f32..1.5),
        (-1.0f32..1.0, -1.0f32..1.0, -1.0f32..1.0),
        prop_oneof![Just(0.0f32), 0.5f32..5.0],
    )
        .prop_map(|(p, v, lifetime)| {
            (Particle::new(Vec3::new(p.0, p.1, p.2), Vec3::new(v.0, v.1, v.2)), lifetime)
        })
}

fn world(solver: SolverType) -> World {
    World::new(SimulationConfig {
        solver,
        world_extent: [1.0, 1.0, 1.0],
        world_div: [8, 4, 16],
        max_particles: 512,
        particle_size: 0.02,
        cells_per_task: 3,
        particles_per_task: 16,
        ..Default::default()
    })
}

fn populate(world: &mut World, input: &[(Particle, f32)]) {
    let particles: Vec<Particle> = input.iter().map(|(p, _)| *p).collect();
    world.add_particles(&particles);
    for (p, (_, lifetime)) in world.particles_mut().iter_mut().zip(input) {
        p.params.lifetime = *lifetime;
    }
}

fn check_partition(world: &World) -> Result<(), TestCaseError> {
    let particles = world.particles();
    let mut covered = vec![false; particles.len()];
    for (index, cell) in world.cells().iter().enumerate() {
        for i in cell.range() {
            prop_assert!(i < particles.len(), "cell {index} reaches past the live prefix");
            prop_assert!(!covered[i], "particle {i} is in two cells");
            covered[i] = true;
            prop_assert_eq!(particles[i].cell_hash(), CellHash::Cell(index as u32));
        }
    }
    prop_assert!(covered.iter().all(|&c| c), "some live particle is in no cell");

    for pair in particles.windows(2) {
        prop_assert!(pair[0].params.hash <= pair[1].params.hash);
    }
    prop_assert!(particles.iter().all(|p| p.is_alive()));
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn cells_partition_live_particles(input in prop::collection::vec(particle_strategy(), 0..300)) {
        let mut world = world(SolverType::NoInteraction);
        populate(&mut world, &input);
        let live = input.iter().filter(|(_, l)| *l > DT).count();

        world.update(DT);
        prop_assert_eq!(world.particle_count(), live);
        check_partition(&world)?;
    }

    #[test]
    fn partition_holds_for_interacting_solvers(
        input in prop::collection::vec(particle_strategy(), 1..200),
        solver in prop_oneof![
            Just(SolverType::Impulse),
            Just(SolverType::Sph),
            Just(SolverType::SphEstimate),
        ],
    ) {
        let mut world = world(solver);
        populate(&mut world, &input);
        world.update(DT);
        check_partition(&world)?;
        prop_assert!(world.particles().iter().all(|p| p.position().is_finite()));
    }
}
