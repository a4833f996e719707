//! Reference scenarios as cargo tests.

use particle_kernel::{Particle, SimulationConfig};

use crate::{scenarios, ActiveCountCheck, ExpectedResult, ReferenceTest, Scene};

fn run(test: ReferenceTest) {
    let result = test.run().expect("Test execution failed");
    result.print_summary();
    assert!(result.passed, "{} failed", result.name);
}

#[test]
fn test_free_fall() {
    run(scenarios::free_fall());
}

#[test]
fn test_floor_contact() {
    run(scenarios::floor_contact());
}

#[test]
fn test_lifetime_expiry() {
    run(scenarios::lifetime_expiry());
}

#[test]
fn test_out_of_bounds_expiry() {
    run(scenarios::out_of_bounds_expiry());
}

#[test]
fn test_sph_blob_stability() {
    run(scenarios::sph_blob_stability());
}

#[test]
fn test_sph_estimate_blob_stability() {
    run(scenarios::sph_estimate_blob_stability());
}

#[test]
fn test_sphere_obstacle() {
    run(scenarios::sphere_obstacle());
}

#[test]
fn test_lattice_is_centered() {
    let particles = scenarios::lattice(glam::Vec3::ONE, [2, 3, 4], 0.5);
    assert_eq!(particles.len(), 24);
    let mean = particles.iter().map(|p| p.position()).sum::<glam::Vec3>() / 24.0;
    assert!((mean - glam::Vec3::ONE).length() < 1e-6);
}

#[test]
fn test_failing_check_is_reported() {
    let test = ReferenceTest {
        name: "Wrong Count".to_string(),
        config: SimulationConfig::default(),
        particles: vec![Particle::default(); 4],
        scene: Scene::default(),
        dt: 1.0 / 60.0,
        timesteps: 1,
        expected: ExpectedResult {
            active_count: Some(ActiveCountCheck { expected: 5 }),
            ..Default::default()
        },
    };
    let result = test.run().expect("Test execution failed");
    assert!(!result.passed);
    assert_eq!(result.active, 4);
}

#[test]
fn test_overfull_scenario_is_an_error() {
    let test = ReferenceTest {
        name: "Overfull".to_string(),
        config: SimulationConfig {
            max_particles: 128,
            ..Default::default()
        },
        particles: vec![Particle::default(); 200],
        scene: Scene::default(),
        dt: 1.0 / 60.0,
        timesteps: 1,
        expected: ExpectedResult::default(),
    };
    assert!(test.run().is_err());
}
