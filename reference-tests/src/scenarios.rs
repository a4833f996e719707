//! The reference scenarios run by the binary and by `cargo test`.

use glam::Vec3;
use particle_kernel::{scatter_box, scatter_sphere, Particle, Scatter, SimulationConfig, SolverType};

use crate::{
    ActiveCountCheck, Clearance, ContactCheck, ExpectedResult, FreeFallCheck,
    PositionBoundsCheck, ReferenceTest, Scene,
};

const GRAVITY: f32 = 9.8;

/// `n.x * n.y * n.z` motionless particles on a lattice centered on `center`.
pub fn lattice(center: Vec3, n: [usize; 3], spacing: f32) -> Vec<Particle> {
    let half = Vec3::new(n[0] as f32 - 1.0, n[1] as f32 - 1.0, n[2] as f32 - 1.0) * 0.5;
    let mut particles = Vec::with_capacity(n[0] * n[1] * n[2]);
    for iy in 0..n[1] {
        for iz in 0..n[2] {
            for ix in 0..n[0] {
                let offset = (Vec3::new(ix as f32, iy as f32, iz as f32) - half) * spacing;
                particles.push(Particle::new(center + offset, Vec3::ZERO));
            }
        }
    }
    particles
}

/// Non-interacting particles fall from rest and must track the discrete
/// free-fall solution exactly.
pub fn free_fall() -> ReferenceTest {
    let initial_y = 2.0;
    ReferenceTest {
        name: "Free Fall".to_string(),
        config: SimulationConfig {
            solver: SolverType::NoInteraction,
            world_div: [8, 8, 8],
            max_particles: 1024,
            ..Default::default()
        },
        particles: lattice(Vec3::new(0.0, initial_y, 0.0), [4, 4, 4], 0.1),
        scene: Scene {
            gravity: Some(GRAVITY),
            ..Default::default()
        },
        dt: 1.0 / 60.0,
        timesteps: 60,
        expected: ExpectedResult {
            active_count: Some(ActiveCountCheck { expected: 64 }),
            position_bounds: Some(PositionBoundsCheck {
                min: [-0.2, -5.12, -0.2],
                max: [0.2, initial_y, 0.2],
            }),
            free_fall: Some(FreeFallCheck {
                gravity: GRAVITY,
                initial_y,
                tolerance: 1.0e-3,
            }),
            contact: None,
        },
    }
}

/// Two layers of impulse particles dropped a short distance onto a floor.
pub fn floor_contact() -> ReferenceTest {
    let particle_size = 0.08;
    let floor = 7;
    ReferenceTest {
        name: "Floor Contact".to_string(),
        config: SimulationConfig {
            solver: SolverType::Impulse,
            particle_size,
            decelerate: 0.98,
            max_particles: 1024,
            ..Default::default()
        },
        particles: lattice(Vec3::new(0.0, 0.22, 0.0), [8, 2, 8], 2.0 * particle_size),
        scene: Scene {
            gravity: Some(GRAVITY),
            planes: vec![(floor, Vec3::Y, Vec3::ZERO)],
            ..Default::default()
        },
        dt: 1.0 / 120.0,
        timesteps: 480,
        expected: ExpectedResult {
            active_count: Some(ActiveCountCheck { expected: 128 }),
            position_bounds: Some(PositionBoundsCheck {
                min: [-1.5, 0.0, -1.5],
                max: [1.5, 0.5, 1.5],
            }),
            free_fall: None,
            contact: Some(ContactCheck {
                owner: floor,
                min_hit_fraction: 0.4,
                clearance: Clearance::Plane {
                    normal: Vec3::Y,
                    point: Vec3::ZERO,
                },
                tolerance: 0.005,
            }),
        },
    }
}

/// Every particle outlives its configured lifetime and is compacted away.
pub fn lifetime_expiry() -> ReferenceTest {
    ReferenceTest {
        name: "Lifetime Expiry".to_string(),
        config: SimulationConfig {
            solver: SolverType::NoInteraction,
            lifetime: 1.0,
            max_particles: 256,
            ..Default::default()
        },
        particles: scatter_sphere(
            Vec3::ZERO,
            1.0,
            Scatter {
                velocity_jitter: 0.5,
                ..Scatter::new(200, 1)
            },
        ),
        scene: Scene::default(),
        dt: 1.0 / 60.0,
        timesteps: 90,
        expected: ExpectedResult {
            active_count: Some(ActiveCountCheck { expected: 0 }),
            ..Default::default()
        },
    }
}

/// Particles that leave the world expire after the out-of-bounds grace period.
pub fn out_of_bounds_expiry() -> ReferenceTest {
    ReferenceTest {
        name: "Out-of-Bounds Expiry".to_string(),
        config: SimulationConfig {
            solver: SolverType::NoInteraction,
            world_extent: [1.0, 1.0, 1.0],
            world_div: [8, 8, 8],
            max_particles: 256,
            ..Default::default()
        },
        particles: scatter_sphere(
            Vec3::ZERO,
            0.1,
            Scatter {
                velocity: Vec3::new(5.0, 0.0, 0.0),
                ..Scatter::new(100, 2)
            },
        ),
        scene: Scene::default(),
        dt: 0.1,
        timesteps: 220,
        expected: ExpectedResult {
            active_count: Some(ActiveCountCheck { expected: 0 }),
            ..Default::default()
        },
    }
}

fn sph_blob(name: &str, solver: SolverType) -> ReferenceTest {
    let h = 0.05_f32;
    let spacing = h / 1.3;
    let reach = 2.5 * spacing + 2.0 * h;
    ReferenceTest {
        name: name.to_string(),
        config: SimulationConfig {
            solver,
            particle_size: h,
            sph_rest_density: 1000.0,
            sph_particle_mass: Some(1000.0 * spacing * spacing * spacing),
            sph_viscosity: 0.5,
            world_extent: [1.0, 1.0, 1.0],
            world_div: [16, 16, 16],
            max_particles: 512,
            ..Default::default()
        },
        particles: lattice(Vec3::ZERO, [6, 6, 6], spacing),
        scene: Scene::default(),
        dt: 1.0 / 600.0,
        timesteps: 300,
        expected: ExpectedResult {
            active_count: Some(ActiveCountCheck { expected: 216 }),
            position_bounds: Some(PositionBoundsCheck {
                min: [-reach; 3],
                max: [reach; 3],
            }),
            ..Default::default()
        },
    }
}

/// A weightless SPH blob at rest density stays together.
pub fn sph_blob_stability() -> ReferenceTest {
    sph_blob("SPH Blob Stability", SolverType::Sph)
}

/// Same blob with the estimated neighbor density.
pub fn sph_estimate_blob_stability() -> ReferenceTest {
    sph_blob("SPH-Estimate Blob Stability", SolverType::SphEstimate)
}

/// A thin sheet of particles flies into a sphere and bounces off it.
pub fn sphere_obstacle() -> ReferenceTest {
    let obstacle = 3;
    let radius = 0.5;
    ReferenceTest {
        name: "Sphere Obstacle".to_string(),
        config: SimulationConfig {
            solver: SolverType::NoInteraction,
            max_particles: 256,
            ..Default::default()
        },
        particles: scatter_box(
            Vec3::new(-1.5, 0.0, 0.0),
            Vec3::new(0.02, 0.2, 0.2),
            Scatter {
                velocity: Vec3::new(2.0, 0.0, 0.0),
                ..Scatter::new(100, 3)
            },
        ),
        scene: Scene {
            spheres: vec![(obstacle, Vec3::ZERO, radius)],
            ..Default::default()
        },
        dt: 1.0 / 120.0,
        timesteps: 120,
        expected: ExpectedResult {
            active_count: Some(ActiveCountCheck { expected: 100 }),
            contact: Some(ContactCheck {
                owner: obstacle,
                min_hit_fraction: 0.25,
                clearance: Clearance::Sphere {
                    center: Vec3::ZERO,
                    radius,
                },
                tolerance: 0.0,
            }),
            ..Default::default()
        },
    }
}

/// Get all reference tests
pub fn all() -> Vec<ReferenceTest> {
    vec![
        free_fall(),
        floor_contact(),
        lifetime_expiry(),
        out_of_bounds_expiry(),
        sph_blob_stability(),
        sph_estimate_blob_stability(),
        sphere_obstacle(),
    ]
}
