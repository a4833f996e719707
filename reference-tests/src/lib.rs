//! Scenario validation for the particle kernel.
//!
//! Each [`ReferenceTest`] builds a [`World`], re-applies its scene (forces
//! and colliders only last one tick) before every step, and evaluates a set
//! of optional checks on the final state.

pub mod analytical;
pub mod scenarios;

#[cfg(test)]
mod tests;

use glam::Vec3;
use particle_kernel::{Particle, SimulationConfig, SimulationKernel, World};

use crate::analytical::FreeFall;

/// Forces and colliders re-added before every tick.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    /// Downward acceleration, if any.
    pub gravity: Option<f32>,
    /// Plane colliders as (owner, normal, point on surface).
    pub planes: Vec<(i32, Vec3, Vec3)>,
    /// Sphere colliders as (owner, center, radius).
    pub spheres: Vec<(i32, Vec3, f32)>,
}

impl Scene {
    fn apply(&self, world: &mut World) {
        if let Some(g) = self.gravity {
            world.add_directional_force(Vec3::NEG_Y, g);
        }
        for &(owner, normal, point) in &self.planes {
            world.add_plane_collider(owner, normal, point);
        }
        for &(owner, center, radius) in &self.spheres {
            world.add_sphere_collider(owner, center, radius);
        }
    }
}

/// Expected result criteria for a reference test
#[derive(Debug, Clone, Default)]
pub struct ExpectedResult {
    /// Live particle count after the last tick
    pub active_count: Option<ActiveCountCheck>,
    /// Particle position bounds validation
    pub position_bounds: Option<PositionBoundsCheck>,
    /// Mean state against the analytical free-fall solution
    pub free_fall: Option<FreeFallCheck>,
    /// Collider contact and clearance
    pub contact: Option<ContactCheck>,
}

/// Check the number of live particles
#[derive(Debug, Clone)]
pub struct ActiveCountCheck {
    /// Expected count
    pub expected: usize,
}

/// Check that particles remain within specified bounds
#[derive(Debug, Clone)]
pub struct PositionBoundsCheck {
    /// Minimum allowed position [x, y, z]
    pub min: [f32; 3],
    /// Maximum allowed position [x, y, z]
    pub max: [f32; 3],
}

/// Compare mean vertical velocity and height with the closed form
#[derive(Debug, Clone)]
pub struct FreeFallCheck {
    /// Gravitational acceleration (m/s^2)
    pub gravity: f32,
    /// Mean starting height (m)
    pub initial_y: f32,
    /// Absolute tolerance on both velocity and height
    pub tolerance: f32,
}

/// Surface a [`ContactCheck`] keeps particle centers out of.
#[derive(Debug, Clone, Copy)]
pub enum Clearance {
    /// Half-space below a plane.
    Plane {
        /// Surface normal, pointing out of the solid
        normal: Vec3,
        /// Any point on the surface
        point: Vec3,
    },
    /// Solid sphere.
    Sphere {
        /// Sphere center
        center: Vec3,
        /// Sphere radius (m)
        radius: f32,
    },
}

impl Clearance {
    /// How far `p` lies inside the solid, zero when outside.
    fn depth(&self, p: Vec3) -> f32 {
        match *self {
            Clearance::Plane { normal, point } => {
                (-(p - point).dot(normal.normalize_or_zero())).max(0.0)
            }
            Clearance::Sphere { center, radius } => (radius - p.distance(center)).max(0.0),
        }
    }
}

/// Check that a collider reported hits and never let a particle center in
#[derive(Debug, Clone)]
pub struct ContactCheck {
    /// Collider owner id expected in the hit field
    pub owner: i32,
    /// Minimum fraction of particles hitting the collider on the busiest tick
    pub min_hit_fraction: f32,
    /// Solid the particle centers must stay out of
    pub clearance: Clearance,
    /// Allowed penetration of a center into the solid (m)
    pub tolerance: f32,
}

/// What a [`ContactCheck`] saw over the whole run.
#[derive(Debug, Clone, Copy, Default)]
struct ContactTrace {
    peak_hit_fraction: f32,
    deepest: f32,
}

impl ContactTrace {
    fn observe(&mut self, particles: &[Particle], check: &ContactCheck) {
        if particles.is_empty() {
            return;
        }
        let hits = particles.iter().filter(|p| p.params.hit == check.owner).count();
        self.peak_hit_fraction = self.peak_hit_fraction.max(hits as f32 / particles.len() as f32);
        for p in particles {
            self.deepest = self.deepest.max(check.clearance.depth(p.position()));
        }
    }
}

/// Result of running a reference test
#[derive(Debug)]
pub struct TestResult {
    /// Test name
    pub name: String,
    /// Whether test passed
    pub passed: bool,
    /// Individual check results
    pub checks: Vec<CheckResult>,
    /// Live particles after the last tick
    pub active: usize,
    /// Number of timesteps executed
    pub timesteps: usize,
    /// Simulated time (seconds)
    pub sim_time: f64,
}

/// Result of an individual validation check
#[derive(Debug)]
pub struct CheckResult {
    /// Check name
    pub name: String,
    /// Whether check passed
    pub passed: bool,
    /// Detail, failure reason or measured values
    pub message: Option<String>,
}

impl CheckResult {
    fn new(name: &str, passed: bool, message: String) -> Self {
        Self {
            name: name.to_string(),
            passed,
            message: Some(message),
        }
    }
}

/// A reference test case
#[derive(Debug, Clone)]
pub struct ReferenceTest {
    /// Test name
    pub name: String,
    /// World configuration
    pub config: SimulationConfig,
    /// Initial particles
    pub particles: Vec<Particle>,
    /// Per-tick forces and colliders
    pub scene: Scene,
    /// Fixed timestep (s)
    pub dt: f32,
    /// Number of timesteps to run
    pub timesteps: usize,
    /// Expected results to validate
    pub expected: ExpectedResult,
}

impl ReferenceTest {
    /// Run the reference test and return results
    pub fn run(&self) -> Result<TestResult, String> {
        tracing::info!("Running reference test: {}", self.name);

        if self.particles.is_empty() {
            return Err("scenario has no particles".to_string());
        }
        let mut world = World::new(self.config.clone());
        let accepted = world.add_particles(&self.particles);
        if accepted != self.particles.len() {
            return Err(format!(
                "world accepted {} of {} particles",
                accepted,
                self.particles.len()
            ));
        }
        tracing::info!(
            "Initialized: {} particles, solver {:?}",
            accepted,
            world.config().solver,
        );

        let mut trace = ContactTrace::default();
        let mut sim_time = 0.0_f64;
        for step in 0..self.timesteps {
            self.scene.apply(&mut world);
            SimulationKernel::step(&mut world, self.dt);
            sim_time += self.dt as f64;

            if let Some(ref contact) = self.expected.contact {
                trace.observe(SimulationKernel::particles(&world), contact);
            }
            if (step + 1) % (self.timesteps / 10).max(1) == 0 {
                tracing::debug!(
                    "step {}/{}: {} active",
                    step + 1,
                    self.timesteps,
                    world.particle_count()
                );
            }
        }
        tracing::info!("Simulation complete: {} steps, {:.3}s simulated", self.timesteps, sim_time);

        let particles = SimulationKernel::particles(&world);
        let mut checks = Vec::new();

        if let Some(ref check) = self.expected.active_count {
            checks.push(validate_active_count(particles.len(), check));
        }
        if let Some(ref bounds) = self.expected.position_bounds {
            checks.push(validate_position_bounds(particles, bounds));
        }
        if let Some(ref check) = self.expected.free_fall {
            checks.push(validate_free_fall(particles, check, self.dt, self.timesteps));
        }
        if let Some(ref check) = self.expected.contact {
            checks.push(validate_contact(&trace, check));
        }

        Ok(TestResult {
            name: self.name.clone(),
            passed: checks.iter().all(|c| c.passed),
            checks,
            active: particles.len(),
            timesteps: self.timesteps,
            sim_time,
        })
    }
}

fn validate_active_count(active: usize, check: &ActiveCountCheck) -> CheckResult {
    CheckResult::new(
        "Active Count",
        active == check.expected,
        format!("Expected: {}, Got: {}", check.expected, active),
    )
}

/// Validate that particles remain within specified bounds
fn validate_position_bounds(particles: &[Particle], bounds: &PositionBoundsCheck) -> CheckResult {
    let mut violations = 0;
    let mut max_violation = 0.0_f32;

    for p in particles {
        for axis in 0..3 {
            let x = p.position[axis];
            if !x.is_finite() {
                violations += 1;
                max_violation = f32::INFINITY;
                continue;
            }
            let violation = (bounds.min[axis] - x).max(x - bounds.max[axis]);
            if violation > 0.0 {
                violations += 1;
                max_violation = max_violation.max(violation);
            }
        }
    }

    if violations == 0 {
        CheckResult {
            name: "Position Bounds".to_string(),
            passed: true,
            message: None,
        }
    } else {
        CheckResult::new(
            "Position Bounds",
            false,
            format!(
                "{} coordinates out of bounds (max violation: {:.6} m)",
                violations, max_violation
            ),
        )
    }
}

fn validate_free_fall(
    particles: &[Particle],
    check: &FreeFallCheck,
    dt: f32,
    ticks: usize,
) -> CheckResult {
    if particles.is_empty() {
        return CheckResult::new("Free Fall", false, "No particles".to_string());
    }
    let n = particles.len() as f32;
    let mean_vy = particles.iter().map(|p| p.velocity[1]).sum::<f32>() / n;
    let mean_y = particles.iter().map(|p| p.position[1]).sum::<f32>() / n;

    let reference = FreeFall::new(check.gravity as f64, dt as f64);
    let expected_vy = reference.velocity(ticks) as f32;
    let expected_y = check.initial_y + reference.displacement(ticks) as f32;

    let vy_error = (mean_vy - expected_vy).abs();
    let y_error = (mean_y - expected_y).abs();
    CheckResult::new(
        "Free Fall",
        vy_error <= check.tolerance && y_error <= check.tolerance,
        format!(
            "vy: {:.5} (expected {:.5}), y: {:.5} (expected {:.5}), tolerance {:.1e}",
            mean_vy, expected_vy, mean_y, expected_y, check.tolerance
        ),
    )
}

fn validate_contact(trace: &ContactTrace, check: &ContactCheck) -> CheckResult {
    let hits_ok = trace.peak_hit_fraction >= check.min_hit_fraction;
    let clear_ok = trace.deepest <= check.tolerance;
    CheckResult::new(
        "Contact",
        hits_ok && clear_ok,
        format!(
            "Peak hits on {}: {:.1}% (min {:.1}%), deepest center: {:.4} m (limit {:.4} m)",
            check.owner,
            trace.peak_hit_fraction * 100.0,
            check.min_hit_fraction * 100.0,
            trace.deepest,
            check.tolerance
        ),
    )
}

impl TestResult {
    /// Print a summary of the test result
    pub fn print_summary(&self) {
        println!("\n{}", "=".repeat(80));
        println!("Test: {}", self.name);
        println!("{}", "=".repeat(80));
        println!("Status: {}", if self.passed { "PASSED" } else { "FAILED" });
        println!("Timesteps: {}", self.timesteps);
        println!("Simulated time: {:.3} s", self.sim_time);
        println!("Active particles: {}", self.active);
        println!("\nValidation Checks:");
        for check in &self.checks {
            let status = if check.passed { "PASS" } else { "FAIL" };
            print!("  [{}] {}", status, check.name);
            if let Some(ref msg) = check.message {
                print!(" - {}", msg);
            }
            println!();
        }
        println!("{}", "=".repeat(80));
    }
}
