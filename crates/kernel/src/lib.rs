//! Spatially-hashed particle simulation kernel.
//!
//! This crate advances up to `max_particles` particles per tick inside a box
//! divided into a uniform power-of-two grid. Each tick sorts particles by grid
//! cell, transposes every cell into 8-lane blocks and runs one of several
//! interchangeable local-interaction solvers over the cells in parallel.
//!
//! # Modules
//! - [`config`] -- `SimulationConfig`, `SolverType`, sanitization.
//! - [`grid`] -- Spatial hash, `CellHash` and per-cell ranges.
//! - [`particle`] -- The 64-byte particle record and scatter helpers.
//! - [`soa`] -- 8-lane blocks, transpose and integration.
//! - [`sort`] -- Hashing, sorting and dead-particle compaction.
//! - [`collider`] -- Per-tick colliders and external forces.
//! - [`sph`] -- Wendland C2 kernel and the SPH stages.
//! - [`eos`] -- Tait equation of state.
//! - [`world`] -- `World`, `SharedWorld` and the tick.
//!
//! # Example
//!
//! ```
//! use glam::Vec3;
//! use particle_kernel::{Particle, SimulationConfig, SolverType, World};
//!
//! let mut world = World::new(SimulationConfig {
//!     solver: SolverType::NoInteraction,
//!     max_particles: 1024,
//!     world_div: [8, 8, 8],
//!     ..Default::default()
//! });
//! world.add_particles(&[Particle::new(Vec3::ZERO, Vec3::ZERO); 4]);
//! world.add_directional_force(Vec3::NEG_Y, 9.8);
//! world.update(1.0 / 60.0);
//! assert!(world.particles().iter().all(|p| p.velocity[1] < 0.0));
//! ```

#![warn(missing_docs)]

pub mod collider;
pub mod config;
pub mod eos;
pub mod grid;
mod impulse;
mod parallel;
pub mod particle;
pub mod soa;
mod solver;
pub mod sort;
pub mod sph;
pub mod world;

pub use collider::{Aabb, Force, ForceDirection, ForceShape, Plane};
pub use config::{ConfigError, ConfigWarning, SimulationConfig, SolverType};
pub use grid::{Cell, CellHash, SpatialGrid};
pub use particle::{
    particles_as_bytes, scatter_box, scatter_sphere, Particle, ParticleParams, Scatter, NO_HIT,
};
pub use world::{ColliderId, ForceId, SharedWorld, TickStats, World};

// ---------------------------------------------------------------------------
// SimulationKernel trait
// ---------------------------------------------------------------------------

/// Something that advances particles in fixed steps.
///
/// Drivers such as the reference-test harness are written against this trait
/// rather than against [`World`] directly.
pub trait SimulationKernel {
    /// Execute one simulation step of duration `dt` seconds.
    fn step(&mut self, dt: f32);

    /// Current live particles.
    fn particles(&self) -> &[Particle];

    /// Number of live particles.
    fn particle_count(&self) -> usize;
}
