//! The particle record and helpers for building particle batches.
//!
//! Particles are stored array-of-structs in one contiguous buffer so a host can
//! upload the live prefix verbatim (see [`particles_as_bytes`]). The solvers
//! never read this layout directly; they work on the 8-lane blocks in
//! [`crate::soa`].

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::grid::CellHash;

/// Hit id meaning "no collider touched this particle".
pub const NO_HIT: i32 = -1;

/// Per-particle scalar state.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ParticleParams {
    /// Density computed by the SPH solvers (0 for the others).
    pub density: f32,
    /// Seconds left to live; `<= 0` means dead.
    pub lifetime: f32,
    /// Packed cell index from the last sort. Bit 31 marks a dead particle.
    pub hash: u32,
    /// Collider owner hit on the previous tick, or [`NO_HIT`].
    pub hit_prev: i32,
    /// Collider owner hit on the last tick, or [`NO_HIT`].
    pub hit: i32,
    _pad: [u32; 3],
}

impl Default for ParticleParams {
    fn default() -> Self {
        Self {
            density: 0.0,
            lifetime: 0.0,
            hash: 0,
            hit_prev: NO_HIT,
            hit: NO_HIT,
            _pad: [0; 3],
        }
    }
}

/// A single simulated particle (64 bytes).
///
/// `position[3]` is the homogeneous w (always 1 after a tick) and
/// `velocity[3]` carries the speed `|v|` computed during integration.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Particle {
    /// Position xyz plus w = 1.
    pub position: [f32; 4],
    /// Velocity xyz plus speed.
    pub velocity: [f32; 4],
    /// Scalar state.
    pub params: ParticleParams,
}

impl Default for Particle {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 0.0, 1.0],
            velocity: [0.0; 4],
            params: ParticleParams::default(),
        }
    }
}

impl Particle {
    /// Build a particle at `position` moving with `velocity`.
    ///
    /// The lifetime is assigned when the particle is added to a world.
    pub fn new(position: Vec3, velocity: Vec3) -> Self {
        Self {
            position: [position.x, position.y, position.z, 1.0],
            velocity: [velocity.x, velocity.y, velocity.z, velocity.length()],
            params: ParticleParams::default(),
        }
    }

    /// Position as a vector.
    #[inline]
    pub fn position(&self) -> Vec3 {
        Vec3::new(self.position[0], self.position[1], self.position[2])
    }

    /// Velocity as a vector.
    #[inline]
    pub fn velocity(&self) -> Vec3 {
        Vec3::new(self.velocity[0], self.velocity[1], self.velocity[2])
    }

    /// Speed stored by the last integration.
    #[inline]
    pub fn speed(&self) -> f32 {
        self.velocity[3]
    }

    /// Whether the particle still has lifetime left.
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.params.lifetime > 0.0
    }

    /// Decoded hash from the last sort.
    #[inline]
    pub fn cell_hash(&self) -> CellHash {
        CellHash::unpack(self.params.hash)
    }
}

/// View a particle slice as raw bytes for upload.
pub fn particles_as_bytes(particles: &[Particle]) -> &[u8] {
    bytemuck::cast_slice(particles)
}

// ---------------------------------------------------------------------------
// Scattering
// ---------------------------------------------------------------------------

/// Random placement parameters shared by the scatter helpers.
#[derive(Debug, Clone, Copy)]
pub struct Scatter {
    /// Number of particles to generate.
    pub count: usize,
    /// Velocity given to every particle.
    pub velocity: Vec3,
    /// Maximum random deviation added to each velocity component.
    pub velocity_jitter: f32,
    /// Seed for the deterministic generator.
    pub seed: u64,
}

impl Scatter {
    /// `count` motionless particles from `seed`.
    pub fn new(count: usize, seed: u64) -> Self {
        Self {
            count,
            velocity: Vec3::ZERO,
            velocity_jitter: 0.0,
            seed,
        }
    }

    fn velocity(&self, rng: &mut ChaCha8Rng) -> Vec3 {
        if self.velocity_jitter <= 0.0 {
            return self.velocity;
        }
        let j = self.velocity_jitter;
        self.velocity
            + Vec3::new(
                rng.gen_range(-j..=j),
                rng.gen_range(-j..=j),
                rng.gen_range(-j..=j),
            )
    }
}

/// Particles uniformly distributed inside a sphere.
pub fn scatter_sphere(center: Vec3, radius: f32, scatter: Scatter) -> Vec<Particle> {
    let mut rng = ChaCha8Rng::seed_from_u64(scatter.seed);
    let radius = radius.max(0.0);
    (0..scatter.count)
        .map(|_| {
            // Rejection sampling in the unit cube.
            let dir = loop {
                let v = Vec3::new(
                    rng.gen_range(-1.0..=1.0),
                    rng.gen_range(-1.0..=1.0),
                    rng.gen_range(-1.0..=1.0),
                );
                if v.length_squared() <= 1.0 {
                    break v;
                }
            };
            Particle::new(center + dir * radius, scatter.velocity(&mut rng))
        })
        .collect()
}

/// Particles uniformly distributed inside an axis-aligned box of half-size `half_extent`.
pub fn scatter_box(center: Vec3, half_extent: Vec3, scatter: Scatter) -> Vec<Particle> {
    let mut rng = ChaCha8Rng::seed_from_u64(scatter.seed);
    let half = half_extent.abs();
    (0..scatter.count)
        .map(|_| {
            let offset = Vec3::new(
                rng.gen_range(-half.x..=half.x),
                rng.gen_range(-half.y..=half.y),
                rng.gen_range(-half.z..=half.z),
            );
            Particle::new(center + offset, scatter.velocity(&mut rng))
        })
        .collect()
}
