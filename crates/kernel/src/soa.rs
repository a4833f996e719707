//! 8-lane structure-of-arrays blocks.
//!
//! Each grid cell's particles are transposed into `ceil(n / 8)` blocks before
//! the solver runs and untransposed afterwards. Lanes past the cell's particle
//! count in its final block hold inert defaults and are never written back.

use wide::f32x8;

use crate::particle::{Particle, NO_HIT};

/// Lane width of a block.
pub const LANES: usize = 8;

/// One scalar field across a block's lanes.
pub type Lanes = [f32; LANES];

/// Number of blocks needed for `n` particles.
#[inline]
pub fn soa_blocks(n: usize) -> usize {
    n.div_ceil(LANES)
}

/// Number of meaningful lanes in block `block` of a run of `n` particles.
#[inline]
pub fn valid_lanes(n: usize, block: usize) -> usize {
    n.saturating_sub(block * LANES).min(LANES)
}

/// Position, velocity and per-tick outputs of up to 8 particles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoaBlock {
    /// Position x.
    pub x: Lanes,
    /// Position y.
    pub y: Lanes,
    /// Position z.
    pub z: Lanes,
    /// Velocity x.
    pub vx: Lanes,
    /// Velocity y.
    pub vy: Lanes,
    /// Velocity z.
    pub vz: Lanes,
    /// Speed `|v|`.
    pub speed: Lanes,
    /// Density written back to the particle.
    pub density: Lanes,
    /// Owner of the collider hit this tick, or [`NO_HIT`].
    pub hit: [i32; LANES],
}

impl Default for SoaBlock {
    fn default() -> Self {
        Self {
            x: [0.0; LANES],
            y: [0.0; LANES],
            z: [0.0; LANES],
            vx: [0.0; LANES],
            vy: [0.0; LANES],
            vz: [0.0; LANES],
            speed: [0.0; LANES],
            density: [0.0; LANES],
            hit: [NO_HIT; LANES],
        }
    }
}

impl SoaBlock {
    /// Position of one lane.
    #[inline]
    pub fn position(&self, lane: usize) -> [f32; 3] {
        [self.x[lane], self.y[lane], self.z[lane]]
    }

    /// Velocity of one lane.
    #[inline]
    pub fn velocity(&self, lane: usize) -> [f32; 3] {
        [self.vx[lane], self.vy[lane], self.vz[lane]]
    }
}

/// Accumulated acceleration of a block.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AccelBlock {
    /// Acceleration x.
    pub ax: Lanes,
    /// Acceleration y.
    pub ay: Lanes,
    /// Acceleration z.
    pub az: Lanes,
}

impl AccelBlock {
    /// Add `a` to one lane.
    #[inline]
    pub fn add(&mut self, lane: usize, a: [f32; 3]) {
        self.ax[lane] += a[0];
        self.ay[lane] += a[1];
        self.az[lane] += a[2];
    }

    /// Acceleration of one lane.
    #[inline]
    pub fn get(&self, lane: usize) -> [f32; 3] {
        [self.ax[lane], self.ay[lane], self.az[lane]]
    }
}

/// Transpose `particles` into `out`.
///
/// `out` must hold at least `soa_blocks(particles.len())` blocks. Hit lanes
/// start at [`NO_HIT`]; density starts at zero and is recomputed by the solver.
pub fn to_soa(particles: &[Particle], out: &mut [SoaBlock]) {
    debug_assert!(out.len() >= soa_blocks(particles.len()));
    for (chunk, block) in particles.chunks(LANES).zip(out.iter_mut()) {
        *block = SoaBlock::default();
        for (lane, p) in chunk.iter().enumerate() {
            block.x[lane] = p.position[0];
            block.y[lane] = p.position[1];
            block.z[lane] = p.position[2];
            block.vx[lane] = p.velocity[0];
            block.vy[lane] = p.velocity[1];
            block.vz[lane] = p.velocity[2];
            block.speed[lane] = p.velocity[3];
        }
    }
}

/// Untranspose `blocks` into `out`, writing only `out.len()` lanes.
///
/// The previous hit id moves to `hit_prev`. Lifetime and hash are untouched.
pub fn from_soa(blocks: &[SoaBlock], out: &mut [Particle]) {
    debug_assert!(blocks.len() >= soa_blocks(out.len()));
    for (chunk, block) in out.chunks_mut(LANES).zip(blocks.iter()) {
        for (lane, p) in chunk.iter_mut().enumerate() {
            p.position = [block.x[lane], block.y[lane], block.z[lane], 1.0];
            p.velocity = [block.vx[lane], block.vy[lane], block.vz[lane], block.speed[lane]];
            p.params.density = block.density[lane];
            p.params.hit_prev = p.params.hit;
            p.params.hit = block.hit[lane];
        }
    }
}

/// Semi-implicit Euler step over all 8 lanes.
///
/// `v += a * dt; v *= decelerate; x += v * dt; speed = |v|`
pub fn integrate(block: &mut SoaBlock, accel: &AccelBlock, dt: f32, decelerate: f32) {
    let dt = f32x8::splat(dt);
    let decel = f32x8::splat(decelerate);

    let vx = (f32x8::from(block.vx) + f32x8::from(accel.ax) * dt) * decel;
    let vy = (f32x8::from(block.vy) + f32x8::from(accel.ay) * dt) * decel;
    let vz = (f32x8::from(block.vz) + f32x8::from(accel.az) * dt) * decel;

    block.x = (f32x8::from(block.x) + vx * dt).to_array();
    block.y = (f32x8::from(block.y) + vy * dt).to_array();
    block.z = (f32x8::from(block.z) + vz * dt).to_array();
    block.speed = (vx * vx + vy * vy + vz * vz).sqrt().to_array();
    block.vx = vx.to_array();
    block.vy = vy.to_array();
    block.vz = vz.to_array();
}
