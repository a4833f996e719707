//! SPH smoothing kernel and the per-cell SPH stages.
//!
//! Implements the Wendland C2 kernel and its gradient for 3D SPH. The
//! smoothing length is the particle radius, so the support radius `2h` equals
//! one particle diameter. Neighbor search visits the 3x3x3 cells around a
//! particle's cell; cells should be at least `2h` wide for the search to be
//! complete.
//!
//! Stages, each one full sweep over the occupied cells:
//! - `update_density` -- exact summation over the neighborhood.
//! - `estimate_cell` + `update_density_estimate` -- own cell exact,
//!   neighbor cells collapsed onto their centroid.
//! - `update_force` -- symmetric pressure gradient plus Monaghan viscosity.

use std::f32::consts::PI;

use glam::Vec3;

use crate::config::SimulationConfig;
use crate::eos::{self, TAIT_GAMMA};
use crate::grid::Cell;
use crate::parallel::CellTask;
use crate::soa::{valid_lanes, AccelBlock, Lanes, SoaBlock, LANES};
use crate::solver::Neighborhood;

/// Normalization constant for the 3D Wendland C2 kernel: 21 / (16 * pi).
const WENDLAND_C2_NORM_3D: f32 = 21.0 / (16.0 * PI);

/// Monaghan viscosity quadratic coefficient.
const VISCOSITY_BETA: f32 = 2.0;

/// Wendland C2 smoothing kernel in 3D.
///
/// ```text
/// W(r, h) = (21 / (16 pi h^3)) * (1 - q/2)^4 * (1 + 2q)   for q = r/h <= 2
/// W(r, h) = 0                                                for q > 2
/// ```
pub fn wendland_c2(r: f32, h: f32) -> f32 {
    let q = r / h;
    if q >= 2.0 {
        return 0.0;
    }
    let h3 = h * h * h;
    let t = 1.0 - 0.5 * q;
    let t2 = t * t;
    WENDLAND_C2_NORM_3D / h3 * t2 * t2 * (1.0 + 2.0 * q)
}

/// Gradient of the Wendland C2 kernel with respect to particle i.
///
/// `d` is the displacement from j to i and `r = |d|`.
///
/// ```text
/// dW/dr = (21 / (16 pi h^3)) * (-5 q) * (1 - q/2)^3 / h
/// ```
///
/// Zero when the particles coincide or are out of range.
pub fn wendland_c2_gradient(d: Vec3, r: f32, h: f32) -> Vec3 {
    let q = r / h;
    if q >= 2.0 || r < 1.0e-12 {
        return Vec3::ZERO;
    }
    let t = 1.0 - 0.5 * q;
    let dw_dr = WENDLAND_C2_NORM_3D / (h * h * h * h) * (-5.0 * q) * t * t * t;
    d * (dw_dr / r)
}

/// SPH constants for one tick.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SphParams {
    /// Smoothing length.
    pub h: f32,
    /// Mass per particle.
    pub mass: f32,
    /// Rest density.
    pub rest_density: f32,
    /// Tait constant.
    pub stiffness: f32,
    /// Monaghan alpha.
    pub viscosity: f32,
    /// Speed of sound derived from the Tait constant.
    pub speed_of_sound: f32,
}

impl SphParams {
    /// Constants for a sanitized config.
    pub(crate) fn from_config(config: &SimulationConfig) -> Self {
        let rest_density = config.sph_rest_density.max(f32::EPSILON);
        Self {
            h: config.particle_size,
            mass: config.particle_mass(),
            rest_density,
            stiffness: config.pressure_stiffness,
            viscosity: config.sph_viscosity,
            speed_of_sound: eos::speed_of_sound(
                config.pressure_stiffness,
                rest_density,
                TAIT_GAMMA,
            ),
        }
    }

    #[inline]
    fn pressure(&self, density: f32) -> f32 {
        eos::tait_pressure(density, self.rest_density, self.stiffness, TAIT_GAMMA)
    }
}

#[inline]
fn lane_pos(block: &SoaBlock, lane: usize) -> Vec3 {
    Vec3::from(block.position(lane))
}

// ---------------------------------------------------------------------------
// Density
// ---------------------------------------------------------------------------

/// Density of every particle in `task`'s cell by summation over the
/// neighborhood, self included.
///
/// ```text
/// rho_i = sum_j m * W(|r_i - r_j|, h)
/// ```
pub(crate) fn update_density(
    hood: &Neighborhood<'_>,
    task: &CellTask,
    out: &mut [Lanes],
    params: &SphParams,
) {
    let n = task.cell.len();
    for (k, bi) in task.cell.block_range().enumerate() {
        let block = &hood.blocks[bi];
        let mut rho = [0.0; LANES];
        for (lane, slot) in rho.iter_mut().enumerate().take(valid_lanes(n, k)) {
            let pi = lane_pos(block, lane);
            let mut sum = 0.0;
            hood.for_each(task.coord, |_, l, other| {
                sum += wendland_c2(pi.distance(lane_pos(other, l)), params.h);
            });
            *slot = sum * params.mass;
        }
        out[k] = rho;
    }
}

/// Aggregate of one cell used by the estimated density.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct CellEstimate {
    /// Number of particles.
    pub count: u32,
    /// Mean position.
    pub centroid: Vec3,
}

/// Count and centroid of a cell's particles.
pub(crate) fn estimate_cell(cell: &Cell, blocks: &[SoaBlock]) -> CellEstimate {
    if cell.is_empty() {
        return CellEstimate::default();
    }
    let n = cell.len();
    let mut sum = Vec3::ZERO;
    for (k, bi) in cell.block_range().enumerate() {
        for lane in 0..valid_lanes(n, k) {
            sum += lane_pos(&blocks[bi], lane);
        }
    }
    CellEstimate {
        count: n as u32,
        centroid: sum / n as f32,
    }
}

/// Density with the own cell summed exactly and each neighbor cell treated
/// as its whole mass sitting at its centroid.
pub(crate) fn update_density_estimate(
    hood: &Neighborhood<'_>,
    estimates: &[CellEstimate],
    task: &CellTask,
    out: &mut [Lanes],
    params: &SphParams,
) {
    let n = task.cell.len();
    for (k, bi) in task.cell.block_range().enumerate() {
        let block = &hood.blocks[bi];
        let mut rho = [0.0; LANES];
        for (lane, slot) in rho.iter_mut().enumerate().take(valid_lanes(n, k)) {
            let pi = lane_pos(block, lane);
            let mut sum = 0.0;
            for (kj, bj) in task.cell.block_range().enumerate() {
                let other = &hood.blocks[bj];
                for l in 0..valid_lanes(n, kj) {
                    sum += wendland_c2(pi.distance(lane_pos(other, l)), params.h);
                }
            }
            for index in hood.grid.neighbors(task.coord) {
                if index == task.index {
                    continue;
                }
                let estimate = &estimates[index as usize];
                if estimate.count > 0 {
                    let w = wendland_c2(pi.distance(estimate.centroid), params.h);
                    sum += estimate.count as f32 * w;
                }
            }
            *slot = sum * params.mass;
        }
        out[k] = rho;
    }
}

// ---------------------------------------------------------------------------
// Forces
// ---------------------------------------------------------------------------

/// Pressure and viscous acceleration of every particle in `task`'s cell.
///
/// ```text
/// a_i = -sum_j m (P_i / rho_i^2 + P_j / rho_j^2 + Pi_ij) grad W_ij
/// Pi_ij = (-alpha c mu_ij + beta mu_ij^2) / rho_avg     when v_ij . r_ij < 0
/// mu_ij = h (v_ij . r_ij) / (|r_ij|^2 + 0.01 h^2)
/// ```
///
/// `density` is indexed like the block buffer.
pub(crate) fn update_force(
    hood: &Neighborhood<'_>,
    density: &[Lanes],
    task: &CellTask,
    out: &mut [AccelBlock],
    params: &SphParams,
) {
    let h = params.h;
    let support = 2.0 * h;
    let eta_sq = 0.01 * h * h;
    let n = task.cell.len();

    for (k, bi) in task.cell.block_range().enumerate() {
        let block = &hood.blocks[bi];
        let mut acc = AccelBlock::default();
        for lane in 0..valid_lanes(n, k) {
            let pi = lane_pos(block, lane);
            let vi = Vec3::from(block.velocity(lane));
            let rho_i = density[bi][lane];
            if rho_i <= 0.0 {
                continue;
            }
            let p_term_i = params.pressure(rho_i) / (rho_i * rho_i);

            let mut a = Vec3::ZERO;
            hood.for_each(task.coord, |bj, l, other| {
                if bj == bi && l == lane {
                    return;
                }
                let d = pi - lane_pos(other, l);
                let r = d.length();
                if r >= support {
                    return;
                }
                let rho_j = density[bj][l];
                if rho_j <= 0.0 {
                    return;
                }
                let grad = wendland_c2_gradient(d, r, h);

                let mut factor = p_term_i + params.pressure(rho_j) / (rho_j * rho_j);

                // Viscosity only between approaching particles.
                let vr = (vi - Vec3::from(other.velocity(l))).dot(d);
                if vr < 0.0 {
                    let mu = h * vr / (r * r + eta_sq);
                    let rho_avg = 0.5 * (rho_i + rho_j);
                    let c = params.speed_of_sound;
                    factor += (-params.viscosity * c * mu + VISCOSITY_BETA * mu * mu) / rho_avg;
                }

                a -= grad * (params.mass * factor);
            });
            acc.add(lane, a.to_array());
        }
        out[k] = acc;
    }
}
