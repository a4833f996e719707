//! Impulse solver: overlapping particles push each other apart.
//!
//! Two particles interact when their centers are closer than one diameter.
//! Each pair contributes a penalty acceleration proportional to the overlap
//! and, while they still approach, an impulse that cancels half of the
//! approach speed within the tick. Both terms are antisymmetric in the pair,
//! so momentum is conserved.

use glam::Vec3;

use crate::config::SimulationConfig;
use crate::parallel::CellTask;
use crate::soa::{valid_lanes, AccelBlock};
use crate::solver::Neighborhood;

/// Constants of the impulse stage.
#[derive(Debug, Clone, Copy)]
pub struct ImpulseParams {
    /// Contact distance (two particle radii).
    pub diameter: f32,
    /// Penalty stiffness.
    pub stiffness: f32,
    /// Timestep; zero disables the impulse term.
    pub dt: f32,
}

impl ImpulseParams {
    /// Constants for a sanitized config.
    pub fn from_config(config: &SimulationConfig, dt: f32) -> Self {
        Self {
            diameter: config.particle_size * 2.0,
            stiffness: config.pressure_stiffness,
            dt,
        }
    }
}

/// Contact acceleration of every particle in `task`'s cell.
pub fn update_velocity(
    hood: &Neighborhood<'_>,
    task: &CellTask,
    out: &mut [AccelBlock],
    params: &ImpulseParams,
) {
    let diameter_sq = params.diameter * params.diameter;
    let impulse_scale = if params.dt > 0.0 { 0.5 / params.dt } else { 0.0 };
    let n = task.cell.len();

    for (k, bi) in task.cell.block_range().enumerate() {
        let block = &hood.blocks[bi];
        let mut acc = AccelBlock::default();
        for lane in 0..valid_lanes(n, k) {
            let pi = Vec3::from(block.position(lane));
            let vi = Vec3::from(block.velocity(lane));
            let mut a = Vec3::ZERO;

            hood.for_each(task.coord, |bj, l, other| {
                if bj == bi && l == lane {
                    return;
                }
                let d = Vec3::from(other.position(l)) - pi;
                let dist_sq = d.length_squared();
                // Coincident particles have no defined normal.
                if dist_sq >= diameter_sq || dist_sq <= 0.0 {
                    return;
                }
                let dist = dist_sq.sqrt();
                let normal = d / dist;
                a -= normal * ((params.diameter - dist) * params.stiffness);

                let approach = (vi - Vec3::from(other.velocity(l))).dot(normal);
                if approach > 0.0 {
                    a -= normal * (approach * impulse_scale);
                }
            });
            acc.add(lane, a.to_array());
        }
        out[k] = acc;
    }
}
