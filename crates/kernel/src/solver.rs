//! Solver pipeline.
//!
//! A tick runs a fixed sequence of sweeps over the occupied cells. Every sweep
//! is a complete rayon call, so it finishes before the next one starts. A
//! sweep writes only into the slices carved out for its own cell and reads
//! neighbor cells through the previous sweep's buffers.
//!
//! ```text
//! Impulse        : to_soa -> velocity -> inputs + integrate -> from_soa
//! Sph            : to_soa -> density -> force -> inputs + integrate -> from_soa
//! SphEstimate    : to_soa -> cell estimate -> density -> force -> inputs + integrate -> from_soa
//! NoInteraction  : to_soa -> inputs + integrate -> from_soa
//! ```

use rayon::prelude::*;

use crate::collider::{apply_inputs, TickInputs};
use crate::config::{SimulationConfig, SolverType};
use crate::grid::{Cell, SpatialGrid};
use crate::impulse::{self, ImpulseParams};
use crate::parallel::{split_blocks, split_particles, CellTask};
use crate::particle::Particle;
use crate::soa::{self, valid_lanes, AccelBlock, Lanes, SoaBlock};
use crate::sph::{self, CellEstimate, SphParams};

/// Read access to the 27-cell neighborhood of a cell.
pub struct Neighborhood<'a> {
    /// Grid constants.
    pub grid: &'a SpatialGrid,
    /// Cell table of the current tick.
    pub cells: &'a [Cell],
    /// Transposed particles.
    pub blocks: &'a [SoaBlock],
}

impl Neighborhood<'_> {
    /// Call `f(block_index, lane, block)` for every particle in the cells
    /// around `coord`, the cell itself included.
    #[inline]
    pub fn for_each<F>(&self, coord: [u32; 3], mut f: F)
    where
        F: FnMut(usize, usize, &SoaBlock),
    {
        for index in self.grid.neighbors(coord) {
            let cell = self.cells[index as usize];
            if cell.is_empty() {
                continue;
            }
            let n = cell.len();
            for (k, bi) in cell.block_range().enumerate() {
                let block = &self.blocks[bi];
                for lane in 0..valid_lanes(n, k) {
                    f(bi, lane, block);
                }
            }
        }
    }
}

/// Buffers reused across ticks.
#[derive(Debug, Default)]
pub struct Scratch {
    pub(crate) blocks: Vec<SoaBlock>,
    pub(crate) accel: Vec<AccelBlock>,
    pub(crate) density: Vec<Lanes>,
    pub(crate) estimates: Vec<CellEstimate>,
}

/// Everything one tick of the solver needs besides the buffers.
pub struct Pipeline<'a> {
    /// Sanitized configuration.
    pub config: &'a SimulationConfig,
    /// Grid constants.
    pub grid: &'a SpatialGrid,
    /// Cell table after sorting.
    pub cells: &'a [Cell],
    /// Occupied cells.
    pub tasks: &'a [CellTask],
    /// Forces and colliders of this tick.
    pub inputs: TickInputs<'a>,
    /// Timestep.
    pub dt: f32,
}

impl Pipeline<'_> {
    /// Run the configured solver over the sorted active `particles`.
    pub fn run(&self, particles: &mut [Particle], scratch: &mut Scratch, total_blocks: usize) {
        if self.tasks.is_empty() {
            return;
        }
        let min_len = self.config.cells_per_task;

        scratch.blocks.resize(total_blocks, SoaBlock::default());
        scratch.accel.clear();
        scratch.accel.resize(total_blocks, AccelBlock::default());

        // AoS -> SoA
        {
            let outs = split_blocks(&mut scratch.blocks, self.tasks);
            let particles = &*particles;
            self.tasks
                .par_iter()
                .zip(outs)
                .with_min_len(min_len)
                .for_each(|(task, out)| soa::to_soa(&particles[task.cell.range()], out));
        }

        let density = match self.config.solver {
            SolverType::Impulse => {
                self.impulse(scratch);
                false
            }
            SolverType::Sph => {
                self.sph_density(scratch);
                self.sph_force(scratch);
                true
            }
            SolverType::SphEstimate => {
                self.sph_estimate_density(scratch);
                self.sph_force(scratch);
                true
            }
            SolverType::NoInteraction => false,
        };

        self.integrate(scratch, density);

        // SoA -> AoS
        {
            let outs = split_particles(particles, self.tasks);
            let blocks = &scratch.blocks;
            self.tasks
                .par_iter()
                .zip(outs)
                .with_min_len(min_len)
                .for_each(|(task, out)| soa::from_soa(&blocks[task.cell.block_range()], out));
        }
    }

    fn neighborhood<'b>(&'b self, blocks: &'b [SoaBlock]) -> Neighborhood<'b> {
        Neighborhood {
            grid: self.grid,
            cells: self.cells,
            blocks,
        }
    }

    fn impulse(&self, scratch: &mut Scratch) {
        let params = ImpulseParams::from_config(self.config, self.dt);
        let hood = self.neighborhood(&scratch.blocks);
        let outs = split_blocks(&mut scratch.accel, self.tasks);
        self.tasks
            .par_iter()
            .zip(outs)
            .with_min_len(self.config.cells_per_task)
            .for_each(|(task, out)| impulse::update_velocity(&hood, task, out, &params));
    }

    fn sph_density(&self, scratch: &mut Scratch) {
        let params = SphParams::from_config(self.config);
        scratch.density.resize(scratch.blocks.len(), [0.0; soa::LANES]);
        let hood = self.neighborhood(&scratch.blocks);
        let outs = split_blocks(&mut scratch.density, self.tasks);
        self.tasks
            .par_iter()
            .zip(outs)
            .with_min_len(self.config.cells_per_task)
            .for_each(|(task, out)| sph::update_density(&hood, task, out, &params));
    }

    fn sph_estimate_density(&self, scratch: &mut Scratch) {
        let params = SphParams::from_config(self.config);
        let min_len = self.config.cells_per_task;

        scratch.estimates.clear();
        scratch.estimates.resize(self.cells.len(), CellEstimate::default());
        {
            let blocks = &scratch.blocks;
            scratch
                .estimates
                .par_iter_mut()
                .zip(self.cells.par_iter())
                .with_min_len(min_len)
                .for_each(|(estimate, cell)| *estimate = sph::estimate_cell(cell, blocks));
        }

        scratch.density.resize(scratch.blocks.len(), [0.0; soa::LANES]);
        let hood = self.neighborhood(&scratch.blocks);
        let estimates = &scratch.estimates;
        let outs = split_blocks(&mut scratch.density, self.tasks);
        self.tasks
            .par_iter()
            .zip(outs)
            .with_min_len(min_len)
            .for_each(|(task, out)| {
                sph::update_density_estimate(&hood, estimates, task, out, &params)
            });
    }

    fn sph_force(&self, scratch: &mut Scratch) {
        let params = SphParams::from_config(self.config);
        let hood = self.neighborhood(&scratch.blocks);
        let density = &scratch.density;
        let outs = split_blocks(&mut scratch.accel, self.tasks);
        self.tasks
            .par_iter()
            .zip(outs)
            .with_min_len(self.config.cells_per_task)
            .for_each(|(task, out)| sph::update_force(&hood, density, task, out, &params));
    }

    /// Forces, colliders and the Euler step, one cell per task.
    fn integrate(&self, scratch: &mut Scratch, write_density: bool) {
        let config = self.config;
        let inputs = &self.inputs;
        let dt = self.dt;
        let accel = &scratch.accel;
        let density = &scratch.density;
        let outs = split_blocks(&mut scratch.blocks, self.tasks);
        self.tasks
            .par_iter()
            .zip(outs)
            .with_min_len(config.cells_per_task)
            .for_each(|(task, blocks)| {
                let n = task.cell.len();
                let soai = task.cell.soai as usize;
                for (k, block) in blocks.iter_mut().enumerate() {
                    let bi = soai + k;
                    if write_density {
                        block.density = density[bi];
                    }
                    let mut a = accel[bi];
                    apply_inputs(inputs, block, &mut a, valid_lanes(n, k), config.wall_stiffness);
                    soa::integrate(block, &a, dt, config.decelerate);
                }
            });
    }
}
