//! The particle store and its tick.
//!
//! A [`World`] owns the particle buffer, the cell table, the solver scratch
//! buffers and the colliders/forces queued for the next tick. It is advanced
//! with [`World::update`], which needs `&mut self`; [`SharedWorld`] wraps it in
//! a mutex for hosts that feed it from several threads.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use glam::{Mat4, Vec3};

use crate::collider::{BoxCollider, Force, PlaneCollider, SphereCollider, TickInputs};
use crate::config::{SimulationConfig, MIN_PARTICLE_SIZE};
use crate::grid::{Cell, SpatialGrid};
use crate::parallel::occupied_cells;
use crate::particle::Particle;
use crate::solver::{Pipeline, Scratch};
use crate::sort;
use crate::SimulationKernel;

/// Handle to a collider added for the next tick.
///
/// Particles touching the collider carry its owner id in `hit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColliderId(i32);

impl ColliderId {
    /// Owner id written into particles.
    pub fn owner(self) -> i32 {
        self.0
    }

    /// Whether `particle` touched this collider during the last tick.
    pub fn hit(self, particle: &Particle) -> bool {
        particle.params.hit == self.0
    }

    /// Whether `particle` touched this collider during the tick before.
    pub fn hit_prev(self, particle: &Particle) -> bool {
        particle.params.hit_prev == self.0
    }
}

/// Handle to a force added for the next tick (its position in the queue).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ForceId(pub usize);

/// Counters from the most recent [`World::update`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    /// Live particles after compaction.
    pub active: usize,
    /// Particles removed by compaction.
    pub compacted: usize,
    /// Cells holding at least one particle.
    pub occupied_cells: usize,
    /// 8-lane blocks processed.
    pub blocks: usize,
}

#[derive(Debug, Default)]
struct Inputs {
    forces: Vec<Force>,
    spheres: Vec<SphereCollider>,
    planes: Vec<PlaneCollider>,
    boxes: Vec<BoxCollider>,
}

impl Inputs {
    fn view(&self) -> TickInputs<'_> {
        TickInputs {
            forces: &self.forces,
            spheres: &self.spheres,
            planes: &self.planes,
            boxes: &self.boxes,
        }
    }

    fn clear(&mut self) {
        self.forces.clear();
        self.spheres.clear();
        self.planes.clear();
        self.boxes.clear();
    }
}

/// Particle simulation world.
pub struct World {
    config: SimulationConfig,
    grid: SpatialGrid,
    particles: Vec<Particle>,
    cells: Vec<Cell>,
    active: usize,
    inputs: Inputs,
    scratch: Scratch,
    stats: TickStats,
}

impl World {
    /// Create a world and allocate its buffers for `config`.
    pub fn new(mut config: SimulationConfig) -> Self {
        for warning in config.sanitize() {
            tracing::warn!("{warning}");
        }
        let grid = SpatialGrid::new(&config);
        tracing::info!(
            "World created: capacity {}, grid {:?}, solver {:?}",
            config.max_particles,
            config.world_div,
            config.solver
        );
        Self {
            particles: vec![Particle::default(); config.max_particles as usize],
            cells: vec![Cell::default(); grid.cell_count()],
            grid,
            config,
            active: 0,
            inputs: Inputs::default(),
            scratch: Scratch::default(),
            stats: TickStats::default(),
        }
    }

    /// Replace the parameters. They are sanitized and applied at the next
    /// [`World::update`].
    pub fn configure(&mut self, config: SimulationConfig) {
        self.config = config;
    }

    /// Current parameters.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Grid used by the last tick.
    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    /// Cell table built by the last tick.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Counters of the last tick.
    pub fn stats(&self) -> TickStats {
        self.stats
    }

    /// Number of live particles.
    pub fn particle_count(&self) -> usize {
        self.active
    }

    /// Live particles, valid until the next [`World::update`].
    pub fn particles(&self) -> &[Particle] {
        &self.particles[..self.active]
    }

    /// Mutable live particles, for hosts that edit particles in place.
    pub fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles[..self.active]
    }

    /// Append particles up to the remaining capacity and return how many
    /// were accepted. Each accepted particle gets the configured lifetime.
    pub fn add_particles(&mut self, particles: &[Particle]) -> usize {
        let capacity = self.particles.len();
        let accepted = particles.len().min(capacity - self.active);
        if accepted < particles.len() {
            tracing::debug!(
                "particle capacity reached: accepted {} of {}",
                accepted,
                particles.len()
            );
        }
        let lifetime = self.config.lifetime;
        let dst = &mut self.particles[self.active..self.active + accepted];
        for (slot, src) in dst.iter_mut().zip(particles) {
            *slot = *src;
            slot.params.lifetime = lifetime;
        }
        self.active += accepted;
        accepted
    }

    /// Kill every particle. They are compacted away by the next tick.
    pub fn clear_particles(&mut self) {
        for p in &mut self.particles {
            p.params.lifetime = 0.0;
        }
    }

    fn particle_size(&self) -> f32 {
        self.config.particle_size.max(MIN_PARTICLE_SIZE)
    }

    /// Add a sphere collider for the next tick.
    pub fn add_sphere_collider(&mut self, owner: i32, center: Vec3, radius: f32) -> ColliderId {
        let collider = SphereCollider::new(owner, center, radius, self.particle_size());
        self.inputs.spheres.push(collider);
        ColliderId(owner)
    }

    /// Add a box collider for the next tick. `size` is the full edge length
    /// along each local axis before `transform` is applied.
    pub fn add_box_collider(&mut self, owner: i32, transform: Mat4, size: Vec3) -> ColliderId {
        let collider = BoxCollider::new(owner, transform, size, self.particle_size());
        self.inputs.boxes.push(collider);
        ColliderId(owner)
    }

    /// Add a half-space collider through `point`; the solid side lies
    /// opposite `normal`.
    pub fn add_plane_collider(&mut self, owner: i32, normal: Vec3, point: Vec3) -> ColliderId {
        let collider = PlaneCollider::new(owner, normal, point, self.particle_size());
        self.inputs.planes.push(collider);
        ColliderId(owner)
    }

    /// Add a uniform acceleration for the next tick.
    pub fn add_directional_force(&mut self, direction: Vec3, strength: f32) -> ForceId {
        self.add_force(Force::directional(direction, strength))
    }

    /// Add an arbitrary force for the next tick.
    pub fn add_force(&mut self, force: Force) -> ForceId {
        self.inputs.forces.push(force);
        ForceId(self.inputs.forces.len() - 1)
    }

    /// Drop every queued collider and force.
    pub fn clear_colliders_and_forces(&mut self) {
        self.inputs.clear();
    }

    /// Apply pending configuration, resizing buffers when needed.
    fn apply_config(&mut self) {
        for warning in self.config.sanitize() {
            tracing::warn!("{warning}");
        }
        self.grid = SpatialGrid::new(&self.config);

        let cell_count = self.grid.cell_count();
        if self.cells.len() != cell_count {
            self.cells.resize(cell_count, Cell::default());
        }
        let capacity = self.config.max_particles as usize;
        if self.particles.len() != capacity {
            tracing::debug!("resizing particle buffer {} -> {}", self.particles.len(), capacity);
            self.particles.resize(capacity, Particle::default());
            self.active = self.active.min(capacity);
        }
    }

    /// Advance the simulation by `dt` seconds, then clear the tick's
    /// colliders and forces.
    pub fn update(&mut self, dt: f32) {
        let _span = tracing::debug_span!("update", dt).entered();
        self.apply_config();

        let min_particles = self.config.particles_per_task;
        let region = &mut self.particles[..self.active];
        sort::assign_hashes(region, &self.grid, dt, min_particles);
        sort::sort_by_hash(region);
        let active = sort::scan_cells(
            region,
            &mut self.cells,
            self.config.cells_per_task,
            min_particles,
        );
        let total_blocks = sort::assign_block_offsets(&mut self.cells);
        let compacted = self.active - active;
        self.active = active;

        let tasks = occupied_cells(&self.cells, &self.grid);
        let pipeline = Pipeline {
            config: &self.config,
            grid: &self.grid,
            cells: &self.cells,
            tasks: &tasks,
            inputs: self.inputs.view(),
            dt,
        };
        pipeline.run(&mut self.particles[..active], &mut self.scratch, total_blocks);

        self.stats = TickStats {
            active,
            compacted,
            occupied_cells: tasks.len(),
            blocks: total_blocks,
        };
        tracing::trace!(
            "tick: {} active, {} compacted, {} cells, {} blocks",
            active,
            compacted,
            tasks.len(),
            total_blocks
        );

        self.inputs.clear();
    }
}

impl SimulationKernel for World {
    fn step(&mut self, dt: f32) {
        self.update(dt);
    }

    fn particles(&self) -> &[Particle] {
        World::particles(self)
    }

    fn particle_count(&self) -> usize {
        World::particle_count(self)
    }
}

// ---------------------------------------------------------------------------
// SharedWorld
// ---------------------------------------------------------------------------

/// A [`World`] behind one coarse lock.
///
/// Every call holds the lock for its whole duration, so a tick never overlaps
/// an add, a clear or a read.
#[derive(Clone)]
pub struct SharedWorld {
    inner: Arc<Mutex<World>>,
}

impl SharedWorld {
    /// Wrap `world`.
    pub fn new(world: World) -> Self {
        Self {
            inner: Arc::new(Mutex::new(world)),
        }
    }

    /// Lock the world for a sequence of calls.
    ///
    /// A panic inside a previous holder does not poison later ticks; the
    /// world is left in whatever state the last completed call produced.
    pub fn lock(&self) -> MutexGuard<'_, World> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// See [`World::update`].
    pub fn update(&self, dt: f32) {
        self.lock().update(dt);
    }

    /// See [`World::add_particles`].
    pub fn add_particles(&self, particles: &[Particle]) -> usize {
        self.lock().add_particles(particles)
    }

    /// See [`World::clear_particles`].
    pub fn clear_particles(&self) {
        self.lock().clear_particles();
    }

    /// See [`World::particle_count`].
    pub fn particle_count(&self) -> usize {
        self.lock().particle_count()
    }

    /// Run `f` on the live particles while holding the lock.
    pub fn with_particles<R>(&self, f: impl FnOnce(&mut [Particle]) -> R) -> R {
        f(self.lock().particles_mut())
    }
}
