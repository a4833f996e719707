//! Simulation parameters and their sanitization.
//!
//! [`SimulationConfig`] is plain data that hosts build in code or load from
//! JSON text. It is never trusted as-is: before every tick the world runs
//! [`SimulationConfig::sanitize`], which clamps degenerate values into a safe
//! range and reports each adjustment as a [`ConfigWarning`].

use serde::{Deserialize, Serialize};

/// Smallest particle radius the solvers accept.
pub const MIN_PARTICLE_SIZE: f32 = 0.00001;

/// Smallest particle capacity the world allocates.
pub const MIN_MAX_PARTICLES: u32 = 128;

/// Largest per-axis subdivision. Three axes of 10 bits keep every cell index
/// below the death-tag bit.
pub const MAX_WORLD_DIV: u32 = 1024;

/// Smoothing length over the rest lattice spacing of SPH particles.
pub const REST_SPACING_RATIO: f32 = 1.3;

/// Smallest world half-extent per axis.
pub const MIN_WORLD_EXTENT: f32 = 0.001;

/// Which local-interaction solver advances the particles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverType {
    /// Pairwise penalty and impulse response between overlapping particles.
    #[default]
    Impulse,
    /// Full SPH: density summation, pressure and viscosity forces.
    Sph,
    /// SPH with neighbor cells approximated by their aggregate mass.
    SphEstimate,
    /// Particles ignore each other; only forces and colliders act.
    NoInteraction,
}

/// Errors raised while decoding a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The JSON text could not be parsed into a configuration.
    #[error("failed to parse simulation config: {0}")]
    Parse(#[from] serde_json::Error),
    /// The configuration could not be encoded.
    #[error("failed to encode simulation config: {0}")]
    Encode(#[source] serde_json::Error),
}

/// A value that [`SimulationConfig::sanitize`] had to replace.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigWarning {
    /// Particle size was not positive.
    #[error("particle_size {given} clamped to {used}")]
    ParticleSize {
        /// Value supplied by the host.
        given: f32,
        /// Value the solvers will use.
        used: f32,
    },
    /// Capacity was below the minimum.
    #[error("max_particles {given} clamped to {used}")]
    MaxParticles {
        /// Value supplied by the host.
        given: u32,
        /// Value the world will allocate.
        used: u32,
    },
    /// A subdivision count was zero, too large, or not a power of two.
    #[error("world_div[{axis}] {given} rounded to {used}")]
    WorldDiv {
        /// Axis index (0 = x, 1 = y, 2 = z).
        axis: usize,
        /// Value supplied by the host.
        given: u32,
        /// Power of two the grid will use.
        used: u32,
    },
    /// A half-extent was not positive.
    #[error("world_extent[{axis}] {given} clamped to {used}")]
    WorldExtent {
        /// Axis index (0 = x, 1 = y, 2 = z).
        axis: usize,
        /// Value supplied by the host.
        given: f32,
        /// Value the grid will use.
        used: f32,
    },
    /// A task granularity was zero.
    #[error("{field} must be at least 1")]
    TaskGranularity {
        /// Name of the offending field.
        field: &'static str,
    },
}

/// Kernel parameters.
///
/// Every field has a default, so partial JSON objects are accepted:
///
/// ```
/// use particle_kernel::{SimulationConfig, SolverType};
///
/// let json = r#"{ "solver": "sph", "max_particles": 4096 }"#;
/// let config = SimulationConfig::from_json(json).unwrap();
/// assert_eq!(config.solver, SolverType::Sph);
/// assert_eq!(config.world_div, [64, 32, 64]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Center of the simulated box.
    pub world_center: [f32; 3],
    /// Half-size of the simulated box per axis.
    pub world_extent: [f32; 3],
    /// Grid subdivision per axis (rounded up to a power of two).
    pub world_div: [u32; 3],
    /// Active solver.
    pub solver: SolverType,
    /// Lifetime in seconds given to newly added particles.
    pub lifetime: f32,
    /// Velocity multiplier applied every tick (1.0 = no damping).
    pub decelerate: f32,
    /// Stiffness of particle-particle repulsion; also the Tait pressure constant.
    pub pressure_stiffness: f32,
    /// Stiffness of the collider penalty response.
    pub wall_stiffness: f32,
    /// Particle capacity.
    pub max_particles: u32,
    /// Particle radius. The SPH smoothing length equals this value.
    pub particle_size: f32,
    /// SPH rest density.
    pub sph_rest_density: f32,
    /// SPH mass per particle. `None` derives it from the rest density and
    /// particle size, see [`SimulationConfig::particle_mass`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sph_particle_mass: Option<f32>,
    /// Monaghan artificial viscosity coefficient.
    pub sph_viscosity: f32,
    /// Minimum number of cells per parallel work item.
    pub cells_per_task: usize,
    /// Minimum number of particles per parallel work item.
    pub particles_per_task: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            world_center: [0.0, 0.0, 0.0],
            world_extent: [10.24, 5.12, 10.24],
            world_div: [64, 32, 64],
            solver: SolverType::Impulse,
            lifetime: 3600.0,
            decelerate: 1.0,
            pressure_stiffness: 500.0,
            wall_stiffness: 1500.0,
            max_particles: 100_000,
            particle_size: 0.08,
            sph_rest_density: 1000.0,
            sph_particle_mass: None,
            sph_viscosity: 0.1,
            cells_per_task: 256,
            particles_per_task: 2048,
        }
    }
}

impl SimulationConfig {
    /// Decode a configuration from JSON text. Missing fields take defaults.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Encode the configuration as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(ConfigError::Encode)
    }

    /// Clamp every degenerate value in place and return what changed.
    ///
    /// Idempotent: a sanitized config sanitizes to itself with no warnings.
    pub fn sanitize(&mut self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        // `!(x >= min)` also catches NaN.
        if !(self.particle_size >= MIN_PARTICLE_SIZE) {
            warnings.push(ConfigWarning::ParticleSize {
                given: self.particle_size,
                used: MIN_PARTICLE_SIZE,
            });
            self.particle_size = MIN_PARTICLE_SIZE;
        }

        if self.max_particles < MIN_MAX_PARTICLES {
            warnings.push(ConfigWarning::MaxParticles {
                given: self.max_particles,
                used: MIN_MAX_PARTICLES,
            });
            self.max_particles = MIN_MAX_PARTICLES;
        }

        for axis in 0..3 {
            let given = self.world_div[axis];
            let used = given.clamp(1, MAX_WORLD_DIV).next_power_of_two();
            if used != given {
                warnings.push(ConfigWarning::WorldDiv { axis, given, used });
                self.world_div[axis] = used;
            }

            let given = self.world_extent[axis];
            if !(given >= MIN_WORLD_EXTENT) {
                warnings.push(ConfigWarning::WorldExtent {
                    axis,
                    given,
                    used: MIN_WORLD_EXTENT,
                });
                self.world_extent[axis] = MIN_WORLD_EXTENT;
            }
        }

        if self.cells_per_task == 0 {
            warnings.push(ConfigWarning::TaskGranularity { field: "cells_per_task" });
            self.cells_per_task = 1;
        }
        if self.particles_per_task == 0 {
            warnings.push(ConfigWarning::TaskGranularity { field: "particles_per_task" });
            self.particles_per_task = 1;
        }

        warnings
    }

    /// Mass per SPH particle.
    ///
    /// Unless set explicitly, the mass of a cube of rest-density fluid with
    /// edge `h / 1.3`, the lattice spacing at which the Wendland C2 sum
    /// reproduces the rest density.
    pub fn particle_mass(&self) -> f32 {
        self.sph_particle_mass.unwrap_or_else(|| {
            let spacing = self.particle_size / REST_SPACING_RATIO;
            self.sph_rest_density * spacing * spacing * spacing
        })
    }
}
