//! Closed-form references for kernel scenarios.
//!
//! The kernel integrates with semi-implicit Euler at a fixed step, so the
//! discrete solution differs from the continuous one by a known bias. Both are
//! provided so checks can compare against the exact discrete values.

/// Constant-acceleration fall from rest under semi-implicit Euler.
///
/// After `n` ticks of length `dt`:
///
/// ```text
/// v_n = -g dt n
/// y_n - y_0 = -g dt^2 n (n + 1) / 2
/// ```
///
/// The continuous solution is `-g t^2 / 2` with `t = n dt`; the discrete
/// path leads it by `g dt t / 2` because velocity is updated first.
#[derive(Debug, Clone, Copy)]
pub struct FreeFall {
    /// Gravitational acceleration g (m/s^2)
    pub gravity: f64,
    /// Timestep (s)
    pub dt: f64,
}

impl FreeFall {
    /// Fall under `gravity` stepped at `dt`.
    pub fn new(gravity: f64, dt: f64) -> Self {
        Self { gravity, dt }
    }

    /// Vertical velocity after `n` ticks.
    pub fn velocity(&self, n: usize) -> f64 {
        -self.gravity * self.dt * n as f64
    }

    /// Vertical displacement after `n` ticks.
    pub fn displacement(&self, n: usize) -> f64 {
        let n = n as f64;
        -self.gravity * self.dt * self.dt * n * (n + 1.0) / 2.0
    }

    /// Displacement of the continuous solution at time `t`.
    pub fn continuous_displacement(&self, t: f64) -> f64 {
        -0.5 * self.gravity * t * t
    }
}

/// Maximum penetration of a particle hitting a penalty wall.
///
/// A wall that accelerates at `stiffness * depth` is a spring with angular
/// frequency `sqrt(stiffness)`; a particle arriving at `speed` stops after
/// `speed / sqrt(stiffness)`.
pub fn penalty_penetration(speed: f64, stiffness: f64) -> f64 {
    if stiffness <= 0.0 {
        return f64::INFINITY;
    }
    speed.abs() / stiffness.sqrt()
}

/// Speed after falling `height` from rest.
pub fn impact_speed(height: f64, gravity: f64) -> f64 {
    (2.0 * gravity * height.max(0.0)).sqrt()
}
