//! Equation of state for the SPH solvers.
//!
//! The configured `pressure_stiffness` is the Tait constant `B` directly; the
//! numerical speed of sound used by the artificial viscosity is derived from it.

/// Tait exponent.
pub const TAIT_GAMMA: f32 = 7.0;

/// Tait equation of state for a weakly-compressible fluid.
///
/// ```text
/// P = B * ((rho / rho0)^gamma - 1)
/// ```
///
/// Negative pressures (tension) are clamped to zero so that sparse particles
/// never attract each other into clumps.
pub fn tait_pressure(density: f32, rest_density: f32, stiffness: f32, gamma: f32) -> f32 {
    let ratio = density / rest_density;
    (stiffness * (ratio.powf(gamma) - 1.0)).max(0.0)
}

/// Speed of sound implied by a Tait constant: `c = sqrt(B * gamma / rho0)`.
pub fn speed_of_sound(stiffness: f32, rest_density: f32, gamma: f32) -> f32 {
    (stiffness.max(0.0) * gamma / rest_density).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tait_at_rest_density_is_zero() {
        let p = tait_pressure(1000.0, 1000.0, 500.0, TAIT_GAMMA);
        assert!(p.abs() < 1.0e-3, "pressure at rest density should be ~0, got {p}");
    }

    #[test]
    fn tait_positive_when_compressed() {
        let p = tait_pressure(1010.0, 1000.0, 500.0, TAIT_GAMMA);
        assert!(p > 0.0, "compressed fluid should have positive pressure, got {p}");
    }

    #[test]
    fn tension_is_clamped() {
        assert_eq!(tait_pressure(900.0, 1000.0, 500.0, TAIT_GAMMA), 0.0);
    }

    #[test]
    fn speed_of_sound_recovers_stiffness() {
        let c = speed_of_sound(500.0, 1000.0, TAIT_GAMMA);
        let b = 1000.0 * c * c / TAIT_GAMMA;
        assert!((b - 500.0).abs() < 1.0e-2, "B = {b}");
    }
}
