//! Two-body conic helpers: Kepler's equation, element conversion, and orbit invariants.
use std::f64::consts::TAU;

use swingby_core::vector::{self, Vector3};
use thiserror::Error;

/// Classical elements of an elliptic orbit. Angles in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConicElements {
    pub semi_major_axis_km: f64,
    pub eccentricity: f64,
    pub inclination_rad: f64,
    pub raan_rad: f64,
    pub arg_periapsis_rad: f64,
    pub mean_anomaly_rad: f64,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum OrbitError {
    #[error("eccentricity {0} is outside the elliptic range [0, 1)")]
    NotElliptic(f64),
    #[error("semi-major axis {0} km must be positive")]
    InvalidSemiMajorAxis(f64),
    #[error("Kepler's equation did not converge (M = {mean_anomaly}, e = {eccentricity})")]
    KeplerNonConvergence { mean_anomaly: f64, eccentricity: f64 },
}

/// Wrap an angle into `[-π, π)`.
pub fn wrap_pi(angle: f64) -> f64 {
    let wrapped = (angle + std::f64::consts::PI).rem_euclid(TAU);
    wrapped - std::f64::consts::PI
}

/// Solve `E - e sin E = M` for the eccentric anomaly with Newton iterations.
pub fn solve_kepler(mean_anomaly: f64, eccentricity: f64) -> Result<f64, OrbitError> {
    if !(0.0..1.0).contains(&eccentricity) {
        return Err(OrbitError::NotElliptic(eccentricity));
    }
    let m = wrap_pi(mean_anomaly);
    let mut e_anom = if eccentricity < 0.8 { m } else { std::f64::consts::PI.copysign(m) };
    for _ in 0..50 {
        let f = e_anom - eccentricity * e_anom.sin() - m;
        let delta = f / (1.0 - eccentricity * e_anom.cos());
        e_anom -= delta;
        if delta.abs() < 1e-14 {
            return Ok(e_anom);
        }
    }
    Err(OrbitError::KeplerNonConvergence {
        mean_anomaly,
        eccentricity,
    })
}

/// Cartesian position (km) and velocity (km/s) for elliptic elements about a body with GM `mu`.
pub fn elements_to_state(
    elements: &ConicElements,
    mu_km3_s2: f64,
) -> Result<(Vector3, Vector3), OrbitError> {
    let a = elements.semi_major_axis_km;
    let e = elements.eccentricity;
    if !(a > 0.0) {
        return Err(OrbitError::InvalidSemiMajorAxis(a));
    }
    let e_anom = solve_kepler(elements.mean_anomaly_rad, e)?;
    let (sin_e, cos_e) = e_anom.sin_cos();
    let root = (1.0 - e * e).sqrt();

    let r = a * (1.0 - e * cos_e);
    let perifocal_r = [a * (cos_e - e), a * root * sin_e, 0.0];
    let speed_factor = (mu_km3_s2 * a).sqrt() / r;
    let perifocal_v = [-speed_factor * sin_e, speed_factor * root * cos_e, 0.0];

    Ok((
        perifocal_to_inertial(&perifocal_r, elements),
        perifocal_to_inertial(&perifocal_v, elements),
    ))
}

fn perifocal_to_inertial(v: &Vector3, elements: &ConicElements) -> Vector3 {
    let (so, co) = elements.raan_rad.sin_cos();
    let (sw, cw) = elements.arg_periapsis_rad.sin_cos();
    let (si, ci) = elements.inclination_rad.sin_cos();

    let p = [co * cw - so * sw * ci, so * cw + co * sw * ci, sw * si];
    let q = [-co * sw - so * cw * ci, -so * sw + co * cw * ci, cw * si];
    [
        p[0] * v[0] + q[0] * v[1],
        p[1] * v[0] + q[1] * v[1],
        p[2] * v[0] + q[2] * v[1],
    ]
}

/// Specific orbital energy `v²/2 - μ/r` (km²/s²).
pub fn specific_energy(position_km: &Vector3, velocity_km_s: &Vector3, mu_km3_s2: f64) -> f64 {
    0.5 * vector::dot(velocity_km_s, velocity_km_s) - mu_km3_s2 / vector::norm(position_km)
}

/// Specific angular momentum `r × v` (km²/s).
pub fn angular_momentum(position_km: &Vector3, velocity_km_s: &Vector3) -> Vector3 {
    vector::cross(position_km, velocity_km_s)
}

/// Speed of a circular orbit of radius `r`.
pub fn circular_speed(mu_km3_s2: f64, radius_km: f64) -> f64 {
    (mu_km3_s2 / radius_km).sqrt()
}

/// Mean motion `sqrt(μ/a³)` in rad/s.
pub fn mean_motion(mu_km3_s2: f64, semi_major_axis_km: f64) -> f64 {
    (mu_km3_s2 / semi_major_axis_km.powi(3)).sqrt()
}

/// Orbital period in seconds.
pub fn orbital_period(mu_km3_s2: f64, semi_major_axis_km: f64) -> f64 {
    TAU / mean_motion(mu_km3_s2, semi_major_axis_km)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    const MU_SUN: f64 = 1.327_124_400_18e11;

    #[test]
    fn kepler_residual_is_tiny() {
        for &e in &[0.0, 0.2, 0.7, 0.95] {
            for k in 0..12 {
                let m = -3.0 + 0.5 * k as f64;
                let ea = solve_kepler(m, e).expect("converges");
                assert_abs_diff_eq!(ea - e * ea.sin(), wrap_pi(m), epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn circular_state_has_circular_speed() {
        let elements = ConicElements {
            semi_major_axis_km: 1.0e8,
            eccentricity: 0.0,
            inclination_rad: 0.3,
            raan_rad: 1.1,
            arg_periapsis_rad: 0.4,
            mean_anomaly_rad: 2.0,
        };
        let (r, v) = elements_to_state(&elements, MU_SUN).expect("state");
        assert_relative_eq!(vector::norm(&r), 1.0e8, max_relative = 1e-12);
        assert_relative_eq!(
            vector::norm(&v),
            circular_speed(MU_SUN, 1.0e8),
            max_relative = 1e-12
        );
        assert_abs_diff_eq!(vector::dot(&r, &v), 0.0, epsilon = 1e-3);
    }

    #[test]
    fn energy_matches_vis_viva() {
        let elements = ConicElements {
            semi_major_axis_km: 2.0e8,
            eccentricity: 0.3,
            inclination_rad: 0.05,
            raan_rad: 0.2,
            arg_periapsis_rad: 1.0,
            mean_anomaly_rad: 0.7,
        };
        let (r, v) = elements_to_state(&elements, MU_SUN).expect("state");
        assert_relative_eq!(
            specific_energy(&r, &v, MU_SUN),
            -MU_SUN / (2.0 * 2.0e8),
            max_relative = 1e-12
        );
    }

    #[test]
    fn rejects_hyperbolic() {
        assert_eq!(solve_kepler(0.1, 1.2), Err(OrbitError::NotElliptic(1.2)));
    }
}
