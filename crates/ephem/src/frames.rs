//! Reference frames and the rotations between them.
//!
//! The simulation frame is heliocentric ecliptic J2000. Providers may hand
//! back states in equatorial J2000 (ICRF-aligned); those are rotated about the
//! x axis by the J2000 obliquity before they reach the integrator.

use serde::Serialize;
use swingby_core::units::arcsec_to_rad;
use swingby_core::vector::Vector3;

use crate::BodyState;

/// Mean obliquity of the ecliptic at J2000 (IAU 1976), in arcseconds.
pub const OBLIQUITY_J2000_ARCSEC: f64 = 84_381.448;

/// Inertial frames a provider may report in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Frame {
    EclipticJ2000,
    EquatorialJ2000,
}

/// Frame every state vector is integrated in.
pub const SIMULATION_FRAME: Frame = Frame::EclipticJ2000;

fn obliquity() -> (f64, f64) {
    arcsec_to_rad(OBLIQUITY_J2000_ARCSEC).sin_cos()
}

/// Rotate a vector expressed in `source` into the simulation frame.
pub fn to_simulation_frame(v: &Vector3, source: Frame) -> Vector3 {
    match source {
        Frame::EclipticJ2000 => *v,
        Frame::EquatorialJ2000 => {
            let (s, c) = obliquity();
            [v[0], c * v[1] + s * v[2], -s * v[1] + c * v[2]]
        }
    }
}

/// Rotate a simulation-frame vector into `target`.
pub fn from_simulation_frame(v: &Vector3, target: Frame) -> Vector3 {
    match target {
        Frame::EclipticJ2000 => *v,
        Frame::EquatorialJ2000 => {
            let (s, c) = obliquity();
            [v[0], c * v[1] - s * v[2], s * v[1] + c * v[2]]
        }
    }
}

impl BodyState {
    /// The same state re-expressed in the simulation frame.
    pub fn in_simulation_frame(&self) -> BodyState {
        BodyState {
            position_km: to_simulation_frame(&self.position_km, self.frame),
            velocity_km_s: to_simulation_frame(&self.velocity_km_s, self.frame),
            frame: SIMULATION_FRAME,
        }
    }
}

/// Rotate `v` about the ecliptic pole by `omega * elapsed_s` (counter-clockwise).
///
/// Passing the negative mean motion of a planet yields coordinates in a frame
/// co-rotating with that planet.
pub fn to_rotating_frame(v: &Vector3, omega_rad_s: f64, elapsed_s: f64) -> Vector3 {
    let (s, c) = (omega_rad_s * elapsed_s).sin_cos();
    [v[0] * c - v[1] * s, v[0] * s + v[1] * c, v[2]]
}
