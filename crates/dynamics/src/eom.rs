//! Equations of motion for the spacecraft and the tracked planets.
//!
//! Planets follow two-body motion about the central body only. The spacecraft
//! feels the central body plus the planets active in the current segment; it
//! exerts no force on anything.

use swingby_core::vector::{self, Vector3};
use swingby_ephem::BodyId;

use crate::bodies::BodyTable;
use crate::state::{BLOCK, SPACECRAFT, StateLayout, block};
use crate::DynamicsError;

/// Separation (km) below which a point-mass term is treated as singular.
pub const SINGULARITY_DISTANCE_KM: f64 = 1e-3;

#[derive(Debug, Clone, Copy)]
struct Perturber {
    body: BodyId,
    slot: usize,
    mu_km3_s2: f64,
}

/// Derivative evaluator for one segment's active body set.
#[derive(Debug, Clone)]
pub struct EquationsOfMotion {
    central: BodyId,
    central_mu_km3_s2: f64,
    dimension: usize,
    perturbers: Vec<Perturber>,
}

impl EquationsOfMotion {
    /// `active` must be tracked in `layout` and present in `bodies`.
    pub fn new(
        bodies: &BodyTable,
        layout: &StateLayout,
        active: &[BodyId],
    ) -> Result<Self, DynamicsError> {
        let mut perturbers: Vec<Perturber> = Vec::with_capacity(active.len());
        for &body in active {
            if perturbers.iter().any(|p| p.body == body) {
                return Err(DynamicsError::DuplicateBody(body));
            }
            let constants = bodies.require(body)?;
            let slot = layout.require_slot(body)?;
            perturbers.push(Perturber {
                body,
                slot,
                mu_km3_s2: constants.mu_km3_s2,
            });
        }
        let central = bodies.central();
        Ok(Self {
            central: central.id,
            central_mu_km3_s2: central.mu_km3_s2,
            dimension: layout.dimension(),
            perturbers,
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Bodies pulling on the spacecraft besides the central body.
    pub fn active(&self) -> impl Iterator<Item = BodyId> + '_ {
        self.perturbers.iter().map(|p| p.body)
    }

    /// Write `d(state)/dt` into `out`.
    ///
    /// The system is autonomous; `_t` is accepted to keep the usual ODE signature.
    pub fn derivative(&self, _t: f64, state: &[f64], out: &mut [f64]) -> Result<(), DynamicsError> {
        if state.len() != self.dimension || out.len() != self.dimension {
            return Err(DynamicsError::LayoutMismatch {
                expected: self.dimension,
                found: state.len().min(out.len()),
            });
        }
        let blocks = self.dimension / BLOCK;
        for slot in 0..blocks {
            let base = slot * BLOCK;
            out[base..base + 3].copy_from_slice(&state[base + 3..base + 6]);
        }

        for slot in 1..blocks {
            let position = block(state, slot, 0);
            let acceleration = self.central_pull(&position)?;
            out[slot * BLOCK + 3..slot * BLOCK + 6].copy_from_slice(&acceleration);
        }

        let acceleration = self.spacecraft_acceleration(state)?;
        out[SPACECRAFT * BLOCK + 3..SPACECRAFT * BLOCK + 6].copy_from_slice(&acceleration);
        Ok(())
    }

    /// Total acceleration on the spacecraft for the given state.
    pub fn spacecraft_acceleration(&self, state: &[f64]) -> Result<Vector3, DynamicsError> {
        let position = block(state, SPACECRAFT, 0);
        let mut acceleration = self.central_pull(&position)?;
        for perturber in &self.perturbers {
            let toward = vector::sub(&block(state, perturber.slot, 0), &position);
            let pull = point_mass(&toward, perturber.mu_km3_s2, perturber.body)?;
            acceleration = vector::add(&acceleration, &pull);
        }
        Ok(acceleration)
    }

    fn central_pull(&self, position: &Vector3) -> Result<Vector3, DynamicsError> {
        let toward = vector::sub(&[0.0; 3], position);
        point_mass(&toward, self.central_mu_km3_s2, self.central)
    }
}

/// `mu * d / |d|³` where `d` points from the attracted point to the attractor.
fn point_mass(toward: &Vector3, mu_km3_s2: f64, body: BodyId) -> Result<Vector3, DynamicsError> {
    let distance_km = vector::norm(toward);
    if !(distance_km >= SINGULARITY_DISTANCE_KM) {
        return Err(DynamicsError::Singularity { body, distance_km });
    }
    Ok(vector::scale(toward, mu_km3_s2 / (distance_km * distance_km * distance_km)))
}
