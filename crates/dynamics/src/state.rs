//! Layout of the integrated state vector.
//!
//! The vector holds `6 * (1 + N)` components: the spacecraft block first,
//! then one `[x, y, z, vx, vy, vz]` block per tracked planet in a fixed order.
//! Positions are heliocentric kilometres, velocities km/s, both in the
//! simulation frame.

use swingby_core::vector::{self, Vector3};
use swingby_ephem::BodyId;

use crate::DynamicsError;

/// Components per body block.
pub const BLOCK: usize = 6;
/// Slot of the spacecraft block.
pub const SPACECRAFT: usize = 0;

/// Ordering of the tracked planets inside a [`StateVector`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateLayout {
    planets: Vec<BodyId>,
}

impl StateLayout {
    pub fn new(planets: Vec<BodyId>) -> Result<Self, DynamicsError> {
        for (i, body) in planets.iter().enumerate() {
            if *body == BodyId::Sun {
                return Err(DynamicsError::CentralBodyTracked(*body));
            }
            if planets[..i].contains(body) {
                return Err(DynamicsError::DuplicateBody(*body));
            }
        }
        Ok(Self { planets })
    }

    pub fn planets(&self) -> &[BodyId] {
        &self.planets
    }

    /// Number of scalar components in a matching state vector.
    pub fn dimension(&self) -> usize {
        BLOCK * (1 + self.planets.len())
    }

    /// Block index of a tracked planet (the spacecraft occupies slot 0).
    pub fn slot_of(&self, body: BodyId) -> Option<usize> {
        self.planets
            .iter()
            .position(|tracked| *tracked == body)
            .map(|index| index + 1)
    }

    pub fn require_slot(&self, body: BodyId) -> Result<usize, DynamicsError> {
        self.slot_of(body).ok_or(DynamicsError::NotTracked(body))
    }

    pub fn zeros(&self) -> StateVector {
        StateVector(vec![0.0; self.dimension()])
    }

    pub fn check(&self, state: &[f64]) -> Result<(), DynamicsError> {
        if state.len() == self.dimension() {
            Ok(())
        } else {
            Err(DynamicsError::LayoutMismatch {
                expected: self.dimension(),
                found: state.len(),
            })
        }
    }
}

/// Flat state vector; see the module docs for the layout.
#[derive(Debug, Clone, PartialEq)]
pub struct StateVector(Vec<f64>);

impl StateVector {
    pub fn from_vec(components: Vec<f64>) -> Self {
        Self(components)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.0
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn position(&self, slot: usize) -> Vector3 {
        block(&self.0, slot, 0)
    }

    pub fn velocity(&self, slot: usize) -> Vector3 {
        block(&self.0, slot, 3)
    }

    pub fn set_position(&mut self, slot: usize, position_km: Vector3) {
        self.0[slot * BLOCK..slot * BLOCK + 3].copy_from_slice(&position_km);
    }

    pub fn set_velocity(&mut self, slot: usize, velocity_km_s: Vector3) {
        self.0[slot * BLOCK + 3..slot * BLOCK + 6].copy_from_slice(&velocity_km_s);
    }

    /// Add an instantaneous velocity change to the spacecraft. Positions are untouched.
    pub fn apply_impulse(&mut self, delta_v_km_s: &Vector3) {
        let velocity = vector::add(&self.velocity(SPACECRAFT), delta_v_km_s);
        self.set_velocity(SPACECRAFT, velocity);
    }

    /// Distance between the spacecraft and the body in `slot`.
    pub fn spacecraft_distance(&self, slot: usize) -> f64 {
        vector::distance(&self.position(SPACECRAFT), &self.position(slot))
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|c| c.is_finite())
    }
}

#[inline]
pub(crate) fn block(components: &[f64], slot: usize, offset: usize) -> Vector3 {
    let start = slot * BLOCK + offset;
    [components[start], components[start + 1], components[start + 2]]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_follow_planet_order() {
        let layout = StateLayout::new(vec![BodyId::Venus, BodyId::Earth]).expect("layout");
        assert_eq!(layout.dimension(), 18);
        assert_eq!(layout.slot_of(BodyId::Venus), Some(1));
        assert_eq!(layout.slot_of(BodyId::Earth), Some(2));
        assert_eq!(layout.slot_of(BodyId::Mars), None);
    }

    #[test]
    fn rejects_duplicates_and_the_sun() {
        assert_eq!(
            StateLayout::new(vec![BodyId::Mars, BodyId::Mars]),
            Err(DynamicsError::DuplicateBody(BodyId::Mars))
        );
        assert_eq!(
            StateLayout::new(vec![BodyId::Sun]),
            Err(DynamicsError::CentralBodyTracked(BodyId::Sun))
        );
    }

    #[test]
    fn impulse_only_changes_spacecraft_velocity() {
        let layout = StateLayout::new(vec![BodyId::Earth]).expect("layout");
        let mut state = layout.zeros();
        state.set_position(SPACECRAFT, [1.0, 2.0, 3.0]);
        state.set_velocity(SPACECRAFT, [4.0, 5.0, 6.0]);
        state.set_velocity(1, [7.0, 8.0, 9.0]);
        let before = state.clone();

        state.apply_impulse(&[0.5, -0.5, 0.25]);

        assert_eq!(state.position(SPACECRAFT), before.position(SPACECRAFT));
        assert_eq!(state.velocity(SPACECRAFT), [4.5, 4.5, 6.25]);
        assert_eq!(state.velocity(1), before.velocity(1));
    }
}
