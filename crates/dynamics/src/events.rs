//! Surface-impact detection and root location.

use swingby_core::vector;
use swingby_ephem::BodyId;

use crate::bodies::BodyTable;
use crate::state::{SPACECRAFT, StateLayout, block};
use crate::DynamicsError;

/// Scalar function of the state whose zero crossing terminates integration.
///
/// Integration stops when the value goes from positive to zero or negative.
pub trait EventFunction {
    fn eval(&self, t: f64, state: &[f64]) -> f64;
}

#[derive(Debug, Clone, Copy)]
struct Monitored {
    body: BodyId,
    slot: usize,
    radius_km: f64,
}

/// Minimum surface clearance between the spacecraft and the monitored planets.
///
/// With nothing monitored the clearance is `+inf` and never crosses zero.
#[derive(Debug, Clone, Default)]
pub struct ImpactDetector {
    monitored: Vec<Monitored>,
}

impl ImpactDetector {
    pub fn new(
        bodies: &BodyTable,
        layout: &StateLayout,
        monitored: &[BodyId],
    ) -> Result<Self, DynamicsError> {
        let mut entries: Vec<Monitored> = Vec::with_capacity(monitored.len());
        for &body in monitored {
            if entries.iter().any(|m| m.body == body) {
                return Err(DynamicsError::DuplicateBody(body));
            }
            entries.push(Monitored {
                body,
                slot: layout.require_slot(body)?,
                radius_km: bodies.require(body)?.radius_km,
            });
        }
        Ok(Self { monitored: entries })
    }

    pub fn is_empty(&self) -> bool {
        self.monitored.is_empty()
    }

    pub fn bodies(&self) -> impl Iterator<Item = BodyId> + '_ {
        self.monitored.iter().map(|m| m.body)
    }

    /// `min_p (|r_sc - r_p| - R_p)` in km.
    pub fn clearance(&self, state: &[f64]) -> f64 {
        self.nearest(state)
            .map(|(_, clearance)| clearance)
            .unwrap_or(f64::INFINITY)
    }

    /// Monitored body with the smallest clearance, and that clearance.
    pub fn nearest(&self, state: &[f64]) -> Option<(BodyId, f64)> {
        let spacecraft = block(state, SPACECRAFT, 0);
        self.monitored
            .iter()
            .map(|m| {
                let distance = vector::distance(&spacecraft, &block(state, m.slot, 0));
                (m.body, distance - m.radius_km)
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }
}

impl EventFunction for ImpactDetector {
    fn eval(&self, _t: f64, state: &[f64]) -> f64 {
        self.clearance(state)
    }
}

/// Brent's method on a bracket `[a, b]` with `f(a)` and `f(b)` of opposite sign.
///
/// Returns `Ok(None)` when the bracket is invalid or `max_iter` is exhausted.
/// Errors raised by `f` are passed through.
pub fn brent<F, E>(
    mut f: F,
    mut a: f64,
    mut b: f64,
    mut fa: f64,
    mut fb: f64,
    tol: f64,
    max_iter: usize,
) -> Result<Option<f64>, E>
where
    F: FnMut(f64) -> Result<f64, E>,
{
    if fa == 0.0 {
        return Ok(Some(a));
    }
    if fb == 0.0 {
        return Ok(Some(b));
    }
    if (fa > 0.0) == (fb > 0.0) || fa.is_nan() || fb.is_nan() {
        return Ok(None);
    }

    let mut c = b;
    let mut fc = fb;
    let mut d = b - a;
    let mut e = d;
    for _ in 0..max_iter {
        if (fb > 0.0) == (fc > 0.0) {
            c = a;
            fc = fa;
            d = b - a;
            e = d;
        }
        if fc.abs() < fb.abs() {
            a = b;
            b = c;
            c = a;
            fa = fb;
            fb = fc;
            fc = fa;
        }
        let tol1 = 2.0 * f64::EPSILON * b.abs() + 0.5 * tol;
        let xm = 0.5 * (c - b);
        if xm.abs() <= tol1 || fb == 0.0 {
            return Ok(Some(b));
        }
        if e.abs() >= tol1 && fa.abs() > fb.abs() {
            // Inverse quadratic interpolation, falling back to secant.
            let s = fb / fa;
            let (mut p, mut q) = if a == c {
                (2.0 * xm * s, 1.0 - s)
            } else {
                let q = fa / fc;
                let r = fb / fc;
                (
                    s * (2.0 * xm * q * (q - r) - (b - a) * (r - 1.0)),
                    (q - 1.0) * (r - 1.0) * (s - 1.0),
                )
            };
            if p > 0.0 {
                q = -q;
            }
            p = p.abs();
            let min1 = 3.0 * xm * q - (tol1 * q).abs();
            let min2 = (e * q).abs();
            if 2.0 * p < min1.min(min2) {
                e = d;
                d = p / q;
            } else {
                d = xm;
                e = d;
            }
        } else {
            d = xm;
            e = d;
        }
        a = b;
        fa = fb;
        b += if d.abs() > tol1 { d } else { tol1.copysign(xm) };
        fb = f(b)?;
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::convert::Infallible;

    #[test]
    fn brent_finds_cubic_root() {
        let f = |x: f64| Ok::<_, Infallible>(x * x * x - 2.0 * x - 5.0);
        let root = brent(f, 2.0, 3.0, -1.0, 16.0, 1e-12, 100)
            .expect("infallible")
            .expect("converged");
        assert_abs_diff_eq!(root, 2.094_551_481_542_326_5, epsilon = 1e-10);
    }

    #[test]
    fn brent_rejects_bad_bracket() {
        let f = |x: f64| Ok::<_, Infallible>(x * x + 1.0);
        assert_eq!(brent(f, -1.0, 1.0, 2.0, 2.0, 1e-9, 50), Ok(None));
    }

    #[test]
    fn clearance_uses_the_nearest_surface() {
        let bodies = BodyTable::builtin().expect("table");
        let layout = StateLayout::new(vec![BodyId::Venus, BodyId::Earth]).expect("layout");
        let detector =
            ImpactDetector::new(&bodies, &layout, &[BodyId::Venus, BodyId::Earth]).expect("detector");
        let mut state = layout.zeros();
        state.set_position(1, [1.0e8, 0.0, 0.0]);
        state.set_position(2, [1.5e8, 0.0, 0.0]);
        state.set_position(0, [1.5e8, 10_000.0, 0.0]);

        let (body, clearance) = detector.nearest(state.as_slice()).expect("monitored");
        assert_eq!(body, BodyId::Earth);
        assert_abs_diff_eq!(clearance, 10_000.0 - 6_371.0, epsilon = 1e-6);
        assert_eq!(detector.eval(0.0, state.as_slice()), clearance);
    }

    #[test]
    fn empty_detector_never_fires() {
        assert_eq!(ImpactDetector::default().clearance(&[0.0; 6]), f64::INFINITY);
    }
}
