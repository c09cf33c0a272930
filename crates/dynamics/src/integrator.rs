//! Adaptive embedded Runge-Kutta propagation of one mission segment.
//!
//! Steps are sized from the embedded error estimate (RMS norm over all
//! components, weighted by `atol + rtol * |y|`). With interval sampling the
//! step that would overshoot the next sample epoch is shortened to land on it
//! exactly, and the previous step size is restored afterwards. A sign change
//! of the event function from positive to non-positive inside an accepted
//! step is refined with Brent's method by re-taking a single step from the
//! step start, so the located state carries the same local accuracy as any
//! other accepted step.

use serde::Serialize;
use swingby_core::time::Epoch;
use swingby_ephem::BodyId;
use thiserror::Error;

use crate::bodies::BodyTable;
use crate::eom::EquationsOfMotion;
use crate::events::{EventFunction, ImpactDetector, brent};
use crate::rk::{Method, Tableau};
use crate::state::{StateLayout, StateVector};
use crate::DynamicsError;

const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 5.0;
const MAX_EVENT_ITERATIONS: usize = 100;

/// When output samples are recorded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Sampling {
    /// Every `n` seconds from the segment start, plus the segment end.
    Interval(f64),
    /// After every accepted solver step.
    EveryStep,
}

/// Tolerances and step limits for the segment integrator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntegratorOptions {
    pub method: Method,
    pub rtol: f64,
    pub atol: f64,
    pub initial_step_s: f64,
    pub min_step_s: f64,
    pub max_step_s: f64,
    /// Cap on step attempts (accepted plus rejected) per segment.
    pub max_steps: usize,
    pub sampling: Sampling,
    /// Width of the time bracket an impact epoch is refined to.
    pub event_tolerance_s: f64,
}

impl Default for IntegratorOptions {
    fn default() -> Self {
        Self {
            method: Method::DormandPrince45,
            rtol: 1e-12,
            atol: 1e-12,
            initial_step_s: 60.0,
            min_step_s: 1e-6,
            max_step_s: 5.0 * 86_400.0,
            max_steps: 1_000_000,
            sampling: Sampling::Interval(86_400.0),
            event_tolerance_s: 1e-3,
        }
    }
}

/// Invalid integrator setting.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("integrator option `{field}` {reason}")]
pub struct OptionsError {
    pub field: &'static str,
    pub reason: String,
}

impl IntegratorOptions {
    pub fn validate(&self) -> Result<(), OptionsError> {
        let positive = |field: &'static str, value: f64| {
            if value > 0.0 && value.is_finite() {
                Ok(())
            } else {
                Err(OptionsError {
                    field,
                    reason: format!("must be positive and finite (got {value})"),
                })
            }
        };
        positive("rtol", self.rtol)?;
        positive("initial_step_s", self.initial_step_s)?;
        positive("min_step_s", self.min_step_s)?;
        positive("max_step_s", self.max_step_s)?;
        positive("event_tolerance_s", self.event_tolerance_s)?;
        if !(self.atol >= 0.0 && self.atol.is_finite()) {
            return Err(OptionsError {
                field: "atol",
                reason: format!("must be non-negative (got {})", self.atol),
            });
        }
        if self.min_step_s > self.max_step_s {
            return Err(OptionsError {
                field: "min_step_s",
                reason: format!("exceeds max_step_s ({} > {})", self.min_step_s, self.max_step_s),
            });
        }
        if self.max_steps == 0 {
            return Err(OptionsError {
                field: "max_steps",
                reason: "must be at least 1".to_string(),
            });
        }
        if let Sampling::Interval(interval) = self.sampling {
            positive("sample_interval", interval)?;
        }
        Ok(())
    }
}

/// Bodies pulling on the spacecraft and bodies watched for impact during a segment.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActiveBodies {
    pub perturbers: Vec<BodyId>,
    pub monitored: Vec<BodyId>,
}

impl ActiveBodies {
    /// The same bodies perturb and are monitored.
    pub fn all(bodies: &[BodyId]) -> Self {
        Self {
            perturbers: bodies.to_vec(),
            monitored: bodies.to_vec(),
        }
    }
}

/// One recorded point of a segment.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Seconds since the segment start.
    pub elapsed_s: f64,
    pub epoch: Epoch,
    pub state: StateVector,
}

/// Terminal surface crossing.
#[derive(Debug, Clone, PartialEq)]
pub struct ImpactEvent {
    pub body: BodyId,
    pub epoch: Epoch,
    pub elapsed_s: f64,
    pub state: StateVector,
    /// Residual clearance at the located epoch (close to zero).
    pub clearance_km: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct IntegrationStats {
    pub accepted_steps: usize,
    pub rejected_steps: usize,
    pub evaluations: usize,
}

/// Output of a segment: samples from start to the final epoch, and the impact if one ended it.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentSolution {
    pub samples: Vec<Sample>,
    pub impact: Option<ImpactEvent>,
    pub stats: IntegrationStats,
}

impl SegmentSolution {
    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }
}

/// Reason a segment could not be integrated.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum IntegrationFailure {
    #[error("dynamics evaluation failed: {0}")]
    Dynamics(#[from] DynamicsError),
    #[error("state became non-finite")]
    NonFinite,
    #[error("step size fell below the minimum ({step_s:.3e} s)")]
    StepSizeUnderflow { step_s: f64 },
    #[error("exceeded {max_steps} step attempts")]
    StepLimit { max_steps: usize },
    #[error("segment duration {duration_s} s must be positive and finite")]
    InvalidDuration { duration_s: f64 },
    #[error("impact epoch could not be refined")]
    EventLocation,
    #[error("invalid options: {0}")]
    Options(#[from] OptionsError),
}

/// Fatal integration error with the last state that was accepted.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("integration failed {elapsed_s:.3} s into the segment: {kind}")]
pub struct IntegrationError {
    #[source]
    pub kind: IntegrationFailure,
    pub elapsed_s: f64,
    pub last_state: StateVector,
}

impl IntegrationError {
    fn new(kind: impl Into<IntegrationFailure>, elapsed_s: f64, last_state: &[f64]) -> Self {
        Self {
            kind: kind.into(),
            elapsed_s,
            last_state: StateVector::from_vec(last_state.to_vec()),
        }
    }
}

/// Integrates segments over a fixed body table and state layout.
#[derive(Debug, Clone, Copy)]
pub struct SegmentIntegrator<'a> {
    bodies: &'a BodyTable,
    layout: &'a StateLayout,
    options: &'a IntegratorOptions,
}

impl<'a> SegmentIntegrator<'a> {
    pub fn new(
        bodies: &'a BodyTable,
        layout: &'a StateLayout,
        options: &'a IntegratorOptions,
    ) -> Self {
        Self {
            bodies,
            layout,
            options,
        }
    }

    /// Propagate `initial` for `duration_s` seconds from `start`.
    ///
    /// Returns early with [`SegmentSolution::impact`] set when the spacecraft
    /// reaches the surface of a monitored planet. A segment that starts on or
    /// inside a monitored surface ends immediately.
    pub fn integrate(
        &self,
        initial: &StateVector,
        start: Epoch,
        duration_s: f64,
        active: &ActiveBodies,
    ) -> Result<SegmentSolution, IntegrationError> {
        let y0 = initial.as_slice();
        let fail_at_start = |kind: IntegrationFailure| IntegrationError::new(kind, 0.0, y0);

        self.options
            .validate()
            .map_err(|e| fail_at_start(e.into()))?;
        self.layout
            .check(y0)
            .map_err(|e| fail_at_start(e.into()))?;
        let eom = EquationsOfMotion::new(self.bodies, self.layout, &active.perturbers)
            .map_err(|e| fail_at_start(e.into()))?;
        let detector = ImpactDetector::new(self.bodies, self.layout, &active.monitored)
            .map_err(|e| fail_at_start(e.into()))?;

        let mut run = Propagation {
            stepper: Stepper::new(&eom, self.options.method.tableau(), y0.len()),
            event: &detector,
            options: self.options,
        };
        let raw = run.propagate(y0, duration_s)?;
        let stats = IntegrationStats {
            evaluations: run.stepper.evaluations,
            ..raw.stats
        };

        let samples: Vec<Sample> = raw
            .samples
            .into_iter()
            .map(|(elapsed_s, y)| Sample {
                elapsed_s,
                epoch: start + elapsed_s,
                state: StateVector::from_vec(y),
            })
            .collect();

        let impact = match raw.crossing {
            Some(elapsed_s) => {
                let state = samples
                    .last()
                    .map(|s| s.state.clone())
                    .unwrap_or_else(|| initial.clone());
                let (body, clearance_km) = detector.nearest(state.as_slice()).ok_or_else(|| {
                    IntegrationError::new(
                        IntegrationFailure::EventLocation,
                        elapsed_s,
                        state.as_slice(),
                    )
                })?;
                log::info!(
                    "impact with {body} at {} ({elapsed_s:.3} s into segment, clearance {clearance_km:.3e} km)",
                    start + elapsed_s
                );
                Some(ImpactEvent {
                    body,
                    epoch: start + elapsed_s,
                    elapsed_s,
                    state,
                    clearance_km,
                })
            }
            None => None,
        };

        log::debug!(
            "segment from {start}: {} accepted, {} rejected steps, {} evaluations, {} samples",
            stats.accepted_steps,
            stats.rejected_steps,
            stats.evaluations,
            samples.len()
        );
        Ok(SegmentSolution {
            samples,
            impact,
            stats,
        })
    }
}

struct RawSolution {
    samples: Vec<(f64, Vec<f64>)>,
    crossing: Option<f64>,
    stats: IntegrationStats,
}

/// Single-step machinery: stage buffers and the evaluation counter.
struct Stepper<'e> {
    eom: &'e EquationsOfMotion,
    tableau: Tableau,
    stages: Vec<Vec<f64>>,
    scratch: Vec<f64>,
    evaluations: usize,
}

impl<'e> Stepper<'e> {
    fn new(eom: &'e EquationsOfMotion, tableau: Tableau, dimension: usize) -> Self {
        Self {
            eom,
            tableau,
            stages: vec![vec![0.0; dimension]; tableau.stages],
            scratch: vec![0.0; dimension],
            evaluations: 0,
        }
    }

    fn derivative(&mut self, t: f64, y: &[f64]) -> Result<Vec<f64>, DynamicsError> {
        let mut out = vec![0.0; y.len()];
        self.eom.derivative(t, y, &mut out)?;
        self.evaluations += 1;
        Ok(out)
    }

    /// Derivative at the end of the last step, available when the tableau is FSAL.
    fn reusable_end_derivative(&self) -> Option<Vec<f64>> {
        if self.tableau.fsal {
            self.stages.last().cloned()
        } else {
            None
        }
    }

    /// One step of size `h` from `(t, y)` with `f0 = f(t, y)`.
    /// Returns the propagated state and the weighted RMS error estimate.
    fn step(
        &mut self,
        t: f64,
        y: &[f64],
        f0: &[f64],
        h: f64,
        options: &IntegratorOptions,
    ) -> Result<(Vec<f64>, f64), DynamicsError> {
        let n = y.len();
        self.stages[0].copy_from_slice(f0);
        for stage in 1..self.tableau.stages {
            let row = self.tableau.row(stage);
            for i in 0..n {
                let mut acc = 0.0;
                for (j, a) in row.iter().enumerate() {
                    acc += a * self.stages[j][i];
                }
                self.scratch[i] = y[i] + h * acc;
            }
            let ti = t + self.tableau.node(stage) * h;
            self.eom
                .derivative(ti, &self.scratch, &mut self.stages[stage])?;
            self.evaluations += 1;
        }

        let mut next = vec![0.0; n];
        let mut sum_sq = 0.0;
        for i in 0..n {
            let mut high = 0.0;
            let mut low = 0.0;
            for (k, stage) in self.stages.iter().enumerate() {
                high += self.tableau.b[k] * stage[i];
                low += self.tableau.b_star[k] * stage[i];
            }
            next[i] = y[i] + h * high;
            let scale = options.atol + options.rtol * y[i].abs().max(next[i].abs());
            let err = h * (high - low) / scale;
            sum_sq += err * err;
        }
        Ok((next, (sum_sq / n as f64).sqrt()))
    }
}

struct Propagation<'e, 'o, E: EventFunction> {
    stepper: Stepper<'e>,
    event: &'o E,
    options: &'o IntegratorOptions,
}

impl<E: EventFunction> Propagation<'_, '_, E> {
    fn propagate(&mut self, y0: &[f64], duration_s: f64) -> Result<RawSolution, IntegrationError> {
        if !(duration_s > 0.0 && duration_s.is_finite()) {
            return Err(IntegrationError::new(
                IntegrationFailure::InvalidDuration { duration_s },
                0.0,
                y0,
            ));
        }
        if !y0.iter().all(|c| c.is_finite()) {
            return Err(IntegrationError::new(IntegrationFailure::NonFinite, 0.0, y0));
        }

        let options = self.options;
        let exponent = -1.0 / f64::from(self.stepper.tableau.order);
        let mut stats = IntegrationStats::default();
        let mut samples = vec![(0.0, y0.to_vec())];

        let mut g = self.event.eval(0.0, y0);
        if g <= 0.0 {
            return Ok(RawSolution {
                samples,
                crossing: Some(0.0),
                stats,
            });
        }

        let mut t = 0.0;
        let mut y = y0.to_vec();
        let mut f = self
            .stepper
            .derivative(t, &y)
            .map_err(|e| IntegrationError::new(e, t, &y))?;
        let mut h = options
            .initial_step_s
            .min(options.max_step_s)
            .min(duration_s);
        let mut sample_index = 1usize;
        let mut next_sample = self.sample_epoch(sample_index, duration_s);

        loop {
            let boundary = next_sample;
            let remaining = boundary - t;
            let mut clipped = h >= remaining;
            let mut h_try = if clipped { remaining } else { h };

            let (y_new, err) = loop {
                if stats.accepted_steps + stats.rejected_steps >= options.max_steps {
                    return Err(IntegrationError::new(
                        IntegrationFailure::StepLimit {
                            max_steps: options.max_steps,
                        },
                        t,
                        &y,
                    ));
                }
                let (candidate, err) = self
                    .stepper
                    .step(t, &y, &f, h_try, options)
                    .map_err(|e| IntegrationError::new(e, t, &y))?;
                if err.is_nan() {
                    return Err(IntegrationError::new(IntegrationFailure::NonFinite, t, &y));
                }
                if err <= 1.0 {
                    break (candidate, err);
                }
                stats.rejected_steps += 1;
                let factor = (SAFETY * err.powf(exponent)).clamp(MIN_FACTOR, 1.0);
                h_try *= factor;
                clipped = false;
                log::trace!("rejected step at t+{t:.3} s (err {err:.3e}), retrying with {h_try:.3e} s");
                if h_try < options.min_step_s {
                    return Err(IntegrationError::new(
                        IntegrationFailure::StepSizeUnderflow { step_s: h_try },
                        t,
                        &y,
                    ));
                }
            };

            if !y_new.iter().all(|c| c.is_finite()) {
                return Err(IntegrationError::new(IntegrationFailure::NonFinite, t, &y));
            }
            let t_new = if clipped { boundary } else { t + h_try };
            let g_new = self.event.eval(t_new, &y_new);

            if g > 0.0 && g_new <= 0.0 {
                stats.accepted_steps += 1;
                let (tau, y_event) = self.locate(t, &y, &f, h_try, g, g_new)?;
                samples.push((t + tau, y_event));
                return Ok(RawSolution {
                    samples,
                    crossing: Some(t + tau),
                    stats,
                });
            }

            let f_new = match self.stepper.reusable_end_derivative() {
                Some(f_end) => f_end,
                None => self
                    .stepper
                    .derivative(t_new, &y_new)
                    .map_err(|e| IntegrationError::new(e, t, &y))?,
            };
            stats.accepted_steps += 1;
            t = t_new;
            y = y_new;
            f = f_new;
            g = g_new;

            let proposed = if err == 0.0 {
                h_try * MAX_FACTOR
            } else {
                h_try * (SAFETY * err.powf(exponent)).clamp(MIN_FACTOR, MAX_FACTOR)
            };
            let natural = if clipped { h.max(proposed) } else { proposed };
            h = natural.min(options.max_step_s);

            let finished = clipped && boundary >= duration_s;
            match options.sampling {
                Sampling::EveryStep => samples.push((t, y.clone())),
                Sampling::Interval(_) if clipped => samples.push((t, y.clone())),
                Sampling::Interval(_) => {}
            }
            if finished {
                return Ok(RawSolution {
                    samples,
                    crossing: None,
                    stats,
                });
            }
            if clipped {
                sample_index += 1;
                next_sample = self.sample_epoch(sample_index, duration_s);
            }
        }
    }

    /// Elapsed time of the `index`-th output sample, capped at the segment end.
    fn sample_epoch(&self, index: usize, duration_s: f64) -> f64 {
        match self.options.sampling {
            Sampling::Interval(interval) => (interval * index as f64).min(duration_s),
            Sampling::EveryStep => duration_s,
        }
    }

    /// Refine the crossing inside the step `[t, t + h]` by re-stepping from `t`.
    fn locate(
        &mut self,
        t: f64,
        y: &[f64],
        f: &[f64],
        h: f64,
        g_start: f64,
        g_end: f64,
    ) -> Result<(f64, Vec<f64>), IntegrationError> {
        let options = self.options;
        let event = self.event;
        let stepper = &mut self.stepper;
        let tau = brent(
            |tau| {
                stepper
                    .step(t, y, f, tau, options)
                    .map(|(state, _)| event.eval(t + tau, &state))
            },
            0.0,
            h,
            g_start,
            g_end,
            options.event_tolerance_s,
            MAX_EVENT_ITERATIONS,
        )
        .map_err(|e| IntegrationError::new(e, t, y))?
        .ok_or_else(|| IntegrationError::new(IntegrationFailure::EventLocation, t, y))?;

        let (state, _) = stepper
            .step(t, y, f, tau, options)
            .map_err(|e| IntegrationError::new(e, t, y))?;
        Ok((tau, state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SPACECRAFT;
    use rstest::rstest;
    use swingby_core::constants::AU_KM;

    #[test]
    fn default_options_are_valid() {
        IntegratorOptions::default().validate().expect("defaults");
    }

    #[test]
    fn options_report_the_offending_field() {
        let options = IntegratorOptions {
            min_step_s: 10.0,
            max_step_s: 1.0,
            ..IntegratorOptions::default()
        };
        assert_eq!(options.validate().unwrap_err().field, "min_step_s");
        let options = IntegratorOptions {
            sampling: Sampling::Interval(0.0),
            ..IntegratorOptions::default()
        };
        assert_eq!(options.validate().unwrap_err().field, "sample_interval");
    }

    #[rstest]
    #[case(Method::DormandPrince45)]
    #[case(Method::Fehlberg45)]
    fn end_derivative_is_reused_only_for_fsal_methods(#[case] method: Method) {
        let bodies = BodyTable::builtin().expect("bodies");
        let layout = StateLayout::new(Vec::new()).expect("layout");
        let mu = bodies.central().mu_km3_s2;
        let mut initial = layout.zeros();
        initial.set_position(SPACECRAFT, [AU_KM, 0.0, 0.0]);
        initial.set_velocity(SPACECRAFT, [0.0, (mu / AU_KM).sqrt(), 0.0]);
        let options = IntegratorOptions {
            method,
            ..IntegratorOptions::default()
        };

        let solution = SegmentIntegrator::new(&bodies, &layout, &options)
            .integrate(&initial, Epoch::J2000, 20.0 * 86_400.0, &ActiveBodies::default())
            .expect("integration");

        let stats = solution.stats;
        let attempts = stats.accepted_steps + stats.rejected_steps;
        let per_attempt = method.tableau().stages - 1;
        let expected = if method.tableau().fsal {
            1 + per_attempt * attempts
        } else {
            1 + per_attempt * attempts + stats.accepted_steps
        };
        assert!(stats.accepted_steps > 0);
        assert_eq!(stats.evaluations, expected);
    }
}
