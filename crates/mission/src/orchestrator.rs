//! Segment-by-segment mission execution.
//!
//! The orchestrator walks `Init -> Running(0) -> ... -> Running(n-1)` and ends
//! in `Complete`, or in `Terminated` as soon as a segment reports an impact.
//! Every segment re-seeds the planets from the ephemeris at its start epoch,
//! carries the spacecraft state over from the previous segment, and applies
//! that segment's impulse before integrating.

use swingby_core::time::Epoch;
use swingby_core::vector::{self, Vector3};
use swingby_dynamics::{
    ActiveBodies, BodyTable, ImpactEvent, SPACECRAFT, SegmentIntegrator, SegmentSolution,
    StateLayout, StateVector,
};
use swingby_ephem::{BodyId, BodyState, EphemerisProvider, simulation_state};

use crate::plan::{Launch, MissionPlan, PlanError};
use crate::trajectory::{DistanceSample, MissionTrajectory, distance_series};
use crate::{MissionError, MissionFailure};

/// How a mission ended. Impact is an outcome, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum MissionOutcome {
    Complete,
    TerminatedByImpact(ImpactEvent),
}

impl MissionOutcome {
    pub fn impact(&self) -> Option<&ImpactEvent> {
        match self {
            MissionOutcome::TerminatedByImpact(event) => Some(event),
            MissionOutcome::Complete => None,
        }
    }
}

/// Inputs and results of one executed segment.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentRecord {
    pub index: usize,
    pub start: Epoch,
    pub planned_duration_s: f64,
    pub delta_v_km_s: Vector3,
    pub active: ActiveBodies,
    /// Planets dropped because the spacecraft started inside them.
    pub excluded: Vec<BodyId>,
    /// Post-maneuver state the segment was integrated from.
    pub seed: StateVector,
    pub solution: SegmentSolution,
}

impl SegmentRecord {
    /// Epoch of the last sample (segment end or impact).
    pub fn end(&self) -> Epoch {
        self.solution
            .last()
            .map(|sample| sample.epoch)
            .unwrap_or(self.start)
    }
}

/// Everything a successful run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct MissionReport {
    pub name: String,
    pub outcome: MissionOutcome,
    pub segments: Vec<SegmentRecord>,
    pub trajectory: MissionTrajectory,
    pub distance_reference: BodyId,
    pub distances: Vec<DistanceSample>,
    pub ephemeris: String,
}

#[derive(Debug)]
enum Phase {
    Init,
    Running(usize),
    Terminated(ImpactEvent),
    Complete,
}

/// Runs a validated plan against a body table and an ephemeris provider.
pub struct Mission<'a, P: EphemerisProvider + ?Sized> {
    plan: &'a MissionPlan,
    bodies: &'a BodyTable,
    ephemeris: &'a P,
    layout: StateLayout,
}

impl<'a, P: EphemerisProvider + ?Sized> Mission<'a, P> {
    pub fn new(
        plan: &'a MissionPlan,
        bodies: &'a BodyTable,
        ephemeris: &'a P,
    ) -> Result<Self, PlanError> {
        plan.validate(bodies)?;
        Ok(Self {
            plan,
            bodies,
            ephemeris,
            layout: plan.layout()?,
        })
    }

    pub fn layout(&self) -> &StateLayout {
        &self.layout
    }

    pub fn run(&self) -> Result<MissionReport, MissionFailure> {
        let mut records: Vec<SegmentRecord> = Vec::with_capacity(self.plan.segments.len());
        match self.drive(&mut records) {
            Ok(outcome) => self.report(outcome, records),
            Err(error) => Err(MissionFailure {
                error,
                completed: records,
            }),
        }
    }

    fn drive(&self, records: &mut Vec<SegmentRecord>) -> Result<MissionOutcome, MissionError> {
        let integrator = SegmentIntegrator::new(self.bodies, &self.layout, &self.plan.integrator);
        let mut spacecraft: (Vector3, Vector3) = ([0.0; 3], [0.0; 3]);
        let mut phase = Phase::Init;
        loop {
            phase = match phase {
                Phase::Init => {
                    let home = self.body_state(self.plan.launch.home, self.plan.start, 0)?;
                    spacecraft = launch_state(&self.plan.launch, &home)?;
                    log::info!(
                        "mission `{}`: launch from {} at {} with v_inf {:.3} km/s",
                        self.plan.name,
                        self.plan.launch.home,
                        self.plan.start,
                        self.plan.launch.v_inf_km_s
                    );
                    Phase::Running(0)
                }
                Phase::Running(index) => {
                    let start = records.last().map(SegmentRecord::end).unwrap_or(self.plan.start);
                    let record = self.run_segment(&integrator, index, start, &spacecraft)?;
                    let last = record.solution.last().map(|s| &s.state).unwrap_or(&record.seed);
                    spacecraft = (last.position(SPACECRAFT), last.velocity(SPACECRAFT));
                    let impact = record.solution.impact.clone();
                    records.push(record);
                    match impact {
                        Some(event) => Phase::Terminated(event),
                        None if index + 1 < self.plan.segments.len() => Phase::Running(index + 1),
                        None => Phase::Complete,
                    }
                }
                Phase::Terminated(event) => {
                    log::info!("mission terminated by impact with {} at {}", event.body, event.epoch);
                    return Ok(MissionOutcome::TerminatedByImpact(event));
                }
                Phase::Complete => {
                    log::info!("mission complete after {} segments", records.len());
                    return Ok(MissionOutcome::Complete);
                }
            };
        }
    }

    fn run_segment(
        &self,
        integrator: &SegmentIntegrator<'_>,
        index: usize,
        start: Epoch,
        spacecraft: &(Vector3, Vector3),
    ) -> Result<SegmentRecord, MissionError> {
        let segment = &self.plan.segments[index];
        let mut seed = self.seed(index, start, spacecraft)?;
        seed.apply_impulse(&segment.delta_v_km_s);

        let candidates = segment
            .planets
            .as_deref()
            .unwrap_or(self.plan.planets.as_slice());
        let (active, excluded) = self.screen(index, &seed, candidates)?;
        log::info!(
            "segment {index}: {start} for {:.3} days, dv {:?} km/s, perturbers [{}]",
            segment.duration_s / 86_400.0,
            segment.delta_v_km_s,
            active
                .perturbers
                .iter()
                .map(|b| b.name())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let solution = integrator
            .integrate(&seed, start, segment.duration_s, &active)
            .map_err(|source| MissionError::Integration {
                segment: index,
                epoch: start,
                source,
            })?;

        Ok(SegmentRecord {
            index,
            start,
            planned_duration_s: segment.duration_s,
            delta_v_km_s: segment.delta_v_km_s,
            active,
            excluded,
            seed,
            solution,
        })
    }

    /// Fresh planet states at `epoch` plus the carried-over spacecraft state.
    fn seed(
        &self,
        segment: usize,
        epoch: Epoch,
        spacecraft: &(Vector3, Vector3),
    ) -> Result<StateVector, MissionError> {
        let mut state = self.layout.zeros();
        state.set_position(SPACECRAFT, spacecraft.0);
        state.set_velocity(SPACECRAFT, spacecraft.1);
        for (offset, body) in self.layout.planets().iter().enumerate() {
            let planet = self.body_state(*body, epoch, segment)?;
            state.set_position(offset + 1, planet.position_km);
            state.set_velocity(offset + 1, planet.velocity_km_s);
        }
        Ok(state)
    }

    /// Split the candidate perturbers into active ones and ones whose surface
    /// already encloses the spacecraft.
    fn screen(
        &self,
        segment: usize,
        seed: &StateVector,
        candidates: &[BodyId],
    ) -> Result<(ActiveBodies, Vec<BodyId>), MissionError> {
        let mut active = Vec::with_capacity(candidates.len());
        let mut excluded = Vec::new();
        for &body in candidates {
            let slot = self
                .layout
                .require_slot(body)
                .map_err(|source| MissionError::Dynamics { segment, source })?;
            let radius_km = self
                .bodies
                .require(body)
                .map_err(|source| MissionError::Dynamics { segment, source })?
                .radius_km;
            let distance = seed.spacecraft_distance(slot);
            if distance <= radius_km {
                log::warn!(
                    "segment {segment}: spacecraft starts {distance:.1} km from the center of {body} \
                     (radius {radius_km:.1} km); excluding it from perturbers and impact checks"
                );
                excluded.push(body);
            } else {
                active.push(body);
            }
        }
        Ok((ActiveBodies::all(&active), excluded))
    }

    fn body_state(&self, body: BodyId, epoch: Epoch, segment: usize) -> Result<BodyState, MissionError> {
        simulation_state(self.ephemeris, body, epoch).map_err(|source| MissionError::Ephemeris {
            segment,
            epoch,
            body,
            source,
        })
    }

    fn report(
        &self,
        outcome: MissionOutcome,
        records: Vec<SegmentRecord>,
    ) -> Result<MissionReport, MissionFailure> {
        let trajectory = MissionTrajectory::assemble(&self.layout, &records);
        let distances = match distance_series(&trajectory, self.plan.distance_reference, self.ephemeris) {
            Ok(distances) => distances,
            Err(error) => {
                return Err(MissionFailure {
                    error,
                    completed: records,
                });
            }
        };
        Ok(MissionReport {
            name: self.plan.name.clone(),
            outcome,
            segments: records,
            trajectory,
            distance_reference: self.plan.distance_reference,
            distances,
            ephemeris: self.ephemeris.name().to_string(),
        })
    }
}

/// Spacecraft position and velocity at launch.
///
/// Both are offset from the home body's state along the launch direction: the
/// position by `offset_km`, the velocity by `v_inf_km_s`.
pub fn launch_state(launch: &Launch, home: &BodyState) -> Result<(Vector3, Vector3), PlanError> {
    let direction = launch
        .direction
        .resolve(home)
        .ok_or_else(|| PlanError::InvalidLaunch {
            field: "launch.direction",
            reason: format!("direction is undefined for the state of {}", launch.home),
        })?;
    Ok((
        vector::add(&home.position_km, &vector::scale(&direction, launch.offset_km)),
        vector::add(&home.velocity_km_s, &vector::scale(&direction, launch.v_inf_km_s)),
    ))
}
