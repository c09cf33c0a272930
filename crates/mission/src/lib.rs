//! Mission orchestration: plans, segment sequencing, and trajectory assembly.

pub mod orchestrator;
pub mod plan;
pub mod trajectory;

use swingby_core::time::Epoch;
use swingby_dynamics::{BodyTable, DynamicsError, IntegrationError};
use swingby_ephem::{BodyId, EphemerisError, EphemerisProvider};
use thiserror::Error;

pub use orchestrator::{Mission, MissionOutcome, MissionReport, SegmentRecord, launch_state};
pub use plan::{Launch, LaunchDirection, MissionPlan, PlanError, SegmentPlan};
pub use trajectory::{
    DistanceSample, MissionTrajectory, TrajectoryPoint, closest_approach, distance_series,
};

/// Top-level mission error.
#[derive(Debug, Error)]
pub enum MissionError {
    #[error("mission plan is invalid: {0}")]
    Plan(#[from] PlanError),
    #[error("ephemeris lookup for {body} at {epoch} (segment {segment}) failed: {source}")]
    Ephemeris {
        segment: usize,
        epoch: Epoch,
        body: BodyId,
        #[source]
        source: EphemerisError,
    },
    #[error("segment {segment} could not be set up: {source}")]
    Dynamics {
        segment: usize,
        #[source]
        source: DynamicsError,
    },
    #[error("segment {segment} starting {epoch} failed: {source}")]
    Integration {
        segment: usize,
        epoch: Epoch,
        #[source]
        source: IntegrationError,
    },
}

impl MissionError {
    /// Segment the error occurred in, if it happened during execution.
    pub fn segment(&self) -> Option<usize> {
        match self {
            MissionError::Plan(_) => None,
            MissionError::Ephemeris { segment, .. }
            | MissionError::Dynamics { segment, .. }
            | MissionError::Integration { segment, .. } => Some(*segment),
        }
    }
}

/// A fatal error together with the segments that finished before it.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct MissionFailure {
    #[source]
    pub error: MissionError,
    pub completed: Vec<SegmentRecord>,
}

impl From<PlanError> for MissionFailure {
    fn from(error: PlanError) -> Self {
        Self {
            error: error.into(),
            completed: Vec::new(),
        }
    }
}

/// Validate `plan` and run it to completion or impact.
pub fn run_mission<P: EphemerisProvider + ?Sized>(
    plan: &MissionPlan,
    bodies: &BodyTable,
    ephemeris: &P,
) -> Result<MissionReport, MissionFailure> {
    Mission::new(plan, bodies, ephemeris)?.run()
}
