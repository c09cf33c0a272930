//! Heliocentric N-body dynamics for a spacecraft among tracked planets.
//!
//! The crate is split the way a segment is solved: [`bodies`] holds the
//! gravitational constants, [`state`] fixes the layout of the integrated
//! vector, [`eom`] evaluates its derivative, [`events`] watches for surface
//! crossings, and [`integrator`] advances everything with an embedded
//! Runge-Kutta pair.

use swingby_ephem::BodyId;
use thiserror::Error;

pub mod bodies;
pub mod eom;
pub mod events;
pub mod integrator;
pub mod rk;
pub mod state;

pub use bodies::{Body, BodyRole, BodyTable, BodyTableError};
pub use eom::EquationsOfMotion;
pub use events::{EventFunction, ImpactDetector};
pub use integrator::{
    ActiveBodies, ImpactEvent, IntegrationError, IntegrationFailure, IntegrationStats,
    IntegratorOptions, OptionsError, Sample, Sampling, SegmentIntegrator, SegmentSolution,
};
pub use rk::Method;
pub use state::{SPACECRAFT, StateLayout, StateVector};

/// Errors raised while wiring or evaluating the dynamics.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DynamicsError {
    #[error("{0} is not in the body table")]
    UnknownBody(BodyId),
    #[error("{0} is not tracked in the state vector")]
    NotTracked(BodyId),
    #[error("{0} is listed more than once")]
    DuplicateBody(BodyId),
    #[error("the central body {0} cannot be tracked as a planet")]
    CentralBodyTracked(BodyId),
    #[error("state has {found} components but the layout expects {expected}")]
    LayoutMismatch { expected: usize, found: usize },
    #[error("spacecraft is {distance_km:.3e} km from the center of {body}")]
    Singularity { body: BodyId, distance_km: f64 },
}
