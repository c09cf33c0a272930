//! Planetary ephemeris providers for the swingby workspace.
//!
//! Everything downstream talks to [`EphemerisProvider`]; the analytic
//! mean-element provider is always available, and a CSPICE-backed provider is
//! compiled in with the `spice` feature.

use std::path::PathBuf;

use swingby_core::time::Epoch;
use swingby_core::vector::Vector3;
use swingby_orbits::OrbitError;
use thiserror::Error;

pub mod analytic;
pub mod body;
pub mod frames;
pub mod kernels;
#[cfg(feature = "spice")]
pub mod spice;

pub use analytic::{ElementModel, KeplerianEphemeris};
pub use body::{BodyId, UnknownBody};
pub use frames::{Frame, SIMULATION_FRAME};

/// Heliocentric position and velocity of a body, tagged with its frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyState {
    pub position_km: Vector3,
    pub velocity_km_s: Vector3,
    pub frame: Frame,
}

/// Errors surfaced while looking up body states.
#[derive(Debug, Error)]
pub enum EphemerisError {
    #[error("no ephemeris data for {body}")]
    UnsupportedBody { body: BodyId },
    #[error("epoch {epoch} is outside the ephemeris coverage [{start}, {end}]")]
    EpochOutOfRange { epoch: Epoch, start: Epoch, end: Epoch },
    #[error("element conversion failed: {0}")]
    Orbit(#[from] OrbitError),
    #[error("kernel `{name}` is missing at {path}; download it from {url}")]
    MissingKernel {
        name: &'static str,
        path: PathBuf,
        url: &'static str,
    },
    #[error("kernel `{name}` path contains invalid UTF-8: {path}")]
    InvalidKernelPath { name: &'static str, path: PathBuf },
    #[error("SPICE kernel call failed: {message}")]
    Spice { message: String },
}

/// Source of heliocentric body states.
///
/// Implementations may answer in any [`Frame`]; callers normalize with
/// [`simulation_state`].
pub trait EphemerisProvider {
    fn state(&self, body: BodyId, epoch: Epoch) -> Result<BodyState, EphemerisError>;

    /// Short label for logs and summaries.
    fn name(&self) -> &str {
        "ephemeris"
    }
}

impl<P: EphemerisProvider + ?Sized> EphemerisProvider for &P {
    fn state(&self, body: BodyId, epoch: Epoch) -> Result<BodyState, EphemerisError> {
        (**self).state(body, epoch)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<P: EphemerisProvider + ?Sized> EphemerisProvider for Box<P> {
    fn state(&self, body: BodyId, epoch: Epoch) -> Result<BodyState, EphemerisError> {
        (**self).state(body, epoch)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Query `provider` and rotate the answer into the simulation frame.
pub fn simulation_state<P: EphemerisProvider + ?Sized>(
    provider: &P,
    body: BodyId,
    epoch: Epoch,
) -> Result<BodyState, EphemerisError> {
    let state = provider.state(body, epoch)?;
    log::trace!("{} state of {body} at {epoch}: {:?}", provider.name(), state.position_km);
    Ok(state.in_simulation_frame())
}
