//! N-body swingby trajectory engine.
//!
//! The workspace is split by concern; this crate stitches the pieces together
//! so front-ends and integration tests can depend on a single library.

pub use swingby_config as config;
pub use swingby_core as primitives;
pub use swingby_dynamics as dynamics;
pub use swingby_ephem as ephemeris;
pub use swingby_export as export;
pub use swingby_mission as mission;
pub use swingby_orbits as orbits;

/// Returns the version of the library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
