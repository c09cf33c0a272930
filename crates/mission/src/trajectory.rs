//! Assembled mission output: the concatenated trajectory and the distance series.

use serde::Serialize;
use swingby_core::time::Epoch;
use swingby_core::vector;
use swingby_dynamics::{SPACECRAFT, StateLayout, StateVector};
use swingby_ephem::{BodyId, EphemerisProvider, simulation_state};

use crate::MissionError;
use crate::orchestrator::SegmentRecord;

/// A trajectory sample tagged with the segment it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryPoint {
    pub segment: usize,
    pub epoch: Epoch,
    pub state: StateVector,
}

/// Every segment's samples in time order.
///
/// At each boundary the previous segment's final sample is dropped: it shares
/// its epoch with the next segment's seed, which already carries the maneuver
/// and the re-seeded planets. The per-segment records keep both.
#[derive(Debug, Clone, PartialEq)]
pub struct MissionTrajectory {
    layout: StateLayout,
    points: Vec<TrajectoryPoint>,
}

impl MissionTrajectory {
    pub fn assemble(layout: &StateLayout, records: &[SegmentRecord]) -> Self {
        let mut points: Vec<TrajectoryPoint> = Vec::new();
        for record in records {
            if record.index > 0 {
                points.pop();
            }
            points.extend(record.solution.samples.iter().map(|sample| TrajectoryPoint {
                segment: record.index,
                epoch: sample.epoch,
                state: sample.state.clone(),
            }));
        }
        Self {
            layout: layout.clone(),
            points,
        }
    }

    pub fn layout(&self) -> &StateLayout {
        &self.layout
    }

    pub fn points(&self) -> &[TrajectoryPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&TrajectoryPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&TrajectoryPoint> {
        self.points.last()
    }
}

/// Spacecraft distance from the reference body at one trajectory sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DistanceSample {
    pub segment: usize,
    pub epoch: Epoch,
    pub distance_km: f64,
}

/// Distance from the spacecraft to `reference` at every trajectory point.
///
/// A tracked reference is read from the integrated state; otherwise its
/// position comes from the ephemeris at the sample epoch.
pub fn distance_series<P: EphemerisProvider + ?Sized>(
    trajectory: &MissionTrajectory,
    reference: BodyId,
    ephemeris: &P,
) -> Result<Vec<DistanceSample>, MissionError> {
    let slot = trajectory.layout().slot_of(reference);
    trajectory
        .points()
        .iter()
        .map(|point| {
            let distance_km = match slot {
                Some(slot) => point.state.spacecraft_distance(slot),
                None => {
                    let state = simulation_state(ephemeris, reference, point.epoch).map_err(
                        |source| MissionError::Ephemeris {
                            segment: point.segment,
                            epoch: point.epoch,
                            body: reference,
                            source,
                        },
                    )?;
                    vector::distance(&point.state.position(SPACECRAFT), &state.position_km)
                }
            };
            Ok(DistanceSample {
                segment: point.segment,
                epoch: point.epoch,
                distance_km,
            })
        })
        .collect()
}

/// Sample with the smallest distance.
pub fn closest_approach(series: &[DistanceSample]) -> Option<&DistanceSample> {
    series
        .iter()
        .min_by(|a, b| a.distance_km.total_cmp(&b.distance_km))
}
