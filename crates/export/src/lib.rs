//! Export helpers for CSV and JSON artifacts.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write export: {0}")]
    Io(#[from] io::Error),
    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to serialize JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Create a writer for the target path, handling stdout (`-`) by convention.
pub fn writer_for_path(path: &Path) -> io::Result<Box<dyn Write>> {
    if path == Path::new("-") {
        return Ok(Box::new(BufWriter::new(io::stdout())));
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path)?;
    Ok(Box::new(BufWriter::new(file)))
}

pub mod trajectory {
    use std::io::Write;

    use swingby_core::time::seconds_to_days;
    use swingby_dynamics::SPACECRAFT;
    use swingby_mission::MissionReport;

    use crate::ExportError;

    const COMPONENTS: [&str; 6] = ["x_km", "y_km", "z_km", "vx_km_s", "vy_km_s", "vz_km_s"];

    /// Column names: sample metadata, spacecraft block, one block per tracked planet, distance.
    pub fn header(report: &MissionReport) -> Vec<String> {
        let mut columns = vec![
            "segment".to_string(),
            "epoch".to_string(),
            "et_seconds".to_string(),
            "elapsed_days".to_string(),
        ];
        let blocks = std::iter::once("sc")
            .chain(report.trajectory.layout().planets().iter().map(|b| b.name()));
        for prefix in blocks {
            columns.extend(COMPONENTS.iter().map(|c| format!("{prefix}_{c}")));
        }
        columns.push(format!("distance_{}_km", report.distance_reference));
        columns
    }

    /// Write every trajectory point as one CSV row.
    pub fn write_csv<W: Write>(report: &MissionReport, writer: W) -> Result<(), ExportError> {
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record(header(report))?;

        let origin = report.trajectory.first().map(|p| p.epoch);
        let planets = report.trajectory.layout().planets().len();
        for (point, distance) in report.trajectory.points().iter().zip(&report.distances) {
            let elapsed = origin.map(|o| point.epoch - o).unwrap_or(0.0);
            let mut row = vec![
                point.segment.to_string(),
                point.epoch.to_string(),
                format!("{:.3}", point.epoch.seconds_past_j2000()),
                format!("{:.6}", seconds_to_days(elapsed)),
            ];
            for slot in SPACECRAFT..=planets {
                let r = point.state.position(slot);
                let v = point.state.velocity(slot);
                row.extend(r.iter().map(|c| format!("{c:.6}")));
                row.extend(v.iter().map(|c| format!("{c:.9}")));
            }
            row.push(format!("{:.6}", distance.distance_km));
            csv.write_record(&row)?;
        }
        csv.flush()?;
        Ok(())
    }
}

pub mod summary {
    use std::io::Write;

    use serde::Serialize;
    use swingby_core::time::seconds_to_days;
    use swingby_core::vector::{self, Vector3};
    use swingby_dynamics::IntegrationStats;
    use swingby_ephem::BodyId;
    use swingby_mission::{MissionOutcome, MissionReport, closest_approach};

    use crate::ExportError;

    #[derive(Debug, Clone, Serialize)]
    pub struct ImpactSummary {
        pub body: BodyId,
        pub epoch: String,
        pub segment_elapsed_days: f64,
        pub clearance_km: f64,
        pub relative_speed_km_s: Option<f64>,
    }

    #[derive(Debug, Clone, Serialize)]
    pub struct SegmentSummary {
        pub index: usize,
        pub start: String,
        pub end: String,
        pub planned_days: f64,
        pub flown_days: f64,
        pub delta_v_km_s: Vector3,
        pub perturbers: Vec<BodyId>,
        pub excluded: Vec<BodyId>,
        pub samples: usize,
        pub stats: IntegrationStats,
    }

    #[derive(Debug, Clone, Serialize)]
    pub struct DistanceExtreme {
        pub epoch: String,
        pub distance_km: f64,
    }

    /// JSON-friendly digest of a [`MissionReport`].
    #[derive(Debug, Clone, Serialize)]
    pub struct MissionSummary {
        pub name: String,
        pub ephemeris: String,
        pub outcome: &'static str,
        pub start: String,
        pub end: String,
        pub total_delta_v_km_s: f64,
        pub impact: Option<ImpactSummary>,
        pub distance_reference: BodyId,
        pub closest_approach: Option<DistanceExtreme>,
        pub farthest_distance: Option<DistanceExtreme>,
        pub segments: Vec<SegmentSummary>,
    }

    impl MissionSummary {
        pub fn from_report(report: &MissionReport) -> Self {
            let layout = report.trajectory.layout();
            let impact = report.outcome.impact().map(|event| {
                let relative_speed_km_s = layout.slot_of(event.body).map(|slot| {
                    vector::distance(&event.state.velocity(0), &event.state.velocity(slot))
                });
                ImpactSummary {
                    body: event.body,
                    epoch: event.epoch.to_string(),
                    segment_elapsed_days: seconds_to_days(event.elapsed_s),
                    clearance_km: event.clearance_km,
                    relative_speed_km_s,
                }
            });
            let extreme = |sample: &swingby_mission::DistanceSample| DistanceExtreme {
                epoch: sample.epoch.to_string(),
                distance_km: sample.distance_km,
            };
            let farthest = report
                .distances
                .iter()
                .max_by(|a, b| a.distance_km.total_cmp(&b.distance_km));

            Self {
                name: report.name.clone(),
                ephemeris: report.ephemeris.clone(),
                outcome: match report.outcome {
                    MissionOutcome::Complete => "complete",
                    MissionOutcome::TerminatedByImpact(_) => "impact",
                },
                start: report
                    .trajectory
                    .first()
                    .map(|p| p.epoch.to_string())
                    .unwrap_or_default(),
                end: report
                    .trajectory
                    .last()
                    .map(|p| p.epoch.to_string())
                    .unwrap_or_default(),
                total_delta_v_km_s: report
                    .segments
                    .iter()
                    .map(|s| vector::norm(&s.delta_v_km_s))
                    .sum(),
                impact,
                distance_reference: report.distance_reference,
                closest_approach: closest_approach(&report.distances).map(extreme),
                farthest_distance: farthest.map(extreme),
                segments: report
                    .segments
                    .iter()
                    .map(|record| SegmentSummary {
                        index: record.index,
                        start: record.start.to_string(),
                        end: record.end().to_string(),
                        planned_days: seconds_to_days(record.planned_duration_s),
                        flown_days: seconds_to_days(record.end() - record.start),
                        delta_v_km_s: record.delta_v_km_s,
                        perturbers: record.active.perturbers.clone(),
                        excluded: record.excluded.clone(),
                        samples: record.solution.samples.len(),
                        stats: record.solution.stats,
                    })
                    .collect(),
            }
        }
    }

    /// Serialize a summary as pretty-printed JSON.
    pub fn write_json<W: Write>(summary: &MissionSummary, mut writer: W) -> Result<(), ExportError> {
        serde_json::to_writer_pretty(&mut writer, summary)?;
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }
}
