use csv::Reader;

use swingby::config::parse_mission_toml;
use swingby::dynamics::BodyTable;
use swingby::ephemeris::KeplerianEphemeris;
use swingby::export::summary::{MissionSummary, write_json};
use swingby::export::trajectory;
use swingby::mission::{MissionPlan, MissionReport, run_mission};

const FLYBY: &str = r#"
name = "export-check"
start = "2027-02-01"
planets = ["earth", "venus"]
distance_reference = "venus"

[launch]
v_inf_km_s = 2.5
direction = "inward"
offset_km = 1500000.0

[integrator]
rtol = 1e-10
atol = 1e-10
sample_interval_days = 2.0

[[segments]]
travel_days = 10

[[segments]]
travel_days = 6
delta_v_km_s = [0.0, 0.0, 0.02]
"#;

fn report() -> MissionReport {
    let plan = MissionPlan::from_file(&parse_mission_toml(FLYBY).expect("parse")).expect("plan");
    let bodies = BodyTable::builtin().expect("bodies");
    let ephemeris = KeplerianEphemeris::approximate(bodies.central().mu_km3_s2);
    run_mission(&plan, &bodies, &ephemeris).expect("mission")
}

#[test]
fn trajectory_csv_has_one_row_per_point() {
    let report = report();
    let mut buffer = Vec::new();
    trajectory::write_csv(&report, &mut buffer).expect("csv");

    let mut reader = Reader::from_reader(buffer.as_slice());
    let headers = reader.headers().expect("headers").clone();
    // Metadata, three blocks of six, distance.
    assert_eq!(headers.len(), 4 + 3 * 6 + 1);
    assert_eq!(&headers[4], "sc_x_km");
    assert_eq!(&headers[10], "earth_x_km");
    assert_eq!(&headers[16], "venus_x_km");
    assert_eq!(&headers[22], "distance_venus_km");

    let rows: Vec<_> = reader.records().collect::<Result<_, _>>().expect("rows");
    // 6 samples in the first leg, 4 in the second, boundary shared.
    assert_eq!(rows.len(), 9);
    assert_eq!(rows.len(), report.trajectory.len());
    assert_eq!(&rows[0][0], "0");
    assert_eq!(&rows[8][0], "1");
    let elapsed: f64 = rows[8][3].parse().expect("elapsed days");
    assert!((elapsed - 16.0).abs() < 1e-6);
}

#[test]
fn json_summary_reports_segments_and_extremes() {
    let report = report();
    let summary = MissionSummary::from_report(&report);
    assert_eq!(summary.outcome, "complete");
    assert_eq!(summary.segments.len(), 2);
    assert!((summary.total_delta_v_km_s - 0.02).abs() < 1e-12);
    let closest = summary.closest_approach.as_ref().expect("closest");
    let farthest = summary.farthest_distance.as_ref().expect("farthest");
    assert!(closest.distance_km <= farthest.distance_km);

    let mut buffer = Vec::new();
    write_json(&summary, &mut buffer).expect("json");
    let text = String::from_utf8(buffer).expect("utf8");
    assert!(text.contains("\"name\": \"export-check\""));
    assert!(text.contains("\"distance_reference\": \"venus\""));
    assert!(text.contains("\"accepted_steps\""));
}
