use swingby::config::{MissionFile, parse_mission_toml, parse_mission_yaml};
use swingby::dynamics::{BodyTable, IntegrationFailure, SPACECRAFT};
use swingby::ephemeris::{BodyId, EphemerisError, KeplerianEphemeris, simulation_state};
use swingby::primitives::vector;
use swingby::mission::{MissionError, MissionOutcome, MissionPlan, PlanError, run_mission};

const EARTH_FOLLOWER: &str = r#"
name = "earth-follower"
start = "2024-01-01"
planets = ["earth"]

[launch]
v_inf_km_s = 0.0
offset_km = 0.0

[[segments]]
travel_days = 100

[[segments]]
travel_days = 100
"#;

fn parse(contents: &str) -> MissionFile {
    parse_mission_toml(contents).expect("parse mission")
}

fn bodies() -> BodyTable {
    BodyTable::builtin().expect("bodies")
}

#[test]
fn spacecraft_started_inside_home_planet_rides_along() {
    let plan = MissionPlan::from_file(&parse(EARTH_FOLLOWER)).expect("plan");
    let bodies = bodies();
    let ephemeris = KeplerianEphemeris::two_body(bodies.central().mu_km3_s2);

    let report = run_mission(&plan, &bodies, &ephemeris).expect("mission");
    assert!(matches!(report.outcome, MissionOutcome::Complete));
    assert_eq!(report.segments.len(), 2);
    for record in &report.segments {
        assert_eq!(record.excluded, vec![BodyId::Earth]);
        assert!(record.active.perturbers.is_empty());
        assert!(record.solution.impact.is_none());
    }

    // First leg: identical dynamics for both blocks, so they never separate.
    for sample in &report.segments[0].solution.samples {
        assert_eq!(sample.state.spacecraft_distance(1), 0.0);
    }
    let farthest = report
        .distances
        .iter()
        .map(|d| d.distance_km)
        .fold(0.0, f64::max);
    assert!(farthest < 100.0, "drifted {farthest} km from Earth");
    assert_eq!(report.trajectory.len(), 201);

    // The spacecraft also stays on Earth's ephemeris track.
    for point in report.trajectory.points() {
        let earth = simulation_state(&ephemeris, BodyId::Earth, point.epoch).expect("earth");
        let offset = vector::distance(&point.state.position(SPACECRAFT), &earth.position_km);
        assert!(offset < 100.0, "{offset} km from Earth's ephemeris at {}", point.epoch);
    }
}

#[test]
fn yaml_and_toml_missions_agree() {
    let yaml = parse_mission_yaml(
        r#"
name: earth-follower
start: "2024-01-01"
planets: [earth]
launch:
  v_inf_km_s: 0.0
  offset_km: 0.0
segments:
  - travel_days: 100
  - travel_days: 100
"#,
    )
    .expect("parse yaml");
    let from_yaml = MissionPlan::from_file(&yaml).expect("yaml plan");
    let from_toml = MissionPlan::from_file(&parse(EARTH_FOLLOWER)).expect("toml plan");
    assert_eq!(from_yaml, from_toml);
}

#[test]
fn invalid_plans_are_rejected_before_running() {
    let cases: Vec<(String, fn(&PlanError) -> bool)> = vec![
        (
            EARTH_FOLLOWER.replace("planets = [\"earth\"]", "planets = [\"earth\", \"sun\"]"),
            |e| matches!(e, PlanError::CentralBodyAsPlanet { .. }),
        ),
        (
            EARTH_FOLLOWER.replace("planets = [\"earth\"]", "planets = [\"earth\", \"vulcan\"]"),
            |e| matches!(e, PlanError::UnsupportedPlanet { name, .. } if name == "vulcan"),
        ),
        (
            EARTH_FOLLOWER.replace("planets = [\"earth\"]", "planets = [\"earth\", \"earth\"]"),
            |e| matches!(e, PlanError::DuplicatePlanet { .. }),
        ),
        (
            EARTH_FOLLOWER.replacen("travel_days = 100", "travel_days = 0", 1),
            |e| matches!(e, PlanError::NonPositiveDuration { segment: 0, .. }),
        ),
        (
            format!("{EARTH_FOLLOWER}\n[[segments]]\ntravel_days = 5\nplanets = [\"mars\"]\n"),
            |e| matches!(e, PlanError::PlanetNotTracked { segment: 2, name } if name == "mars"),
        ),
        (
            EARTH_FOLLOWER.replace("v_inf_km_s = 0.0", "v_inf_km_s = -1.0"),
            |e| matches!(e, PlanError::InvalidLaunch { field: "launch.v_inf_km_s", .. }),
        ),
        (
            EARTH_FOLLOWER.replace("start = \"2024-01-01\"", "start = \"not a date\""),
            |e| matches!(e, PlanError::InvalidEpoch(_)),
        ),
        (
            format!("{EARTH_FOLLOWER}\n[integrator]\nrtol = 0.0\n"),
            |e| matches!(e, PlanError::InvalidIntegrator(err) if err.field == "rtol"),
        ),
    ];

    for (contents, expected) in cases {
        let error = MissionPlan::from_file(&parse(&contents)).expect_err("plan should be rejected");
        assert!(expected(&error), "unexpected error {error:?} for\n{contents}");
    }
}

#[test]
fn delta_v_budget_is_enforced() {
    let contents = format!(
        "delta_v_budget_km_s = 0.5\n{}",
        EARTH_FOLLOWER.replacen(
            "travel_days = 100\n",
            "travel_days = 100\ndelta_v_km_s = [0.3, 0.4, 0.0]\n",
            2
        )
    );
    let error = MissionPlan::from_file(&parse(&contents)).expect_err("over budget");
    match error {
        PlanError::DeltaVBudgetExceeded {
            total_km_s,
            budget_km_s,
        } => {
            assert!((total_km_s - 1.0).abs() < 1e-12);
            assert_eq!(budget_km_s, 0.5);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn epoch_outside_ephemeris_window_fails_first_segment() {
    let contents = EARTH_FOLLOWER.replace("2024-01-01", "2060-01-01");
    let plan = MissionPlan::from_file(&parse(&contents)).expect("plan");
    let bodies = bodies();
    let ephemeris = KeplerianEphemeris::approximate(bodies.central().mu_km3_s2);

    let failure = run_mission(&plan, &bodies, &ephemeris).expect_err("out of range");
    assert!(failure.completed.is_empty());
    assert_eq!(failure.error.segment(), Some(0));
    assert!(matches!(
        failure.error,
        MissionError::Ephemeris {
            segment: 0,
            body: BodyId::Earth,
            source: EphemerisError::EpochOutOfRange { .. },
            ..
        }
    ));
}

#[test]
fn step_limit_fails_later_segment_and_keeps_earlier_ones() {
    let contents = r#"
name = "step-limited"
start = "2024-01-01"
planets = ["earth"]

[launch]
v_inf_km_s = 1.0
offset_km = 1000000.0

[integrator]
rtol = 1e-9
atol = 1e-9
max_steps = 50

[[segments]]
travel_days = 1

[[segments]]
travel_days = 400
"#;
    let plan = MissionPlan::from_file(&parse(contents)).expect("plan");
    let bodies = bodies();
    let ephemeris = KeplerianEphemeris::two_body(bodies.central().mu_km3_s2);

    let failure = run_mission(&plan, &bodies, &ephemeris).expect_err("step limit");
    assert_eq!(failure.completed.len(), 1);
    assert_eq!(failure.error.segment(), Some(1));
    match &failure.error {
        MissionError::Integration { source, epoch, .. } => {
            assert_eq!(source.kind, IntegrationFailure::StepLimit { max_steps: 50 });
            assert!(source.elapsed_s > 0.0);
            assert_eq!(*epoch, failure.completed[0].end());
        }
        other => panic!("unexpected error {other:?}"),
    }
}
