use swingby::config::{BodyConfig, builtin_bodies, load_bodies, load_mission};
use swingby::dynamics::{BodyTable, Method, Sampling};
use swingby::ephemeris::BodyId;
use swingby::mission::{LaunchDirection, MissionPlan};

#[test]
fn bundled_body_catalog_matches_builtin_table() {
    let mut from_disk = load_bodies("configs/bodies").expect("body catalog");
    let mut builtin = builtin_bodies();
    let by_name = |a: &BodyConfig, b: &BodyConfig| a.name.cmp(&b.name);
    from_disk.sort_by(by_name);
    builtin.sort_by(by_name);
    assert_eq!(from_disk, builtin);

    let table = BodyTable::from_configs(&from_disk).expect("table");
    assert_eq!(table.central().id, BodyId::Sun);
    assert_eq!(table.perturbing().len(), 9);
}

#[test]
fn bundled_missions_load_and_validate() {
    let bodies = BodyTable::builtin().expect("bodies");

    let venus = load_mission("configs/missions/venus_swingby.toml").expect("venus mission");
    let plan = MissionPlan::from_file(&venus).expect("venus plan");
    plan.validate(&bodies).expect("venus valid");
    assert_eq!(plan.planets, vec![BodyId::Venus, BodyId::Earth, BodyId::Mars]);
    assert_eq!(plan.launch.direction, LaunchDirection::Retrograde);
    assert_eq!(plan.segments.len(), 2);
    assert_eq!(plan.segments[1].delta_v_km_s, [0.0055, 0.0, 0.0]);
    assert_eq!(plan.integrator.method, Method::DormandPrince45);
    assert_eq!(plan.total_duration_s(), 183.0 * 86_400.0);

    let outer = load_mission("configs/missions/outer_cruise.yaml").expect("outer mission");
    let plan = MissionPlan::from_file(&outer).expect("outer plan");
    plan.validate(&bodies).expect("outer valid");
    assert_eq!(plan.integrator.method, Method::Fehlberg45);
    assert_eq!(plan.integrator.sampling, Sampling::Interval(5.0 * 86_400.0));
    assert_eq!(plan.distance_reference, BodyId::Jupiter);
    assert_eq!(
        plan.segments[1].planets.as_deref(),
        Some(&[BodyId::Jupiter, BodyId::Saturn][..])
    );
    assert_eq!(plan.launch.direction, LaunchDirection::Prograde);
}

#[test]
fn missing_mission_file_is_an_io_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let error = load_mission(dir.path().join("absent.toml")).expect_err("missing file");
    assert!(matches!(error, swingby::config::ConfigError::Io(_)));
}
