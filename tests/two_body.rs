use rstest::rstest;

use swingby::dynamics::{
    ActiveBodies, BodyTable, IntegratorOptions, Method, SPACECRAFT, Sampling, SegmentIntegrator,
    StateLayout,
};
use swingby::ephemeris::{BodyId, EphemerisProvider, KeplerianEphemeris};
use swingby::orbits::{ConicElements, angular_momentum, elements_to_state, orbital_period, specific_energy};
use swingby::primitives::constants::AU_KM;
use swingby::primitives::time::Epoch;
use swingby::primitives::vector;

fn options(method: Method) -> IntegratorOptions {
    IntegratorOptions {
        method,
        sampling: Sampling::Interval(10.0 * 86_400.0),
        ..IntegratorOptions::default()
    }
}

#[rstest]
#[case::circular_dopri(Method::DormandPrince45, 0.0)]
#[case::circular_fehlberg(Method::Fehlberg45, 0.0)]
#[case::eccentric_dopri(Method::DormandPrince45, 0.5)]
fn heliocentric_orbit_closes_after_one_period(#[case] method: Method, #[case] eccentricity: f64) {
    let bodies = BodyTable::builtin().expect("builtin bodies");
    let mu = bodies.central().mu_km3_s2;
    let layout = StateLayout::new(Vec::new()).expect("empty layout");
    let elements = ConicElements {
        semi_major_axis_km: AU_KM,
        eccentricity,
        inclination_rad: 0.1,
        raan_rad: 0.3,
        arg_periapsis_rad: 1.2,
        mean_anomaly_rad: 0.0,
    };
    let (r0, v0) = elements_to_state(&elements, mu).expect("elements");
    let mut initial = layout.zeros();
    initial.set_position(SPACECRAFT, r0);
    initial.set_velocity(SPACECRAFT, v0);

    let options = options(method);
    let period = orbital_period(mu, AU_KM);
    let solution = SegmentIntegrator::new(&bodies, &layout, &options)
        .integrate(&initial, Epoch::J2000, period, &ActiveBodies::default())
        .expect("integration");
    assert!(solution.impact.is_none());

    let last = solution.last().expect("final sample");
    assert!((last.elapsed_s - period).abs() < 1e-6);
    let closure = vector::distance(&last.state.position(SPACECRAFT), &r0);
    assert!(
        closure / AU_KM < 1e-6,
        "orbit did not close: {closure} km after one period"
    );

    let e0 = specific_energy(&r0, &v0, mu);
    let h0 = vector::norm(&angular_momentum(&r0, &v0));
    for sample in &solution.samples {
        let r = sample.state.position(SPACECRAFT);
        let v = sample.state.velocity(SPACECRAFT);
        let de = ((specific_energy(&r, &v, mu) - e0) / e0).abs();
        let dh = ((vector::norm(&angular_momentum(&r, &v)) - h0) / h0).abs();
        assert!(de < 1e-8, "energy drift {de:e} at {}", sample.epoch);
        assert!(dh < 1e-8, "angular momentum drift {dh:e} at {}", sample.epoch);
    }
}

#[test]
fn tracked_planet_follows_two_body_ephemeris() {
    let bodies = BodyTable::builtin().expect("builtin bodies");
    let ephemeris = KeplerianEphemeris::two_body(bodies.central().mu_km3_s2);
    let layout = StateLayout::new(vec![BodyId::Mars]).expect("layout");
    let start = Epoch::parse("2030-05-01").expect("epoch");
    let duration = 200.0 * 86_400.0;

    let mars0 = ephemeris.state(BodyId::Mars, start).expect("mars at start");
    let mut initial = layout.zeros();
    // Spacecraft far from Mars so it does not matter here.
    initial.set_position(SPACECRAFT, vector::scale(&mars0.position_km, -1.0));
    initial.set_velocity(SPACECRAFT, vector::scale(&mars0.velocity_km_s, -1.0));
    initial.set_position(1, mars0.position_km);
    initial.set_velocity(1, mars0.velocity_km_s);

    let options = options(Method::DormandPrince45);
    let solution = SegmentIntegrator::new(&bodies, &layout, &options)
        .integrate(&initial, start, duration, &ActiveBodies::all(&[BodyId::Mars]))
        .expect("integration");

    let last = solution.last().expect("final sample");
    let expected = ephemeris
        .state(BodyId::Mars, start + duration)
        .expect("mars at end");
    let error = vector::distance(&last.state.position(1), &expected.position_km);
    assert!(error < 10.0, "integrated Mars is {error} km off its conic");
}

#[test]
fn every_step_sampling_records_accepted_steps() {
    let bodies = BodyTable::builtin().expect("builtin bodies");
    let layout = StateLayout::new(Vec::new()).expect("layout");
    let mu = bodies.central().mu_km3_s2;
    let mut initial = layout.zeros();
    initial.set_position(SPACECRAFT, [AU_KM, 0.0, 0.0]);
    initial.set_velocity(SPACECRAFT, [0.0, (mu / AU_KM).sqrt(), 0.0]);

    let options = IntegratorOptions {
        sampling: Sampling::EveryStep,
        rtol: 1e-9,
        atol: 1e-9,
        ..IntegratorOptions::default()
    };
    let solution = SegmentIntegrator::new(&bodies, &layout, &options)
        .integrate(&initial, Epoch::J2000, 30.0 * 86_400.0, &ActiveBodies::default())
        .expect("integration");

    assert_eq!(solution.samples.len(), solution.stats.accepted_steps + 1);
    assert!(
        solution
            .samples
            .windows(2)
            .all(|pair| pair[1].elapsed_s > pair[0].elapsed_s)
    );
}
