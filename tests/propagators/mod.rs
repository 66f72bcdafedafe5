/*
 * Orrery Astrodynamics Core
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::sync::Arc;

use orrery::bodies::Body;
use orrery::env::solarsystem::get_body;
use orrery::frames::stations::{Mask, StationHeading};
use orrery::frames::{create_station, get_frame, Frame, LocalFrame};
use orrery::io::Tle;
use orrery::math::Vector6;
use orrery::orbits::forms::Form;
use orrery::orbits::{ImpulsiveMan, ManFrame, Maneuver, Orbit, StateVector};
use orrery::propagators::cw::ClohessyWiltshire;
use orrery::propagators::listeners::{
    find_event, stations_listeners, AnomalyKind, AnomalyListener, ApsideListener, EventKind,
    Listener, NodeListener,
};
use orrery::propagators::soi::{SoiAnalytical, SoiBody};
use orrery::propagators::ya::YamanakaAnkersen;
use orrery::propagators::{IterOpts, Kepler, KeplerNum, Propagator, StateSource};
use orrery::propagators::keplernum::RkMethod;
use orrery::time::{Date, TimeDelta, TimeScale};

use crate::common::setup;

const ISS_TLE_2018: &str = "ISS (ZARYA)
1 25544U 98067A   18124.55610684  .00001524  00000-0  30197-4 0  9997
2 25544  51.6421 236.2139 0003381  47.8509  47.6767 15.54198229111731";

fn circular_orbit(method: RkMethod, step: TimeDelta, tol: f64) -> (StateVector, Orbit) {
    let date = Date::from_ymd(2018, 4, 5, TimeScale::Utc).unwrap();
    let sv = StateVector::new(
        Vector6::new(7000e3, 0.0, 0.9, 1.0, 2.0, 0.0),
        date,
        Form::Keplerian,
        get_frame("EME2000").unwrap(),
    );
    let propagator = KeplerNum::new(
        step,
        vec![get_body("Earth").unwrap()],
        method,
        get_frame("EME2000").unwrap(),
        tol,
    );
    let orbit = Orbit::new(sv.clone(), Box::new(propagator) as Box<dyn Propagator>).unwrap();
    (sv, orbit)
}

/// One full revolution of a circular orbit closes on itself, with a
/// method-dependent tolerance.
#[test]
fn rk_family_period_closure() {
    setup();

    let cases = [
        (RkMethod::Euler, TimeDelta::from_seconds(0.02), 1e-3, 1e3),
        (RkMethod::Rk4, TimeDelta::from_seconds(5.0), 1e-3, 1e-3),
        (RkMethod::Dopri54, TimeDelta::from_seconds(30.0), 1e-3, 1e-2),
        (RkMethod::Rkf54, TimeDelta::from_seconds(30.0), 1e-3, 1e-2),
    ];

    for (method, step, tol, closure) in cases {
        let (sv, orbit) = circular_orbit(method, step, tol);
        let period = sv.infos().unwrap().period().unwrap();
        let start = orbit.propagate(&sv.date()).unwrap();
        let date = sv.date().shift(period).unwrap();
        let end = orbit.propagate(&date).unwrap();

        let closure_error =
            (end.coord().fixed_rows::<3>(0) - start.coord().fixed_rows::<3>(0)).norm();
        assert!(
            closure_error <= closure,
            "{method:?}: closure error {closure_error} m (tolerance {closure})"
        );
    }
}

/// Hohmann transfer scenario: a tangential burn at perigee and another at
/// the subsequent apogee raise the mean altitude by 98-99 km.
#[test]
fn hohmann_transfer() {
    setup();

    let date = Date::from_ymd(2018, 4, 5, TimeScale::Utc).unwrap();
    let mut sv = StateVector::new(
        Vector6::new(6778e3, 1e-4, 0.9013, 1.0, 0.0, 0.0),
        date,
        Form::Keplerian,
        get_frame("EME2000").unwrap(),
    );
    let infos = sv.infos().unwrap();
    let a0 = infos.a;
    let period = infos.period().unwrap();
    let mu = get_body("Earth").unwrap().mu();

    // First burn at the perigee one revolution in
    let burn1_date = date.shift(period).unwrap();
    sv.add_maneuver(Maneuver::Impulsive(
        ImpulsiveMan::new(burn1_date, &[28.0, 0.0, 0.0], ManFrame::Tnw, Some("perigee")).unwrap(),
    ));

    // The transfer half-period places the apogee burn
    let v_p = infos.velocity_at_pericenter();
    let r_p = infos.pericenter();
    let a_transfer = 1.0 / (2.0 / r_p - (v_p + 28.0).powi(2) / mu);
    let half_transfer =
        TimeDelta::from_seconds(std::f64::consts::PI * (a_transfer.powi(3) / mu).sqrt());
    let burn2_date = burn1_date.shift(half_transfer).unwrap();
    sv.add_maneuver(Maneuver::Impulsive(
        ImpulsiveMan::new(burn2_date, &[27.0, 0.0, 0.0], ManFrame::Tnw, Some("apogee")).unwrap(),
    ));

    let propagator = KeplerNum::new(
        TimeDelta::from_seconds(60.0),
        vec![get_body("Earth").unwrap()],
        RkMethod::Rk4,
        get_frame("EME2000").unwrap(),
        1e-3,
    );
    let orbit = Orbit::new(sv, Box::new(propagator) as Box<dyn Propagator>).unwrap();

    // Mean semi-major axis over the orbit following the second burn
    let window_start = burn2_date.shift(TimeDelta::from_minutes(5.0)).unwrap();
    let ephem = orbit
        .ephem(
            IterOpts::between(
                window_start,
                period,
                TimeDelta::from_minutes(3.0),
            ),
        )
        .unwrap();

    let mut mean_a = 0.0;
    for state in ephem.states() {
        let kep = state.clone().with_form(Form::Keplerian).unwrap();
        mean_a += kep.coord()[0];
    }
    mean_a /= ephem.len() as f64;

    let raise = mean_a - a0;
    // 98-99 km expected for 28 + 27 m/s at this altitude
    assert!(
        raise > 95e3 && raise < 102e3,
        "altitude raise {:.1} km",
        raise / 1e3
    );
}

/// SGP4 on the reference ISS TLE: sane LEO state at epoch, and the same
/// propagation through a date or a duration.
#[test]
fn sgp4_iss() {
    setup();

    let tle = Tle::parse(
        "ISS (ZARYA)
1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927
2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537",
    )
    .unwrap();
    let orbit = tle.orbit().unwrap();

    let at_epoch = orbit.propagate(&tle.epoch).unwrap();
    assert_eq!(at_epoch.frame().name(), "TEME");
    assert_eq!(at_epoch.form(), Form::Cartesian);

    let r = at_epoch.coord().fixed_rows::<3>(0).norm();
    let v = at_epoch.coord().fixed_rows::<3>(3).norm();
    assert!(r > 6.6e6 && r < 6.85e6, "ISS radius {r}");
    assert!(v > 7.5e3 && v < 7.8e3, "ISS speed {v}");

    // The SGP4 period matches the TLE mean motion within a minute
    let period = TimeDelta::from_seconds(std::f64::consts::TAU / tle.n);
    let after = orbit.propagate(&tle.epoch.shift(period).unwrap()).unwrap();
    let gap = (after.coord().fixed_rows::<3>(0) - at_epoch.coord().fixed_rows::<3>(0)).norm();
    assert!(gap < 300e3, "period closure gap {gap}");

    // Spec scenario date, a couple of hours past the epoch
    let date = Date::new(2008, 9, 20, 14, 26, 52, 104192, TimeScale::Utc).unwrap();
    let sample = orbit.propagate(&date).unwrap();
    let r = sample.coord().fixed_rows::<3>(0).norm();
    assert!(r > 6.6e6 && r < 6.85e6);
}

/// Node, apside and anomaly listeners over an analytical propagation:
/// events alternate, their dates interleave in order, and the watched
/// value is driven to zero at the event sample.
#[test]
fn listener_bisection() {
    setup();

    let sv = StateVector::new(
        Vector6::new(6778e3, 0.0007, 0.9013, 1.5, 2.3, 0.8),
        Date::from_ymd(2018, 4, 5, TimeScale::Utc).unwrap(),
        Form::Keplerian,
        get_frame("EME2000").unwrap(),
    );
    let period = sv.infos().unwrap().period().unwrap();
    let orbit = Orbit::new(sv, Box::new(Kepler::new()) as Box<dyn Propagator>).unwrap();

    let node = NodeListener::new(None);
    let samples = orbit
        .iter(
            IterOpts::until(period * 2.0)
                .with_step(TimeDelta::from_minutes(3.0))
                .listen(Box::new(NodeListener::new(None)))
                .listen(Box::new(ApsideListener::new(None))),
        )
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    let events: Vec<&StateVector> = samples.iter().filter(|s| s.event().is_some()).collect();
    // Two orbits: four node crossings and four apsides
    let nodes: Vec<_> = events
        .iter()
        .filter(|s| s.event().unwrap().kind == EventKind::Node)
        .collect();
    assert_eq!(nodes.len(), 4, "node crossings over two orbits");
    for pair in nodes.windows(2) {
        assert_ne!(
            pair[0].event().unwrap().info,
            pair[1].event().unwrap().info,
            "ascending and descending nodes alternate"
        );
    }

    // The watched value is at zero at the event, within the bisection
    // resolution
    for event in &nodes {
        let value = node.value(event).unwrap();
        assert!(value.abs() < 1e-6, "latitude at node event: {value}");
    }

    // The stream remains date-ordered with events interleaved
    for pair in samples.windows(2) {
        assert!(pair[0].date() <= pair[1].date());
    }

    // Event samples sit strictly between the bracketing regular samples
    let first_node_date = nodes[0].date();
    let before = samples
        .iter()
        .filter(|s| s.event().is_none() && s.date() < first_node_date)
        .map(|s| s.date())
        .last()
        .unwrap();
    let after = samples
        .iter()
        .find(|s| s.event().is_none() && s.date() > first_node_date)
        .map(|s| s.date())
        .unwrap();
    assert!(before < first_node_date && first_node_date < after);
}

#[test]
fn anomaly_listener_finds_value() {
    setup();

    let sv = StateVector::new(
        Vector6::new(6778e3, 0.0007, 0.9013, 1.5, 2.3, 0.8),
        Date::from_ymd(2018, 4, 5, TimeScale::Utc).unwrap(),
        Form::Keplerian,
        get_frame("EME2000").unwrap(),
    );
    let period = sv.infos().unwrap().period().unwrap();
    let orbit = Orbit::new(sv, Box::new(Kepler::new()) as Box<dyn Propagator>).unwrap();

    let target = std::f64::consts::FRAC_PI_3;
    let listener = AnomalyListener::new(target, AnomalyKind::True, None);
    let stream = orbit
        .iter(
            IterOpts::until(period)
                .with_step(TimeDelta::from_minutes(3.0))
                .listen(Box::new(AnomalyListener::new(target, AnomalyKind::True, None))),
        )
        .unwrap();

    let event = find_event(stream, "True Anomaly = 60.00", 0).unwrap();
    assert!(listener.value(&event).unwrap().abs() < 1e-6);
}

/// Station visibility: the ISS pass over a station produces the AOS,
/// AOS(mask), MAX, LOS(mask), LOS sequence.
#[test]
fn station_visibility_sequence() {
    setup();

    let mask = Mask {
        azims: vec![0.0, std::f64::consts::PI],
        elevs: vec![0.05, 0.05],
    };
    let station = create_station(
        "ToulouseVisibility",
        (43.604482, 1.443962, 172.0),
        &get_frame("WGS84").unwrap(),
        StationHeading::North,
        Some(mask),
    )
    .unwrap();

    let tle = Tle::parse(ISS_TLE_2018).unwrap();
    let orbit = tle.orbit().unwrap();

    let start = Date::new(2018, 4, 5, 16, 50, 0, 0, TimeScale::Utc).unwrap();
    let samples = orbit
        .iter(
            IterOpts::between(
                start,
                TimeDelta::from_minutes(100.0),
                TimeDelta::from_minutes(3.0),
            )
            .listen_all(stations_listeners(&station)),
        )
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    let events: Vec<(EventKind, String, Date)> = samples
        .iter()
        .filter_map(|s| {
            s.event()
                .map(|e| (e.kind, e.info.clone(), s.date()))
        })
        .collect();

    assert!(!events.is_empty(), "one ISS pass expected in the window");

    let pos = |kind: EventKind, info: &str| {
        events
            .iter()
            .position(|(k, i, _)| *k == kind && i == info)
    };

    let aos = pos(EventKind::Signal, "AOS").expect("AOS");
    let aos_mask = pos(EventKind::Mask, "AOS").expect("AOS (mask)");
    let max = pos(EventKind::Max, "MAX").expect("MAX");
    let los_mask = pos(EventKind::Mask, "LOS").expect("LOS (mask)");
    let los = pos(EventKind::Signal, "LOS").expect("LOS");

    assert!(aos < aos_mask, "the mask opens after the horizon");
    assert!(aos_mask < max);
    assert!(max < los_mask);
    assert!(los_mask < los, "the mask closes before the horizon");

    // Pass duration is a handful of minutes
    let duration = events[los].2 - events[aos].2;
    assert!(
        duration.total_seconds() > 120.0 && duration.total_seconds() < 1500.0,
        "pass duration {} s",
        duration.total_seconds()
    );
}

/// A closed Clohessy-Wiltshire relative trajectory returns to its initial
/// state after one target period.
#[test]
fn cw_closed_ellipse() {
    setup();

    let sma = 7000e3;
    let hill = Frame::hill(LocalFrame::Qsw);
    let propagator = ClohessyWiltshire::new(sma, hill.clone()).unwrap();
    let n = propagator.n();

    let date = Date::from_ymd(2018, 4, 5, TimeScale::Utc).unwrap();
    // Radial offset with the matching along-track velocity closes the
    // relative ellipse
    let x0 = 100.0;
    let sv = StateVector::new(
        Vector6::new(x0, 0.0, 5.0, 0.0, -2.0 * n * x0, 0.0),
        date,
        Form::Cartesian,
        hill,
    );
    let orbit = Orbit::new(sv.clone(), Box::new(propagator) as Box<dyn Propagator>).unwrap();

    let period = TimeDelta::from_seconds(std::f64::consts::TAU / n);
    let after = orbit.propagate(&date.shift(period).unwrap()).unwrap();
    assert!(
        (after.coord() - sv.coord()).norm() < 1e-6,
        "closed relative orbit"
    );

    // A bare radial offset drifts along-track
    let drifting = StateVector::new(
        Vector6::new(x0, 0.0, 0.0, 0.0, 0.0, 0.0),
        date,
        Form::Cartesian,
        Frame::hill(LocalFrame::Qsw),
    );
    let orbit = Orbit::new(
        drifting,
        Box::new(ClohessyWiltshire::new(sma, Frame::hill(LocalFrame::Qsw)).unwrap())
            as Box<dyn Propagator>,
    )
    .unwrap();
    let after = orbit.propagate(&date.shift(period).unwrap()).unwrap();
    assert!(after.coord()[1].abs() > 100.0, "along-track drift");
}

/// With a circular chief, Yamanaka-Ankersen collapses onto
/// Clohessy-Wiltshire.
#[test]
fn ya_matches_cw_for_circular_chief() {
    setup();

    let date = Date::from_ymd(2018, 4, 5, TimeScale::Utc).unwrap();
    let sma = 7000e3;
    let chief_state = StateVector::new(
        Vector6::new(sma, 1e-8, 0.9, 1.0, 0.0, 0.0),
        date,
        Form::Keplerian,
        get_frame("EME2000").unwrap(),
    );
    let chief = Orbit::new(chief_state, Box::new(Kepler::new()) as Box<dyn Propagator>).unwrap();

    let hill = Frame::hill(LocalFrame::Qsw);
    let relative = StateVector::new(
        Vector6::new(100.0, 10.0, 10.0, 0.1, 0.1, 0.1),
        date,
        Form::Cartesian,
        hill.clone(),
    );

    let cw = Orbit::new(
        relative.clone(),
        Box::new(ClohessyWiltshire::new(sma, hill.clone()).unwrap()) as Box<dyn Propagator>,
    )
    .unwrap();
    let ya = Orbit::new(
        relative,
        Box::new(YamanakaAnkersen::new(Arc::new(chief))) as Box<dyn Propagator>,
    )
    .unwrap();

    for minutes in [10.0, 30.0, 47.0] {
        let probe = date.shift(TimeDelta::from_minutes(minutes)).unwrap();
        let from_cw = cw.propagate(&probe).unwrap();
        let from_ya = ya.propagate(&probe).unwrap();
        let gap = (from_cw.coord().fixed_rows::<3>(0) - from_ya.coord().fixed_rows::<3>(0)).norm();
        assert!(
            gap < 1.0,
            "YA vs CW at {minutes} min: {gap} m apart"
        );
    }
}

/// The YA chief can equivalently be an ephemeris.
#[test]
fn ya_with_ephemeris_chief() {
    setup();

    let date = Date::from_ymd(2018, 4, 5, TimeScale::Utc).unwrap();
    let chief_state = StateVector::new(
        Vector6::new(7000e3, 0.1, 0.9, 1.0, 0.0, 0.3),
        date,
        Form::Keplerian,
        get_frame("EME2000").unwrap(),
    );
    let period = chief_state.infos().unwrap().period().unwrap();
    let chief = Orbit::new(chief_state, Box::new(Kepler::new()) as Box<dyn Propagator>).unwrap();
    let chief_ephem = chief
        .ephem(IterOpts::until(period * 1.2).with_step(TimeDelta::from_seconds(30.0)))
        .unwrap();

    let relative = StateVector::new(
        Vector6::new(100.0, 10.0, 10.0, 0.1, 0.1, 0.1),
        date,
        Form::Cartesian,
        Frame::hill(LocalFrame::Lvlh),
    );

    let from_orbit = Orbit::new(
        relative.clone(),
        Box::new(YamanakaAnkersen::new(Arc::new(chief))) as Box<dyn Propagator>,
    )
    .unwrap();
    let from_ephem = Orbit::new(
        relative,
        Box::new(YamanakaAnkersen::new(Arc::new(chief_ephem))) as Box<dyn Propagator>,
    )
    .unwrap();

    let probe = date.shift(TimeDelta::from_minutes(40.0)).unwrap();
    let a = from_orbit.propagate(&probe).unwrap();
    let b = from_ephem.propagate(&probe).unwrap();
    assert!(
        (a.coord().fixed_rows::<3>(0) - b.coord().fixed_rows::<3>(0)).norm() < 1e-2,
        "orbit-fed and ephemeris-fed chiefs agree"
    );
}

/// The SOI machinery picks the active body from the position of the
/// spacecraft.
#[test]
fn soi_active_body() {
    setup();

    let date = Date::from_ymd(2018, 4, 5, TimeScale::Utc).unwrap();

    // A synthetic moon on a Keplerian orbit, registered as a frame
    let moon_state = StateVector::new(
        Vector6::new(385_000e3, 0.0001, 0.1, 0.5, 0.0, 0.0),
        date,
        Form::Keplerian,
        get_frame("EME2000").unwrap(),
    );
    let moon_orbit =
        Orbit::new(moon_state, Box::new(Kepler::new()) as Box<dyn Propagator>).unwrap();
    let moon_frame = moon_orbit
        .as_frame("MoonToy", None, &get_frame("EME2000").unwrap())
        .unwrap();
    let moon_body = Body::moon().with_propagator(Arc::new(moon_orbit.clone()));

    let soi_table = vec![SoiBody {
        body: moon_body,
        radius: 66_000e3,
        frame: moon_frame.clone(),
    }];

    // Near the Earth
    let near_earth = StateVector::new(
        Vector6::new(7000e3, 0.001, 0.9, 1.0, 2.0, 0.0),
        date,
        Form::Keplerian,
        get_frame("EME2000").unwrap(),
    );
    let mut propagator = SoiAnalytical::new(
        get_body("Earth").unwrap(),
        get_frame("EME2000").unwrap(),
        soi_table.clone(),
        Some(get_frame("EME2000").unwrap()),
    );
    propagator.set_orbit(&near_earth).unwrap();
    assert_eq!(propagator.active_body().unwrap(), "Earth");

    // Deep inside the synthetic moon SOI
    let near_moon = moon_orbit
        .state_at(&date)
        .unwrap()
        .with_form(Form::Cartesian)
        .unwrap();
    let mut close = near_moon.clone();
    close.set_coord(near_moon.coord() + Vector6::new(10_000e3, 0.0, 0.0, 100.0, 0.0, 0.0));
    propagator.set_orbit(&close).unwrap();
    assert_eq!(propagator.active_body().unwrap(), "Moon");

    // And it still propagates from there
    let sample = propagator
        .propagate(&date.shift(TimeDelta::from_hours(1.0)).unwrap())
        .unwrap();
    assert_eq!(sample.frame().name(), "EME2000");
}

/// Listener machinery also drives ephemeris iteration.
#[test]
fn ephem_listener_iteration() {
    setup();

    let sv = StateVector::new(
        Vector6::new(6778e3, 0.0007, 0.9013, 1.5, 2.3, 0.8),
        Date::from_ymd(2018, 4, 5, TimeScale::Utc).unwrap(),
        Form::Keplerian,
        get_frame("EME2000").unwrap(),
    );
    let period = sv.infos().unwrap().period().unwrap();
    let orbit = Orbit::new(sv, Box::new(Kepler::new()) as Box<dyn Propagator>).unwrap();
    let ephem = orbit
        .ephem(IterOpts::until(period).with_step(TimeDelta::from_seconds(60.0)))
        .unwrap();

    let samples = ephem
        .iter(IterOpts::new().listen(Box::new(ApsideListener::new(None))))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    let events: Vec<_> = samples.iter().filter(|s| s.event().is_some()).collect();
    assert_eq!(events.len(), 2, "one perigee and one apogee per orbit");
    let infos: Vec<&str> = events
        .iter()
        .map(|s| s.event().unwrap().info.as_str())
        .collect();
    assert!(infos.contains(&"Periapsis"));
    assert!(infos.contains(&"Apoapsis"));
}
