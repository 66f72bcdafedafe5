/*
 * Orrery Astrodynamics Core
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use orrery::errors::EphemerisError;
use orrery::frames::get_frame;
use orrery::math::interp::InterpMethod;
use orrery::math::{Matrix6, Vector6};
use orrery::orbits::forms::{m_to_e, Form};
use orrery::orbits::{CovFrame, Covariance, Ephem, Orbit, StateVector};
use orrery::propagators::{IterOpts, Kepler, Propagator};
use orrery::time::{Date, TimeDelta, TimeScale};

use crate::common::setup;

fn iss_like() -> StateVector {
    let date = Date::from_ymd(2018, 4, 5, TimeScale::Utc).unwrap();
    StateVector::new(
        Vector6::new(6778e3, 0.0007, 0.9013, 1.5, 2.3, 0.8),
        date,
        Form::Keplerian,
        get_frame("EME2000").unwrap(),
    )
}

/// Converting any form there and back preserves the 6-vector to 1e-9
/// relative.
#[test]
fn form_roundtrips() {
    setup();
    let kep = iss_like();

    for form in [
        Form::Cartesian,
        Form::Spherical,
        Form::KeplerianEccentric,
        Form::KeplerianMean,
        Form::KeplerianCircular,
        Form::MeanCircular,
        Form::Equinoctial,
        Form::Cylindrical,
        Form::Tle,
    ] {
        let back = kep
            .clone()
            .with_form(form)
            .unwrap()
            .with_form(Form::Keplerian)
            .unwrap();
        let rel = (back.coord() - kep.coord()).norm() / kep.coord().norm();
        assert!(rel < 1e-9, "keplerian -> {form} -> keplerian: {rel:e}");
    }

    // Same sweep anchored on the cartesian representation
    let cart = kep.clone().with_form(Form::Cartesian).unwrap();
    for form in [Form::Spherical, Form::Keplerian, Form::Tle, Form::Equinoctial] {
        let back = cart
            .clone()
            .with_form(form)
            .unwrap()
            .with_form(Form::Cartesian)
            .unwrap();
        let rel = (back.coord() - cart.coord()).norm() / cart.coord().norm();
        assert!(rel < 1e-9, "cartesian -> {form} -> cartesian: {rel:e}");
    }
}

#[test]
fn hyperbolic_form_roundtrip() {
    setup();
    let date = Date::from_ymd(2018, 4, 5, TimeScale::Utc).unwrap();
    let kep = StateVector::new(
        Vector6::new(-20000e3, 1.5, 0.4, 1.0, 2.0, 0.3),
        date,
        Form::Keplerian,
        get_frame("EME2000").unwrap(),
    );

    let back = kep
        .clone()
        .with_form(Form::KeplerianMean)
        .unwrap()
        .with_form(Form::Keplerian)
        .unwrap();
    let rel = (back.coord() - kep.coord()).norm() / kep.coord().norm();
    assert!(rel < 1e-9, "hyperbolic anomaly roundtrip: {rel:e}");
}

/// Kepler equation residuals over the whole (e, M) grid of the contract.
#[test]
fn kepler_equation_grid() {
    setup();
    let mut e = 0.0;
    while e < 0.99 {
        let mut m = 0.0;
        while m < std::f64::consts::TAU {
            let big_e = m_to_e(e, m);
            assert!((big_e - e * big_e.sin() - m).abs() < 1e-8);
            m += 0.1;
        }
        e += 0.033;
    }

    // Small mean anomaly at high eccentricity
    assert!((m_to_e(0.95, 1e-4) - 0.0124897).abs() < 1e-7);
}

#[test]
fn covariance_follows_frame_and_local_tags() {
    setup();
    let mut sv = iss_like().with_form(Form::Cartesian).unwrap();

    let mut mat = Matrix6::identity() * 100.0;
    mat[(3, 3)] = 1e-2;
    mat[(4, 4)] = 1e-2;
    mat[(5, 5)] = 1e-2;
    let cov = Covariance::new(mat, CovFrame::Frame(sv.frame().clone())).unwrap();
    sv.set_cov(cov);

    // Local retagging round trip restores the matrix
    sv.set_cov_frame(CovFrame::Qsw).unwrap();
    assert_eq!(sv.cov().unwrap().frame(), &CovFrame::Qsw);
    sv.set_cov_frame(CovFrame::Frame(sv.frame().clone())).unwrap();
    let recovered = sv.cov().unwrap().matrix();
    assert!((recovered - mat).norm() < 1e-6 * mat.norm());

    // Changing the owner frame retags a matching covariance
    let itrf = get_frame("ITRF").unwrap();
    sv.set_frame(&itrf).unwrap();
    assert_eq!(sv.cov().unwrap().frame(), &CovFrame::Frame(itrf));
}

fn one_orbit_ephem() -> Ephem {
    let sv = iss_like();
    let period = sv.infos().unwrap().period().unwrap();
    let orbit = Orbit::new(sv, Box::new(Kepler::new()) as Box<dyn Propagator>).unwrap();
    orbit
        .ephem(IterOpts::until(period).with_step(TimeDelta::from_seconds(60.0)))
        .unwrap()
}

#[test]
fn ephem_interpolation() {
    setup();
    let ephem = one_orbit_ephem();

    // Bit-exact at a stored sample
    let probe = ephem.states()[17].clone();
    let interp = ephem.interpolate(&probe.date()).unwrap();
    assert_eq!(interp.coord(), probe.coord());

    // Lagrange between samples stays close to the true propagation
    let orbit = Orbit::new(
        iss_like(),
        Box::new(Kepler::new()) as Box<dyn Propagator>,
    )
    .unwrap();
    let date = ephem.start().shift(TimeDelta::from_seconds(1234.5)).unwrap();
    let expected = orbit.propagate(&date).unwrap();
    let interp = ephem.interpolate(&date).unwrap();
    assert!(
        (interp.coord().fixed_rows::<3>(0) - expected.coord().fixed_rows::<3>(0)).norm() < 1e-2
    );

    // Linear interpolation is coarser but still sane at a 60 s step
    let linear = ephem.clone().with_method(InterpMethod::Linear, 2);
    let interp = linear.interpolate(&date).unwrap();
    assert!(
        (interp.coord().fixed_rows::<3>(0) - expected.coord().fixed_rows::<3>(0)).norm() < 5e3
    );

    // Out of range is strict
    let outside = ephem.stop().shift(TimeDelta::from_hours(1.0)).unwrap();
    assert!(matches!(
        ephem.interpolate(&outside),
        Err(EphemerisError::OutOfRange { .. })
    ));
}

#[test]
fn ephem_windowing() {
    setup();
    let ephem = one_orbit_ephem();

    // Walking the stored samples
    let count = ephem
        .iter(IterOpts::new())
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
        .len();
    assert_eq!(count, ephem.len());

    // Sub-slicing with a different step re-samples
    let sub = ephem
        .ephem(
            IterOpts::until(ephem.stop()).with_step(TimeDelta::from_seconds(120.0)),
        )
        .unwrap();
    assert!(sub.len() < ephem.len());
    assert_eq!(sub.start(), ephem.start());

    // Explicit dates
    let dates = vec![
        ephem.start(),
        ephem.start().shift(TimeDelta::from_minutes(10.0)).unwrap(),
    ];
    let sampled = ephem
        .iter(IterOpts::over(dates))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(sampled.len(), 2);
}

#[test]
fn statevector_copy_semantics() {
    setup();
    let sv = iss_like();

    let other = sv
        .clone()
        .with_frame(&get_frame("ITRF").unwrap())
        .unwrap()
        .with_form(Form::Cartesian)
        .unwrap();

    let same = sv.clone().with_same(&other).unwrap();
    assert_eq!(same.form(), Form::Cartesian);
    assert_eq!(same.frame(), other.frame());
    // Same instant, same point
    assert!((same.coord() - other.coord()).norm() < 1e-6);
}

#[test]
fn orbit_infos_domain_errors() {
    setup();
    let infos = iss_like().infos().unwrap();
    assert!(infos.vinf().is_err());
    assert!(infos.period().is_ok());
    assert!(infos.apocenter().unwrap() > 6778e3);
    assert!(infos.pericenter_altitude() > 300e3);
}
