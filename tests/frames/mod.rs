/*
 * Orrery Astrodynamics Core
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use orrery::frames::stations::StationHeading;
use orrery::frames::{create_station, get_frame, orbit_to_frame, FrameOffset};
use orrery::math::Vector6;
use orrery::orbits::forms::Form;
use orrery::orbits::StateVector;
use orrery::time::{Date, TimeScale};

use crate::common::{assert_state, setup};

/// Reference state of Vallado §3.7.3, in ITRF at 2004-04-06
/// 07:51:28.386009 UTC.
fn vallado_state() -> StateVector {
    let date = Date::new(2004, 4, 6, 7, 51, 28, 386009, TimeScale::Utc).unwrap();
    StateVector::new(
        Vector6::new(
            -1033479.383,
            7901295.2754,
            6380356.5958,
            -3225.636520,
            -2872.451450,
            5531.924446,
        ),
        date,
        Form::Cartesian,
        get_frame("ITRF").unwrap(),
    )
}

const PEF_REF: [f64; 6] = [
    -1033475.03131,
    7901305.5856,
    6380344.5328,
    -3225.632747,
    -2872.442511,
    5531.931288,
];

const TOD_REF: [f64; 6] = [
    5094514.7804,
    6127366.4612,
    6380344.5328,
    -4746.088567,
    786.077222,
    5531.931288,
];

const EME_REF: [f64; 6] = [
    5102509.6,
    6123011.52,
    6378136.3,
    -4743.2196,
    790.5366,
    5533.75619,
];

const TIRF_REF: [f64; 6] = [
    -1033475.0312,
    7901305.5856,
    6380344.5327,
    -3225.632747,
    -2872.442511,
    5531.931288,
];

const CIRF_REF: [f64; 6] = [
    5100018.4047,
    6122786.3648,
    6380344.5327,
    -4745.380330,
    790.341453,
    5531.931288,
];

/// IAU 1980 chain, leg by leg, against the Vallado reference vectors.
#[test]
fn vallado_iau1980_chain() {
    setup();
    let itrf = vallado_state();

    let pef = itrf.clone().with_frame(&get_frame("PEF").unwrap()).unwrap();
    assert_state(&Vector6::from_row_slice(&PEF_REF), &pef, 1e-4, 1e-6, "PEF");

    // Back to ITRF
    let back = pef.clone().with_frame(&get_frame("ITRF").unwrap()).unwrap();
    assert_state(itrf.coord(), &back, 1e-4, 1e-6, "PEF -> ITRF");

    let tod = pef.clone().with_frame(&get_frame("TOD").unwrap()).unwrap();
    assert_state(&Vector6::from_row_slice(&TOD_REF), &tod, 5e-2, 1e-4, "TOD");

    let back = tod.clone().with_frame(&get_frame("PEF").unwrap()).unwrap();
    assert_state(pef.coord(), &back, 1e-4, 1e-6, "TOD -> PEF");

    // Full chain to EME2000, within a centimeter of the J2000 vector
    let eme = itrf
        .clone()
        .with_frame(&get_frame("EME2000").unwrap())
        .unwrap();
    assert_state(&Vector6::from_row_slice(&EME_REF), &eme, 1e-2, 1e-4, "EME2000");
}

/// IAU 2010 chain against the reference vectors. The CIO series carried
/// here keeps the dominant terms, hence the meter-level tolerance on the
/// precession-nutation legs.
#[test]
fn vallado_iau2010_chain() {
    setup();
    let itrf = vallado_state();

    let tirf = itrf.clone().with_frame(&get_frame("TIRF").unwrap()).unwrap();
    assert_state(&Vector6::from_row_slice(&TIRF_REF), &tirf, 1e-4, 1e-6, "TIRF");

    let back = tirf.clone().with_frame(&get_frame("ITRF").unwrap()).unwrap();
    assert_state(itrf.coord(), &back, 1e-4, 1e-6, "TIRF -> ITRF");

    let cirf = tirf.clone().with_frame(&get_frame("CIRF").unwrap()).unwrap();
    assert_state(&Vector6::from_row_slice(&CIRF_REF), &cirf, 2.0, 1e-2, "CIRF");

    let back = cirf.clone().with_frame(&get_frame("TIRF").unwrap()).unwrap();
    assert_state(tirf.coord(), &back, 1e-4, 1e-6, "CIRF -> TIRF");

    let gcrf = cirf.clone().with_frame(&get_frame("GCRF").unwrap()).unwrap();
    let back = gcrf.clone().with_frame(&get_frame("CIRF").unwrap()).unwrap();
    assert_state(cirf.coord(), &back, 1e-4, 1e-6, "GCRF -> CIRF");
}

/// For any frame pair, there and back is the identity within 1e-4 m and
/// 1e-6 m/s.
#[test]
fn frame_roundtrips() {
    setup();
    let itrf = vallado_state();

    for name in ["PEF", "TOD", "MOD", "EME2000", "TEME", "G50", "TIRF", "CIRF", "GCRF"] {
        let target = get_frame(name).unwrap();
        let there = itrf.clone().with_frame(&target).unwrap();
        let back = there.with_frame(&get_frame("ITRF").unwrap()).unwrap();
        assert_state(
            itrf.coord(),
            &back,
            1e-4,
            1e-6,
            &format!("ITRF -> {name} -> ITRF"),
        );
    }
}

/// The graph routes between the two model legs (e.g. TEME to GCRF) without
/// special casing.
#[test]
fn cross_model_routing() {
    setup();
    let itrf = vallado_state();

    let teme = itrf.clone().with_frame(&get_frame("TEME").unwrap()).unwrap();
    let gcrf = teme.clone().with_frame(&get_frame("GCRF").unwrap()).unwrap();
    let back = gcrf.with_frame(&get_frame("TEME").unwrap()).unwrap();
    assert_state(teme.coord(), &back, 1e-4, 1e-6, "TEME -> GCRF -> TEME");
}

#[test]
fn station_topocentric_frame() {
    setup();

    let station = create_station(
        "ToulouseFrames",
        (43.604482, 1.443962, 172.0),
        &get_frame("WGS84").unwrap(),
        StationHeading::North,
        None,
    )
    .unwrap();

    // A point straight above the station, in the station frame, sits at
    // zenith: elevation +90 degrees
    let date = Date::from_ymd(2018, 4, 5, TimeScale::Utc).unwrap();
    let above = orrery::frames::stations::geodetic_to_cartesian(
        43.604482_f64.to_radians(),
        1.443962_f64.to_radians(),
        500_000.0,
        &orrery::bodies::Body::earth(),
    );
    let mut coord = Vector6::zeros();
    coord.fixed_rows_mut::<3>(0).copy_from(&above);
    let sv = StateVector::new(coord, date, Form::Cartesian, get_frame("ITRF").unwrap());

    let topo = sv
        .clone()
        .with_frame(&station.frame)
        .unwrap()
        .with_form(Form::Spherical)
        .unwrap();
    let elevation = topo.get("phi").unwrap();
    assert!(
        (elevation.to_degrees() - 90.0).abs() < 0.2,
        "zenith elevation {} deg",
        elevation.to_degrees()
    );

    // Round trip through the topocentric frame
    let back = sv
        .clone()
        .with_frame(&station.frame)
        .unwrap()
        .with_frame(&get_frame("ITRF").unwrap())
        .unwrap();
    assert_state(sv.coord(), &back, 1e-5, 1e-8, "ITRF -> station -> ITRF");
}

/// A frame attached to a fixed state has that state at its origin.
#[test]
fn orbit_attached_frame() {
    setup();

    let date = Date::from_ymd(2018, 4, 5, TimeScale::Utc).unwrap();
    let anchor = StateVector::new(
        Vector6::new(7000e3, 0.0, 0.0, 0.0, 7500.0, 0.0),
        date,
        Form::Cartesian,
        get_frame("EME2000").unwrap(),
    );

    let frame = orbit_to_frame(
        "AnchorFrames",
        FrameOffset::Fixed(anchor.clone()),
        None,
        &get_frame("EME2000").unwrap(),
    )
    .unwrap();

    let relative = anchor.clone().with_frame(&frame).unwrap();
    assert!(
        relative.coord().fixed_rows::<3>(0).norm() < 1e-6,
        "the anchor is the origin of its own frame"
    );

    // A point 1 km ahead on the velocity axis
    let mut other = anchor.clone();
    other.set_coord(anchor.coord() + Vector6::new(0.0, 1000.0, 0.0, 0.0, 0.0, 0.0));
    let relative = other.with_frame(&frame).unwrap();
    assert!((relative.coord()[1] - 1000.0).abs() < 1e-6);
}
