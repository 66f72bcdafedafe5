/*
 * Orrery Astrodynamics Core
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use orrery::io::Tle;

use crate::common::setup;

const ISS: &str = "ISS (ZARYA)
1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927
2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537";

/// Parsing a TLE, building the orbit and re-emitting it reproduces the
/// orbital-element columns byte for byte.
#[test]
fn tle_roundtrip_element_columns() {
    setup();

    let tle = Tle::parse(ISS).unwrap();
    let orbit = tle.orbit().unwrap();
    let emitted = Tle::from_statevector(orbit.state()).unwrap();

    let original_line2 = ISS.lines().nth(2).unwrap();
    let emitted_line2 = emitted.text().lines().last().unwrap();

    // Columns 9-63 carry i, Ω, e, ω, M and n
    assert_eq!(
        &original_line2[8..63],
        &emitted_line2[8..63],
        "element columns are byte-identical"
    );

    // The emitted lines carry valid checksums and reparse cleanly
    let reparsed = Tle::parse(emitted.text()).unwrap();
    assert_eq!(reparsed.norad_id, tle.norad_id);
    assert_eq!(reparsed.cospar_id, tle.cospar_id);
    assert!((reparsed.epoch - tle.epoch).total_seconds().abs() < 1e-4);
    assert!((reparsed.bstar - tle.bstar).abs() < 1e-12);
}

#[test]
fn tle_epoch_day_roundtrip() {
    setup();

    let tle = Tle::parse(ISS).unwrap();
    let emitted = Tle::from_statevector(tle.orbit().unwrap().state()).unwrap();

    let original_line1 = ISS.lines().nth(1).unwrap();
    let emitted_line1 = emitted.text().lines().nth(1).unwrap();
    assert_eq!(
        &original_line1[18..32],
        &emitted_line1[18..32],
        "epoch columns are byte-identical"
    );
}

#[test]
fn tle_drag_columns_roundtrip() {
    setup();

    let tle = Tle::parse(ISS).unwrap();
    let emitted = Tle::from_statevector(tle.orbit().unwrap().state()).unwrap();

    let original_line1 = ISS.lines().nth(1).unwrap();
    let emitted_line1 = emitted.text().lines().nth(1).unwrap();
    // ndot, ndotdot and bstar columns
    assert_eq!(&original_line1[33..61], &emitted_line1[33..61]);
}
