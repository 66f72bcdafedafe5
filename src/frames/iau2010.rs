/*
 * Orrery Astrodynamics Core
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! IAU 2010 Earth orientation model: Earth rotation angle, polar motion and
//! the CIO-based precession-nutation through the X, Y, s coordinates.
//!
//! The X/Y/s polynomial parts are the IAU 2000A ones; the periodic series
//! is truncated to the dominant luni-solar terms (milliarcsecond level)
//! instead of carrying the full tabulated expansion.

use std::f64::consts::TAU;

use crate::constants::{EARTH_ROTATION_RATE, J2000_JD};
use crate::errors::TimeError;
use crate::math::rotation::{rot1, rot2, rot3};
use crate::math::{Matrix3, Vector3};
use crate::time::{Date, TimeScale};

/// Rotation rate vector of the Earth.
pub fn rate(date: &Date) -> Vector3 {
    let lod = date.eop().lod / 1000.0;
    Vector3::new(0.0, 0.0, EARTH_ROTATION_RATE * (1.0 - lod / 86400.0))
}

/// Polar motion as a rotation matrix (ITRF to TIRF), including the s′
/// locator of the Terrestrial Intermediate Origin.
pub fn earth_orientation(date: &Date) -> Result<Matrix3, TimeError> {
    let ttt = date.change_scale(TimeScale::Tt)?.julian_century();
    let s_prime = (-0.000047 * ttt / 3600.0_f64).to_radians();
    let x_p = (date.eop().x / 3600.0_f64).to_radians();
    let y_p = (date.eop().y / 3600.0_f64).to_radians();
    Ok(rot3(-s_prime) * rot2(x_p) * rot1(y_p))
}

/// Earth rotation angle, in radians.
fn era(date: &Date) -> Result<f64, TimeError> {
    let jd = date.change_scale(TimeScale::Ut1)?.jd();
    Ok(TAU * (0.779057273264 + 1.00273781191135448 * (jd - J2000_JD)))
}

/// Earth rotation as a rotation matrix (TIRF to CIRF).
pub fn sideral(date: &Date) -> Result<Matrix3, TimeError> {
    Ok(rot3(-era(date)?))
}

/// Delaunay arguments of the IAU 2000 theory, in radians.
fn delaunay(ttt: f64) -> [f64; 5] {
    let arcsec = |v: f64| ((v / 3600.0) % 360.0).to_radians();
    [
        // Mean anomaly of the Moon
        arcsec(
            485868.249036 + 1717915923.2178 * ttt + 31.8792 * ttt.powi(2)
                + 0.051635 * ttt.powi(3)
                - 0.0002447 * ttt.powi(4),
        ),
        // Mean anomaly of the Sun
        arcsec(
            1287104.79305 + 129596581.0481 * ttt - 0.5532 * ttt.powi(2) + 0.000136 * ttt.powi(3)
                - 0.00001149 * ttt.powi(4),
        ),
        // Mean argument of latitude of the Moon
        arcsec(
            335779.526232 + 1739527262.8478 * ttt
                - 12.7512 * ttt.powi(2)
                - 0.001037 * ttt.powi(3)
                + 0.00000417 * ttt.powi(4),
        ),
        // Mean elongation of the Moon from the Sun
        arcsec(
            1072260.70369 + 1602961601.209 * ttt - 6.3706 * ttt.powi(2) + 0.006593 * ttt.powi(3)
                - 0.00003169 * ttt.powi(4),
        ),
        // Mean longitude of the ascending node of the Moon
        arcsec(
            450160.398036 - 6962890.5431 * ttt + 7.4722 * ttt.powi(2) + 0.007702 * ttt.powi(3)
                - 0.00005939 * ttt.powi(4),
        ),
    ]
}

/// (l, l', F, D, Ω) multipliers, sine and cosine amplitudes in µas.
type CioTerm = ([i8; 5], f64, f64);

/// Dominant periodic terms of the CIP X coordinate.
const X_SERIES: [CioTerm; 6] = [
    ([0, 0, 0, 0, 1], -6844318.44, 1328.67),
    ([0, 0, 2, -2, 2], -523908.04, -544.75),
    ([0, 0, 2, 0, 2], -90552.22, 111.23),
    ([0, 0, 0, 0, 2], 82168.76, -27.64),
    ([0, 1, 0, 0, 0], 58707.02, 470.05),
    ([1, 0, 0, 0, 0], 0.0, 18.67),
];

/// Dominant periodic terms of the CIP Y coordinate.
const Y_SERIES: [CioTerm; 6] = [
    ([0, 0, 0, 0, 1], 1538.18, 9205236.26),
    ([0, 0, 2, -2, 2], -458.66, 573033.42),
    ([0, 0, 2, 0, 2], 137.41, 97846.69),
    ([0, 0, 0, 0, 2], -29.05, -89618.24),
    ([0, 1, 0, 0, 0], -17.40, 22438.42),
    ([1, 0, 0, 0, 0], -2.54, 1181.91),
];

/// Dominant periodic terms of s + XY/2.
const S_SERIES: [CioTerm; 9] = [
    ([0, 0, 0, 0, 1], -2640.73, 0.39),
    ([0, 0, 0, 0, 2], -63.53, 0.02),
    ([0, 0, 2, -2, 3], -11.75, -0.01),
    ([0, 0, 2, -2, 1], -11.21, -0.01),
    ([0, 0, 2, -2, 2], 4.57, 0.00),
    ([0, 0, 2, 0, 3], -2.02, 0.00),
    ([0, 0, 2, 0, 1], -1.98, 0.00),
    ([0, 0, 0, 0, 3], 1.72, 0.00),
    ([0, 1, 0, 0, 1], 1.41, 0.01),
];

fn series_sum(series: &[CioTerm], args: &[f64; 5]) -> f64 {
    let mut out = 0.0;
    for (coefs, s, c) in series {
        let arg: f64 = coefs
            .iter()
            .zip(args.iter())
            .map(|(&k, &a)| k as f64 * a)
            .sum();
        out += s * arg.sin() + c * arg.cos();
    }
    out
}

/// X, Y and s + XY/2, in arcsec.
fn xysxy2(date: &Date) -> Result<(f64, f64, f64), TimeError> {
    let ttt = date.change_scale(TimeScale::Tt)?.julian_century();
    let args = delaunay(ttt);

    // Polynomial parts, in µas
    let mut x = -16616.99 + 2004191742.88 * ttt - 427219.05 * ttt.powi(2)
        - 198620.54 * ttt.powi(3)
        - 46.05 * ttt.powi(4)
        + 5.98 * ttt.powi(5);
    let mut y = -6950.78 - 25381.99 * ttt - 22407250.99 * ttt.powi(2)
        + 1842.28 * ttt.powi(3)
        + 1113.06 * ttt.powi(4)
        + 0.99 * ttt.powi(5);
    let mut s_xy2 = 94.0 + 3808.65 * ttt - 122.68 * ttt.powi(2) - 72574.11 * ttt.powi(3)
        + 27.98 * ttt.powi(4)
        + 15.62 * ttt.powi(5);

    x += series_sum(&X_SERIES, &args);
    y += series_sum(&Y_SERIES, &args);
    s_xy2 += series_sum(&S_SERIES, &args);

    // Conversion to arcsec
    Ok((x * 1e-6, y * 1e-6, s_xy2 * 1e-6))
}

/// X, Y, s with EOP corrections, in radians.
fn xys(date: &Date) -> Result<(f64, f64, f64), TimeError> {
    let (x, y, s_xy2) = xysxy2(date)?;

    // milliarcsec to arcsec
    let dx = date.eop().dx / 1000.0;
    let dy = date.eop().dy / 1000.0;

    let x = ((x + dx) / 3600.0).to_radians();
    let y = ((y + dy) / 3600.0).to_radians();
    let s = (s_xy2 / 3600.0).to_radians() - x * y / 2.0;

    Ok((x, y, s))
}

/// Precession-nutation joint rotation matrix (CIRF to GCRF).
pub fn precession_nutation(date: &Date) -> Result<Matrix3, TimeError> {
    let (x, y, s) = xys(date)?;

    let d = ((x.powi(2) + y.powi(2)) / (1.0 - x.powi(2) - y.powi(2)))
        .sqrt()
        .atan();
    let a = 1.0 / (1.0 + d.cos());

    let pn = Matrix3::new(
        1.0 - a * x.powi(2),
        -a * x * y,
        x,
        -a * x * y,
        1.0 - a * y.powi(2),
        y,
        -x,
        -y,
        1.0 - a * (x.powi(2) + y.powi(2)),
    );
    Ok(pn * rot3(s))
}
