/*
 * Orrery Astrodynamics Core
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! IAU 1980 Earth orientation model: nutation, equinox equation, sidereal
//! time, precession and polar motion.
//!
//! The nutation series below is the full 106-term IAU 1980 table, ordered by
//! decreasing amplitude in longitude so that a truncated evaluation (the
//! `terms` argument) keeps the dominant terms. Coefficients are in 0.1 mas
//! (1e-4 arcsec), the standard publication unit.

use crate::constants::EARTH_ROTATION_RATE;
use crate::errors::TimeError;
use crate::math::rotation::{rot1, rot2, rot3};
use crate::math::{Matrix3, Vector3};
use crate::time::{Date, TimeScale};

/// (l, l', F, D, Ω) multipliers, A, B (Δψ, 1e-4 arcsec), C, D (Δε).
type NutationTerm = (i8, i8, i8, i8, i8, f64, f64, f64, f64);

#[rustfmt::skip]
const NUTATION_1980: [NutationTerm; 106] = [
    ( 0,  0,  0,  0,  1, -171996.0, -174.2,  92025.0,  8.9),
    ( 0,  0,  2, -2,  2,  -13187.0,   -1.6,   5736.0, -3.1),
    ( 0,  0,  2,  0,  2,   -2274.0,   -0.2,    977.0, -0.5),
    ( 0,  0,  0,  0,  2,    2062.0,    0.2,   -895.0,  0.5),
    ( 0,  1,  0,  0,  0,    1426.0,   -3.4,     54.0, -0.1),
    ( 1,  0,  0,  0,  0,     712.0,    0.1,     -7.0,  0.0),
    ( 0,  1,  2, -2,  2,    -517.0,    1.2,    224.0, -0.6),
    ( 0,  0,  2,  0,  1,    -386.0,   -0.4,    200.0,  0.0),
    ( 1,  0,  2,  0,  2,    -301.0,    0.0,    129.0, -0.1),
    ( 0, -1,  2, -2,  2,     217.0,   -0.5,    -95.0,  0.3),
    ( 1,  0,  0, -2,  0,    -158.0,    0.0,     -1.0,  0.0),
    ( 0,  0,  2, -2,  1,     129.0,    0.1,    -70.0,  0.0),
    (-1,  0,  2,  0,  2,     123.0,    0.0,    -53.0,  0.0),
    ( 1,  0,  0,  0,  1,      63.0,    0.1,    -33.0,  0.0),
    ( 0,  0,  0,  2,  0,      63.0,    0.0,     -2.0,  0.0),
    (-1,  0,  2,  2,  2,     -59.0,    0.0,     26.0,  0.0),
    (-1,  0,  0,  0,  1,     -58.0,   -0.1,     32.0,  0.0),
    ( 1,  0,  2,  0,  1,     -51.0,    0.0,     27.0,  0.0),
    ( 2,  0,  0, -2,  0,      48.0,    0.0,      1.0,  0.0),
    (-2,  0,  2,  0,  1,      46.0,    0.0,    -24.0,  0.0),
    ( 0,  0,  2,  2,  2,     -38.0,    0.0,     16.0,  0.0),
    ( 2,  0,  2,  0,  2,     -31.0,    0.0,     13.0,  0.0),
    ( 2,  0,  0,  0,  0,      29.0,    0.0,     -1.0,  0.0),
    ( 1,  0,  2, -2,  2,      29.0,    0.0,    -12.0,  0.0),
    ( 0,  0,  2,  0,  0,      26.0,    0.0,     -1.0,  0.0),
    ( 0,  0,  2, -2,  0,     -22.0,    0.0,      0.0,  0.0),
    (-1,  0,  2,  0,  1,      21.0,    0.0,    -10.0,  0.0),
    ( 0,  2,  0,  0,  0,      17.0,   -0.1,      0.0,  0.0),
    ( 0,  2,  2, -2,  2,     -16.0,    0.1,      7.0,  0.0),
    (-1,  0,  0,  2,  1,      16.0,    0.0,     -8.0,  0.0),
    ( 0,  1,  0,  0,  1,     -15.0,    0.0,      9.0,  0.0),
    ( 1,  0,  0, -2,  1,     -13.0,    0.0,      7.0,  0.0),
    ( 0, -1,  0,  0,  1,     -12.0,    0.0,      6.0,  0.0),
    ( 2,  0, -2,  0,  0,      11.0,    0.0,      0.0,  0.0),
    (-1,  0,  2,  2,  1,     -10.0,    0.0,      5.0,  0.0),
    ( 1,  0,  2,  2,  2,      -8.0,    0.0,      3.0,  0.0),
    ( 0, -1,  2,  0,  2,      -7.0,    0.0,      3.0,  0.0),
    ( 0,  0,  2,  2,  1,      -7.0,    0.0,      3.0,  0.0),
    ( 1,  1,  0, -2,  0,      -7.0,    0.0,      0.0,  0.0),
    ( 0,  1,  2,  0,  2,       7.0,    0.0,     -3.0,  0.0),
    (-2,  0,  0,  2,  1,      -6.0,    0.0,      3.0,  0.0),
    ( 0,  0,  0,  2,  1,      -6.0,    0.0,      3.0,  0.0),
    ( 2,  0,  2, -2,  2,       6.0,    0.0,     -3.0,  0.0),
    ( 1,  0,  0,  2,  0,       6.0,    0.0,      0.0,  0.0),
    ( 1,  0,  2, -2,  1,       6.0,    0.0,     -3.0,  0.0),
    ( 0,  0,  0, -2,  1,      -5.0,    0.0,      3.0,  0.0),
    ( 0, -1,  2, -2,  1,      -5.0,    0.0,      3.0,  0.0),
    ( 2,  0,  2,  0,  1,      -5.0,    0.0,      3.0,  0.0),
    ( 1, -1,  0,  0,  0,       5.0,    0.0,      0.0,  0.0),
    ( 1,  0,  0, -1,  0,      -4.0,    0.0,      0.0,  0.0),
    ( 0,  0,  0,  1,  0,      -4.0,    0.0,      0.0,  0.0),
    ( 0,  1,  0, -2,  0,      -4.0,    0.0,      0.0,  0.0),
    ( 1,  0, -2,  0,  0,       4.0,    0.0,      0.0,  0.0),
    ( 2,  0,  0, -2,  1,       4.0,    0.0,     -2.0,  0.0),
    ( 0,  1,  2, -2,  1,       4.0,    0.0,     -2.0,  0.0),
    ( 1,  1,  0,  0,  0,      -3.0,    0.0,      0.0,  0.0),
    ( 1, -1,  0, -1,  0,      -3.0,    0.0,      0.0,  0.0),
    (-1, -1,  2,  2,  2,      -3.0,    0.0,      1.0,  0.0),
    ( 0, -1,  2,  2,  2,      -3.0,    0.0,      1.0,  0.0),
    ( 1, -1,  2,  0,  2,      -3.0,    0.0,      1.0,  0.0),
    ( 3,  0,  2,  0,  2,      -3.0,    0.0,      1.0,  0.0),
    (-2,  0,  2,  0,  2,      -3.0,    0.0,      1.0,  0.0),
    ( 1,  0,  2,  0,  0,       3.0,    0.0,      0.0,  0.0),
    (-1,  0,  2,  4,  2,      -2.0,    0.0,      1.0,  0.0),
    ( 1,  0,  0,  0,  2,      -2.0,    0.0,      1.0,  0.0),
    (-1,  0,  2, -2,  1,      -2.0,    0.0,      1.0,  0.0),
    ( 0, -2,  2, -2,  1,      -2.0,    0.0,      1.0,  0.0),
    (-2,  0,  0,  0,  1,      -2.0,    0.0,      1.0,  0.0),
    ( 2,  0,  0,  0,  1,       2.0,    0.0,     -1.0,  0.0),
    ( 3,  0,  0,  0,  0,       2.0,    0.0,      0.0,  0.0),
    ( 1,  1,  2,  0,  2,       2.0,    0.0,     -1.0,  0.0),
    ( 0,  0,  2,  1,  2,       2.0,    0.0,     -1.0,  0.0),
    ( 1,  0,  0,  2,  1,      -1.0,    0.0,      0.0,  0.0),
    ( 1,  0,  2,  2,  1,      -1.0,    0.0,      1.0,  0.0),
    ( 0,  1,  0,  2,  0,      -1.0,    0.0,      0.0,  0.0),
    ( 0,  1,  2, -2,  0,      -1.0,    0.0,      0.0,  0.0),
    ( 0,  1, -2,  2,  0,      -1.0,    0.0,      0.0,  0.0),
    ( 0,  1,  0,  0,  2,       1.0,    0.0,      0.0,  0.0),
    (-1,  0,  0,  1,  1,       1.0,    0.0,      0.0,  0.0),
    ( 0,  0, -2,  2,  1,       1.0,    0.0,      0.0,  0.0),
    ( 2,  0, -2,  0,  1,       1.0,    0.0,      0.0,  0.0),
    ( 2,  1,  0, -2,  0,       1.0,    0.0,      0.0,  0.0),
    (-1,  0,  0,  0,  2,       1.0,    0.0,     -1.0,  0.0),
    ( 1,  0,  0, -4,  0,      -1.0,    0.0,      0.0,  0.0),
    (-2,  0,  2,  2,  2,       1.0,    0.0,     -1.0,  0.0),
    ( 2,  0,  0, -4,  0,      -1.0,    0.0,      0.0,  0.0),
    ( 1,  1,  2, -2,  2,       1.0,    0.0,     -1.0,  0.0),
    (-2,  0,  2,  4,  2,      -1.0,    0.0,      1.0,  0.0),
    (-1,  0,  4,  0,  2,       1.0,    0.0,      0.0,  0.0),
    ( 1, -1,  0, -2,  0,       1.0,    0.0,      0.0,  0.0),
    ( 2,  0,  2, -2,  1,       1.0,    0.0,     -1.0,  0.0),
    ( 2,  0,  2,  2,  2,      -1.0,    0.0,      0.0,  0.0),
    ( 0,  0,  4, -2,  2,       1.0,    0.0,      0.0,  0.0),
    ( 3,  0,  2, -2,  2,       1.0,    0.0,      0.0,  0.0),
    ( 0,  0,  2,  4,  2,      -1.0,    0.0,      0.0,  0.0),
    ( 0,  0,  2, -1,  2,       1.0,    0.0,      0.0,  0.0),
    ( 2,  0,  0,  2,  0,       1.0,    0.0,      0.0,  0.0),
    ( 0,  0, -2,  0,  1,      -1.0,    0.0,      0.0,  0.0),
    ( 0,  1,  0,  1,  0,       1.0,    0.0,      0.0,  0.0),
    ( 1,  0, -2, -2,  0,      -1.0,    0.0,      0.0,  0.0),
    ( 0, -1,  2,  0,  1,      -1.0,    0.0,      0.0,  0.0),
    ( 1,  1,  0, -2,  1,      -1.0,    0.0,      0.0,  0.0),
    ( 1,  0, -2,  2,  0,      -1.0,    0.0,      0.0,  0.0),
    ( 0,  0,  0,  1,  1,      -1.0,    0.0,      0.0,  0.0),
    ( 0,  0,  4,  0,  2,       1.0,    0.0,      0.0,  0.0),
    (-1, -1,  0,  2,  1,       1.0,    0.0,      0.0,  0.0),
];

/// Default number of nutation terms.
pub const DEFAULT_TERMS: usize = 106;

/// Rotation rate vector of the Earth in the pseudo-inertial TOD frame.
pub fn rate(date: &Date) -> Vector3 {
    let lod = date.eop().lod / 1000.0;
    Vector3::new(0.0, 0.0, EARTH_ROTATION_RATE * (1.0 - lod / 86400.0))
}

/// Polar motion components, in degrees.
fn pole_position(date: &Date) -> (f64, f64) {
    (date.eop().x / 3600.0, date.eop().y / 3600.0)
}

/// Polar motion as a rotation matrix (ITRF to PEF).
pub fn earth_orientation(date: &Date) -> Matrix3 {
    let (x_p, y_p) = pole_position(date);
    rot1(y_p.to_radians()) * rot2(x_p.to_radians())
}

/// IAU 1976 precession angles, in degrees.
fn precession_angles(date: &Date) -> Result<(f64, f64, f64), TimeError> {
    let t = date.change_scale(TimeScale::Tt)?.julian_century();

    let zeta = (2306.2181 * t + 0.30188 * t.powi(2) + 0.017998 * t.powi(3)) / 3600.0;
    let theta = (2004.3109 * t - 0.42665 * t.powi(2) - 0.041833 * t.powi(3)) / 3600.0;
    let z = (2306.2181 * t + 1.09468 * t.powi(2) + 0.018203 * t.powi(3)) / 3600.0;

    Ok((zeta, theta, z))
}

/// Precession as a rotation matrix (MOD to EME2000).
pub fn precession(date: &Date) -> Result<Matrix3, TimeError> {
    let (zeta, theta, z) = precession_angles(date)?;
    Ok(rot3(zeta.to_radians()) * rot2(-theta.to_radians()) * rot3(z.to_radians()))
}

/// 1980 nutation model as described in Vallado p. 224.
///
/// Returns the mean obliquity ε̄, Δψ and Δε, all in degrees. The EOP δψ/δε
/// corrections from the finals files are applied unless disabled.
pub fn nutation_components(
    date: &Date,
    eop_correction: bool,
    terms: usize,
) -> Result<(f64, f64, f64), TimeError> {
    let ttt = date.change_scale(TimeScale::Tt)?.julian_century();
    let r = 360.0;

    // Mean obliquity, arcsec then degrees
    let epsilon_bar =
        (84381.448 - 46.8150 * ttt - 5.9e-4 * ttt.powi(2) + 1.813e-3 * ttt.powi(3)) / 3600.0;

    // Delaunay arguments, degrees
    let m_moon = 134.96298139
        + (1325.0 * r + 198.8673981) * ttt
        + 0.0086972 * ttt.powi(2)
        + 1.78e-5 * ttt.powi(3);
    let m_sun = 357.52772333 + (99.0 * r + 359.0503400) * ttt
        - 0.0001603 * ttt.powi(2)
        - 3.3e-6 * ttt.powi(3);
    let f_moon = 93.27191028 + (1342.0 * r + 82.0175381) * ttt - 0.0036825 * ttt.powi(2)
        + 3.1e-6 * ttt.powi(3);
    let d_sun = 297.85036306 + (1236.0 * r + 307.11148) * ttt - 0.0019142 * ttt.powi(2)
        + 5.3e-6 * ttt.powi(3);
    let om_moon = 125.04452222 - (5.0 * r + 134.1362608) * ttt
        + 0.0020708 * ttt.powi(2)
        + 2.2e-6 * ttt.powi(3);

    let mut delta_psi = 0.0;
    let mut delta_eps = 0.0;
    for (a1, a2, a3, a4, a5, a, b, c, d) in NUTATION_1980.iter().take(terms) {
        let arg = (*a1 as f64 * m_moon
            + *a2 as f64 * m_sun
            + *a3 as f64 * f_moon
            + *a4 as f64 * d_sun
            + *a5 as f64 * om_moon)
            .to_radians();
        delta_psi += (a + b * ttt) * arg.sin() / 36_000_000.0;
        delta_eps += (c + d * ttt) * arg.cos() / 36_000_000.0;
    }

    if eop_correction {
        delta_psi += date.eop().dpsi / 3_600_000.0;
        delta_eps += date.eop().deps / 3_600_000.0;
    }

    Ok((epsilon_bar, delta_psi, delta_eps))
}

/// Nutation as a rotation matrix (TOD to MOD).
pub fn nutation(date: &Date, eop_correction: bool, terms: usize) -> Result<Matrix3, TimeError> {
    let (epsilon_bar, delta_psi, delta_eps) = nutation_components(date, eop_correction, terms)?;
    let epsilon_bar = epsilon_bar.to_radians();
    let epsilon = epsilon_bar + delta_eps.to_radians();

    Ok(rot1(-epsilon_bar) * rot3(delta_psi.to_radians()) * rot1(epsilon))
}

/// Equinox equation, in degrees.
pub fn equinox(
    date: &Date,
    eop_correction: bool,
    terms: usize,
    kinematic: bool,
) -> Result<f64, TimeError> {
    let (epsilon_bar, delta_psi, _) = nutation_components(date, eop_correction, terms)?;

    let mut equin = delta_psi * 3600.0 * epsilon_bar.to_radians().cos();

    if date.d() >= 50506 && kinematic {
        // Starting 1992-02-27, the effect of the moon is added
        let ttt = date.change_scale(TimeScale::Tt)?.julian_century();
        let om_m = 125.04455501 - (5.0 * 360.0 + 134.1361851) * ttt
            + 0.0020756 * ttt.powi(2)
            + 2.139e-6 * ttt.powi(3);
        equin += 0.00264 * om_m.to_radians().sin() + 6.3e-5 * (2.0 * om_m).to_radians().sin();
    }

    Ok(equin / 3600.0)
}

/// Sidereal time model selector: Greenwich Mean or Apparent.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SideralModel {
    Mean,
    Apparent,
}

/// Sidereal time at the given date, in degrees.
pub fn sideral_angle(
    date: &Date,
    longitude: f64,
    model: SideralModel,
    eop_correction: bool,
    terms: usize,
) -> Result<f64, TimeError> {
    let t = date.change_scale(TimeScale::Ut1)?.julian_century();

    // GMST in seconds of time, then degrees
    let mut theta = 67310.54841 + (876600.0 * 3600.0 + 8640184.812866) * t + 0.093104 * t.powi(2)
        - 6.2e-6 * t.powi(3);
    theta /= 240.0;

    if model == SideralModel::Apparent {
        theta += equinox(date, eop_correction, terms, true)?;
    }

    theta += longitude;
    Ok(theta.rem_euclid(360.0))
}

/// Sidereal time as a rotation matrix (PEF to TOD).
pub fn sideral(
    date: &Date,
    longitude: f64,
    model: SideralModel,
    eop_correction: bool,
    terms: usize,
) -> Result<Matrix3, TimeError> {
    let theta = sideral_angle(date, longitude, model, eop_correction, terms)?;
    Ok(rot3(-theta.to_radians()))
}

#[cfg(test)]
mod ut_iau1980 {
    use super::*;

    #[test]
    fn test_table_shape() {
        assert_eq!(NUTATION_1980.len(), DEFAULT_TERMS);
        // The table is sorted by decreasing amplitude in longitude, so that
        // truncation keeps the dominant terms
        for pair in NUTATION_1980.windows(2) {
            assert!(pair[0].5.abs() >= pair[1].5.abs());
        }
        // The 4-term reduced model is the one used for the TEME equinox
        assert_eq!(NUTATION_1980[0].5, -171996.0);
        assert_eq!(NUTATION_1980[3].5, 2062.0);
    }
}
