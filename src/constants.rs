/*
 * Orrery Astrodynamics Core
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Physical constants, in SI units.

/// Speed of light in m.s⁻¹
pub const C_LIGHT: f64 = 299_792_458.0;

/// Standard Earth gravity in m.s⁻²
pub const G0: f64 = 9.80665;

/// Gravitational constant in m³.kg⁻¹.s⁻²
pub const G: f64 = 6.6740831e-11;

/// Astronomical unit in meters
pub const AU: f64 = 149_597_870_700.0;

/// Earth rotation rate in rad.s⁻¹, before length-of-day correction
pub const EARTH_ROTATION_RATE: f64 = 7.292115146706979e-5;

/// Seconds in a day
pub const DAY_S: f64 = 86400.0;

/// Offset between the Julian Date and the Modified Julian Date, in days
pub const JD_MJD: f64 = 2_400_000.5;

/// Julian Date of the J2000 epoch (2000-01-01T12:00:00 TT)
pub const J2000_JD: f64 = 2_451_545.0;

/// Days in a Julian century
pub const JULIAN_CENTURY_D: f64 = 36525.0;
