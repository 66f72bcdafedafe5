/*
 * Orrery Astrodynamics Core
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Analytical positions of Solar System bodies, from polynomial ephemeris
//! formulas (cf. Vallado).

use std::sync::{Arc, Mutex, OnceLock};

use crate::bodies::Body;
use crate::constants::AU;
use crate::errors::{PropagationError, PropFrameSnafu, PropTimeSnafu, UnknownBodySnafu};
use crate::frames::frame::{get_frame, orbit_to_frame, Frame, FrameOffset};
use crate::math::Vector6;
use crate::orbits::forms::Form;
use crate::orbits::statevector::StateVector;
use crate::propagators::StateSource;
use crate::time::{Date, TimeScale};
use snafu::prelude::*;

/// Position of the Sun in the MOD frame.
pub struct SunPropagator;

impl StateSource for SunPropagator {
    fn state_at(&self, date: &Date) -> Result<StateVector, PropagationError> {
        let date = date.change_scale(TimeScale::Ut1).context(PropTimeSnafu)?;
        let t_ut1 = date.julian_century();

        let lambda_m = 280.460 + 36000.771 * t_ut1;
        let m = (357.5291092 + 35999.05034 * t_ut1).to_radians();
        let lambda_el =
            (lambda_m + 1.914666471 * m.sin() + 0.019994643 * (2.0 * m).sin()).to_radians();

        let r = 1.000140612 - 0.016708617 * m.cos() - 0.000139589 * (2.0 * m).cos();
        let eps = (23.439291 - 0.0130042 * t_ut1).to_radians();

        let pv = AU
            * r
            * Vector6::new(
                lambda_el.cos(),
                eps.cos() * lambda_el.sin(),
                eps.sin() * lambda_el.sin(),
                0.0,
                0.0,
                0.0,
            );

        let frame = get_frame("MOD").context(PropFrameSnafu)?;
        Ok(StateVector::new(pv, date, Form::Cartesian, frame))
    }
}

/// Position of the Moon in the EME2000 frame.
pub struct MoonPropagator;

impl StateSource for MoonPropagator {
    fn state_at(&self, date: &Date) -> Result<StateVector, PropagationError> {
        let date = date.change_scale(TimeScale::Tdb).context(PropTimeSnafu)?;
        let t = date.julian_century();

        let sin_d = |x: f64| x.to_radians().sin();
        let cos_d = |x: f64| x.to_radians().cos();

        let lambda_el = 218.32 + 481267.8813 * t + 6.29 * sin_d(134.9 + 477198.85 * t)
            - 1.27 * sin_d(259.2 - 413335.38 * t)
            + 0.66 * sin_d(235.7 + 890534.23 * t)
            + 0.21 * sin_d(269.9 + 954397.7 * t)
            - 0.19 * sin_d(357.5 + 35999.05 * t)
            - 0.11 * sin_d(186.6 + 966404.05 * t);

        let phi_el = 5.13 * sin_d(93.3 + 483202.03 * t) + 0.28 * sin_d(228.2 + 960400.87 * t)
            - 0.28 * sin_d(318.3 + 6003.18 * t)
            - 0.17 * sin_d(217.6 - 407332.2 * t);

        let p = 0.9508
            + 0.0518 * cos_d(134.9 + 477198.85 * t)
            + 0.0095 * cos_d(259.2 - 413335.38 * t)
            + 0.0078 * cos_d(235.7 + 890534.23 * t)
            + 0.0028 * cos_d(269.9 + 954397.70 * t);

        let e_bar = 23.439291 - 0.0130042 * t - 1.64e-7 * t.powi(2) + 5.04e-7 * t.powi(3);

        let r_moon = Body::earth().equatorial_radius / sin_d(p);

        let pv = r_moon
            * Vector6::new(
                cos_d(phi_el) * cos_d(lambda_el),
                cos_d(e_bar) * cos_d(phi_el) * sin_d(lambda_el) - sin_d(e_bar) * sin_d(phi_el),
                sin_d(e_bar) * cos_d(phi_el) * sin_d(lambda_el) + cos_d(e_bar) * sin_d(phi_el),
                0.0,
                0.0,
                0.0,
            );

        let frame = get_frame("EME2000").context(PropFrameSnafu)?;
        Ok(StateVector::new(pv, date, Form::Cartesian, frame))
    }
}

/// Position of the Earth: the origin of EME2000.
pub struct EarthPropagator;

impl StateSource for EarthPropagator {
    fn state_at(&self, date: &Date) -> Result<StateVector, PropagationError> {
        let frame = get_frame("EME2000").context(PropFrameSnafu)?;
        Ok(StateVector::new(
            Vector6::zeros(),
            *date,
            Form::Cartesian,
            frame,
        ))
    }
}

/// A body with its analytic propagator attached.
pub fn get_body(name: &str) -> Result<Body, PropagationError> {
    match name.to_lowercase().as_str() {
        "sun" => Ok(Body::sun().with_propagator(Arc::new(SunPropagator))),
        "moon" => Ok(Body::moon().with_propagator(Arc::new(MoonPropagator))),
        "earth" => Ok(Body::earth().with_propagator(Arc::new(EarthPropagator))),
        _ => UnknownBodySnafu { name }.fail(),
    }
}

/// The frame following the Sun, created on first use.
pub fn sun_frame() -> Result<Frame, PropagationError> {
    static FRAME: OnceLock<Mutex<Option<Frame>>> = OnceLock::new();
    let holder = FRAME.get_or_init(|| Mutex::new(None));
    let mut guard = holder.lock().unwrap();
    if let Some(frame) = guard.as_ref() {
        return Ok(frame.clone());
    }

    let parent = get_frame("MOD").context(PropFrameSnafu)?;
    let frame = orbit_to_frame(
        "Sun",
        FrameOffset::Moving(Arc::new(SunPropagator), parent.clone()),
        None,
        &parent,
    )
    .map_err(|source| PropagationError::PropFrame {
        source: Box::new(source),
    })?;
    *guard = Some(frame.clone());
    Ok(frame)
}

#[cfg(test)]
mod ut_solarsystem {
    use super::*;

    #[test]
    fn test_sun_distance_is_about_one_au() {
        let date = Date::from_ymd(2006, 4, 2, TimeScale::Utc).unwrap();
        let sun = get_body("Sun").unwrap().propagate(&date).unwrap();
        let r = sun.coord().fixed_rows::<3>(0).norm();
        assert!((r / AU - 1.0).abs() < 0.05);
    }

    #[test]
    fn test_moon_distance() {
        let date = Date::from_ymd(1994, 4, 28, TimeScale::Utc).unwrap();
        let moon = get_body("Moon").unwrap().propagate(&date).unwrap();
        let r = moon.coord().fixed_rows::<3>(0).norm();
        // The Moon sits between 356 000 and 407 000 km
        assert!(r > 3.5e8 && r < 4.1e8);
    }

    #[test]
    fn test_unknown_body() {
        assert!(matches!(
            get_body("Vulcan"),
            Err(PropagationError::UnknownBody { .. })
        ));
    }
}
