/*
 * Orrery Astrodynamics Core
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Analytical propagator with the secular Earth-J2 effect.

use snafu::prelude::*;

use crate::bodies::Body;
use crate::errors::{PropagationError, PropFormSnafu, UninitializedSnafu};
use crate::math::norm_2pi;
use crate::orbits::forms::Form;
use crate::orbits::statevector::StateVector;
use crate::propagators::{analytic_iter, IterOpts, Propagator, StateStream};
use crate::time::Date;

/// Analytical propagator taking only the secular J2 drifts into account:
/// regression of the node, rotation of the perigee and mean motion
/// correction. No short-period terms.
#[derive(Default)]
pub struct J2 {
    orbit: Option<StateVector>,
}

impl J2 {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Propagator for J2 {
    fn set_orbit(&mut self, state: &StateVector) -> Result<(), PropagationError> {
        let orbit = state
            .clone()
            .with_form(Form::KeplerianMean)
            .context(PropFormSnafu)?;
        self.orbit = Some(orbit);
        Ok(())
    }

    fn orbit(&self) -> Option<&StateVector> {
        self.orbit.as_ref()
    }

    fn propagate(&self, date: &Date) -> Result<StateVector, PropagationError> {
        let orbit = self.orbit.as_ref().context(UninitializedSnafu)?;
        let delta_t = (*date - orbit.date()).total_seconds();

        let body = orbit
            .frame()
            .center()
            .body()
            .unwrap_or_else(Body::earth);
        let j2 = body.j2.unwrap_or(0.0);
        let re = body.equatorial_radius;
        let n = orbit.infos()?.n();

        let coord = *orbit.coord();
        let (a, e, i) = (coord[0], coord[1], coord[2]);

        let com = n * re.powi(2) * j2 / (a.powi(2) * (1.0 - e.powi(2)).powi(2));

        let draan = -1.5 * com * i.cos();
        let daop = 0.75 * com * (4.0 - 5.0 * i.sin().powi(2));
        let dm = 0.75 * com * (1.0 - e.powi(2)).sqrt() * (2.0 - 3.0 * i.sin().powi(2));

        let mut new = orbit.clone();
        new.set_date(*date);
        let mut out = coord;
        out[3] = norm_2pi(coord[3] + draan * delta_t);
        out[4] = norm_2pi(coord[4] + daop * delta_t);
        out[5] = norm_2pi(coord[5] + (dm + n) * delta_t);
        new.set_coord(out);

        new.with_form(Form::Cartesian).context(PropFormSnafu)
    }

    fn iter(&self, opts: IterOpts) -> Result<StateStream<'_>, PropagationError> {
        analytic_iter(self, opts)
    }

    fn fresh(&self) -> Box<dyn Propagator> {
        Box::new(Self::new())
    }

    fn boxed(&self) -> Box<dyn Propagator> {
        Box::new(Self {
            orbit: self.orbit.clone(),
        })
    }
}

#[cfg(test)]
mod ut_j2 {
    use super::*;
    use crate::frames::get_frame;
    use crate::math::Vector6;
    use crate::time::{TimeDelta, TimeScale};

    #[test]
    fn test_node_regression_sign() {
        let date = Date::from_mjd(58000.0, TimeScale::Utc).unwrap();
        // Prograde orbit: the node drifts westward
        let sv = StateVector::new(
            Vector6::new(6778e3, 0.001, 0.9, 1.0, 0.0, 0.0),
            date,
            Form::KeplerianMean,
            get_frame("EME2000").unwrap(),
        );
        let mut prop = J2::new();
        prop.set_orbit(&sv).unwrap();

        let after = prop
            .propagate(&date.shift(TimeDelta::from_days(1.0)).unwrap())
            .unwrap()
            .with_form(Form::KeplerianMean)
            .unwrap();

        let draan = crate::math::wrap_pi(after.get("raan").unwrap() - 1.0);
        assert!(draan < 0.0);
        // ISS-like orbit: about -5 degrees per day
        assert!(draan.to_degrees() > -7.0 && draan.to_degrees() < -3.0);
    }
}
