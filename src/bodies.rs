/*
 * Orrery Astrodynamics Core
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Celestial body descriptors.

use std::fmt;
use std::sync::Arc;

use crate::constants::G;
use crate::errors::{NoPropagatorSnafu, PropagationError, PropPhysicsSnafu};
use crate::orbits::StateVector;
use crate::propagators::StateSource;
use crate::time::Date;
use snafu::prelude::*;

/// Physical characteristics of a celestial body.
///
/// A propagator may be attached to the body so that its position can be
/// queried over time (see `env::solarsystem::get_body` and `env::jpl`).
#[derive(Clone)]
pub struct Body {
    pub name: String,
    /// Mass in kg
    pub mass: f64,
    /// Equatorial radius in m
    pub equatorial_radius: f64,
    pub flattening: f64,
    pub j2: Option<f64>,
    pub j3: Option<f64>,
    propagator: Option<Arc<dyn StateSource>>,
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Body '{}'>", self.name)
    }
}

impl PartialEq for Body {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Body {
    pub fn new(name: &str, mass: f64, equatorial_radius: f64, flattening: f64) -> Self {
        Self {
            name: name.to_owned(),
            mass,
            equatorial_radius,
            flattening,
            j2: None,
            j3: None,
            propagator: None,
        }
    }

    /// Standard gravitational parameter µ, in m³.s⁻²
    pub fn mu(&self) -> f64 {
        self.mass * G
    }

    /// Eccentricity of the body ellipsoid
    pub fn eccentricity(&self) -> f64 {
        (self.flattening * 2.0 - self.flattening.powi(2)).sqrt()
    }

    pub fn polar_radius(&self) -> f64 {
        self.equatorial_radius * (1.0 - self.flattening)
    }

    /// Attaches a position source to this body.
    pub fn with_propagator(mut self, propagator: Arc<dyn StateSource>) -> Self {
        self.propagator = Some(propagator);
        self
    }

    pub fn has_propagator(&self) -> bool {
        self.propagator.is_some()
    }

    /// State vector of the body at the given date.
    ///
    /// Fails unless a propagator was attached beforehand, as none is provided
    /// by default.
    pub fn propagate(&self, date: &Date) -> Result<StateVector, PropagationError> {
        let source = self
            .propagator
            .as_ref()
            .context(NoPropagatorSnafu {
                body: self.name.as_str(),
            })
            .context(PropPhysicsSnafu)?;
        source.state_at(date)
    }

    pub fn earth() -> Self {
        Self {
            name: "Earth".to_owned(),
            mass: 5.97237e24,
            equatorial_radius: 6_378_136.3,
            flattening: 1.0 / 298.257223563,
            j2: Some(1.08262668355315130e-3),
            j3: Some(-2.532243534e-6),
            propagator: None,
        }
    }

    pub fn moon() -> Self {
        Self::new("Moon", 7.342e22, 1_738_100.0, 0.0012)
    }

    pub fn sun() -> Self {
        Self::new("Sun", 1.98855e30, 695_700_000.0, 9e-6)
    }

    pub fn mars() -> Self {
        Self::new("Mars", 6.4171e23, 3_396_200.0, 0.0)
    }
}

#[cfg(test)]
mod ut_bodies {
    use super::*;

    #[test]
    fn test_derived() {
        let earth = Body::earth();
        assert!((earth.mu() - 3.986e14).abs() < 1e11);
        assert!(earth.polar_radius() < earth.equatorial_radius);
        assert!(earth.eccentricity() > 0.08 && earth.eccentricity() < 0.09);
    }

    #[test]
    fn test_no_propagator() {
        let moon = Body::moon();
        let date = Date::from_mjd(58000.0, crate::time::TimeScale::Utc).unwrap();
        assert!(moon.propagate(&date).is_err());
    }
}
