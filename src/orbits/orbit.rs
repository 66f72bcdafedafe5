/*
 * Orrery Astrodynamics Core
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Extrapolable coordinates: a state vector bound to a propagator.

use std::f64::consts::TAU;
use std::sync::Arc;

use snafu::prelude::*;

use crate::constants::C_LIGHT;
use crate::errors::{
    EllipticOrbitSnafu, HyperbolicOrbitSnafu, PhysicsError, PropagationError, PropFormSnafu,
    PropFrameSnafu,
};
use crate::frames::frame::{orbit_to_frame, Frame, FrameOffset};
use crate::frames::local::LocalFrame;
use crate::orbits::ephem::Ephem;
use crate::orbits::forms::Form;
use crate::orbits::statevector::StateVector;
use crate::propagators::{IterOpts, Propagator, StateSource, StateStream};
use crate::time::{Date, TimeDelta};

/// A state vector whose propagator is set, supporting `propagate` and
/// tabulation into ephemerides.
pub struct Orbit {
    state: StateVector,
    propagator: Box<dyn Propagator>,
}

impl Clone for Orbit {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            propagator: self.propagator.boxed(),
        }
    }
}

impl Orbit {
    /// Binds a state to a propagator; the propagator captures the state as
    /// its initial condition.
    pub fn new(
        state: StateVector,
        mut propagator: Box<dyn Propagator>,
    ) -> Result<Self, PropagationError> {
        propagator.set_orbit(&state)?;
        Ok(Self { state, propagator })
    }

    pub fn state(&self) -> &StateVector {
        &self.state
    }

    pub fn date(&self) -> Date {
        self.state.date()
    }

    pub fn frame(&self) -> &Frame {
        self.state.frame()
    }

    pub fn propagator(&self) -> &dyn Propagator {
        self.propagator.as_ref()
    }

    /// Rebinds the orbit to another propagator.
    pub fn set_propagator(
        &mut self,
        mut propagator: Box<dyn Propagator>,
    ) -> Result<(), PropagationError> {
        propagator.set_orbit(&self.state)?;
        self.propagator = propagator;
        Ok(())
    }

    /// Single sample at the given date.
    pub fn propagate(&self, date: &Date) -> Result<StateVector, PropagationError> {
        self.propagator.propagate(date)
    }

    /// Single sample at a duration from the orbit date.
    pub fn propagate_delta(&self, delta: TimeDelta) -> Result<StateVector, PropagationError> {
        let date = self
            .date()
            .shift(delta)
            .map_err(|source| PropagationError::PropTime { source })?;
        self.propagate(&date)
    }

    /// Stream of samples over a date range.
    pub fn iter(&self, opts: IterOpts) -> Result<StateStream<'_>, PropagationError> {
        self.propagator.iter(opts)
    }

    /// Tabulation of the orbit at a given step over a date range.
    pub fn ephem(&self, opts: IterOpts) -> Result<Ephem, PropagationError> {
        Ephem::from_stream(self.iter(opts)?)
    }

    /// Registers a frame following this orbit.
    pub fn as_frame(
        &self,
        name: &str,
        orientation: Option<LocalFrame>,
        parent: &Frame,
    ) -> Result<Frame, PropagationError> {
        let source: Arc<dyn StateSource> = Arc::new(self.clone());
        orbit_to_frame(
            name,
            FrameOffset::Moving(source, self.frame().clone()),
            orientation,
            parent,
        )
        .context(PropFrameSnafu)
    }

    /// Detaches the state from its propagator.
    pub fn into_statevector(self) -> StateVector {
        self.state
    }

    /// Derived quantities of the orbit.
    pub fn infos(&self) -> Result<OrbitInfos, PropagationError> {
        OrbitInfos::compute(&self.state)
    }
}

impl StateSource for Orbit {
    fn state_at(&self, date: &Date) -> Result<StateVector, PropagationError> {
        self.propagate(date)
    }
}

/// A state vector of mean elements for some analytical theory, bound to the
/// matching propagator.
///
/// Distinct from [`Orbit`] so that serializers can route mean-element
/// messages (OMM) separately from osculating ones (OPM).
pub struct MeanOrbit {
    state: StateVector,
    propagator: Box<dyn Propagator>,
}

impl Clone for MeanOrbit {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            propagator: self.propagator.boxed(),
        }
    }
}

impl MeanOrbit {
    pub fn new(
        state: StateVector,
        mut propagator: Box<dyn Propagator>,
    ) -> Result<Self, PropagationError> {
        propagator.set_orbit(&state)?;
        Ok(Self { state, propagator })
    }

    pub fn state(&self) -> &StateVector {
        &self.state
    }

    pub fn date(&self) -> Date {
        self.state.date()
    }

    pub fn propagate(&self, date: &Date) -> Result<StateVector, PropagationError> {
        self.propagator.propagate(date)
    }

    pub fn iter(&self, opts: IterOpts) -> Result<StateStream<'_>, PropagationError> {
        self.propagator.iter(opts)
    }

    pub fn ephem(&self, opts: IterOpts) -> Result<Ephem, PropagationError> {
        Ephem::from_stream(self.iter(opts)?)
    }

    pub fn into_statevector(self) -> StateVector {
        self.state
    }
}

/// Derived quantities of a state vector.
#[derive(Clone, Debug)]
pub struct OrbitInfos {
    mu: f64,
    /// Semi-major axis
    pub a: f64,
    /// Eccentricity
    pub e: f64,
    /// Inclination
    pub i: f64,
    /// Instantaneous radius
    pub r: f64,
    /// Instantaneous velocity
    pub v: f64,
    /// Equatorial radius of the central body
    body_radius: f64,
}

impl OrbitInfos {
    pub fn compute(state: &StateVector) -> Result<Self, PropagationError> {
        let body = state
            .frame()
            .center()
            .body()
            .unwrap_or_else(crate::bodies::Body::earth);
        let kep = state
            .clone()
            .with_form(Form::Keplerian)
            .context(PropFormSnafu)?;
        let sphe = state
            .clone()
            .with_form(Form::Spherical)
            .context(PropFormSnafu)?;

        let mu = body.mu();
        let a = kep.coord()[0];
        let r = sphe.coord()[0];
        Ok(Self {
            mu,
            a,
            e: kep.coord()[1],
            i: kep.coord()[2],
            r,
            v: (mu * (2.0 / r - 1.0 / a)).sqrt(),
            body_radius: body.equatorial_radius,
        })
    }

    pub fn elliptic(&self) -> bool {
        self.e < 1.0
    }

    pub fn hyperbolic(&self) -> bool {
        self.e > 1.0
    }

    /// Mechanical energy of the orbit.
    pub fn energy(&self) -> f64 {
        -self.mu / (2.0 * self.a)
    }

    /// Mean motion, rad/s.
    pub fn n(&self) -> f64 {
        (self.mu / self.a.abs().powi(3)).sqrt()
    }

    /// Orbital period.
    pub fn period(&self) -> Result<TimeDelta, PhysicsError> {
        ensure!(self.elliptic(), HyperbolicOrbitSnafu { quantity: "period" });
        Ok(TimeDelta::from_seconds(TAU / self.n()))
    }

    /// Radius of the apocenter.
    pub fn apocenter(&self) -> Result<f64, PhysicsError> {
        ensure!(
            self.elliptic(),
            HyperbolicOrbitSnafu {
                quantity: "apocenter"
            }
        );
        Ok(self.a * (1.0 + self.e))
    }

    /// Radius of the pericenter.
    pub fn pericenter(&self) -> f64 {
        self.a * (1.0 - self.e)
    }

    /// Altitude of the apocenter above the body equatorial surface.
    pub fn apocenter_altitude(&self) -> Result<f64, PhysicsError> {
        Ok(self.apocenter()? - self.body_radius)
    }

    /// Altitude of the pericenter above the body equatorial surface.
    pub fn pericenter_altitude(&self) -> f64 {
        self.pericenter() - self.body_radius
    }

    /// Velocity at apocenter.
    pub fn velocity_at_apocenter(&self) -> Result<f64, PhysicsError> {
        let ra = self.apocenter()?;
        Ok((self.mu * (2.0 / ra - 1.0 / self.a)).sqrt())
    }

    /// Velocity at pericenter.
    pub fn velocity_at_pericenter(&self) -> f64 {
        (self.mu * (2.0 / self.pericenter() - 1.0 / self.a)).sqrt()
    }

    /// Hyperbolic excess velocity.
    pub fn vinf(&self) -> Result<f64, PhysicsError> {
        ensure!(self.hyperbolic(), EllipticOrbitSnafu { quantity: "vinf" });
        Ok((self.mu / self.a.abs()).sqrt())
    }

    /// Distance between the focus and the asymptote.
    pub fn dinf(&self) -> Result<f64, PhysicsError> {
        ensure!(self.hyperbolic(), EllipticOrbitSnafu { quantity: "dinf" });
        Ok((self.a * self.e).abs() * (1.0 - (1.0 / self.e).powi(2)).sqrt())
    }

    /// Light propagation delay from the object to the center of the frame.
    pub fn delay(&self) -> TimeDelta {
        TimeDelta::from_seconds(self.r / C_LIGHT)
    }
}

/// Derived quantities straight from a state vector.
impl StateVector {
    pub fn infos(&self) -> Result<OrbitInfos, PropagationError> {
        OrbitInfos::compute(self)
    }
}

#[cfg(test)]
mod ut_orbit {
    use super::*;
    use crate::frames::get_frame;
    use crate::math::Vector6;
    use crate::time::TimeScale;

    fn kep_state(a: f64, e: f64) -> StateVector {
        let date = Date::from_mjd(58000.0, TimeScale::Utc).unwrap();
        StateVector::new(
            Vector6::new(a, e, 0.9, 1.0, 2.0, 0.5),
            date,
            Form::Keplerian,
            get_frame("EME2000").unwrap(),
        )
    }

    #[test]
    fn test_infos_elliptic() {
        let infos = kep_state(7000e3, 0.01).infos().unwrap();
        assert!(infos.elliptic());
        assert!(infos.period().unwrap().total_seconds() > 5000.0);
        assert!(infos.apocenter().unwrap() > infos.pericenter());
        assert!(matches!(
            infos.vinf(),
            Err(PhysicsError::EllipticOrbit { .. })
        ));
    }

    #[test]
    fn test_infos_hyperbolic() {
        let infos = kep_state(-20000e3, 1.5).infos().unwrap();
        assert!(infos.hyperbolic());
        assert!(infos.vinf().is_ok());
        assert!(matches!(
            infos.period(),
            Err(PhysicsError::HyperbolicOrbit { .. })
        ));
    }
}
