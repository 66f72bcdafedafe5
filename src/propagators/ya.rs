/*
 * Orrery Astrodynamics Core
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Yamanaka-Ankersen analytical propagator for relative motion about an
//! elliptic chief orbit.
//!
//! Generalizes Clohessy-Wiltshire by the closed-form state transition of
//! Yamanaka & Ankersen (2002), parameterized by true anomaly. The chief
//! geometry is re-evaluated at each propagation date, from a reference
//! orbit or an ephemeris.

use std::sync::Arc;

use snafu::prelude::*;

use crate::bodies::Body;
use crate::errors::{
    NotHillSnafu, PropagationError, PropFormSnafu, PropFrameSnafu, PropPhysicsSnafu,
    UninitializedSnafu,
};
use crate::frames::local::{qsw_to_lvlh, qsw_to_tnw, LocalFrame};
use crate::math::rotation::expand;
use crate::math::{Matrix3, Vector6};
use crate::orbits::forms::Form;
use crate::orbits::statevector::StateVector;
use crate::propagators::{analytic_iter, IterOpts, Propagator, StateSource, StateStream};
use crate::time::Date;

type Matrix4 = nalgebra::Matrix4<f64>;
type Vector4 = nalgebra::Vector4<f64>;
type Matrix2 = nalgebra::Matrix2<f64>;
type Vector2 = nalgebra::Vector2<f64>;

/// Yamanaka-Ankersen propagator. The chaser state lives in a Hill frame
/// around the chief.
pub struct YamanakaAnkersen {
    chief: Arc<dyn StateSource>,
    orbit: Option<StateVector>,
}

/// Chief geometry at a date.
struct ChiefGeometry {
    a: f64,
    e: f64,
    nu: f64,
    mu: f64,
}

impl ChiefGeometry {
    fn of(chief: &dyn StateSource, date: &Date) -> Result<Self, PropagationError> {
        let state = chief.state_at(date)?;
        let body = state
            .frame()
            .center()
            .body()
            .unwrap_or_else(Body::earth);
        let kep = state.with_form(Form::Keplerian).context(PropFormSnafu)?;
        Ok(Self {
            a: kep.coord()[0],
            e: kep.coord()[1],
            nu: kep.coord()[5],
            mu: body.mu(),
        })
    }

    fn p(&self) -> f64 {
        self.a * (1.0 - self.e.powi(2))
    }

    /// dν/dt = k² ρ², with k² = √(µ/p³)
    fn k2(&self) -> f64 {
        (self.mu / self.p().powi(3)).sqrt()
    }

    fn rho(&self) -> f64 {
        1.0 + self.e * self.nu.cos()
    }
}

/// In-plane fundamental matrix of the YA solution, acting on the
/// integration constants to produce `(x̃, ỹ, x̃', ỹ')` at true anomaly ν.
fn in_plane(e: f64, nu: f64, j: f64) -> Matrix4 {
    let rho = 1.0 + e * nu.cos();
    let s = rho * nu.sin();
    let c = rho * nu.cos();
    let s_p = nu.cos() + e * (2.0 * nu).cos();
    let c_p = -(nu.sin() + e * (2.0 * nu).sin());

    Matrix4::new(
        // x̃
        s,
        c,
        2.0 - 3.0 * e * s * j,
        0.0,
        // ỹ
        c * (1.0 + 1.0 / rho),
        -s * (1.0 + 1.0 / rho),
        -3.0 * rho.powi(2) * j,
        1.0,
        // x̃'
        s_p,
        c_p,
        -3.0 * e * (s_p * j + s / rho.powi(2)),
        0.0,
        // ỹ'
        -2.0 * s,
        e - 2.0 * c,
        -3.0 * (1.0 - 2.0 * e * s * j),
        0.0,
    )
}

impl YamanakaAnkersen {
    /// Builds the propagator from any chief source: a propagatable orbit or
    /// an ephemeris.
    pub fn new(chief: Arc<dyn StateSource>) -> Self {
        Self { chief, orbit: None }
    }

    /// Rotation from QSW (the computation frame) to the Hill orientation of
    /// the chaser state.
    fn mat3(&self) -> Result<Matrix3, PropagationError> {
        let orbit = self.orbit.as_ref().context(UninitializedSnafu)?;
        Ok(match orbit.frame().hill_orientation() {
            Some(LocalFrame::Tnw) => qsw_to_tnw(),
            Some(LocalFrame::Lvlh) => qsw_to_lvlh(),
            _ => Matrix3::identity(),
        })
    }
}

impl Propagator for YamanakaAnkersen {
    fn set_orbit(&mut self, state: &StateVector) -> Result<(), PropagationError> {
        if !state.frame().is_hill() {
            return NotHillSnafu {
                name: state.frame().name(),
            }
            .fail()
            .context(PropFrameSnafu);
        }
        let orbit = state
            .clone()
            .with_form(Form::Cartesian)
            .context(PropFormSnafu)?;
        self.orbit = Some(orbit);
        Ok(())
    }

    fn orbit(&self) -> Option<&StateVector> {
        self.orbit.as_ref()
    }

    fn propagate(&self, date: &Date) -> Result<StateVector, PropagationError> {
        let orbit = self.orbit.as_ref().context(UninitializedSnafu)?;
        let t0 = orbit.date();

        let g0 = ChiefGeometry::of(self.chief.as_ref(), &t0)?;
        let g1 = ChiefGeometry::of(self.chief.as_ref(), date)?;
        if g0.e >= 1.0 {
            return crate::errors::HyperbolicOrbitSnafu {
                quantity: "relative motion",
            }
            .fail()
            .context(PropPhysicsSnafu);
        }

        let k2 = g0.k2();
        let e = g0.e;
        let dt = (*date - t0).total_seconds();
        let j = k2 * dt;

        // Rotate the chaser state into QSW for the computation
        let m3 = self.mat3()?;
        let m6 = expand(&m3, None);
        let pv: Vector6 = m6.transpose() * orbit.coord();

        // Physical to ρ-normalized coordinates, derivative with respect to
        // true anomaly
        let rho0 = g0.rho();
        let es0 = e * g0.nu.sin();
        let scale = |x: f64, xdot: f64, rho: f64, es: f64| {
            (rho * x, -es * x + xdot / (k2 * rho))
        };
        let unscale = |xt: f64, xt_p: f64, rho: f64, es: f64| {
            (xt / rho, k2 * (rho * xt_p + es * xt))
        };

        let (x0, x0p) = scale(pv[0], pv[3], rho0, es0);
        let (y0, y0p) = scale(pv[1], pv[4], rho0, es0);
        let (z0, z0p) = scale(pv[2], pv[5], rho0, es0);

        // In-plane: invert the fundamental matrix at ν0 (where J = 0) to
        // recover the integration constants, then evaluate at ν
        let phi0 = in_plane(e, g0.nu, 0.0);
        let phi0_inv = phi0
            .try_inverse()
            .context(crate::errors::InfiniteValueSnafu {
                action: "inverting the relative-motion fundamental matrix",
            })
            .context(PropPhysicsSnafu)?;
        let constants: Vector4 = phi0_inv * Vector4::new(x0, y0, x0p, y0p);
        let state1: Vector4 = in_plane(e, g1.nu, j) * constants;

        // Out-of-plane: harmonic in true anomaly. The accumulated sweep is
        // recovered from the mean motion, since ν and M advance by the same
        // 2π per revolution.
        let n = (g0.mu / g0.a.powi(3)).sqrt();
        let wraps = ((n * dt - (g1.nu - g0.nu)) / std::f64::consts::TAU).round();
        let dnu = g1.nu - g0.nu + wraps * std::f64::consts::TAU;
        let (sin_dnu, cos_dnu) = dnu.sin_cos();
        let oop: Vector2 = Matrix2::new(cos_dnu, sin_dnu, -sin_dnu, cos_dnu) * Vector2::new(z0, z0p);

        let rho1 = g1.rho();
        let es1 = e * g1.nu.sin();
        let (x1, vx1) = unscale(state1[0], state1[2], rho1, es1);
        let (y1, vy1) = unscale(state1[1], state1[3], rho1, es1);
        let (z1, vz1) = unscale(oop[0], oop[1], rho1, es1);

        let qsw = Vector6::new(x1, y1, z1, vx1, vy1, vz1);
        let coord: Vector6 = m6 * qsw;

        let mut out = orbit.clone();
        out.set_coord(coord);
        out.set_date(*date);
        Ok(out)
    }

    fn iter(&self, opts: IterOpts) -> Result<StateStream<'_>, PropagationError> {
        analytic_iter(self, opts)
    }

    fn fresh(&self) -> Box<dyn Propagator> {
        Box::new(Self::new(self.chief.clone()))
    }

    fn boxed(&self) -> Box<dyn Propagator> {
        Box::new(Self {
            chief: self.chief.clone(),
            orbit: self.orbit.clone(),
        })
    }
}
