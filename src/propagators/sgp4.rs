/*
 * Orrery Astrodynamics Core
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! SGP4, the TLE-native analytical propagator (near-Earth variant; SDP4 is
//! not implemented). Initialized from mean elements in TEME at a TLE epoch,
//! and producing cartesian TEME states.

use log::warn;
use snafu::prelude::*;

use crate::errors::{PropagationError, PropFrameSnafu, UninitializedSnafu};
use crate::frames::frame::{get_frame, Frame};
use crate::math::{norm_2pi, Vector3, Vector6};
use crate::orbits::forms::Form;
use crate::orbits::statevector::StateVector;
use crate::propagators::{analytic_iter, IterOpts, Propagator, StateStream};
use crate::time::Date;

/// Gravity model underlying the SGP4 constants.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Sgp4Gravity {
    Wgs72,
    Wgs84,
}

#[derive(Copy, Clone, Debug)]
struct Gravity {
    /// km³/s²
    mu: f64,
    /// km
    r_e: f64,
    k_e: f64,
    j2: f64,
    j3: f64,
    j4: f64,
}

impl Sgp4Gravity {
    fn constants(&self) -> Gravity {
        match self {
            Self::Wgs72 => {
                let mu = 3.986008e5;
                let r_e = 6378.135;
                Gravity {
                    mu,
                    r_e,
                    k_e: 60.0 / (r_e.powi(3) / mu).sqrt(),
                    j2: 0.001082616,
                    j3: -0.00000253881,
                    j4: -0.00000165597,
                }
            }
            Self::Wgs84 => {
                let mu = 3.986005e5;
                let r_e = 6378.137;
                Gravity {
                    mu,
                    r_e,
                    k_e: 60.0 / (r_e.powi(3) / mu).sqrt(),
                    j2: 0.00108262998905,
                    j3: -0.00000253215306,
                    j4: -0.00000161098761,
                }
            }
        }
    }
}

/// Values derived from the TLE at initialization.
#[derive(Clone, Debug)]
struct Sgp4Init {
    epoch: Date,
    /// i0, Ω0, e0, ω0, M0 (rad) and n0 (rad/min)
    elements: [f64; 6],
    bstar: f64,
    a30: f64,
    k2: f64,
    /// Brouwer mean motion, rad/min
    n0: f64,
    /// Brouwer semi-major axis, Earth radii
    a0: f64,
    s: f64,
    q0: f64,
    theta: f64,
    xi: f64,
    beta0: f64,
    eta: f64,
    c1: f64,
    c3: f64,
    c4: f64,
    c5: f64,
    d2: f64,
    d3: f64,
    d4: f64,
    mdot: f64,
    omdot: f64,
    nodot: f64,
}

/// The SGP4 propagator.
pub struct Sgp4 {
    gravity: Sgp4Gravity,
    init: Option<Sgp4Init>,
    template: Option<StateVector>,
    frame: Option<Frame>,
}

impl Sgp4 {
    pub fn new(gravity: Sgp4Gravity) -> Self {
        Self {
            gravity,
            init: None,
            template: None,
            frame: None,
        }
    }

    fn initialize(&self, state: &StateVector) -> Result<Sgp4Init, PropagationError> {
        ensure!(
            state.form() == Form::Tle,
            crate::errors::WrongFormSnafu {
                expected: Form::Tle.name(),
                got: state.form().name(),
            }
        );
        ensure!(
            state.frame().name() == "TEME",
            crate::errors::WrongFrameSnafu {
                expected: "TEME",
                got: state.frame().name(),
            }
        );

        let bstar = match &state.metadata.tle {
            Some(tle) => tle.bstar,
            None => {
                warn!("no drag term attached to the orbit, using bstar = 0");
                0.0
            }
        };

        let g = self.gravity.constants();
        let coord = *state.coord();
        let (i0, _raan0, e0, om0, _m0) = (coord[0], coord[1], coord[2], coord[3], coord[4]);
        // rad/s to rad/min
        let n0 = coord[5] * 60.0;

        let a30 = -g.j3;
        let k2 = 0.5 * g.j2;
        let k4 = -3.0 / 8.0 * g.j4;

        let delta = 1.5 * k2 * (3.0 * i0.cos().powi(2) - 1.0) / (1.0 - e0.powi(2)).powf(1.5);

        let a1 = (g.k_e / n0).powf(2.0 / 3.0);
        let delta1 = delta / a1.powi(2);
        let mut a0 = a1 * (1.0 - delta1 / 3.0 - delta1.powi(2) - 134.0 * delta1.powi(3) / 81.0);
        let delta0 = delta / a0.powi(2);
        let n0 = n0 / (1.0 + delta0);
        a0 /= 1.0 - delta0;

        // Perigee, in Earth radii then altitude in km
        let rp = a0 * (1.0 - e0);
        let rp_alt = (rp - 1.0) * g.r_e;

        let mut s = 78.0 / g.r_e + 1.0;
        let q0 = 120.0 / g.r_e + 1.0;
        if rp_alt < 156.0 {
            s = rp_alt - 78.0;
            if rp_alt < 98.0 {
                s = 20.0;
            }
            s = s / g.r_e + 1.0;
        }

        let theta = i0.cos();
        let xi = 1.0 / (a0 - s);
        let beta0 = (1.0 - e0.powi(2)).sqrt();
        let eta = a0 * e0 * xi;

        let q0s4x4 = (q0 - s).powi(4) * xi.powi(4);
        let one_eta = (1.0 - eta.powi(2)).powf(-3.5);

        let c2 = q0s4x4
            * n0
            * one_eta
            * (a0 * (1.0 + 1.5 * eta.powi(2) + 4.0 * e0 * eta + e0 * eta.powi(3))
                + 3.0 * k2 * xi * (-0.5 + 1.5 * theta.powi(2))
                    * (8.0 + 24.0 * eta.powi(2) + 3.0 * eta.powi(4))
                    / (2.0 * (1.0 - eta.powi(2))));
        let c1 = bstar * c2;

        let c3 = if e0 > 1e-4 {
            q0s4x4 * xi * a30 * n0 * i0.sin() / (k2 * e0)
        } else {
            0.0
        };

        let c4 = 2.0
            * n0
            * q0s4x4
            * a0
            * beta0.powi(2)
            * one_eta
            * ((2.0 * eta * (1.0 + e0 * eta) + 0.5 * e0 + 0.5 * eta.powi(3))
                - 2.0 * k2 * xi / (a0 * (1.0 - eta.powi(2)))
                    * (3.0 * (1.0 - 3.0 * theta.powi(2))
                        * (1.0 + 1.5 * eta.powi(2) - 2.0 * e0 * eta - 0.5 * e0 * eta.powi(3))
                        + 0.75
                            * (1.0 - theta.powi(2))
                            * (2.0 * eta.powi(2) - e0 * eta - e0 * eta.powi(3))
                            * (2.0 * om0).cos()));
        let c5 = 2.0
            * q0s4x4
            * a0
            * beta0.powi(2)
            * one_eta
            * (1.0 + 2.75 * eta * (eta + e0) + e0 * eta.powi(3));

        let d2 = 4.0 * a0 * xi * c1.powi(2);
        let d3 = 4.0 / 3.0 * a0 * xi.powi(2) * (17.0 * a0 + s) * c1.powi(3);
        let d4 = 2.0 / 3.0 * a0.powi(2) * xi.powi(3) * (221.0 * a0 + 31.0 * s) * c1.powi(4);

        let mdot = 1.0
            + 3.0 * k2 * (3.0 * theta.powi(2) - 1.0) / (2.0 * a0.powi(2) * beta0.powi(3))
            + 3.0 * k2.powi(2) * (13.0 - 78.0 * theta.powi(2) + 137.0 * theta.powi(4))
                / (16.0 * a0.powi(4) * beta0.powi(7));
        let omdot = -3.0 * k2 * (1.0 - 5.0 * theta.powi(2)) / (2.0 * a0.powi(2) * beta0.powi(4))
            + 3.0 * k2.powi(2) * (7.0 - 114.0 * theta.powi(2) + 395.0 * theta.powi(4))
                / (16.0 * a0.powi(4) * beta0.powi(8))
            + 5.0 * k4 * (3.0 - 36.0 * theta.powi(2) + 49.0 * theta.powi(4))
                / (4.0 * a0.powi(4) * beta0.powi(8));
        let nodot = -3.0 * k2 * theta / (a0.powi(2) * beta0.powi(4))
            + 3.0 * k2.powi(2) * (4.0 * theta - 19.0 * theta.powi(3))
                / (2.0 * a0.powi(4) * beta0.powi(8))
            + 5.0 * k4 * theta * (3.0 - 7.0 * theta.powi(2)) / (2.0 * a0.powi(4) * beta0.powi(8));

        Ok(Sgp4Init {
            epoch: state.date(),
            elements: [coord[0], coord[1], coord[2], coord[3], coord[4], n0],
            bstar,
            a30,
            k2,
            n0,
            a0,
            s,
            q0,
            theta,
            xi,
            beta0,
            eta,
            c1,
            c3,
            c4,
            c5,
            d2,
            d3,
            d4,
            mdot,
            omdot,
            nodot,
        })
    }
}

impl Propagator for Sgp4 {
    fn set_orbit(&mut self, state: &StateVector) -> Result<(), PropagationError> {
        let init = self.initialize(state)?;
        self.frame = Some(get_frame("TEME").context(PropFrameSnafu)?);
        self.init = Some(init);
        self.template = Some(state.clone());
        Ok(())
    }

    fn orbit(&self) -> Option<&StateVector> {
        self.template.as_ref()
    }

    fn propagate(&self, date: &Date) -> Result<StateVector, PropagationError> {
        let init = self.init.as_ref().context(UninitializedSnafu)?;
        let template = self.template.as_ref().context(UninitializedSnafu)?;
        let frame = self.frame.as_ref().context(UninitializedSnafu)?;
        let g = self.gravity.constants();

        let [i0, raan0, e0, om0, m0, _] = init.elements;
        let tdiff = (*date - init.epoch).total_seconds() / 60.0;

        let n0 = init.n0;
        let bstar = init.bstar;

        let mdf = m0 + init.mdot * n0 * tdiff;
        let omdf = om0 + init.omdot * n0 * tdiff;
        let nodf = raan0 + init.nodot * n0 * tdiff;

        let delta_om = bstar * init.c3 * om0.cos() * tdiff;
        let delta_m = if e0 > 1e-4 {
            -2.0 / 3.0 * (init.q0 - init.s).powi(4) * bstar * init.xi.powi(4) / (e0 * init.eta)
                * ((1.0 + init.eta * mdf.cos()).powi(3) - (1.0 + init.eta * m0.cos()).powi(3))
        } else {
            0.0
        };

        let mp = norm_2pi(mdf + delta_om + delta_m);
        let om = omdf - delta_om - delta_m;
        let node = nodf
            - 21.0 * n0 * init.k2 * init.theta / (2.0 * init.a0.powi(2) * init.beta0.powi(2))
                * init.c1
                * tdiff.powi(2);
        let mut e = e0 - bstar * init.c4 * tdiff - bstar * init.c5 * (mp.sin() - m0.sin());
        if e < 1e-6 {
            e = 1e-6;
        }

        let a = init.a0
            * (1.0 - init.c1 * tdiff
                - init.d2 * tdiff.powi(2)
                - init.d3 * tdiff.powi(3)
                - init.d4 * tdiff.powi(4))
            .powi(2);

        let l = mp
            + om
            + node
            + n0 * (1.5 * init.c1 * tdiff.powi(2)
                + (init.d2 + 2.0 * init.c1.powi(2)) * tdiff.powi(3)
                + 0.25 * (3.0 * init.d3 + 12.0 * init.c1 * init.d2 + 10.0 * init.c1.powi(3))
                    * tdiff.powi(4)
                + 0.2 * (3.0 * init.d4
                    + 12.0 * init.c1 * init.d3
                    + 6.0 * init.d2.powi(2)
                    + 30.0 * init.c1.powi(2) * init.d2
                    + 15.0 * init.c1.powi(4))
                    * tdiff.powi(5));

        let beta = (1.0 - e.powi(2)).sqrt();
        let n = g.mu / a.powf(1.5);

        // Long-period terms
        let ax_n = e * om.cos();
        let ay_nl = init.a30 * i0.sin() / (4.0 * init.k2 * a * beta.powi(2));
        let tmp = (1.0 + init.theta).max(1.5e-12);
        let l_l = ay_nl / 2.0 * ax_n * ((3.0 + 5.0 * init.theta) / tmp);

        let l_t = l + l_l;
        let ay_n = e * om.sin() + ay_nl;

        // Kepler's equation on (E + ω)
        let u = norm_2pi(l_t - node);
        let mut epw = u;
        for _ in 0..10 {
            let delta_epw = (u - ay_n * epw.cos() + ax_n * epw.sin() - epw)
                / (1.0 - ay_n * epw.sin() - ax_n * epw.cos());
            if delta_epw.abs() < 1e-12 {
                break;
            }
            epw += delta_epw;
        }

        // Short-period terms
        let ecos_e = ax_n * epw.cos() + ay_n * epw.sin();
        let esin_e = ax_n * epw.sin() - ay_n * epw.cos();
        let e_l = (ax_n.powi(2) + ay_n.powi(2)).sqrt();
        let p_l = a * (1.0 - e_l.powi(2));
        let r = a * (1.0 - ecos_e);
        let rdot = a.sqrt() / r * esin_e;
        let rfdot = p_l.sqrt() / r;

        let betal = (1.0 - e_l.powi(2)).sqrt();
        let cosu = a / r * (epw.cos() - ax_n + ay_n * esin_e / (1.0 + betal));
        let sinu = a / r * (epw.sin() - ay_n - ax_n * esin_e / (1.0 + betal));
        let su = sinu.atan2(cosu);

        let delta_r = init.k2 / (2.0 * p_l) * (1.0 - init.theta.powi(2)) * (2.0 * su).cos();
        let delta_u = -init.k2 / (4.0 * p_l.powi(2)) * (7.0 * init.theta.powi(2) - 1.0)
            * (2.0 * su).sin();
        let delta_node = 3.0 * init.k2 * init.theta / (2.0 * p_l.powi(2)) * (2.0 * su).sin();
        let delta_i =
            3.0 * init.k2 * init.theta / (2.0 * p_l.powi(2)) * i0.sin() * (2.0 * su).cos();
        let delta_rdot =
            -n * init.k2 * (1.0 - init.theta.powi(2)) * (2.0 * su).sin() / (p_l * g.mu);
        let delta_rfdot = init.k2 * n
            * ((1.0 - init.theta.powi(2)) * (2.0 * su).cos()
                - 1.5 * (1.0 - 3.0 * init.theta.powi(2)))
            / (p_l * g.mu);

        let rk = r * (1.0 - 1.5 * init.k2 * betal / p_l.powi(2) * (3.0 * init.theta.powi(2) - 1.0))
            + delta_r;
        let uk = su + delta_u;
        let nodek = node + delta_node;
        let ik = i0 + delta_i;
        let rdotk = rdot + delta_rdot;
        let rfdotk = rfdot + delta_rfdot;

        // Orientation vectors
        let vm = Vector3::new(
            -nodek.sin() * ik.cos(),
            nodek.cos() * ik.cos(),
            ik.sin(),
        );
        let vn = Vector3::new(nodek.cos(), nodek.sin(), 0.0);

        let vu = vm * uk.sin() + vn * uk.cos();
        let vv = vm * uk.cos() - vn * uk.sin();

        // km and km/min scaled by the Earth radius, then meters
        let pos = rk * vu * g.r_e * 1000.0;
        let vel = (rdotk * vu + rfdotk * vv) * (g.r_e * g.k_e / 60.0) * 1000.0;

        let mut coord = Vector6::zeros();
        coord.fixed_rows_mut::<3>(0).copy_from(&pos);
        coord.fixed_rows_mut::<3>(3).copy_from(&vel);

        let mut out = template.clone();
        out.set_coord(coord);
        out.set_date(*date);
        out.force_frame(frame.clone());
        out.force_form(Form::Cartesian);
        Ok(out)
    }

    fn iter(&self, opts: IterOpts) -> Result<StateStream<'_>, PropagationError> {
        analytic_iter(self, opts)
    }

    fn fresh(&self) -> Box<dyn Propagator> {
        Box::new(Self::new(self.gravity))
    }

    fn boxed(&self) -> Box<dyn Propagator> {
        Box::new(Self {
            gravity: self.gravity,
            init: self.init.clone(),
            template: self.template.clone(),
            frame: self.frame.clone(),
        })
    }
}

impl Default for Sgp4 {
    fn default() -> Self {
        Self::new(Sgp4Gravity::Wgs72)
    }
}

#[cfg(test)]
mod ut_sgp4 {
    use super::*;

    #[test]
    fn test_gravity_constants() {
        let wgs72 = Sgp4Gravity::Wgs72.constants();
        // k_e is the square root of µ in Earth-radii/minute units
        let expected = 60.0 / (wgs72.r_e.powi(3) / wgs72.mu).sqrt();
        assert!((wgs72.k_e - expected).abs() < 1e-15);
        assert!((wgs72.k_e - 0.07436691).abs() < 1e-6);
    }
}
