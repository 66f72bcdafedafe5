/*
 * Orrery Astrodynamics Core
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Clohessy-Wiltshire analytical propagator for relative motion.
//!
//! Works only with orbits defined in a Hill frame, centered on a target
//! spacecraft in circular orbit. The initial orbit is the chaser relative
//! to the target; propagated states are the evolution of that relative
//! motion, through the closed-form transition matrix, with impulsive and
//! continuous maneuvers applied in the local frame.

use snafu::prelude::*;

use crate::bodies::Body;
use crate::errors::{
    NotHillSnafu, PropagationError, PropFormSnafu, PropFrameSnafu, UninitializedSnafu,
};
use crate::frames::frame::Frame;
use crate::frames::local::{qsw_to_lvlh, qsw_to_tnw, LocalFrame};
use crate::math::rotation::expand;
use crate::math::{Matrix3, Matrix6, Vector3, Vector6};
use crate::orbits::forms::Form;
use crate::orbits::man::Maneuver;
use crate::orbits::statevector::StateVector;
use crate::propagators::{analytic_iter, IterOpts, Propagator, StateStream};
use crate::time::Date;

type Matrix63 = nalgebra::Matrix6x3<f64>;

/// Clohessy-Wiltshire propagator, parametrized by the semi-major axis of
/// the target (which must be on a circular orbit for the linearization to
/// hold).
pub struct ClohessyWiltshire {
    /// Semi-major axis of the target, meters.
    pub sma: f64,
    frame: Frame,
    mu: f64,
    orbit: Option<StateVector>,
}

impl ClohessyWiltshire {
    pub fn new(sma: f64, frame: Frame) -> Result<Self, PropagationError> {
        if !frame.is_hill() {
            return NotHillSnafu { name: frame.name() }
                .fail()
                .context(PropFrameSnafu);
        }
        let mu = frame
            .center()
            .body()
            .unwrap_or_else(Body::earth)
            .mu();
        Ok(Self {
            sma,
            frame,
            mu,
            orbit: None,
        })
    }

    /// Builds the propagator from a target orbit, using its semi-major
    /// axis.
    pub fn from_orbit(
        target: &crate::orbits::orbit::Orbit,
        orientation: LocalFrame,
    ) -> Result<Self, PropagationError> {
        let kep = target
            .state()
            .clone()
            .with_form(Form::Keplerian)
            .context(PropFormSnafu)?;
        Self::new(kep.coord()[0], Frame::hill(orientation))
    }

    /// Mean motion of the target spacecraft.
    pub fn n(&self) -> f64 {
        (self.mu / self.sma.powi(3)).sqrt()
    }

    /// Rotation from the computational frame (QSW) to the orientation of
    /// the Hill frame.
    fn mat3(&self) -> Matrix3 {
        match self.frame.hill_orientation() {
            Some(LocalFrame::Tnw) => qsw_to_tnw(),
            Some(LocalFrame::Lvlh) => qsw_to_lvlh(),
            _ => Matrix3::identity(),
        }
    }

    /// Closed-form propagation of a relative state, with an optional
    /// constant acceleration (both in the Hill frame orientation).
    fn transition(&self, date: &Date, orb: &StateVector, accel: Option<Vector3>) -> StateVector {
        let t = (*date - orb.date()).total_seconds();
        let n = self.n();
        let nt = n * t;
        let (sn, cs) = nt.sin_cos();

        // Evolution matrix in QSW
        #[rustfmt::skip]
        let evol = Matrix6::new(
            4.0 - 3.0 * cs,        0.0, 0.0,      sn / n,            2.0 / n * (1.0 - cs),       0.0,
            6.0 * (sn - nt),       1.0, 0.0,      2.0 / n * (cs - 1.0), (4.0 * sn - 3.0 * nt) / n, 0.0,
            0.0,                   0.0, cs,       0.0,               0.0,                        sn / n,
            3.0 * n * sn,          0.0, 0.0,      cs,                2.0 * sn,                   0.0,
            6.0 * n * (cs - 1.0),  0.0, 0.0,      -2.0 * sn,         4.0 * cs - 3.0,             0.0,
            0.0,                   0.0, -n * sn,  0.0,               0.0,                        cs,
        );

        // Acceleration matrix in QSW
        #[rustfmt::skip]
        let accel_mat = Matrix63::new(
            (1.0 - cs) / n.powi(2),          2.0 / n.powi(2) * (nt - sn),                          0.0,
            2.0 / n.powi(2) * (sn - nt),     (4.0 * (1.0 - cs) - 1.5 * nt.powi(2)) / n.powi(2),    0.0,
            0.0,                             0.0,                                                  (1.0 - cs) / n.powi(2),
            sn / n,                          2.0 / n * (1.0 - cs),                                 0.0,
            2.0 / n * (cs - 1.0),            (4.0 * sn - 3.0 * nt) / n,                            0.0,
            0.0,                             0.0,                                                  sn / n,
        );

        let m3 = self.mat3();
        let m6 = expand(&m3, None);

        // Both matrices are defined in QSW; rotate them when the Hill
        // frame is oriented differently
        let (evol, accel_mat) = if m3 == Matrix3::identity() {
            (evol, accel_mat)
        } else {
            let mut rotated = accel_mat;
            let top: Matrix3 = m3 * accel_mat.fixed_view::<3, 3>(0, 0).clone_owned() * m3.transpose();
            let bottom: Matrix3 =
                m3 * accel_mat.fixed_view::<3, 3>(3, 0).clone_owned() * m3.transpose();
            rotated.fixed_view_mut::<3, 3>(0, 0).copy_from(&top);
            rotated.fixed_view_mut::<3, 3>(3, 0).copy_from(&bottom);
            (m6 * evol * m6.transpose(), rotated)
        };

        let accel = accel.unwrap_or_else(Vector3::zeros);
        let coord: Vector6 = evol * orb.coord() + accel_mat * accel;

        let mut out = orb.clone();
        out.set_coord(coord);
        out.set_date(*date);
        out
    }
}

impl Propagator for ClohessyWiltshire {
    fn set_orbit(&mut self, state: &StateVector) -> Result<(), PropagationError> {
        ensure!(
            state.frame().is_hill(),
            crate::errors::WrongFrameSnafu {
                expected: "Hill",
                got: state.frame().name(),
            }
        );
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
        let initial = self.orbit.as_ref().context(UninitializedSnafu)?;
        let mut orb = initial.clone();

        // Maneuvers split the propagation into arcs
        for man in initial.maneuvers() {
            match man {
                Maneuver::Impulsive(man) if *date >= man.date => {
                    orb = self.transition(&man.date, &orb, None);
                    let dv = man.dv(&orb).context(PropFormSnafu)?;
                    let mut coord = *orb.coord();
                    for (i, value) in dv.iter().enumerate() {
                        coord[3 + i] += *value;
                    }
                    orb.set_coord(coord);
                }
                Maneuver::Continuous(man) if *date >= man.start => {
                    orb = self.transition(&man.start, &orb, None);
                    let accel = man.accel(&orb).context(PropFormSnafu)?;
                    if man.check(date) {
                        // The propagation date is inside the thrust span
                        return Ok(self.transition(date, &orb, Some(accel)));
                    }
                    orb = self.transition(&man.stop, &orb, Some(accel));
                }
                _ => {}
            }
        }

        Ok(self.transition(date, &orb, None))
    }

    fn iter(&self, opts: IterOpts) -> Result<StateStream<'_>, PropagationError> {
        analytic_iter(self, opts)
    }

    fn fresh(&self) -> Box<dyn Propagator> {
        Box::new(Self {
            sma: self.sma,
            frame: self.frame.clone(),
            mu: self.mu,
            orbit: None,
        })
    }

    fn boxed(&self) -> Box<dyn Propagator> {
        Box::new(Self {
            sma: self.sma,
            frame: self.frame.clone(),
            mu: self.mu,
            orbit: self.orbit.clone(),
        })
    }
}
