/*
 * Orrery Astrodynamics Core
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Keplerian motion numerical propagator, Runge-Kutta family.
//!
//! For the adaptive stepsize methods, the highest order computes the next
//! state and the embedded lower order estimates the error: RKF54 uses order
//! 5 for the state and 4 for the control.

use snafu::prelude::*;

use crate::bodies::Body;
use crate::errors::{
    NoConvergenceSnafu, PropagationError, PropFormSnafu, PropFrameSnafu, PropEphemerisSnafu,
    UninitializedSnafu,
};
use crate::frames::frame::Frame;
use crate::math::{Vector3, Vector6};
use crate::orbits::ephem::Ephem;
use crate::orbits::forms::Form;
use crate::orbits::man::Maneuver;
use crate::orbits::statevector::StateVector;
use crate::propagators::{IterOpts, Propagator, StateIter, StateSource, StateStream};
use crate::time::{Date, TimeDelta};

/// Integration method selector.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RkMethod {
    /// Euler fixed-step integrator (order 1)
    Euler,
    /// Runge-Kutta 4th order fixed-step integrator
    Rk4,
    /// Runge-Kutta-Fehlberg 5(4) adaptive-step integrator
    Rkf54,
    /// Dormand-Prince 5(4) adaptive-step integrator
    Dopri54,
}

/// Butcher tableau of a Runge-Kutta method.
struct Butcher {
    a: &'static [&'static [f64]],
    b: &'static [f64],
    b_star: Option<&'static [f64]>,
    c: &'static [f64],
}

const EULER: Butcher = Butcher {
    a: &[&[]],
    b: &[1.0],
    b_star: None,
    c: &[0.0],
};

const RK4: Butcher = Butcher {
    a: &[&[], &[0.5], &[0.0, 0.5], &[0.0, 0.0, 1.0]],
    b: &[1.0 / 6.0, 1.0 / 3.0, 1.0 / 3.0, 1.0 / 6.0],
    b_star: None,
    c: &[0.0, 0.5, 0.5, 1.0],
};

const RKF54: Butcher = Butcher {
    a: &[
        &[],
        &[1.0 / 4.0],
        &[3.0 / 32.0, 9.0 / 32.0],
        &[1932.0 / 2197.0, -7200.0 / 2197.0, 7296.0 / 2197.0],
        &[439.0 / 216.0, -8.0, 3680.0 / 513.0, -845.0 / 4104.0],
        &[-8.0 / 27.0, 2.0, -3544.0 / 2565.0, 1859.0 / 4104.0, -11.0 / 40.0],
    ],
    b: &[
        16.0 / 135.0,
        0.0,
        6656.0 / 12825.0,
        28561.0 / 56430.0,
        -9.0 / 50.0,
        2.0 / 55.0,
    ],
    b_star: Some(&[
        25.0 / 216.0,
        0.0,
        1408.0 / 2565.0,
        2197.0 / 4104.0,
        -1.0 / 5.0,
        0.0,
    ]),
    c: &[0.0, 1.0 / 4.0, 3.0 / 8.0, 12.0 / 13.0, 1.0, 0.5],
};

const DOPRI54: Butcher = Butcher {
    a: &[
        &[],
        &[1.0 / 5.0],
        &[3.0 / 40.0, 9.0 / 40.0],
        &[44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0],
        &[19372.0 / 6561.0, -25360.0 / 2187.0, 64448.0 / 6561.0, -212.0 / 729.0],
        &[
            9017.0 / 3168.0,
            -355.0 / 33.0,
            46732.0 / 5247.0,
            49.0 / 176.0,
            -5103.0 / 18656.0,
        ],
        &[
            35.0 / 384.0,
            0.0,
            500.0 / 1113.0,
            125.0 / 192.0,
            -2187.0 / 6784.0,
            11.0 / 84.0,
        ],
    ],
    b: &[
        35.0 / 384.0,
        0.0,
        500.0 / 1113.0,
        125.0 / 192.0,
        -2187.0 / 6784.0,
        11.0 / 84.0,
        0.0,
    ],
    b_star: Some(&[
        5179.0 / 57600.0,
        0.0,
        7571.0 / 16695.0,
        393.0 / 640.0,
        -92097.0 / 339200.0,
        187.0 / 2100.0,
        1.0 / 40.0,
    ]),
    c: &[0.0, 1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0, 1.0],
};

impl RkMethod {
    fn butcher(&self) -> &'static Butcher {
        match self {
            Self::Euler => &EULER,
            Self::Rk4 => &RK4,
            Self::Rkf54 => &RKF54,
            Self::Dopri54 => &DOPRI54,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Euler => "euler",
            Self::Rk4 => "rk4",
            Self::Rkf54 => "rkf54",
            Self::Dopri54 => "dopri54",
        }
    }
}

const MAX_STEP_RETRIES: usize = 10;

/// Numerical propagator integrating Newtonian gravitation from a set of
/// attractor bodies, with impulsive and continuous maneuver handling.
pub struct KeplerNum {
    step: TimeDelta,
    bodies: Vec<Body>,
    method: RkMethod,
    frame: Frame,
    tol: f64,
    orbit: Option<StateVector>,
}

impl KeplerNum {
    pub fn new(step: TimeDelta, bodies: Vec<Body>, method: RkMethod, frame: Frame, tol: f64) -> Self {
        Self {
            step,
            bodies,
            method,
            frame,
            tol,
            orbit: None,
        }
    }

    pub fn method(&self) -> RkMethod {
        self.method
    }

    /// Derivative of the cartesian state: Newton's law of universal
    /// gravitation from each attractor, plus active continuous maneuvers.
    fn derivative(&self, orb: &StateVector) -> Result<Vector6, PropagationError> {
        let mut out = Vector6::zeros();
        out.fixed_rows_mut::<3>(0)
            .copy_from(&orb.coord().fixed_rows::<3>(3));

        let pos: Vector3 = orb.coord().fixed_rows::<3>(0).into();
        let mut accel = Vector3::zeros();

        for body in &self.bodies {
            let body_state = body
                .propagate(&orb.date())?
                .with_frame(orb.frame())
                .context(PropFrameSnafu)?
                .with_form(Form::Cartesian)
                .context(PropFormSnafu)?;
            let diff: Vector3 = Vector3::from(body_state.coord().fixed_rows::<3>(0)) - pos;
            accel += body.mu() * diff / diff.norm().powi(3);
        }

        if let Some(initial) = &self.orbit {
            for man in initial.maneuvers() {
                if let Maneuver::Continuous(man) = man {
                    if man.check(&orb.date()) {
                        accel += man.accel(orb).context(PropFormSnafu)?;
                    }
                }
            }
        }

        out.fixed_rows_mut::<3>(3).copy_from(&accel);
        Ok(out)
    }

    /// One integration step, possibly adapted for the embedded methods,
    /// with impulsive maneuvers applied at the step that brackets them.
    fn make_step(
        &self,
        orb: &StateVector,
        step: TimeDelta,
    ) -> Result<(TimeDelta, StateVector), PropagationError> {
        let butcher = self.method.butcher();
        let (aa, bb, cc) = (butcher.a, butcher.b, butcher.c);

        let mut step = step;
        let mut result = None;

        for _ in 0..MAX_STEP_RETRIES {
            let secs = step.total_seconds();
            let mut ks: Vec<Vector6> = vec![self.derivative(orb)?];

            for (a_row, c) in aa.iter().zip(cc.iter()).skip(1) {
                let mut combo = Vector6::zeros();
                for (a, k) in a_row.iter().zip(ks.iter()) {
                    combo += k * *a;
                }
                let mut stage = orb.clone();
                stage.set_coord(orb.coord() + combo * secs);
                stage.set_date(
                    orb.date()
                        .shift(step * *c)
                        .map_err(|source| PropagationError::PropTime { source })?,
                );
                ks.push(self.derivative(&stage)?);
            }

            let mut incr = Vector6::zeros();
            for (b, k) in bb.iter().zip(ks.iter()) {
                incr += k * *b;
            }

            let mut next = orb.clone();
            next.set_coord(orb.coord() + incr * secs);
            next.set_date(
                orb.date()
                    .shift(step)
                    .map_err(|source| PropagationError::PropTime { source })?,
            );

            let b_star = match butcher.b_star {
                None => {
                    result = Some(next);
                    break;
                }
                Some(b_star) => b_star,
            };

            let mut err = Vector6::zeros();
            for ((b, b_s), k) in bb.iter().zip(b_star.iter()).zip(ks.iter()) {
                err += k * (*b - *b_s);
            }
            let p_error = (err * secs).fixed_rows::<3>(0).norm();

            if p_error <= self.tol {
                result = Some(next);
                break;
            }

            // Reduce the step and retry
            let factor = (self.tol / (2.0 * p_error)).powf(1.0 / (bb.len() as f64 - 1.0));
            let reduced = step * factor;
            step = if reduced.abs() < self.step.abs() {
                reduced
            } else {
                self.step * step.signum()
            };
        }

        let mut next = result.context(NoConvergenceSnafu {
            method: self.method.name(),
            iterations: MAX_STEP_RETRIES,
        })?;

        if let Some(initial) = &self.orbit {
            for man in initial.maneuvers() {
                if let Maneuver::Impulsive(man) = man {
                    if man.check(&orb.date(), step) {
                        let dv = man.dv(&next).context(PropFormSnafu)?;
                        let mut coord = *next.coord();
                        for (i, value) in dv.iter().enumerate() {
                            coord[3 + i] += *value;
                        }
                        next.set_coord(coord);
                    }
                }
            }
        }

        Ok((step, next))
    }

    /// Integrates an ephemeris of native (possibly variable) steps covering
    /// both `start` and `stop`, from the initial orbit outward.
    fn build_ephem(&self, start: Date, stop: Date) -> Result<Ephem, PropagationError> {
        let initial = self.orbit.as_ref().context(UninitializedSnafu)?;
        let t0 = initial.date();

        let lo = if start < stop { start } else { stop };
        let hi = if start < stop { stop } else { start };

        let mut states = vec![initial.clone()];

        // Forward leg
        if hi > t0 {
            let mut orb = initial.clone();
            while orb.date() < hi {
                let (_, next) = self.make_step(&orb, self.step)?;
                orb = next;
                states.push(orb.clone());
            }
        }
        // Backward leg
        if lo < t0 {
            let mut orb = initial.clone();
            while orb.date() > lo {
                let (_, next) = self.make_step(&orb, -self.step)?;
                orb = next;
                states.push(orb.clone());
            }
        }

        // Enough points for the interpolator to work near the edges
        let mut orb = states.last().expect("at least the initial state").clone();
        while states.len() < Ephem::DEFAULT_ORDER {
            let (_, next) = self.make_step(&orb, self.step)?;
            orb = next;
            states.push(orb.clone());
        }

        Ephem::new(states).context(PropEphemerisSnafu)
    }
}

impl Propagator for KeplerNum {
    fn set_orbit(&mut self, state: &StateVector) -> Result<(), PropagationError> {
        let orbit = state
            .clone()
            .with_frame(&self.frame)
            .context(PropFrameSnafu)?
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
        let ephem = self.build_ephem(initial.date(), *date)?;
        ephem.state_at(date)
    }

    /// Integrates at the native step, then interpolates at the requested
    /// output dates over the intermediate ephemeris.
    fn iter(&self, opts: IterOpts) -> Result<StateStream<'_>, PropagationError> {
        let initial = self.orbit.as_ref().context(UninitializedSnafu)?;

        // When the caller does not request an output step, the native
        // integration samples provide the dates
        let explicit = opts.resolve_dates(initial.date(), None);
        let dates = match explicit {
            Ok(dates) => dates,
            Err(PropagationError::MissingStep) => Vec::new(),
            Err(e) => return Err(e),
        };

        let (start, stop) = if dates.is_empty() {
            let start = opts.start.unwrap_or_else(|| initial.date());
            let stop = match opts.stop {
                Some(crate::time::RangeEnd::Date(date)) => date,
                Some(crate::time::RangeEnd::Delta(delta)) => start
                    .shift(delta)
                    .map_err(|source| PropagationError::PropTime { source })?,
                None => return Err(PropagationError::MissingStop),
            };
            (start, stop)
        } else {
            (dates[0], dates[dates.len() - 1])
        };

        let ephem = self.build_ephem(start, stop)?;
        let dates = if dates.is_empty() {
            ephem
                .dates()
                .filter(|d| *d >= start.min(stop) && *d <= start.max(stop))
                .collect()
        } else {
            dates
        };

        Ok(Box::new(StateIter::owned(
            Box::new(ephem),
            dates,
            opts.listeners,
        )))
    }

    fn fresh(&self) -> Box<dyn Propagator> {
        Box::new(Self::new(
            self.step,
            self.bodies.clone(),
            self.method,
            self.frame.clone(),
            self.tol,
        ))
    }

    fn boxed(&self) -> Box<dyn Propagator> {
        let mut out = self.fresh();
        if let Some(orbit) = &self.orbit {
            // The captured state is already in the propagation frame
            if let Err(e) = out.set_orbit(orbit) {
                log::error!("could not clone an initialized propagator: {e}");
            }
        }
        out
    }

    fn default_step(&self) -> Option<TimeDelta> {
        Some(self.step)
    }
}

#[cfg(test)]
mod ut_keplernum {
    use super::*;

    #[test]
    fn test_butcher_consistency() {
        for method in [RkMethod::Euler, RkMethod::Rk4, RkMethod::Rkf54, RkMethod::Dopri54] {
            let butcher = method.butcher();
            assert_eq!(butcher.a.len(), butcher.b.len());
            assert_eq!(butcher.c.len(), butcher.b.len());
            // The weights sum to one
            let sum: f64 = butcher.b.iter().sum();
            assert!((sum - 1.0).abs() < 1e-12, "{method:?} weights");
            if let Some(b_star) = butcher.b_star {
                let sum: f64 = b_star.iter().sum();
                assert!((sum - 1.0).abs() < 1e-12, "{method:?} embedded weights");
            }
            // Each stage time matches the sum of its coupling row
            for (row, c) in butcher.a.iter().zip(butcher.c.iter()).skip(1) {
                let sum: f64 = row.iter().sum();
                assert!((sum - *c).abs() < 1e-12, "{method:?} row sum");
            }
        }
    }
}
