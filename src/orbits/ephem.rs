/*
 * Orrery Astrodynamics Core
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Tabulated orbits: an ordered sequence of states sharing a frame, with
//! interpolation, windowed iteration and sub-slicing.

use snafu::prelude::*;

use crate::errors::{
    EmptyEphemerisSnafu, EphemerisError, EphemFormSnafu, InsufficientSamplesSnafu, OutOfRangeSnafu,
    PropagationError, PropEphemerisSnafu,
};
use crate::frames::frame::Frame;
use crate::math::interp::{lagrange, linear, InterpMethod};
use crate::orbits::forms::Form;
use crate::orbits::statevector::StateVector;
use crate::propagators::{IterOpts, StateIter, StateSource, StateStream};
use crate::time::{Date, RangeEnd};

/// A range of orbits, interpolated linearly or by Lagrange polynomial.
#[derive(Clone)]
pub struct Ephem {
    states: Vec<StateVector>,
    method: InterpMethod,
    order: usize,
    /// TAI MJD of each sample, the interpolation abscissa.
    xs: Vec<f64>,
}

impl Ephem {
    pub const DEFAULT_ORDER: usize = 8;

    /// Builds an ephemeris from samples, re-sorted by date.
    pub fn new(states: impl IntoIterator<Item = StateVector>) -> Result<Self, EphemerisError> {
        let mut states: Vec<StateVector> = states.into_iter().collect();
        ensure!(!states.is_empty(), EmptyEphemerisSnafu);
        states.sort_by(|a, b| a.date().partial_cmp(&b.date()).unwrap());
        let xs = states.iter().map(|s| s.date().mjd_tai()).collect();
        Ok(Self {
            states,
            method: InterpMethod::Lagrange,
            order: Self::DEFAULT_ORDER,
            xs,
        })
    }

    /// Same, collecting a fallible stream (as produced by a propagator).
    pub fn from_stream(stream: StateStream<'_>) -> Result<Self, PropagationError> {
        let states = stream.collect::<Result<Vec<_>, _>>()?;
        Self::new(states).context(PropEphemerisSnafu)
    }

    pub fn with_method(mut self, method: InterpMethod, order: usize) -> Self {
        self.method = method;
        self.order = order;
        self
    }

    pub fn method(&self) -> InterpMethod {
        self.method
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn states(&self) -> &[StateVector] {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Date of the first sample.
    pub fn start(&self) -> Date {
        self.states[0].date()
    }

    /// Date of the last sample.
    pub fn stop(&self) -> Date {
        self.states[self.states.len() - 1].date()
    }

    pub fn dates(&self) -> impl Iterator<Item = Date> + '_ {
        self.states.iter().map(|s| s.date())
    }

    /// Frame of the first sample.
    pub fn frame(&self) -> &Frame {
        self.states[0].frame()
    }

    /// Form of the first sample.
    pub fn form(&self) -> Form {
        self.states[0].form()
    }

    /// Changes the frame of every sample.
    pub fn set_frame(&mut self, frame: &Frame) -> Result<(), EphemerisError> {
        for state in &mut self.states {
            state.set_frame(frame).map_err(|source| {
                EphemerisError::EphemFrame {
                    source: Box::new(source),
                }
            })?;
        }
        Ok(())
    }

    /// Changes the form of every sample.
    pub fn set_form(&mut self, form: Form) -> Result<(), EphemerisError> {
        for state in &mut self.states {
            state.set_form(form).context(EphemFormSnafu)?;
        }
        Ok(())
    }

    /// Interpolated state at the given date.
    ///
    /// Interpolating at a stored sample date reproduces the stored vector
    /// exactly; a date outside `[start, stop]` is an error.
    pub fn interpolate(&self, date: &Date) -> Result<StateVector, EphemerisError> {
        let x = date.mjd_tai();
        ensure!(
            self.len() >= 2 && self.xs[0] <= x && x <= self.xs[self.len() - 1],
            OutOfRangeSnafu {
                date: *date,
                start: self.start(),
                stop: self.stop(),
            }
        );

        let ys: Vec<_> = self.states.iter().map(|s| *s.coord()).collect();
        let coord = match self.method {
            InterpMethod::Linear => linear(&self.xs, &ys, x),
            InterpMethod::Lagrange => {
                ensure!(
                    self.len() >= self.order,
                    InsufficientSamplesSnafu {
                        got: self.len(),
                        order: self.order,
                    }
                );
                lagrange(&self.xs, &ys, x, self.order)
            }
        };

        Ok(StateVector::new(
            coord,
            *date,
            self.form(),
            self.frame().clone(),
        ))
    }

    /// Alias of [`interpolate`](Self::interpolate), to expose the same
    /// surface as a propagator.
    pub fn propagate(&self, date: &Date) -> Result<StateVector, EphemerisError> {
        self.interpolate(date)
    }

    /// Iterates over this ephemeris at different dates.
    ///
    /// With explicit `dates`, samples at each of them. With a `step`, walks
    /// the regular range; without one, walks the stored samples falling in
    /// the window. Out-of-range bounds raise unless `strict` is disabled,
    /// in which case they clamp to the ephemeris span. Listeners inject
    /// event samples in date order.
    pub fn iter(&self, opts: IterOpts) -> Result<StateStream<'_>, PropagationError> {
        let dates = self.resolve_window(&opts)?;
        Ok(Box::new(StateIter::borrowed(self, dates, opts.listeners)))
    }

    /// A new ephemeris made of the iterated samples.
    pub fn ephem(&self, opts: IterOpts) -> Result<Ephem, PropagationError> {
        let stream = self.iter(opts)?;
        let mut out = Self::from_stream(stream)?;
        out.method = self.method;
        out.order = self.order;
        Ok(out)
    }

    fn resolve_window(&self, opts: &IterOpts) -> Result<Vec<Date>, PropagationError> {
        if let Some(dates) = &opts.dates {
            return Ok(dates.clone());
        }

        let oob = |date: Date| {
            PropagationError::PropEphemeris {
                source: Box::new(EphemerisError::OutOfRange {
                    date,
                    start: self.start(),
                    stop: self.stop(),
                }),
            }
        };

        let requested_start = opts.start.unwrap_or_else(|| self.start());
        let mut start = requested_start;
        if start < self.start() {
            if opts.strict {
                return Err(oob(start));
            }
            start = self.start();
        }

        let mut stop = match opts.stop {
            None => self.stop(),
            Some(RangeEnd::Date(date)) => date,
            Some(RangeEnd::Delta(delta)) => requested_start
                .shift(delta)
                .map_err(|source| PropagationError::PropTime { source })?,
        };
        if stop > self.stop() {
            if opts.strict {
                return Err(oob(stop));
            }
            stop = self.stop();
        }

        match opts.step {
            None => Ok(self
                .dates()
                .filter(|d| *d >= start && *d <= stop)
                .collect()),
            Some(step) => {
                let range = Date::range(start, stop, step, opts.inclusive)
                    .map_err(|source| PropagationError::PropTime { source })?;
                range
                    .map(|d| d.map_err(|source| PropagationError::PropTime { source }))
                    .collect()
            }
        }
    }
}

impl StateSource for Ephem {
    fn state_at(&self, date: &Date) -> Result<StateVector, PropagationError> {
        self.interpolate(date).map_err(|source| {
            PropagationError::PropEphemeris {
                source: Box::new(source),
            }
        })
    }
}

impl Ephem {
    /// Registers a frame following this ephemeris.
    pub fn as_frame(
        &self,
        name: &str,
        orientation: Option<crate::frames::local::LocalFrame>,
        parent: &Frame,
    ) -> Result<Frame, PropagationError> {
        use crate::frames::frame::{orbit_to_frame, FrameOffset};
        use std::sync::Arc;

        let source: Arc<dyn StateSource> = Arc::new(self.clone());
        orbit_to_frame(
            name,
            FrameOffset::Moving(source, self.frame().clone()),
            orientation,
            parent,
        )
        .map_err(|source| PropagationError::PropFrame {
            source: Box::new(source),
        })
    }
}
