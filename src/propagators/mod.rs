/*
 * Orrery Astrodynamics Core
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Propagator contract and the sample-stream machinery shared by every
//! propagator and by ephemerides: date-range resolution, listener watching
//! and event bisection.

pub mod cw;
pub mod eckhech;
pub mod j2;
pub mod kepler;
pub mod keplernum;
pub mod listeners;
pub mod sgp4;
pub mod soi;
pub mod ya;

use std::collections::VecDeque;

use snafu::prelude::*;

use crate::errors::{
    MissingStepSnafu, MissingStopSnafu, PropagationError, PropTimeSnafu, UninitializedSnafu,
};
use crate::orbits::StateVector;
use crate::time::{Date, RangeEnd, TimeDelta};

use listeners::Listener;

pub use kepler::Kepler;
pub use keplernum::KeplerNum;

/// Anything that can produce a state at an arbitrary date: propagators,
/// ephemerides, analytic body models.
pub trait StateSource: Send + Sync {
    fn state_at(&self, date: &Date) -> Result<StateVector, PropagationError>;
}

/// The contract every propagator fulfills.
///
/// A propagator is initialized by capturing an orbit (possibly converted to
/// the form and frame it prefers), then queried for single samples with
/// [`propagate`](Propagator::propagate) or for streams with
/// [`iter`](Propagator::iter).
pub trait Propagator: StateSource + Send + Sync {
    /// Captures the initial state.
    fn set_orbit(&mut self, state: &StateVector) -> Result<(), PropagationError>;

    /// The captured initial state, if any.
    fn orbit(&self) -> Option<&StateVector>;

    /// Single sample at the given date.
    fn propagate(&self, date: &Date) -> Result<StateVector, PropagationError>;

    /// Stream of samples in ascending date order (descending when stepped
    /// backward); samples injected by listener bisection carry an event.
    fn iter(&self, opts: IterOpts) -> Result<StateStream<'_>, PropagationError>;

    /// A fresh propagator of the same type and configuration, without an
    /// initial state.
    fn fresh(&self) -> Box<dyn Propagator>;

    /// A full copy, initial state included.
    fn boxed(&self) -> Box<dyn Propagator>;

    /// The step the propagator would naturally use, if it has one.
    fn default_step(&self) -> Option<TimeDelta> {
        None
    }
}

impl<P: Propagator + ?Sized> StateSource for P {
    fn state_at(&self, date: &Date) -> Result<StateVector, PropagationError> {
        self.propagate(date)
    }
}


/// A stream of propagated samples.
pub type StateStream<'a> = Box<dyn Iterator<Item = Result<StateVector, PropagationError>> + 'a>;

/// Options of a propagation or ephemeris iteration.
pub struct IterOpts {
    /// First date; the initial orbit date when unset.
    pub start: Option<Date>,
    /// Last date, or a duration from `start`.
    pub stop: Option<RangeEnd>,
    /// Output step; the propagator's own when unset.
    pub step: Option<TimeDelta>,
    /// Whether the stopping date itself is produced.
    pub inclusive: bool,
    /// When iterating an ephemeris, whether out-of-range bounds raise
    /// instead of clamping.
    pub strict: bool,
    /// Explicit sampling dates, overriding start/stop/step.
    pub dates: Option<Vec<Date>>,
    /// Zero-crossing watchers injecting event samples into the stream.
    pub listeners: Vec<Box<dyn Listener>>,
}

impl Default for IterOpts {
    fn default() -> Self {
        Self {
            start: None,
            stop: None,
            step: None,
            inclusive: true,
            strict: true,
            dates: None,
            listeners: Vec::new(),
        }
    }
}

impl IterOpts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn until(stop: impl Into<RangeEnd>) -> Self {
        Self {
            stop: Some(stop.into()),
            ..Self::default()
        }
    }

    pub fn between(start: Date, stop: impl Into<RangeEnd>, step: TimeDelta) -> Self {
        Self {
            start: Some(start),
            stop: Some(stop.into()),
            step: Some(step),
            ..Self::default()
        }
    }

    pub fn over(dates: Vec<Date>) -> Self {
        Self {
            dates: Some(dates),
            ..Self::default()
        }
    }

    pub fn with_step(mut self, step: TimeDelta) -> Self {
        self.step = Some(step);
        self
    }

    pub fn with_start(mut self, start: Date) -> Self {
        self.start = Some(start);
        self
    }

    pub fn exclusive(mut self) -> Self {
        self.inclusive = false;
        self
    }

    pub fn lenient(mut self) -> Self {
        self.strict = false;
        self
    }

    pub fn listen(mut self, listener: Box<dyn Listener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn listen_all(mut self, listeners: Vec<Box<dyn Listener>>) -> Self {
        self.listeners.extend(listeners);
        self
    }

    /// Resolves the options into the explicit list of sampling dates.
    pub(crate) fn resolve_dates(
        &self,
        default_start: Date,
        default_step: Option<TimeDelta>,
    ) -> Result<Vec<Date>, PropagationError> {
        if let Some(dates) = &self.dates {
            return Ok(dates.clone());
        }

        let start = self.start.unwrap_or(default_start);
        let stop = match self.stop.context(MissingStopSnafu)? {
            RangeEnd::Date(date) => date,
            RangeEnd::Delta(delta) => start.shift(delta).context(PropTimeSnafu)?,
        };
        let mut step = self.step.or(default_step).context(MissingStepSnafu)?;
        if start > stop && step.total_seconds() > 0.0 {
            step = -step;
        }

        let range = Date::range(start, stop, step, self.inclusive).context(PropTimeSnafu)?;
        range
            .map(|d| d.context(PropTimeSnafu))
            .collect::<Result<Vec<_>, _>>()
    }
}

/// Watches the listeners across the stream of samples and performs event
/// bisection when a zero-crossing is detected.
pub(crate) struct Speaker {
    listeners: Vec<Box<dyn Listener>>,
    prevs: Vec<Option<StateVector>>,
}

impl Speaker {
    pub(crate) fn new(listeners: Vec<Box<dyn Listener>>) -> Self {
        let prevs = listeners.iter().map(|_| None).collect();
        Self { listeners, prevs }
    }

    /// Checks every listener against the new sample, returning the event
    /// samples found between the previous sample and this one, sorted by
    /// date.
    pub(crate) fn listen(
        &mut self,
        provider: &dyn StateSource,
        orb: &StateVector,
    ) -> Result<Vec<StateVector>, PropagationError> {
        let mut events = Vec::new();
        for (i, listener) in self.listeners.iter().enumerate() {
            if let Some(prev) = &self.prevs[i] {
                if listener.armed(orb)? {
                    let v_prev = listener.value(prev)?;
                    let v_cur = listener.value(orb)?;
                    if (v_prev < 0.0) != (v_cur < 0.0) {
                        events.push(bisect(provider, prev, orb, listener.as_ref())?);
                    }
                }
            }
            self.prevs[i] = Some(orb.clone());
        }
        events.sort_by(|a, b| a.date().partial_cmp(&b.date()).unwrap());
        Ok(events)
    }
}

/// Searches the zero-crossing of the watched parameter between two samples,
/// by re-propagating the midpoint until the interval is narrower than one
/// time tick. The returned sample is annotated with the listener's event.
fn bisect(
    provider: &dyn StateSource,
    prev: &StateVector,
    orb: &StateVector,
    listener: &dyn Listener,
) -> Result<StateVector, PropagationError> {
    let mut begin = prev.clone();
    let mut end = orb.clone();

    let mut step = (end.date() - begin.date()) * 0.5;
    while step.abs() >= TimeDelta::TICK {
        let date = begin.date().shift(step).context(PropTimeSnafu)?;
        let mid = provider.state_at(&date)?;
        if listener.value(&begin)? * listener.value(&mid)? > 0.0 {
            begin = mid;
        } else {
            end = mid;
        }
        step = (end.date() - begin.date()) * 0.5;
    }

    let event = listener.info(prev, &end)?;
    end.set_event(Some(event));
    Ok(end)
}

enum Provider<'a> {
    Borrowed(&'a dyn StateSource),
    Owned(Box<dyn StateSource>),
}

impl Provider<'_> {
    fn get(&self) -> &dyn StateSource {
        match self {
            Provider::Borrowed(p) => *p,
            Provider::Owned(p) => p.as_ref(),
        }
    }
}

/// Iterator over samples produced by a [`StateSource`] at a list of dates,
/// with listener-injected event samples interleaved in date order.
pub struct StateIter<'a> {
    provider: Provider<'a>,
    dates: std::vec::IntoIter<Date>,
    speaker: Speaker,
    pending: VecDeque<StateVector>,
    failed: bool,
}

impl<'a> StateIter<'a> {
    pub(crate) fn borrowed(
        provider: &'a dyn StateSource,
        dates: Vec<Date>,
        listeners: Vec<Box<dyn Listener>>,
    ) -> Self {
        Self {
            provider: Provider::Borrowed(provider),
            dates: dates.into_iter(),
            speaker: Speaker::new(listeners),
            pending: VecDeque::new(),
            failed: false,
        }
    }

    pub(crate) fn owned(
        provider: Box<dyn StateSource>,
        dates: Vec<Date>,
        listeners: Vec<Box<dyn Listener>>,
    ) -> Self {
        Self {
            provider: Provider::Owned(provider),
            dates: dates.into_iter(),
            speaker: Speaker::new(listeners),
            pending: VecDeque::new(),
            failed: false,
        }
    }
}

impl Iterator for StateIter<'_> {
    type Item = Result<StateVector, PropagationError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        if let Some(pending) = self.pending.pop_front() {
            return Some(Ok(pending));
        }

        let date = self.dates.next()?;
        let produce = (|| {
            let mut orb = self.provider.get().state_at(&date)?;
            orb.set_event(None);
            let events = self.speaker.listen(self.provider.get(), &orb)?;
            Ok::<_, PropagationError>((orb, events))
        })();

        match produce {
            Ok((orb, events)) => {
                self.pending.extend(events);
                self.pending.push_back(orb);
                Some(Ok(self.pending.pop_front().unwrap()))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// `iter` implementation shared by the analytical propagators: loop
/// `propagate` over the resolved date range.
pub(crate) fn analytic_iter<'a>(
    prop: &'a dyn Propagator,
    opts: IterOpts,
) -> Result<StateStream<'a>, PropagationError> {
    let initial = prop.orbit().context(UninitializedSnafu)?;
    let dates = opts.resolve_dates(initial.date(), prop.default_step())?;
    Ok(Box::new(StateIter::borrowed(prop, dates, opts.listeners)))
}
