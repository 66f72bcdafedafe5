/*
 * Orrery Astrodynamics Core
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Patched-conic propagation: wraps a Keplerian propagator and re-anchors
//! it whenever the object crosses into another body's sphere of influence.

use log::debug;
use snafu::prelude::*;

use crate::bodies::Body;
use crate::errors::{PropagationError, PropFormSnafu, PropFrameSnafu, UninitializedSnafu};
use crate::frames::frame::Frame;
use crate::orbits::forms::Form;
use crate::orbits::statevector::StateVector;
use crate::propagators::keplernum::{KeplerNum, RkMethod};
use crate::propagators::{IterOpts, Kepler, Propagator, Speaker, StateStream};
use crate::time::{Date, TimeDelta};

/// A body an object can be captured by, with its sphere-of-influence
/// radius and the frame its motion is expressed in.
#[derive(Clone)]
pub struct SoiBody {
    pub body: Body,
    /// SOI radius, meters.
    pub radius: f64,
    pub frame: Frame,
}

/// Index into the SOI table; `None` is the central body.
type Active = Option<usize>;

fn active_soi(alt: &[SoiBody], orb: &StateVector) -> Result<Active, PropagationError> {
    for (i, soi) in alt.iter().enumerate() {
        let sph = orb
            .clone()
            .with_frame(&soi.frame)
            .context(PropFrameSnafu)?
            .with_form(Form::Spherical)
            .context(PropFormSnafu)?;
        if sph.coord()[0] < soi.radius {
            return Ok(Some(i));
        }
    }
    Ok(None)
}

/// Shared switching loop: samples at each date with an inner propagator
/// rebuilt at every SOI transition.
fn run_switching<F>(
    alt: &[SoiBody],
    central_frame: &Frame,
    out_frame: Option<&Frame>,
    initial: &StateVector,
    dates: &[Date],
    mut make_inner: F,
) -> Result<Vec<StateVector>, PropagationError>
where
    F: FnMut(&StateVector, Active) -> Result<Box<dyn Propagator>, PropagationError>,
{
    let mut active = active_soi(alt, initial)?;
    let mut anchor = anchored(initial, active, alt, central_frame)?;
    let mut inner = make_inner(&anchor, active)?;

    let mut out = Vec::with_capacity(dates.len());
    for date in dates {
        let sample = inner.propagate(date)?;

        let soi = active_soi(alt, &sample)?;
        if soi != active {
            let from = soi_name(alt, active);
            let to = soi_name(alt, soi);
            debug!("SOI change {from} => {to} at {date}");
            active = soi;
            anchor = anchored(&sample, active, alt, central_frame)?;
            inner = make_inner(&anchor, active)?;
        }

        let sample = match out_frame {
            Some(frame) => sample.with_frame(frame).context(PropFrameSnafu)?,
            None => sample,
        };
        out.push(sample);
    }
    Ok(out)
}

fn soi_name(alt: &[SoiBody], active: Active) -> String {
    match active {
        Some(i) => alt[i].body.name.clone(),
        None => "central".to_owned(),
    }
}

fn anchored(
    state: &StateVector,
    active: Active,
    alt: &[SoiBody],
    central_frame: &Frame,
) -> Result<StateVector, PropagationError> {
    let frame = match active {
        Some(i) => &alt[i].frame,
        None => central_frame,
    };
    state.clone().with_frame(frame).context(PropFrameSnafu)
}

/// Kepler (analytical) propagator switching between spheres of influence.
pub struct SoiAnalytical {
    central: Body,
    central_frame: Frame,
    alt: Vec<SoiBody>,
    out_frame: Option<Frame>,
    orbit: Option<StateVector>,
}

impl SoiAnalytical {
    pub fn new(
        central: Body,
        central_frame: Frame,
        alt: Vec<SoiBody>,
        out_frame: Option<Frame>,
    ) -> Self {
        Self {
            central,
            central_frame,
            alt,
            out_frame,
            orbit: None,
        }
    }

    fn run(&self, dates: &[Date]) -> Result<Vec<StateVector>, PropagationError> {
        let initial = self.orbit.as_ref().context(UninitializedSnafu)?;
        run_switching(
            &self.alt,
            &self.central_frame,
            self.out_frame.as_ref(),
            initial,
            dates,
            |anchor, _active| {
                let mut inner = Kepler::new();
                inner.set_orbit(anchor)?;
                Ok(Box::new(inner) as Box<dyn Propagator>)
            },
        )
    }

    /// The body currently steering the object at its initial state.
    pub fn active_body(&self) -> Result<String, PropagationError> {
        let initial = self.orbit.as_ref().context(UninitializedSnafu)?;
        let active = active_soi(&self.alt, initial)?;
        Ok(match active {
            Some(i) => self.alt[i].body.name.clone(),
            None => self.central.name.clone(),
        })
    }
}

impl Propagator for SoiAnalytical {
    fn set_orbit(&mut self, state: &StateVector) -> Result<(), PropagationError> {
        self.orbit = Some(state.clone());
        Ok(())
    }

    fn orbit(&self) -> Option<&StateVector> {
        self.orbit.as_ref()
    }

    fn propagate(&self, date: &Date) -> Result<StateVector, PropagationError> {
        let samples = self.run(&[*date])?;
        Ok(samples.into_iter().next().expect("one date, one sample"))
    }

    fn iter(&self, opts: IterOpts) -> Result<StateStream<'_>, PropagationError> {
        let initial = self.orbit.as_ref().context(UninitializedSnafu)?;
        let dates = opts.resolve_dates(initial.date(), self.default_step())?;
        let samples = self.run(&dates)?;
        Ok(stream_with_listeners(self, samples, opts.listeners))
    }

    fn fresh(&self) -> Box<dyn Propagator> {
        Box::new(Self::new(
            self.central.clone(),
            self.central_frame.clone(),
            self.alt.clone(),
            self.out_frame.clone(),
        ))
    }

    fn boxed(&self) -> Box<dyn Propagator> {
        let mut out = self.fresh();
        if let Some(orbit) = &self.orbit {
            if let Err(e) = out.set_orbit(orbit) {
                log::error!("could not clone an initialized propagator: {e}");
            }
        }
        out
    }
}

/// Numerical propagator switching between spheres of influence, with a
/// per-regime step size.
pub struct SoiNumerical {
    central: Body,
    central_frame: Frame,
    central_step: TimeDelta,
    alt_step: TimeDelta,
    alt: Vec<SoiBody>,
    method: RkMethod,
    tol: f64,
    out_frame: Option<Frame>,
    orbit: Option<StateVector>,
}

impl SoiNumerical {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        central_step: TimeDelta,
        alt_step: TimeDelta,
        central: Body,
        central_frame: Frame,
        alt: Vec<SoiBody>,
        method: RkMethod,
        tol: f64,
        out_frame: Option<Frame>,
    ) -> Self {
        Self {
            central,
            central_frame,
            central_step,
            alt_step,
            alt,
            method,
            tol,
            out_frame,
            orbit: None,
        }
    }

    fn run(&self, dates: &[Date]) -> Result<Vec<StateVector>, PropagationError> {
        let initial = self.orbit.as_ref().context(UninitializedSnafu)?;
        run_switching(
            &self.alt,
            &self.central_frame,
            self.out_frame.as_ref(),
            initial,
            dates,
            |anchor, active| {
                let (body, frame, step) = match active {
                    Some(i) => (
                        self.alt[i].body.clone(),
                        self.alt[i].frame.clone(),
                        self.alt_step,
                    ),
                    None => (
                        self.central.clone(),
                        self.central_frame.clone(),
                        self.central_step,
                    ),
                };
                let mut inner = KeplerNum::new(step, vec![body], self.method, frame, self.tol);
                inner.set_orbit(anchor)?;
                Ok(Box::new(inner) as Box<dyn Propagator>)
            },
        )
    }
}

impl Propagator for SoiNumerical {
    fn set_orbit(&mut self, state: &StateVector) -> Result<(), PropagationError> {
        self.orbit = Some(state.clone());
        Ok(())
    }

    fn orbit(&self) -> Option<&StateVector> {
        self.orbit.as_ref()
    }

    fn propagate(&self, date: &Date) -> Result<StateVector, PropagationError> {
        let samples = self.run(&[*date])?;
        Ok(samples.into_iter().next().expect("one date, one sample"))
    }

    fn iter(&self, opts: IterOpts) -> Result<StateStream<'_>, PropagationError> {
        let initial = self.orbit.as_ref().context(UninitializedSnafu)?;
        let dates = opts.resolve_dates(initial.date(), self.default_step())?;
        let samples = self.run(&dates)?;
        Ok(stream_with_listeners(self, samples, opts.listeners))
    }

    fn fresh(&self) -> Box<dyn Propagator> {
        Box::new(Self::new(
            self.central_step,
            self.alt_step,
            self.central.clone(),
            self.central_frame.clone(),
            self.alt.clone(),
            self.method,
            self.tol,
            self.out_frame.clone(),
        ))
    }

    fn boxed(&self) -> Box<dyn Propagator> {
        let mut out = self.fresh();
        if let Some(orbit) = &self.orbit {
            if let Err(e) = out.set_orbit(orbit) {
                log::error!("could not clone an initialized propagator: {e}");
            }
        }
        out
    }

    fn default_step(&self) -> Option<TimeDelta> {
        Some(self.central_step)
    }
}

/// Wraps precomputed samples into a stream, running the listeners over
/// them with the propagator itself as the bisection provider.
fn stream_with_listeners<'a>(
    provider: &'a dyn Propagator,
    samples: Vec<StateVector>,
    listeners: Vec<Box<dyn crate::propagators::listeners::Listener>>,
) -> StateStream<'a> {
    let mut speaker = Speaker::new(listeners);
    let mut out: Vec<Result<StateVector, PropagationError>> = Vec::new();
    for mut sample in samples {
        sample.set_event(None);
        match speaker.listen(provider, &sample) {
            Ok(events) => out.extend(events.into_iter().map(Ok)),
            Err(e) => {
                out.push(Err(e));
                return Box::new(out.into_iter());
            }
        }
        out.push(Ok(sample));
    }
    Box::new(out.into_iter())
}
