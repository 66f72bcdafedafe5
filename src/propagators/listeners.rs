/*
 * Orrery Astrodynamics Core
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Listeners watch for state transitions during a propagation: terminator
//! and shadow crossings, nodes, apsides, station visibility. Each one
//! exposes a signed scalar whose zero-crossings mark the event; the
//! propagation stream bisects the bracketing interval and injects an
//! annotated sample.

use snafu::prelude::*;

use crate::errors::{EventNotFoundSnafu, PropagationError, PropFormSnafu, PropFrameSnafu};
use crate::frames::frame::Frame;
use crate::frames::stations::Station;
use crate::math::{wrap_pi, Vector3};
use crate::orbits::forms::Form;
use crate::orbits::statevector::StateVector;

/// What kind of listener produced an event.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EventKind {
    Light,
    Terminator,
    Node,
    Apside,
    Anomaly,
    Signal,
    Mask,
    Max,
    RadialVelocity,
}

/// Annotation attached to a sample produced by listener bisection.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    pub info: String,
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.info)
    }
}

/// A zero-crossing detector over propagated states.
pub trait Listener: Send + Sync {
    /// Signed scalar whose sign change marks the event.
    fn value(&self, state: &StateVector) -> Result<f64, PropagationError>;

    /// Whether the listener is watching at all for this sample. Disabled
    /// listeners keep recording their previous sample but do not trigger.
    fn armed(&self, _state: &StateVector) -> Result<bool, PropagationError> {
        Ok(true)
    }

    /// Event annotation, built from the last regular sample and the
    /// bisected event sample.
    fn info(&self, prev: &StateVector, state: &StateVector) -> Result<Event, PropagationError>;
}

/// Helper: the state converted to spherical form, possibly in another frame.
fn spherical_in(
    state: &StateVector,
    frame: Option<&Frame>,
) -> Result<StateVector, PropagationError> {
    let mut out = state.clone();
    if let Some(frame) = frame {
        out.set_frame(frame).context(PropFrameSnafu)?;
    }
    out.set_form(Form::Spherical).context(PropFormSnafu)?;
    Ok(out)
}

fn cartesian_in(
    state: &StateVector,
    frame: Option<&Frame>,
) -> Result<StateVector, PropagationError> {
    let mut out = state.clone();
    if let Some(frame) = frame {
        out.set_frame(frame).context(PropFrameSnafu)?;
    }
    out.set_form(Form::Cartesian).context(PropFormSnafu)?;
    Ok(out)
}

/// Which edge of the Earth shadow cone to watch.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ShadowKind {
    /// Penumbra to shadow transition
    Umbra,
    /// Light to penumbra transition
    Penumbra,
}

/// Illumination of the object by the Sun, for umbra/penumbra detection.
///
/// Positive when the object is illuminated.
pub struct LightListener {
    pub kind: ShadowKind,
}

impl LightListener {
    pub fn new(kind: ShadowKind) -> Self {
        Self { kind }
    }
}

impl Listener for LightListener {
    fn value(&self, state: &StateVector) -> Result<f64, PropagationError> {
        let sun = crate::env::solarsystem::get_body("Sun")?;
        let sun_orb = sun.propagate(&state.date())?;
        let orb = cartesian_in(state, Some(sun_orb.frame()))?;

        let x_sun: Vector3 = sun_orb.coord().fixed_rows::<3>(0).into();
        let norm_x_sun = x_sun.norm();
        let x_sat: Vector3 = orb.coord().fixed_rows::<3>(0).into();
        let norm_x_sat = x_sat.norm();

        let body_r = orb
            .frame()
            .center()
            .body()
            .unwrap_or_else(crate::bodies::Body::earth)
            .equatorial_radius;

        let alpha_umb = ((sun.equatorial_radius - body_r) / norm_x_sun).asin();
        let alpha_pen = alpha_umb;

        if x_sun.dot(&x_sat) < 0.0 {
            let zeta = (-x_sun.dot(&x_sat) / (norm_x_sun * norm_x_sat)).acos();
            let sat_horiz = norm_x_sat * zeta.cos();
            let sat_vert = norm_x_sat * zeta.sin();

            let x = body_r / alpha_pen.sin();
            let pen_vert = alpha_pen.tan() * (x + sat_horiz);

            if sat_vert <= pen_vert {
                if self.kind == ShadowKind::Penumbra {
                    return Ok(-1.0);
                }
                let y = body_r / alpha_umb.sin();
                let umb_vert = alpha_umb.tan() * (y - sat_horiz);
                if sat_vert <= umb_vert {
                    return Ok(-1.0);
                }
            }
        }
        Ok(1.0)
    }

    fn info(&self, _prev: &StateVector, state: &StateVector) -> Result<Event, PropagationError> {
        let exiting = self.value(state)? > 0.0;
        let info = match (self.kind, exiting) {
            (ShadowKind::Umbra, true) => "Umbra exit",
            (ShadowKind::Umbra, false) => "Umbra entry",
            (ShadowKind::Penumbra, true) => "Penumbra exit",
            (ShadowKind::Penumbra, false) => "Penumbra entry",
        };
        Ok(Event {
            kind: EventKind::Light,
            info: info.to_owned(),
        })
    }
}

/// Night/day transition at the surface of the Earth, at the zenith of the
/// object.
pub struct TerminatorListener;

impl Listener for TerminatorListener {
    fn value(&self, state: &StateVector) -> Result<f64, PropagationError> {
        let sun = crate::env::solarsystem::get_body("Sun")?;
        let sun_pos = cartesian_in(&sun.propagate(&state.date())?, Some(state.frame()))?;
        let sat = cartesian_in(state, None)?;

        let sun_p: Vector3 = sun_pos.coord().fixed_rows::<3>(0).into();
        let sat_p: Vector3 = sat.coord().fixed_rows::<3>(0).into();
        Ok(sat_p.dot(&sun_p) / (sun_p.norm() * sat_p.norm()))
    }

    fn info(&self, _prev: &StateVector, state: &StateVector) -> Result<Event, PropagationError> {
        let sun_frame = crate::env::solarsystem::sun_frame()?;
        let orb = spherical_in(state, Some(&sun_frame))?;
        let info = if orb.get("r_dot").context(PropFormSnafu)? > 0.0 {
            "Night Terminator"
        } else {
            "Day Terminator"
        };
        Ok(Event {
            kind: EventKind::Terminator,
            info: info.to_owned(),
        })
    }
}

/// Ascending and descending node detection: sign of the latitude in the
/// chosen frame.
pub struct NodeListener {
    pub frame: Option<Frame>,
}

impl NodeListener {
    pub fn new(frame: Option<Frame>) -> Self {
        Self { frame }
    }
}

impl Listener for NodeListener {
    fn value(&self, state: &StateVector) -> Result<f64, PropagationError> {
        let orb = spherical_in(state, self.frame.as_ref())?;
        orb.get("phi").context(PropFormSnafu)
    }

    fn info(&self, _prev: &StateVector, state: &StateVector) -> Result<Event, PropagationError> {
        let orb = spherical_in(state, self.frame.as_ref())?;
        let info = if orb.get("phi_dot").context(PropFormSnafu)? < 0.0 {
            "Desc Node"
        } else {
            "Asc Node"
        };
        Ok(Event {
            kind: EventKind::Node,
            info: info.to_owned(),
        })
    }
}

/// Periapsis and apoapsis detection: sign of the radial velocity.
pub struct ApsideListener {
    pub frame: Option<Frame>,
}

impl ApsideListener {
    pub fn new(frame: Option<Frame>) -> Self {
        Self { frame }
    }
}

impl Listener for ApsideListener {
    fn value(&self, state: &StateVector) -> Result<f64, PropagationError> {
        let orb = spherical_in(state, self.frame.as_ref())?;
        orb.get("r_dot").context(PropFormSnafu)
    }

    fn info(&self, prev: &StateVector, state: &StateVector) -> Result<Event, PropagationError> {
        let info = if self.value(state)? > self.value(prev)? {
            "Periapsis"
        } else {
            "Apoapsis"
        };
        Ok(Event {
            kind: EventKind::Apside,
            info: info.to_owned(),
        })
    }
}

/// Type of anomaly watched by an [`AnomalyListener`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AnomalyKind {
    True,
    Mean,
    Eccentric,
    /// Argument of latitude
    Aol,
}

impl AnomalyKind {
    fn form_and_component(&self) -> (Form, &'static str) {
        match self {
            Self::True => (Form::Keplerian, "nu"),
            Self::Mean => (Form::KeplerianMean, "M"),
            Self::Eccentric => (Form::KeplerianEccentric, "E"),
            Self::Aol => (Form::KeplerianCircular, "u"),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::True => "True Anomaly",
            Self::Mean => "Mean Anomaly",
            Self::Eccentric => "Eccentric Anomaly",
            Self::Aol => "Argument of Latitude",
        }
    }
}

/// Crossing of a given anomaly value, wrapped to (-π, π].
pub struct AnomalyListener {
    pub value: f64,
    pub kind: AnomalyKind,
    pub frame: Option<Frame>,
}

impl AnomalyListener {
    pub fn new(value: f64, kind: AnomalyKind, frame: Option<Frame>) -> Self {
        Self { value, kind, frame }
    }

    fn anomaly(&self, state: &StateVector) -> Result<f64, PropagationError> {
        let (form, component) = self.kind.form_and_component();
        let mut orb = state.clone();
        if let Some(frame) = &self.frame {
            orb.set_frame(frame).context(PropFrameSnafu)?;
        }
        orb.set_form(form).context(PropFormSnafu)?;
        orb.get(component).context(PropFormSnafu)
    }
}

impl Listener for AnomalyListener {
    fn value(&self, state: &StateVector) -> Result<f64, PropagationError> {
        Ok(wrap_pi(self.anomaly(state)? - self.value))
    }

    fn armed(&self, state: &StateVector) -> Result<bool, PropagationError> {
        // Keep away from the wrapping discontinuity
        Ok(self.value(state)?.abs() < 2.0)
    }

    fn info(&self, _prev: &StateVector, state: &StateVector) -> Result<Event, PropagationError> {
        let deg = self.anomaly(state)?.to_degrees();
        Ok(Event {
            kind: EventKind::Anomaly,
            info: format!("{} = {:.2}", self.kind.label(), deg),
        })
    }
}

/// AOS and LOS of a station: elevation above a threshold.
pub struct StationSignalListener {
    pub station: Station,
    pub elev: f64,
}

impl StationSignalListener {
    pub fn new(station: Station, elev: f64) -> Self {
        Self { station, elev }
    }
}

impl Listener for StationSignalListener {
    fn value(&self, state: &StateVector) -> Result<f64, PropagationError> {
        let orb = spherical_in(state, Some(&self.station.frame))?;
        Ok(orb.get("phi").context(PropFormSnafu)? - self.elev)
    }

    fn info(&self, _prev: &StateVector, state: &StateVector) -> Result<Event, PropagationError> {
        let orb = spherical_in(state, Some(&self.station.frame))?;
        let info = if orb.get("phi_dot").context(PropFormSnafu)? > 0.0 {
            "AOS"
        } else {
            "LOS"
        };
        Ok(Event {
            kind: EventKind::Signal,
            info: info.to_owned(),
        })
    }
}

/// Rising above the physical horizon of a station (terrain, vegetation,
/// buildings), from its azimuth/elevation mask.
pub struct StationMaskListener {
    pub station: Station,
}

impl StationMaskListener {
    pub fn new(station: Station) -> Self {
        Self { station }
    }
}

impl Listener for StationMaskListener {
    fn value(&self, state: &StateVector) -> Result<f64, PropagationError> {
        let orb = spherical_in(state, Some(&self.station.frame))?;
        let mask = self
            .station
            .get_mask(orb.get("theta").context(PropFormSnafu)?)
            .context(PropFrameSnafu)?;
        Ok(orb.get("phi").context(PropFormSnafu)? - mask)
    }

    fn armed(&self, state: &StateVector) -> Result<bool, PropagationError> {
        // Disabled when the object is below the station horizon
        let orb = spherical_in(state, Some(&self.station.frame))?;
        Ok(orb.get("phi").context(PropFormSnafu)? > 0.0)
    }

    fn info(&self, prev: &StateVector, state: &StateVector) -> Result<Event, PropagationError> {
        let info = if self.value(state)? > self.value(prev)? {
            "AOS"
        } else {
            "LOS"
        };
        Ok(Event {
            kind: EventKind::Mask,
            info: info.to_owned(),
        })
    }
}

/// Maximum elevation of a pass over a station: zero-crossing of the
/// elevation rate, only while the object is in sight and culminating.
pub struct StationMaxListener {
    pub station: Station,
}

impl StationMaxListener {
    pub fn new(station: Station) -> Self {
        Self { station }
    }
}

impl Listener for StationMaxListener {
    fn value(&self, state: &StateVector) -> Result<f64, PropagationError> {
        let orb = spherical_in(state, Some(&self.station.frame))?;
        orb.get("phi_dot").context(PropFormSnafu)
    }

    fn armed(&self, state: &StateVector) -> Result<bool, PropagationError> {
        let orb = spherical_in(state, Some(&self.station.frame))?;
        let phi = orb.get("phi").context(PropFormSnafu)?;
        let phi_dot = orb.get("phi_dot").context(PropFormSnafu)?;
        Ok(phi > 0.0 && phi_dot <= 0.0)
    }

    fn info(&self, _prev: &StateVector, _state: &StateVector) -> Result<Event, PropagationError> {
        Ok(Event {
            kind: EventKind::Max,
            info: "MAX".to_owned(),
        })
    }
}

/// Zero Doppler: sign change of the radial velocity in the chosen frame.
pub struct RadialVelocityListener {
    pub frame: Frame,
    /// Only compute when the object is in sight of the frame (useful when
    /// the frame is a station).
    pub sight: bool,
}

impl RadialVelocityListener {
    pub fn new(frame: Frame, sight: bool) -> Self {
        Self { frame, sight }
    }
}

impl Listener for RadialVelocityListener {
    fn value(&self, state: &StateVector) -> Result<f64, PropagationError> {
        let orb = spherical_in(state, Some(&self.frame))?;
        orb.get("r_dot").context(PropFormSnafu)
    }

    fn armed(&self, state: &StateVector) -> Result<bool, PropagationError> {
        if !self.sight {
            return Ok(true);
        }
        let orb = spherical_in(state, Some(&self.frame))?;
        Ok(orb.get("phi").context(PropFormSnafu)? > 0.0)
    }

    fn info(&self, _prev: &StateVector, _state: &StateVector) -> Result<Event, PropagationError> {
        Ok(Event {
            kind: EventKind::RadialVelocity,
            info: format!("Zero Doppler {}", self.frame),
        })
    }
}

/// The listener set of a station: AOS/LOS at the horizon, max elevation,
/// and mask crossing when the station has a mask defined.
pub fn stations_listeners(station: &Station) -> Vec<Box<dyn Listener>> {
    let mut listeners: Vec<Box<dyn Listener>> = vec![
        Box::new(StationSignalListener::new(station.clone(), 0.0)),
        Box::new(StationMaxListener::new(station.clone())),
    ];
    if station.has_mask() {
        listeners.push(Box::new(StationMaskListener::new(station.clone())));
    }
    listeners
}

/// Finds the `offset+1`-th event matching `info` in a sample stream.
pub fn find_event<I>(
    iter: I,
    info: &str,
    offset: usize,
) -> Result<StateVector, PropagationError>
where
    I: Iterator<Item = Result<StateVector, PropagationError>>,
{
    let mut seen = 0;
    for sample in iter {
        let sample = sample?;
        if let Some(event) = sample.event() {
            if event.info == info {
                if seen == offset {
                    return Ok(sample);
                }
                seen += 1;
            }
        }
    }
    EventNotFoundSnafu { info }.fail()
}

#[cfg(test)]
mod ut_listeners {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_anomaly_wrapping() {
        // The wrapped difference keeps the event watchable across 0/2π
        assert!((wrap_pi(0.1 - 0.0) - 0.1).abs() < 1e-12);
        assert!(wrap_pi(2.0 * PI - 0.1) < 0.0);
    }
}
