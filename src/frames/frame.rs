/*
 * Orrery Astrodynamics Core
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Reference frames: an orientation paired with a center, and the process
//! registry of named frames, both built-in and created on the fly.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, RwLock};

use log::warn;

use crate::config::Config;
use crate::errors::{FrameError, UnknownFrameSnafu};
use crate::frames::center::{self, Center, Offset};
use crate::frames::local::LocalFrame;
use crate::frames::orient::{self, Orientation};
use crate::orbits::forms::Form;
use crate::orbits::StateVector;
use crate::propagators::StateSource;
use crate::time::Date;

/// A reference frame, made of an orientation (rotation part) and a center
/// (translation part).
///
/// Two frames are equal iff both components are equal.
#[derive(Clone)]
pub struct Frame {
    name: Arc<str>,
    orientation: Orientation,
    center: Center,
    /// Set for the relative-motion frames of rendezvous propagators.
    hill: Option<LocalFrame>,
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Frame '{}'>", self.name)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl PartialEq for Frame {
    fn eq(&self, other: &Self) -> bool {
        self.orientation == other.orientation
            && self.center == other.center
            && self.hill == other.hill
    }
}

fn registry() -> &'static RwLock<HashMap<String, Frame>> {
    static REGISTRY: OnceLock<RwLock<HashMap<String, Frame>>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut frames = HashMap::new();
        let mut builtin = |name: &str, orientation: Orientation| {
            frames.insert(
                name.to_owned(),
                Frame {
                    name: name.into(),
                    orientation,
                    center: center::EARTH,
                    hill: None,
                },
            );
        };

        builtin("EME2000", orient::EME2000);
        builtin("MOD", orient::MOD);
        builtin("TOD", orient::TOD);
        builtin("TEME", orient::TEME);
        builtin("PEF", orient::PEF);
        builtin("ITRF", orient::ITRF);
        // Equivalent to ITRF, with an error below the centimeter
        builtin("WGS84", orient::ITRF);
        builtin("TIRF", orient::TIRF);
        builtin("CIRF", orient::CIRF);
        builtin("GCRF", orient::GCRF);
        builtin("G50", orient::G50);

        RwLock::new(frames)
    })
}

/// Frame factory, by name.
///
/// When the name is unknown and `env.jpl.dynamic_frames` is set, the JPL
/// kernels are loaded and their frames created before retrying.
pub fn get_frame(name: &str) -> Result<Frame, FrameError> {
    if let Some(frame) = registry().read().unwrap().get(name) {
        return Ok(frame.clone());
    }

    if Config::get().jpl.dynamic_frames {
        if let Err(e) = crate::env::jpl::create_frames() {
            warn!("dynamic frame creation failed: {e}");
            return UnknownFrameSnafu { name }.fail();
        }
        if let Some(frame) = registry().read().unwrap().get(name) {
            return Ok(frame.clone());
        }
    }

    UnknownFrameSnafu { name }.fail()
}

/// Registers a frame under its name. An already-taken name is overwritten
/// with a warning.
pub fn register_frame(frame: Frame) {
    let mut frames = registry().write().unwrap();
    if frames.contains_key(frame.name.as_ref()) {
        warn!(
            "A frame with the name '{}' is already registered. Overriding",
            frame.name
        );
    }
    frames.insert(frame.name.to_string(), frame);
}

impl Frame {
    /// Builds and registers a frame from its two components.
    pub fn new(name: &str, orientation: Orientation, center: Center) -> Self {
        let frame = Frame {
            name: name.into(),
            orientation,
            center,
            hill: None,
        };
        register_frame(frame.clone());
        frame
    }

    /// The relative-motion frame required by the rendezvous propagators,
    /// oriented QSW, TNW or LVLH around the target spacecraft.
    pub fn hill(orientation: LocalFrame) -> Self {
        Frame {
            name: format!("Hill-{}", orientation.name()).into(),
            orientation: orient::EME2000,
            center: center::EARTH,
            hill: Some(orientation),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn center(&self) -> Center {
        self.center
    }

    pub fn is_hill(&self) -> bool {
        self.hill.is_some()
    }

    pub fn hill_orientation(&self) -> Option<LocalFrame> {
        self.hill
    }

    /// Produces the same state expressed in `target`, at the same instant:
    /// the orientation path provides the rotation, the center path the
    /// translation, and the original form is restored on the result.
    pub fn transform(&self, state: &StateVector, target: &Frame) -> Result<StateVector, FrameError> {
        // The relative-motion frames are not tied to the graphs: only the
        // rendezvous propagators know how to move in and out of them
        if self.is_hill() || target.is_hill() {
            return crate::errors::HillTransformSnafu {
                name: if self.is_hill() {
                    self.name()
                } else {
                    target.name()
                },
            }
            .fail();
        }

        let original_form = state.form();
        let mut new_state = state
            .clone()
            .with_form(Form::Cartesian)
            .map_err(|source| FrameError::FrameForm {
                source: Box::new(source),
            })?;

        let date = state.date();
        let offset = self.center.convert_to(&date, target.center, target.orientation)?;
        let m = self.orientation.convert_to(&date, target.orientation)?;

        new_state.set_coord(m * new_state.coord() + offset);
        new_state.force_frame(target.clone());
        new_state
            .set_form(original_form)
            .map_err(|source| FrameError::FrameForm {
                source: Box::new(source),
            })?;
        Ok(new_state)
    }
}

/// How the offset of an orbit-attached frame is produced.
pub enum FrameOffset {
    /// Frozen state: the frame stays where the state is.
    Fixed(StateVector),
    /// Propagatable source (orbit or ephemeris) with the frame its states
    /// are expressed in.
    Moving(Arc<dyn StateSource>, Frame),
}

/// Creates a frame that follows an orbit.
///
/// With `orientation` unset, the new frame keeps the orientation of the
/// reference frame of the orbit and moves along with it. With QSW or TNW
/// (LVLH and RSW being aliases of QSW), a local-orbital orientation is
/// attached to `parent`.
pub fn orbit_to_frame(
    name: &str,
    offset: FrameOffset,
    orientation: Option<LocalFrame>,
    parent: &Frame,
) -> Result<Frame, FrameError> {
    let (source, ref_frame): (Arc<dyn StateSource>, Frame) = match offset {
        FrameOffset::Fixed(state) => {
            let frame = state.frame().clone();
            (Arc::new(state), frame)
        }
        FrameOffset::Moving(source, frame) => (source, frame),
    };

    let orient_node = match orientation {
        None => ref_frame.orientation(),
        Some(lof) => Orientation::local_orbital(name, source.clone(), lof, parent),
    };

    let center = Center::attach(
        name,
        ref_frame.center(),
        ref_frame.orientation(),
        Offset::Moving(source),
        ref_frame.center().body(),
    );

    Ok(Frame::new(name, orient_node, center))
}

impl StateSource for StateVector {
    /// A bare state used as a source yields itself, whatever the date: it
    /// describes a fixed point of its frame.
    fn state_at(&self, _date: &Date) -> Result<StateVector, crate::errors::PropagationError> {
        Ok(self.clone())
    }
}
