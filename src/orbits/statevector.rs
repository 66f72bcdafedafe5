/*
 * Orrery Astrodynamics Core
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! The state vector: 6 components, a date, a frame and a form, plus the
//! optional covariance and maneuvers that ride along.

use std::fmt;

use snafu::prelude::*;

use crate::errors::{
    FormError, FrameError, OrreryError, PhysicsError, StateShapeSnafu, UnknownComponentSnafu,
};
use crate::frames::frame::Frame;
use crate::math::Vector6;
use crate::orbits::cov::{CovFrame, Covariance};
use crate::orbits::forms::{self, Form};
use crate::orbits::man::Maneuver;
use crate::propagators::listeners::Event;
use crate::time::Date;

/// Complements carried by a state parsed from a TLE, needed to initialize
/// SGP4 and to serialize the state back.
#[derive(Clone, Copy, Debug)]
pub struct TleComplements {
    pub bstar: f64,
    pub ndot: f64,
    pub ndotdot: f64,
    pub element_nb: u32,
    pub revolutions: u32,
    pub classification: char,
    pub ephemeris_type: u8,
}

impl Default for TleComplements {
    fn default() -> Self {
        Self {
            bstar: 0.0,
            ndot: 0.0,
            ndotdot: 0.0,
            element_nb: 0,
            revolutions: 0,
            classification: 'U',
            ephemeris_type: 0,
        }
    }
}

/// Free identifiers attached to a state, only consumed by serializers.
#[derive(Clone, Debug, Default)]
pub struct Metadata {
    pub name: Option<String>,
    pub cospar_id: Option<String>,
    pub norad_id: Option<u32>,
    pub tle: Option<TleComplements>,
}

/// Coordinate representation of an object at a date.
#[derive(Clone, Debug)]
pub struct StateVector {
    coord: Vector6,
    date: Date,
    form: Form,
    frame: Frame,
    cov: Option<Covariance>,
    maneuvers: Vec<Maneuver>,
    event: Option<Event>,
    pub metadata: Metadata,
}

impl StateVector {
    pub fn new(coord: Vector6, date: Date, form: Form, frame: Frame) -> Self {
        Self {
            coord,
            date,
            form,
            frame,
            cov: None,
            maneuvers: Vec::new(),
            event: None,
            metadata: Metadata::default(),
        }
    }

    /// Same as [`new`](Self::new) from a slice, which must be 6 in length.
    pub fn from_slice(
        coord: &[f64],
        date: Date,
        form: Form,
        frame: Frame,
    ) -> Result<Self, PhysicsError> {
        ensure!(coord.len() == 6, StateShapeSnafu { len: coord.len() });
        Ok(Self::new(
            Vector6::from_row_slice(coord),
            date,
            form,
            frame,
        ))
    }

    pub fn coord(&self) -> &Vector6 {
        &self.coord
    }

    pub fn set_coord(&mut self, coord: Vector6) {
        self.coord = coord;
    }

    pub fn date(&self) -> Date {
        self.date
    }

    pub fn set_date(&mut self, date: Date) {
        self.date = date;
    }

    pub fn form(&self) -> Form {
        self.form
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Component read by name, following the current form's name table.
    ///
    /// Asking for a name that belongs to another form is an error.
    pub fn get(&self, name: &str) -> Result<f64, FormError> {
        let names = self.form.param_names();
        let i = names
            .iter()
            .position(|&n| n == name)
            .context(UnknownComponentSnafu {
                name,
                form: self.form.name(),
            })?;
        Ok(self.coord[i])
    }

    /// Component written by name, following the current form's name table.
    pub fn set(&mut self, name: &str, value: f64) -> Result<(), FormError> {
        let names = self.form.param_names();
        let i = names
            .iter()
            .position(|&n| n == name)
            .context(UnknownComponentSnafu {
                name,
                form: self.form.name(),
            })?;
        self.coord[i] = value;
        Ok(())
    }

    /// Converts the components in place to another form, through the form
    /// graph.
    pub fn set_form(&mut self, form: Form) -> Result<(), FormError> {
        if form != self.form {
            let body = self
                .frame
                .center()
                .body()
                .unwrap_or_else(crate::bodies::Body::earth);
            self.coord = forms::convert(&self.coord, self.form, form, &body)?;
            self.form = form;
        }
        Ok(())
    }

    pub fn with_form(mut self, form: Form) -> Result<Self, FormError> {
        self.set_form(form)?;
        Ok(self)
    }

    /// Moves the state to another frame: the components switch to
    /// cartesian, go through the frame transformation, and the original
    /// form is restored. A covariance tagged in the old frame follows.
    pub fn set_frame(&mut self, frame: &Frame) -> Result<(), FrameError> {
        if frame == &self.frame {
            return Ok(());
        }

        let old_frame = self.frame.clone();
        let follows = self
            .cov
            .as_ref()
            .map(|c| *c.frame() == CovFrame::Frame(old_frame.clone()))
            .unwrap_or(false);
        // Owner snapshot for covariance retagging, taken before the move
        let owner = if follows { Some(self.clone()) } else { None };

        let transformed = old_frame.transform(self, frame)?;
        self.coord = transformed.coord;
        self.frame = transformed.frame;

        if let Some(owner) = owner {
            if let Some(cov) = self.cov.take() {
                self.cov = Some(cov.with_frame(&owner, CovFrame::Frame(frame.clone()))?);
            }
        }
        Ok(())
    }

    pub fn with_frame(mut self, frame: &Frame) -> Result<Self, FrameError> {
        self.set_frame(frame)?;
        Ok(self)
    }

    /// A copy in the same frame and form as another state.
    pub fn with_same(self, other: &StateVector) -> Result<Self, OrreryError> {
        let out = self.with_frame(other.frame())?.with_form(other.form())?;
        Ok(out)
    }

    pub fn cov(&self) -> Option<&Covariance> {
        self.cov.as_ref()
    }

    /// Attaches a covariance; tagged in the state's frame when untagged.
    pub fn set_cov(&mut self, cov: Covariance) {
        self.cov = Some(cov);
    }

    pub fn clear_cov(&mut self) {
        self.cov = None;
    }

    /// Retags the covariance into another frame (possibly a local QSW/TNW
    /// one), converting the matrix with this state as owner.
    pub fn set_cov_frame(&mut self, target: CovFrame) -> Result<(), FrameError> {
        if let Some(cov) = self.cov.take() {
            let owner = self.clone();
            self.cov = Some(cov.with_frame(&owner, target)?);
        }
        Ok(())
    }

    pub fn maneuvers(&self) -> &[Maneuver] {
        &self.maneuvers
    }

    pub fn add_maneuver(&mut self, man: Maneuver) {
        self.maneuvers.push(man);
    }

    pub fn set_maneuvers(&mut self, mans: Vec<Maneuver>) {
        self.maneuvers = mans;
    }

    pub fn event(&self) -> Option<&Event> {
        self.event.as_ref()
    }

    pub fn set_event(&mut self, event: Option<Event>) {
        self.event = event;
    }

    /// Sets the frame field without transforming the coordinates. Only for
    /// the frame transformation itself.
    pub(crate) fn force_frame(&mut self, frame: Frame) {
        self.frame = frame;
    }

    /// Sets the form tag without converting the coordinates. Only for
    /// propagators that compute their output directly in a known form.
    pub(crate) fn force_form(&mut self, form: Form) {
        self.form = form;
    }
}

impl fmt::Display for StateVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "StateVector =")?;
        writeln!(f, "  date = {}", self.date)?;
        writeln!(f, "  form = {}", self.form)?;
        writeln!(f, "  frame = {}", self.frame)?;
        writeln!(f, "  coord =")?;
        for (name, value) in self.form.param_names().iter().zip(self.coord.iter()) {
            writeln!(f, "    {name} = {value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod ut_statevector {
    use super::*;
    use crate::frames::get_frame;
    use crate::time::TimeScale;

    fn state() -> StateVector {
        let date = Date::from_mjd(58000.0, TimeScale::Utc).unwrap();
        StateVector::new(
            Vector6::new(7000e3, 0.01, 0.9, 1.0, 2.0, 3.0),
            date,
            Form::Keplerian,
            get_frame("EME2000").unwrap(),
        )
    }

    #[test]
    fn test_component_access() {
        let mut sv = state();
        assert_eq!(sv.get("a").unwrap(), 7000e3);
        assert_eq!(sv.get("nu").unwrap(), 3.0);
        // 'x' belongs to the cartesian form
        assert!(matches!(
            sv.get("x"),
            Err(FormError::UnknownComponent { .. })
        ));

        sv.set("e", 0.02).unwrap();
        assert_eq!(sv.get("e").unwrap(), 0.02);
        assert!(sv.set("vx", 0.0).is_err());
    }

    #[test]
    fn test_form_change_in_place() {
        let mut sv = state();
        let original = *sv.coord();
        sv.set_form(Form::Cartesian).unwrap();
        assert_eq!(sv.form(), Form::Cartesian);
        assert!(sv.get("x").is_ok());
        sv.set_form(Form::Keplerian).unwrap();
        assert!((sv.coord() - original).norm() < 1e-6);
    }

    #[test]
    fn test_shape_error() {
        let date = Date::from_mjd(58000.0, TimeScale::Utc).unwrap();
        let res = StateVector::from_slice(
            &[1.0, 2.0, 3.0],
            date,
            Form::Cartesian,
            get_frame("EME2000").unwrap(),
        );
        assert!(matches!(res, Err(PhysicsError::StateShape { len: 3 })));
    }
}
