/*
 * Orrery Astrodynamics Core
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Maneuver descriptions usable by the propagators.

use log::debug;
use snafu::prelude::*;

use crate::errors::{FormError, ManeuverShapeSnafu, PhysicsError};
use crate::frames::local::{to_local, to_tnw, LocalFrame};
use crate::math::{Matrix3, Vector3};
use crate::orbits::forms::Form;
use crate::orbits::statevector::StateVector;
use crate::time::{Date, TimeDelta};

/// Frame a maneuver vector is expressed in: a local orbital frame, or the
/// frame of the orbit itself when unset.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ManFrame {
    #[default]
    Parent,
    Qsw,
    Tnw,
}

impl ManFrame {
    /// Rotation of a maneuver vector into the frame of `pv` (cartesian).
    fn rotation(&self, pv: &StateVector) -> Matrix3 {
        match self {
            Self::Parent => Matrix3::identity(),
            Self::Qsw => to_local(LocalFrame::Qsw, pv.coord()).transpose(),
            Self::Tnw => to_local(LocalFrame::Tnw, pv.coord()).transpose(),
        }
    }
}

/// Where the date argument of a continuous maneuver sits in its span.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum DatePos {
    #[default]
    Start,
    Median,
    Stop,
}

/// An instantaneous velocity increment.
#[derive(Clone, Debug)]
pub struct ImpulsiveMan {
    pub date: Date,
    dv: Vector3,
    pub frame: ManFrame,
    pub comment: Option<String>,
}

impl ImpulsiveMan {
    pub fn new(date: Date, dv: &[f64], frame: ManFrame, comment: Option<&str>) -> Result<Self, PhysicsError> {
        ensure!(dv.len() == 3, ManeuverShapeSnafu { len: dv.len() });
        Ok(Self {
            date,
            dv: Vector3::from_row_slice(dv),
            frame,
            comment: comment.map(str::to_owned),
        })
    }

    /// Whether the maneuver date falls within the step starting at `date`.
    pub fn check(&self, date: &Date, step: TimeDelta) -> bool {
        match date.shift(step) {
            Ok(end) => *date < self.date && self.date <= end,
            Err(_) => false,
        }
    }

    /// Velocity increment rotated into the frame of the orbit.
    pub fn dv(&self, orb: &StateVector) -> Result<Vector3, FormError> {
        let orb = orb.clone().with_form(Form::Cartesian)?;
        Ok(self.frame.rotation(&orb) * self.dv)
    }

    pub fn raw_dv(&self) -> &Vector3 {
        &self.dv
    }
}

/// A constant acceleration applied across a time span.
#[derive(Clone, Debug)]
pub struct ContinuousMan {
    pub start: Date,
    pub stop: Date,
    pub duration: TimeDelta,
    accel: Vector3,
    dv: Vector3,
    pub frame: ManFrame,
    pub comment: Option<String>,
}

impl ContinuousMan {
    /// Builds from a constant acceleration vector (m/s²).
    pub fn with_accel(
        date: Date,
        duration: TimeDelta,
        accel: &[f64],
        date_pos: DatePos,
        frame: ManFrame,
        comment: Option<&str>,
    ) -> Result<Self, PhysicsError> {
        ensure!(accel.len() == 3, ManeuverShapeSnafu { len: accel.len() });
        let accel = Vector3::from_row_slice(accel);
        let dv = accel * duration.total_seconds();
        Self::build(date, duration, accel, dv, date_pos, frame, comment)
    }

    /// Builds from a total velocity increment (m/s) spread across the
    /// duration.
    pub fn with_dv(
        date: Date,
        duration: TimeDelta,
        dv: &[f64],
        date_pos: DatePos,
        frame: ManFrame,
        comment: Option<&str>,
    ) -> Result<Self, PhysicsError> {
        ensure!(dv.len() == 3, ManeuverShapeSnafu { len: dv.len() });
        let dv = Vector3::from_row_slice(dv);
        let accel = dv / duration.total_seconds();
        Self::build(date, duration, accel, dv, date_pos, frame, comment)
    }

    fn build(
        date: Date,
        duration: TimeDelta,
        accel: Vector3,
        dv: Vector3,
        date_pos: DatePos,
        frame: ManFrame,
        comment: Option<&str>,
    ) -> Result<Self, PhysicsError> {
        let start = match date_pos {
            DatePos::Start => Ok(date),
            DatePos::Median => date.shift(-duration * 0.5),
            DatePos::Stop => date.shift(-duration),
        }
        .map_err(|_| PhysicsError::InfiniteValue {
            action: "placing a continuous maneuver in time",
        })?;
        let stop = start
            .shift(duration)
            .map_err(|_| PhysicsError::InfiniteValue {
                action: "placing a continuous maneuver in time",
            })?;

        debug!("Man [{start}; {stop}[");
        Ok(Self {
            start,
            stop,
            duration,
            accel,
            dv,
            frame,
            comment: comment.map(str::to_owned),
        })
    }

    /// Whether a date falls in the thrust span `[start, stop)`.
    pub fn check(&self, date: &Date) -> bool {
        self.start <= *date && *date < self.stop
    }

    /// Acceleration rotated into the frame of the orbit.
    pub fn accel(&self, orb: &StateVector) -> Result<Vector3, FormError> {
        let orb = orb.clone().with_form(Form::Cartesian)?;
        Ok(self.frame.rotation(&orb) * self.accel)
    }

    pub fn total_dv(&self) -> &Vector3 {
        &self.dv
    }
}

/// Either kind of maneuver.
#[derive(Clone, Debug)]
pub enum Maneuver {
    Impulsive(ImpulsiveMan),
    Continuous(ContinuousMan),
}

/// Ideal argument of latitude for a correction of inclination and/or right
/// ascension of ascending node.
pub fn dkep2aol(inc: f64, di: f64, draan: f64) -> f64 {
    (draan * inc.sin()).atan2(di)
}

/// Converts an increment of keplerian elements to a delta-v in TNW, via the
/// velocity triangle at the maneuver point (Al-Kashi).
///
/// `da` in meters, `di` and `draan` in radians.
pub fn dkep2dv(orb: &StateVector, da: f64, di: f64, draan: f64) -> Result<Vector3, FormError> {
    let body = orb
        .frame()
        .center()
        .body()
        .unwrap_or_else(crate::bodies::Body::earth);
    let mu = body.mu();

    let kep = orb.clone().with_form(Form::Keplerian)?;
    let a = kep.get("a")?;
    let i = kep.get("i")?;

    let cart = orb.clone().with_form(Form::Cartesian)?;
    let v = cart.coord().fixed_rows::<3>(3).norm();

    let dv_a = mu * da / (2.0 * v * a.powi(2));
    let dangle = (di.powi(2) + draan.powi(2) * i.sin().powi(2)).sqrt();

    let v_final = v + dv_a;

    // Al-Kashi on the velocity triangle
    let dv = (v.powi(2) + v_final.powi(2) - 2.0 * v * v_final * dangle.cos()).sqrt();
    let dv_t = v_final * dangle.cos() - v;

    let ratio = (dv_t / dv).abs();

    // Floating point rounding can nudge the ratio above one
    let dv_w = if ratio >= 1.0 - 1e-12 {
        0.0
    } else {
        dv * (1.0 - ratio.powi(2)).sqrt()
    };

    Ok(Vector3::new(dv_t, 0.0, dv_w))
}

/// Impulsive maneuver directly modifying keplerian elements.
///
/// For maximum efficiency, `da` should be applied at an apsis, `di` at a
/// node, and `draan` at argument of latitude ±90°.
#[derive(Clone, Debug)]
pub struct KeplerianImpulsiveMan {
    pub date: Date,
    pub da: f64,
    pub di: f64,
    pub draan: f64,
    pub comment: Option<String>,
}

impl KeplerianImpulsiveMan {
    pub fn new(date: Date, da: f64, di: f64, draan: f64) -> Self {
        Self {
            date,
            da,
            di,
            draan,
            comment: None,
        }
    }

    /// The equivalent inertial-frame velocity increment at the given state.
    pub fn dv(&self, orb: &StateVector) -> Result<Vector3, FormError> {
        let dv_tnw = dkep2dv(orb, self.da, self.di, self.draan)?;
        let cart = orb.clone().with_form(Form::Cartesian)?;
        Ok(to_tnw(cart.coord()).transpose() * dv_tnw)
    }

    /// The plain impulsive maneuver this resolves to at the given state.
    pub fn resolve(&self, orb: &StateVector) -> Result<ImpulsiveMan, FormError> {
        let dv = self.dv(orb)?;
        Ok(ImpulsiveMan {
            date: self.date,
            dv,
            frame: ManFrame::Parent,
            comment: self.comment.clone(),
        })
    }
}
