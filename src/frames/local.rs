/*
 * Orrery Astrodynamics Core
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Local orbital reference frames.

use snafu::prelude::*;

use crate::errors::{FrameError, UnknownLocalFrameSnafu};
use crate::math::{Matrix3, Vector3, Vector6};

/// Orientation choice for a local orbital frame.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LocalFrame {
    /// x along the position vector, z along the angular momentum.
    ///
    /// Also known as RSW (R for radial) or LVLH in its rotated variant.
    Qsw,
    /// x along the velocity vector, z along the angular momentum.
    Tnw,
    /// x along-track, z toward the center of the body.
    Lvlh,
}

impl LocalFrame {
    pub fn from_name(name: &str) -> Result<Self, FrameError> {
        match name.to_uppercase().as_str() {
            "QSW" | "RSW" | "LVLH" => Ok(Self::Qsw),
            "TNW" => Ok(Self::Tnw),
            _ => UnknownLocalFrameSnafu { name }.fail(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Qsw => "QSW",
            Self::Tnw => "TNW",
            Self::Lvlh => "LVLH",
        }
    }
}

/// Rotation from QSW to TNW, valid for a circular orbit.
pub fn qsw_to_tnw() -> Matrix3 {
    Matrix3::new(0.0, 1.0, 0.0, -1.0, 0.0, 0.0, 0.0, 0.0, 1.0)
}

/// Rotation from QSW to LVLH (x along-track, z toward the center).
pub fn qsw_to_lvlh() -> Matrix3 {
    Matrix3::new(0.0, 1.0, 0.0, 0.0, 0.0, -1.0, -1.0, 0.0, 0.0)
}

fn split(pv: &Vector6) -> (Vector3, Vector3) {
    (pv.fixed_rows::<3>(0).into(), pv.fixed_rows::<3>(3).into())
}

/// Matrix converting a vector from the inertial frame to TNW.
pub fn to_tnw(pv: &Vector6) -> Matrix3 {
    let (pos, vel) = split(pv);
    let t = vel / vel.norm();
    let mut w = pos.cross(&vel);
    w /= w.norm();
    let n = w.cross(&t);
    Matrix3::from_rows(&[t.transpose(), n.transpose(), w.transpose()])
}

/// Matrix converting a vector from the inertial frame to QSW.
pub fn to_qsw(pv: &Vector6) -> Matrix3 {
    let (pos, vel) = split(pv);
    let q = pos / pos.norm();
    let mut w = pos.cross(&vel);
    w /= w.norm();
    let s = w.cross(&q);
    Matrix3::from_rows(&[q.transpose(), s.transpose(), w.transpose()])
}

/// Matrix converting a vector from the inertial frame to the chosen local
/// orbital frame.
pub fn to_local(frame: LocalFrame, pv: &Vector6) -> Matrix3 {
    match frame {
        LocalFrame::Qsw => to_qsw(pv),
        LocalFrame::Tnw => to_tnw(pv),
        LocalFrame::Lvlh => qsw_to_lvlh() * to_qsw(pv),
    }
}
