/*
 * Orrery Astrodynamics Core
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Reference frames centred on Lagrange points.

use std::sync::Arc;

use crate::bodies::Body;
use crate::errors::{PropagationError, PropFrameSnafu, PropFormSnafu, UnknownBodySnafu};
use crate::frames::center::{Center, Offset};
use crate::frames::frame::Frame;
use crate::frames::local::LocalFrame;
use crate::frames::orient::Orientation;
use crate::math::Vector6;
use crate::orbits::forms::Form;
use crate::orbits::StateVector;
use crate::propagators::StateSource;
use crate::time::Date;
use snafu::prelude::*;

/// Which Lagrange point of the body pair.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LagrangePoint {
    L1,
    L2,
    L3,
    L4,
    L5,
}

impl LagrangePoint {
    fn index(&self) -> u8 {
        match self {
            Self::L1 => 1,
            Self::L2 => 2,
            Self::L3 => 3,
            Self::L4 => 4,
            Self::L5 => 5,
        }
    }
}

/// Offset of the Li point relative to body2, expressed in QSW of body2
/// around body1.
pub struct LagrangeOffset {
    frame1: Frame,
    body2: Body,
    point: LagrangePoint,
}

impl LagrangeOffset {
    fn offset_at(&self, date: &Date) -> Result<Vector6, PropagationError> {
        let orb = self
            .body2
            .propagate(date)?
            .with_frame(&self.frame1)
            .context(PropFrameSnafu)?
            .with_form(Form::Cartesian)
            .context(PropFormSnafu)?;

        let r = orb.coord().fixed_rows::<3>(0).norm();
        let m1 = self
            .frame1
            .center()
            .body()
            .context(UnknownBodySnafu {
                name: self.frame1.name(),
            })?
            .mass;
        let m2 = self.body2.mass;

        let mut offset = Vector6::zeros();
        match self.point.index() {
            1 | 2 => {
                offset[0] = r * (m2 / (3.0 * m1)).cbrt();
                if self.point == LagrangePoint::L1 {
                    offset[0] = -offset[0];
                }
            }
            3 => {
                offset[0] = r * (5.0 * m2 / (12.0 * m1) - 2.0);
            }
            _ => {
                offset[0] = -r / 2.0;
                offset[1] = r * 3.0_f64.sqrt() / 2.0;
                if self.point == LagrangePoint::L5 {
                    offset[1] = -offset[1];
                }
            }
        }
        Ok(offset)
    }
}

impl StateSource for LagrangeOffset {
    fn state_at(&self, date: &Date) -> Result<StateVector, PropagationError> {
        let offset = self.offset_at(date)?;
        // The offset is expressed in the synodic (QSW) orientation created
        // alongside; the frame tag is only carried for the date and center.
        Ok(StateVector::new(
            offset,
            *date,
            Form::Cartesian,
            self.frame1.clone(),
        ))
    }
}

/// Synodic orientation: QSW of body2 in its motion around body1.
struct SynodicSource {
    frame1: Frame,
    body2: Body,
}

impl StateSource for SynodicSource {
    fn state_at(&self, date: &Date) -> Result<StateVector, PropagationError> {
        self.body2
            .propagate(date)?
            .with_frame(&self.frame1)
            .context(PropFrameSnafu)?
            .with_form(Form::Cartesian)
            .context(PropFormSnafu)
    }
}

/// Creates a reference frame centred on a Lagrange point of the
/// frame1/frame2 body pair (frame1 carrying the most massive body).
///
/// The created frame is synodic: oriented in QSW relative to body2, unless
/// another orientation is provided.
pub fn lagrange(
    frame1: &Frame,
    frame2: &Frame,
    point: LagrangePoint,
    name: Option<&str>,
    orientation: Option<Orientation>,
) -> Result<Frame, PropagationError> {
    let body1_name = frame1
        .center()
        .body()
        .context(UnknownBodySnafu {
            name: frame1.name(),
        })?
        .name
        .clone();
    let body2 = frame2.center().body().context(UnknownBodySnafu {
        name: frame2.name(),
    })?;

    let c_name = format!("{}{}L{}", body1_name, body2.name, point.index());
    let name = name.unwrap_or(&c_name);

    let synodic = Arc::new(SynodicSource {
        frame1: frame1.clone(),
        body2: body2.clone(),
    });
    let l_orient = Orientation::local_orbital(name, synodic, LocalFrame::Qsw, frame1);

    let l_offset = Arc::new(LagrangeOffset {
        frame1: frame1.clone(),
        body2,
        point,
    });
    let l_center = Center::attach(
        &c_name,
        frame2.center(),
        l_orient,
        Offset::Moving(l_offset),
        None,
    );

    Ok(Frame::new(name, orientation.unwrap_or(l_orient), l_center))
}
