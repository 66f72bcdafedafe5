/*
 * Orrery Astrodynamics Core
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Frame-aware covariance matrices.

use std::fmt;

use snafu::prelude::*;

use crate::errors::{FrameError, NotSymmetricSnafu, PhysicsError};
use crate::frames::frame::Frame;
use crate::frames::local::{to_local, LocalFrame};
use crate::math::rotation::expand;
use crate::math::{Matrix6, Vector6};
use crate::orbits::forms::Form;
use crate::orbits::statevector::StateVector;

/// Frame tag of a covariance: a regular frame, or one of the local orbital
/// frames built from the owning state.
#[derive(Clone, Debug, PartialEq)]
pub enum CovFrame {
    Frame(Frame),
    /// QSW local orbital frame (RSW and RTN are the same basis).
    Qsw,
    Tnw,
}

impl fmt::Display for CovFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Frame(frame) => frame.fmt(f),
            Self::Qsw => f.write_str("QSW"),
            Self::Tnw => f.write_str("TNW"),
        }
    }
}

/// 6x6 symmetric covariance of a state vector.
#[derive(Clone, Debug, PartialEq)]
pub struct Covariance {
    matrix: Matrix6,
    frame: CovFrame,
}

impl Covariance {
    /// Symmetry tolerance on `max|C - C^T|`, relative to the largest
    /// diagonal term.
    const SYM_TOL: f64 = 1e-9;

    /// Validates and builds a covariance tagged in the given frame.
    pub fn new(matrix: Matrix6, frame: CovFrame) -> Result<Self, PhysicsError> {
        let delta = (matrix - matrix.transpose()).abs().max();
        let scale = matrix.diagonal().abs().max().max(1.0);
        ensure!(delta <= Self::SYM_TOL * scale, NotSymmetricSnafu { delta });
        Ok(Self { matrix, frame })
    }

    pub fn matrix(&self) -> &Matrix6 {
        &self.matrix
    }

    pub fn frame(&self) -> &CovFrame {
        &self.frame
    }

    /// The covariance expressed in another frame, converted with `owner`
    /// (the state this covariance belongs to) as the reference for local
    /// frames.
    ///
    /// The conversion is two-legged: from the current frame to the owner's
    /// frame, then from the owner's frame to the target, and applied as
    /// `M C M^T`.
    pub fn with_frame(
        self,
        owner: &StateVector,
        target: CovFrame,
    ) -> Result<Covariance, FrameError> {
        if target == self.frame {
            return Ok(self);
        }

        let owner_cart = owner
            .clone()
            .with_form(Form::Cartesian)
            .map_err(|source| FrameError::FrameForm {
                source: Box::new(source),
            })?;
        let pv: &Vector6 = owner_cart.coord();
        let date = owner.date();
        let owner_frame = owner.frame();

        let m1 = match &self.frame {
            CovFrame::Qsw => expand(&to_local(LocalFrame::Qsw, pv).transpose(), None),
            CovFrame::Tnw => expand(&to_local(LocalFrame::Tnw, pv).transpose(), None),
            CovFrame::Frame(frame) if frame != owner_frame => frame
                .orientation()
                .convert_to(&date, owner_frame.orientation())?,
            CovFrame::Frame(_) => Matrix6::identity(),
        };

        let m2 = match &target {
            CovFrame::Qsw => expand(&to_local(LocalFrame::Qsw, pv), None),
            CovFrame::Tnw => expand(&to_local(LocalFrame::Tnw, pv), None),
            CovFrame::Frame(frame) if frame != owner_frame => owner_frame
                .orientation()
                .convert_to(&date, frame.orientation())?,
            CovFrame::Frame(_) => Matrix6::identity(),
        };

        let m = m2 * m1;
        Ok(Covariance {
            matrix: m * self.matrix * m.transpose(),
            frame: target,
        })
    }
}

#[cfg(test)]
mod ut_cov {
    use super::*;

    #[test]
    fn test_symmetry_check() {
        let mut mat = Matrix6::identity();
        assert!(Covariance::new(mat, CovFrame::Qsw).is_ok());

        mat[(0, 1)] = 1e-3;
        assert!(matches!(
            Covariance::new(mat, CovFrame::Qsw),
            Err(PhysicsError::NotSymmetric { .. })
        ));

        mat[(1, 0)] = 1e-3;
        assert!(Covariance::new(mat, CovFrame::Qsw).is_ok());
    }
}
