/*
 * Orrery Astrodynamics Core
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Frame-change rotation matrices.
//!
//! These are the transposes of the classical vector rotations: applying the
//! matrix to a vector yields the vector's representation in the rotated
//! coordinate system.

use super::{Matrix3, Matrix6, Vector3};

/// Rotation of angle `theta` (radians) around the X axis.
pub fn rot1(theta: f64) -> Matrix3 {
    let (s, c) = theta.sin_cos();
    Matrix3::new(1.0, 0.0, 0.0, 0.0, c, s, 0.0, -s, c)
}

/// Rotation of angle `theta` (radians) around the Y axis.
pub fn rot2(theta: f64) -> Matrix3 {
    let (s, c) = theta.sin_cos();
    Matrix3::new(c, 0.0, -s, 0.0, 1.0, 0.0, s, 0.0, c)
}

/// Rotation of angle `theta` (radians) around the Z axis.
pub fn rot3(theta: f64) -> Matrix3 {
    let (s, c) = theta.sin_cos();
    Matrix3::new(c, s, 0.0, -s, c, 0.0, 0.0, 0.0, 1.0)
}

/// Expands a 3x3 rotation into the 6x6 matrix acting on a position+velocity
/// 6-vector.
///
/// When `rate` is provided (the angular velocity of the destination frame
/// expressed in the source frame), the velocity block accounts for the
/// transport theorem: `v' = m (v - ω × r)`.
pub fn expand(m: &Matrix3, rate: Option<&Vector3>) -> Matrix6 {
    let mut out = Matrix6::zeros();
    out.fixed_view_mut::<3, 3>(0, 0).copy_from(m);
    out.fixed_view_mut::<3, 3>(3, 3).copy_from(m);

    if let Some(w) = rate {
        let skew = Matrix3::new(0.0, -w[2], w[1], w[2], 0.0, -w[0], -w[1], w[0], 0.0);
        out.fixed_view_mut::<3, 3>(3, 0).copy_from(&(-m * skew));
    }

    out
}

#[cfg(test)]
mod ut_rotation {
    use super::*;
    use core::f64::consts::FRAC_PI_2;
    use core::f64::EPSILON;

    #[test]
    fn test_rot1() {
        let r1 = rot1(FRAC_PI_2);
        assert_eq!(r1 * Vector3::x(), Vector3::x());
        assert!((r1 * Vector3::z() - Vector3::y()).norm() < EPSILON);
        assert!((r1 * Vector3::y() + Vector3::z()).norm() < EPSILON);
    }

    #[test]
    fn test_rot3() {
        let r3 = rot3(FRAC_PI_2);
        assert_eq!(r3 * Vector3::z(), Vector3::z());
        assert!((r3 * Vector3::x() + Vector3::y()).norm() < EPSILON);
        assert!((r3 * Vector3::y() - Vector3::x()).norm() < EPSILON);
    }

    #[test]
    fn test_expand() {
        let m = Matrix3::new(0.0, -1.0, 0.0, -1.0, 0.0, 0.0, 0.0, 0.0, 1.0);
        let out = expand(&m, None);
        assert_eq!(out[(0, 1)], -1.0);
        assert_eq!(out[(3, 4)], -1.0);
        assert_eq!(out[(3, 0)], 0.0);

        let rate = Vector3::new(1.0, 2.0, 3.0);
        let out = expand(&m, Some(&rate));
        // -m * skew(rate), first column
        assert_eq!(out[(3, 0)], 3.0);
        assert_eq!(out[(4, 0)], 0.0);
        assert_eq!(out[(5, 0)], 2.0);
    }
}
