/*
 * Orrery Astrodynamics Core
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Orbit descriptions: state vectors, forms, covariances, maneuvers and
//! ephemerides.

pub mod cov;
pub mod ephem;
pub mod forms;
pub mod man;
pub mod orbit;
pub mod statevector;

pub use cov::{CovFrame, Covariance};
pub use ephem::Ephem;
pub use man::{ContinuousMan, ImpulsiveMan, KeplerianImpulsiveMan, ManFrame, Maneuver};
pub use orbit::{MeanOrbit, Orbit, OrbitInfos};
pub use statevector::{Metadata, StateVector, TleComplements};
