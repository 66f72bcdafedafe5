/*
 * Orrery Astrodynamics Core
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Environment models: Solar System body positions, analytical or from JPL
//! kernels.

pub mod jpl;
pub mod solarsystem;
