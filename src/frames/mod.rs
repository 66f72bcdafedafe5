/*
 * Orrery Astrodynamics Core
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Reference frames and their relations to each other.

pub mod center;
pub mod frame;
pub mod iau1980;
pub mod iau2010;
pub mod lagrange;
pub mod local;
pub mod orient;
pub mod stations;

pub use center::{Center, Offset};
pub use frame::{get_frame, orbit_to_frame, register_frame, Frame, FrameOffset};
pub use lagrange::lagrange;
pub use local::LocalFrame;
pub use orient::Orientation;
pub use stations::{create_station, Station};
