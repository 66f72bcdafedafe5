/*
 * Orrery Astrodynamics Core
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Multi-scale dates, Earth Orientation Parameters and scale conversions.

pub mod date;
pub mod eop;
pub mod scales;

pub use date::{Date, DateRange, RangeEnd, TimeDelta};
pub use eop::{Eop, EopDb, EopSource};
pub use scales::TimeScale;
