/*
 * Orrery Astrodynamics Core
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

extern crate log;
extern crate nalgebra;
extern crate snafu;

pub mod bodies;
pub mod config;
pub mod constants;
pub mod env;
pub mod errors;
pub mod frames;
pub mod graph;
pub mod io;
pub mod math;
pub mod orbits;
pub mod propagators;
pub mod time;

pub mod prelude {
    pub use crate::bodies::Body;
    pub use crate::config::Config;
    pub use crate::errors::OrreryError;
    pub use crate::frames::{get_frame, Frame};
    pub use crate::orbits::forms::Form;
    pub use crate::orbits::{Ephem, MeanOrbit, Orbit, StateVector};
    pub use crate::propagators::Propagator;
    pub use crate::time::{Date, TimeDelta, TimeScale};
    pub use std::fs::File;
}

/// Number of bytes in a double, for kernel record arithmetic.
pub(crate) const DBL_SIZE: usize = 8;

/// Maps a file into memory without copying it.
#[macro_export]
macro_rules! file_mmap {
    ($filename:expr) => {
        match File::open($filename) {
            Err(e) => Err($crate::errors::KernelError::Io { kind: e.kind() }),
            Ok(file) => unsafe {
                use memmap2::MmapOptions;
                match MmapOptions::new().map(&file) {
                    Err(_) => Err($crate::errors::KernelError::IoUnknown),
                    Ok(mmap) => Ok(mmap),
                }
            },
        }
    };
}
