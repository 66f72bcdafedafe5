/*
 * Orrery Astrodynamics Core
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Binary SPK (DAF) kernel reading, and the frames built from the segments.
//!
//! The kernels to load come from the `env.jpl.files` configuration entry.
//! Each SPK segment carries the motion of a target relative to a center;
//! `create_frames` turns that hierarchy into centers and frames of the
//! frame graph, so that any loaded body can serve as a frame for state
//! vectors. Chebyshev position (type 2) and position-velocity (type 3)
//! segments are supported.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::sync::{Arc, OnceLock, RwLock};

use log::warn;
use memmap2::Mmap;
use snafu::prelude::*;

use crate::bodies::Body;
use crate::config::Config;
use crate::constants::{DAY_S, J2000_JD};
use crate::errors::{
    BadEndiannessSnafu, BadIdWordSnafu, EpochCoverageSnafu, KernelBoundsSnafu, KernelError,
    NoKernelsLoadedSnafu, PropagationError, PropFrameSnafu, PropKernelSnafu, SegmentNotFoundSnafu,
    UnsupportedDataTypeSnafu,
};
use crate::frames::center::{Center, Offset};
use crate::frames::frame::{get_frame, Frame};
use crate::frames::orient;
use crate::math::Vector6;
use crate::orbits::forms::Form;
use crate::orbits::statevector::StateVector;
use crate::propagators::StateSource;
use crate::time::{Date, TimeScale};
use crate::{file_mmap, DBL_SIZE};

/// NAIF integer codes of the bodies this reader knows by name.
const NAIF_NAMES: [(i32, &str); 20] = [
    (0, "Solar System Barycenter"),
    (1, "Mercury Barycenter"),
    (2, "Venus Barycenter"),
    (3, "Earth-Moon Barycenter"),
    (4, "Mars Barycenter"),
    (5, "Jupiter Barycenter"),
    (6, "Saturn Barycenter"),
    (7, "Uranus Barycenter"),
    (8, "Neptune Barycenter"),
    (9, "Pluto Barycenter"),
    (10, "Sun"),
    (199, "Mercury"),
    (299, "Venus"),
    (301, "Moon"),
    (399, "Earth"),
    (499, "Mars"),
    (599, "Jupiter"),
    (699, "Saturn"),
    (799, "Uranus"),
    (899, "Neptune"),
];

fn naif_name(id: i32) -> String {
    NAIF_NAMES
        .iter()
        .find(|(code, _)| *code == id)
        .map(|(_, name)| (*name).to_owned())
        .unwrap_or_else(|| format!("Body {id}"))
}

fn known_body(id: i32) -> Option<Body> {
    match id {
        10 => Some(Body::sun()),
        301 => Some(Body::moon()),
        399 => Some(Body::earth()),
        499 => Some(Body::mars()),
        _ => None,
    }
}

/// One segment of an SPK file.
#[derive(Clone, Copy, Debug)]
pub struct Segment {
    pub target: i32,
    pub center: i32,
    pub frame_id: i32,
    pub data_type: i32,
    /// Coverage, TDB seconds past J2000
    pub start_et: f64,
    pub stop_et: f64,
    /// 1-based word addresses into the file
    start_word: usize,
    end_word: usize,
}

/// A memory-mapped SPK kernel.
pub struct Spk {
    mmap: Mmap,
    little_endian: bool,
    pub segments: Vec<Segment>,
}

impl Spk {
    pub fn load(path: &Path) -> Result<Self, KernelError> {
        let mmap = file_mmap!(path)?;

        let idword = std::str::from_utf8(&mmap[0..8]).unwrap_or("");
        ensure!(
            idword.starts_with("DAF/SPK"),
            BadIdWordSnafu { got: idword }
        );

        let locfmt = std::str::from_utf8(&mmap[88..96]).unwrap_or("");
        let little_endian = match locfmt {
            "LTL-IEEE" => true,
            "BIG-IEEE" => false,
            other => return BadEndiannessSnafu { got: other }.fail(),
        };

        let mut spk = Self {
            mmap,
            little_endian,
            segments: Vec::new(),
        };

        let nd = spk.i32_at(8)?;
        let ni = spk.i32_at(12)?;
        // Summaries pack ND doubles plus NI ints two per double
        let summary_dbls = nd as usize + (ni as usize + 1) / 2;

        let mut record = spk.i32_at(76)? as usize; // FWARD
        while record != 0 {
            let base = (record - 1) * 128;
            let next = spk.f64_word(base + 1)? as usize;
            let nsum = spk.f64_word(base + 3)? as usize;

            for i in 0..nsum {
                let s = base + 4 + i * summary_dbls;
                let start_et = spk.f64_word(s)?;
                let stop_et = spk.f64_word(s + 1)?;
                let ints = spk.packed_ints(s + 2, ni as usize)?;
                spk.segments.push(Segment {
                    target: ints[0],
                    center: ints[1],
                    frame_id: ints[2],
                    data_type: ints[3],
                    start_et,
                    stop_et,
                    start_word: ints[4] as usize,
                    end_word: ints[5] as usize,
                });
            }
            record = next;
        }

        Ok(spk)
    }

    fn slice(&self, start: usize, len: usize) -> Result<&[u8], KernelError> {
        self.mmap.get(start..start + len).context(KernelBoundsSnafu {
            start,
            end: start + len,
            size: self.mmap.len(),
        })
    }

    fn i32_at(&self, offset: usize) -> Result<i32, KernelError> {
        let bytes: [u8; 4] = self.slice(offset, 4)?.try_into().expect("4-byte slice");
        Ok(if self.little_endian {
            i32::from_le_bytes(bytes)
        } else {
            i32::from_be_bytes(bytes)
        })
    }

    /// Double at a 1-based word address.
    fn f64_word(&self, word: usize) -> Result<f64, KernelError> {
        let bytes: [u8; 8] = self
            .slice((word - 1) * DBL_SIZE, DBL_SIZE)?
            .try_into()
            .expect("8-byte slice");
        Ok(if self.little_endian {
            f64::from_le_bytes(bytes)
        } else {
            f64::from_be_bytes(bytes)
        })
    }

    /// Integers packed two per double starting at a 1-based word address.
    fn packed_ints(&self, word: usize, count: usize) -> Result<Vec<i32>, KernelError> {
        let mut out = Vec::with_capacity(count);
        for i in 0..count {
            let offset = (word - 1) * DBL_SIZE + i * 4;
            let bytes: [u8; 4] = self.slice(offset, 4)?.try_into().expect("4-byte slice");
            out.push(if self.little_endian {
                i32::from_le_bytes(bytes)
            } else {
                i32::from_be_bytes(bytes)
            });
        }
        Ok(out)
    }

    /// State of the segment target relative to its center, in meters and
    /// meters per second.
    pub fn evaluate(&self, segment: &Segment, et: f64) -> Result<Vector6, KernelError> {
        ensure!(
            segment.start_et <= et && et <= segment.stop_et,
            EpochCoverageSnafu { et }
        );
        ensure!(
            segment.data_type == 2 || segment.data_type == 3,
            UnsupportedDataTypeSnafu {
                dtype: segment.data_type,
            }
        );

        // Directory trailer: INIT, INTLEN, RSIZE, N
        let init = self.f64_word(segment.end_word - 3)?;
        let intlen = self.f64_word(segment.end_word - 2)?;
        let rsize = self.f64_word(segment.end_word - 1)? as usize;
        let n = self.f64_word(segment.end_word)? as usize;

        let index = (((et - init) / intlen) as usize).min(n - 1);
        let record = segment.start_word + index * rsize;

        let mid = self.f64_word(record)?;
        let radius = self.f64_word(record + 1)?;
        let tau = (et - mid) / radius;

        let components = if segment.data_type == 2 { 3 } else { 6 };
        let per_component = (rsize - 2) / components;

        let mut out = Vector6::zeros();
        for comp in 0..components {
            let mut coeffs = Vec::with_capacity(per_component);
            for k in 0..per_component {
                coeffs.push(self.f64_word(record + 2 + comp * per_component + k)?);
            }
            let (value, derivative) = chebyshev(&coeffs, tau);
            out[comp] = value;
            if segment.data_type == 2 && comp < 3 {
                // Velocity from the derivative of the position polynomial
                out[comp + 3] = derivative / radius;
            }
        }

        // km and km/s to SI
        Ok(out * 1000.0)
    }
}

/// Evaluation of a Chebyshev series and its derivative at `tau` in
/// [-1, 1], through the three-term recurrences on T and T'.
fn chebyshev(coeffs: &[f64], tau: f64) -> (f64, f64) {
    let mut val = coeffs[0];
    let mut der = 0.0;

    let (mut t_prev, mut t_cur) = (1.0, tau);
    let (mut u_prev, mut u_cur) = (0.0, 1.0);
    if coeffs.len() > 1 {
        val += coeffs[1] * t_cur;
        der += coeffs[1] * u_cur;
    }
    for c in &coeffs[2..] {
        let t_next = 2.0 * tau * t_cur - t_prev;
        let u_next = 2.0 * tau * u_cur + 2.0 * t_cur - u_prev;
        val += c * t_next;
        der += c * u_next;
        t_prev = t_cur;
        t_cur = t_next;
        u_prev = u_cur;
        u_cur = u_next;
    }
    (val, der)
}

fn kernels() -> &'static RwLock<Vec<Arc<Spk>>> {
    static KERNELS: OnceLock<RwLock<Vec<Arc<Spk>>>> = OnceLock::new();
    KERNELS.get_or_init(|| RwLock::new(Vec::new()))
}

/// Loads the configured kernel files, once.
fn ensure_loaded() -> Result<(), KernelError> {
    {
        if !kernels().read().unwrap().is_empty() {
            return Ok(());
        }
    }

    let files = Config::get().jpl.files;
    ensure!(!files.is_empty(), NoKernelsLoadedSnafu);

    let mut loaded = Vec::new();
    for path in &files {
        if path.extension().and_then(|e| e.to_str()) != Some("bsp") {
            continue;
        }
        match Spk::load(path) {
            Ok(spk) => loaded.push(Arc::new(spk)),
            Err(e) => warn!("could not load kernel {path:?}: {e}"),
        }
    }
    ensure!(!loaded.is_empty(), NoKernelsLoadedSnafu);

    *kernels().write().unwrap() = loaded;
    Ok(())
}

/// TDB seconds past J2000 of a date.
fn to_et(date: &Date) -> Result<f64, PropagationError> {
    let tdb = date
        .change_scale(TimeScale::Tdb)
        .map_err(|source| PropagationError::PropTime { source })?;
    Ok((tdb.jd() - J2000_JD) * DAY_S)
}

/// The segment serving a target, across all loaded kernels.
fn find_segment(target: i32) -> Result<(Arc<Spk>, Segment), KernelError> {
    for spk in kernels().read().unwrap().iter() {
        if let Some(segment) = spk.segments.iter().find(|s| s.target == target) {
            return Ok((spk.clone(), *segment));
        }
    }
    SegmentNotFoundSnafu { target }.fail()
}

/// Offset source evaluating one SPK segment.
struct SegmentSource {
    target: i32,
}

impl StateSource for SegmentSource {
    fn state_at(&self, date: &Date) -> Result<StateVector, PropagationError> {
        let et = to_et(date)?;
        let (spk, segment) = find_segment(self.target).context(PropKernelSnafu)?;
        let coord = spk.evaluate(&segment, et).context(PropKernelSnafu)?;
        let frame = get_frame("EME2000").context(PropFrameSnafu)?;
        Ok(StateVector::new(coord, *date, Form::Cartesian, frame))
    }
}

/// Creates the centers and frames of every body found in the loaded
/// kernels, attached through the segment hierarchy.
///
/// Positions are in the J2000 equatorial frame of the kernels, which this
/// crate identifies with EME2000.
pub fn create_frames() -> Result<(), PropagationError> {
    ensure_loaded().context(PropKernelSnafu)?;

    let segments: Vec<Segment> = kernels()
        .read()
        .unwrap()
        .iter()
        .flat_map(|spk| spk.segments.clone())
        .collect();

    // Map NAIF ids to centers, starting from the Earth and walking the
    // segment hierarchy in both directions: a segment attaches its target
    // under a known center, or its center above a known target with the
    // offset negated (e.g. the Earth-Moon barycenter above the Earth).
    let mut centers: HashMap<i32, Center> = HashMap::new();
    centers.insert(399, crate::frames::center::EARTH);

    let mut progress = true;
    while progress {
        progress = false;
        for segment in &segments {
            if !centers.contains_key(&segment.target) {
                if let Some(parent) = centers.get(&segment.center).copied() {
                    let name = naif_name(segment.target);
                    let center = Center::attach(
                        &name,
                        parent,
                        orient::EME2000,
                        Offset::Moving(Arc::new(SegmentSource {
                            target: segment.target,
                        })),
                        known_body(segment.target),
                    );
                    centers.insert(segment.target, center);
                    Frame::new(&name, orient::EME2000, center);
                    progress = true;
                }
            } else if !centers.contains_key(&segment.center) {
                let child = centers[&segment.target];
                let name = naif_name(segment.center);
                let center = Center::attach(
                    &name,
                    child,
                    orient::EME2000,
                    Offset::Moving(Arc::new(NegatedSource {
                        target: segment.target,
                    })),
                    known_body(segment.center),
                );
                centers.insert(segment.center, center);
                Frame::new(&name, orient::EME2000, center);
                progress = true;
            }
        }
    }

    Ok(())
}

/// Offset of a center relative to one of its kernel children (the segment
/// evaluated backward).
struct NegatedSource {
    target: i32,
}

impl StateSource for NegatedSource {
    fn state_at(&self, date: &Date) -> Result<StateVector, PropagationError> {
        let mut state = SegmentSource {
            target: self.target,
        }
        .state_at(date)?;
        state.set_coord(-state.coord());
        Ok(state)
    }
}

/// State of a kernel body relative to the Earth, in EME2000.
pub fn get_orbit(name: &str, date: &Date) -> Result<StateVector, PropagationError> {
    create_frames()?;
    let frame = get_frame(name).context(PropFrameSnafu)?;
    let offset = frame
        .center()
        .convert_to(date, crate::frames::center::EARTH, orient::EME2000)
        .context(PropFrameSnafu)?;
    let eme = get_frame("EME2000").context(PropFrameSnafu)?;
    Ok(StateVector::new(offset, *date, Form::Cartesian, eme))
}

/// A kernel body, with its propagator evaluating the segment chain.
pub fn get_body(name: &str) -> Result<Body, PropagationError> {
    create_frames()?;
    let id = NAIF_NAMES
        .iter()
        .find(|(_, n)| *n == name)
        .map(|(id, _)| *id)
        .ok_or_else(|| PropagationError::UnknownBody {
            name: name.to_owned(),
        })?;
    let body = known_body(id).unwrap_or_else(|| Body::new(name, 0.0, 0.0, 0.0));
    struct ChainSource {
        name: String,
    }
    impl StateSource for ChainSource {
        fn state_at(&self, date: &Date) -> Result<StateVector, PropagationError> {
            get_orbit(&self.name, date)
        }
    }
    Ok(body.with_propagator(Arc::new(ChainSource {
        name: name.to_owned(),
    })))
}
