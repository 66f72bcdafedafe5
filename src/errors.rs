/*
 * Orrery Astrodynamics Core
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use snafu::prelude::*;
use std::io::ErrorKind as IOErrorKind;

use crate::time::Date;

/// Errors raised by the generic routing graph.
#[derive(Clone, Debug, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum GraphError {
    #[snafu(display("unknown node '{name}'"))]
    UnknownNode { name: String },
    #[snafu(display("no path between '{from}' and '{to}'"))]
    NoPath { from: String, to: String },
}

/// Errors raised while querying Earth Orientation Parameters.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum EopError {
    #[snafu(display("unknown EOP database '{name}'"))]
    UnknownDatabase { name: String },
    #[snafu(display("missing EOP data for mjd = {mjd}"))]
    MissingData { mjd: f64 },
    #[snafu(display("EOP database instantiation failed: {reason}"))]
    BackendInit { reason: String },
    #[snafu(display("could not read EOP file: {kind:?}"))]
    EopIo { kind: IOErrorKind },
    #[snafu(display("malformed record at line {lineno} of {what}"))]
    EopParse { what: &'static str, lineno: usize },
}

/// Errors of the time scale and date machinery.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TimeError {
    #[snafu(display("unknown scale '{name}'"))]
    UnknownScale { name: String },
    #[snafu(display("invalid calendar date {year:04}-{month:02}-{day:02}"))]
    InvalidCalendar { year: i32, month: u32, day: u32 },
    #[snafu(display("invalid time of day {hour:02}:{minute:02}:{second:02}.{microsecond:06}"))]
    InvalidTimeOfDay {
        hour: u32,
        minute: u32,
        second: u32,
        microsecond: u32,
    },
    /// A date range requires a non-null step.
    #[snafu(display("null step"))]
    NullStep,
    #[snafu(display("start/stop order not coherent with step"))]
    IncoherentRange,
    #[snafu(display("no conversion between scales {from} and {to}"))]
    NoScalePath { from: String, to: String },
    #[snafu(display("EOP lookup failed: {source}"))]
    EopLookup { source: EopError },
}

/// Orbital mechanics impossibilities and shape violations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum PhysicsError {
    #[snafu(display("{quantity} undefined: orbit is hyperbolic"))]
    HyperbolicOrbit { quantity: &'static str },
    #[snafu(display("{quantity} undefined: orbit is not hyperbolic"))]
    EllipticOrbit { quantity: &'static str },
    #[snafu(display("eccentricity within {limit:e} of parabolic"))]
    ParabolicEccentricity { limit: f64 },
    #[snafu(display("encountered a non-finite value while {action}"))]
    InfiniteValue { action: &'static str },
    #[snafu(display("covariance is not symmetric (max|C - C^T| = {delta:e})"))]
    NotSymmetric { delta: f64 },
    #[snafu(display("covariance should be 6x6, {rows}x{cols} provided"))]
    CovarianceShape { rows: usize, cols: usize },
    #[snafu(display("state vector should be 6 in length, got {len}"))]
    StateShape { len: usize },
    #[snafu(display("delta-v vector should be 3 in length, got {len}"))]
    ManeuverShape { len: usize },
    #[snafu(display("no propagator attached to body '{body}'"))]
    NoPropagator { body: String },
}

/// Errors of the reference frame machinery (orientations, centers, frames).
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum FrameError {
    #[snafu(display("unknown frame '{name}'"))]
    UnknownFrame { name: String },
    #[snafu(display("unknown orientation '{name}'"))]
    UnknownOrientation { name: String },
    #[snafu(display("unknown center '{name}'"))]
    UnknownCenter { name: String },
    #[snafu(display("unknown local orbital frame '{name}'"))]
    UnknownLocalFrame { name: String },
    #[snafu(display("frame '{name}' is not a Hill frame"))]
    NotHill { name: String },
    #[snafu(display("Hill frame '{name}' only exists for the rendezvous propagators and cannot be transformed through the frame graph"))]
    HillTransform { name: String },
    #[snafu(display("no mask defined for station '{name}'"))]
    NoMask { name: String },
    #[snafu(display("orientation routing failed: {source}"))]
    OrientationPath { source: GraphError },
    #[snafu(display("center routing failed: {source}"))]
    CenterPath { source: GraphError },
    #[snafu(display("time scale conversion failed during a frame computation: {source}"))]
    FrameTime { source: TimeError },
    #[snafu(display("frame computation hit a physics error: {source}"))]
    FramePhysics { source: PhysicsError },
    #[snafu(display("form conversion failed during a frame computation: {source}"))]
    FrameForm {
        #[snafu(source(from(FormError, Box::new)))]
        source: Box<FormError>,
    },
    #[snafu(display("evaluating a dynamic center offset failed: {source}"))]
    DynamicOffset {
        #[snafu(source(from(PropagationError, Box::new)))]
        source: Box<PropagationError>,
    },
}

/// Errors of the form graph (orbital element representations).
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum FormError {
    #[snafu(display("unknown form '{name}'"))]
    UnknownForm { name: String },
    #[snafu(display("'{name}' is not available in '{form}' form"))]
    UnknownComponent { name: String, form: &'static str },
    #[snafu(display("form routing failed: {source}"))]
    FormPath { source: GraphError },
    #[snafu(display("form conversion hit a physics error: {source}"))]
    FormPhysics { source: PhysicsError },
}

/// Errors of ephemeris interpolation and slicing.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum EphemerisError {
    #[snafu(display("date '{date}' not in range [{start}, {stop}]"))]
    OutOfRange { date: Date, start: Date, stop: Date },
    #[snafu(display("{got} samples is not enough for an order {order} interpolation"))]
    InsufficientSamples { got: usize, order: usize },
    #[snafu(display("empty ephemeris"))]
    EmptyEphemeris,
    #[snafu(display("ephemeris frame change failed: {source}"))]
    EphemFrame {
        #[snafu(source(from(FrameError, Box::new)))]
        source: Box<FrameError>,
    },
    #[snafu(display("ephemeris form change failed: {source}"))]
    EphemForm { source: FormError },
}

/// Errors surfaced while propagating an orbit or iterating over samples.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum PropagationError {
    #[snafu(display("propagator has no orbit set"))]
    Uninitialized,
    #[snafu(display("expected a state in {expected} form, got {got}"))]
    WrongForm {
        expected: &'static str,
        got: &'static str,
    },
    #[snafu(display("expected a state in frame '{expected}', got '{got}'"))]
    WrongFrame { expected: String, got: String },
    #[snafu(display("{method}: no convergence in step size after {iterations} iterations"))]
    NoConvergence {
        method: &'static str,
        iterations: usize,
    },
    #[snafu(display("the end of the propagation should be defined"))]
    MissingStop,
    #[snafu(display("no step defined for the propagation"))]
    MissingStep,
    #[snafu(display("unknown body '{name}'"))]
    UnknownBody { name: String },
    #[snafu(display("no event '{info}' found in the stream"))]
    EventNotFound { info: String },
    #[snafu(display("frame transformation failed during propagation: {source}"))]
    PropFrame {
        #[snafu(source(from(FrameError, Box::new)))]
        source: Box<FrameError>,
    },
    #[snafu(display("form conversion failed during propagation: {source}"))]
    PropForm { source: FormError },
    #[snafu(display("{source}"))]
    PropEphemeris {
        #[snafu(source(from(EphemerisError, Box::new)))]
        source: Box<EphemerisError>,
    },
    #[snafu(display("propagation hit a physics error: {source}"))]
    PropPhysics { source: PhysicsError },
    #[snafu(display("propagation hit a time error: {source}"))]
    PropTime { source: TimeError },
    #[snafu(display("planetary kernel lookup failed: {source}"))]
    PropKernel { source: KernelError },
    #[snafu(display("serialization failed during propagation: {source}"))]
    PropParse { source: ParseError },
}

/// Malformed textual input (TLE and IERS records).
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ParseError {
    #[snafu(display("line number check failed"))]
    LineNumber,
    #[snafu(display("invalid TLE size on line {line}. Expected 69, got {got}."))]
    LineLength { line: usize, got: usize },
    #[snafu(display("TLE checksum validation failed on line {line}. Expected {expected}, got {got}."))]
    ChecksumMismatch { line: usize, expected: u8, got: u8 },
    #[snafu(display("could not parse TLE field '{field}'"))]
    TleField { field: &'static str },
    #[snafu(display("TLE epoch is not a valid date: {source}"))]
    TleEpoch { source: TimeError },
}

/// Invalid process-wide configuration.
#[derive(Clone, Debug, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ConfigError {
    #[snafu(display("unknown config value '{value}' for '{key}'"))]
    InvalidValue { key: &'static str, value: String },
}

/// Errors raised by the JPL binary kernel reader.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum KernelError {
    #[snafu(display("could not read kernel: {kind:?}"))]
    Io { kind: IOErrorKind },
    #[snafu(display("could not read kernel (unknown IO error)"))]
    IoUnknown,
    #[snafu(display("not a DAF/SPK file (id word '{got}')"))]
    BadIdWord { got: String },
    #[snafu(display("unsupported endianness '{got}'"))]
    BadEndianness { got: String },
    #[snafu(display("unsupported SPK data type {dtype}"))]
    UnsupportedDataType { dtype: i32 },
    #[snafu(display("no segment for target {target}"))]
    SegmentNotFound { target: i32 },
    #[snafu(display("no JPL file defined"))]
    NoKernelsLoaded,
    #[snafu(display("bytes between indexes {start} and {end} could not be read, file contains {size} bytes"))]
    KernelBounds {
        start: usize,
        end: usize,
        size: usize,
    },
    #[snafu(display("epoch {et} s (TDB) outside of segment coverage"))]
    EpochCoverage { et: f64 },
    #[snafu(display("body {id} is not known to the kernel reader"))]
    UnknownBodyId { id: i32 },
}

/// Umbrella error, for callers that do not care which subsystem failed.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum OrreryError {
    #[snafu(context(false))]
    Time { source: TimeError },
    #[snafu(context(false))]
    Eop { source: EopError },
    #[snafu(context(false))]
    Physics { source: PhysicsError },
    #[snafu(context(false))]
    Frame { source: FrameError },
    #[snafu(context(false))]
    Form { source: FormError },
    #[snafu(context(false))]
    Ephemeris { source: EphemerisError },
    #[snafu(context(false))]
    Propagation { source: PropagationError },
    #[snafu(context(false))]
    Parse { source: ParseError },
    #[snafu(context(false))]
    Config { source: ConfigError },
    #[snafu(context(false))]
    Kernel { source: KernelError },
}
