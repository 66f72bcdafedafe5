/*
 * Orrery Astrodynamics Core
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! TLE (two/three-line element set) reading and writing.
//!
//! ```text
//! ISS (ZARYA)
//! 1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927
//! 2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537
//! ```
//!
//! Strict fixed-column ASCII; both lines carry a modulo-10 checksum, and
//! the drag fields use the "implied decimal point" notation.

use std::f64::consts::TAU;

use log::warn;
use snafu::prelude::*;

use crate::errors::{
    ChecksumMismatchSnafu, LineLengthSnafu, LineNumberSnafu, ParseError, PropagationError,
    PropFormSnafu, PropFrameSnafu, TleEpochSnafu, TleFieldSnafu,
};
use crate::frames::frame::get_frame;
use crate::math::Vector6;
use crate::orbits::forms::Form;
use crate::orbits::orbit::Orbit;
use crate::orbits::statevector::{StateVector, TleComplements};
use crate::propagators::sgp4::Sgp4;
use crate::propagators::Propagator;
use crate::time::{Date, TimeDelta, TimeScale};

/// Parses a float field, tolerating the TLE habit of dropping the leading
/// zero (" .00001524", "-.00002182").
fn field_f64(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    let normalized = if let Some(rest) = trimmed.strip_prefix("-.") {
        format!("-0.{rest}")
    } else if let Some(rest) = trimmed.strip_prefix("+.") {
        format!("0.{rest}")
    } else if let Some(rest) = trimmed.strip_prefix('.') {
        format!("0.{rest}")
    } else {
        trimmed.to_owned()
    };
    lexical_core::parse::<f64>(normalized.as_bytes()).ok()
}

/// Parses the "decimal point assumed" format (`±NNNNN±N` is
/// `±0.NNNNN·10^±N`).
fn implied_decimal(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (sign, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    // Exponent marked by a trailing sign
    let split = rest[1..].rfind(['+', '-']).map(|i| i + 1);
    let (mantissa, exponent) = match split {
        Some(i) => {
            let exp: i32 = rest[i..].parse().ok()?;
            (&rest[..i], exp)
        }
        None => (rest, 0),
    };

    let digits: f64 = field_f64(&format!("0.{mantissa}"))?;
    Some(sign * digits * 10f64.powi(exponent))
}

/// Emits a float in "decimal point assumed" notation with 5 digits.
fn unimplied_decimal(value: f64) -> String {
    if value == 0.0 {
        return "00000-0".to_owned();
    }

    let formatted = format!("{value:.4e}");
    let (num, exp) = formatted.split_once('e').expect("exponent notation");
    let exp: i32 = exp.parse().expect("valid exponent");
    let num = num.replace('.', "");
    format!("{num}{:+}", exp + 1)
}

/// A parsed two/three-line element set.
#[derive(Clone, Debug)]
pub struct Tle {
    pub name: String,
    pub norad_id: u32,
    pub classification: char,
    pub cospar_id: String,
    pub epoch: Date,
    /// First time derivative of the mean motion (the file stores half of it)
    pub ndot: f64,
    /// Second time derivative of the mean motion (the file stores a sixth)
    pub ndotdot: f64,
    pub bstar: f64,
    pub ephemeris_type: u8,
    pub element_nb: u32,
    pub revolutions: u32,
    /// Inclination, rad
    pub i: f64,
    /// Right ascension of the ascending node, rad
    pub raan: f64,
    pub e: f64,
    /// Argument of perigee, rad
    pub aop: f64,
    /// Mean anomaly, rad
    pub m: f64,
    /// Mean motion, rad/s
    pub n: f64,
    text: String,
}

impl Tle {
    /// Checksum of a line: digits summed, minus signs counting as one,
    /// modulo 10.
    pub fn checksum(line: &str) -> u8 {
        let mut sum = 0u32;
        for c in line.chars().take(68) {
            if let Some(d) = c.to_digit(10) {
                sum += d;
            } else if c == '-' {
                sum += 1;
            }
        }
        (sum % 10) as u8
    }

    fn check_validity(lines: &[&str]) -> Result<(), ParseError> {
        ensure!(
            lines.len() == 2
                && lines[0].trim_start().starts_with("1 ")
                && lines[1].trim_start().starts_with("2 "),
            LineNumberSnafu
        );

        for (i, line) in lines.iter().enumerate() {
            let line = line.trim_end();
            ensure!(
                line.len() == 69,
                LineLengthSnafu {
                    line: i + 1,
                    got: line.len(),
                }
            );
            let expected = Self::checksum(line);
            let got = line.as_bytes()[68] - b'0';
            ensure!(
                expected == got,
                ChecksumMismatchSnafu {
                    line: i + 1,
                    expected,
                    got,
                }
            );
        }
        Ok(())
    }

    /// Parses a TLE, with an optional leading name line.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let mut lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();

        let mut name = String::new();
        if lines.len() == 3 {
            name = lines.remove(0).trim().to_owned();
            if let Some(stripped) = name.strip_prefix("0 ") {
                name = stripped.to_owned();
            }
        }

        Self::check_validity(&lines)?;
        let (first, second) = (lines[0], lines[1]);

        let col = |line: &str, range: std::ops::Range<usize>| -> Option<String> {
            line.get(range).map(str::to_owned)
        };

        let norad_id: u32 = col(first, 2..7)
            .and_then(|s| s.trim().parse().ok())
            .context(TleFieldSnafu { field: "norad id" })?;
        let classification = first.as_bytes()[7] as char;

        let cospar_id = match col(first, 9..17) {
            Some(raw) if !raw.trim().is_empty() => {
                let year: u32 = raw[0..2].parse().map_err(|_| ParseError::TleField {
                    field: "cospar id",
                })?;
                // This condition works until 2057
                let year = if year >= 57 { 1900 + year } else { 2000 + year };
                format!("{year}-{}", raw[2..].trim())
            }
            _ => String::new(),
        };

        let year: i32 = col(first, 18..20)
            .and_then(|s| s.parse().ok())
            .context(TleFieldSnafu { field: "epoch year" })?;
        let year = if year >= 57 { 1900 + year } else { 2000 + year };
        let day: f64 = col(first, 20..32)
            .and_then(|s| field_f64(&s))
            .context(TleFieldSnafu { field: "epoch day" })?;
        let epoch = Date::from_ymd(year, 1, 1, TimeScale::Utc)
            .and_then(|jan1| jan1.shift(TimeDelta::from_days(day - 1.0)))
            .context(TleEpochSnafu)?;

        let ndot = col(first, 33..43)
            .and_then(|s| field_f64(&s))
            .context(TleFieldSnafu { field: "ndot" })?
            * 2.0;
        let ndotdot = col(first, 44..52)
            .and_then(|s| implied_decimal(&s))
            .context(TleFieldSnafu { field: "ndotdot" })?
            * 6.0;
        let bstar = col(first, 53..61)
            .and_then(|s| implied_decimal(&s))
            .context(TleFieldSnafu { field: "bstar" })?;
        let ephemeris_type: u8 = col(first, 62..63)
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0);
        let element_nb: u32 = col(first, 65..68)
            .and_then(|s| s.trim().parse().ok())
            .context(TleFieldSnafu { field: "element number" })?;

        let angle = |range: std::ops::Range<usize>, field: &'static str| {
            col(second, range)
                .and_then(|s| field_f64(&s))
                .map(f64::to_radians)
                .context(TleFieldSnafu { field })
        };

        let i = angle(8..16, "inclination")?;
        let raan = angle(17..25, "raan")?;
        let e = col(second, 26..33)
            .and_then(|s| field_f64(&format!("0.{}", s.trim())))
            .context(TleFieldSnafu { field: "eccentricity" })?;
        let aop = angle(34..42, "argument of perigee")?;
        let m = angle(43..51, "mean anomaly")?;
        // rev/day to rad/s
        let n = col(second, 52..63)
            .and_then(|s| field_f64(&s))
            .context(TleFieldSnafu { field: "mean motion" })?
            * TAU
            / 86400.0;
        let revolutions: u32 = col(second, 63..68)
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0);

        Ok(Self {
            name,
            norad_id,
            classification,
            cospar_id,
            epoch,
            ndot,
            ndotdot,
            bstar,
            ephemeris_type,
            element_nb,
            revolutions,
            i,
            raan,
            e,
            aop,
            m,
            n,
            text: format!("{first}\n{second}"),
        })
    }

    /// The two 69-character lines.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The elements in TLE form order: i, Ω, e, ω, M, n.
    pub fn to_coord(&self) -> Vector6 {
        Vector6::new(self.i, self.raan, self.e, self.aop, self.m, self.n)
    }

    /// An [`Orbit`] bound to an SGP4 propagator, in TEME.
    pub fn orbit(&self) -> Result<Orbit, PropagationError> {
        let frame = get_frame("TEME").context(PropFrameSnafu)?;
        let mut state = StateVector::new(self.to_coord(), self.epoch, Form::Tle, frame);
        state.metadata.name = Some(self.name.clone()).filter(|n| !n.is_empty());
        state.metadata.cospar_id = Some(self.cospar_id.clone()).filter(|c| !c.is_empty());
        state.metadata.norad_id = Some(self.norad_id);
        state.metadata.tle = Some(TleComplements {
            bstar: self.bstar,
            ndot: self.ndot,
            ndotdot: self.ndotdot,
            element_nb: self.element_nb,
            revolutions: self.revolutions,
            classification: self.classification,
            ephemeris_type: self.ephemeris_type,
        });

        Orbit::new(state, Box::new(Sgp4::default()) as Box<dyn Propagator>)
    }

    /// Serializes a state back to its TLE representation.
    ///
    /// The state is brought to the TLE form in TEME; identifiers and drag
    /// complements come from its metadata.
    pub fn from_statevector(state: &StateVector) -> Result<Self, PropagationError> {
        let frame = get_frame("TEME").context(PropFrameSnafu)?;
        let tle_state = state
            .clone()
            .with_frame(&frame)
            .context(PropFrameSnafu)?
            .with_form(Form::Tle)
            .context(PropFormSnafu)?;

        let complements = state.metadata.tle.unwrap_or_default();
        let norad_id = state.metadata.norad_id.unwrap_or(99999);
        let cospar = match &state.metadata.cospar_id {
            Some(full) => {
                let (year, rest) = full.split_once('-').unwrap_or(("", full));
                format!("{}{}", year.get(2..).unwrap_or(""), rest)
            }
            None => String::new(),
        };

        let date = tle_state.date();
        let (year, _, _, _, _, _, _) = date.calendar();
        let jan1 = Date::from_ymd(year, 1, 1, TimeScale::Utc)
            .map_err(|source| PropagationError::PropTime { source })?;
        let day = (date.d() - jan1.d()) as f64 + 1.0 + date.s() / 86400.0;

        let coord = tle_state.coord();
        let (i, raan, e, aop, m, n) = (
            coord[0].to_degrees(),
            coord[1].to_degrees(),
            coord[2],
            coord[3].to_degrees(),
            coord[4].to_degrees(),
            coord[5] * 86400.0 / TAU,
        );

        let ndot_half = format!("{:.8}", complements.ndot / 2.0).replacen("0.", ".", 1);
        let mut line1 = format!(
            "1 {norad_id:5}{classification} {cospar:<8} {yy:02}{day:012.8} {ndot:>10} {ndotdot:>8} {bstar:>8} {kind} {elnb:>4}",
            classification = complements.classification,
            yy = year % 100,
            ndot = ndot_half,
            ndotdot = unimplied_decimal(complements.ndotdot / 6.0),
            bstar = unimplied_decimal(complements.bstar),
            kind = complements.ephemeris_type,
            elnb = complements.element_nb,
        );
        let e_digits = &format!("{e:.7}")[2..];
        let mut line2 = format!(
            "2 {norad_id:5} {i:8.4} {raan:8.4} {e_digits} {aop:8.4} {m:8.4} {n:11.8}{revolutions:>5}",
            revolutions = complements.revolutions,
        );

        line1.push((b'0' + Self::checksum(&line1)) as char);
        line2.push((b'0' + Self::checksum(&line2)) as char);

        let name = state.metadata.name.clone().unwrap_or_default();
        let text = if name.is_empty() {
            format!("{line1}\n{line2}")
        } else {
            format!("0 {name}\n{line1}\n{line2}")
        };

        Tle::parse(&text).map_err(|source| PropagationError::PropParse { source })
    }

    /// How stream parsing reacts to a malformed TLE.
    pub fn stream(text: &str, comments: char) -> Vec<Result<Tle, ParseError>> {
        let mut out = Vec::new();
        let mut cache: Vec<&str> = Vec::new();

        for line in text.lines() {
            if line.trim().is_empty() || line.starts_with(comments) {
                continue;
            }
            if line.starts_with("1 ") {
                cache.push(line);
            } else if line.starts_with("2 ") {
                cache.push(line);
                out.push(Self::parse(&cache.join("\n")));
                cache.clear();
            } else {
                // In the 3LE format this line carries the satellite name
                cache = vec![line];
            }
        }
        out
    }

    /// Lenient stream parsing: malformed sets are skipped with a warning.
    pub fn from_string(text: &str) -> Vec<Tle> {
        Self::stream(text, '#')
            .into_iter()
            .filter_map(|res| match res {
                Ok(tle) => Some(tle),
                Err(e) => {
                    warn!("{e}");
                    None
                }
            })
            .collect()
    }
}
