/*
 * Orrery Astrodynamics Core
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Dates and durations.
//!
//! A [`Date`] is an immutable instant: an integer MJD day and the seconds in
//! that day, both held in the TAI reference scale, together with the scale
//! the date was expressed in, the offset used to reach TAI, and the EOP
//! record memoized at construction. Leap seconds cannot be represented as an
//! input (23:59:60 is rejected), but dates on either side of one compare
//! correctly since comparison happens in TAI.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};
use std::time::{SystemTime, UNIX_EPOCH};

use snafu::prelude::*;

use crate::constants::{DAY_S, J2000_JD, JD_MJD, JULIAN_CENTURY_D};
use crate::errors::{
    EopLookupSnafu, IncoherentRangeSnafu, InvalidCalendarSnafu, InvalidTimeOfDaySnafu,
    NullStepSnafu, TimeError,
};
use crate::time::eop::{Eop, EopDb};
use crate::time::scales::{self, TimeScale};

/// Signed duration, in seconds.
#[derive(Copy, Clone, Debug, Default, PartialEq, PartialOrd)]
pub struct TimeDelta {
    seconds: f64,
}

impl TimeDelta {
    /// One time tick (1 µs): the resolution of event bisection and of the
    /// date display.
    pub const TICK: TimeDelta = TimeDelta { seconds: 1e-6 };

    pub const ZERO: TimeDelta = TimeDelta { seconds: 0.0 };

    pub fn from_seconds(seconds: f64) -> Self {
        Self { seconds }
    }

    pub fn from_minutes(minutes: f64) -> Self {
        Self {
            seconds: minutes * 60.0,
        }
    }

    pub fn from_hours(hours: f64) -> Self {
        Self {
            seconds: hours * 3600.0,
        }
    }

    pub fn from_days(days: f64) -> Self {
        Self {
            seconds: days * DAY_S,
        }
    }

    pub fn total_seconds(&self) -> f64 {
        self.seconds
    }

    pub fn abs(&self) -> Self {
        Self {
            seconds: self.seconds.abs(),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.seconds == 0.0
    }

    pub fn signum(&self) -> f64 {
        if self.seconds >= 0.0 {
            1.0
        } else {
            -1.0
        }
    }
}

impl Add for TimeDelta {
    type Output = TimeDelta;
    fn add(self, rhs: TimeDelta) -> TimeDelta {
        TimeDelta::from_seconds(self.seconds + rhs.seconds)
    }
}

impl Sub for TimeDelta {
    type Output = TimeDelta;
    fn sub(self, rhs: TimeDelta) -> TimeDelta {
        TimeDelta::from_seconds(self.seconds - rhs.seconds)
    }
}

impl Neg for TimeDelta {
    type Output = TimeDelta;
    fn neg(self) -> TimeDelta {
        TimeDelta::from_seconds(-self.seconds)
    }
}

impl Mul<f64> for TimeDelta {
    type Output = TimeDelta;
    fn mul(self, rhs: f64) -> TimeDelta {
        TimeDelta::from_seconds(self.seconds * rhs)
    }
}

impl Div<f64> for TimeDelta {
    type Output = TimeDelta;
    fn div(self, rhs: f64) -> TimeDelta {
        TimeDelta::from_seconds(self.seconds / rhs)
    }
}

impl Div<TimeDelta> for TimeDelta {
    type Output = f64;
    fn div(self, rhs: TimeDelta) -> f64 {
        self.seconds / rhs.seconds
    }
}

/// Days since 1970-01-01 of a proleptic Gregorian calendar date.
fn days_from_civil(year: i32, month: u32, day: u32) -> i64 {
    let y = year as i64 - if month <= 2 { 1 } else { 0 };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = y - era * 400;
    let mp = (month as i64 + 9) % 12;
    let doy = (153 * mp + 2) / 5 + day as i64 - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146097 + doe - 719468
}

/// Inverse of `days_from_civil`.
fn civil_from_days(z: i64) -> (i32, u32, u32) {
    let z = z + 719468;
    let era = if z >= 0 { z } else { z - 146096 } / 146097;
    let doe = z - era * 146097;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = (y + if month <= 2 { 1 } else { 0 }) as i32;
    (year, month, day)
}

/// Days since the MJD origin (1858-11-17) of the unix epoch.
const UNIX_MJD: i64 = 40587;

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            let leap = (year % 4 == 0 && year % 100 != 0) || year % 400 == 0;
            if leap {
                29
            } else {
                28
            }
        }
        _ => 0,
    }
}

/// An immutable instant, internally in TAI.
#[derive(Copy, Clone, Debug)]
pub struct Date {
    /// MJD day, in TAI
    d: i64,
    /// Seconds in the day, in [0, 86400), in TAI
    s: f64,
    /// Offset from the tagged scale to TAI, applied at construction
    offset: f64,
    scale: TimeScale,
    /// EOP snapshot memoized at construction
    eop: Eop,
}

impl Date {
    pub const DEFAULT_SCALE: TimeScale = TimeScale::Utc;

    /// Builds a date from an MJD day and seconds in that day, tagged in the
    /// given scale. Out-of-range seconds roll over into the day count.
    pub fn from_day_seconds(day: i64, seconds: f64, scale: TimeScale) -> Result<Self, TimeError> {
        let mjd = day as f64 + seconds / DAY_S;
        let eop = EopDb::get(mjd).context(EopLookupSnafu)?;
        let offset = scales::offset(scale, TimeScale::Tai, mjd, &eop)?;

        let total = seconds + offset;
        let carry = (total / DAY_S).floor() as i64;
        Ok(Self {
            d: day + carry,
            s: total - carry as f64 * DAY_S,
            offset,
            scale,
            eop,
        })
    }

    /// Builds a date from a fractional MJD.
    pub fn from_mjd(mjd: f64, scale: TimeScale) -> Result<Self, TimeError> {
        let day = mjd.floor() as i64;
        Self::from_day_seconds(day, (mjd - day as f64) * DAY_S, scale)
    }

    /// Builds a date from a calendar date and time of day.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
        microsecond: u32,
        scale: TimeScale,
    ) -> Result<Self, TimeError> {
        ensure!(
            (1..=12).contains(&month) && (1..=days_in_month(year, month)).contains(&day),
            InvalidCalendarSnafu { year, month, day }
        );
        ensure!(
            hour < 24 && minute < 60 && second < 60 && microsecond < 1_000_000,
            InvalidTimeOfDaySnafu {
                hour,
                minute,
                second,
                microsecond
            }
        );

        let mjd_day = days_from_civil(year, month, day) + UNIX_MJD;
        let seconds = hour as f64 * 3600.0
            + minute as f64 * 60.0
            + second as f64
            + microsecond as f64 * 1e-6;
        Self::from_day_seconds(mjd_day, seconds, scale)
    }

    /// Calendar date at midnight, in the given scale.
    pub fn from_ymd(year: i32, month: u32, day: u32, scale: TimeScale) -> Result<Self, TimeError> {
        Self::new(year, month, day, 0, 0, 0, 0, scale)
    }

    /// Current time, in UTC.
    pub fn now() -> Result<Self, TimeError> {
        let unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let days = (unix.as_secs() / 86400) as i64;
        let secs = unix.as_secs_f64() - days as f64 * DAY_S;
        Self::from_day_seconds(days + UNIX_MJD, secs, TimeScale::Utc)
    }

    /// Day and seconds-in-day expressed in the date's own scale.
    fn day_seconds(&self) -> (i64, f64) {
        let s = (self.s - self.offset).rem_euclid(DAY_S);
        let d = self.d - ((s + self.offset) / DAY_S).floor() as i64;
        (d, s)
    }

    /// MJD day in the date's scale.
    pub fn d(&self) -> i64 {
        self.day_seconds().0
    }

    /// Seconds in the day, in the date's scale.
    pub fn s(&self) -> f64 {
        self.day_seconds().1
    }

    /// Fractional MJD in the date's scale.
    pub fn mjd(&self) -> f64 {
        let (d, s) = self.day_seconds();
        d as f64 + s / DAY_S
    }

    /// Julian Date in the date's scale.
    pub fn jd(&self) -> f64 {
        self.mjd() + JD_MJD
    }

    /// Julian centuries since J2000, computed in the date's own scale.
    pub fn julian_century(&self) -> f64 {
        (self.jd() - J2000_JD) / JULIAN_CENTURY_D
    }

    /// Fractional MJD in the TAI reference scale.
    pub(crate) fn mjd_tai(&self) -> f64 {
        self.d as f64 + self.s / DAY_S
    }

    pub fn scale(&self) -> TimeScale {
        self.scale
    }

    /// EOP record memoized at construction.
    pub fn eop(&self) -> &Eop {
        &self.eop
    }

    /// The same instant, tagged and expressed in another scale.
    pub fn change_scale(&self, scale: TimeScale) -> Result<Self, TimeError> {
        let offset = scales::offset(self.scale, scale, self.mjd_tai(), &self.eop)?;
        let (d, s) = self.day_seconds();
        Self::from_day_seconds(d, s + offset, scale)
    }

    /// A new date shifted by the given duration, in the same scale.
    pub fn shift(&self, delta: TimeDelta) -> Result<Self, TimeError> {
        let (d, s) = self.day_seconds();
        Self::from_day_seconds(d, s + delta.total_seconds(), self.scale)
    }

    /// Calendar representation (year, month, day, hour, minute, second,
    /// microsecond) in the date's own scale, rounded to the microsecond.
    pub fn calendar(&self) -> (i32, u32, u32, u32, u32, u32, u32) {
        let (mut d, s) = self.day_seconds();
        let mut micros = (s * 1e6).round() as i64;
        if micros >= 86_400_000_000 {
            micros -= 86_400_000_000;
            d += 1;
        }
        let (year, month, day) = civil_from_days(d - UNIX_MJD);
        let hour = (micros / 3_600_000_000) as u32;
        let minute = (micros / 60_000_000 % 60) as u32;
        let second = (micros / 1_000_000 % 60) as u32;
        let microsecond = (micros % 1_000_000) as u32;
        (year, month, day, hour, minute, second, microsecond)
    }

    /// Generator of a date range, stepping from `start` by `step`.
    ///
    /// `stop` is a `Date` or a `TimeDelta` relative to `start`; when
    /// `inclusive` the stopping date is yielded too.
    pub fn range(
        start: Date,
        stop: impl Into<RangeEnd>,
        step: TimeDelta,
        inclusive: bool,
    ) -> Result<DateRange, TimeError> {
        ensure!(!step.is_zero(), NullStepSnafu);
        let stop = match stop.into() {
            RangeEnd::Date(date) => date,
            RangeEnd::Delta(delta) => start.shift(delta)?,
        };
        ensure!(
            (stop - start).signum() == step.signum(),
            IncoherentRangeSnafu
        );
        Ok(DateRange {
            start,
            stop,
            step,
            inclusive,
            current: Some(start),
        })
    }
}

impl PartialEq for Date {
    fn eq(&self, other: &Self) -> bool {
        self.d == other.d && self.s == other.s
    }
}

impl PartialOrd for Date {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match self.d.cmp(&other.d) {
            Ordering::Equal => self.s.partial_cmp(&other.s),
            ord => Some(ord),
        }
    }
}

impl Eq for Date {}

impl Ord for Date {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.d.cmp(&other.d) {
            Ordering::Equal => self.s.partial_cmp(&other.s).unwrap_or(Ordering::Equal),
            ord => ord,
        }
    }
}

impl Sub for Date {
    type Output = TimeDelta;

    fn sub(self, rhs: Date) -> TimeDelta {
        TimeDelta::from_seconds((self.d - rhs.d) as f64 * DAY_S + (self.s - rhs.s))
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (year, month, day, hour, minute, second, microsecond) = self.calendar();
        if microsecond == 0 {
            write!(
                f,
                "{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02} {}",
                self.scale
            )
        } else {
            write!(
                f,
                "{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}.{microsecond:06} {}",
                self.scale
            )
        }
    }
}

/// End bound of a [`DateRange`].
#[derive(Copy, Clone, Debug)]
pub enum RangeEnd {
    Date(Date),
    Delta(TimeDelta),
}

impl From<Date> for RangeEnd {
    fn from(date: Date) -> Self {
        Self::Date(date)
    }
}

impl From<TimeDelta> for RangeEnd {
    fn from(delta: TimeDelta) -> Self {
        Self::Delta(delta)
    }
}

/// Iterator over regularly spaced dates.
///
/// Yields `Result` items since every produced date re-queries the EOP store,
/// which may fail under the `error` missing-data policy.
#[derive(Clone, Debug)]
pub struct DateRange {
    pub start: Date,
    pub stop: Date,
    pub step: TimeDelta,
    pub inclusive: bool,
    current: Option<Date>,
}

impl DateRange {
    /// Number of dates this range will yield.
    pub fn len(&self) -> usize {
        let total = (self.stop - self.start) / self.step;
        if self.inclusive {
            total.floor() as usize + 1
        } else {
            total.ceil() as usize
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Iterator for DateRange {
    type Item = Result<Date, TimeError>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current?;

        let forward = self.step.total_seconds() > 0.0;
        let past_end = if self.inclusive {
            if forward {
                current > self.stop
            } else {
                current < self.stop
            }
        } else if forward {
            current >= self.stop
        } else {
            current <= self.stop
        };
        if past_end {
            self.current = None;
            return None;
        }

        match current.shift(self.step) {
            Ok(next) => {
                self.current = Some(next);
                Some(Ok(current))
            }
            Err(e) => {
                self.current = None;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod ut_date {
    use super::*;

    #[test]
    fn test_civil_roundtrip() {
        for &(y, m, d) in &[
            (1858, 11, 17),
            (1970, 1, 1),
            (2000, 2, 29),
            (2015, 12, 5),
            (2100, 3, 1),
        ] {
            let z = days_from_civil(y, m, d);
            assert_eq!(civil_from_days(z), (y, m, d));
        }
        // MJD origin
        assert_eq!(days_from_civil(1858, 11, 17), -UNIX_MJD);
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2000, 2), 29);
        assert_eq!(days_in_month(1900, 2), 28);
        assert_eq!(days_in_month(2016, 2), 29);
        assert_eq!(days_in_month(2015, 4), 30);
    }

    #[test]
    fn test_timedelta_ops() {
        let dt = TimeDelta::from_minutes(2.0) + TimeDelta::from_seconds(5.0);
        assert_eq!(dt.total_seconds(), 125.0);
        assert_eq!((-dt).total_seconds(), -125.0);
        assert_eq!((dt * 2.0).total_seconds(), 250.0);
        assert_eq!(dt / TimeDelta::from_seconds(25.0), 5.0);
        assert_eq!((-dt).signum(), -1.0);
    }
}
