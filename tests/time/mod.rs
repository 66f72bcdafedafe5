/*
 * Orrery Astrodynamics Core
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use orrery::errors::TimeError;
use orrery::time::scales::ALL_SCALES;
use orrery::time::{Date, TimeDelta, TimeScale};

use crate::common::setup;

#[test]
fn creation() {
    setup();

    let t = Date::from_ymd(2015, 12, 5, TimeScale::Utc).unwrap();
    assert_eq!(t.d(), 57361);
    assert_eq!(t.s(), 0.0);

    let t = Date::new(2015, 12, 5, 12, 0, 0, 0, TimeScale::Utc).unwrap();
    assert_eq!(t.d(), 57361);
    assert_eq!(t.s(), 43200.0);
    assert_eq!(t.to_string(), "2015-12-05T12:00:00 UTC");

    let t = Date::from_day_seconds(57388, 0.0, TimeScale::Utc).unwrap();
    assert_eq!(t.d(), 57388);
    assert_eq!(t.s(), 0.0);
    let (y, m, d, ..) = t.calendar();
    assert_eq!((y, m, d), (2016, 1, 1));

    let t = Date::from_mjd(57388.5, TimeScale::Utc).unwrap();
    assert_eq!(t.d(), 57388);
    assert_eq!(t.s(), 43200.0);

    // Unknown scale names raise
    assert!(matches!(
        TimeScale::from_name("unknown"),
        Err(TimeError::UnknownScale { .. })
    ));

    // Invalid calendar dates raise
    assert!(Date::from_ymd(2015, 2, 30, TimeScale::Utc).is_err());
    assert!(Date::new(2015, 2, 3, 24, 0, 0, 0, TimeScale::Utc).is_err());
}

#[test]
fn operations() {
    setup();

    let t1 = Date::from_ymd(2015, 12, 6, TimeScale::Utc).unwrap();

    let t2 = t1.shift(TimeDelta::from_hours(2.0)).unwrap();
    assert_eq!(t2.d(), t1.d());
    assert_eq!(t2.s(), t1.s() + 2.0 * 3600.0);

    let t2 = t1.shift(TimeDelta::from_hours(-12.0)).unwrap();
    assert_eq!(t2.d(), t1.d() - 1);
    assert_eq!(t2.s(), 43200.0);

    let delta = t1 - Date::from_ymd(2015, 12, 4, TimeScale::Utc).unwrap();
    assert_eq!(delta.total_seconds(), 2.0 * 86400.0);
}

#[test]
fn change_scale() {
    setup();

    let t = Date::from_ymd(2015, 12, 6, TimeScale::Utc).unwrap();
    assert_eq!(t.scale(), TimeScale::Utc);

    let t2 = t.change_scale(TimeScale::Tt).unwrap();
    assert_eq!(t2.to_string(), "2015-12-06T00:01:08.184000 TT");

    let t3 = t.change_scale(TimeScale::Gps).unwrap();
    assert_eq!(t3.to_string(), "2015-12-06T00:00:17 GPS");

    let t4 = t.change_scale(TimeScale::Ut1).unwrap();
    assert_eq!(t4.to_string(), "2015-12-06T00:00:00.124256 UT1");

    let t5 = t.change_scale(TimeScale::Tdb).unwrap();
    assert_eq!(t5.to_string(), "2015-12-06T00:01:08.183225 TDB");

    assert_eq!(
        t5.change_scale(TimeScale::Utc).unwrap().to_string(),
        "2015-12-06T00:00:00 UTC"
    );
}

#[test]
fn barycenter() {
    setup();

    let t = Date::new(2004, 5, 14, 16, 43, 0, 0, TimeScale::Utc).unwrap();

    let t2 = t.change_scale(TimeScale::Tt).unwrap();
    assert_eq!(t2.to_string(), "2004-05-14T16:44:04.184000 TT");

    // The complete analytical formula (100+ terms, cf. Vallado) would give
    // 16:44:04.185640; the reduced two-term expression is used here.
    let t3 = t2.change_scale(TimeScale::Tdb).unwrap();
    assert_eq!(t3.to_string(), "2004-05-14T16:44:04.185254 TDB");
}

#[test]
fn julian() {
    setup();

    let t = Date::new(2015, 12, 18, 22, 25, 0, 0, TimeScale::Utc).unwrap();
    assert!((t.mjd() - 57374.93402777778).abs() < 1e-9);
    assert!((t.jd() - 2457375.434027778).abs() < 1e-9);
    assert!(
        (t.change_scale(TimeScale::Tt).unwrap().julian_century() - 0.1596286055289367).abs()
            < 1e-12
    );
}

#[test]
fn comparison() {
    setup();

    let t1 = Date::from_ymd(2016, 11, 14, TimeScale::Utc).unwrap();
    let t2 = Date::new(2016, 11, 14, 12, 0, 0, 0, TimeScale::Utc).unwrap();
    assert!(t2 > t1);

    // Different scales compare on the same (TAI) axis
    let t1 = Date::from_ymd(2016, 11, 14, TimeScale::Utc).unwrap();
    let t2 = Date::from_ymd(2016, 11, 14, TimeScale::Tai).unwrap();
    assert!(t2 < t1);

    let t2 = Date::new(2016, 11, 14, 0, 0, 36, 0, TimeScale::Tai).unwrap();
    assert!(t1 == t2);
    assert!(t1 >= t2);
    assert!(t1 <= t2);
}

#[test]
fn leap_second() {
    setup();

    let t1 = Date::new(2016, 12, 31, 23, 59, 59, 0, TimeScale::Utc).unwrap();
    let t2 = Date::from_ymd(2017, 1, 1, TimeScale::Utc).unwrap();
    let t3 = Date::new(2017, 1, 1, 0, 0, 36, 0, TimeScale::Tai).unwrap();

    assert_eq!(t1, Date::new(2017, 1, 1, 0, 0, 35, 0, TimeScale::Tai).unwrap());
    assert_eq!(t2, Date::new(2017, 1, 1, 0, 0, 37, 0, TimeScale::Tai).unwrap());

    // The leap second shows up in elapsed time across the boundary
    assert_eq!((t2 - t1).total_seconds(), 2.0);
    assert_eq!((t3 - t1).total_seconds(), 1.0);
}

#[test]
fn range() {
    setup();

    let start = Date::new(2016, 11, 16, 22, 38, 0, 0, TimeScale::Utc).unwrap();
    let stop = TimeDelta::from_hours(1.0);
    let step = TimeDelta::from_seconds(30.0);

    let range = Date::range(start, stop, step, false).unwrap();
    assert_eq!(range.len(), 120);
    assert_eq!(range.map(Result::unwrap).count(), 120);

    let range = Date::range(start, stop, step, true).unwrap();
    assert_eq!(range.len(), 121);
    let dates: Vec<Date> = range.map(Result::unwrap).collect();
    assert_eq!(dates[0], start);
    assert_eq!(*dates.last().unwrap(), start.shift(stop).unwrap());

    // Backward
    let back = Date::range(
        start,
        TimeDelta::from_minutes(-2.0),
        TimeDelta::from_seconds(-30.0),
        false,
    )
    .unwrap();
    assert_eq!(back.len(), 4);

    // Step of the wrong sign
    assert!(matches!(
        Date::range(start, TimeDelta::from_minutes(-2.0), step, false),
        Err(TimeError::IncoherentRange)
    ));
    // Null step
    assert!(matches!(
        Date::range(start, stop, TimeDelta::ZERO, false),
        Err(TimeError::NullStep)
    ));
}

#[test]
fn uneven_range() {
    setup();

    let start = Date::new(2021, 2, 9, 22, 35, 0, 0, TimeScale::Utc).unwrap();
    let stop = TimeDelta::from_seconds(3637.0);
    let step = TimeDelta::from_seconds(17.0);

    let range = Date::range(start, stop, step, false).unwrap();
    let len = range.len();
    let dates: Vec<Date> = range.map(Result::unwrap).collect();
    assert_eq!(len, dates.len());
    assert_eq!(dates[0], start);
    assert!(*dates.last().unwrap() < start.shift(stop).unwrap());
    assert_eq!(len, (3637.0_f64 / 17.0).ceil() as usize);
}

/// Time scale scenario from Vallado: 2004-04-06 07:51:28.386009 UTC with
/// ut1_utc = -0.4399619 s and tai_utc = 32 s.
#[test]
fn vallado_time_scales() {
    setup();

    let d = Date::new(2004, 4, 6, 7, 51, 28, 386009, TimeScale::Utc).unwrap();

    let tt = d.change_scale(TimeScale::Tt).unwrap();
    assert_eq!(tt.to_string(), "2004-04-06T07:52:32.570009 TT");

    let ut1 = d.change_scale(TimeScale::Ut1).unwrap();
    assert!((ut1.s() - (d.s() - 0.4399619)).abs() < 1e-9);

    let tdb = d.change_scale(TimeScale::Tdb).unwrap();
    let tdb_minus_tt = (tdb.mjd() - tt.mjd()) * 86400.0;
    assert!(
        (tdb_minus_tt - 1.3e-3).abs() < 2e-4,
        "TDB-TT = {tdb_minus_tt}"
    );
}

/// For all scale pairs, converting there and back lands on the same
/// instant within one tick.
#[test]
fn scale_roundtrips() {
    setup();

    let d = Date::new(2015, 12, 6, 3, 21, 56, 500000, TimeScale::Utc).unwrap();
    for s1 in ALL_SCALES {
        for s2 in ALL_SCALES {
            let there = d.change_scale(s1).unwrap();
            let and_back = there
                .change_scale(s2)
                .unwrap()
                .change_scale(s1)
                .unwrap();
            let delta = (and_back - there).total_seconds().abs();
            assert!(
                delta <= TimeDelta::TICK.total_seconds(),
                "{s1} -> {s2} -> {s1} drifts by {delta} s"
            );
        }
    }
}
