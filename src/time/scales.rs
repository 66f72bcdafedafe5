/*
 * Orrery Astrodynamics Core
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Time scales and their pairwise offsets.
//!
//! The six scales form a small graph (GPS—TAI—UTC—UT1 and TDB—TT—TAI); a
//! conversion composes the offsets along the shortest path, negating the
//! ones traversed backward.

use std::fmt;
use std::sync::OnceLock;

use snafu::prelude::*;

use crate::constants::{J2000_JD, JD_MJD, JULIAN_CENTURY_D};
use crate::errors::{NoScalePathSnafu, TimeError, UnknownScaleSnafu};
use crate::graph::Graph;
use crate::time::Eop;

/// One of the known time scales.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TimeScale {
    /// Universal Time
    Ut1,
    /// Coordinated Universal Time
    Utc,
    /// International Atomic Time
    Tai,
    /// Terrestrial Time
    Tt,
    /// GPS Time
    Gps,
    /// Barycentric Dynamical Time
    Tdb,
}

/// Every known scale, for exhaustive sweeps.
pub const ALL_SCALES: [TimeScale; 6] = [
    TimeScale::Ut1,
    TimeScale::Utc,
    TimeScale::Tai,
    TimeScale::Tt,
    TimeScale::Gps,
    TimeScale::Tdb,
];

impl TimeScale {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ut1 => "UT1",
            Self::Utc => "UTC",
            Self::Tai => "TAI",
            Self::Tt => "TT",
            Self::Gps => "GPS",
            Self::Tdb => "TDB",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, TimeError> {
        match name.to_uppercase().as_str() {
            "UT1" => Ok(Self::Ut1),
            "UTC" => Ok(Self::Utc),
            "TAI" => Ok(Self::Tai),
            "TT" => Ok(Self::Tt),
            "GPS" => Ok(Self::Gps),
            "TDB" => Ok(Self::Tdb),
            _ => UnknownScaleSnafu { name }.fail(),
        }
    }

    fn index(&self) -> usize {
        ALL_SCALES.iter().position(|s| s == self).unwrap()
    }
}

impl fmt::Display for TimeScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn scale_graph() -> &'static Graph {
    static GRAPH: OnceLock<Graph> = OnceLock::new();
    GRAPH.get_or_init(|| {
        let mut g = Graph::new();
        for scale in ALL_SCALES {
            g.add_node(scale.name());
        }
        let idx = |s: TimeScale| s.index();
        g.add_edge(idx(TimeScale::Gps), idx(TimeScale::Tai));
        g.add_edge(idx(TimeScale::Tai), idx(TimeScale::Utc));
        g.add_edge(idx(TimeScale::Utc), idx(TimeScale::Ut1));
        g.add_edge(idx(TimeScale::Tdb), idx(TimeScale::Tt));
        g.add_edge(idx(TimeScale::Tt), idx(TimeScale::Tai));
        g
    })
}

/// TDB - TT, from the reduced two-term expression.
///
/// The complete analytical formula has over a hundred terms (cf. Vallado);
/// this keeps the dominant annual terms, accurate to a few microseconds.
fn tdb_minus_tt(mjd: f64) -> f64 {
    let jd = mjd + JD_MJD;
    let jj = (jd - J2000_JD) / JULIAN_CENTURY_D;
    let m = (357.5277233_f64 + 35999.05034 * jj).to_radians();
    let delta_lambda = (246.11_f64 + 0.90251792 * (jd - J2000_JD)).to_radians();
    0.001657 * m.sin() + 0.000022 * delta_lambda.sin()
}

/// Offset of scale `two` relative to scale `one` ("two minus one"), if the
/// pair is one of the known relations.
fn pair_offset(one: TimeScale, two: TimeScale, mjd: f64, eop: &Eop) -> Option<f64> {
    use TimeScale::*;
    match (one, two) {
        (Utc, Ut1) => Some(eop.ut1_utc),
        (Utc, Tai) => Some(eop.tai_utc),
        (Tai, Tt) => Some(32.184),
        (Gps, Tai) => Some(19.0),
        (Tt, Tdb) => Some(tdb_minus_tt(mjd)),
        _ => None,
    }
}

/// Offset in seconds to apply in order to express an instant tagged in
/// `from` into scale `to`, composed along the scale graph.
pub(crate) fn offset(
    from: TimeScale,
    to: TimeScale,
    mjd: f64,
    eop: &Eop,
) -> Result<f64, TimeError> {
    if from == to {
        return Ok(0.0);
    }

    let graph = scale_graph();
    let steps = graph
        .steps(from.index(), to.index())
        .ok()
        .context(NoScalePathSnafu {
            from: from.name(),
            to: to.name(),
        })?;

    let mut delta = 0.0;
    for (a, b) in steps {
        let (one, two) = (ALL_SCALES[a], ALL_SCALES[b]);
        if let Some(d) = pair_offset(one, two, mjd, eop) {
            delta += d;
        } else if let Some(d) = pair_offset(two, one, mjd, eop) {
            delta -= d;
        } else {
            return NoScalePathSnafu {
                from: one.name(),
                to: two.name(),
            }
            .fail();
        }
    }
    Ok(delta)
}

#[cfg(test)]
mod ut_scales {
    use super::*;

    fn eop() -> Eop {
        Eop {
            ut1_utc: 0.1242558,
            tai_utc: 36.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_direct_offsets() {
        let eop = eop();
        let mjd = 57362.0;
        assert_eq!(
            offset(TimeScale::Utc, TimeScale::Tai, mjd, &eop).unwrap(),
            36.0
        );
        assert_eq!(
            offset(TimeScale::Utc, TimeScale::Ut1, mjd, &eop).unwrap(),
            0.1242558
        );
        // Composed: UTC -> TAI -> TT
        assert_eq!(
            offset(TimeScale::Utc, TimeScale::Tt, mjd, &eop).unwrap(),
            36.0 + 32.184
        );
        // Reverse edges negate
        assert_eq!(
            offset(TimeScale::Tt, TimeScale::Utc, mjd, &eop).unwrap(),
            -(36.0 + 32.184)
        );
        // GPS through TAI
        assert_eq!(
            offset(TimeScale::Utc, TimeScale::Gps, mjd, &eop).unwrap(),
            36.0 - 19.0
        );
    }

    #[test]
    fn test_roundtrip_composition() {
        let eop = eop();
        let mjd = 57362.0;
        for a in ALL_SCALES {
            for b in ALL_SCALES {
                let fwd = offset(a, b, mjd, &eop).unwrap();
                let back = offset(b, a, mjd, &eop).unwrap();
                assert!(
                    (fwd + back).abs() < 1e-12,
                    "{a} -> {b} offsets do not cancel"
                );
            }
        }
    }

    #[test]
    fn test_unknown_scale_name() {
        assert!(matches!(
            TimeScale::from_name("unknown"),
            Err(TimeError::UnknownScale { .. })
        ));
        assert_eq!(TimeScale::from_name("utc").unwrap(), TimeScale::Utc);
    }
}
