/*
 * Orrery Astrodynamics Core
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! The orientation graph: the rotation part of reference frames.
//!
//! Each edge carries an operator producing the rotation matrix (and angular
//! rate, when the destination rotates relative to the source) between two
//! named orientations. A conversion composes the operators along the
//! shortest path, transposing the ones traversed backward; when a rate is
//! present the 3x3 rotation is expanded to 6x6 so position and velocity
//! transform consistently.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use snafu::prelude::*;

use crate::errors::{FrameError, FrameTimeSnafu, OrientationPathSnafu, UnknownOrientationSnafu};
use crate::frames::frame::Frame;
use crate::frames::local::{to_local, LocalFrame};
use crate::frames::{iau1980, iau2010};
use crate::math::rotation::expand;
use crate::math::{Matrix3, Matrix6, Vector3};
use crate::orbits::forms::Form;
use crate::propagators::StateSource;
use crate::time::Date;

/// Operator attached to an orientation edge, evaluated at a date.
#[derive(Clone)]
pub(crate) enum RotProvider {
    /// Planar rotation by the reduced 4-term equinox equation.
    TemeToTod,
    /// Apparent sidereal rotation, with the Earth rotation rate.
    PefToTod,
    /// IAU 1980 nutation.
    TodToMod,
    /// IAU 1976 precession.
    ModToEme2000,
    /// Polar motion, IAU 1980 form.
    ItrfToPef,
    /// Polar motion, IAU 2010 form.
    ItrfToTirf,
    /// Earth rotation angle, with the Earth rotation rate.
    TirfToCirf,
    /// CIO-based precession-nutation.
    CirfToGcrf,
    /// Constant rotation table.
    Fixed(Matrix3),
    /// Ground-station orientation relative to its parent.
    Topocentric { lat: f64, lon: f64, heading: f64 },
    /// Local orbital orientation attached to a moving state.
    LocalOrbital {
        source: Arc<dyn StateSource>,
        lof: LocalFrame,
        parent: Frame,
    },
}

impl RotProvider {
    /// Rotation from the edge's first node to its second, and the angular
    /// velocity of the second relative to the first when not static.
    fn evaluate(&self, date: &Date) -> Result<(Matrix3, Option<Vector3>), FrameError> {
        match self {
            Self::TemeToTod => {
                let equin = iau1980::equinox(date, false, 4, false).context(FrameTimeSnafu)?;
                Ok((crate::math::rotation::rot3(-equin.to_radians()), None))
            }
            Self::PefToTod => {
                let m = iau1980::sideral(date, 0.0, iau1980::SideralModel::Apparent, false, 106)
                    .context(FrameTimeSnafu)?;
                Ok((m, Some(-iau1980::rate(date))))
            }
            Self::TodToMod => {
                let m = iau1980::nutation(date, false, 106).context(FrameTimeSnafu)?;
                Ok((m, None))
            }
            Self::ModToEme2000 => {
                let m = iau1980::precession(date).context(FrameTimeSnafu)?;
                Ok((m, None))
            }
            Self::ItrfToPef => Ok((iau1980::earth_orientation(date), None)),
            Self::ItrfToTirf => Ok((
                iau2010::earth_orientation(date).context(FrameTimeSnafu)?,
                None,
            )),
            Self::TirfToCirf => {
                let m = iau2010::sideral(date).context(FrameTimeSnafu)?;
                Ok((m, Some(-iau2010::rate(date))))
            }
            Self::CirfToGcrf => Ok((
                iau2010::precession_nutation(date).context(FrameTimeSnafu)?,
                None,
            )),
            Self::Fixed(m) => Ok((*m, None)),
            Self::Topocentric { lat, lon, heading } => {
                use crate::math::rotation::{rot2, rot3};
                use std::f64::consts::FRAC_PI_2;
                Ok((rot3(-lon) * rot2(lat - FRAC_PI_2) * rot3(*heading), None))
            }
            Self::LocalOrbital {
                source,
                lof,
                parent,
            } => {
                let sv = source
                    .state_at(date)
                    .map_err(|source| FrameError::DynamicOffset {
                        source: Box::new(source),
                    })?;
                let sv = sv
                    .with_frame(parent)?
                    .with_form(Form::Cartesian)
                    .map_err(|source| FrameError::FrameForm {
                        source: Box::new(source),
                    })?;
                Ok((to_local(*lof, sv.coord()).transpose(), None))
            }
        }
    }
}

struct OrientGraph {
    graph: crate::graph::Graph,
    providers: HashMap<(usize, usize), RotProvider>,
}

fn registry() -> &'static RwLock<OrientGraph> {
    static REGISTRY: OnceLock<RwLock<OrientGraph>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut graph = crate::graph::Graph::new();
        for name in [
            "ITRF", "PEF", "TOD", "MOD", "EME2000", "G50", "TEME", "TIRF", "CIRF", "GCRF",
        ] {
            graph.add_node(name);
        }

        let mut providers = HashMap::new();
        let mut edge = |graph: &mut crate::graph::Graph, a: usize, b: usize, p: RotProvider| {
            graph.add_edge(a, b);
            providers.insert((a, b), p);
        };

        // IAU 1980 leg
        edge(&mut graph, ITRF.0, PEF.0, RotProvider::ItrfToPef);
        edge(&mut graph, PEF.0, TOD.0, RotProvider::PefToTod);
        edge(&mut graph, TOD.0, MOD.0, RotProvider::TodToMod);
        edge(&mut graph, MOD.0, EME2000.0, RotProvider::ModToEme2000);
        edge(&mut graph, TEME.0, TOD.0, RotProvider::TemeToTod);

        // IAU 2010 leg
        edge(&mut graph, ITRF.0, TIRF.0, RotProvider::ItrfToTirf);
        edge(&mut graph, TIRF.0, CIRF.0, RotProvider::TirfToCirf);
        edge(&mut graph, CIRF.0, GCRF.0, RotProvider::CirfToGcrf);

        // Constant rotation tables
        edge(
            &mut graph,
            G50.0,
            EME2000.0,
            RotProvider::Fixed(Matrix3::new(
                0.9999256794956877,
                -0.0111814832204662,
                -0.0048590038153592,
                0.0111814832391717,
                0.9999374848933135,
                -0.0000271625947142,
                0.0048590037723143,
                -0.0000271702937440,
                0.9999881946023742,
            )),
        );
        edge(
            &mut graph,
            GCRF.0,
            EME2000.0,
            RotProvider::Fixed(Matrix3::new(
                0.9999999999999942,
                0.0000000707827948,
                -0.0000000805621738,
                -0.0000000707827974,
                0.9999999999999969,
                -0.0000000330604088,
                0.0000000805621715,
                0.0000000330604145,
                0.9999999999999962,
            )),
        );

        RwLock::new(OrientGraph { graph, providers })
    })
}

/// A node of the orientation graph.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Orientation(pub(crate) usize);

pub const ITRF: Orientation = Orientation(0);
pub const PEF: Orientation = Orientation(1);
pub const TOD: Orientation = Orientation(2);
pub const MOD: Orientation = Orientation(3);
pub const EME2000: Orientation = Orientation(4);
pub const G50: Orientation = Orientation(5);
pub const TEME: Orientation = Orientation(6);
pub const TIRF: Orientation = Orientation(7);
pub const CIRF: Orientation = Orientation(8);
pub const GCRF: Orientation = Orientation(9);

impl Orientation {
    pub fn from_name(name: &str) -> Result<Self, FrameError> {
        let reg = registry().read().unwrap();
        reg.graph
            .index_of(name)
            .map(Orientation)
            .context(UnknownOrientationSnafu { name })
    }

    pub fn name(&self) -> String {
        registry().read().unwrap().graph.name(self.0).to_owned()
    }

    /// Registers a new orientation attached to `parent` through the given
    /// operator, and returns it.
    pub(crate) fn register(
        name: &str,
        parent: Orientation,
        provider: RotProvider,
    ) -> Orientation {
        let mut reg = registry().write().unwrap();
        let node = reg.graph.add_node(name);
        reg.graph.add_edge(node, parent.0);
        reg.providers.insert((node, parent.0), provider);
        Orientation(node)
    }

    /// Ground-station orientation, parametrized by geodetic coordinates and
    /// heading, relative to `parent` (ITRF for Earth stations).
    pub fn topocentric(
        name: &str,
        lat: f64,
        lon: f64,
        heading: f64,
        parent: Orientation,
    ) -> Orientation {
        Self::register(name, parent, RotProvider::Topocentric { lat, lon, heading })
    }

    /// Local orbital orientation (QSW or TNW) attached to a moving state.
    pub fn local_orbital(
        name: &str,
        source: Arc<dyn StateSource>,
        lof: LocalFrame,
        parent: &Frame,
    ) -> Orientation {
        Self::register(
            name,
            parent.orientation(),
            RotProvider::LocalOrbital {
                source,
                lof,
                parent: parent.clone(),
            },
        )
    }

    /// 6x6 rotation matrix transforming a state vector expressed in this
    /// orientation into `target`.
    pub fn convert_to(&self, date: &Date, target: Orientation) -> Result<Matrix6, FrameError> {
        // The providers are cloned out of the registry before evaluation:
        // a local-orbital edge may itself trigger a frame conversion.
        let legs: Vec<(RotProvider, bool)> = {
            let reg = registry().read().unwrap();
            let steps = reg
                .graph
                .steps(self.0, target.0)
                .context(OrientationPathSnafu)?;
            steps
                .into_iter()
                .map(|(a, b)| {
                    if let Some(p) = reg.providers.get(&(a, b)) {
                        Ok((p.clone(), false))
                    } else if let Some(p) = reg.providers.get(&(b, a)) {
                        Ok((p.clone(), true))
                    } else {
                        unreachable!("edge without operator in the orientation graph")
                    }
                })
                .collect::<Result<_, FrameError>>()?
        };

        let mut out = Matrix6::identity();
        for (provider, reversed) in legs {
            let (mut m, mut rate) = provider.evaluate(date)?;
            if reversed {
                m = m.transpose();
                rate = rate.map(|r| -r);
            }
            out = expand(&m, rate.as_ref()) * out;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod ut_orient {
    use super::*;

    #[test]
    fn test_builtin_names() {
        assert_eq!(Orientation::from_name("EME2000").unwrap(), EME2000);
        assert_eq!(Orientation::from_name("ITRF").unwrap(), ITRF);
        assert!(Orientation::from_name("nope").is_err());
        assert_eq!(GCRF.name(), "GCRF");
    }

    #[test]
    fn test_fixed_rotation_orthonormal() {
        let date = Date::from_mjd(53101.0, crate::time::TimeScale::Utc).unwrap();
        let m = G50.convert_to(&date, EME2000).unwrap();
        let r3 = m.fixed_view::<3, 3>(0, 0);
        let delta = (r3 * r3.transpose() - Matrix3::identity()).norm();
        assert!(delta < 1e-9);
    }
}
