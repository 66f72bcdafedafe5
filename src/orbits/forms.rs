/*
 * Orrery Astrodynamics Core
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! The different meanings the 6 components of a state vector can take, and
//! the conversions between them.
//!
//! Forms are nodes of a routing graph; a conversion composes the pairwise
//! converters along the shortest path, so every form can reach every other.
//! Converters work on raw 6-vectors: the caller (the state vector) carries
//! the form tag.

use std::sync::OnceLock;

use snafu::prelude::*;

use crate::bodies::Body;
use crate::errors::{FormError, FormPathSnafu, PhysicsError, UnknownFormSnafu};
use crate::graph::Graph;
use crate::math::{norm_2pi, Vector3, Vector6};

/// A representation of the 6 components of a state vector.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Form {
    Cartesian,
    Spherical,
    Keplerian,
    KeplerianEccentric,
    KeplerianMean,
    KeplerianCircular,
    MeanCircular,
    Equinoctial,
    Cylindrical,
    Tle,
}

const ALL_FORMS: [Form; 10] = [
    Form::Cartesian,
    Form::Spherical,
    Form::Keplerian,
    Form::KeplerianEccentric,
    Form::KeplerianMean,
    Form::KeplerianCircular,
    Form::MeanCircular,
    Form::Equinoctial,
    Form::Cylindrical,
    Form::Tle,
];

impl Form {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Cartesian => "cartesian",
            Self::Spherical => "spherical",
            Self::Keplerian => "keplerian",
            Self::KeplerianEccentric => "keplerian_eccentric",
            Self::KeplerianMean => "keplerian_mean",
            Self::KeplerianCircular => "keplerian_circular",
            Self::MeanCircular => "mean_circular",
            Self::Equinoctial => "equinoctial",
            Self::Cylindrical => "cylindrical",
            Self::Tle => "tle",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, FormError> {
        ALL_FORMS
            .into_iter()
            .find(|f| f.name() == name.to_lowercase())
            .context(UnknownFormSnafu { name })
    }

    /// Names of the 6 components, in storage order.
    pub fn param_names(&self) -> [&'static str; 6] {
        match self {
            Self::Cartesian => ["x", "y", "z", "vx", "vy", "vz"],
            Self::Spherical => ["r", "theta", "phi", "r_dot", "theta_dot", "phi_dot"],
            Self::Keplerian => ["a", "e", "i", "raan", "aop", "nu"],
            Self::KeplerianEccentric => ["a", "e", "i", "raan", "aop", "E"],
            Self::KeplerianMean => ["a", "e", "i", "raan", "aop", "M"],
            Self::KeplerianCircular => ["a", "ex", "ey", "i", "raan", "u"],
            Self::MeanCircular => ["a", "ex", "ey", "i", "raan", "alpha"],
            Self::Equinoctial => ["a", "ex", "ey", "hx", "hy", "lv"],
            Self::Cylindrical => ["rho", "theta", "z", "rho_dot", "theta_dot", "z_dot"],
            Self::Tle => ["i", "raan", "e", "aop", "M", "n"],
        }
    }

    fn index(&self) -> usize {
        ALL_FORMS.iter().position(|f| f == self).unwrap()
    }
}

impl std::fmt::Display for Form {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn form_graph() -> &'static Graph {
    static GRAPH: OnceLock<Graph> = OnceLock::new();
    GRAPH.get_or_init(|| {
        let mut g = Graph::new();
        for form in ALL_FORMS {
            g.add_node(form.name());
        }
        let idx = |f: Form| f.index();
        g.add_edge(idx(Form::Spherical), idx(Form::Cartesian));
        g.add_edge(idx(Form::Cartesian), idx(Form::Keplerian));
        g.add_edge(idx(Form::Keplerian), idx(Form::KeplerianEccentric));
        g.add_edge(idx(Form::KeplerianEccentric), idx(Form::KeplerianMean));
        g.add_edge(idx(Form::KeplerianMean), idx(Form::Tle));
        g.add_edge(idx(Form::Keplerian), idx(Form::KeplerianCircular));
        g.add_edge(idx(Form::KeplerianMean), idx(Form::MeanCircular));
        g.add_edge(idx(Form::Keplerian), idx(Form::Equinoctial));
        g.add_edge(idx(Form::Cartesian), idx(Form::Cylindrical));
        g
    })
}

/// Converts a raw 6-vector between two forms, routing through intermediate
/// representations as needed. `body` provides µ for the Keplerian family.
pub fn convert(coord: &Vector6, from: Form, to: Form, body: &Body) -> Result<Vector6, FormError> {
    if from == to {
        return Ok(*coord);
    }

    let steps = form_graph()
        .steps(from.index(), to.index())
        .context(FormPathSnafu)?;

    let mut out = *coord;
    for (a, b) in steps {
        out = edge(ALL_FORMS[a], ALL_FORMS[b], &out, body)
            .map_err(|source| FormError::FormPhysics { source })?;
    }
    Ok(out)
}

fn edge(from: Form, to: Form, coord: &Vector6, body: &Body) -> Result<Vector6, PhysicsError> {
    use Form::*;
    match (from, to) {
        (Cartesian, Keplerian) => cartesian_to_keplerian(coord, body.mu()),
        (Keplerian, Cartesian) => Ok(keplerian_to_cartesian(coord, body.mu())),
        (Keplerian, KeplerianEccentric) => Ok(keplerian_to_eccentric(coord)),
        (KeplerianEccentric, Keplerian) => Ok(eccentric_to_keplerian(coord)),
        (KeplerianEccentric, KeplerianMean) => Ok(eccentric_to_mean(coord)),
        (KeplerianMean, KeplerianEccentric) => Ok(mean_to_eccentric(coord)),
        (Keplerian, KeplerianCircular) => Ok(keplerian_to_circular(coord)),
        (KeplerianCircular, Keplerian) => Ok(circular_to_keplerian(coord)),
        (KeplerianMean, MeanCircular) => Ok(mean_to_mean_circular(coord)),
        (MeanCircular, KeplerianMean) => Ok(mean_circular_to_mean(coord)),
        (KeplerianMean, Tle) => Ok(mean_to_tle(coord, body.mu())),
        (Tle, KeplerianMean) => Ok(tle_to_mean(coord, body.mu())),
        (Cartesian, Spherical) => Ok(cartesian_to_spherical(coord)),
        (Spherical, Cartesian) => Ok(spherical_to_cartesian(coord)),
        (Keplerian, Equinoctial) => Ok(keplerian_to_equinoctial(coord)),
        (Equinoctial, Keplerian) => Ok(equinoctial_to_keplerian(coord)),
        (Cartesian, Cylindrical) => Ok(cartesian_to_cylindrical(coord)),
        (Cylindrical, Cartesian) => Ok(cylindrical_to_cartesian(coord)),
        _ => unreachable!("no converter between {from} and {to}"),
    }
}

/// Cartesian (position and velocity) to classical Keplerian elements.
fn cartesian_to_keplerian(coord: &Vector6, mu: f64) -> Result<Vector6, PhysicsError> {
    let r: Vector3 = coord.fixed_rows::<3>(0).into();
    let v: Vector3 = coord.fixed_rows::<3>(3).into();

    let h = r.cross(&v);
    let h_norm = h.norm();
    let r_norm = r.norm();
    let v_norm = v.norm();

    // Specific energy
    let energy = v_norm.powi(2) / 2.0 - mu / r_norm;
    let a = -mu / (2.0 * energy);
    // Rounding can push a circular orbit infinitesimally below e² = 0
    let e = (1.0 - h_norm.powi(2) / (a * mu)).max(0.0).sqrt();
    let p = a * (1.0 - e.powi(2));
    let i = (h[2] / h_norm).acos();
    let raan = norm_2pi(h[0].atan2(-h[1]));

    let aop_nu = (r[2] / i.sin()).atan2(r[0] * raan.cos() + r[1] * raan.sin());
    let nu = norm_2pi(((p / mu).sqrt() * v.dot(&r)).atan2(p - r_norm));
    let aop = norm_2pi(aop_nu - nu);

    ensure!(
        a.is_finite() && e.is_finite(),
        crate::errors::InfiniteValueSnafu {
            action: "converting cartesian to keplerian"
        }
    );

    Ok(Vector6::new(a, e, i, raan, aop, nu))
}

/// Classical Keplerian elements to cartesian.
fn keplerian_to_cartesian(coord: &Vector6, mu: f64) -> Vector6 {
    let (a, e, i, raan, aop, nu) = unpack(coord);

    let p = a * (1.0 - e.powi(2));
    let r = p / (1.0 + e * nu.cos());
    let h = (mu * p).sqrt();

    let (sin_raan, cos_raan) = raan.sin_cos();
    let (sin_i, cos_i) = i.sin_cos();
    let (sin_aop_nu, cos_aop_nu) = (aop + nu).sin_cos();

    let x = r * (cos_raan * cos_aop_nu - sin_raan * sin_aop_nu * cos_i);
    let y = r * (sin_raan * cos_aop_nu + cos_raan * sin_aop_nu * cos_i);
    let z = r * sin_i * sin_aop_nu;

    let vx = x * h * e / (r * p) * nu.sin() - h / r * (cos_raan * sin_aop_nu + sin_raan * cos_aop_nu * cos_i);
    let vy = y * h * e / (r * p) * nu.sin() - h / r * (sin_raan * sin_aop_nu - cos_raan * cos_aop_nu * cos_i);
    let vz = z * h * e / (r * p) * nu.sin() + h / r * sin_i * cos_aop_nu;

    Vector6::new(x, y, z, vx, vy, vz)
}

/// True anomaly to eccentric (or hyperbolic) anomaly.
fn keplerian_to_eccentric(coord: &Vector6) -> Vector6 {
    let (a, e, i, raan, aop, nu) = unpack(coord);

    let anomaly = if e < 1.0 {
        let cos_e = (e + nu.cos()) / (1.0 + e * nu.cos());
        let sin_e = (nu.sin() * (1.0 - e.powi(2)).sqrt()) / (1.0 + e * nu.cos());
        norm_2pi(sin_e.atan2(cos_e))
    } else {
        // Hyperbolic case, E usually noted H
        let cosh_h = (e + nu.cos()) / (1.0 + e * nu.cos());
        let sinh_h = (nu.sin() * (e.powi(2) - 1.0).sqrt()) / (1.0 + e * nu.cos());
        (sinh_h / cosh_h).atanh()
    };

    Vector6::new(a, e, i, raan, aop, anomaly)
}

/// Eccentric (or hyperbolic) anomaly to true anomaly.
fn eccentric_to_keplerian(coord: &Vector6) -> Vector6 {
    let (a, e, i, raan, aop, anom) = unpack(coord);

    let nu = if e < 1.0 {
        let cos_nu = (anom.cos() - e) / (1.0 - e * anom.cos());
        let sin_nu = (anom.sin() * (1.0 - e.powi(2)).sqrt()) / (1.0 - e * anom.cos());
        norm_2pi(sin_nu.atan2(cos_nu))
    } else {
        let cos_nu = (anom.cosh() - e) / (1.0 - e * anom.cosh());
        let sin_nu = -(anom.sinh() * (e.powi(2) - 1.0).sqrt()) / (1.0 - e * anom.cosh());
        norm_2pi(sin_nu.atan2(cos_nu))
    };

    Vector6::new(a, e, i, raan, aop, nu)
}

/// Kepler's equation, eccentric to mean anomaly.
fn eccentric_to_mean(coord: &Vector6) -> Vector6 {
    let (a, e, i, raan, aop, anom) = unpack(coord);
    let m = if e < 1.0 {
        anom - e * anom.sin()
    } else {
        e * anom.sinh() - anom
    };
    Vector6::new(a, e, i, raan, aop, m)
}

fn mean_to_eccentric(coord: &Vector6) -> Vector6 {
    let (a, e, i, raan, aop, m) = unpack(coord);
    Vector6::new(a, e, i, raan, aop, m_to_e(e, m))
}

/// Mean to eccentric (elliptic) or hyperbolic anomaly, by Newton iteration
/// on Kepler's equation (from Vallado).
///
/// Converges below 1e-8 for any eccentricity; the hyperbolic branch uses a
/// tiered initial guess depending on `e` and `|M|`.
pub fn m_to_e(e: f64, m: f64) -> f64 {
    use std::f64::consts::PI;
    const TOL: f64 = 1e-8;

    if e < 1.0 {
        let mut ecc = if (-PI < m && m < 0.0) || m > PI {
            m - e
        } else {
            m + e
        };
        loop {
            let next = ecc + (m - ecc + e * ecc.sin()) / (1.0 - e * ecc.cos());
            if (next - ecc).abs() < TOL {
                return next;
            }
            ecc = next;
        }
    } else {
        let mut h = if e < 1.6 {
            if (-PI < m && m < 0.0) || m > PI {
                m - e
            } else {
                m + e
            }
        } else if e < 3.6 && m.abs() > PI {
            m - m.signum() * e
        } else {
            m / (e - 1.0)
        };
        loop {
            let next = h + (m - e * h.sinh() + h) / (e * h.cosh() - 1.0);
            if (next - h).abs() < TOL {
                return next;
            }
            h = next;
        }
    }
}

/// Keplerian to near-circular elements (ex/ey eccentricity vector, argument
/// of latitude).
fn keplerian_to_circular(coord: &Vector6) -> Vector6 {
    let (a, e, i, raan, aop, nu) = unpack(coord);
    Vector6::new(
        a,
        e * aop.cos(),
        e * aop.sin(),
        i,
        raan,
        norm_2pi(aop + nu),
    )
}

fn circular_to_keplerian(coord: &Vector6) -> Vector6 {
    let (a, ex, ey, i, raan, u) = unpack(coord);
    let e = (ex.powi(2) + ey.powi(2)).sqrt();
    let aop = norm_2pi(ey.atan2(ex));
    let nu = norm_2pi(u - aop);
    Vector6::new(a, e, i, raan, aop, nu)
}

/// Mean Keplerian to mean near-circular elements (argument of latitude
/// carries the mean anomaly).
fn mean_to_mean_circular(coord: &Vector6) -> Vector6 {
    let (a, e, i, raan, aop, m) = unpack(coord);
    Vector6::new(
        a,
        e * aop.cos(),
        e * aop.sin(),
        i,
        raan,
        norm_2pi(aop + m),
    )
}

fn mean_circular_to_mean(coord: &Vector6) -> Vector6 {
    let (a, ex, ey, i, raan, alpha) = unpack(coord);
    let e = (ex.powi(2) + ey.powi(2)).sqrt();
    let aop = norm_2pi(ey.atan2(ex));
    let m = norm_2pi(alpha - aop);
    Vector6::new(a, e, i, raan, aop, m)
}

/// Mean Keplerian to the TLE arrangement (mean motion instead of
/// semi-major axis).
fn mean_to_tle(coord: &Vector6, mu: f64) -> Vector6 {
    let (a, e, i, raan, aop, m) = unpack(coord);
    let n = (mu / a.powi(3)).sqrt();
    Vector6::new(i, raan, e, aop, m, n)
}

fn tle_to_mean(coord: &Vector6, mu: f64) -> Vector6 {
    let (i, raan, e, aop, m, n) = unpack(coord);
    let a = (mu / n.powi(2)).cbrt();
    Vector6::new(a, e, i, raan, aop, m)
}

/// Cartesian to spherical, equatorial convention (not zenithal), with the
/// full 6D time derivatives.
fn cartesian_to_spherical(coord: &Vector6) -> Vector6 {
    let (x, y, z, vx, vy, vz) = unpack(coord);
    let r = (x.powi(2) + y.powi(2) + z.powi(2)).sqrt();
    let phi = (z / r).asin();
    let theta = y.atan2(x);

    let r_dot = (x * vx + y * vy + z * vz) / r;
    let phi_dot =
        (vz * (x.powi(2) + y.powi(2)) - z * (x * vx + y * vy)) / (r.powi(2) * (x.powi(2) + y.powi(2)).sqrt());
    let theta_dot = (x * vy - y * vx) / (x.powi(2) + y.powi(2));

    Vector6::new(r, theta, phi, r_dot, theta_dot, phi_dot)
}

fn spherical_to_cartesian(coord: &Vector6) -> Vector6 {
    let (r, theta, phi, r_dot, theta_dot, phi_dot) = unpack(coord);
    let x = r * phi.cos() * theta.cos();
    let y = r * phi.cos() * theta.sin();
    let z = r * phi.sin();

    let vx = r_dot * x / r - y * theta_dot - z * phi_dot * theta.cos();
    let vy = r_dot * y / r + x * theta_dot - z * phi_dot * theta.sin();
    let vz = r_dot * z / r + r * phi_dot * phi.cos();

    Vector6::new(x, y, z, vx, vy, vz)
}

/// Keplerian to equinoctial elements, with the true longitude.
fn keplerian_to_equinoctial(coord: &Vector6) -> Vector6 {
    let (a, e, i, raan, aop, nu) = unpack(coord);
    Vector6::new(
        a,
        e * (aop + raan).cos(),
        e * (aop + raan).sin(),
        (i / 2.0).tan() * raan.cos(),
        (i / 2.0).tan() * raan.sin(),
        norm_2pi(raan + aop + nu),
    )
}

fn equinoctial_to_keplerian(coord: &Vector6) -> Vector6 {
    let (a, ex, ey, hx, hy, lv) = unpack(coord);
    let e = (ex.powi(2) + ey.powi(2)).sqrt();
    let i = 2.0 * (hx.powi(2) + hy.powi(2)).sqrt().atan();
    let raan = norm_2pi(hy.atan2(hx));
    let aop = norm_2pi(ey.atan2(ex) - raan);
    let nu = norm_2pi(lv - raan - aop);
    Vector6::new(a, e, i, raan, aop, nu)
}

/// Cartesian to cylindrical, with time derivatives.
fn cartesian_to_cylindrical(coord: &Vector6) -> Vector6 {
    let (x, y, z, vx, vy, vz) = unpack(coord);
    let rho = (x.powi(2) + y.powi(2)).sqrt();
    let theta = y.atan2(x);
    let rho_dot = (x * vx + y * vy) / rho;
    let theta_dot = (x * vy - y * vx) / rho.powi(2);
    Vector6::new(rho, theta, z, rho_dot, theta_dot, vz)
}

fn cylindrical_to_cartesian(coord: &Vector6) -> Vector6 {
    let (rho, theta, z, rho_dot, theta_dot, z_dot) = unpack(coord);
    let (sin_t, cos_t) = theta.sin_cos();
    Vector6::new(
        rho * cos_t,
        rho * sin_t,
        z,
        rho_dot * cos_t - rho * theta_dot * sin_t,
        rho_dot * sin_t + rho * theta_dot * cos_t,
        z_dot,
    )
}

fn unpack(coord: &Vector6) -> (f64, f64, f64, f64, f64, f64) {
    (coord[0], coord[1], coord[2], coord[3], coord[4], coord[5])
}

#[cfg(test)]
mod ut_forms {
    use super::*;
    use std::f64::consts::{PI, TAU};

    #[test]
    fn test_m_to_e_residuals() {
        for e in [0.0, 0.1, 0.5, 0.9, 0.99] {
            let mut m = 0.0;
            while m < TAU {
                let big_e = m_to_e(e, m);
                assert!(
                    (big_e - e * big_e.sin() - m).abs() < 1e-8,
                    "elliptic residual at e={e}, M={m}"
                );
                m += 0.05;
            }
        }
        for e in [1.05, 1.5, 2.5, 5.0] {
            let mut m = -PI;
            while m <= PI {
                let h = m_to_e(e, m);
                assert!(
                    (e * h.sinh() - h - m).abs() < 1e-8,
                    "hyperbolic residual at e={e}, M={m}"
                );
                m += 0.05;
            }
        }
    }

    #[test]
    fn test_m_to_e_small_mean_anomaly() {
        // High eccentricity with a tiny mean anomaly is the stiff case for
        // the Newton iteration
        let big_e = m_to_e(0.95, 1e-4);
        assert!((big_e - 0.0124897).abs() < 1e-7);
    }

    #[test]
    fn test_routing() {
        // TLE to cartesian crosses three intermediate nodes
        let g = form_graph();
        let path = g
            .path(Form::Tle.index(), Form::Cartesian.index())
            .unwrap();
        assert_eq!(path.len(), 5);
    }

    #[test]
    fn test_circular_roundtrip() {
        let kep = Vector6::new(7000e3, 0.01, 0.9, 1.0, 2.0, 3.0);
        let circ = keplerian_to_circular(&kep);
        let back = circular_to_keplerian(&circ);
        assert!((kep - back).norm() < 1e-9 * kep.norm());
    }

    #[test]
    fn test_equinoctial_roundtrip() {
        let kep = Vector6::new(7000e3, 0.01, 0.9, 1.0, 2.0, 3.0);
        let equi = keplerian_to_equinoctial(&kep);
        let back = equinoctial_to_keplerian(&equi);
        assert!((kep - back).norm() < 1e-9 * kep.norm());
    }
}
