/*
 * Orrery Astrodynamics Core
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Ground stations: topocentric frames bound to a geodetic location.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use snafu::prelude::*;

use crate::bodies::Body;
use crate::errors::{FrameError, NoMaskSnafu};
use crate::frames::center::{Center, Offset};
use crate::frames::frame::Frame;
use crate::frames::orient::{self, Orientation};
use crate::math::{Vector3, Vector6};

/// Heading of the station X axis.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum StationHeading {
    North,
    South,
    East,
    West,
    /// Any angle, in radians.
    Angle(f64),
}

impl StationHeading {
    fn angle(&self) -> f64 {
        match self {
            Self::North => PI,
            Self::South => 0.0,
            Self::East => FRAC_PI_2,
            Self::West => 3.0 * FRAC_PI_2,
            Self::Angle(a) => *a,
        }
    }
}

/// Azimuth/elevation terrain mask: azimuths counterclockwise and strictly
/// increasing, elevations, both in radians.
#[derive(Clone, Debug, Default)]
pub struct Mask {
    pub azims: Vec<f64>,
    pub elevs: Vec<f64>,
}

/// A ground station: a topocentric frame plus the data listeners need.
#[derive(Clone, Debug)]
pub struct Station {
    pub name: String,
    pub frame: Frame,
    /// Latitude, longitude (radians) and altitude (meters).
    pub latlonalt: (f64, f64, f64),
    mask: Option<Mask>,
}

impl Station {
    /// Elevation of the terrain mask at the given azimuth, by linear
    /// interpolation between the two bracketing mask points.
    pub fn get_mask(&self, azim: f64) -> Result<f64, FrameError> {
        let mask = self
            .mask
            .as_ref()
            .context(NoMaskSnafu {
                name: self.name.as_str(),
            })?;

        let azim = azim.rem_euclid(TAU);
        if let Some(i) = mask.azims.iter().position(|&a| a == azim) {
            return Ok(mask.elevs[i]);
        }

        let last = mask.azims.len() - 1;
        let (x0, y0, x1, y1) = match mask.azims.iter().position(|&a| a > azim) {
            // Before the first point: wrap the last one backward
            Some(0) => (
                mask.azims[last] - TAU,
                mask.elevs[last],
                mask.azims[0],
                mask.elevs[0],
            ),
            Some(next) => (
                mask.azims[next - 1],
                mask.elevs[next - 1],
                mask.azims[next],
                mask.elevs[next],
            ),
            // Past the last point: wrap the first one forward
            None => (
                mask.azims[last],
                mask.elevs[last],
                mask.azims[0] + TAU,
                mask.elevs[0],
            ),
        };

        Ok(y0 + (y1 - y0) * (azim - x0) / (x1 - x0))
    }

    pub fn has_mask(&self) -> bool {
        self.mask.is_some()
    }
}

/// Geodetic coordinates to cartesian, on the ellipsoid of `body`.
///
/// Latitude and longitude in radians, altitude above sea level in meters.
pub fn geodetic_to_cartesian(lat: f64, lon: f64, alt: f64, body: &Body) -> Vector3 {
    let e = body.eccentricity();
    let r = body.equatorial_radius;
    let c = r / (1.0 - (e * lat.sin()).powi(2)).sqrt();
    let s = r * (1.0 - e.powi(2)) / (1.0 - (e * lat.sin()).powi(2)).sqrt();
    let r_d = (c + alt) * lat.cos();
    let r_k = (s + alt) * lat.sin();

    let norm = (r_d.powi(2) + r_k.powi(2)).sqrt();
    norm * Vector3::new(lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin())
}

/// Creates a ground station frame.
///
/// `latlonalt` is (latitude °, longitude °, altitude m); the parent frame
/// is the planetocentric rotating frame the coordinates refer to (WGS84 for
/// Earth stations).
pub fn create_station(
    name: &str,
    latlonalt: (f64, f64, f64),
    parent: &Frame,
    heading: StationHeading,
    mask: Option<Mask>,
) -> Result<Station, FrameError> {
    let (lat_deg, lon_deg, alt) = latlonalt;
    let lat = lat_deg.to_radians();
    let lon = lon_deg.to_radians();

    let body = parent.center().body().unwrap_or_else(Body::earth);
    let coordinates = geodetic_to_cartesian(lat, lon, alt, &body);
    let mut offset = Vector6::zeros();
    offset.fixed_rows_mut::<3>(0).copy_from(&coordinates);

    let orientation = Orientation::topocentric(
        name,
        lat,
        lon,
        heading.angle(),
        parent.orientation(),
    );
    let center = Center::attach(
        name,
        parent.center(),
        orient::ITRF,
        Offset::Fixed(offset),
        None,
    );

    let frame = Frame::new(name, orientation, center);

    Ok(Station {
        name: name.to_owned(),
        frame,
        latlonalt: (lat, lon, alt),
        mask,
    })
}

#[cfg(test)]
mod ut_stations {
    use super::*;

    #[test]
    fn test_geodetic_to_cartesian() {
        let body = Body::earth();
        // On the equator at the prime meridian: x is the equatorial radius
        let pos = geodetic_to_cartesian(0.0, 0.0, 0.0, &body);
        assert!((pos[0] - body.equatorial_radius).abs() < 1e-6);
        assert!(pos[1].abs() < 1e-6 && pos[2].abs() < 1e-6);

        // At the pole: z is the polar radius
        let pos = geodetic_to_cartesian(FRAC_PI_2, 0.0, 0.0, &body);
        assert!((pos[2] - body.polar_radius()).abs() < 1.0);
    }

    #[test]
    fn test_mask_interpolation() {
        let station = Station {
            name: "masked".into(),
            frame: Frame::hill(crate::frames::local::LocalFrame::Qsw),
            latlonalt: (0.0, 0.0, 0.0),
            mask: Some(Mask {
                azims: vec![0.0, PI],
                elevs: vec![0.0, 0.2],
            }),
        };

        assert_eq!(station.get_mask(0.0).unwrap(), 0.0);
        assert!((station.get_mask(FRAC_PI_2).unwrap() - 0.1).abs() < 1e-12);
        // Wraps around past the last azimuth
        let val = station.get_mask(3.0 * FRAC_PI_2).unwrap();
        assert!(val > 0.0 && val < 0.2);
    }
}
