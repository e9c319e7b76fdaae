//! Krovak oblique conformal conic projection (EPSG method 9819).

use std::f64::consts::FRAC_PI_4;

use geo::{coord, Coord};
use log::warn;

use crate::error::{GeoTableError, Result};
use crate::projection::parameters::{Ellipsoid, ProjectionParameters};
use crate::projection::{finite, MapProjection};

const MAX_ITERATIONS: usize = 15;
const TOLERANCE: f64 = 1e-11;

/// The Krovak projection used by S-JTSK in the Czech Republic and Slovakia.
///
/// Projected coordinates follow the ESRI convention: `x` is minus the westing and `y` minus the
/// southing of the classic Krovak grid, both shifted by the false easting and northing. The
/// longitude of center is taken relative to the prime meridian of the input longitudes, so
/// 24°50' for Greenwich and 42°30' for Ferro.
#[derive(Debug, Clone, PartialEq)]
pub struct KrovakProjection {
    ellipsoid: Ellipsoid,
    central_meridian: f64,
    false_easting: f64,
    false_northing: f64,
    sin_azimuth: f64,
    cos_azimuth: f64,
    n: f64,
    tan_s2: f64,
    alfa: f64,
    hae: f64,
    k1: f64,
    ka: f64,
    ro0: f64,
    rop: f64,
}

impl KrovakProjection {
    /// Requires `semi_major`, `semi_minor` or `inverse_flattening`, `latitude_of_center`,
    /// `longitude_of_center`, `azimuth`, `pseudo_standard_parallel_1`, `scale_factor`,
    /// `false_easting` and `false_northing`.
    pub fn new(parameters: &ProjectionParameters) -> Result<Self> {
        let ellipsoid = Ellipsoid::from_parameters(parameters)?;
        let latitude_of_center = parameters.require("latitude_of_center")?.to_radians();
        let central_meridian = parameters.require("longitude_of_center")?.to_radians();
        let azimuth = parameters.require("azimuth")?.to_radians();
        let pseudo_standard_parallel = parameters
            .require("pseudo_standard_parallel_1")?
            .to_radians();
        let scale_factor = parameters.require("scale_factor")?;
        let false_easting = parameters.require("false_easting")?;
        let false_northing = parameters.require("false_northing")?;

        if pseudo_standard_parallel.sin() == 0. {
            return Err(GeoTableError::InvalidParameter {
                name: "pseudo_standard_parallel_1".to_string(),
                value: pseudo_standard_parallel.to_degrees(),
            });
        }

        let e = ellipsoid.e();
        let e2 = ellipsoid.e2();
        let (sin_lat, cos_lat) = latitude_of_center.sin_cos();
        let cos_lat2 = cos_lat * cos_lat;

        let alfa = (1. + (e2 * cos_lat2 * cos_lat2) / (1. - e2)).sqrt();
        let hae = alfa * e / 2.;
        let u0 = (sin_lat / alfa).asin();
        let esl = e * sin_lat;
        let g = ((1. - esl) / (1. + esl)).powf(alfa * e / 2.);
        let k1 = (latitude_of_center / 2. + FRAC_PI_4).tan().powf(alfa) * g
            / (u0 / 2. + FRAC_PI_4).tan();
        let ka = (1. / k1).powf(-1. / alfa);

        let radius = (1. - e2).sqrt() / (1. - e2 * sin_lat * sin_lat);
        let n = pseudo_standard_parallel.sin();
        let tan_s2 = (pseudo_standard_parallel / 2. + FRAC_PI_4).tan();
        let ro0 = scale_factor * radius / pseudo_standard_parallel.tan();
        let rop = ro0 * tan_s2.powf(n);

        Ok(Self {
            ellipsoid,
            central_meridian,
            false_easting,
            false_northing,
            sin_azimuth: azimuth.sin(),
            cos_azimuth: azimuth.cos(),
            n,
            tan_s2,
            alfa,
            hae,
            k1,
            ka,
            ro0,
            rop,
        })
    }
}

impl MapProjection for KrovakProjection {
    fn name(&self) -> &'static str {
        "Krovak"
    }

    fn ellipsoid(&self) -> &Ellipsoid {
        &self.ellipsoid
    }

    fn degrees_to_meters(&self, lonlat: Coord<f64>) -> Result<Coord<f64>> {
        let e = self.ellipsoid.e();
        let lambda = lonlat.x.to_radians() - self.central_meridian;
        let phi = lonlat.y.to_radians();

        let esp = e * phi.sin();
        let gfi = ((1. - esp) / (1. + esp)).powf(self.hae);
        let conformal = (phi / 2. + FRAC_PI_4).tan().powf(self.alfa) / self.k1 * gfi;
        let u = 2. * (conformal.atan() - FRAC_PI_4);
        let deltav = -lambda * self.alfa;
        let cos_u = u.cos();
        let s = (self.cos_azimuth * u.sin() + self.sin_azimuth * cos_u * deltav.cos()).asin();
        let d = (cos_u * deltav.sin() / s.cos()).asin();
        let eps = self.n * d;
        let ro = self.rop / (s / 2. + FRAC_PI_4).tan().powf(self.n);

        let a = self.ellipsoid.semi_major();
        finite(
            coord! {
                x: -(ro * eps.sin()) * a + self.false_easting,
                y: -(ro * eps.cos()) * a + self.false_northing,
            },
            self.name(),
        )
    }

    fn meters_to_degrees(&self, point: Coord<f64>) -> Result<Coord<f64>> {
        let e = self.ellipsoid.e();
        let a = self.ellipsoid.semi_major();
        let x = (point.x - self.false_easting) / a;
        let y = (point.y - self.false_northing) / a;

        let ro = x.hypot(y);
        let eps = (-x).atan2(-y);
        let d = eps / self.n;
        let s = 2. * (((self.ro0 / ro).powf(1. / self.n) * self.tan_s2).atan() - FRAC_PI_4);
        let cs = s.cos();
        let u = (self.cos_azimuth * s.sin() - self.sin_azimuth * cs * d.cos()).asin();
        let kau = self.ka * (u / 2. + FRAC_PI_4).tan().powf(1. / self.alfa);
        let deltav = (cs * d.sin() / u.cos()).asin();
        let lambda = -deltav / self.alfa;

        let mut phi = u;
        for _ in 0..MAX_ITERATIONS {
            let previous = phi;
            let esf = e * previous.sin();
            phi = 2. * ((kau * ((1. + esf) / (1. - esf)).powf(e / 2.)).atan() - FRAC_PI_4);
            if (previous - phi).abs() <= TOLERANCE {
                return finite(
                    coord! {
                        x: (lambda + self.central_meridian).to_degrees(),
                        y: phi.to_degrees(),
                    },
                    self.name(),
                );
            }
        }

        warn!("Inverse Krovak of ({}, {}) did not converge", point.x, point.y);
        Err(GeoTableError::NoConvergence {
            operation: "inverse Krovak",
            iterations: MAX_ITERATIONS,
        })
    }
}
