//! Ellipsoidal Transverse Mercator projection.
//!
//! Snyder's series (USGS Professional Paper 1395, 1987), accurate to a few millimeters within
//! a few degrees of the central meridian. The inverse uses [`MeridianDistance::phi1`].

use std::f64::consts::FRAC_PI_2;

use geo::{coord, Coord};

use crate::error::Result;
use crate::projection::meridian::MeridianDistance;
use crate::projection::parameters::{Ellipsoid, ProjectionParameters};
use crate::projection::{finite, MapProjection};

const FC1: f64 = 1.;
const FC2: f64 = 0.5;
const FC3: f64 = 0.16666666666666666666;
const FC4: f64 = 0.08333333333333333333;
const FC5: f64 = 0.05;
const FC6: f64 = 0.03333333333333333333;
const FC7: f64 = 0.02380952380952380952;
const FC8: f64 = 0.01785714285714285714;

/// Cosines below this are treated as the pole.
const EPSILON: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq)]
pub struct TransverseMercator {
    ellipsoid: Ellipsoid,
    central_meridian: f64,
    scale_factor: f64,
    false_easting: f64,
    false_northing: f64,
    /// Second eccentricity squared.
    esp: f64,
    /// Normalized meridian distance of the latitude of origin.
    ml0: f64,
    meridian: MeridianDistance,
}

impl TransverseMercator {
    /// Requires `semi_major`, `semi_minor` or `inverse_flattening`, `central_meridian`,
    /// `latitude_of_origin`, `scale_factor`, `false_easting` and `false_northing`.
    pub fn new(parameters: &ProjectionParameters) -> Result<Self> {
        let ellipsoid = Ellipsoid::from_parameters(parameters)?;
        let central_meridian = parameters.require("central_meridian")?.to_radians();
        let latitude_of_origin = parameters.require("latitude_of_origin")?.to_radians();
        let scale_factor = parameters.require("scale_factor")?;
        let false_easting = parameters.require("false_easting")?;
        let false_northing = parameters.require("false_northing")?;

        let es = ellipsoid.e2();
        let meridian = MeridianDistance::new(es);
        Ok(Self {
            ellipsoid,
            central_meridian,
            scale_factor,
            false_easting,
            false_northing,
            esp: es / (1. - es),
            ml0: meridian.length(latitude_of_origin),
            meridian,
        })
    }

    /// The UTM zone `zone` (1 to 60) on the WGS 84 ellipsoid.
    pub fn utm(zone: u8, north: bool) -> Result<Self> {
        let central_meridian = f64::from(zone) * 6. - 183.;
        Self::new(
            &ProjectionParameters::new()
                .with("semi_major", Ellipsoid::wgs84().semi_major())
                .with("semi_minor", Ellipsoid::wgs84().semi_minor())
                .with("central_meridian", central_meridian)
                .with("latitude_of_origin", 0.)
                .with("scale_factor", 0.9996)
                .with("false_easting", 500_000.)
                .with("false_northing", if north { 0. } else { 10_000_000. }),
        )
    }
}

impl MapProjection for TransverseMercator {
    fn name(&self) -> &'static str {
        "Transverse_Mercator"
    }

    fn ellipsoid(&self) -> &Ellipsoid {
        &self.ellipsoid
    }

    fn degrees_to_meters(&self, lonlat: Coord<f64>) -> Result<Coord<f64>> {
        let es = self.ellipsoid.e2();
        let k0 = self.scale_factor;
        let lam = lonlat.x.to_radians() - self.central_meridian;
        let phi = lonlat.y.to_radians();
        let (sin_phi, cos_phi) = phi.sin_cos();

        let mut t = if cos_phi.abs() > EPSILON {
            sin_phi / cos_phi
        } else {
            0.
        };
        t *= t;
        let mut al = cos_phi * lam;
        let als = al * al;
        al /= (1. - es * sin_phi * sin_phi).sqrt();
        let n = self.esp * cos_phi * cos_phi;

        let x = k0
            * al
            * (FC1
                + FC3
                    * als
                    * (1. - t
                        + n
                        + FC5
                            * als
                            * (5. + t * (t - 18.) + n * (14. - 58. * t)
                                + FC7 * als * (61. + t * (t * (179. - t) - 479.)))));
        let y = k0
            * (self.meridian.length_with(phi, sin_phi, cos_phi) - self.ml0
                + sin_phi
                    * al
                    * lam
                    * FC2
                    * (1.
                        + FC4
                            * als
                            * (5. - t
                                + n * (9. + 4. * n)
                                + FC6
                                    * als
                                    * (61. + t * (t - 58.) + n * (270. - 330. * t)
                                        + FC8 * als * (1385. + t * (t * (543. - t) - 3111.))))));

        let a = self.ellipsoid.semi_major();
        finite(
            coord! {
                x: a * x + self.false_easting,
                y: a * y + self.false_northing,
            },
            self.name(),
        )
    }

    fn meters_to_degrees(&self, point: Coord<f64>) -> Result<Coord<f64>> {
        let es = self.ellipsoid.e2();
        let k0 = self.scale_factor;
        let a = self.ellipsoid.semi_major();
        let x = (point.x - self.false_easting) / a;
        let y = (point.y - self.false_northing) / a;

        let mut phi = self.meridian.phi1(self.ml0 + y / k0)?;
        let lam = if phi.abs() >= FRAC_PI_2 {
            phi = FRAC_PI_2.copysign(phi);
            0.
        } else {
            let (sin_phi, cos_phi) = phi.sin_cos();
            let mut t = if cos_phi.abs() > EPSILON {
                sin_phi / cos_phi
            } else {
                0.
            };
            let n = self.esp * cos_phi * cos_phi;
            let mut con = 1. - es * sin_phi * sin_phi;
            let d = x * con.sqrt() / k0;
            con *= t;
            t *= t;
            let ds = d * d;

            phi -= (con * ds / (1. - es))
                * FC2
                * (1.
                    - ds * FC4
                        * (5. + t * (3. - 9. * n) + n * (1. - 4. * n)
                            - ds * FC6
                                * (61. + t * (90. - 252. * n + 45. * t) + 46. * n
                                    - ds * FC8
                                        * (1385. + t * (3633. + t * (4095. + 1574. * t))))));
            d * (FC1
                - ds * FC3
                    * (1. + 2. * t + n
                        - ds * FC5
                            * (5. + t * (28. + 24. * t + 8. * n) + 6. * n
                                - ds * FC7 * (61. + t * (662. + t * (1320. + 720. * t))))))
                / cos_phi
        };

        finite(
            coord! {
                x: (lam + self.central_meridian).to_degrees(),
                y: phi.to_degrees(),
            },
            self.name(),
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::GeoTableError;

    #[test]
    fn utm_zone_32() {
        let utm = TransverseMercator::utm(32, true).unwrap();
        let projected = utm.degrees_to_meters(coord! { x: 10., y: 50. }).unwrap();
        assert!((projected.x - 571_666.4475).abs() < 1e-3, "{:?}", projected);
        assert!((projected.y - 5_539_109.8153).abs() < 1e-3, "{:?}", projected);

        let projected = utm.degrees_to_meters(coord! { x: 12., y: 45. }).unwrap();
        assert!((projected.x - 736_446.026).abs() < 1e-2, "{:?}", projected);
        assert!((projected.y - 4_987_329.505).abs() < 1e-2, "{:?}", projected);

        let origin = utm.degrees_to_meters(coord! { x: 9., y: 0. }).unwrap();
        assert!((origin.x - 500_000.).abs() < 1e-9);
        assert!(origin.y.abs() < 1e-9);
    }

    #[test]
    fn southern_false_northing() {
        let south = TransverseMercator::utm(33, false).unwrap();
        let projected = south.degrees_to_meters(coord! { x: 15., y: -10. }).unwrap();
        assert!(projected.y < 10_000_000.);
        assert!(projected.y > 8_000_000.);
        let back = south.meters_to_degrees(projected).unwrap();
        assert!((back.x - 15.).abs() < 1e-9);
        assert!((back.y + 10.).abs() < 1e-9);
    }

    #[test]
    fn pole_is_handled() {
        let utm = TransverseMercator::utm(32, true).unwrap();
        let pole = utm.degrees_to_meters(coord! { x: 9., y: 90. }).unwrap();
        let back = utm.meters_to_degrees(pole).unwrap();
        assert!((back.y - 90.).abs() < 1e-6);
    }

    #[test]
    fn missing_central_meridian() {
        let parameters = ProjectionParameters::new()
            .with("semi_major", 6_378_137.)
            .with("inverse_flattening", 298.257_223_563);
        assert_eq!(
            TransverseMercator::new(&parameters).unwrap_err(),
            GeoTableError::MissingParameter("central_meridian".to_string())
        );
    }
}
