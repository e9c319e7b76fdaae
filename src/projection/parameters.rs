use std::collections::BTreeMap;

use crate::error::{GeoTableError, Result};

/// Named numeric projection parameters, as found in a WKT `PROJCS` definition.
///
/// Names are compared case-insensitively. Angles are in degrees, lengths in meters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectionParameters {
    values: BTreeMap<String, f64>,
}

impl ProjectionParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: f64) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: f64) -> Option<f64> {
        self.values.insert(name.to_ascii_lowercase(), value)
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(&name.to_ascii_lowercase()).copied()
    }

    /// The value of a required parameter.
    pub fn require(&self, name: &str) -> Result<f64> {
        self.get(name)
            .ok_or_else(|| GeoTableError::MissingParameter(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.values.iter().map(|(name, value)| (name.as_str(), *value))
    }
}

impl<'a> FromIterator<(&'a str, f64)> for ProjectionParameters {
    fn from_iter<I: IntoIterator<Item = (&'a str, f64)>>(iter: I) -> Self {
        let mut parameters = Self::new();
        for (name, value) in iter {
            parameters.insert(name, value);
        }
        parameters
    }
}

/// A reference ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    semi_major: f64,
    semi_minor: f64,
    /// First eccentricity squared.
    e2: f64,
    e: f64,
}

impl Ellipsoid {
    /// Create an ellipsoid from its semi-axes in meters.
    pub fn new(semi_major: f64, semi_minor: f64) -> Result<Self> {
        if !(semi_major.is_finite() && semi_major > 0.) {
            return Err(GeoTableError::InvalidParameter {
                name: "semi_major".to_string(),
                value: semi_major,
            });
        }
        if !(semi_minor.is_finite() && semi_minor > 0. && semi_minor <= semi_major) {
            return Err(GeoTableError::InvalidParameter {
                name: "semi_minor".to_string(),
                value: semi_minor,
            });
        }
        let e2 = 1. - (semi_minor * semi_minor) / (semi_major * semi_major);
        Ok(Self {
            semi_major,
            semi_minor,
            e2,
            e: e2.sqrt(),
        })
    }

    /// Create an ellipsoid from its semi-major axis and inverse flattening. An inverse
    /// flattening of 0 denotes a sphere.
    pub fn from_inverse_flattening(semi_major: f64, inverse_flattening: f64) -> Result<Self> {
        if inverse_flattening == 0. {
            return Self::new(semi_major, semi_major);
        }
        if !(inverse_flattening.is_finite() && inverse_flattening > 1.) {
            return Err(GeoTableError::InvalidParameter {
                name: "inverse_flattening".to_string(),
                value: inverse_flattening,
            });
        }
        Self::new(semi_major, semi_major * (1. - 1. / inverse_flattening))
    }

    /// Read `semi_major` and either `semi_minor` or `inverse_flattening`.
    pub fn from_parameters(parameters: &ProjectionParameters) -> Result<Self> {
        let semi_major = parameters.require("semi_major")?;
        if let Some(semi_minor) = parameters.get("semi_minor") {
            return Self::new(semi_major, semi_minor);
        }
        match parameters.get("inverse_flattening") {
            Some(inverse_flattening) => {
                Self::from_inverse_flattening(semi_major, inverse_flattening)
            }
            None => Err(GeoTableError::MissingParameter(
                "semi_minor or inverse_flattening".to_string(),
            )),
        }
    }

    /// Bessel 1841, the ellipsoid of S-JTSK.
    pub fn bessel_1841() -> Self {
        Self::exact(6_377_397.155, 299.152_812_8)
    }

    pub fn wgs84() -> Self {
        Self::exact(6_378_137.0, 298.257_223_563)
    }

    fn exact(semi_major: f64, inverse_flattening: f64) -> Self {
        let semi_minor = semi_major * (1. - 1. / inverse_flattening);
        let e2 = 1. - (semi_minor * semi_minor) / (semi_major * semi_major);
        Self {
            semi_major,
            semi_minor,
            e2,
            e: e2.sqrt(),
        }
    }

    pub fn semi_major(&self) -> f64 {
        self.semi_major
    }

    pub fn semi_minor(&self) -> f64 {
        self.semi_minor
    }

    /// First eccentricity squared.
    pub fn e2(&self) -> f64 {
        self.e2
    }

    /// First eccentricity.
    pub fn e(&self) -> f64 {
        self.e
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn names_are_case_insensitive() {
        let parameters = ProjectionParameters::new().with("Semi_Major", 6378137.);
        assert_eq!(parameters.get("semi_major"), Some(6378137.));
        assert_eq!(
            parameters.require("azimuth"),
            Err(GeoTableError::MissingParameter("azimuth".to_string()))
        );
    }

    #[test]
    fn ellipsoid_from_parameters() {
        let parameters: ProjectionParameters =
            [("semi_major", 6_378_137.0), ("inverse_flattening", 298.257_223_563)]
                .into_iter()
                .collect();
        let ellipsoid = Ellipsoid::from_parameters(&parameters).unwrap();
        assert!((ellipsoid.semi_minor() - 6_356_752.314_245).abs() < 1e-3);
        assert!((ellipsoid.e2() - 0.006_694_379_990_14).abs() < 1e-12);
        assert_eq!(ellipsoid, Ellipsoid::wgs84());

        let sphere = Ellipsoid::from_inverse_flattening(6_371_000., 0.).unwrap();
        assert_eq!(sphere.e2(), 0.);

        let missing = ProjectionParameters::new().with("semi_major", 1.);
        assert!(matches!(
            Ellipsoid::from_parameters(&missing),
            Err(GeoTableError::MissingParameter(_))
        ));
        assert!(Ellipsoid::new(1., 2.).is_err());
    }
}
