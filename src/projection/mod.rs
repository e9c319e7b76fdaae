//! Map projections between geographic coordinates (degrees) and projected coordinates (meters).
//!
//! Every projection implements [`MapProjection`]. [`create_projection`] builds one from a name
//! and a [`ProjectionParameters`] set, as they appear in a WKT `PROJCS` definition:
//!
//! ```
//! use geo::coord;
//! use geo_table::projection::{create_projection, ProjectionParameters, ProjectionTransform};
//!
//! let parameters = ProjectionParameters::new()
//!     .with("semi_major", 6_378_137.)
//!     .with("inverse_flattening", 298.257_223_563)
//!     .with("central_meridian", 9.)
//!     .with("latitude_of_origin", 0.)
//!     .with("scale_factor", 0.9996)
//!     .with("false_easting", 500_000.)
//!     .with("false_northing", 0.);
//! let projection = create_projection("Transverse_Mercator", &parameters).unwrap();
//! let utm = ProjectionTransform::from(projection);
//! let projected = utm.transform(coord! { x: 10., y: 50. }).unwrap();
//! assert!((projected.x - 571_666.45).abs() < 0.01);
//!
//! let back = utm.inverse().transform(projected).unwrap();
//! assert!((back.y - 50.).abs() < 1e-9);
//! ```

use std::fmt::Debug;
use std::sync::Arc;

use geo::{Coord, Geometry, MapCoords};
#[cfg(feature = "rayon")]
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::error::{GeoTableError, Result};

pub mod krovak;
pub mod meridian;
pub mod parameters;
pub mod transverse_mercator;

pub use krovak::KrovakProjection;
pub use meridian::MeridianDistance;
pub use parameters::{Ellipsoid, ProjectionParameters};
pub use transverse_mercator::TransverseMercator;

/// Which way a projection is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    /// Degrees to meters.
    #[default]
    Forward,
    /// Meters to degrees.
    Inverse,
}

impl Direction {
    pub fn reverse(self) -> Self {
        match self {
            Self::Forward => Self::Inverse,
            Self::Inverse => Self::Forward,
        }
    }
}

/// A map projection. Implementations are immutable once constructed.
pub trait MapProjection: Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn ellipsoid(&self) -> &Ellipsoid;

    /// Project a geographic coordinate (`x` longitude, `y` latitude, in degrees) to meters.
    fn degrees_to_meters(&self, lonlat: Coord<f64>) -> Result<Coord<f64>>;

    /// Unproject a coordinate in meters to longitude and latitude in degrees.
    fn meters_to_degrees(&self, point: Coord<f64>) -> Result<Coord<f64>>;

    fn transform(&self, coord: Coord<f64>, direction: Direction) -> Result<Coord<f64>> {
        match direction {
            Direction::Forward => self.degrees_to_meters(coord),
            Direction::Inverse => self.meters_to_degrees(coord),
        }
    }
}

/// A shared projection applied in one direction.
#[derive(Debug, Clone)]
pub struct ProjectionTransform {
    projection: Arc<dyn MapProjection>,
    direction: Direction,
}

impl ProjectionTransform {
    pub fn new(projection: Arc<dyn MapProjection>, direction: Direction) -> Self {
        Self {
            projection,
            direction,
        }
    }

    /// The same projection applied the other way.
    pub fn inverse(&self) -> Self {
        Self::new(self.projection.clone(), self.direction.reverse())
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn is_inverse(&self) -> bool {
        self.direction == Direction::Inverse
    }

    /// The projection name, prefixed with `Inverse_` for an inverse transform.
    pub fn name(&self) -> String {
        match self.direction {
            Direction::Forward => self.projection.name().to_string(),
            Direction::Inverse => format!("Inverse_{}", self.projection.name()),
        }
    }

    pub fn projection(&self) -> &dyn MapProjection {
        self.projection.as_ref()
    }

    pub fn transform(&self, coord: Coord<f64>) -> Result<Coord<f64>> {
        self.projection.transform(coord, self.direction)
    }

    /// Transform a batch of coordinates. Fails on the first coordinate that fails.
    pub fn transform_all(&self, coords: &[Coord<f64>]) -> Result<Vec<Coord<f64>>> {
        #[cfg(feature = "rayon")]
        {
            coords.par_iter().map(|c| self.transform(*c)).collect()
        }

        #[cfg(not(feature = "rayon"))]
        {
            coords.iter().map(|c| self.transform(*c)).collect()
        }
    }

    /// Transform every coordinate of a geometry.
    pub fn transform_geometry(&self, geometry: &Geometry<f64>) -> Result<Geometry<f64>> {
        geometry.try_map_coords(|c| self.transform(c))
    }
}

impl From<Box<dyn MapProjection>> for ProjectionTransform {
    fn from(projection: Box<dyn MapProjection>) -> Self {
        Self::new(Arc::from(projection), Direction::Forward)
    }
}

/// Create a projection by name. Names are matched ignoring case, underscores and spaces, so
/// `"Transverse_Mercator"` and `"transverse mercator"` are the same.
pub fn create_projection(
    name: &str,
    parameters: &ProjectionParameters,
) -> Result<Box<dyn MapProjection>> {
    let normalized: String = name
        .chars()
        .filter(|c| *c != '_' && !c.is_whitespace())
        .map(|c| c.to_ascii_lowercase())
        .collect();
    match normalized.as_str() {
        "krovak" => Ok(Box::new(KrovakProjection::new(parameters)?)),
        "transversemercator" => Ok(Box::new(TransverseMercator::new(parameters)?)),
        _ => Err(GeoTableError::UnsupportedProjection(name.to_string())),
    }
}

/// Reject non-finite projection output.
pub(crate) fn finite(coord: Coord<f64>, name: &str) -> Result<Coord<f64>> {
    if coord.x.is_finite() && coord.y.is_finite() {
        Ok(coord)
    } else {
        Err(GeoTableError::General(format!(
            "{} produced a non-finite coordinate ({}, {})",
            name, coord.x, coord.y
        )))
    }
}
