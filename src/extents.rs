//! Axis-aligned bounding boxes.

use geo::{coord, BoundingRect, Coord, Geometry, Line, LineString, Point, Polygon, Rect};
use geo_traits::{
    CoordTrait, Dimensions, GeometryTrait, GeometryType, RectTrait, UnimplementedGeometryCollection,
    UnimplementedLine, UnimplementedLineString, UnimplementedMultiLineString,
    UnimplementedMultiPoint, UnimplementedMultiPolygon, UnimplementedPoint, UnimplementedPolygon,
    UnimplementedTriangle,
};

use crate::error::{GeoTableError, Result};

/// A two-dimensional axis-aligned bounding box.
///
/// `Extents` is never empty: the absence of extents (for instance the bounds of an empty tree or
/// an empty geometry) is expressed as `Option<Extents>::None`.
///
/// Boxes are closed, so two boxes sharing only an edge or a corner intersect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extents {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

impl Extents {
    /// Create extents from two corners. The corners are normalized so that the minimum is never
    /// larger than the maximum on either axis.
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            min_x: x1.min(x2),
            min_y: y1.min(y2),
            max_x: x1.max(x2),
            max_y: y1.max(y2),
        }
    }

    /// Create extents from two corners, rejecting `NaN` coordinates.
    pub fn try_new(x1: f64, y1: f64, x2: f64, y2: f64) -> Result<Self> {
        if [x1, y1, x2, y2].iter().any(|v| v.is_nan()) {
            return Err(GeoTableError::General(
                "Extents coordinates must not be NaN.".to_string(),
            ));
        }
        Ok(Self::new(x1, y1, x2, y2))
    }

    /// Degenerate extents covering a single coordinate.
    pub fn from_coord(coord: Coord<f64>) -> Self {
        Self {
            min_x: coord.x,
            min_y: coord.y,
            max_x: coord.x,
            max_y: coord.y,
        }
    }

    /// Copy the corners of any [`RectTrait`] implementation.
    pub fn from_rect(rect: &impl RectTrait<T = f64>) -> Self {
        Self::new(
            rect.min().x(),
            rect.min().y(),
            rect.max().x(),
            rect.max().y(),
        )
    }

    /// The union of all given extents, or `None` if the iterator is empty.
    pub fn union_all<'a>(extents: impl IntoIterator<Item = &'a Extents>) -> Option<Self> {
        let mut iter = extents.into_iter();
        let mut acc = *iter.next()?;
        for e in iter {
            acc.expand_to_include(e);
        }
        Some(acc)
    }

    pub fn min_x(&self) -> f64 {
        self.min_x
    }

    pub fn min_y(&self) -> f64 {
        self.min_y
    }

    pub fn max_x(&self) -> f64 {
        self.max_x
    }

    pub fn max_y(&self) -> f64 {
        self.max_y
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn center(&self) -> Coord<f64> {
        coord! {
            x: (self.min_x + self.max_x) / 2.,
            y: (self.min_y + self.max_y) / 2.,
        }
    }

    /// Returns `true` if the two boxes share at least one point.
    pub fn intersects(&self, other: &Extents) -> bool {
        if self.max_x < other.min_x {
            return false;
        }
        if self.max_y < other.min_y {
            return false;
        }
        if self.min_x > other.max_x {
            return false;
        }
        if self.min_y > other.max_y {
            return false;
        }
        true
    }

    /// Returns `true` if `other` lies entirely inside (or on the boundary of) this box.
    pub fn contains(&self, other: &Extents) -> bool {
        self.min_x <= other.min_x
            && self.min_y <= other.min_y
            && self.max_x >= other.max_x
            && self.max_y >= other.max_y
    }

    pub fn contains_coord(&self, coord: Coord<f64>) -> bool {
        coord.x >= self.min_x
            && coord.x <= self.max_x
            && coord.y >= self.min_y
            && coord.y <= self.max_y
    }

    /// The smallest box containing both `self` and `other`.
    pub fn union(&self, other: &Extents) -> Extents {
        let mut out = *self;
        out.expand_to_include(other);
        out
    }

    /// Grow this box in place so that it also covers `other`.
    pub fn expand_to_include(&mut self, other: &Extents) {
        if other.min_x < self.min_x {
            self.min_x = other.min_x;
        }
        if other.min_y < self.min_y {
            self.min_y = other.min_y;
        }
        if other.max_x > self.max_x {
            self.max_x = other.max_x;
        }
        if other.max_y > self.max_y {
            self.max_y = other.max_y;
        }
    }

    /// The increase in area needed for this box to also cover `other`.
    pub fn enlargement(&self, other: &Extents) -> f64 {
        self.union(other).area() - self.area()
    }

    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            coord! { x: self.min_x, y: self.min_y },
            coord! { x: self.max_x, y: self.max_y },
        )
    }

    pub fn to_polygon(&self) -> Polygon<f64> {
        self.to_rect().to_polygon()
    }

    /// The box as a geometry suitable for topological predicates.
    ///
    /// Degenerate boxes become a point (zero width and height) or a line (zero width or height),
    /// so that predicates are evaluated on valid geometries.
    pub fn to_geometry(&self) -> Geometry<f64> {
        let min = coord! { x: self.min_x, y: self.min_y };
        let max = coord! { x: self.max_x, y: self.max_y };
        match (self.width() == 0., self.height() == 0.) {
            (true, true) => Geometry::Point(Point(min)),
            (true, false) | (false, true) => Geometry::Line(Line::new(min, max)),
            (false, false) => Geometry::Polygon(self.to_polygon()),
        }
    }
}

impl From<Rect<f64>> for Extents {
    fn from(rect: Rect<f64>) -> Self {
        Self::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    }
}

/// The [`GeometryType`] of a value that is only ever a rectangle.
pub(crate) type RectGeometryType<'a> = GeometryType<
    'a,
    UnimplementedPoint<f64>,
    UnimplementedLineString<f64>,
    UnimplementedPolygon<f64>,
    UnimplementedMultiPoint<f64>,
    UnimplementedMultiLineString<f64>,
    UnimplementedMultiPolygon<f64>,
    UnimplementedGeometryCollection<f64>,
    Extents,
    UnimplementedTriangle<f64>,
    UnimplementedLine<f64>,
>;

impl GeometryTrait for Extents {
    type T = f64;
    type PointType<'b>
        = UnimplementedPoint<f64>
    where
        Self: 'b;
    type LineStringType<'b>
        = UnimplementedLineString<f64>
    where
        Self: 'b;
    type PolygonType<'b>
        = UnimplementedPolygon<f64>
    where
        Self: 'b;
    type MultiPointType<'b>
        = UnimplementedMultiPoint<f64>
    where
        Self: 'b;
    type MultiLineStringType<'b>
        = UnimplementedMultiLineString<f64>
    where
        Self: 'b;
    type MultiPolygonType<'b>
        = UnimplementedMultiPolygon<f64>
    where
        Self: 'b;
    type GeometryCollectionType<'b>
        = UnimplementedGeometryCollection<f64>
    where
        Self: 'b;
    type RectType<'b>
        = Extents
    where
        Self: 'b;
    type TriangleType<'b>
        = UnimplementedTriangle<f64>
    where
        Self: 'b;
    type LineType<'b>
        = UnimplementedLine<f64>
    where
        Self: 'b;

    fn dim(&self) -> Dimensions {
        Dimensions::Xy
    }

    fn as_type(&self) -> RectGeometryType<'_> {
        GeometryType::Rect(self)
    }
}

impl RectTrait for Extents {
    type CoordType<'a>
        = Coord<f64>
    where
        Self: 'a;

    fn min(&self) -> Self::CoordType<'_> {
        coord! { x: self.min_x, y: self.min_y }
    }

    fn max(&self) -> Self::CoordType<'_> {
        coord! { x: self.max_x, y: self.max_y }
    }
}

/// Anything whose bounding box can be computed.
pub trait HasExtents {
    /// The bounding box of this value. Fails with [`GeoTableError::EmptyGeometry`] when the value
    /// has no coordinates.
    fn extents(&self) -> Result<Extents>;
}

impl HasExtents for Extents {
    fn extents(&self) -> Result<Extents> {
        Ok(*self)
    }
}

impl HasExtents for Rect<f64> {
    fn extents(&self) -> Result<Extents> {
        Ok(Extents::from(*self))
    }
}

impl HasExtents for Point<f64> {
    fn extents(&self) -> Result<Extents> {
        Ok(Extents::from_coord(self.0))
    }
}

impl HasExtents for LineString<f64> {
    fn extents(&self) -> Result<Extents> {
        self.bounding_rect()
            .map(Extents::from)
            .ok_or(GeoTableError::EmptyGeometry)
    }
}

impl HasExtents for Polygon<f64> {
    fn extents(&self) -> Result<Extents> {
        self.bounding_rect()
            .map(Extents::from)
            .ok_or(GeoTableError::EmptyGeometry)
    }
}

impl HasExtents for Geometry<f64> {
    fn extents(&self) -> Result<Extents> {
        self.bounding_rect()
            .map(Extents::from)
            .ok_or(GeoTableError::EmptyGeometry)
    }
}

impl<T: HasExtents> HasExtents for &T {
    fn extents(&self) -> Result<Extents> {
        (**self).extents()
    }
}
