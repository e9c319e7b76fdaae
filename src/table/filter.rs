//! Spatial predicates used to select rows.

use geo::{Geometry, Intersects, Relate};

use crate::extents::{Extents, HasExtents};

/// A spatial relation between two geometries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpatialOperation {
    Intersects,
    Disjoint,
    Contains,
    Within,
    Overlaps,
    Touches,
    Crosses,
    /// Topological equality.
    Equals,
}

impl SpatialOperation {
    /// Evaluate `left <op> right`.
    pub fn evaluate(&self, left: &Geometry<f64>, right: &Geometry<f64>) -> bool {
        match self {
            SpatialOperation::Intersects => left.intersects(right),
            SpatialOperation::Disjoint => !left.intersects(right),
            SpatialOperation::Contains => left.relate(right).is_contains(),
            SpatialOperation::Within => left.relate(right).is_within(),
            SpatialOperation::Overlaps => left.relate(right).is_overlaps(),
            SpatialOperation::Touches => left.relate(right).is_touches(),
            SpatialOperation::Crosses => left.relate(right).is_crosses(),
            SpatialOperation::Equals => left.relate(right).is_equal_topo(),
        }
    }

    /// Whether a row can only match if its extents intersect the filter extents.
    ///
    /// Every operation except [`Disjoint`][SpatialOperation::Disjoint] implies that the two
    /// geometries share at least one point.
    pub(crate) fn requires_intersection(&self) -> bool {
        !matches!(self, SpatialOperation::Disjoint)
    }
}

/// The filter side of a spatial query.
#[derive(Debug, Clone, PartialEq)]
pub enum SpatialFilter {
    /// A bounding box, tested as a polygon (or as a line or point when degenerate).
    Extents(Extents),
    Geometry(Geometry<f64>),
}

impl SpatialFilter {
    /// The bounding box of the filter, `None` for an empty geometry.
    pub fn extents(&self) -> Option<Extents> {
        match self {
            SpatialFilter::Extents(extents) => Some(*extents),
            SpatialFilter::Geometry(geometry) => geometry.extents().ok(),
        }
    }

    pub(crate) fn to_geometry(&self) -> Geometry<f64> {
        match self {
            SpatialFilter::Extents(extents) => extents.to_geometry(),
            SpatialFilter::Geometry(geometry) => geometry.clone(),
        }
    }
}

impl From<Extents> for SpatialFilter {
    fn from(extents: Extents) -> Self {
        SpatialFilter::Extents(extents)
    }
}

impl From<Geometry<f64>> for SpatialFilter {
    fn from(geometry: Geometry<f64>) -> Self {
        SpatialFilter::Geometry(geometry)
    }
}

/// A spatial predicate: an operation, the filter operand and the operand order.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialQuery {
    pub operation: SpatialOperation,
    pub filter: SpatialFilter,
    /// When `true` the predicate reads `filter <op> row`, otherwise `row <op> filter`.
    pub filter_is_left: bool,
}

impl SpatialQuery {
    /// A query reading `row <op> filter`.
    pub fn new(operation: SpatialOperation, filter: impl Into<SpatialFilter>) -> Self {
        Self {
            operation,
            filter: filter.into(),
            filter_is_left: false,
        }
    }

    /// Swap the operands so that the predicate reads `filter <op> row`.
    pub fn filter_left(mut self) -> Self {
        self.filter_is_left = true;
        self
    }

    /// Evaluate the predicate against a row geometry, given the filter as a geometry.
    pub(crate) fn is_match(&self, filter: &Geometry<f64>, row: &Geometry<f64>) -> bool {
        if self.filter_is_left {
            self.operation.evaluate(filter, row)
        } else {
            self.operation.evaluate(row, filter)
        }
    }
}
