use std::cell::OnceCell;
use std::fmt;

use geo::Geometry;

use crate::error::{GeoTableError, Result};
use crate::extents::{Extents, HasExtents};
use crate::table::schema::AttributeValue;

/// Identifier of a row, assigned by the owning table and unique within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId(pub(crate) u64);

impl RowId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Change-tracking state of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowState {
    /// Not (or no longer) part of a table.
    Detached,
    /// Added since the last [`accept_changes`][crate::table::FeatureTable::accept_changes].
    Added,
    Unchanged,
    Modified,
    /// Marked for removal by [`delete_row`][crate::table::FeatureTable::delete_row].
    Deleted,
}

/// A feature: an optional geometry with attribute values ordered like the table's columns.
#[derive(Debug, Clone)]
pub struct FeatureRow {
    pub(crate) id: Option<RowId>,
    pub(crate) geometry: Option<Geometry<f64>>,
    pub(crate) values: Vec<AttributeValue>,
    pub(crate) state: RowState,
    extents: OnceCell<Option<Extents>>,
}

impl FeatureRow {
    /// A detached row with the given values.
    pub fn new(geometry: Option<Geometry<f64>>, values: Vec<AttributeValue>) -> Self {
        Self {
            id: None,
            geometry,
            values,
            state: RowState::Detached,
            extents: OnceCell::new(),
        }
    }

    /// The id assigned by the owning table, `None` while detached.
    pub fn id(&self) -> Option<RowId> {
        self.id
    }

    pub fn state(&self) -> RowState {
        self.state
    }

    pub fn geometry(&self) -> Option<&Geometry<f64>> {
        self.geometry.as_ref()
    }

    /// Replace the geometry of a detached row. Rows already in a table are changed through
    /// [`FeatureTable::set_geometry`][crate::table::FeatureTable::set_geometry], which keeps the
    /// index in sync.
    pub fn set_geometry(&mut self, geometry: Option<Geometry<f64>>) {
        self.replace_geometry(geometry);
    }

    pub(crate) fn replace_geometry(
        &mut self,
        geometry: Option<Geometry<f64>>,
    ) -> Option<Geometry<f64>> {
        self.extents.take();
        std::mem::replace(&mut self.geometry, geometry)
    }

    pub fn values(&self) -> &[AttributeValue] {
        &self.values
    }

    pub fn value(&self, position: usize) -> Option<&AttributeValue> {
        self.values.get(position)
    }

    /// Set a value of a detached row.
    pub fn set_value(&mut self, position: usize, value: impl Into<AttributeValue>) -> Result<()> {
        let slot = self.values.get_mut(position).ok_or_else(|| {
            GeoTableError::SchemaMismatch(format!("no column at position {}", position))
        })?;
        *slot = value.into();
        Ok(())
    }

    /// The bounding box of the geometry, computed on first access and cached until the geometry
    /// is replaced. `None` when the row has no geometry or an empty one.
    pub fn extents(&self) -> Option<Extents> {
        *self
            .extents
            .get_or_init(|| self.geometry.as_ref().and_then(|g| g.extents().ok()))
    }

    /// Unchanged rows become modified. Added rows stay added.
    pub(crate) fn mark_modified(&mut self) {
        if self.state == RowState::Unchanged {
            self.state = RowState::Modified;
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.state == RowState::Deleted
    }

    /// A detached deep copy of this row.
    pub(crate) fn detached_copy(&self) -> Self {
        Self::new(self.geometry.clone(), self.values.clone())
    }
}
