use std::cell::Cell;
use std::collections::HashMap;

use geo::Geometry;
use log::debug;

use crate::error::{GeoTableError, Result};
use crate::extents::Extents;
use crate::projection::ProjectionTransform;
use crate::rtree::{DynamicRTree, QueryIter, RTreeBuilder, SpatialIndex};
use crate::table::filter::{SpatialFilter, SpatialOperation, SpatialQuery};
use crate::table::row::{FeatureRow, RowId, RowState};
use crate::table::schema::{AttributeValue, Column, Schema};

/// How [`FeatureTable::merge_with`] matches the columns of the merged table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SchemaMergeAction {
    /// Columns are matched by position. Merging fails unless the schemas are compatible.
    #[default]
    Error,
    /// Columns are matched by name. Columns missing from this table are appended as nullable
    /// columns.
    Add,
    /// Like [`Add`][Self::Add], and the source key becomes this table's key if it has none.
    AddWithKey,
}

/// Options for [`FeatureTable::merge_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOptions {
    /// Leave rows with pending changes untouched instead of overwriting them.
    pub preserve_changes: bool,
    pub schema_action: SchemaMergeAction,
}

/// An in-memory table of features, optionally backed by a spatial index.
///
/// Rows keep their insertion order. When the table is spatially indexed, the index holds exactly
/// the ids of the non-deleted rows that have a non-empty geometry: every mutation of the table
/// updates the index before it returns.
///
/// ```
/// use geo::point;
/// use geo_table::table::{AttributeKind, Column, FeatureTable, Schema};
/// use geo_table::Extents;
///
/// let schema = Schema::new()
///     .with_column(Column::new("name", AttributeKind::Text))
///     .unwrap();
/// let mut table = FeatureTable::new(schema);
/// table.set_spatially_indexed(true);
///
/// let mut row = table.new_row();
/// row.set_geometry(Some(point!(x: 14.42, y: 50.09).into()));
/// row.set_value(0, "Praha").unwrap();
/// let id = table.add_row(row).unwrap();
///
/// let hits: Vec<_> = table
///     .select_extents(&Extents::new(14., 50., 15., 51.))
///     .map(|row| row.id())
///     .collect();
/// assert_eq!(hits, vec![Some(id)]);
/// ```
#[derive(Debug)]
pub struct FeatureTable {
    schema: Schema,
    rows: Vec<FeatureRow>,
    positions: HashMap<RowId, usize>,
    next_id: u64,
    index: Option<DynamicRTree<RowId>>,
    index_builder: RTreeBuilder<RowId>,
    extents: Cell<Option<Extents>>,
    extents_dirty: Cell<bool>,
}

impl FeatureTable {
    /// Create an empty, unindexed table.
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
            positions: HashMap::new(),
            next_id: 0,
            index: None,
            index_builder: RTreeBuilder::new(),
            extents: Cell::new(None),
            extents_dirty: Cell::new(false),
        }
    }

    /// Set the template used to create the spatial index. An existing index is rebuilt with the
    /// new configuration.
    pub fn with_index_builder(mut self, builder: RTreeBuilder<RowId>) -> Self {
        self.index_builder = builder;
        if self.index.is_some() {
            self.index = Some(self.build_index());
        }
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// A detached row conforming to the schema, with every value set to null.
    pub fn new_row(&self) -> FeatureRow {
        FeatureRow::new(None, vec![AttributeValue::Null; self.schema.len()])
    }

    /// Number of rows, rows marked as deleted included.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows not marked as deleted.
    pub fn feature_count(&self) -> usize {
        self.rows.iter().filter(|row| !row.is_deleted()).count()
    }

    /// The row with the given id, in any state.
    pub fn get(&self, id: RowId) -> Option<&FeatureRow> {
        self.positions.get(&id).map(|&position| &self.rows[position])
    }

    /// The row at the given position in insertion order.
    pub fn row_at(&self, position: usize) -> Option<&FeatureRow> {
        self.rows.get(position)
    }

    /// All rows in insertion order, including rows marked as deleted.
    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    /// The rows not marked as deleted, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &FeatureRow> + '_ {
        self.rows.iter().filter(|row| !row.is_deleted())
    }

    /// The live row whose key column holds `key`. `None` if the schema has no key.
    pub fn find(&self, key: &AttributeValue) -> Option<&FeatureRow> {
        let position = self.schema.key_position()?;
        self.iter().find(|row| row.value(position) == Some(key))
    }

    /// Add a detached row. The row is validated against the schema and marked as
    /// [`RowState::Added`].
    pub fn add_row(&mut self, row: FeatureRow) -> Result<RowId> {
        if row.id.is_some() || row.state != RowState::Detached {
            return Err(GeoTableError::General(
                "Row already belongs to a table.".to_string(),
            ));
        }
        self.schema.check_values(&row.values)?;
        Ok(self.push_row(row, RowState::Added))
    }

    /// Add a copy of a row from any table. The geometry is deep-cloned.
    pub fn import_row(&mut self, row: &FeatureRow) -> Result<RowId> {
        let copy = row.detached_copy();
        self.schema.check_values(&copy.values)?;
        Ok(self.push_row(copy, RowState::Added))
    }

    fn push_row(&mut self, mut row: FeatureRow, state: RowState) -> RowId {
        let id = RowId(self.next_id);
        self.next_id += 1;
        row.id = Some(id);
        row.state = state;

        if state != RowState::Deleted {
            if let (Some(index), Some(extents)) = (self.index.as_mut(), row.extents()) {
                index.insert_with_extents(extents, id);
            }
        }

        self.positions.insert(id, self.rows.len());
        self.rows.push(row);
        self.invalidate_extents();
        id
    }

    /// Remove a row from the table outright, returning it detached.
    pub fn remove_row(&mut self, id: RowId) -> Result<FeatureRow> {
        let position = *self
            .positions
            .get(&id)
            .ok_or(GeoTableError::RowNotFound(id))?;

        if !self.rows[position].is_deleted() {
            self.unindex_row(position)?;
        }

        let mut row = self.rows.remove(position);
        self.positions.remove(&id);
        for (offset, later) in self.rows[position..].iter().enumerate() {
            if let Some(later_id) = later.id {
                self.positions.insert(later_id, position + offset);
            }
        }
        self.invalidate_extents();

        row.id = None;
        row.state = RowState::Detached;
        Ok(row)
    }

    /// Mark a row as deleted. A row added since the last
    /// [`accept_changes`][Self::accept_changes] is removed outright.
    pub fn delete_row(&mut self, id: RowId) -> Result<()> {
        let position = *self
            .positions
            .get(&id)
            .ok_or(GeoTableError::RowNotFound(id))?;

        match self.rows[position].state {
            RowState::Deleted => Ok(()),
            RowState::Added => self.remove_row(id).map(|_| ()),
            _ => {
                self.unindex_row(position)?;
                self.rows[position].state = RowState::Deleted;
                self.invalidate_extents();
                Ok(())
            }
        }
    }

    /// Purge deleted rows and mark every remaining row as unchanged.
    pub fn accept_changes(&mut self) {
        self.rows.retain(|row| !row.is_deleted());
        self.positions.clear();
        for (position, row) in self.rows.iter_mut().enumerate() {
            row.state = RowState::Unchanged;
            if let Some(id) = row.id {
                self.positions.insert(id, position);
            }
        }
    }

    /// Replace the geometry of a live row and re-index it. Returns the previous geometry.
    pub fn set_geometry(
        &mut self,
        id: RowId,
        geometry: Option<Geometry<f64>>,
    ) -> Result<Option<Geometry<f64>>> {
        let position = self.live_position(id)?;
        self.unindex_row(position)?;

        let row = &mut self.rows[position];
        let previous = row.replace_geometry(geometry);
        row.mark_modified();

        if let (Some(index), Some(extents)) = (self.index.as_mut(), row.extents()) {
            index.insert_with_extents(extents, id);
        }
        self.invalidate_extents();
        Ok(previous)
    }

    /// Set one attribute of a live row, checking the column kind and nullability.
    pub fn set_attribute(
        &mut self,
        id: RowId,
        column: &str,
        value: impl Into<AttributeValue>,
    ) -> Result<()> {
        let position = self.live_position(id)?;
        let column_position = self.schema.position(column).ok_or_else(|| {
            GeoTableError::SchemaMismatch(format!("unknown column '{}'", column))
        })?;
        let value = value.into();
        self.schema.columns()[column_position].check(&value)?;

        let row = &mut self.rows[position];
        row.values[column_position] = value;
        row.mark_modified();
        Ok(())
    }

    /// A table holding copies of every row changed since the last
    /// [`accept_changes`][Self::accept_changes], states preserved. `None` when nothing changed.
    pub fn get_changes(&self) -> Option<FeatureTable> {
        let mut changes = self.clone_schema();
        for row in self.rows.iter().filter(|row| row.state != RowState::Unchanged) {
            changes.push_row(row.detached_copy(), row.state);
        }
        (!changes.is_empty()).then_some(changes)
    }

    /// An empty table with the same schema and indexing configuration.
    pub fn clone_schema(&self) -> FeatureTable {
        let mut table = FeatureTable::new(self.schema.clone());
        table.index_builder = self.index_builder.clone();
        if self.index.is_some() {
            table.index = Some(table.index_builder.build());
        }
        table
    }

    /// Remove every row. An enabled index stays enabled, empty.
    pub fn clear(&mut self) {
        self.rows.clear();
        self.positions.clear();
        if let Some(index) = self.index.as_mut() {
            index.clear();
        }
        self.invalidate_extents();
    }

    /// Merge the live rows of `other` into this table with the default [`MergeOptions`]:
    /// pending changes are overwritten and the schemas must be compatible.
    pub fn merge(&mut self, other: &FeatureTable) -> Result<()> {
        self.merge_rows(other, &MergeOptions::default(), None)
    }

    /// Merge the live rows of `other` into this table.
    ///
    /// When the schema has a key column, a row whose key matches a row of this table overwrites
    /// that row's values and geometry. With `preserve_changes`, a matched row that was added,
    /// modified or deleted since the last [`accept_changes`][Self::accept_changes] is left as it
    /// is. Every unmatched row, and every row matching only a deleted one, is imported.
    pub fn merge_with(&mut self, other: &FeatureTable, options: &MergeOptions) -> Result<()> {
        self.merge_rows(other, options, None)
    }

    /// Like [`merge`][Self::merge], with every source geometry passed through `transform`.
    pub fn merge_transformed(
        &mut self,
        other: &FeatureTable,
        transform: &ProjectionTransform,
    ) -> Result<()> {
        self.merge_rows(other, &MergeOptions::default(), Some(transform))
    }

    fn merge_rows(
        &mut self,
        other: &FeatureTable,
        options: &MergeOptions,
        transform: Option<&ProjectionTransform>,
    ) -> Result<()> {
        let columns = self.merge_schema(&other.schema, options.schema_action)?;
        let source_key = self
            .schema
            .key_position()
            .and_then(|key| columns.iter().position(|&column| column == key));

        for source in other.iter() {
            let target = source_key
                .and_then(|position| source.value(position))
                .filter(|value| !value.is_null())
                .and_then(|value| self.key_match(value));
            if options.preserve_changes
                && matches!(target, Some((_, state)) if state != RowState::Unchanged)
            {
                continue;
            }

            let geometry = match (source.geometry(), transform) {
                (Some(geometry), Some(transform)) => Some(transform.transform_geometry(geometry)?),
                (geometry, _) => geometry.cloned(),
            };
            match target {
                Some((id, state)) if state != RowState::Deleted => {
                    let position = self.live_position(id)?;
                    let mut values = self.rows[position].values.clone();
                    for (value, &column) in source.values.iter().zip(&columns) {
                        values[column] = value.clone();
                    }
                    self.schema.check_values(&values)?;
                    self.set_geometry(id, geometry)?;
                    self.rows[position].values = values;
                }
                _ => {
                    let mut values = vec![AttributeValue::Null; self.schema.len()];
                    for (value, &column) in source.values.iter().zip(&columns) {
                        values[column] = value.clone();
                    }
                    self.schema.check_values(&values)?;
                    self.push_row(FeatureRow::new(geometry, values), RowState::Added);
                }
            }
        }
        Ok(())
    }

    /// The position in this table of every column of `source`, adding missing columns when
    /// `action` allows it. Existing rows hold null in added columns.
    fn merge_schema(&mut self, source: &Schema, action: SchemaMergeAction) -> Result<Vec<usize>> {
        if action == SchemaMergeAction::Error {
            if !self.schema.is_compatible(source) {
                return Err(GeoTableError::SchemaMismatch(
                    "cannot merge tables with different columns".to_string(),
                ));
            }
            return Ok((0..source.len()).collect());
        }

        let mut missing = Vec::new();
        for column in source.columns() {
            match self.schema.position(column.name()).and_then(|p| self.schema.column(p)) {
                Some(existing) if existing.kind() != column.kind() => {
                    return Err(GeoTableError::SchemaMismatch(format!(
                        "column '{}' holds {} values, the merged table has {}",
                        existing.name(),
                        existing.kind(),
                        column.kind()
                    )));
                }
                Some(_) => {}
                None => missing.push(Column::new(column.name(), column.kind())),
            }
        }

        if !missing.is_empty() {
            debug!("Merge adds {} columns to the table schema", missing.len());
        }
        for column in missing {
            self.schema.add_column(column)?;
            for row in self.rows.iter_mut() {
                row.values.push(AttributeValue::Null);
            }
        }

        if action == SchemaMergeAction::AddWithKey && self.schema.key_position().is_none() {
            if let Some(key) = source.primary_key() {
                self.schema.set_primary_key(&[key.name()])?;
            }
        }

        source
            .columns()
            .iter()
            .map(|column| {
                self.schema.position(column.name()).ok_or_else(|| {
                    GeoTableError::SchemaMismatch(format!("unknown column '{}'", column.name()))
                })
            })
            .collect()
    }

    /// The id and state of the row whose key column holds `key`. Live rows are preferred over
    /// deleted ones.
    fn key_match(&self, key: &AttributeValue) -> Option<(RowId, RowState)> {
        let position = self.schema.key_position()?;
        let matches = |row: &&FeatureRow| row.value(position) == Some(key);
        let row = self
            .iter()
            .find(matches)
            .or_else(|| self.rows.iter().find(matches))?;
        Some((row.id?, row.state))
    }

    /// The union of the extents of all live rows, `None` if no row has a non-empty geometry.
    ///
    /// Cached until the next change to the rows.
    pub fn extents(&self) -> Option<Extents> {
        if self.extents_dirty.get() {
            let extents = self
                .iter()
                .filter_map(FeatureRow::extents)
                .reduce(|acc, extents| acc.union(&extents));
            self.extents.set(extents);
            self.extents_dirty.set(false);
        }
        self.extents.get()
    }

    pub fn is_spatially_indexed(&self) -> bool {
        self.index.is_some()
    }

    /// Turn the spatial index on or off. Turning it on builds a fresh index from the current
    /// rows, turning it off discards the index.
    pub fn set_spatially_indexed(&mut self, indexed: bool) {
        match (indexed, self.index.is_some()) {
            (true, false) => self.index = Some(self.build_index()),
            (false, true) => {
                debug!("Dropping spatial index of {} rows", self.rows.len());
                self.index = None;
            }
            _ => {}
        }
    }

    /// The spatial index over row ids, if enabled.
    pub fn index(&self) -> Option<&DynamicRTree<RowId>> {
        self.index.as_ref()
    }

    /// Live rows whose geometry intersects the given extents.
    pub fn select_extents(&self, extents: &Extents) -> Selection<'_> {
        self.select(&SpatialQuery::new(
            SpatialOperation::Intersects,
            extents.to_geometry(),
        ))
    }

    /// Live rows whose geometry intersects `geometry`.
    pub fn select_geometry(&self, geometry: &Geometry<f64>) -> Selection<'_> {
        self.select(&SpatialQuery::new(
            SpatialOperation::Intersects,
            geometry.clone(),
        ))
    }

    /// Live rows matching a spatial predicate.
    ///
    /// With an extents filter the predicate is evaluated against the extents of each row;
    /// with a geometry filter it is evaluated against the row geometry. An empty filter geometry
    /// selects nothing. Rows without a geometry never match.
    pub fn select(&self, query: &SpatialQuery) -> Selection<'_> {
        Selection::new(self, query.clone())
    }

    fn build_index(&self) -> DynamicRTree<RowId> {
        let mut index = self.index_builder.build();
        for row in self.iter() {
            if let (Some(id), Some(extents)) = (row.id, row.extents()) {
                index.insert_with_extents(extents, id);
            }
        }
        debug!(
            "Built spatial index over {} of {} rows, height {}",
            index.len(),
            self.rows.len(),
            index.height()
        );
        index
    }

    /// Remove the index entry of the row at `position`, if any.
    fn unindex_row(&mut self, position: usize) -> Result<()> {
        let row = &self.rows[position];
        if let (Some(index), Some(id), Some(extents)) =
            (self.index.as_mut(), row.id, row.extents())
        {
            index.remove_within(&extents, &id)?;
        }
        Ok(())
    }

    fn live_position(&self, id: RowId) -> Result<usize> {
        match self.positions.get(&id) {
            Some(&position) if !self.rows[position].is_deleted() => Ok(position),
            _ => Err(GeoTableError::RowNotFound(id)),
        }
    }

    fn invalidate_extents(&self) {
        self.extents_dirty.set(true);
    }
}

enum Candidates<'a> {
    Index(QueryIter<'a, RowId>),
    Scan(std::slice::Iter<'a, FeatureRow>),
    Empty,
}

/// A lazy iterator over the rows matching a spatial query. Created by
/// [`FeatureTable::select`] and friends.
pub struct Selection<'a> {
    table: &'a FeatureTable,
    query: SpatialQuery,
    filter_geometry: Geometry<f64>,
    filter_extents: Extents,
    candidates: Candidates<'a>,
    /// Rows trivially disjoint from the filter, which an index search never yields.
    disjoint_sweep: Option<QueryIter<'a, RowId>>,
}

impl<'a> Selection<'a> {
    fn new(table: &'a FeatureTable, query: SpatialQuery) -> Self {
        let filter_geometry = query.filter.to_geometry();
        let Some(filter_extents) = query.filter.extents() else {
            return Self {
                table,
                query,
                filter_geometry,
                filter_extents: Extents::new(0., 0., 0., 0.),
                candidates: Candidates::Empty,
                disjoint_sweep: None,
            };
        };

        let (candidates, disjoint_sweep) = match table.index.as_ref() {
            Some(index) => {
                let sweep = (!query.operation.requires_intersection()).then(|| index.iter());
                (Candidates::Index(index.query(&filter_extents)), sweep)
            }
            None => (Candidates::Scan(table.rows.iter()), None),
        };

        Self {
            table,
            query,
            filter_geometry,
            filter_extents,
            candidates,
            disjoint_sweep,
        }
    }

    fn next_candidate(&mut self) -> Option<&'a FeatureRow> {
        let table = self.table;
        match &mut self.candidates {
            Candidates::Index(ids) => ids.next().and_then(|id| table.get(*id)),
            Candidates::Scan(rows) => rows.next(),
            Candidates::Empty => None,
        }
    }

    fn is_match(&self, row: &FeatureRow, row_extents: &Extents) -> bool {
        match (&self.query.filter, row.geometry()) {
            (SpatialFilter::Extents(_), _) => self
                .query
                .is_match(&self.filter_geometry, &row_extents.to_geometry()),
            (SpatialFilter::Geometry(_), Some(geometry)) => {
                self.query.is_match(&self.filter_geometry, geometry)
            }
            (SpatialFilter::Geometry(_), None) => false,
        }
    }
}

impl<'a> Iterator for Selection<'a> {
    type Item = &'a FeatureRow;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(row) = self.next_candidate() {
            if row.is_deleted() {
                continue;
            }
            let Some(extents) = row.extents() else {
                continue;
            };
            if self.is_match(row, &extents) {
                return Some(row);
            }
        }

        let table = self.table;
        let filter_extents = self.filter_extents;
        self.disjoint_sweep.as_mut()?.find_map(|id| {
            let row = table.get(*id)?;
            let extents = row.extents()?;
            (!extents.intersects(&filter_extents)).then_some(row)
        })
    }
}
