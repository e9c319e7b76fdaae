//! Attribute columns of a feature table.

use std::fmt;

use crate::error::{GeoTableError, Result};

/// The type of values stored in a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    Bool,
    Int,
    Float,
    Text,
    Bytes,
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AttributeKind::Bool => "bool",
            AttributeKind::Int => "int",
            AttributeKind::Float => "float",
            AttributeKind::Text => "text",
            AttributeKind::Bytes => "bytes",
        };
        f.write_str(name)
    }
}

/// A single attribute value of a feature row.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AttributeValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl AttributeValue {
    /// The kind of this value, `None` for [`AttributeValue::Null`].
    pub fn kind(&self) -> Option<AttributeKind> {
        match self {
            AttributeValue::Null => None,
            AttributeValue::Bool(_) => Some(AttributeKind::Bool),
            AttributeValue::Int(_) => Some(AttributeKind::Int),
            AttributeValue::Float(_) => Some(AttributeKind::Float),
            AttributeValue::Text(_) => Some(AttributeKind::Text),
            AttributeValue::Bytes(_) => Some(AttributeKind::Bytes),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Int(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        AttributeValue::Int(value.into())
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Float(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl From<Vec<u8>> for AttributeValue {
    fn from(value: Vec<u8>) -> Self {
        AttributeValue::Bytes(value)
    }
}

impl<V: Into<AttributeValue>> From<Option<V>> for AttributeValue {
    fn from(value: Option<V>) -> Self {
        value.map_or(AttributeValue::Null, Into::into)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    name: String,
    kind: AttributeKind,
    nullable: bool,
}

impl Column {
    /// A nullable column.
    pub fn new(name: impl Into<String>, kind: AttributeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: true,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> AttributeKind {
        self.kind
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Check that `value` may be stored in this column.
    pub fn check(&self, value: &AttributeValue) -> Result<()> {
        match value.kind() {
            None if self.nullable => Ok(()),
            None => Err(GeoTableError::SchemaMismatch(format!(
                "column '{}' does not accept null values",
                self.name
            ))),
            Some(kind) if kind == self.kind => Ok(()),
            Some(kind) => Err(GeoTableError::SchemaMismatch(format!(
                "column '{}' holds {} values, got {}",
                self.name, self.kind, kind
            ))),
        }
    }
}

/// The ordered attribute columns of a table, with an optional single-column key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<Column>,
    key: Option<usize>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column. Column names are unique, compared case-insensitively.
    pub fn with_column(mut self, column: Column) -> Result<Self> {
        self.add_column(column)?;
        Ok(self)
    }

    pub fn add_column(&mut self, column: Column) -> Result<()> {
        if self.position(column.name()).is_some() {
            return Err(GeoTableError::SchemaMismatch(format!(
                "duplicate column '{}'",
                column.name()
            )));
        }
        self.columns.push(column);
        Ok(())
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column(&self, position: usize) -> Option<&Column> {
        self.columns.get(position)
    }

    /// The position of the column with the given name, compared case-insensitively.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|column| column.name().eq_ignore_ascii_case(name))
    }

    /// Set the key column used by [`FeatureTable::find`][crate::table::FeatureTable::find].
    ///
    /// Exactly one column name must be given: compound keys are not supported.
    pub fn set_primary_key(&mut self, columns: &[&str]) -> Result<()> {
        let [name] = columns else {
            return Err(GeoTableError::SchemaMismatch(format!(
                "primary key must have exactly one column, got {}",
                columns.len()
            )));
        };
        let position = self.position(name).ok_or_else(|| {
            GeoTableError::SchemaMismatch(format!("unknown key column '{}'", name))
        })?;
        self.key = Some(position);
        Ok(())
    }

    pub fn primary_key(&self) -> Option<&Column> {
        self.key.and_then(|position| self.columns.get(position))
    }

    pub(crate) fn key_position(&self) -> Option<usize> {
        self.key
    }

    /// Check a full set of row values against the columns.
    pub fn check_values(&self, values: &[AttributeValue]) -> Result<()> {
        if values.len() != self.columns.len() {
            return Err(GeoTableError::SchemaMismatch(format!(
                "expected {} values, got {}",
                self.columns.len(),
                values.len()
            )));
        }
        self.columns
            .iter()
            .zip(values)
            .try_for_each(|(column, value)| column.check(value))
    }

    /// Returns `true` if rows of `other` can be imported into a table with this schema.
    pub fn is_compatible(&self, other: &Schema) -> bool {
        self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .zip(&other.columns)
                .all(|(a, b)| a.kind == b.kind)
    }
}
