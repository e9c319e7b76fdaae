//! Feature tables: rows of geometry and attributes, with an optional spatial index.

mod feature_table;
pub mod filter;
pub mod row;
pub mod schema;

pub use feature_table::{FeatureTable, MergeOptions, SchemaMergeAction, Selection};
pub use filter::{SpatialFilter, SpatialOperation, SpatialQuery};
pub use row::{FeatureRow, RowId, RowState};
pub use schema::{AttributeKind, AttributeValue, Column, Schema};
