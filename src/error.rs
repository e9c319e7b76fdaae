use std::fmt::Debug;
use thiserror::Error;

use crate::table::RowId;

/// Enum with all errors in this crate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeoTableError {
    #[error("General error: {0}")]
    General(String),

    #[error("Missing projection parameter '{0}'")]
    MissingParameter(String),

    #[error("Invalid value {value} for projection parameter '{name}'")]
    InvalidParameter { name: String, value: f64 },

    #[error("Unsupported projection: {0}")]
    UnsupportedProjection(String),

    /// An iterative solver exhausted its iteration budget without reaching tolerance.
    #[error("{operation} did not converge after {iterations} iterations")]
    NoConvergence {
        operation: &'static str,
        iterations: usize,
    },

    #[error("Item not found in spatial index")]
    ItemNotFound,

    #[error("Row {0} not found")]
    RowNotFound(RowId),

    #[error("Cannot compute the extents of an empty geometry")]
    EmptyGeometry,

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Invalid node fan-out: min {min}, max {max}")]
    InvalidFanout { min: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, GeoTableError>;
