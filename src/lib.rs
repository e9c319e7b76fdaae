//! Spatial feature tables for Rust.
//!
//! - [`rtree::DynamicRTree`]: a mutable R-tree with pluggable insert, split and restructure
//!   strategies.
//! - [`table::FeatureTable`]: an in-memory table of features with typed attributes, change
//!   tracking and spatial selection, optionally backed by a dynamic R-tree.
//! - [`projection`]: meridian distance, Krovak and Transverse Mercator projections behind a
//!   common [`projection::MapProjection`] trait.

pub mod error;
pub mod extents;
pub mod projection;
pub mod rtree;
pub mod table;

pub use error::{GeoTableError, Result};
pub use extents::{Extents, HasExtents};

#[cfg(test)]
pub(crate) mod test;
