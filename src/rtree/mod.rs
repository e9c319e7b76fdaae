//! A dynamic RTree spatial index supporting insertion and removal.

pub mod builder;
pub mod index;
mod node;
pub mod strategy;
pub mod r#trait;
pub mod traversal;

pub use builder::{BalanceHeuristic, RTreeBuilder, DEFAULT_MAX_ENTRIES, DEFAULT_MIN_ENTRIES};
pub use index::DynamicRTree;
pub use node::Entry;
pub use r#trait::SpatialIndex;
pub use traversal::{NodeRef, QueryEntries, QueryIter, TreeStats};
