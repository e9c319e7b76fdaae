use std::fmt;
use std::sync::Arc;

use crate::error::{GeoTableError, Result};
use crate::rtree::index::DynamicRTree;
use crate::rtree::strategy::{
    GuttmanQuadraticInsert, GuttmanQuadraticSplit, InsertStrategy, NullRestructure,
    RestructureStrategy, SplitStrategy,
};

/// The default minimum number of entries per node used by [`RTreeBuilder::new`]
pub const DEFAULT_MIN_ENTRIES: usize = 4;

/// The default maximum number of entries per node used by [`RTreeBuilder::new`]
pub const DEFAULT_MAX_ENTRIES: usize = 10;

/// Fan-out bounds of the nodes of a dynamic RTree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceHeuristic {
    min_entries: usize,
    max_entries: usize,
}

impl BalanceHeuristic {
    /// Create new fan-out bounds.
    ///
    /// A split must be able to give both halves at least `min_entries` entries, so
    /// `min_entries` must be at least 1 and at most half of `max_entries`.
    pub fn new(min_entries: usize, max_entries: usize) -> Result<Self> {
        if min_entries == 0 || max_entries < 2 || min_entries * 2 > max_entries {
            return Err(GeoTableError::InvalidFanout {
                min: min_entries,
                max: max_entries,
            });
        }
        Ok(Self {
            min_entries,
            max_entries,
        })
    }

    pub fn min_entries(&self) -> usize {
        self.min_entries
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }
}

impl Default for BalanceHeuristic {
    fn default() -> Self {
        Self {
            min_entries: DEFAULT_MIN_ENTRIES,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

/// A builder to configure and create empty [`DynamicRTree`]s.
///
/// The builder is a reusable template: every call to [`build`][Self::build] creates a new, empty
/// tree sharing the configured strategies.
///
/// ```
/// use geo_table::rtree::{RTreeBuilder, SpatialIndex};
/// use geo_table::rtree::strategy::CondenseRestructure;
/// use geo_table::Extents;
///
/// let mut tree = RTreeBuilder::new_with_fanout(2, 4)
///     .unwrap()
///     .restructure_strategy(CondenseRestructure)
///     .build();
/// tree.insert_with_extents(Extents::new(0., 0., 1., 1.), "a");
/// tree.insert_with_extents(Extents::new(5., 5., 6., 6.), "b");
/// let found: Vec<_> = tree.query(&Extents::new(0., 0., 2., 2.)).collect();
/// assert_eq!(found, vec![&"a"]);
/// ```
pub struct RTreeBuilder<T> {
    heuristic: BalanceHeuristic,
    insert: Arc<dyn InsertStrategy>,
    split: Arc<dyn SplitStrategy>,
    restructure: Arc<dyn RestructureStrategy<T>>,
}

impl<T> RTreeBuilder<T> {
    /// Create a new builder with the default fan-out and Guttman quadratic strategies.
    pub fn new() -> Self {
        Self::with_heuristic(BalanceHeuristic::default())
    }

    /// Create a new builder with the provided fan-out bounds.
    pub fn new_with_fanout(min_entries: usize, max_entries: usize) -> Result<Self> {
        Ok(Self::with_heuristic(BalanceHeuristic::new(
            min_entries,
            max_entries,
        )?))
    }

    pub fn with_heuristic(heuristic: BalanceHeuristic) -> Self {
        Self {
            heuristic,
            insert: Arc::new(GuttmanQuadraticInsert),
            split: Arc::new(GuttmanQuadraticSplit),
            restructure: Arc::new(NullRestructure),
        }
    }

    pub fn heuristic(&self) -> &BalanceHeuristic {
        &self.heuristic
    }

    pub fn insert_strategy(mut self, strategy: impl InsertStrategy + 'static) -> Self {
        self.insert = Arc::new(strategy);
        self
    }

    pub fn split_strategy(mut self, strategy: impl SplitStrategy + 'static) -> Self {
        self.split = Arc::new(strategy);
        self
    }

    pub fn restructure_strategy(mut self, strategy: impl RestructureStrategy<T> + 'static) -> Self {
        self.restructure = Arc::new(strategy);
        self
    }

    /// Create an empty tree with this configuration.
    pub fn build(&self) -> DynamicRTree<T> {
        DynamicRTree::from_parts(
            self.heuristic,
            Arc::clone(&self.insert),
            Arc::clone(&self.split),
            Arc::clone(&self.restructure),
        )
    }
}

impl<T> Default for RTreeBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for RTreeBuilder<T> {
    fn clone(&self) -> Self {
        Self {
            heuristic: self.heuristic,
            insert: Arc::clone(&self.insert),
            split: Arc::clone(&self.split),
            restructure: Arc::clone(&self.restructure),
        }
    }
}

impl<T> fmt::Debug for RTreeBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RTreeBuilder")
            .field("heuristic", &self.heuristic)
            .field("insert", &self.insert)
            .field("split", &self.split)
            .field("restructure", &self.restructure)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::rtree::SpatialIndex;

    #[test]
    fn rejects_unsplittable_fanout() {
        assert!(BalanceHeuristic::new(0, 4).is_err());
        assert!(BalanceHeuristic::new(3, 5).is_err());
        assert_eq!(
            BalanceHeuristic::new(3, 5).unwrap_err(),
            GeoTableError::InvalidFanout { min: 3, max: 5 }
        );
        assert!(BalanceHeuristic::new(2, 4).is_ok());
    }

    #[test]
    fn builds_independent_trees() {
        let builder = RTreeBuilder::<u32>::new();
        let mut a = builder.build();
        let b = builder.build();
        a.insert_with_extents(crate::Extents::new(0., 0., 1., 1.), 1);
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 0);
        assert_eq!(a.heuristic(), &BalanceHeuristic::default());
    }
}
