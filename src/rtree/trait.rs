use geo_traits::RectTrait;

use crate::extents::Extents;
use crate::rtree::traversal::{NodeRef, QueryEntries, QueryIter, TreeStats};

/// A trait for searching and accessing data out of a dynamic RTree.
pub trait SpatialIndex<T>: Sized {
    /// The root node, or `None` when the tree is empty.
    fn root(&self) -> Option<NodeRef<'_, T>>;

    /// The total number of items contained in this tree.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The number of levels (height) of the tree. An empty tree has height 0 and a tree holding a
    /// single leaf has height 1.
    fn height(&self) -> usize {
        self.root().map_or(0, |root| root.height())
    }

    /// The union of the extents of all items, or `None` for an empty tree.
    fn bounds(&self) -> Option<Extents> {
        self.root().map(|root| *root.extents())
    }

    /// Search the tree given the provided bounding box.
    ///
    /// Yields every item whose stored extents intersect `extents`, edges included. Results come
    /// in traversal order, not insertion order. Each call starts a fresh traversal.
    fn query(&self, extents: &Extents) -> QueryIter<'_, T> {
        QueryIter::new(self.query_entries(extents))
    }

    /// Like [`query`][Self::query], but yields the stored entries with their extents snapshot.
    fn query_entries(&self, extents: &Extents) -> QueryEntries<'_, T> {
        QueryEntries::new(self.root(), Some(*extents))
    }

    /// Search the tree with any [`RectTrait`] value as the query box.
    fn query_rect(&self, rect: &impl RectTrait<T = f64>) -> QueryIter<'_, T> {
        self.query(&Extents::from_rect(rect))
    }

    /// Iterate over every item of the tree in traversal order.
    fn iter(&self) -> QueryIter<'_, T> {
        QueryIter::new(QueryEntries::new(self.root(), None))
    }

    /// Walk the whole tree and collect its shape statistics.
    fn stats(&self) -> TreeStats {
        TreeStats::collect(self.root())
    }
}
