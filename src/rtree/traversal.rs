//! Utilities to traverse the RTree structure.

use geo::Coord;
use geo_traits::{
    Dimensions, GeometryTrait, GeometryType, RectTrait, UnimplementedGeometryCollection,
    UnimplementedLine, UnimplementedLineString, UnimplementedMultiLineString,
    UnimplementedMultiPoint, UnimplementedMultiPolygon, UnimplementedPoint, UnimplementedPolygon,
    UnimplementedTriangle,
};

use crate::extents::{Extents, RectGeometryType};
use crate::rtree::node::{Entry, Node};

/// A reference onto a node of a [`DynamicRTree`][crate::rtree::DynamicRTree], for manual
/// traversal.
#[derive(Debug)]
pub struct NodeRef<'a, T> {
    pub(crate) node: &'a Node<T>,
}

impl<T> Clone for NodeRef<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for NodeRef<'_, T> {}

impl<'a, T> NodeRef<'a, T> {
    pub(crate) fn new(node: &'a Node<T>) -> Self {
        Self { node }
    }

    /// The exact union of everything below this node.
    pub fn extents(&self) -> &'a Extents {
        self.node.extents()
    }

    /// Returns `true` if this is a leaf node holding entries.
    pub fn is_leaf(&self) -> bool {
        self.node.is_leaf()
    }

    /// Returns `true` if this is an intermediate node with children.
    pub fn is_parent(&self) -> bool {
        !self.is_leaf()
    }

    /// Number of children (intermediate node) or entries (leaf).
    pub fn len(&self) -> usize {
        self.node.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node.is_empty()
    }

    /// Returns an iterator over the child nodes of this node. Empty for leaves.
    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a, T>> + 'a {
        let children: &'a [Node<T>] = match self.node {
            Node::Internal { children, .. } => children,
            Node::Leaf { .. } => &[],
        };
        children.iter().map(NodeRef::new)
    }

    /// The entries stored in this node. Empty for intermediate nodes.
    pub fn entries(&self) -> &'a [Entry<T>] {
        match self.node {
            Node::Leaf { entries, .. } => entries,
            Node::Internal { .. } => &[],
        }
    }

    /// Number of levels from this node down to its leaves, counting this node.
    pub fn height(&self) -> usize {
        self.node.height()
    }

    /// Returns `true` if this node intersects the given extents.
    pub fn intersects(&self, extents: &Extents) -> bool {
        self.extents().intersects(extents)
    }
}

impl<T> GeometryTrait for NodeRef<'_, T> {
    type T = f64;
    type PointType<'b>
        = UnimplementedPoint<f64>
    where
        Self: 'b;
    type LineStringType<'b>
        = UnimplementedLineString<f64>
    where
        Self: 'b;
    type PolygonType<'b>
        = UnimplementedPolygon<f64>
    where
        Self: 'b;
    type MultiPointType<'b>
        = UnimplementedMultiPoint<f64>
    where
        Self: 'b;
    type MultiLineStringType<'b>
        = UnimplementedMultiLineString<f64>
    where
        Self: 'b;
    type MultiPolygonType<'b>
        = UnimplementedMultiPolygon<f64>
    where
        Self: 'b;
    type GeometryCollectionType<'b>
        = UnimplementedGeometryCollection<f64>
    where
        Self: 'b;
    type RectType<'b>
        = Extents
    where
        Self: 'b;
    type TriangleType<'b>
        = UnimplementedTriangle<f64>
    where
        Self: 'b;
    type LineType<'b>
        = UnimplementedLine<f64>
    where
        Self: 'b;

    fn dim(&self) -> Dimensions {
        Dimensions::Xy
    }

    /// A node is seen as its bounding rectangle.
    fn as_type(&self) -> RectGeometryType<'_> {
        GeometryType::Rect(self.extents())
    }
}

impl<T> RectTrait for NodeRef<'_, T> {
    type CoordType<'b>
        = Coord<f64>
    where
        Self: 'b;

    fn min(&self) -> Self::CoordType<'_> {
        self.extents().min()
    }

    fn max(&self) -> Self::CoordType<'_> {
        self.extents().max()
    }
}

fn matches(query: &Option<Extents>, extents: &Extents) -> bool {
    match query {
        Some(query) => query.intersects(extents),
        None => true,
    }
}

/// A lazy depth-first search over the entries of a tree.
///
/// Subtrees whose extents do not intersect the query are never visited. Created by
/// [`SpatialIndex::query_entries`][crate::rtree::SpatialIndex::query_entries].
#[derive(Debug)]
pub struct QueryEntries<'a, T> {
    /// `None` matches everything.
    query: Option<Extents>,
    stack: Vec<&'a Node<T>>,
    entries: std::slice::Iter<'a, Entry<T>>,
}

impl<'a, T> QueryEntries<'a, T> {
    pub(crate) fn new(root: Option<NodeRef<'a, T>>, query: Option<Extents>) -> Self {
        let stack = root
            .map(|root| root.node)
            .filter(|root| matches(&query, root.extents()))
            .into_iter()
            .collect();
        Self {
            query,
            stack,
            entries: Default::default(),
        }
    }
}

impl<'a, T> Iterator for QueryEntries<'a, T> {
    type Item = &'a Entry<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let query = self.query;
        loop {
            if let Some(entry) = self
                .entries
                .by_ref()
                .find(|entry| matches(&query, entry.extents()))
            {
                return Some(entry);
            }

            match self.stack.pop()? {
                Node::Leaf { entries, .. } => self.entries = entries.iter(),
                Node::Internal { children, .. } => self.stack.extend(
                    children
                        .iter()
                        .filter(|child| matches(&query, child.extents())),
                ),
            }
        }
    }
}

/// A lazy iterator over the items whose stored extents intersect a query.
#[derive(Debug)]
pub struct QueryIter<'a, T> {
    entries: QueryEntries<'a, T>,
}

impl<'a, T> QueryIter<'a, T> {
    pub(crate) fn new(entries: QueryEntries<'a, T>) -> Self {
        Self { entries }
    }
}

impl<'a, T> Iterator for QueryIter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next().map(Entry::item)
    }
}

/// Shape statistics of a tree, collected by walking every node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeStats {
    /// Number of levels, 0 for an empty tree.
    pub height: usize,
    /// Total number of nodes, leaves included.
    pub node_count: usize,
    /// Depth of every leaf, the root being at depth 1.
    pub leaf_depths: Vec<usize>,
    /// Fan-out of every node except the root.
    pub fanouts: Vec<usize>,
    /// Fan-out of the root, 0 for an empty tree.
    pub root_fanout: usize,
}

impl TreeStats {
    pub(crate) fn collect<T>(root: Option<NodeRef<'_, T>>) -> Self {
        let mut stats = TreeStats::default();
        let Some(root) = root else {
            return stats;
        };
        stats.height = root.height();
        stats.root_fanout = root.len();

        let mut stack = vec![(root, 1)];
        while let Some((node, depth)) = stack.pop() {
            stats.node_count += 1;
            if depth > 1 {
                stats.fanouts.push(node.len());
            }
            if node.is_leaf() {
                stats.leaf_depths.push(depth);
            } else {
                stack.extend(node.children().map(|child| (child, depth + 1)));
            }
        }
        stats
    }

    pub fn leaf_count(&self) -> usize {
        self.leaf_depths.len()
    }

    /// Returns `true` if every leaf sits at the same depth.
    pub fn is_balanced(&self) -> bool {
        self.leaf_depths.iter().all(|&depth| depth == self.height)
    }

    /// The smallest fan-out among non-root nodes.
    pub fn min_fanout(&self) -> Option<usize> {
        self.fanouts.iter().min().copied()
    }

    /// The largest fan-out among non-root nodes.
    pub fn max_fanout(&self) -> Option<usize> {
        self.fanouts.iter().max().copied()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::rtree::{RTreeBuilder, SpatialIndex};

    #[test]
    fn node_is_a_rect_geometry() {
        let mut tree = RTreeBuilder::new().build();
        tree.insert_with_extents(Extents::new(0., 0., 1., 1.), 1);
        tree.insert_with_extents(Extents::new(4., 2., 5., 3.), 2);

        let root = tree.root().unwrap();
        let bounds = Extents::new(0., 0., 5., 3.);
        assert_eq!(root.dim(), Dimensions::Xy);
        assert_eq!(Extents::from_rect(&root), bounds);
        assert!(matches!(
            root.as_type(),
            GeometryType::Rect(extents) if *extents == bounds
        ));
    }
}
