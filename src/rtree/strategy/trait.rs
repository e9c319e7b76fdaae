use std::fmt::Debug;

use tinyvec::TinyVec;

use crate::extents::Extents;
use crate::rtree::index::DynamicRTree;

/// Positions of the entries assigned to one side of a split.
///
/// Node fan-out is small, so groups usually stay on the stack.
pub type SplitGroup = TinyVec<[usize; 16]>;

/// The two halves of an overflowing node, as positions into the node's entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitGroups {
    /// Entries that stay in the overflowing node.
    pub left: SplitGroup,
    /// Entries that move to the newly created sibling.
    pub right: SplitGroup,
}

/// Decides which child of an internal node receives a new item.
pub trait InsertStrategy: Debug + Send + Sync {
    /// Returns the position in `children` of the subtree that should receive an item with the
    /// given extents. `children` is never empty.
    fn choose_subtree(&self, children: &[Extents], extents: &Extents) -> usize;
}

/// Decides how the entries of an overflowing node are divided between two nodes.
pub trait SplitStrategy: Debug + Send + Sync {
    /// Partition `boxes` (the extents of every entry of an overflowing node, at least two) into
    /// two non-empty groups, each holding at least `min_entries` positions when possible.
    fn split(&self, boxes: &[Extents], min_entries: usize) -> SplitGroups;
}

/// Reorganizes a tree after an item was removed.
pub trait RestructureStrategy<T>: Debug + Send + Sync {
    fn restructure(&self, tree: &mut DynamicRTree<T>);
}
