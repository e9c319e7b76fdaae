use crate::rtree::index::DynamicRTree;
use crate::rtree::strategy::RestructureStrategy;

/// Leaves the tree untouched after removals.
///
/// Nodes emptied by a removal are still dropped, but underfull nodes are kept as they are. Query
/// results stay correct; only pruning efficiency degrades under heavy churn. This is the default.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRestructure;

impl<T> RestructureStrategy<T> for NullRestructure {
    fn restructure(&self, _tree: &mut DynamicRTree<T>) {}
}

/// Guttman's CondenseTree applied after every removal.
///
/// Every non-root node on the path of the removal holding fewer than the minimum number of
/// entries is dissolved and its leaf entries are re-inserted from the top. A root left with a
/// single child is replaced by that child, shrinking the tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct CondenseRestructure;

impl<T> RestructureStrategy<T> for CondenseRestructure {
    fn restructure(&self, tree: &mut DynamicRTree<T>) {
        tree.condense();
    }
}
