use std::fmt;
use std::sync::Arc;

use log::{debug, trace};

use crate::error::{GeoTableError, Result};
use crate::extents::{Extents, HasExtents};
use crate::rtree::builder::BalanceHeuristic;
use crate::rtree::node::{bounds_of, Bounded, Entry, Node};
use crate::rtree::strategy::{InsertStrategy, RestructureStrategy, SplitStrategy};
use crate::rtree::traversal::NodeRef;
use crate::rtree::SpatialIndex;

/// A mutable RTree spatial index.
///
/// Items are stored together with a snapshot of their extents taken at insertion time. The tree
/// never observes later changes to an item, so callers re-index a changed item by removing and
/// inserting it again.
///
/// Create one through [`RTreeBuilder`][crate::rtree::RTreeBuilder]. Read access (queries,
/// traversal, statistics) comes from the [`SpatialIndex`] trait.
pub struct DynamicRTree<T> {
    root: Option<Node<T>>,
    len: usize,
    heuristic: BalanceHeuristic,
    insert: Arc<dyn InsertStrategy>,
    split: Arc<dyn SplitStrategy>,
    restructure: Arc<dyn RestructureStrategy<T>>,
    /// Child positions from the root down to the deepest node still holding the last removed
    /// item's former siblings.
    removal_path: Vec<usize>,
}

impl<T> DynamicRTree<T> {
    pub(crate) fn from_parts(
        heuristic: BalanceHeuristic,
        insert: Arc<dyn InsertStrategy>,
        split: Arc<dyn SplitStrategy>,
        restructure: Arc<dyn RestructureStrategy<T>>,
    ) -> Self {
        Self {
            root: None,
            len: 0,
            heuristic,
            insert,
            split,
            restructure,
            removal_path: Vec::new(),
        }
    }

    pub fn heuristic(&self) -> &BalanceHeuristic {
        &self.heuristic
    }

    /// Insert an item whose extents are computed from the item itself.
    pub fn insert(&mut self, item: T) -> Result<()>
    where
        T: HasExtents,
    {
        let extents = item.extents()?;
        self.insert_with_extents(extents, item);
        Ok(())
    }

    /// Insert an item with explicitly provided extents.
    pub fn insert_with_extents(&mut self, extents: Extents, item: T) {
        self.insert_entry(Entry::new(extents, item));
    }

    fn insert_entry(&mut self, entry: Entry<T>) {
        self.len += 1;
        let Some(mut root) = self.root.take() else {
            self.root = Some(Node::leaf(vec![entry]));
            return;
        };

        if let Some(sibling) = self.insert_into(&mut root, entry) {
            let root = Node::internal(vec![root, sibling]);
            debug!("RTree root split, height is now {}", root.height());
            self.root = Some(root);
        } else {
            self.root = Some(root);
        }
    }

    /// Add `entry` below `node`. Returns the new sibling of `node` if `node` had to be split.
    fn insert_into(&self, node: &mut Node<T>, entry: Entry<T>) -> Option<Node<T>> {
        match node {
            Node::Leaf { extents, entries } => {
                extents.expand_to_include(&entry.extents);
                entries.push(entry);
                if entries.len() <= self.heuristic.max_entries() {
                    return None;
                }
                let moved = self.split_off(entries);
                *extents = bounds_of(entries);
                trace!("Split leaf into {} and {} entries", entries.len(), moved.len());
                Some(Node::leaf(moved))
            }
            Node::Internal { extents, children } => {
                let boxes: Vec<Extents> = children.iter().map(|child| *child.extents()).collect();
                let position = self
                    .insert
                    .choose_subtree(&boxes, &entry.extents)
                    .min(children.len() - 1);
                extents.expand_to_include(&entry.extents);

                let sibling = self.insert_into(&mut children[position], entry)?;
                children.push(sibling);
                if children.len() <= self.heuristic.max_entries() {
                    return None;
                }
                let moved = self.split_off(children);
                *extents = bounds_of(children);
                trace!(
                    "Split internal node into {} and {} children",
                    children.len(),
                    moved.len()
                );
                Some(Node::internal(moved))
            }
        }
    }

    /// Partition an overflowing node according to the split strategy. The returned items move to
    /// a new sibling, the others stay in `items`.
    ///
    /// A strategy answer that is not a partition into two non-empty groups is replaced by an even
    /// split.
    fn split_off<B: Bounded>(&self, items: &mut Vec<B>) -> Vec<B> {
        let boxes: Vec<Extents> = items.iter().map(|item| *item.bounds()).collect();
        let groups = self.split.split(&boxes, self.heuristic.min_entries());

        let mut goes_right: Vec<Option<bool>> = vec![None; items.len()];
        let mut valid = !groups.left.is_empty() && !groups.right.is_empty();
        for (group, side) in [(&groups.left, false), (&groups.right, true)] {
            for &position in group.iter() {
                match goes_right.get_mut(position) {
                    Some(slot) if slot.is_none() => *slot = Some(side),
                    _ => valid = false,
                }
            }
        }
        valid &= goes_right.iter().all(Option::is_some);

        if !valid {
            trace!("{:?} returned an invalid split, splitting evenly", self.split);
            return items.split_off(items.len() / 2);
        }

        let mut kept = Vec::with_capacity(groups.left.len());
        let mut moved = Vec::with_capacity(groups.right.len());
        for (item, side) in items.drain(..).zip(goes_right) {
            if side == Some(true) {
                moved.push(item);
            } else {
                kept.push(item);
            }
        }
        *items = kept;
        moved
    }

    /// Remove an item, found by equality.
    ///
    /// Every leaf has to be searched. Use [`remove_within`][Self::remove_within] when the extents
    /// the item was inserted with are known.
    pub fn remove(&mut self, item: &T) -> Result<T>
    where
        T: PartialEq,
    {
        self.remove_matching(None, item)
            .ok_or(GeoTableError::ItemNotFound)
    }

    /// Remove an item inserted with exactly the given extents.
    ///
    /// Only subtrees fully containing `extents` are searched.
    pub fn remove_within(&mut self, extents: &Extents, item: &T) -> Result<T>
    where
        T: PartialEq,
    {
        self.remove_matching(Some(extents), item)
            .ok_or(GeoTableError::ItemNotFound)
    }

    /// Like [`remove`][Self::remove], but returns `None` instead of an error when the item is
    /// not in the tree.
    pub fn try_remove(&mut self, item: &T) -> Option<T>
    where
        T: PartialEq,
    {
        self.remove_matching(None, item)
    }

    fn remove_matching(&mut self, hint: Option<&Extents>, item: &T) -> Option<T>
    where
        T: PartialEq,
    {
        let root = self.root.as_mut()?;
        let mut path = Vec::new();
        let removed = remove_from(root, hint, item, &mut path)?;
        self.len -= 1;
        if root.is_empty() {
            self.root = None;
            path.clear();
        }
        path.reverse();
        self.removal_path = path;

        let restructure = Arc::clone(&self.restructure);
        restructure.restructure(self);
        Some(removed)
    }

    /// Discard every node. The tree keeps its configuration.
    pub fn clear(&mut self) {
        if self.len > 0 {
            debug!("Clearing RTree holding {} items", self.len);
        }
        self.root = None;
        self.len = 0;
        self.removal_path.clear();
    }

    /// Dissolve the underfull non-root nodes along the path of the last removal and re-insert
    /// their entries, then shrink the root while it has a single child.
    pub(crate) fn condense(&mut self) {
        let path = std::mem::take(&mut self.removal_path);
        let Some(mut root) = self.root.take() else {
            return;
        };

        let mut orphans = Vec::new();
        condense_path(&mut root, &path, self.heuristic.min_entries(), &mut orphans);

        let mut root = (!root.is_empty()).then_some(root);
        if let Some(node) = root.as_mut() {
            node.refresh_extents();
        }
        while matches!(&root, Some(Node::Internal { children, .. }) if children.len() == 1) {
            if let Some(Node::Internal { mut children, .. }) = root.take() {
                root = children.pop();
            }
        }

        self.root = root;
        if orphans.is_empty() {
            return;
        }

        trace!("Condensing RTree, re-inserting {} entries", orphans.len());
        self.len -= orphans.len();
        for entry in orphans {
            self.insert_entry(entry);
        }
    }
}

/// Remove `item` from below `node`.
///
/// On success `path` holds, deepest first, the child positions leading to the deepest node that
/// lost an entry or a child and still exists.
fn remove_from<T: PartialEq>(
    node: &mut Node<T>,
    hint: Option<&Extents>,
    item: &T,
    path: &mut Vec<usize>,
) -> Option<T> {
    match node {
        Node::Leaf { extents, entries } => {
            let position = entries.iter().position(|entry| {
                &entry.item == item && hint.map_or(true, |hint| entry.extents == *hint)
            })?;
            let entry = entries.remove(position);
            if !entries.is_empty() {
                *extents = bounds_of(entries);
            }
            Some(entry.into_item())
        }
        Node::Internal { extents, children } => {
            for position in 0..children.len() {
                if let Some(hint) = hint {
                    if !children[position].extents().contains(hint) {
                        continue;
                    }
                }
                if let Some(found) = remove_from(&mut children[position], hint, item, path) {
                    if children[position].is_empty() {
                        children.remove(position);
                        path.clear();
                    } else {
                        path.push(position);
                    }
                    if !children.is_empty() {
                        *extents = bounds_of(children);
                    }
                    return Some(found);
                }
            }
            None
        }
    }
}

/// Follow `path` down from `node`, then on the way back up move the leaf entries of every
/// underfull node into `orphans` and drop the node.
fn condense_path<T>(
    node: &mut Node<T>,
    path: &[usize],
    min_entries: usize,
    orphans: &mut Vec<Entry<T>>,
) {
    let Some((&position, rest)) = path.split_first() else {
        return;
    };
    let Node::Internal { children, .. } = &mut *node else {
        return;
    };
    let Some(child) = children.get_mut(position) else {
        return;
    };

    condense_path(child, rest, min_entries, orphans);
    if child.len() < min_entries {
        children.remove(position).drain_entries_into(orphans);
    }
    if !node.is_empty() {
        node.refresh_extents();
    }
}

impl<T> SpatialIndex<T> for DynamicRTree<T> {
    fn root(&self) -> Option<NodeRef<'_, T>> {
        self.root.as_ref().map(NodeRef::new)
    }

    fn len(&self) -> usize {
        self.len
    }
}

impl<T> fmt::Debug for DynamicRTree<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicRTree")
            .field("len", &self.len)
            .field("height", &self.height())
            .field("heuristic", &self.heuristic)
            .field("insert", &self.insert)
            .field("split", &self.split)
            .field("restructure", &self.restructure)
            .finish()
    }
}
