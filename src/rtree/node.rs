//! Nodes of the dynamic R-tree.

use crate::extents::Extents;

/// An item stored in a leaf, together with the extents it was inserted with.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry<T> {
    pub(crate) extents: Extents,
    pub(crate) item: T,
}

impl<T> Entry<T> {
    pub fn new(extents: Extents, item: T) -> Self {
        Self { extents, item }
    }

    /// The extents snapshot taken when the item was inserted.
    pub fn extents(&self) -> &Extents {
        &self.extents
    }

    pub fn item(&self) -> &T {
        &self.item
    }

    pub fn into_item(self) -> T {
        self.item
    }
}

/// A node of the tree.
///
/// A node is never empty: the tree drops nodes as soon as their last entry or child is removed.
/// Its `extents` is always the exact union of its contents.
#[derive(Debug, Clone)]
pub(crate) enum Node<T> {
    Leaf {
        extents: Extents,
        entries: Vec<Entry<T>>,
    },
    Internal {
        extents: Extents,
        children: Vec<Node<T>>,
    },
}

impl<T> Node<T> {
    pub(crate) fn leaf(entries: Vec<Entry<T>>) -> Self {
        debug_assert!(!entries.is_empty());
        Node::Leaf {
            extents: bounds_of(&entries),
            entries,
        }
    }

    pub(crate) fn internal(children: Vec<Node<T>>) -> Self {
        debug_assert!(!children.is_empty());
        Node::Internal {
            extents: bounds_of(&children),
            children,
        }
    }

    pub(crate) fn extents(&self) -> &Extents {
        match self {
            Node::Leaf { extents, .. } | Node::Internal { extents, .. } => extents,
        }
    }

    pub(crate) fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    /// Number of entries (leaf) or children (internal node).
    pub(crate) fn len(&self) -> usize {
        match self {
            Node::Leaf { entries, .. } => entries.len(),
            Node::Internal { children, .. } => children.len(),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Recompute the stored extents from the node's contents. Must not be called on an empty
    /// node.
    pub(crate) fn refresh_extents(&mut self) {
        match self {
            Node::Leaf { extents, entries } => *extents = bounds_of(entries),
            Node::Internal { extents, children } => *extents = bounds_of(children),
        }
    }

    /// Move every leaf entry below this node into `out`.
    pub(crate) fn drain_entries_into(self, out: &mut Vec<Entry<T>>) {
        match self {
            Node::Leaf { entries, .. } => out.extend(entries),
            Node::Internal { children, .. } => {
                for child in children {
                    child.drain_entries_into(out);
                }
            }
        }
    }

    /// Number of levels from this node down to its leaves, counting this node.
    pub(crate) fn height(&self) -> usize {
        let mut height = 1;
        let mut node = self;
        while let Node::Internal { children, .. } = node {
            match children.first() {
                Some(child) => {
                    node = child;
                    height += 1;
                }
                None => break,
            }
        }
        height
    }
}

/// Something stored inside a node that carries a bounding box.
pub(crate) trait Bounded {
    fn bounds(&self) -> &Extents;
}

impl<T> Bounded for Entry<T> {
    fn bounds(&self) -> &Extents {
        &self.extents
    }
}

impl<T> Bounded for Node<T> {
    fn bounds(&self) -> &Extents {
        self.extents()
    }
}

/// The union of the bounds of a non-empty slice.
pub(crate) fn bounds_of<B: Bounded>(items: &[B]) -> Extents {
    let mut iter = items.iter();
    let mut acc = *iter
        .next()
        .expect("bounds_of requires at least one item")
        .bounds();
    for item in iter {
        acc.expand_to_include(item.bounds());
    }
    acc
}
