//! Octree node storage.

use crate::BoundingBox;

/// Identifier of a node within its tree's arena.
///
/// Ids are handles, not references: they stay cheap to copy and compare,
/// and they become stale once the node is detached by auto-deletion or an
/// explicit clear. [`Octree::node`](crate::Octree::node) returns `None`
/// for stale ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Returns the raw arena index.
    #[inline]
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A node in the octree.
///
/// Each node covers an axis-aligned region of space and exclusively owns
/// an ordered payload of items plus up to eight child nodes, one per
/// octant of its bound. Items live in exactly one node: subdivision moves
/// an item into a child only when that child's octant wholly contains the
/// item's bound, so boundary-straddling items stay at the node that found
/// them.
///
/// The `parent` link is a non-owning back-reference used for upward walks
/// (hit-path recording, removal fallback) and self-detachment; ownership
/// only ever flows downward through the child slots.
#[derive(Debug, Clone)]
pub struct OctreeNode<T> {
    /// Region covered by this node.
    bound: BoundingBox,

    /// Derived octant cache: the 8 sub-regions of `bound`, or empty when
    /// the bound no longer subdivides. Recomputed whenever `bound` changes.
    octants: Vec<BoundingBox>,

    /// Items owned by this node.
    items: Vec<T>,

    /// Child slots, one per octant.
    children: [Option<NodeId>; 8],

    /// Bitmask of occupied child slots; bit `i` set iff `children[i]` is
    /// occupied.
    active: u8,

    /// Whether this node's own subdivision step has run.
    built: bool,

    /// Non-owning link to the parent; `None` only for the root.
    parent: Option<NodeId>,
}

impl<T> OctreeNode<T> {
    /// Creates a node over `bound` holding `items`, with its octant cache
    /// derived for the given minimum node size.
    pub(crate) fn new(
        bound: BoundingBox,
        items: Vec<T>,
        parent: Option<NodeId>,
        min_size: f32,
    ) -> Self {
        Self {
            octants: bound.subdivide(min_size),
            bound,
            items,
            children: [None; 8],
            active: 0,
            built: false,
            parent,
        }
    }

    /// Returns the node's bound.
    #[inline]
    pub fn bound(&self) -> BoundingBox {
        self.bound
    }

    /// Returns the derived octant regions: exactly 8, or empty when the
    /// bound no longer subdivides.
    #[inline]
    pub fn octants(&self) -> &[BoundingBox] {
        &self.octants
    }

    /// Returns the node's payload.
    #[inline]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Returns the child occupying slot `i`, if any.
    #[inline]
    pub fn child(&self, i: usize) -> Option<NodeId> {
        self.children[i]
    }

    /// Returns the ids of all occupied child slots, in slot order.
    pub fn children(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.children.iter().filter_map(|c| *c)
    }

    /// Returns the active-slot bitmask.
    #[inline]
    pub fn active_mask(&self) -> u8 {
        self.active
    }

    /// Returns `true` if any child slot is occupied.
    #[inline]
    pub fn has_children(&self) -> bool {
        self.active != 0
    }

    /// Returns `true` if the node has no children and no payload.
    #[inline]
    pub fn is_empty(&self) -> bool {
        !self.has_children() && self.items.is_empty()
    }

    /// Returns `true` if this node has no parent.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Returns whether this node's subdivision step has run.
    #[inline]
    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Returns the parent id; `None` for the root.
    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Replaces the bound, recomputing the octant cache in the same step.
    ///
    /// Assigning the current bound is a no-op, keeping the cache untouched.
    pub(crate) fn set_bound(&mut self, bound: BoundingBox, min_size: f32) {
        if self.bound == bound {
            return;
        }
        self.octants = bound.subdivide(min_size);
        self.bound = bound;
    }

    pub(crate) fn items_mut(&mut self) -> &mut Vec<T> {
        &mut self.items
    }

    pub(crate) fn mark_built(&mut self) {
        self.built = true;
    }

    /// Occupies child slot `i` and sets its mask bit.
    pub(crate) fn set_child(&mut self, i: usize, child: NodeId) {
        self.children[i] = Some(child);
        self.active |= 1 << i;
    }

    /// Vacates the slot holding `child` and clears its mask bit.
    /// Returns `false` when no slot holds `child`.
    pub(crate) fn clear_child(&mut self, child: NodeId) -> bool {
        for i in 0..self.children.len() {
            if self.children[i] == Some(child) {
                self.children[i] = None;
                self.active &= !(1 << i);
                return true;
            }
        }
        false
    }

    /// Vacates every child slot.
    pub(crate) fn clear_children(&mut self) {
        self.children = [None; 8];
        self.active = 0;
    }

    pub(crate) fn set_parent(&mut self, parent: Option<NodeId>) {
        self.parent = parent;
    }
}
