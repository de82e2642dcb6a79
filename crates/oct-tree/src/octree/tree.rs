//! Octree container and the generic build/insert/remove/query algorithms.

use std::collections::VecDeque;
use std::mem;
use std::time::Instant;

use log::{debug, trace};
use nalgebra::{Matrix4, Vector3};

use crate::{BoundingBox, Containment, HitTestResult, Ray};

use super::node::{NodeId, OctreeNode};
use super::parameter::OctreeBuildParameter;
use super::source::OctreeSource;

/// A dynamic octree accelerating ray hit tests against a payload of
/// spatially bounded items.
///
/// The tree recursively subdivides its root region into octants, moving
/// each item into the deepest node whose octant wholly contains the item's
/// bound. Items straddling an octant boundary stay at the node that found
/// them; items are never split or duplicated.
///
/// Payload behavior comes from an [`OctreeSource`]: how to derive an item's
/// bound and how to hit test a node's payload. The shipped variants are
/// [`MeshOctree`](crate::MeshOctree) for the triangles of a single mesh and
/// [`SceneOctree`](crate::SceneOctree) for whole scene objects.
///
/// # Construction
///
/// ```ignore
/// use oct_tree::{MeshOctree, OctreeBuildParameter};
///
/// let mut tree = MeshOctree::from_mesh(positions, indices);
/// tree.build();
/// ```
///
/// # Traversal discipline
///
/// Every traversal — build, search, removal, hit test — runs breadth-first
/// over an explicit queue rather than by native recursion, so stack usage
/// stays constant regardless of tree depth, and tie-breaking searches see
/// nodes in level order.
///
/// # Concurrency
///
/// A tree is not safe for concurrent mutation; callers needing shared
/// access must serialize externally.
pub struct Octree<S: OctreeSource> {
    source: S,
    parameter: OctreeBuildParameter,
    slots: Vec<Option<OctreeNode<S::Item>>>,
    free: Vec<usize>,
    root: NodeId,
    record_hit_path: bool,
    hit_path_bounds: Vec<BoundingBox>,
}

impl<S: OctreeSource> Octree<S> {
    /// Creates an unbuilt tree over an explicit root bound seeded with the
    /// given items.
    pub fn with_bound(
        source: S,
        bound: BoundingBox,
        items: Vec<S::Item>,
        parameter: OctreeBuildParameter,
    ) -> Self {
        let root = OctreeNode::new(bound, items, None, parameter.min_size);
        Self {
            source,
            parameter,
            slots: vec![Some(root)],
            free: Vec::new(),
            root: NodeId(0),
            record_hit_path: false,
            hit_path_bounds: Vec::new(),
        }
    }

    /// Creates an unbuilt tree whose root bound is the merge of every
    /// item's bound.
    pub fn with_items(source: S, items: Vec<S::Item>, parameter: OctreeBuildParameter) -> Self {
        let bound = items
            .iter()
            .map(|item| source.item_bound(item))
            .reduce(|a, b| a.merge(&b))
            .unwrap_or_default();
        Self::with_bound(source, bound, items, parameter)
    }

    /// Returns the payload source.
    #[inline]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Returns the build parameters.
    #[inline]
    pub fn parameter(&self) -> &OctreeBuildParameter {
        &self.parameter
    }

    /// Returns the root node id.
    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Returns the node for `id`, or `None` if the id has gone stale
    /// (its node was detached by auto-deletion or a clear).
    pub fn node(&self, id: NodeId) -> Option<&OctreeNode<S::Item>> {
        self.slots.get(id.0).and_then(|slot| slot.as_ref())
    }

    /// Returns whether empty nodes detach themselves.
    #[inline]
    pub fn auto_delete_if_empty(&self) -> bool {
        self.parameter.auto_delete_if_empty
    }

    /// Sets whether empty nodes detach themselves.
    pub fn set_auto_delete_if_empty(&mut self, auto_delete: bool) {
        self.parameter.auto_delete_if_empty = auto_delete;
    }

    /// Returns whether hit queries record the bounds along the hit path.
    #[inline]
    pub fn record_hit_path(&self) -> bool {
        self.record_hit_path
    }

    /// Enables or disables hit-path recording.
    pub fn set_record_hit_path(&mut self, record: bool) {
        self.record_hit_path = record;
    }

    /// Returns the bounds recorded along the last successful hit query,
    /// ordered from each hit node up to the root.
    pub fn hit_path_bounds(&self) -> &[BoundingBox] {
        &self.hit_path_bounds
    }

    /// Returns `true` if the whole tree holds no items.
    pub fn is_empty(&self) -> bool {
        self.node_ref(self.root).is_empty()
    }

    /// Returns the number of items stored across the whole tree.
    pub fn item_count(&self) -> usize {
        let mut count = 0;
        let mut queue = VecDeque::new();
        queue.push_back(self.root);
        while let Some(id) = queue.pop_front() {
            let node = self.node_ref(id);
            count += node.items().len();
            queue.extend(node.children());
        }
        count
    }

    /// Returns the number of live nodes in the tree.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut queue = VecDeque::new();
        queue.push_back(self.root);
        while let Some(id) = queue.pop_front() {
            count += 1;
            queue.extend(self.node_ref(id).children());
        }
        count
    }

    /// Returns the maximum depth of the tree (1 for a childless root).
    pub fn depth(&self) -> usize {
        let mut max = 0;
        let mut queue = VecDeque::new();
        queue.push_back((self.root, 1));
        while let Some((id, depth)) = queue.pop_front() {
            max = max.max(depth);
            for child in self.node_ref(id).children() {
                queue.push_back((child, depth + 1));
            }
        }
        max
    }

    /// Builds the whole tree, top down.
    ///
    /// A root whose bound has no extent first grows it to enclose the
    /// payload; a root below the minimum size becomes a single oversized
    /// leaf. When the parameters request cube normalization, the root bound
    /// is replaced by its smallest enclosing cube before subdividing.
    /// Building is idempotent per node.
    pub fn build(&mut self) {
        if !self.check_dimension(self.root) {
            self.node_mut(self.root).mark_built();
            return;
        }
        if self.parameter.cubify {
            let cube = self.node_ref(self.root).bound().enclosing_cube();
            self.set_node_bound(self.root, cube);
        }
        let started = Instant::now();
        let visited = self.build_breadth_first(self.root);
        debug!("octree build: {visited} nodes in {:?}", started.elapsed());
    }

    /// Runs the subdivision step for this node only, creating children but
    /// not building them. A no-op once the node is built.
    ///
    /// Partitioning is first-match-wins over the octants in slot order; an
    /// item fitting no octant wholly — boundary straddlers and zero-size
    /// bounds — stays in this node's payload.
    pub fn build_node_level(&mut self, id: NodeId) {
        if self.node_ref(id).is_built() {
            return;
        }
        // A singleton or empty node never subdivides.
        if self.node_ref(id).items().len() <= 1 {
            self.node_mut(id).mark_built();
            return;
        }
        if !self.check_dimension(id) {
            self.node_mut(id).mark_built();
            return;
        }

        let octants = self.node_ref(id).octants().to_vec();
        let mut items = mem::take(self.node_mut(id).items_mut());
        let mut buckets: [Vec<S::Item>; 8] = std::array::from_fn(|_| Vec::new());
        // Swap-with-last compaction keeps the partition pass O(n).
        for i in (0..items.len()).rev() {
            let bound = self.source.item_bound(&items[i]);
            if bound.is_degenerate() {
                continue;
            }
            if let Some(slot) = octants
                .iter()
                .position(|octant| octant.contains_box(&bound) == Containment::Contains)
            {
                buckets[slot].push(items.swap_remove(i));
            }
        }
        *self.node_mut(id).items_mut() = items;

        let min_size = self.parameter.min_size;
        for (slot, bucket) in buckets.into_iter().enumerate() {
            if bucket.is_empty() {
                continue;
            }
            let child = self.alloc(OctreeNode::new(octants[slot], bucket, Some(id), min_size));
            self.node_mut(id).set_child(slot, child);
        }
        self.node_mut(id).mark_built();
    }

    /// Inserts an item into the smallest existing node whose bound wholly
    /// contains the item's bound, growing a single new leaf when the item
    /// fits an unoccupied octant there.
    ///
    /// Returns `false` — leaving the tree untouched — when the item lies
    /// outside the root bound; the caller should rebuild the tree with a
    /// larger enclosing bound. This is an expected outcome, not an error.
    pub fn add(&mut self, item: S::Item) -> bool {
        let bound = self.source.item_bound(&item);
        let Some(target) = self.find_smallest_node_containing(&bound) else {
            return false;
        };
        let octants = self.node_ref(target).octants().to_vec();
        let slot = octants
            .iter()
            .position(|octant| octant.contains_box(&bound) == Containment::Contains);
        match slot {
            Some(slot) => {
                if let Some(child) = self.node_ref(target).child(slot) {
                    self.node_mut(child).items_mut().push(item);
                } else {
                    let min_size = self.parameter.min_size;
                    let child = self.alloc(OctreeNode::new(
                        octants[slot],
                        vec![item],
                        Some(target),
                        min_size,
                    ));
                    self.node_mut(target).set_child(slot, child);
                    self.build_breadth_first(child);
                }
            }
            None => self.node_mut(target).items_mut().push(item),
        }
        true
    }

    /// Finds the smallest existing node whose bound wholly contains
    /// `bound`, or `None` when even the root does not.
    ///
    /// Breadth-first descent: children are only explored once their parent
    /// qualifies, and the last qualifying node dequeued wins, so the result
    /// is the deepest containing node along the explored path.
    pub fn find_smallest_node_containing(&self, bound: &BoundingBox) -> Option<NodeId> {
        let mut queue = VecDeque::with_capacity(64);
        queue.push_back(self.root);
        let mut result = None;
        while let Some(id) = queue.pop_front() {
            let node = self.node_ref(id);
            if node.bound().contains_box(bound) != Containment::Contains {
                continue;
            }
            result = Some(id);
            queue.extend(node.children());
        }
        result
    }

    /// Exhaustively searches every node's payload for `item` by equality,
    /// in level order. Returns the holding node and the item's index there.
    pub fn find_by_item(&self, item: &S::Item) -> Option<(NodeId, usize)> {
        let mut queue = VecDeque::with_capacity(256);
        queue.push_back(self.root);
        while let Some(id) = queue.pop_front() {
            let node = self.node_ref(id);
            if let Some(index) = node.items().iter().position(|i| i == item) {
                return Some((id, index));
            }
            queue.extend(node.children());
        }
        None
    }

    /// Bound-guided search using the item's current bound.
    /// See [`find_by_item_bound_with`](Self::find_by_item_bound_with).
    pub fn find_by_item_bound(&self, item: &S::Item) -> Option<(NodeId, usize)> {
        self.find_by_item_bound_with(item, self.source.item_bound(item))
    }

    /// Bound-guided search: breadth-first descent entering only nodes whose
    /// bound wholly contains `bound`, checking each visited payload for
    /// `item` by equality. First match in level order wins.
    ///
    /// If the descent exhausts without a match — the recorded bound no
    /// longer nests where the item actually sits — the search walks upward
    /// from the deepest node the descent reached, through its ancestors,
    /// before giving up.
    pub fn find_by_item_bound_with(
        &self,
        item: &S::Item,
        bound: BoundingBox,
    ) -> Option<(NodeId, usize)> {
        let mut queue = VecDeque::with_capacity(64);
        queue.push_back(self.root);
        let mut deepest = None;
        while let Some(id) = queue.pop_front() {
            let node = self.node_ref(id);
            if node.bound().contains_box(&bound) != Containment::Contains {
                continue;
            }
            if let Some(index) = node.items().iter().position(|i| i == item) {
                return Some((id, index));
            }
            queue.extend(node.children());
            deepest = Some(id);
        }

        let mut current = deepest;
        while let Some(id) = current {
            let node = self.node_ref(id);
            if let Some(index) = node.items().iter().position(|i| i == item) {
                return Some((id, index));
            }
            current = node.parent();
        }
        None
    }

    /// Removes `item`, locating it by its current bound.
    ///
    /// Falls back to the exhaustive strategy when the bound-guided search
    /// misses. Returns `false` only when the item is nowhere in the tree.
    pub fn remove_by_bound(&mut self, item: &S::Item) -> bool {
        let bound = self.source.item_bound(item);
        self.remove_by_bound_with(item, bound)
    }

    /// Removes `item`, locating it by a caller-recorded bound — useful when
    /// the item's bound has changed since insertion and the old bound is
    /// known.
    ///
    /// Falls back to the exhaustive strategy when the bound-guided search
    /// misses; a miss there too yields `false` rather than a panic,
    /// favoring availability over strictness.
    pub fn remove_by_bound_with(&mut self, item: &S::Item, bound: BoundingBox) -> bool {
        match self.find_by_item_bound_with(item, bound) {
            Some((id, index)) => {
                self.remove_item_at(id, index);
                true
            }
            None => {
                debug!("bound-guided removal missed, falling back to exhaustive search");
                self.remove_safe(item)
            }
        }
    }

    /// Removes `item` by scanning every node's payload. Slow but reliable
    /// when the item's bound is unknown or stale.
    pub fn remove_safe(&mut self, item: &S::Item) -> bool {
        trace!("exhaustive removal scan");
        match self.find_by_item(item) {
            Some((id, index)) => {
                self.remove_item_at(id, index);
                true
            }
            None => false,
        }
    }

    /// Removes the item at `index` from the payload of node `id`.
    ///
    /// Returns `false` without mutating anything when the index is out of
    /// range or the id is stale.
    pub fn remove_at(&mut self, id: NodeId, index: usize) -> bool {
        let Some(node) = self.node(id) else {
            return false;
        };
        if index >= node.items().len() {
            return false;
        }
        self.remove_item_at(id, index);
        true
    }

    /// Detaches node `id` from its parent, discarding it and its subtree.
    /// A no-op on the root.
    pub fn remove_self(&mut self, id: NodeId) {
        let Some(parent) = self.node_ref(id).parent() else {
            return;
        };
        self.remove_child(parent, id);
    }

    /// Removes `child` from `parent`'s slots, discarding the child's
    /// subtree, then cascades upward: a parent newly emptied by the
    /// detachment removes itself in turn, up to but never including the
    /// root.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) {
        let mut parent = parent;
        let mut child = child;
        loop {
            if !self.node_mut(parent).clear_child(child) {
                return;
            }
            self.free_subtree(child);
            if !(self.parameter.auto_delete_if_empty && self.node_ref(parent).is_empty()) {
                return;
            }
            match self.node_ref(parent).parent() {
                Some(grandparent) => {
                    child = parent;
                    parent = grandparent;
                }
                None => return,
            }
        }
    }

    /// Empties the whole tree: discards every descendant of the root and
    /// clears the root payload. The root bound stays as-is.
    pub fn clear(&mut self) {
        self.clear_node(self.root);
    }

    /// Empties node `id`: discards its descendants and clears its payload.
    pub fn clear_node(&mut self, id: NodeId) {
        self.node_mut(id).items_mut().clear();
        let children: Vec<NodeId> = self.node_ref(id).children().collect();
        for child in children {
            self.free_subtree(child);
        }
        self.node_mut(id).clear_children();
    }

    /// Hit tests the whole tree against a ray.
    /// See [`hit_test_from`](Self::hit_test_from).
    pub fn hit_test(
        &mut self,
        model: &Matrix4<f32>,
        ray: &Ray,
        hits: &mut Vec<HitTestResult>,
    ) -> bool {
        self.hit_test_from(self.root, model, ray, hits)
    }

    /// Hit tests the subtree under `start` against a ray expressed in the
    /// query frame; `model` maps payload space into that frame.
    ///
    /// Breadth-first: each dequeued node is tested against the ray at the
    /// bound level; on intersection its payload is hit tested through the
    /// source and *all* of its children are enqueued — pruning happens only
    /// at the bound level, never by payload-hit status, so no eligible
    /// subtree is skipped. Returns whether any node produced a hit.
    ///
    /// With hit-path recording enabled, the bounds from every hit node up
    /// to the root are collected; the trace is discarded when the query
    /// misses overall.
    pub fn hit_test_from(
        &mut self,
        start: NodeId,
        model: &Matrix4<f32>,
        ray: &Ray,
        hits: &mut Vec<HitTestResult>,
    ) -> bool {
        self.hit_path_bounds.clear();
        let mut queue = VecDeque::with_capacity(256);
        queue.push_back(start);
        let mut any_hit = false;
        while let Some(id) = queue.pop_front() {
            let (node_hit, intersects) = self.hit_test_node(id, model, ray, hits);
            any_hit |= node_hit;
            if intersects && self.node_ref(id).has_children() {
                queue.extend(self.node_ref(id).children());
            }
            if self.record_hit_path && node_hit {
                self.record_path(id);
            }
        }
        if !any_hit {
            self.hit_path_bounds.clear();
        }
        any_hit
    }

    /// Hit tests one node only, ignoring its children.
    ///
    /// Returns `(node_hit, bound_intersected)`. The node bound is mapped
    /// into the query frame first; when the ray misses it, the payload is
    /// not examined. An unbuilt node reports no intersection at all.
    pub fn hit_test_node(
        &self,
        id: NodeId,
        model: &Matrix4<f32>,
        ray: &Ray,
        hits: &mut Vec<HitTestResult>,
    ) -> (bool, bool) {
        let Some(node) = self.node(id) else {
            return (false, false);
        };
        if !node.is_built() {
            return (false, false);
        }
        let bound = node.bound().transformed(model);
        if !ray.intersects_box(&bound) {
            return (false, false);
        }
        let hit = self.source.hit_test_items(node.items(), model, ray, hits);
        (hit, true)
    }

    fn record_path(&mut self, id: NodeId) {
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.node_ref(node_id);
            let bound = node.bound();
            current = node.parent();
            self.hit_path_bounds.push(bound);
        }
    }

    fn remove_item_at(&mut self, id: NodeId, index: usize) {
        self.node_mut(id).items_mut().remove(index);
        if self.parameter.auto_delete_if_empty && self.node_ref(id).is_empty() {
            self.remove_self(id);
        }
    }

    fn build_breadth_first(&mut self, start: NodeId) -> usize {
        let mut queue = VecDeque::with_capacity(256);
        queue.push_back(start);
        let mut visited = 0;
        while let Some(id) = queue.pop_front() {
            self.build_node_level(id);
            visited += 1;
            if self.node_ref(id).has_children() {
                queue.extend(self.node_ref(id).children());
            }
        }
        visited
    }

    /// Returns whether node `id` is large enough to subdivide, first
    /// growing a zero-extent bound to enclose the payload.
    fn check_dimension(&mut self, id: NodeId) -> bool {
        if self.node_ref(id).bound().size() == Vector3::zeros() {
            let grown = self.find_enclosing_box(id);
            self.set_node_bound(id, grown);
        }
        let size = self.node_ref(id).bound().size();
        let min = self.parameter.min_size;
        !(size.x < min && size.y < min && size.z < min)
    }

    /// The merge of this node's bound with every payload item's bound,
    /// skipping zero-size items.
    fn find_enclosing_box(&self, id: NodeId) -> BoundingBox {
        let node = self.node_ref(id);
        let mut bound = node.bound();
        for item in node.items() {
            let item_bound = self.source.item_bound(item);
            if !item_bound.is_degenerate() {
                bound = bound.merge(&item_bound);
            }
        }
        bound
    }

    fn set_node_bound(&mut self, id: NodeId, bound: BoundingBox) {
        let min_size = self.parameter.min_size;
        self.node_mut(id).set_bound(bound, min_size);
    }

    fn free_subtree(&mut self, start: NodeId) {
        let mut queue = VecDeque::new();
        queue.push_back(start);
        while let Some(id) = queue.pop_front() {
            queue.extend(self.node_ref(id).children());
            self.free(id);
        }
    }

    fn alloc(&mut self, node: OctreeNode<S::Item>) -> NodeId {
        match self.free.pop() {
            Some(index) => {
                self.slots[index] = Some(node);
                NodeId(index)
            }
            None => {
                self.slots.push(Some(node));
                NodeId(self.slots.len() - 1)
            }
        }
    }

    fn free(&mut self, id: NodeId) {
        self.slots[id.0] = None;
        self.free.push(id.0);
    }

    fn node_ref(&self, id: NodeId) -> &OctreeNode<S::Item> {
        self.slots[id.0]
            .as_ref()
            .expect("node id must refer to a live node")
    }

    fn node_mut(&mut self, id: NodeId) -> &mut OctreeNode<S::Item> {
        self.slots[id.0]
            .as_mut()
            .expect("node id must refer to a live node")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    /// Minimal payload for exercising the generic algorithms: an id plus a
    /// fixed bound, hit tested by ray-box intersection.
    #[derive(Debug, Clone, PartialEq)]
    struct BoxItem {
        id: u32,
        bound: BoundingBox,
    }

    #[derive(Debug)]
    struct BoxSource;

    impl OctreeSource for BoxSource {
        type Item = BoxItem;

        fn item_bound(&self, item: &BoxItem) -> BoundingBox {
            item.bound
        }

        fn hit_test_items(
            &self,
            items: &[BoxItem],
            model: &Matrix4<f32>,
            ray: &Ray,
            hits: &mut Vec<HitTestResult>,
        ) -> bool {
            let mut any = false;
            for item in items {
                if ray.intersects_box(&item.bound.transformed(model)) {
                    hits.push(HitTestResult {
                        is_valid: true,
                        distance: 0.0,
                        object_id: Some(item.id as u64),
                        ..HitTestResult::default()
                    });
                    any = true;
                }
            }
            any
        }
    }

    fn boxed(id: u32, min: [f32; 3], max: [f32; 3]) -> BoxItem {
        BoxItem {
            id,
            bound: BoundingBox::new(
                Point3::new(min[0], min[1], min[2]),
                Point3::new(max[0], max[1], max[2]),
            ),
        }
    }

    fn point_item(id: u32, at: [f32; 3]) -> BoxItem {
        boxed(id, at, at)
    }

    fn built_tree(items: Vec<BoxItem>, parameter: OctreeBuildParameter) -> Octree<BoxSource> {
        let mut tree = Octree::with_items(BoxSource, items, parameter);
        tree.build();
        tree
    }

    /// Four items, each comfortably inside a distinct octant of the merged
    /// root bound [0.2, 3.8]^3.
    fn quadrant_items() -> Vec<BoxItem> {
        vec![
            boxed(0, [0.2, 0.2, 0.2], [1.8, 1.8, 1.8]),
            boxed(1, [2.2, 0.2, 0.2], [3.8, 1.8, 1.8]),
            boxed(2, [2.2, 2.2, 2.2], [3.8, 3.8, 3.8]),
            boxed(3, [0.2, 0.2, 2.2], [1.8, 1.8, 3.8]),
        ]
    }

    fn assert_containment_invariant(tree: &Octree<BoxSource>) {
        let mut queue = VecDeque::new();
        queue.push_back(tree.root());
        while let Some(id) = queue.pop_front() {
            let node = tree.node(id).unwrap();
            for item in node.items() {
                assert_eq!(
                    node.bound().contains_box(&item.bound),
                    Containment::Contains,
                    "item {} escaped its node bound",
                    item.id,
                );
            }
            queue.extend(node.children());
        }
    }

    #[test]
    fn build_distributes_items_into_octants() {
        let tree = built_tree(quadrant_items(), OctreeBuildParameter::default());

        let root = tree.node(tree.root()).unwrap();
        assert!(root.is_built());
        assert!(root.items().is_empty());
        assert_eq!(root.children().count(), 4);
        assert_eq!(tree.node_count(), 5);
        assert_eq!(tree.item_count(), 4);
        assert_eq!(tree.depth(), 2);

        for child in root.children() {
            let node = tree.node(child).unwrap();
            assert!(node.is_built());
            assert_eq!(node.items().len(), 1);
            assert_eq!(node.parent(), Some(tree.root()));
        }
        assert_containment_invariant(&tree);
    }

    #[test]
    fn singleton_never_subdivides() {
        let tree = built_tree(
            vec![boxed(0, [0.0, 0.0, 0.0], [4.0, 4.0, 4.0])],
            OctreeBuildParameter::default(),
        );
        let root = tree.node(tree.root()).unwrap();
        assert!(root.is_built());
        assert!(!root.has_children());
        assert_eq!(root.items().len(), 1);
    }

    #[test]
    fn straddling_item_stays_at_root() {
        let mut items = quadrant_items();
        // Crosses the center plane of the root bound: fits no octant.
        items.push(boxed(9, [1.0, 1.0, 1.0], [3.0, 3.0, 3.0]));
        let tree = built_tree(items, OctreeBuildParameter::default());

        let root = tree.node(tree.root()).unwrap();
        assert_eq!(root.items().len(), 1);
        assert_eq!(root.items()[0].id, 9);
        assert_eq!(root.children().count(), 4);
    }

    #[test]
    fn min_size_terminates_subdivision() {
        let tree = built_tree(quadrant_items(), OctreeBuildParameter::with_min_size(16.0));
        let root = tree.node(tree.root()).unwrap();
        assert!(root.is_built());
        assert!(!root.has_children());
        assert_eq!(root.items().len(), 4);
        assert!(root.octants().is_empty());
    }

    #[test]
    fn degenerate_item_is_retained_by_the_node_that_found_it() {
        let mut items = quadrant_items();
        // Zero-volume bound inside octant 0's region; must never be
        // bucketed into a child.
        items.push(point_item(9, [1.0, 1.0, 1.0]));
        let tree = built_tree(items, OctreeBuildParameter::default());

        let root = tree.node(tree.root()).unwrap();
        assert_eq!(root.items().len(), 1);
        assert_eq!(root.items()[0].id, 9);
        assert_eq!(tree.item_count(), 5);
    }

    #[test]
    fn degenerate_root_bound_grows_to_enclose_payload() {
        let mut tree = Octree::with_bound(
            BoxSource,
            BoundingBox::default(),
            quadrant_items(),
            OctreeBuildParameter::default(),
        );
        tree.build();

        let root = tree.node(tree.root()).unwrap();
        assert!(root.is_built());
        for item in quadrant_items() {
            assert_eq!(root.bound().contains_box(&item.bound), Containment::Contains);
        }
        assert!(root.has_children());
    }

    #[test]
    fn cubify_replaces_root_bound_with_enclosing_cube() {
        let parameter = OctreeBuildParameter {
            cubify: true,
            ..OctreeBuildParameter::default()
        };
        // Asymmetric payload: 4 wide, 2 tall, 4 deep.
        let items = vec![
            boxed(0, [0.2, 0.2, 0.2], [1.8, 1.8, 1.8]),
            boxed(1, [2.2, 0.2, 2.2], [3.8, 1.8, 3.8]),
        ];
        let tree = built_tree(items, parameter);

        let size = tree.node(tree.root()).unwrap().bound().size();
        assert!((size.x - size.y).abs() < 1e-5);
        assert!((size.y - size.z).abs() < 1e-5);
        // Largest payload extent was 3.6, on the x and z axes.
        assert!((size.x - 3.6).abs() < 1e-5);
    }

    #[test]
    fn add_appends_to_existing_child() {
        let mut tree = built_tree(quadrant_items(), OctreeBuildParameter::default());
        let before = tree.node_count();

        assert!(tree.add(boxed(10, [0.3, 0.3, 0.3], [1.7, 1.7, 1.7])));
        assert_eq!(tree.node_count(), before);
        assert_eq!(tree.item_count(), 5);

        let (holder, _) = tree.find_by_item(&boxed(10, [0.3, 0.3, 0.3], [1.7, 1.7, 1.7])).unwrap();
        assert_ne!(holder, tree.root());
        assert_containment_invariant(&tree);
    }

    #[test]
    fn add_grows_a_new_leaf_in_an_empty_octant() {
        // Upper-ring octants start unoccupied.
        let mut tree = built_tree(quadrant_items(), OctreeBuildParameter::default());
        let before = tree.node_count();

        let item = boxed(11, [0.2, 2.2, 0.2], [1.8, 3.8, 1.8]);
        assert!(tree.add(item.clone()));
        assert_eq!(tree.node_count(), before + 1);

        let (holder, index) = tree.find_by_item_bound(&item).unwrap();
        let node = tree.node(holder).unwrap();
        assert!(node.is_built());
        assert_eq!(node.items().len(), 1);
        assert_eq!(node.items()[index], item);
        assert_eq!(node.parent(), Some(tree.root()));
    }

    #[test]
    fn add_straddling_item_lands_in_the_found_node_payload() {
        let mut tree = built_tree(quadrant_items(), OctreeBuildParameter::default());
        let item = boxed(12, [1.0, 1.0, 1.0], [3.0, 3.0, 3.0]);
        assert!(tree.add(item.clone()));
        let root = tree.node(tree.root()).unwrap();
        assert_eq!(root.items(), &[item]);
    }

    #[test]
    fn add_outside_root_fails_and_leaves_tree_unchanged() {
        let mut tree = built_tree(quadrant_items(), OctreeBuildParameter::default());
        let nodes_before = tree.node_count();
        let items_before = tree.item_count();

        assert!(!tree.add(boxed(13, [10.0, 10.0, 10.0], [11.0, 11.0, 11.0])));
        assert_eq!(tree.node_count(), nodes_before);
        assert_eq!(tree.item_count(), items_before);
    }

    #[test]
    fn round_trip_add_then_find_by_bound() {
        let mut tree = built_tree(quadrant_items(), OctreeBuildParameter::default());
        let item = boxed(14, [2.3, 0.3, 0.3], [3.7, 1.7, 1.7]);
        assert!(tree.add(item.clone()));

        let (holder, index) = tree.find_by_item_bound(&item).unwrap();
        assert_eq!(tree.node(holder).unwrap().items()[index], item);
    }

    #[test]
    fn find_smallest_node_is_the_deepest_containing_one() {
        let tree = built_tree(quadrant_items(), OctreeBuildParameter::default());
        let probe = BoundingBox::new(Point3::new(0.5, 0.5, 0.5), Point3::new(0.7, 0.7, 0.7));

        let found = tree.find_smallest_node_containing(&probe).unwrap();
        assert_ne!(found, tree.root());
        let node = tree.node(found).unwrap();
        assert_eq!(node.bound().contains_box(&probe), Containment::Contains);
    }

    #[test]
    fn remove_by_bound_is_idempotent_not_fatal() {
        let mut tree = built_tree(quadrant_items(), OctreeBuildParameter::with_auto_delete(false));
        let item = quadrant_items().remove(1);

        assert!(tree.remove_by_bound(&item));
        assert_eq!(tree.item_count(), 3);
        // Second removal of the same item reports failure, nothing more.
        assert!(!tree.remove_by_bound(&item));
        assert_eq!(tree.item_count(), 3);
    }

    #[test]
    fn remove_with_stale_bound_falls_back_to_exhaustive() {
        let mut tree = built_tree(quadrant_items(), OctreeBuildParameter::with_auto_delete(false));
        let item = quadrant_items().remove(0);
        // The recorded bound points into a different region than the one
        // the item was filed under.
        let stale = BoundingBox::new(Point3::new(2.3, 0.3, 2.3), Point3::new(3.7, 1.7, 3.7));

        assert!(tree.remove_by_bound_with(&item, stale));
        assert!(tree.find_by_item(&item).is_none());
    }

    #[test]
    fn remove_safe_finds_items_anywhere() {
        let mut tree = built_tree(quadrant_items(), OctreeBuildParameter::with_auto_delete(false));
        let item = quadrant_items().remove(2);
        assert!(tree.remove_safe(&item));
        assert!(!tree.remove_safe(&item));
    }

    #[test]
    fn remove_at_rejects_out_of_range_indices() {
        let mut tree = built_tree(quadrant_items(), OctreeBuildParameter::with_auto_delete(false));
        let root = tree.root();
        assert!(!tree.remove_at(root, 0)); // root payload is empty
        assert_eq!(tree.item_count(), 4);

        let (holder, index) = tree.find_by_item(&quadrant_items().remove(3)).unwrap();
        assert!(tree.remove_at(holder, index));
        assert_eq!(tree.item_count(), 3);
    }

    #[test]
    fn auto_delete_cascades_through_emptied_ancestors() {
        let bound = BoundingBox::new(Point3::origin(), Point3::new(8.0, 8.0, 8.0));
        let mut tree = Octree::with_bound(
            BoxSource,
            bound,
            Vec::new(),
            OctreeBuildParameter::default(),
        );
        tree.build();
        assert_eq!(tree.node_count(), 1);

        // First add creates a child of the root; the second nests a
        // grandchild under it.
        let outer = boxed(0, [0.5, 0.5, 0.5], [3.5, 3.5, 3.5]);
        let inner = boxed(1, [0.2, 0.2, 0.2], [0.8, 0.8, 0.8]);
        assert!(tree.add(outer.clone()));
        assert!(tree.add(inner.clone()));
        assert_eq!(tree.node_count(), 3);
        assert_eq!(tree.depth(), 3);

        let (child_id, _) = tree.find_by_item(&outer).unwrap();
        let (grandchild_id, _) = tree.find_by_item(&inner).unwrap();
        assert_eq!(tree.node(grandchild_id).unwrap().parent(), Some(child_id));

        // Removing the outer item leaves its node in place: it still owns
        // the grandchild, so it is not empty yet.
        assert!(tree.remove_by_bound(&outer));
        assert_eq!(tree.node_count(), 3);
        // Removing the inner item empties the grandchild, whose detachment
        // newly empties the child; both detach, stopping at the root.
        assert!(tree.remove_by_bound(&inner));
        assert_eq!(tree.node_count(), 1);
        assert!(tree.node(child_id).is_none());
        assert!(tree.node(grandchild_id).is_none());
        assert!(tree.node(tree.root()).unwrap().is_root());
        assert!(tree.is_empty());
    }

    #[test]
    fn auto_delete_disabled_keeps_empty_nodes() {
        let mut tree = built_tree(quadrant_items(), OctreeBuildParameter::with_auto_delete(false));
        let item = quadrant_items().remove(0);
        let (holder, _) = tree.find_by_item(&item).unwrap();

        assert!(tree.remove_by_bound(&item));
        let node = tree.node(holder).unwrap();
        assert!(node.is_empty());
        assert_eq!(node.parent(), Some(tree.root()));
    }

    #[test]
    fn auto_delete_toggle_round_trips() {
        let mut tree = built_tree(quadrant_items(), OctreeBuildParameter::default());
        assert!(tree.auto_delete_if_empty());
        tree.set_auto_delete_if_empty(false);
        assert!(!tree.auto_delete_if_empty());
    }

    #[test]
    fn clear_discards_every_descendant() {
        let mut tree = built_tree(quadrant_items(), OctreeBuildParameter::default());
        assert_eq!(tree.node_count(), 5);

        tree.clear();
        assert_eq!(tree.node_count(), 1);
        assert!(tree.is_empty());
        let root = tree.node(tree.root()).unwrap();
        assert!(!root.has_children());
        assert_eq!(root.active_mask(), 0);
    }

    #[test]
    fn hit_test_reports_items_along_the_ray() {
        let mut tree = built_tree(quadrant_items(), OctreeBuildParameter::default());
        let ray = Ray::new(Point3::new(1.0, 1.0, -1.0), Vector3::z());
        let mut hits = Vec::new();

        // The ray passes through octants 0 and 3: items 0 and 3 lie on it.
        assert!(tree.hit_test(&Matrix4::identity(), &ray, &mut hits));
        let mut ids: Vec<u64> = hits.iter().filter_map(|h| h.object_id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 3]);
    }

    #[test]
    fn hit_test_misses_cleanly() {
        let mut tree = built_tree(quadrant_items(), OctreeBuildParameter::default());
        let ray = Ray::new(Point3::new(-10.0, -10.0, -10.0), Vector3::x());
        let mut hits = Vec::new();

        assert!(!tree.hit_test(&Matrix4::identity(), &ray, &mut hits));
        assert!(hits.is_empty());
    }

    #[test]
    fn unbuilt_tree_reports_no_intersection() {
        let mut tree = Octree::with_items(
            BoxSource,
            quadrant_items(),
            OctreeBuildParameter::default(),
        );
        let ray = Ray::new(Point3::new(1.0, 1.0, -1.0), Vector3::z());
        let mut hits = Vec::new();

        assert!(!tree.hit_test(&Matrix4::identity(), &ray, &mut hits));
        assert!(hits.is_empty());
    }

    #[test]
    fn hit_path_records_bounds_up_to_the_root() {
        let mut tree = built_tree(quadrant_items(), OctreeBuildParameter::default());
        tree.set_record_hit_path(true);
        let root_bound = tree.node(tree.root()).unwrap().bound();

        let ray = Ray::new(Point3::new(1.0, 1.0, -1.0), Vector3::z());
        let mut hits = Vec::new();
        assert!(tree.hit_test(&Matrix4::identity(), &ray, &mut hits));
        assert!(!tree.hit_path_bounds().is_empty());
        assert_eq!(*tree.hit_path_bounds().last().unwrap(), root_bound);

        // A miss discards any partial trace.
        let miss = Ray::new(Point3::new(-10.0, -10.0, -10.0), Vector3::x());
        hits.clear();
        assert!(!tree.hit_test(&Matrix4::identity(), &miss, &mut hits));
        assert!(tree.hit_path_bounds().is_empty());
    }

    #[test]
    fn containment_invariant_survives_mutation() {
        let mut tree = built_tree(quadrant_items(), OctreeBuildParameter::default());
        assert!(tree.add(boxed(20, [0.4, 0.4, 0.4], [0.9, 0.9, 0.9])));
        assert!(tree.add(boxed(21, [2.5, 2.5, 2.5], [3.5, 3.5, 3.5])));
        assert!(tree.remove_by_bound(&quadrant_items().remove(1)));
        assert_containment_invariant(&tree);
    }
}
