//! Scene-object octree variant.
//!
//! Payload items are whole scene objects rather than triangles. The octree
//! only handles placement and pruning; the actual intersection test is
//! delegated to each object, which reports however many hits it finds.
//! Object bounds are read fresh on every derivation, since scene objects
//! can move.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use nalgebra::Matrix4;

use crate::{BoundingBox, HitTestResult, Ray};

use super::parameter::OctreeBuildParameter;
use super::source::OctreeSource;
use super::tree::Octree;

/// A renderable scene object the octree can index.
///
/// This is the collaborator contract: the octree needs the object's current
/// world-space bound, a transform stack to push the query transform onto
/// while delegating, and the object's own hit test. Implementations that
/// want their hits attributable should stamp an identifier into
/// [`HitTestResult::object_id`].
pub trait SceneNode {
    /// The object's current world-space bounding box.
    fn bounds(&self) -> BoundingBox;

    /// Pushes a transform onto the object's transform stack.
    fn push_transform(&mut self, transform: &Matrix4<f32>);

    /// Pops the most recently pushed transform.
    fn pop_transform(&mut self);

    /// Hit tests the object against a ray, appending results to `hits`.
    /// Returns `true` if any hit was appended.
    fn hit_test(&mut self, ray: &Ray, hits: &mut Vec<HitTestResult>) -> bool;
}

/// Shared handle to a scene object stored in the octree.
///
/// Handles compare by object identity, not value: removal operations find
/// the exact object that was inserted, even when several objects report
/// identical bounds.
pub struct SceneHandle<N>(Rc<RefCell<N>>);

impl<N> SceneHandle<N> {
    /// Wraps a scene object in a shareable handle.
    pub fn new(node: N) -> Self {
        Self(Rc::new(RefCell::new(node)))
    }

    /// Borrows the object immutably.
    pub fn borrow(&self) -> Ref<'_, N> {
        self.0.borrow()
    }

    /// Borrows the object mutably.
    pub fn borrow_mut(&self) -> RefMut<'_, N> {
        self.0.borrow_mut()
    }
}

impl<N> Clone for SceneHandle<N> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<N> PartialEq for SceneHandle<N> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<N> fmt::Debug for SceneHandle<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SceneHandle")
            .field(&Rc::as_ptr(&self.0))
            .finish()
    }
}

/// Payload source over scene objects.
pub struct SceneSource<N> {
    _marker: PhantomData<N>,
}

impl<N> SceneSource<N> {
    /// Creates a scene payload source.
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<N> Default for SceneSource<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N> fmt::Debug for SceneSource<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SceneSource")
    }
}

impl<N: SceneNode> OctreeSource for SceneSource<N> {
    type Item = SceneHandle<N>;

    /// Reads the object's bound fresh; nothing is cached, so a moved
    /// object derives its current position.
    fn item_bound(&self, item: &SceneHandle<N>) -> BoundingBox {
        item.borrow().bounds()
    }

    /// Delegates to each object in the payload: the query transform is
    /// pushed for the duration of the object's own hit test, and every hit
    /// the object reports is appended. No deduplication happens here; the
    /// delegates and the caller pick the final winner.
    fn hit_test_items(
        &self,
        items: &[SceneHandle<N>],
        model: &Matrix4<f32>,
        ray: &Ray,
        hits: &mut Vec<HitTestResult>,
    ) -> bool {
        let mut any = false;
        let mut collected = Vec::new();
        for handle in items {
            let mut node = handle.borrow_mut();
            node.push_transform(model);
            any |= node.hit_test(ray, &mut collected);
            node.pop_transform();
            hits.append(&mut collected);
        }
        any
    }
}

/// Octree over whole scene objects.
pub type SceneOctree<N> = Octree<SceneSource<N>>;

impl<N: SceneNode> Octree<SceneSource<N>> {
    /// Creates an unbuilt octree over the given objects with default
    /// parameters. The root bound is the merge of every object's bound.
    pub fn from_nodes(nodes: Vec<SceneHandle<N>>) -> Self {
        Self::from_nodes_with_parameter(nodes, OctreeBuildParameter::default())
    }

    /// Creates an unbuilt octree over the given objects.
    pub fn from_nodes_with_parameter(
        nodes: Vec<SceneHandle<N>>,
        parameter: OctreeBuildParameter,
    ) -> Self {
        Octree::with_items(SceneSource::new(), nodes, parameter)
    }
}
