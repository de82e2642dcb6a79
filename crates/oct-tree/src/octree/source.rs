//! Payload strategies for concrete octree variants.

use nalgebra::Matrix4;

use crate::{BoundingBox, HitTestResult, Ray};

/// Strategy supplying the two payload-specific behaviors of an octree
/// variant: how to derive a bounding box from an item, and how to hit test
/// a node's payload.
///
/// The generic tree handles all structure (build, insertion, removal,
/// traversal); a source decides what an item *is*. Two sources ship with
/// the crate:
/// - [`MeshSource`](crate::MeshSource): items are triangles of a mesh,
///   with precomputed bounds and a closest-hit-only merge policy.
/// - [`SceneSource`](crate::SceneSource): items are whole scene objects
///   that perform their own hit test, with every reported hit accumulated.
pub trait OctreeSource {
    /// The payload item type. Equality is used by the removal and search
    /// operations to locate items inside node payloads.
    type Item: Clone + PartialEq;

    /// Derives the bounding box of an item.
    ///
    /// Called during subdivision, insertion and bound-guided removal.
    /// Whether the result is precomputed or read fresh is the source's
    /// choice; mesh triangles cache theirs, scene objects report their
    /// current bound.
    fn item_bound(&self, item: &Self::Item) -> BoundingBox;

    /// Hit tests one node's payload and merges any hits into `hits`.
    ///
    /// `model` maps the payload's local frame into the query frame the ray
    /// lives in. The merge policy is the source's: a mesh source keeps a
    /// single globally closest entry, a scene source appends everything its
    /// delegates report. Returns `true` if `hits` was extended or improved.
    fn hit_test_items(
        &self,
        items: &[Self::Item],
        model: &Matrix4<f32>,
        ray: &Ray,
        hits: &mut Vec<HitTestResult>,
    ) -> bool;
}
