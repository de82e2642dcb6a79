//! Hit test results produced by octree queries.

use nalgebra::{Point3, Vector3};

/// The outcome of a single successful ray intersection.
///
/// Triangle-level hits fill `triangle_indices` with the three original
/// vertex indices of the triangle that was struck. Object-level hits are
/// produced by the scene node delegate, which stamps its own identifier
/// into `object_id`; the octree itself never assigns it.
#[derive(Debug, Clone, PartialEq)]
pub struct HitTestResult {
    /// Whether this result describes an actual intersection.
    pub is_valid: bool,
    /// Distance from the ray origin to the hit point.
    pub distance: f32,
    /// The hit point in the query's reference frame.
    pub point: Point3<f32>,
    /// Unit surface normal at the hit point.
    pub normal: Vector3<f32>,
    /// Vertex indices of the hit triangle, for mesh-level queries.
    pub triangle_indices: Option<[usize; 3]>,
    /// Identifier of the scene object that produced the hit, for
    /// object-level queries.
    pub object_id: Option<u64>,
}

impl Default for HitTestResult {
    fn default() -> Self {
        Self {
            is_valid: false,
            distance: f32::MAX,
            point: Point3::origin(),
            normal: Vector3::zeros(),
            triangle_indices: None,
            object_id: None,
        }
    }
}
