//! Dynamic octree spatial index for ray hit testing.
//!
//! Accelerates "what does this ray hit?" queries against large collections
//! of 3D geometry — either the individual triangles of a mesh or whole
//! scene objects — without rescanning the entire scene, and answers where
//! a newly added or removed item belongs in the index.

mod bounding;
mod hit;
pub mod octree;
mod ray;

pub use bounding::{BoundingBox, Containment};
pub use hit::HitTestResult;
pub use octree::{
    MeshOctree, MeshSource, NodeId, Octree, OctreeBuildParameter, OctreeNode, OctreeSource,
    SceneHandle, SceneNode, SceneOctree, SceneSource, TriangleEntry,
};
pub use ray::Ray;
