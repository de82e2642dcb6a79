//! Dynamic octree for spatial hit-test acceleration.
//!
//! This module provides an adaptive octree that recursively partitions
//! 3D space into octants, built lazily top-down and maintained under
//! dynamic insertion and removal. The tree enables:
//!
//! - Ray hit-test queries that prune whole subtrees by bound intersection
//! - Insertion of new items into the smallest existing containing node
//! - Several removal strategies with different cost/precision trade-offs
//! - Auto-collapse of nodes that become empty
//!
//! # Example
//!
//! ```ignore
//! use oct_tree::{MeshOctree, Ray};
//! use nalgebra::{Matrix4, Point3, Vector3};
//!
//! // Build a tree over a mesh's triangles
//! let mut tree = MeshOctree::from_mesh(positions, indices);
//! tree.build();
//!
//! // Query the closest triangle along a ray
//! let ray = Ray::new(Point3::origin(), Vector3::z());
//! let mut hits = Vec::new();
//! if tree.hit_test(&Matrix4::identity(), &ray, &mut hits) {
//!     println!("hit at distance {}", hits[0].distance);
//! }
//! ```
//!
//! # Architecture
//!
//! - [`Octree`]: the container holding the node arena and the generic
//!   build/insert/remove/query algorithms
//! - [`OctreeNode`]: a single node — bound, octant cache, payload, child
//!   slots and active mask
//! - [`OctreeSource`]: strategy trait supplying the payload-specific
//!   behaviors (item bounds, leaf hit testing)
//! - [`MeshSource`]/[`SceneSource`]: the two shipped variants, over mesh
//!   triangles and whole scene objects

mod mesh;
mod node;
mod parameter;
mod scene;
mod source;
mod tree;

// Re-export main types
pub use mesh::{MeshOctree, MeshSource, TriangleEntry};
pub use node::{NodeId, OctreeNode};
pub use parameter::OctreeBuildParameter;
pub use scene::{SceneHandle, SceneNode, SceneOctree, SceneSource};
pub use source::OctreeSource;
pub use tree::Octree;
