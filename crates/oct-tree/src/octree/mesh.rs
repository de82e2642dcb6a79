//! Triangle-mesh octree variant.
//!
//! Slices a mesh into the octree one triangle at a time. Each payload item
//! pairs a triangle index with its bounding box, precomputed from the three
//! vertex positions at construction and reused for the life of the tree.

use nalgebra::{Matrix4, Point3};

use crate::{BoundingBox, HitTestResult, Ray};

use super::parameter::OctreeBuildParameter;
use super::source::OctreeSource;
use super::tree::Octree;

/// One triangle of the mesh: its index and its precomputed bound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleEntry {
    /// Index of the triangle (three consecutive entries in the mesh's
    /// index list, starting at `triangle * 3`).
    pub triangle: usize,
    /// Bounding box of the triangle's three vertices, computed once at
    /// tree construction.
    pub bound: BoundingBox,
}

/// Payload source over a triangle mesh's vertex positions and index list.
#[derive(Debug, Clone)]
pub struct MeshSource {
    positions: Vec<Point3<f32>>,
    indices: Vec<usize>,
}

impl MeshSource {
    /// Creates a source over the given mesh data. Indices are consumed in
    /// triples; a trailing partial triple is ignored.
    pub fn new(positions: Vec<Point3<f32>>, indices: Vec<usize>) -> Self {
        Self { positions, indices }
    }

    /// Returns the vertex positions.
    #[inline]
    pub fn positions(&self) -> &[Point3<f32>] {
        &self.positions
    }

    /// Returns the triangle index list.
    #[inline]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Returns the number of whole triangles in the index list.
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Returns the payload entry for triangle `triangle`, with its bound
    /// derived from the three vertex positions.
    pub fn entry(&self, triangle: usize) -> TriangleEntry {
        TriangleEntry {
            triangle,
            bound: self.triangle_bound(triangle),
        }
    }

    fn triangle_bound(&self, triangle: usize) -> BoundingBox {
        let base = triangle * 3;
        let vertices = [
            self.positions[self.indices[base]],
            self.positions[self.indices[base + 1]],
            self.positions[self.indices[base + 2]],
        ];
        // Three points are never empty.
        BoundingBox::from_points(&vertices).unwrap_or_default()
    }
}

impl OctreeSource for MeshSource {
    type Item = TriangleEntry;

    fn item_bound(&self, item: &TriangleEntry) -> BoundingBox {
        item.bound
    }

    /// Ray-triangle tests every payload entry in the query frame, keeping
    /// only the closest positive-distance hit.
    ///
    /// The caller's hit list holds at most one entry in this mode: an
    /// existing entry is replaced only when the new hit is strictly closer.
    fn hit_test_items(
        &self,
        items: &[TriangleEntry],
        model: &Matrix4<f32>,
        ray: &Ray,
        hits: &mut Vec<HitTestResult>,
    ) -> bool {
        let mut best = HitTestResult::default();
        let mut found = false;
        for entry in items {
            let base = entry.triangle * 3;
            let p0 = model.transform_point(&self.positions[self.indices[base]]);
            let p1 = model.transform_point(&self.positions[self.indices[base + 1]]);
            let p2 = model.transform_point(&self.positions[self.indices[base + 2]]);
            if let Some(distance) = ray.intersect_triangle(&p0, &p1, &p2) {
                // A NaN distance fails both comparisons.
                if distance > 0.0 && distance < best.distance {
                    best.is_valid = true;
                    best.distance = distance;
                    best.point = ray.at(distance);
                    best.normal = (p1 - p0).cross(&(p2 - p0)).normalize();
                    best.triangle_indices = Some([
                        self.indices[base],
                        self.indices[base + 1],
                        self.indices[base + 2],
                    ]);
                    found = true;
                }
            }
        }
        if !found {
            return false;
        }
        match hits.first_mut() {
            Some(existing) => {
                if existing.distance > best.distance {
                    *existing = best;
                    true
                } else {
                    false
                }
            }
            None => {
                hits.push(best);
                true
            }
        }
    }
}

/// Octree over the triangles of a single mesh.
pub type MeshOctree = Octree<MeshSource>;

impl Octree<MeshSource> {
    /// Creates an unbuilt octree over a mesh with default parameters.
    ///
    /// The root bound encloses all vertex positions; one payload entry is
    /// created per triangle with its bound precomputed.
    pub fn from_mesh(positions: Vec<Point3<f32>>, indices: Vec<usize>) -> Self {
        Self::from_mesh_with_parameter(positions, indices, OctreeBuildParameter::default())
    }

    /// Creates an unbuilt octree over a mesh with the given parameters.
    pub fn from_mesh_with_parameter(
        positions: Vec<Point3<f32>>,
        indices: Vec<usize>,
        parameter: OctreeBuildParameter,
    ) -> Self {
        let source = MeshSource::new(positions, indices);
        let bound = BoundingBox::from_points(source.positions()).unwrap_or_default();
        let entries: Vec<TriangleEntry> =
            (0..source.triangle_count()).map(|t| source.entry(t)).collect();
        Octree::with_bound(source, bound, entries, parameter)
    }
}
