//! Ray representation and intersection tests.

use nalgebra::{Point3, Vector3};

use crate::BoundingBox;

/// A ray in 3D space, defined by an origin and a direction.
///
/// The direction is stored as given; callers should pass a normalized
/// direction so that intersection distances are in world units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    origin: Point3<f32>,
    direction: Vector3<f32>,
}

impl Ray {
    /// Creates a new ray.
    pub fn new(origin: Point3<f32>, direction: Vector3<f32>) -> Self {
        Self { origin, direction }
    }

    /// Returns the ray origin.
    #[inline]
    pub fn origin(&self) -> Point3<f32> {
        self.origin
    }

    /// Returns the ray direction.
    #[inline]
    pub fn direction(&self) -> Vector3<f32> {
        self.direction
    }

    /// Returns the point along the ray at parameter `t`.
    #[inline]
    pub fn at(&self, t: f32) -> Point3<f32> {
        self.origin + self.direction * t
    }

    /// Tests whether the ray meets an axis-aligned box.
    ///
    /// Uses the slab method. A ray whose origin lies inside the box
    /// intersects it; a box entirely behind the origin does not.
    pub fn intersects_box(&self, bound: &BoundingBox) -> bool {
        let mut t_near = f32::NEG_INFINITY;
        let mut t_far = f32::INFINITY;

        for axis in 0..3 {
            let origin = self.origin[axis];
            let direction = self.direction[axis];
            let min = bound.min()[axis];
            let max = bound.max()[axis];

            if direction.abs() < f32::EPSILON {
                // Parallel to this slab: inside or miss outright.
                if origin < min || origin > max {
                    return false;
                }
                continue;
            }

            let inv = 1.0 / direction;
            let mut t1 = (min - origin) * inv;
            let mut t2 = (max - origin) * inv;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            t_near = t_near.max(t1);
            t_far = t_far.min(t2);
            if t_near > t_far || t_far < 0.0 {
                return false;
            }
        }
        true
    }

    /// Intersects the ray with a triangle using the Möller–Trumbore
    /// algorithm.
    ///
    /// Returns the signed distance along the ray to the intersection point,
    /// or `None` when the ray is parallel to the triangle or misses it.
    /// The distance may be negative (hit behind the origin); callers decide
    /// whether such hits count.
    pub fn intersect_triangle(
        &self,
        p0: &Point3<f32>,
        p1: &Point3<f32>,
        p2: &Point3<f32>,
    ) -> Option<f32> {
        let edge1 = p1 - p0;
        let edge2 = p2 - p0;

        let pvec = self.direction.cross(&edge2);
        let det = edge1.dot(&pvec);
        if det.abs() < f32::EPSILON {
            return None;
        }
        let inv_det = 1.0 / det;

        let tvec = self.origin - p0;
        let u = tvec.dot(&pvec) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let qvec = tvec.cross(&edge1);
        let v = self.direction.dot(&qvec) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        Some(edge2.dot(&qvec) * inv_det)
    }
}
