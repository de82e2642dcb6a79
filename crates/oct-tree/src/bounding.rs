//! Axis-aligned bounding box and containment tests for octree nodes.

use nalgebra::{Matrix4, Point3, Vector3};

/// How one region relates to another region or point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Containment {
    /// The regions share no points.
    Disjoint,
    /// The regions overlap, but neither wholly encloses the other.
    Intersects,
    /// The first region wholly encloses the second, faces included.
    Contains,
}

/// An axis-aligned box in 3D space, defined by its minimum and maximum corners.
///
/// The box is closed: points on its faces count as inside. A box whose
/// corners coincide on every axis is *degenerate*; degenerate boxes are
/// valid payloads but are never pushed down into octants during
/// subdivision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    min: Point3<f32>,
    max: Point3<f32>,
}

impl Default for BoundingBox {
    /// A degenerate box at the origin.
    fn default() -> Self {
        Self {
            min: Point3::origin(),
            max: Point3::origin(),
        }
    }
}

impl BoundingBox {
    /// Creates a box from its minimum and maximum corners.
    ///
    /// Corners are taken as given; callers are expected to pass
    /// `min <= max` componentwise.
    pub fn new(min: Point3<f32>, max: Point3<f32>) -> Self {
        Self { min, max }
    }

    /// Creates the smallest box enclosing all given points.
    ///
    /// Returns `None` if the slice is empty.
    pub fn from_points(points: &[Point3<f32>]) -> Option<Self> {
        let first = points.first()?;
        let mut min = *first;
        let mut max = *first;
        for p in &points[1..] {
            min = Point3::from(min.coords.inf(&p.coords));
            max = Point3::from(max.coords.sup(&p.coords));
        }
        Some(Self { min, max })
    }

    /// Returns the minimum corner.
    #[inline]
    pub fn min(&self) -> Point3<f32> {
        self.min
    }

    /// Returns the maximum corner.
    #[inline]
    pub fn max(&self) -> Point3<f32> {
        self.max
    }

    /// Returns the center of the box.
    #[inline]
    pub fn center(&self) -> Point3<f32> {
        Point3::from((self.min.coords + self.max.coords) / 2.0)
    }

    /// Returns the extent of the box on each axis (`max - min`).
    #[inline]
    pub fn size(&self) -> Vector3<f32> {
        self.max - self.min
    }

    /// Returns `true` if the box has zero extent on every axis.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.min == self.max
    }

    /// Returns the smallest box enclosing both `self` and `other`.
    pub fn merge(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min: Point3::from(self.min.coords.inf(&other.min.coords)),
            max: Point3::from(self.max.coords.sup(&other.max.coords)),
        }
    }

    /// Classifies how this box relates to another box.
    ///
    /// `Contains` is stricter than `Intersects`: the other box must lie
    /// wholly inside this one, its faces included. Partial overlap yields
    /// `Intersects`.
    pub fn contains_box(&self, other: &BoundingBox) -> Containment {
        if self.max.x < other.min.x
            || self.min.x > other.max.x
            || self.max.y < other.min.y
            || self.min.y > other.max.y
            || self.max.z < other.min.z
            || self.min.z > other.max.z
        {
            return Containment::Disjoint;
        }
        if self.min.x <= other.min.x
            && other.max.x <= self.max.x
            && self.min.y <= other.min.y
            && other.max.y <= self.max.y
            && self.min.z <= other.min.z
            && other.max.z <= self.max.z
        {
            Containment::Contains
        } else {
            Containment::Intersects
        }
    }

    /// Returns the eight corners of the box.
    pub fn corners(&self) -> [Point3<f32>; 8] {
        let (n, x) = (self.min, self.max);
        [
            Point3::new(n.x, n.y, n.z),
            Point3::new(x.x, n.y, n.z),
            Point3::new(x.x, x.y, n.z),
            Point3::new(n.x, x.y, n.z),
            Point3::new(n.x, n.y, x.z),
            Point3::new(x.x, n.y, x.z),
            Point3::new(x.x, x.y, x.z),
            Point3::new(n.x, x.y, x.z),
        ]
    }

    /// Returns the axis-aligned box of this box's corners mapped through a
    /// transform.
    ///
    /// Used by hit testing to express a node bound in the query's reference
    /// frame before the ray-box test.
    pub fn transformed(&self, transform: &Matrix4<f32>) -> BoundingBox {
        let corners = self.corners();
        let first = transform.transform_point(&corners[0]);
        let mut min = first;
        let mut max = first;
        for corner in &corners[1..] {
            let p = transform.transform_point(corner);
            min = Point3::from(min.coords.inf(&p.coords));
            max = Point3::from(max.coords.sup(&p.coords));
        }
        BoundingBox { min, max }
    }

    /// Returns the smallest enclosing axis-aligned cube centered on this
    /// box's center.
    ///
    /// The box is recentered at the origin, the largest recentered extent
    /// picks the cube's half-size, and the cube is shifted back to the
    /// original center. Used for cube normalization at top-level build.
    pub fn enclosing_cube(&self) -> BoundingBox {
        let center = self.center().coords;
        let shifted_max = self.max.coords - center;
        let half = shifted_max.x.max(shifted_max.y).max(shifted_max.z);
        let half = Vector3::new(half, half, half);
        BoundingBox {
            min: Point3::from(center - half),
            max: Point3::from(center + half),
        }
    }

    /// Splits the box into its 8 equal octants.
    ///
    /// Returns an empty vector when the box is degenerate or every extent
    /// is below `min_size` (subdivision terminates). Octants are ordered as
    /// a fixed ring: indices 0-3 cover the lower half (counter-clockwise
    /// from the minimum corner), 4-7 the upper half. "First match wins"
    /// placement relies on this order being stable.
    pub fn subdivide(&self, min_size: f32) -> Vec<BoundingBox> {
        let size = self.size();
        if size == Vector3::zeros()
            || (size.x < min_size && size.y < min_size && size.z < min_size)
        {
            return Vec::new();
        }
        let (n, x) = (self.min, self.max);
        let c = self.center();
        vec![
            BoundingBox::new(n, c),
            BoundingBox::new(Point3::new(c.x, n.y, n.z), Point3::new(x.x, c.y, c.z)),
            BoundingBox::new(Point3::new(c.x, n.y, c.z), Point3::new(x.x, c.y, x.z)),
            BoundingBox::new(Point3::new(n.x, n.y, c.z), Point3::new(c.x, c.y, x.z)),
            BoundingBox::new(Point3::new(n.x, c.y, n.z), Point3::new(c.x, x.y, c.z)),
            BoundingBox::new(Point3::new(c.x, c.y, n.z), Point3::new(x.x, x.y, c.z)),
            BoundingBox::new(c, x),
            BoundingBox::new(Point3::new(n.x, c.y, c.z), Point3::new(c.x, x.y, x.z)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Translation3;

    fn unit_box() -> BoundingBox {
        BoundingBox::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0))
    }

    #[test]
    fn from_points_empty() {
        assert!(BoundingBox::from_points(&[]).is_none());
    }

    #[test]
    fn from_points_encloses_all() {
        let points = [
            Point3::new(1.0, -2.0, 0.5),
            Point3::new(-1.0, 3.0, 0.0),
            Point3::new(0.0, 0.0, -4.0),
        ];
        let b = BoundingBox::from_points(&points).unwrap();
        assert_eq!(b.min(), Point3::new(-1.0, -2.0, -4.0));
        assert_eq!(b.max(), Point3::new(1.0, 3.0, 0.5));
    }

    #[test]
    fn containment_classification() {
        let outer = unit_box();
        let inner = BoundingBox::new(Point3::new(0.25, 0.25, 0.25), Point3::new(0.75, 0.75, 0.75));
        let straddling = BoundingBox::new(Point3::new(0.5, 0.5, 0.5), Point3::new(1.5, 1.5, 1.5));
        let apart = BoundingBox::new(Point3::new(2.0, 2.0, 2.0), Point3::new(3.0, 3.0, 3.0));

        assert_eq!(outer.contains_box(&inner), Containment::Contains);
        assert_eq!(outer.contains_box(&straddling), Containment::Intersects);
        assert_eq!(outer.contains_box(&apart), Containment::Disjoint);
    }

    #[test]
    fn containment_is_face_inclusive() {
        let outer = unit_box();
        // Box sharing a face with the outer box still counts as contained.
        let flush = BoundingBox::new(Point3::origin(), Point3::new(1.0, 0.5, 0.5));
        assert_eq!(outer.contains_box(&flush), Containment::Contains);
        // So does the box itself.
        assert_eq!(outer.contains_box(&outer), Containment::Contains);
    }

    #[test]
    fn merge_unions_extents() {
        let a = unit_box();
        let b = BoundingBox::new(Point3::new(-1.0, 0.5, 0.0), Point3::new(0.5, 2.0, 1.0));
        let merged = a.merge(&b);
        assert_eq!(merged.min(), Point3::new(-1.0, 0.0, 0.0));
        assert_eq!(merged.max(), Point3::new(1.0, 2.0, 1.0));
    }

    #[test]
    fn degenerate_detection() {
        let point = BoundingBox::new(Point3::new(1.0, 2.0, 3.0), Point3::new(1.0, 2.0, 3.0));
        assert!(point.is_degenerate());
        // Zero thickness on one axis only is not degenerate.
        let flat = BoundingBox::new(Point3::origin(), Point3::new(1.0, 1.0, 0.0));
        assert!(!flat.is_degenerate());
    }

    #[test]
    fn transformed_by_translation() {
        let b = unit_box();
        let m = Translation3::new(2.0, 0.0, -1.0).to_homogeneous();
        let t = b.transformed(&m);
        assert_eq!(t.min(), Point3::new(2.0, 0.0, -1.0));
        assert_eq!(t.max(), Point3::new(3.0, 1.0, 0.0));
    }

    #[test]
    fn enclosing_cube_is_cubical_and_centered() {
        let b = BoundingBox::new(Point3::new(-1.0, 0.0, 2.0), Point3::new(3.0, 1.0, 3.0));
        let cube = b.enclosing_cube();
        let size = cube.size();
        assert_eq!(size.x, size.y);
        assert_eq!(size.y, size.z);
        assert_eq!(cube.center(), b.center());
        // Largest extent was 4 on the x axis.
        assert_eq!(size.x, 4.0);
        assert_eq!(cube.contains_box(&b), Containment::Contains);
    }

    #[test]
    fn subdivide_tiles_the_box() {
        let b = BoundingBox::new(Point3::origin(), Point3::new(2.0, 2.0, 2.0));
        let octants = b.subdivide(1.0);
        assert_eq!(octants.len(), 8);

        let volume: f32 = octants
            .iter()
            .map(|o| {
                let s = o.size();
                s.x * s.y * s.z
            })
            .sum();
        assert_eq!(volume, 8.0);

        // The ring order pins the extreme corners.
        assert_eq!(octants[0].min(), b.min());
        assert_eq!(octants[6].max(), b.max());
        for o in &octants {
            assert_eq!(b.contains_box(o), Containment::Contains);
        }
    }

    #[test]
    fn subdivide_terminates_below_min_size() {
        let b = unit_box();
        assert!(b.subdivide(2.0).is_empty());
        let point = BoundingBox::new(Point3::origin(), Point3::origin());
        assert!(point.subdivide(0.1).is_empty());
    }
}
