//! Axis-aligned bounding boxes in world space.

use cgmath::{Point3, Vector3};

/// An axis-aligned box given by its minimum and maximum corners (both inclusive).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    /// Corner with the smallest coordinates.
    pub min: Point3<f32>,
    /// Corner with the largest coordinates.
    pub max: Point3<f32>,
}

impl Aabb {
    /// Creates a box from two corners.
    pub fn new(min: Point3<f32>, max: Point3<f32>) -> Self {
        Aabb { min, max }
    }

    /// Creates the cube of half edge length `half_size` around `center`.
    pub fn from_center(center: Point3<f32>, half_size: f32) -> Self {
        let half = Vector3::new(half_size, half_size, half_size);
        Aabb {
            min: center - half,
            max: center + half,
        }
    }

    /// Smallest box enclosing every point, or `None` for an empty iterator.
    pub fn enclosing(points: impl IntoIterator<Item = Point3<f32>>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        Some(points.fold(Aabb::new(first, first), |mut acc, p| {
            acc.min.x = acc.min.x.min(p.x);
            acc.min.y = acc.min.y.min(p.y);
            acc.min.z = acc.min.z.min(p.z);
            acc.max.x = acc.max.x.max(p.x);
            acc.max.y = acc.max.y.max(p.y);
            acc.max.z = acc.max.z.max(p.z);
            acc
        }))
    }

    /// Whether `point` lies inside or on the boundary.
    pub fn contains(&self, point: Point3<f32>) -> bool {
        (self.min.x..=self.max.x).contains(&point.x)
            && (self.min.y..=self.max.y).contains(&point.y)
            && (self.min.z..=self.max.z).contains(&point.z)
    }

    /// Whether the two boxes share any point, boundaries included.
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Centre point.
    pub fn center(&self) -> Point3<f32> {
        Point3::new(
            (self.min.x + self.max.x) * 0.5,
            (self.min.y + self.max.y) * 0.5,
            (self.min.z + self.max.z) * 0.5,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_points_are_contained() {
        let aabb = Aabb::from_center(Point3::new(0.0, 0.0, 0.0), 1.0);
        assert!(aabb.contains(Point3::new(1.0, -1.0, 0.0)));
        assert!(!aabb.contains(Point3::new(1.01, 0.0, 0.0)));
    }

    #[test]
    fn touching_boxes_intersect() {
        let a = Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        let b = Aabb::new(Point3::new(1.0, 0.0, 0.0), Point3::new(2.0, 1.0, 1.0));
        let c = Aabb::new(Point3::new(1.5, 0.0, 0.0), Point3::new(2.0, 1.0, 1.0));
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn enclosing_box_covers_all_points() {
        let aabb = Aabb::enclosing([
            Point3::new(1.0, 5.0, -2.0),
            Point3::new(-3.0, 0.0, 4.0),
            Point3::new(0.0, 2.0, 0.0),
        ])
        .unwrap();
        assert_eq!(aabb.min, Point3::new(-3.0, 0.0, -2.0));
        assert_eq!(aabb.max, Point3::new(1.0, 5.0, 4.0));
        assert!(Aabb::enclosing(Vec::new()).is_none());
    }
}
