//! Geometric primitives shared by the interaction code

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// A 3D point with double precision coordinates
pub type Point3d = Point3<f64>;

/// A 3D vector with double precision components
pub type Vector3d = Vector3<f64>;

/// Lengths below this are treated as zero by the interaction math
pub const GEOMETRY_EPSILON: f64 = 1e-9;

/// A world-space ray, usually cast from the near plane to the far plane
/// through one pixel of the viewport
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Point3d,
    pub end: Point3d,
}

impl Ray {
    /// Create a ray passing through `origin` and `end`
    pub fn new(origin: Point3d, end: Point3d) -> Self {
        Self { origin, end }
    }

    /// Unnormalized direction from origin to end
    pub fn direction(&self) -> Vector3d {
        self.end - self.origin
    }

    /// Point at parameter `t`, where `t = 1` is the end point
    pub fn at(&self, t: f64) -> Point3d {
        self.origin + self.direction() * t
    }

    /// Whether both points are finite and distinct
    pub fn is_valid(&self) -> bool {
        let direction = self.direction();
        self.origin.iter().all(|c| c.is_finite())
            && direction.iter().all(|c| c.is_finite())
            && direction.norm() > GEOMETRY_EPSILON
    }
}

/// An infinite plane given by a point on it and its normal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub point: Point3d,
    pub normal: Vector3d,
}

impl Plane {
    pub fn new(point: Point3d, normal: Vector3d) -> Self {
        Self { point, normal }
    }

    /// Signed distance of `p` from the plane, in units of the normal's length
    pub fn signed_distance(&self, p: &Point3d) -> f64 {
        self.normal.dot(&(p - self.point))
    }
}

/// Axis-aligned bounds of the visible scene
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Point3d,
    pub max: Point3d,
}

impl Bounds {
    pub fn new(min: Point3d, max: Point3d) -> Self {
        Self { min, max }
    }

    /// Bounds enclosing every point, or `None` for an empty slice
    pub fn from_points(points: &[Point3d]) -> Option<Self> {
        let first = points.first()?;
        let mut bounds = Self::new(*first, *first);
        for p in &points[1..] {
            bounds.include(p);
        }
        Some(bounds)
    }

    /// Grow the bounds to contain `p`
    pub fn include(&mut self, p: &Point3d) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    /// Smallest bounds containing both
    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds::new(self.min.inf(&other.min), self.max.sup(&other.max))
    }

    pub fn center(&self) -> Point3d {
        nalgebra::center(&self.min, &self.max)
    }

    /// Length of the diagonal
    pub fn diagonal(&self) -> f64 {
        (self.max - self.min).norm()
    }

    /// The eight corners of the box
    pub fn corners(&self) -> [Point3d; 8] {
        let (a, b) = (self.min, self.max);
        [
            Point3d::new(a.x, a.y, a.z),
            Point3d::new(b.x, a.y, a.z),
            Point3d::new(a.x, b.y, a.z),
            Point3d::new(b.x, b.y, a.z),
            Point3d::new(a.x, a.y, b.z),
            Point3d::new(b.x, a.y, b.z),
            Point3d::new(a.x, b.y, b.z),
            Point3d::new(b.x, b.y, b.z),
        ]
    }

    /// Whether min <= max on every axis and all values are finite
    pub fn is_valid(&self) -> bool {
        self.min.iter().chain(self.max.iter()).all(|c| c.is_finite())
            && self.min.x <= self.max.x
            && self.min.y <= self.max.y
            && self.min.z <= self.max.z
    }
}

impl Default for Bounds {
    /// The unit box used when nothing is visible
    fn default() -> Self {
        Self::new(Point3d::new(-1.0, -1.0, -1.0), Point3d::new(1.0, 1.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_bounds_from_points() {
        let bounds = Bounds::from_points(&[
            Point3d::new(1.0, -2.0, 0.5),
            Point3d::new(-1.0, 3.0, 0.0),
            Point3d::new(0.0, 0.0, 2.0),
        ])
        .unwrap();

        assert_eq!(bounds.min, Point3d::new(-1.0, -2.0, 0.0));
        assert_eq!(bounds.max, Point3d::new(1.0, 3.0, 2.0));
        assert_relative_eq!(bounds.center(), Point3d::new(0.0, 0.5, 1.0));
        assert!(Bounds::from_points(&[]).is_none());
    }

    #[test]
    fn test_ray_validity() {
        let ray = Ray::new(Point3d::origin(), Point3d::new(0.0, 0.0, -1.0));
        assert!(ray.is_valid());
        assert_relative_eq!(ray.at(0.5), Point3d::new(0.0, 0.0, -0.5));

        let collapsed = Ray::new(Point3d::origin(), Point3d::origin());
        assert!(!collapsed.is_valid());

        let broken = Ray::new(Point3d::new(f64::NAN, 0.0, 0.0), Point3d::origin());
        assert!(!broken.is_valid());
    }

    #[test]
    fn test_bounds_from_json() {
        let bounds: Bounds =
            serde_json::from_str(r#"{ "min": [0.0, 0.0, 0.0], "max": [1.0, 2.0, 2.0] }"#).unwrap();
        assert!(bounds.is_valid());
        assert_relative_eq!(bounds.diagonal(), 3.0);
    }
}
