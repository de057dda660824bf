//! Camera state shared by the viewport, the frame widget and the camera
//! controllers

use nalgebra::{Isometry3, Matrix4, Orthographic3, Perspective3};
use serde::{Deserialize, Serialize};

use framekit_core::{Bounds, Point3d, Vector3d, GEOMETRY_EPSILON};

/// Near plane is never placed closer than this fraction of the far plane
const NEAR_CLIP_RATIO: f64 = 0.001;

/// Extra room added on both sides of the scene when fitting the clipping
/// range, as a fraction of the scene depth
const CLIPPING_EXPANSION: f64 = 0.05;

/// How the camera projects the scene
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Projection {
    /// Perspective projection with a vertical view angle in degrees
    Perspective { view_angle: f64 },
    /// Parallel projection showing `scale` world units above and below the
    /// view center
    Parallel { scale: f64 },
}

/// A 3D camera looking at a focal point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub position: Point3d,
    pub focal_point: Point3d,
    pub view_up: Vector3d,
    pub projection: Projection,
    /// Near and far clipping distances along the direction of projection
    pub clipping_range: (f64, f64),
}

impl Camera {
    /// Create a new perspective camera
    pub fn new(position: Point3d, focal_point: Point3d, view_up: Vector3d) -> Self {
        Self {
            position,
            focal_point,
            view_up,
            projection: Projection::Perspective { view_angle: 30.0 },
            clipping_range: (0.01, 1000.0),
        }
    }

    /// Builder-style projection override
    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    /// Vector from the focal point to the camera position
    pub fn view_vector(&self) -> Vector3d {
        self.position - self.focal_point
    }

    /// Distance between camera and focal point
    pub fn distance(&self) -> f64 {
        self.view_vector().norm()
    }

    /// Unit vector pointing from the focal point towards the camera
    ///
    /// Falls back to +Z when camera and focal point coincide.
    pub fn view_plane_normal(&self) -> Vector3d {
        let v = self.view_vector();
        let n = v.norm();
        if n > GEOMETRY_EPSILON && n.is_finite() {
            v / n
        } else {
            Vector3d::z()
        }
    }

    /// Unit vector pointing from the camera towards the focal point
    pub fn direction_of_projection(&self) -> Vector3d {
        -self.view_plane_normal()
    }

    pub fn is_parallel(&self) -> bool {
        matches!(self.projection, Projection::Parallel { .. })
    }

    /// View-up made orthogonal to the view direction, or `None` when it is
    /// parallel to it
    pub fn orthogonalized_view_up(&self) -> Option<Vector3d> {
        let n = self.view_plane_normal();
        let up = self.view_up - n * self.view_up.dot(&n);
        let len = up.norm();
        (len > GEOMETRY_EPSILON && len.is_finite()).then(|| up / len)
    }

    /// Get the view matrix
    pub fn view_matrix(&self) -> Matrix4<f64> {
        let up = self.orthogonalized_view_up().unwrap_or_else(|| {
            // Any axis not parallel to the view direction will do
            let n = self.view_plane_normal();
            if n.x.abs() < 0.9 {
                n.cross(&Vector3d::x()).normalize()
            } else {
                n.cross(&Vector3d::y()).normalize()
            }
        });
        let target = self.position + self.direction_of_projection();
        Isometry3::look_at_rh(&self.position, &target, &up).to_homogeneous()
    }

    /// Get the projection matrix for a viewport with the given aspect ratio
    pub fn projection_matrix(&self, aspect_ratio: f64) -> Matrix4<f64> {
        let (near, far) = self.clipping_range;
        match self.projection {
            Projection::Perspective { view_angle } => {
                Perspective3::new(aspect_ratio, view_angle.to_radians(), near, far).into_inner()
            }
            Projection::Parallel { scale } => {
                let half_width = scale * aspect_ratio;
                Orthographic3::new(-half_width, half_width, -scale, scale, near, far).into_inner()
            }
        }
    }

    /// Fit the near/far clipping planes around `bounds`
    ///
    /// Returns `false` and leaves the range untouched when the whole scene
    /// lies behind the camera.
    pub fn reset_clipping_range(&mut self, bounds: &Bounds) -> bool {
        if !bounds.is_valid() {
            return false;
        }
        let dop = self.direction_of_projection();
        let (mut near, mut far) = (f64::INFINITY, f64::NEG_INFINITY);
        for corner in bounds.corners() {
            let depth = dop.dot(&(corner - self.position));
            near = near.min(depth);
            far = far.max(depth);
        }
        if !far.is_finite() || far <= GEOMETRY_EPSILON {
            return false;
        }

        let span = far - near;
        near = 0.99 * near - span * CLIPPING_EXPANSION;
        far = 1.01 * far + span * CLIPPING_EXPANSION;
        near = near.max(far * NEAR_CLIP_RATIO);

        self.clipping_range = (near, far);
        true
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(
            Point3d::new(0.0, 0.0, 10.0),
            Point3d::origin(),
            Vector3d::y(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_view_plane_normal() {
        let camera = Camera::new(Point3d::new(0.0, 0.0, 5.0), Point3d::origin(), Vector3d::y());
        assert_relative_eq!(camera.view_plane_normal(), Vector3d::z());
        assert_relative_eq!(camera.direction_of_projection(), -Vector3d::z());
        assert_relative_eq!(camera.distance(), 5.0);
    }

    #[test]
    fn test_degenerate_view_vector_falls_back() {
        let camera = Camera::new(Point3d::origin(), Point3d::origin(), Vector3d::y());
        assert_relative_eq!(camera.view_plane_normal(), Vector3d::z());
        assert!(camera.view_matrix().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_orthogonalized_view_up() {
        let camera = Camera::new(
            Point3d::new(0.0, -10.0, 0.0),
            Point3d::origin(),
            Vector3d::new(0.0, 1.0, 1.0),
        );
        assert_relative_eq!(
            camera.orthogonalized_view_up().unwrap(),
            Vector3d::z(),
            epsilon = 1e-12
        );

        let parallel = Camera::new(Point3d::new(0.0, 0.0, 10.0), Point3d::origin(), Vector3d::z());
        assert!(parallel.orthogonalized_view_up().is_none());
    }

    #[test]
    fn test_reset_clipping_range_encloses_bounds() {
        let mut camera = Camera::default();
        let bounds = Bounds::new(Point3d::new(-1.0, -1.0, -1.0), Point3d::new(1.0, 1.0, 1.0));
        assert!(camera.reset_clipping_range(&bounds));

        let (near, far) = camera.clipping_range;
        assert!(near > 0.0 && near < 9.0);
        assert!(far > 11.0);
    }

    #[test]
    fn test_reset_clipping_range_behind_camera() {
        let mut camera = Camera::default();
        let before = camera.clipping_range;
        let behind = Bounds::new(Point3d::new(-1.0, -1.0, 20.0), Point3d::new(1.0, 1.0, 22.0));
        assert!(!camera.reset_clipping_range(&behind));
        assert_eq!(camera.clipping_range, before);
    }
}
