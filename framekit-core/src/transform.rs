//! Pose utilities: composition, roll/pitch/yaw conversion, sanity checks

use nalgebra::{Isometry3, Translation3, Unit, UnitQuaternion};

use crate::geometry::{Point3d, Vector3d, GEOMETRY_EPSILON};

/// A rigid pose: rotation followed by translation
pub type Pose = Isometry3<f64>;

/// The three local axes of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Unit vector along this axis
    pub fn unit(self) -> Vector3d {
        match self {
            Axis::X => Vector3d::x(),
            Axis::Y => Vector3d::y(),
            Axis::Z => Vector3d::z(),
        }
    }

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// Create a pose from a position and roll/pitch/yaw angles in degrees
///
/// The rotation is `Rz(yaw) * Ry(pitch) * Rx(roll)`.
pub fn pose_from_position_rpy_degrees(position: [f64; 3], rpy_degrees: [f64; 3]) -> Pose {
    let rotation = UnitQuaternion::from_euler_angles(
        rpy_degrees[0].to_radians(),
        rpy_degrees[1].to_radians(),
        rpy_degrees[2].to_radians(),
    );
    Isometry3::from_parts(
        Translation3::new(position[0], position[1], position[2]),
        rotation,
    )
}

/// Decompose a pose into its position and roll/pitch/yaw angles in degrees
pub fn position_rpy_degrees(pose: &Pose) -> ([f64; 3], [f64; 3]) {
    let t = pose.translation.vector;
    let (roll, pitch, yaw) = pose.rotation.euler_angles();
    (
        [t.x, t.y, t.z],
        [roll.to_degrees(), pitch.to_degrees(), yaw.to_degrees()],
    )
}

/// Position of the pose origin in world space
pub fn pose_origin(pose: &Pose) -> Point3d {
    Point3d::from(pose.translation.vector)
}

/// A pure translation in world space
pub fn translation_pose(delta: &Vector3d) -> Pose {
    Isometry3::translation(delta.x, delta.y, delta.z)
}

/// Rotation by `angle` radians about `axis` passing through `center`
///
/// Equivalent to translating `center` to the origin, rotating, and
/// translating back. Returns `None` for a zero-length axis.
pub fn rotation_about_point(center: &Point3d, axis: &Vector3d, angle: f64) -> Option<Pose> {
    if !angle.is_finite() || axis.norm() <= GEOMETRY_EPSILON {
        return None;
    }
    let axis = Unit::try_new(*axis, GEOMETRY_EPSILON)?;
    let rotation = UnitQuaternion::from_axis_angle(&axis, angle);
    Some(Isometry3::rotation_wrt_point(rotation, *center))
}

/// Whether every component of the pose is finite
pub fn is_finite_pose(pose: &Pose) -> bool {
    pose.translation.vector.iter().all(|c| c.is_finite())
        && pose.rotation.coords.iter().all(|c| c.is_finite())
}

/// Copy of the pose with its rotation quaternion renormalized
///
/// Long chains of incremental rotations drift away from unit length; this
/// keeps the rotation orthonormal.
pub fn renormalized(pose: &Pose) -> Pose {
    let mut rotation = pose.rotation;
    rotation.renormalize();
    Isometry3::from_parts(pose.translation, rotation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rpy_round_trip() {
        let pose = pose_from_position_rpy_degrees([1.0, 2.0, 3.0], [10.0, 20.0, 30.0]);
        let (position, rpy) = position_rpy_degrees(&pose);

        assert_relative_eq!(position[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(position[1], 2.0, epsilon = 1e-12);
        assert_relative_eq!(position[2], 3.0, epsilon = 1e-12);
        assert_relative_eq!(rpy[0], 10.0, epsilon = 1e-9);
        assert_relative_eq!(rpy[1], 20.0, epsilon = 1e-9);
        assert_relative_eq!(rpy[2], 30.0, epsilon = 1e-9);
    }

    #[test]
    fn test_yaw_rotates_about_z() {
        let pose = pose_from_position_rpy_degrees([0.0; 3], [0.0, 0.0, 90.0]);
        let x = pose.rotation * Vector3d::x();
        assert_relative_eq!(x, Vector3d::y(), epsilon = 1e-12);
    }

    #[test]
    fn test_rotation_about_point_keeps_center_fixed() {
        let center = Point3d::new(1.0, 1.0, 0.0);
        let rot =
            rotation_about_point(&center, &Vector3d::z(), std::f64::consts::FRAC_PI_2).unwrap();

        assert_relative_eq!(rot * center, center, epsilon = 1e-12);
        assert_relative_eq!(
            rot * Point3d::new(2.0, 1.0, 0.0),
            Point3d::new(1.0, 2.0, 0.0),
            epsilon = 1e-12
        );
        assert!(rotation_about_point(&center, &Vector3d::zeros(), 1.0).is_none());
        assert!(rotation_about_point(&center, &Vector3d::z(), f64::NAN).is_none());
    }

    #[test]
    fn test_renormalized_restores_unit_quaternion() {
        let mut pose = pose_from_position_rpy_degrees([0.0; 3], [5.0, 5.0, 5.0]);
        let axis = Vector3d::new(1.0, 2.0, 3.0);
        let step = rotation_about_point(&Point3d::origin(), &axis, 0.01).unwrap();
        for _ in 0..10_000 {
            pose = step * pose;
        }
        let pose = renormalized(&pose);
        assert_relative_eq!(pose.rotation.quaternion().norm(), 1.0, epsilon = 1e-12);
        assert!(is_finite_pose(&pose));
    }
}
