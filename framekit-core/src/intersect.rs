//! Ray, line and plane intersection helpers
//!
//! Every function here returns `None` instead of a non-finite result when
//! the configuration is degenerate (parallel rays, zero-length vectors,
//! NaN input). Callers treat `None` as "skip this input tick".

use nalgebra::{Point2, Vector2};

use crate::geometry::{Plane, Point3d, Ray, Vector3d, GEOMETRY_EPSILON};

/// Relative tolerance used to detect (near-)parallel configurations
const PARALLEL_TOLERANCE: f64 = 1e-9;

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// Parameter `t` of the point on the line `line_origin + t * line_dir` that
/// is closest to `ray`
///
/// Returns `None` when the ray runs parallel to the line.
pub fn closest_line_parameter(
    ray: &Ray,
    line_origin: &Point3d,
    line_dir: &Vector3d,
) -> Option<f64> {
    if !ray.is_valid() || line_dir.norm() <= GEOMETRY_EPSILON {
        return None;
    }

    let u = ray.direction();
    let v = *line_dir;
    let w0 = ray.origin - line_origin;

    let a = u.dot(&u);
    let b = u.dot(&v);
    let c = v.dot(&v);
    let d = u.dot(&w0);
    let e = v.dot(&w0);

    let denom = a * c - b * b;
    if denom.abs() <= PARALLEL_TOLERANCE * a * c {
        return None;
    }

    finite((a * e - b * d) / denom)
}

/// Point where `ray` (taken as an infinite line) crosses `plane`
///
/// Returns `None` when the ray is parallel to the plane or the plane normal
/// has zero length.
pub fn ray_plane_intersection(ray: &Ray, plane: &Plane) -> Option<Point3d> {
    if !ray.is_valid() {
        return None;
    }
    let normal_len = plane.normal.norm();
    if !normal_len.is_finite() || normal_len <= GEOMETRY_EPSILON {
        return None;
    }

    let direction = ray.direction();
    let denom = plane.normal.dot(&direction);
    if denom.abs() <= PARALLEL_TOLERANCE * normal_len * direction.norm() {
        return None;
    }

    let t = finite(plane.normal.dot(&(plane.point - ray.origin)) / denom)?;
    let point = ray.at(t);
    point.iter().all(|c| c.is_finite()).then_some(point)
}

/// Signed angle in radians that carries `from` onto `to` around `center`
///
/// Positive is counter-clockwise in a y-up display frame. Returns `None`
/// when either point coincides with the center.
pub fn signed_screen_angle(
    center: &Point2<f64>,
    from: &Point2<f64>,
    to: &Point2<f64>,
) -> Option<f64> {
    let a = from - center;
    let b = to - center;
    if a.norm() <= GEOMETRY_EPSILON || b.norm() <= GEOMETRY_EPSILON {
        return None;
    }

    let cross = a.x * b.y - a.y * b.x;
    let dot = a.dot(&b);
    finite(cross.atan2(dot))
}

/// Distance from `p` to the segment `a`-`b` and the clamped parameter of
/// the closest point along it
pub fn point_segment_distance_2d(p: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>) -> (f64, f64) {
    let ab: Vector2<f64> = b - a;
    let len_sq = ab.norm_squared();
    let t = if len_sq <= GEOMETRY_EPSILON * GEOMETRY_EPSILON {
        0.0
    } else {
        ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0)
    };
    let closest = a + ab * t;
    ((p - closest).norm(), t)
}
